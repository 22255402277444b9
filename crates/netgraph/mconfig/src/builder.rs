//! Builder plugins and their registry.

use std::sync::Arc;

use netgraph_types::{IndexedGraph, Network};
use parking_lot::{RwLock, RwLockReadGuard};
use tracing::debug;

use crate::message::MconfigMap;

/// Contributes part of a gateway's mconfig.
///
/// Builders write into a map shared by every builder of one synthesis run,
/// in registration order. A builder with nothing to contribute (say, the
/// network carries no config of its domain) returns `Ok(())` and leaves the
/// map alone.
pub trait MconfigBuilder: Send + Sync {
    /// Identity used in logs and errors.
    fn name(&self) -> &str {
        std::any::type_name::<Self>()
    }

    fn build(
        &self,
        network_id: &str,
        gateway_id: &str,
        graph: &IndexedGraph,
        network: &Network,
        mconfig: &mut MconfigMap,
    ) -> anyhow::Result<()>;
}

/// Ordered set of builders.
///
/// Registration order matters: when two builders write the same key, the one
/// registered later wins.
#[derive(Default)]
pub struct BuilderRegistry {
    builders: RwLock<Vec<Arc<dyn MconfigBuilder>>>,
}

impl BuilderRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn register(&self, builder: Arc<dyn MconfigBuilder>) {
        debug!(builder = builder.name(), "mconfig builder registered");
        self.builders.write().push(builder);
    }

    pub fn register_all(&self, builders: impl IntoIterator<Item = Arc<dyn MconfigBuilder>>) {
        for builder in builders {
            self.register(builder);
        }
    }

    /// Registered builders, in order.
    pub fn builders(&self) -> Vec<Arc<dyn MconfigBuilder>> {
        self.builders.read().clone()
    }

    pub fn len(&self) -> usize {
        self.builders.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.builders.read().is_empty()
    }

    /// Drop every builder. Returns how many were registered.
    pub fn unregister_all(&self) -> usize {
        let mut builders = self.builders.write();
        let count = builders.len();
        builders.clear();
        count
    }

    pub(crate) fn read(&self) -> RwLockReadGuard<'_, Vec<Arc<dyn MconfigBuilder>>> {
        self.builders.read()
    }
}

impl std::fmt::Debug for BuilderRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let builders = self.builders.read();
        f.debug_list()
            .entries(builders.iter().map(|b| b.name()))
            .finish()
    }
}
