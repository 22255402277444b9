//! Mutable, domain-sharded serde registry.
//!
//! Each domain has its own lock. A registration batch locks only the shards
//! of the domains it touches, always in ascending domain order, so batches
//! over disjoint domains run in parallel and overlapping batches cannot
//! deadlock. Conflicts are checked under all of the batch's shard locks
//! before anything is inserted: a batch lands completely or not at all.

use std::collections::{BTreeMap, HashMap};
use std::sync::Arc;

use parking_lot::RwLock;
use tracing::{debug, info};

use crate::codec::Serde;
use crate::error::{Result, SerdeError};
use crate::registry::SerdeRegistry;

type Shard = Arc<RwLock<HashMap<String, Arc<dyn Serde>>>>;

/// Registry that independent initializers can register into concurrently.
///
/// Request paths take a [`SharedSerdeRegistry::snapshot`] and work on the
/// immutable [`SerdeRegistry`].
#[derive(Default)]
pub struct SharedSerdeRegistry {
    shards: RwLock<BTreeMap<String, Shard>>,
}

impl SharedSerdeRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    fn shard(&self, domain: &str) -> Option<Shard> {
        self.shards.read().get(domain).cloned()
    }

    fn ensure_shards<'a>(&self, domains: impl Iterator<Item = &'a String> + Clone) {
        let shards = self.shards.read();
        if domains.clone().all(|domain| shards.contains_key(domain)) {
            return;
        }
        drop(shards);
        let mut shards = self.shards.write();
        for domain in domains {
            shards.entry(domain.clone()).or_default();
        }
    }

    /// Register a batch of serdes atomically.
    ///
    /// Fails with [`SerdeError::Conflict`] if any key is already registered
    /// or appears twice in the batch; the registry is then unchanged.
    pub fn register_serdes(&self, serdes: Vec<Arc<dyn Serde>>) -> Result<()> {
        let mut by_domain: BTreeMap<String, Vec<Arc<dyn Serde>>> = BTreeMap::new();
        for serde in serdes {
            let batch = by_domain.entry(serde.domain().to_string()).or_default();
            if batch.iter().any(|s| s.type_name() == serde.type_name()) {
                return Err(SerdeError::Conflict {
                    domain: serde.domain().to_string(),
                    type_name: serde.type_name().to_string(),
                });
            }
            batch.push(serde);
        }

        loop {
            self.ensure_shards(by_domain.keys());

            // Holding the outer read lock keeps unregister out until the
            // batch has landed.
            let shards = self.shards.read();
            let Some(targets) = by_domain
                .iter()
                .map(|(domain, batch)| shards.get(domain).map(|shard| (shard, batch)))
                .collect::<Option<Vec<_>>>()
            else {
                // a domain was unregistered between creation and locking
                continue;
            };

            let mut guards = Vec::with_capacity(targets.len());
            for (shard, batch) in &targets {
                let guard = shard.write();
                if let Some(taken) = batch.iter().find(|s| guard.contains_key(s.type_name())) {
                    debug!(
                        domain = taken.domain(),
                        type_name = taken.type_name(),
                        "serde conflict, rejecting batch"
                    );
                    return Err(SerdeError::Conflict {
                        domain: taken.domain().to_string(),
                        type_name: taken.type_name().to_string(),
                    });
                }
                guards.push(guard);
            }

            for (mut guard, (_, batch)) in guards.into_iter().zip(&targets) {
                for serde in batch.iter() {
                    guard.insert(serde.type_name().to_string(), Arc::clone(serde));
                }
            }
            return Ok(());
        }
    }

    /// Drop every serde of `domain`. Returns how many were removed.
    pub fn unregister_serdes_for_domain(&self, domain: &str) -> usize {
        let removed = self
            .shards
            .write()
            .remove(domain)
            .map_or(0, |shard| shard.read().len());
        info!(domain, removed, "unregistered serdes for domain");
        removed
    }

    pub fn get_serde(&self, domain: &str, type_name: &str) -> Result<Arc<dyn Serde>> {
        self.shard(domain)
            .and_then(|shard| shard.read().get(type_name).cloned())
            .ok_or_else(|| SerdeError::NotFound {
                domain: domain.to_string(),
                type_name: type_name.to_string(),
            })
    }

    /// Immutable copy of everything registered so far.
    pub fn snapshot(&self) -> SerdeRegistry {
        let shards: Vec<(String, Shard)> = self
            .shards
            .read()
            .iter()
            .map(|(domain, shard)| (domain.clone(), Arc::clone(shard)))
            .collect();
        let domains = shards
            .into_iter()
            .map(|(domain, shard)| (domain, shard.read().clone()))
            .filter(|(_, types)| !types.is_empty())
            .collect();
        SerdeRegistry::from_domains(domains)
    }
}
