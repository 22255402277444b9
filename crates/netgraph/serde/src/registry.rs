//! Immutable serde registry.

use std::collections::HashMap;
use std::sync::Arc;

use netgraph_types::ConfigValue;
use tracing::trace;

use crate::codec::Serde;
use crate::error::{Result, SerdeError};

/// `(domain, type) -> Serde` table. Built once at wiring time and never
/// mutated afterwards; cloning is cheap.
#[derive(Debug, Clone, Default)]
pub struct SerdeRegistry {
    domains: HashMap<String, HashMap<String, Arc<dyn Serde>>>,
}

impl SerdeRegistry {
    /// Build a registry. Two serdes under the same key are a conflict.
    pub fn new<I>(serdes: I) -> Result<Self>
    where
        I: IntoIterator<Item = Arc<dyn Serde>>,
    {
        let mut registry = Self::default();
        for serde in serdes {
            registry.insert(serde)?;
        }
        Ok(registry)
    }

    pub(crate) fn from_domains(domains: HashMap<String, HashMap<String, Arc<dyn Serde>>>) -> Self {
        Self { domains }
    }

    fn insert(&mut self, serde: Arc<dyn Serde>) -> Result<()> {
        let types = self.domains.entry(serde.domain().to_string()).or_default();
        if types.contains_key(serde.type_name()) {
            return Err(SerdeError::Conflict {
                domain: serde.domain().to_string(),
                type_name: serde.type_name().to_string(),
            });
        }
        types.insert(serde.type_name().to_string(), serde);
        Ok(())
    }

    pub fn get_serde(&self, domain: &str, type_name: &str) -> Result<&Arc<dyn Serde>> {
        self.domains
            .get(domain)
            .and_then(|types| types.get(type_name))
            .ok_or_else(|| SerdeError::NotFound {
                domain: domain.to_string(),
                type_name: type_name.to_string(),
            })
    }

    pub fn contains(&self, domain: &str, type_name: &str) -> bool {
        self.get_serde(domain, type_name).is_ok()
    }

    pub fn len(&self) -> usize {
        self.domains.values().map(HashMap::len).sum()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Every registered serde, in no particular order.
    pub fn serdes(&self) -> impl Iterator<Item = &Arc<dyn Serde>> {
        self.domains.values().flat_map(HashMap::values)
    }

    /// Union of two registries; fails on any shared key.
    pub fn try_merge(&self, other: &SerdeRegistry) -> Result<SerdeRegistry> {
        let mut merged = self.clone();
        for serde in other.serdes() {
            merged.insert(Arc::clone(serde))?;
        }
        Ok(merged)
    }

    /// Union of two registries.
    ///
    /// # Panics
    ///
    /// Panics if both registries define the same `(domain, type)`. Merging
    /// happens while wiring the process, where a duplicate is a programming
    /// error.
    pub fn must_merge(&self, other: &SerdeRegistry) -> SerdeRegistry {
        match self.try_merge(other) {
            Ok(merged) => merged,
            Err(err) => panic!("cannot merge serde registries: {}", err),
        }
    }
}

/// Serialize `value` with the serde registered for `(domain, type_name)`.
pub fn serialize(
    value: &ConfigValue,
    domain: &str,
    type_name: &str,
    registry: &SerdeRegistry,
) -> Result<Vec<u8>> {
    registry.get_serde(domain, type_name)?.serialize(value)
}

/// Deserialize `bytes` with the serde registered for `(domain, type_name)`.
///
/// Empty input is an absent value: no serde is looked up or invoked.
pub fn deserialize(
    bytes: &[u8],
    domain: &str,
    type_name: &str,
    registry: &SerdeRegistry,
) -> Result<Option<ConfigValue>> {
    if bytes.is_empty() {
        trace!(domain, type_name, "empty payload, skipping deserialize");
        return Ok(None);
    }
    registry.get_serde(domain, type_name)?.deserialize(bytes).map(Some)
}
