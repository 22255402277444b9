//! Entity addressing.
//!
//! Every entity inside a network is addressed by its `(type, key)` pair.

use serde::{Deserialize, Serialize};
use std::fmt;

use crate::error::{GraphError, Result};

/// Composite `(type, key)` identifier, unique within a network.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct TypeAndKey {
    /// Entity type.
    #[serde(rename = "type")]
    pub entity_type: String,
    /// Entity key, unique per type.
    pub key: String,
}

impl TypeAndKey {
    pub fn new(entity_type: impl Into<String>, key: impl Into<String>) -> Self {
        Self {
            entity_type: entity_type.into(),
            key: key.into(),
        }
    }

    /// Reject empty type or key.
    pub fn validate(&self) -> Result<()> {
        if self.entity_type.is_empty() {
            return Err(GraphError::Validation(format!(
                "entity type must be non-empty (key {:?})",
                self.key
            )));
        }
        if self.key.is_empty() {
            return Err(GraphError::Validation(format!(
                "entity key must be non-empty (type {:?})",
                self.entity_type
            )));
        }
        Ok(())
    }
}

impl fmt::Display for TypeAndKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}-{}", self.entity_type, self.key)
    }
}

impl<T: Into<String>, K: Into<String>> From<(T, K)> for TypeAndKey {
    fn from((entity_type, key): (T, K)) -> Self {
        Self::new(entity_type, key)
    }
}

/// Sort and de-duplicate a list of identifiers in place.
pub fn dedup_sorted(tks: &mut Vec<TypeAndKey>) {
    tks.sort();
    tks.dedup();
}

/// Validate a network identifier.
pub fn validate_network_id(network_id: &str) -> Result<()> {
    if network_id.is_empty() {
        return Err(GraphError::Validation("network ID must be non-empty".into()));
    }
    if network_id.chars().any(char::is_whitespace) {
        return Err(GraphError::Validation(format!(
            "network ID {:?} must not contain whitespace",
            network_id
        )));
    }
    Ok(())
}
