//! Error types for netgraph-types.

use crate::ids::TypeAndKey;
use thiserror::Error;

/// Errors raised by the native data model and the graph query engine.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum GraphError {
    /// The requested entity is not part of the graph.
    #[error("entity {0} not found in graph")]
    EntityNotFound(TypeAndKey),

    /// No ancestor/parent/child of the requested type was found.
    #[error("no entity of type {target_type} reachable from {start}")]
    NoMatch {
        start: TypeAndKey,
        target_type: String,
    },

    /// Malformed identifiers or update criteria.
    #[error("validation error: {0}")]
    Validation(String),

    /// The edge list and the per-entity association lists disagree.
    #[error("edge {from} -> {to} is inconsistent with entity associations")]
    InconsistentEdges { from: TypeAndKey, to: TypeAndKey },
}

impl GraphError {
    /// Whether this error reports a missing entity or an unmatched search.
    pub fn is_not_found(&self) -> bool {
        matches!(self, Self::EntityNotFound(_) | Self::NoMatch { .. })
    }
}

/// Result type for graph operations.
pub type Result<T> = std::result::Result<T, GraphError>;
