use thiserror::Error;

/// Result type for serde lookups and (de)serialization.
pub type Result<T> = std::result::Result<T, SerdeError>;

/// Serde registry errors.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum SerdeError {
    #[error("no serde registered for type {type_name:?} in domain {domain:?}")]
    NotFound { domain: String, type_name: String },

    #[error("serde for type {type_name:?} in domain {domain:?} is already registered")]
    Conflict { domain: String, type_name: String },

    #[error("failed to serialize {type_name:?}: {reason}")]
    Serialize { type_name: String, reason: String },

    #[error("failed to deserialize {type_name:?}: {reason}")]
    Deserialize { type_name: String, reason: String },

    /// The value handed to a serde is not the serde's native type.
    #[error("value for {type_name:?} is not a {expected}")]
    TypeMismatch {
        type_name: String,
        expected: &'static str,
    },
}

impl SerdeError {
    pub fn is_not_found(&self) -> bool {
        matches!(self, Self::NotFound { .. })
    }
}
