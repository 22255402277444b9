//! Error types for mconfig synthesis

use netgraph_configurator::ConfiguratorError;
use netgraph_storage::StorageError;
use thiserror::Error;

/// Result type for mconfig operations
pub type Result<T> = std::result::Result<T, MconfigError>;

#[derive(Debug, Error)]
pub enum MconfigError {
    /// A registered builder failed. No bundle is produced.
    #[error("mconfig builder {builder} failed for gateway {gateway_id} in network {network_id}: {source}")]
    Builder {
        builder: String,
        network_id: String,
        gateway_id: String,
        #[source]
        source: Box<dyn std::error::Error + Send + Sync>,
    },

    /// The stored graph or network could not be turned into native types.
    #[error("failed to convert stored inputs: {0}")]
    Conversion(#[from] ConfiguratorError),

    #[error("failed to marshal mconfig: {0}")]
    Marshal(String),

    #[error("failed to load {context}: {source}")]
    Load {
        context: String,
        #[source]
        source: StorageError,
    },
}

impl MconfigError {
    pub(crate) fn builder(
        builder: &str,
        network_id: &str,
        gateway_id: &str,
        source: anyhow::Error,
    ) -> Self {
        MconfigError::Builder {
            builder: builder.to_string(),
            network_id: network_id.to_string(),
            gateway_id: gateway_id.to_string(),
            source: source.into(),
        }
    }

    pub(crate) fn load(context: impl Into<String>) -> impl FnOnce(StorageError) -> Self {
        let context = context.into();
        move |source| MconfigError::Load { context, source }
    }

    /// True when the network or gateway being synthesized does not exist.
    pub fn is_not_found(&self) -> bool {
        match self {
            MconfigError::Load { source, .. } => source.is_not_found(),
            MconfigError::Conversion(err) => err.is_not_found(),
            _ => false,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn builder_error_names_the_builder() {
        let err = MconfigError::builder("cellular", "n1", "gw1", anyhow::anyhow!("no tac"));
        let msg = err.to_string();
        assert!(msg.contains("cellular"));
        assert!(msg.contains("gw1"));
        assert!(msg.contains("no tac"));
        assert!(std::error::Error::source(&err).is_some());
    }

    #[test]
    fn load_not_found_is_detectable() {
        let err = MconfigError::load("network n1")(StorageError::NotFound("network n1".into()));
        assert!(err.is_not_found());
        assert!(!MconfigError::Marshal("x".into()).is_not_found());
    }
}
