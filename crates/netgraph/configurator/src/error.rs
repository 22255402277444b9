use netgraph_serde::SerdeError;
use netgraph_storage::StorageError;
use netgraph_types::GraphError;
use thiserror::Error;

/// Result type for configurator operations.
pub type Result<T> = std::result::Result<T, ConfiguratorError>;

/// Northbound API errors.
#[derive(Debug, Error)]
pub enum ConfiguratorError {
    /// Raised only by single-item wrappers and by writes that target a
    /// missing entity or network.
    #[error("not found: {0}")]
    NotFound(String),

    /// Malformed ids or update criteria, rejected before storage is touched.
    #[error("validation error: {0}")]
    Validation(String),

    #[error(transparent)]
    Serde(#[from] SerdeError),

    #[error("storage error ({context}): {source}")]
    Storage {
        context: String,
        #[source]
        source: StorageError,
    },

    #[error(transparent)]
    Graph(GraphError),

    #[error("configuration error: {0}")]
    Config(String),
}

impl ConfiguratorError {
    pub fn is_not_found(&self) -> bool {
        matches!(self, Self::NotFound(_))
    }

    /// Wrap a storage failure with the identifiers of the request.
    pub(crate) fn storage(context: impl Into<String>) -> impl FnOnce(StorageError) -> Self {
        let context = context.into();
        move |source| match source {
            StorageError::NotFound(what) => Self::NotFound(format!("{} ({})", what, context)),
            source => Self::Storage { context, source },
        }
    }
}

impl From<GraphError> for ConfiguratorError {
    fn from(err: GraphError) -> Self {
        match err {
            GraphError::Validation(msg) => Self::Validation(msg),
            other => Self::Graph(other),
        }
    }
}
