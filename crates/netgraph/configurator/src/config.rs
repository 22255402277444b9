use std::path::Path;

use netgraph_storage::StorageConfig;
use serde::{Deserialize, Serialize};

use crate::error::{ConfiguratorError, Result};

/// Configurator service settings.
///
/// ```toml
/// [storage]
/// max_entity_load_size = 5000
/// default_page_size = 0
/// ```
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ConfiguratorConfig {
    pub storage: StorageConfig,
}

impl ConfiguratorConfig {
    /// Load from a TOML file, falling back to defaults if it does not exist.
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        if !path.exists() {
            return Ok(Self::default());
        }
        let contents = std::fs::read_to_string(path)
            .map_err(|e| ConfiguratorError::Config(format!("{}: {}", path.display(), e)))?;
        Self::from_toml_str(&contents)
    }

    pub fn from_toml_str(contents: &str) -> Result<Self> {
        toml::from_str(contents).map_err(|e| ConfiguratorError::Config(e.to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn missing_file_yields_defaults() {
        let config = ConfiguratorConfig::load("/nonexistent/netgraph/configurator.toml").unwrap();
        assert_eq!(config, ConfiguratorConfig::default());
        assert_eq!(config.storage.max_entity_load_size, 5000);
    }

    #[test]
    fn partial_toml_keeps_defaults() {
        let config = ConfiguratorConfig::from_toml_str("[storage]\ndefault_page_size = 100\n").unwrap();
        assert_eq!(config.storage.default_page_size, 100);
        assert_eq!(config.storage.max_entity_load_size, 5000);
    }

    #[test]
    fn malformed_toml_is_a_config_error() {
        let err = ConfiguratorConfig::from_toml_str("[storage\n").unwrap_err();
        assert!(matches!(err, ConfiguratorError::Config(_)));
    }
}
