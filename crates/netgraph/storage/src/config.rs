use serde::{Deserialize, Serialize};

/// Storage engine limits.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct StorageConfig {
    /// Upper bound on entities returned by one load.
    pub max_entity_load_size: u32,

    /// Page size used when a load does not ask for one. Zero means
    /// `max_entity_load_size`.
    pub default_page_size: u32,
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self {
            max_entity_load_size: 5000,
            default_page_size: 0,
        }
    }
}

impl StorageConfig {
    /// Page size to serve for a requested size: zero picks the default,
    /// anything is clamped to the maximum.
    pub fn effective_page_size(&self, requested: u32) -> usize {
        let max = self.max_entity_load_size.max(1);
        let size = match (requested, self.default_page_size) {
            (0, 0) => max,
            (0, default) => default,
            (requested, _) => requested,
        };
        size.min(max) as usize
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn page_size_defaults_and_clamps() {
        let config = StorageConfig::default();
        assert_eq!(config.effective_page_size(0), 5000);
        assert_eq!(config.effective_page_size(10), 10);
        assert_eq!(config.effective_page_size(10_000), 5000);

        let config = StorageConfig {
            max_entity_load_size: 100,
            default_page_size: 25,
        };
        assert_eq!(config.effective_page_size(0), 25);
        assert_eq!(config.effective_page_size(500), 100);
    }
}
