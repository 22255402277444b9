//! The serde capability and a JSON-backed implementation.

use std::any::type_name;
use std::fmt;
use std::marker::PhantomData;

use netgraph_types::{ConfigPayload, ConfigValue};
use serde::de::DeserializeOwned;
use serde::Serialize;

use crate::error::{Result, SerdeError};

/// Domain of network-level configs.
pub const NETWORK_CONFIG_DOMAIN: &str = "configurator_network_configs";

/// Domain of entity-level configs. Entities are keyed by their type.
pub const ENTITY_CONFIG_DOMAIN: &str = "configurator_entity_configs";

/// A serializer/deserializer pair registered under `(domain, type)`.
pub trait Serde: Send + Sync {
    fn domain(&self) -> &str;

    fn type_name(&self) -> &str;

    fn serialize(&self, value: &ConfigValue) -> Result<Vec<u8>>;

    fn deserialize(&self, bytes: &[u8]) -> Result<ConfigValue>;
}

impl fmt::Debug for dyn Serde {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Serde")
            .field("domain", &self.domain())
            .field("type_name", &self.type_name())
            .finish()
    }
}

/// Serde for any `T` with serde derives, encoded as JSON.
pub struct JsonSerde<T> {
    domain: String,
    type_name: String,
    _marker: PhantomData<fn() -> T>,
}

impl<T> JsonSerde<T>
where
    T: ConfigPayload + Serialize + DeserializeOwned,
{
    pub fn new(domain: impl Into<String>, type_name: impl Into<String>) -> Self {
        Self {
            domain: domain.into(),
            type_name: type_name.into(),
            _marker: PhantomData,
        }
    }

    /// Serde for a network config named `type_name`.
    pub fn network_config(type_name: impl Into<String>) -> Self {
        Self::new(NETWORK_CONFIG_DOMAIN, type_name)
    }

    /// Serde for the config of entities of type `entity_type`.
    pub fn entity_config(entity_type: impl Into<String>) -> Self {
        Self::new(ENTITY_CONFIG_DOMAIN, entity_type)
    }
}

impl<T> Serde for JsonSerde<T>
where
    T: ConfigPayload + Serialize + DeserializeOwned,
{
    fn domain(&self) -> &str {
        &self.domain
    }

    fn type_name(&self) -> &str {
        &self.type_name
    }

    fn serialize(&self, value: &ConfigValue) -> Result<Vec<u8>> {
        let native = value
            .downcast_ref::<T>()
            .ok_or_else(|| SerdeError::TypeMismatch {
                type_name: self.type_name.clone(),
                expected: type_name::<T>(),
            })?;
        serde_json::to_vec(native).map_err(|e| SerdeError::Serialize {
            type_name: self.type_name.clone(),
            reason: e.to_string(),
        })
    }

    fn deserialize(&self, bytes: &[u8]) -> Result<ConfigValue> {
        serde_json::from_slice::<T>(bytes)
            .map(ConfigValue::new)
            .map_err(|e| SerdeError::Deserialize {
                type_name: self.type_name.clone(),
                reason: e.to_string(),
            })
    }
}
