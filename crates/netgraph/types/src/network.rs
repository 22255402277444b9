//! Networks: the tenant partition that owns an entity graph.

use std::collections::{BTreeSet, HashMap};

use crate::config_value::{ConfigPayload, ConfigValue};
use crate::error::{GraphError, Result};
use crate::ids::validate_network_id;

/// A tenant partition.
///
/// `version` is assigned by storage and ignored on writes.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Network {
    pub id: String,
    pub network_type: String,
    pub name: String,
    pub description: String,
    /// Config type name to deserialized config value.
    pub configs: HashMap<String, ConfigValue>,
    pub version: u64,
}

impl Network {
    pub fn new(id: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            ..Default::default()
        }
    }

    pub fn with_type(mut self, network_type: impl Into<String>) -> Self {
        self.network_type = network_type.into();
        self
    }

    pub fn with_name(mut self, name: impl Into<String>) -> Self {
        self.name = name.into();
        self
    }

    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = description.into();
        self
    }

    pub fn with_config<T: ConfigPayload>(mut self, config_type: impl Into<String>, value: T) -> Self {
        self.configs.insert(config_type.into(), ConfigValue::new(value));
        self
    }

    /// Set a config if present. `None` leaves the map untouched, so absent
    /// configs are never stored.
    pub fn insert_config<T: ConfigPayload>(&mut self, config_type: impl Into<String>, value: Option<T>) {
        if let Some(value) = value {
            self.configs.insert(config_type.into(), ConfigValue::new(value));
        }
    }

    /// Look up a config by type name and downcast it.
    pub fn config<T: ConfigPayload>(&self, config_type: &str) -> Option<&T> {
        self.configs.get(config_type)?.downcast_ref::<T>()
    }

    pub fn validate(&self) -> Result<()> {
        validate_network_id(&self.id)
    }
}

/// Patch-style update for a network.
///
/// `None` means "leave unchanged"; `Some(String::new())` clears the field.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct NetworkUpdateCriteria {
    pub id: String,
    pub new_type: Option<String>,
    pub new_name: Option<String>,
    pub new_description: Option<String>,
    pub configs_to_add_or_update: HashMap<String, ConfigValue>,
    pub configs_to_delete: Vec<String>,
}

impl NetworkUpdateCriteria {
    pub fn new(id: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            ..Default::default()
        }
    }

    pub fn set_config<T: ConfigPayload>(mut self, config_type: impl Into<String>, value: T) -> Self {
        self.configs_to_add_or_update
            .insert(config_type.into(), ConfigValue::new(value));
        self
    }

    pub fn delete_config(mut self, config_type: impl Into<String>) -> Self {
        self.configs_to_delete.push(config_type.into());
        self
    }

    /// A config may not be both written and deleted by one update.
    pub fn validate(&self) -> Result<()> {
        validate_network_id(&self.id)?;
        let deleted: BTreeSet<&str> = self.configs_to_delete.iter().map(String::as_str).collect();
        if let Some(clash) = self
            .configs_to_add_or_update
            .keys()
            .find(|k| deleted.contains(k.as_str()))
        {
            return Err(GraphError::Validation(format!(
                "network {}: config {:?} is both updated and deleted",
                self.id, clash
            )));
        }
        Ok(())
    }
}
