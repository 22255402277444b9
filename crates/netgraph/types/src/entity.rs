//! Network entities (graph vertices) and their update/load descriptors.

use serde::{Deserialize, Serialize};

use crate::config_value::{ConfigPayload, ConfigValue};
use crate::error::{GraphError, Result};
use crate::ids::TypeAndKey;

/// Config carried by an entity.
///
/// Entities whose type has no registered serde in the current process keep
/// their stored bytes untouched in [`EntityConfig::Serialized`]; such a
/// config must never be treated as the native type.
#[derive(Debug, Clone, PartialEq)]
pub enum EntityConfig {
    /// Deserialized native value.
    Value(ConfigValue),
    /// Raw stored bytes, no serde available for the entity type.
    Serialized(Vec<u8>),
}

impl EntityConfig {
    pub fn value<T: ConfigPayload>(value: T) -> Self {
        Self::Value(ConfigValue::new(value))
    }

    pub fn is_serialized(&self) -> bool {
        matches!(self, Self::Serialized(_))
    }

    /// The native value, `None` for serialized configs.
    pub fn as_value(&self) -> Option<&ConfigValue> {
        match self {
            Self::Value(value) => Some(value),
            Self::Serialized(_) => None,
        }
    }
}

/// A vertex of the entity graph, scoped to one network.
///
/// `network_id`, `graph_id`, `parent_associations` and `version` are
/// populated by storage and ignored on writes. `associations` are
/// non-owning outgoing edges.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct NetworkEntity {
    pub network_id: String,
    pub entity_type: String,
    pub key: String,
    pub name: String,
    pub description: String,
    pub physical_id: String,
    pub config: Option<EntityConfig>,
    pub graph_id: String,
    pub associations: Vec<TypeAndKey>,
    pub parent_associations: Vec<TypeAndKey>,
    pub version: u64,
}

impl NetworkEntity {
    pub fn new(entity_type: impl Into<String>, key: impl Into<String>) -> Self {
        Self {
            entity_type: entity_type.into(),
            key: key.into(),
            ..Default::default()
        }
    }

    pub fn with_name(mut self, name: impl Into<String>) -> Self {
        self.name = name.into();
        self
    }

    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = description.into();
        self
    }

    pub fn with_physical_id(mut self, physical_id: impl Into<String>) -> Self {
        self.physical_id = physical_id.into();
        self
    }

    pub fn with_config<T: ConfigPayload>(mut self, value: T) -> Self {
        self.config = Some(EntityConfig::value(value));
        self
    }

    pub fn with_association(mut self, tk: impl Into<TypeAndKey>) -> Self {
        self.associations.push(tk.into());
        self
    }

    pub fn tk(&self) -> TypeAndKey {
        TypeAndKey::new(self.entity_type.clone(), self.key.clone())
    }

    /// Downcast the native config. `None` when absent, serialized, or of a
    /// different type.
    pub fn config_as<T: ConfigPayload>(&self) -> Option<&T> {
        self.config.as_ref()?.as_value()?.downcast_ref::<T>()
    }

    pub fn is_config_serialized(&self) -> bool {
        self.config.as_ref().map_or(false, EntityConfig::is_serialized)
    }

    /// Outgoing associations of the given type (one hop).
    pub fn children_of_type<'a>(&'a self, entity_type: &'a str) -> impl Iterator<Item = &'a TypeAndKey> + 'a {
        self.associations
            .iter()
            .filter(move |tk| tk.entity_type == entity_type)
    }

    /// First incoming association of the given type (one hop).
    pub fn first_parent_of_type(&self, entity_type: &str) -> Option<&TypeAndKey> {
        self.parent_associations
            .iter()
            .find(|tk| tk.entity_type == entity_type)
    }

    pub fn validate(&self) -> Result<()> {
        self.tk().validate()?;
        for assoc in &self.associations {
            assoc.validate()?;
        }
        Ok(())
    }
}

/// Patch-style update for one entity.
///
/// `Option` fields distinguish "no change" (`None`) from "set to empty"
/// (`Some(String::new())`). `associations_to_set`, when `Some` (including an
/// empty list), replaces every outgoing edge and cannot be combined with
/// `associations_to_add`. Additions are applied before deletions.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct EntityUpdateCriteria {
    pub entity_type: String,
    pub key: String,
    pub new_name: Option<String>,
    pub new_description: Option<String>,
    pub new_physical_id: Option<String>,
    pub new_config: Option<EntityConfig>,
    pub delete_config: bool,
    pub associations_to_set: Option<Vec<TypeAndKey>>,
    pub associations_to_add: Vec<TypeAndKey>,
    pub associations_to_delete: Vec<TypeAndKey>,
}

impl EntityUpdateCriteria {
    pub fn new(entity_type: impl Into<String>, key: impl Into<String>) -> Self {
        Self {
            entity_type: entity_type.into(),
            key: key.into(),
            ..Default::default()
        }
    }

    pub fn tk(&self) -> TypeAndKey {
        TypeAndKey::new(self.entity_type.clone(), self.key.clone())
    }

    pub fn set_name(mut self, name: impl Into<String>) -> Self {
        self.new_name = Some(name.into());
        self
    }

    pub fn set_description(mut self, description: impl Into<String>) -> Self {
        self.new_description = Some(description.into());
        self
    }

    pub fn set_physical_id(mut self, physical_id: impl Into<String>) -> Self {
        self.new_physical_id = Some(physical_id.into());
        self
    }

    pub fn set_config<T: ConfigPayload>(mut self, value: T) -> Self {
        self.new_config = Some(EntityConfig::value(value));
        self
    }

    pub fn clear_config(mut self) -> Self {
        self.delete_config = true;
        self
    }

    pub fn set_associations(mut self, tks: Vec<TypeAndKey>) -> Self {
        self.associations_to_set = Some(tks);
        self
    }

    pub fn add_association(mut self, tk: impl Into<TypeAndKey>) -> Self {
        self.associations_to_add.push(tk.into());
        self
    }

    pub fn delete_association(mut self, tk: impl Into<TypeAndKey>) -> Self {
        self.associations_to_delete.push(tk.into());
        self
    }

    pub fn validate(&self) -> Result<()> {
        let tk = self.tk();
        tk.validate()?;
        if self.associations_to_set.is_some() && !self.associations_to_add.is_empty() {
            return Err(GraphError::Validation(format!(
                "entity {}: associations_to_set and associations_to_add are mutually exclusive",
                tk
            )));
        }
        if self.delete_config && self.new_config.is_some() {
            return Err(GraphError::Validation(format!(
                "entity {}: new_config and delete_config are mutually exclusive",
                tk
            )));
        }
        self.associations_to_set
            .iter()
            .flatten()
            .chain(&self.associations_to_add)
            .chain(&self.associations_to_delete)
            .try_for_each(TypeAndKey::validate)
    }
}

/// One step of an atomic multi-entity write.
#[derive(Debug, Clone, PartialEq)]
pub enum EntityWriteOperation {
    Create(NetworkEntity),
    Update(EntityUpdateCriteria),
}

impl EntityWriteOperation {
    pub fn tk(&self) -> TypeAndKey {
        match self {
            Self::Create(entity) => entity.tk(),
            Self::Update(update) => update.tk(),
        }
    }

    pub fn validate(&self) -> Result<()> {
        match self {
            Self::Create(entity) => entity.validate(),
            Self::Update(update) => update.validate(),
        }
    }
}

impl From<NetworkEntity> for EntityWriteOperation {
    fn from(entity: NetworkEntity) -> Self {
        Self::Create(entity)
    }
}

impl From<EntityUpdateCriteria> for EntityWriteOperation {
    fn from(update: EntityUpdateCriteria) -> Self {
        Self::Update(update)
    }
}

/// Which parts of an entity a load populates, plus pagination.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct EntityLoadCriteria {
    pub load_metadata: bool,
    pub load_config: bool,
    /// Populate `parent_associations` (incoming edges).
    pub load_assocs_to_this: bool,
    /// Populate `associations` (outgoing edges).
    pub load_assocs_from_this: bool,
    /// Zero selects the server-side default.
    pub page_size: u32,
    /// Opaque token from a previous page; empty for the first page.
    pub page_token: String,
}

impl EntityLoadCriteria {
    /// Load every part of the entity.
    pub fn full() -> Self {
        Self {
            load_metadata: true,
            load_config: true,
            load_assocs_to_this: true,
            load_assocs_from_this: true,
            ..Default::default()
        }
    }

    pub fn with_page(mut self, page_size: u32, page_token: impl Into<String>) -> Self {
        self.page_size = page_size;
        self.page_token = page_token.into();
        self
    }
}

/// Which entities a load selects. Empty fields do not filter.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct EntityLoadFilter {
    pub type_filter: Option<String>,
    pub key_filter: Option<String>,
    /// Explicit identifiers; misses are reported, not raised.
    pub ids: Vec<TypeAndKey>,
    pub graph_id: Option<String>,
    pub physical_id: Option<String>,
}

impl EntityLoadFilter {
    pub fn of_type(entity_type: impl Into<String>) -> Self {
        Self {
            type_filter: Some(entity_type.into()),
            ..Default::default()
        }
    }

    pub fn of_ids(ids: Vec<TypeAndKey>) -> Self {
        Self {
            ids,
            ..Default::default()
        }
    }

    pub fn of_physical_id(physical_id: impl Into<String>) -> Self {
        Self {
            physical_id: Some(physical_id.into()),
            ..Default::default()
        }
    }
}

/// Which networks a load selects.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct NetworkLoadFilter {
    pub ids: Vec<String>,
    pub type_filter: Option<String>,
}

/// Which parts of a network a load populates.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct NetworkLoadCriteria {
    pub load_metadata: bool,
    pub load_configs: bool,
}

impl NetworkLoadCriteria {
    pub fn full() -> Self {
        Self {
            load_metadata: true,
            load_configs: true,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[derive(Debug, PartialEq)]
    struct Magmad {
        checkin_interval: u32,
    }

    #[test]
    fn set_and_add_are_mutually_exclusive() {
        let update = EntityUpdateCriteria::new("gateway", "gw1")
            .set_associations(vec![])
            .add_association(("tier", "t1"));
        assert!(matches!(update.validate(), Err(GraphError::Validation(_))));

        let clear = EntityUpdateCriteria::new("gateway", "gw1").set_associations(vec![]);
        assert!(clear.validate().is_ok());
    }

    #[test]
    fn new_config_and_delete_config_are_mutually_exclusive() {
        let update = EntityUpdateCriteria::new("gateway", "gw1")
            .set_config(Magmad {
                checkin_interval: 60,
            })
            .clear_config();
        assert!(matches!(update.validate(), Err(GraphError::Validation(_))));
    }

    #[test]
    fn serialized_config_is_not_downcast() {
        let mut entity = NetworkEntity::new("gateway", "gw1");
        entity.config = Some(EntityConfig::Serialized(vec![1, 2, 3]));
        assert!(entity.is_config_serialized());
        assert!(entity.config_as::<Magmad>().is_none());

        let entity = entity.with_config(Magmad {
            checkin_interval: 15,
        });
        assert!(!entity.is_config_serialized());
        assert_eq!(entity.config_as::<Magmad>().unwrap().checkin_interval, 15);
    }

    #[test]
    fn one_hop_association_helpers() {
        let mut entity = NetworkEntity::new("gateway", "gw1")
            .with_association(("cellular_gateway", "gw1"))
            .with_association(("wifi_gateway", "gw1"))
            .with_association(("cellular_gateway", "gw2"));
        entity.parent_associations = vec![
            TypeAndKey::new("network_root", "root"),
            TypeAndKey::new("tier", "t1"),
            TypeAndKey::new("tier", "t2"),
        ];

        let children: Vec<_> = entity.children_of_type("cellular_gateway").collect();
        assert_eq!(children.len(), 2);
        assert_eq!(
            entity.first_parent_of_type("tier"),
            Some(&TypeAndKey::new("tier", "t1"))
        );
        assert!(entity.first_parent_of_type("missing").is_none());
    }

    #[test]
    fn write_operation_validation_delegates() {
        let bad = EntityWriteOperation::Create(NetworkEntity::new("", "k"));
        assert!(bad.validate().is_err());
        let good: EntityWriteOperation = EntityUpdateCriteria::new("t", "k").into();
        assert_eq!(good.tk(), TypeAndKey::new("t", "k"));
        assert!(good.validate().is_ok());
    }
}
