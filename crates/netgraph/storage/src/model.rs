//! Wire/storage representation of the entity graph.
//!
//! Configs are opaque bytes here. An empty entity config means "no config".

use std::collections::BTreeMap;

use netgraph_types::{GraphEdge, TypeAndKey};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct StoredNetwork {
    pub id: String,
    #[serde(rename = "type")]
    pub network_type: String,
    pub name: String,
    pub description: String,
    /// Config type name to serialized config.
    pub configs: BTreeMap<String, Vec<u8>>,
    pub version: u64,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct StoredEntity {
    pub network_id: String,
    #[serde(rename = "type")]
    pub entity_type: String,
    pub key: String,
    pub name: String,
    pub description: String,
    pub physical_id: String,
    pub config: Vec<u8>,
    pub graph_id: String,
    pub associations: Vec<TypeAndKey>,
    pub parent_associations: Vec<TypeAndKey>,
    pub version: u64,
}

impl StoredEntity {
    pub fn tk(&self) -> TypeAndKey {
        TypeAndKey::new(self.entity_type.clone(), self.key.clone())
    }
}

/// One connected component of a network's entities.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct StoredGraph {
    pub entities: Vec<StoredEntity>,
    pub root_entities: Vec<TypeAndKey>,
    pub edges: Vec<GraphEdge>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct StoredNetworkUpdate {
    pub id: String,
    pub new_type: Option<String>,
    pub new_name: Option<String>,
    pub new_description: Option<String>,
    pub configs_to_add_or_update: BTreeMap<String, Vec<u8>>,
    pub configs_to_delete: Vec<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct StoredEntityUpdate {
    #[serde(rename = "type")]
    pub entity_type: String,
    pub key: String,
    pub new_name: Option<String>,
    pub new_description: Option<String>,
    pub new_physical_id: Option<String>,
    pub new_config: Option<Vec<u8>>,
    pub delete_config: bool,
    pub associations_to_set: Option<Vec<TypeAndKey>>,
    pub associations_to_add: Vec<TypeAndKey>,
    pub associations_to_delete: Vec<TypeAndKey>,
}

impl StoredEntityUpdate {
    pub fn tk(&self) -> TypeAndKey {
        TypeAndKey::new(self.entity_type.clone(), self.key.clone())
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct NetworkLoadResult {
    pub networks: Vec<StoredNetwork>,
    pub networks_not_found: Vec<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct EntityLoadResult {
    pub entities: Vec<StoredEntity>,
    pub entities_not_found: Vec<TypeAndKey>,
    /// Empty on the last page.
    pub next_page_token: String,
}

/// Options for opening a transaction.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct TxOptions {
    pub read_only: bool,
}

impl TxOptions {
    pub fn read_only() -> Self {
        Self { read_only: true }
    }

    pub fn read_write() -> Self {
        Self { read_only: false }
    }
}
