//! Native <-> storage conversions.
//!
//! Network configs go through the serde registry under
//! [`NETWORK_CONFIG_DOMAIN`], keyed by config name. Entity configs go through
//! [`ENTITY_CONFIG_DOMAIN`], keyed by entity type. On read, an entity whose
//! type has no serde keeps its bytes ([`EntityConfig::Serialized`]); a serde
//! that exists but fails is an error, as is any network config failure.

use std::collections::{BTreeMap, HashMap};

use netgraph_serde::{deserialize, serialize, SerdeRegistry, ENTITY_CONFIG_DOMAIN, NETWORK_CONFIG_DOMAIN};
use netgraph_storage::{
    StoredEntity, StoredEntityUpdate, StoredGraph, StoredNetwork, StoredNetworkUpdate,
};
use netgraph_types::{
    EntityConfig, EntityGraph, EntityUpdateCriteria, Network, NetworkEntity, NetworkUpdateCriteria,
};
use tracing::trace;

use crate::error::Result;

pub fn network_to_stored(network: &Network, serdes: &SerdeRegistry) -> Result<StoredNetwork> {
    let mut configs = BTreeMap::new();
    for (config_type, value) in &network.configs {
        let bytes = serialize(value, NETWORK_CONFIG_DOMAIN, config_type, serdes)?;
        configs.insert(config_type.clone(), bytes);
    }
    Ok(StoredNetwork {
        id: network.id.clone(),
        network_type: network.network_type.clone(),
        name: network.name.clone(),
        description: network.description.clone(),
        configs,
        version: network.version,
    })
}

pub fn network_from_stored(stored: StoredNetwork, serdes: &SerdeRegistry) -> Result<Network> {
    let mut configs = HashMap::with_capacity(stored.configs.len());
    for (config_type, bytes) in stored.configs {
        if let Some(value) = deserialize(&bytes, NETWORK_CONFIG_DOMAIN, &config_type, serdes)? {
            configs.insert(config_type, value);
        }
    }
    Ok(Network {
        id: stored.id,
        network_type: stored.network_type,
        name: stored.name,
        description: stored.description,
        configs,
        version: stored.version,
    })
}

pub fn network_update_to_stored(
    update: &NetworkUpdateCriteria,
    serdes: &SerdeRegistry,
) -> Result<StoredNetworkUpdate> {
    let mut configs_to_add_or_update = BTreeMap::new();
    for (config_type, value) in &update.configs_to_add_or_update {
        let bytes = serialize(value, NETWORK_CONFIG_DOMAIN, config_type, serdes)?;
        configs_to_add_or_update.insert(config_type.clone(), bytes);
    }
    Ok(StoredNetworkUpdate {
        id: update.id.clone(),
        new_type: update.new_type.clone(),
        new_name: update.new_name.clone(),
        new_description: update.new_description.clone(),
        configs_to_add_or_update,
        configs_to_delete: update.configs_to_delete.clone(),
    })
}

fn entity_config_to_bytes(
    entity_type: &str,
    config: Option<&EntityConfig>,
    serdes: &SerdeRegistry,
) -> Result<Vec<u8>> {
    match config {
        None => Ok(Vec::new()),
        Some(EntityConfig::Serialized(bytes)) => Ok(bytes.clone()),
        Some(EntityConfig::Value(value)) => {
            Ok(serialize(value, ENTITY_CONFIG_DOMAIN, entity_type, serdes)?)
        }
    }
}

fn entity_config_from_bytes(
    entity_type: &str,
    bytes: Vec<u8>,
    serdes: &SerdeRegistry,
) -> Result<Option<EntityConfig>> {
    if bytes.is_empty() {
        return Ok(None);
    }
    if !serdes.contains(ENTITY_CONFIG_DOMAIN, entity_type) {
        trace!(entity_type, "no serde for entity type, keeping config serialized");
        return Ok(Some(EntityConfig::Serialized(bytes)));
    }
    Ok(deserialize(&bytes, ENTITY_CONFIG_DOMAIN, entity_type, serdes)?.map(EntityConfig::Value))
}

pub fn entity_to_stored(entity: &NetworkEntity, serdes: &SerdeRegistry) -> Result<StoredEntity> {
    Ok(StoredEntity {
        network_id: entity.network_id.clone(),
        entity_type: entity.entity_type.clone(),
        key: entity.key.clone(),
        name: entity.name.clone(),
        description: entity.description.clone(),
        physical_id: entity.physical_id.clone(),
        config: entity_config_to_bytes(&entity.entity_type, entity.config.as_ref(), serdes)?,
        graph_id: entity.graph_id.clone(),
        associations: entity.associations.clone(),
        parent_associations: entity.parent_associations.clone(),
        version: entity.version,
    })
}

pub fn entity_from_stored(stored: StoredEntity, serdes: &SerdeRegistry) -> Result<NetworkEntity> {
    let config = entity_config_from_bytes(&stored.entity_type, stored.config, serdes)?;
    Ok(NetworkEntity {
        network_id: stored.network_id,
        entity_type: stored.entity_type,
        key: stored.key,
        name: stored.name,
        description: stored.description,
        physical_id: stored.physical_id,
        config,
        graph_id: stored.graph_id,
        associations: stored.associations,
        parent_associations: stored.parent_associations,
        version: stored.version,
    })
}

pub fn entity_update_to_stored(
    update: &EntityUpdateCriteria,
    serdes: &SerdeRegistry,
) -> Result<StoredEntityUpdate> {
    let new_config = match &update.new_config {
        Some(config) => Some(entity_config_to_bytes(&update.entity_type, Some(config), serdes)?),
        None => None,
    };
    Ok(StoredEntityUpdate {
        entity_type: update.entity_type.clone(),
        key: update.key.clone(),
        new_name: update.new_name.clone(),
        new_description: update.new_description.clone(),
        new_physical_id: update.new_physical_id.clone(),
        new_config,
        delete_config: update.delete_config,
        associations_to_set: update.associations_to_set.clone(),
        associations_to_add: update.associations_to_add.clone(),
        associations_to_delete: update.associations_to_delete.clone(),
    })
}

pub fn graph_to_stored(graph: &EntityGraph, serdes: &SerdeRegistry) -> Result<StoredGraph> {
    Ok(StoredGraph {
        entities: graph
            .entities
            .iter()
            .map(|e| entity_to_stored(e, serdes))
            .collect::<Result<_>>()?,
        root_entities: graph.root_entities.clone(),
        edges: graph.edges.clone(),
    })
}

/// Convert a loaded graph and check that its edges agree with the entities'
/// association lists.
pub fn graph_from_stored(stored: StoredGraph, serdes: &SerdeRegistry) -> Result<EntityGraph> {
    let graph = EntityGraph {
        entities: stored
            .entities
            .into_iter()
            .map(|e| entity_from_stored(e, serdes))
            .collect::<Result<_>>()?,
        root_entities: stored.root_entities,
        edges: stored.edges,
    };
    graph.validate_edges()?;
    Ok(graph)
}

#[cfg(test)]
mod tests {
    use super::*;
    use netgraph_serde::{JsonSerde, Serde, SerdeError};
    use netgraph_types::{GraphEdge, TypeAndKey};
    use serde::{Deserialize, Serialize};
    use std::sync::Arc;

    use crate::error::ConfiguratorError;

    #[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
    struct Dns {
        domain: String,
    }

    #[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
    struct Magmad {
        checkin_interval: u32,
    }

    fn registry() -> SerdeRegistry {
        SerdeRegistry::new(vec![
            Arc::new(JsonSerde::<Dns>::network_config("dns")) as Arc<dyn Serde>,
            Arc::new(JsonSerde::<Magmad>::entity_config("gateway")),
        ])
        .unwrap()
    }

    #[test]
    fn network_round_trip() {
        let serdes = registry();
        let network = Network::new("n1")
            .with_type("lte")
            .with_name("Network 1")
            .with_config("dns", Dns {
                domain: "example.org".into(),
            });
        let stored = network_to_stored(&network, &serdes).unwrap();
        assert!(stored.configs.contains_key("dns"));
        assert_eq!(network_from_stored(stored, &serdes).unwrap(), network);
    }

    #[test]
    fn unknown_network_config_fails_the_load() {
        let mut stored = StoredNetwork {
            id: "n1".into(),
            ..Default::default()
        };
        stored.configs.insert("cellular".into(), b"{}".to_vec());
        stored.configs.insert("empty".into(), Vec::new());
        let err = network_from_stored(stored, &registry()).unwrap_err();
        assert!(matches!(err, ConfiguratorError::Serde(SerdeError::NotFound { .. })));
    }

    #[test]
    fn entity_without_serde_keeps_bytes() {
        let stored = StoredEntity {
            entity_type: "wifi_mesh".into(),
            key: "m1".into(),
            config: b"\x01\x02".to_vec(),
            ..Default::default()
        };
        let entity = entity_from_stored(stored.clone(), &registry()).unwrap();
        assert_eq!(entity.config, Some(EntityConfig::Serialized(b"\x01\x02".to_vec())));
        // bytes go back out untouched
        assert_eq!(entity_to_stored(&entity, &registry()).unwrap(), stored);
    }

    #[test]
    fn failing_entity_serde_is_a_hard_error() {
        let stored = StoredEntity {
            entity_type: "gateway".into(),
            key: "gw1".into(),
            config: b"not json".to_vec(),
            ..Default::default()
        };
        let err = entity_from_stored(stored, &registry()).unwrap_err();
        assert!(matches!(err, ConfiguratorError::Serde(SerdeError::Deserialize { .. })));
    }

    #[test]
    fn entity_round_trip_with_native_config() {
        let serdes = registry();
        let entity = NetworkEntity::new("gateway", "gw1").with_config(Magmad {
            checkin_interval: 60,
        });
        let back = entity_from_stored(entity_to_stored(&entity, &serdes).unwrap(), &serdes).unwrap();
        assert_eq!(back.config_as::<Magmad>().unwrap().checkin_interval, 60);
        assert!(!back.is_config_serialized());
    }

    #[test]
    fn graph_conversion_checks_edges() {
        let serdes = registry();
        let mut gateway = StoredEntity {
            entity_type: "gateway".into(),
            key: "gw1".into(),
            ..Default::default()
        };
        let cell = StoredEntity {
            entity_type: "cell".into(),
            key: "c1".into(),
            parent_associations: vec![TypeAndKey::new("gateway", "gw1")],
            ..Default::default()
        };
        let stored = StoredGraph {
            entities: vec![gateway.clone(), cell.clone()],
            root_entities: vec![gateway.tk()],
            edges: vec![GraphEdge::new(gateway.tk(), cell.tk())],
        };
        // gateway does not list the edge in its associations
        assert!(matches!(
            graph_from_stored(stored.clone(), &serdes),
            Err(ConfiguratorError::Graph(_))
        ));

        gateway.associations.push(cell.tk());
        let stored = StoredGraph {
            entities: vec![gateway, cell],
            ..stored
        };
        let graph = graph_from_stored(stored.clone(), &serdes).unwrap();
        assert_eq!(graph_to_stored(&graph, &serdes).unwrap(), stored);
    }
}
