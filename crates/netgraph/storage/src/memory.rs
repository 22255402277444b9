//! In-memory reference engine.
//!
//! The whole store sits behind one async `RwLock`. A read-only transaction
//! holds a read guard for its lifetime. A read-write transaction holds the
//! write guard and mutates a private working copy, which replaces the
//! committed state on commit and is discarded on rollback or drop. Readers
//! therefore never observe a partially applied transaction.
//!
//! Graph IDs track connected components (edges taken as undirected):
//! - a new entity starts in a fresh graph
//! - an edge across two graphs merges them into the smaller graph ID
//! - removing edges or entities re-splits the affected graph; the part
//!   holding the smallest entity keeps the ID, the others get fresh ones

use std::collections::{BTreeMap, BTreeSet, VecDeque};
use std::ops::Bound;
use std::sync::Arc;

use async_trait::async_trait;
use netgraph_types::{
    dedup_sorted, EntityLoadCriteria, EntityLoadFilter, GraphEdge, NetworkLoadCriteria,
    NetworkLoadFilter, TypeAndKey,
};
use tokio::sync::{OwnedRwLockReadGuard, OwnedRwLockWriteGuard, RwLock};
use tracing::{debug, instrument};
use uuid::Uuid;

use crate::config::StorageConfig;
use crate::model::{
    EntityLoadResult, NetworkLoadResult, StoredEntity, StoredEntityUpdate, StoredGraph,
    StoredNetwork, StoredNetworkUpdate, TxOptions,
};
use crate::pagination::{decode_page_token, encode_page_token};
use crate::traits::{ConfiguratorStorage, ConfiguratorStorageFactory};
use crate::{StorageError, StorageResult};

fn new_graph_id() -> String {
    Uuid::new_v4().to_string()
}

/// Lowest possible identifier, used as a range bound.
fn min_tk() -> TypeAndKey {
    TypeAndKey::new("", "")
}

#[derive(Debug, Clone, Default)]
struct StoreState {
    networks: BTreeMap<String, NetworkRecord>,
}

#[derive(Debug, Clone, Default)]
struct NetworkRecord {
    network: StoredNetwork,
    entities: BTreeMap<TypeAndKey, EntityRecord>,
    edges: BTreeSet<GraphEdge>,
    /// `edges` with every edge flipped.
    reverse_edges: BTreeSet<GraphEdge>,
}

#[derive(Debug, Clone, Default)]
struct EntityRecord {
    name: String,
    description: String,
    physical_id: String,
    config: Vec<u8>,
    graph_id: String,
    version: u64,
}

impl NetworkRecord {
    fn children<'a>(&'a self, tk: &'a TypeAndKey) -> impl Iterator<Item = &'a TypeAndKey> + 'a {
        self.edges
            .range(GraphEdge::new(tk.clone(), min_tk())..)
            .take_while(move |e| e.from == *tk)
            .map(|e| &e.to)
    }

    fn parents<'a>(&'a self, tk: &'a TypeAndKey) -> impl Iterator<Item = &'a TypeAndKey> + 'a {
        self.reverse_edges
            .range(GraphEdge::new(tk.clone(), min_tk())..)
            .take_while(move |e| e.from == *tk)
            .map(|e| &e.to)
    }

    fn add_edge(&mut self, from: &TypeAndKey, to: &TypeAndKey) -> bool {
        self.reverse_edges
            .insert(GraphEdge::new(to.clone(), from.clone()));
        self.edges.insert(GraphEdge::new(from.clone(), to.clone()))
    }

    fn remove_edge(&mut self, from: &TypeAndKey, to: &TypeAndKey) -> bool {
        self.reverse_edges
            .remove(&GraphEdge::new(to.clone(), from.clone()));
        self.edges.remove(&GraphEdge::new(from.clone(), to.clone()))
    }

    fn entity(&self, tk: &TypeAndKey) -> StorageResult<&EntityRecord> {
        self.entities
            .get(tk)
            .ok_or_else(|| StorageError::NotFound(format!("entity {}", tk)))
    }

    /// Every target must exist, except `this`, which is being written.
    fn check_targets(&self, this: &TypeAndKey, targets: &[TypeAndKey]) -> StorageResult<()> {
        match targets
            .iter()
            .find(|tk| *tk != this && !self.entities.contains_key(*tk))
        {
            Some(missing) => Err(StorageError::NotFound(format!(
                "association target {} of {}",
                missing, this
            ))),
            None => Ok(()),
        }
    }

    fn entity_view(
        &self,
        tk: &TypeAndKey,
        record: &EntityRecord,
        criteria: &EntityLoadCriteria,
    ) -> StoredEntity {
        let mut entity = StoredEntity {
            network_id: self.network.id.clone(),
            entity_type: tk.entity_type.clone(),
            key: tk.key.clone(),
            graph_id: record.graph_id.clone(),
            version: record.version,
            ..Default::default()
        };
        if criteria.load_metadata {
            entity.name = record.name.clone();
            entity.description = record.description.clone();
            entity.physical_id = record.physical_id.clone();
        }
        if criteria.load_config {
            entity.config = record.config.clone();
        }
        if criteria.load_assocs_from_this {
            entity.associations = self.children(tk).cloned().collect();
        }
        if criteria.load_assocs_to_this {
            entity.parent_associations = self.parents(tk).cloned().collect();
        }
        entity
    }

    /// Put both endpoints of a new edge into one graph.
    fn merge_graphs(&mut self, from: &TypeAndKey, to: &TypeAndKey) {
        let (Some(a), Some(b)) = (self.entities.get(from), self.entities.get(to)) else {
            return;
        };
        if a.graph_id == b.graph_id {
            return;
        }
        let (keep, absorbed) = if a.graph_id < b.graph_id {
            (a.graph_id.clone(), b.graph_id.clone())
        } else {
            (b.graph_id.clone(), a.graph_id.clone())
        };
        debug!(network_id = %self.network.id, %keep, %absorbed, "merging graphs");
        for record in self.entities.values_mut() {
            if record.graph_id == absorbed {
                record.graph_id = keep.clone();
            }
        }
    }

    /// Recompute the components of `graph_id` after edges went away.
    fn split_graph(&mut self, graph_id: &str) {
        let mut unvisited: BTreeSet<TypeAndKey> = self
            .entities
            .iter()
            .filter(|(_, r)| r.graph_id == graph_id)
            .map(|(tk, _)| tk.clone())
            .collect();

        let mut first = true;
        while let Some(seed) = unvisited.pop_first() {
            let mut component = vec![seed.clone()];
            let mut queue = VecDeque::from([seed]);
            while let Some(tk) = queue.pop_front() {
                let neighbours: Vec<TypeAndKey> =
                    self.children(&tk).chain(self.parents(&tk)).cloned().collect();
                for next in neighbours {
                    if unvisited.remove(&next) {
                        component.push(next.clone());
                        queue.push_back(next);
                    }
                }
            }
            if first {
                first = false;
                continue;
            }
            let fresh = new_graph_id();
            debug!(
                network_id = %self.network.id,
                old = graph_id,
                new = %fresh,
                size = component.len(),
                "splitting graph"
            );
            for tk in component {
                if let Some(record) = self.entities.get_mut(&tk) {
                    record.graph_id = fresh.clone();
                }
            }
        }
    }
}

fn network_view(record: &NetworkRecord, criteria: NetworkLoadCriteria) -> StoredNetwork {
    let stored = &record.network;
    let mut network = StoredNetwork {
        id: stored.id.clone(),
        network_type: stored.network_type.clone(),
        version: stored.version,
        ..Default::default()
    };
    if criteria.load_metadata {
        network.name = stored.name.clone();
        network.description = stored.description.clone();
    }
    if criteria.load_configs {
        network.configs = stored.configs.clone();
    }
    network
}

fn matches_filter(filter: &EntityLoadFilter, tk: &TypeAndKey, record: &EntityRecord) -> bool {
    fn allows(wanted: &Option<String>, actual: &str) -> bool {
        wanted.as_deref().map_or(true, |w| w == actual)
    }
    allows(&filter.type_filter, &tk.entity_type)
        && allows(&filter.key_filter, &tk.key)
        && allows(&filter.graph_id, &record.graph_id)
        && allows(&filter.physical_id, &record.physical_id)
}

/// Factory for transactions over one shared in-memory store.
#[derive(Debug, Clone, Default)]
pub struct InMemoryStorageFactory {
    state: Arc<RwLock<StoreState>>,
    config: StorageConfig,
}

impl InMemoryStorageFactory {
    pub fn new(config: StorageConfig) -> Self {
        Self {
            state: Arc::default(),
            config,
        }
    }

    pub fn config(&self) -> &StorageConfig {
        &self.config
    }
}

#[async_trait]
impl ConfiguratorStorageFactory for InMemoryStorageFactory {
    #[instrument(skip(self))]
    async fn start_transaction(&self, opts: TxOptions) -> StorageResult<Box<dyn ConfiguratorStorage>> {
        let state = if opts.read_only {
            TxState::ReadOnly(Arc::clone(&self.state).read_owned().await)
        } else {
            let guard = Arc::clone(&self.state).write_owned().await;
            let working = guard.clone();
            TxState::ReadWrite { guard, working }
        };
        debug!("transaction started");
        Ok(Box::new(InMemoryTransaction {
            state,
            config: self.config.clone(),
        }))
    }
}

enum TxState {
    ReadOnly(OwnedRwLockReadGuard<StoreState>),
    ReadWrite {
        guard: OwnedRwLockWriteGuard<StoreState>,
        working: StoreState,
    },
}

/// A transaction opened by [`InMemoryStorageFactory`].
pub struct InMemoryTransaction {
    state: TxState,
    config: StorageConfig,
}

impl InMemoryTransaction {
    fn view(&self) -> &StoreState {
        match &self.state {
            TxState::ReadOnly(guard) => &**guard,
            TxState::ReadWrite { working, .. } => working,
        }
    }

    fn view_mut(&mut self) -> StorageResult<&mut StoreState> {
        match &mut self.state {
            TxState::ReadOnly(_) => Err(StorageError::ReadOnly),
            TxState::ReadWrite { working, .. } => Ok(working),
        }
    }

    fn network(&self, network_id: &str) -> StorageResult<&NetworkRecord> {
        self.view()
            .networks
            .get(network_id)
            .ok_or_else(|| StorageError::NotFound(format!("network {}", network_id)))
    }

    fn network_mut(&mut self, network_id: &str) -> StorageResult<&mut NetworkRecord> {
        self.view_mut()?
            .networks
            .get_mut(network_id)
            .ok_or_else(|| StorageError::NotFound(format!("network {}", network_id)))
    }
}

#[async_trait]
impl ConfiguratorStorage for InMemoryTransaction {
    async fn commit(self: Box<Self>) -> StorageResult<()> {
        if let TxState::ReadWrite { mut guard, working } = self.state {
            *guard = working;
            debug!("transaction committed");
        }
        Ok(())
    }

    async fn rollback(self: Box<Self>) -> StorageResult<()> {
        debug!("transaction rolled back");
        Ok(())
    }

    async fn load_networks(
        &mut self,
        filter: &NetworkLoadFilter,
        criteria: NetworkLoadCriteria,
    ) -> StorageResult<NetworkLoadResult> {
        let networks = &self.view().networks;
        let type_ok = |record: &&NetworkRecord| {
            filter
                .type_filter
                .as_deref()
                .map_or(true, |t| t == record.network.network_type)
        };

        let mut result = NetworkLoadResult::default();
        if filter.ids.is_empty() {
            result.networks = networks
                .values()
                .filter(type_ok)
                .map(|record| network_view(record, criteria))
                .collect();
            return Ok(result);
        }

        let ids: BTreeSet<&String> = filter.ids.iter().collect();
        for id in ids {
            match networks.get(id.as_str()) {
                Some(record) => {
                    if type_ok(&record) {
                        result.networks.push(network_view(record, criteria));
                    }
                }
                None => result.networks_not_found.push(id.clone()),
            }
        }
        Ok(result)
    }

    async fn list_network_ids(&mut self) -> StorageResult<Vec<String>> {
        Ok(self.view().networks.keys().cloned().collect())
    }

    async fn create_network(&mut self, network: StoredNetwork) -> StorageResult<StoredNetwork> {
        if network.id.is_empty() {
            return Err(StorageError::InvalidInput("network ID must be non-empty".into()));
        }
        let networks = &mut self.view_mut()?.networks;
        if networks.contains_key(&network.id) {
            return Err(StorageError::AlreadyExists(format!("network {}", network.id)));
        }
        let network = StoredNetwork {
            version: 0,
            ..network
        };
        networks.insert(
            network.id.clone(),
            NetworkRecord {
                network: network.clone(),
                ..Default::default()
            },
        );
        debug!(network_id = %network.id, "network created");
        Ok(network)
    }

    async fn update_networks(&mut self, updates: Vec<StoredNetworkUpdate>) -> StorageResult<()> {
        let networks = &mut self.view_mut()?.networks;
        if let Some(missing) = updates.iter().find(|u| !networks.contains_key(&u.id)) {
            return Err(StorageError::NotFound(format!("network {}", missing.id)));
        }
        for update in updates {
            let Some(record) = networks.get_mut(&update.id) else {
                continue;
            };
            let network = &mut record.network;
            if let Some(network_type) = update.new_type {
                network.network_type = network_type;
            }
            if let Some(name) = update.new_name {
                network.name = name;
            }
            if let Some(description) = update.new_description {
                network.description = description;
            }
            network.configs.extend(update.configs_to_add_or_update);
            for config_type in &update.configs_to_delete {
                network.configs.remove(config_type);
            }
            network.version += 1;
        }
        Ok(())
    }

    async fn delete_networks(&mut self, ids: &[String]) -> StorageResult<()> {
        let networks = &mut self.view_mut()?.networks;
        for id in ids {
            if let Some(record) = networks.remove(id) {
                debug!(network_id = %id, entities = record.entities.len(), "network deleted");
            }
        }
        Ok(())
    }

    async fn load_entities(
        &mut self,
        network_id: &str,
        filter: &EntityLoadFilter,
        criteria: &EntityLoadCriteria,
    ) -> StorageResult<EntityLoadResult> {
        let mut result = EntityLoadResult::default();
        let max = self.config.max_entity_load_size as usize;
        let Some(network) = self.view().networks.get(network_id) else {
            result.entities_not_found = filter.ids.clone();
            dedup_sorted(&mut result.entities_not_found);
            return Ok(result);
        };

        if !filter.ids.is_empty() {
            let mut ids = filter.ids.clone();
            dedup_sorted(&mut ids);
            if ids.len() > max {
                return Err(StorageError::InvalidInput(format!(
                    "cannot load {} entities at once, the limit is {}",
                    ids.len(),
                    max
                )));
            }
            for tk in ids {
                match network.entities.get(&tk) {
                    Some(record) if matches_filter(filter, &tk, record) => {
                        result.entities.push(network.entity_view(&tk, record, criteria));
                    }
                    Some(_) => {}
                    None => result.entities_not_found.push(tk),
                }
            }
            return Ok(result);
        }

        let after = decode_page_token(&criteria.page_token)?;
        let page_size = self.config.effective_page_size(criteria.page_size);
        let lower = match &after {
            Some(tk) => Bound::Excluded(tk),
            None => Bound::Unbounded,
        };
        let mut page: Vec<(&TypeAndKey, &EntityRecord)> = network
            .entities
            .range((lower, Bound::Unbounded))
            .filter(|(tk, record)| matches_filter(filter, tk, record))
            .take(page_size + 1)
            .collect();
        if page.len() > page_size {
            page.truncate(page_size);
            if let Some((last, _)) = page.last() {
                result.next_page_token = encode_page_token(last)?;
            }
        }
        result.entities = page
            .into_iter()
            .map(|(tk, record)| network.entity_view(tk, record, criteria))
            .collect();
        Ok(result)
    }

    async fn create_entity(
        &mut self,
        network_id: &str,
        entity: StoredEntity,
    ) -> StorageResult<StoredEntity> {
        let tk = entity.tk();
        tk.validate()?;
        let network = self.network_mut(network_id)?;
        if network.entities.contains_key(&tk) {
            return Err(StorageError::AlreadyExists(format!("an entity ({})", tk)));
        }
        let mut associations = entity.associations;
        dedup_sorted(&mut associations);
        network.check_targets(&tk, &associations)?;

        network.entities.insert(
            tk.clone(),
            EntityRecord {
                name: entity.name,
                description: entity.description,
                physical_id: entity.physical_id,
                config: entity.config,
                graph_id: new_graph_id(),
                version: 0,
            },
        );
        for to in &associations {
            network.add_edge(&tk, to);
            network.merge_graphs(&tk, to);
        }
        debug!(network_id, entity = %tk, "entity created");

        let record = network.entity(&tk)?;
        Ok(network.entity_view(&tk, record, &EntityLoadCriteria::full()))
    }

    async fn update_entity(
        &mut self,
        network_id: &str,
        update: StoredEntityUpdate,
    ) -> StorageResult<StoredEntity> {
        let tk = update.tk();
        if update.associations_to_set.is_some() && !update.associations_to_add.is_empty() {
            return Err(StorageError::InvalidInput(format!(
                "entity {}: associations to set and to add are mutually exclusive",
                tk
            )));
        }
        if update.delete_config && update.new_config.is_some() {
            return Err(StorageError::InvalidInput(format!(
                "entity {}: new config and config deletion are mutually exclusive",
                tk
            )));
        }
        let network = self.network_mut(network_id)?;
        network.entity(&tk)?;
        let mut additions = update
            .associations_to_set
            .clone()
            .unwrap_or_else(|| update.associations_to_add.clone());
        dedup_sorted(&mut additions);
        network.check_targets(&tk, &additions)?;

        if let Some(record) = network.entities.get_mut(&tk) {
            if let Some(name) = update.new_name {
                record.name = name;
            }
            if let Some(description) = update.new_description {
                record.description = description;
            }
            if let Some(physical_id) = update.new_physical_id {
                record.physical_id = physical_id;
            }
            if update.delete_config {
                record.config.clear();
            } else if let Some(config) = update.new_config {
                record.config = config;
            }
            record.version += 1;
        }

        let mut removed_edges = false;
        if update.associations_to_set.is_some() {
            let current: Vec<TypeAndKey> = network.children(&tk).cloned().collect();
            for to in current.iter().filter(|to| additions.binary_search(to).is_err()) {
                removed_edges |= network.remove_edge(&tk, to);
            }
        }
        let mut added = Vec::new();
        for to in additions {
            if network.add_edge(&tk, &to) {
                added.push(to);
            }
        }
        for to in &update.associations_to_delete {
            removed_edges |= network.remove_edge(&tk, to);
        }

        for to in &added {
            network.merge_graphs(&tk, to);
        }
        if removed_edges {
            let graph_id = network.entity(&tk)?.graph_id.clone();
            network.split_graph(&graph_id);
        }
        debug!(network_id, entity = %tk, added = added.len(), removed_edges, "entity updated");

        let record = network.entity(&tk)?;
        Ok(network.entity_view(&tk, record, &EntityLoadCriteria::full()))
    }

    async fn delete_entities(&mut self, network_id: &str, ids: &[TypeAndKey]) -> StorageResult<()> {
        let network = self.network_mut(network_id)?;
        let mut touched_graphs = BTreeSet::new();
        for tk in ids {
            let Some(record) = network.entities.remove(tk) else {
                continue;
            };
            touched_graphs.insert(record.graph_id);
            let children: Vec<TypeAndKey> = network.children(tk).cloned().collect();
            let parents: Vec<TypeAndKey> = network.parents(tk).cloned().collect();
            for child in &children {
                network.remove_edge(tk, child);
            }
            for parent in &parents {
                network.remove_edge(parent, tk);
            }
            debug!(network_id, entity = %tk, "entity deleted");
        }
        for graph_id in touched_graphs {
            network.split_graph(&graph_id);
        }
        Ok(())
    }

    async fn load_graph_for_entity(
        &mut self,
        network_id: &str,
        tk: &TypeAndKey,
        criteria: &EntityLoadCriteria,
    ) -> StorageResult<StoredGraph> {
        let network = self.network(network_id)?;
        let graph_id = network.entity(tk)?.graph_id.as_str();
        let criteria = EntityLoadCriteria {
            load_assocs_to_this: true,
            load_assocs_from_this: true,
            ..criteria.clone()
        };

        let members: Vec<(&TypeAndKey, &EntityRecord)> = network
            .entities
            .iter()
            .filter(|(_, record)| record.graph_id == graph_id)
            .collect();
        let member_set: BTreeSet<&TypeAndKey> = members.iter().map(|(tk, _)| *tk).collect();

        let entities: Vec<StoredEntity> = members
            .iter()
            .map(|(tk, record)| network.entity_view(tk, record, &criteria))
            .collect();
        let root_entities: Vec<TypeAndKey> = entities
            .iter()
            .filter(|e| e.parent_associations.is_empty())
            .map(StoredEntity::tk)
            .collect();
        if root_entities.is_empty() {
            return Err(StorageError::InvalidInput(format!(
                "graph of {} does not have root nodes because it is a ring",
                tk
            )));
        }
        let edges = network
            .edges
            .iter()
            .filter(|e| member_set.contains(&e.from))
            .cloned()
            .collect();

        Ok(StoredGraph {
            entities,
            root_entities,
            edges,
        })
    }
}
