//! Northbound CRUD API.
//!
//! Every call validates its input, opens one storage transaction, converts
//! between native and stored types through the serde registry, and commits.
//! An early return drops the transaction, which rolls it back.
//!
//! Batch loads report misses in their result. Only the single-item wrappers
//! (`load_network`, `load_entity`, `update_entity`, ...) raise
//! [`ConfiguratorError::NotFound`].

use std::sync::Arc;

use netgraph_serde::SerdeRegistry;
use netgraph_storage::{ConfiguratorStorage, ConfiguratorStorageFactory, TxOptions};
use netgraph_types::{
    validate_network_id, EntityGraph, EntityLoadCriteria, EntityLoadFilter, EntityUpdateCriteria,
    EntityWriteOperation, Network, NetworkEntity, NetworkLoadCriteria, NetworkLoadFilter,
    NetworkUpdateCriteria, TypeAndKey,
};
use tracing::{debug, info, instrument};

use crate::convert::{
    entity_from_stored, entity_to_stored, entity_update_to_stored, graph_from_stored,
    network_from_stored, network_to_stored, network_update_to_stored,
};
use crate::error::{ConfiguratorError, Result};

/// Networks found by a batch load, plus the requested ids that were not.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct LoadedNetworks {
    pub networks: Vec<Network>,
    pub not_found: Vec<String>,
}

/// Entities found by a batch load.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct LoadedEntities {
    pub entities: Vec<NetworkEntity>,
    pub not_found: Vec<TypeAndKey>,
    /// Empty on the last page.
    pub next_page_token: String,
}

/// The configurator service.
#[derive(Clone)]
pub struct Configurator {
    factory: Arc<dyn ConfiguratorStorageFactory>,
    serdes: Arc<SerdeRegistry>,
}

impl Configurator {
    pub fn new(factory: Arc<dyn ConfiguratorStorageFactory>, serdes: Arc<SerdeRegistry>) -> Self {
        Self { factory, serdes }
    }

    pub fn serdes(&self) -> &SerdeRegistry {
        &self.serdes
    }

    pub fn storage_factory(&self) -> &Arc<dyn ConfiguratorStorageFactory> {
        &self.factory
    }

    async fn tx(&self, opts: TxOptions) -> Result<Box<dyn ConfiguratorStorage>> {
        self.factory
            .start_transaction(opts)
            .await
            .map_err(ConfiguratorError::storage("start transaction"))
    }

    async fn commit(tx: Box<dyn ConfiguratorStorage>, context: &str) -> Result<()> {
        tx.commit().await.map_err(ConfiguratorError::storage(context))
    }

    // ========== Networks ==========

    #[instrument(skip(self))]
    pub async fn list_network_ids(&self) -> Result<Vec<String>> {
        let mut tx = self.tx(TxOptions::read_only()).await?;
        tx.list_network_ids()
            .await
            .map_err(ConfiguratorError::storage("list network ids"))
    }

    #[instrument(skip(self))]
    pub async fn does_network_exist(&self, network_id: &str) -> Result<bool> {
        let loaded = self
            .load_networks(&[network_id.to_string()], NetworkLoadCriteria::default())
            .await?;
        Ok(loaded.not_found.is_empty())
    }

    #[instrument(skip(self, network), fields(network_id = %network.id))]
    pub async fn create_network(&self, network: Network) -> Result<Network> {
        let mut created = self.create_networks(vec![network]).await?;
        created
            .pop()
            .ok_or_else(|| ConfiguratorError::Validation("no network created".into()))
    }

    /// Create several networks in one transaction.
    #[instrument(skip(self, networks), fields(count = networks.len()))]
    pub async fn create_networks(&self, networks: Vec<Network>) -> Result<Vec<Network>> {
        for network in &networks {
            network.validate()?;
        }
        let mut tx = self.tx(TxOptions::read_write()).await?;
        let mut created = Vec::with_capacity(networks.len());
        for network in &networks {
            let stored = network_to_stored(network, &self.serdes)?;
            let stored = tx
                .create_network(stored)
                .await
                .map_err(ConfiguratorError::storage(format!("create network {}", network.id)))?;
            created.push(network_from_stored(stored, &self.serdes)?);
        }
        Self::commit(tx, "create networks").await?;
        info!(count = created.len(), "networks created");
        Ok(created)
    }

    #[instrument(skip(self, ids), fields(count = ids.len()))]
    pub async fn load_networks(
        &self,
        ids: &[String],
        criteria: NetworkLoadCriteria,
    ) -> Result<LoadedNetworks> {
        if ids.is_empty() {
            return Ok(LoadedNetworks::default());
        }
        let filter = NetworkLoadFilter {
            ids: ids.to_vec(),
            type_filter: None,
        };
        self.load_networks_filtered(&filter, criteria).await
    }

    #[instrument(skip(self))]
    pub async fn load_networks_by_type(
        &self,
        network_type: &str,
        criteria: NetworkLoadCriteria,
    ) -> Result<Vec<Network>> {
        let filter = NetworkLoadFilter {
            ids: Vec::new(),
            type_filter: Some(network_type.to_string()),
        };
        Ok(self.load_networks_filtered(&filter, criteria).await?.networks)
    }

    async fn load_networks_filtered(
        &self,
        filter: &NetworkLoadFilter,
        criteria: NetworkLoadCriteria,
    ) -> Result<LoadedNetworks> {
        let mut tx = self.tx(TxOptions::read_only()).await?;
        let result = tx
            .load_networks(filter, criteria)
            .await
            .map_err(ConfiguratorError::storage("load networks"))?;
        let networks = result
            .networks
            .into_iter()
            .map(|n| network_from_stored(n, &self.serdes))
            .collect::<Result<_>>()?;
        Ok(LoadedNetworks {
            networks,
            not_found: result.networks_not_found,
        })
    }

    #[instrument(skip(self))]
    pub async fn load_network(&self, network_id: &str, criteria: NetworkLoadCriteria) -> Result<Network> {
        let mut loaded = self.load_networks(&[network_id.to_string()], criteria).await?;
        loaded
            .networks
            .pop()
            .ok_or_else(|| ConfiguratorError::NotFound(format!("network {}", network_id)))
    }

    /// Apply updates to several networks in one transaction.
    #[instrument(skip(self, updates), fields(count = updates.len()))]
    pub async fn update_networks(&self, updates: Vec<NetworkUpdateCriteria>) -> Result<()> {
        for update in &updates {
            update.validate()?;
        }
        let stored = updates
            .iter()
            .map(|u| network_update_to_stored(u, &self.serdes))
            .collect::<Result<Vec<_>>>()?;
        let mut tx = self.tx(TxOptions::read_write()).await?;
        tx.update_networks(stored)
            .await
            .map_err(ConfiguratorError::storage("update networks"))?;
        Self::commit(tx, "update networks").await
    }

    #[instrument(skip(self, ids), fields(count = ids.len()))]
    pub async fn delete_networks(&self, ids: &[String]) -> Result<()> {
        let mut tx = self.tx(TxOptions::read_write()).await?;
        tx.delete_networks(ids)
            .await
            .map_err(ConfiguratorError::storage("delete networks"))?;
        Self::commit(tx, "delete networks").await?;
        info!(count = ids.len(), "networks deleted");
        Ok(())
    }

    pub async fn delete_network(&self, network_id: &str) -> Result<()> {
        self.delete_networks(&[network_id.to_string()]).await
    }

    // ========== Entities ==========

    /// Create entities in order, in one transaction.
    #[instrument(skip(self, entities), fields(count = entities.len()))]
    pub async fn create_entities(
        &self,
        network_id: &str,
        entities: Vec<NetworkEntity>,
    ) -> Result<Vec<NetworkEntity>> {
        validate_network_id(network_id)?;
        for entity in &entities {
            entity.validate()?;
        }
        let mut tx = self.tx(TxOptions::read_write()).await?;
        let mut created = Vec::with_capacity(entities.len());
        for entity in &entities {
            created.push(self.create_in_tx(tx.as_mut(), network_id, entity).await?);
        }
        Self::commit(tx, "create entities").await?;
        Ok(created)
    }

    #[instrument(skip(self, entity), fields(entity = %entity.tk()))]
    pub async fn create_entity(&self, network_id: &str, entity: NetworkEntity) -> Result<NetworkEntity> {
        let mut created = self.create_entities(network_id, vec![entity]).await?;
        created
            .pop()
            .ok_or_else(|| ConfiguratorError::Validation("no entity created".into()))
    }

    async fn create_in_tx(
        &self,
        tx: &mut dyn ConfiguratorStorage,
        network_id: &str,
        entity: &NetworkEntity,
    ) -> Result<NetworkEntity> {
        let stored = entity_to_stored(entity, &self.serdes)?;
        let created = tx
            .create_entity(network_id, stored)
            .await
            .map_err(ConfiguratorError::storage(format!(
                "create entity {} in network {}",
                entity.tk(),
                network_id
            )))?;
        entity_from_stored(created, &self.serdes)
    }

    async fn update_in_tx(
        &self,
        tx: &mut dyn ConfiguratorStorage,
        network_id: &str,
        update: &EntityUpdateCriteria,
    ) -> Result<NetworkEntity> {
        let stored = entity_update_to_stored(update, &self.serdes)?;
        let updated = tx
            .update_entity(network_id, stored)
            .await
            .map_err(ConfiguratorError::storage(format!(
                "update entity {} in network {}",
                update.tk(),
                network_id
            )))?;
        entity_from_stored(updated, &self.serdes)
    }

    /// Apply updates in order, in one transaction. A missing target fails
    /// the whole batch.
    #[instrument(skip(self, updates), fields(count = updates.len()))]
    pub async fn update_entities(
        &self,
        network_id: &str,
        updates: Vec<EntityUpdateCriteria>,
    ) -> Result<Vec<NetworkEntity>> {
        validate_network_id(network_id)?;
        for update in &updates {
            update.validate()?;
        }
        let mut tx = self.tx(TxOptions::read_write()).await?;
        let mut updated = Vec::with_capacity(updates.len());
        for update in &updates {
            updated.push(self.update_in_tx(tx.as_mut(), network_id, update).await?);
        }
        Self::commit(tx, "update entities").await?;
        Ok(updated)
    }

    #[instrument(skip(self, update), fields(entity = %update.tk()))]
    pub async fn update_entity(
        &self,
        network_id: &str,
        update: EntityUpdateCriteria,
    ) -> Result<NetworkEntity> {
        let mut updated = self.update_entities(network_id, vec![update]).await?;
        updated
            .pop()
            .ok_or_else(|| ConfiguratorError::Validation("no entity updated".into()))
    }

    /// Run a mix of creates and updates as one all-or-nothing transaction.
    ///
    /// Every operation is validated before storage is touched; if any
    /// operation then fails, none of them take effect.
    #[instrument(skip(self, ops), fields(count = ops.len()))]
    pub async fn write_entities(&self, network_id: &str, ops: Vec<EntityWriteOperation>) -> Result<()> {
        validate_network_id(network_id)?;
        for op in &ops {
            op.validate()?;
        }
        let mut tx = self.tx(TxOptions::read_write()).await?;
        for (idx, op) in ops.iter().enumerate() {
            debug!(idx, entity = %op.tk(), "applying write operation");
            match op {
                EntityWriteOperation::Create(entity) => {
                    self.create_in_tx(tx.as_mut(), network_id, entity).await?;
                }
                EntityWriteOperation::Update(update) => {
                    self.update_in_tx(tx.as_mut(), network_id, update).await?;
                }
            }
        }
        Self::commit(tx, "write entities").await
    }

    #[instrument(skip(self, ids), fields(count = ids.len()))]
    pub async fn delete_entities(&self, network_id: &str, ids: &[TypeAndKey]) -> Result<()> {
        validate_network_id(network_id)?;
        for tk in ids {
            tk.validate()?;
        }
        let mut tx = self.tx(TxOptions::read_write()).await?;
        tx.delete_entities(network_id, ids)
            .await
            .map_err(ConfiguratorError::storage(format!("delete entities in network {}", network_id)))?;
        Self::commit(tx, "delete entities").await
    }

    pub async fn delete_entity(&self, network_id: &str, tk: &TypeAndKey) -> Result<()> {
        self.delete_entities(network_id, std::slice::from_ref(tk)).await
    }

    /// Load entities matching `filter`.
    #[instrument(skip(self, filter, criteria))]
    pub async fn load_entities(
        &self,
        network_id: &str,
        filter: &EntityLoadFilter,
        criteria: &EntityLoadCriteria,
    ) -> Result<LoadedEntities> {
        validate_network_id(network_id)?;
        let mut tx = self.tx(TxOptions::read_only()).await?;
        let result = tx
            .load_entities(network_id, filter, criteria)
            .await
            .map_err(ConfiguratorError::storage(format!("load entities in network {}", network_id)))?;
        let entities = result
            .entities
            .into_iter()
            .map(|e| entity_from_stored(e, &self.serdes))
            .collect::<Result<_>>()?;
        Ok(LoadedEntities {
            entities,
            not_found: result.entities_not_found,
            next_page_token: result.next_page_token,
        })
    }

    #[instrument(skip(self, criteria), fields(entity = %tk))]
    pub async fn load_entity(
        &self,
        network_id: &str,
        tk: &TypeAndKey,
        criteria: &EntityLoadCriteria,
    ) -> Result<NetworkEntity> {
        tk.validate()?;
        let filter = EntityLoadFilter::of_ids(vec![tk.clone()]);
        let mut loaded = self.load_entities(network_id, &filter, criteria).await?;
        loaded.entities.pop().ok_or_else(|| {
            ConfiguratorError::NotFound(format!("entity {} in network {}", tk, network_id))
        })
    }

    /// One page of the entities of a type; pass the returned token back to
    /// continue.
    pub async fn load_all_entities_of_type(
        &self,
        network_id: &str,
        entity_type: &str,
        criteria: &EntityLoadCriteria,
    ) -> Result<(Vec<NetworkEntity>, String)> {
        let loaded = self
            .load_entities(network_id, &EntityLoadFilter::of_type(entity_type), criteria)
            .await?;
        Ok((loaded.entities, loaded.next_page_token))
    }

    /// First entity carrying `physical_id`.
    pub async fn load_entity_for_physical_id(
        &self,
        network_id: &str,
        physical_id: &str,
        criteria: &EntityLoadCriteria,
    ) -> Result<NetworkEntity> {
        let criteria = EntityLoadCriteria {
            page_size: 1,
            page_token: String::new(),
            ..criteria.clone()
        };
        let loaded = self
            .load_entities(network_id, &EntityLoadFilter::of_physical_id(physical_id), &criteria)
            .await?;
        loaded.entities.into_iter().next().ok_or_else(|| {
            ConfiguratorError::NotFound(format!(
                "entity with physical ID {} in network {}",
                physical_id, network_id
            ))
        })
    }

    pub async fn does_entity_exist(&self, network_id: &str, tk: &TypeAndKey) -> Result<bool> {
        match self.load_entity(network_id, tk, &EntityLoadCriteria::default()).await {
            Ok(_) => Ok(true),
            Err(err) if err.is_not_found() => Ok(false),
            Err(err) => Err(err),
        }
    }

    /// Every key of `entity_type`, sorted, following all pages.
    #[instrument(skip(self))]
    pub async fn list_entity_keys(&self, network_id: &str, entity_type: &str) -> Result<Vec<String>> {
        let mut keys = Vec::new();
        let mut criteria = EntityLoadCriteria::default();
        loop {
            let (entities, next) = self
                .load_all_entities_of_type(network_id, entity_type, &criteria)
                .await?;
            keys.extend(entities.into_iter().map(|e| e.key));
            if next.is_empty() {
                return Ok(keys);
            }
            criteria.page_token = next;
        }
    }

    /// The full connected graph containing `tk`, with edges checked against
    /// the entities' associations.
    #[instrument(skip(self, criteria), fields(entity = %tk))]
    pub async fn load_graph_for_entity(
        &self,
        network_id: &str,
        tk: &TypeAndKey,
        criteria: &EntityLoadCriteria,
    ) -> Result<EntityGraph> {
        validate_network_id(network_id)?;
        tk.validate()?;
        let mut tx = self.tx(TxOptions::read_only()).await?;
        let stored = tx
            .load_graph_for_entity(network_id, tk, criteria)
            .await
            .map_err(ConfiguratorError::storage(format!(
                "load graph for entity {} in network {}",
                tk, network_id
            )))?;
        graph_from_stored(stored, &self.serdes)
    }
}
