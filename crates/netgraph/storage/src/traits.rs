use async_trait::async_trait;
use netgraph_types::{
    EntityLoadCriteria, EntityLoadFilter, NetworkLoadCriteria, NetworkLoadFilter, TypeAndKey,
};

use crate::model::{
    EntityLoadResult, NetworkLoadResult, StoredEntity, StoredEntityUpdate, StoredGraph,
    StoredNetwork, StoredNetworkUpdate, TxOptions,
};
use crate::StorageResult;

/// Opens transactions against a storage engine.
#[async_trait]
pub trait ConfiguratorStorageFactory: Send + Sync {
    async fn start_transaction(&self, opts: TxOptions) -> StorageResult<Box<dyn ConfiguratorStorage>>;
}

/// One open transaction.
///
/// Dropping a transaction without committing rolls it back. Every operation
/// is atomic on its own: when it returns an error, the transaction holds no
/// trace of it.
#[async_trait]
pub trait ConfiguratorStorage: Send {
    async fn commit(self: Box<Self>) -> StorageResult<()>;

    async fn rollback(self: Box<Self>) -> StorageResult<()>;

    /// Load networks by id (misses are reported) or by type.
    async fn load_networks(
        &mut self,
        filter: &NetworkLoadFilter,
        criteria: NetworkLoadCriteria,
    ) -> StorageResult<NetworkLoadResult>;

    /// All network ids, sorted.
    async fn list_network_ids(&mut self) -> StorageResult<Vec<String>>;

    async fn create_network(&mut self, network: StoredNetwork) -> StorageResult<StoredNetwork>;

    async fn update_networks(&mut self, updates: Vec<StoredNetworkUpdate>) -> StorageResult<()>;

    /// Delete networks together with their entities. Missing ids are ignored.
    async fn delete_networks(&mut self, ids: &[String]) -> StorageResult<()>;

    /// Load entities, sorted by type and key. Explicit ids are never paged;
    /// everything else is.
    async fn load_entities(
        &mut self,
        network_id: &str,
        filter: &EntityLoadFilter,
        criteria: &EntityLoadCriteria,
    ) -> StorageResult<EntityLoadResult>;

    async fn create_entity(
        &mut self,
        network_id: &str,
        entity: StoredEntity,
    ) -> StorageResult<StoredEntity>;

    async fn update_entity(
        &mut self,
        network_id: &str,
        update: StoredEntityUpdate,
    ) -> StorageResult<StoredEntity>;

    /// Delete entities and their incident edges. Missing ids are ignored.
    async fn delete_entities(&mut self, network_id: &str, ids: &[TypeAndKey]) -> StorageResult<()>;

    /// The connected component containing `tk`.
    async fn load_graph_for_entity(
        &mut self,
        network_id: &str,
        tk: &TypeAndKey,
        criteria: &EntityLoadCriteria,
    ) -> StorageResult<StoredGraph>;
}
