//! Gateway-level synthesis over a storage engine.

use std::sync::Arc;

use netgraph_storage::{ConfiguratorStorageFactory, StorageError, TxOptions};
use netgraph_types::{EntityLoadCriteria, NetworkLoadCriteria, NetworkLoadFilter, TypeAndKey};
use tracing::instrument;

use crate::error::{MconfigError, Result};
use crate::synthesis::{GatewayConfigs, MconfigSynthesizer};

/// Loads a gateway's inputs in one read-only transaction and synthesizes
/// its mconfig.
#[derive(Clone)]
pub struct MconfigService {
    factory: Arc<dyn ConfiguratorStorageFactory>,
    synthesizer: MconfigSynthesizer,
}

impl MconfigService {
    pub fn new(factory: Arc<dyn ConfiguratorStorageFactory>, synthesizer: MconfigSynthesizer) -> Self {
        Self {
            factory,
            synthesizer,
        }
    }

    pub fn synthesizer(&self) -> &MconfigSynthesizer {
        &self.synthesizer
    }

    /// Synthesize the mconfig of `gateway`. The gateway ID handed to
    /// builders is the gateway entity's key.
    #[instrument(skip(self), fields(gateway = %gateway))]
    pub async fn synthesize_for_gateway(
        &self,
        network_id: &str,
        gateway: &TypeAndKey,
    ) -> Result<GatewayConfigs> {
        let mut tx = self
            .factory
            .start_transaction(TxOptions::read_only())
            .await
            .map_err(MconfigError::load("transaction"))?;

        let filter = NetworkLoadFilter {
            ids: vec![network_id.to_string()],
            type_filter: None,
        };
        let network = tx
            .load_networks(&filter, NetworkLoadCriteria::full())
            .await
            .map_err(MconfigError::load(format!("network {}", network_id)))?
            .networks
            .pop()
            .ok_or_else(|| MconfigError::Load {
                context: format!("network {}", network_id),
                source: StorageError::NotFound(format!("network {}", network_id)),
            })?;

        let graph = tx
            .load_graph_for_entity(network_id, gateway, &EntityLoadCriteria::full())
            .await
            .map_err(MconfigError::load(format!("graph of {} in network {}", gateway, network_id)))?;
        tx.commit().await.map_err(MconfigError::load("commit"))?;

        self.synthesizer
            .create_mconfig(network_id, &gateway.key, graph, network)
    }
}
