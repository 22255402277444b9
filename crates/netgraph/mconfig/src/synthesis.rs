//! Mconfig synthesis: run every builder over one gateway's graph and
//! package the result.

use std::collections::HashMap;
use std::sync::Arc;

use chrono::Utc;
use netgraph_configurator::convert::{graph_from_stored, network_from_stored};
use netgraph_serde::SerdeRegistry;
use netgraph_storage::{StoredGraph, StoredNetwork};
use serde::{Deserialize, Serialize};
use tracing::{debug, info, instrument, warn, Level};

use crate::builder::BuilderRegistry;
use crate::error::{MconfigError, Result};
use crate::message::MconfigMap;

/// The synthesized bundle for one gateway.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GatewayConfigs {
    pub configs_by_key: MconfigMap,
    pub metadata: GatewayConfigsMetadata,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GatewayConfigsMetadata {
    /// Unix seconds.
    pub created_at: i64,
    pub digest: GatewayConfigsDigest,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GatewayConfigsDigest {
    pub md5_hex_digest: String,
}

/// Lowercase hex MD5 of the key-ordered JSON encoding of `configs`.
/// Equal maps always give equal digests.
pub fn digest(configs: &MconfigMap) -> Result<String> {
    let bytes = serde_json::to_vec(configs)
        .map_err(|e| MconfigError::Marshal(format!("encode configs for digest: {}", e)))?;
    Ok(format!("{:x}", md5::compute(bytes)))
}

/// Runs the registered builders.
#[derive(Debug, Clone)]
pub struct MconfigSynthesizer {
    builders: Arc<BuilderRegistry>,
    serdes: Arc<SerdeRegistry>,
}

impl MconfigSynthesizer {
    pub fn new(builders: Arc<BuilderRegistry>, serdes: Arc<SerdeRegistry>) -> Self {
        Self { builders, serdes }
    }

    pub fn builders(&self) -> &Arc<BuilderRegistry> {
        &self.builders
    }

    /// Build the mconfig for `gateway_id` from its stored graph and network.
    ///
    /// Builders run in registration order against one shared map. The first
    /// failure aborts the run and nothing is returned but the error.
    #[instrument(skip(self, graph, network), fields(entities = graph.entities.len()))]
    pub fn create_mconfig(
        &self,
        network_id: &str,
        gateway_id: &str,
        graph: StoredGraph,
        network: StoredNetwork,
    ) -> Result<GatewayConfigs> {
        let graph = graph_from_stored(graph, &self.serdes)?.index();
        let network = network_from_stored(network, &self.serdes)?;

        let mut configs = MconfigMap::new();
        let mut written_by: HashMap<String, String> = HashMap::new();
        let builders = self.builders.read();
        let track_writes = tracing::enabled!(Level::DEBUG);
        for builder in builders.iter() {
            let before = track_writes.then(|| configs.clone());
            if let Err(err) = builder.build(network_id, gateway_id, &graph, &network, &mut configs) {
                warn!(builder = builder.name(), error = %err, "mconfig builder failed");
                return Err(MconfigError::builder(builder.name(), network_id, gateway_id, err));
            }
            if let Some(before) = before {
                log_overwrites(builder.name(), &before, &configs, &mut written_by);
            }
        }
        drop(builders);

        let md5_hex_digest = digest(&configs)?;
        info!(keys = configs.len(), digest = %md5_hex_digest, "mconfig synthesized");
        Ok(GatewayConfigs {
            configs_by_key: configs,
            metadata: GatewayConfigsMetadata {
                created_at: Utc::now().timestamp(),
                digest: GatewayConfigsDigest { md5_hex_digest },
            },
        })
    }
}

/// Record which builder last wrote each key, logging keys taken over from
/// another builder.
fn log_overwrites(
    builder: &str,
    before: &MconfigMap,
    after: &MconfigMap,
    written_by: &mut HashMap<String, String>,
) {
    for (key, value) in after {
        if before.get(key) == Some(value) {
            continue;
        }
        let previous = written_by.insert(key.clone(), builder.to_string());
        if let Some(previous) = previous.filter(|p| p != builder) {
            debug!(
                key = %key,
                previous_builder = %previous,
                builder,
                "mconfig key overwritten by later builder"
            );
        }
    }
}
