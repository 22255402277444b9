//! netgraph native data model.
//!
//! This crate holds the in-process representation of the configuration
//! control plane's data:
//! - [`Network`]: one tenant partition with its typed configs
//! - [`NetworkEntity`]: a graph vertex addressed by [`TypeAndKey`]
//! - [`EntityGraph`]: a loaded snapshot of vertices and edges
//! - [`IndexedGraph`]: the same snapshot with traversal indexes built
//!
//! Config payloads are type-erased ([`ConfigValue`]); turning them into
//! bytes is the job of `netgraph-serde`.

#![deny(unsafe_code)]
#![cfg_attr(feature = "strict-docs", warn(missing_docs))]
#![cfg_attr(not(feature = "strict-docs"), allow(missing_docs))]
#![warn(rust_2018_idioms)]

pub mod config_value;
pub mod entity;
pub mod error;
pub mod graph;
pub mod ids;
pub mod network;

pub use config_value::{ConfigPayload, ConfigValue};
pub use entity::{
    EntityConfig, EntityLoadCriteria, EntityLoadFilter, EntityUpdateCriteria,
    EntityWriteOperation, NetworkEntity, NetworkLoadCriteria, NetworkLoadFilter,
};
pub use error::{GraphError, Result};
pub use graph::{EntityGraph, GraphEdge, IndexedGraph};
pub use ids::{dedup_sorted, validate_network_id, TypeAndKey};
pub use network::{Network, NetworkUpdateCriteria};
