//! netgraph serde registry.
//!
//! Network and entity configs are stored as bytes. Which code turns a config
//! into bytes is decided at runtime by looking up a [`Serde`] under
//! `(domain, type)`: [`NETWORK_CONFIG_DOMAIN`] keys serdes by config name,
//! [`ENTITY_CONFIG_DOMAIN`] by entity type.
//!
//! Two registries are provided:
//! - [`SerdeRegistry`]: immutable, built once while wiring the process and
//!   passed to the request paths
//! - [`SharedSerdeRegistry`]: mutable and domain-sharded, for initializers
//!   that register concurrently; request paths use its snapshots

#![deny(unsafe_code)]
#![cfg_attr(feature = "strict-docs", warn(missing_docs))]
#![cfg_attr(not(feature = "strict-docs"), allow(missing_docs))]
#![warn(rust_2018_idioms)]

pub mod codec;
pub mod error;
pub mod registry;
pub mod shared;

pub use codec::{JsonSerde, Serde, ENTITY_CONFIG_DOMAIN, NETWORK_CONFIG_DOMAIN};
pub use error::{Result, SerdeError};
pub use registry::{deserialize, serialize, SerdeRegistry};
pub use shared::SharedSerdeRegistry;
