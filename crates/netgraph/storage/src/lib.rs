//! netgraph storage contract.
//!
//! This crate defines how the configurator talks to its backing store:
//! - wire/storage types with configs as opaque bytes
//! - the [`ConfiguratorStorageFactory`] / [`ConfiguratorStorage`]
//!   transaction traits
//! - an in-memory transactional engine, [`InMemoryStorageFactory`]
//!
//! A durable engine implements the same traits; nothing above this crate
//! depends on the in-memory one.

#![deny(unsafe_code)]
#![cfg_attr(feature = "strict-docs", warn(missing_docs))]
#![cfg_attr(not(feature = "strict-docs"), allow(missing_docs))]
#![warn(rust_2018_idioms)]

mod config;
mod error;
pub mod memory;
mod model;
mod pagination;
mod traits;

pub use config::StorageConfig;
pub use error::{StorageError, StorageResult};
pub use memory::{InMemoryStorageFactory, InMemoryTransaction};
pub use model::{
    EntityLoadResult, NetworkLoadResult, StoredEntity, StoredEntityUpdate, StoredGraph,
    StoredNetwork, StoredNetworkUpdate, TxOptions,
};
pub use traits::{ConfiguratorStorage, ConfiguratorStorageFactory};
