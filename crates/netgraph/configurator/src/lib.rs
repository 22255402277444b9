//! netgraph configurator: the northbound API.
//!
//! [`Configurator`] is the create/read/update/delete surface over networks
//! and their entity graphs. It sits between callers working with native
//! types (`netgraph-types`) and a transactional storage engine working with
//! bytes (`netgraph-storage`), converting through a [`SerdeRegistry`].
//!
//! ```ignore
//! let serdes = Arc::new(SerdeRegistry::new(module_serdes)?);
//! let config = ConfiguratorConfig::load("configurator.toml")?;
//! let factory = Arc::new(InMemoryStorageFactory::new(config.storage));
//! let configurator = Configurator::new(factory, serdes);
//! ```
//!
//! [`SerdeRegistry`]: netgraph_serde::SerdeRegistry

#![deny(unsafe_code)]
#![cfg_attr(feature = "strict-docs", warn(missing_docs))]
#![cfg_attr(not(feature = "strict-docs"), allow(missing_docs))]
#![warn(rust_2018_idioms)]

mod api;
mod config;
pub mod convert;
mod error;

pub use api::{Configurator, LoadedEntities, LoadedNetworks};
pub use config::ConfiguratorConfig;
pub use error::{ConfiguratorError, Result};
