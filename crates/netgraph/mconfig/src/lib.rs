//! netgraph mconfig: per-gateway config synthesis.
//!
//! Modules of the platform contribute [`MconfigBuilder`]s at startup. For a
//! gateway, [`MconfigSynthesizer::create_mconfig`] runs them all over the
//! gateway's entity graph and its network, collecting their output into one
//! [`GatewayConfigs`] bundle stamped with a content digest. Downstream
//! distribution compares digests to decide whether a gateway is stale.
//!
//! [`MconfigService`] wraps the synthesizer with the storage reads needed to
//! serve one gateway.

#![deny(unsafe_code)]
#![cfg_attr(feature = "strict-docs", warn(missing_docs))]
#![cfg_attr(not(feature = "strict-docs"), allow(missing_docs))]
#![warn(rust_2018_idioms)]

pub mod builder;
pub mod error;
pub mod message;
pub mod service;
pub mod synthesis;

pub use builder::{BuilderRegistry, MconfigBuilder};
pub use error::{MconfigError, Result};
pub use message::{AnyMessage, MconfigMap};
pub use service::MconfigService;
pub use synthesis::{
    digest, GatewayConfigs, GatewayConfigsDigest, GatewayConfigsMetadata, MconfigSynthesizer,
};
