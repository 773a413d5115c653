//! Phantasma Link Library
//!
//! Async client for Phantasma ledger nodes:
//!
//! - `rpc` - JSON-RPC 2.0 transport over HTTP and response classification
//! - `decode` / `models` - typed records decoded from response nodes
//! - `api` - one async operation per remote method
//! - `workflow` - sign, submit and confirm transactions
//! - `cache` / `registry` - local state reconciled from the node
//!
//! Signing keys and the ledger's binary formats are not handled here. An
//! application plugs them in through [`signing::TransactionSigner`],
//! [`codec::EventCodec`] and [`codec::AssetCodec`].
//!
//! # Usage
//!
//! ```ignore
//! use phantasma_link::api::PhantasmaApi;
//! use phantasma_link::config::ClientConfig;
//!
//! let config = ClientConfig::load()?;
//! let api = PhantasmaApi::new(config.http_transport()?);
//! let height = api.get_block_height("main").await?;
//! ```

pub mod api;
pub mod cache;
pub mod codec;
pub mod config;
pub mod decode;
pub mod error;
pub mod events;
pub mod keys;
pub mod models;
pub mod registry;
pub mod rpc;
pub mod script;
pub mod signing;
pub mod workflow;

pub use api::{ApiError, PhantasmaApi};
pub use error::ErrorKind;
