//! JSON-RPC transport for talking to a Phantasma node.
//!
//! This module owns the wire boundary: building the request envelope,
//! performing one HTTP round trip and classifying what came back.
//!
//! # Architecture
//!
//! ```text
//! ┌─────────────────┐          HTTP POST           ┌─────────────────────┐
//! │  PhantasmaApi   │  ◄──────────────────────────►│   Phantasma node    │
//! │ (HttpTransport) │       JSON-RPC 2.0 body      │      /rpc           │
//! └─────────────────┘                              └─────────────────────┘
//! ```
//!
//! # Protocol
//!
//! Every request uses the same envelope with a fixed id:
//!
//! ```text
//! {"jsonrpc":"2.0","method":"getAccount","id":"1","params":["P2f7..."]}
//! ```
//!
//! and the node answers with either `{"result": ...}` or
//! `{"error": {"message": "..."}}`.
//!
//! # Usage
//!
//! ```ignore
//! use phantasma_link::rpc::{HttpTransport, Transport};
//! use serde_json::json;
//!
//! let transport = HttpTransport::new("http://localhost:7077/rpc")?;
//! let height = transport.send("getBlockHeight", vec![json!("main")]).await?;
//! ```

mod client;
mod envelope;
pub mod mock;

pub use client::{
    cancellable, HttpTransport, ResponseOutcome, RpcError, Transport, DEFAULT_TIMEOUT_SECS,
};
pub use envelope::{classify_body, JsonRpcError, JsonRpcRequest, JSONRPC_VERSION, REQUEST_ID};
pub use mock::MockTransport;
