//! JSON-RPC 2.0 envelope encoding and response classification.
//!
//! # Wire Format
//!
//! ```text
//! request:  {"jsonrpc":"2.0","method":<name>,"id":"1","params":[...]}
//! response: {"result": <any>}  |  {"error": {"message": <string>}}
//! ```
//!
//! Classification checks `error` before `result`, so an envelope carrying
//! both is treated as an error.

use serde::{Deserialize, Serialize};
use serde_json::Value;

use super::client::{ResponseOutcome, RpcError};
use crate::decode::json_type_name;

/// Protocol version sent with every request.
pub const JSONRPC_VERSION: &str = "2.0";

/// The node does not correlate ids, so every request carries the same one.
pub const REQUEST_ID: &str = "1";

/// Outgoing JSON-RPC request.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct JsonRpcRequest<'a> {
    pub jsonrpc: &'static str,
    pub method: &'a str,
    pub id: &'static str,
    pub params: Vec<Value>,
}

impl<'a> JsonRpcRequest<'a> {
    /// Build a request for `method` with positional `params`.
    pub fn new(method: &'a str, params: Vec<Value>) -> Self {
        Self {
            jsonrpc: JSONRPC_VERSION,
            method,
            id: REQUEST_ID,
            params,
        }
    }
}

/// The `error` member of a response envelope.
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
pub struct JsonRpcError {
    #[serde(default)]
    pub code: Option<i64>,
    /// Absent when the node sent an error object without a message.
    #[serde(default)]
    pub message: Option<String>,
    #[serde(default)]
    pub data: Option<Value>,
}

/// Classify a raw response body.
///
/// # Errors
///
/// - `RpcError::Parse` if the body is not JSON
/// - `RpcError::Api` if the envelope has an `error` member
/// - `RpcError::Malformed` if it is JSON but has neither `error` nor `result`
///
/// # Example
///
/// ```ignore
/// let node = classify_body(r#"{"result": 42}"#)?;
/// assert_eq!(node, serde_json::json!(42));
/// ```
pub fn classify_body(body: &str) -> ResponseOutcome {
    let root: Value =
        serde_json::from_str(body).map_err(|e| RpcError::Parse(e.to_string()))?;

    let mut envelope = match root {
        Value::Object(map) => map,
        other => {
            return Err(RpcError::Malformed(format!(
                "expected a JSON object, found {}",
                json_type_name(&other)
            )))
        }
    };

    if let Some(error) = envelope.remove("error") {
        return Err(RpcError::Api(error_message(error)));
    }

    envelope
        .remove("result")
        .ok_or_else(|| RpcError::Malformed("response missing both result and error".to_string()))
}

/// Pull a human readable message out of an `error` member.
///
/// Nodes normally send `{"message": ...}`, but a bare string is accepted too.
fn error_message(error: Value) -> String {
    match error {
        Value::String(message) => message,
        Value::Object(_) => match serde_json::from_value::<JsonRpcError>(error.clone()) {
            Ok(JsonRpcError {
                message: Some(message),
                ..
            }) => message,
            _ => error.to_string(),
        },
        other => other.to_string(),
    }
}
