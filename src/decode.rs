//! Typed decoding of `result` nodes.
//!
//! Every function here is pure: the same node always yields the same record
//! or the same error. Record shapes live in [`crate::models`]; this module
//! provides the entry points the API facade uses and the few shapes that
//! are not records (counts, plain strings, pages).
//!
//! A decode failure is never swallowed. The facade reports it as
//! `MALFORMED_RESPONSE`.

use serde::de::DeserializeOwned;
use serde_json::Value;
use thiserror::Error;

use crate::models::Paginated;

/// A response node did not have the expected shape.
#[derive(Debug, Error)]
pub enum DecodeError {
    /// Record deserialization failed (missing field, bad number, wrong type).
    #[error("cannot decode {target}: {source}")]
    Record {
        target: &'static str,
        #[source]
        source: serde_json::Error,
    },

    /// The node was of the wrong JSON type.
    #[error("cannot decode {target}: expected {expected}, found {found}")]
    Shape {
        target: &'static str,
        expected: &'static str,
        found: &'static str,
    },

    /// A numeric node or field held something that is not a valid number.
    #[error("cannot decode {target}: {text} is not a valid number")]
    Number { target: &'static str, text: String },
}

/// Decode a single record.
///
/// # Example
///
/// ```ignore
/// let account: Account = decode(&node)?;
/// ```
pub fn decode<T: DeserializeOwned>(node: &Value) -> Result<T, DecodeError> {
    T::deserialize(node).map_err(|source| DecodeError::Record {
        target: std::any::type_name::<T>(),
        source,
    })
}

/// Decode an array of records, preserving order.
///
/// A `null` node is treated as an empty list.
pub fn decode_list<T: DeserializeOwned>(node: &Value) -> Result<Vec<T>, DecodeError> {
    match node {
        Value::Null => Ok(Vec::new()),
        Value::Array(items) => items.iter().map(decode::<T>).collect(),
        other => Err(DecodeError::Shape {
            target: std::any::type_name::<Vec<T>>(),
            expected: "array",
            found: json_type_name(other),
        }),
    }
}

/// Decode a paginated envelope.
///
/// `page` and `totalPages` are read from the outer node first; the nested
/// `result` node is then handed to `decode_result`. A missing nested result
/// is passed on as `null`, so list pages decode to an empty list.
pub fn decode_page<T, F>(node: &Value, decode_result: F) -> Result<Paginated<T>, DecodeError>
where
    F: FnOnce(&Value) -> Result<T, DecodeError>,
{
    if !node.is_object() {
        return Err(DecodeError::Shape {
            target: "Paginated",
            expected: "object",
            found: json_type_name(node),
        });
    }

    let page = u32_field(node, "page")?;
    let total_pages = u32_field(node, "totalPages")?;
    let result = decode_result(node.get("result").unwrap_or(&Value::Null))?;

    Ok(Paginated {
        page,
        total_pages,
        result,
    })
}

/// Decode a count: a non-negative integer sent as a number or a string.
pub fn decode_count(node: &Value) -> Result<u64, DecodeError> {
    number_from(node, "count")
}

/// Decode a plain string result (hashes, addresses, raw hex).
pub fn decode_text(node: &Value) -> Result<String, DecodeError> {
    match node {
        Value::String(text) => Ok(text.clone()),
        other => Err(DecodeError::Shape {
            target: "string",
            expected: "string",
            found: json_type_name(other),
        }),
    }
}

fn u32_field(node: &Value, field: &'static str) -> Result<u32, DecodeError> {
    let value = node.get(field).ok_or(DecodeError::Shape {
        target: field,
        expected: "number",
        found: "nothing",
    })?;

    let number = number_from(value, field)?;
    u32::try_from(number).map_err(|_| DecodeError::Number {
        target: field,
        text: number.to_string(),
    })
}

fn number_from(node: &Value, target: &'static str) -> Result<u64, DecodeError> {
    let parsed = match node {
        Value::Number(n) => n.as_u64(),
        Value::String(text) => text.trim().parse::<u64>().ok(),
        other => {
            return Err(DecodeError::Shape {
                target,
                expected: "number",
                found: json_type_name(other),
            })
        }
    };

    parsed.ok_or_else(|| DecodeError::Number {
        target,
        text: node.to_string(),
    })
}

/// Name of a JSON value's type, for diagnostics.
pub(crate) fn json_type_name(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "boolean",
        Value::Number(_) => "number",
        Value::String(_) => "string",
        Value::Array(_) => "array",
        Value::Object(_) => "object",
    }
}
