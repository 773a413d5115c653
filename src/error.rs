//! Error classification shared by every layer.
//!
//! Each layer has its own `thiserror` enum, but all of them collapse into one
//! of the [`ErrorKind`] variants so a caller always receives a stable
//! `(kind, message)` pair no matter where the failure happened.

use std::fmt;

use serde::{Deserialize, Serialize};

/// Stable failure classification.
///
/// Rendered in `SCREAMING_SNAKE_CASE` both by `Display` and by serde.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ErrorKind {
    /// The node answered with an `error` envelope.
    ApiError,
    /// No body was obtained (connection, timeout, HTTP status, cancellation).
    NetworkError,
    /// The body was not valid JSON.
    ParseError,
    /// Valid JSON, but not an envelope we understand or a record we can decode.
    MalformedResponse,
    /// The transaction was submitted but the expected event never showed up.
    ConfirmationFailed,
    /// Rejected locally (signer or codec) before anything was submitted.
    SigningFailed,
}

impl ErrorKind {
    /// Wire-style name of the kind.
    pub fn as_str(&self) -> &'static str {
        match self {
            ErrorKind::ApiError => "API_ERROR",
            ErrorKind::NetworkError => "NETWORK_ERROR",
            ErrorKind::ParseError => "PARSE_ERROR",
            ErrorKind::MalformedResponse => "MALFORMED_RESPONSE",
            ErrorKind::ConfirmationFailed => "CONFIRMATION_FAILED",
            ErrorKind::SigningFailed => "SIGNING_FAILED",
        }
    }
}

impl fmt::Display for ErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_kind_display_matches_serde() {
        let kinds = [
            ErrorKind::ApiError,
            ErrorKind::NetworkError,
            ErrorKind::ParseError,
            ErrorKind::MalformedResponse,
            ErrorKind::ConfirmationFailed,
            ErrorKind::SigningFailed,
        ];

        for kind in kinds {
            let json = serde_json::to_string(&kind).unwrap();
            assert_eq!(json, format!("\"{}\"", kind));
        }
    }

    #[test]
    fn test_error_kind_as_str() {
        assert_eq!(ErrorKind::ApiError.as_str(), "API_ERROR");
        assert_eq!(ErrorKind::MalformedResponse.to_string(), "MALFORMED_RESPONSE");
    }
}
