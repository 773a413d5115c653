//! Contracts for the binary record codecs this crate consumes.
//!
//! The ledger serializes event payloads and token attributes with its own
//! fixed binary format. This crate does not implement that format; an
//! embedding application supplies implementations of these traits.

use thiserror::Error;

use crate::events::TokenEventData;

/// A payload could not be decoded.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("{0}")]
pub struct CodecError(pub String);

impl CodecError {
    pub fn new(message: impl Into<String>) -> Self {
        Self(message.into())
    }
}

impl From<hex::FromHexError> for CodecError {
    fn from(err: hex::FromHexError) -> Self {
        CodecError(format!("invalid hex: {}", err))
    }
}

/// Decodes the binary payloads carried by events.
pub trait EventCodec: Send + Sync {
    /// Decode a payload holding a single serialized string.
    ///
    /// `TokenCreate` events carry the new token's symbol this way.
    fn decode_symbol(&self, bytes: &[u8]) -> Result<String, CodecError>;

    /// Decode a token event payload (`TokenMint`, `TokenSend`, ...).
    fn decode_token_event(&self, bytes: &[u8]) -> Result<TokenEventData, CodecError>;
}

/// Decodes the `rom` (immutable) and `ram` (mutable) attribute blobs of a
/// non-fungible token instance into application types.
pub trait AssetCodec: Send + Sync {
    type Rom: Clone + std::fmt::Debug + Send + Sync;
    type Ram: Clone + std::fmt::Debug + Send + Sync;

    fn decode_rom(&self, bytes: &[u8]) -> Result<Self::Rom, CodecError>;

    fn decode_ram(&self, bytes: &[u8]) -> Result<Self::Ram, CodecError>;
}

/// Hex-decode `text`, naming `field` in the error.
pub fn decode_hex_field(field: &str, text: &str) -> Result<Vec<u8>, CodecError> {
    hex::decode(text).map_err(|e| CodecError(format!("{} is not valid hex: {}", field, e)))
}
