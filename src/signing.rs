//! Signing contract.
//!
//! Key handling and the binary transaction format belong to the embedding
//! application. The workflow hands a [`TransactionSigner`] an
//! [`UnsignedTransaction`] and gets back the serialized, signed envelope that
//! is submitted with `sendRawTransaction`.

use chrono::{DateTime, Duration, Utc};
use serde::Serialize;
use thiserror::Error;

use crate::error::ErrorKind;
use crate::script::TxScript;

/// Default validity window of a transaction.
pub const DEFAULT_VALIDITY_SECS: i64 = 3600;

/// Everything the signer needs to produce a transaction envelope.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct UnsignedTransaction {
    pub nexus: String,
    pub chain: String,
    pub script: TxScript,
    /// The node rejects the transaction after this instant.
    pub expiration: DateTime<Utc>,
}

impl UnsignedTransaction {
    /// Build a transaction that expires `validity` after `now`.
    pub fn new(
        nexus: impl Into<String>,
        chain: impl Into<String>,
        script: TxScript,
        now: DateTime<Utc>,
        validity: Duration,
    ) -> Self {
        Self {
            nexus: nexus.into(),
            chain: chain.into(),
            script,
            expiration: now + validity,
        }
    }

    pub fn is_expired_at(&self, instant: DateTime<Utc>) -> bool {
        instant >= self.expiration
    }
}

/// The signer refused or failed to produce an envelope.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("signing failed: {0}")]
pub struct SigningError(pub String);

impl SigningError {
    pub fn new(message: impl Into<String>) -> Self {
        Self(message.into())
    }

    pub fn kind(&self) -> ErrorKind {
        ErrorKind::SigningFailed
    }
}

/// Produces signed transaction envelopes for one key pair.
pub trait TransactionSigner: Send + Sync {
    /// Public address of the signing key.
    fn address(&self) -> &str;

    /// Serialize and sign `tx`.
    ///
    /// # Errors
    ///
    /// Returns `SigningError` if the transaction cannot be encoded or signed.
    fn sign(&self, tx: &UnsignedTransaction) -> Result<Vec<u8>, SigningError>;
}
