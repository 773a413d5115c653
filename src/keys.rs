//! Text validation for addresses and private keys.
//!
//! Only the prefix and length are checked. Checksums and curve validity are
//! the signer's business.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Length of a WIF-encoded private key.
pub const PRIVATE_KEY_LEN: usize = 52;

/// Length of a textual public address.
pub const ADDRESS_LEN: usize = 45;

/// Base58 text only. Being ASCII, its byte length is its character count.
fn is_base58_text(text: &str, len: usize) -> bool {
    text.len() == len && text.bytes().all(|b| b.is_ascii_alphanumeric())
}

/// Whether `text` looks like a WIF private key (`L…` or `K…`, 52 chars).
pub fn is_valid_private_key(text: &str) -> bool {
    (text.starts_with('L') || text.starts_with('K')) && is_base58_text(text, PRIVATE_KEY_LEN)
}

/// Whether `text` looks like a public address (`P…`, 45 chars).
pub fn is_valid_address(text: &str) -> bool {
    text.starts_with('P') && is_base58_text(text, ADDRESS_LEN)
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("invalid address {0:?}: expected {ADDRESS_LEN} characters starting with 'P'")]
pub struct InvalidAddress(pub String);

/// A public address that passed [`is_valid_address`].
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct Address(String);

impl Address {
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl FromStr for Address {
    type Err = InvalidAddress;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        if is_valid_address(s) {
            Ok(Address(s.to_string()))
        } else {
            Err(InvalidAddress(s.to_string()))
        }
    }
}

impl TryFrom<String> for Address {
    type Error = InvalidAddress;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        if is_valid_address(&value) {
            Ok(Address(value))
        } else {
            Err(InvalidAddress(value))
        }
    }
}

impl From<Address> for String {
    fn from(address: Address) -> Self {
        address.0
    }
}

impl AsRef<str> for Address {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for Address {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}
