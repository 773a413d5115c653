//! Data models for Phantasma RPC responses.
//!
//! These structs match the JSON records returned by the node's RPC
//! interface. They are only ever produced by decoding a response node (see
//! [`crate::decode`]); nothing in the crate builds them by hand.
//!
//! Decoding rules shared by every record:
//!
//! - numeric fields accept a JSON number or a numeric string; anything else,
//!   including out-of-range values, is an error
//! - list fields that are missing or `null` become empty vectors
//! - unknown fields are ignored
//! - other missing fields are errors

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_with::{serde_as, DefaultOnNull, DisplayFromStr, PickFirst};

use crate::events::{EventKind, UnknownEventKind};

/// Balance of one token held by an address on one chain.
#[serde_as]
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Balance {
    pub chain: String,
    /// Raw integer amount as a decimal string (not yet scaled).
    pub amount: String,
    pub symbol: String,
    #[serde_as(as = "PickFirst<(_, DisplayFromStr)>")]
    pub decimals: u32,
    /// Instance ids for non-fungible tokens.
    #[serde(default)]
    #[serde_as(as = "DefaultOnNull")]
    pub ids: Vec<String>,
}

/// Account name and balances of an address.
#[serde_as]
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Account {
    pub address: String,
    pub name: String,
    #[serde(default)]
    #[serde_as(as = "DefaultOnNull")]
    pub balances: Vec<Balance>,
}

impl Account {
    /// Balance entry for `symbol`, if the account holds any.
    pub fn balance(&self, symbol: &str) -> Option<&Balance> {
        self.balances.iter().find(|b| b.symbol == symbol)
    }
}

/// A chain deployed on the nexus.
#[serde_as]
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Chain {
    pub name: String,
    pub address: String,
    pub parent_address: String,
    #[serde_as(as = "PickFirst<(_, DisplayFromStr)>")]
    pub height: u32,
}

/// A registered app.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct App {
    pub id: String,
    pub title: String,
    pub url: String,
    pub description: String,
    pub icon: String,
}

/// An event emitted by a transaction or script invocation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Event {
    pub address: String,
    /// Event kind name, e.g. `TokenMint`.
    pub kind: String,
    /// Hex-encoded payload.
    pub data: String,
}

impl Event {
    /// Parse `kind` against the known event kinds.
    pub fn event_kind(&self) -> Result<EventKind, UnknownEventKind> {
        self.kind.parse()
    }

    /// Decode the hex payload.
    pub fn data_bytes(&self) -> Result<Vec<u8>, hex::FromHexError> {
        hex::decode(&self.data)
    }
}

/// A transaction as reported by the node.
#[serde_as]
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Transaction {
    pub hash: String,
    pub chain_address: String,
    /// Unix timestamp in seconds.
    #[serde_as(as = "PickFirst<(_, DisplayFromStr)>")]
    pub timestamp: u32,
    #[serde_as(as = "PickFirst<(_, DisplayFromStr)>")]
    pub confirmations: i32,
    #[serde_as(as = "PickFirst<(_, DisplayFromStr)>")]
    pub block_height: u32,
    pub block_hash: String,
    /// Hex-encoded script.
    pub script: String,
    #[serde(default)]
    #[serde_as(as = "DefaultOnNull")]
    pub events: Vec<Event>,
    pub result: String,
    pub fee: String,
}

impl Transaction {
    /// Block timestamp as a UTC datetime.
    pub fn timestamp_utc(&self) -> Option<DateTime<Utc>> {
        DateTime::from_timestamp(i64::from(self.timestamp), 0)
    }
}

/// Transactions of one address (a single page of them).
#[serde_as]
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AccountTransactions {
    pub address: String,
    #[serde(default)]
    #[serde_as(as = "DefaultOnNull")]
    pub txs: Vec<Transaction>,
}

/// A block and its transactions.
#[serde_as]
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Block {
    pub hash: String,
    pub previous_hash: String,
    #[serde_as(as = "PickFirst<(_, DisplayFromStr)>")]
    pub timestamp: u32,
    #[serde_as(as = "PickFirst<(_, DisplayFromStr)>")]
    pub height: u32,
    pub chain_address: String,
    pub payload: String,
    #[serde(default)]
    #[serde_as(as = "DefaultOnNull")]
    pub txs: Vec<Transaction>,
    pub validator_address: String,
    pub reward: String,
}

/// A key/value pair attached to a token definition.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TokenMetadata {
    pub key: String,
    pub value: String,
}

/// A token definition.
#[serde_as]
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Token {
    pub symbol: String,
    pub name: String,
    #[serde_as(as = "PickFirst<(_, DisplayFromStr)>")]
    pub decimals: i32,
    pub current_supply: String,
    pub max_supply: String,
    pub owner_address: String,
    #[serde(default, rename = "metadataList")]
    #[serde_as(as = "DefaultOnNull")]
    pub metadata: Vec<TokenMetadata>,
    /// Comma separated flag names, e.g. `"Transferable, Fungible"`.
    pub flags: String,
}

impl Token {
    /// Whether `flags` lists `flag` (case-sensitive, whitespace tolerant).
    pub fn has_flag(&self, flag: &str) -> bool {
        self.flags
            .split(|c: char| c == ',' || c == '|')
            .any(|f| f.trim() == flag)
    }

    /// Fungible tokens carry scaled amounts; non-fungible ones carry ids.
    pub fn is_fungible(&self) -> bool {
        self.has_flag("Fungible")
    }

    /// Metadata value for `key`.
    pub fn metadata_value(&self, key: &str) -> Option<&str> {
        self.metadata
            .iter()
            .find(|m| m.key == key)
            .map(|m| m.value.as_str())
    }
}

/// Data of one non-fungible token instance.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TokenData {
    #[serde(rename = "ID", alias = "iD", alias = "id")]
    pub id: String,
    pub chain_address: String,
    pub owner_address: String,
    /// Hex-encoded mutable attributes.
    pub ram: String,
    /// Hex-encoded immutable attributes.
    pub rom: String,
    pub for_sale: bool,
}

impl TokenData {
    /// Decode the immutable attribute blob.
    pub fn rom_bytes(&self) -> Result<Vec<u8>, hex::FromHexError> {
        hex::decode(&self.rom)
    }

    /// Decode the mutable attribute blob.
    pub fn ram_bytes(&self) -> Result<Vec<u8>, hex::FromHexError> {
        hex::decode(&self.ram)
    }
}

/// A market auction for one token instance.
#[serde_as]
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Auction {
    pub creator_address: String,
    pub chain_address: String,
    #[serde_as(as = "PickFirst<(_, DisplayFromStr)>")]
    pub start_date: u32,
    #[serde_as(as = "PickFirst<(_, DisplayFromStr)>")]
    pub end_date: u32,
    pub base_symbol: String,
    pub quote_symbol: String,
    pub token_id: String,
    pub price: String,
    pub rom: String,
    pub ram: String,
}

/// Result of a read-only script invocation.
#[serde_as]
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Script {
    #[serde(default)]
    #[serde_as(as = "DefaultOnNull")]
    pub events: Vec<Event>,
    pub result: String,
}

/// One page of a paginated call.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Paginated<T> {
    pub page: u32,
    pub total_pages: u32,
    pub result: T,
}

impl<T> Paginated<T> {
    /// True once `page` has reached `total_pages`.
    pub fn is_last_page(&self) -> bool {
        self.page >= self.total_pages
    }
}
