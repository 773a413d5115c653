//! Event kinds emitted by the ledger and decoded event payloads.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Known event kinds.
///
/// The node reports kinds by name. A name outside this list means the node
/// speaks a protocol version this client does not understand.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum EventKind {
    ChainCreate,
    TokenCreate,
    TokenSend,
    TokenReceive,
    TokenMint,
    TokenBurn,
    TokenEscrow,
    TokenStake,
    TokenUnstake,
    TokenClaim,
    RolePromote,
    RoleDemote,
    AddressRegister,
    AddressLink,
    AddressUnlink,
    GasEscrow,
    GasPayment,
    OrderCreated,
    OrderCancelled,
    OrderFilled,
    OrderClosed,
    AuctionCreated,
    AuctionCancelled,
    AuctionFilled,
    Metadata,
    Custom,
}

impl EventKind {
    /// Every known kind, in declaration order.
    pub fn all() -> &'static [EventKind] {
        use EventKind::*;
        &[
            ChainCreate,
            TokenCreate,
            TokenSend,
            TokenReceive,
            TokenMint,
            TokenBurn,
            TokenEscrow,
            TokenStake,
            TokenUnstake,
            TokenClaim,
            RolePromote,
            RoleDemote,
            AddressRegister,
            AddressLink,
            AddressUnlink,
            GasEscrow,
            GasPayment,
            OrderCreated,
            OrderCancelled,
            OrderFilled,
            OrderClosed,
            AuctionCreated,
            AuctionCancelled,
            AuctionFilled,
            Metadata,
            Custom,
        ]
    }

    /// Name as sent by the node.
    pub fn as_str(&self) -> &'static str {
        match self {
            EventKind::ChainCreate => "ChainCreate",
            EventKind::TokenCreate => "TokenCreate",
            EventKind::TokenSend => "TokenSend",
            EventKind::TokenReceive => "TokenReceive",
            EventKind::TokenMint => "TokenMint",
            EventKind::TokenBurn => "TokenBurn",
            EventKind::TokenEscrow => "TokenEscrow",
            EventKind::TokenStake => "TokenStake",
            EventKind::TokenUnstake => "TokenUnstake",
            EventKind::TokenClaim => "TokenClaim",
            EventKind::RolePromote => "RolePromote",
            EventKind::RoleDemote => "RoleDemote",
            EventKind::AddressRegister => "AddressRegister",
            EventKind::AddressLink => "AddressLink",
            EventKind::AddressUnlink => "AddressUnlink",
            EventKind::GasEscrow => "GasEscrow",
            EventKind::GasPayment => "GasPayment",
            EventKind::OrderCreated => "OrderCreated",
            EventKind::OrderCancelled => "OrderCancelled",
            EventKind::OrderFilled => "OrderFilled",
            EventKind::OrderClosed => "OrderClosed",
            EventKind::AuctionCreated => "AuctionCreated",
            EventKind::AuctionCancelled => "AuctionCancelled",
            EventKind::AuctionFilled => "AuctionFilled",
            EventKind::Metadata => "Metadata",
            EventKind::Custom => "Custom",
        }
    }
}

impl fmt::Display for EventKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// An event kind name that is not in [`EventKind::all`].
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("unknown event kind {0:?}")]
pub struct UnknownEventKind(pub String);

impl FromStr for EventKind {
    type Err = UnknownEventKind;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        EventKind::all()
            .iter()
            .copied()
            .find(|kind| kind.as_str() == s)
            .ok_or_else(|| UnknownEventKind(s.to_string()))
    }
}

/// Payload of token send/receive/mint/burn events.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TokenEventData {
    pub symbol: String,
    /// Amount for fungible tokens, instance id for non-fungible ones.
    pub value: String,
    pub chain_address: String,
}
