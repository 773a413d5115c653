//! Transaction scripts.
//!
//! A script is an ordered list of instructions executed by the ledger VM.
//! This module only models the instructions; turning them into VM bytecode
//! is done by the signer together with the rest of the transaction.
//!
//! # Usage
//!
//! ```ignore
//! let script = ScriptBuilder::begin()
//!     .allow_gas(owner, 1, 9999)
//!     .call_contract("nexus", "CreateToken", vec![owner.into(), "CAR".into()])
//!     .spend_gas(owner)
//!     .end();
//! ```

use std::fmt;
use std::ops::BitOr;

use serde::{Deserialize, Serialize};

/// Default gas price used by the high level operations.
pub const DEFAULT_GAS_PRICE: u64 = 1;

/// Default gas limit used by the high level operations.
pub const DEFAULT_GAS_LIMIT: u64 = 9999;

/// Argument of a contract call.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", content = "value", rename_all = "snake_case")]
pub enum ScriptArg {
    Text(String),
    Int(i128),
    Bytes(Vec<u8>),
    Bool(bool),
}

impl From<&str> for ScriptArg {
    fn from(value: &str) -> Self {
        ScriptArg::Text(value.to_string())
    }
}

impl From<String> for ScriptArg {
    fn from(value: String) -> Self {
        ScriptArg::Text(value)
    }
}

impl From<i128> for ScriptArg {
    fn from(value: i128) -> Self {
        ScriptArg::Int(value)
    }
}

impl From<u32> for ScriptArg {
    fn from(value: u32) -> Self {
        ScriptArg::Int(i128::from(value))
    }
}

impl From<Vec<u8>> for ScriptArg {
    fn from(value: Vec<u8>) -> Self {
        ScriptArg::Bytes(value)
    }
}

impl From<bool> for ScriptArg {
    fn from(value: bool) -> Self {
        ScriptArg::Bool(value)
    }
}

impl From<TokenFlags> for ScriptArg {
    fn from(value: TokenFlags) -> Self {
        ScriptArg::Int(i128::from(value.bits()))
    }
}

/// One script instruction.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "op", rename_all = "snake_case")]
pub enum Instruction {
    /// Reserve gas from `address` at `price` up to `limit`.
    AllowGas {
        address: String,
        price: u64,
        limit: u64,
    },
    CallContract {
        contract: String,
        method: String,
        args: Vec<ScriptArg>,
    },
    /// Settle the gas reserved by a previous `AllowGas`.
    SpendGas { address: String },
}

/// A finished, immutable script.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct TxScript {
    instructions: Vec<Instruction>,
}

impl TxScript {
    pub fn instructions(&self) -> &[Instruction] {
        &self.instructions
    }

    pub fn is_empty(&self) -> bool {
        self.instructions.is_empty()
    }

    pub fn len(&self) -> usize {
        self.instructions.len()
    }

    /// Contract calls in order, as `(contract, method)` pairs.
    pub fn calls(&self) -> impl Iterator<Item = (&str, &str)> {
        self.instructions.iter().filter_map(|i| match i {
            Instruction::CallContract {
                contract, method, ..
            } => Some((contract.as_str(), method.as_str())),
            _ => None,
        })
    }
}

/// Builder for [`TxScript`]. Instructions keep insertion order.
#[derive(Debug, Default)]
pub struct ScriptBuilder {
    instructions: Vec<Instruction>,
}

impl ScriptBuilder {
    pub fn begin() -> Self {
        Self::default()
    }

    pub fn allow_gas(mut self, address: impl Into<String>, price: u64, limit: u64) -> Self {
        self.instructions.push(Instruction::AllowGas {
            address: address.into(),
            price,
            limit,
        });
        self
    }

    pub fn call_contract(
        mut self,
        contract: impl Into<String>,
        method: impl Into<String>,
        args: Vec<ScriptArg>,
    ) -> Self {
        self.instructions.push(Instruction::CallContract {
            contract: contract.into(),
            method: method.into(),
            args,
        });
        self
    }

    pub fn spend_gas(mut self, address: impl Into<String>) -> Self {
        self.instructions.push(Instruction::SpendGas {
            address: address.into(),
        });
        self
    }

    pub fn end(self) -> TxScript {
        TxScript {
            instructions: self.instructions,
        }
    }
}

/// Token capability flags, as passed to `CreateToken`.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct TokenFlags(u32);

impl TokenFlags {
    pub const NONE: TokenFlags = TokenFlags(0);
    pub const TRANSFERABLE: TokenFlags = TokenFlags(1);
    pub const FUNGIBLE: TokenFlags = TokenFlags(1 << 1);
    pub const FINITE: TokenFlags = TokenFlags(1 << 2);
    pub const DIVISIBLE: TokenFlags = TokenFlags(1 << 3);
    pub const FUEL: TokenFlags = TokenFlags(1 << 4);
    pub const STAKABLE: TokenFlags = TokenFlags(1 << 5);
    pub const FIAT: TokenFlags = TokenFlags(1 << 6);
    pub const BURNABLE: TokenFlags = TokenFlags(1 << 8);

    const NAMED: [(TokenFlags, &'static str); 8] = [
        (Self::TRANSFERABLE, "Transferable"),
        (Self::FUNGIBLE, "Fungible"),
        (Self::FINITE, "Finite"),
        (Self::DIVISIBLE, "Divisible"),
        (Self::FUEL, "Fuel"),
        (Self::STAKABLE, "Stakable"),
        (Self::FIAT, "Fiat"),
        (Self::BURNABLE, "Burnable"),
    ];

    pub const fn bits(self) -> u32 {
        self.0
    }

    pub const fn contains(self, other: TokenFlags) -> bool {
        self.0 & other.0 == other.0
    }

    /// Flags parsed from the node's comma separated name list.
    /// Unknown names are skipped.
    pub fn from_names(names: &str) -> Self {
        names
            .split(|c: char| c == ',' || c == '|')
            .map(str::trim)
            .filter_map(|name| {
                Self::NAMED
                    .iter()
                    .find(|(_, n)| *n == name)
                    .map(|(flag, _)| *flag)
            })
            .fold(Self::NONE, |acc, flag| acc | flag)
    }
}

impl BitOr for TokenFlags {
    type Output = TokenFlags;

    fn bitor(self, rhs: TokenFlags) -> TokenFlags {
        TokenFlags(self.0 | rhs.0)
    }
}

impl fmt::Display for TokenFlags {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let names: Vec<&str> = Self::NAMED
            .iter()
            .filter(|(flag, _)| self.contains(*flag))
            .map(|(_, name)| *name)
            .collect();

        if names.is_empty() {
            f.write_str("None")
        } else {
            f.write_str(&names.join(", "))
        }
    }
}
