//! Local copy of the node's token definitions.
//!
//! The registry answers the questions the rest of the crate keeps asking
//! about a symbol: is it fungible, who owns it, and how should an amount be
//! shown. It is replaced wholesale on every [`TokenRegistry::refresh`].

use std::collections::HashMap;
use std::str::FromStr;

use rust_decimal::Decimal;

use crate::api::{ApiError, PhantasmaApi};
use crate::models::{Balance, Token};
use crate::rpc::Transport;

/// Token definitions keyed by symbol.
#[derive(Debug, Clone, Default)]
pub struct TokenRegistry {
    tokens: HashMap<String, Token>,
}

impl TokenRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Reload every definition with `getTokens`.
    ///
    /// On error the registry keeps its previous contents.
    pub async fn refresh<T: Transport>(&mut self, api: &PhantasmaApi<T>) -> Result<usize, ApiError> {
        let tokens = api.get_tokens().await?;
        self.replace(tokens);
        tracing::info!(tokens = self.tokens.len(), "token registry refreshed");
        Ok(self.tokens.len())
    }

    /// Replace the contents with `tokens`.
    pub fn replace(&mut self, tokens: Vec<Token>) {
        self.tokens = tokens
            .into_iter()
            .map(|token| (token.symbol.clone(), token))
            .collect();
    }

    pub fn get(&self, symbol: &str) -> Option<&Token> {
        self.tokens.get(symbol)
    }

    pub fn contains(&self, symbol: &str) -> bool {
        self.tokens.contains_key(symbol)
    }

    pub fn len(&self) -> usize {
        self.tokens.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tokens.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &Token> {
        self.tokens.values()
    }

    /// Whether `address` owns the definition of `symbol`.
    pub fn is_owner(&self, symbol: &str, address: &str) -> bool {
        self.get(symbol)
            .is_some_and(|token| token.owner_address == address)
    }

    /// Definitions owned by `address`, sorted by symbol.
    pub fn owned_by(&self, address: &str) -> Vec<&Token> {
        let mut owned: Vec<&Token> = self
            .tokens
            .values()
            .filter(|token| token.owner_address == address)
            .collect();
        owned.sort_by(|a, b| a.symbol.cmp(&b.symbol));
        owned
    }

    /// Human readable amount of a balance.
    ///
    /// Fungible amounts are scaled by the token's declared decimals.
    /// Non-fungible amounts are instance counts and are shown as is. For a
    /// symbol the registry does not know, a balance without instance ids is
    /// treated as fungible and scaled by the balance's own decimals.
    pub fn display_amount(&self, balance: &Balance) -> String {
        let decimals = match self.get(&balance.symbol) {
            Some(token) if token.is_fungible() => u32::try_from(token.decimals).ok(),
            Some(_) => None,
            None if balance.ids.is_empty() => Some(balance.decimals),
            None => None,
        };

        match decimals {
            Some(decimals) => match scale_amount(&balance.amount, decimals) {
                Ok(amount) => amount.normalize().to_string(),
                Err(e) => {
                    tracing::warn!(symbol = %balance.symbol, amount = %balance.amount, error = %e, "amount not scaled");
                    balance.amount.clone()
                }
            },
            None => balance.amount.clone(),
        }
    }
}

/// Interpret a raw integer amount as a value with `decimals` fractional digits.
///
/// # Errors
///
/// Fails if `raw` is not an integer that fits a `Decimal`, or if `decimals`
/// exceeds the supported scale (28).
///
/// # Example
///
/// ```ignore
/// assert_eq!(scale_amount("1500000000", 8)?.to_string(), "15.00000000");
/// ```
pub fn scale_amount(raw: &str, decimals: u32) -> Result<Decimal, rust_decimal::Error> {
    let mut amount = Decimal::from_str(raw.trim())?;
    if amount.scale() != 0 {
        return Err(rust_decimal::Error::ConversionTo(format!(
            "{} is not an integer amount",
            raw
        )));
    }
    amount.set_scale(decimals)?;
    Ok(amount)
}
