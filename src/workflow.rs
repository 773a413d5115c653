//! Transaction submission and confirmation.
//!
//! # Protocol
//!
//! ```text
//! BUILT ──sign──► SIGNED ──sendRawTransaction──► SUBMITTED
//!                                                    │
//!                                   sleep(delay), getTransaction(hash)
//!                                                    ▼
//!                                        AWAITING_CONFIRMATION
//!                                          │                 │
//!                                   event matches      nothing matches
//!                                          ▼                 ▼
//!                                      CONFIRMED           FAILED
//! ```
//!
//! The node executes a transaction some time after accepting it, so the
//! workflow waits a fixed delay and then inspects the transaction's events
//! for the one the action should have produced. By default it looks exactly
//! once; [`ConfirmationPolicy`] allows more attempts with a growing interval.
//!
//! A failure before submission (signing, local decoding) or during
//! submission ends the workflow right there, and no confirmation lookup is
//! made.
//!
//! # Usage
//!
//! ```ignore
//! let workflow = TransactionWorkflow::new(&api, &signer, &events, WorkflowSettings::default());
//! let confirmation = workflow
//!     .create_token(&mut registry, "CAR", "Car Demo Token", 10_000, 0, TokenFlags::TRANSFERABLE | TokenFlags::FINITE)
//!     .await?;
//! ```

use std::fmt;
use std::time::Duration;

use chrono::Utc;
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::api::{ApiError, PhantasmaApi};
use crate::cache::{Asset, AssetCache};
use crate::codec::{AssetCodec, CodecError, EventCodec};
use crate::error::ErrorKind;
use crate::events::{EventKind, TokenEventData, UnknownEventKind};
use crate::models::Event;
use crate::registry::TokenRegistry;
use crate::rpc::Transport;
use crate::script::{
    ScriptArg, ScriptBuilder, TokenFlags, TxScript, DEFAULT_GAS_LIMIT, DEFAULT_GAS_PRICE,
};
use crate::signing::{SigningError, TransactionSigner, UnsignedTransaction, DEFAULT_VALIDITY_SECS};

/// Chain used by the high level operations.
pub const DEFAULT_CHAIN: &str = "main";

/// Nexus name signed into every transaction by default.
pub const DEFAULT_NEXUS: &str = "simnet";

// =============================================================================
// States and settings
// =============================================================================

/// Stage of a transaction workflow.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum WorkflowState {
    Built,
    Signed,
    Submitted,
    AwaitingConfirmation,
    Confirmed,
    Failed,
}

impl WorkflowState {
    pub fn as_str(&self) -> &'static str {
        match self {
            WorkflowState::Built => "BUILT",
            WorkflowState::Signed => "SIGNED",
            WorkflowState::Submitted => "SUBMITTED",
            WorkflowState::AwaitingConfirmation => "AWAITING_CONFIRMATION",
            WorkflowState::Confirmed => "CONFIRMED",
            WorkflowState::Failed => "FAILED",
        }
    }

    pub fn is_terminal(&self) -> bool {
        matches!(self, WorkflowState::Confirmed | WorkflowState::Failed)
    }
}

impl fmt::Display for WorkflowState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// When and how often to look for the confirming event.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ConfirmationPolicy {
    /// Wait before the first lookup.
    pub delay_ms: u64,
    /// Total number of lookups, at least 1.
    pub max_attempts: u32,
    /// Wait before the second lookup.
    pub retry_interval_ms: u64,
    /// Each further wait is the previous one times this factor.
    pub backoff_factor: f64,
}

impl Default for ConfirmationPolicy {
    fn default() -> Self {
        Self {
            delay_ms: 10_000,
            max_attempts: 1,
            retry_interval_ms: 5_000,
            backoff_factor: 2.0,
        }
    }
}

impl ConfirmationPolicy {
    /// Wait before lookup number `attempt` (1-based).
    pub fn wait_before(&self, attempt: u32) -> Duration {
        if attempt <= 1 {
            return Duration::from_millis(self.delay_ms);
        }

        let exponent = i32::try_from(attempt - 2).unwrap_or(i32::MAX);
        let millis = self.retry_interval_ms as f64 * self.backoff_factor.powi(exponent);
        if millis.is_finite() && millis >= 0.0 {
            Duration::from_millis(millis.min(u64::MAX as f64) as u64)
        } else {
            Duration::from_millis(self.retry_interval_ms)
        }
    }

    /// Number of lookups actually performed.
    pub fn attempts(&self) -> u32 {
        self.max_attempts.max(1)
    }

    /// Reject settings that cannot describe a poll schedule.
    pub fn validate(&self) -> Result<(), String> {
        if self.max_attempts == 0 {
            return Err("max_attempts must be at least 1".to_string());
        }
        if !self.backoff_factor.is_finite() || self.backoff_factor < 1.0 {
            return Err(format!(
                "backoff_factor must be a number >= 1.0, got {}",
                self.backoff_factor
            ));
        }
        Ok(())
    }
}

/// Parameters shared by every transaction a workflow submits.
#[derive(Debug, Clone, PartialEq)]
pub struct WorkflowSettings {
    pub nexus: String,
    pub chain: String,
    pub validity: chrono::Duration,
    pub confirmation: ConfirmationPolicy,
}

impl Default for WorkflowSettings {
    fn default() -> Self {
        Self {
            nexus: DEFAULT_NEXUS.to_string(),
            chain: DEFAULT_CHAIN.to_string(),
            validity: chrono::Duration::seconds(DEFAULT_VALIDITY_SECS),
            confirmation: ConfirmationPolicy::default(),
        }
    }
}

// =============================================================================
// Requests and outcomes
// =============================================================================

/// The event a transaction must emit to count as confirmed.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Expectation {
    /// A `TokenCreate` event whose payload is this symbol.
    TokenCreated { symbol: String },
    /// A `TokenMint` event for this symbol.
    TokenMinted { symbol: String },
}

impl Expectation {
    pub fn kind(&self) -> EventKind {
        match self {
            Expectation::TokenCreated { .. } => EventKind::TokenCreate,
            Expectation::TokenMinted { .. } => EventKind::TokenMint,
        }
    }

    pub fn symbol(&self) -> &str {
        match self {
            Expectation::TokenCreated { symbol } | Expectation::TokenMinted { symbol } => symbol,
        }
    }
}

/// Decoded payload of the confirming event.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ConfirmedEvent {
    TokenCreated { symbol: String },
    TokenMinted(TokenEventData),
}

/// A transaction that reached CONFIRMED.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Confirmation {
    pub hash: String,
    pub event: ConfirmedEvent,
    /// Lookups made before the event was found.
    pub attempts: u32,
}

/// A script ready to be signed, and the event that will confirm it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TransactionRequest {
    pub chain: String,
    pub script: TxScript,
    pub expect: Expectation,
}

/// A workflow that ended in FAILED.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("{kind} - {message}")]
pub struct WorkflowError {
    kind: ErrorKind,
    message: String,
    failed_at: WorkflowState,
}

impl WorkflowError {
    pub fn new(kind: ErrorKind, message: impl Into<String>, failed_at: WorkflowState) -> Self {
        Self {
            kind,
            message: message.into(),
            failed_at,
        }
    }

    fn from_api(err: ApiError, failed_at: WorkflowState) -> Self {
        Self::new(err.kind(), err.message(), failed_at)
    }

    fn from_signing(err: SigningError) -> Self {
        Self::new(err.kind(), err.0, WorkflowState::Signed)
    }

    fn confirmation(message: impl Into<String>) -> Self {
        Self::new(
            ErrorKind::ConfirmationFailed,
            message,
            WorkflowState::AwaitingConfirmation,
        )
    }

    /// A failed `getTransaction`. An error reply from the node means the
    /// transaction is not visible yet; any other kind means no answer was
    /// obtained, and that kind is kept.
    fn lookup(err: ApiError) -> Self {
        match err.kind() {
            ErrorKind::ApiError => {
                Self::confirmation(format!("transaction lookup failed: {}", err))
            }
            kind => Self::new(
                kind,
                format!("transaction lookup failed: {}", err.message()),
                WorkflowState::AwaitingConfirmation,
            ),
        }
    }

    pub fn kind(&self) -> ErrorKind {
        self.kind
    }

    pub fn message(&self) -> &str {
        &self.message
    }

    /// The stage that was being entered when the workflow failed.
    pub fn failed_at(&self) -> WorkflowState {
        self.failed_at
    }
}

// =============================================================================
// Event matching
// =============================================================================

/// Find the first event in `events` that satisfies `expect`.
///
/// Events are inspected in order. An event of the expected kind whose
/// payload does not decode, or names a different symbol, is skipped.
///
/// # Errors
///
/// Returns `UnknownEventKind` as soon as an event kind is not recognized.
pub fn match_event<E: EventCodec + ?Sized>(
    codec: &E,
    events: &[Event],
    expect: &Expectation,
) -> Result<Option<ConfirmedEvent>, UnknownEventKind> {
    for event in events {
        if event.event_kind()? != expect.kind() {
            continue;
        }

        let bytes = match event.data_bytes() {
            Ok(bytes) => bytes,
            Err(e) => {
                tracing::warn!(kind = %event.kind, error = %e, "event data is not hex");
                continue;
            }
        };

        let decoded = match expect {
            Expectation::TokenCreated { symbol } => codec
                .decode_symbol(&bytes)
                .map(|decoded| (decoded == *symbol).then_some(ConfirmedEvent::TokenCreated { symbol: decoded })),
            Expectation::TokenMinted { symbol } => codec
                .decode_token_event(&bytes)
                .map(|data| (data.symbol == *symbol).then_some(ConfirmedEvent::TokenMinted(data))),
        };

        match decoded {
            Ok(Some(confirmed)) => return Ok(Some(confirmed)),
            Ok(None) => continue,
            Err(e) => {
                tracing::warn!(kind = %event.kind, error = %e, "event payload did not decode");
            }
        }
    }

    Ok(None)
}

// =============================================================================
// Workflow
// =============================================================================

/// Signs, submits and confirms transactions for one signer.
pub struct TransactionWorkflow<'a, T, S: ?Sized, E: ?Sized> {
    api: &'a PhantasmaApi<T>,
    signer: &'a S,
    events: &'a E,
    settings: WorkflowSettings,
}

impl<'a, T, S, E> TransactionWorkflow<'a, T, S, E>
where
    T: Transport,
    S: TransactionSigner + ?Sized,
    E: EventCodec + ?Sized,
{
    pub fn new(
        api: &'a PhantasmaApi<T>,
        signer: &'a S,
        events: &'a E,
        settings: WorkflowSettings,
    ) -> Self {
        Self {
            api,
            signer,
            events,
            settings,
        }
    }

    pub fn settings(&self) -> &WorkflowSettings {
        &self.settings
    }

    /// Sign `script` for `chain` and submit it. Returns the transaction hash.
    ///
    /// # Errors
    ///
    /// - `SIGNING_FAILED` at SIGNED if the signer rejects the transaction
    /// - the facade's kind at SUBMITTED if `sendRawTransaction` fails
    pub async fn sign_and_send(&self, chain: &str, script: TxScript) -> Result<String, WorkflowError> {
        let tx = UnsignedTransaction::new(
            self.settings.nexus.as_str(),
            chain,
            script,
            Utc::now(),
            self.settings.validity,
        );

        let signed = self.signer.sign(&tx).map_err(|e| {
            tracing::warn!(chain, error = %e, "transaction signing failed");
            WorkflowError::from_signing(e)
        })?;
        tracing::debug!(chain, bytes = signed.len(), expires = %tx.expiration, state = %WorkflowState::Signed, "transaction signed");

        let hash = self
            .api
            .send_raw_transaction(&hex::encode(&signed))
            .await
            .map_err(|e| {
                tracing::warn!(chain, error = %e, "transaction submission failed");
                WorkflowError::from_api(e, WorkflowState::Submitted)
            })?;
        tracing::info!(chain, %hash, state = %WorkflowState::Submitted, "transaction submitted");

        Ok(hash)
    }

    /// Wait for `hash` to emit the event described by `expect`.
    ///
    /// # Errors
    ///
    /// - `CONFIRMATION_FAILED` when no lookup found a matching event, when the
    ///   node answered the last lookup with an error, or as soon as an unknown
    ///   event kind is seen
    /// - `NETWORK_ERROR`, `PARSE_ERROR` or `MALFORMED_RESPONSE` when the last
    ///   lookup never got a usable answer
    pub async fn await_confirmation(
        &self,
        hash: &str,
        expect: &Expectation,
    ) -> Result<Confirmation, WorkflowError> {
        let policy = self.settings.confirmation;
        let attempts = policy.attempts();
        let mut last_failure = WorkflowError::confirmation("no lookup was made");

        for attempt in 1..=attempts {
            let wait = policy.wait_before(attempt);
            tracing::debug!(%hash, attempt, wait_ms = wait.as_millis() as u64, state = %WorkflowState::AwaitingConfirmation, "waiting for confirmation");
            tokio::time::sleep(wait).await;

            let tx = match self.api.get_transaction(hash).await {
                Ok(tx) => tx,
                Err(e) => {
                    tracing::warn!(%hash, attempt, error = %e, "transaction lookup failed");
                    last_failure = WorkflowError::lookup(e);
                    continue;
                }
            };

            match match_event(self.events, &tx.events, expect) {
                Ok(Some(event)) => {
                    tracing::info!(%hash, attempt, state = %WorkflowState::Confirmed, "transaction confirmed");
                    return Ok(Confirmation {
                        hash: hash.to_string(),
                        event,
                        attempts: attempt,
                    });
                }
                Ok(None) => {
                    last_failure = WorkflowError::confirmation(format!(
                        "transaction {} has no {} event for {}",
                        hash,
                        expect.kind(),
                        expect.symbol()
                    ));
                }
                Err(e) => {
                    tracing::warn!(%hash, error = %e, state = %WorkflowState::Failed, "unrecognized event");
                    return Err(WorkflowError::confirmation(e.to_string()));
                }
            }
        }

        tracing::warn!(%hash, attempts, reason = %last_failure, state = %WorkflowState::Failed, "transaction not confirmed");
        Err(last_failure)
    }

    /// Drive a request from BUILT to a terminal state.
    pub async fn run(&self, request: TransactionRequest) -> Result<Confirmation, WorkflowError> {
        tracing::debug!(chain = %request.chain, instructions = request.script.len(), state = %WorkflowState::Built, "transaction built");
        let hash = self.sign_and_send(&request.chain, request.script).await?;
        self.await_confirmation(&hash, &request.expect).await
    }

    /// Create a token owned by the signer and refresh `registry` once confirmed.
    ///
    /// A failed registry refresh is logged and does not fail the operation;
    /// the token exists on chain either way.
    pub async fn create_token(
        &self,
        registry: &mut TokenRegistry,
        symbol: &str,
        name: &str,
        max_supply: i128,
        decimals: u32,
        flags: TokenFlags,
    ) -> Result<Confirmation, WorkflowError> {
        let owner = self.signer.address();
        let script = ScriptBuilder::begin()
            .allow_gas(owner, DEFAULT_GAS_PRICE, DEFAULT_GAS_LIMIT)
            .call_contract(
                "nexus",
                "CreateToken",
                vec![
                    owner.into(),
                    symbol.into(),
                    name.into(),
                    max_supply.into(),
                    decimals.into(),
                    flags.into(),
                ],
            )
            .spend_gas(owner)
            .end();

        let confirmation = self
            .run(TransactionRequest {
                chain: self.settings.chain.clone(),
                script,
                expect: Expectation::TokenCreated {
                    symbol: symbol.to_string(),
                },
            })
            .await?;

        if let Err(e) = registry.refresh(self.api).await {
            tracing::warn!(symbol, error = %e, "token registry refresh after create failed");
        }

        Ok(confirmation)
    }

    /// Mint one instance of `symbol` to the signer and add it to `cache`.
    ///
    /// `rom` and `ram` are decoded with the cache's codec before anything is
    /// signed, so attributes the application cannot read are never minted.
    pub async fn mint_token<C: AssetCodec>(
        &self,
        cache: &mut AssetCache<C>,
        symbol: &str,
        rom: &[u8],
        ram: &[u8],
    ) -> Result<Confirmation, WorkflowError> {
        let rejected = |e: CodecError| {
            WorkflowError::new(
                ErrorKind::SigningFailed,
                format!("cannot mint {}: {}", symbol, e),
                WorkflowState::Built,
            )
        };
        let decoded_rom = cache.codec().decode_rom(rom).map_err(rejected)?;
        let decoded_ram = cache.codec().decode_ram(ram).map_err(rejected)?;

        let owner = self.signer.address();
        let script = ScriptBuilder::begin()
            .allow_gas(owner, DEFAULT_GAS_PRICE, DEFAULT_GAS_LIMIT)
            .call_contract(
                "token",
                "MintToken",
                vec![
                    owner.into(),
                    symbol.into(),
                    ScriptArg::Bytes(rom.to_vec()),
                    ScriptArg::Bytes(ram.to_vec()),
                ],
            )
            .spend_gas(owner)
            .end();

        let confirmation = self
            .run(TransactionRequest {
                chain: self.settings.chain.clone(),
                script,
                expect: Expectation::TokenMinted {
                    symbol: symbol.to_string(),
                },
            })
            .await?;

        if let ConfirmedEvent::TokenMinted(data) = &confirmation.event {
            tracing::info!(symbol, id = %data.value, "minted token cached");
            cache.insert(Asset {
                id: data.value.clone(),
                symbol: symbol.to_string(),
                owner: owner.to_string(),
                rom: decoded_rom,
                ram: decoded_ram,
            });
        }

        Ok(confirmation)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    /// Symbols are plain UTF-8; token events are JSON.
    struct PlainCodec;

    impl EventCodec for PlainCodec {
        fn decode_symbol(&self, bytes: &[u8]) -> Result<String, CodecError> {
            String::from_utf8(bytes.to_vec()).map_err(|e| CodecError::new(e.to_string()))
        }

        fn decode_token_event(&self, bytes: &[u8]) -> Result<TokenEventData, CodecError> {
            serde_json::from_slice(bytes).map_err(|e| CodecError::new(e.to_string()))
        }
    }

    fn event(kind: &str, data: &[u8]) -> Event {
        Event {
            address: "P1".into(),
            kind: kind.into(),
            data: hex::encode(data),
        }
    }

    fn mint_data(symbol: &str, id: &str) -> Vec<u8> {
        serde_json::to_vec(&TokenEventData {
            symbol: symbol.into(),
            value: id.into(),
            chain_address: "S1".into(),
        })
        .unwrap()
    }

    fn created(symbol: &str) -> Expectation {
        Expectation::TokenCreated {
            symbol: symbol.into(),
        }
    }

    #[test]
    fn test_workflow_state_names() {
        assert_eq!(WorkflowState::AwaitingConfirmation.to_string(), "AWAITING_CONFIRMATION");
        assert!(WorkflowState::Confirmed.is_terminal());
        assert!(WorkflowState::Failed.is_terminal());
        assert!(!WorkflowState::Submitted.is_terminal());
    }

    #[test]
    fn test_default_policy_is_single_delayed_lookup() {
        let policy = ConfirmationPolicy::default();
        assert_eq!(policy.attempts(), 1);
        assert_eq!(policy.wait_before(1), Duration::from_secs(10));
    }

    #[test]
    fn test_policy_backoff() {
        let policy = ConfirmationPolicy {
            delay_ms: 100,
            max_attempts: 4,
            retry_interval_ms: 50,
            backoff_factor: 2.0,
        };
        let waits: Vec<u64> = (1..=4).map(|a| policy.wait_before(a).as_millis() as u64).collect();
        assert_eq!(waits, vec![100, 50, 100, 200]);
    }

    #[test]
    fn test_policy_validate() {
        assert!(ConfirmationPolicy::default().validate().is_ok());

        let zero = ConfirmationPolicy {
            max_attempts: 0,
            ..Default::default()
        };
        assert!(zero.validate().is_err());
        assert_eq!(zero.attempts(), 1);

        let shrinking = ConfirmationPolicy {
            backoff_factor: 0.5,
            ..Default::default()
        };
        assert!(shrinking.validate().is_err());
    }

    #[test]
    fn test_policy_deserialize_partial() {
        let policy: ConfirmationPolicy = serde_json::from_str(r#"{"max_attempts": 3}"#).unwrap();
        assert_eq!(policy.max_attempts, 3);
        assert_eq!(policy.delay_ms, 10_000);
    }

    #[test]
    fn test_match_create_event() {
        let events = vec![
            event("GasEscrow", b""),
            event("TokenCreate", b"CAR"),
            event("GasPayment", b""),
        ];

        let matched = match_event(&PlainCodec, &events, &created("CAR")).unwrap();
        assert_eq!(
            matched,
            Some(ConfirmedEvent::TokenCreated {
                symbol: "CAR".into()
            })
        );
    }

    #[test]
    fn test_match_skips_other_subject() {
        let events = vec![event("TokenCreate", b"BIKE"), event("TokenCreate", b"CAR")];
        let matched = match_event(&PlainCodec, &events, &created("CAR")).unwrap();
        assert!(matches!(matched, Some(ConfirmedEvent::TokenCreated { ref symbol }) if symbol == "CAR"));

        let only_bike = vec![event("TokenCreate", b"BIKE")];
        assert_eq!(match_event(&PlainCodec, &only_bike, &created("CAR")).unwrap(), None);
    }

    #[test]
    fn test_match_mint_event() {
        let events = vec![event("TokenMint", &mint_data("CAR", "77"))];
        let expect = Expectation::TokenMinted {
            symbol: "CAR".into(),
        };

        match match_event(&PlainCodec, &events, &expect).unwrap() {
            Some(ConfirmedEvent::TokenMinted(data)) => assert_eq!(data.value, "77"),
            other => panic!("unexpected match: {:?}", other),
        }
    }

    #[test]
    fn test_match_undecodable_payload_is_skipped() {
        let events = vec![
            Event {
                address: "P1".into(),
                kind: "TokenMint".into(),
                data: "zz".into(),
            },
            event("TokenMint", b"not json"),
        ];
        let expect = Expectation::TokenMinted {
            symbol: "CAR".into(),
        };
        assert_eq!(match_event(&PlainCodec, &events, &expect).unwrap(), None);
    }

    #[test]
    fn test_match_unknown_kind_fails() {
        let events = vec![event("TokenTeleport", b""), event("TokenCreate", b"CAR")];
        let err = match_event(&PlainCodec, &events, &created("CAR")).unwrap_err();
        assert_eq!(err.0, "TokenTeleport");
    }

    #[test]
    fn test_workflow_error_display() {
        let err = WorkflowError::confirmation("no event");
        assert_eq!(err.to_string(), "CONFIRMATION_FAILED - no event");
        assert_eq!(err.failed_at(), WorkflowState::AwaitingConfirmation);
    }
}
