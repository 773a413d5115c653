//! Integration tests for the transaction workflow.
//!
//! The node is a `MockTransport` with scripted responses. Signing and the
//! binary codecs are replaced by readable stand-ins: the "signed" envelope
//! is the unsigned transaction as JSON, symbols are UTF-8 and token event
//! payloads are JSON.

use phantasma_link::api::PhantasmaApi;
use phantasma_link::cache::AssetCache;
use phantasma_link::codec::{AssetCodec, CodecError, EventCodec};
use phantasma_link::error::ErrorKind;
use phantasma_link::events::TokenEventData;
use phantasma_link::registry::TokenRegistry;
use phantasma_link::rpc::{MockTransport, RpcError};
use phantasma_link::script::TokenFlags;
use phantasma_link::signing::{SigningError, TransactionSigner, UnsignedTransaction};
use phantasma_link::workflow::{
    ConfirmationPolicy, ConfirmedEvent, TransactionWorkflow, WorkflowSettings, WorkflowState,
};
use pretty_assertions::assert_eq;
use serde_json::{json, Value};
use std::time::Duration;

const OWNER: &str = "P2f7ZFuj6NfZ76ymNMnG3xRBT5hAMicDrQRHE4S7SoxEr";
const HASH: &str = "A1B2C3";

// =============================================================================
// Stand-ins
// =============================================================================

struct JsonSigner {
    locked: bool,
}

impl TransactionSigner for JsonSigner {
    fn address(&self) -> &str {
        OWNER
    }

    fn sign(&self, tx: &UnsignedTransaction) -> Result<Vec<u8>, SigningError> {
        if self.locked {
            return Err(SigningError::new("key is locked"));
        }
        serde_json::to_vec(tx).map_err(|e| SigningError::new(e.to_string()))
    }
}

struct PlainEvents;

impl EventCodec for PlainEvents {
    fn decode_symbol(&self, bytes: &[u8]) -> Result<String, CodecError> {
        String::from_utf8(bytes.to_vec()).map_err(|e| CodecError::new(e.to_string()))
    }

    fn decode_token_event(&self, bytes: &[u8]) -> Result<TokenEventData, CodecError> {
        serde_json::from_slice(bytes).map_err(|e| CodecError::new(e.to_string()))
    }
}

/// Cars: rom is the model name, ram is the mileage byte.
struct CarCodec;

impl AssetCodec for CarCodec {
    type Rom = String;
    type Ram = u8;

    fn decode_rom(&self, bytes: &[u8]) -> Result<String, CodecError> {
        String::from_utf8(bytes.to_vec()).map_err(|e| CodecError::new(e.to_string()))
    }

    fn decode_ram(&self, bytes: &[u8]) -> Result<u8, CodecError> {
        match bytes {
            [mileage] => Ok(*mileage),
            _ => Err(CodecError::new(format!("expected 1 byte, got {}", bytes.len()))),
        }
    }
}

// =============================================================================
// Helpers
// =============================================================================

fn fast_settings(max_attempts: u32) -> WorkflowSettings {
    WorkflowSettings {
        confirmation: ConfirmationPolicy {
            delay_ms: 1,
            max_attempts,
            retry_interval_ms: 1,
            backoff_factor: 1.0,
        },
        ..Default::default()
    }
}

fn event(kind: &str, data: &[u8]) -> Value {
    json!({"address": OWNER, "kind": kind, "data": hex::encode(data)})
}

fn transaction(events: Vec<Value>) -> Value {
    json!({
        "hash": HASH, "chainAddress": "S1", "timestamp": 1700000000, "confirmations": 1,
        "blockHeight": 12, "blockHash": "BH", "script": "", "events": events,
        "result": "", "fee": "10"
    })
}

fn car_token() -> Value {
    json!([{
        "symbol": "CAR", "name": "Car Demo Token", "decimals": 0, "currentSupply": "0",
        "maxSupply": "10000", "ownerAddress": OWNER, "flags": "Transferable, Finite"
    }])
}

fn mint_payload(symbol: &str, id: &str) -> Vec<u8> {
    serde_json::to_vec(&json!({"symbol": symbol, "value": id, "chainAddress": "S1"})).unwrap()
}

/// Decode the envelope submitted with `sendRawTransaction`.
fn submitted(transport: &MockTransport) -> Value {
    let call = transport
        .calls()
        .into_iter()
        .find(|c| c.method == "sendRawTransaction")
        .expect("no transaction was submitted");
    let bytes = hex::decode(call.params[0].as_str().unwrap()).unwrap();
    serde_json::from_slice(&bytes).unwrap()
}

fn methods(transport: &MockTransport) -> Vec<String> {
    transport.calls().into_iter().map(|c| c.method).collect()
}

// =============================================================================
// Create
// =============================================================================

#[tokio::test]
async fn test_create_token_confirmed() {
    let api = PhantasmaApi::new(MockTransport::new());
    api.transport()
        .respond("sendRawTransaction", json!(HASH))
        .respond(
            "getTransaction",
            transaction(vec![event("GasEscrow", b""), event("TokenCreate", b"CAR")]),
        )
        .respond("getTokens", car_token());

    let signer = JsonSigner { locked: false };
    let workflow = TransactionWorkflow::new(&api, &signer, &PlainEvents, fast_settings(1));
    let mut registry = TokenRegistry::new();

    let confirmation = workflow
        .create_token(
            &mut registry,
            "CAR",
            "Car Demo Token",
            10_000,
            0,
            TokenFlags::TRANSFERABLE | TokenFlags::FINITE,
        )
        .await
        .unwrap();

    assert_eq!(confirmation.hash, HASH);
    assert_eq!(confirmation.attempts, 1);
    assert_eq!(
        confirmation.event,
        ConfirmedEvent::TokenCreated {
            symbol: "CAR".into()
        }
    );
    assert!(registry.is_owner("CAR", OWNER));
    assert_eq!(
        methods(api.transport()),
        vec!["sendRawTransaction", "getTransaction", "getTokens"]
    );
    assert_eq!(api.transport().calls()[1].params, vec![json!(HASH)]);
}

#[tokio::test]
async fn test_create_token_script_shape() {
    let api = PhantasmaApi::new(MockTransport::new());
    api.transport()
        .respond("sendRawTransaction", json!(HASH))
        .respond("getTransaction", transaction(vec![event("TokenCreate", b"CAR")]))
        .respond("getTokens", car_token());

    let signer = JsonSigner { locked: false };
    let workflow = TransactionWorkflow::new(&api, &signer, &PlainEvents, fast_settings(1));
    workflow
        .create_token(
            &mut TokenRegistry::new(),
            "CAR",
            "Car Demo Token",
            10_000,
            0,
            TokenFlags::TRANSFERABLE | TokenFlags::FINITE,
        )
        .await
        .unwrap();

    let tx = submitted(api.transport());
    assert_eq!(tx["nexus"], "simnet");
    assert_eq!(tx["chain"], "main");

    let instructions = tx["script"]["instructions"].as_array().unwrap();
    assert_eq!(instructions.len(), 3);
    assert_eq!(
        instructions[0],
        json!({"op": "allow_gas", "address": OWNER, "price": 1, "limit": 9999})
    );
    assert_eq!(instructions[1]["contract"], "nexus");
    assert_eq!(instructions[1]["method"], "CreateToken");
    assert_eq!(
        instructions[1]["args"],
        json!([
            {"type": "text", "value": OWNER},
            {"type": "text", "value": "CAR"},
            {"type": "text", "value": "Car Demo Token"},
            {"type": "int", "value": 10000},
            {"type": "int", "value": 0},
            {"type": "int", "value": 5}
        ])
    );
    assert_eq!(instructions[2], json!({"op": "spend_gas", "address": OWNER}));
}

#[tokio::test]
async fn test_no_matching_event_fails_confirmation() {
    let api = PhantasmaApi::new(MockTransport::new());
    api.transport()
        .respond("sendRawTransaction", json!(HASH))
        .respond(
            "getTransaction",
            transaction(vec![event("GasEscrow", b""), event("GasPayment", b"")]),
        );

    let signer = JsonSigner { locked: false };
    let workflow = TransactionWorkflow::new(&api, &signer, &PlainEvents, fast_settings(1));
    let mut registry = TokenRegistry::new();

    let err = workflow
        .create_token(&mut registry, "CAR", "Car", 1, 0, TokenFlags::TRANSFERABLE)
        .await
        .unwrap_err();

    assert_eq!(err.kind(), ErrorKind::ConfirmationFailed);
    assert_eq!(err.failed_at(), WorkflowState::AwaitingConfirmation);
    assert_eq!(api.transport().call_count("getTokens"), 0);
    assert!(registry.is_empty());
}

#[tokio::test]
async fn test_registry_refresh_failure_keeps_confirmation() {
    let api = PhantasmaApi::new(MockTransport::new());
    api.transport()
        .respond("sendRawTransaction", json!(HASH))
        .respond("getTransaction", transaction(vec![event("TokenCreate", b"CAR")]))
        .fail("getTokens", RpcError::Network("reset".into()));

    let signer = JsonSigner { locked: false };
    let workflow = TransactionWorkflow::new(&api, &signer, &PlainEvents, fast_settings(1));

    let confirmation = workflow
        .create_token(&mut TokenRegistry::new(), "CAR", "Car", 1, 0, TokenFlags::TRANSFERABLE)
        .await
        .unwrap();
    assert_eq!(confirmation.hash, HASH);
}

// =============================================================================
// Failures before confirmation
// =============================================================================

#[tokio::test]
async fn test_submit_failure_skips_lookup() {
    let api = PhantasmaApi::new(MockTransport::new());
    api.transport().respond_body(
        "sendRawTransaction",
        r#"{"error":{"message":"insufficient gas"}}"#,
    );

    let signer = JsonSigner { locked: false };
    let workflow = TransactionWorkflow::new(&api, &signer, &PlainEvents, fast_settings(3));

    let err = workflow
        .create_token(&mut TokenRegistry::new(), "CAR", "Car", 1, 0, TokenFlags::TRANSFERABLE)
        .await
        .unwrap_err();

    assert_eq!(err.kind(), ErrorKind::ApiError);
    assert_eq!(err.message(), "insufficient gas");
    assert_eq!(err.failed_at(), WorkflowState::Submitted);
    assert_eq!(api.transport().call_count("getTransaction"), 0);
}

#[tokio::test]
async fn test_signing_failure_submits_nothing() {
    let api = PhantasmaApi::new(MockTransport::new());
    let signer = JsonSigner { locked: true };
    let workflow = TransactionWorkflow::new(&api, &signer, &PlainEvents, fast_settings(1));

    let err = workflow
        .create_token(&mut TokenRegistry::new(), "CAR", "Car", 1, 0, TokenFlags::TRANSFERABLE)
        .await
        .unwrap_err();

    assert_eq!(err.kind(), ErrorKind::SigningFailed);
    assert_eq!(err.failed_at(), WorkflowState::Signed);
    assert!(api.transport().calls().is_empty());
}

// =============================================================================
// Mint
// =============================================================================

#[tokio::test]
async fn test_mint_inserts_into_cache() {
    let api = PhantasmaApi::new(MockTransport::new());
    api.transport()
        .respond("sendRawTransaction", json!(HASH))
        .respond(
            "getTransaction",
            transaction(vec![
                event("TokenMint", &mint_payload("BIKE", "5")),
                event("TokenMint", &mint_payload("CAR", "77")),
            ]),
        );

    let signer = JsonSigner { locked: false };
    let workflow = TransactionWorkflow::new(&api, &signer, &PlainEvents, fast_settings(1));
    let mut cache = AssetCache::new(CarCodec);

    let confirmation = workflow
        .mint_token(&mut cache, "CAR", b"roadster", &[12])
        .await
        .unwrap();

    match &confirmation.event {
        ConfirmedEvent::TokenMinted(data) => assert_eq!(data.value, "77"),
        other => panic!("unexpected event: {:?}", other),
    }

    let car = cache.get("77").unwrap();
    assert_eq!(car.owner, OWNER);
    assert_eq!(car.symbol, "CAR");
    assert_eq!(car.rom, "roadster");
    assert_eq!(car.ram, 12);
    assert_eq!(cache.len(), 1);

    let tx = submitted(api.transport());
    let call = &tx["script"]["instructions"][1];
    assert_eq!(call["contract"], "token");
    assert_eq!(call["method"], "MintToken");
}

#[tokio::test]
async fn test_mint_rejects_unreadable_attributes() {
    let api = PhantasmaApi::new(MockTransport::new());
    let signer = JsonSigner { locked: false };
    let workflow = TransactionWorkflow::new(&api, &signer, &PlainEvents, fast_settings(1));
    let mut cache = AssetCache::new(CarCodec);

    let err = workflow
        .mint_token(&mut cache, "CAR", b"roadster", &[1, 2])
        .await
        .unwrap_err();

    assert_eq!(err.kind(), ErrorKind::SigningFailed);
    assert_eq!(err.failed_at(), WorkflowState::Built);
    assert!(api.transport().calls().is_empty());
    assert!(cache.is_empty());
}

// =============================================================================
// Confirmation policy
// =============================================================================

#[tokio::test]
async fn test_retries_until_event_appears() {
    let api = PhantasmaApi::new(MockTransport::new());
    api.transport()
        .respond("sendRawTransaction", json!(HASH))
        .fail("getTransaction", RpcError::Api("transaction not found".into()))
        .respond("getTransaction", transaction(vec![]))
        .respond("getTransaction", transaction(vec![event("TokenCreate", b"CAR")]))
        .respond("getTokens", car_token());

    let signer = JsonSigner { locked: false };
    let workflow = TransactionWorkflow::new(&api, &signer, &PlainEvents, fast_settings(3));

    let confirmation = workflow
        .create_token(&mut TokenRegistry::new(), "CAR", "Car", 1, 0, TokenFlags::TRANSFERABLE)
        .await
        .unwrap();

    assert_eq!(confirmation.attempts, 3);
    assert_eq!(api.transport().call_count("getTransaction"), 3);
}

#[tokio::test]
async fn test_single_lookup_by_default() {
    let api = PhantasmaApi::new(MockTransport::new());
    api.transport()
        .respond("sendRawTransaction", json!(HASH))
        .fail("getTransaction", RpcError::Api("transaction not found".into()))
        .respond("getTransaction", transaction(vec![event("TokenCreate", b"CAR")]));

    let signer = JsonSigner { locked: false };
    let workflow = TransactionWorkflow::new(&api, &signer, &PlainEvents, fast_settings(1));

    let err = workflow
        .create_token(&mut TokenRegistry::new(), "CAR", "Car", 1, 0, TokenFlags::TRANSFERABLE)
        .await
        .unwrap_err();

    assert_eq!(err.kind(), ErrorKind::ConfirmationFailed);
    assert!(err.message().contains("transaction not found"), "{}", err);
    assert_eq!(api.transport().call_count("getTransaction"), 1);
}

#[tokio::test]
async fn test_unreachable_node_keeps_network_kind() {
    let api = PhantasmaApi::new(MockTransport::new());
    api.transport()
        .respond("sendRawTransaction", json!(HASH))
        .fail("getTransaction", RpcError::Network("connection reset".into()));

    let signer = JsonSigner { locked: false };
    let workflow = TransactionWorkflow::new(&api, &signer, &PlainEvents, fast_settings(1));

    let err = workflow
        .create_token(&mut TokenRegistry::new(), "CAR", "Car", 1, 0, TokenFlags::TRANSFERABLE)
        .await
        .unwrap_err();

    assert_eq!(err.kind(), ErrorKind::NetworkError);
    assert_eq!(err.failed_at(), WorkflowState::AwaitingConfirmation);
    assert!(err.message().contains("connection reset"), "{}", err);
}

#[tokio::test]
async fn test_unreadable_lookup_keeps_parse_kind() {
    let api = PhantasmaApi::new(MockTransport::new());
    api.transport()
        .respond("sendRawTransaction", json!(HASH))
        .respond_body("getTransaction", "<html>502 Bad Gateway</html>");

    let signer = JsonSigner { locked: false };
    let workflow = TransactionWorkflow::new(&api, &signer, &PlainEvents, fast_settings(1));

    let err = workflow
        .create_token(&mut TokenRegistry::new(), "CAR", "Car", 1, 0, TokenFlags::TRANSFERABLE)
        .await
        .unwrap_err();

    assert_eq!(err.kind(), ErrorKind::ParseError);
    assert_eq!(err.failed_at(), WorkflowState::AwaitingConfirmation);
}

#[tokio::test]
async fn test_network_failure_then_confirmed() {
    let api = PhantasmaApi::new(MockTransport::new());
    api.transport()
        .respond("sendRawTransaction", json!(HASH))
        .fail("getTransaction", RpcError::Network("connection reset".into()))
        .respond("getTransaction", transaction(vec![event("TokenCreate", b"CAR")]))
        .respond("getTokens", car_token());

    let signer = JsonSigner { locked: false };
    let workflow = TransactionWorkflow::new(&api, &signer, &PlainEvents, fast_settings(2));

    let confirmation = workflow
        .create_token(&mut TokenRegistry::new(), "CAR", "Car", 1, 0, TokenFlags::TRANSFERABLE)
        .await
        .unwrap();
    assert_eq!(confirmation.attempts, 2);
}

#[tokio::test(start_paused = true)]
async fn test_default_policy_waits_ten_seconds() {
    let api = PhantasmaApi::new(MockTransport::new());
    api.transport()
        .respond("sendRawTransaction", json!(HASH))
        .respond("getTransaction", transaction(vec![event("TokenCreate", b"CAR")]));

    let signer = JsonSigner { locked: false };
    let workflow =
        TransactionWorkflow::new(&api, &signer, &PlainEvents, WorkflowSettings::default());
    let script = phantasma_link::script::ScriptBuilder::begin()
        .allow_gas(OWNER, 1, 9999)
        .spend_gas(OWNER)
        .end();
    let start = tokio::time::Instant::now();

    let confirm = async {
        let hash = workflow.sign_and_send("main", script).await?;
        workflow
            .await_confirmation(
                &hash,
                &phantasma_link::workflow::Expectation::TokenCreated {
                    symbol: "CAR".into(),
                },
            )
            .await
    };
    let watch = async {
        tokio::time::sleep(Duration::from_millis(9_990)).await;
        let before = api.transport().call_count("getTransaction");
        tokio::time::sleep(Duration::from_millis(20)).await;
        let after = api.transport().call_count("getTransaction");
        (before, after)
    };

    let (outcome, (before, after)) = tokio::join!(confirm, watch);

    assert_eq!(outcome.unwrap().attempts, 1);
    assert_eq!(before, 0);
    assert_eq!(after, 1);
    assert!(start.elapsed() >= Duration::from_secs(10));
}

#[tokio::test]
async fn test_unknown_event_kind_fails_without_retry() {
    let api = PhantasmaApi::new(MockTransport::new());
    api.transport()
        .respond("sendRawTransaction", json!(HASH))
        .respond(
            "getTransaction",
            transaction(vec![event("TokenTeleport", b""), event("TokenCreate", b"CAR")]),
        );

    let signer = JsonSigner { locked: false };
    let workflow = TransactionWorkflow::new(&api, &signer, &PlainEvents, fast_settings(3));

    let err = workflow
        .create_token(&mut TokenRegistry::new(), "CAR", "Car", 1, 0, TokenFlags::TRANSFERABLE)
        .await
        .unwrap_err();

    assert_eq!(err.kind(), ErrorKind::ConfirmationFailed);
    assert!(err.message().contains("TokenTeleport"));
    assert_eq!(api.transport().call_count("getTransaction"), 1);
}

#[tokio::test]
async fn test_sign_and_send_returns_hash() {
    let api = PhantasmaApi::new(MockTransport::new());
    api.transport().respond("sendRawTransaction", json!(HASH));

    let signer = JsonSigner { locked: false };
    let workflow = TransactionWorkflow::new(&api, &signer, &PlainEvents, fast_settings(1));
    let script = phantasma_link::script::ScriptBuilder::begin()
        .allow_gas(OWNER, 1, 9999)
        .spend_gas(OWNER)
        .end();

    let hash = workflow.sign_and_send("apps", script).await.unwrap();
    assert_eq!(hash, HASH);
    assert_eq!(submitted(api.transport())["chain"], "apps");
    assert_eq!(api.transport().call_count("getTransaction"), 0);
}
