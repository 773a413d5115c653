//! In-memory transport that replays scripted outcomes.
//!
//! Outcomes are queued per method and consumed in FIFO order. Every call is
//! recorded so tests can assert on what was sent and in which order.

use std::collections::{HashMap, HashSet, VecDeque};
use std::sync::Mutex;

use async_trait::async_trait;
use serde_json::Value;

use super::client::{ResponseOutcome, RpcError, Transport};
use super::envelope::classify_body;

/// A call observed by [`MockTransport`].
#[derive(Debug, Clone, PartialEq)]
pub struct RecordedCall {
    pub method: String,
    pub params: Vec<Value>,
}

/// Scripted [`Transport`] for tests and offline runs.
///
/// A call to a method with nothing queued resolves to an `API_ERROR`, so a
/// missing script entry fails loudly instead of hanging.
#[derive(Debug, Default)]
pub struct MockTransport {
    outcomes: Mutex<HashMap<String, VecDeque<ResponseOutcome>>>,
    hanging: Mutex<HashSet<String>>,
    calls: Mutex<Vec<RecordedCall>>,
}

impl MockTransport {
    pub fn new() -> Self {
        Self::default()
    }

    /// Queue a successful `result` node for `method`.
    pub fn respond(&self, method: &str, result: Value) -> &Self {
        self.push(method, Ok(result))
    }

    /// Queue a raw response body for `method`; it goes through the same
    /// classification as a real HTTP body.
    pub fn respond_body(&self, method: &str, body: &str) -> &Self {
        self.push(method, classify_body(body))
    }

    /// Queue a failure for `method`.
    pub fn fail(&self, method: &str, error: RpcError) -> &Self {
        self.push(method, Err(error))
    }

    /// Make every call to `method` pend forever.
    pub fn hang(&self, method: &str) -> &Self {
        lock(&self.hanging).insert(method.to_string());
        self
    }

    /// All calls seen so far, in order.
    pub fn calls(&self) -> Vec<RecordedCall> {
        lock(&self.calls).clone()
    }

    /// Number of calls made to `method`.
    pub fn call_count(&self, method: &str) -> usize {
        lock(&self.calls).iter().filter(|c| c.method == method).count()
    }

    /// Number of queued outcomes not yet consumed, across all methods.
    pub fn pending(&self) -> usize {
        lock(&self.outcomes).values().map(VecDeque::len).sum()
    }

    fn push(&self, method: &str, outcome: ResponseOutcome) -> &Self {
        lock(&self.outcomes)
            .entry(method.to_string())
            .or_default()
            .push_back(outcome);
        self
    }
}

/// Lock a mutex, recovering the data if a panicking test poisoned it.
fn lock<T>(mutex: &Mutex<T>) -> std::sync::MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
}

#[async_trait]
impl Transport for MockTransport {
    async fn send(&self, method: &str, params: Vec<Value>) -> ResponseOutcome {
        lock(&self.calls).push(RecordedCall {
            method: method.to_string(),
            params,
        });

        let hangs = lock(&self.hanging).contains(method);
        if hangs {
            std::future::pending::<()>().await;
        }

        lock(&self.outcomes)
            .get_mut(method)
            .and_then(VecDeque::pop_front)
            .unwrap_or_else(|| Err(RpcError::Api(format!("no response scripted for {}", method))))
    }
}
