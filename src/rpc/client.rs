//! HTTP transport for JSON-RPC 2.0 requests.
//!
//! This module provides the [`Transport`] seam and `HttpTransport`, its
//! production implementation: one POST per call against a single configured
//! endpoint, with a per-request timeout and no retries.

use std::future::Future;
use std::time::Duration;

use async_trait::async_trait;
use serde_json::Value;
use thiserror::Error;

use crate::error::ErrorKind;
use crate::rpc::envelope::{classify_body, JsonRpcRequest};

/// Default request timeout in seconds.
pub const DEFAULT_TIMEOUT_SECS: u64 = 30;

/// Result of one round trip: the `result` node, or a classified failure.
pub type ResponseOutcome = Result<Value, RpcError>;

/// Transport-level error types.
///
/// Every variant maps onto exactly one [`ErrorKind`].
#[derive(Debug, Error)]
pub enum RpcError {
    /// The node returned an `error` envelope; holds its message verbatim.
    #[error("{0}")]
    Api(String),

    /// No body was obtained: connect failure, timeout or HTTP error status.
    #[error("Request failed: {0}")]
    Network(String),

    /// The body was not valid JSON.
    #[error("Failed to parse JSON: {0}")]
    Parse(String),

    /// Valid JSON that is not a usable envelope.
    #[error("Malformed response: {0}")]
    Malformed(String),

    /// The caller cancelled the request before it completed.
    #[error("Request cancelled")]
    Cancelled,
}

impl RpcError {
    /// Classification of this error.
    pub fn kind(&self) -> ErrorKind {
        match self {
            RpcError::Api(_) => ErrorKind::ApiError,
            RpcError::Network(_) | RpcError::Cancelled => ErrorKind::NetworkError,
            RpcError::Parse(_) => ErrorKind::ParseError,
            RpcError::Malformed(_) => ErrorKind::MalformedResponse,
        }
    }
}

impl From<reqwest::Error> for RpcError {
    fn from(err: reqwest::Error) -> Self {
        if err.is_timeout() {
            RpcError::Network(format!("timed out: {}", err))
        } else {
            RpcError::Network(err.to_string())
        }
    }
}

/// Something that can carry a JSON-RPC call to a node.
///
/// Implementations must not retry; retry policy belongs to callers.
#[async_trait]
pub trait Transport: Send + Sync {
    /// Send `method` with positional `params` and classify the outcome.
    async fn send(&self, method: &str, params: Vec<Value>) -> ResponseOutcome;
}

/// Race a request against a cancellation signal.
///
/// When `cancelled` resolves first the in-flight request future is dropped,
/// which aborts the underlying connection, and `RpcError::Cancelled` is
/// returned.
///
/// # Example
///
/// ```ignore
/// let (tx, rx) = tokio::sync::oneshot::channel::<()>();
/// let outcome = cancellable(&transport, "getChains", vec![], async {
///     let _ = rx.await;
/// })
/// .await;
/// ```
pub async fn cancellable<T, F>(
    transport: &T,
    method: &str,
    params: Vec<Value>,
    cancelled: F,
) -> ResponseOutcome
where
    T: Transport + ?Sized,
    F: Future<Output = ()>,
{
    tokio::select! {
        outcome = transport.send(method, params) => outcome,
        _ = cancelled => {
            tracing::debug!(method, "request cancelled");
            Err(RpcError::Cancelled)
        }
    }
}

/// JSON-RPC client over HTTP.
///
/// Holds a pooled `reqwest::Client`, so cloning the transport or issuing
/// concurrent calls is cheap and shares connections.
///
/// # Example
///
/// ```ignore
/// use phantasma_link::rpc::{HttpTransport, Transport};
/// use serde_json::json;
///
/// let transport = HttpTransport::new("http://localhost:7077/rpc")?;
/// let account = transport.send("getAccount", vec![json!(address)]).await?;
/// ```
#[derive(Debug, Clone)]
pub struct HttpTransport {
    /// Pooled HTTP client.
    http: reqwest::Client,
    /// Node RPC endpoint.
    endpoint: String,
    /// Request timeout duration.
    timeout: Duration,
}

impl HttpTransport {
    /// Create a transport with the default 30 second timeout.
    ///
    /// # Errors
    ///
    /// Returns `RpcError::Network` if the HTTP client cannot be built
    /// (for example when no TLS backend is available).
    pub fn new(endpoint: impl Into<String>) -> Result<Self, RpcError> {
        Self::with_timeout(endpoint, Duration::from_secs(DEFAULT_TIMEOUT_SECS))
    }

    /// Create a transport with a custom per-request timeout.
    pub fn with_timeout(endpoint: impl Into<String>, timeout: Duration) -> Result<Self, RpcError> {
        let http = reqwest::Client::builder().timeout(timeout).build()?;

        Ok(Self {
            http,
            endpoint: endpoint.into(),
            timeout,
        })
    }

    /// The endpoint every request is posted to.
    pub fn endpoint(&self) -> &str {
        &self.endpoint
    }

    /// The per-request timeout.
    pub fn timeout(&self) -> Duration {
        self.timeout
    }

    /// POST the request and return the raw body (internal, no classification).
    async fn post(&self, request: &JsonRpcRequest<'_>) -> Result<String, RpcError> {
        let response = self
            .http
            .post(&self.endpoint)
            .json(request)
            .send()
            .await?
            .error_for_status()?;

        Ok(response.text().await?)
    }
}

#[async_trait]
impl Transport for HttpTransport {
    async fn send(&self, method: &str, params: Vec<Value>) -> ResponseOutcome {
        let request = JsonRpcRequest::new(method, params);
        tracing::debug!(method, params = request.params.len(), "rpc request");

        let outcome = match self.post(&request).await {
            Ok(body) => {
                tracing::trace!(method, %body, "rpc response");
                classify_body(&body)
            }
            Err(e) => Err(e),
        };

        if let Err(e) = &outcome {
            tracing::warn!(method, kind = %e.kind(), error = %e, "rpc request failed");
        }

        outcome
    }
}
