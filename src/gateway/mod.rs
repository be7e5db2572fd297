//! Authenticated request/response gateway to the platform API.
//!
//! [`Transport`] performs one raw call and reports *why* it failed.
//! [`GatewayClient`] layers the retry policy on top and collapses every
//! failure into `None` for the decision logic downstream, logging the cause
//! once. Nothing in this module panics or propagates network errors.

use std::sync::LazyLock;

use async_trait::async_trait;
use regex::Regex;
use serde_json::Value;
use tracing::{debug, warn};

pub mod http;
pub mod retry;

pub use http::HttpTransport;
pub use retry::RetryPolicy;

// ---------------------------------------------------------------------------
// Requests
// ---------------------------------------------------------------------------

/// HTTP method used by the agent.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ApiMethod {
    /// Read-only fetch.
    Get,
    /// Service call or config action.
    Post,
}

impl std::fmt::Display for ApiMethod {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Get => f.write_str("GET"),
            Self::Post => f.write_str("POST"),
        }
    }
}

/// A single API call, relative to `<base_url>/api/`.
#[derive(Debug, Clone, PartialEq)]
pub struct ApiRequest {
    /// HTTP method.
    pub method: ApiMethod,
    /// Path below `/api/`, without a leading slash.
    pub path: String,
    /// Optional JSON body (POST only).
    pub body: Option<Value>,
}

impl ApiRequest {
    /// Build a GET request.
    pub fn get(path: impl Into<String>) -> Self {
        Self {
            method: ApiMethod::Get,
            path: path.into(),
            body: None,
        }
    }

    /// Build a POST request.
    pub fn post(path: impl Into<String>, body: Option<Value>) -> Self {
        Self {
            method: ApiMethod::Post,
            path: path.into(),
            body,
        }
    }
}

// ---------------------------------------------------------------------------
// Errors
// ---------------------------------------------------------------------------

/// Why a gateway call produced no data.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum GatewayError {
    /// The request exceeded the configured timeout.
    #[error("request timed out")]
    Timeout,
    /// Connection or protocol failure before a response arrived.
    #[error("transport failure: {0}")]
    Transport(String),
    /// The platform answered with a non-success status.
    #[error("non-success status {status}: {body}")]
    HttpStatus {
        /// HTTP status code.
        status: u16,
        /// Sanitised response body.
        body: String,
    },
    /// The response body was not valid JSON.
    #[error("undecodable response: {0}")]
    Decode(String),
}

impl GatewayError {
    /// Whether another attempt could plausibly succeed.
    pub fn is_retryable(&self) -> bool {
        match self {
            Self::Timeout | Self::Transport(_) => true,
            Self::HttpStatus { status, .. } => *status == 429 || *status >= 500,
            Self::Decode(_) => false,
        }
    }
}

/// Longest error body kept in logs, in characters.
const MAX_LOGGED_BODY_CHARS: usize = 200;

/// Bearer credentials and bare JWTs; the platform's access tokens are JWTs.
static TOKEN_PATTERN: LazyLock<Option<Regex>> =
    LazyLock::new(|| Regex::new(r"(?i)bearer\s+\S+|eyJ[\w-]+\.[\w-]+\.[\w-]+").ok());

/// Prepare a response or transport error body for logging: whitespace is
/// collapsed, tokens are masked, and anything past the length cap is cut.
pub fn sanitize_error_body(raw: &str) -> String {
    let collapsed = raw.split_whitespace().collect::<Vec<_>>().join(" ");
    let masked = match TOKEN_PATTERN.as_ref() {
        Some(pattern) => pattern.replace_all(&collapsed, "[REDACTED]").into_owned(),
        None => collapsed,
    };

    match masked.char_indices().nth(MAX_LOGGED_BODY_CHARS) {
        Some((cut, _)) => {
            let (kept, dropped) = masked.split_at(cut);
            format!("{kept} [+{} chars]", dropped.chars().count())
        }
        None => masked,
    }
}

// ---------------------------------------------------------------------------
// Transport
// ---------------------------------------------------------------------------

/// One raw attempt at an API call.
///
/// Implementations must be `Send + Sync` so the diagnostic fan-out can
/// borrow them from concurrent futures.
#[async_trait]
pub trait Transport: Send + Sync {
    /// Perform the request once.
    ///
    /// # Errors
    ///
    /// Returns [`GatewayError`] describing the failure kind.
    async fn send(&self, request: &ApiRequest) -> Result<Value, GatewayError>;
}

#[async_trait]
impl<T: Transport + ?Sized> Transport for std::sync::Arc<T> {
    async fn send(&self, request: &ApiRequest) -> Result<Value, GatewayError> {
        (**self).send(request).await
    }
}

/// Stand-in used when no real transport could be built: every call fails
/// with the same transport error.
#[derive(Debug, Clone)]
pub struct UnavailableTransport {
    reason: String,
}

impl UnavailableTransport {
    /// Fail every call with `reason`.
    pub fn new(reason: impl Into<String>) -> Self {
        Self {
            reason: reason.into(),
        }
    }
}

#[async_trait]
impl Transport for UnavailableTransport {
    async fn send(&self, _request: &ApiRequest) -> Result<Value, GatewayError> {
        Err(GatewayError::Transport(self.reason.clone()))
    }
}

// ---------------------------------------------------------------------------
// Client
// ---------------------------------------------------------------------------

/// Retrying gateway client with the "always returns" contract.
#[derive(Debug, Clone)]
pub struct GatewayClient<T> {
    transport: T,
    retry: RetryPolicy,
}

impl<T: Transport> GatewayClient<T> {
    /// Wrap a transport with a retry policy.
    pub fn new(transport: T, retry: RetryPolicy) -> Self {
        Self { transport, retry }
    }

    /// Borrow the underlying transport.
    pub fn transport(&self) -> &T {
        &self.transport
    }

    /// Perform a call under the retry policy, keeping the failure cause.
    ///
    /// # Errors
    ///
    /// Returns the error of the last attempt once the policy gives up.
    pub async fn call(&self, request: &ApiRequest) -> Result<Value, GatewayError> {
        let mut attempt: u32 = 1;
        loop {
            match self.transport.send(request).await {
                Ok(value) => return Ok(value),
                Err(e) if e.is_retryable() && attempt < self.retry.max_attempts() => {
                    let delay = self.retry.backoff_for(attempt);
                    debug!(
                        method = %request.method,
                        path = %request.path,
                        attempt,
                        delay_ms = u64::try_from(delay.as_millis()).unwrap_or(u64::MAX),
                        error = %e,
                        "retrying gateway call"
                    );
                    tokio::time::sleep(delay).await;
                    attempt = attempt.saturating_add(1);
                }
                Err(e) => return Err(e),
            }
        }
    }

    /// GET `path`; `None` on any failure.
    pub async fn get(&self, path: &str) -> Option<Value> {
        self.call_or_absent(&ApiRequest::get(path)).await
    }

    /// POST `path` with an optional JSON body; `None` on any failure.
    pub async fn post(&self, path: &str, body: Option<Value>) -> Option<Value> {
        self.call_or_absent(&ApiRequest::post(path, body)).await
    }

    async fn call_or_absent(&self, request: &ApiRequest) -> Option<Value> {
        match self.call(request).await {
            Ok(value) => Some(value),
            Err(e) => {
                warn!(
                    method = %request.method,
                    path = %request.path,
                    error = %e,
                    "gateway call failed"
                );
                None
            }
        }
    }
}
