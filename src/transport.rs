//! The HTTP side of the scanner.
//!
//! Callers only see [`Transport`]; `HttpTransport` is the reqwest-backed
//! implementation used by the binary.

use std::time::Duration;

use async_trait::async_trait;
use tracing::debug;

use crate::error::TransportError;
use crate::mode::TimeoutPolicy;
use crate::request::RequestDescriptor;

/// Status recorded for a request that never got a response.
pub const NO_RESPONSE_STATUS: u16 = 599;

/// Default finite request timeout in milliseconds.
pub const DEFAULT_TIMEOUT_MS: u64 = 20_000;

/// A received HTTP response, whatever its status.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FetchResponse {
    pub status: u16,
    pub body: String,
}

impl FetchResponse {
    pub fn is_success(&self) -> bool {
        (200..300).contains(&self.status)
    }
}

/// Performs one request. Shared read-only by every concurrent scan task.
#[async_trait]
pub trait Transport: Send + Sync {
    async fn fetch(&self, request: &RequestDescriptor) -> Result<FetchResponse, TransportError>;
}

/// reqwest-backed transport with a single pooled client.
#[derive(Debug, Clone)]
pub struct HttpTransport {
    client: reqwest::Client,
    default_timeout: Duration,
}

impl HttpTransport {
    /// Build a transport whose finite timeout is `timeout_ms`.
    ///
    /// The client itself carries no timeout; it is applied per request so
    /// that `TimeoutPolicy::Unbounded` requests can wait indefinitely.
    pub fn new(timeout_ms: u64) -> Result<Self, TransportError> {
        let client = reqwest::Client::builder()
            .redirect(reqwest::redirect::Policy::limited(10))
            .user_agent(concat!("oai-set-scan/", env!("CARGO_PKG_VERSION")))
            .build()
            .map_err(|e| TransportError::Other(e.to_string()))?;
        Ok(Self {
            client,
            default_timeout: Duration::from_millis(timeout_ms),
        })
    }
}

#[async_trait]
impl Transport for HttpTransport {
    async fn fetch(&self, request: &RequestDescriptor) -> Result<FetchResponse, TransportError> {
        let mut builder = self.client.get(&request.url);
        if request.timeout == TimeoutPolicy::TransportDefault {
            builder = builder.timeout(self.default_timeout);
        }

        debug!(url = %request.url, verb = request.verb, "sending request");
        let resp = builder.send().await.map_err(classify)?;
        let status = resp.status().as_u16();
        let body = resp.text().await.map_err(classify)?;
        debug!(url = %request.url, status, bytes = body.len(), "response received");

        Ok(FetchResponse { status, body })
    }
}

fn classify(err: reqwest::Error) -> TransportError {
    if err.is_timeout() {
        TransportError::Timeout(err.to_string())
    } else if err.is_connect() {
        TransportError::Connect(err.to_string())
    } else {
        TransportError::Other(err.to_string())
    }
}
