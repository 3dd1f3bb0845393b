//! JSON-RPC transport abstraction.
//!
//! A [`Transport`] moves one request envelope to the node and returns the
//! raw response body; it knows nothing about methods or retries. The HTTP
//! implementation blocks the calling thread for the round trip. Tests swap
//! in scripted transports.

use core::fmt;
use std::time::Duration;

use serde_json::Value;

/// Default per-request timeout for the HTTP transport.
const DEFAULT_TIMEOUT: Duration = Duration::from_secs(30);

/// A failure of the exchange itself: connection refused, timeout, non-JSON
/// body. Distinct from a node-reported error, which arrives as a well-formed
/// response.
#[derive(Debug, Clone)]
pub struct TransportError(pub String);

impl fmt::Display for TransportError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "transport failure: {}", self.0)
    }
}

impl std::error::Error for TransportError {}

/// One blocking JSON-RPC exchange.
pub trait Transport: Send + Sync {
    /// Sends the request envelope and returns the raw response body.
    fn exchange(&self, request: &Value) -> Result<Value, TransportError>;
}

/// HTTP POST transport over a blocking reqwest client.
pub struct HttpTransport {
    http: reqwest::blocking::Client,
    url: String,
}

impl HttpTransport {
    pub fn new(url: impl Into<String>) -> Result<Self, TransportError> {
        Self::with_timeout(url, DEFAULT_TIMEOUT)
    }

    pub fn with_timeout(url: impl Into<String>, timeout: Duration) -> Result<Self, TransportError> {
        let http = reqwest::blocking::Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| TransportError(format!("failed to build HTTP client: {e}")))?;
        Ok(Self { http, url: url.into() })
    }

    pub fn url(&self) -> &str {
        &self.url
    }
}

impl Transport for HttpTransport {
    fn exchange(&self, request: &Value) -> Result<Value, TransportError> {
        let response = self
            .http
            .post(&self.url)
            .json(request)
            .send()
            .map_err(|e| TransportError(format!("request to {} failed: {e}", self.url)))?;

        let status = response.status();
        if !status.is_success() {
            return Err(TransportError(format!("HTTP status {status} from {}", self.url)));
        }

        response
            .json()
            .map_err(|e| TransportError(format!("response body is not JSON: {e}")))
    }
}
