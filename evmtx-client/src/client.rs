//! Typed JSON-RPC client.
//!
//! [`RpcClient`] wraps a [`Transport`] with request-id assignment, exhaustive
//! response decoding, bounded transport-level retries, and one typed method
//! per RPC call this system consumes. A node-reported error is never retried;
//! it reaches the caller with the method, code, message, and payload intact.

use core::fmt;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;

use serde::Deserialize;
use serde_json::{json, Value};

use evmtx::{Address, Hash256};

use crate::quantity;
use crate::receipt::TransactionReceipt;
use crate::retry::RetryPolicy;
use crate::transport::{Transport, TransportError};

/// Backoff between transport-level retries of one call.
const RETRY_BACKOFF: Duration = Duration::from_secs(1);

/// RPC failures, classified by where they originate.
#[derive(Debug, Clone)]
pub enum RpcError {
    /// The transport failed after the configured retries. Retryable from the
    /// caller's perspective, since nothing reached the node.
    Transport {
        method: &'static str,
        attempts: u32,
        detail: String,
    },
    /// The node returned a structured error payload. Not retryable; the
    /// request was understood and rejected.
    Protocol {
        method: &'static str,
        code: i64,
        message: String,
        data: Option<Value>,
    },
    /// The node answered with something this client cannot interpret.
    Response { method: &'static str, detail: String },
}

impl RpcError {
    /// True for failures where retrying the identical call can succeed.
    pub fn is_retryable(&self) -> bool {
        matches!(self, RpcError::Transport { .. })
    }

    pub fn method(&self) -> &'static str {
        match self {
            RpcError::Transport { method, .. }
            | RpcError::Protocol { method, .. }
            | RpcError::Response { method, .. } => method,
        }
    }
}

impl fmt::Display for RpcError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RpcError::Transport { method, attempts, detail } => {
                write!(f, "{method}: transport failed after {attempts} attempt(s): {detail}")
            }
            RpcError::Protocol { method, code, message, .. } => {
                write!(f, "{method}: node error {code}: {message}")
            }
            RpcError::Response { method, detail } => {
                write!(f, "{method}: unintelligible response: {detail}")
            }
        }
    }
}

impl std::error::Error for RpcError {}

/// The error object of a JSON-RPC response.
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct ErrorPayload {
    pub code: i64,
    pub message: String,
    #[serde(default)]
    pub data: Option<Value>,
}

/// A fully decoded response envelope: exactly one of `result` / `error`.
#[derive(Debug, Clone, PartialEq)]
pub enum RpcOutcome {
    Result(Value),
    Error(ErrorPayload),
}

impl RpcOutcome {
    /// Decodes a response body. Bodies carrying both or neither of
    /// `result`/`error` are malformed.
    pub fn from_body(body: &Value) -> Result<Self, String> {
        let error = body.get("error").filter(|v| !v.is_null());
        let result = body.get("result");
        match (result, error) {
            (_, Some(error)) => {
                let payload: ErrorPayload = serde_json::from_value(error.clone())
                    .map_err(|e| format!("malformed error object: {e}"))?;
                Ok(RpcOutcome::Error(payload))
            }
            (Some(result), None) => Ok(RpcOutcome::Result(result.clone())),
            (None, None) => Err(format!("response carries neither result nor error: {body}")),
        }
    }
}

/// A typed client over one transport.
pub struct RpcClient {
    transport: Arc<dyn Transport>,
    next_id: AtomicU64,
    retry: RetryPolicy,
}

impl RpcClient {
    /// Client with the default retry discipline (three retries, 1 s apart).
    pub fn new(transport: Arc<dyn Transport>) -> Self {
        Self::with_retry(transport, RetryPolicy { interval: RETRY_BACKOFF, max_attempts: 4 })
    }

    /// Client with an explicit transport-retry policy. `max_attempts` counts
    /// the first try.
    pub fn with_retry(transport: Arc<dyn Transport>, retry: RetryPolicy) -> Self {
        Self { transport, next_id: AtomicU64::new(1), retry }
    }

    /// Performs one RPC call, retrying transport failures per the policy.
    pub fn request(&self, method: &'static str, params: Value) -> Result<Value, RpcError> {
        self.retry
            .retry(|attempt| self.request_once(method, &params, attempt), RpcError::is_retryable)
    }

    fn request_once(&self, method: &'static str, params: &Value, attempt: u32) -> Result<Value, RpcError> {
        let id = self.next_id.fetch_add(1, Ordering::Relaxed);
        let request = json!({
            "jsonrpc": "2.0",
            "method": method,
            "params": params,
            "id": id,
        });

        log::debug!("rpc {method} id={id} attempt={attempt}");
        let body = self.transport.exchange(&request).map_err(|TransportError(detail)| {
            log::warn!("rpc {method} attempt {attempt} failed: {detail}");
            RpcError::Transport { method, attempts: attempt, detail }
        })?;

        match RpcOutcome::from_body(&body).map_err(|detail| RpcError::Response { method, detail })? {
            RpcOutcome::Result(value) => Ok(value),
            RpcOutcome::Error(err) => Err(RpcError::Protocol {
                method,
                code: err.code,
                message: err.message,
                data: err.data,
            }),
        }
    }

    // =========================================================================
    // Typed methods
    // =========================================================================

    /// `eth_getTransactionCount(address, "latest")`.
    pub fn transaction_count(&self, address: &Address) -> Result<u64, RpcError> {
        const METHOD: &str = "eth_getTransactionCount";
        let result = self.request(METHOD, json!([quantity::to_data(address), "latest"]))?;
        parse_with(METHOD, &result, quantity::parse_u64)
    }

    /// `eth_gasPrice()`, in wei.
    pub fn gas_price(&self) -> Result<u128, RpcError> {
        const METHOD: &str = "eth_gasPrice";
        let result = self.request(METHOD, json!([]))?;
        parse_with(METHOD, &result, quantity::parse_u128)
    }

    /// `eth_chainId()`.
    pub fn chain_id(&self) -> Result<u64, RpcError> {
        const METHOD: &str = "eth_chainId";
        let result = self.request(METHOD, json!([]))?;
        parse_with(METHOD, &result, quantity::parse_u64)
    }

    /// `eth_getBalance(address, "latest")`, in wei.
    pub fn balance(&self, address: &Address) -> Result<u128, RpcError> {
        const METHOD: &str = "eth_getBalance";
        let result = self.request(METHOD, json!([quantity::to_data(address), "latest"]))?;
        parse_with(METHOD, &result, quantity::parse_u128)
    }

    /// `eth_sendRawTransaction`. Returns the transaction hash: mempool
    /// acceptance, not confirmation.
    pub fn send_raw_transaction(&self, raw: &[u8]) -> Result<Hash256, RpcError> {
        const METHOD: &str = "eth_sendRawTransaction";
        let result = self.request(METHOD, json!([quantity::to_data(raw)]))?;
        parse_with(METHOD, &result, quantity::parse_hash)
    }

    /// `eth_getTransactionReceipt`. `None` while the transaction is pending.
    pub fn transaction_receipt(&self, hash: &Hash256) -> Result<Option<TransactionReceipt>, RpcError> {
        const METHOD: &str = "eth_getTransactionReceipt";
        let result = self.request(METHOD, json!([quantity::to_data(hash)]))?;
        if result.is_null() {
            return Ok(None);
        }
        TransactionReceipt::from_value(&result)
            .map(Some)
            .map_err(|detail| RpcError::Response { method: METHOD, detail })
    }

    /// `eth_call` against latest state; returns the raw return data.
    pub fn call(&self, to: &Address, data: &[u8]) -> Result<Vec<u8>, RpcError> {
        const METHOD: &str = "eth_call";
        let params = json!([
            { "to": quantity::to_data(to), "data": quantity::to_data(data) },
            "latest",
        ]);
        let result = self.request(METHOD, params)?;
        parse_with(METHOD, &result, quantity::parse_bytes)
    }
}

/// Applies a hex parser to a string result, mapping failures to
/// [`RpcError::Response`].
fn parse_with<T>(
    method: &'static str,
    result: &Value,
    parse: impl Fn(&str) -> Result<T, quantity::HexError>,
) -> Result<T, RpcError> {
    let text = result.as_str().ok_or_else(|| RpcError::Response {
        method,
        detail: format!("expected hex string, got {result}"),
    })?;
    parse(text).map_err(|e| RpcError::Response { method, detail: format!("{e} in {text:?}") })
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::VecDeque;
    use std::sync::Mutex;
    use std::time::Duration;

    /// Pops one canned reply per exchange.
    struct Scripted {
        replies: Mutex<VecDeque<Result<Value, TransportError>>>,
    }

    impl Scripted {
        fn new(replies: Vec<Result<Value, TransportError>>) -> Arc<Self> {
            Arc::new(Self { replies: Mutex::new(replies.into_iter().collect()) })
        }
    }

    impl Transport for Scripted {
        fn exchange(&self, _request: &Value) -> Result<Value, TransportError> {
            self.replies
                .lock()
                .unwrap()
                .pop_front()
                .expect("unexpected RPC call")
        }
    }

    fn fast_client(transport: Arc<dyn Transport>) -> RpcClient {
        RpcClient::with_retry(transport, RetryPolicy { interval: Duration::ZERO, max_attempts: 3 })
    }

    fn ok_body(result: Value) -> Value {
        json!({"jsonrpc": "2.0", "id": 1, "result": result})
    }

    #[test]
    fn envelope_decoding_is_exhaustive() {
        let ok = RpcOutcome::from_body(&ok_body(json!("0x1"))).unwrap();
        assert_eq!(ok, RpcOutcome::Result(json!("0x1")));

        let err = RpcOutcome::from_body(&json!({
            "jsonrpc": "2.0", "id": 1,
            "error": {"code": -32000, "message": "nonce too low"},
        }))
        .unwrap();
        assert_eq!(
            err,
            RpcOutcome::Error(ErrorPayload {
                code: -32000,
                message: "nonce too low".into(),
                data: None,
            })
        );

        // Neither field: malformed.
        assert!(RpcOutcome::from_body(&json!({"jsonrpc": "2.0", "id": 1})).is_err());

        // An explicit null error does not mask the result.
        let ok = RpcOutcome::from_body(&json!({
            "jsonrpc": "2.0", "id": 1, "result": "0x1", "error": null,
        }))
        .unwrap();
        assert_eq!(ok, RpcOutcome::Result(json!("0x1")));
    }

    #[test]
    fn transport_failures_are_retried() {
        let transport = Scripted::new(vec![
            Err(TransportError("connection refused".into())),
            Err(TransportError("connection refused".into())),
            Ok(ok_body(json!("0x2a"))),
        ]);
        let client = fast_client(transport);
        assert_eq!(client.gas_price().unwrap(), 42);
    }

    #[test]
    fn transport_retries_are_bounded() {
        let transport = Scripted::new(vec![
            Err(TransportError("timeout".into())),
            Err(TransportError("timeout".into())),
            Err(TransportError("timeout".into())),
        ]);
        let client = fast_client(transport);
        match client.gas_price().unwrap_err() {
            RpcError::Transport { method, attempts, .. } => {
                assert_eq!(method, "eth_gasPrice");
                assert_eq!(attempts, 3);
            }
            other => panic!("expected transport error, got {other}"),
        }
    }

    #[test]
    fn protocol_errors_are_not_retried() {
        // A single scripted reply: a second attempt would panic the script.
        let transport = Scripted::new(vec![Ok(json!({
            "jsonrpc": "2.0", "id": 1,
            "error": {"code": 3, "message": "execution reverted", "data": "0x"},
        }))]);
        let client = fast_client(transport);
        match client.chain_id().unwrap_err() {
            RpcError::Protocol { code, message, .. } => {
                assert_eq!(code, 3);
                assert_eq!(message, "execution reverted");
            }
            other => panic!("expected protocol error, got {other}"),
        }
    }

    #[test]
    fn typed_results_are_parsed() {
        let hash = [0x11u8; 32];
        let transport = Scripted::new(vec![
            Ok(ok_body(json!("0x5"))),
            Ok(ok_body(json!(format!("0x{}", hex::encode(hash))))),
            Ok(ok_body(json!("0xdeadbeef"))),
        ]);
        let client = fast_client(transport);
        assert_eq!(client.transaction_count(&[0xaa; 20]).unwrap(), 5);
        assert_eq!(client.send_raw_transaction(&[0xf8, 0x6c]).unwrap(), hash);
        assert_eq!(client.call(&[0xaa; 20], &[1, 2, 3, 4]).unwrap(), vec![0xde, 0xad, 0xbe, 0xef]);
    }

    #[test]
    fn malformed_results_surface_as_response_errors() {
        let transport = Scripted::new(vec![Ok(ok_body(json!(7)))]);
        let client = fast_client(transport);
        assert!(matches!(client.gas_price().unwrap_err(), RpcError::Response { .. }));
    }
}
