//! Blocking JSON-RPC client and transaction submission.
//!
//! This crate is the networked half of the pipeline: it looks up nonces and
//! gas prices, broadcasts transactions signed by the `evmtx` core, and polls
//! for receipts with a bounded, cancellable wait. All network calls block the
//! calling thread; there is no background scheduler.
//!
//! - [`transport`]: the JSON-RPC exchange trait and its HTTP implementation
//! - [`client`]: typed RPC methods over a transport, with bounded retries
//! - [`submit`]: nonce/gas lookup, build, sign, broadcast, receipt wait
//! - [`nonce`]: per-key nonce ownership
//! - [`retry`]: the shared sleep-and-retry policy and cancellation token

pub mod client;
pub mod config;
pub mod nonce;
pub mod quantity;
pub mod receipt;
pub mod retry;
pub mod submit;
pub mod transport;

pub use client::{RpcClient, RpcError, RpcOutcome};
pub use config::ChainConfig;
pub use nonce::NonceManager;
pub use receipt::TransactionReceipt;
pub use retry::{Attempt, CancelToken, RetryPolicy, WaitError};
pub use submit::{PendingTx, SubmitError, TransactionSubmitter, TxParams};
pub use transport::{HttpTransport, Transport, TransportError};
