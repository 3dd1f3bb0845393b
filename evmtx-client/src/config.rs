//! Target-chain configuration.

use std::time::Duration;

/// Connection and pacing parameters for one target chain.
///
/// `chain_id` here is what gets folded into every signature; it must match
/// the chain the endpoint actually serves, or the node rejects the
/// transaction. [`crate::TransactionSubmitter::verify_chain_id`] checks the
/// two against each other.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ChainConfig {
    pub rpc_url: String,
    pub chain_id: u64,
    /// Delay between receipt polls.
    pub poll_interval: Duration,
    /// Receipt polls before a wait gives up.
    pub max_poll_attempts: u32,
    /// Transport-level retries per RPC call, beyond the first attempt.
    pub max_rpc_retries: u32,
}

impl ChainConfig {
    /// A config with the default pacing: 2 s polls, 60 attempts, 3 retries.
    pub fn new(rpc_url: impl Into<String>, chain_id: u64) -> Self {
        Self {
            rpc_url: rpc_url.into(),
            chain_id,
            poll_interval: Duration::from_secs(2),
            max_poll_attempts: 60,
            max_rpc_retries: 3,
        }
    }
}
