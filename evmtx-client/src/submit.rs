//! Transaction orchestration: build, sign, broadcast, await the receipt.
//!
//! Broadcasting returns a hash as soon as the node accepts the payload into
//! its mempool; confirmation arrives later, if at all. The submitter
//! separates the two: [`TransactionSubmitter::send_transaction`] broadcasts,
//! [`TransactionSubmitter::wait_for_receipt`] runs the bounded poll. A
//! timeout is not proof of failure; the caller keeps the hash and may
//! resume polling. A cancelled wait does not retract the broadcast.

use core::fmt;
use std::sync::Arc;
use std::time::Duration;

use evmtx::keys::checksum_hex;
use evmtx::{Address, Hash256, PrivateKey, SignError, UnsignedTransaction};

use crate::client::{RpcClient, RpcError};
use crate::config::ChainConfig;
use crate::nonce::NonceManager;
use crate::receipt::TransactionReceipt;
use crate::retry::{Attempt, CancelToken, RetryPolicy, WaitError};
use crate::transport::{HttpTransport, Transport, TransportError};

/// Backoff between transport retries of the submitter's RPC calls.
const RPC_RETRY_BACKOFF: Duration = Duration::from_secs(1);

/// Gas limit used when the caller does not set one. Generous enough for
/// token calls; deployments should set their own.
const DEFAULT_GAS_LIMIT: u64 = 500_000;

/// Submission failures, classified for the caller's retry decision.
#[derive(Debug)]
pub enum SubmitError {
    Rpc(RpcError),
    Sign(SignError),
    /// Mined with failure status. The nonce is consumed; resubmitting the
    /// same payload with the same nonce cannot succeed.
    Reverted { receipt: TransactionReceipt },
    /// No receipt within the poll budget. The transaction may still confirm;
    /// the hash remains valid for manual polling.
    Timeout { tx_hash: Hash256, attempts: u32 },
    /// The wait was cancelled or its deadline passed.
    Cancelled { tx_hash: Hash256 },
    /// The endpoint serves a different chain than the configuration names.
    ChainIdMismatch { configured: u64, reported: u64 },
    /// A creation receipt arrived without a contract address.
    MissingContractAddress { tx_hash: Hash256 },
}

impl From<RpcError> for SubmitError {
    fn from(e: RpcError) -> Self {
        SubmitError::Rpc(e)
    }
}

impl From<SignError> for SubmitError {
    fn from(e: SignError) -> Self {
        SubmitError::Sign(e)
    }
}

impl fmt::Display for SubmitError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SubmitError::Rpc(e) => write!(f, "{e}"),
            SubmitError::Sign(e) => write!(f, "{e}"),
            SubmitError::Reverted { receipt } => write!(
                f,
                "transaction 0x{} reverted in block {}",
                hex::encode(receipt.transaction_hash),
                receipt.block_number
            ),
            SubmitError::Timeout { tx_hash, attempts } => write!(
                f,
                "no receipt for 0x{} after {attempts} polls",
                hex::encode(tx_hash)
            ),
            SubmitError::Cancelled { tx_hash } => {
                write!(f, "wait for 0x{} cancelled", hex::encode(tx_hash))
            }
            SubmitError::ChainIdMismatch { configured, reported } => write!(
                f,
                "configured for chain {configured} but endpoint reports chain {reported}"
            ),
            SubmitError::MissingContractAddress { tx_hash } => write!(
                f,
                "creation receipt for 0x{} carries no contract address",
                hex::encode(tx_hash)
            ),
        }
    }
}

impl std::error::Error for SubmitError {}

/// Caller-facing transaction parameters; nonce and chain id are supplied by
/// the submitter.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TxParams {
    pub to: Option<Address>,
    pub value: u128,
    pub data: Vec<u8>,
    pub gas_limit: u64,
    /// `None` fetches `eth_gasPrice` at send time.
    pub gas_price: Option<u128>,
}

impl TxParams {
    /// A contract call carrying `data`.
    pub fn call(to: Address, data: Vec<u8>) -> Self {
        Self { to: Some(to), value: 0, data, gas_limit: DEFAULT_GAS_LIMIT, gas_price: None }
    }

    /// A plain value transfer.
    pub fn transfer(to: Address, value: u128) -> Self {
        Self { to: Some(to), value, data: Vec::new(), gas_limit: 21_000, gas_price: None }
    }

    /// A contract creation carrying `bytecode`.
    pub fn create(bytecode: Vec<u8>) -> Self {
        Self { to: None, value: 0, data: bytecode, gas_limit: DEFAULT_GAS_LIMIT, gas_price: None }
    }

    pub fn gas_limit(mut self, gas_limit: u64) -> Self {
        self.gas_limit = gas_limit;
        self
    }

    pub fn gas_price(mut self, gas_price: u128) -> Self {
        self.gas_price = Some(gas_price);
        self
    }

    pub fn value(mut self, value: u128) -> Self {
        self.value = value;
        self
    }
}

/// A broadcast transaction awaiting confirmation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PendingTx {
    pub tx_hash: Hash256,
    pub nonce: u64,
    pub signer: Address,
}

/// Orchestrates the nonce → build → sign → broadcast → poll pipeline
/// against one configured chain.
pub struct TransactionSubmitter {
    client: RpcClient,
    config: ChainConfig,
    nonces: NonceManager,
}

impl TransactionSubmitter {
    /// A submitter over an HTTP transport to `config.rpc_url`.
    pub fn new(config: ChainConfig) -> Result<Self, TransportError> {
        let transport = HttpTransport::new(&config.rpc_url)?;
        Ok(Self::with_transport(config, Arc::new(transport)))
    }

    /// A submitter over a caller-supplied transport.
    pub fn with_transport(config: ChainConfig, transport: Arc<dyn Transport>) -> Self {
        let retry = RetryPolicy {
            interval: RPC_RETRY_BACKOFF,
            max_attempts: config.max_rpc_retries + 1,
        };
        Self {
            client: RpcClient::with_retry(transport, retry),
            config,
            nonces: NonceManager::new(),
        }
    }

    pub fn client(&self) -> &RpcClient {
        &self.client
    }

    pub fn config(&self) -> &ChainConfig {
        &self.config
    }

    /// Checks that the endpoint serves the configured chain.
    ///
    /// A signature embeds the configured chain id; sending it to a node on
    /// another chain fails late and confusingly, so call this once up front.
    pub fn verify_chain_id(&self) -> Result<(), SubmitError> {
        let reported = self.client.chain_id()?;
        if reported != self.config.chain_id {
            return Err(SubmitError::ChainIdMismatch {
                configured: self.config.chain_id,
                reported,
            });
        }
        Ok(())
    }

    /// Builds, signs, and broadcasts one transaction.
    ///
    /// The nonce comes from the per-key counter (network-fetched on first
    /// use), the gas price from `params` or `eth_gasPrice`. Returns as soon
    /// as the node accepts the payload.
    pub fn send_transaction(
        &self,
        key: &PrivateKey,
        params: TxParams,
    ) -> Result<PendingTx, SubmitError> {
        let signer = key.address();
        let nonce = self.nonces.reserve(&self.client, &signer)?;
        let gas_price = match params.gas_price {
            Some(price) => price,
            None => self.client.gas_price()?,
        };

        let signed = UnsignedTransaction {
            nonce,
            gas_price,
            gas_limit: params.gas_limit,
            to: params.to,
            value: params.value,
            data: params.data,
            chain_id: self.config.chain_id,
        }
        .sign(key)?;

        let local_hash = signed.tx_hash();
        let tx_hash = self.client.send_raw_transaction(&signed.to_rlp())?;
        if tx_hash != local_hash {
            log::warn!(
                "node reported hash 0x{} but local encoding hashes to 0x{}",
                hex::encode(tx_hash),
                hex::encode(local_hash)
            );
        }
        log::info!(
            "broadcast 0x{} nonce={nonce} from {}",
            hex::encode(tx_hash),
            checksum_hex(&signer)
        );

        Ok(PendingTx { tx_hash, nonce, signer })
    }

    /// Broadcasts an externally signed raw transaction.
    ///
    /// Duplicate or underpriced submissions for an already-used nonce are
    /// rejected by the node itself; that rejection surfaces here as a
    /// protocol error, untouched.
    pub fn submit_raw(&self, raw: &[u8]) -> Result<Hash256, SubmitError> {
        Ok(self.client.send_raw_transaction(raw)?)
    }

    /// Polls for the receipt of a broadcast transaction.
    ///
    /// A `null` receipt means "still pending" and consumes one poll; a
    /// receipt with failure status is [`SubmitError::Reverted`]; an
    /// exhausted budget is [`SubmitError::Timeout`]. Transport failures
    /// inside each poll are already retried by the client.
    pub fn wait_for_receipt(
        &self,
        tx_hash: &Hash256,
        cancel: &CancelToken,
    ) -> Result<TransactionReceipt, SubmitError> {
        let policy = RetryPolicy {
            interval: self.config.poll_interval,
            max_attempts: self.config.max_poll_attempts,
        };

        let outcome = policy.run(cancel, |attempt| {
            match self.client.transaction_receipt(tx_hash) {
                Ok(Some(receipt)) => Attempt::Ready(receipt),
                Ok(None) => {
                    log::debug!("0x{} pending (poll {attempt})", hex::encode(tx_hash));
                    Attempt::Pending
                }
                Err(e) => Attempt::Fatal(SubmitError::Rpc(e)),
            }
        });

        match outcome {
            Ok(receipt) if receipt.status => Ok(receipt),
            Ok(receipt) => Err(SubmitError::Reverted { receipt }),
            Err(WaitError::TimedOut { attempts }) => {
                Err(SubmitError::Timeout { tx_hash: *tx_hash, attempts })
            }
            Err(WaitError::Cancelled) => Err(SubmitError::Cancelled { tx_hash: *tx_hash }),
            Err(WaitError::Fatal(e)) => Err(e),
        }
    }

    /// [`Self::send_transaction`] followed by [`Self::wait_for_receipt`].
    pub fn send_and_confirm(
        &self,
        key: &PrivateKey,
        params: TxParams,
        cancel: &CancelToken,
    ) -> Result<(PendingTx, TransactionReceipt), SubmitError> {
        let pending = self.send_transaction(key, params)?;
        let receipt = self.wait_for_receipt(&pending.tx_hash, cancel)?;
        Ok((pending, receipt))
    }

    /// Deploys `bytecode` and returns the confirmed receipt with the
    /// created contract's address.
    pub fn deploy_contract(
        &self,
        key: &PrivateKey,
        bytecode: Vec<u8>,
        gas_limit: u64,
        cancel: &CancelToken,
    ) -> Result<(TransactionReceipt, Address), SubmitError> {
        let params = TxParams::create(bytecode).gas_limit(gas_limit);
        let (pending, receipt) = self.send_and_confirm(key, params, cancel)?;
        let address = receipt
            .contract_address
            .ok_or(SubmitError::MissingContractAddress { tx_hash: pending.tx_hash })?;
        log::info!("contract deployed at {}", checksum_hex(&address));
        Ok((receipt, address))
    }

    /// Forgets the local nonce for `address`; the next send re-reads the
    /// network view. For recovery after a failed broadcast.
    pub fn refresh_nonce(&self, address: &Address) {
        self.nonces.forget(address);
    }
}
