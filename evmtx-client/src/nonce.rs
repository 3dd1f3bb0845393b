//! Per-key nonce ownership.
//!
//! Transaction validity is strictly nonce-ordered per account. For a batch
//! from one key, the network nonce is read once and incremented locally, so
//! later transactions need not wait for earlier confirmations. The manager
//! assumes this process is the key's only writer for the lifetime of a run;
//! a competing writer eventually surfaces as a node-side nonce rejection.

use std::collections::hash_map::Entry;
use std::collections::HashMap;
use std::sync::Mutex;

use evmtx::Address;

use crate::client::{RpcClient, RpcError};

/// Local nonce counters, one per signing address.
#[derive(Debug, Default)]
pub struct NonceManager {
    counters: Mutex<HashMap<Address, u64>>,
}

impl NonceManager {
    pub fn new() -> Self {
        Self::default()
    }

    /// Reserves the next nonce for `address`.
    ///
    /// First use fetches `eth_getTransactionCount(address, "latest")`; every
    /// later reservation increments the local counter. The table lock spans
    /// the read-increment sequence, so concurrent reservations for one key
    /// cannot hand out the same value.
    pub fn reserve(&self, client: &RpcClient, address: &Address) -> Result<u64, RpcError> {
        let mut counters = self.counters.lock().expect("nonce table lock poisoned");
        match counters.entry(*address) {
            Entry::Occupied(mut slot) => {
                let nonce = *slot.get();
                *slot.get_mut() = nonce + 1;
                Ok(nonce)
            }
            Entry::Vacant(slot) => {
                let nonce = client.transaction_count(address)?;
                slot.insert(nonce + 1);
                Ok(nonce)
            }
        }
    }

    /// Drops the local counter so the next reservation re-reads the network
    /// view. For use after a failed broadcast left a local gap.
    pub fn forget(&self, address: &Address) {
        self.counters
            .lock()
            .expect("nonce table lock poisoned")
            .remove(address);
    }
}
