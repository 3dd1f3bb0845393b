//! Keccak-256 hashing.
//!
//! Ethereum uses the original Keccak submission padding, not the final NIST
//! SHA-3 padding; the two produce different digests for identical input.
//! Address derivation and transaction signing both depend on this exact
//! variant.

use tiny_keccak::{Hasher, Keccak};

use crate::Hash256;

/// Computes the Keccak-256 digest of `data`.
pub fn keccak256(data: &[u8]) -> Hash256 {
    let mut hasher = Keccak::v256();
    hasher.update(data);
    let mut output = [0u8; 32];
    hasher.finalize(&mut output);
    output
}

/// Streaming Keccak-256 for multi-part input.
pub struct Keccak256 {
    inner: Keccak,
}

impl Keccak256 {
    pub fn new() -> Self {
        Self { inner: Keccak::v256() }
    }

    pub fn update(&mut self, data: &[u8]) {
        self.inner.update(data);
    }

    pub fn finalize(self) -> Hash256 {
        let mut output = [0u8; 32];
        self.inner.finalize(&mut output);
        output
    }
}

impl Default for Keccak256 {
    fn default() -> Self {
        Self::new()
    }
}
