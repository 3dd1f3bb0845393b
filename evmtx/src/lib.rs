//! Canonical construction and signing of legacy EVM transactions.
//!
//! The crate covers the byte-level pipeline between "I have a private key and
//! transaction fields" and "I have a raw transaction a node will accept":
//!
//! - [`rlp`]: canonical RLP encoding and strict decoding
//! - [`hash`]: Keccak-256 (the pre-standardization variant, not NIST SHA-3)
//! - [`keys`]: private-key validation, public-key and address derivation
//! - [`tx`]: EIP-155 pre-image assembly, deterministic ECDSA signing with a
//!   derived (never assumed) recovery id, and signed-transaction serialization
//!
//! Everything here is pure computation; broadcasting and receipt polling live
//! in the `evmtx-client` crate.

pub mod hash;
pub mod keys;
pub mod rlp;
pub mod tx;

/// Ethereum address (20 bytes).
pub type Address = [u8; 20];

/// Keccak-256 hash (32 bytes).
pub type Hash256 = [u8; 32];

pub use hash::keccak256;
pub use keys::{KeyError, PrivateKey};
pub use tx::{DecodeError, SignError, SignedTransaction, UnsignedTransaction};
