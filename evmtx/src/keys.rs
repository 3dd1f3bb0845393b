//! Private-key material and address derivation.
//!
//! A key arrives as a raw 32-byte secp256k1 scalar, is validated on
//! construction, and is held only for the duration of the signing calls the
//! caller makes. Nothing here persists key bytes; intermediate buffers are
//! zeroized.

use core::fmt;

use k256::ecdsa::{SigningKey, VerifyingKey};
use k256::elliptic_curve::sec1::ToEncodedPoint;
use zeroize::Zeroizing;

use crate::hash::keccak256;
use crate::Address;

/// Key-material errors.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum KeyError {
    /// The scalar is zero or not below the curve order.
    InvalidKey,
    /// The hex form is malformed or not 32 bytes.
    InvalidHex,
}

impl fmt::Display for KeyError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            KeyError::InvalidKey => write!(f, "private key out of range"),
            KeyError::InvalidHex => write!(f, "private key hex must decode to 32 bytes"),
        }
    }
}

impl std::error::Error for KeyError {}

/// A validated secp256k1 private key.
pub struct PrivateKey {
    inner: SigningKey,
}

impl PrivateKey {
    /// Validates and wraps a raw 32-byte scalar.
    ///
    /// Zero and values at or above the curve order are rejected; silently
    /// deriving an address from such a key would sign for an account the
    /// caller cannot control.
    pub fn from_bytes(bytes: &[u8; 32]) -> Result<Self, KeyError> {
        let inner = SigningKey::from_bytes(bytes.into()).map_err(|_| KeyError::InvalidKey)?;
        Ok(Self { inner })
    }

    /// Parses a hex-encoded key, tolerating an optional `0x`/`0X` prefix.
    pub fn from_hex(input: &str) -> Result<Self, KeyError> {
        let trimmed = input.trim();
        let digits = trimmed
            .strip_prefix("0x")
            .or_else(|| trimmed.strip_prefix("0X"))
            .unwrap_or(trimmed);
        let decoded = Zeroizing::new(hex::decode(digits).map_err(|_| KeyError::InvalidHex)?);
        let bytes: &[u8; 32] = decoded
            .as_slice()
            .try_into()
            .map_err(|_| KeyError::InvalidHex)?;
        Self::from_bytes(bytes)
    }

    /// Uncompressed public key, SEC1 0x04 prefix stripped: x ‖ y.
    pub fn public_key(&self) -> [u8; 64] {
        let point = self.inner.verifying_key().to_encoded_point(false);
        let mut out = [0u8; 64];
        out.copy_from_slice(&point.as_bytes()[1..]);
        out
    }

    /// The address controlled by this key.
    pub fn address(&self) -> Address {
        verifying_key_address(self.inner.verifying_key())
    }

    pub(crate) fn signing_key(&self) -> &SigningKey {
        &self.inner
    }
}

impl fmt::Debug for PrivateKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        // Never expose key bytes through Debug.
        f.write_str("PrivateKey(..)")
    }
}

/// Address = last 20 bytes of keccak256(uncompressed public key sans prefix).
pub(crate) fn verifying_key_address(key: &VerifyingKey) -> Address {
    let point = key.to_encoded_point(false);
    let digest = keccak256(&point.as_bytes()[1..]);
    let mut addr = [0u8; 20];
    addr.copy_from_slice(&digest[12..]);
    addr
}

/// Plain lowercase `0x` hex form of an address.
pub fn address_hex(addr: &Address) -> String {
    format!("0x{}", hex::encode(addr))
}

/// EIP-55 checksummed `0x` hex form, for display at system boundaries.
pub fn checksum_hex(addr: &Address) -> String {
    let lower = hex::encode(addr);
    let digest = keccak256(lower.as_bytes());

    let mut out = String::with_capacity(42);
    out.push_str("0x");
    for (i, c) in lower.chars().enumerate() {
        let nibble = if i % 2 == 0 {
            digest[i / 2] >> 4
        } else {
            digest[i / 2] & 0x0f
        };
        if c.is_ascii_alphabetic() && nibble >= 8 {
            out.push(c.to_ascii_uppercase());
        } else {
            out.push(c);
        }
    }
    out
}
