//! `0x`-prefixed hex values as JSON-RPC encodes them.
//!
//! Every numeric RPC value is a big-endian hex string with a `0x` prefix and
//! no leading zero digits (`0x0` for zero). Byte payloads are plain
//! even-length hex behind the same prefix.

use core::fmt;

use evmtx::{Address, Hash256};

/// Errors from parsing a hex value off the wire.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HexError {
    /// A character outside `[0-9a-fA-F]`.
    InvalidDigit,
    /// Odd number of hex digits in a byte payload.
    OddLength,
    /// The value does not fit the target integer width.
    Overflow,
    /// A fixed-size payload had the wrong byte length.
    Length { expected: usize, got: usize },
}

impl fmt::Display for HexError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            HexError::InvalidDigit => write!(f, "invalid hex digit"),
            HexError::OddLength => write!(f, "odd number of hex digits"),
            HexError::Overflow => write!(f, "hex value overflows target width"),
            HexError::Length { expected, got } => {
                write!(f, "expected {expected} bytes, got {got}")
            }
        }
    }
}

impl std::error::Error for HexError {}

fn strip_prefix(input: &str) -> &str {
    input
        .strip_prefix("0x")
        .or_else(|| input.strip_prefix("0X"))
        .unwrap_or(input)
}

/// Parses a hex quantity into a u64. `0x` and the empty string are zero.
pub fn parse_u64(input: &str) -> Result<u64, HexError> {
    let digits = strip_prefix(input);
    if digits.is_empty() {
        return Ok(0);
    }
    u64::from_str_radix(digits, 16).map_err(|e| match e.kind() {
        core::num::IntErrorKind::PosOverflow => HexError::Overflow,
        _ => HexError::InvalidDigit,
    })
}

/// Parses a hex quantity into a u128. `0x` and the empty string are zero.
pub fn parse_u128(input: &str) -> Result<u128, HexError> {
    let digits = strip_prefix(input);
    if digits.is_empty() {
        return Ok(0);
    }
    u128::from_str_radix(digits, 16).map_err(|e| match e.kind() {
        core::num::IntErrorKind::PosOverflow => HexError::Overflow,
        _ => HexError::InvalidDigit,
    })
}

/// Parses a hex byte payload (`0x` → empty).
pub fn parse_bytes(input: &str) -> Result<Vec<u8>, HexError> {
    hex::decode(strip_prefix(input)).map_err(|e| match e {
        hex::FromHexError::OddLength => HexError::OddLength,
        _ => HexError::InvalidDigit,
    })
}

/// Parses a 32-byte hex payload (transaction or block hash).
pub fn parse_hash(input: &str) -> Result<Hash256, HexError> {
    let bytes = parse_bytes(input)?;
    let mut out = [0u8; 32];
    if bytes.len() != 32 {
        return Err(HexError::Length { expected: 32, got: bytes.len() });
    }
    out.copy_from_slice(&bytes);
    Ok(out)
}

/// Parses a 20-byte hex payload (address).
pub fn parse_address(input: &str) -> Result<Address, HexError> {
    let bytes = parse_bytes(input)?;
    let mut out = [0u8; 20];
    if bytes.len() != 20 {
        return Err(HexError::Length { expected: 20, got: bytes.len() });
    }
    out.copy_from_slice(&bytes);
    Ok(out)
}

/// Formats an integer as a minimal hex quantity.
pub fn to_quantity(value: u128) -> String {
    format!("0x{value:x}")
}

/// Formats a byte payload as `0x`-prefixed hex.
pub fn to_data(bytes: &[u8]) -> String {
    format!("0x{}", hex::encode(bytes))
}
