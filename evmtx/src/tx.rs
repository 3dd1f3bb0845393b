//! Legacy (pre-EIP-2718) transaction assembly and EIP-155 signing.
//!
//! The pipeline is a straight line of pure transformations:
//!
//! ```text
//! UnsignedTransaction --hash--> digest --sign--> (r, s, recovery id)
//!                     --assemble--> SignedTransaction --encode--> raw bytes
//! ```
//!
//! The pre-image is the RLP list `[nonce, gasPrice, gasLimit, to, value,
//! data, chainId, "", ""]`; the two trailing empty strings fold the chain id
//! into the signed digest so a signature cannot be replayed on another chain.

use core::fmt;

use k256::ecdsa::{RecoveryId, Signature as EcdsaSignature, VerifyingKey};

use crate::hash::keccak256;
use crate::keys::{self, PrivateKey};
use crate::rlp::{self, RlpError};
use crate::{Address, Hash256};

/// Signing and signature-recovery errors.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SignError {
    /// The ECDSA signing operation itself failed.
    SigningFailed,
    /// `(v, r, s)` do not form a valid signature for this transaction.
    InvalidSignature,
    /// Neither candidate recovery id reproduces the expected signer;
    /// the digest and key material disagree.
    RecoveryMismatch,
}

impl fmt::Display for SignError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SignError::SigningFailed => write!(f, "ECDSA signing failed"),
            SignError::InvalidSignature => write!(f, "signature components out of range"),
            SignError::RecoveryMismatch => {
                write!(f, "no recovery id reproduces the signer address")
            }
        }
    }
}

impl std::error::Error for SignError {}

/// Errors from decoding a raw signed transaction.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DecodeError {
    /// The outer RLP structure is malformed.
    Rlp(RlpError),
    /// The top-level item is not a 9-field list.
    ItemCount,
    /// A field failed to decode.
    Field(&'static str),
    /// `v` does not carry an EIP-155 chain id (pre-EIP-155 transactions are
    /// outside this crate's sending scope).
    UnsupportedV(u64),
}

impl From<RlpError> for DecodeError {
    fn from(e: RlpError) -> Self {
        DecodeError::Rlp(e)
    }
}

impl fmt::Display for DecodeError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            DecodeError::Rlp(e) => write!(f, "invalid RLP: {e}"),
            DecodeError::ItemCount => write!(f, "expected a 9-field transaction list"),
            DecodeError::Field(name) => write!(f, "invalid {name} field"),
            DecodeError::UnsupportedV(v) => write!(f, "v={v} carries no chain id"),
        }
    }
}

impl std::error::Error for DecodeError {}

/// A transaction before signing. `to: None` creates a contract.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UnsignedTransaction {
    pub nonce: u64,
    /// Wei per gas unit.
    pub gas_price: u128,
    pub gas_limit: u64,
    pub to: Option<Address>,
    /// Wei transferred to `to` (or endowed to the created contract).
    pub value: u128,
    pub data: Vec<u8>,
    pub chain_id: u64,
}

impl UnsignedTransaction {
    pub fn is_contract_creation(&self) -> bool {
        self.to.is_none()
    }

    /// RLP of the six common fields, shared by the pre-image and the signed
    /// encoding.
    fn encode_fields(&self) -> Vec<u8> {
        let mut out = Vec::new();
        out.extend_from_slice(&rlp::encode_uint(self.nonce.into()));
        out.extend_from_slice(&rlp::encode_uint(self.gas_price));
        out.extend_from_slice(&rlp::encode_uint(self.gas_limit.into()));
        match &self.to {
            Some(addr) => out.extend_from_slice(&rlp::encode_bytes(addr)),
            None => out.extend_from_slice(&rlp::encode_bytes(&[])),
        }
        out.extend_from_slice(&rlp::encode_uint(self.value));
        out.extend_from_slice(&rlp::encode_bytes(&self.data));
        out
    }

    /// The EIP-155 pre-image: `[fields.., chainId, "", ""]`.
    pub fn signing_preimage(&self) -> Vec<u8> {
        let mut payload = self.encode_fields();
        payload.extend_from_slice(&rlp::encode_uint(self.chain_id.into()));
        payload.extend_from_slice(&rlp::encode_bytes(&[]));
        payload.extend_from_slice(&rlp::encode_bytes(&[]));
        rlp::encode_list(&payload)
    }

    /// The digest that gets signed.
    pub fn signing_hash(&self) -> Hash256 {
        keccak256(&self.signing_preimage())
    }

    /// Signs the transaction with a deterministic (RFC 6979) ECDSA nonce.
    ///
    /// The recovery id reported by the signer is confirmed by recovering
    /// both candidate public keys and matching the signer's address; an id
    /// that is assumed rather than derived mis-attributes roughly half of
    /// all signatures.
    pub fn sign(self, key: &PrivateKey) -> Result<SignedTransaction, SignError> {
        let digest = self.signing_hash();
        let (signature, candidate) = key
            .signing_key()
            .sign_prehash_recoverable(&digest)
            .map_err(|_| SignError::SigningFailed)?;

        let recovery_id = confirm_recovery_id(&digest, &signature, candidate, &key.address())?;

        let mut r = [0u8; 32];
        let mut s = [0u8; 32];
        r.copy_from_slice(&signature.r().to_bytes());
        s.copy_from_slice(&signature.s().to_bytes());

        let v = self.chain_id * 2 + 35 + u64::from(recovery_id);
        Ok(SignedTransaction { tx: self, v, r, s })
    }
}

/// Recovers both candidate keys for `(r, s)` and returns the id whose key
/// hashes to `signer`.
fn confirm_recovery_id(
    digest: &Hash256,
    signature: &EcdsaSignature,
    candidate: RecoveryId,
    signer: &Address,
) -> Result<u8, SignError> {
    for flip in [false, true] {
        let recid = RecoveryId::new(candidate.is_y_odd() ^ flip, false);
        let recovered = match VerifyingKey::recover_from_prehash(digest, signature, recid) {
            Ok(key) => key,
            Err(_) => continue,
        };
        if keys::verifying_key_address(&recovered) == *signer {
            return Ok(recid.to_byte());
        }
    }
    Err(SignError::RecoveryMismatch)
}

/// A signed transaction, ready for broadcast.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SignedTransaction {
    pub tx: UnsignedTransaction,
    pub v: u64,
    pub r: [u8; 32],
    pub s: [u8; 32],
}

impl SignedTransaction {
    /// The raw wire encoding: `rlp([fields.., v, r, s])`.
    pub fn to_rlp(&self) -> Vec<u8> {
        let mut payload = self.tx.encode_fields();
        payload.extend_from_slice(&rlp::encode_uint(self.v.into()));
        payload.extend_from_slice(&rlp::encode_uint_be(&self.r));
        payload.extend_from_slice(&rlp::encode_uint_be(&self.s));
        rlp::encode_list(&payload)
    }

    /// `0x`-prefixed hex of the raw encoding, as `eth_sendRawTransaction`
    /// expects it.
    pub fn raw_hex(&self) -> String {
        format!("0x{}", hex::encode(self.to_rlp()))
    }

    /// The transaction hash a node will report for this payload.
    pub fn tx_hash(&self) -> Hash256 {
        keccak256(&self.to_rlp())
    }

    /// Strict decode of a raw legacy transaction.
    ///
    /// The chain id is extracted from `v` (`v = chainId*2 + 35 + parity`).
    pub fn decode(raw: &[u8]) -> Result<Self, DecodeError> {
        let item = rlp::decode_exact(raw)?;
        let fields = item.as_list().ok_or(DecodeError::ItemCount)?;
        if fields.len() != 9 {
            return Err(DecodeError::ItemCount);
        }

        let to = match fields[3].as_bytes().ok_or(DecodeError::Field("to"))? {
            [] => None,
            _ => Some(fields[3].as_address().ok_or(DecodeError::Field("to"))?),
        };
        let v = fields[6].as_u64().ok_or(DecodeError::Field("v"))?;
        if v < 35 {
            return Err(DecodeError::UnsupportedV(v));
        }

        let tx = UnsignedTransaction {
            nonce: fields[0].as_u64().ok_or(DecodeError::Field("nonce"))?,
            gas_price: fields[1].as_u128().ok_or(DecodeError::Field("gasPrice"))?,
            gas_limit: fields[2].as_u64().ok_or(DecodeError::Field("gasLimit"))?,
            to,
            value: fields[4].as_u128().ok_or(DecodeError::Field("value"))?,
            data: fields[5].as_bytes().ok_or(DecodeError::Field("data"))?.to_vec(),
            chain_id: (v - 35) / 2,
        };
        Ok(Self {
            tx,
            v,
            r: fields[7].as_bytes32().ok_or(DecodeError::Field("r"))?,
            s: fields[8].as_bytes32().ok_or(DecodeError::Field("s"))?,
        })
    }

    /// Recovers the signer's address from `(v, r, s)` against the rebuilt
    /// pre-image digest.
    pub fn recover_signer(&self) -> Result<Address, SignError> {
        let parity = self
            .v
            .checked_sub(self.tx.chain_id * 2 + 35)
            .ok_or(SignError::InvalidSignature)?;
        if parity > 1 {
            return Err(SignError::InvalidSignature);
        }

        let signature = EcdsaSignature::from_scalars(self.r, self.s)
            .map_err(|_| SignError::InvalidSignature)?;
        let recid = RecoveryId::new(parity == 1, false);
        let digest = self.tx.signing_hash();
        let key = VerifyingKey::recover_from_prehash(&digest, &signature, recid)
            .map_err(|_| SignError::RecoveryMismatch)?;
        Ok(keys::verifying_key_address(&key))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use hex_literal::hex;

    /// The worked example from the EIP-155 text.
    fn eip155_example() -> UnsignedTransaction {
        UnsignedTransaction {
            nonce: 9,
            gas_price: 20_000_000_000,
            gas_limit: 21_000,
            to: Some([0x35; 20]),
            value: 1_000_000_000_000_000_000,
            data: Vec::new(),
            chain_id: 1,
        }
    }

    fn example_key() -> PrivateKey {
        PrivateKey::from_bytes(&[0x46; 32]).unwrap()
    }

    #[test]
    fn eip155_example_preimage() {
        let tx = eip155_example();
        assert_eq!(
            tx.signing_preimage(),
            hex!(
                "ec098504a817c800825208943535353535353535353535353535353535353535"
                "880de0b6b3a764000080018080"
            )
        );
        assert_eq!(
            tx.signing_hash(),
            hex!("daf5a779ae972f972197303d7b574746c7ef83eadac0f2791ad23db92e4c8e53")
        );
    }

    #[test]
    fn eip155_example_signature() {
        let signed = eip155_example().sign(&example_key()).unwrap();
        assert_eq!(signed.v, 37);
        assert_eq!(
            signed.r,
            hex!("28ef61340bd939bc2195fe537567866003e1a15d3c71ff63e1590620aa636276")
        );
        assert_eq!(
            signed.s,
            hex!("67cbe9d8997f761aecb703304b3800ccf555c9f3dc64214b297fb1966a3b6d83")
        );
        assert_eq!(
            signed.to_rlp(),
            hex!(
                "f86c098504a817c800825208943535353535353535353535353535353535353535"
                "880de0b6b3a76400008025a028ef61340bd939bc2195fe537567866003e1a15d3c"
                "71ff63e1590620aa636276a067cbe9d8997f761aecb703304b3800ccf555c9f3dc"
                "64214b297fb1966a3b6d83"
            )
            .to_vec()
        );
    }

    #[test]
    fn decode_round_trips_signed_form() {
        let signed = eip155_example().sign(&example_key()).unwrap();
        let decoded = SignedTransaction::decode(&signed.to_rlp()).unwrap();
        assert_eq!(decoded, signed);
        assert_eq!(decoded.recover_signer().unwrap(), example_key().address());
    }

    #[test]
    fn contract_creation_encodes_empty_to() {
        let mut tx = eip155_example();
        tx.to = None;
        tx.data = vec![0x60, 0x80, 0x60, 0x40];
        assert!(tx.is_contract_creation());

        let preimage = tx.signing_preimage();
        let item = rlp::decode_exact(&preimage).unwrap();
        let fields = item.as_list().unwrap();
        assert_eq!(fields[3].as_bytes(), Some(&[][..]));
        assert_eq!(fields[5].as_bytes(), Some(&[0x60, 0x80, 0x60, 0x40][..]));
    }

    #[test]
    fn signing_is_deterministic() {
        let a = eip155_example().sign(&example_key()).unwrap();
        let b = eip155_example().sign(&example_key()).unwrap();
        assert_eq!(a, b);
    }

    #[test]
    fn decode_rejects_malformed_input() {
        assert!(matches!(
            SignedTransaction::decode(&rlp::encode_bytes(b"not a list")),
            Err(DecodeError::ItemCount)
        ));

        // A pre-EIP-155 v value carries no chain id.
        let signed = eip155_example().sign(&example_key()).unwrap();
        let mut fields = signed.tx.encode_fields();
        fields.extend_from_slice(&rlp::encode_uint(27));
        fields.extend_from_slice(&rlp::encode_uint_be(&signed.r));
        fields.extend_from_slice(&rlp::encode_uint_be(&signed.s));
        let raw = rlp::encode_list(&fields);
        assert!(matches!(
            SignedTransaction::decode(&raw),
            Err(DecodeError::UnsupportedV(27))
        ));
    }

    #[test]
    fn tampered_v_fails_recovery() {
        let mut signed = eip155_example().sign(&example_key()).unwrap();
        // Flip the parity bit: recovery must yield some *other* address.
        signed.v = if signed.v == 37 { 38 } else { 37 };
        let recovered = signed.recover_signer().unwrap();
        assert_ne!(recovered, example_key().address());
    }
}
