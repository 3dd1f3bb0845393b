//! The node's record of a processed transaction.

use serde_json::{Map, Value};

use evmtx::{Address, Hash256};

use crate::quantity;

/// A mined transaction's receipt.
///
/// `contract_address` is present exactly when the transaction created a
/// contract. `status` is false for a transaction that was mined but
/// reverted. Reverted transactions consume their nonce and gas.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TransactionReceipt {
    pub transaction_hash: Hash256,
    pub status: bool,
    pub contract_address: Option<Address>,
    pub block_number: u64,
    pub gas_used: u64,
}

impl TransactionReceipt {
    /// Parses the `eth_getTransactionReceipt` result object.
    pub fn from_value(value: &Value) -> Result<Self, String> {
        let obj = value
            .as_object()
            .ok_or_else(|| format!("receipt is not an object: {value}"))?;

        let contract_address = match obj.get("contractAddress") {
            None | Some(Value::Null) => None,
            Some(v) => {
                let text = v
                    .as_str()
                    .ok_or_else(|| format!("contractAddress is not a string: {v}"))?;
                Some(
                    quantity::parse_address(text)
                        .map_err(|e| format!("contractAddress: {e}"))?,
                )
            }
        };

        Ok(Self {
            transaction_hash: quantity::parse_hash(str_field(obj, "transactionHash")?)
                .map_err(|e| format!("transactionHash: {e}"))?,
            status: quantity::parse_u64(str_field(obj, "status")?)
                .map_err(|e| format!("status: {e}"))?
                != 0,
            contract_address,
            block_number: quantity::parse_u64(str_field(obj, "blockNumber")?)
                .map_err(|e| format!("blockNumber: {e}"))?,
            gas_used: quantity::parse_u64(str_field(obj, "gasUsed")?)
                .map_err(|e| format!("gasUsed: {e}"))?,
        })
    }
}

fn str_field<'a>(obj: &'a Map<String, Value>, name: &str) -> Result<&'a str, String> {
    obj.get(name)
        .and_then(Value::as_str)
        .ok_or_else(|| format!("receipt field {name} missing or not a string"))
}
