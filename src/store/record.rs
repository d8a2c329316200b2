//! Stored block envelope
//!
//! Blocks are persisted in the same `{jsonrpc, id, result}` shape the node
//! returned them in, so downstream tools can read a file as if it were a raw
//! `eth_getBlockByNumber` response.

use crate::range::{parse_quantity, BlockNumber};
use crate::rpc::{JSONRPC_VERSION, REQUEST_ID};
use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Field inside `result` identifying the block
pub const IDENTITY_FIELD: &str = "number";

/// Field inside `result` holding the transaction list
pub const TRANSACTIONS_FIELD: &str = "transactions";

/// On-disk envelope around a raw block
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StoredRecord {
    /// Protocol version, always "2.0"
    pub jsonrpc: String,
    /// Request id of the fetching call
    pub id: u64,
    /// Raw block as returned by the node
    pub result: Value,
}

impl StoredRecord {
    /// Wrap a raw block in the storage envelope
    pub fn wrap(result: Value) -> Self {
        Self {
            jsonrpc: JSONRPC_VERSION.to_string(),
            id: REQUEST_ID,
            result,
        }
    }

    /// Check the structural identity of the wrapped block
    ///
    /// The `number` field must be present and number-like (hex quantity or
    /// JSON integer) and, when decodable, equal to `expected`.
    pub fn validate_identity(&self, expected: BlockNumber) -> Result<(), String> {
        let number = self
            .result
            .get(IDENTITY_FIELD)
            .ok_or_else(|| format!("result has no `{IDENTITY_FIELD}` field"))?;

        let decoded = match number {
            Value::String(s) => parse_quantity(s).map_err(|e| e.to_string())?,
            Value::Number(n) => n
                .as_u64()
                .ok_or_else(|| format!("`{IDENTITY_FIELD}` is not an unsigned integer: {n}"))?,
            other => return Err(format!("`{IDENTITY_FIELD}` is not number-like: {other}")),
        };

        if decoded != expected {
            return Err(format!("stored block number {decoded} does not match {expected}"));
        }
        Ok(())
    }

    /// Number of entries in the block's transaction list (0 if absent)
    pub fn tx_count(&self) -> u64 {
        transaction_count(&self.result)
    }
}

/// Length of the `transactions` list of a raw block, 0 if absent
pub fn transaction_count(block: &Value) -> u64 {
    block
        .get(TRANSACTIONS_FIELD)
        .and_then(Value::as_array)
        .map(|txs| txs.len() as u64)
        .unwrap_or(0)
}
