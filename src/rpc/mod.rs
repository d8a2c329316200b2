//! JSON-RPC client for archive nodes
//!
//! The [`JsonRpcClient`] trait is the single seam between the download
//! pipeline and the network. Every call is exactly one request/response
//! round trip: retry policy belongs to the scheduler, never to this layer.
//!
//! - [`http`] - reqwest-backed client with a bounded request timeout
//! - [`envelope`] - JSON-RPC 2.0 request/response envelopes

use crate::range::{encode_quantity, parse_quantity, BlockNumber};
use async_trait::async_trait;
use serde_json::Value;

pub mod envelope;
pub mod http;

pub use envelope::{RpcRequest, RpcResponse};
pub use http::HttpRpcClient;

/// JSON-RPC protocol version sent in every request
pub const JSONRPC_VERSION: &str = "2.0";

/// Fixed request id used for every call
pub const REQUEST_ID: u64 = 1;

/// Method names of the Ethereum JSON-RPC API used by the downloader
pub mod methods {
    /// Returns the current chain tip as a hex quantity
    pub const BLOCK_NUMBER: &str = "eth_blockNumber";

    /// Returns a block by number; second param selects full transaction objects
    pub const GET_BLOCK_BY_NUMBER: &str = "eth_getBlockByNumber";
}

/// RPC client errors
#[derive(Debug, thiserror::Error)]
pub enum RpcError {
    /// Connection refused, timeout, non-2xx status
    #[error("transport error: {0}")]
    Transport(String),

    /// Remote service returned an `error` payload
    #[error("RPC error: {0}")]
    Remote(Value),

    /// Response body could not be decoded as expected
    #[error("invalid response: {0}")]
    InvalidResponse(String),
}

/// Result type for RPC operations
pub type RpcResult<T> = Result<T, RpcError>;

/// Single-attempt JSON-RPC transport
#[async_trait]
pub trait JsonRpcClient: Send + Sync {
    /// Call `method` with positional `params` and return the `result` field verbatim
    ///
    /// A `null` result is returned as [`Value::Null`]; callers must check it.
    async fn call(&self, method: &str, params: Vec<Value>) -> RpcResult<Value>;
}

/// Fetch the current chain tip
pub async fn block_number(client: &dyn JsonRpcClient) -> RpcResult<BlockNumber> {
    let result = client.call(methods::BLOCK_NUMBER, Vec::new()).await?;
    match &result {
        Value::String(s) => {
            parse_quantity(s).map_err(|e| RpcError::InvalidResponse(e.to_string()))
        }
        Value::Number(n) => n
            .as_u64()
            .ok_or_else(|| RpcError::InvalidResponse(format!("invalid block number: {n}"))),
        other => Err(RpcError::InvalidResponse(format!(
            "unexpected {} result: {other}",
            methods::BLOCK_NUMBER
        ))),
    }
}

/// Fetch a block by number, `None` when the node returns `null`
///
/// With `full_transactions` the `transactions` list holds full transaction
/// objects instead of hashes.
pub async fn block_by_number(
    client: &dyn JsonRpcClient,
    block: BlockNumber,
    full_transactions: bool,
) -> RpcResult<Option<Value>> {
    let params = vec![
        Value::String(encode_quantity(block)),
        Value::Bool(full_transactions),
    ];
    let result = client.call(methods::GET_BLOCK_BY_NUMBER, params).await?;
    Ok(if result.is_null() { None } else { Some(result) })
}
