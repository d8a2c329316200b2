//! JSON-RPC 2.0 envelopes

use super::{RpcError, RpcResult, JSONRPC_VERSION, REQUEST_ID};
use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Outgoing request `{jsonrpc, method, params, id}`
#[derive(Debug, Serialize)]
pub struct RpcRequest<'a> {
    jsonrpc: &'static str,
    method: &'a str,
    params: &'a [Value],
    id: u64,
}

impl<'a> RpcRequest<'a> {
    /// Build a request with the fixed request id
    pub fn new(method: &'a str, params: &'a [Value]) -> Self {
        Self {
            jsonrpc: JSONRPC_VERSION,
            method,
            params,
            id: REQUEST_ID,
        }
    }
}

/// Incoming response `{jsonrpc, id, result}` or `{jsonrpc, id, error}`
#[derive(Debug, Deserialize)]
pub struct RpcResponse {
    /// Protocol version echoed by the server
    #[serde(default)]
    pub jsonrpc: Option<String>,
    /// Request id echoed by the server
    #[serde(default)]
    pub id: Option<Value>,
    /// Call result; absent is treated as `null`
    #[serde(default)]
    pub result: Value,
    /// Error payload, if the call failed remotely
    #[serde(default)]
    pub error: Option<Value>,
}

impl RpcResponse {
    /// Split the envelope into the call result or a remote error
    pub fn into_result(self) -> RpcResult<Value> {
        match self.error {
            Some(error) if !error.is_null() => Err(RpcError::Remote(error)),
            _ => Ok(self.result),
        }
    }
}
