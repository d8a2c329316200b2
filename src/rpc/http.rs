//! HTTP transport for JSON-RPC calls
//!
//! One POST per call with a bounded timeout. Transport failures, non-2xx
//! statuses and `error` payloads are all surfaced as [`RpcError`]s; nothing
//! is retried here.

use async_trait::async_trait;
use reqwest::Client;
use serde_json::Value;
use std::time::Duration;
use tracing::debug;

use super::envelope::{RpcRequest, RpcResponse};
use super::{JsonRpcClient, RpcError, RpcResult};
use crate::downloader::config::RPC_TIMEOUT;
use crate::metrics::RpcRequestMetrics;

/// Longest slice of a non-2xx body kept in the error message
const MAX_ERROR_BODY_CHARS: usize = 256;

/// JSON-RPC client over HTTP POST
#[derive(Debug, Clone)]
pub struct HttpRpcClient {
    client: Client,
    endpoint: String,
    timeout: Duration,
}

impl HttpRpcClient {
    /// Create a client with the default 30s request timeout
    pub fn new(endpoint: impl Into<String>) -> RpcResult<Self> {
        Self::with_timeout(endpoint, RPC_TIMEOUT)
    }

    /// Create a client with a custom request timeout
    pub fn with_timeout(endpoint: impl Into<String>, timeout: Duration) -> RpcResult<Self> {
        let client = Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| RpcError::Transport(format!("failed to build HTTP client: {e}")))?;

        Ok(Self {
            client,
            endpoint: endpoint.into(),
            timeout,
        })
    }

    /// Endpoint URL requests are posted to
    pub fn endpoint(&self) -> &str {
        &self.endpoint
    }

    /// Per-request timeout
    pub fn timeout(&self) -> Duration {
        self.timeout
    }
}

#[async_trait]
impl JsonRpcClient for HttpRpcClient {
    async fn call(&self, method: &str, params: Vec<Value>) -> RpcResult<Value> {
        let request = RpcRequest::new(method, &params);
        let metrics = RpcRequestMetrics::start(method);

        debug!(
            correlation_id = metrics.correlation_id(),
            method = method,
            params = params.len(),
            "Sending JSON-RPC request"
        );

        let response = match self.client.post(&self.endpoint).json(&request).send().await {
            Ok(resp) => resp,
            Err(e) => {
                metrics.record_transport_error();
                return Err(RpcError::Transport(e.to_string()));
            }
        };

        let status = response.status();
        metrics.record_status(status.as_u16());

        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            let body: String = body.chars().take(MAX_ERROR_BODY_CHARS).collect();
            return Err(RpcError::Transport(format!("HTTP status {status}: {body}")));
        }

        let decoded: RpcResponse = response
            .json()
            .await
            .map_err(|e| RpcError::InvalidResponse(format!("failed to decode response: {e}")))?;

        decoded.into_result()
    }
}
