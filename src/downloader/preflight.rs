//! Connectivity preflight run before bulk dispatch

use crate::range::BlockNumber;
use crate::rpc::{self, JsonRpcClient};
use serde::Serialize;
use std::sync::Arc;
use tracing::{error, info, warn};

/// What the preflight found out about the node
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct PreflightReport {
    /// Chain tip reported by the node, if reachable
    pub latest_block: Option<BlockNumber>,
    /// Whether the first block of the range came back non-null
    pub start_block_available: bool,
    /// First error encountered, if any
    pub error: Option<String>,
}

impl PreflightReport {
    /// Whether bulk dispatch may proceed
    pub fn passed(&self) -> bool {
        self.latest_block.is_some() && self.start_block_available
    }
}

/// Two cheap calls proving the node is reachable and serves the range start
pub struct ConnectivityPreflight {
    client: Arc<dyn JsonRpcClient>,
}

impl ConnectivityPreflight {
    /// Create a preflight over `client`
    pub fn new(client: Arc<dyn JsonRpcClient>) -> Self {
        Self { client }
    }

    /// Run the preflight and return only the verdict
    pub async fn check(&self, start: BlockNumber) -> bool {
        self.run(start).await.passed()
    }

    /// Run the preflight and return the full report
    ///
    /// 1. `eth_blockNumber`; on failure stop immediately
    /// 2. `eth_getBlockByNumber(start, false)`; must be non-null
    pub async fn run(&self, start: BlockNumber) -> PreflightReport {
        let mut report = PreflightReport::default();

        let latest = match rpc::block_number(self.client.as_ref()).await {
            Ok(latest) => latest,
            Err(e) => {
                error!(error = %e, "Cannot reach archive node");
                report.error = Some(e.to_string());
                return report;
            }
        };
        info!(latest_block = latest, "Connected to archive node");
        report.latest_block = Some(latest);

        if start > latest {
            warn!(
                start_block = start,
                latest_block = latest,
                "Start block is beyond the current chain tip"
            );
        }

        match rpc::block_by_number(self.client.as_ref(), start, false).await {
            Ok(Some(_)) => {
                info!(start_block = start, "Start block is accessible");
                report.start_block_available = true;
            }
            Ok(None) => {
                error!(start_block = start, "Node returned null for start block");
                report.error = Some(format!("block {start} returned null"));
            }
            Err(e) => {
                error!(start_block = start, error = %e, "Cannot access start block");
                report.error = Some(e.to_string());
            }
        }

        report
    }
}
