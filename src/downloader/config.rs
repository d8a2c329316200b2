//! Download configuration constants

use crate::range::BlockNumber;
use std::time::Duration;

/// Default first block to download.
/// Mainnet block 18,000,000 (Aug 2023) sits in a period of steady activity.
pub const DEFAULT_START_BLOCK: BlockNumber = 18_000_000;

/// Default number of blocks to download
pub const DEFAULT_BLOCK_COUNT: u64 = 100_000;

/// Default output directory; block files land in `{dir}/blocks/`
pub const DEFAULT_OUTPUT_DIR: &str = "./data_100k";

/// Default width of the parallel fetch pool
pub const DEFAULT_CONCURRENCY: usize = 20;

/// Upper bound for the fetch pool width accepted by the CLI
pub const MAX_CONCURRENCY: usize = 256;

/// Width of the retry pass. Failures usually stem from load on the node, so
/// they are retried one at a time.
pub const DEFAULT_RETRY_CONCURRENCY: usize = 1;

/// Per-request timeout for JSON-RPC calls
pub const RPC_TIMEOUT: Duration = Duration::from_secs(30);

/// Number of failed blocks listed explicitly in summaries
pub const FAILED_PREVIEW_LIMIT: usize = 10;

/// Well-known endpoint presets accepted in place of a URL
pub const ENDPOINT_PRESETS: &[(&str, &str)] = &[("local", "http://localhost:8545")];

/// Resolve a preset name (e.g. `local`) to its URL; anything else is returned as-is
pub fn resolve_endpoint(endpoint: &str) -> String {
    ENDPOINT_PRESETS
        .iter()
        .find(|(name, _)| name.eq_ignore_ascii_case(endpoint.trim()))
        .map(|(_, url)| (*url).to_string())
        .unwrap_or_else(|| endpoint.trim().to_string())
}
