//! On-disk layout for stored blocks
//!
//! Every block owns exactly one file: `{output_dir}/blocks/bdf-{number}.json`.
//! The decimal block number makes the mapping injective over the whole
//! `u64` space, and [`parse_record_file_name`] is its exact inverse.

use crate::range::BlockNumber;
use std::path::{Path, PathBuf};

/// Subdirectory of the output directory holding block files
pub const BLOCKS_SUBDIR: &str = "blocks";

/// File name prefix for stored blocks
pub const RECORD_FILE_PREFIX: &str = "bdf-";

/// File extension for stored blocks
pub const RECORD_FILE_EXTENSION: &str = "json";

/// Prefix for in-progress temporary files; never matches a record file name
pub const TEMP_FILE_PREFIX: &str = ".bdf-";

/// File name for `block`, e.g. `bdf-18000000.json`
pub fn record_file_name(block: BlockNumber) -> String {
    format!("{RECORD_FILE_PREFIX}{block}.{RECORD_FILE_EXTENSION}")
}

/// Full path of `block` under `blocks_dir`
pub fn record_path(blocks_dir: &Path, block: BlockNumber) -> PathBuf {
    blocks_dir.join(record_file_name(block))
}

/// Blocks directory under an output directory
pub fn blocks_dir(output_dir: &Path) -> PathBuf {
    output_dir.join(BLOCKS_SUBDIR)
}

/// Recover the block number from a record file name
///
/// Only canonical names are accepted: no sign, no leading zeros.
pub fn parse_record_file_name(name: &str) -> Option<BlockNumber> {
    let digits = name
        .strip_prefix(RECORD_FILE_PREFIX)?
        .strip_suffix(RECORD_FILE_EXTENSION)?
        .strip_suffix('.')?;

    if digits.is_empty() || !digits.bytes().all(|b| b.is_ascii_digit()) {
        return None;
    }
    if digits.len() > 1 && digits.starts_with('0') {
        return None;
    }
    digits.parse().ok()
}
