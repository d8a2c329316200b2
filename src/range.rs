//! Block numbers, block ranges and JSON-RPC quantity encoding
//!
//! Block numbers travel over JSON-RPC as `0x`-prefixed hexadecimal
//! quantities without leading zeros (`0x0` for genesis).

use std::fmt;
use std::ops::Range;

/// A block height on the remote chain
pub type BlockNumber = u64;

/// Contiguous, non-empty range of blocks `[start, start + count)`
///
/// # Examples
///
/// ```
/// use block_archive_downloader::range::BlockRange;
///
/// let range = BlockRange::new(100, 3).unwrap();
/// assert_eq!(range.end(), 103);
/// assert_eq!(range.iter().collect::<Vec<_>>(), vec![100, 101, 102]);
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct BlockRange {
    start: BlockNumber,
    count: u64,
}

impl BlockRange {
    /// Create a range starting at `start` covering `count` blocks
    ///
    /// # Errors
    ///
    /// Returns an error if `count` is zero or `start + count` overflows.
    pub fn new(start: BlockNumber, count: u64) -> Result<Self, RangeError> {
        if count == 0 {
            return Err(RangeError::Empty);
        }
        if start.checked_add(count).is_none() {
            return Err(RangeError::Overflow { start, count });
        }
        Ok(Self { start, count })
    }

    /// First block in the range
    pub fn start(&self) -> BlockNumber {
        self.start
    }

    /// Number of blocks in the range
    pub fn count(&self) -> u64 {
        self.count
    }

    /// One past the last block (exclusive bound)
    pub fn end(&self) -> BlockNumber {
        self.start + self.count
    }

    /// Last block in the range (inclusive bound)
    pub fn last(&self) -> BlockNumber {
        self.end() - 1
    }

    /// Whether `block` falls inside the range
    pub fn contains(&self, block: BlockNumber) -> bool {
        (self.start..self.end()).contains(&block)
    }

    /// Iterate over every block number in ascending order
    pub fn iter(&self) -> Range<BlockNumber> {
        self.start..self.end()
    }
}

impl fmt::Display for BlockRange {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "[{}, {})", self.start, self.end())
    }
}

/// Encode a block number as a JSON-RPC quantity (`0x`-prefixed lowercase hex)
pub fn encode_quantity(value: u64) -> String {
    format!("{value:#x}")
}

/// Parse a JSON-RPC quantity string such as `"0x112a880"`
pub fn parse_quantity(s: &str) -> Result<u64, RangeError> {
    let trimmed = s.trim();
    let digits = trimmed
        .strip_prefix("0x")
        .or_else(|| trimmed.strip_prefix("0X"))
        .ok_or_else(|| RangeError::InvalidQuantity(format!("missing 0x prefix: {s:?}")))?;

    if digits.is_empty() {
        return Err(RangeError::InvalidQuantity(format!("no digits: {s:?}")));
    }

    u64::from_str_radix(digits, 16).map_err(|e| RangeError::InvalidQuantity(format!("{s:?}: {e}")))
}

/// Errors produced while building ranges or decoding quantities
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum RangeError {
    /// Range with zero blocks
    #[error("block range is empty")]
    Empty,

    /// `start + count` does not fit in a block number
    #[error("block range overflows: start {start} + count {count}")]
    Overflow {
        /// Requested start block
        start: BlockNumber,
        /// Requested block count
        count: u64,
    },

    /// Malformed hex quantity
    #[error("invalid quantity: {0}")]
    InvalidQuantity(String),
}
