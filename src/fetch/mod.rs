//! Pluggable transports for fetching byte ranges.
//!
//! A [`RangeFetcher`] maps inclusive byte ranges to bytes. The reader never
//! talks to the network itself; it only speaks this trait, so HTTP, local
//! files and in-memory buffers all plug in the same way.

mod http;
mod local;
mod memory;
mod split;

pub use http::HttpRangeFetcher;
pub use local::LocalFileFetcher;
pub use memory::MemoryFetcher;

use async_trait::async_trait;
use bytes::Bytes;
use std::fmt;

use crate::error::Result;

/// An inclusive byte range within a resource.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ByteRange {
    /// First byte covered by the range
    pub start: u64,
    /// Last byte covered by the range (inclusive)
    pub end: u64,
}

impl ByteRange {
    pub fn new(start: u64, end: u64) -> Self {
        debug_assert!(start <= end);
        Self { start, end }
    }

    /// Number of bytes covered. Always at least 1.
    pub fn len(&self) -> u64 {
        self.end - self.start + 1
    }

    /// Whether `other` begins exactly where this range ends.
    pub fn is_adjacent_to(&self, other: &ByteRange) -> bool {
        other.start == self.end + 1
    }
}

impl fmt::Display for ByteRange {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}-{}", self.start, self.end)
    }
}

/// Trait for transports that retrieve contiguous byte ranges of a resource.
///
/// Implementations must uphold two contracts:
///
/// - `expected_length` is idempotent. It may perform I/O on the first call
///   (and memoize the result), and it fails when the resource is absent or
///   lacks the capabilities random access requires.
/// - `fetch_ranges` receives an ordered, non-overlapping list of inclusive
///   ranges within `[0, length)` and returns exactly one buffer per input
///   range, in input order, each holding exactly `end - start + 1` bytes.
#[async_trait]
pub trait RangeFetcher: Send + Sync {
    /// Total length, in bytes, of the ranged-over resource.
    async fn expected_length(&self) -> Result<u64>;

    /// Fetch the given byte ranges, one buffer per range.
    async fn fetch_ranges(&self, ranges: &[ByteRange]) -> Result<Vec<Bytes>>;
}

/// Merges runs of adjacent ranges into single ranges.
///
/// The input must be ordered and non-overlapping. Merging happens at the
/// wire level only; callers that need per-range buffers back keep the
/// original list and re-bucket the response.
pub fn coalesce_adjacent(ranges: &[ByteRange]) -> Vec<ByteRange> {
    let mut out: Vec<ByteRange> = Vec::with_capacity(ranges.len());
    for range in ranges {
        match out.last_mut() {
            Some(prev) if prev.is_adjacent_to(range) => prev.end = range.end,
            _ => out.push(*range),
        }
    }
    out
}
