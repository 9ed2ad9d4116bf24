use async_trait::async_trait;
use bytes::Bytes;

use super::{ByteRange, RangeFetcher};
use crate::error::{RangeError, Result};

/// In-memory fetcher over a byte buffer.
///
/// Useful for tests and for running the reader over data that is already
/// local. Every handed-out block is a zero-copy slice of the backing
/// buffer.
pub struct MemoryFetcher {
    data: Bytes,
}

impl MemoryFetcher {
    pub fn new(data: impl Into<Bytes>) -> Self {
        Self { data: data.into() }
    }
}

#[async_trait]
impl RangeFetcher for MemoryFetcher {
    async fn expected_length(&self) -> Result<u64> {
        Ok(self.data.len() as u64)
    }

    async fn fetch_ranges(&self, ranges: &[ByteRange]) -> Result<Vec<Bytes>> {
        let length = self.data.len() as u64;
        ranges
            .iter()
            .map(|range| {
                if range.end >= length {
                    return Err(RangeError::OutOfRange {
                        offset: range.end as i64,
                        length,
                    });
                }
                Ok(self.data.slice(range.start as usize..range.end as usize + 1))
            })
            .collect()
    }
}
