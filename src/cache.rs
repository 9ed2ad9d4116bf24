//! Block-granular cache for fetched ranges.
//!
//! The resource is viewed as a sequence of fixed-size blocks; block `n`
//! covers bytes `[n*B, min((n+1)*B, L))`, so the last block may be short.
//! Reads are planned block by block: blocks already present are served from
//! the cache, missing ones become byte ranges for the fetcher. Installed
//! blocks are immutable and never evicted.

use std::collections::HashMap;

use bytes::Bytes;
use tokio::sync::RwLock;

use crate::error::{RangeError, Result};
use crate::fetch::ByteRange;

/// Default size for the blocks that are downloaded and cached. Lower values
/// translate to lower memory usage but typically require more requests.
pub const DEFAULT_BLOCK_SIZE: u64 = 128 * 1024;

/// Returns the first block and the number of blocks covered by a byte span.
///
/// `len` must be positive.
pub(crate) fn block_span(offset: u64, len: u64, block_size: u64) -> (u64, u64) {
    let first = offset / block_size;
    let last = (offset + len).div_ceil(block_size);
    (first, last - first)
}

/// Keyed block store shared by concurrent positional reads.
///
/// Probing takes the read lock, installing the write lock. Install is
/// idempotent: the first write for a block number wins, and a racing
/// duplicate fetch simply has its identical bytes dropped.
pub(crate) struct BlockCache {
    block_size: u64,
    blocks: RwLock<HashMap<u64, Bytes>>,
}

impl BlockCache {
    pub fn new(block_size: u64) -> Self {
        assert!(block_size > 0, "block size must be positive");
        Self {
            block_size,
            blocks: RwLock::new(HashMap::new()),
        }
    }

    pub fn block_size(&self) -> u64 {
        self.block_size
    }

    /// Plan the fetches for a read of `len` bytes at `offset` in a resource
    /// of `total` bytes: one byte range per missing block, in ascending
    /// block order, each clamped to the end of the resource.
    pub async fn missing_ranges(&self, offset: u64, len: u64, total: u64) -> Vec<ByteRange> {
        let (first, count) = block_span(offset, len, self.block_size);
        let blocks = self.blocks.read().await;
        let mut ranges = Vec::new();
        for number in first..first + count {
            if blocks.contains_key(&number) {
                continue;
            }
            let start = number * self.block_size;
            let end = ((number + 1) * self.block_size - 1).min(total - 1);
            ranges.push(ByteRange::new(start, end));
        }
        ranges
    }

    /// Install fetched blocks, one buffer per planned range.
    pub async fn install(&self, ranges: &[ByteRange], buffers: Vec<Bytes>) {
        debug_assert_eq!(ranges.len(), buffers.len());
        let mut blocks = self.blocks.write().await;
        for (range, data) in ranges.iter().zip(buffers) {
            let number = range.start / self.block_size;
            blocks.entry(number).or_insert(data);
        }
    }

    /// Copy `buf.len()` bytes starting at `offset` out of the cache.
    ///
    /// Every block covering the span must already be present; the caller
    /// ensures that by fetching `missing_ranges` first.
    pub async fn splice(&self, buf: &mut [u8], offset: u64) -> Result<usize> {
        let blocks = self.blocks.read().await;
        let mut copied = 0usize;
        let mut number = offset / self.block_size;
        let mut start = (offset % self.block_size) as usize;

        while copied < buf.len() {
            let data = blocks.get(&number).ok_or_else(|| {
                RangeError::Transport(format!("block {number} vanished from the cache"))
            })?;
            let take = (data.len() - start).min(buf.len() - copied);
            buf[copied..copied + take].copy_from_slice(&data[start..start + take]);
            copied += take;
            number += 1;
            start = 0;
        }
        Ok(copied)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn span_within_one_block() {
        assert_eq!(block_span(0, 10, 512), (0, 1));
        assert_eq!(block_span(500, 12, 512), (0, 1));
    }

    #[test]
    fn span_across_block_boundaries() {
        assert_eq!(block_span(500, 13, 512), (0, 2));
        assert_eq!(block_span(0, 1024, 512), (0, 2));
        assert_eq!(block_span(512, 512, 512), (1, 1));
        assert_eq!(block_span(1000, 5000, 512), (1, 11));
    }

    #[test]
    fn span_at_exact_block_edges() {
        assert_eq!(block_span(1024, 1, 512), (2, 1));
        assert_eq!(block_span(1023, 1, 512), (1, 1));
        assert_eq!(block_span(1023, 2, 512), (1, 2));
    }

    #[tokio::test]
    async fn planning_emits_one_range_per_missing_block() {
        let cache = BlockCache::new(512);
        let ranges = cache.missing_ranges(0, 1300, 5120).await;
        assert_eq!(
            ranges,
            vec![
                ByteRange::new(0, 511),
                ByteRange::new(512, 1023),
                ByteRange::new(1024, 1535),
            ]
        );
    }

    #[tokio::test]
    async fn planning_clamps_the_final_block_to_the_resource_end() {
        let cache = BlockCache::new(512);
        let ranges = cache.missing_ranges(4800, 100, 5000).await;
        assert_eq!(ranges, vec![ByteRange::new(4608, 4999)]);
    }

    #[tokio::test]
    async fn planning_skips_cached_blocks() {
        let cache = BlockCache::new(4);
        cache
            .install(&[ByteRange::new(4, 7)], vec![Bytes::from_static(b"1111")])
            .await;
        let ranges = cache.missing_ranges(0, 12, 100).await;
        assert_eq!(ranges, vec![ByteRange::new(0, 3), ByteRange::new(8, 11)]);
    }

    #[tokio::test]
    async fn install_is_first_write_wins() {
        let cache = BlockCache::new(4);
        let range = [ByteRange::new(0, 3)];
        cache
            .install(&range, vec![Bytes::from_static(b"aaaa")])
            .await;
        cache
            .install(&range, vec![Bytes::from_static(b"bbbb")])
            .await;

        let mut buf = [0u8; 4];
        cache.splice(&mut buf, 0).await.unwrap();
        assert_eq!(&buf, b"aaaa");
    }

    #[tokio::test]
    async fn splice_crosses_block_boundaries() {
        let cache = BlockCache::new(4);
        cache
            .install(
                &[ByteRange::new(0, 3), ByteRange::new(4, 7)],
                vec![Bytes::from_static(b"abcd"), Bytes::from_static(b"efgh")],
            )
            .await;

        let mut buf = [0u8; 6];
        let n = cache.splice(&mut buf, 2).await.unwrap();
        assert_eq!(n, 6);
        assert_eq!(&buf, b"cdefgh");
    }

    #[tokio::test]
    async fn splice_of_an_absent_block_is_an_error() {
        let cache = BlockCache::new(4);
        let mut buf = [0u8; 4];
        assert!(cache.splice(&mut buf, 0).await.is_err());
    }
}
