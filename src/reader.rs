//! Random-access reader over a range-fetchable resource.
//!
//! [`RangeReader`] makes a remote resource behave like a local file:
//! positional reads, sequential reads, seeking and length discovery, with
//! only the touched byte ranges ever transferred. Fetched data lands in a
//! block-granular cache, so re-reading a region costs no further network
//! traffic.
//!
//! ## Concurrency
//!
//! [`read_at`](RangeReader::read_at) and [`length`](RangeReader::length)
//! take `&self` and are safe to call from many tasks on a shared reader.
//! [`read`](RangeReader::read) and [`seek`](RangeReader::seek) move the
//! reader's own position and take `&mut self`; the borrow checker keeps
//! them single-owner.

use std::io::SeekFrom;

use tokio::sync::OnceCell;
use tracing::debug;

use crate::cache::{BlockCache, DEFAULT_BLOCK_SIZE};
use crate::error::{RangeError, Result};
use crate::fetch::RangeFetcher;

/// A caching, validating random-access reader over a [`RangeFetcher`].
///
/// No fetcher traffic happens until the first operation that needs the
/// resource's length or data. The first such call discovers the length
/// (and, for fetchers that have one, a content validator); a discovery
/// failure is sticky and replays on every later call.
///
/// ## Example
///
/// ```no_run
/// use std::io::SeekFrom;
/// use rangefile::{HttpRangeFetcher, RangeReader};
///
/// # async fn example() -> rangefile::Result<()> {
/// let url = "https://example.com/disk.img".parse().unwrap();
/// let mut reader = RangeReader::new(HttpRangeFetcher::new(url)?);
///
/// // Read the last 4 KiB without downloading anything else.
/// reader.seek(SeekFrom::End(-4096)).await?;
/// let mut tail = vec![0u8; 4096];
/// let n = reader.read(&mut tail).await?;
/// # Ok(())
/// # }
/// ```
pub struct RangeReader<F> {
    fetcher: F,
    cache: BlockCache,
    length: OnceCell<Result<u64>>,
    pos: u64,
}

impl<F: RangeFetcher> RangeReader<F> {
    /// Create a reader with the default block size (128 KiB).
    pub fn new(fetcher: F) -> Self {
        Self::with_block_size(fetcher, DEFAULT_BLOCK_SIZE)
    }

    /// Create a reader that caches in blocks of `block_size` bytes.
    ///
    /// # Panics
    ///
    /// Panics if `block_size` is zero.
    pub fn with_block_size(fetcher: F, block_size: u64) -> Self {
        Self {
            fetcher,
            cache: BlockCache::new(block_size),
            length: OnceCell::new(),
            pos: 0,
        }
    }

    /// The configured cache block size in bytes.
    pub fn block_size(&self) -> u64 {
        self.cache.block_size()
    }

    /// The fetcher backing this reader.
    pub fn fetcher(&self) -> &F {
        &self.fetcher
    }

    /// Total length of the resource in bytes.
    ///
    /// Triggers initialization on first use; concurrent first callers
    /// rendezvous on a single `expected_length` call and observe the same
    /// outcome.
    pub async fn length(&self) -> Result<u64> {
        self.length
            .get_or_init(|| async { self.fetcher.expected_length().await })
            .await
            .clone()
    }

    /// Read up to `buf.len()` bytes at `offset`, without touching the
    /// reader's sequential position.
    ///
    /// A read that starts at or past the end of the resource fails with
    /// [`RangeError::OutOfRange`]. A read that starts inside but extends
    /// past the end returns the valid prefix: `Ok(n)` with `n < buf.len()`.
    /// Missing blocks are fetched; blocks already cached cost nothing.
    pub async fn read_at(&self, buf: &mut [u8], offset: u64) -> Result<usize> {
        let length = self.length().await?;
        if offset >= length {
            return Err(RangeError::OutOfRange {
                offset: offset as i64,
                length,
            });
        }
        if buf.is_empty() {
            return Ok(0);
        }

        let n = (buf.len() as u64).min(length - offset) as usize;
        let missing = self.cache.missing_ranges(offset, n as u64, length).await;
        if !missing.is_empty() {
            debug!(offset, blocks = missing.len(), "fetching missing blocks");
            let buffers = self.fetcher.fetch_ranges(&missing).await?;
            if buffers.len() != missing.len() {
                return Err(RangeError::Transport(format!(
                    "fetcher returned {} buffers for {} ranges",
                    buffers.len(),
                    missing.len()
                )));
            }
            self.cache.install(&missing, buffers).await;
        }

        self.cache.splice(&mut buf[..n], offset).await
    }

    /// Read up to `buf.len()` bytes at the current position and advance it
    /// by the number of bytes read.
    ///
    /// Returns `Ok(0)` at the end of the resource, without consulting the
    /// fetcher.
    pub async fn read(&mut self, buf: &mut [u8]) -> Result<usize> {
        let length = self.length().await?;
        if self.pos == length {
            return Ok(0);
        }
        let n = self.read_at(buf, self.pos).await?;
        self.pos += n as u64;
        Ok(n)
    }

    /// Reposition the sequential read cursor.
    ///
    /// Seeking to the exact end of the resource is allowed (the next
    /// [`read`](Self::read) reports end of stream); seeking past the end or
    /// before the start fails with [`RangeError::OutOfRange`].
    pub async fn seek(&mut self, pos: SeekFrom) -> Result<u64> {
        let length = self.length().await?;
        let target = match pos {
            SeekFrom::Start(offset) => offset as i64,
            SeekFrom::Current(delta) => self.pos as i64 + delta,
            SeekFrom::End(delta) => length as i64 + delta,
        };
        if target < 0 || target as u64 > length {
            return Err(RangeError::OutOfRange {
                offset: target,
                length,
            });
        }
        self.pos = target as u64;
        Ok(self.pos)
    }

    /// The current sequential read position.
    pub fn position(&self) -> u64 {
        self.pos
    }
}
