#![allow(dead_code)]

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Mutex;

use async_trait::async_trait;
use bytes::Bytes;
use rangefile::{ByteRange, MemoryFetcher, RangeError, RangeFetcher, Result};

/// Builds a resource of `count` blocks of `size` bytes, each block stamped
/// with its index at its start and end so every offset is distinguishable
/// and misplaced reads show up immediately.
pub fn sentinel_resource(count: usize, size: usize) -> Vec<u8> {
    assert!(size >= 32);
    let mut data = vec![0u8; count * size];
    for i in 0..count {
        let start = i * size;
        let head = format!("SB{i:08}BEGIN");
        let tail = format!("SB{i:08}__END");
        data[start..start + head.len()].copy_from_slice(head.as_bytes());
        let tail_at = start + size - tail.len();
        data[tail_at..tail_at + tail.len()].copy_from_slice(tail.as_bytes());
        for (j, b) in data[start + head.len()..tail_at].iter_mut().enumerate() {
            *b = ((i * 31 + j) % 251) as u8;
        }
    }
    data
}

/// Fetcher over an in-memory resource that records every `fetch_ranges`
/// call, and can be configured to start failing after a number of fetches
/// (simulating a resource that mutates mid-session).
pub struct InstrumentedFetcher {
    inner: MemoryFetcher,
    calls: AtomicUsize,
    log: Mutex<Vec<Vec<ByteRange>>>,
    fail_after: Option<usize>,
}

impl InstrumentedFetcher {
    pub fn new(data: Vec<u8>) -> Self {
        Self {
            inner: MemoryFetcher::new(data),
            calls: AtomicUsize::new(0),
            log: Mutex::new(Vec::new()),
            fail_after: None,
        }
    }

    /// Succeed for the first `n` fetches, then report the resource as
    /// changed.
    pub fn failing_after(data: Vec<u8>, n: usize) -> Self {
        Self {
            fail_after: Some(n),
            ..Self::new(data)
        }
    }

    /// Number of `fetch_ranges` calls issued so far.
    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }

    /// The ranges of every call, in call order.
    pub fn fetched_ranges(&self) -> Vec<Vec<ByteRange>> {
        self.log.lock().unwrap().clone()
    }
}

#[async_trait]
impl RangeFetcher for InstrumentedFetcher {
    async fn expected_length(&self) -> Result<u64> {
        self.inner.expected_length().await
    }

    async fn fetch_ranges(&self, ranges: &[ByteRange]) -> Result<Vec<Bytes>> {
        let call = self.calls.fetch_add(1, Ordering::SeqCst);
        if let Some(limit) = self.fail_after {
            if call >= limit {
                return Err(RangeError::ResourceChanged);
            }
        }
        self.log.lock().unwrap().push(ranges.to_vec());
        self.inner.fetch_ranges(ranges).await
    }
}

/// Fetcher whose initialization always fails, for exercising the sticky
/// failed state.
pub struct BrokenFetcher;

#[async_trait]
impl RangeFetcher for BrokenFetcher {
    async fn expected_length(&self) -> Result<u64> {
        Err(RangeError::ProtocolUnsupported(
            "server does not support byte-range requests".into(),
        ))
    }

    async fn fetch_ranges(&self, _ranges: &[ByteRange]) -> Result<Vec<Bytes>> {
        Err(RangeError::ProtocolUnsupported(
            "server does not support byte-range requests".into(),
        ))
    }
}
