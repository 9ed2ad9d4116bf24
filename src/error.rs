//! Error types for range reading operations.

use thiserror::Error;

/// Result type for range reading operations
pub type Result<T> = std::result::Result<T, RangeError>;

/// Errors produced by readers and fetchers.
///
/// The enum is `Clone` so that a failed lazy initialization can be replayed
/// to every later caller: once a reader enters its failed state, all
/// subsequent operations return the same error.
#[derive(Debug, Clone, Error)]
pub enum RangeError {
    /// Underlying I/O or connection failure. The reader remains usable;
    /// the operation may be retried.
    #[error("transport error: {0}")]
    Transport(String),

    /// The server lacks a capability the reader requires (byte-range
    /// support or a usable validator). Fatal at initialization.
    #[error("{0}")]
    ProtocolUnsupported(String),

    /// The resource is absent, or disappeared after initialization.
    #[error("resource not found")]
    ResourceNotFound,

    /// The resource's validator no longer matches the one captured at
    /// initialization. Cached blocks stay intact, but the reader should
    /// be discarded.
    #[error("resource changed between requests")]
    ResourceChanged,

    /// An offset before the start or beyond the end of the resource.
    /// `offset` is signed so that seek arithmetic that lands below zero
    /// is representable.
    #[error("offset {offset} is outside the resource (length {length})")]
    OutOfRange { offset: i64, length: u64 },

    /// A response ended before filling one of the requested ranges.
    #[error("range response ended early: expected {expected} bytes, got {got}")]
    ShortResponse { expected: u64, got: u64 },
}

impl From<reqwest::Error> for RangeError {
    fn from(e: reqwest::Error) -> Self {
        RangeError::Transport(e.to_string())
    }
}

impl From<std::io::Error> for RangeError {
    fn from(e: std::io::Error) -> Self {
        if e.kind() == std::io::ErrorKind::NotFound {
            RangeError::ResourceNotFound
        } else {
            RangeError::Transport(e.to_string())
        }
    }
}
