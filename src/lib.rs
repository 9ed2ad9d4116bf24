//! # rangefile
//!
//! A caching random-access reader for remote files using HTTP Range requests.
//!
//! This library makes a remote resource usable like a local file: you can
//! seek around it and read arbitrary slices, and only the byte ranges you
//! actually touch are transferred. Fetched data is kept in a block-granular
//! in-memory cache, overlapping reads are coalesced into as few requests as
//! possible, and every response is validated against the `ETag` (or
//! `Last-Modified`) captured up front so a resource that changes mid-session
//! is detected instead of read inconsistently.
//!
//! ## Features
//!
//! - Positional reads (`read_at`), sequential reads and seeking
//! - Block-granular caching with request coalescing
//! - `multipart/byteranges` response handling
//! - Mutation detection via `If-Range` validators
//! - Pluggable transports: HTTP, local files, in-memory buffers
//!
//! ## Example
//!
//! ```no_run
//! use std::io::SeekFrom;
//! use rangefile::{HttpRangeFetcher, RangeReader};
//!
//! #[tokio::main]
//! async fn main() -> rangefile::Result<()> {
//!     let url = "https://example.com/archive.bin".parse().unwrap();
//!     let mut reader = RangeReader::new(HttpRangeFetcher::new(url)?);
//!
//!     println!("resource is {} bytes", reader.length().await?);
//!
//!     // Inspect the trailer without downloading the rest.
//!     reader.seek(SeekFrom::End(-512)).await?;
//!     let mut trailer = vec![0u8; 512];
//!     reader.read(&mut trailer).await?;
//!     Ok(())
//! }
//! ```

mod cache;
pub mod cli;
pub mod error;
pub mod fetch;
pub mod reader;

pub use cache::DEFAULT_BLOCK_SIZE;
pub use cli::Cli;
pub use error::{RangeError, Result};
pub use fetch::{ByteRange, HttpRangeFetcher, LocalFileFetcher, MemoryFetcher, RangeFetcher};
pub use reader::RangeReader;
