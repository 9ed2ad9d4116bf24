//! HTTP Range request fetcher.
//!
//! This module implements the [`RangeFetcher`] contract over HTTP using the
//! Range request header (RFC 7233), fetching only the byte ranges the
//! reader actually needs.
//!
//! ## Requirements
//!
//! The remote server must:
//! - Support HTTP Range requests (indicated by `Accept-Ranges: bytes`)
//! - Offer a validator usable with `If-Range`: a strong `ETag` or a
//!   `Last-Modified` header
//!
//! ## Features
//!
//! - Lazy discovery: no request is sent until the first operation that
//!   needs the resource's length or data
//! - HEAD-forbidden fallback: servers that reject HEAD (e.g. presigned
//!   URLs) are probed with a one-byte ranged GET instead
//! - Mutation detection: every data response's validator is compared
//!   against the one captured at discovery
//! - Automatic retry with backoff for transient network errors
//! - Transfer statistics tracking for monitoring bandwidth usage

use async_trait::async_trait;
use bytes::Bytes;
use mime::Mime;
use reqwest::header::{
    HeaderMap, ACCEPT_RANGES, CONTENT_LENGTH, CONTENT_RANGE, CONTENT_TYPE, ETAG, IF_RANGE,
    LAST_MODIFIED, RANGE,
};
use reqwest::{Client, Response, StatusCode};
use std::fmt::Write as _;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Duration;
use tokio::sync::OnceCell;
use tracing::{debug, warn};
use url::Url;

use super::split::{split_contiguous, split_multipart};
use super::{coalesce_adjacent, ByteRange, RangeFetcher};
use crate::error::{RangeError, Result};

/// Maximum number of retries for transient failures on data requests.
const DEFAULT_MAX_RETRIES: u32 = 3;

/// Facts about the resource captured once at discovery and read-only
/// afterwards.
#[derive(Debug, Clone)]
struct ResourceInfo {
    length: u64,
    validator: String,
}

/// HTTP Range fetcher for remote resources.
///
/// The first operation that needs the resource performs a `HEAD` request
/// (falling back to `GET` with `Range: bytes=0-0` when HEAD is rejected) to
/// verify byte-range support, learn the total length and capture a
/// validator. Data is then fetched with ranged `GET`s carrying `If-Range`,
/// so a resource that mutates mid-session is detected rather than read
/// inconsistently.
///
/// ## Example
///
/// ```no_run
/// use rangefile::HttpRangeFetcher;
///
/// # fn example() -> rangefile::Result<()> {
/// let url = "https://example.com/large.bin".parse().unwrap();
/// let fetcher = HttpRangeFetcher::new(url)?;
/// # Ok(())
/// # }
/// ```
pub struct HttpRangeFetcher {
    /// HTTP client with connection pooling
    client: Client,
    /// The URL of the remote resource
    url: Url,
    /// Length + validator, discovered once
    info: OnceCell<Result<ResourceInfo>>,
    /// Cumulative payload bytes received from the network
    transferred_bytes: AtomicU64,
    /// Maximum number of retries for failed data requests
    max_retries: u32,
}

impl HttpRangeFetcher {
    /// Create a fetcher for the given URL.
    ///
    /// No network traffic happens here; discovery is deferred until the
    /// first call that needs the resource.
    pub fn new(url: Url) -> Result<Self> {
        let client = Client::builder().timeout(Duration::from_secs(30)).build()?;
        Ok(Self::with_client(client, url))
    }

    /// Create a fetcher that uses a caller-supplied client, e.g. one with
    /// custom timeouts, proxies or headers.
    pub fn with_client(client: Client, url: Url) -> Self {
        Self {
            client,
            url,
            info: OnceCell::new(),
            transferred_bytes: AtomicU64::new(0),
            max_retries: DEFAULT_MAX_RETRIES,
        }
    }

    /// Get the total payload bytes received from the network.
    pub fn transferred_bytes(&self) -> u64 {
        self.transferred_bytes.load(Ordering::Relaxed)
    }

    async fn info(&self) -> Result<ResourceInfo> {
        self.info
            .get_or_init(|| async { self.discover().await })
            .await
            .clone()
    }

    /// Probe the resource: verify range support, learn its length and
    /// capture a validator.
    async fn discover(&self) -> Result<ResourceInfo> {
        debug!(url = %self.url, "probing resource");

        let head = self.client.head(self.url.clone()).send().await?;
        let (resp, via_head) = if head.status().is_success() {
            (head, true)
        } else {
            // Some services reject HEAD (e.g. S3 presigned URLs return
            // 403). A one-byte ranged GET carries the same headers.
            debug!(status = %head.status(), "HEAD rejected, falling back to ranged GET");
            let get = self
                .client
                .get(self.url.clone())
                .header(RANGE, "bytes=0-0")
                .send()
                .await?;
            match get.status() {
                s if s.is_success() => (get, false),
                StatusCode::NOT_FOUND => return Err(RangeError::ResourceNotFound),
                s => return Err(status_error(s)),
            }
        };

        let headers = resp.headers();

        let accept_ranges = headers
            .get(ACCEPT_RANGES)
            .and_then(|v| v.to_str().ok())
            .unwrap_or("");
        if !accept_ranges.contains("bytes") {
            return Err(RangeError::ProtocolUnsupported(format!(
                "{} does not support byte-range requests",
                self.url
            )));
        }

        let validator = validator_from_headers(headers).ok_or_else(|| {
            RangeError::ProtocolUnsupported(format!(
                "{} did not offer a validator strong enough for range requests",
                self.url
            ))
        })?;

        let length = if via_head {
            headers
                .get(CONTENT_LENGTH)
                .and_then(|v| v.to_str().ok())
                .and_then(|s| s.parse().ok())
                .ok_or_else(|| {
                    RangeError::Transport("response did not include Content-Length".into())
                })?
        } else {
            content_range_total(headers).ok_or_else(|| {
                RangeError::Transport("response did not include a usable Content-Range".into())
            })?
        };

        debug!(length, validator = %validator, "resource initialized");
        Ok(ResourceInfo { length, validator })
    }

    /// Issue the ranged GET, retrying transient connection failures.
    async fn send_ranged(&self, range_header: &str, validator: &str) -> Result<Response> {
        let mut attempt = 0u32;
        loop {
            let result = self
                .client
                .get(self.url.clone())
                .header(RANGE, range_header)
                .header(IF_RANGE, validator)
                .send()
                .await;

            match result {
                Ok(resp) => return Ok(resp),
                Err(e) if e.is_timeout() || e.is_connect() => {
                    attempt += 1;
                    if attempt >= self.max_retries {
                        return Err(e.into());
                    }
                    warn!(attempt, error = %e, "transient error fetching ranges, retrying");
                    tokio::time::sleep(Duration::from_millis(500 * u64::from(attempt))).await;
                }
                Err(e) => return Err(e.into()),
            }
        }
    }

    /// Map the response status and validator onto the fetch contract.
    fn validate_response(&self, resp: Response, info: &ResourceInfo) -> Result<Response> {
        match resp.status() {
            StatusCode::PRECONDITION_FAILED => return Err(RangeError::ResourceChanged),
            StatusCode::NOT_FOUND => return Err(RangeError::ResourceNotFound),
            s if !s.is_success() => return Err(status_error(s)),
            _ => {}
        }
        match validator_from_headers(resp.headers()) {
            Some(v) if v == info.validator => Ok(resp),
            _ => Err(RangeError::ResourceChanged),
        }
    }
}

#[async_trait]
impl RangeFetcher for HttpRangeFetcher {
    async fn expected_length(&self) -> Result<u64> {
        Ok(self.info().await?.length)
    }

    async fn fetch_ranges(&self, ranges: &[ByteRange]) -> Result<Vec<Bytes>> {
        if ranges.is_empty() {
            return Ok(Vec::new());
        }
        let info = self.info().await?;

        let wire_ranges = coalesce_adjacent(ranges);
        let range_header = format_range_header(&wire_ranges);
        debug!(
            requested = ranges.len(),
            wire = wire_ranges.len(),
            header = %range_header,
            "fetching ranges"
        );

        let resp = self.send_ranged(&range_header, &info.validator).await?;
        let resp = self.validate_response(resp, &info)?;

        let content_type: Option<Mime> = resp
            .headers()
            .get(CONTENT_TYPE)
            .and_then(|v| v.to_str().ok())
            .and_then(|s| s.parse().ok());

        let body = resp.bytes().await?;
        self.transferred_bytes
            .fetch_add(body.len() as u64, Ordering::Relaxed);

        match content_type {
            Some(m) if m.type_() == mime::MULTIPART && m.subtype() == "byteranges" => {
                let boundary = m.get_param(mime::BOUNDARY).ok_or_else(|| {
                    RangeError::Transport("multipart response without a boundary".into())
                })?;
                split_multipart(&body, boundary.as_str(), ranges)
            }
            _ => split_contiguous(&body, ranges),
        }
    }
}

fn status_error(status: StatusCode) -> RangeError {
    RangeError::Transport(format!("unexpected response status {status}"))
}

/// Extract a validator usable with `If-Range`: a strong (quoted) `ETag`,
/// else `Last-Modified`.
fn validator_from_headers(headers: &HeaderMap) -> Option<String> {
    if let Some(etag) = headers.get(ETAG).and_then(|v| v.to_str().ok()) {
        if etag.starts_with('"') {
            return Some(etag.to_string());
        }
    }
    headers
        .get(LAST_MODIFIED)
        .and_then(|v| v.to_str().ok())
        .map(String::from)
}

/// Total length from the denominator of `Content-Range: bytes a-b/L`.
fn content_range_total(headers: &HeaderMap) -> Option<u64> {
    headers
        .get(CONTENT_RANGE)?
        .to_str()
        .ok()?
        .rsplit_once('/')?
        .1
        .trim()
        .parse()
        .ok()
}

/// Build the `Range` header value for a list of (already coalesced) ranges.
fn format_range_header(ranges: &[ByteRange]) -> String {
    let mut header = String::from("bytes=");
    for (i, range) in ranges.iter().enumerate() {
        if i > 0 {
            header.push(',');
        }
        let _ = write!(header, "{range}");
    }
    header
}

#[cfg(test)]
mod tests {
    use super::*;
    use reqwest::header::HeaderValue;

    #[test]
    fn range_header_joins_coalesced_ranges() {
        let ranges = [ByteRange::new(0, 1023), ByteRange::new(2048, 4095)];
        assert_eq!(format_range_header(&ranges), "bytes=0-1023,2048-4095");
    }

    #[test]
    fn strong_etag_is_preferred_over_last_modified() {
        let mut headers = HeaderMap::new();
        headers.insert(ETAG, HeaderValue::from_static("\"abc123\""));
        headers.insert(
            LAST_MODIFIED,
            HeaderValue::from_static("Wed, 21 Oct 2015 07:28:00 GMT"),
        );
        assert_eq!(validator_from_headers(&headers).as_deref(), Some("\"abc123\""));
    }

    #[test]
    fn weak_etag_falls_back_to_last_modified() {
        let mut headers = HeaderMap::new();
        headers.insert(ETAG, HeaderValue::from_static("W/\"abc123\""));
        headers.insert(
            LAST_MODIFIED,
            HeaderValue::from_static("Wed, 21 Oct 2015 07:28:00 GMT"),
        );
        assert_eq!(
            validator_from_headers(&headers).as_deref(),
            Some("Wed, 21 Oct 2015 07:28:00 GMT")
        );
    }

    #[test]
    fn no_validator_yields_none() {
        let headers = HeaderMap::new();
        assert_eq!(validator_from_headers(&headers), None);
    }

    #[test]
    fn content_range_total_parses_the_denominator() {
        let mut headers = HeaderMap::new();
        headers.insert(CONTENT_RANGE, HeaderValue::from_static("bytes 0-0/5120"));
        assert_eq!(content_range_total(&headers), Some(5120));

        headers.insert(CONTENT_RANGE, HeaderValue::from_static("malformed"));
        assert_eq!(content_range_total(&headers), None);
    }
}
