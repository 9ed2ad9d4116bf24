//! Splits range response bodies back into the originally requested ranges.
//!
//! Servers answer a multi-range request either with a
//! `multipart/byteranges` body (one part per wire range) or with a single
//! contiguous body. Because adjacent ranges are coalesced before hitting the
//! wire, one part may span several of the originally requested ranges; the
//! splitter walks the body and hands back exactly one buffer per original
//! range, in request order.

use bytes::Bytes;

use super::ByteRange;
use crate::error::{RangeError, Result};

/// Fills the requested ranges from one contiguous body, each range consuming
/// exactly its own length. Trailing bytes beyond the last range are ignored.
pub(crate) fn split_contiguous(body: &Bytes, ranges: &[ByteRange]) -> Result<Vec<Bytes>> {
    let mut out = Vec::with_capacity(ranges.len());
    let mut pos = 0usize;
    for range in ranges {
        let want = range.len() as usize;
        let avail = body.len().saturating_sub(pos);
        if avail < want {
            return Err(RangeError::ShortResponse {
                expected: want as u64,
                got: avail as u64,
            });
        }
        out.push(body.slice(pos..pos + want));
        pos += want;
    }
    Ok(out)
}

/// Walks a `multipart/byteranges` body part by part.
///
/// Each part is a contiguous run covering one or more of the requested
/// ranges (a coalesced wire range produces one part spanning every block it
/// merged). A part that ends in the middle of a range is a transport error,
/// as is a body that runs out of parts before all ranges are filled.
pub(crate) fn split_multipart(
    body: &Bytes,
    boundary: &str,
    ranges: &[ByteRange],
) -> Result<Vec<Bytes>> {
    let delim = format!("--{boundary}");
    let delim = delim.as_bytes();

    let mut out = Vec::with_capacity(ranges.len());
    let mut pos = find(body, delim, 0)
        .ok_or_else(|| RangeError::Transport("multipart body missing boundary".into()))?;

    while out.len() < ranges.len() {
        pos += delim.len();
        if body[pos..].starts_with(b"--") {
            // closing delimiter reached with ranges still unfilled
            break;
        }

        let headers_end = find(body, b"\r\n\r\n", pos)
            .ok_or_else(|| RangeError::Transport("multipart part missing header block".into()))?;
        let data_start = headers_end + 4;
        let next_delim = find(body, delim, data_start)
            .ok_or_else(|| RangeError::Transport("unterminated multipart part".into()))?;
        // the part body ends before the CRLF that precedes the next delimiter
        let data_end = next_delim.saturating_sub(2).max(data_start);
        let part = body.slice(data_start..data_end);

        let mut consumed = 0usize;
        while out.len() < ranges.len() {
            let want = ranges[out.len()].len() as usize;
            let left = part.len() - consumed;
            if left == 0 {
                break;
            }
            if left < want {
                return Err(RangeError::ShortResponse {
                    expected: want as u64,
                    got: left as u64,
                });
            }
            out.push(part.slice(consumed..consumed + want));
            consumed += want;
        }

        pos = next_delim;
    }

    if out.len() < ranges.len() {
        return Err(RangeError::Transport(format!(
            "expected {} content blocks in multipart response, got {}",
            ranges.len(),
            out.len()
        )));
    }
    Ok(out)
}

fn find(haystack: &[u8], needle: &[u8], from: usize) -> Option<usize> {
    if from > haystack.len() {
        return None;
    }
    haystack[from..]
        .windows(needle.len())
        .position(|w| w == needle)
        .map(|p| p + from)
}
