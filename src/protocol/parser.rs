//! Incremental RESP request parser.
//!
//! The connection loop appends raw socket bytes to a buffer and calls
//! [`parse_frame`] until it stops producing frames. The contract:
//!
//! - `Ok(Some((value, consumed)))`: one complete frame; drop `consumed`
//!   bytes from the front of the buffer and hand `value` to the dispatcher.
//! - `Ok(None)`: the buffer holds a prefix of a frame; read more bytes.
//! - `Err(_)`: the bytes cannot be valid RESP; the connection should drop.
//!
//! Besides the array-of-bulk-strings form every real client sends, bare
//! lines (`SET foo bar\r\n`) parse into the same array shape, which is what
//! netcat-style line-oriented clients produce.

use crate::protocol::types::{RespValue, CRLF};
use bytes::Bytes;
use thiserror::Error;

/// Largest accepted bulk-string payload (512 MB, as in Redis).
pub const MAX_BULK_LEN: usize = 512 * 1024 * 1024;

/// Deepest accepted array nesting; guards the recursive descent.
const MAX_DEPTH: usize = 32;

/// Ways incoming bytes can fail to be RESP.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum ParseError {
    #[error("invalid length prefix")]
    BadLength,

    #[error("bulk string of {0} bytes exceeds the {MAX_BULK_LEN} byte limit")]
    BulkTooLarge(usize),

    #[error("frame is not valid UTF-8 where text was expected")]
    BadUtf8,

    #[error("malformed frame: {0}")]
    Malformed(&'static str),
}

pub type ParseResult<T> = Result<T, ParseError>;

/// Attempts to parse one complete frame from the front of `buf`.
pub fn parse_frame(buf: &[u8]) -> ParseResult<Option<(RespValue, usize)>> {
    parse_value(buf, 0)
}

fn parse_value(buf: &[u8], depth: usize) -> ParseResult<Option<(RespValue, usize)>> {
    if depth > MAX_DEPTH {
        return Err(ParseError::Malformed("array nesting too deep"));
    }
    let Some(&first) = buf.first() else {
        return Ok(None);
    };
    match first {
        b'+' => parse_line(buf, RespValue::Simple),
        b'-' => parse_line(buf, RespValue::Error),
        b':' => parse_integer(buf),
        b'$' => parse_bulk(buf),
        b'*' => parse_array(buf, depth),
        _ => parse_inline(buf),
    }
}

/// `+...\r\n` and `-...\r\n`: a single text line after the marker.
fn parse_line(
    buf: &[u8],
    build: fn(String) -> RespValue,
) -> ParseResult<Option<(RespValue, usize)>> {
    let Some(end) = find_crlf(&buf[1..]) else {
        return Ok(None);
    };
    let text = std::str::from_utf8(&buf[1..1 + end]).map_err(|_| ParseError::BadUtf8)?;
    Ok(Some((build(text.to_string()), 1 + end + 2)))
}

/// `:<n>\r\n`
fn parse_integer(buf: &[u8]) -> ParseResult<Option<(RespValue, usize)>> {
    let Some(end) = find_crlf(&buf[1..]) else {
        return Ok(None);
    };
    let text = std::str::from_utf8(&buf[1..1 + end]).map_err(|_| ParseError::BadUtf8)?;
    let n: i64 = text.parse().map_err(|_| ParseError::BadLength)?;
    Ok(Some((RespValue::Integer(n), 1 + end + 2)))
}

/// `$<len>\r\n<payload>\r\n`, with `$-1\r\n` for nil.
fn parse_bulk(buf: &[u8]) -> ParseResult<Option<(RespValue, usize)>> {
    let Some(len_end) = find_crlf(&buf[1..]) else {
        return Ok(None);
    };
    let len = parse_length(&buf[1..1 + len_end])?;
    let header = 1 + len_end + 2;

    let Some(len) = len else {
        return Ok(Some((RespValue::Null, header)));
    };
    if len > MAX_BULK_LEN {
        return Err(ParseError::BulkTooLarge(len));
    }

    let total = header + len + 2;
    if buf.len() < total {
        return Ok(None);
    }
    if &buf[header + len..total] != CRLF {
        return Err(ParseError::Malformed("bulk string missing trailing CRLF"));
    }
    let payload = Bytes::copy_from_slice(&buf[header..header + len]);
    Ok(Some((RespValue::Bulk(payload), total)))
}

/// `*<count>\r\n` followed by `count` frames, with `*-1\r\n` for nil.
fn parse_array(buf: &[u8], depth: usize) -> ParseResult<Option<(RespValue, usize)>> {
    let Some(count_end) = find_crlf(&buf[1..]) else {
        return Ok(None);
    };
    let count = parse_length(&buf[1..1 + count_end])?;
    let mut consumed = 1 + count_end + 2;

    let Some(count) = count else {
        return Ok(Some((RespValue::Null, consumed)));
    };

    let mut elements = Vec::with_capacity(count.min(64));
    for _ in 0..count {
        match parse_value(&buf[consumed..], depth + 1)? {
            Some((value, used)) => {
                elements.push(value);
                consumed += used;
            }
            None => return Ok(None),
        }
    }
    Ok(Some((RespValue::Array(elements), consumed)))
}

/// A bare command line: whitespace-separated words up to CRLF, normalized
/// into the array-of-bulk-strings shape the dispatcher expects.
fn parse_inline(buf: &[u8]) -> ParseResult<Option<(RespValue, usize)>> {
    let Some(end) = find_crlf(buf) else {
        return Ok(None);
    };
    let line = std::str::from_utf8(&buf[..end]).map_err(|_| ParseError::BadUtf8)?;
    let words: Vec<RespValue> = line
        .split_whitespace()
        .map(|w| RespValue::Bulk(Bytes::copy_from_slice(w.as_bytes())))
        .collect();
    if words.is_empty() {
        return Err(ParseError::Malformed("empty inline command"));
    }
    Ok(Some((RespValue::Array(words), end + 2)))
}

/// Parses a decimal length field; `-1` means nil and maps to `None`.
fn parse_length(field: &[u8]) -> ParseResult<Option<usize>> {
    let text = std::str::from_utf8(field).map_err(|_| ParseError::BadUtf8)?;
    let n: i64 = text.parse().map_err(|_| ParseError::BadLength)?;
    match n {
        -1 => Ok(None),
        n if n < 0 => Err(ParseError::BadLength),
        n => Ok(Some(n as usize)),
    }
}

#[inline]
fn find_crlf(buf: &[u8]) -> Option<usize> {
    buf.windows(2).position(|pair| pair == CRLF)
}
