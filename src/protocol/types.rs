//! RESP values and their wire encoding.
//!
//! Every reply the server produces is one of five shapes: simple string,
//! error, integer, bulk string (with `$-1\r\n` as the nil form), or an
//! array of the above. Requests arrive as arrays of bulk strings, or as
//! bare lines that the parser normalizes into the same array shape.
//!
//! Encoding reference:
//!
//! ```text
//! +OK\r\n                    simple string
//! -ERR message\r\n           error
//! :42\r\n                    integer
//! $5\r\nhello\r\n            bulk string
//! $-1\r\n                    nil
//! *2\r\n$3\r\nGET\r\n$1\r\nk\r\n   array
//! ```

use bytes::{BufMut, Bytes, BytesMut};

pub(crate) const CRLF: &[u8] = b"\r\n";

/// One RESP value, used for both parsed requests and outgoing replies.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RespValue {
    /// Non-binary-safe one-liner, e.g. `+OK`.
    Simple(String),
    /// Error reply; the message's first word is the error class.
    Error(String),
    /// Signed 64-bit integer reply.
    Integer(i64),
    /// Binary-safe payload.
    Bulk(Bytes),
    /// The nil bulk string.
    Null,
    /// Possibly heterogeneous list of values.
    Array(Vec<RespValue>),
}

impl RespValue {
    pub fn ok() -> Self {
        RespValue::Simple("OK".to_string())
    }

    pub fn pong() -> Self {
        RespValue::Simple("PONG".to_string())
    }

    pub fn error(message: impl Into<String>) -> Self {
        RespValue::Error(message.into())
    }

    pub fn integer(n: i64) -> Self {
        RespValue::Integer(n)
    }

    pub fn bulk(data: impl Into<Bytes>) -> Self {
        RespValue::Bulk(data.into())
    }

    pub fn array(values: Vec<RespValue>) -> Self {
        RespValue::Array(values)
    }

    pub fn is_error(&self) -> bool {
        matches!(self, RespValue::Error(_))
    }

    /// Encodes the value into `buf` in RESP wire format.
    pub fn encode(&self, buf: &mut BytesMut) {
        match self {
            RespValue::Simple(s) => {
                buf.put_u8(b'+');
                buf.put_slice(s.as_bytes());
                buf.put_slice(CRLF);
            }
            RespValue::Error(s) => {
                buf.put_u8(b'-');
                buf.put_slice(s.as_bytes());
                buf.put_slice(CRLF);
            }
            RespValue::Integer(n) => {
                buf.put_u8(b':');
                buf.put_slice(n.to_string().as_bytes());
                buf.put_slice(CRLF);
            }
            RespValue::Bulk(data) => {
                buf.put_u8(b'$');
                buf.put_slice(data.len().to_string().as_bytes());
                buf.put_slice(CRLF);
                buf.put_slice(data);
                buf.put_slice(CRLF);
            }
            RespValue::Null => {
                buf.put_slice(b"$-1\r\n");
            }
            RespValue::Array(values) => {
                buf.put_u8(b'*');
                buf.put_slice(values.len().to_string().as_bytes());
                buf.put_slice(CRLF);
                for value in values {
                    value.encode(buf);
                }
            }
        }
    }

    /// Convenience for tests and one-shot callers: encode into a fresh
    /// buffer and freeze it.
    pub fn to_bytes(&self) -> Bytes {
        let mut buf = BytesMut::new();
        self.encode(&mut buf);
        buf.freeze()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn encodes_simple_and_error() {
        assert_eq!(RespValue::ok().to_bytes(), Bytes::from("+OK\r\n"));
        assert_eq!(RespValue::pong().to_bytes(), Bytes::from("+PONG\r\n"));
        assert_eq!(
            RespValue::error("ERR boom").to_bytes(),
            Bytes::from("-ERR boom\r\n")
        );
    }

    #[test]
    fn encodes_integers() {
        assert_eq!(RespValue::integer(1000).to_bytes(), Bytes::from(":1000\r\n"));
        assert_eq!(RespValue::integer(-2).to_bytes(), Bytes::from(":-2\r\n"));
    }

    #[test]
    fn encodes_bulk_and_null() {
        assert_eq!(
            RespValue::bulk(Bytes::from("bar")).to_bytes(),
            Bytes::from("$3\r\nbar\r\n")
        );
        assert_eq!(
            RespValue::bulk(Bytes::new()).to_bytes(),
            Bytes::from("$0\r\n\r\n")
        );
        assert_eq!(RespValue::Null.to_bytes(), Bytes::from("$-1\r\n"));
    }

    #[test]
    fn encodes_arrays_recursively() {
        let reply = RespValue::array(vec![
            RespValue::bulk(Bytes::from("a")),
            RespValue::integer(7),
            RespValue::array(vec![RespValue::Null]),
        ]);
        assert_eq!(
            reply.to_bytes(),
            Bytes::from("*3\r\n$1\r\na\r\n:7\r\n*1\r\n$-1\r\n")
        );
    }

    #[test]
    fn empty_array_encodes_as_star_zero() {
        assert_eq!(
            RespValue::array(Vec::new()).to_bytes(),
            Bytes::from("*0\r\n")
        );
    }
}
