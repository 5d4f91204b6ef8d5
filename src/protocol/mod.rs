//! RESP wire protocol: value model, encoder, and incremental parser.
//!
//! Requests normally arrive as arrays of bulk strings; bare command lines
//! are accepted too and normalized to the same shape. Replies are encoded
//! from [`RespValue`] directly into the connection's write buffer.

pub mod parser;
pub mod types;

pub use parser::{parse_frame, ParseError, ParseResult};
pub use types::RespValue;
