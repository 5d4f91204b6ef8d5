//! Error types surfaced by the storage engine.
//!
//! Everything here is a client-visible failure: the command layer maps each
//! variant onto a RESP error reply and keeps the connection open. Missing
//! keys are not errors; lookups report absence through their return type
//! (`None`, empty vector, `-2`, ...).

use thiserror::Error;

/// Errors returned by storage-engine operations.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum StoreError {
    /// A command touched a key holding a value of the wrong kind, for
    /// example `ZADD` against a plain string key. The message text matches
    /// the Redis wire error so clients can pattern-match on it.
    #[error("WRONGTYPE Operation against a key holding the wrong kind of value")]
    WrongType,

    /// A sorted-set score was NaN. Scores must be totally ordered, so NaN
    /// is rejected before any index is touched.
    #[error("value is not a valid float")]
    InvalidScore,

    /// A TTL was negative. The engine only works with absolute deadlines;
    /// callers must reject negative durations before reaching it.
    #[error("invalid expire time")]
    InvalidExpiry,

    /// An arithmetic command found a value that does not parse as a signed
    /// 64-bit integer.
    #[error("value is not an integer or out of range")]
    NotAnInteger,

    /// An increment or decrement would overflow `i64`.
    #[error("increment or decrement would overflow")]
    IntegerOverflow,
}
