//! Tagged values and dictionary entries.
//!
//! Every key maps to exactly one [`Value`] variant; the variant is fixed at
//! creation and never converted implicitly. Commands that need a specific
//! variant check the tag and report `WrongType` on mismatch. The only
//! coercion is [`Value::as_string`], which renders an `Integer` as decimal
//! text when a client asks for the key as a string.

use crate::storage::zset::SortedSet;
use bytes::Bytes;
use std::sync::Arc;
use std::time::Instant;

/// A stored value: opaque bytes, a signed integer, or a sorted set.
///
/// The sorted-set variant holds the owning handle; the dictionary entry is
/// the only durable reference, and engine operations clone the `Arc` just
/// long enough to work on the set without holding the dictionary lock.
#[derive(Debug, Clone)]
pub enum Value {
    /// Opaque byte payload.
    String(Bytes),
    /// Signed 64-bit integer, kept pre-parsed for arithmetic commands.
    Integer(i64),
    /// Handle to a sorted set created by the first `ZADD` on the key.
    SortedSet(Arc<SortedSet>),
}

impl Value {
    /// Renders the value as a byte string, if it has a string form.
    ///
    /// `Integer` is coerced to its decimal representation; a sorted set has
    /// no string form and yields `None` (the caller reports `WrongType`).
    pub fn as_string(&self) -> Option<Bytes> {
        match self {
            Value::String(b) => Some(b.clone()),
            Value::Integer(n) => Some(Bytes::from(n.to_string())),
            Value::SortedSet(_) => None,
        }
    }

    /// Returns the sorted-set handle if this value holds one.
    pub fn as_sorted_set(&self) -> Option<&Arc<SortedSet>> {
        match self {
            Value::SortedSet(set) => Some(set),
            _ => None,
        }
    }

    /// Type tag as reported to clients.
    pub fn type_name(&self) -> &'static str {
        match self {
            Value::String(_) | Value::Integer(_) => "string",
            Value::SortedSet(_) => "zset",
        }
    }
}

/// One record in the keyed dictionary: a value plus an optional absolute
/// expiry instant. `None` means the key never expires.
#[derive(Debug, Clone)]
pub struct Entry {
    pub value: Value,
    pub expires_at: Option<Instant>,
}

impl Entry {
    /// Creates an entry with no expiry.
    pub fn new(value: Value) -> Self {
        Self {
            value,
            expires_at: None,
        }
    }

    /// Creates an entry that expires at the given monotonic instant.
    pub fn with_expiry(value: Value, expires_at: Instant) -> Self {
        Self {
            value,
            expires_at: Some(expires_at),
        }
    }

    /// Whether the entry is due for deletion at `now`.
    #[inline]
    pub fn is_expired_at(&self, now: Instant) -> bool {
        self.expires_at.map_or(false, |deadline| now >= deadline)
    }
}
