//! The storage engine and its supporting data structures.
//!
//! ```text
//! ┌──────────────────────────────────────────────────────────────┐
//! │                       StorageEngine                          │
//! │                                                              │
//! │  ┌─────────────────────┐        ┌───────────────────────┐    │
//! │  │  Dict (Mutex)       │        │ ExpiryScheduler       │    │
//! │  │  chained hash table │        │ indexed min-heap      │    │
//! │  │  key → Entry        │        │ key → deadline        │    │
//! │  └──────────┬──────────┘        └───────────▲───────────┘    │
//! │             │ Value::SortedSet              │ peek / drain   │
//! │             ▼                               │                │
//! │  ┌─────────────────────┐        ┌───────────┴───────────┐    │
//! │  │ SortedSet (Mutex)   │        │ ExpiryWorker          │    │
//! │  │ OrderedIndex + map  │        │ (background task)     │    │
//! │  └─────────────────────┘        └───────────────────────┘    │
//! └──────────────────────────────────────────────────────────────┘
//! ```
//!
//! - [`dict`]: separate-chaining hash table holding every entry
//! - [`index`]: order-statistics AVL tree (the sorted set's ordered index)
//! - [`zset`]: dual-indexed sorted set
//! - [`heap`]: indexed min-heap scheduling key expiries
//! - [`engine`]: the engine tying the above together
//! - [`expiry`]: background worker purging due keys

pub mod dict;
pub mod engine;
pub mod error;
pub mod expiry;
pub mod heap;
pub mod index;
pub mod value;
pub mod zset;


// Re-export the types the rest of the crate works with
pub use engine::{StorageEngine, TTL_MISSING, TTL_PERSISTENT};
pub use error::StoreError;
pub use expiry::ExpiryWorker;
pub use value::{Entry, Value};
pub use zset::{ScoreKey, SortedSet, ZAddOutcome};
