//! Command processing layer.
//!
//! Sits between the protocol parser and the storage engine:
//!
//! ```text
//! parsed frame ──> CommandHandler::execute ──> StorageEngine ──> RespValue
//! ```
//!
//! Supported commands:
//!
//! - strings & keys: `SET` (with `EX`/`NX`), `GET`, `DEL`, `EXISTS`,
//!   `SETNX`, `SETEX`, `EXPIRE`, `TTL`, `INCR`, `INCRBY`, `DECR`, `DECRBY`
//! - sorted sets: `ZADD`, `ZREM`, `ZSCORE`, `ZRANGE`, `ZRANGEBYSCORE`,
//!   `ZRANK`, `ZCARD`
//! - server: `PING`, `DBSIZE`, `FLUSHDB`

pub mod handler;

pub use handler::CommandHandler;
