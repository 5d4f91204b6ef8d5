//! # FlintKV, an in-memory key-value store with Redis semantics
//!
//! FlintKV speaks a subset of the Redis command set over RESP: opaque
//! string values, per-key TTL expiry, and sorted sets ordered by
//! floating-point score. One process, one storage engine, many concurrent
//! connections on non-blocking I/O.
//!
//! ## Architecture
//!
//! ```text
//! ┌────────────────────────────────────────────────────────────────┐
//! │  TCP listener (main)                                           │
//! │      │ accept                                                  │
//! │      ▼                                                         │
//! │  connection::handle_connection   one task per client           │
//! │      │ parse (protocol)                                        │
//! │      ▼                                                         │
//! │  commands::CommandHandler        verb dispatch + validation    │
//! │      │                                                         │
//! │      ▼                                                         │
//! │  storage::StorageEngine          dictionary · sorted sets ·    │
//! │      ▲                           expiry scheduler              │
//! │      │ purge due keys                                          │
//! │  storage::ExpiryWorker           deadline-driven background    │
//! │                                  task                          │
//! └────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## The storage core
//!
//! - a separate-chaining hash table of tagged entries (string, integer,
//!   or sorted set) with optional absolute expiry;
//! - an order-statistics AVL tree giving sorted sets O(log n) insert,
//!   remove, rank, and range queries;
//! - an indexed min-heap of (key, deadline) pairs that tells the expiry
//!   worker exactly how long to sleep.
//!
//! Keys expire two ways: lazily when a command touches a due key, and
//! actively when the worker wakes at the earliest deadline.
//!
//! ## Quick start
//!
//! ```ignore
//! use flintkv::commands::CommandHandler;
//! use flintkv::connection::{handle_connection, ConnectionStats};
//! use flintkv::storage::{ExpiryWorker, StorageEngine};
//! use std::sync::Arc;
//! use tokio::net::TcpListener;
//!
//! #[tokio::main]
//! async fn main() {
//!     let storage = Arc::new(StorageEngine::new());
//!     let worker = ExpiryWorker::start(Arc::clone(&storage));
//!     let stats = Arc::new(ConnectionStats::new());
//!
//!     let listener = TcpListener::bind("127.0.0.1:6379").await.unwrap();
//!     loop {
//!         let (stream, addr) = listener.accept().await.unwrap();
//!         let commands = CommandHandler::new(Arc::clone(&storage));
//!         tokio::spawn(handle_connection(stream, addr, commands, Arc::clone(&stats)));
//!     }
//! }
//! ```

pub mod commands;
pub mod connection;
pub mod protocol;
pub mod storage;

pub use commands::CommandHandler;
pub use connection::{handle_connection, ConnectionStats};
pub use protocol::{parse_frame, ParseError, RespValue};
pub use storage::{ExpiryWorker, StorageEngine, StoreError};

/// The port the server listens on when none is given (same as Redis).
pub const DEFAULT_PORT: u16 = 6379;

/// Version string baked in at compile time.
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
