//! Client connection management.
//!
//! The accept loop in `main` hands each socket to [`handle_connection`],
//! which owns the read buffer, frame parsing, and reply writing for that
//! client. Thousands of connections are just thousands of cheap tokio
//! tasks sharing one storage engine.

pub mod handler;

pub use handler::{handle_connection, ConnectionError, ConnectionHandler, ConnectionStats};
