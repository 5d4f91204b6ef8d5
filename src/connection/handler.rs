//! Per-client connection handling.
//!
//! Each accepted socket gets its own task running a read → parse →
//! execute → respond loop. TCP gives no message boundaries, so incoming
//! bytes accumulate in a `BytesMut` buffer and the parser is run until it
//! stops producing complete frames. The same loop handles pipelining: ten
//! commands in one segment produce ten replies before the next read.
//!
//! Command errors are replies, not connection errors; only I/O failures,
//! protocol violations, and an oversized buffer end the loop.

use crate::commands::CommandHandler;
use crate::protocol::{parse_frame, ParseError, RespValue};
use bytes::BytesMut;
use std::net::SocketAddr;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use tokio::io::{AsyncReadExt, AsyncWriteExt, BufWriter};
use tokio::net::TcpStream;
use tracing::{debug, info, trace, warn};

/// A client that streams more than this without completing a frame is cut
/// off rather than allowed to grow the buffer unboundedly.
const MAX_BUFFER_SIZE: usize = 64 * 1024;

const INITIAL_BUFFER_SIZE: usize = 4096;

/// Counters shared by every connection task.
#[derive(Debug, Default)]
pub struct ConnectionStats {
    pub connections_accepted: AtomicU64,
    pub active_connections: AtomicU64,
    pub commands_processed: AtomicU64,
}

impl ConnectionStats {
    pub fn new() -> Self {
        Self::default()
    }

    fn opened(&self) {
        self.connections_accepted.fetch_add(1, Ordering::Relaxed);
        self.active_connections.fetch_add(1, Ordering::Relaxed);
    }

    fn closed(&self) {
        self.active_connections.fetch_sub(1, Ordering::Relaxed);
    }

    fn command_done(&self) {
        self.commands_processed.fetch_add(1, Ordering::Relaxed);
    }
}

/// Ways a connection ends.
#[derive(Debug, thiserror::Error)]
pub enum ConnectionError {
    #[error("i/o error: {0}")]
    Io(#[from] std::io::Error),

    #[error("protocol error: {0}")]
    Protocol(#[from] ParseError),

    #[error("client disconnected")]
    Disconnected,

    #[error("client closed mid-frame")]
    TruncatedFrame,

    #[error("read buffer limit exceeded")]
    BufferFull,
}

/// State for one client connection.
pub struct ConnectionHandler {
    stream: BufWriter<TcpStream>,
    addr: SocketAddr,
    read_buf: BytesMut,
    write_buf: BytesMut,
    commands: CommandHandler,
    stats: Arc<ConnectionStats>,
}

impl ConnectionHandler {
    pub fn new(
        stream: TcpStream,
        addr: SocketAddr,
        commands: CommandHandler,
        stats: Arc<ConnectionStats>,
    ) -> Self {
        stats.opened();
        Self {
            stream: BufWriter::new(stream),
            addr,
            read_buf: BytesMut::with_capacity(INITIAL_BUFFER_SIZE),
            write_buf: BytesMut::with_capacity(INITIAL_BUFFER_SIZE),
            commands,
            stats,
        }
    }

    /// Runs the connection to completion.
    pub async fn run(mut self) -> Result<(), ConnectionError> {
        info!(client = %self.addr, "client connected");
        let result = self.serve().await;

        match &result {
            Ok(()) | Err(ConnectionError::Disconnected) => {
                debug!(client = %self.addr, "client disconnected");
            }
            Err(ConnectionError::Io(e)) if e.kind() == std::io::ErrorKind::ConnectionReset => {
                debug!(client = %self.addr, "connection reset by client");
            }
            Err(e) => warn!(client = %self.addr, error = %e, "connection error"),
        }

        self.stats.closed();
        result
    }

    async fn serve(&mut self) -> Result<(), ConnectionError> {
        loop {
            // drain every complete frame already buffered
            while let Some(request) = self.next_frame()? {
                let reply = self.commands.execute(request);
                self.stats.command_done();
                reply.encode(&mut self.write_buf);
            }
            if !self.write_buf.is_empty() {
                self.stream.write_all(&self.write_buf).await?;
                self.stream.flush().await?;
                self.write_buf.clear();
            }

            self.fill_read_buf().await?;
        }
    }

    fn next_frame(&mut self) -> Result<Option<RespValue>, ConnectionError> {
        if self.read_buf.is_empty() {
            return Ok(None);
        }
        match parse_frame(&self.read_buf)? {
            Some((request, consumed)) => {
                let _ = self.read_buf.split_to(consumed);
                trace!(client = %self.addr, consumed, "parsed frame");
                Ok(Some(request))
            }
            None => Ok(None),
        }
    }

    async fn fill_read_buf(&mut self) -> Result<(), ConnectionError> {
        if self.read_buf.len() >= MAX_BUFFER_SIZE {
            warn!(client = %self.addr, size = self.read_buf.len(), "read buffer limit exceeded");
            return Err(ConnectionError::BufferFull);
        }

        let n = self.stream.get_mut().read_buf(&mut self.read_buf).await?;
        if n == 0 {
            return if self.read_buf.is_empty() {
                Err(ConnectionError::Disconnected)
            } else {
                Err(ConnectionError::TruncatedFrame)
            };
        }
        trace!(client = %self.addr, bytes = n, "read");
        Ok(())
    }
}

/// Creates a handler for the socket and runs it, logging unexpected ends.
pub async fn handle_connection(
    stream: TcpStream,
    addr: SocketAddr,
    commands: CommandHandler,
    stats: Arc<ConnectionStats>,
) {
    let handler = ConnectionHandler::new(stream, addr, commands, stats);
    if let Err(e) = handler.run().await {
        match e {
            ConnectionError::Disconnected => {}
            ConnectionError::Io(ref io) if io.kind() == std::io::ErrorKind::ConnectionReset => {}
            _ => debug!(client = %addr, error = %e, "connection ended with error"),
        }
    }
}
