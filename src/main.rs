//! FlintKV server binary.
//!
//! Takes one optional positional argument (the TCP port) and serves
//! until interrupted. Ctrl-C stops the accept loop, shuts the expiry
//! worker down cleanly, and exits.

use flintkv::commands::CommandHandler;
use flintkv::connection::{handle_connection, ConnectionStats};
use flintkv::storage::{ExpiryWorker, StorageEngine};
use std::sync::Arc;
use tokio::net::TcpListener;
use tokio::signal;
use tracing::{error, info, warn, Level};
use tracing_subscriber::FmtSubscriber;

/// Resolves the listen port from `argv[1]`, falling back to the default
/// on absence or nonsense.
fn port_from_args() -> u16 {
    let mut args = std::env::args().skip(1);
    match args.next() {
        None => flintkv::DEFAULT_PORT,
        Some(raw) => match raw.parse::<u16>() {
            Ok(port) if port != 0 => port,
            _ => {
                warn!(
                    given = %raw,
                    fallback = flintkv::DEFAULT_PORT,
                    "invalid port argument, using default"
                );
                flintkv::DEFAULT_PORT
            }
        },
    }
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    FmtSubscriber::builder()
        .with_max_level(Level::INFO)
        .with_target(false)
        .init();

    let port = port_from_args();
    let bind_addr = format!("127.0.0.1:{port}");

    let storage = Arc::new(StorageEngine::new());
    let worker = ExpiryWorker::start(Arc::clone(&storage));
    let stats = Arc::new(ConnectionStats::new());

    let listener = TcpListener::bind(&bind_addr).await?;
    info!(version = flintkv::VERSION, addr = %bind_addr, "flintkv listening");

    tokio::select! {
        _ = accept_loop(listener, storage, stats) => {}
        _ = signal::ctrl_c() => {
            info!("shutdown signal received");
        }
    }

    worker.shutdown().await;
    info!("server stopped");
    Ok(())
}

async fn accept_loop(
    listener: TcpListener,
    storage: Arc<StorageEngine>,
    stats: Arc<ConnectionStats>,
) {
    loop {
        match listener.accept().await {
            Ok((stream, addr)) => {
                let commands = CommandHandler::new(Arc::clone(&storage));
                let stats = Arc::clone(&stats);
                tokio::spawn(handle_connection(stream, addr, commands, stats));
            }
            Err(e) => error!(error = %e, "failed to accept connection"),
        }
    }
}
