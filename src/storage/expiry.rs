//! Background expiry worker.
//!
//! Lazy expiry only reclaims keys that somebody reads again. This task
//! handles the rest: it sleeps until the scheduler's earliest deadline,
//! wakes, and asks the engine to purge whatever is due.
//!
//! The sleep is deadline-driven, not interval-driven: the worker computes
//! its timeout from [`StorageEngine::next_deadline`] and parks forever when
//! nothing is scheduled. Three things can end the wait:
//! - the deadline elapses;
//! - an operation registers an earlier deadline (`SETEX`/`EXPIRE` notify
//!   through the engine's wake channel);
//! - shutdown is requested.

use crate::storage::StorageEngine;
use std::sync::Arc;
use std::time::Instant;
use tokio::sync::watch;
use tokio::task::JoinHandle;
use tracing::{debug, info};

/// Handle to the running expiry worker.
///
/// Shut the worker down with [`ExpiryWorker::shutdown`], which signals the
/// task and waits for it to finish. The engine must outlive the worker,
/// so join before tearing the server down. Dropping the handle without
/// calling `shutdown` still signals the task to stop, it just does not
/// wait for it.
#[derive(Debug)]
pub struct ExpiryWorker {
    shutdown_tx: watch::Sender<bool>,
    handle: Option<JoinHandle<()>>,
}

impl ExpiryWorker {
    /// Spawns the worker on the current tokio runtime.
    pub fn start(engine: Arc<StorageEngine>) -> Self {
        let (shutdown_tx, shutdown_rx) = watch::channel(false);
        let handle = tokio::spawn(worker_loop(engine, shutdown_rx));
        info!("expiry worker started");
        Self {
            shutdown_tx,
            handle: Some(handle),
        }
    }

    /// Signals the worker and waits until its loop has exited.
    pub async fn shutdown(mut self) {
        let _ = self.shutdown_tx.send(true);
        if let Some(handle) = self.handle.take() {
            let _ = handle.await;
        }
        info!("expiry worker stopped");
    }
}

impl Drop for ExpiryWorker {
    fn drop(&mut self) {
        let _ = self.shutdown_tx.send(true);
    }
}

async fn worker_loop(engine: Arc<StorageEngine>, mut shutdown_rx: watch::Receiver<bool>) {
    loop {
        let deadline = engine.next_deadline();
        tokio::select! {
            _ = sleep_until_deadline(deadline) => {}
            _ = engine.deadline_changed() => {}
            changed = shutdown_rx.changed() => {
                if changed.is_err() || *shutdown_rx.borrow() {
                    debug!("expiry worker received shutdown signal");
                    return;
                }
            }
        }

        let purged = engine.purge_expired();
        if purged > 0 {
            debug!(purged, remaining = engine.dbsize(), "purged expired keys");
        }
    }
}

/// Sleeps until the given monotonic deadline; pends forever when there is
/// none, leaving the wake channel and shutdown signal in charge.
async fn sleep_until_deadline(deadline: Option<Instant>) {
    match deadline {
        Some(deadline) => tokio::time::sleep_until(deadline.into()).await,
        None => std::future::pending().await,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use bytes::Bytes;
    use std::time::Duration;

    fn b(s: &str) -> Bytes {
        Bytes::from(s.to_string())
    }

    #[tokio::test]
    async fn purges_keys_nobody_reads() {
        let engine = Arc::new(StorageEngine::new());
        for i in 0..10 {
            engine.setex(
                Bytes::from(format!("key{i}")),
                b("v"),
                Duration::from_millis(20),
            );
        }
        engine.set(b("persistent"), b("v"));
        assert_eq!(engine.dbsize(), 11);

        let worker = ExpiryWorker::start(Arc::clone(&engine));
        tokio::time::sleep(Duration::from_millis(120)).await;

        // no reads happened; the worker alone must have reclaimed these
        assert_eq!(engine.dbsize(), 1);
        assert!(engine.exists(&b("persistent")));
        worker.shutdown().await;
    }

    #[tokio::test]
    async fn wakes_for_a_deadline_registered_while_parked() {
        let engine = Arc::new(StorageEngine::new());
        // start with an empty scheduler: the worker parks with no timeout
        let worker = ExpiryWorker::start(Arc::clone(&engine));
        tokio::time::sleep(Duration::from_millis(20)).await;

        engine.setex(b("late"), b("v"), Duration::from_millis(20));
        tokio::time::sleep(Duration::from_millis(120)).await;

        assert_eq!(engine.dbsize(), 0);
        worker.shutdown().await;
    }

    #[tokio::test]
    async fn expire_command_reschedules_the_worker() {
        let engine = Arc::new(StorageEngine::new());
        let worker = ExpiryWorker::start(Arc::clone(&engine));

        engine.set(b("k"), b("v"));
        assert!(engine.expire(&b("k"), Duration::from_millis(20)));
        tokio::time::sleep(Duration::from_millis(120)).await;

        assert_eq!(engine.dbsize(), 0);
        worker.shutdown().await;
    }

    #[tokio::test]
    async fn shutdown_stops_purging() {
        let engine = Arc::new(StorageEngine::new());
        let worker = ExpiryWorker::start(Arc::clone(&engine));
        worker.shutdown().await;

        engine.setex(b("k"), b("v"), Duration::from_millis(10));
        tokio::time::sleep(Duration::from_millis(80)).await;

        // nothing purged it, so the entry still counts until a lazy read
        assert_eq!(engine.dbsize(), 1);
        assert_eq!(engine.get(&b("k")), Ok(None));
        assert_eq!(engine.dbsize(), 0);
    }
}
