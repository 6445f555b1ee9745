// Background TTL sweep for the response cache
// Author: kelexine (https://github.com/kelexine)
//
// Lazy expiry in get/has keeps reads correct; the sweep bounds memory held by
// entries that are never read again. Each pass holds the cache lock for the
// whole scan, which is bounded by `max_entries`.

use crate::cache::ResponseCache;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::watch;
use tokio::task::JoinHandle;
use tracing::{debug, warn};

/// Owner of a running sweep task. Dropping it aborts the task.
pub struct SweeperHandle {
    shutdown_tx: watch::Sender<bool>,
    task: Option<JoinHandle<()>>,
}

impl SweeperHandle {
    /// Signal the task to stop and wait for it to exit.
    pub async fn shutdown(mut self) {
        let _ = self.shutdown_tx.send(true);
        if let Some(task) = self.task.take() {
            if let Err(e) = task.await {
                warn!("Cache sweeper ended abnormally: {}", e);
            }
        }
    }

    pub fn is_running(&self) -> bool {
        self.task.as_ref().is_some_and(|t| !t.is_finished())
    }
}

impl Drop for SweeperHandle {
    fn drop(&mut self) {
        if let Some(task) = self.task.take() {
            task.abort();
        }
    }
}

/// Start a task that calls `sweep_expired` every `interval`.
///
/// Must be called from within a tokio runtime.
pub fn spawn_sweeper(cache: Arc<ResponseCache>, interval: Duration) -> SweeperHandle {
    let (shutdown_tx, mut shutdown_rx) = watch::channel(false);

    let task = tokio::spawn(async move {
        let mut ticker = tokio::time::interval(interval);
        ticker.tick().await; // skip first immediate tick

        loop {
            tokio::select! {
                _ = ticker.tick() => {
                    let removed = cache.sweep_expired();
                    if removed > 0 {
                        debug!("Periodic sweep expired {} entries", removed);
                    }
                }
                changed = shutdown_rx.changed() => {
                    if changed.is_err() || *shutdown_rx.borrow() {
                        debug!("Cache sweeper stopping");
                        break;
                    }
                }
            }
        }
    });

    SweeperHandle {
        shutdown_tx,
        task: Some(task),
    }
}
