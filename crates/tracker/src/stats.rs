//! Aggregate queue statistics for dashboard display.

use std::sync::Arc;
use std::time::Duration;

use sentra_client::JobBackend;
use sentra_core::job::QueueStats;
use tokio::sync::{watch, Mutex};
use tokio_util::sync::CancellationToken;

/// Polls the queue-stats endpoint on its own interval, independent of
/// any individual job's lifecycle.
///
/// Display-only: a failed fetch is dropped and the stale snapshot
/// retained, never surfaced as an error.
pub struct QueueStatsAggregator {
    latest: watch::Receiver<Option<QueueStats>>,
    cancel: CancellationToken,
    handle: Mutex<Option<tokio::task::JoinHandle<()>>>,
}

impl QueueStatsAggregator {
    /// Spawn the stats polling task.
    pub fn start(backend: Arc<dyn JobBackend>, interval: Duration) -> Self {
        let (tx, rx) = watch::channel(None);
        let cancel = CancellationToken::new();
        let task_cancel = cancel.clone();

        let handle = tokio::spawn(async move {
            let mut ticker = tokio::time::interval(interval);
            loop {
                tokio::select! {
                    _ = task_cancel.cancelled() => return,
                    _ = ticker.tick() => {
                        match backend.queue_stats().await {
                            Ok(stats) => {
                                tx.send_replace(Some(stats));
                            }
                            Err(e) => {
                                // Stale display is fine; just note it.
                                tracing::debug!(error = %e, "Queue stats fetch failed, keeping last snapshot");
                            }
                        }
                    }
                }
            }
        });

        Self {
            latest: rx,
            cancel,
            handle: Mutex::new(Some(handle)),
        }
    }

    /// Most recent snapshot, or `None` before the first successful fetch.
    pub fn latest(&self) -> Option<QueueStats> {
        *self.latest.borrow()
    }

    /// Subscribe to snapshot updates.
    pub fn subscribe(&self) -> watch::Receiver<Option<QueueStats>> {
        self.latest.clone()
    }

    /// Stop the polling task. Idempotent.
    pub async fn shutdown(&self) {
        self.cancel.cancel();
        if let Some(handle) = self.handle.lock().await.take() {
            let _ = tokio::time::timeout(Duration::from_secs(5), handle).await;
        }
    }
}
