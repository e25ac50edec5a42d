//! Per-job status polling.
//!
//! [`PollingScheduler`] owns one recurring tokio task per tracked job
//! id. Registration is idempotent, so no matter how many page
//! components ask to track the same job, exactly one timer and one
//! network call per tick exist for it. Each task is driven by a
//! `tokio::select!` over a child [`CancellationToken`] and a
//! [`tokio::time::interval`], and clears itself as soon as the store
//! records a terminal status.

use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

use sentra_client::JobBackend;
use sentra_core::types::JobId;
use tokio::sync::Mutex;
use tokio::time::MissedTickBehavior;
use tokio_util::sync::CancellationToken;

use crate::store::JobStateStore;

/// Internal bookkeeping for a single polled job.
struct TrackedJob {
    /// Per-job cancellation token (child of the master token).
    cancel: CancellationToken,
    handle: tokio::task::JoinHandle<()>,
    interval: Duration,
}

/// Drives status polling for all tracked jobs.
///
/// Created once and shared via `Arc` between the submitter and the
/// controllers.
pub struct PollingScheduler {
    backend: Arc<dyn JobBackend>,
    store: Arc<JobStateStore>,
    tasks: Mutex<HashMap<JobId, TrackedJob>>,
    /// Master cancellation token -- cancelled during shutdown.
    cancel: CancellationToken,
}

impl PollingScheduler {
    pub fn new(backend: Arc<dyn JobBackend>, store: Arc<JobStateStore>) -> Arc<Self> {
        Arc::new(Self {
            backend,
            store,
            tasks: Mutex::new(HashMap::new()),
            cancel: CancellationToken::new(),
        })
    }

    /// Start polling a job at the given interval.
    ///
    /// Idempotent: if the job is already tracked this is a no-op and
    /// the existing timer keeps its interval. The first fetch fires
    /// immediately, so a freshly submitted job is checked without
    /// waiting a full interval.
    pub async fn track(self: &Arc<Self>, job_id: JobId, interval: Duration) {
        let mut tasks = self.tasks.lock().await;
        if tasks.contains_key(&job_id) {
            tracing::debug!(job_id = %job_id, "Job already tracked, ignoring");
            return;
        }

        let cancel = self.cancel.child_token();
        let task_cancel = cancel.clone();
        let scheduler = Arc::clone(self);
        let task_job_id = job_id.clone();

        let handle = tokio::spawn(async move {
            scheduler
                .poll_loop(task_job_id.clone(), interval, task_cancel)
                .await;
            // Terminal status or cancellation: clear our own registration.
            scheduler.tasks.lock().await.remove(&task_job_id);
        });

        tracing::debug!(
            job_id = %job_id,
            poll_interval = ?interval,
            "Polling started",
        );
        tasks.insert(
            job_id,
            TrackedJob {
                cancel,
                handle,
                interval,
            },
        );
    }

    /// Whether a polling timer currently exists for this job.
    pub async fn is_tracking(&self, job_id: &str) -> bool {
        self.tasks.lock().await.contains_key(job_id)
    }

    /// Number of jobs currently polled.
    pub async fn tracked_count(&self) -> usize {
        self.tasks.lock().await.len()
    }

    /// Change the polling interval for an already tracked job.
    ///
    /// Implemented as stop-and-restart of that job's timer, which
    /// preserves the one-timer-per-id invariant. A no-op for untracked
    /// jobs.
    pub async fn set_interval(self: &Arc<Self>, job_id: &str, interval: Duration) {
        {
            let tasks = self.tasks.lock().await;
            match tasks.get(job_id) {
                None => return,
                Some(tracked) if tracked.interval == interval => return,
                Some(_) => {}
            }
        }
        self.untrack(job_id).await;
        self.track(job_id.to_string(), interval).await;
    }

    /// Stop polling a job and wait for its task to exit.
    ///
    /// No further network calls are issued for the job after this
    /// returns. A no-op for untracked jobs.
    pub async fn untrack(&self, job_id: &str) {
        let tracked = self.tasks.lock().await.remove(job_id);
        if let Some(tracked) = tracked {
            tracked.cancel.cancel();
            let _ = tracked.handle.await;
            tracing::debug!(job_id = %job_id, "Polling stopped");
        }
    }

    /// Stop all polling tasks.
    ///
    /// Cancels the master token, then waits up to 5 seconds per task
    /// for a clean exit.
    pub async fn shutdown(&self) {
        tracing::info!("Shutting down polling scheduler");
        self.cancel.cancel();

        // Drain under the lock, then join outside it: each exiting
        // task takes the lock to clear its own registration.
        let drained: Vec<(JobId, TrackedJob)> =
            self.tasks.lock().await.drain().collect();
        for (job_id, tracked) in drained {
            let _ = tokio::time::timeout(Duration::from_secs(5), tracked.handle).await;
            tracing::debug!(job_id = %job_id, "Polling task stopped");
        }
    }

    /// Recurring fetch loop for one job. Runs until the token is
    /// cancelled or the job reaches a terminal status.
    async fn poll_loop(&self, job_id: JobId, interval: Duration, cancel: CancellationToken) {
        let mut ticker = tokio::time::interval(interval);
        // A fetch that overruns the interval delays ticks rather than
        // bursting several fetches back to back.
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

        loop {
            tokio::select! {
                _ = cancel.cancelled() => {
                    tracing::debug!(job_id = %job_id, "Polling cancelled");
                    return;
                }
                _ = ticker.tick() => {
                    if self.poll_once(&job_id).await {
                        return;
                    }
                }
            }
        }
    }

    /// One status fetch. Returns `true` when polling should stop
    /// (terminal status reached, or the record rejected the write as
    /// already terminal).
    async fn poll_once(&self, job_id: &str) -> bool {
        let update = match self.backend.fetch_status(job_id).await {
            Ok(update) => update,
            Err(e) => {
                // Transient: skip this tick, keep the timer running.
                tracing::warn!(
                    job_id = %job_id,
                    error = %e,
                    "Status fetch failed, retrying on next tick",
                );
                return false;
            }
        };

        let terminal = update.status.is_terminal();
        match self.store.apply_update(job_id, &update).await {
            Ok(job) => {
                if terminal {
                    tracing::info!(
                        job_id = %job_id,
                        status = ?job.status,
                        "Job reached terminal status, polling stops",
                    );
                }
                terminal
            }
            Err(sentra_core::error::CoreError::AlreadyTerminal { .. }) => {
                // Another writer (e.g. cancellation) finalized the
                // record while our fetch was in flight.
                true
            }
            Err(e) => {
                tracing::warn!(
                    job_id = %job_id,
                    error = %e,
                    "Rejected status update",
                );
                terminal
            }
        }
    }
}
