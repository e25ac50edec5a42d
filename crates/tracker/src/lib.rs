//! Asynchronous job lifecycle tracking for the Sentra console.
//!
//! This crate is the orchestration core behind every page that submits
//! long-running work (rule evaluation, MCDA analysis, regulatory
//! simulation, inference): submit a job, poll its status, fan updates
//! out to any number of observers, cancel, retry, and keep dashboard
//! queue counters fresh.
//!
//! [`JobTracker`] wires the pieces together and is the entry point for
//! page code; the individual components remain public for direct use.

pub mod cancel;
pub mod config;
pub mod poller;
pub mod retry;
pub mod stats;
pub mod store;
pub mod submitter;

use std::sync::Arc;

use sentra_client::JobBackend;
use sentra_core::job::{Job, QueueStats, SubmissionParams};
use sentra_core::types::JobId;
use sentra_events::{JobEvent, JobEventBus};
use tokio::sync::{broadcast, watch};

pub use cancel::{CancelError, CancellationController};
pub use config::TrackerConfig;
pub use poller::PollingScheduler;
pub use retry::{RetryController, RetryError};
pub use stats::QueueStatsAggregator;
pub use store::JobStateStore;
pub use submitter::{JobHandle, JobSubmitter, SubmitError};

/// One shared tracker per backend connection.
///
/// Owns the state store, the polling scheduler, the controllers, and
/// the queue stats aggregator. Clone the `Arc` into every page that
/// needs job tracking; all observers of one job share a single timer.
pub struct JobTracker {
    store: Arc<JobStateStore>,
    scheduler: Arc<PollingScheduler>,
    submitter: JobSubmitter,
    canceller: CancellationController,
    retrier: RetryController,
    stats: QueueStatsAggregator,
}

impl JobTracker {
    /// Build a tracker over any [`JobBackend`] implementation.
    pub fn new(backend: Arc<dyn JobBackend>, config: &TrackerConfig) -> Arc<Self> {
        let events = Arc::new(JobEventBus::default());
        let store = Arc::new(JobStateStore::new(events));
        let scheduler = PollingScheduler::new(Arc::clone(&backend), Arc::clone(&store));

        let submitter = JobSubmitter::new(
            Arc::clone(&backend),
            Arc::clone(&store),
            Arc::clone(&scheduler),
            config.poll_interval,
        );
        let canceller = CancellationController::new(
            Arc::clone(&backend),
            Arc::clone(&store),
            Arc::clone(&scheduler),
        );
        let retrier = RetryController::new(
            Arc::clone(&backend),
            Arc::clone(&store),
            Arc::clone(&scheduler),
            config.poll_interval,
        );
        let stats = QueueStatsAggregator::start(backend, config.stats_interval);

        Arc::new(Self {
            store,
            scheduler,
            submitter,
            canceller,
            retrier,
            stats,
        })
    }

    /// The shared state store (needed by the stream coordinator).
    pub fn store(&self) -> &Arc<JobStateStore> {
        &self.store
    }

    /// The shared polling scheduler.
    pub fn scheduler(&self) -> &Arc<PollingScheduler> {
        &self.scheduler
    }

    /// Submit a unit of work and begin tracking it.
    pub async fn submit(&self, params: SubmissionParams) -> Result<JobHandle, SubmitError> {
        self.submitter.submit(params).await
    }

    /// Cancel a pending or running job.
    pub async fn cancel(&self, job_id: &str) -> Result<(), CancelError> {
        self.canceller.cancel(job_id).await
    }

    /// Retry a failed job, returning the new job's id.
    pub async fn retry(&self, job_id: &str) -> Result<JobId, RetryError> {
        self.retrier.retry(job_id).await
    }

    /// Latest record for a job.
    pub async fn get(&self, job_id: &str) -> Option<Job> {
        self.store.get(job_id).await
    }

    /// Subscribe to one job's record.
    pub async fn subscribe(&self, job_id: &str) -> Option<watch::Receiver<Job>> {
        self.store.subscribe(job_id).await
    }

    /// Subscribe to all job lifecycle events.
    pub fn events(&self) -> broadcast::Receiver<JobEvent> {
        self.store.events().subscribe()
    }

    /// Most recent queue statistics snapshot.
    pub fn queue_stats(&self) -> Option<QueueStats> {
        self.stats.latest()
    }

    /// Subscribe to queue statistics updates.
    pub fn queue_stats_updates(&self) -> watch::Receiver<Option<QueueStats>> {
        self.stats.subscribe()
    }

    /// Stop all background tasks.
    pub async fn shutdown(&self) {
        self.scheduler.shutdown().await;
        self.stats.shutdown().await;
    }
}
