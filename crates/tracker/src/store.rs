//! In-memory job state registry with per-job fan-out.
//!
//! [`JobStateStore`] is the single owner of all [`Job`] records. Each
//! record lives inside a [`tokio::sync::watch`] channel so any number
//! of page components can subscribe to one job independently, and late
//! subscribers immediately observe the latest record. All writes go
//! through [`JobStateStore::apply_update`], which enforces the status
//! machine (legal edges, terminal immutability, monotonic progress).

use std::collections::HashMap;
use std::sync::Arc;

use sentra_core::error::CoreError;
use sentra_core::job::{Job, JobUpdate};
use sentra_core::status::JobStatus;
use sentra_core::types::JobId;
use sentra_events::{JobEvent, JobEventBus};
use tokio::sync::{watch, RwLock};

/// Registry mapping job id to its current record.
///
/// Shared via `Arc<JobStateStore>` between the polling scheduler, the
/// stream coordinator, the controllers, and subscribers.
pub struct JobStateStore {
    jobs: RwLock<HashMap<JobId, watch::Sender<Job>>>,
    events: Arc<JobEventBus>,
}

impl JobStateStore {
    pub fn new(events: Arc<JobEventBus>) -> Self {
        Self {
            jobs: RwLock::new(HashMap::new()),
            events,
        }
    }

    /// The event bus this store publishes to.
    pub fn events(&self) -> &Arc<JobEventBus> {
        &self.events
    }

    /// Register a new record, returning a subscription to it.
    ///
    /// Rejects duplicate ids: one record per job, no matter how many
    /// observers later subscribe. The record may already be terminal
    /// (stream sessions finalize directly into a terminal record).
    pub async fn insert(&self, job: Job) -> Result<watch::Receiver<Job>, CoreError> {
        let mut jobs = self.jobs.write().await;
        if jobs.contains_key(&job.id) {
            return Err(CoreError::Validation(format!(
                "Job {} is already registered",
                job.id
            )));
        }

        let job_id = job.id.clone();
        let status = job.status;
        let error_message = job.error_message.clone();
        let (tx, rx) = watch::channel(job);
        jobs.insert(job_id.clone(), tx);
        drop(jobs);

        self.events.publish(JobEvent::JobSubmitted {
            job_id: job_id.clone(),
        });
        // Stream sessions finalize straight into a terminal record;
        // announce that. A plain Pending insert needs no status event.
        if status != JobStatus::Pending {
            self.publish_status_event(&job_id, status, error_message.as_deref());
        }

        Ok(rx)
    }

    /// Latest record for a job, if registered.
    pub async fn get(&self, job_id: &str) -> Option<Job> {
        self.jobs
            .read()
            .await
            .get(job_id)
            .map(|tx| tx.borrow().clone())
    }

    /// Subscribe to a job's record. The receiver immediately holds the
    /// latest value and observes every subsequent accepted write.
    pub async fn subscribe(&self, job_id: &str) -> Option<watch::Receiver<Job>> {
        self.jobs.read().await.get(job_id).map(|tx| tx.subscribe())
    }

    /// Ids of all registered jobs.
    pub async fn job_ids(&self) -> Vec<JobId> {
        self.jobs.read().await.keys().cloned().collect()
    }

    /// Apply a status fetch result to a record.
    ///
    /// Returns the updated record on success. The write is rejected
    /// (and no subscriber notified) if the job is unknown, already
    /// terminal, or the transition is illegal.
    ///
    /// Holds the map's write lock for the duration of the mutation so
    /// that a poll tick and a cancellation confirmation cannot
    /// interleave on the same record.
    pub async fn apply_update(&self, job_id: &str, update: &JobUpdate) -> Result<Job, CoreError> {
        let jobs = self.jobs.write().await;
        let tx = jobs
            .get(job_id)
            .ok_or_else(|| CoreError::JobNotFound(job_id.to_string()))?;

        let mut job = tx.borrow().clone();
        let previous_status = job.status;
        job.apply_update(update)?;
        let updated = job.clone();
        tx.send_replace(job);
        drop(jobs);

        if updated.status != previous_status {
            self.publish_status_event(job_id, updated.status, updated.error_message.as_deref());
        }
        if updated.status == JobStatus::Running {
            if let Some(percent) = updated.progress {
                self.events.publish(JobEvent::JobProgress {
                    job_id: job_id.to_string(),
                    percent,
                });
            }
        }

        Ok(updated)
    }

    fn publish_status_event(&self, job_id: &str, status: JobStatus, error: Option<&str>) {
        let job_id = job_id.to_string();
        match status {
            JobStatus::Completed => self.events.publish(JobEvent::JobCompleted { job_id }),
            JobStatus::Failed => self.events.publish(JobEvent::JobFailed {
                job_id,
                error: error.unwrap_or("unknown error").to_string(),
            }),
            JobStatus::Cancelled => self.events.publish(JobEvent::JobCancelled { job_id }),
            JobStatus::Pending | JobStatus::Running => {
                self.events.publish(JobEvent::JobStatusChanged { job_id, status })
            }
        }
    }
}
