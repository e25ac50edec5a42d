//! Failed-job retry.

use std::sync::Arc;
use std::time::Duration;

use sentra_client::{ApiError, JobBackend};
use sentra_core::error::CoreError;
use sentra_core::job::Job;
use sentra_core::status::JobStatus;
use sentra_core::types::JobId;

use crate::poller::PollingScheduler;
use crate::store::JobStateStore;

/// Errors surfaced by [`RetryController::retry`].
#[derive(Debug, thiserror::Error)]
pub enum RetryError {
    /// No record exists for the given job id.
    #[error("Job {0} not found")]
    NotFound(JobId),

    /// Only failed jobs can be retried.
    #[error("Job {job_id} is {status:?}, only FAILED jobs can be retried")]
    NotFailed { job_id: JobId, status: JobStatus },

    /// The retry request failed; no new job was created.
    #[error("Retry request failed: {0}")]
    Backend(#[from] ApiError),

    /// The new job id collided with an existing local record.
    #[error(transparent)]
    Core(#[from] CoreError),
}

/// Resubmits a failed job's parameters as a new job.
///
/// The backend keeps the original submission parameters, so the retry
/// endpoint is a resubmission by reference: it returns a fresh id and
/// leaves the original `Failed` record untouched and queryable.
/// Deliberately not idempotent: two retries produce two new jobs.
pub struct RetryController {
    backend: Arc<dyn JobBackend>,
    store: Arc<JobStateStore>,
    scheduler: Arc<PollingScheduler>,
    poll_interval: Duration,
}

impl RetryController {
    pub fn new(
        backend: Arc<dyn JobBackend>,
        store: Arc<JobStateStore>,
        scheduler: Arc<PollingScheduler>,
        poll_interval: Duration,
    ) -> Self {
        Self {
            backend,
            store,
            scheduler,
            poll_interval,
        }
    }

    /// Retry a failed job, returning the new job's id.
    ///
    /// The new job is registered `Pending` and polled like any other
    /// submission.
    pub async fn retry(&self, job_id: &str) -> Result<JobId, RetryError> {
        let original = self
            .store
            .get(job_id)
            .await
            .ok_or_else(|| RetryError::NotFound(job_id.to_string()))?;

        if original.status != JobStatus::Failed {
            return Err(RetryError::NotFailed {
                job_id: job_id.to_string(),
                status: original.status,
            });
        }

        let response = self.backend.retry_job(job_id).await?;
        let new_id = response.job_id;

        tracing::info!(
            original_job_id = %job_id,
            new_job_id = %new_id,
            "Failed job resubmitted",
        );

        let job = Job::pending(new_id.clone(), original.job_type, original.priority);
        self.store.insert(job).await?;
        self.scheduler.track(new_id.clone(), self.poll_interval).await;

        Ok(new_id)
    }
}
