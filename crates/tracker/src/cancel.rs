//! Job cancellation.
//!
//! Cancellation is pessimistic: the remote cancel must succeed before
//! any local state changes. A failed remote call therefore leaves the
//! record and its polling timer exactly as they were, so a job that is
//! still running on the backend keeps being polled.

use std::sync::Arc;

use sentra_client::{ApiError, JobBackend};
use sentra_core::job::JobUpdate;
use sentra_core::status::JobStatus;
use sentra_core::types::JobId;

use crate::poller::PollingScheduler;
use crate::store::JobStateStore;

/// Errors surfaced by [`CancellationController::cancel`].
#[derive(Debug, thiserror::Error)]
pub enum CancelError {
    /// No record exists for the given job id.
    #[error("Job {0} not found")]
    NotFound(JobId),

    /// The job is already terminal; rejected without a network call.
    #[error("Job {job_id} is already {status:?}")]
    AlreadyTerminal { job_id: JobId, status: JobStatus },

    /// The remote cancel request failed. Local state is unchanged.
    #[error("Remote cancel failed: {0}")]
    Backend(#[from] ApiError),
}

/// Requests remote cancellation and halts local tracking.
pub struct CancellationController {
    backend: Arc<dyn JobBackend>,
    store: Arc<JobStateStore>,
    scheduler: Arc<PollingScheduler>,
}

impl CancellationController {
    pub fn new(
        backend: Arc<dyn JobBackend>,
        store: Arc<JobStateStore>,
        scheduler: Arc<PollingScheduler>,
    ) -> Self {
        Self {
            backend,
            store,
            scheduler,
        }
    }

    /// Cancel a pending or running job.
    ///
    /// Order of operations: remote cancel first, then stop the polling
    /// timer, then mark the record `Cancelled`. Only the successful
    /// remote call mutates anything locally.
    pub async fn cancel(&self, job_id: &str) -> Result<(), CancelError> {
        let job = self
            .store
            .get(job_id)
            .await
            .ok_or_else(|| CancelError::NotFound(job_id.to_string()))?;

        if job.status.is_terminal() {
            return Err(CancelError::AlreadyTerminal {
                job_id: job_id.to_string(),
                status: job.status,
            });
        }

        self.backend.cancel_job(job_id).await?;

        self.scheduler.untrack(job_id).await;

        if let Err(e) = self
            .store
            .apply_update(job_id, &JobUpdate::status(JobStatus::Cancelled))
            .await
        {
            // A poll tick may have recorded a terminal status while the
            // cancel was in flight; the record stays as the poller left it.
            tracing::warn!(job_id = %job_id, error = %e, "Cancel raced a terminal update");
        } else {
            tracing::info!(job_id = %job_id, "Job cancelled");
        }

        Ok(())
    }
}
