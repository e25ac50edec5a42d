//! Job submission.

use std::sync::Arc;
use std::time::Duration;

use sentra_client::{ApiError, JobBackend};
use sentra_core::error::CoreError;
use sentra_core::job::{Job, SubmissionParams};
use sentra_core::status::ExecutionMode;
use sentra_core::types::JobId;
use tokio::sync::watch;

use crate::poller::PollingScheduler;
use crate::store::JobStateStore;

/// Handle to a freshly submitted job.
///
/// Carries the backend-assigned id and a live subscription to the
/// record; additional subscribers can be created later through
/// [`JobStateStore::subscribe`].
pub struct JobHandle {
    pub job_id: JobId,
    pub updates: watch::Receiver<Job>,
}

/// Errors surfaced by [`JobSubmitter::submit`].
#[derive(Debug, thiserror::Error)]
pub enum SubmitError {
    /// The submission request never created a job. No local record
    /// exists either, so there is nothing to reconcile.
    #[error("Submission failed: {0}")]
    Backend(#[from] ApiError),

    /// The backend returned an id that is already registered locally.
    #[error(transparent)]
    Core(#[from] CoreError),
}

/// Creates jobs against the backend and registers them for tracking.
pub struct JobSubmitter {
    backend: Arc<dyn JobBackend>,
    store: Arc<JobStateStore>,
    scheduler: Arc<PollingScheduler>,
    poll_interval: Duration,
}

impl JobSubmitter {
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

    /// Submit a unit of work.
    ///
    /// On success the job is registered `Pending` and polling begins
    /// immediately, except for [`ExecutionMode::Streaming`] jobs whose
    /// progress arrives through the stream coordinator instead of the
    /// status endpoint. Batch submissions resolve to a single job id
    /// and are tracked exactly like asynchronous ones.
    pub async fn submit(&self, params: SubmissionParams) -> Result<JobHandle, SubmitError> {
        let response = self.backend.submit_job(&params).await?;
        let job_id = response.job_id;

        tracing::info!(
            job_id = %job_id,
            job_type = %params.job_type,
            execution_mode = ?params.execution_mode,
            "Job submitted",
        );

        let job = Job::pending(job_id.clone(), params.job_type, params.priority);
        let updates = self.store.insert(job).await?;

        if params.execution_mode != ExecutionMode::Streaming {
            self.scheduler.track(job_id.clone(), self.poll_interval).await;
        }

        Ok(JobHandle { job_id, updates })
    }
}
