//! Trait seam between the tracker and the HTTP transport.

use async_trait::async_trait;
use sentra_core::job::{Job, JobUpdate, QueueStats, SubmissionParams};
use sentra_core::status::JobStatus;

use crate::api::{ApiError, SubmitResponse};

/// Operations the job backend exposes to this client layer.
///
/// [`crate::api::JobApi`] is the production implementation. Tests in
/// the tracker crate implement this trait with scripted responses.
#[async_trait]
pub trait JobBackend: Send + Sync {
    /// Create a new job. On transport failure no job exists anywhere.
    async fn submit_job(&self, params: &SubmissionParams) -> Result<SubmitResponse, ApiError>;

    /// Fetch the current status of a job.
    async fn fetch_status(&self, job_id: &str) -> Result<JobUpdate, ApiError>;

    /// Request cancellation of a pending or running job.
    async fn cancel_job(&self, job_id: &str) -> Result<(), ApiError>;

    /// Resubmit a failed job's parameters as a new job, returning the
    /// new id. The original job is untouched server-side.
    async fn retry_job(&self, job_id: &str) -> Result<SubmitResponse, ApiError>;

    /// List jobs, optionally filtered by status and capped at `limit`.
    async fn list_jobs(
        &self,
        status: Option<JobStatus>,
        limit: Option<u32>,
    ) -> Result<Vec<Job>, ApiError>;

    /// Fetch aggregate queue counters.
    async fn queue_stats(&self) -> Result<QueueStats, ApiError>;
}
