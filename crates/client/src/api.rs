//! REST API client for the job backend HTTP endpoints.

use async_trait::async_trait;
use sentra_core::job::{Job, JobUpdate, QueueStats, SubmissionParams};
use sentra_core::status::JobStatus;
use serde::Deserialize;

use crate::backend::JobBackend;

/// HTTP client for a single job backend.
pub struct JobApi {
    client: reqwest::Client,
    base_url: String,
}

/// Response returned by the submission and retry endpoints after a
/// job has been queued.
#[derive(Debug, Clone, Deserialize)]
pub struct SubmitResponse {
    /// Server-assigned identifier for the new job.
    pub job_id: String,
}

/// Response envelope for the job listing endpoint.
#[derive(Debug, Deserialize)]
struct ListJobsResponse {
    jobs: Vec<Job>,
}

/// Errors from the REST API layer.
#[derive(Debug, thiserror::Error)]
pub enum ApiError {
    /// The HTTP request itself failed (network, DNS, TLS, etc.).
    #[error("HTTP request failed: {0}")]
    Request(#[from] reqwest::Error),

    /// The backend returned a non-2xx status code.
    #[error("Backend API error ({status}): {body}")]
    Api {
        /// HTTP status code.
        status: u16,
        /// Raw response body for debugging.
        body: String,
    },
}

impl JobApi {
    /// Create a new API client.
    ///
    /// * `base_url` - Base HTTP URL, e.g. `http://host:8080`.
    pub fn new(base_url: String) -> Self {
        Self {
            client: reqwest::Client::new(),
            base_url,
        }
    }

    /// Create an API client reusing an existing [`reqwest::Client`]
    /// (useful for connection pooling across several backends).
    pub fn with_client(client: reqwest::Client, base_url: String) -> Self {
        Self { client, base_url }
    }

    // ---- private helpers ----

    /// Ensure the response has a success status code. Returns the
    /// response unchanged on success, or an [`ApiError::Api`]
    /// containing the status and body text on failure.
    async fn ensure_success(response: reqwest::Response) -> Result<reqwest::Response, ApiError> {
        let status = response.status();
        if !status.is_success() {
            let body = response
                .text()
                .await
                .unwrap_or_else(|_| "<unreadable body>".to_string());
            return Err(ApiError::Api {
                status: status.as_u16(),
                body,
            });
        }
        Ok(response)
    }

    /// Parse a successful JSON response body into the expected type.
    async fn parse_response<T: serde::de::DeserializeOwned>(
        response: reqwest::Response,
    ) -> Result<T, ApiError> {
        let response = Self::ensure_success(response).await?;
        Ok(response.json::<T>().await?)
    }

    /// Assert the response has a success status code, discarding the body.
    async fn check_status(response: reqwest::Response) -> Result<(), ApiError> {
        Self::ensure_success(response).await?;
        Ok(())
    }

    /// Wire string for a status filter, e.g. `JobStatus::Running` ->
    /// `"RUNNING"`.
    ///
    /// serde_json::to_value on a unit variant yields its wire string.
    fn status_query_value(status: JobStatus) -> String {
        serde_json::to_value(status)
            .ok()
            .and_then(|v| v.as_str().map(str::to_owned))
            .unwrap_or_default()
    }
}

#[async_trait]
impl JobBackend for JobApi {
    async fn submit_job(&self, params: &SubmissionParams) -> Result<SubmitResponse, ApiError> {
        let response = self
            .client
            .post(format!("{}/api/jobs", self.base_url))
            .json(params)
            .send()
            .await?;

        Self::parse_response(response).await
    }

    async fn fetch_status(&self, job_id: &str) -> Result<JobUpdate, ApiError> {
        let response = self
            .client
            .get(format!("{}/api/jobs/{}", self.base_url, job_id))
            .send()
            .await?;

        Self::parse_response(response).await
    }

    async fn cancel_job(&self, job_id: &str) -> Result<(), ApiError> {
        let response = self
            .client
            .post(format!("{}/api/jobs/{}/cancel", self.base_url, job_id))
            .send()
            .await?;

        Self::check_status(response).await
    }

    async fn retry_job(&self, job_id: &str) -> Result<SubmitResponse, ApiError> {
        let response = self
            .client
            .post(format!("{}/api/jobs/{}/retry", self.base_url, job_id))
            .send()
            .await?;

        Self::parse_response(response).await
    }

    async fn list_jobs(
        &self,
        status: Option<JobStatus>,
        limit: Option<u32>,
    ) -> Result<Vec<Job>, ApiError> {
        let mut request = self.client.get(format!("{}/api/jobs", self.base_url));

        if let Some(status) = status {
            request = request.query(&[("status", Self::status_query_value(status))]);
        }
        if let Some(limit) = limit {
            request = request.query(&[("limit", limit.to_string())]);
        }

        let response = request.send().await?;
        let list: ListJobsResponse = Self::parse_response(response).await?;
        Ok(list.jobs)
    }

    async fn queue_stats(&self) -> Result<QueueStats, ApiError> {
        let response = self
            .client
            .get(format!("{}/api/jobs/queue/stats", self.base_url))
            .send()
            .await?;

        Self::parse_response(response).await
    }
}
