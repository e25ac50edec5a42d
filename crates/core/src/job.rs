//! Job records, submission parameters, and the pure update rules the
//! state store applies on every poll result.

use chrono::Utc;
use serde::{Deserialize, Serialize};

use crate::error::CoreError;
use crate::status::{ExecutionMode, JobPriority, JobStatus};
use crate::types::{JobId, Timestamp};

/// A tracked unit of backend work.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Job {
    /// Opaque identifier assigned by the backend at submission.
    pub id: JobId,
    /// Backend-side handler name, e.g. `"rule_evaluation"`.
    pub job_type: String,
    pub status: JobStatus,
    pub priority: JobPriority,
    /// Completion percentage (0-100), meaningful only while `Running`.
    pub progress: Option<u8>,
    pub created_at: Timestamp,
    pub started_at: Option<Timestamp>,
    pub completed_at: Option<Timestamp>,
    /// Present only when `status == Failed`.
    pub error_message: Option<String>,
    /// Domain-specific result, opaque to this layer.
    pub result_payload: Option<serde_json::Value>,
}

impl Job {
    /// Create a fresh `Pending` record for a newly submitted job.
    pub fn pending(id: impl Into<JobId>, job_type: impl Into<String>, priority: JobPriority) -> Self {
        Self {
            id: id.into(),
            job_type: job_type.into(),
            status: JobStatus::Pending,
            priority,
            progress: None,
            created_at: Utc::now(),
            started_at: None,
            completed_at: None,
            error_message: None,
            result_payload: None,
        }
    }

    /// Apply a status fetch result to this record, enforcing the
    /// lifecycle invariants.
    ///
    /// Rules:
    /// - Terminal records reject every update (`AlreadyTerminal`).
    /// - The `status` edge must be legal per
    ///   [`JobStatus::can_transition_to`].
    /// - `progress` never decreases while `Running`; a lower value in
    ///   the update is ignored, not an error (a lagging read replica
    ///   on the backend must not rewind the bar).
    /// - `started_at` is stamped on the first transition into
    ///   `Running`, `completed_at` on reaching a terminal status.
    pub fn apply_update(&mut self, update: &JobUpdate) -> Result<(), CoreError> {
        if self.status.is_terminal() {
            return Err(CoreError::AlreadyTerminal {
                job_id: self.id.clone(),
                status: self.status,
            });
        }
        if !self.status.can_transition_to(update.status) {
            return Err(CoreError::IllegalTransition {
                from: self.status,
                to: update.status,
            });
        }

        if self.status != JobStatus::Running && update.status == JobStatus::Running {
            self.started_at = Some(Utc::now());
        }

        self.status = update.status;

        if let Some(incoming) = update.progress {
            let current = self.progress.unwrap_or(0);
            self.progress = Some(current.max(incoming.min(100)));
        }

        if update.status.is_terminal() {
            self.completed_at = Some(Utc::now());
        }
        if update.status == JobStatus::Failed {
            self.error_message = update.error_message.clone();
        }
        if let Some(ref payload) = update.result_payload {
            self.result_payload = Some(payload.clone());
        }

        Ok(())
    }
}

/// One status fetch result, as reported by the backend.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct JobUpdate {
    pub status: JobStatus,
    #[serde(default)]
    pub progress: Option<u8>,
    #[serde(default)]
    pub error_message: Option<String>,
    #[serde(default)]
    pub result_payload: Option<serde_json::Value>,
}

impl JobUpdate {
    /// A bare status change with no progress/result data.
    pub fn status(status: JobStatus) -> Self {
        Self {
            status,
            progress: None,
            error_message: None,
            result_payload: None,
        }
    }

    /// A `Running` update with a progress percentage.
    pub fn running(progress: u8) -> Self {
        Self {
            status: JobStatus::Running,
            progress: Some(progress),
            error_message: None,
            result_payload: None,
        }
    }

    /// A `Failed` update carrying the backend error message.
    pub fn failed(message: impl Into<String>) -> Self {
        Self {
            status: JobStatus::Failed,
            progress: None,
            error_message: Some(message.into()),
            result_payload: None,
        }
    }
}

/// Parameters for submitting a new job.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SubmissionParams {
    pub job_type: String,
    pub execution_mode: ExecutionMode,
    #[serde(default)]
    pub priority: JobPriority,
    /// Domain payload, passed through to the backend untouched.
    pub payload: serde_json::Value,
}

impl SubmissionParams {
    pub fn new(
        job_type: impl Into<String>,
        execution_mode: ExecutionMode,
        payload: serde_json::Value,
    ) -> Self {
        Self {
            job_type: job_type.into(),
            execution_mode,
            priority: JobPriority::default(),
            payload,
        }
    }

    pub fn with_priority(mut self, priority: JobPriority) -> Self {
        self.priority = priority;
        self
    }
}

/// Aggregate queue counters for dashboard display.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct QueueStats {
    pub pending_count: u64,
    pub running_count: u64,
    pub completed_count: u64,
    pub failed_count: u64,
    pub avg_processing_time_ms: f64,
}
