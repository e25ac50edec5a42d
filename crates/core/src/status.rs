//! Job lifecycle enums and the transition rules between them.
//!
//! The wire representation is SCREAMING_SNAKE_CASE strings, matching
//! what the backend returns from its status endpoints.

use serde::{Deserialize, Serialize};

/// Lifecycle status of a tracked job.
///
/// Legal transitions:
///
/// ```text
/// Pending -> Running | Cancelled
/// Running -> Completed | Failed | Cancelled
/// ```
///
/// `Completed`, `Failed`, and `Cancelled` are terminal. Once a record
/// reaches a terminal status no further transition is legal.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum JobStatus {
    Pending,
    Running,
    Completed,
    Failed,
    Cancelled,
}

impl JobStatus {
    /// Whether this status admits no further transitions.
    pub fn is_terminal(self) -> bool {
        matches!(self, Self::Completed | Self::Failed | Self::Cancelled)
    }

    /// Whether the edge `self -> to` is a legal transition.
    ///
    /// Re-asserting the current status (`self == to`) is allowed so
    /// that repeated polls returning the same status are not errors.
    pub fn can_transition_to(self, to: JobStatus) -> bool {
        if self == to {
            return true;
        }
        match self {
            Self::Pending => matches!(to, Self::Running | Self::Cancelled),
            Self::Running => matches!(to, Self::Completed | Self::Failed | Self::Cancelled),
            Self::Completed | Self::Failed | Self::Cancelled => false,
        }
    }
}

/// How the backend should execute a submitted job.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ExecutionMode {
    /// Immediate execution, caller waits for the result inline.
    Synchronous,
    /// Background execution, caller polls by job id.
    Asynchronous,
    /// Multiple items processed as one batch job.
    Batch,
    /// Incremental token output over a stream session.
    Streaming,
}

/// Scheduling hint passed through to the backend. Does not affect
/// client-side behavior.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum JobPriority {
    Low,
    Medium,
    High,
    Critical,
}

impl Default for JobPriority {
    fn default() -> Self {
        Self::Medium
    }
}
