use crate::status::JobStatus;

/// Domain-level errors shared across the workspace crates.
#[derive(Debug, thiserror::Error)]
pub enum CoreError {
    /// No record exists for the given job id.
    #[error("Job {0} not found")]
    JobNotFound(String),

    /// An update would violate the status machine.
    #[error("Illegal status transition: {from:?} -> {to:?}")]
    IllegalTransition { from: JobStatus, to: JobStatus },

    /// A write was attempted against a record in a terminal status.
    #[error("Job {job_id} is already terminal ({status:?})")]
    AlreadyTerminal { job_id: String, status: JobStatus },

    /// Input validation failed with a human-readable message.
    #[error("Validation error: {0}")]
    Validation(String),
}
