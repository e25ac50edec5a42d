//! Fan-out event bus backed by a `tokio::sync::broadcast` channel.

use sentra_core::status::JobStatus;
use sentra_core::types::JobId;
use serde::{Deserialize, Serialize};
use tokio::sync::broadcast;

/// A job lifecycle event observable by any subscriber.
///
/// The serialized form uses the console's wire message names
/// (`job_progress`, `job_completed`, ...) as the `type` tag, so a
/// page can forward events to its rendering layer unchanged.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum JobEvent {
    /// A new job was registered in the store.
    JobSubmitted { job_id: JobId },

    /// A job's status changed (includes the first `Pending -> Running`).
    JobStatusChanged { job_id: JobId, status: JobStatus },

    /// Progress update during job execution (percentage).
    JobProgress { job_id: JobId, percent: u8 },

    /// Job completed successfully.
    JobCompleted { job_id: JobId },

    /// Job failed with an error.
    JobFailed { job_id: JobId, error: String },

    /// Job was cancelled (by user or system).
    JobCancelled { job_id: JobId },
}

impl JobEvent {
    /// The job this event concerns.
    pub fn job_id(&self) -> &str {
        match self {
            Self::JobSubmitted { job_id }
            | Self::JobStatusChanged { job_id, .. }
            | Self::JobProgress { job_id, .. }
            | Self::JobCompleted { job_id }
            | Self::JobFailed { job_id, .. }
            | Self::JobCancelled { job_id } => job_id,
        }
    }
}

/// Default buffer capacity for the broadcast channel.
const DEFAULT_CAPACITY: usize = 1024;

/// In-process fan-out event bus.
///
/// Wraps a [`broadcast::Sender`] so that any number of subscribers can
/// independently receive every published [`JobEvent`].
pub struct JobEventBus {
    sender: broadcast::Sender<JobEvent>,
}

impl JobEventBus {
    /// Create a bus with a specific channel capacity.
    ///
    /// When the buffer is full, the oldest un-consumed messages are
    /// dropped and slow receivers observe a `RecvError::Lagged`.
    pub fn new(capacity: usize) -> Self {
        let (sender, _) = broadcast::channel(capacity);
        Self { sender }
    }

    /// Publish an event to all current subscribers.
    ///
    /// If there are no active subscribers the event is silently
    /// dropped; the per-job watch channels in the store remain the
    /// source of truth for late joiners.
    pub fn publish(&self, event: JobEvent) {
        // Ignore the SendError; it only means there are zero receivers.
        let _ = self.sender.send(event);
    }

    /// Subscribe to all events published on this bus.
    pub fn subscribe(&self) -> broadcast::Receiver<JobEvent> {
        self.sender.subscribe()
    }
}

impl Default for JobEventBus {
    fn default() -> Self {
        Self::new(DEFAULT_CAPACITY)
    }
}
