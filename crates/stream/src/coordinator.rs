//! Single-session stream orchestration.
//!
//! [`StreamCoordinator`] owns at most one live inference session. A
//! pump task reads WebSocket frames, applies them to the session
//! state, fans [`StreamEvent`]s out via a broadcast channel, and on
//! any exit path (natural completion, mid-stream error, local abort)
//! finalizes the session into the shared [`JobStateStore`] as a
//! terminal record.

use std::sync::Arc;
use std::time::Duration;

use chrono::Utc;
use futures::{SinkExt, StreamExt};
use sentra_core::job::{Job, JobUpdate};
use sentra_core::status::{JobPriority, JobStatus};
use sentra_core::types::JobId;
use sentra_tracker::JobStateStore;
use tokio::sync::{broadcast, Mutex};
use tokio_tungstenite::tungstenite::Message;
use tokio_util::sync::CancellationToken;

use crate::client::{StreamClient, StreamConnection};
use crate::messages::{parse_message, stop_frame, ErrorData, StreamMessage};
use crate::session::{SessionPhase, StreamEvent, StreamSession};

/// Broadcast channel capacity for stream events.
const EVENT_CHANNEL_CAPACITY: usize = 256;

/// Job type recorded for sessions finalized without a pre-registered job.
const STREAM_JOB_TYPE: &str = "llm_inference";

/// Parameters for starting a stream session.
#[derive(Debug, Clone)]
pub struct StreamParams {
    /// Job id to finalize into. For streaming submissions this is the
    /// id the submitter registered; when absent a synthetic record is
    /// created at finalization.
    pub job_id: Option<JobId>,
    /// Model the backend should run.
    pub model_id: String,
}

/// Errors surfaced by [`StreamCoordinator::start`].
#[derive(Debug, thiserror::Error)]
pub enum StreamError {
    /// Failed to establish the WebSocket connection; no session exists.
    #[error("Connection error: {0}")]
    Connection(String),
}

/// Handle to a running session. Dropping it does not stop the stream.
pub struct StreamController {
    session_id: String,
    cancel: CancellationToken,
}

impl StreamController {
    /// Id of the session this controller addresses.
    pub fn session_id(&self) -> &str {
        &self.session_id
    }

    /// Request a cooperative abort.
    ///
    /// Sets the session's abort flag, sends a best-effort stop frame
    /// to the backend, and discards any chunks that trail in. The
    /// transport is not forcibly terminated.
    pub fn stop(&self) {
        self.cancel.cancel();
    }
}

/// Internal bookkeeping for the live session.
struct ActiveStream {
    session_id: String,
    cancel: CancellationToken,
    handle: tokio::task::JoinHandle<()>,
}

/// Orchestrates one inference stream at a time.
pub struct StreamCoordinator {
    client: StreamClient,
    store: Arc<JobStateStore>,
    event_tx: broadcast::Sender<StreamEvent>,
    active: Mutex<Option<ActiveStream>>,
}

impl StreamCoordinator {
    pub fn new(client: StreamClient, store: Arc<JobStateStore>) -> Self {
        let (event_tx, _) = broadcast::channel(EVENT_CHANNEL_CAPACITY);
        Self {
            client,
            store,
            event_tx,
            active: Mutex::new(None),
        }
    }

    /// Subscribe to events from the current and future sessions.
    pub fn subscribe(&self) -> broadcast::Receiver<StreamEvent> {
        self.event_tx.subscribe()
    }

    /// Start a new stream session.
    ///
    /// A coordinator tracks at most one session: if one is still
    /// active it is aborted and drained first, so tokens from two
    /// sessions can never interleave into one buffer.
    pub async fn start(&self, params: StreamParams) -> Result<StreamController, StreamError> {
        // Holding the slot lock across connect serializes concurrent starts.
        let mut active = self.active.lock().await;
        if let Some(prev) = active.take() {
            tracing::info!(
                session_id = %prev.session_id,
                "Aborting previous session before starting a new one",
            );
            prev.cancel.cancel();
            let _ = tokio::time::timeout(Duration::from_secs(5), prev.handle).await;
        }

        let session = StreamSession::new(params.model_id);
        let session_id = session.session_id.clone();

        let conn = self
            .client
            .connect(&session_id)
            .await
            .map_err(|e| StreamError::Connection(e.to_string()))?;

        let job_id = params
            .job_id
            .unwrap_or_else(|| format!("stream-{session_id}"));

        // A pre-registered streaming job moves to Running now; its
        // terminal status arrives at finalization.
        if self.store.get(&job_id).await.is_some() {
            if let Err(e) = self
                .store
                .apply_update(&job_id, &JobUpdate::status(JobStatus::Running))
                .await
            {
                tracing::warn!(job_id = %job_id, error = %e, "Could not mark streaming job running");
            }
        }

        let cancel = CancellationToken::new();
        let pump_cancel = cancel.clone();
        let store = Arc::clone(&self.store);
        let event_tx = self.event_tx.clone();

        let handle = tokio::spawn(async move {
            pump(conn, session, job_id, store, event_tx, pump_cancel).await;
        });

        *active = Some(ActiveStream {
            session_id: session_id.clone(),
            cancel: cancel.clone(),
            handle,
        });

        Ok(StreamController { session_id, cancel })
    }

    /// Abort the active session, if any, and wait for it to drain.
    pub async fn abort(&self) {
        let prev = self.active.lock().await.take();
        if let Some(prev) = prev {
            prev.cancel.cancel();
            let _ = tokio::time::timeout(Duration::from_secs(5), prev.handle).await;
        }
    }

    /// Whether a session is currently streaming.
    pub async fn is_streaming(&self) -> bool {
        self.active
            .lock()
            .await
            .as_ref()
            .map(|a| !a.handle.is_finished())
            .unwrap_or(false)
    }
}

/// Read frames until the session reaches a terminal phase or an abort
/// is requested, then finalize into the store.
async fn pump(
    conn: StreamConnection,
    mut session: StreamSession,
    job_id: JobId,
    store: Arc<JobStateStore>,
    event_tx: broadcast::Sender<StreamEvent>,
    cancel: CancellationToken,
) {
    let mut ws_stream = conn.ws_stream;

    loop {
        tokio::select! {
            _ = cancel.cancelled() => {
                if let Some(event) = session.abort() {
                    let _ = event_tx.send(event);
                }
                // Best-effort stop signal; the transport may already be gone.
                let frame = stop_frame(&session.session_id);
                if let Err(e) = ws_stream.send(Message::Text(frame.into())).await {
                    tracing::debug!(
                        session_id = %session.session_id,
                        error = %e,
                        "Could not deliver stop frame",
                    );
                }
                break;
            }
            frame = ws_stream.next() => {
                match frame {
                    Some(Ok(Message::Text(text))) => {
                        handle_text_frame(&text, &mut session, &event_tx);
                        if session.phase != SessionPhase::Streaming {
                            break;
                        }
                    }
                    Some(Ok(Message::Ping(_) | Message::Pong(_))) => {
                        // Handled automatically by tungstenite.
                    }
                    Some(Ok(Message::Binary(_))) => {
                        tracing::trace!(
                            session_id = %session.session_id,
                            "Ignoring binary frame",
                        );
                    }
                    Some(Ok(Message::Close(_))) | None => {
                        if session.phase == SessionPhase::Streaming {
                            fail_session(
                                &mut session,
                                &event_tx,
                                "connection closed before completion".to_string(),
                            );
                        }
                        break;
                    }
                    Some(Ok(Message::Frame(_))) => {}
                    Some(Err(e)) => {
                        fail_session(&mut session, &event_tx, format!("WebSocket receive error: {e}"));
                        break;
                    }
                }
            }
        }
    }

    finalize(&store, &job_id, &session).await;
}

/// Parse and apply one text frame, fanning out the resulting event.
fn handle_text_frame(
    text: &str,
    session: &mut StreamSession,
    event_tx: &broadcast::Sender<StreamEvent>,
) {
    match parse_message(text) {
        Ok(msg) => {
            if let Some(event) = session.apply(msg) {
                let _ = event_tx.send(event);
            }
        }
        Err(e) => {
            tracing::warn!(
                session_id = %session.session_id,
                error = %e,
                raw_message = %text,
                "Failed to parse stream message",
            );
        }
    }
}

/// Mark the session errored locally and fan out the event.
fn fail_session(
    session: &mut StreamSession,
    event_tx: &broadcast::Sender<StreamEvent>,
    message: String,
) {
    tracing::error!(session_id = %session.session_id, error = %message, "Stream failed");
    if let Some(event) = session.apply(StreamMessage::Error(ErrorData { message })) {
        let _ = event_tx.send(event);
    }
}

/// Write the session's outcome into the job state store.
///
/// Updates the pre-registered record when one exists, otherwise
/// inserts a synthetic terminal record, so the accumulated content is
/// queryable either way.
async fn finalize(store: &JobStateStore, job_id: &str, session: &StreamSession) {
    let status = match session.phase {
        SessionPhase::Completed => JobStatus::Completed,
        SessionPhase::Aborted => JobStatus::Cancelled,
        SessionPhase::Errored => JobStatus::Failed,
        SessionPhase::Streaming => {
            // Connection ended without complete/error/abort.
            JobStatus::Failed
        }
    };

    let error_message = match session.phase {
        SessionPhase::Errored => session.error.clone(),
        SessionPhase::Streaming => Some("stream ended before completion".to_string()),
        _ => None,
    };

    let result_payload = Some(serde_json::json!({
        "model_id": session.model_id,
        "content": session.accumulated_content,
        "token_count": session.token_count,
    }));

    let update = JobUpdate {
        status,
        progress: None,
        error_message: error_message.clone(),
        result_payload: result_payload.clone(),
    };

    if store.get(job_id).await.is_some() {
        if let Err(e) = store.apply_update(job_id, &update).await {
            tracing::warn!(job_id = %job_id, error = %e, "Could not finalize streaming job");
        }
    } else {
        let now = Utc::now();
        let job = Job {
            id: job_id.to_string(),
            job_type: STREAM_JOB_TYPE.to_string(),
            status,
            priority: JobPriority::default(),
            progress: None,
            created_at: session.started_at,
            started_at: Some(session.started_at),
            completed_at: Some(now),
            error_message,
            result_payload,
        };
        if let Err(e) = store.insert(job).await {
            tracing::warn!(job_id = %job_id, error = %e, "Could not record finalized session");
        }
    }

    tracing::info!(
        job_id = %job_id,
        session_id = %session.session_id,
        status = ?status,
        token_count = session.token_count,
        "Stream session finalized",
    );
}
