//! Per-session accumulation state and the rules for applying incoming
//! messages to it.

use chrono::Utc;
use sentra_core::types::Timestamp;

use crate::messages::StreamMessage;

/// Where a session is in its lifecycle.
///
/// `Streaming -> {Completed, Aborted, Errored}`; the three right-hand
/// phases are terminal.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionPhase {
    Streaming,
    Completed,
    Aborted,
    Errored,
}

/// Observable stream events, fanned out to subscribers.
#[derive(Debug, Clone)]
pub enum StreamEvent {
    /// One token was appended.
    Token {
        session_id: String,
        content: String,
        token_count: u64,
    },
    /// The stream finished naturally; carries the full output.
    Completed {
        session_id: String,
        full_content: String,
    },
    /// The stream failed mid-flight.
    Error { session_id: String, message: String },
    /// The session was aborted locally.
    Aborted { session_id: String },
}

/// Accumulation state for one inference stream.
///
/// Owned exclusively by the coordinator's pump task until the session
/// reaches a terminal phase, at which point the content is handed to
/// the job state store and the session discarded.
#[derive(Debug, Clone)]
pub struct StreamSession {
    pub session_id: String,
    pub model_id: String,
    /// Append-only output buffer.
    pub accumulated_content: String,
    /// Number of tokens appended; non-decreasing for the session's
    /// lifetime and frozen once the session leaves `Streaming`.
    pub token_count: u64,
    pub phase: SessionPhase,
    pub abort_requested: bool,
    pub started_at: Timestamp,
    /// Set when `phase == Errored`.
    pub error: Option<String>,
}

impl StreamSession {
    pub fn new(model_id: impl Into<String>) -> Self {
        Self {
            session_id: uuid::Uuid::new_v4().to_string(),
            model_id: model_id.into(),
            accumulated_content: String::new(),
            token_count: 0,
            phase: SessionPhase::Streaming,
            abort_requested: false,
            started_at: Utc::now(),
            error: None,
        }
    }

    /// Whether the session is still consuming tokens.
    pub fn is_active(&self) -> bool {
        self.phase == SessionPhase::Streaming && !self.abort_requested
    }

    /// Apply one incoming message.
    ///
    /// Returns the event to fan out, or `None` when the message is
    /// discarded. Everything arriving after abort or a terminal phase
    /// is discarded: cancellation is cooperative, so chunks from the
    /// still-open transport may trail in and must not touch the buffer.
    pub fn apply(&mut self, msg: StreamMessage) -> Option<StreamEvent> {
        if !self.is_active() {
            tracing::debug!(
                session_id = %self.session_id,
                phase = ?self.phase,
                "Discarding message for inactive session",
            );
            return None;
        }

        match msg {
            StreamMessage::Token(data) => {
                self.accumulated_content.push_str(&data.content);
                self.token_count += 1;
                Some(StreamEvent::Token {
                    session_id: self.session_id.clone(),
                    content: data.content,
                    token_count: self.token_count,
                })
            }
            StreamMessage::Complete(data) => {
                self.phase = SessionPhase::Completed;
                if let Some(full) = data.full_content {
                    self.accumulated_content = full;
                }
                Some(StreamEvent::Completed {
                    session_id: self.session_id.clone(),
                    full_content: self.accumulated_content.clone(),
                })
            }
            StreamMessage::Error(data) => {
                self.phase = SessionPhase::Errored;
                self.error = Some(data.message.clone());
                Some(StreamEvent::Error {
                    session_id: self.session_id.clone(),
                    message: data.message,
                })
            }
        }
    }

    /// Request local abort. Idempotent; returns the event to fan out
    /// on the first call only.
    pub fn abort(&mut self) -> Option<StreamEvent> {
        if !self.is_active() {
            return None;
        }
        self.abort_requested = true;
        self.phase = SessionPhase::Aborted;
        Some(StreamEvent::Aborted {
            session_id: self.session_id.clone(),
        })
    }
}

#[cfg(test)]
mod tests {
    use crate::messages::{CompleteData, ErrorData, TokenData};

    use super::*;

    fn token(content: &str) -> StreamMessage {
        StreamMessage::Token(TokenData {
            content: content.into(),
        })
    }

    #[test]
    fn tokens_accumulate_in_order() {
        let mut session = StreamSession::new("compliance-7b");
        session.apply(token("high")).unwrap();
        session.apply(token(" risk")).unwrap();
        assert_eq!(session.accumulated_content, "high risk");
        assert_eq!(session.token_count, 2);
        assert!(session.is_active());
    }

    #[test]
    fn token_count_is_reported_per_event() {
        let mut session = StreamSession::new("compliance-7b");
        for i in 1..=5 {
            match session.apply(token("x")).unwrap() {
                StreamEvent::Token { token_count, .. } => assert_eq!(token_count, i),
                other => panic!("expected Token event, got {other:?}"),
            }
        }
    }

    #[test]
    fn late_tokens_after_stop_are_discarded() {
        let mut session = StreamSession::new("compliance-7b");
        for _ in 0..5 {
            session.apply(token("t")).unwrap();
        }
        assert_eq!(session.token_count, 5);

        session.abort().unwrap();
        assert_eq!(session.phase, SessionPhase::Aborted);

        // Two chunks trail in after the stop.
        assert!(session.apply(token("late")).is_none());
        assert!(session.apply(token("late")).is_none());
        assert_eq!(session.token_count, 5);
        assert_eq!(session.accumulated_content, "ttttt");
    }

    #[test]
    fn abort_is_idempotent() {
        let mut session = StreamSession::new("compliance-7b");
        assert!(session.abort().is_some());
        assert!(session.abort().is_none());
    }

    #[test]
    fn complete_prefers_backend_full_content() {
        let mut session = StreamSession::new("compliance-7b");
        session.apply(token("partial")).unwrap();
        let event = session
            .apply(StreamMessage::Complete(CompleteData {
                full_content: Some("the full answer".into()),
            }))
            .unwrap();
        match event {
            StreamEvent::Completed { full_content, .. } => {
                assert_eq!(full_content, "the full answer");
            }
            other => panic!("expected Completed, got {other:?}"),
        }
        assert_eq!(session.phase, SessionPhase::Completed);
    }

    #[test]
    fn complete_falls_back_to_accumulated_content() {
        let mut session = StreamSession::new("compliance-7b");
        session.apply(token("acc")).unwrap();
        session.apply(token("umulated")).unwrap();
        let event = session
            .apply(StreamMessage::Complete(CompleteData { full_content: None }))
            .unwrap();
        match event {
            StreamEvent::Completed { full_content, .. } => {
                assert_eq!(full_content, "accumulated");
            }
            other => panic!("expected Completed, got {other:?}"),
        }
    }

    #[test]
    fn error_transitions_to_errored() {
        let mut session = StreamSession::new("compliance-7b");
        session.apply(token("x")).unwrap();
        session
            .apply(StreamMessage::Error(ErrorData {
                message: "model overloaded".into(),
            }))
            .unwrap();
        assert_eq!(session.phase, SessionPhase::Errored);
        assert_eq!(session.error.as_deref(), Some("model overloaded"));
        assert!(!session.is_active());
    }

    #[test]
    fn messages_after_completion_are_discarded() {
        let mut session = StreamSession::new("compliance-7b");
        session
            .apply(StreamMessage::Complete(CompleteData { full_content: None }))
            .unwrap();
        assert!(session.apply(token("extra")).is_none());
        assert_eq!(session.token_count, 0);
    }
}
