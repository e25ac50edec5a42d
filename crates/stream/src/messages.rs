//! Inference stream message types and parser.
//!
//! The backend sends JSON messages over WebSocket with the shape
//! `{"type": "<kind>", "data": {...}}`. This module deserializes them
//! into a strongly-typed [`StreamMessage`] enum and builds the
//! outbound frames the client may send.

use serde::{Deserialize, Serialize};

/// All known inference stream message types.
///
/// Deserialized via the internally-tagged `"type"` field with
/// associated `"data"` content.
#[derive(Debug, Clone, Deserialize)]
#[serde(tag = "type", content = "data")]
pub enum StreamMessage {
    /// One incremental output token.
    #[serde(rename = "token")]
    Token(TokenData),

    /// The stream finished naturally; carries the full output.
    #[serde(rename = "complete")]
    Complete(CompleteData),

    /// The stream failed mid-flight.
    #[serde(rename = "error")]
    Error(ErrorData),
}

/// Payload for `token` messages.
#[derive(Debug, Clone, Deserialize)]
pub struct TokenData {
    /// Token text, appended verbatim to the accumulated content.
    pub content: String,
}

/// Payload for `complete` messages.
#[derive(Debug, Clone, Deserialize)]
pub struct CompleteData {
    /// Authoritative full output. When absent, the locally
    /// accumulated content is used instead.
    #[serde(default)]
    pub full_content: Option<String>,
}

/// Payload for `error` messages.
#[derive(Debug, Clone, Deserialize)]
pub struct ErrorData {
    pub message: String,
}

/// Outbound frames the client sends to the backend.
#[derive(Debug, Clone, Serialize)]
#[serde(tag = "type", content = "data")]
pub enum OutboundMessage {
    /// Best-effort request to stop generating for a session.
    #[serde(rename = "stop")]
    Stop { session_id: String },
}

/// Parse an inference stream text message into a typed enum.
///
/// Returns `Err` for malformed JSON or unknown `type` values.
/// Callers should log unknown types and continue.
pub fn parse_message(text: &str) -> Result<StreamMessage, serde_json::Error> {
    serde_json::from_str(text)
}

/// Serialize the stop frame for a session.
pub fn stop_frame(session_id: &str) -> String {
    serde_json::to_string(&OutboundMessage::Stop {
        session_id: session_id.to_string(),
    })
    .expect("stop frame serialization cannot fail")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parse_token_message() {
        let json = r#"{"type":"token","data":{"content":"flag"}}"#;
        let msg = parse_message(json).unwrap();
        match msg {
            StreamMessage::Token(data) => assert_eq!(data.content, "flag"),
            other => panic!("Expected Token, got {other:?}"),
        }
    }

    #[test]
    fn parse_complete_with_full_content() {
        let json = r#"{"type":"complete","data":{"full_content":"flagged for review"}}"#;
        let msg = parse_message(json).unwrap();
        match msg {
            StreamMessage::Complete(data) => {
                assert_eq!(data.full_content.as_deref(), Some("flagged for review"));
            }
            other => panic!("Expected Complete, got {other:?}"),
        }
    }

    #[test]
    fn parse_complete_without_full_content() {
        let json = r#"{"type":"complete","data":{}}"#;
        let msg = parse_message(json).unwrap();
        match msg {
            StreamMessage::Complete(data) => assert!(data.full_content.is_none()),
            other => panic!("Expected Complete, got {other:?}"),
        }
    }

    #[test]
    fn parse_error_message() {
        let json = r#"{"type":"error","data":{"message":"model overloaded"}}"#;
        let msg = parse_message(json).unwrap();
        match msg {
            StreamMessage::Error(data) => assert_eq!(data.message, "model overloaded"),
            other => panic!("Expected Error, got {other:?}"),
        }
    }

    #[test]
    fn parse_unknown_type_returns_error() {
        let json = r#"{"type":"preview","data":{}}"#;
        assert!(parse_message(json).is_err());
    }

    #[test]
    fn parse_invalid_json_returns_error() {
        assert!(parse_message("not json at all").is_err());
    }

    #[test]
    fn stop_frame_shape() {
        let frame = stop_frame("sess-1");
        let value: serde_json::Value = serde_json::from_str(&frame).unwrap();
        assert_eq!(value["type"], "stop");
        assert_eq!(value["data"]["session_id"], "sess-1");
    }
}
