//! WebSocket client for the inference streaming endpoint.

use tokio_tungstenite::{connect_async, MaybeTlsStream};

/// Connection configuration for the inference stream endpoint.
pub struct StreamClient {
    ws_url: String,
}

/// A live WebSocket connection for one stream session.
pub struct StreamConnection {
    /// Session id sent during the handshake, used to correlate the
    /// stop frame and all session state.
    pub session_id: String,
    /// The raw WebSocket stream for reading/writing frames.
    pub ws_stream: tokio_tungstenite::WebSocketStream<MaybeTlsStream<tokio::net::TcpStream>>,
}

impl StreamClient {
    /// Create a client targeting the inference endpoint.
    ///
    /// * `ws_url` - WebSocket base URL, e.g. `ws://host:8080`.
    pub fn new(ws_url: String) -> Self {
        Self { ws_url }
    }

    /// WebSocket base URL.
    pub fn ws_url(&self) -> &str {
        &self.ws_url
    }

    /// Open a connection for the given session id.
    ///
    /// The id is appended as a query parameter so the backend can
    /// address the session when a stop frame arrives.
    pub async fn connect(&self, session_id: &str) -> Result<StreamConnection, StreamClientError> {
        let url = format!("{}/ws/inference?sessionId={}", self.ws_url, session_id);

        let (ws_stream, _response) = connect_async(&url).await.map_err(|e| {
            StreamClientError::Connection(format!(
                "Failed to connect to inference stream at {}: {e}",
                self.ws_url
            ))
        })?;

        tracing::info!(
            session_id = %session_id,
            "Connected to inference stream at {}",
            self.ws_url,
        );

        Ok(StreamConnection {
            session_id: session_id.to_string(),
            ws_stream,
        })
    }
}

/// Errors that can occur when working with the WebSocket client.
#[derive(Debug, thiserror::Error)]
pub enum StreamClientError {
    /// Failed to establish the WebSocket connection.
    #[error("Connection error: {0}")]
    Connection(String),
}
