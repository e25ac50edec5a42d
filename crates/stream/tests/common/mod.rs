#![allow(dead_code)]

use std::sync::Arc;
use std::time::Duration;

use futures::{SinkExt, StreamExt};
use sentra_core::job::Job;
use sentra_tracker::JobStateStore;
use tokio::net::TcpListener;
use tokio::sync::Mutex;
use tokio_tungstenite::accept_async;
use tokio_tungstenite::tungstenite::Message;

/// One step of a scripted server-side conversation.
pub enum ServerAction {
    /// Send a text frame to the client.
    Send(String),
    /// Block until the client sends a text frame, recording it.
    AwaitFrame,
    /// Sleep for the given number of milliseconds.
    Delay(u64),
    /// Close the connection immediately.
    Close,
}

/// Scripted WebSocket endpoint standing in for the inference backend.
///
/// Each accepted connection consumes the next script in order, so a
/// test can exercise back-to-back sessions with different behavior.
pub struct StubServer {
    pub ws_url: String,
    received: Arc<Mutex<Vec<String>>>,
}

impl StubServer {
    /// Text frames the server has received from clients so far.
    pub async fn received(&self) -> Vec<String> {
        self.received.lock().await.clone()
    }
}

pub async fn spawn_stub(scripts: Vec<Vec<ServerAction>>) -> StubServer {
    let listener = TcpListener::bind("127.0.0.1:0")
        .await
        .expect("bind stub listener");
    let addr = listener.local_addr().expect("stub listener addr");
    let received = Arc::new(Mutex::new(Vec::new()));
    let task_received = Arc::clone(&received);

    tokio::spawn(async move {
        for script in scripts {
            let Ok((socket, _)) = listener.accept().await else {
                return;
            };
            let Ok(mut ws) = accept_async(socket).await else {
                return;
            };

            for action in script {
                match action {
                    ServerAction::Send(frame) => {
                        if ws.send(Message::Text(frame)).await.is_err() {
                            break;
                        }
                    }
                    ServerAction::AwaitFrame => {
                        while let Some(Ok(msg)) = ws.next().await {
                            if let Message::Text(text) = msg {
                                task_received.lock().await.push(text.to_string());
                                break;
                            }
                        }
                    }
                    ServerAction::Delay(ms) => {
                        tokio::time::sleep(Duration::from_millis(ms)).await;
                    }
                    ServerAction::Close => {
                        let _ = ws.close(None).await;
                        break;
                    }
                }
            }
        }
    });

    StubServer {
        ws_url: format!("ws://{addr}"),
        received,
    }
}

pub fn token_frame(content: &str) -> String {
    serde_json::json!({ "type": "token", "data": { "content": content } }).to_string()
}

pub fn complete_frame(full_content: Option<&str>) -> String {
    serde_json::json!({ "type": "complete", "data": { "full_content": full_content } }).to_string()
}

pub fn error_frame(message: &str) -> String {
    serde_json::json!({ "type": "error", "data": { "message": message } }).to_string()
}

/// Poll the store until the job reaches a terminal status.
pub async fn wait_terminal(store: &JobStateStore, job_id: &str) -> Job {
    for _ in 0..200 {
        if let Some(job) = store.get(job_id).await {
            if job.status.is_terminal() {
                return job;
            }
        }
        tokio::time::sleep(Duration::from_millis(10)).await;
    }
    panic!("job {job_id} never reached a terminal status");
}
