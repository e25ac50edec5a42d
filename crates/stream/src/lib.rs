//! Token-incremental streaming for inference workloads.
//!
//! Provides typed message parsing for the inference WebSocket
//! protocol, per-session accumulation state, and the
//! [`coordinator::StreamCoordinator`] that drives one live session at
//! a time and finalizes its output into the shared job state store.

pub mod client;
pub mod coordinator;
pub mod messages;
pub mod session;

pub use client::{StreamClient, StreamClientError};
pub use coordinator::{StreamController, StreamCoordinator, StreamError, StreamParams};
pub use session::{SessionPhase, StreamEvent, StreamSession};
