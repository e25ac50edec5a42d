//! HTTP client for the Sentra job backend.
//!
//! [`api::JobApi`] wraps the REST endpoints (submission, status,
//! cancellation, retry, listing, queue statistics) using [`reqwest`].
//! The [`backend::JobBackend`] trait is the seam the tracker crate
//! consumes, so tests can substitute a scripted in-memory backend.

pub mod api;
pub mod backend;

pub use api::{ApiError, JobApi, SubmitResponse};
pub use backend::JobBackend;
