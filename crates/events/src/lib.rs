//! In-process job lifecycle event bus.
//!
//! [`JobEventBus`] is the publish/subscribe hub for [`JobEvent`]s. It
//! is designed to be shared via `Arc<JobEventBus>` between the job
//! state store and any number of page-level subscribers.

pub mod bus;

pub use bus::{JobEvent, JobEventBus};
