//! Domain types and pure logic for the Sentra job orchestration client.
//!
//! Zero internal dependencies. Everything here is usable without an
//! async runtime: status machine rules, job records, submission
//! parameters, and queue statistics.

pub mod error;
pub mod job;
pub mod status;
pub mod types;
