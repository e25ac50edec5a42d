//! Scripted in-memory backend for tracker tests.
#![allow(dead_code)]

use std::collections::{HashMap, VecDeque};
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::Mutex;

use async_trait::async_trait;
use sentra_client::{ApiError, JobBackend, SubmitResponse};
use sentra_core::job::{Job, JobUpdate, QueueStats, SubmissionParams};
use sentra_core::status::JobStatus;

/// One scripted poll outcome: a status payload, or a transport-level
/// failure with an HTTP-ish status code.
pub type PollOutcome = Result<JobUpdate, u16>;

/// In-memory [`JobBackend`] with per-job scripted poll sequences and
/// call counters.
///
/// Poll scripts are consumed front to back; the final entry is sticky
/// so a poller that fires one extra tick observes the same terminal
/// status instead of an empty script.
#[derive(Default)]
pub struct MockBackend {
    scripts: Mutex<HashMap<String, VecDeque<PollOutcome>>>,
    fetch_counts: Mutex<HashMap<String, usize>>,
    submit_ids: Mutex<VecDeque<String>>,
    retry_ids: Mutex<VecDeque<String>>,
    fail_submit: AtomicBool,
    fail_cancel: AtomicBool,
    fail_stats: AtomicBool,
    cancel_calls: AtomicUsize,
    stats_calls: AtomicUsize,
    stats: Mutex<Option<QueueStats>>,
}

/// Opt-in log output for debugging: set `RUST_LOG` and run the tests
/// with `--nocapture`.
pub fn init_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("warn")),
        )
        .with_test_writer()
        .try_init();
}

impl MockBackend {
    pub fn new() -> Self {
        init_tracing();
        Self::default()
    }

    /// Queue the poll outcomes for a job id.
    pub fn script_job(&self, job_id: &str, outcomes: Vec<PollOutcome>) {
        self.scripts
            .lock()
            .unwrap()
            .insert(job_id.to_string(), outcomes.into());
    }

    /// Queue the id the next submission will receive.
    pub fn push_submit_id(&self, job_id: &str) {
        self.submit_ids.lock().unwrap().push_back(job_id.to_string());
    }

    /// Queue the id the next retry will receive.
    pub fn push_retry_id(&self, job_id: &str) {
        self.retry_ids.lock().unwrap().push_back(job_id.to_string());
    }

    pub fn set_fail_submit(&self, fail: bool) {
        self.fail_submit.store(fail, Ordering::SeqCst);
    }

    pub fn set_fail_cancel(&self, fail: bool) {
        self.fail_cancel.store(fail, Ordering::SeqCst);
    }

    pub fn set_fail_stats(&self, fail: bool) {
        self.fail_stats.store(fail, Ordering::SeqCst);
    }

    pub fn set_stats(&self, stats: QueueStats) {
        *self.stats.lock().unwrap() = Some(stats);
    }

    /// Number of status fetches issued for a job.
    pub fn fetch_count(&self, job_id: &str) -> usize {
        self.fetch_counts
            .lock()
            .unwrap()
            .get(job_id)
            .copied()
            .unwrap_or(0)
    }

    pub fn cancel_calls(&self) -> usize {
        self.cancel_calls.load(Ordering::SeqCst)
    }

    pub fn stats_calls(&self) -> usize {
        self.stats_calls.load(Ordering::SeqCst)
    }

    fn transport_error(status: u16) -> ApiError {
        ApiError::Api {
            status,
            body: "scripted failure".into(),
        }
    }
}

#[async_trait]
impl JobBackend for MockBackend {
    async fn submit_job(&self, _params: &SubmissionParams) -> Result<SubmitResponse, ApiError> {
        if self.fail_submit.load(Ordering::SeqCst) {
            return Err(Self::transport_error(503));
        }
        let job_id = self
            .submit_ids
            .lock()
            .unwrap()
            .pop_front()
            .expect("no submit id scripted");
        Ok(SubmitResponse { job_id })
    }

    async fn fetch_status(&self, job_id: &str) -> Result<JobUpdate, ApiError> {
        *self
            .fetch_counts
            .lock()
            .unwrap()
            .entry(job_id.to_string())
            .or_insert(0) += 1;

        let mut scripts = self.scripts.lock().unwrap();
        let script = scripts
            .get_mut(job_id)
            .unwrap_or_else(|| panic!("no poll script for {job_id}"));

        let outcome = if script.len() > 1 {
            script.pop_front().unwrap()
        } else {
            script.front().cloned().expect("empty poll script")
        };

        outcome.map_err(Self::transport_error)
    }

    async fn cancel_job(&self, _job_id: &str) -> Result<(), ApiError> {
        self.cancel_calls.fetch_add(1, Ordering::SeqCst);
        if self.fail_cancel.load(Ordering::SeqCst) {
            return Err(Self::transport_error(502));
        }
        Ok(())
    }

    async fn retry_job(&self, _job_id: &str) -> Result<SubmitResponse, ApiError> {
        let job_id = self
            .retry_ids
            .lock()
            .unwrap()
            .pop_front()
            .expect("no retry id scripted");
        Ok(SubmitResponse { job_id })
    }

    async fn list_jobs(
        &self,
        _status: Option<JobStatus>,
        _limit: Option<u32>,
    ) -> Result<Vec<Job>, ApiError> {
        Ok(Vec::new())
    }

    async fn queue_stats(&self) -> Result<QueueStats, ApiError> {
        self.stats_calls.fetch_add(1, Ordering::SeqCst);
        if self.fail_stats.load(Ordering::SeqCst) {
            return Err(Self::transport_error(500));
        }
        self.stats
            .lock()
            .unwrap()
            .ok_or_else(|| Self::transport_error(500))
    }
}
