use std::time::Duration;

/// Tracker configuration loaded from environment variables.
///
/// All fields have sensible defaults suitable for local development.
/// In production, override via environment variables.
#[derive(Debug, Clone)]
pub struct TrackerConfig {
    /// Base URL of the job backend (default: `http://localhost:8080`).
    pub api_base_url: String,
    /// Per-job status polling interval (default: 5 seconds).
    pub poll_interval: Duration,
    /// Queue statistics polling interval (default: 15 seconds).
    pub stats_interval: Duration,
}

impl TrackerConfig {
    /// Load configuration from environment variables with defaults.
    ///
    /// | Env Var                     | Default                 |
    /// |-----------------------------|-------------------------|
    /// | `SENTRA_API_URL`            | `http://localhost:8080` |
    /// | `SENTRA_POLL_INTERVAL_SECS` | `5`                     |
    /// | `SENTRA_STATS_INTERVAL_SECS`| `15`                    |
    pub fn from_env() -> Self {
        let api_base_url =
            std::env::var("SENTRA_API_URL").unwrap_or_else(|_| "http://localhost:8080".into());

        let poll_secs: u64 = std::env::var("SENTRA_POLL_INTERVAL_SECS")
            .unwrap_or_else(|_| "5".into())
            .parse()
            .expect("SENTRA_POLL_INTERVAL_SECS must be a valid u64");

        let stats_secs: u64 = std::env::var("SENTRA_STATS_INTERVAL_SECS")
            .unwrap_or_else(|_| "15".into())
            .parse()
            .expect("SENTRA_STATS_INTERVAL_SECS must be a valid u64");

        Self {
            api_base_url,
            poll_interval: Duration::from_secs(poll_secs),
            stats_interval: Duration::from_secs(stats_secs),
        }
    }
}

impl Default for TrackerConfig {
    fn default() -> Self {
        Self {
            api_base_url: "http://localhost:8080".into(),
            poll_interval: Duration::from_secs(5),
            stats_interval: Duration::from_secs(15),
        }
    }
}
