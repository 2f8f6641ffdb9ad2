//! Background worker configuration.

use serde::{Deserialize, Serialize};

/// Background task worker configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WorkerConfig {
    /// Whether the worker is enabled.
    #[serde(default = "default_true")]
    pub enabled: bool,
    /// Identifier recorded on claimed tasks.
    #[serde(default = "default_worker_id")]
    pub worker_id: String,
    /// Number of concurrent task processing slots.
    #[serde(default = "default_concurrency")]
    pub concurrency: usize,
    /// Interval in seconds between task queue polls.
    #[serde(default = "default_poll_interval")]
    pub poll_interval_seconds: u64,
    /// Attempts before a transiently failing task is marked failed.
    #[serde(default = "default_max_attempts")]
    pub max_attempts: i32,
}

impl Default for WorkerConfig {
    fn default() -> Self {
        Self {
            enabled: default_true(),
            worker_id: default_worker_id(),
            concurrency: default_concurrency(),
            poll_interval_seconds: default_poll_interval(),
            max_attempts: default_max_attempts(),
        }
    }
}

fn default_true() -> bool {
    true
}

fn default_worker_id() -> String {
    "datashare-worker".to_string()
}

fn default_concurrency() -> usize {
    4
}

fn default_poll_interval() -> u64 {
    5
}

fn default_max_attempts() -> i32 {
    3
}
