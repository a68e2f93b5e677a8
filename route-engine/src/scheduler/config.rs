//! Worker pool configuration.

use std::thread;
use std::time::Duration;

use serde::Deserialize;

/// Configuration for the request scheduler.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(default)]
pub struct SchedulerConfig {
    /// Number of worker tasks, each running one search at a time.
    pub workers: usize,

    /// Requests that may wait for a worker before new ones are rejected.
    pub queue_depth: usize,

    /// Default wall-clock limit per request (milliseconds).
    pub request_timeout_ms: u64,
}

impl SchedulerConfig {
    /// Create a new configuration with the given parameters.
    pub fn new(workers: usize, queue_depth: usize, request_timeout_ms: u64) -> Self {
        Self {
            workers,
            queue_depth,
            request_timeout_ms,
        }
    }

    /// Returns the request timeout as a Duration.
    pub fn request_timeout(&self) -> Duration {
        Duration::from_millis(self.request_timeout_ms)
    }
}

impl Default for SchedulerConfig {
    fn default() -> Self {
        Self {
            workers: thread::available_parallelism().map_or(1, |n| n.get()),
            queue_depth: 64,
            request_timeout_ms: 2000,
        }
    }
}
