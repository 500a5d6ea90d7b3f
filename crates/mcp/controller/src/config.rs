//! Controller runtime configuration

use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Backoff configuration for retries
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BackoffConfig {
    /// Initial backoff delay (milliseconds)
    #[serde(default = "default_initial_delay_ms")]
    pub initial_delay_ms: u64,

    /// Maximum backoff delay (milliseconds)
    #[serde(default = "default_max_delay_ms")]
    pub max_delay_ms: u64,

    /// Backoff multiplier
    #[serde(default = "default_multiplier")]
    pub multiplier: f64,

    /// Add up to 10% jitter to delays
    #[serde(default)]
    pub jitter: bool,
}

impl Default for BackoffConfig {
    fn default() -> Self {
        Self {
            initial_delay_ms: default_initial_delay_ms(),
            max_delay_ms: default_max_delay_ms(),
            multiplier: default_multiplier(),
            jitter: false,
        }
    }
}

fn default_initial_delay_ms() -> u64 {
    100
}

fn default_max_delay_ms() -> u64 {
    60_000
}

fn default_multiplier() -> f64 {
    2.0
}

/// Settings for one controller loop
#[derive(Debug, Clone)]
pub struct ControllerConfig {
    /// Maximum keys reconciled concurrently
    pub workers: usize,

    /// Interval between full resyncs
    pub resync_interval: Duration,

    /// Deadline for a single reconciliation pass
    pub reconcile_timeout: Duration,

    pub backoff: BackoffConfig,
}

impl Default for ControllerConfig {
    fn default() -> Self {
        Self {
            workers: 1,
            resync_interval: Duration::from_secs(300),
            reconcile_timeout: Duration::from_secs(30),
            backoff: BackoffConfig::default(),
        }
    }
}

impl ControllerConfig {
    pub fn with_workers(mut self, workers: usize) -> Self {
        self.workers = workers.max(1);
        self
    }
}
