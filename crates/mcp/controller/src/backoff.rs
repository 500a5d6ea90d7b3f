//! Per-key exponential backoff

use crate::config::BackoffConfig;
use mcp_types::ObjectKey;
use rand::Rng;
use std::collections::HashMap;
use std::sync::{Mutex, PoisonError};
use std::time::Duration;

/// Tracks consecutive failures per key and turns them into retry delays
#[derive(Debug)]
pub struct Backoff {
    config: BackoffConfig,
    failures: Mutex<HashMap<ObjectKey, u32>>,
}

impl Backoff {
    pub fn new(config: BackoffConfig) -> Self {
        Self {
            config,
            failures: Mutex::new(HashMap::new()),
        }
    }

    /// Record a failure and return how long to wait before retrying
    pub fn next_delay(&self, key: &ObjectKey) -> Duration {
        let attempt = {
            let mut failures = self.failures.lock().unwrap_or_else(PoisonError::into_inner);
            let count = failures.entry(key.clone()).or_insert(0);
            let attempt = *count;
            *count = count.saturating_add(1);
            attempt
        };
        self.delay_for(attempt)
    }

    /// Clear the failure history of a key after it succeeds
    pub fn forget(&self, key: &ObjectKey) {
        self.failures
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .remove(key);
    }

    pub fn failures(&self, key: &ObjectKey) -> u32 {
        self.failures
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .get(key)
            .copied()
            .unwrap_or(0)
    }

    fn delay_for(&self, attempt: u32) -> Duration {
        let exponent = i32::try_from(attempt).unwrap_or(i32::MAX);
        let base = self.config.initial_delay_ms as f64 * self.config.multiplier.powi(exponent);
        let capped = base.min(self.config.max_delay_ms as f64);

        let delay_ms = if self.config.jitter {
            let jitter = rand::thread_rng().gen_range(0.0..=0.1);
            (capped * (1.0 + jitter)).min(self.config.max_delay_ms as f64)
        } else {
            capped
        };

        Duration::from_millis(delay_ms as u64)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn backoff() -> Backoff {
        Backoff::new(BackoffConfig {
            initial_delay_ms: 100,
            max_delay_ms: 1_000,
            multiplier: 2.0,
            jitter: false,
        })
    }

    #[test]
    fn test_delay_grows_and_caps() {
        let backoff = backoff();
        let key = ObjectKey::new("default", "web");

        let delays: Vec<u64> = (0..6)
            .map(|_| backoff.next_delay(&key).as_millis() as u64)
            .collect();
        assert_eq!(delays, vec![100, 200, 400, 800, 1_000, 1_000]);
        assert_eq!(backoff.failures(&key), 6);
    }

    #[test]
    fn test_forget_resets() {
        let backoff = backoff();
        let key = ObjectKey::new("default", "web");
        backoff.next_delay(&key);
        backoff.next_delay(&key);
        backoff.forget(&key);

        assert_eq!(backoff.failures(&key), 0);
        assert_eq!(backoff.next_delay(&key), Duration::from_millis(100));
    }

    #[test]
    fn test_keys_are_independent() {
        let backoff = backoff();
        let a = ObjectKey::new("default", "a");
        let b = ObjectKey::new("default", "b");
        backoff.next_delay(&a);
        backoff.next_delay(&a);

        assert_eq!(backoff.next_delay(&b), Duration::from_millis(100));
    }

    #[test]
    fn test_jitter_stays_within_cap() {
        let backoff = Backoff::new(BackoffConfig {
            jitter: true,
            ..BackoffConfig::default()
        });
        let key = ObjectKey::new("default", "web");
        for _ in 0..40 {
            assert!(backoff.next_delay(&key) <= Duration::from_millis(60_000));
        }
    }
}
