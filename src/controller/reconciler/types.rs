//! # Types
//!
//! Core types for the reconciler.

use crate::config::{ControllerConfig, RetryStrategy};
use crate::controller::backoff::FibonacciBackoff;
use crate::newrelic::MonitoringApi;
use kube::Client;
use std::collections::HashMap;
use std::sync::{Arc, Mutex};
use std::time::{Duration, Instant};
use thiserror::Error;
use tracing::warn;

/// Failures that are not the adapter's to report in status
#[derive(Debug, Error)]
pub enum ReconcilerError {
    #[error("kubernetes api error: {0}")]
    Kube(#[from] kube::Error),
    #[error("unable to serialize resource: {0}")]
    Serialization(#[from] serde_json::Error),
    #[error("{0} has no namespace")]
    MissingNamespace(String),
}

/// Backoff state for a specific resource
#[derive(Debug, Clone)]
pub struct BackoffState {
    pub backoff: FibonacciBackoff,
    pub error_count: u32,
    pub last_failure: Instant,
}

impl BackoffState {
    pub fn new(min_secs: u64, max_secs: u64) -> Self {
        Self {
            backoff: FibonacciBackoff::new(min_secs, max_secs),
            error_count: 0,
            last_failure: Instant::now(),
        }
    }

    pub fn increment_error(&mut self) {
        self.error_count += 1;
        self.last_failure = Instant::now();
    }

    pub fn reset(&mut self) {
        self.error_count = 0;
        self.backoff.reset();
    }
}

/// Decides how long a failed resource waits before its next attempt
///
/// Backoff state is kept per resource key so one failing resource never
/// slows down another. A failing resource is requeued within
/// `max_delay_secs`, so an entry untouched for twice that long belongs to a
/// resource that is gone and is evicted.
#[derive(Debug)]
pub struct RetryPolicy {
    strategy: RetryStrategy,
    delay_secs: u64,
    max_delay_secs: u64,
    stale_after: Duration,
    states: Mutex<HashMap<String, BackoffState>>,
}

impl RetryPolicy {
    #[must_use]
    pub fn new(strategy: RetryStrategy, delay_secs: u64, max_delay_secs: u64) -> Self {
        Self {
            strategy,
            delay_secs,
            max_delay_secs,
            stale_after: Duration::from_secs(max_delay_secs.max(delay_secs).saturating_mul(2)),
            states: Mutex::new(HashMap::new()),
        }
    }

    #[must_use]
    pub fn from_config(config: &ControllerConfig) -> Self {
        Self::new(
            config.retry_strategy,
            config.retry_delay_secs,
            config.retry_max_delay_secs,
        )
    }

    /// Delay before the next attempt for `key`, advancing its backoff
    pub fn next_delay(&self, key: &str) -> Duration {
        match self.strategy {
            RetryStrategy::Fixed => Duration::from_secs(self.delay_secs),
            RetryStrategy::Fibonacci => match self.states.lock() {
                Ok(mut states) => {
                    let stale_after = self.stale_after;
                    states.retain(|k, s| k == key || s.last_failure.elapsed() < stale_after);
                    let state = states
                        .entry(key.to_string())
                        .or_insert_with(|| BackoffState::new(self.delay_secs, self.max_delay_secs));
                    state.increment_error();
                    state.backoff.next_backoff()
                }
                Err(e) => {
                    warn!("Failed to lock backoff states: {}, using fixed delay", e);
                    Duration::from_secs(self.delay_secs)
                }
            },
        }
    }

    /// Consecutive failures recorded for `key`
    pub fn error_count(&self, key: &str) -> u32 {
        self.states
            .lock()
            .ok()
            .and_then(|states| states.get(key).map(|s| s.error_count))
            .unwrap_or(0)
    }

    /// Number of resources with failure history
    pub fn tracked(&self) -> usize {
        self.states.lock().map(|states| states.len()).unwrap_or(0)
    }

    /// Forget the failure history of `key` after a success
    pub fn reset(&self, key: &str) {
        if let Ok(mut states) = self.states.lock() {
            states.remove(key);
        }
    }
}

/// Shared context handed to every reconcile
#[derive(Clone)]
pub struct Reconciler {
    pub client: Client,
    pub api: Arc<dyn MonitoringApi>,
    pub config: Arc<ControllerConfig>,
    pub retry: Arc<RetryPolicy>,
}

impl std::fmt::Debug for Reconciler {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Reconciler")
            .field("config", &self.config)
            .finish_non_exhaustive()
    }
}

impl Reconciler {
    pub fn new(client: Client, api: Arc<dyn MonitoringApi>, config: ControllerConfig) -> Self {
        let retry = Arc::new(RetryPolicy::from_config(&config));
        Self {
            client,
            api,
            config: Arc::new(config),
            retry,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_fixed_retry_ignores_history() {
        let policy = RetryPolicy::new(RetryStrategy::Fixed, 300, 3600);
        assert_eq!(policy.next_delay("a"), Duration::from_secs(300));
        assert_eq!(policy.next_delay("a"), Duration::from_secs(300));
        assert_eq!(policy.error_count("a"), 0);
    }

    #[test]
    fn test_fibonacci_retry_is_per_resource() {
        let policy = RetryPolicy::new(RetryStrategy::Fibonacci, 10, 100);
        assert_eq!(policy.next_delay("a"), Duration::from_secs(10));
        assert_eq!(policy.next_delay("a"), Duration::from_secs(10));
        assert_eq!(policy.next_delay("a"), Duration::from_secs(20));
        assert_eq!(policy.next_delay("b"), Duration::from_secs(10));
        assert_eq!(policy.error_count("a"), 3);

        policy.reset("a");
        assert_eq!(policy.error_count("a"), 0);
        assert_eq!(policy.next_delay("a"), Duration::from_secs(10));
    }

    #[test]
    fn test_history_of_vanished_resources_is_evicted() {
        let mut policy = RetryPolicy::new(RetryStrategy::Fibonacci, 10, 100);
        policy.stale_after = Duration::from_millis(20);

        policy.next_delay("gone");
        policy.next_delay("gone");
        assert_eq!(policy.tracked(), 1);

        std::thread::sleep(Duration::from_millis(40));
        policy.next_delay("still-failing");

        assert_eq!(policy.tracked(), 1);
        assert_eq!(policy.error_count("gone"), 0);
        assert_eq!(policy.error_count("still-failing"), 1);
    }

    #[test]
    fn test_eviction_keeps_the_key_being_retried() {
        let mut policy = RetryPolicy::new(RetryStrategy::Fibonacci, 10, 100);
        policy.stale_after = Duration::from_millis(20);

        policy.next_delay("a");
        std::thread::sleep(Duration::from_millis(40));

        assert_eq!(policy.next_delay("a"), Duration::from_secs(10));
        assert_eq!(policy.error_count("a"), 2);
    }
}
