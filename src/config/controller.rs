//! # Controller Configuration
//!
//! Controller-level settings loaded from environment variables.

use crate::adapter::ResourceKind;
use std::time::Duration;

/// How failed reconciles are spaced out
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RetryStrategy {
    /// Always wait `retry_delay_secs`
    Fixed,
    /// Fibonacci sequence starting at `retry_delay_secs`, capped at `retry_max_delay_secs`
    Fibonacci,
}

impl std::str::FromStr for RetryStrategy {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "fixed" => Ok(Self::Fixed),
            "fibonacci" | "fib" => Ok(Self::Fibonacci),
            other => Err(format!("unknown retry strategy '{other}'")),
        }
    }
}

/// Controller-level configuration
///
/// All settings have sensible defaults and can be overridden via environment variables.
/// Environment variables are populated from a ConfigMap using `envFrom` in the deployment.
#[derive(Debug, Clone)]
pub struct ControllerConfig {
    /// Delay before a failed reconcile is retried (seconds)
    pub retry_delay_secs: u64,
    /// Cap for the Fibonacci backoff (seconds)
    pub retry_max_delay_secs: u64,
    /// Fixed delay or Fibonacci backoff
    pub retry_strategy: RetryStrategy,
    /// Requeue after a successful reconcile (seconds)
    pub resync_interval_secs: u64,
    /// Requeue after the remote object was found missing on update (seconds)
    pub recreate_requeue_secs: u64,
    /// Watch stream restart delay after unknown errors (seconds)
    pub watch_restart_delay_secs: u64,
    /// Maximum concurrent reconciliations per kind
    pub max_concurrent_reconciliations: u16,
    /// Kinds that get a controller
    pub enabled_kinds: Vec<ResourceKind>,
    /// Port for `/metrics`, `/healthz`, `/readyz`
    pub metrics_port: u16,
    /// Log format (json, text)
    pub log_format: String,
    /// Owner email whose dashboards are deleted once at startup
    pub cleanup_owner: Option<String>,
}

impl Default for ControllerConfig {
    fn default() -> Self {
        use crate::constants::*;
        Self {
            retry_delay_secs: DEFAULT_RETRY_DELAY_SECS,
            retry_max_delay_secs: DEFAULT_RETRY_MAX_DELAY_SECS,
            retry_strategy: RetryStrategy::Fixed,
            resync_interval_secs: DEFAULT_RESYNC_INTERVAL_SECS,
            recreate_requeue_secs: DEFAULT_RECREATE_REQUEUE_SECS,
            watch_restart_delay_secs: DEFAULT_WATCH_RESTART_DELAY_SECS,
            max_concurrent_reconciliations: DEFAULT_MAX_CONCURRENT_RECONCILIATIONS,
            enabled_kinds: ResourceKind::all().to_vec(),
            metrics_port: DEFAULT_METRICS_PORT,
            log_format: "json".to_string(),
            cleanup_owner: None,
        }
    }
}

impl ControllerConfig {
    /// Load configuration from environment variables with defaults
    pub fn from_env() -> Self {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Load configuration from an arbitrary key lookup
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Self {
        let defaults = Self::default();
        Self {
            retry_delay_secs: parse_or(&lookup, "RETRY_DELAY_SECS", defaults.retry_delay_secs),
            retry_max_delay_secs: parse_or(
                &lookup,
                "RETRY_MAX_DELAY_SECS",
                defaults.retry_max_delay_secs,
            ),
            retry_strategy: parse_or(&lookup, "RETRY_BACKOFF", defaults.retry_strategy),
            resync_interval_secs: parse_or(
                &lookup,
                "RESYNC_INTERVAL_SECS",
                defaults.resync_interval_secs,
            ),
            recreate_requeue_secs: parse_or(
                &lookup,
                "RECREATE_REQUEUE_SECS",
                defaults.recreate_requeue_secs,
            ),
            watch_restart_delay_secs: parse_or(
                &lookup,
                "WATCH_RESTART_DELAY_SECS",
                defaults.watch_restart_delay_secs,
            ),
            max_concurrent_reconciliations: parse_or(
                &lookup,
                "MAX_CONCURRENT_RECONCILIATIONS",
                defaults.max_concurrent_reconciliations,
            ),
            enabled_kinds: lookup("ENABLED_KINDS")
                .map(|raw| parse_kinds(&raw))
                .filter(|kinds| !kinds.is_empty())
                .unwrap_or(defaults.enabled_kinds),
            metrics_port: parse_or(&lookup, "METRICS_PORT", defaults.metrics_port),
            log_format: lookup("LOG_FORMAT").unwrap_or(defaults.log_format),
            cleanup_owner: lookup(crate::constants::CLEANUP_OWNER_ENV)
                .map(|v| v.trim().to_string())
                .filter(|v| !v.is_empty()),
        }
    }

    /// Delay before a failed reconcile is retried
    pub fn retry_delay(&self) -> Duration {
        Duration::from_secs(self.retry_delay_secs)
    }

    /// Requeue interval after a successful reconcile
    pub fn resync_interval(&self) -> Duration {
        Duration::from_secs(self.resync_interval_secs)
    }

    /// Requeue interval after recreate-on-404
    pub fn recreate_requeue(&self) -> Duration {
        Duration::from_secs(self.recreate_requeue_secs)
    }

    /// Get watch restart delay duration
    pub fn watch_restart_delay(&self) -> Duration {
        Duration::from_secs(self.watch_restart_delay_secs)
    }
}

/// Parse a comma separated kind list, skipping (and logging) unknown entries
fn parse_kinds(raw: &str) -> Vec<ResourceKind> {
    raw.split(',')
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .filter_map(|s| match s.parse::<ResourceKind>() {
            Ok(kind) => Some(kind),
            Err(e) => {
                tracing::warn!("Ignoring ENABLED_KINDS entry: {}", e);
                None
            }
        })
        .collect()
}

/// Read a key or return the default when unset or unparsable
fn parse_or<T: std::str::FromStr>(lookup: &impl Fn(&str) -> Option<String>, key: &str, default: T) -> T {
    lookup(key)
        .and_then(|v| v.trim().parse().ok())
        .unwrap_or(default)
}
