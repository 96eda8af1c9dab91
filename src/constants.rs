//! # Constants
//!
//! Shared constants used throughout the operator.
//!
//! These values represent reasonable defaults and can be overridden via
//! environment variables where applicable (see [`crate::config`]).

/// API group shared by every custom resource this operator owns
pub const API_GROUP: &str = "newrelic.monitoring.io";

/// API version of the custom resources
pub const API_VERSION: &str = "v1alpha1";

/// Finalizer attached after a successful create.
/// Blocks physical removal until the remote object has been deleted.
pub const FINALIZER: &str = "newrelic.monitoring.io/cleanup";

/// Default HTTP server port for metrics and health probes
pub const DEFAULT_METRICS_PORT: u16 = 5000;

/// Default New Relic REST v2 endpoint
pub const DEFAULT_API_URL: &str = "https://api.newrelic.com/v2";

/// Default New Relic Synthetics v3 endpoint
pub const DEFAULT_SYNTHETICS_URL: &str = "https://synthetics.newrelic.com/synthetics/api/v3";

/// Per-request deadline for calls to New Relic (seconds)
pub const DEFAULT_REMOTE_TIMEOUT_SECS: u64 = 30;

/// Delay before a failed reconcile is retried (seconds)
pub const DEFAULT_RETRY_DELAY_SECS: u64 = 300;

/// Upper bound for the Fibonacci retry backoff (seconds)
pub const DEFAULT_RETRY_MAX_DELAY_SECS: u64 = 3600;

/// Periodic resync after a successful reconcile (seconds)
pub const DEFAULT_RESYNC_INTERVAL_SECS: u64 = 3600;

/// Requeue delay after an update found the remote object missing (seconds)
pub const DEFAULT_RECREATE_REQUEUE_SECS: u64 = 5;

/// Delay before restarting after an unclassified watch error (seconds)
pub const DEFAULT_WATCH_RESTART_DELAY_SECS: u64 = 5;

/// Maximum reconciles running at once, per kind
pub const DEFAULT_MAX_CONCURRENT_RECONCILIATIONS: u16 = 10;

/// Environment variable naming the dashboard owner whose dashboards are swept at startup
pub const CLEANUP_OWNER_ENV: &str = "NEW_RELIC_OPERATOR_CLEANUP";

/// Monitor type sent when the resource names none
pub const DEFAULT_MONITOR_TYPE: &str = "simple";

/// Default monitor check frequency (minutes)
pub const DEFAULT_MONITOR_FREQUENCY: u32 = 10;

/// Default monitor location
pub const DEFAULT_MONITOR_LOCATION: &str = "AWS_US_WEST_1";

/// Name of the synthetics alert condition created for monitor conditions
pub const MONITOR_CONDITION_NAME: &str = "Check Failure";

/// Upper bound on pages fetched by a single list call
pub const MAX_LIST_PAGES: u32 = 100;
