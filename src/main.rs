//! # New Relic Operator
//!
//! A Kubernetes operator that keeps New Relic monitoring configuration in
//! sync with custom resources in the `newrelic.monitoring.io` group.
//!
//! ## Overview
//!
//! 1. **Watches** `AlertPolicy`, `AlertChannel`, `Dashboard`, `Monitor` and `Label` resources
//! 2. **Detects changes** by comparing a SHA-256 fingerprint of each spec with the one recorded in status
//! 3. **Creates, updates or deletes** the matching New Relic objects, adopting existing ones by name
//! 4. **Guards deletion** with a finalizer until the remote object is gone
//!
//! ## Features
//!
//! - **Per-kind controllers**: enable a subset with `ENABLED_KINDS`
//! - **Policy to channel linking** by channel name
//! - **Synthetics**: monitor scripts and "Check Failure" alert conditions
//! - **Prometheus metrics** and health probes on `METRICS_PORT`

use anyhow::Result;
use newrelic_operator::runtime::{initialize, run_watch_loops};

#[tokio::main]
async fn main() -> Result<()> {
    let init = initialize().await?;
    run_watch_loops(init.client, init.reconciler, init.server_state).await
}
