//! # Monitor
//!
//! A synthetics monitor, optionally with a script and alert conditions.

use super::SyncStatus;
use kube::CustomResource;
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

/// Monitor Custom Resource Definition
///
/// Unset fields fall back to New Relic friendly defaults: a `SIMPLE` ping
/// every 10 minutes from `AWS_US_WEST_1`, enabled.
///
/// # Example
///
/// ```yaml
/// apiVersion: newrelic.monitoring.io/v1alpha1
/// kind: Monitor
/// metadata:
///   name: storefront-ping
/// spec:
///   uri: https://shop.example.com/healthz
///   conditions:
///     - policyName: checkout-latency
///       runbookUrl: https://runbooks.example.com/storefront
/// ```
#[derive(CustomResource, Debug, Clone, Default, PartialEq, Deserialize, Serialize, JsonSchema)]
#[kube(
    kind = "Monitor",
    group = "newrelic.monitoring.io",
    version = "v1alpha1",
    namespaced,
    status = "MonitorStatus",
    shortname = "nrmonitor",
    printcolumn = r#"{"name":"URI", "type":"string", "jsonPath":".spec.uri"}"#,
    printcolumn = r#"{"name":"ID", "type":"string", "jsonPath":".status.externalId"}"#
)]
#[serde(rename_all = "camelCase")]
pub struct MonitorSpec {
    /// SIMPLE, BROWSER, SCRIPT_BROWSER or SCRIPT_API (case-insensitive)
    #[serde(rename = "type", default, skip_serializing_if = "Option::is_none")]
    pub monitor_type: Option<String>,
    /// Check interval in minutes
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub frequency: Option<u32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub uri: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub locations: Option<Vec<String>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub status: Option<MonitorState>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub sla_threshold: Option<f64>,
    /// Keep whatever status the monitor has in New Relic instead of forcing `status`
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub manage_updates: Option<bool>,
    #[serde(default)]
    pub options: MonitorOptions,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub script: Option<MonitorScript>,
    /// Alert policies that get a "Check Failure" condition for this monitor
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub conditions: Vec<MonitorCondition>,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize, Serialize, JsonSchema)]
#[serde(rename_all = "lowercase")]
pub enum MonitorState {
    #[default]
    Enabled,
    Disabled,
    Muted,
}

impl MonitorState {
    #[must_use]
    pub fn as_str(&self) -> &'static str {
        match self {
            MonitorState::Enabled => "enabled",
            MonitorState::Disabled => "disabled",
            MonitorState::Muted => "muted",
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize, Serialize, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct MonitorOptions {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub validation_string: Option<String>,
    #[serde(rename = "verifySSL", default)]
    pub verify_ssl: bool,
    #[serde(rename = "bypassHEADRequest", default)]
    pub bypass_head_request: bool,
    #[serde(default)]
    pub treat_redirect_as_failure: bool,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize, Serialize, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct MonitorScript {
    /// Plain-text script; encoded before upload
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub script_text: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize, Serialize, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct MonitorCondition {
    /// Exact name of the alert policy in New Relic
    pub policy_name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub runbook_url: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize, Serialize, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct MonitorStatus {
    #[serde(flatten)]
    pub sync: SyncStatus,
    /// Ids of the policies holding a condition for this monitor
    #[serde(default)]
    pub condition_policies: Vec<i64>,
}
