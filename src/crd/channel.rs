//! # AlertChannel
//!
//! A notification channel (Slack, email, webhook, ...). New Relic does not
//! allow channels to be edited, so a spec change replaces the channel.

use super::SyncStatus;
use kube::CustomResource;
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// AlertChannel Custom Resource Definition
///
/// # Example
///
/// ```yaml
/// apiVersion: newrelic.monitoring.io/v1alpha1
/// kind: AlertChannel
/// metadata:
///   name: ops-slack
/// spec:
///   type: slack
///   configuration:
///     url: https://hooks.slack.com/services/T000/B000/XXXX
///     channel: "#ops"
/// ```
#[derive(CustomResource, Debug, Clone, Default, PartialEq, Eq, Deserialize, Serialize, JsonSchema)]
#[kube(
    kind = "AlertChannel",
    group = "newrelic.monitoring.io",
    version = "v1alpha1",
    namespaced,
    status = "SyncStatus",
    shortname = "nrchannel",
    printcolumn = r#"{"name":"Type", "type":"string", "jsonPath":".spec.type"}"#,
    printcolumn = r#"{"name":"ID", "type":"string", "jsonPath":".status.externalId"}"#
)]
#[serde(rename_all = "camelCase")]
pub struct AlertChannelSpec {
    /// Channel type: email, slack, webhook, pagerduty, opsgenie, victorops, user
    #[serde(rename = "type")]
    pub channel_type: String,
    /// Type-specific settings passed through to New Relic
    #[serde(default)]
    pub configuration: BTreeMap<String, String>,
}
