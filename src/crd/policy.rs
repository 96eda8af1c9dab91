//! # AlertPolicy
//!
//! An alert policy and the notification channels it pages.

use super::SyncStatus;
use kube::CustomResource;
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

/// AlertPolicy Custom Resource Definition
///
/// # Example
///
/// ```yaml
/// apiVersion: newrelic.monitoring.io/v1alpha1
/// kind: AlertPolicy
/// metadata:
///   name: checkout-latency
/// spec:
///   incidentPreference: PER_CONDITION
///   channels:
///     - ops-slack
///     - ops-email
/// ```
#[derive(CustomResource, Debug, Clone, Default, PartialEq, Deserialize, Serialize, JsonSchema)]
#[kube(
    kind = "AlertPolicy",
    group = "newrelic.monitoring.io",
    version = "v1alpha1",
    namespaced,
    status = "AlertPolicyStatus",
    shortname = "nrpolicy",
    printcolumn = r#"{"name":"ID", "type":"string", "jsonPath":".status.externalId"}"#,
    printcolumn = r#"{"name":"Info", "type":"string", "jsonPath":".status.info"}"#
)]
#[serde(rename_all = "camelCase")]
pub struct AlertPolicySpec {
    /// How incidents are rolled up; defaults to PER_POLICY
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub incident_preference: Option<IncidentPreference>,
    /// Names of AlertChannels to attach, resolved against New Relic by exact name
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub channels: Vec<String>,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize, Serialize, JsonSchema)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum IncidentPreference {
    #[default]
    PerPolicy,
    PerCondition,
    PerConditionAndTarget,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize, Serialize, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct AlertPolicyStatus {
    #[serde(flatten)]
    pub sync: SyncStatus,
    /// Channel ids associated with the policy at the last sync, in reference order
    #[serde(default)]
    pub linked_channels: Vec<i64>,
    /// Channel names that did not resolve at the last sync
    #[serde(default)]
    pub unresolved_channels: Vec<String>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_incident_preference_wire_format() {
        let spec: AlertPolicySpec = serde_json::from_value(serde_json::json!({
            "incidentPreference": "PER_CONDITION_AND_TARGET",
            "channels": ["a"]
        }))
        .unwrap();
        assert_eq!(
            spec.incident_preference,
            Some(IncidentPreference::PerConditionAndTarget)
        );
        assert_eq!(spec.channels, vec!["a".to_string()]);
    }

    #[test]
    fn test_status_flattens_sync_fields() {
        let status: AlertPolicyStatus = serde_json::from_value(serde_json::json!({
            "externalId": "7",
            "fingerprint": "f",
            "linkedChannels": [1, 2]
        }))
        .unwrap();
        assert_eq!(status.sync.external_id.as_deref(), Some("7"));
        assert_eq!(status.linked_channels, vec![1, 2]);
        assert!(status.unresolved_channels.is_empty());
    }
}
