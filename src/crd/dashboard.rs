//! # Dashboard
//!
//! A dashboard described by its raw New Relic JSON document.

use super::SyncStatus;
use kube::CustomResource;
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

/// Dashboard Custom Resource Definition
///
/// `data` holds the dashboard document exactly as the New Relic REST API
/// accepts it, either wrapped in `{"dashboard": {...}}` or bare.
#[derive(CustomResource, Debug, Clone, Default, PartialEq, Eq, Deserialize, Serialize, JsonSchema)]
#[kube(
    kind = "Dashboard",
    group = "newrelic.monitoring.io",
    version = "v1alpha1",
    namespaced,
    status = "DashboardStatus",
    shortname = "nrdash",
    printcolumn = r#"{"name":"Title", "type":"string", "jsonPath":".status.title"}"#,
    printcolumn = r#"{"name":"ID", "type":"string", "jsonPath":".status.externalId"}"#
)]
#[serde(rename_all = "camelCase")]
pub struct DashboardSpec {
    /// Dashboard JSON document
    pub data: String,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize, Serialize, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct DashboardStatus {
    #[serde(flatten)]
    pub sync: SyncStatus,
    /// Title of the dashboard as last synced
    #[serde(default)]
    pub title: Option<String>,
}
