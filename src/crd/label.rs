//! # Label
//!
//! A `category:name` label applied to applications and servers.

use super::SyncStatus;
use kube::CustomResource;
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

/// Label Custom Resource Definition
///
/// The remote key is `"{category}:{name}"`; `name` defaults to the resource name.
#[derive(CustomResource, Debug, Clone, Default, PartialEq, Eq, Deserialize, Serialize, JsonSchema)]
#[kube(
    kind = "Label",
    group = "newrelic.monitoring.io",
    version = "v1alpha1",
    namespaced,
    status = "SyncStatus",
    shortname = "nrlabel",
    printcolumn = r#"{"name":"Key", "type":"string", "jsonPath":".status.externalId"}"#
)]
#[serde(rename_all = "camelCase")]
pub struct LabelSpec {
    pub category: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    /// Application ids the label is attached to
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub applications: Vec<i64>,
    /// Server ids the label is attached to
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub servers: Vec<i64>,
}
