//! # Custom Resource Definitions
//!
//! One custom resource per New Relic object kind, all in the
//! `newrelic.monitoring.io/v1alpha1` group. Every kind's status embeds
//! [`SyncStatus`], the engine-owned record of the last sync.

mod channel;
mod dashboard;
mod label;
mod monitor;
mod policy;

pub use channel::{AlertChannel, AlertChannelSpec};
pub use dashboard::{Dashboard, DashboardSpec, DashboardStatus};
pub use label::{Label, LabelSpec};
pub use monitor::{
    Monitor, MonitorCondition, MonitorOptions, MonitorScript, MonitorSpec, MonitorState,
    MonitorStatus,
};
pub use policy::{AlertPolicy, AlertPolicySpec, AlertPolicyStatus, IncidentPreference};

use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

/// Sync bookkeeping shared by every kind
///
/// `external_id` is present iff the remote object is believed to exist.
/// `fingerprint` is the spec digest at the last successful create or update
/// and is never touched by a failed operation.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize, Serialize, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct SyncStatus {
    /// Identifier of the corresponding New Relic object
    #[serde(default)]
    pub external_id: Option<String>,
    /// Outcome of the last operation, for humans only
    #[serde(default)]
    pub info: Option<String>,
    /// SHA-256 of the spec at the last successful sync
    #[serde(default)]
    pub fingerprint: Option<String>,
    /// Last successful remote write (RFC3339)
    #[serde(default)]
    pub last_sync_time: Option<String>,
}

impl SyncStatus {
    #[must_use]
    pub fn is_created(&self) -> bool {
        self.external_id.is_some()
    }

    /// Forget the remote object; the next reconcile takes the create path
    pub fn forget_remote(&mut self) {
        self.external_id = None;
        self.fingerprint = None;
    }
}
