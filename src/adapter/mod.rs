//! # Resource Adapters
//!
//! One adapter per New Relic object kind. Each kind implements
//! [`ManagedResource`]: the kind-specific `remote_*` calls, plus the shared
//! bookkeeping (`create`, `update`, `delete`) that keeps [`SyncStatus`]
//! consistent no matter which kind is being synced.
//!
//! - `policy`: AlertPolicy and its channel links
//! - `channel`: AlertChannel (replace-on-change)
//! - `dashboard`: Dashboard documents
//! - `monitor`: synthetics monitors, scripts and alert conditions
//! - `label`: `category:name` labels
//! - `links`: channel name to id resolution

mod channel;
mod dashboard;
mod label;
pub mod links;
mod monitor;
mod policy;

pub use channel::validate_channel;
pub use dashboard::parse_dashboard;

use crate::controller::reconciler::fingerprint;
use crate::crd::SyncStatus;
use crate::newrelic::{ApiError, MonitoringApi};
use async_trait::async_trait;
use k8s_openapi::NamespaceResourceScope;
use kube::{Resource, ResourceExt};
use serde::de::DeserializeOwned;
use serde::Serialize;
use std::fmt::Debug;
use thiserror::Error;
use tracing::debug;

// ============================================================================
// Kinds
// ============================================================================

/// The closed set of kinds the operator manages
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ResourceKind {
    Policy,
    Channel,
    Dashboard,
    Monitor,
    Label,
}

impl ResourceKind {
    #[must_use]
    pub fn all() -> &'static [ResourceKind] {
        &[
            ResourceKind::Policy,
            ResourceKind::Channel,
            ResourceKind::Dashboard,
            ResourceKind::Monitor,
            ResourceKind::Label,
        ]
    }

    /// Custom resource kind name
    #[must_use]
    pub fn as_str(&self) -> &'static str {
        match self {
            ResourceKind::Policy => "AlertPolicy",
            ResourceKind::Channel => "AlertChannel",
            ResourceKind::Dashboard => "Dashboard",
            ResourceKind::Monitor => "Monitor",
            ResourceKind::Label => "Label",
        }
    }
}

impl std::fmt::Display for ResourceKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::str::FromStr for ResourceKind {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "policy" | "alertpolicy" => Ok(ResourceKind::Policy),
            "channel" | "alertchannel" => Ok(ResourceKind::Channel),
            "dashboard" => Ok(ResourceKind::Dashboard),
            "monitor" => Ok(ResourceKind::Monitor),
            "label" => Ok(ResourceKind::Label),
            other => Err(format!("unknown resource kind '{other}'")),
        }
    }
}

// ============================================================================
// Errors
// ============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorClass {
    /// The spec cannot be turned into a valid request; retrying will not help
    Validation,
    /// The remote object does not exist
    RemoteNotFound,
    /// Any other remote or transport failure
    RemoteTransient,
    /// The spec could not be serialized
    Serialization,
}

impl ErrorClass {
    #[must_use]
    pub fn as_str(&self) -> &'static str {
        match self {
            ErrorClass::Validation => "validation",
            ErrorClass::RemoteNotFound => "remote_not_found",
            ErrorClass::RemoteTransient => "remote_transient",
            ErrorClass::Serialization => "serialization",
        }
    }
}

/// Failure of a single adapter operation
#[derive(Debug, Clone, Error)]
#[error("{message}")]
pub struct SyncError {
    pub class: ErrorClass,
    pub message: String,
}

pub type SyncResult<T> = Result<T, SyncError>;

impl SyncError {
    pub fn validation(message: impl Into<String>) -> Self {
        Self {
            class: ErrorClass::Validation,
            message: message.into(),
        }
    }

    pub fn transient(message: impl Into<String>) -> Self {
        Self {
            class: ErrorClass::RemoteTransient,
            message: message.into(),
        }
    }

    #[must_use]
    pub fn is_not_found(&self) -> bool {
        self.class == ErrorClass::RemoteNotFound
    }

    /// Whether retrying with the same spec can succeed
    #[must_use]
    pub fn retryable(&self) -> bool {
        matches!(
            self.class,
            ErrorClass::RemoteTransient | ErrorClass::RemoteNotFound
        )
    }
}

impl From<ApiError> for SyncError {
    fn from(err: ApiError) -> Self {
        let class = if err.is_not_found() {
            ErrorClass::RemoteNotFound
        } else {
            ErrorClass::RemoteTransient
        };
        Self {
            class,
            message: err.to_string(),
        }
    }
}

impl From<serde_json::Error> for SyncError {
    fn from(err: serde_json::Error) -> Self {
        Self {
            class: ErrorClass::Serialization,
            message: format!("unable to serialize spec: {err}"),
        }
    }
}

/// Parse one of New Relic's numeric ids out of `status.externalId`
pub(crate) fn numeric_id(id: &str) -> SyncResult<i64> {
    id.trim()
        .parse()
        .map_err(|_| SyncError::validation(format!("external id '{id}' is not numeric")))
}

// ============================================================================
// Adapter contract
// ============================================================================

/// Result of a successful remote create or update
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Applied {
    /// Identifier of the remote object (may change on update)
    pub external_id: String,
    /// Extra detail for `status.info`, e.g. unresolved references
    pub note: Option<String>,
}

impl Applied {
    pub fn new(external_id: impl Into<String>) -> Self {
        Self {
            external_id: external_id.into(),
            note: None,
        }
    }

    #[must_use]
    pub fn with_note(mut self, note: Option<String>) -> Self {
        self.note = note;
        self
    }
}

/// What an update ended in
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UpdateOutcome {
    Updated,
    /// The remote object was gone; status was reset so the next cycle creates it
    Recreate,
}

/// Contract every synced kind satisfies
#[async_trait]
pub trait ManagedResource:
    Resource<DynamicType = (), Scope = NamespaceResourceScope>
    + Clone
    + Debug
    + Serialize
    + DeserializeOwned
    + Send
    + Sync
    + 'static
{
    const KIND: ResourceKind;

    type Spec: Serialize + Send + Sync;

    fn desired(&self) -> &Self::Spec;

    fn sync_status(&self) -> Option<&SyncStatus>;

    /// Mutable status, created empty on first access
    fn sync_status_mut(&mut self) -> &mut SyncStatus;

    async fn remote_create(&mut self, api: &dyn MonitoringApi) -> SyncResult<Applied>;

    async fn remote_update(&mut self, api: &dyn MonitoringApi, id: &str) -> SyncResult<Applied>;

    async fn remote_delete(&self, api: &dyn MonitoringApi, id: &str) -> SyncResult<()>;

    /// `"<Kind> <namespace>/<name>"`, for logs
    fn identify(&self) -> String {
        format!(
            "{} {}/{}",
            Self::KIND,
            self.namespace().unwrap_or_default(),
            self.name_any()
        )
    }

    fn external_id(&self) -> Option<&str> {
        self.sync_status()
            .and_then(|s| s.external_id.as_deref())
    }

    fn is_created(&self) -> bool {
        self.sync_status().is_some_and(SyncStatus::is_created)
    }

    fn has_changed(&self) -> bool {
        fingerprint::has_changed(
            self.desired(),
            self.sync_status().and_then(|s| s.fingerprint.as_deref()),
        )
    }

    /// Create the remote object and record its id and fingerprint
    async fn create(&mut self, api: &dyn MonitoringApi) -> SyncResult<()> {
        let digest = fingerprint::digest(self.desired())?;
        let applied = self.remote_create(api).await?;
        record_success(self.sync_status_mut(), "Created", applied, digest);
        Ok(())
    }

    /// Push the spec to the existing remote object
    ///
    /// A not-found answer is not an error: status forgets the remote object
    /// and the caller requeues so the next cycle creates it again.
    async fn update(&mut self, api: &dyn MonitoringApi) -> SyncResult<UpdateOutcome> {
        let Some(id) = self.external_id().map(str::to_string) else {
            self.create(api).await?;
            return Ok(UpdateOutcome::Updated);
        };
        let digest = fingerprint::digest(self.desired())?;

        match self.remote_update(api, &id).await {
            Ok(applied) => {
                record_success(self.sync_status_mut(), "Updated", applied, digest);
                Ok(UpdateOutcome::Updated)
            }
            Err(e) if e.is_not_found() => {
                let status = self.sync_status_mut();
                status.forget_remote();
                status.info = Some(format!("{id} no longer exists in New Relic, recreating"));
                Ok(UpdateOutcome::Recreate)
            }
            Err(e) => Err(e),
        }
    }

    /// Delete the remote object; absent or already-deleted objects are success
    async fn delete(&mut self, api: &dyn MonitoringApi) -> SyncResult<()> {
        if let Some(id) = self.external_id().map(str::to_string) {
            match self.remote_delete(api, &id).await {
                Ok(()) => {}
                Err(e) if e.is_not_found() => {
                    debug!(id = id.as_str(), "remote object already gone");
                }
                Err(e) => return Err(e),
            }
        }
        let status = self.sync_status_mut();
        status.forget_remote();
        status.info = Some("Deleted".to_string());
        Ok(())
    }
}

fn record_success(status: &mut SyncStatus, verb: &str, applied: Applied, digest: String) {
    status.external_id = Some(applied.external_id);
    status.fingerprint = Some(digest);
    status.info = Some(match applied.note {
        Some(note) => format!("{verb}; {note}"),
        None => verb.to_string(),
    });
    status.last_sync_time = Some(chrono::Utc::now().to_rfc3339());
}
