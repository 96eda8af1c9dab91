//! # Driver
//!
//! One pass of the decision algorithm over a single resource:
//!
//! 1. Deletion requested: delete remotely, then release the finalizer
//! 2. Created and unchanged: nothing to do
//! 3. Created and changed: update
//! 4. Not created: create, then attach the finalizer
//!
//! Status is written back on every pass, whatever the outcome.

use super::store::ObjectStore;
use super::types::ReconcilerError;
use crate::adapter::{ManagedResource, SyncError, UpdateOutcome};
use crate::constants::FINALIZER;
use crate::newrelic::MonitoringApi;
use kube::ResourceExt;
use tracing::{debug, info, warn};

/// Outcome of one driver pass
#[derive(Debug, Clone)]
pub enum Transition {
    /// Remote object deleted (or already absent), finalizer released
    Deleted,
    Created,
    Updated,
    /// Spec matches the last sync; no remote call was made
    Unchanged,
    /// The remote object vanished; status was reset for a fresh create
    Recreate,
    Failed(SyncError),
}

impl Transition {
    #[must_use]
    pub fn as_str(&self) -> &'static str {
        match self {
            Transition::Deleted => "deleted",
            Transition::Created => "created",
            Transition::Updated => "updated",
            Transition::Unchanged => "unchanged",
            Transition::Recreate => "recreate",
            Transition::Failed(_) => "failed",
        }
    }
}

pub fn has_finalizer<R: ResourceExt>(resource: &R) -> bool {
    resource.finalizers().iter().any(|f| f == FINALIZER)
}

/// Returns true when the finalizer was added
pub fn add_finalizer<R: ResourceExt>(resource: &mut R) -> bool {
    if has_finalizer(resource) {
        return false;
    }
    resource.finalizers_mut().push(FINALIZER.to_string());
    true
}

/// Returns true when the finalizer was removed
pub fn remove_finalizer<R: ResourceExt>(resource: &mut R) -> bool {
    let before = resource.finalizers().len();
    resource.finalizers_mut().retain(|f| f != FINALIZER);
    resource.finalizers().len() != before
}

/// Run the decision algorithm once and persist the result
///
/// Adapter failures are not errors here: they end in
/// [`Transition::Failed`] with the message recorded in `status.info`.
/// Only a failure to persist is returned as `Err`.
pub async fn run_cycle<R: ManagedResource>(
    resource: &mut R,
    api: &dyn MonitoringApi,
    store: &dyn ObjectStore<R>,
) -> Result<Transition, ReconcilerError> {
    let had_finalizer = has_finalizer(resource);

    let (operation, transition) = if resource.meta().deletion_timestamp.is_some() {
        let transition = match resource.delete(api).await {
            Ok(()) => {
                remove_finalizer(resource);
                Transition::Deleted
            }
            Err(e) => Transition::Failed(e),
        };
        ("Delete", transition)
    } else if resource.is_created() {
        if !resource.has_changed() {
            debug!("{} is up to date", resource.identify());
            add_finalizer(resource);
            ("Sync", Transition::Unchanged)
        } else {
            let transition = match resource.update(api).await {
                Ok(UpdateOutcome::Updated) => {
                    add_finalizer(resource);
                    Transition::Updated
                }
                Ok(UpdateOutcome::Recreate) => Transition::Recreate,
                Err(e) => Transition::Failed(e),
            };
            ("Update", transition)
        }
    } else {
        let transition = match resource.create(api).await {
            Ok(()) => {
                add_finalizer(resource);
                Transition::Created
            }
            Err(e) => Transition::Failed(e),
        };
        ("Create", transition)
    };

    match &transition {
        Transition::Failed(err) => {
            warn!(
                class = err.class.as_str(),
                "{} {} failed: {}",
                operation,
                resource.identify(),
                err
            );
            resource.sync_status_mut().info = Some(format!("{operation} failed: {err}"));
        }
        Transition::Unchanged => {}
        other => info!("{} {}", resource.identify(), other.as_str()),
    }

    // Status first: once the finalizer is gone the object may disappear.
    store.save_status(resource).await?;
    if has_finalizer(resource) != had_finalizer {
        store.save_finalizers(resource).await?;
    }

    Ok(transition)
}
