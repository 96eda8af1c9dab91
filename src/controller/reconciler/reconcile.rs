//! # Reconcile
//!
//! Entry point handed to `kube-runtime`'s `Controller`, generic over every
//! managed kind. Errors returned from here go to the error policy in
//! [`crate::runtime::error_policy`].

use super::driver::{run_cycle, Transition};
use super::store::KubeStore;
use super::types::{Reconciler, ReconcilerError};
use crate::adapter::{ErrorClass, ManagedResource};
use crate::observability::metrics;
use kube::ResourceExt;
use kube_runtime::controller::Action;
use std::sync::Arc;
use std::time::Instant;
use tracing::{debug, info, Instrument};

/// Reconcile one resource of kind `R`
pub async fn reconcile<R: ManagedResource>(
    resource: Arc<R>,
    ctx: Arc<Reconciler>,
) -> Result<Action, ReconcilerError> {
    let kind = R::KIND.as_str();
    let name = resource.name_any();
    let namespace = resource.namespace().unwrap_or_default();

    let span = tracing::info_span!(
        "reconcile",
        resource.kind = kind,
        resource.name = name.as_str(),
        resource.namespace = namespace.as_str()
    );

    async move {
        let start = Instant::now();
        metrics::increment_reconciliations(kind);

        let store = KubeStore::new(ctx.client.clone());
        let mut working = (*resource).clone();
        let result = run_cycle(&mut working, ctx.api.as_ref(), &store).await;

        metrics::observe_reconciliation_duration(kind, start.elapsed().as_secs_f64());
        let transition = result?;
        metrics::record_transition(kind, transition.as_str());

        let key = format!("{kind}/{namespace}/{name}");
        Ok(ctx.next_action(kind, &key, &transition))
    }
    .instrument(span)
    .await
}

impl Reconciler {
    /// When the controller should look at this resource again
    pub fn next_action(&self, kind: &str, key: &str, transition: &Transition) -> Action {
        match transition {
            Transition::Deleted => {
                self.retry.reset(key);
                Action::await_change()
            }
            Transition::Created | Transition::Updated | Transition::Unchanged => {
                self.retry.reset(key);
                debug!(
                    "next resync in {}s",
                    self.config.resync_interval().as_secs()
                );
                Action::requeue(self.config.resync_interval())
            }
            Transition::Recreate => {
                metrics::increment_requeues("recreate");
                Action::requeue(self.config.recreate_requeue())
            }
            Transition::Failed(err) => {
                metrics::increment_reconciliation_errors(kind, err.class.as_str());
                // An invalid spec waits for an edit
                if err.class == ErrorClass::Validation {
                    metrics::increment_requeues("validation");
                    return Action::requeue(self.config.resync_interval());
                }
                let delay = self.retry.next_delay(key);
                info!(
                    "retrying in {}s (attempt {})",
                    delay.as_secs(),
                    self.retry.error_count(key).max(1)
                );
                metrics::increment_requeues("retry");
                Action::requeue(delay)
            }
        }
    }
}
