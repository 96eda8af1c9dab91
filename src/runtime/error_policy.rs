//! # Error Policy
//!
//! What happens when a reconcile returns `Err` (status could not be written)
//! and when the watch stream itself reports an error.

use crate::adapter::ManagedResource;
use crate::controller::reconciler::{Reconciler, ReconcilerError};
use crate::observability::metrics;
use kube::ResourceExt;
use kube_runtime::controller::Action;
use std::sync::Arc;
use std::time::Duration;
use tracing::{error, info, warn, Instrument};

/// Requeue a resource whose reconcile could not be persisted
///
/// Backoff state is tracked per resource so one failing resource does not
/// delay the others.
pub fn handle_reconciliation_error<R: ManagedResource>(
    obj: Arc<R>,
    error: &ReconcilerError,
    ctx: Arc<Reconciler>,
) -> Action {
    let kind = R::KIND.as_str();
    let name = obj.name_any();
    let namespace = obj.namespace().unwrap_or_default();

    let error_span = tracing::error_span!(
        "controller.reconciliation_error",
        resource.kind = kind,
        resource.name = name.as_str(),
        resource.namespace = namespace.as_str(),
        error = %error
    );
    let _guard = error_span.enter();

    error!("Reconciliation error for {}: {}", obj.identify(), error);
    metrics::increment_reconciliation_errors(kind, "kubernetes");

    let key = format!("{kind}/{namespace}/{name}");
    let delay = ctx.retry.next_delay(&key);
    info!(
        "Retrying in {}s (error count: {})",
        delay.as_secs(),
        ctx.retry.error_count(&key)
    );

    metrics::increment_requeues("error-backoff");
    Action::requeue(delay)
}

/// Broad category of a watch stream error
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WatchErrorKind {
    /// 401: RBAC revoked or token expired
    Unauthorized,
    /// 410: resource version too old; the watcher relists on its own
    Expired,
    /// 429 or storage reinitializing
    Throttled,
    /// 404: CRD missing or object deleted mid-watch
    NotFound,
    Other,
}

/// Classify a watch error from its debug rendering
///
/// Not-found is checked first: a plain-text 404 body surfaces as a decode
/// error that also mentions `WatchFailed`.
pub fn classify_watch_error(error: &str) -> WatchErrorKind {
    let is_not_found =
        error.contains("ObjectNotFound") || error.contains("404") || error.contains("not found");

    if is_not_found {
        WatchErrorKind::NotFound
    } else if error.contains("401") || error.contains("Unauthorized") {
        WatchErrorKind::Unauthorized
    } else if error.contains("410")
        || error.contains("too old resource version")
        || error.contains("Expired")
        || error.contains("Gone")
    {
        WatchErrorKind::Expired
    } else if error.contains("429")
        || error.contains("TooManyRequests")
        || error.contains("storage is (re)initializing")
    {
        WatchErrorKind::Throttled
    } else {
        WatchErrorKind::Other
    }
}

/// Log a watch stream error and pause when the error calls for it
pub async fn handle_watch_stream_error(kind: &str, error: &str, restart_delay: Duration) {
    let error_span = tracing::warn_span!("controller.watch.error", resource.kind = kind);
    async move {
        match classify_watch_error(error) {
            WatchErrorKind::Unauthorized => {
                error!(
                    "Watch for {} failed with 401 Unauthorized; check the operator's ClusterRole and ServiceAccount token",
                    kind
                );
                tokio::time::sleep(restart_delay).await;
            }
            WatchErrorKind::Expired => {
                warn!("Watch resource version for {} expired (410), relisting", kind);
            }
            WatchErrorKind::Throttled => {
                warn!(
                    "API server throttling the {} watch (429), backing off {}s",
                    kind,
                    restart_delay.as_secs()
                );
                tokio::time::sleep(restart_delay).await;
            }
            WatchErrorKind::NotFound => {
                warn!(
                    "{} not found (404); the CRD may be missing or the object was deleted: {}",
                    kind, error
                );
            }
            WatchErrorKind::Other => {
                error!("Controller stream error for {}: {}", kind, error);
                tokio::time::sleep(restart_delay).await;
            }
        }
    }
    .instrument(error_span)
    .await;
}
