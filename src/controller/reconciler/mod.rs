//! # Reconciler
//!
//! The generic reconciliation engine shared by every managed kind.
//!
//! - `fingerprint`: spec digests for change detection
//! - `driver`: the create / update / delete / skip decision
//! - `store`: writing status and finalizers back to Kubernetes
//! - `reconcile`: the `Controller` entry point, spans, metrics and requeues
//! - `types`: context, errors and retry state

pub mod driver;
pub mod fingerprint;
pub mod reconcile;
pub mod store;
pub mod types;

pub use driver::{run_cycle, Transition};
pub use reconcile::reconcile;
pub use store::{KubeStore, ObjectStore};
pub use types::{BackoffState, Reconciler, ReconcilerError, RetryPolicy};
