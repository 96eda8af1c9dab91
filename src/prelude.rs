//! # Prelude
//!
//! Re-exports commonly used types and traits.
//!
//! ```rust
//! use newrelic_operator::prelude::*;
//! ```

// CRD types
pub use crate::crd::*;

// Adapter contract
pub use crate::adapter::{
    Applied, ErrorClass, ManagedResource, ResourceKind, SyncError, SyncResult, UpdateOutcome,
};

// Remote API
pub use crate::newrelic::{ApiError, ApiResult, MonitoringApi, NewRelicClient};

// Reconciler types
pub use crate::controller::reconciler::{
    reconcile, run_cycle, ObjectStore, Reconciler, ReconcilerError, Transition,
};

// Config types
pub use crate::config::{ControllerConfig, NewRelicConfig, RetryStrategy};
