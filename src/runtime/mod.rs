//! # Runtime
//!
//! Process wiring around the reconciliation engine.
//!
//! - `initialization`: startup sequence
//! - `watch_loop`: one controller per enabled kind
//! - `error_policy`: requeue and watch error handling
//! - `cleanup`: optional startup dashboard sweep

pub mod cleanup;
pub mod error_policy;
pub mod initialization;
pub mod watch_loop;

pub use initialization::{initialize, InitializationResult};
pub use watch_loop::run_watch_loops;
