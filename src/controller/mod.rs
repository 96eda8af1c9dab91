//! # Controller
//!
//! - `backoff`: Fibonacci backoff for retries
//! - `reconciler`: the reconciliation engine
//! - `server`: HTTP server for metrics and health checks

pub mod backoff;
pub mod reconciler;
pub mod server;
