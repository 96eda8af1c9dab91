//! New Relic Operator Library
//!
//! Keeps New Relic alert policies, notification channels, dashboards,
//! synthetic monitors and labels in sync with Kubernetes custom resources.
//!
//! ## Quick Start
//!
//! ```rust
//! use newrelic_operator::prelude::*;
//! ```
//!
//! This brings commonly used types and traits into scope. For more specific imports,
//! use the individual modules.

pub mod adapter;
pub mod config;
pub mod constants;
pub mod controller;
pub mod crd;
pub mod newrelic;
pub mod observability;
pub mod prelude;
pub mod runtime;
