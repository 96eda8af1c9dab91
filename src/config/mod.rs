//! # Configuration
//!
//! Environment-driven configuration for the operator and its New Relic client.

mod controller;
mod newrelic;

pub use controller::{ControllerConfig, RetryStrategy};
pub use newrelic::{NewRelicConfig, NewRelicConfigError};
