//! # Logging
//!
//! `tracing` subscriber setup. `RUST_LOG` overrides the default filter;
//! `LOG_FORMAT=json` switches to structured output.

use tracing_subscriber::EnvFilter;

const DEFAULT_FILTER: &str = "newrelic_operator=info,kube=warn,hyper=warn,tower_http=info";

fn env_filter() -> EnvFilter {
    EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(DEFAULT_FILTER))
}

/// Install the global subscriber
///
/// Fails if a subscriber is already installed.
pub fn init_logging(format: &str) -> anyhow::Result<()> {
    let builder = tracing_subscriber::fmt().with_env_filter(env_filter());

    let result = if format.eq_ignore_ascii_case("json") {
        builder.json().with_current_span(true).try_init()
    } else {
        builder.with_target(true).try_init()
    };

    result.map_err(|e| anyhow::anyhow!("failed to install tracing subscriber: {e}"))
}
