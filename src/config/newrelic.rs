//! # New Relic Client Configuration
//!
//! Endpoint and credential settings for the remote API client.

use crate::constants::{DEFAULT_API_URL, DEFAULT_REMOTE_TIMEOUT_SECS, DEFAULT_SYNTHETICS_URL};
use std::time::Duration;
use thiserror::Error;

#[derive(Debug, Error, PartialEq, Eq)]
pub enum NewRelicConfigError {
    #[error("NEW_RELIC_APIKEY is not set")]
    MissingApiKey,
}

/// Settings for [`crate::newrelic::NewRelicClient`]
#[derive(Clone)]
pub struct NewRelicConfig {
    /// Admin or user API key, sent as `X-Api-Key`
    pub api_key: String,
    /// REST v2 base URL (policies, channels, dashboards, labels)
    pub api_url: String,
    /// Synthetics v3 base URL (monitors)
    pub synthetics_url: String,
    /// Deadline for each individual HTTP request
    pub timeout: Duration,
}

impl std::fmt::Debug for NewRelicConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("NewRelicConfig")
            .field("api_key", &"***")
            .field("api_url", &self.api_url)
            .field("synthetics_url", &self.synthetics_url)
            .field("timeout", &self.timeout)
            .finish()
    }
}

impl NewRelicConfig {
    /// Load from `NEW_RELIC_APIKEY`, `NEW_RELIC_API_URL`, `NEW_RELIC_SYNTHETICS_URL`
    /// and `REMOTE_TIMEOUT_SECS`
    pub fn from_env() -> Result<Self, NewRelicConfigError> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    pub fn from_lookup(
        lookup: impl Fn(&str) -> Option<String>,
    ) -> Result<Self, NewRelicConfigError> {
        let api_key = lookup("NEW_RELIC_APIKEY")
            .or_else(|| lookup("NEW_RELIC_API_KEY"))
            .map(|k| k.trim().to_string())
            .filter(|k| !k.is_empty())
            .ok_or(NewRelicConfigError::MissingApiKey)?;

        let timeout_secs = lookup("REMOTE_TIMEOUT_SECS")
            .and_then(|v| v.trim().parse().ok())
            .unwrap_or(DEFAULT_REMOTE_TIMEOUT_SECS);

        Ok(Self {
            api_key,
            api_url: trim_base(lookup("NEW_RELIC_API_URL").as_deref().unwrap_or(DEFAULT_API_URL)),
            synthetics_url: trim_base(
                lookup("NEW_RELIC_SYNTHETICS_URL")
                    .as_deref()
                    .unwrap_or(DEFAULT_SYNTHETICS_URL),
            ),
            timeout: Duration::from_secs(timeout_secs),
        })
    }

    /// Config pointing both endpoints at one base URL (mock servers)
    pub fn for_base_url(api_key: &str, base_url: &str) -> Self {
        Self {
            api_key: api_key.to_string(),
            api_url: trim_base(base_url),
            synthetics_url: trim_base(base_url),
            timeout: Duration::from_secs(DEFAULT_REMOTE_TIMEOUT_SECS),
        }
    }
}

fn trim_base(url: &str) -> String {
    url.trim().trim_end_matches('/').to_string()
}
