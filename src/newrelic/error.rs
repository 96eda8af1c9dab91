//! # API Errors
//!
//! Failures at the New Relic RPC boundary.

use thiserror::Error;

pub type ApiResult<T> = Result<T, ApiError>;

#[derive(Debug, Error)]
pub enum ApiError {
    /// New Relic answered with a non-2xx status
    #[error("newrelic api returned {status}: {body}")]
    Status { status: u16, body: String },
    /// The request never produced a response (connect, TLS, timeout)
    #[error("newrelic api request failed: {0}")]
    Transport(#[from] reqwest::Error),
    /// The response body did not have the expected shape
    #[error("unable to decode newrelic response: {0}")]
    Decode(String),
    /// A response was missing a field we rely on
    #[error("newrelic response is missing {0}")]
    MissingField(&'static str),
    #[error("invalid newrelic url: {0}")]
    InvalidUrl(String),
}

impl ApiError {
    /// HTTP status, when New Relic answered at all
    #[must_use]
    pub fn status(&self) -> Option<u16> {
        match self {
            ApiError::Status { status, .. } => Some(*status),
            ApiError::Transport(e) => e.status().map(|s| s.as_u16()),
            _ => None,
        }
    }

    #[must_use]
    pub fn is_not_found(&self) -> bool {
        self.status() == Some(404)
    }
}
