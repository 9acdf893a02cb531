//! Upstream error classification

use std::time::Duration;

use thiserror::Error;

/// Errors reported by the upstream provider
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum UpstreamError {
    /// Rate limit exhausted; retry later
    #[error("rate limited (retry after {retry_after:?})")]
    RateLimited { retry_after: Option<Duration> },

    /// Credentials rejected
    #[error("authentication failed: {0}")]
    AuthFailed(String),

    /// Connection dropped or could not be established
    #[error("connection lost: {0}")]
    ConnectionLost(String),

    /// A single message could not be parsed; the connection is still usable
    #[error("malformed message: {0}")]
    Malformed(String),

    /// Anything else
    #[error("upstream error: {0}")]
    Other(String),
}

impl UpstreamError {
    /// True if the session should back off and reconnect
    pub fn is_recoverable(&self) -> bool {
        matches!(
            self,
            UpstreamError::RateLimited { .. } | UpstreamError::ConnectionLost(_)
        )
    }

    /// Retry hint carried by a rate-limit error
    pub fn retry_after(&self) -> Option<Duration> {
        match self {
            UpstreamError::RateLimited { retry_after } => *retry_after,
            _ => None,
        }
    }
}
