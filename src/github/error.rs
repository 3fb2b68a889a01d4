//! Errors from the hosting service.

use thiserror::Error;

/// Result type for host operations.
pub type ApiResult<T> = std::result::Result<T, ApiError>;

/// Failure of a single call against the hosting service.
///
/// `is_transient` drives the retry policy: only transient failures of
/// read-only calls are retried.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum ApiError {
    #[error("network error: {0}")]
    Transport(String),

    #[error("request timed out: {0}")]
    Timeout(String),

    #[error("rate limit exceeded{}", reset.map(|r| format!(" (resets at unix time {r})")).unwrap_or_default())]
    RateLimited { reset: Option<u64> },

    #[error("not found: {0}")]
    NotFound(String),

    #[error("authentication failed ({status}): {message}")]
    Unauthorized { status: u16, message: String },

    #[error("unexpected status {status}: {message}")]
    Status { status: u16, message: String },

    #[error("failed to decode response: {0}")]
    Decode(String),

    #[error("invalid URL: {0}")]
    InvalidUrl(String),
}

impl ApiError {
    /// Whether retrying the same idempotent request could succeed.
    #[must_use]
    pub const fn is_transient(&self) -> bool {
        match self {
            Self::Transport(_) | Self::Timeout(_) | Self::RateLimited { .. } => true,
            Self::Status { status, .. } => *status >= 500,
            Self::NotFound(_)
            | Self::Unauthorized { .. }
            | Self::Decode(_)
            | Self::InvalidUrl(_) => false,
        }
    }

    /// Whether the remote reported the target as missing.
    #[must_use]
    pub const fn is_not_found(&self) -> bool {
        matches!(self, Self::NotFound(_))
    }
}

impl From<reqwest::Error> for ApiError {
    fn from(err: reqwest::Error) -> Self {
        if err.is_timeout() {
            Self::Timeout(err.to_string())
        } else if err.is_decode() {
            Self::Decode(err.to_string())
        } else {
            Self::Transport(err.to_string())
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_transient_classification() {
        assert!(ApiError::Transport("reset".into()).is_transient());
        assert!(ApiError::Timeout("slow".into()).is_transient());
        assert!(ApiError::RateLimited { reset: None }.is_transient());
        assert!(ApiError::Status { status: 502, message: String::new() }.is_transient());

        assert!(!ApiError::Status { status: 422, message: String::new() }.is_transient());
        assert!(!ApiError::NotFound("x".into()).is_transient());
        assert!(!ApiError::Unauthorized { status: 401, message: String::new() }.is_transient());
    }

    #[test]
    fn test_rate_limit_message_includes_reset() {
        let err = ApiError::RateLimited { reset: Some(1_700_000_000) };
        assert!(err.to_string().contains("1700000000"));
        let err = ApiError::RateLimited { reset: None };
        assert_eq!(err.to_string(), "rate limit exceeded");
    }
}
