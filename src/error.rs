//! Error types for the assetsync CLI.
//!
//! Provides structured error handling with:
//! - Machine-readable error codes (`ErrorCode`)
//! - Category-based exit codes (2=state, 3=not_found, 4=validation, etc.)
//! - Retryability flags for scripted callers
//! - Context-aware recovery hints
//! - Structured JSON output for piped / non-TTY consumers

use std::path::PathBuf;
use thiserror::Error;

use crate::github::ApiError;
use crate::sync::{PushError, SyncError};

/// Result type alias for assetsync operations.
pub type Result<T> = std::result::Result<T, Error>;

// ── Error Code ────────────────────────────────────────────────

/// Machine-readable error codes grouped by category.
///
/// Each code maps to a SCREAMING_SNAKE string and a category-based
/// exit code. Scripts match on the string or the exit code.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorCode {
    // Local state (exit 2)
    NotInitialized,
    AlreadyInitialized,
    CorruptState,

    // Not Found (exit 3)
    RemoteNotFound,

    // Validation (exit 4)
    InvalidArgument,
    InvalidPath,

    // Push chain (exit 5)
    NothingToPush,
    PushFailed,

    // Sync (exit 6)
    PullIncomplete,
    Cancelled,

    // Config (exit 7)
    ConfigError,
    MissingToken,

    // I/O (exit 8)
    IoError,
    JsonError,

    // Remote service (exit 9)
    NetworkError,
    RateLimited,
    Unauthorized,

    // Internal (exit 1)
    InternalError,
}

impl ErrorCode {
    /// Machine-readable SCREAMING_SNAKE code string.
    #[must_use]
    pub const fn as_str(&self) -> &str {
        match self {
            Self::NotInitialized => "NOT_INITIALIZED",
            Self::AlreadyInitialized => "ALREADY_INITIALIZED",
            Self::CorruptState => "CORRUPT_STATE",
            Self::RemoteNotFound => "REMOTE_NOT_FOUND",
            Self::InvalidArgument => "INVALID_ARGUMENT",
            Self::InvalidPath => "INVALID_PATH",
            Self::NothingToPush => "NOTHING_TO_PUSH",
            Self::PushFailed => "PUSH_FAILED",
            Self::PullIncomplete => "PULL_INCOMPLETE",
            Self::Cancelled => "CANCELLED",
            Self::ConfigError => "CONFIG_ERROR",
            Self::MissingToken => "MISSING_TOKEN",
            Self::IoError => "IO_ERROR",
            Self::JsonError => "JSON_ERROR",
            Self::NetworkError => "NETWORK_ERROR",
            Self::RateLimited => "RATE_LIMITED",
            Self::Unauthorized => "UNAUTHORIZED",
            Self::InternalError => "INTERNAL_ERROR",
        }
    }

    /// Category-based exit code (1-9).
    #[must_use]
    pub const fn exit_code(&self) -> u8 {
        match self {
            Self::InternalError => 1,
            Self::NotInitialized | Self::AlreadyInitialized | Self::CorruptState => 2,
            Self::RemoteNotFound => 3,
            Self::InvalidArgument | Self::InvalidPath => 4,
            Self::NothingToPush | Self::PushFailed => 5,
            Self::PullIncomplete | Self::Cancelled => 6,
            Self::ConfigError | Self::MissingToken => 7,
            Self::IoError | Self::JsonError => 8,
            Self::NetworkError | Self::RateLimited | Self::Unauthorized => 9,
        }
    }

    /// Whether running the same command again may succeed.
    ///
    /// True for transient remote failures and for a push chain that
    /// stopped part-way (the whole chain is safe to re-run). False for
    /// validation, configuration and local state errors.
    #[must_use]
    pub const fn is_retryable(&self) -> bool {
        matches!(
            self,
            Self::NetworkError | Self::RateLimited | Self::PushFailed | Self::PullIncomplete
        )
    }
}

// ── Error Enum ────────────────────────────────────────────────

/// Errors that can occur in assetsync operations.
#[derive(Error, Debug)]
pub enum Error {
    #[error("Not initialized: run `assetsync init` first")]
    NotInitialized,

    #[error("Already initialized at {path}")]
    AlreadyInitialized { path: PathBuf },

    #[error("No access token configured")]
    MissingToken,

    #[error("Remote error: {0}")]
    Api(#[from] ApiError),

    #[error(transparent)]
    Push(#[from] PushError),

    #[error("Pull incomplete: {failed} of {total} files failed")]
    PullIncomplete { failed: usize, total: usize },

    #[error("Cancelled: {completed} of {total} files pulled before stopping")]
    Cancelled { completed: usize, total: usize },

    #[error("Corrupt state file {path}: {message}")]
    CorruptState { path: String, message: String },

    #[error("Invalid repository path '{path}': {reason}")]
    InvalidPath { path: String, reason: String },

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("Invalid argument: {0}")]
    InvalidArgument(String),

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("{0}")]
    Other(String),
}

impl From<SyncError> for Error {
    fn from(err: SyncError) -> Self {
        match err {
            SyncError::Io(e) => Self::Io(e),
            SyncError::Json(e) => Self::Json(e),
            SyncError::Api(e) => Self::Api(e),
            SyncError::Push(e) => Self::Push(e),
            SyncError::CorruptState { path, message } => Self::CorruptState { path, message },
            SyncError::InvalidPath { path, reason } => Self::InvalidPath { path, reason },
        }
    }
}

impl Error {
    /// Map this error to its structured `ErrorCode`.
    #[must_use]
    pub const fn error_code(&self) -> ErrorCode {
        match self {
            Self::NotInitialized => ErrorCode::NotInitialized,
            Self::AlreadyInitialized { .. } => ErrorCode::AlreadyInitialized,
            Self::MissingToken => ErrorCode::MissingToken,
            Self::Api(e) => api_code(e),
            Self::Push(PushError::NothingToPush) => ErrorCode::NothingToPush,
            Self::Push(PushError::Step { .. }) => ErrorCode::PushFailed,
            Self::PullIncomplete { .. } => ErrorCode::PullIncomplete,
            Self::Cancelled { .. } => ErrorCode::Cancelled,
            Self::CorruptState { .. } => ErrorCode::CorruptState,
            Self::InvalidPath { .. } => ErrorCode::InvalidPath,
            Self::Io(_) => ErrorCode::IoError,
            Self::Json(_) => ErrorCode::JsonError,
            Self::InvalidArgument(_) => ErrorCode::InvalidArgument,
            Self::Config(_) => ErrorCode::ConfigError,
            Self::Other(_) => ErrorCode::InternalError,
        }
    }

    /// Category-based exit code, delegating to the `ErrorCode`.
    #[must_use]
    pub const fn exit_code(&self) -> u8 {
        self.error_code().exit_code()
    }

    /// Context-aware recovery hint.
    ///
    /// Returns `None` if no actionable suggestion exists.
    #[must_use]
    pub fn hint(&self) -> Option<String> {
        match self {
            Self::NotInitialized => Some(
                "Run `assetsync init --owner <owner> --repo <repo>` in the project root".to_string(),
            ),

            Self::AlreadyInitialized { path } => Some(format!(
                "Configuration already exists at {}. Use `--force` to overwrite it.",
                path.display()
            )),

            Self::MissingToken => Some(
                "Pass --token, set ASSETSYNC_TOKEN or GITHUB_TOKEN, or add \"token\" to \
                 .assetsync/config.json"
                    .to_string(),
            ),

            Self::Api(ApiError::RateLimited { reset: Some(reset) }) => Some(format!(
                "Rate limit resets at unix time {reset}. Authenticated requests get a higher limit."
            )),
            Self::Api(ApiError::RateLimited { reset: None }) => {
                Some("Wait a few minutes and try again.".to_string())
            }
            Self::Api(ApiError::Unauthorized { .. }) => Some(
                "Check that the token is valid and has `contents: write` access to the repository."
                    .to_string(),
            ),
            Self::Api(ApiError::NotFound(_)) => Some(
                "Check owner, repo and branch in .assetsync/config.json. Private repositories \
                 report 404 when the token lacks access."
                    .to_string(),
            ),

            Self::Push(PushError::NothingToPush) => {
                Some("Run `assetsync status` to see which files changed.".to_string())
            }
            Self::Push(PushError::Step { .. }) => Some(
                "The branch was not changed. Re-run `assetsync push` to retry the whole chain."
                    .to_string(),
            ),

            Self::PullIncomplete { .. } => Some(
                "Files that failed were left untouched. Re-run `assetsync pull` for the failed paths."
                    .to_string(),
            ),

            Self::CorruptState { path, .. } => Some(format!(
                "Fix or remove {path}. It is never overwritten automatically."
            )),

            Self::InvalidPath { .. } => Some(
                "Repository paths are relative, '/'-separated, with no '.' or '..' segments."
                    .to_string(),
            ),

            Self::Api(_)
            | Self::Cancelled { .. }
            | Self::Io(_)
            | Self::Json(_)
            | Self::InvalidArgument(_)
            | Self::Config(_)
            | Self::Other(_) => None,
        }
    }

    /// Structured JSON representation for machine consumption.
    ///
    /// Includes error code, message, retryability, exit code, and
    /// optional recovery hint.
    #[must_use]
    pub fn to_structured_json(&self) -> serde_json::Value {
        let code = self.error_code();
        let mut obj = serde_json::json!({
            "error": {
                "code": code.as_str(),
                "message": self.to_string(),
                "retryable": code.is_retryable(),
                "exit_code": code.exit_code(),
            }
        });

        if let Self::Push(err) = self {
            obj["error"]["step"] = serde_json::json!(err.step());
        }

        if let Some(hint) = self.hint() {
            obj["error"]["hint"] = serde_json::Value::String(hint);
        }

        obj
    }
}

const fn api_code(err: &ApiError) -> ErrorCode {
    match err {
        ApiError::NotFound(_) => ErrorCode::RemoteNotFound,
        ApiError::RateLimited { .. } => ErrorCode::RateLimited,
        ApiError::Unauthorized { .. } => ErrorCode::Unauthorized,
        ApiError::InvalidUrl(_) => ErrorCode::ConfigError,
        ApiError::Transport(_) | ApiError::Timeout(_) | ApiError::Status { .. } | ApiError::Decode(_) => {
            ErrorCode::NetworkError
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::sync::PushStep;

    #[test]
    fn test_sync_errors_are_flattened() {
        let err: Error = SyncError::Api(ApiError::Timeout("slow".into())).into();
        assert!(matches!(err, Error::Api(ApiError::Timeout(_))));
        assert_eq!(err.error_code(), ErrorCode::NetworkError);
        assert!(err.error_code().is_retryable());

        let err: Error = SyncError::CorruptState {
            path: "history.json".into(),
            message: "bad".into(),
        }
        .into();
        assert_eq!(err.exit_code(), 2);
    }

    #[test]
    fn test_push_error_json_names_step() {
        let err = Error::Push(PushError::Step {
            step: PushStep::CreateTree,
            source: ApiError::Status {
                status: 422,
                message: "bad tree".into(),
            },
        });
        let json = err.to_structured_json();
        assert_eq!(json["error"]["code"], "PUSH_FAILED");
        assert_eq!(json["error"]["step"], "create_tree");
        assert_eq!(json["error"]["exit_code"], 5);
        assert_eq!(json["error"]["retryable"], true);
        assert!(json["error"]["hint"].is_string());
    }

    #[test]
    fn test_not_found_and_auth_codes() {
        assert_eq!(
            Error::Api(ApiError::NotFound("x".into())).error_code(),
            ErrorCode::RemoteNotFound
        );
        let unauthorized = Error::Api(ApiError::Unauthorized {
            status: 401,
            message: "Bad credentials".into(),
        });
        assert_eq!(unauthorized.exit_code(), 9);
        assert!(!unauthorized.error_code().is_retryable());
        assert_eq!(Error::MissingToken.error_code().as_str(), "MISSING_TOKEN");
    }
}
