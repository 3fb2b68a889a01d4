//! Command implementations.

pub mod check;
pub mod completions;
pub mod exclude;
pub mod history;
pub mod init;
pub mod pull;
pub mod push;
pub mod remote;
pub mod status;
pub mod version;

use crate::config::{Project, resolve_token};
use crate::error::{Error, Result};
use crate::github::GitHubClient;
use std::path::Path;
use tracing::debug;

/// Create a tokio runtime for a command's async work.
pub(crate) fn runtime() -> Result<tokio::runtime::Runtime> {
    tokio::runtime::Runtime::new().map_err(|e| Error::Other(format!("Failed to create async runtime: {e}")))
}

/// Client for the project's repository.
///
/// With `require_token`, a missing token is an error; otherwise the client
/// goes out anonymously, which only works for public repositories.
pub(crate) fn connect(project: &Project, token: Option<&str>, require_token: bool) -> Result<GitHubClient> {
    let token = resolve_token(token, &project.config);
    if token.is_none() {
        if require_token {
            return Err(Error::MissingToken);
        }
        debug!("No token configured, using anonymous access");
    }
    Ok(GitHubClient::new(project.config.client_settings(token))?)
}

/// Locate the project for a command.
pub(crate) fn open_project(explicit: Option<&Path>) -> Result<Project> {
    Project::discover(explicit)
}

/// Whether `path` equals `prefix` or lies under it.
pub(crate) fn matches_prefix(path: &str, prefix: &str) -> bool {
    let prefix = prefix.trim_end_matches('/');
    prefix.is_empty()
        || path == prefix
        || path.strip_prefix(prefix).is_some_and(|rest| rest.starts_with('/'))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_matches_prefix() {
        assert!(matches_prefix("Assets/Art/a.png", "Assets/Art"));
        assert!(matches_prefix("Assets/Art/a.png", "Assets/Art/"));
        assert!(matches_prefix("Assets/Art/a.png", "Assets/Art/a.png"));
        assert!(matches_prefix("Assets/Art/a.png", ""));
        assert!(!matches_prefix("Assets/Artwork/a.png", "Assets/Art"));
    }
}
