//! Version file handling.
//!
//! The version file is plain text: the version label on its first
//! non-empty line, optionally followed by release notes. A push writes it
//! as `"{version}\n\nWhat's New:\n{notes}"`.

use std::path::PathBuf;

use serde::Serialize;
use tracing::debug;

use crate::github::{ApiResult, GitHost};
use crate::sync::file::atomic_write;
use crate::sync::layout::PathLayout;
use crate::sync::types::SyncResult;

/// Default repository path of the version file.
pub const DEFAULT_VERSION_FILE: &str = "Assets/version.txt";

/// Outcome of comparing the local and remote version files.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum VersionStatus {
    /// Both sides carry the same label.
    UpToDate { version: String },
    /// The remote label differs from the local one (or there is no local file).
    UpdateAvailable { local: Option<String>, remote: String },
    /// The remote ref has no version file, or an empty one.
    RemoteMissing { local: Option<String> },
}

/// Version label of a version file's text.
#[must_use]
pub fn parse_version(text: &str) -> Option<String> {
    text.lines()
        .map(str::trim)
        .find(|line| !line.is_empty())
        .map(ToString::to_string)
}

/// Version file content as a push writes it.
#[must_use]
pub fn version_file_content(version: &str, notes: &str) -> String {
    format!("{version}\n\nWhat's New:\n{notes}")
}

/// Local version label. `Ok(None)` when the file does not exist.
///
/// # Errors
///
/// Returns an error if the path is invalid or the file exists but cannot be read.
pub fn read_local_version(layout: &PathLayout, version_file: &str) -> SyncResult<Option<String>> {
    let path = layout.local_path(version_file)?;
    match std::fs::read_to_string(&path) {
        Ok(text) => Ok(parse_version(&text)),
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(None),
        Err(e) => Err(e.into()),
    }
}

/// Write the local version file and return its path.
///
/// # Errors
///
/// Returns an error if the path is invalid or the write fails.
pub fn write_version_file(
    layout: &PathLayout,
    version_file: &str,
    version: &str,
    notes: &str,
) -> SyncResult<PathBuf> {
    let path = layout.local_path(version_file)?;
    atomic_write(&path, version_file_content(version, notes).as_bytes())?;
    debug!(path = %path.display(), version, "Version file written");
    Ok(path)
}

/// Remote version label at `git_ref`. `Ok(None)` when the file is absent.
///
/// # Errors
///
/// Any failure other than "not found" is returned as is; it is never
/// folded into an absent version.
pub async fn remote_version<H: GitHost>(host: &H, git_ref: &str, version_file: &str) -> ApiResult<Option<String>> {
    match host.download_raw(git_ref, version_file).await {
        Ok(bytes) => Ok(parse_version(&String::from_utf8_lossy(&bytes))),
        Err(e) if e.is_not_found() => Ok(None),
        Err(e) => Err(e),
    }
}

/// Compare the local version file with the one at `git_ref`.
///
/// # Errors
///
/// Returns an error on network failure or when the local file cannot be
/// read.
pub async fn check_version<H: GitHost>(
    host: &H,
    git_ref: &str,
    layout: &PathLayout,
    version_file: &str,
) -> SyncResult<VersionStatus> {
    let local = read_local_version(layout, version_file)?;
    let status = match remote_version(host, git_ref, version_file).await? {
        None => VersionStatus::RemoteMissing { local },
        Some(remote) if local.as_deref() == Some(remote.as_str()) => VersionStatus::UpToDate { version: remote },
        Some(remote) => VersionStatus::UpdateAvailable { local, remote },
    };
    debug!(?status, "Version check");
    Ok(status)
}
