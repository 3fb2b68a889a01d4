//! Sync types shared by the detector and the pull/push engines.
//!
//! Every path in these types is a repository-relative POSIX path
//! (`Assets/Textures/hero.png`), never a local absolute path.

use serde::Serialize;

use crate::github::{ApiError, ContentEntry, EntryKind, TreeEntry};

// ── Detector ──────────────────────────────────────────────────

/// Outcome of a local scan.
#[derive(Debug, Default, Clone, PartialEq, Eq, Serialize)]
pub struct ScanResult {
    /// Files with no recorded digest.
    pub untracked: Vec<String>,
    /// Files whose digest differs from the recorded one.
    pub modified: Vec<String>,
    /// Sidecar metadata files paired with a changed asset.
    pub sidecars: Vec<String>,
    /// Files that could not be read; skipped.
    pub unreadable: Vec<FailedPath>,
}

impl ScanResult {
    /// Returns true if nothing needs pushing.
    #[must_use]
    pub fn is_clean(&self) -> bool {
        self.untracked.is_empty() && self.modified.is_empty() && self.sidecars.is_empty()
    }

    /// Changed files plus their sidecars, sorted and deduplicated.
    #[must_use]
    pub fn push_candidates(&self) -> Vec<String> {
        let mut paths: Vec<String> = self
            .untracked
            .iter()
            .chain(&self.modified)
            .chain(&self.sidecars)
            .cloned()
            .collect();
        paths.sort();
        paths.dedup();
        paths
    }
}

// ── Remote listing ────────────────────────────────────────────

/// A file or directory in the remote repository.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct RemoteEntry {
    pub path: String,
    pub kind: EntryKind,
    /// Git object id as reported by the host.
    pub sha: String,
    pub size: u64,
}

impl From<ContentEntry> for RemoteEntry {
    fn from(entry: ContentEntry) -> Self {
        Self {
            path: entry.path,
            kind: entry.kind,
            sha: entry.sha,
            size: entry.size,
        }
    }
}

/// Flattened remote tree.
#[derive(Debug, Default, Clone, Serialize)]
pub struct RemoteListing {
    /// Every file reached, sorted by path.
    pub files: Vec<RemoteEntry>,
    /// Directories whose listing failed; they contribute no files.
    pub failed: Vec<FailedPath>,
}

impl RemoteListing {
    /// Whether some subtree could not be enumerated.
    #[must_use]
    pub fn is_partial(&self) -> bool {
        !self.failed.is_empty()
    }
}

/// A path that could not be processed, with the reason.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct FailedPath {
    pub path: String,
    pub reason: String,
}

impl FailedPath {
    pub fn new(path: impl Into<String>, reason: impl ToString) -> Self {
        Self {
            path: path.into(),
            reason: reason.to_string(),
        }
    }
}

// ── Pull ──────────────────────────────────────────────────────

/// A remote file selected for download.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PullTarget {
    pub path: String,
    /// Remote blob id, when known from a listing. Enables skip-unchanged.
    pub remote_sha: Option<String>,
}

impl From<&RemoteEntry> for PullTarget {
    fn from(entry: &RemoteEntry) -> Self {
        Self {
            path: entry.path.clone(),
            remote_sha: Some(entry.sha.clone()),
        }
    }
}

impl From<String> for PullTarget {
    fn from(path: String) -> Self {
        Self {
            path,
            remote_sha: None,
        }
    }
}

impl From<&str> for PullTarget {
    fn from(path: &str) -> Self {
        Self::from(path.to_string())
    }
}

/// A file written by a pull, with the digest of the bytes written.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct PulledFile {
    pub path: String,
    pub digest: String,
}

/// Result of a pull.
#[derive(Debug, Default, Clone, Serialize)]
pub struct PullReport {
    /// Files downloaded and written, sorted by path.
    pub written: Vec<PulledFile>,
    /// Files skipped because the local copy already matched.
    pub unchanged: Vec<PulledFile>,
    /// Files that failed to download or write.
    pub failed: Vec<FailedPath>,
    /// Files never attempted because the pull was cancelled.
    pub not_started: Vec<String>,
    pub cancelled: bool,
}

impl PullReport {
    /// Whether every selected file was written or already current.
    #[must_use]
    pub fn is_complete(&self) -> bool {
        self.failed.is_empty() && self.not_started.is_empty() && !self.cancelled
    }
}

// ── Push ──────────────────────────────────────────────────────

/// The five sequential steps of a git-data push.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum PushStep {
    ResolveHead,
    CreateBlobs,
    CreateTree,
    CreateCommit,
    UpdateRef,
}

impl std::fmt::Display for PushStep {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::ResolveHead => write!(f, "resolve branch head"),
            Self::CreateBlobs => write!(f, "create blobs"),
            Self::CreateTree => write!(f, "create tree"),
            Self::CreateCommit => write!(f, "create commit"),
            Self::UpdateRef => write!(f, "update branch ref"),
        }
    }
}

/// A push that stopped before the branch ref moved.
#[derive(Debug, Clone, thiserror::Error)]
pub enum PushError {
    /// Every selected file was missing locally.
    #[error("nothing to push: none of the selected files exist locally")]
    NothingToPush,

    /// A step failed; later steps were not attempted.
    #[error("push failed at '{step}': {source}")]
    Step {
        step: PushStep,
        #[source]
        source: ApiError,
    },
}

impl PushError {
    /// The step at which the chain stopped.
    #[must_use]
    pub const fn step(&self) -> PushStep {
        match self {
            Self::NothingToPush => PushStep::CreateBlobs,
            Self::Step { step, .. } => *step,
        }
    }
}

/// Every object of one git-data push, in creation order.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct CommitDescriptor {
    pub parent_sha: String,
    pub base_tree_sha: String,
    pub entries: Vec<TreeEntry>,
    pub tree_sha: String,
    pub commit_sha: String,
}

/// A file included in a successful push.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct PushedFile {
    pub path: String,
    /// Content digest of the bytes uploaded.
    pub digest: String,
    pub blob_sha: String,
}

/// Result of a successful push.
#[derive(Debug, Clone, Serialize)]
pub struct PushReport {
    pub commit: CommitDescriptor,
    /// Uploaded files, sorted by path.
    pub pushed: Vec<PushedFile>,
    /// Selected files that were missing or unreadable.
    pub skipped: Vec<FailedPath>,
}

// ── Errors ────────────────────────────────────────────────────

/// Sync-specific errors.
#[derive(Debug, thiserror::Error)]
pub enum SyncError {
    /// IO error during file operations.
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// JSON serialization/deserialization error.
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// A state file exists but cannot be parsed.
    #[error("Corrupt state file {path}: {message}")]
    CorruptState { path: String, message: String },

    /// A repository path that cannot be mapped to a local file.
    #[error("Invalid repository path '{path}': {reason}")]
    InvalidPath { path: String, reason: String },

    /// Remote call failed.
    #[error("Remote error: {0}")]
    Api(#[from] ApiError),

    /// Push chain failed.
    #[error(transparent)]
    Push(#[from] PushError),
}

/// Result type for sync operations.
pub type SyncResult<T> = std::result::Result<T, SyncError>;
