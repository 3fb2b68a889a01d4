//! Mapping between repository paths and local files.
//!
//! A project has one primary working tree, the assets directory
//! (`<project>/Assets`), and a few sibling directories that live directly
//! under the project root (`ProjectSettings`, `Packages`). Repository paths
//! are relative to the project root:
//!
//! - `Assets/...`, `ProjectSettings/...`, `Packages/...` resolve under the
//!   project root
//! - anything else resolves under the assets directory
//!
//! Every file under the assets directory may carry a `.meta` sidecar.

use std::path::{Component, Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::sync::types::{SyncError, SyncResult};

/// Extension of sidecar metadata files.
pub const SIDECAR_EXTENSION: &str = "meta";

/// Which physical root a tracked file resolves under.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LocalRoot {
    /// The assets directory (files here may have sidecars).
    Assets,
    /// The project root (settings, package manifests).
    Project,
}

/// Local project layout.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PathLayout {
    project_root: PathBuf,
    assets_dir: String,
    project_dirs: Vec<String>,
}

impl PathLayout {
    /// Layout rooted at `project_root` with the given directory names.
    pub fn new(
        project_root: impl Into<PathBuf>,
        assets_dir: impl Into<String>,
        project_dirs: Vec<String>,
    ) -> Self {
        Self {
            project_root: project_root.into(),
            assets_dir: assets_dir.into(),
            project_dirs,
        }
    }

    /// Unity's conventional layout.
    pub fn unity(project_root: impl Into<PathBuf>) -> Self {
        Self::new(
            project_root,
            "Assets",
            vec!["ProjectSettings".to_string(), "Packages".to_string()],
        )
    }

    #[must_use]
    pub fn project_root(&self) -> &Path {
        &self.project_root
    }

    #[must_use]
    pub fn assets_root(&self) -> PathBuf {
        self.project_root.join(&self.assets_dir)
    }

    /// Directories scanned for changes: the assets root, then project dirs.
    #[must_use]
    pub fn scan_roots(&self) -> Vec<PathBuf> {
        std::iter::once(self.assets_root())
            .chain(self.project_dirs.iter().map(|d| self.project_root.join(d)))
            .collect()
    }

    /// Whether the first segment names a directory under the project root.
    fn is_reserved_prefix(&self, first_segment: &str) -> bool {
        first_segment == self.assets_dir || self.project_dirs.iter().any(|d| d == first_segment)
    }

    /// Physical root a repository path resolves under.
    #[must_use]
    pub fn root_of(&self, repo_path: &str) -> LocalRoot {
        let first = repo_path.split('/').next().unwrap_or_default();
        if first == self.assets_dir || !self.is_reserved_prefix(first) {
            LocalRoot::Assets
        } else {
            LocalRoot::Project
        }
    }

    /// Resolve a repository path to a local file.
    ///
    /// # Errors
    ///
    /// Returns [`SyncError::InvalidPath`] for empty, absolute or
    /// backslash-separated paths, and for paths with `.`/`..`/empty
    /// segments, so a remote listing can never write outside the project.
    pub fn local_path(&self, repo_path: &str) -> SyncResult<PathBuf> {
        validate_repo_path(repo_path)?;

        let first = repo_path.split('/').next().unwrap_or_default();
        let base = if self.is_reserved_prefix(first) {
            self.project_root.clone()
        } else {
            self.assets_root()
        };

        Ok(repo_path.split('/').fold(base, |acc, seg| acc.join(seg)))
    }

    /// Repository path of a local file under the project root.
    ///
    /// Returns `None` for files outside the project or with non-UTF-8 names.
    #[must_use]
    pub fn repo_path(&self, local: &Path) -> Option<String> {
        let relative = local.strip_prefix(&self.project_root).ok()?;
        let mut segments = Vec::new();
        for component in relative.components() {
            match component {
                Component::Normal(seg) => segments.push(seg.to_str()?),
                _ => return None,
            }
        }
        if segments.is_empty() {
            None
        } else {
            Some(segments.join("/"))
        }
    }

    /// The one repository path that names the same local file as
    /// `repo_path`: the path [`repo_path`](Self::repo_path) derives from
    /// the local file.
    ///
    /// Paths under the assets directory or a project directory are already
    /// canonical. Any other path (`README.md`) resolves under the assets
    /// root, so its canonical form is `Assets/README.md`.
    ///
    /// # Errors
    ///
    /// Returns [`SyncError::InvalidPath`] when `repo_path` cannot be mapped
    /// to a local file.
    pub fn canonical_path(&self, repo_path: &str) -> SyncResult<String> {
        let local = self.local_path(repo_path)?;
        self.repo_path(&local).ok_or_else(|| SyncError::InvalidPath {
            path: repo_path.to_string(),
            reason: "not representable as a project path".to_string(),
        })
    }

    /// Whether the path lives under the assets directory.
    #[must_use]
    pub fn is_asset(&self, repo_path: &str) -> bool {
        repo_path
            .split_once('/')
            .is_some_and(|(first, _)| first == self.assets_dir)
    }
}

/// `<path>.meta`
#[must_use]
pub fn sidecar_path(repo_path: &str) -> String {
    format!("{repo_path}.{SIDECAR_EXTENSION}")
}

/// Whether a path is itself a sidecar metadata file.
#[must_use]
pub fn is_sidecar(repo_path: &str) -> bool {
    Path::new(repo_path)
        .extension()
        .is_some_and(|ext| ext == SIDECAR_EXTENSION)
}

/// Reject repository paths that could escape the destination root.
///
/// # Errors
///
/// Returns [`SyncError::InvalidPath`] describing the first problem found.
pub fn validate_repo_path(repo_path: &str) -> SyncResult<()> {
    let invalid = |reason: &str| SyncError::InvalidPath {
        path: repo_path.to_string(),
        reason: reason.to_string(),
    };

    if repo_path.is_empty() {
        return Err(invalid("empty path"));
    }
    if repo_path.starts_with('/') {
        return Err(invalid("absolute path"));
    }
    if repo_path.contains('\\') {
        return Err(invalid("backslash in path"));
    }
    if repo_path.contains(':') && cfg!(windows) {
        return Err(invalid("drive or stream separator in path"));
    }
    for segment in repo_path.split('/') {
        match segment {
            "" => return Err(invalid("empty path segment")),
            "." | ".." => return Err(invalid("relative path segment")),
            _ => {}
        }
    }
    Ok(())
}
