//! Persisted local sync state.
//!
//! [`SyncState`] is the explicit state object threaded through every
//! operation: the digest map (what was last pushed or pulled) and the
//! exclusion list (what the user opted out of). Engines only read it;
//! callers fold engine reports back in with [`DigestMap::record_pushed`]
//! and [`DigestMap::record_pulled`] and then [`SyncState::save`].

use std::collections::{BTreeMap, BTreeSet};
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use crate::sync::file::{read_json, write_json};
use crate::sync::layout::{LocalRoot, PathLayout};
use crate::sync::types::{PullReport, PushReport, SyncResult};

/// Digest map file name inside the state directory.
pub const DIGESTS_FILE: &str = "digests.json";

/// Exclusion list file name inside the state directory.
pub const EXCLUSIONS_FILE: &str = "exclusions.json";

/// Last-known state of one tracked file.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TrackedFile {
    /// Content digest of the bytes last pushed or pulled.
    pub digest: String,
    /// Physical root the path resolves under.
    pub root: LocalRoot,
    /// Remote path, when it differs from the key (a file outside the
    /// reserved directories, stored under the assets root locally).
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub remote: Option<String>,
}

/// Repository path → last-known digest.
///
/// Keys are canonical paths ([`PathLayout::canonical_path`]), the same
/// paths the detector derives from local files.
#[derive(Debug, Default, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DigestMap {
    files: BTreeMap<String, TrackedFile>,
}

impl DigestMap {
    /// Recorded digest of `path`, if tracked.
    #[must_use]
    pub fn digest(&self, path: &str) -> Option<&str> {
        self.files.get(path).map(|f| f.digest.as_str())
    }

    #[must_use]
    pub fn get(&self, path: &str) -> Option<&TrackedFile> {
        self.files.get(path)
    }

    /// Record (or replace) the digest of a file.
    pub fn record(&mut self, path: impl Into<String>, digest: impl Into<String>, root: LocalRoot) {
        self.files.insert(
            path.into(),
            TrackedFile {
                digest: digest.into(),
                root,
                remote: None,
            },
        );
    }

    /// Record a file synced under `remote_path`, keyed by its canonical
    /// path so the detector finds it.
    fn record_synced(&mut self, remote_path: &str, digest: &str, layout: &PathLayout) {
        let key = match layout.canonical_path(remote_path) {
            Ok(key) => key,
            Err(e) => {
                warn!(path = %remote_path, error = %e, "Not recording unmappable path");
                return;
            }
        };
        let remote = (key != remote_path).then(|| remote_path.to_string());
        self.files.insert(
            key,
            TrackedFile {
                digest: digest.to_string(),
                root: layout.root_of(remote_path),
                remote,
            },
        );
    }

    /// Remote path of a tracked file: its recorded alias, else the key.
    #[must_use]
    pub fn remote_path<'a>(&'a self, path: &'a str) -> &'a str {
        self.files
            .get(path)
            .and_then(|f| f.remote.as_deref())
            .unwrap_or(path)
    }

    /// Stop tracking a file.
    pub fn remove(&mut self, path: &str) -> Option<TrackedFile> {
        self.files.remove(path)
    }

    /// Mark every pushed file as up to date.
    pub fn record_pushed(&mut self, report: &PushReport, layout: &PathLayout) {
        for file in &report.pushed {
            self.record_synced(&file.path, &file.digest, layout);
        }
        debug!(count = report.pushed.len(), "Recorded pushed digests");
    }

    /// Fold the bytes a pull wrote (or found already current) into the map.
    pub fn record_pulled(&mut self, report: &PullReport, layout: &PathLayout) {
        for file in report.written.iter().chain(&report.unchanged) {
            self.record_synced(&file.path, &file.digest, layout);
        }
        debug!(
            written = report.written.len(),
            unchanged = report.unchanged.len(),
            "Recorded pulled digests"
        );
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.files.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.files.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&String, &TrackedFile)> {
        self.files.iter()
    }
}

/// Paths the user explicitly excluded from sync.
#[derive(Debug, Default, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ExclusionList {
    paths: BTreeSet<String>,
}

impl ExclusionList {
    /// Whether `path` is excluded, either exactly or through an excluded
    /// parent directory.
    #[must_use]
    pub fn is_excluded(&self, path: &str) -> bool {
        if self.paths.contains(path) {
            return true;
        }
        let mut rest = path;
        while let Some((parent, _)) = rest.rsplit_once('/') {
            if self.paths.contains(parent) {
                return true;
            }
            rest = parent;
        }
        false
    }

    /// Returns true if the path was newly added.
    pub fn add(&mut self, path: impl Into<String>) -> bool {
        self.paths.insert(path.into())
    }

    /// Returns true if the path was present.
    pub fn remove(&mut self, path: &str) -> bool {
        self.paths.remove(path)
    }

    pub fn iter(&self) -> impl Iterator<Item = &String> {
        self.paths.iter()
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.paths.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.paths.is_empty()
    }
}

impl<S: Into<String>> FromIterator<S> for ExclusionList {
    fn from_iter<I: IntoIterator<Item = S>>(iter: I) -> Self {
        Self {
            paths: iter.into_iter().map(Into::into).collect(),
        }
    }
}

/// Local sync state loaded from a state directory.
#[derive(Debug, Clone)]
pub struct SyncState {
    dir: PathBuf,
    pub digests: DigestMap,
    pub exclusions: ExclusionList,
}

impl SyncState {
    /// Load state from `dir`; missing files start empty.
    ///
    /// # Errors
    ///
    /// Returns an error if a state file exists but cannot be read or parsed.
    pub fn load(dir: &Path) -> SyncResult<Self> {
        let digests = read_json(&dir.join(DIGESTS_FILE))?.unwrap_or_default();
        let exclusions = read_json(&dir.join(EXCLUSIONS_FILE))?.unwrap_or_default();
        Ok(Self {
            dir: dir.to_path_buf(),
            digests,
            exclusions,
        })
    }

    /// Persist both documents atomically.
    ///
    /// # Errors
    ///
    /// Returns an error if either file cannot be written.
    pub fn save(&self) -> SyncResult<()> {
        write_json(&self.dir.join(DIGESTS_FILE), &self.digests)?;
        write_json(&self.dir.join(EXCLUSIONS_FILE), &self.exclusions)?;
        Ok(())
    }

    /// Exclude a path and forget the digests of everything under it.
    pub fn exclude(&mut self, path: &str) -> bool {
        let added = self.exclusions.add(path);
        self.digests.files.retain(|tracked, _| !self.exclusions.is_excluded(tracked));
        added
    }

    #[must_use]
    pub fn dir(&self) -> &Path {
        &self.dir
    }
}
