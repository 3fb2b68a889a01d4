//! Local change detection.
//!
//! Walks the scan roots, digests every eligible file and compares the
//! result against the digest map. Pure local I/O; an unreadable file is
//! logged and reported, never fatal.

use std::collections::BTreeSet;
use std::path::{Path, PathBuf};

use tracing::{debug, warn};
use walkdir::WalkDir;

use crate::sync::hash::{content_digest, has_changed};
use crate::sync::layout::{PathLayout, is_sidecar, sidecar_path};
use crate::sync::state::{DigestMap, ExclusionList};
use crate::sync::types::{FailedPath, ScanResult};

/// Extensions never synced: IDE project files and temp files.
pub const DEFAULT_DENY_EXTENSIONS: &[&str] = &["csproj", "sln", "userprefs", "tmp", "suo", "user"];

/// Classifies local files as untracked, modified or unchanged.
#[derive(Debug, Clone)]
pub struct Detector {
    layout: PathLayout,
    deny_extensions: BTreeSet<String>,
}

impl Detector {
    /// Detector with the default denylist.
    #[must_use]
    pub fn new(layout: PathLayout) -> Self {
        Self::with_denylist(layout, DEFAULT_DENY_EXTENSIONS.iter().copied())
    }

    /// Detector with a custom extension denylist (without leading dots,
    /// compared case-insensitively).
    pub fn with_denylist<I, S>(layout: PathLayout, extensions: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        Self {
            layout,
            deny_extensions: extensions
                .into_iter()
                .map(|e| e.as_ref().trim_start_matches('.').to_ascii_lowercase())
                .collect(),
        }
    }

    #[must_use]
    pub fn layout(&self) -> &PathLayout {
        &self.layout
    }

    fn is_denied(&self, path: &Path) -> bool {
        path.extension()
            .and_then(|e| e.to_str())
            .is_some_and(|e| self.deny_extensions.contains(&e.to_ascii_lowercase()))
    }

    /// Scan `roots` for files that differ from `digests`.
    ///
    /// Roots that do not exist are skipped. Excluded paths (or paths under
    /// an excluded directory) and denylisted extensions are ignored.
    /// Sidecar files are not classified themselves; a changed asset's
    /// sidecar is reported in [`ScanResult::sidecars`] when it exists.
    #[must_use]
    pub fn scan(&self, roots: &[PathBuf], excluded: &ExclusionList, digests: &DigestMap) -> ScanResult {
        let mut result = ScanResult::default();
        let mut sidecars = BTreeSet::new();

        for root in roots {
            if !root.is_dir() {
                debug!(root = %root.display(), "Scan root missing, skipping");
                continue;
            }

            for entry in WalkDir::new(root).follow_links(false) {
                let entry = match entry {
                    Ok(entry) => entry,
                    Err(e) => {
                        let path = e
                            .path()
                            .and_then(|p| self.layout.repo_path(p))
                            .unwrap_or_else(|| root.display().to_string());
                        warn!(path = %path, error = %e, "Failed to walk directory entry");
                        result.unreadable.push(FailedPath::new(path, e));
                        continue;
                    }
                };

                if !entry.file_type().is_file() {
                    continue;
                }

                let local = entry.path();
                let Some(repo_path) = self.layout.repo_path(local) else {
                    debug!(path = %local.display(), "Outside project or non-UTF-8 name, skipping");
                    continue;
                };

                if is_sidecar(&repo_path) || self.is_denied(local) || excluded.is_excluded(&repo_path) {
                    continue;
                }

                let bytes = match std::fs::read(local) {
                    Ok(bytes) => bytes,
                    Err(e) => {
                        warn!(path = %repo_path, error = %e, "Unreadable file skipped");
                        result.unreadable.push(FailedPath::new(repo_path, e));
                        continue;
                    }
                };

                let stored = digests.digest(&repo_path);
                if !has_changed(&content_digest(&bytes), stored) {
                    continue;
                }

                if self.layout.is_asset(&repo_path) {
                    let sidecar = sidecar_path(&repo_path);
                    if !excluded.is_excluded(&sidecar) && local.with_file_name(sidecar_file_name(local)).is_file() {
                        sidecars.insert(sidecar);
                    }
                }

                if stored.is_none() {
                    result.untracked.push(repo_path);
                } else {
                    result.modified.push(repo_path);
                }
            }
        }

        result.untracked.sort();
        result.modified.sort();
        result.sidecars = sidecars.into_iter().collect();

        debug!(
            untracked = result.untracked.len(),
            modified = result.modified.len(),
            sidecars = result.sidecars.len(),
            unreadable = result.unreadable.len(),
            "Scan complete"
        );
        result
    }

    /// Scan the layout's default roots.
    #[must_use]
    pub fn scan_project(&self, excluded: &ExclusionList, digests: &DigestMap) -> ScanResult {
        self.scan(&self.layout.scan_roots(), excluded, digests)
    }
}

/// `name.ext` → `name.ext.meta`
fn sidecar_file_name(local: &Path) -> std::ffi::OsString {
    let mut name = local.file_name().unwrap_or_default().to_os_string();
    name.push(".");
    name.push(crate::sync::layout::SIDECAR_EXTENSION);
    name
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::sync::layout::LocalRoot;
    use std::fs;
    use tempfile::TempDir;

    fn write(root: &Path, rel: &str, content: &str) {
        let path = root.join(rel);
        fs::create_dir_all(path.parent().unwrap()).unwrap();
        fs::write(path, content).unwrap();
    }

    #[test]
    fn test_empty_digest_map_reports_all_untracked() {
        let temp = TempDir::new().unwrap();
        write(temp.path(), "Assets/a.txt", "a");
        write(temp.path(), "Assets/Sub/b.txt", "b");
        write(temp.path(), "ProjectSettings/c.asset", "c");

        let detector = Detector::new(PathLayout::unity(temp.path()));
        let result = detector.scan_project(&ExclusionList::default(), &DigestMap::default());

        assert_eq!(
            result.untracked,
            vec!["Assets/Sub/b.txt", "Assets/a.txt", "ProjectSettings/c.asset"]
        );
        assert!(result.modified.is_empty());
    }

    #[test]
    fn test_modified_and_unchanged() {
        let temp = TempDir::new().unwrap();
        write(temp.path(), "Assets/same.txt", "same");
        write(temp.path(), "Assets/changed.txt", "new content");

        let mut digests = DigestMap::default();
        digests.record("Assets/same.txt", content_digest(b"same"), LocalRoot::Assets);
        digests.record("Assets/changed.txt", content_digest(b"old content"), LocalRoot::Assets);

        let detector = Detector::new(PathLayout::unity(temp.path()));
        let result = detector.scan_project(&ExclusionList::default(), &digests);

        assert!(result.untracked.is_empty());
        assert_eq!(result.modified, vec!["Assets/changed.txt"]);
    }

    #[test]
    fn test_sidecar_emitted_for_changed_asset_only() {
        let temp = TempDir::new().unwrap();
        write(temp.path(), "Assets/a.png", "png");
        write(temp.path(), "Assets/a.png.meta", "guid: 1");
        write(temp.path(), "Assets/b.png", "png-b");
        write(temp.path(), "Assets/b.png.meta", "guid: 2");
        write(temp.path(), "Assets/c.png", "no sidecar");

        let mut digests = DigestMap::default();
        digests.record("Assets/b.png", content_digest(b"png-b"), LocalRoot::Assets);

        let detector = Detector::new(PathLayout::unity(temp.path()));
        let result = detector.scan_project(&ExclusionList::default(), &digests);

        assert_eq!(result.untracked, vec!["Assets/a.png", "Assets/c.png"]);
        assert_eq!(result.sidecars, vec!["Assets/a.png.meta"]);
    }

    #[test]
    fn test_project_dir_files_have_no_sidecars() {
        let temp = TempDir::new().unwrap();
        write(temp.path(), "ProjectSettings/x.asset", "x");
        write(temp.path(), "ProjectSettings/x.asset.meta", "unexpected");

        let detector = Detector::new(PathLayout::unity(temp.path()));
        let result = detector.scan_project(&ExclusionList::default(), &DigestMap::default());

        assert_eq!(result.untracked, vec!["ProjectSettings/x.asset"]);
        assert!(result.sidecars.is_empty());
    }

    #[test]
    fn test_denylist_and_exclusions() {
        let temp = TempDir::new().unwrap();
        write(temp.path(), "Assets/keep.cs", "k");
        write(temp.path(), "Assets/Game.csproj", "ide");
        write(temp.path(), "Assets/scratch.TMP", "tmp");
        write(temp.path(), "Assets/Generated/gen.cs", "g");
        write(temp.path(), "Assets/skip.cs", "s");

        let excluded: ExclusionList = ["Assets/Generated", "Assets/skip.cs"].into_iter().collect();
        let detector = Detector::new(PathLayout::unity(temp.path()));
        let result = detector.scan_project(&excluded, &DigestMap::default());

        assert_eq!(result.untracked, vec!["Assets/keep.cs"]);
    }

    #[test]
    fn test_custom_denylist() {
        let temp = TempDir::new().unwrap();
        write(temp.path(), "Assets/a.psd", "big");
        write(temp.path(), "Assets/a.csproj", "ide");

        let detector = Detector::with_denylist(PathLayout::unity(temp.path()), [".psd"]);
        let result = detector.scan_project(&ExclusionList::default(), &DigestMap::default());

        assert_eq!(result.untracked, vec!["Assets/a.csproj"]);
    }

    #[test]
    fn test_missing_roots_are_skipped() {
        let temp = TempDir::new().unwrap();
        let detector = Detector::new(PathLayout::unity(temp.path()));
        let result = detector.scan_project(&ExclusionList::default(), &DigestMap::default());
        assert!(result.is_clean());
        assert!(result.unreadable.is_empty());
    }

    #[test]
    fn test_identical_content_identical_digest_regardless_of_path() {
        let temp = TempDir::new().unwrap();
        write(temp.path(), "Assets/one.txt", "same bytes");
        write(temp.path(), "Packages/two.txt", "same bytes");

        let mut digests = DigestMap::default();
        let digest = content_digest(b"same bytes");
        digests.record("Assets/one.txt", digest.clone(), LocalRoot::Assets);
        digests.record("Packages/two.txt", digest, LocalRoot::Project);

        let detector = Detector::new(PathLayout::unity(temp.path()));
        assert!(detector.scan_project(&ExclusionList::default(), &digests).is_clean());
    }
}
