//! Git-data push engine.
//!
//! A push is the chain blobs → tree → commit → ref update. Each step needs
//! the previous step's output, so the chain is strictly sequential; only
//! blob creation fans out across files. Any failure stops the chain before
//! the branch ref moves. Objects already created stay on the remote as
//! unreferenced garbage.
//!
//! Write calls are never retried here. A failed push is retried by running
//! the whole chain again.

use std::collections::BTreeMap;

use futures::StreamExt;
use tracing::{debug, info, warn};

use crate::github::{ApiError, GitHost, TreeEntry};
use crate::sync::hash::content_digest;
use crate::sync::layout::PathLayout;
use crate::sync::progress::{Phase, ProgressTracker};
use crate::sync::pull::DEFAULT_JOBS;
use crate::sync::types::{CommitDescriptor, FailedPath, PushError, PushReport, PushStep, PushedFile};

/// Local bytes of every file in one push, keyed by repository path.
type PushSet = BTreeMap<String, Vec<u8>>;

/// Pushes local files to a branch as one commit.
#[derive(Debug)]
pub struct PushEngine<'a, H> {
    host: &'a H,
    layout: &'a PathLayout,
    jobs: usize,
}

fn at(step: PushStep) -> impl FnOnce(ApiError) -> PushError {
    move |source| PushError::Step { step, source }
}

impl<'a, H: GitHost> PushEngine<'a, H> {
    pub fn new(host: &'a H, layout: &'a PathLayout) -> Self {
        Self {
            host,
            layout,
            jobs: DEFAULT_JOBS,
        }
    }

    /// Maximum concurrent blob uploads (at least 1).
    #[must_use]
    pub fn jobs(mut self, jobs: usize) -> Self {
        self.jobs = jobs.max(1);
        self
    }

    /// Read every selected file. Missing or unreadable files are skipped.
    fn collect(&self, files: &[String]) -> (PushSet, Vec<FailedPath>) {
        let mut set = PushSet::new();
        let mut skipped = Vec::new();

        for path in files {
            if set.contains_key(path) {
                continue;
            }
            let read = self
                .layout
                .local_path(path)
                .map_err(|e| e.to_string())
                .and_then(|local| std::fs::read(local).map_err(|e| e.to_string()));
            match read {
                Ok(bytes) => {
                    set.insert(path.clone(), bytes);
                }
                Err(reason) => {
                    warn!(path = %path, reason = %reason, "Skipping file that cannot be read");
                    skipped.push(FailedPath::new(path.clone(), reason));
                }
            }
        }

        skipped.sort_by(|a, b| a.path.cmp(&b.path));
        skipped.dedup_by(|a, b| a.path == b.path);
        (set, skipped)
    }

    /// Push `files` to `branch` as a single commit with `message`.
    ///
    /// # Errors
    ///
    /// Returns [`PushError::NothingToPush`] if no selected file could be
    /// read (no remote call is made), or [`PushError::Step`] naming the step
    /// that failed. In both cases the branch ref is unchanged.
    pub async fn push(
        &self,
        files: &[String],
        message: &str,
        branch: &str,
        progress: &ProgressTracker,
    ) -> Result<PushReport, PushError> {
        let (set, skipped) = self.collect(files);
        if set.is_empty() {
            return Err(PushError::NothingToPush);
        }
        info!(files = set.len(), skipped = skipped.len(), branch, "Starting push");

        progress.begin(Phase::ResolvingHead, set.len());
        let head = self
            .host
            .branch_head(branch)
            .await
            .map_err(at(PushStep::ResolveHead))?;
        debug!(commit = %head.commit_sha, tree = %head.tree_sha, "Resolved branch head");

        progress.set_phase(Phase::UploadingBlobs);
        let mut pushed = self.upload_blobs(set, progress).await?;
        pushed.sort_by(|a, b| a.path.cmp(&b.path));

        let entries: Vec<TreeEntry> = pushed
            .iter()
            .map(|f| TreeEntry::blob(f.path.clone(), f.blob_sha.clone()))
            .collect();

        progress.set_phase(Phase::CreatingTree);
        let tree_sha = self
            .host
            .create_tree(&head.tree_sha, &entries)
            .await
            .map_err(at(PushStep::CreateTree))?;

        progress.set_phase(Phase::CreatingCommit);
        let commit_sha = self
            .host
            .create_commit(message, &tree_sha, &head.commit_sha)
            .await
            .map_err(at(PushStep::CreateCommit))?;

        progress.set_phase(Phase::UpdatingRef);
        self.host
            .update_ref(branch, &commit_sha)
            .await
            .map_err(at(PushStep::UpdateRef))?;
        progress.finish();

        info!(commit = %commit_sha, files = pushed.len(), "Push complete");
        Ok(PushReport {
            commit: CommitDescriptor {
                parent_sha: head.commit_sha,
                base_tree_sha: head.tree_sha,
                entries,
                tree_sha,
                commit_sha,
            },
            pushed,
            skipped,
        })
    }

    async fn upload_blobs(&self, set: PushSet, progress: &ProgressTracker) -> Result<Vec<PushedFile>, PushError> {
        let uploads = futures::stream::iter(set)
            .map(|(path, bytes)| async move {
                let result = self.host.create_blob(&bytes).await;
                (path, content_digest(&bytes), result)
            })
            .buffer_unordered(self.jobs);
        let mut uploads = std::pin::pin!(uploads);

        let mut pushed = Vec::new();
        while let Some((path, digest, result)) = uploads.next().await {
            match result {
                Ok(blob_sha) => {
                    debug!(path = %path, blob = %blob_sha, "Blob created");
                    progress.file_done(&path, true);
                    pushed.push(PushedFile {
                        path,
                        digest,
                        blob_sha,
                    });
                }
                Err(e) => {
                    progress.file_done(&path, false);
                    warn!(path = %path, error = %e, "Blob creation failed, aborting push");
                    return Err(at(PushStep::CreateBlobs)(e));
                }
            }
        }
        Ok(pushed)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::github::{FailurePoint, MemoryHost};
    use crate::sync::detector::Detector;
    use crate::sync::history::{Direction, HistoryEntry, HistoryLedger};
    use crate::sync::state::{DigestMap, ExclusionList};
    use chrono::Utc;
    use std::fs;
    use std::path::Path;
    use tempfile::TempDir;

    fn write(root: &Path, rel: &str, content: &[u8]) {
        let path = root.join(rel);
        fs::create_dir_all(path.parent().unwrap()).unwrap();
        fs::write(path, content).unwrap();
    }

    fn host() -> MemoryHost {
        MemoryHost::with_files("main", &[("Assets/existing.txt", b"keep".as_slice())])
    }

    fn paths(list: &[&str]) -> Vec<String> {
        list.iter().map(|s| (*s).to_string()).collect()
    }

    #[tokio::test]
    async fn test_push_creates_single_commit_on_head() {
        let temp = TempDir::new().unwrap();
        write(temp.path(), "Assets/a.png", &[0x89, b'P', b'N', b'G', 0, 0xff]);
        write(temp.path(), "Assets/a.png.meta", b"guid: a");
        write(temp.path(), "ProjectSettings/p.asset", b"p");

        let layout = PathLayout::unity(temp.path());
        let host = host();
        let before = host.head("main").unwrap();

        let report = PushEngine::new(&host, &layout)
            .push(
                &paths(&["ProjectSettings/p.asset", "Assets/a.png", "Assets/a.png.meta"]),
                "Updating files to version 1.0 notes",
                "main",
                &ProgressTracker::default(),
            )
            .await
            .unwrap();

        let after = host.head("main").unwrap();
        assert_eq!(after, report.commit.commit_sha);
        assert_eq!(report.commit.parent_sha, before);
        let (parent, message) = host.commit_info(&after).unwrap();
        assert_eq!(parent.as_deref(), Some(before.as_str()));
        assert_eq!(message, "Updating files to version 1.0 notes");

        assert_eq!(
            host.file_at("main", "Assets/a.png").unwrap(),
            vec![0x89, b'P', b'N', b'G', 0, 0xff]
        );
        assert_eq!(host.file_at("main", "Assets/existing.txt").unwrap(), b"keep");

        let entry_paths: Vec<_> = report.commit.entries.iter().map(|e| e.path.as_str()).collect();
        assert_eq!(
            entry_paths,
            vec!["Assets/a.png", "Assets/a.png.meta", "ProjectSettings/p.asset"]
        );
        assert!(report.commit.entries.iter().all(|e| e.mode == "100644" && e.kind == "blob"));
    }

    #[tokio::test]
    async fn test_abort_at_tree_leaves_ref_untouched() {
        let temp = TempDir::new().unwrap();
        write(temp.path(), "Assets/a.txt", b"a");
        let layout = PathLayout::unity(temp.path());
        let host = host();
        let before = host.head("main").unwrap();
        host.fail_at(FailurePoint::CreateTree);

        let err = PushEngine::new(&host, &layout)
            .push(&paths(&["Assets/a.txt"]), "msg", "main", &ProgressTracker::default())
            .await
            .unwrap_err();

        assert_eq!(err.step(), PushStep::CreateTree);
        assert_eq!(host.head("main").unwrap(), before);
    }

    #[tokio::test]
    async fn test_each_step_failure_is_named() {
        let cases = [
            (FailurePoint::BranchHead, PushStep::ResolveHead),
            (FailurePoint::CreateBlob, PushStep::CreateBlobs),
            (FailurePoint::CreateCommit, PushStep::CreateCommit),
            (FailurePoint::UpdateRef, PushStep::UpdateRef),
        ];
        for (point, step) in cases {
            let temp = TempDir::new().unwrap();
            write(temp.path(), "Assets/a.txt", b"a");
            let layout = PathLayout::unity(temp.path());
            let host = host();
            let before = host.head("main").unwrap();
            host.fail_at(point);

            let err = PushEngine::new(&host, &layout)
                .push(&paths(&["Assets/a.txt"]), "msg", "main", &ProgressTracker::default())
                .await
                .unwrap_err();

            assert_eq!(err.step(), step);
            assert_eq!(host.head("main").unwrap(), before);
        }
    }

    #[tokio::test]
    async fn test_missing_files_are_skipped() {
        let temp = TempDir::new().unwrap();
        write(temp.path(), "Assets/a.txt", b"a");
        let layout = PathLayout::unity(temp.path());
        let host = host();

        let report = PushEngine::new(&host, &layout)
            .push(
                &paths(&["Assets/a.txt", "Assets/gone.txt"]),
                "msg",
                "main",
                &ProgressTracker::default(),
            )
            .await
            .unwrap();

        assert_eq!(report.pushed.len(), 1);
        assert_eq!(report.skipped.len(), 1);
        assert_eq!(report.skipped[0].path, "Assets/gone.txt");
        assert!(host.file_at("main", "Assets/gone.txt").is_none());
    }

    #[tokio::test]
    async fn test_nothing_to_push_makes_no_remote_calls() {
        let temp = TempDir::new().unwrap();
        let layout = PathLayout::unity(temp.path());
        let host = host();
        host.fail_at(FailurePoint::BranchHead);
        let blobs_before = host.blob_count();

        let err = PushEngine::new(&host, &layout)
            .push(&paths(&["Assets/gone.txt"]), "msg", "main", &ProgressTracker::default())
            .await
            .unwrap_err();

        assert!(matches!(err, PushError::NothingToPush));
        assert_eq!(host.blob_count(), blobs_before);
    }

    #[tokio::test]
    async fn test_repeated_push_gives_distinct_commits_same_tree() {
        let temp = TempDir::new().unwrap();
        write(temp.path(), "Assets/a.txt", b"a");
        write(temp.path(), "Assets/b.txt", b"b");
        let layout = PathLayout::unity(temp.path());
        let host = host();
        let engine = PushEngine::new(&host, &layout);
        let files = paths(&["Assets/a.txt", "Assets/b.txt"]);

        let first = engine
            .push(&files, "same", "main", &ProgressTracker::default())
            .await
            .unwrap();
        let second = engine
            .push(&files, "same", "main", &ProgressTracker::default())
            .await
            .unwrap();

        assert_ne!(first.commit.commit_sha, second.commit.commit_sha);
        assert_eq!(first.commit.tree_sha, second.commit.tree_sha);
        assert_eq!(
            host.tree_of_commit(&first.commit.commit_sha),
            host.tree_of_commit(&second.commit.commit_sha)
        );
        assert_eq!(host.tree_of_commit(&second.commit.commit_sha).unwrap().len(), 3);
    }

    #[tokio::test]
    async fn test_push_then_rescan_is_clean() {
        let temp = TempDir::new().unwrap();
        write(temp.path(), "Assets/a.txt", b"a");
        write(temp.path(), "Assets/a.txt.meta", b"meta");
        write(temp.path(), "Packages/manifest.json", b"{}");
        let layout = PathLayout::unity(temp.path());
        let detector = Detector::new(layout.clone());
        let excluded = ExclusionList::default();
        let mut digests = DigestMap::default();

        let scan = detector.scan_project(&excluded, &digests);
        assert_eq!(scan.push_candidates().len(), 3);

        let host = host();
        let report = PushEngine::new(&host, &layout)
            .push(&scan.push_candidates(), "msg", "main", &ProgressTracker::default())
            .await
            .unwrap();
        digests.record_pushed(&report, &layout);

        assert!(detector.scan_project(&excluded, &digests).is_clean());
    }

    #[tokio::test]
    async fn test_successful_push_appends_one_history_entry() {
        let temp = TempDir::new().unwrap();
        write(temp.path(), "Assets/a.png", b"a");
        write(temp.path(), "Assets/a.png.meta", b"am");
        write(temp.path(), "Assets/b.png", b"b");
        write(temp.path(), "Assets/b.png.meta", b"bm");
        let layout = PathLayout::unity(temp.path());
        let ledger = HistoryLedger::open(temp.path().join(".assetsync"));
        let before = ledger.load_all().unwrap().len();
        let started = Utc::now();

        let host = host();
        let report = PushEngine::new(&host, &layout)
            .push(
                &paths(&["Assets/a.png", "Assets/a.png.meta", "Assets/b.png", "Assets/b.png.meta"]),
                "msg",
                "main",
                &ProgressTracker::default(),
            )
            .await
            .unwrap();
        ledger
            .append(&HistoryEntry::push("2.0", "notes", &report))
            .unwrap();

        let entries = ledger.load_all().unwrap();
        assert_eq!(entries.len(), before + 1);
        let last = entries.last().unwrap();
        assert_eq!(last.version, "2.0");
        assert_eq!(last.direction, Direction::Push);
        assert_eq!(last.files, 4);
        assert!(last.timestamp >= started);
    }

    #[tokio::test]
    async fn test_progress_tracks_blob_uploads() {
        let temp = TempDir::new().unwrap();
        write(temp.path(), "Assets/a.txt", b"a");
        write(temp.path(), "Assets/b.txt", b"b");
        let layout = PathLayout::unity(temp.path());
        let host = host();
        let progress = ProgressTracker::default();

        PushEngine::new(&host, &layout)
            .jobs(1)
            .push(&paths(&["Assets/a.txt", "Assets/b.txt"]), "msg", "main", &progress)
            .await
            .unwrap();

        let snap = progress.snapshot();
        assert_eq!(snap.phase, Phase::Done);
        assert_eq!(snap.completed, 2);
        assert_eq!(snap.failed, 0);
    }
}
