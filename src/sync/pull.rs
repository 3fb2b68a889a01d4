//! Selective pull engine.
//!
//! Downloads selected remote files into their remapped local locations.
//! Each file is independent: one failure never stops the others, and a
//! failed download never touches the existing local copy.

use std::collections::HashSet;

use futures::StreamExt;
use tracing::{debug, info, warn};

use crate::github::GitHost;
use crate::sync::file::atomic_write;
use crate::sync::hash::{content_digest, git_blob_id};
use crate::sync::layout::PathLayout;
use crate::sync::progress::{CancelFlag, Phase, ProgressTracker};
use crate::sync::types::{FailedPath, PullReport, PullTarget, PulledFile};

/// Default number of concurrent transfers.
pub const DEFAULT_JOBS: usize = 4;

enum Outcome {
    Written(PulledFile),
    Unchanged(PulledFile),
    Failed(FailedPath),
    NotStarted(String),
}

/// Downloads remote files into a local project.
#[derive(Debug)]
pub struct PullEngine<'a, H> {
    host: &'a H,
    layout: &'a PathLayout,
    jobs: usize,
    skip_unchanged: bool,
}

impl<'a, H: GitHost> PullEngine<'a, H> {
    pub fn new(host: &'a H, layout: &'a PathLayout) -> Self {
        Self {
            host,
            layout,
            jobs: DEFAULT_JOBS,
            skip_unchanged: true,
        }
    }

    /// Maximum concurrent downloads (at least 1).
    #[must_use]
    pub fn jobs(mut self, jobs: usize) -> Self {
        self.jobs = jobs.max(1);
        self
    }

    /// Skip files whose local bytes already match the remote blob.
    #[must_use]
    pub fn skip_unchanged(mut self, skip: bool) -> Self {
        self.skip_unchanged = skip;
        self
    }

    /// Pull `targets` at `git_ref`.
    ///
    /// Cancellation is checked before each download starts; downloads in
    /// flight finish normally. Duplicate paths are pulled once.
    pub async fn pull(
        &self,
        targets: Vec<PullTarget>,
        git_ref: &str,
        progress: &ProgressTracker,
        cancel: &CancelFlag,
    ) -> PullReport {
        let mut seen = HashSet::new();
        let targets: Vec<PullTarget> = targets
            .into_iter()
            .filter(|t| seen.insert(t.path.clone()))
            .collect();

        info!(files = targets.len(), git_ref, "Starting pull");
        progress.begin(Phase::Downloading, targets.len());

        let outcomes = futures::stream::iter(targets)
            .map(|target| async move {
                if cancel.is_cancelled() {
                    return Outcome::NotStarted(target.path);
                }
                self.pull_one(target, git_ref).await
            })
            .buffer_unordered(self.jobs);
        let mut outcomes = std::pin::pin!(outcomes);

        let mut report = PullReport::default();
        while let Some(outcome) = outcomes.next().await {
            match outcome {
                Outcome::Written(file) => {
                    progress.file_done(&file.path, true);
                    report.written.push(file);
                }
                Outcome::Unchanged(file) => {
                    progress.file_done(&file.path, true);
                    report.unchanged.push(file);
                }
                Outcome::Failed(failed) => {
                    progress.file_done(&failed.path, false);
                    report.failed.push(failed);
                }
                Outcome::NotStarted(path) => report.not_started.push(path),
            }
        }
        progress.finish();

        report.written.sort_by(|a, b| a.path.cmp(&b.path));
        report.unchanged.sort_by(|a, b| a.path.cmp(&b.path));
        report.failed.sort_by(|a, b| a.path.cmp(&b.path));
        report.not_started.sort();
        report.cancelled = !report.not_started.is_empty();

        info!(
            written = report.written.len(),
            unchanged = report.unchanged.len(),
            failed = report.failed.len(),
            not_started = report.not_started.len(),
            "Pull finished"
        );
        report
    }

    async fn pull_one(&self, target: PullTarget, git_ref: &str) -> Outcome {
        let PullTarget { path, remote_sha } = target;

        let local = match self.layout.local_path(&path) {
            Ok(local) => local,
            Err(e) => {
                warn!(path = %path, error = %e, "Refusing to pull path");
                return Outcome::Failed(FailedPath::new(path, e));
            }
        };

        if self.skip_unchanged {
            if let Some(digest) = remote_sha.as_deref().and_then(|sha| current_digest(&local, sha)) {
                debug!(path = %path, "Local copy already current");
                return Outcome::Unchanged(PulledFile { path, digest });
            }
        }

        let bytes = match self.host.download_raw(git_ref, &path).await {
            Ok(bytes) => bytes,
            Err(e) => {
                warn!(path = %path, error = %e, "Download failed");
                return Outcome::Failed(FailedPath::new(path, e));
            }
        };

        if let Err(e) = atomic_write(&local, &bytes) {
            warn!(path = %path, local = %local.display(), error = %e, "Write failed");
            return Outcome::Failed(FailedPath::new(path, e));
        }

        debug!(path = %path, bytes = bytes.len(), "Pulled");
        Outcome::Written(PulledFile {
            digest: content_digest(&bytes),
            path,
        })
    }
}

/// Content digest of the local file if its git blob id equals `remote_sha`.
fn current_digest(local: &std::path::Path, remote_sha: &str) -> Option<String> {
    let existing = std::fs::read(local).ok()?;
    (git_blob_id(&existing) == remote_sha).then(|| content_digest(&existing))
}
