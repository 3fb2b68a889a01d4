//! Two-way sync between a local project and a remote branch.
//!
//! - **Detect**: walk the local tree and compare content digests against
//!   the digest map ([`Detector`])
//! - **List**: flatten the remote tree for a ref ([`list_tree`])
//! - **Pull**: download selected remote files into their local locations
//!   ([`PullEngine`])
//! - **Push**: blobs → tree → commit → ref update ([`PushEngine`])
//! - **History**: append-only ledger of completed operations
//!   ([`HistoryLedger`])
//!
//! # State
//!
//! All persistent state lives in one directory (`.assetsync/`) and is
//! carried explicitly in a [`SyncState`]. Engines never write it; the
//! caller folds their reports back in once an operation has finished:
//!
//! ```ignore
//! let mut state = SyncState::load(&state_dir)?;
//! let scan = Detector::new(layout.clone()).scan_project(&state.exclusions, &state.digests);
//! let report = PushEngine::new(&client, &layout)
//!     .push(&scan.push_candidates(), "message", "main", &ProgressTracker::default())
//!     .await?;
//! state.digests.record_pushed(&report, &layout);
//! state.save()?;
//! HistoryLedger::open(&state_dir).append(&HistoryEntry::push("1.0", "notes", &report))?;
//! ```

mod detector;
mod file;
mod hash;
mod history;
mod layout;
mod lister;
mod progress;
mod pull;
mod push;
mod state;
mod types;
mod version;

pub use detector::{DEFAULT_DENY_EXTENSIONS, Detector};
pub use file::{atomic_write, ensure_gitignore, gitignore_content, read_json, write_json};
pub use hash::{content_digest, git_blob_id, has_changed};
pub use history::{Direction, HISTORY_FILE, HistoryEntry, HistoryLedger};
pub use layout::{LocalRoot, PathLayout, SIDECAR_EXTENSION, is_sidecar, sidecar_path, validate_repo_path};
pub use lister::{list_dir, list_tree};
pub use progress::{CancelFlag, NoProgress, Phase, ProgressSink, ProgressSnapshot, ProgressTracker};
pub use pull::PullEngine;
pub use push::PushEngine;
pub use state::{DIGESTS_FILE, DigestMap, EXCLUSIONS_FILE, ExclusionList, SyncState, TrackedFile};
pub use types::{
    CommitDescriptor, FailedPath, PullReport, PullTarget, PulledFile, PushError, PushReport, PushStep, PushedFile,
    RemoteEntry, RemoteListing, ScanResult, SyncError, SyncResult,
};
pub use version::{
    DEFAULT_VERSION_FILE, VersionStatus, check_version, parse_version, read_local_version, remote_version,
    version_file_content, write_version_file,
};

/// Default number of concurrent transfers for pulls and pushes.
pub const DEFAULT_JOBS: usize = pull::DEFAULT_JOBS;
