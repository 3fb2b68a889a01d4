//! Remote tree listing.

use std::collections::VecDeque;

use tracing::{debug, warn};

use crate::github::{ApiResult, EntryKind, GitHost};
use crate::sync::types::{FailedPath, RemoteEntry, RemoteListing};

/// List one directory (or describe one file) at `git_ref`.
///
/// # Errors
///
/// Returns the host's error unchanged.
pub async fn list_dir<H: GitHost>(host: &H, git_ref: &str, path: &str) -> ApiResult<Vec<RemoteEntry>> {
    let entries = host.list_contents(git_ref, path).await?;
    Ok(entries.into_iter().map(RemoteEntry::from).collect())
}

/// Flatten the remote tree under `path` into its files.
///
/// Directories are expanded breadth-first. A directory whose listing fails
/// is recorded in [`RemoteListing::failed`] and contributes no files; the
/// rest of the tree is still listed. Submodules and symlinks are skipped.
pub async fn list_tree<H: GitHost>(host: &H, git_ref: &str, path: &str) -> RemoteListing {
    let mut listing = RemoteListing::default();
    let mut queue = VecDeque::from([path.trim_matches('/').to_string()]);

    while let Some(dir) = queue.pop_front() {
        let entries = match list_dir(host, git_ref, &dir).await {
            Ok(entries) => entries,
            Err(e) => {
                warn!(path = %dir, error = %e, "Remote listing failed, subtree skipped");
                listing.failed.push(FailedPath::new(display_dir(&dir), e));
                continue;
            }
        };

        for entry in entries {
            match entry.kind {
                EntryKind::File => listing.files.push(entry),
                EntryKind::Dir => queue.push_back(entry.path),
                EntryKind::Symlink | EntryKind::Submodule => {
                    debug!(path = %entry.path, kind = %entry.kind, "Skipping non-file entry");
                }
            }
        }
    }

    listing.files.sort_by(|a, b| a.path.cmp(&b.path));
    debug!(
        files = listing.files.len(),
        failed = listing.failed.len(),
        "Remote listing complete"
    );
    listing
}

fn display_dir(dir: &str) -> String {
    if dir.is_empty() { "/".to_string() } else { dir.to_string() }
}
