//! Git hosting service access.
//!
//! The [`GitHost`] trait is the seam between the sync engines and the
//! network. It covers exactly the calls the engines need:
//!
//! - **Read** (idempotent, retried on transient failure): directory
//!   contents, raw file bytes, branch head resolution
//! - **Write** (never retried): blob, tree and commit creation, ref update
//!
//! [`GitHubClient`] talks to the real REST API. Tests run the engines
//! against `MemoryHost`, which keeps a repository in memory.

mod client;
mod error;
#[cfg(test)]
mod memory;
mod types;

pub use client::{CLIENT_AGENT, ClientSettings, GitHubClient};
pub use error::{ApiError, ApiResult};
#[cfg(test)]
pub use memory::{FailurePoint, MemoryHost};
pub use types::{BranchHead, ContentEntry, EntryKind, TreeEntry};

use std::future::Future;

/// Operations against a remote git repository.
///
/// Implemented by [`GitHubClient`], and by `MemoryHost` in tests.
pub trait GitHost: Send + Sync {
    /// List a directory (or describe a single file) at `git_ref`.
    ///
    /// An empty `path` lists the repository root.
    fn list_contents(
        &self,
        git_ref: &str,
        path: &str,
    ) -> impl Future<Output = ApiResult<Vec<ContentEntry>>> + Send;

    /// Fetch the raw bytes of a file at `git_ref`.
    fn download_raw(&self, git_ref: &str, path: &str) -> impl Future<Output = ApiResult<Vec<u8>>> + Send;

    /// Resolve a branch to its head commit and that commit's tree.
    fn branch_head(&self, branch: &str) -> impl Future<Output = ApiResult<BranchHead>> + Send;

    /// Create a blob and return its sha.
    fn create_blob(&self, content: &[u8]) -> impl Future<Output = ApiResult<String>> + Send;

    /// Create a tree layered on `base_tree` and return its sha.
    ///
    /// Paths of `base_tree` not named in `entries` are preserved.
    fn create_tree(
        &self,
        base_tree: &str,
        entries: &[TreeEntry],
    ) -> impl Future<Output = ApiResult<String>> + Send;

    /// Create a commit with a single parent and return its sha.
    fn create_commit(
        &self,
        message: &str,
        tree_sha: &str,
        parent_sha: &str,
    ) -> impl Future<Output = ApiResult<String>> + Send;

    /// Force-move `branch` to `commit_sha`.
    fn update_ref(&self, branch: &str, commit_sha: &str) -> impl Future<Output = ApiResult<()>> + Send;
}
