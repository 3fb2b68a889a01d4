//! In-memory git host for tests.
//!
//! Keeps blobs, flat path trees, commits and branch refs in a map so the
//! sync engines can be exercised without a network. Failures can be
//! injected at any call to check how the engines react.

use std::collections::{BTreeMap, HashMap};
use std::sync::{Mutex, MutexGuard, PoisonError};

use sha1::{Digest, Sha1};

use super::error::{ApiError, ApiResult};
use super::types::{BranchHead, ContentEntry, EntryKind, TreeEntry};
use super::GitHost;
use crate::sync::git_blob_id;

/// A call at which [`MemoryHost`] should fail.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FailurePoint {
    /// Listing this exact directory path.
    ListContents(String),
    /// Downloading this exact file path.
    Download(String),
    BranchHead,
    CreateBlob,
    CreateTree,
    CreateCommit,
    UpdateRef,
}

#[derive(Debug, Clone)]
struct CommitObject {
    tree: String,
    parent: Option<String>,
    message: String,
}

#[derive(Debug, Default)]
struct Repo {
    blobs: HashMap<String, Vec<u8>>,
    trees: HashMap<String, BTreeMap<String, String>>,
    commits: HashMap<String, CommitObject>,
    refs: HashMap<String, String>,
    failures: Vec<FailurePoint>,
    commit_counter: u64,
}

impl Repo {
    fn fail_if(&self, point: &FailurePoint) -> ApiResult<()> {
        if self.failures.contains(point) {
            Err(ApiError::Transport(format!("injected failure at {point:?}")))
        } else {
            Ok(())
        }
    }

    /// Resolve a branch name or commit sha to a flat tree.
    fn tree_for_ref(&self, git_ref: &str) -> ApiResult<&BTreeMap<String, String>> {
        let commit_sha = self.refs.get(git_ref).map_or(git_ref, String::as_str);
        self.commits
            .get(commit_sha)
            .and_then(|c| self.trees.get(&c.tree))
            .ok_or_else(|| ApiError::NotFound(format!("ref {git_ref}")))
    }

    fn insert_tree(&mut self, tree: BTreeMap<String, String>) -> String {
        let mut hasher = Sha1::new();
        for (path, sha) in &tree {
            hasher.update(path.as_bytes());
            hasher.update([0u8]);
            hasher.update(sha.as_bytes());
            hasher.update([b'\n']);
        }
        let sha = format!("{:x}", hasher.finalize());
        self.trees.insert(sha.clone(), tree);
        sha
    }

    fn insert_commit(&mut self, tree: String, parent: Option<String>, message: String) -> String {
        self.commit_counter += 1;
        let mut hasher = Sha1::new();
        hasher.update(tree.as_bytes());
        hasher.update(parent.as_deref().unwrap_or_default().as_bytes());
        hasher.update(message.as_bytes());
        hasher.update(self.commit_counter.to_be_bytes());
        let sha = format!("{:x}", hasher.finalize());
        self.commits.insert(
            sha.clone(),
            CommitObject {
                tree,
                parent,
                message,
            },
        );
        sha
    }
}

/// A repository held entirely in memory.
#[derive(Debug, Default)]
pub struct MemoryHost {
    repo: Mutex<Repo>,
}

impl MemoryHost {
    /// Empty host with no branches.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Host whose `branch` points at a root commit holding `files`.
    #[must_use]
    pub fn with_files(branch: &str, files: &[(&str, &[u8])]) -> Self {
        let host = Self::new();
        {
            let mut repo = host.lock();
            let mut tree = BTreeMap::new();
            for (path, content) in files {
                let sha = git_blob_id(content);
                repo.blobs.insert(sha.clone(), content.to_vec());
                tree.insert((*path).to_string(), sha);
            }
            let tree_sha = repo.insert_tree(tree);
            let commit = repo.insert_commit(tree_sha, None, "initial".to_string());
            repo.refs.insert(branch.to_string(), commit);
        }
        host
    }

    fn lock(&self) -> MutexGuard<'_, Repo> {
        self.repo.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Make every subsequent call at `point` fail with a transport error.
    pub fn fail_at(&self, point: FailurePoint) {
        self.lock().failures.push(point);
    }

    /// Remove every injected failure.
    pub fn clear_failures(&self) {
        self.lock().failures.clear();
    }

    /// Current commit of `branch`.
    #[must_use]
    pub fn head(&self, branch: &str) -> Option<String> {
        self.lock().refs.get(branch).cloned()
    }

    /// Flat `path -> blob sha` tree of a commit.
    #[must_use]
    pub fn tree_of_commit(&self, commit_sha: &str) -> Option<BTreeMap<String, String>> {
        let repo = self.lock();
        let commit = repo.commits.get(commit_sha)?;
        repo.trees.get(&commit.tree).cloned()
    }

    /// Parent and message of a commit.
    #[must_use]
    pub fn commit_info(&self, commit_sha: &str) -> Option<(Option<String>, String)> {
        self.lock()
            .commits
            .get(commit_sha)
            .map(|c| (c.parent.clone(), c.message.clone()))
    }

    /// Content of `path` at the head of `branch`.
    #[must_use]
    pub fn file_at(&self, branch: &str, path: &str) -> Option<Vec<u8>> {
        let repo = self.lock();
        let tree = repo.tree_for_ref(branch).ok()?;
        let sha = tree.get(path)?;
        repo.blobs.get(sha).cloned()
    }

    /// Number of stored blobs, including ones no tree references.
    #[must_use]
    pub fn blob_count(&self) -> usize {
        self.lock().blobs.len()
    }
}

impl GitHost for MemoryHost {
    async fn list_contents(&self, git_ref: &str, path: &str) -> ApiResult<Vec<ContentEntry>> {
        let repo = self.lock();
        let path = path.trim_matches('/');
        repo.fail_if(&FailurePoint::ListContents(path.to_string()))?;
        let tree = repo.tree_for_ref(git_ref)?;

        if let Some(sha) = tree.get(path) {
            let size = repo.blobs.get(sha).map_or(0, Vec::len) as u64;
            return Ok(vec![ContentEntry {
                path: path.to_string(),
                kind: EntryKind::File,
                sha: sha.clone(),
                size,
            }]);
        }

        let prefix = if path.is_empty() {
            String::new()
        } else {
            format!("{path}/")
        };

        let mut children: BTreeMap<String, ContentEntry> = BTreeMap::new();
        for (file_path, sha) in tree.range(prefix.clone()..) {
            let Some(rest) = file_path.strip_prefix(&prefix) else {
                break;
            };
            match rest.split_once('/') {
                Some((dir, _)) => {
                    let dir_path = format!("{prefix}{dir}");
                    children.entry(dir_path.clone()).or_insert_with(|| ContentEntry {
                        sha: git_blob_id(dir_path.as_bytes()),
                        path: dir_path,
                        kind: EntryKind::Dir,
                        size: 0,
                    });
                }
                None => {
                    let size = repo.blobs.get(sha).map_or(0, Vec::len) as u64;
                    children.insert(
                        file_path.clone(),
                        ContentEntry {
                            path: file_path.clone(),
                            kind: EntryKind::File,
                            sha: sha.clone(),
                            size,
                        },
                    );
                }
            }
        }

        if children.is_empty() && !path.is_empty() {
            return Err(ApiError::NotFound(format!("contents/{path}")));
        }
        Ok(children.into_values().collect())
    }

    async fn download_raw(&self, git_ref: &str, path: &str) -> ApiResult<Vec<u8>> {
        let repo = self.lock();
        repo.fail_if(&FailurePoint::Download(path.to_string()))?;
        let tree = repo.tree_for_ref(git_ref)?;
        tree.get(path)
            .and_then(|sha| repo.blobs.get(sha))
            .cloned()
            .ok_or_else(|| ApiError::NotFound(format!("{git_ref}/{path}")))
    }

    async fn branch_head(&self, branch: &str) -> ApiResult<BranchHead> {
        let repo = self.lock();
        repo.fail_if(&FailurePoint::BranchHead)?;
        let commit_sha = repo
            .refs
            .get(branch)
            .ok_or_else(|| ApiError::NotFound(format!("refs/heads/{branch}")))?;
        let commit = repo
            .commits
            .get(commit_sha)
            .ok_or_else(|| ApiError::NotFound(format!("commits/{commit_sha}")))?;
        Ok(BranchHead {
            commit_sha: commit_sha.clone(),
            tree_sha: commit.tree.clone(),
        })
    }

    async fn create_blob(&self, content: &[u8]) -> ApiResult<String> {
        let mut repo = self.lock();
        repo.fail_if(&FailurePoint::CreateBlob)?;
        let sha = git_blob_id(content);
        repo.blobs.insert(sha.clone(), content.to_vec());
        Ok(sha)
    }

    async fn create_tree(&self, base_tree: &str, entries: &[TreeEntry]) -> ApiResult<String> {
        let mut repo = self.lock();
        repo.fail_if(&FailurePoint::CreateTree)?;
        let mut tree = repo
            .trees
            .get(base_tree)
            .cloned()
            .ok_or_else(|| ApiError::Status {
                status: 422,
                message: format!("base_tree {base_tree} does not exist"),
            })?;
        for entry in entries {
            if !repo.blobs.contains_key(&entry.sha) {
                return Err(ApiError::Status {
                    status: 422,
                    message: format!("blob {} does not exist", entry.sha),
                });
            }
            tree.insert(entry.path.clone(), entry.sha.clone());
        }
        Ok(repo.insert_tree(tree))
    }

    async fn create_commit(&self, message: &str, tree_sha: &str, parent_sha: &str) -> ApiResult<String> {
        let mut repo = self.lock();
        repo.fail_if(&FailurePoint::CreateCommit)?;
        if !repo.trees.contains_key(tree_sha) || !repo.commits.contains_key(parent_sha) {
            return Err(ApiError::Status {
                status: 422,
                message: "tree or parent does not exist".to_string(),
            });
        }
        Ok(repo.insert_commit(
            tree_sha.to_string(),
            Some(parent_sha.to_string()),
            message.to_string(),
        ))
    }

    async fn update_ref(&self, branch: &str, commit_sha: &str) -> ApiResult<()> {
        let mut repo = self.lock();
        repo.fail_if(&FailurePoint::UpdateRef)?;
        if !repo.commits.contains_key(commit_sha) {
            return Err(ApiError::Status {
                status: 422,
                message: format!("object {commit_sha} does not exist"),
            });
        }
        repo.refs.insert(branch.to_string(), commit_sha.to_string());
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn seeded() -> MemoryHost {
        MemoryHost::with_files(
            "main",
            &[
                ("Assets/a.txt", b"a".as_slice()),
                ("Assets/Sub/b.txt", b"bb".as_slice()),
                ("ProjectSettings/p.asset", b"p".as_slice()),
            ],
        )
    }

    #[tokio::test]
    async fn test_list_root_groups_directories() {
        let host = seeded();
        let entries = host.list_contents("main", "").await.unwrap();
        let paths: Vec<_> = entries.iter().map(|e| (e.path.as_str(), e.kind)).collect();
        assert_eq!(
            paths,
            vec![("Assets", EntryKind::Dir), ("ProjectSettings", EntryKind::Dir)]
        );
    }

    #[tokio::test]
    async fn test_list_subdirectory() {
        let host = seeded();
        let entries = host.list_contents("main", "Assets").await.unwrap();
        assert_eq!(entries.len(), 2);
        assert!(entries.iter().any(|e| e.path == "Assets/a.txt" && e.kind == EntryKind::File));
        assert!(entries.iter().any(|e| e.path == "Assets/Sub" && e.kind == EntryKind::Dir));
    }

    #[tokio::test]
    async fn test_missing_path_is_not_found() {
        let host = seeded();
        let err = host.list_contents("main", "Nope").await.unwrap_err();
        assert!(err.is_not_found());
    }

    #[tokio::test]
    async fn test_tree_layering_preserves_base() {
        let host = seeded();
        let head = host.branch_head("main").await.unwrap();
        let blob = host.create_blob(b"new").await.unwrap();
        let tree = host
            .create_tree(&head.tree_sha, &[TreeEntry::blob("Assets/c.txt", blob)])
            .await
            .unwrap();
        let commit = host.create_commit("add c", &tree, &head.commit_sha).await.unwrap();
        host.update_ref("main", &commit).await.unwrap();

        assert_eq!(host.file_at("main", "Assets/c.txt").unwrap(), b"new");
        assert_eq!(host.file_at("main", "Assets/a.txt").unwrap(), b"a");
    }

    #[tokio::test]
    async fn test_injected_failure() {
        let host = seeded();
        host.fail_at(FailurePoint::CreateTree);
        let head = host.branch_head("main").await.unwrap();
        assert!(host.create_tree(&head.tree_sha, &[]).await.is_err());
        host.clear_failures();
        assert!(host.create_tree(&head.tree_sha, &[]).await.is_ok());
    }
}
