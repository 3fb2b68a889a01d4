//! Wire types for the GitHub REST API.
//!
//! Only the fields this crate reads are declared; serde ignores the rest.

use serde::{Deserialize, Serialize};

/// Kind of an entry returned by the contents endpoint.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EntryKind {
    File,
    Dir,
    Symlink,
    Submodule,
}

impl std::fmt::Display for EntryKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::File => write!(f, "file"),
            Self::Dir => write!(f, "dir"),
            Self::Symlink => write!(f, "symlink"),
            Self::Submodule => write!(f, "submodule"),
        }
    }
}

/// One item of a `GET /repos/{owner}/{repo}/contents/{path}` response.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ContentEntry {
    /// Repository-relative path, POSIX separated.
    pub path: String,
    /// Entry kind.
    #[serde(rename = "type")]
    pub kind: EntryKind,
    /// Git object id (blob sha for files).
    pub sha: String,
    /// Size in bytes (0 for directories).
    #[serde(default)]
    pub size: u64,
}

/// The contents endpoint returns an array for a directory and an object for a file.
#[derive(Debug, Deserialize)]
#[serde(untagged)]
pub(crate) enum ContentsResponse {
    Many(Vec<ContentEntry>),
    One(ContentEntry),
}

impl ContentsResponse {
    pub(crate) fn into_entries(self) -> Vec<ContentEntry> {
        match self {
            Self::Many(entries) => entries,
            Self::One(entry) => vec![entry],
        }
    }
}

/// Resolved head of a branch: its commit and that commit's tree.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct BranchHead {
    pub commit_sha: String,
    pub tree_sha: String,
}

/// One entry of a `POST /git/trees` request.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TreeEntry {
    pub path: String,
    pub mode: String,
    #[serde(rename = "type")]
    pub kind: String,
    pub sha: String,
}

impl TreeEntry {
    /// Regular (non-executable) file blob entry.
    #[must_use]
    pub fn blob(path: impl Into<String>, sha: impl Into<String>) -> Self {
        Self {
            path: path.into(),
            mode: "100644".to_string(),
            kind: "blob".to_string(),
            sha: sha.into(),
        }
    }
}

// ── Request / response bodies ─────────────────────────────────

#[derive(Debug, Deserialize)]
pub(crate) struct RefResponse {
    pub object: RefObject,
}

#[derive(Debug, Deserialize)]
pub(crate) struct RefObject {
    pub sha: String,
}

#[derive(Debug, Deserialize)]
pub(crate) struct CommitResponse {
    pub tree: ShaOnly,
}

#[derive(Debug, Deserialize)]
pub(crate) struct ShaOnly {
    pub sha: String,
}

#[derive(Debug, Serialize)]
pub(crate) struct CreateBlobRequest<'a> {
    pub content: &'a str,
    pub encoding: &'a str,
}

#[derive(Debug, Serialize)]
pub(crate) struct CreateTreeRequest<'a> {
    pub base_tree: &'a str,
    pub tree: &'a [TreeEntry],
}

#[derive(Debug, Serialize)]
pub(crate) struct CreateCommitRequest<'a> {
    pub message: &'a str,
    pub tree: &'a str,
    pub parents: [&'a str; 1],
}

#[derive(Debug, Serialize)]
pub(crate) struct UpdateRefRequest<'a> {
    pub sha: &'a str,
    pub force: bool,
}

/// Error body GitHub sends with non-2xx responses.
#[derive(Debug, Default, Deserialize)]
pub(crate) struct ErrorBody {
    #[serde(default)]
    pub message: String,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_contents_response_directory() {
        let json = r#"[
            {"name":"a.txt","path":"Assets/a.txt","sha":"abc","size":3,"type":"file","download_url":"x"},
            {"name":"Sub","path":"Assets/Sub","sha":"def","size":0,"type":"dir","download_url":null}
        ]"#;
        let parsed: ContentsResponse = serde_json::from_str(json).unwrap();
        let entries = parsed.into_entries();
        assert_eq!(entries.len(), 2);
        assert_eq!(entries[0].kind, EntryKind::File);
        assert_eq!(entries[1].kind, EntryKind::Dir);
        assert_eq!(entries[1].path, "Assets/Sub");
    }

    #[test]
    fn test_contents_response_single_file() {
        let json = r#"{"name":"version.txt","path":"Assets/version.txt","sha":"123","size":5,"type":"file","content":"MS4w"}"#;
        let parsed: ContentsResponse = serde_json::from_str(json).unwrap();
        let entries = parsed.into_entries();
        assert_eq!(entries.len(), 1);
        assert_eq!(entries[0].sha, "123");
    }

    #[test]
    fn test_tree_entry_blob_serializes_type_field() {
        let entry = TreeEntry::blob("Assets/a.txt", "abc");
        let value = serde_json::to_value(&entry).unwrap();
        assert_eq!(value["type"], "blob");
        assert_eq!(value["mode"], "100644");
    }

    #[test]
    fn test_create_commit_request_has_single_parent() {
        let req = CreateCommitRequest {
            message: "msg",
            tree: "t1",
            parents: ["p1"],
        };
        let value = serde_json::to_value(&req).unwrap();
        assert_eq!(value["parents"], serde_json::json!(["p1"]));
    }
}
