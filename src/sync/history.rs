//! Append-only ledger of completed pulls and pushes.
//!
//! The ledger is one JSON document, `{"entries": [...]}`, in insertion
//! (chronological) order. Every append reads the whole file, adds one
//! entry and writes the whole file back atomically. Callers serialize
//! access; there is one ledger owner per process.

use std::path::{Path, PathBuf};

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::sync::file::{read_json, write_json};
use crate::sync::types::{PullReport, PushReport, SyncResult};

/// Ledger file name inside the state directory.
pub const HISTORY_FILE: &str = "history.json";

/// Which way the files moved.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Direction {
    Pull,
    Push,
}

impl std::fmt::Display for Direction {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Pull => write!(f, "pull"),
            Self::Push => write!(f, "push"),
        }
    }
}

/// One completed sync operation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct HistoryEntry {
    /// Version label.
    pub version: String,
    /// Free-text release notes.
    #[serde(default)]
    pub notes: String,
    pub timestamp: DateTime<Utc>,
    pub direction: Direction,
    /// Commit created by a push.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub commit: Option<String>,
    /// Number of files transferred.
    #[serde(default)]
    pub files: usize,
}

impl HistoryEntry {
    /// Entry for a successful push, timestamped now.
    pub fn push(version: impl Into<String>, notes: impl Into<String>, report: &PushReport) -> Self {
        Self {
            version: version.into(),
            notes: notes.into(),
            timestamp: Utc::now(),
            direction: Direction::Push,
            commit: Some(report.commit.commit_sha.clone()),
            files: report.pushed.len(),
        }
    }

    /// Entry for a completed pull, timestamped now.
    pub fn pull(version: impl Into<String>, notes: impl Into<String>, report: &PullReport) -> Self {
        Self {
            version: version.into(),
            notes: notes.into(),
            timestamp: Utc::now(),
            direction: Direction::Pull,
            commit: None,
            files: report.written.len(),
        }
    }
}

#[derive(Debug, Default, Serialize, Deserialize)]
struct LedgerFile {
    entries: Vec<HistoryEntry>,
}

/// The history ledger file.
#[derive(Debug, Clone)]
pub struct HistoryLedger {
    path: PathBuf,
}

impl HistoryLedger {
    /// Ledger stored in `state_dir`. Nothing is read until first use.
    pub fn open(state_dir: impl AsRef<Path>) -> Self {
        Self {
            path: state_dir.as_ref().join(HISTORY_FILE),
        }
    }

    #[must_use]
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Every entry, oldest first. A missing ledger is empty.
    ///
    /// # Errors
    ///
    /// Returns an error if the file exists but cannot be read or parsed.
    pub fn load_all(&self) -> SyncResult<Vec<HistoryEntry>> {
        Ok(read_json::<LedgerFile>(&self.path)?
            .unwrap_or_default()
            .entries)
    }

    /// Append one entry.
    ///
    /// # Errors
    ///
    /// Returns an error if the existing ledger is corrupt or the write
    /// fails. A corrupt ledger is never overwritten.
    pub fn append(&self, entry: &HistoryEntry) -> SyncResult<()> {
        let mut entries = self.load_all()?;
        entries.push(entry.clone());
        write_json(&self.path, &LedgerFile { entries })?;
        debug!(version = %entry.version, direction = %entry.direction, "History entry appended");
        Ok(())
    }
}
