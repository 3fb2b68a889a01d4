//! Atomic file operations for sync.
//!
//! This module provides safe file operations that prevent data corruption:
//! - Atomic writes: write to a sibling temp file, sync to disk, then rename
//! - JSON documents (state files) read and written whole
//! - A `.gitignore` for the state directory

use std::ffi::OsString;
use std::fs::{self, File};
use std::io::{BufWriter, Write};
use std::path::{Path, PathBuf};

use serde::Serialize;
use serde::de::DeserializeOwned;

use crate::sync::types::{SyncError, SyncResult};

/// Suffix of in-flight temp files. Ends in `.tmp` so scans skip them.
const TEMP_SUFFIX: &str = ".assetsync.tmp";

/// Sibling temp path for `path`: `dir/.name.assetsync.tmp`.
fn temp_path_for(path: &Path) -> PathBuf {
    let mut name = OsString::from(".");
    name.push(path.file_name().unwrap_or_default());
    name.push(TEMP_SUFFIX);
    path.with_file_name(name)
}

/// Write bytes to a file atomically.
///
/// This function:
/// 1. Creates the parent directory if needed
/// 2. Writes content to a temp file next to the target
/// 3. Calls `fsync` to ensure data is on disk
/// 4. Atomically renames the temp file over the target
///
/// If any step fails, the original file (if any) remains untouched and the
/// temp file is removed.
///
/// # Errors
///
/// Returns an error if any file operation fails.
pub fn atomic_write(path: &Path, content: &[u8]) -> SyncResult<()> {
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent)?;
    }

    let temp_path = temp_path_for(path);

    let written = (|| -> std::io::Result<()> {
        let file = File::create(&temp_path)?;
        let mut writer = BufWriter::new(file);
        writer.write_all(content)?;
        writer.flush()?;
        writer.get_ref().sync_all()?;
        fs::rename(&temp_path, path)
    })();

    if let Err(e) = written {
        let _ = fs::remove_file(&temp_path);
        return Err(e.into());
    }

    Ok(())
}

/// Read a JSON document, returning `None` if the file does not exist.
///
/// A file that exists but does not parse is an error, never an empty value.
///
/// # Errors
///
/// Returns an error if the file cannot be read or parsed.
pub fn read_json<T: DeserializeOwned>(path: &Path) -> SyncResult<Option<T>> {
    let content = match fs::read_to_string(path) {
        Ok(content) => content,
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(None),
        Err(e) => return Err(e.into()),
    };

    serde_json::from_str(&content)
        .map(Some)
        .map_err(|e| SyncError::CorruptState {
            path: path.display().to_string(),
            message: e.to_string(),
        })
}

/// Write a JSON document atomically (pretty-printed, trailing newline).
///
/// # Errors
///
/// Returns an error if serialization or the write fails.
pub fn write_json<T: Serialize + ?Sized>(path: &Path, value: &T) -> SyncResult<()> {
    let mut content = serde_json::to_string_pretty(value)?;
    content.push('\n');
    atomic_write(path, content.as_bytes())
}

/// Generate .gitignore content for the `.assetsync` directory.
///
/// The directory holds the access token and per-machine sync state, none of
/// which belongs in version control.
#[must_use]
pub fn gitignore_content() -> &'static str {
    r"# assetsync state directory
# Holds credentials and per-machine sync state; never commit it.
*
"
}

/// Ensure .gitignore exists in the state directory.
///
/// If the file already exists, it is not modified (user may have customized it).
///
/// # Errors
///
/// Returns an error if the file cannot be written.
pub fn ensure_gitignore(state_dir: &Path) -> SyncResult<()> {
    let gitignore_path = state_dir.join(".gitignore");

    if gitignore_path.exists() {
        return Ok(());
    }

    atomic_write(&gitignore_path, gitignore_content().as_bytes())
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde::Deserialize;
    use tempfile::TempDir;

    #[derive(Debug, PartialEq, Serialize, Deserialize)]
    struct Doc {
        name: String,
        count: u32,
    }

    #[test]
    fn test_atomic_write_creates_parents() {
        let temp_dir = TempDir::new().unwrap();
        let path = temp_dir.path().join("a").join("b").join("file.bin");

        atomic_write(&path, &[0, 159, 146, 150]).unwrap();

        assert_eq!(fs::read(&path).unwrap(), vec![0, 159, 146, 150]);
        assert!(!temp_path_for(&path).exists());
    }

    #[test]
    fn test_atomic_write_overwrites() {
        let temp_dir = TempDir::new().unwrap();
        let path = temp_dir.path().join("file.txt");
        fs::write(&path, "old").unwrap();

        atomic_write(&path, b"new").unwrap();

        assert_eq!(fs::read_to_string(&path).unwrap(), "new");
    }

    #[test]
    fn test_temp_path_is_hidden_sibling() {
        let temp = temp_path_for(Path::new("/x/y/scene.unity"));
        assert_eq!(temp, PathBuf::from("/x/y/.scene.unity.assetsync.tmp"));
    }

    #[test]
    fn test_json_roundtrip_and_missing() {
        let temp_dir = TempDir::new().unwrap();
        let path = temp_dir.path().join("doc.json");

        let missing: Option<Doc> = read_json(&path).unwrap();
        assert!(missing.is_none());

        let doc = Doc {
            name: "x".into(),
            count: 2,
        };
        write_json(&path, &doc).unwrap();
        let loaded: Option<Doc> = read_json(&path).unwrap();
        assert_eq!(loaded, Some(doc));
    }

    #[test]
    fn test_corrupt_json_is_an_error() {
        let temp_dir = TempDir::new().unwrap();
        let path = temp_dir.path().join("doc.json");
        fs::write(&path, "{not json").unwrap();

        let result: SyncResult<Option<Doc>> = read_json(&path);
        assert!(matches!(result, Err(SyncError::CorruptState { .. })));
    }

    #[test]
    fn test_ensure_gitignore_creates_file() {
        let temp_dir = TempDir::new().unwrap();
        let gitignore_path = temp_dir.path().join(".gitignore");

        assert!(!gitignore_path.exists());
        ensure_gitignore(temp_dir.path()).unwrap();
        assert!(gitignore_path.exists());

        let content = fs::read_to_string(&gitignore_path).unwrap();
        assert!(content.lines().any(|l| l == "*"));
    }

    #[test]
    fn test_ensure_gitignore_does_not_overwrite() {
        let temp_dir = TempDir::new().unwrap();
        let gitignore_path = temp_dir.path().join(".gitignore");

        fs::write(&gitignore_path, "# Custom content\n").unwrap();
        ensure_gitignore(temp_dir.path()).unwrap();

        let content = fs::read_to_string(&gitignore_path).unwrap();
        assert!(content.contains("Custom content"));
    }
}
