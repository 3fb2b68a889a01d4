//! Content hashing for change detection.
//!
//! Two digests are used:
//! - [`content_digest`]: SHA-256 over the raw bytes, stored in the digest
//!   map to classify local files as unchanged / modified / untracked.
//! - [`git_blob_id`]: the SHA-1 object id git assigns to a blob, compared
//!   against the `sha` the hosting service reports to skip downloads of
//!   files that already match.
//!
//! Both depend on content only, never on the file path.

use sha1::Sha1;
use sha2::{Digest, Sha256};

/// SHA-256 of `bytes`, lowercase hex.
#[must_use]
pub fn content_digest(bytes: &[u8]) -> String {
    let mut hasher = Sha256::new();
    hasher.update(bytes);
    format!("{:x}", hasher.finalize())
}

/// Git blob object id: SHA-1 of `"blob <len>\0" + bytes`, lowercase hex.
#[must_use]
pub fn git_blob_id(bytes: &[u8]) -> String {
    let mut hasher = Sha1::new();
    hasher.update(format!("blob {}\0", bytes.len()).as_bytes());
    hasher.update(bytes);
    format!("{:x}", hasher.finalize())
}

/// Check if a file has changed since its digest was recorded.
///
/// Returns `true` if:
/// - There is no stored digest (never pushed or pulled)
/// - The current digest differs from the stored one
#[must_use]
pub fn has_changed(current: &str, stored: Option<&str>) -> bool {
    stored.is_none_or(|d| d != current)
}
