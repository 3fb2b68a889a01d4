//! Remote listing command.

use crate::cli::commands::{connect, open_project, runtime};
use crate::error::Result;
use crate::sync::{RemoteListing, list_tree};
use colored::Colorize;
use serde::Serialize;
use std::path::Path;
use tracing::warn;

#[derive(Serialize)]
struct RemoteOutput<'a> {
    git_ref: &'a str,
    path: &'a str,
    partial: bool,
    count: usize,
    #[serde(flatten)]
    listing: &'a RemoteListing,
}

/// Execute the remote command.
///
/// A listing with unreachable subdirectories is still printed; the
/// failed directories are reported alongside the files.
///
/// # Errors
///
/// Returns an error if the project is not initialized or the client
/// cannot be built.
pub fn execute(
    path: Option<&str>,
    git_ref: Option<&str>,
    project: Option<&Path>,
    token: Option<&str>,
    json: bool,
) -> Result<()> {
    let project = open_project(project)?;
    let client = connect(&project, token, false)?;
    let git_ref = git_ref.unwrap_or(&project.config.branch);
    let path = path.map_or("", |p| p.trim_matches('/'));

    let listing = runtime()?.block_on(list_tree(&client, git_ref, path));
    if listing.is_partial() {
        warn!(failed = listing.failed.len(), "Remote listing is incomplete");
    }

    if json {
        let output = RemoteOutput {
            git_ref,
            path,
            partial: listing.is_partial(),
            count: listing.files.len(),
            listing: &listing,
        };
        println!("{}", serde_json::to_string(&output)?);
        return Ok(());
    }

    if crate::is_quiet() {
        return Ok(());
    }

    for entry in &listing.files {
        println!("{:>10}  {}", format_size(entry.size).dimmed(), entry.path);
    }
    println!();
    println!("{} file(s) at {}", listing.files.len(), git_ref.cyan());

    if listing.is_partial() {
        println!();
        println!("{}", "Some directories could not be listed:".yellow().bold());
        for failed in &listing.failed {
            println!("  {}  {}", failed.path.yellow(), failed.reason.dimmed());
        }
    }
    Ok(())
}

/// Format a byte size as a human-readable string.
#[allow(clippy::cast_precision_loss)]
pub(crate) fn format_size(bytes: u64) -> String {
    const KB: u64 = 1024;
    const MB: u64 = 1024 * KB;

    if bytes >= MB {
        format!("{:.1} MB", bytes as f64 / MB as f64)
    } else if bytes >= KB {
        format!("{:.1} KB", bytes as f64 / KB as f64)
    } else {
        format!("{bytes} B")
    }
}
