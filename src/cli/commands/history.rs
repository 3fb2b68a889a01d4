//! History command implementation.

use crate::cli::commands::open_project;
use crate::error::Result;
use crate::sync::{Direction, HistoryEntry, HistoryLedger};
use colored::Colorize;
use serde::Serialize;
use std::path::Path;

#[derive(Serialize)]
struct HistoryOutput<'a> {
    entries: &'a [HistoryEntry],
    count: usize,
    total: usize,
}

/// Execute the history command. Entries are shown newest first.
///
/// # Errors
///
/// Returns an error if the project is not initialized or the ledger is
/// corrupt.
pub fn execute(limit: usize, project: Option<&Path>, json: bool) -> Result<()> {
    let project = open_project(project)?;
    let ledger = HistoryLedger::open(&project.state_dir);
    let all = ledger.load_all()?;
    let total = all.len();
    let entries = newest_first(all, limit);

    if json {
        let output = HistoryOutput {
            entries: &entries,
            count: entries.len(),
            total,
        };
        println!("{}", serde_json::to_string(&output)?);
        return Ok(());
    }
    if crate::is_quiet() {
        return Ok(());
    }

    if entries.is_empty() {
        println!("No history yet.");
        return Ok(());
    }

    for entry in &entries {
        let direction = match entry.direction {
            Direction::Pull => "pull".cyan(),
            Direction::Push => "push".magenta(),
        };
        let commit = entry.commit.as_deref().map_or(String::new(), |sha| {
            format!(" {}", &sha[..sha.len().min(7)])
        });
        println!(
            "{}  {direction}  {}{}  ({} files)",
            entry.timestamp.format("%Y-%m-%d %H:%M:%S").to_string().dimmed(),
            entry.version.bold(),
            commit.dimmed(),
            entry.files
        );
        if !entry.notes.is_empty() {
            for line in entry.notes.lines() {
                println!("    {line}");
            }
        }
    }
    if total > entries.len() {
        println!();
        println!("{} of {total} entries shown", entries.len());
    }
    Ok(())
}

fn newest_first(mut entries: Vec<HistoryEntry>, limit: usize) -> Vec<HistoryEntry> {
    entries.reverse();
    entries.truncate(limit);
    entries
}
