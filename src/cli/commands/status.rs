//! Status command implementation.

use crate::cli::commands::open_project;
use crate::error::Result;
use crate::sync::{Detector, ScanResult, SyncState};
use colored::Colorize;
use serde::Serialize;
use std::path::Path;

/// Output for status command.
#[derive(Serialize)]
struct StatusOutput<'a> {
    project: String,
    remote: String,
    branch: &'a str,
    tracked: usize,
    excluded: usize,
    #[serde(flatten)]
    scan: &'a ScanResult,
}

/// Execute status command.
///
/// # Errors
///
/// Returns an error if the project is not initialized or its state is corrupt.
pub fn execute(project: Option<&Path>, json: bool) -> Result<()> {
    let project = open_project(project)?;
    let state = SyncState::load(&project.state_dir)?;
    let detector = Detector::with_denylist(project.layout(), &project.config.deny_extensions);
    let scan = detector.scan_project(&state.exclusions, &state.digests);

    if json {
        let output = StatusOutput {
            project: project.root.display().to_string(),
            remote: format!("{}/{}", project.config.owner, project.config.repo),
            branch: &project.config.branch,
            tracked: state.digests.len(),
            excluded: state.exclusions.len(),
            scan: &scan,
        };
        println!("{}", serde_json::to_string(&output)?);
        return Ok(());
    }

    if crate::is_quiet() {
        return Ok(());
    }

    println!(
        "{} {}/{} ({})",
        "Remote:".bold(),
        project.config.owner,
        project.config.repo,
        project.config.branch
    );
    println!(
        "{} {} tracked, {} excluded",
        "State: ".bold(),
        state.digests.len(),
        state.exclusions.len()
    );
    println!();

    if scan.is_clean() && scan.unreadable.is_empty() {
        println!("Nothing to push, working tree matches the last sync.");
        return Ok(());
    }

    print_section("Untracked", &scan.untracked, |p| p.green().to_string());
    print_section("Modified", &scan.modified, |p| p.yellow().to_string());
    print_section("Sidecars", &scan.sidecars, |p| p.dimmed().to_string());

    if !scan.unreadable.is_empty() {
        println!("{} ({})", "Unreadable".red().bold(), scan.unreadable.len());
        for failed in &scan.unreadable {
            println!("  {}  {}", failed.path.red(), failed.reason.dimmed());
        }
        println!();
    }

    if !scan.is_clean() {
        println!(
            "{} file(s) would be pushed. Run 'assetsync push' to commit them.",
            scan.push_candidates().len()
        );
    }
    Ok(())
}

fn print_section(title: &str, paths: &[String], paint: impl Fn(&str) -> String) {
    if paths.is_empty() {
        return;
    }
    println!("{} ({})", title.bold(), paths.len());
    for path in paths {
        println!("  {}", paint(path));
    }
    println!();
}
