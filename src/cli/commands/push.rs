//! Push command implementation.

use crate::cli::PushArgs;
use crate::cli::commands::{connect, matches_prefix, open_project, runtime};
use crate::cli::progress;
use crate::config::Project;
use crate::error::{Error, Result};
use crate::github::GitHost;
use crate::sync::{
    Detector, HistoryEntry, HistoryLedger, PathLayout, ProgressTracker, PushEngine, PushReport, SyncState,
    read_local_version, sidecar_path, write_version_file,
};
use colored::Colorize;
use serde::Serialize;
use std::path::Path;
use tracing::{debug, info, warn};

#[derive(Serialize)]
struct PushOutput<'a> {
    branch: &'a str,
    label: &'a str,
    message: &'a str,
    #[serde(flatten)]
    report: &'a PushReport,
}

#[derive(Debug)]
struct PushRun {
    report: PushReport,
    label: String,
    message: String,
}

/// Execute the push command.
///
/// # Errors
///
/// Returns `MissingToken` without a token, `NothingToPush` when none of
/// the selected files exist, or the failed push step.
pub fn execute(args: &PushArgs, project: Option<&Path>, token: Option<&str>, json: bool) -> Result<()> {
    let project = open_project(project)?;
    let client = connect(&project, token, true)?;
    let tracker = progress::tracker(json);

    let run = runtime()?.block_on(async {
        // Once the ref moves the local fold must follow, so an interrupt
        // only warns.
        tokio::spawn(async {
            if tokio::signal::ctrl_c().await.is_ok() {
                warn!("Push in progress, cannot cancel; finishing");
            }
        });
        push(&client, &project, args, &tracker).await
    })?;
    let Some(run) = run else {
        if json {
            println!("{}", serde_json::json!({ "pushed": [], "commit": null }));
        } else if !crate::is_quiet() {
            println!("Nothing to push.");
        }
        return Ok(());
    };

    if json {
        let output = PushOutput {
            branch: &project.config.branch,
            label: &run.label,
            message: &run.message,
            report: &run.report,
        };
        println!("{}", serde_json::to_string(&output)?);
        return Ok(());
    }
    if crate::is_quiet() {
        return Ok(());
    }

    for file in &run.report.pushed {
        println!("  {} {}", "↑".green(), file.path);
    }
    for skipped in &run.report.skipped {
        println!("  {} {}  {}", "-".dimmed(), skipped.path, skipped.reason.dimmed());
    }
    println!();
    println!(
        "{} {} file(s) to {} as {}",
        "Pushed".green().bold(),
        run.report.pushed.len(),
        project.config.branch.cyan(),
        short_sha(&run.report.commit.commit_sha).bold()
    );
    println!("  Recorded as {}", run.label.bold());
    Ok(())
}

fn short_sha(sha: &str) -> &str {
    &sha[..sha.len().min(7)]
}

/// Files to push, as remote paths: the detector's candidates, narrowed to
/// `paths` when given. Files named explicitly are pushed even when
/// unchanged, with their sidecars. Excluded paths never are.
///
/// A file pulled from outside the reserved directories goes back to the
/// remote path it came from.
fn selection(project: &Project, layout: &PathLayout, state: &SyncState, args: &PushArgs) -> Vec<String> {
    let detector = Detector::with_denylist(layout.clone(), &project.config.deny_extensions);
    let scan = detector.scan_project(&state.exclusions, &state.digests);
    let candidates = scan.push_candidates();

    let mut files: Vec<String> = if args.paths.is_empty() {
        candidates
    } else {
        let prefixes: Vec<&str> = args.paths.iter().map(|p| p.trim_matches('/')).collect();
        let mut files: Vec<String> = candidates
            .into_iter()
            .filter(|c| prefixes.iter().any(|p| matches_prefix(c, p)))
            .collect();
        for path in &prefixes {
            if !is_local_file(layout, path) {
                continue;
            }
            files.push((*path).to_string());
            let sidecar = sidecar_path(path);
            if layout.is_asset(path) && is_local_file(layout, &sidecar) {
                files.push(sidecar);
            }
        }
        files
    };

    if args.version.is_some() {
        files.push(project.config.version_file.clone());
    }

    let mut remote: Vec<String> = files
        .into_iter()
        .filter_map(|f| {
            let key = layout.canonical_path(&f).unwrap_or(f);
            if state.exclusions.is_excluded(&key) {
                return None;
            }
            let path = state.digests.remote_path(&key);
            (!state.exclusions.is_excluded(path)).then(|| path.to_string())
        })
        .collect();
    remote.sort();
    remote.dedup();
    debug!(files = remote.len(), "Push selection");
    remote
}

fn is_local_file(layout: &PathLayout, repo_path: &str) -> bool {
    layout.local_path(repo_path).is_ok_and(|p| p.is_file())
}

fn commit_message(args: &PushArgs, files: usize) -> String {
    if let Some(message) = &args.message {
        return message.clone();
    }
    match &args.version {
        Some(version) => format!("Updating files to version {version} {}", args.notes)
            .trim()
            .to_string(),
        None => format!("Updating {files} files"),
    }
}

/// Run a push. `None` means there was nothing to push.
async fn push<H: GitHost>(
    host: &H,
    project: &Project,
    args: &PushArgs,
    progress: &ProgressTracker,
) -> Result<Option<PushRun>> {
    let mut state = SyncState::load(&project.state_dir)?;
    let layout = project.layout();
    let version_file = &project.config.version_file;

    if let Some(version) = &args.version {
        if version.trim().is_empty() || version.contains('\n') {
            return Err(Error::InvalidArgument(format!("invalid version label '{version}'")));
        }
        write_version_file(&layout, version_file, version, &args.notes)?;
    }

    let files = selection(project, &layout, &state, args);
    if files.is_empty() {
        return Ok(None);
    }

    let message = commit_message(args, files.len());
    let report = PushEngine::new(host, &layout)
        .jobs(project.config.jobs)
        .push(&files, &message, &project.config.branch, progress)
        .await?;

    let label = record_push(project, &mut state, &layout, args, &report)?;
    Ok(Some(PushRun { report, label, message }))
}

/// Fold a landed push into local state: digests first, then the history
/// entry. Returns the label recorded.
fn record_push(
    project: &Project,
    state: &mut SyncState,
    layout: &PathLayout,
    args: &PushArgs,
    report: &PushReport,
) -> Result<String> {
    state.digests.record_pushed(report, layout);
    state.save()?;

    let label = match &args.version {
        Some(version) => version.clone(),
        None => read_local_version(layout, &project.config.version_file)?
            .unwrap_or_else(|| short_sha(&report.commit.commit_sha).to_string()),
    };
    let entry = HistoryEntry::push(label.clone(), args.notes.clone(), report);
    HistoryLedger::open(&project.state_dir).append(&entry)?;
    info!(label = %label, commit = %report.commit.commit_sha, "Push recorded");
    Ok(label)
}
