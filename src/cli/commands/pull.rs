//! Pull command implementation.
//!
//! Lists the selected remote paths, drops excluded ones, then either
//! previews what would change or downloads the files and folds the result
//! into the sync state. A history entry is written only when every
//! selected file arrived.

use crate::cli::PullArgs;
use crate::cli::commands::{connect, matches_prefix, open_project, runtime};
use crate::cli::progress;
use crate::config::Project;
use crate::error::{Error, Result};
use crate::github::GitHost;
use crate::sync::{
    CancelFlag, ExclusionList, HistoryEntry, HistoryLedger, PathLayout, ProgressTracker, PullEngine, PullReport,
    PullTarget, RemoteEntry, RemoteListing, SyncState, git_blob_id, list_tree, remote_version,
};
use colored::Colorize;
use serde::Serialize;
use std::path::Path;
use tracing::{debug, info, warn};

/// How a remote file compares with the local copy.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
enum PreviewStatus {
    New,
    Differs,
    Same,
}

#[derive(Debug, Serialize)]
struct PreviewFile {
    path: String,
    size: u64,
    status: PreviewStatus,
}

#[derive(Serialize)]
struct PreviewOutput<'a> {
    git_ref: &'a str,
    partial: bool,
    files: &'a [PreviewFile],
    failed: &'a [crate::sync::FailedPath],
}

#[derive(Serialize)]
struct PullOutput<'a> {
    git_ref: &'a str,
    label: &'a str,
    partial: bool,
    history_recorded: bool,
    #[serde(flatten)]
    report: &'a PullReport,
    listing_failed: &'a [crate::sync::FailedPath],
}

/// A finished pull: what was selected and what happened to it.
#[derive(Debug)]
struct PullRun {
    listing: RemoteListing,
    report: PullReport,
    label: String,
    history_recorded: bool,
}

impl PullRun {
    /// Whether every selected file (and every selected directory) made it.
    fn is_complete(&self) -> bool {
        self.report.is_complete() && !self.listing.is_partial()
    }

    /// Map an incomplete run to its error.
    fn check(&self) -> Result<()> {
        let total = self.listing.files.len();
        if self.report.cancelled {
            return Err(Error::Cancelled {
                completed: self.report.written.len() + self.report.unchanged.len(),
                total,
            });
        }
        let failed = self.report.failed.len() + self.listing.failed.len();
        if failed > 0 {
            return Err(Error::PullIncomplete {
                failed,
                total: total + self.listing.failed.len(),
            });
        }
        Ok(())
    }
}

/// Execute the pull command.
///
/// # Errors
///
/// Returns `PullIncomplete` when some files or directories failed,
/// `Cancelled` on ctrl-c, or the underlying project/state error.
pub fn execute(args: &PullArgs, project: Option<&Path>, token: Option<&str>, json: bool) -> Result<()> {
    let project = open_project(project)?;
    let client = connect(&project, token, false)?;
    let git_ref = args.git_ref.as_deref().unwrap_or(&project.config.branch).to_string();
    let rt = runtime()?;

    if args.preview {
        let (listing, files) = rt.block_on(preview(&client, &project, &args.paths, &git_ref))?;
        print_preview(&git_ref, &listing, &files, json)?;
        return Ok(());
    }

    let cancel = CancelFlag::new();
    let tracker = progress::tracker(json);
    let run = rt.block_on(async {
        let flag = cancel.clone();
        tokio::spawn(async move {
            if tokio::signal::ctrl_c().await.is_ok() {
                warn!("Interrupted, finishing downloads in flight");
                flag.cancel();
            }
        });
        pull(&client, &project, args, &git_ref, &tracker, &cancel).await
    })?;

    print_report(&git_ref, &run, json)?;
    run.check()
}

/// Remote files under `paths` (everything when empty), minus exclusions.
/// A file is excluded under its remote path or the local path it lands on.
async fn select<H: GitHost>(
    host: &H,
    layout: &PathLayout,
    git_ref: &str,
    paths: &[String],
    excluded: &ExclusionList,
) -> RemoteListing {
    let roots: Vec<&str> = if paths.is_empty() {
        vec![""]
    } else {
        paths.iter().map(|p| p.trim_matches('/')).collect()
    };

    let mut selection = RemoteListing::default();
    let mut listed: Vec<&str> = Vec::new();
    for root in roots {
        // A root under one already listed adds nothing.
        if listed.iter().any(|done| matches_prefix(root, done)) {
            continue;
        }
        listed.push(root);
        let listing = list_tree(host, git_ref, root).await;
        selection.files.extend(listing.files);
        selection.failed.extend(listing.failed);
    }

    selection.files.sort_by(|a, b| a.path.cmp(&b.path));
    selection.files.dedup_by(|a, b| a.path == b.path);

    let before = selection.files.len();
    selection.files.retain(|f| {
        !excluded.is_excluded(&f.path)
            && !layout
                .canonical_path(&f.path)
                .is_ok_and(|key| excluded.is_excluded(&key))
    });
    debug!(
        selected = selection.files.len(),
        excluded = before - selection.files.len(),
        "Pull selection"
    );
    selection
}

fn preview_status(layout: &PathLayout, entry: &RemoteEntry) -> PreviewStatus {
    let Ok(local) = layout.local_path(&entry.path) else {
        return PreviewStatus::New;
    };
    match std::fs::read(local) {
        Ok(bytes) if git_blob_id(&bytes) == entry.sha => PreviewStatus::Same,
        Ok(_) => PreviewStatus::Differs,
        Err(_) => PreviewStatus::New,
    }
}

async fn preview<H: GitHost>(
    host: &H,
    project: &Project,
    paths: &[String],
    git_ref: &str,
) -> Result<(RemoteListing, Vec<PreviewFile>)> {
    let state = SyncState::load(&project.state_dir)?;
    let layout = project.layout();
    let listing = select(host, &layout, git_ref, paths, &state.exclusions).await;
    let files = listing
        .files
        .iter()
        .map(|entry| PreviewFile {
            path: entry.path.clone(),
            size: entry.size,
            status: preview_status(&layout, entry),
        })
        .collect();
    Ok((listing, files))
}

/// Label for the history entry: explicit, else the remote version file,
/// else the ref itself.
async fn resolve_label<H: GitHost>(host: &H, project: &Project, git_ref: &str, explicit: Option<&str>) -> String {
    if let Some(label) = explicit {
        return label.to_string();
    }
    match remote_version(host, git_ref, &project.config.version_file).await {
        Ok(Some(version)) => version,
        Ok(None) => git_ref.to_string(),
        Err(e) => {
            warn!(error = %e, "Could not read remote version, labelling pull with the ref");
            git_ref.to_string()
        }
    }
}

async fn pull<H: GitHost>(
    host: &H,
    project: &Project,
    args: &PullArgs,
    git_ref: &str,
    progress: &ProgressTracker,
    cancel: &CancelFlag,
) -> Result<PullRun> {
    let mut state = SyncState::load(&project.state_dir)?;
    let layout = project.layout();

    let listing = select(host, &layout, git_ref, &args.paths, &state.exclusions).await;
    if listing.is_partial() {
        warn!(failed = listing.failed.len(), "Some remote directories could not be listed");
    }
    let label = resolve_label(host, project, git_ref, args.label.as_deref()).await;

    let targets: Vec<PullTarget> = listing.files.iter().map(PullTarget::from).collect();
    let report = PullEngine::new(host, &layout)
        .jobs(project.config.jobs)
        .skip_unchanged(!args.force)
        .pull(targets, git_ref, progress, cancel)
        .await;

    // Whatever was written is on disk now, complete or not.
    state.digests.record_pulled(&report, &layout);
    state.save()?;

    let mut run = PullRun {
        listing,
        report,
        label,
        history_recorded: false,
    };
    if run.is_complete() && !run.listing.files.is_empty() {
        let entry = HistoryEntry::pull(run.label.clone(), args.notes.clone(), &run.report);
        HistoryLedger::open(&project.state_dir).append(&entry)?;
        run.history_recorded = true;
        info!(label = %run.label, files = entry.files, "Pull recorded");
    }
    Ok(run)
}

fn print_preview(git_ref: &str, listing: &RemoteListing, files: &[PreviewFile], json: bool) -> Result<()> {
    if json {
        let output = PreviewOutput {
            git_ref,
            partial: listing.is_partial(),
            files,
            failed: &listing.failed,
        };
        println!("{}", serde_json::to_string(&output)?);
        return Ok(());
    }
    if crate::is_quiet() {
        return Ok(());
    }

    let mut changes = 0;
    for file in files {
        let marker = match file.status {
            PreviewStatus::New => "new".green(),
            PreviewStatus::Differs => "differs".yellow(),
            PreviewStatus::Same => continue,
        };
        changes += 1;
        println!("  {marker:>8}  {}", file.path);
    }
    println!();
    println!(
        "{changes} of {} file(s) at {} would be downloaded.",
        files.len(),
        git_ref.cyan()
    );
    for failed in &listing.failed {
        println!("  {} {}  {}", "unlisted".red(), failed.path, failed.reason.dimmed());
    }
    Ok(())
}

fn print_report(git_ref: &str, run: &PullRun, json: bool) -> Result<()> {
    if json {
        let output = PullOutput {
            git_ref,
            label: &run.label,
            partial: run.listing.is_partial(),
            history_recorded: run.history_recorded,
            report: &run.report,
            listing_failed: &run.listing.failed,
        };
        println!("{}", serde_json::to_string(&output)?);
        return Ok(());
    }
    if crate::is_quiet() {
        return Ok(());
    }

    let report = &run.report;
    if run.listing.files.is_empty() && !run.listing.is_partial() {
        println!("Nothing to pull at {}.", git_ref.cyan());
        return Ok(());
    }

    for file in &report.written {
        println!("  {} {}", "↓".green(), file.path);
    }
    for failed in report.failed.iter().chain(&run.listing.failed) {
        println!("  {} {}  {}", "✗".red(), failed.path, failed.reason.dimmed());
    }
    println!();
    println!(
        "{} {} written, {} unchanged, {} failed",
        "Pulled".green().bold(),
        report.written.len(),
        report.unchanged.len(),
        report.failed.len() + run.listing.failed.len()
    );
    if !report.not_started.is_empty() {
        println!("  {} file(s) not started", report.not_started.len());
    }
    if run.history_recorded {
        println!("  Recorded as {}", run.label.bold());
    }
    Ok(())
}
