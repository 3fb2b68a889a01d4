//! Version check command.

use crate::cli::commands::{connect, open_project, runtime};
use crate::error::Result;
use crate::sync::{VersionStatus, check_version};
use colored::Colorize;
use std::path::Path;

/// Execute the check command.
///
/// # Errors
///
/// Returns an error on network failure or if the local version file
/// cannot be read. A version file missing on the remote is not an error.
pub fn execute(git_ref: Option<&str>, project: Option<&Path>, token: Option<&str>, json: bool) -> Result<()> {
    let project = open_project(project)?;
    let client = connect(&project, token, false)?;
    let git_ref = git_ref.unwrap_or(&project.config.branch);
    let layout = project.layout();

    let status = runtime()?.block_on(check_version(&client, git_ref, &layout, &project.config.version_file))?;

    if json {
        println!("{}", serde_json::to_string(&status)?);
        return Ok(());
    }
    if crate::is_quiet() {
        return Ok(());
    }

    match &status {
        VersionStatus::UpToDate { version } => {
            println!("{} {version}", "Up to date:".green().bold());
        }
        VersionStatus::UpdateAvailable { local, remote } => {
            println!("{} {remote}", "Update available:".yellow().bold());
            println!("  Local:  {}", local.as_deref().unwrap_or("(none)"));
            println!("  Remote: {remote}");
            println!();
            println!("Run 'assetsync pull' to update.");
        }
        VersionStatus::RemoteMissing { local } => {
            println!(
                "{} {} not found at {git_ref}",
                "No remote version:".dimmed(),
                project.config.version_file
            );
            if let Some(local) = local {
                println!("  Local: {local}");
            }
        }
    }
    Ok(())
}
