//! Initialize assetsync in a project.
//!
//! Creates `<project>/.assetsync/` with `config.json`, empty sync state
//! and a `.gitignore` that keeps the whole directory out of version
//! control (it may hold a token).

use crate::config::{CONFIG_FILE, Config, STATE_DIR_NAME};
use crate::error::{Error, Result};
use crate::sync::{SyncState, ensure_gitignore};
use colored::Colorize;
use serde::Serialize;
use std::path::{Path, PathBuf};

#[derive(Serialize)]
struct InitOutput<'a> {
    path: PathBuf,
    owner: &'a str,
    repo: &'a str,
    branch: &'a str,
}

/// Execute the init command.
///
/// # Errors
///
/// Returns `AlreadyInitialized` if a config exists and `force` is not set,
/// `Config` for invalid owner/repo/branch, or an I/O error.
pub fn execute(
    owner: &str,
    repo: &str,
    branch: &str,
    force: bool,
    project: Option<&Path>,
    json: bool,
) -> Result<()> {
    let root = match project {
        Some(path) => path.to_path_buf(),
        None => std::env::current_dir()?,
    };
    let state_dir = root.join(STATE_DIR_NAME);

    let config_path = state_dir.join(CONFIG_FILE);
    if config_path.exists() && !force {
        return Err(Error::AlreadyInitialized { path: config_path });
    }

    let mut config = Config::new(owner, repo);
    config.branch = branch.to_string();
    config.validate()?;

    std::fs::create_dir_all(&state_dir)?;
    ensure_gitignore(&state_dir)?;
    config.save(&state_dir)?;

    // Writes the empty documents on a fresh init; keeps existing ones on --force.
    SyncState::load(&state_dir)?.save()?;

    if json {
        let output = InitOutput {
            path: state_dir,
            owner,
            repo,
            branch,
        };
        println!("{}", serde_json::to_string(&output)?);
    } else if !crate::is_quiet() {
        println!(
            "{} assetsync in {}",
            "Initialized".green().bold(),
            root.display()
        );
        println!("  Remote: {owner}/{repo} ({branch})");
        println!("  State:  {}", state_dir.display());
        println!();
        println!("Next: set ASSETSYNC_TOKEN (or GITHUB_TOKEN), then run 'assetsync status'.");
    }

    Ok(())
}
