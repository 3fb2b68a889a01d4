//! Exclusion list commands.

use crate::cli::ExcludeCommands;
use crate::cli::commands::open_project;
use crate::error::{Error, Result};
use crate::sync::{SyncState, validate_repo_path};
use colored::Colorize;
use std::path::Path;

/// Execute exclude commands.
///
/// # Errors
///
/// Returns an error if the project is not initialized, a path is invalid,
/// or the state cannot be saved.
pub fn execute(command: &ExcludeCommands, project: Option<&Path>, json: bool) -> Result<()> {
    let project = open_project(project)?;
    let mut state = SyncState::load(&project.state_dir)?;

    match command {
        ExcludeCommands::Add { paths } => {
            let paths = normalize(paths)?;
            let added: Vec<&String> = paths.iter().filter(|p| state.exclude(p)).collect();
            state.save()?;
            report("Excluded", &added, json)
        }
        ExcludeCommands::Remove { paths } => {
            let paths = normalize(paths)?;
            let removed: Vec<&String> = paths.iter().filter(|p| state.exclusions.remove(p)).collect();
            state.save()?;
            report("Included", &removed, json)
        }
        ExcludeCommands::List => {
            let paths: Vec<&String> = state.exclusions.iter().collect();
            if json {
                println!("{}", serde_json::to_string(&paths)?);
            } else if paths.is_empty() {
                println!("No excluded paths.");
            } else {
                for path in paths {
                    println!("{path}");
                }
            }
            Ok(())
        }
    }
}

/// Trim trailing slashes and reject paths that are not repository paths.
fn normalize(paths: &[String]) -> Result<Vec<String>> {
    paths
        .iter()
        .map(|p| {
            let p = p.trim_end_matches('/').to_string();
            validate_repo_path(&p).map_err(Error::from)?;
            Ok(p)
        })
        .collect()
}

fn report(verb: &str, changed: &[&String], json: bool) -> Result<()> {
    if json {
        println!("{}", serde_json::json!({ "changed": changed }));
    } else if !crate::is_quiet() {
        if changed.is_empty() {
            println!("No changes.");
        }
        for path in changed {
            println!("{} {path}", verb.green());
        }
    }
    Ok(())
}
