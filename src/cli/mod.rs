//! CLI definitions using clap.

use clap::{Args, Parser, Subcommand};
use std::path::PathBuf;

pub mod commands;
pub mod progress;

/// assetsync - sync a Unity project with a GitHub branch
#[derive(Parser, Debug)]
#[command(name = "assetsync", author, version, about, long_about = None)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,

    /// Project root (default: nearest directory with .assetsync/)
    #[arg(long, global = true, env = "ASSETSYNC_PROJECT")]
    pub project: Option<PathBuf>,

    /// Access token (default: ASSETSYNC_TOKEN, GITHUB_TOKEN, config, credentials file)
    #[arg(long, global = true, env = "ASSETSYNC_TOKEN", hide_env_values = true)]
    pub token: Option<String>,

    /// Output as JSON
    #[arg(long, global = true)]
    pub json: bool,

    /// Increase logging verbosity (-v, -vv)
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    pub verbose: u8,

    /// Quiet mode (no output except errors)
    #[arg(short, long, global = true)]
    pub quiet: bool,

    /// Disable colored output
    #[arg(long, global = true)]
    pub no_color: bool,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Initialize assetsync in a project
    Init {
        /// Repository owner (user or organization)
        #[arg(long)]
        owner: String,

        /// Repository name
        #[arg(long)]
        repo: String,

        /// Branch to sync with
        #[arg(long, default_value = "main")]
        branch: String,

        /// Overwrite an existing configuration
        #[arg(long)]
        force: bool,
    },

    /// Show local files that changed since the last sync
    Status,

    /// Manage paths excluded from sync
    Exclude {
        #[command(subcommand)]
        command: ExcludeCommands,
    },

    /// List files on the remote branch
    Remote {
        /// Directory to list (default: repository root)
        path: Option<String>,

        /// Branch, tag or commit (default: configured branch)
        #[arg(long = "ref")]
        git_ref: Option<String>,
    },

    /// Download files from the remote branch
    Pull(PullArgs),

    /// Commit local changes to the remote branch
    Push(PushArgs),

    /// Show past pulls and pushes, newest first
    History {
        /// Maximum entries to show
        #[arg(long, short = 'n', default_value = "20")]
        limit: usize,
    },

    /// Compare the local version file with the remote one
    Check {
        /// Branch, tag or commit (default: configured branch)
        #[arg(long = "ref")]
        git_ref: Option<String>,
    },

    /// Generate shell completions
    Completions {
        /// Shell to generate completions for
        #[arg(value_enum)]
        shell: Shell,
    },

    /// Print version information
    Version,
}

/// Supported shells for completions.
#[derive(clap::ValueEnum, Clone, Debug)]
pub enum Shell {
    Bash,
    Zsh,
    Fish,
    PowerShell,
    Elvish,
}

#[derive(Subcommand, Debug)]
pub enum ExcludeCommands {
    /// Exclude paths (files or directories) from sync
    Add {
        /// Repository paths, e.g. Assets/Generated
        #[arg(required = true)]
        paths: Vec<String>,
    },

    /// Include previously excluded paths again
    Remove {
        #[arg(required = true)]
        paths: Vec<String>,
    },

    /// List excluded paths
    List,
}

#[derive(Args, Debug)]
pub struct PullArgs {
    /// Files or directories to pull (default: everything)
    pub paths: Vec<String>,

    /// Branch, tag or commit (default: configured branch)
    #[arg(long = "ref")]
    pub git_ref: Option<String>,

    /// Only show what would be pulled
    #[arg(long)]
    pub preview: bool,

    /// Download files even when the local copy already matches
    #[arg(long)]
    pub force: bool,

    /// Version label for the history entry (default: remote version file)
    #[arg(long)]
    pub label: Option<String>,

    /// Notes for the history entry
    #[arg(long, default_value = "")]
    pub notes: String,
}

#[derive(Args, Debug)]
pub struct PushArgs {
    /// Files or directories to push (default: every changed file)
    pub paths: Vec<String>,

    /// Commit message
    #[arg(short, long)]
    pub message: Option<String>,

    /// Write this version to the version file and push it along
    #[arg(long)]
    pub version: Option<String>,

    /// Release notes for the version file and history entry
    #[arg(long, default_value = "")]
    pub notes: String,
}
