//! Configuration management.
//!
//! This module discovers the project root, loads `.assetsync/config.json`
//! and resolves the access token.
//!
//! # Layout
//!
//! - **Project state**: `<project>/.assetsync/` holds `config.json` plus the
//!   digest map, exclusion list and history ledger
//! - **Global credentials**: `~/.assetsync/credentials.json` holds a token
//!   shared by every project on the machine
//!
//! Both directories carry secrets or per-machine state and are never
//! committed.

use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::error::{Error, Result};
use crate::github::ClientSettings;
use crate::sync::{DEFAULT_DENY_EXTENSIONS, DEFAULT_JOBS, DEFAULT_VERSION_FILE, PathLayout, read_json, write_json};

/// Name of the per-project state directory.
pub const STATE_DIR_NAME: &str = ".assetsync";

/// Config file name inside the state directory.
pub const CONFIG_FILE: &str = "config.json";

/// Global credentials file name inside `~/.assetsync/`.
pub const CREDENTIALS_FILE: &str = "credentials.json";

/// Environment variables consulted for a token, in priority order.
pub const TOKEN_ENV_VARS: &[&str] = &["ASSETSYNC_TOKEN", "GITHUB_TOKEN"];

fn default_branch() -> String {
    "main".to_string()
}

fn default_assets_dir() -> String {
    "Assets".to_string()
}

fn default_project_dirs() -> Vec<String> {
    vec!["ProjectSettings".to_string(), "Packages".to_string()]
}

fn default_deny_extensions() -> Vec<String> {
    DEFAULT_DENY_EXTENSIONS.iter().map(ToString::to_string).collect()
}

fn default_version_file() -> String {
    DEFAULT_VERSION_FILE.to_string()
}

fn default_api_base() -> String {
    "https://api.github.com".to_string()
}

fn default_raw_base() -> String {
    "https://raw.githubusercontent.com".to_string()
}

const fn default_timeout_secs() -> u64 {
    30
}

const fn default_max_retries() -> u32 {
    3
}

const fn default_jobs() -> usize {
    DEFAULT_JOBS
}

/// Per-project configuration, `.assetsync/config.json`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Config {
    pub owner: String,
    pub repo: String,
    #[serde(default = "default_branch")]
    pub branch: String,
    /// Primary working tree, relative to the project root.
    #[serde(default = "default_assets_dir")]
    pub assets_dir: String,
    /// Directories synced directly under the project root.
    #[serde(default = "default_project_dirs")]
    pub project_dirs: Vec<String>,
    /// File extensions never scanned.
    #[serde(default = "default_deny_extensions")]
    pub deny_extensions: Vec<String>,
    /// Repository path of the version file.
    #[serde(default = "default_version_file")]
    pub version_file: String,
    #[serde(default = "default_api_base")]
    pub api_base: String,
    #[serde(default = "default_raw_base")]
    pub raw_base: String,
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,
    /// Extra attempts for idempotent reads.
    #[serde(default = "default_max_retries")]
    pub max_retries: u32,
    /// Concurrent transfers.
    #[serde(default = "default_jobs")]
    pub jobs: usize,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub token: Option<String>,
}

impl Config {
    /// Config for `owner/repo` with every other field at its default.
    pub fn new(owner: impl Into<String>, repo: impl Into<String>) -> Self {
        Self {
            owner: owner.into(),
            repo: repo.into(),
            branch: default_branch(),
            assets_dir: default_assets_dir(),
            project_dirs: default_project_dirs(),
            deny_extensions: default_deny_extensions(),
            version_file: default_version_file(),
            api_base: default_api_base(),
            raw_base: default_raw_base(),
            timeout_secs: default_timeout_secs(),
            max_retries: default_max_retries(),
            jobs: default_jobs(),
            token: None,
        }
    }

    /// Load from a state directory.
    ///
    /// # Errors
    ///
    /// Returns `NotInitialized` if the file is missing, or a state error if
    /// it cannot be parsed.
    pub fn load(state_dir: &Path) -> Result<Self> {
        let config: Self = read_json(&state_dir.join(CONFIG_FILE))?.ok_or(Error::NotInitialized)?;
        config.validate()?;
        Ok(config)
    }

    /// Write to a state directory.
    ///
    /// # Errors
    ///
    /// Returns an error if the file cannot be written.
    pub fn save(&self, state_dir: &Path) -> Result<()> {
        write_json(&state_dir.join(CONFIG_FILE), self)?;
        Ok(())
    }

    /// Reject values that would make every remote call fail.
    ///
    /// # Errors
    ///
    /// Returns `Config` naming the offending field.
    pub fn validate(&self) -> Result<()> {
        let bad = |field: &str, value: &str| -> Result<()> {
            Err(Error::Config(format!("invalid {field} '{value}'")))
        };
        for (field, value) in [("owner", &self.owner), ("repo", &self.repo), ("branch", &self.branch)] {
            if value.trim().is_empty() || value.contains(char::is_whitespace) {
                return bad(field, value);
            }
        }
        if self.owner.contains('/') || self.repo.contains('/') {
            return bad("owner/repo", &format!("{}/{}", self.owner, self.repo));
        }
        if self.assets_dir.is_empty() || self.assets_dir.contains('/') {
            return bad("assets_dir", &self.assets_dir);
        }
        if self.timeout_secs == 0 {
            return bad("timeout_secs", "0");
        }
        Ok(())
    }

    /// Path layout rooted at `project_root`.
    #[must_use]
    pub fn layout(&self, project_root: &Path) -> PathLayout {
        PathLayout::new(project_root, self.assets_dir.clone(), self.project_dirs.clone())
    }

    /// HTTP client settings with an already-resolved token.
    #[must_use]
    pub fn client_settings(&self, token: Option<String>) -> ClientSettings {
        ClientSettings {
            api_base: self.api_base.clone(),
            raw_base: self.raw_base.clone(),
            owner: self.owner.clone(),
            repo: self.repo.clone(),
            token,
            timeout: Duration::from_secs(self.timeout_secs),
            max_retries: self.max_retries,
        }
    }
}

/// Machine-wide credentials, `~/.assetsync/credentials.json`.
#[derive(Debug, Default, Clone, Serialize, Deserialize)]
pub struct Credentials {
    #[serde(default)]
    pub token: Option<String>,
}

/// Get the global assetsync directory, `~/.assetsync/`.
#[must_use]
pub fn global_dir() -> Option<PathBuf> {
    directories::BaseDirs::new().map(|b| b.home_dir().join(STATE_DIR_NAME))
}

/// Token from the global credentials file, if any.
fn global_token() -> Option<String> {
    let path = global_dir()?.join(CREDENTIALS_FILE);
    match read_json::<Credentials>(&path) {
        Ok(creds) => creds.and_then(|c| c.token),
        Err(e) => {
            debug!(path = %path.display(), error = %e, "Ignoring unreadable credentials file");
            None
        }
    }
}

fn non_empty(value: Option<String>) -> Option<String> {
    value.map(|v| v.trim().to_string()).filter(|v| !v.is_empty())
}

/// Resolve the access token.
///
/// Priority:
/// 1. Explicit `--token` flag
/// 2. `ASSETSYNC_TOKEN`, then `GITHUB_TOKEN` environment variables
/// 3. `token` in the project config
/// 4. Global credentials file
///
/// Returns `None` when no source has one; anonymous reads still work
/// against public repositories.
#[must_use]
pub fn resolve_token(explicit: Option<&str>, config: &Config) -> Option<String> {
    resolve_token_with(explicit, |var| std::env::var(var).ok(), config, global_token)
}

fn resolve_token_with(
    explicit: Option<&str>,
    env: impl Fn(&str) -> Option<String>,
    config: &Config,
    global: impl FnOnce() -> Option<String>,
) -> Option<String> {
    non_empty(explicit.map(ToString::to_string))
        .or_else(|| TOKEN_ENV_VARS.iter().find_map(|var| non_empty(env(var))))
        .or_else(|| non_empty(config.token.clone()))
        .or_else(|| non_empty(global()))
}

/// Walk up from `start` looking for a directory containing
/// `.assetsync/config.json`.
///
/// The config file is required, not just the directory: the global
/// `~/.assetsync/` holds credentials only and is not a project.
#[must_use]
pub fn find_project_root(start: &Path) -> Option<PathBuf> {
    start
        .ancestors()
        .find(|dir| is_project_root(dir))
        .map(Path::to_path_buf)
}

fn is_project_root(dir: &Path) -> bool {
    dir.join(STATE_DIR_NAME).join(CONFIG_FILE).is_file()
}

/// Get the git repository root directory.
fn git_toplevel() -> Option<PathBuf> {
    std::process::Command::new("git")
        .args(["rev-parse", "--show-toplevel"])
        .output()
        .ok()
        .filter(|o| o.status.success())
        .map(|o| PathBuf::from(String::from_utf8_lossy(&o.stdout).trim().to_string()))
}

/// Discover the project root.
///
/// Resolution strategy:
/// 1. `explicit` (the `--project` flag) if given, used as is
/// 2. Walk up from the current directory
/// 3. The git root, when it carries `.assetsync/`
#[must_use]
pub fn discover_project_root(explicit: Option<&Path>) -> Option<PathBuf> {
    if let Some(path) = explicit {
        return Some(path.to_path_buf());
    }

    std::env::current_dir()
        .ok()
        .and_then(|cwd| find_project_root(&cwd))
        .or_else(|| git_toplevel().filter(|root| is_project_root(root)))
}

/// An initialized project: its root, state directory and config.
#[derive(Debug, Clone)]
pub struct Project {
    pub root: PathBuf,
    pub state_dir: PathBuf,
    pub config: Config,
}

impl Project {
    /// Locate and load the current project.
    ///
    /// # Errors
    ///
    /// Returns `NotInitialized` if no project is found, or the config
    /// loading error.
    pub fn discover(explicit: Option<&Path>) -> Result<Self> {
        let root = discover_project_root(explicit).ok_or(Error::NotInitialized)?;
        Self::open(root)
    }

    /// Load the project rooted at `root`.
    ///
    /// # Errors
    ///
    /// Returns `NotInitialized` if `root` has no config.
    pub fn open(root: PathBuf) -> Result<Self> {
        let state_dir = root.join(STATE_DIR_NAME);
        let config = Config::load(&state_dir)?;
        debug!(root = %root.display(), owner = %config.owner, repo = %config.repo, "Project loaded");
        Ok(Self {
            root,
            state_dir,
            config,
        })
    }

    #[must_use]
    pub fn layout(&self) -> PathLayout {
        self.config.layout(&self.root)
    }
}
