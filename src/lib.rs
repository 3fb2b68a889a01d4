//! assetsync - keep a Unity-style project in sync with a GitHub branch
//!
//! This crate provides the core functionality for the `assetsync` CLI tool.
//!
//! # Architecture
//!
//! - [`cli`] - Command-line interface using clap
//! - [`sync`] - Change detection, remote listing, pull and push engines,
//!   history ledger
//! - [`github`] - The [`GitHost`](github::GitHost) seam and its REST and
//!   in-memory implementations
//! - [`config`] - Project discovery, configuration and token resolution
//! - [`error`] - Error types and handling

#![forbid(unsafe_code)]
#![warn(clippy::pedantic)]
#![allow(clippy::module_name_repetitions)]

pub mod cli;
pub mod config;
pub mod error;
pub mod github;
pub mod sync;

pub use error::{Error, Result};

/// Global quiet flag for `--quiet`.
///
/// When set, commands print nothing on success. Avoids threading a
/// `quiet` bool through every handler signature.
pub static QUIET: std::sync::atomic::AtomicBool = std::sync::atomic::AtomicBool::new(false);

/// Check if quiet mode is active.
#[inline]
pub fn is_quiet() -> bool {
    QUIET.load(std::sync::atomic::Ordering::Relaxed)
}
