//! Terminal progress bar fed by a [`ProgressTracker`](crate::sync::ProgressTracker).

use std::io::IsTerminal;
use std::sync::Arc;

use indicatif::{ProgressBar, ProgressDrawTarget, ProgressStyle};

use crate::sync::{Phase, ProgressSink, ProgressSnapshot, ProgressTracker};

/// Renders snapshots as an indicatif bar on stderr.
#[derive(Debug, Clone)]
pub struct BarSink {
    bar: ProgressBar,
}

impl BarSink {
    fn new() -> Self {
        let bar = ProgressBar::with_draw_target(Some(0), ProgressDrawTarget::stderr());
        if let Ok(style) = ProgressStyle::default_bar().template("  {msg} [{bar:40.cyan/blue}] {pos}/{len}") {
            bar.set_style(style.progress_chars("█▓░"));
        }
        Self { bar }
    }
}

fn phase_label(phase: Phase) -> &'static str {
    match phase {
        Phase::Idle => "Starting",
        Phase::Downloading => "Downloading",
        Phase::ResolvingHead => "Resolving branch",
        Phase::UploadingBlobs => "Uploading",
        Phase::CreatingTree => "Creating tree",
        Phase::CreatingCommit => "Creating commit",
        Phase::UpdatingRef => "Updating branch",
        Phase::Done => "Done",
    }
}

impl ProgressSink for BarSink {
    fn update(&self, snapshot: &ProgressSnapshot) {
        if snapshot.phase == Phase::Done {
            self.bar.finish_and_clear();
            return;
        }
        self.bar.set_length(snapshot.total as u64);
        self.bar.set_position(snapshot.completed as u64);
        self.bar.set_message(phase_label(snapshot.phase));
    }
}

/// Tracker that draws a bar when a human is watching, and stays silent
/// for `--json`, `--quiet` or redirected stderr.
#[must_use]
pub fn tracker(json: bool) -> ProgressTracker {
    if json || crate::is_quiet() || !std::io::stderr().is_terminal() {
        ProgressTracker::default()
    } else {
        ProgressTracker::new(Arc::new(BarSink::new()))
    }
}
