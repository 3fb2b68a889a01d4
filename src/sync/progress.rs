//! Progress reporting and cancellation.
//!
//! Engines are the only writers of a [`ProgressTracker`]; they update it
//! from the task that drives the operation, after each file. Readers never
//! see a half-applied update: they either poll [`ProgressTracker::snapshot`]
//! or receive a copy through a [`ProgressSink`].

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex, PoisonError};

use serde::Serialize;

/// Which operation a snapshot describes.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Phase {
    #[default]
    Idle,
    Downloading,
    ResolvingHead,
    UploadingBlobs,
    CreatingTree,
    CreatingCommit,
    UpdatingRef,
    Done,
}

/// Point-in-time copy of an operation's progress.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct ProgressSnapshot {
    pub phase: Phase,
    /// Files the operation will touch.
    pub total: usize,
    /// Files finished, successfully or not.
    pub completed: usize,
    pub failed: usize,
    /// Path most recently finished.
    pub current: Option<String>,
}

impl ProgressSnapshot {
    /// Completion in percent, 0-100.
    #[must_use]
    pub fn percent(&self) -> u8 {
        if self.total == 0 {
            return if self.phase == Phase::Done { 100 } else { 0 };
        }
        let pct = self.completed.min(self.total) * 100 / self.total;
        u8::try_from(pct).unwrap_or(100)
    }
}

/// Receives a snapshot after every progress update.
pub trait ProgressSink: Send + Sync {
    fn update(&self, snapshot: &ProgressSnapshot);
}

/// Discards updates.
#[derive(Debug, Default, Clone, Copy)]
pub struct NoProgress;

impl ProgressSink for NoProgress {
    fn update(&self, _snapshot: &ProgressSnapshot) {}
}

/// Shared progress state for one operation.
pub struct ProgressTracker {
    state: Mutex<ProgressSnapshot>,
    sink: Arc<dyn ProgressSink>,
}

impl std::fmt::Debug for ProgressTracker {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ProgressTracker")
            .field("state", &self.snapshot())
            .finish_non_exhaustive()
    }
}

impl Default for ProgressTracker {
    fn default() -> Self {
        Self::new(Arc::new(NoProgress))
    }
}

impl ProgressTracker {
    pub fn new(sink: Arc<dyn ProgressSink>) -> Self {
        Self {
            state: Mutex::new(ProgressSnapshot::default()),
            sink,
        }
    }

    /// Current state.
    #[must_use]
    pub fn snapshot(&self) -> ProgressSnapshot {
        self.state.lock().unwrap_or_else(PoisonError::into_inner).clone()
    }

    fn apply(&self, f: impl FnOnce(&mut ProgressSnapshot)) {
        let snapshot = {
            let mut state = self.state.lock().unwrap_or_else(PoisonError::into_inner);
            f(&mut state);
            state.clone()
        };
        self.sink.update(&snapshot);
    }

    /// Start a phase over `total` files, resetting the counters.
    pub fn begin(&self, phase: Phase, total: usize) {
        self.apply(|s| {
            *s = ProgressSnapshot {
                phase,
                total,
                ..ProgressSnapshot::default()
            };
        });
    }

    /// Move to a new phase, keeping the counters.
    pub fn set_phase(&self, phase: Phase) {
        self.apply(|s| s.phase = phase);
    }

    /// One file finished.
    pub fn file_done(&self, path: &str, ok: bool) {
        self.apply(|s| {
            s.completed += 1;
            if !ok {
                s.failed += 1;
            }
            s.current = Some(path.to_string());
        });
    }

    pub fn finish(&self) {
        self.set_phase(Phase::Done);
    }
}

/// Cooperative cancellation flag, cheap to clone.
#[derive(Debug, Clone, Default)]
pub struct CancelFlag(Arc<AtomicBool>);

impl CancelFlag {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    pub fn cancel(&self) {
        self.0.store(true, Ordering::SeqCst);
    }

    #[must_use]
    pub fn is_cancelled(&self) -> bool {
        self.0.load(Ordering::SeqCst)
    }
}
