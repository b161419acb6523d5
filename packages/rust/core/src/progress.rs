//! Progress reporting for generation runs.
//!
//! Reporters are observers only: the orchestrator guards every invocation so
//! a panicking subscriber cannot abort a run.

use std::panic::{catch_unwind, AssertUnwindSafe};

use tracing::warn;

/// What a progress event describes.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ProgressKind {
    /// A job-level phase boundary.
    Phase,
    /// A per-subtopic pipeline step.
    Subtopic,
    /// A job-level failure. Per-subtopic failures surface as `Subtopic`
    /// events; the job keeps going.
    Error,
    /// The run finished.
    Done,
}

/// One progress event emitted at a phase boundary.
#[derive(Debug, Clone)]
pub struct ProgressEvent {
    pub kind: ProgressKind,
    /// Human-readable phase name (e.g. "Collecting sources").
    pub phase: String,
    /// 1-based position within `total`; 0 for job-level events.
    pub current: usize,
    pub total: usize,
    pub message: String,
    /// Subtopic name for `Subtopic` events.
    pub subtopic: Option<String>,
}

impl ProgressEvent {
    pub(crate) fn phase(phase: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            kind: ProgressKind::Phase,
            phase: phase.into(),
            current: 0,
            total: 0,
            message: message.into(),
            subtopic: None,
        }
    }

    pub(crate) fn subtopic(
        phase: impl Into<String>,
        subtopic: impl Into<String>,
        current: usize,
        total: usize,
        message: impl Into<String>,
    ) -> Self {
        Self {
            kind: ProgressKind::Subtopic,
            phase: phase.into(),
            current,
            total,
            message: message.into(),
            subtopic: Some(subtopic.into()),
        }
    }

    pub(crate) fn error(message: impl Into<String>) -> Self {
        Self {
            kind: ProgressKind::Error,
            phase: "Failed".into(),
            current: 0,
            total: 0,
            message: message.into(),
            subtopic: None,
        }
    }

    pub(crate) fn done(message: impl Into<String>) -> Self {
        Self {
            kind: ProgressKind::Done,
            phase: "Done".into(),
            current: 0,
            total: 0,
            message: message.into(),
            subtopic: None,
        }
    }
}

/// Progress callback for reporting run status.
pub trait ProgressReporter: Send + Sync {
    fn event(&self, event: &ProgressEvent);
}

/// No-op progress reporter for headless/test usage.
pub struct SilentProgress;

impl ProgressReporter for SilentProgress {
    fn event(&self, _event: &ProgressEvent) {}
}

/// Deliver an event, swallowing reporter panics.
pub(crate) fn emit(progress: &dyn ProgressReporter, event: ProgressEvent) {
    let result = catch_unwind(AssertUnwindSafe(|| progress.event(&event)));
    if result.is_err() {
        warn!(phase = %event.phase, "progress reporter panicked; continuing");
    }
}
