//! Generation orchestration: the sequential driver tying discovery,
//! collection, synthesis, indexing, and storage together.

mod pipeline;
mod progress;

pub use pipeline::{JobReport, JobSpec, Orchestrator};
pub use progress::{ProgressEvent, ProgressKind, ProgressReporter, SilentProgress};
