//! Job/state persistence for LessonForge generation runs.
//!
//! The [`JobStore`] trait is the orchestrator's only persistence seam. The
//! workspace ships two implementations: [`LibsqlStore`] over an embedded
//! libSQL database, and [`memory::MemoryStore`] for tests and embedding.

mod libsql_store;
mod memory;
mod migrations;

pub use libsql_store::LibsqlStore;
pub use memory::MemoryStore;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use lessonforge_shared::{
    JobId, JobStatus, KnowledgeRecord, Result, ScalePreset, SubtopicProgress, SubtopicStatus,
};

/// One generation-run row.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct JobRecord {
    pub id: JobId,
    pub topic: String,
    pub status: JobStatus,
    pub scale: ScalePreset,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl JobRecord {
    /// A fresh `pending` job for a topic.
    pub fn new(topic: impl Into<String>, scale: ScalePreset) -> Self {
        let now = Utc::now();
        Self {
            id: JobId::new(),
            topic: topic.into(),
            status: JobStatus::Pending,
            scale,
            created_at: now,
            updated_at: now,
        }
    }
}

/// A partial update to one subtopic progress row. `None` fields keep their
/// stored value.
#[derive(Debug, Clone, Default)]
pub struct SubtopicUpdate {
    pub status: Option<SubtopicStatus>,
    pub source_count: Option<usize>,
    pub word_count: Option<usize>,
    pub error_message: Option<String>,
}

impl SubtopicUpdate {
    /// Update the status only.
    pub fn status(status: SubtopicStatus) -> Self {
        Self {
            status: Some(status),
            ..Self::default()
        }
    }

    /// Mark the row failed with a reason.
    pub fn failed(message: impl Into<String>) -> Self {
        Self {
            status: Some(SubtopicStatus::Failed),
            error_message: Some(message.into()),
            ..Self::default()
        }
    }
}

/// Persistence contract for generation runs.
///
/// All writes are per-row; the orchestrator drives one subtopic at a time,
/// so no store method needs to be transactional across rows.
#[allow(async_fn_in_trait)]
pub trait JobStore {
    /// Insert a new job row.
    async fn create_job(&self, job: &JobRecord) -> Result<()>;

    /// Fetch a job by id.
    async fn get_job(&self, id: &JobId) -> Result<Option<JobRecord>>;

    /// Update a job's status, touching `updated_at`.
    async fn update_job_status(&self, id: &JobId, status: JobStatus) -> Result<()>;

    /// Persist the discovered subtopic list, seeding one `pending` row per
    /// name in order. Replaces any previously stored list for the job.
    async fn set_subtopics(&self, id: &JobId, names: &[String]) -> Result<()>;

    /// Apply a partial update to one subtopic row, matched by name.
    async fn update_subtopic(&self, id: &JobId, name: &str, update: SubtopicUpdate) -> Result<()>;

    /// List a job's subtopic rows in discovery order.
    async fn list_subtopics(&self, id: &JobId) -> Result<Vec<SubtopicProgress>>;

    /// Append one completed subtopic's knowledge record.
    async fn append_content(&self, id: &JobId, record: &KnowledgeRecord) -> Result<()>;

    /// List a job's knowledge records in insertion order.
    async fn list_content(&self, id: &JobId) -> Result<Vec<KnowledgeRecord>>;
}
