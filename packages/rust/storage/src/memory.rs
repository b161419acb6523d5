//! In-memory [`JobStore`] for tests and embedded use.

use std::collections::HashMap;
use std::sync::Mutex;

use chrono::Utc;

use lessonforge_shared::{
    JobId, JobStatus, KnowledgeRecord, LessonForgeError, Result, SubtopicProgress,
};

use crate::{JobRecord, JobStore, SubtopicUpdate};

#[derive(Default)]
struct State {
    jobs: HashMap<JobId, JobRecord>,
    subtopics: HashMap<JobId, Vec<SubtopicProgress>>,
    content: HashMap<JobId, Vec<KnowledgeRecord>>,
}

/// [`JobStore`] backed by in-process maps. Same observable semantics as
/// [`crate::LibsqlStore`], minus durability.
#[derive(Default)]
pub struct MemoryStore {
    state: Mutex<State>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }
}

fn lock_err() -> LessonForgeError {
    LessonForgeError::Storage("store mutex poisoned".into())
}

impl JobStore for MemoryStore {
    async fn create_job(&self, job: &JobRecord) -> Result<()> {
        let mut state = self.state.lock().map_err(|_| lock_err())?;
        state.jobs.insert(job.id.clone(), job.clone());
        Ok(())
    }

    async fn get_job(&self, id: &JobId) -> Result<Option<JobRecord>> {
        let state = self.state.lock().map_err(|_| lock_err())?;
        Ok(state.jobs.get(id).cloned())
    }

    async fn update_job_status(&self, id: &JobId, status: JobStatus) -> Result<()> {
        let mut state = self.state.lock().map_err(|_| lock_err())?;
        let job = state
            .jobs
            .get_mut(id)
            .ok_or_else(|| LessonForgeError::Storage(format!("no such job: {id}")))?;
        job.status = status;
        job.updated_at = Utc::now();
        Ok(())
    }

    async fn set_subtopics(&self, id: &JobId, names: &[String]) -> Result<()> {
        let mut state = self.state.lock().map_err(|_| lock_err())?;
        let rows = names.iter().map(SubtopicProgress::pending).collect();
        state.subtopics.insert(id.clone(), rows);
        Ok(())
    }

    async fn update_subtopic(&self, id: &JobId, name: &str, update: SubtopicUpdate) -> Result<()> {
        let mut state = self.state.lock().map_err(|_| lock_err())?;
        let row = state
            .subtopics
            .get_mut(id)
            .and_then(|rows| rows.iter_mut().find(|r| r.name == name))
            .ok_or_else(|| {
                LessonForgeError::Storage(format!("no subtopic '{name}' in job {id}"))
            })?;

        if let Some(status) = update.status {
            row.status = status;
        }
        if let Some(source_count) = update.source_count {
            row.source_count = source_count;
        }
        if let Some(word_count) = update.word_count {
            row.word_count = word_count;
        }
        if let Some(error_message) = update.error_message {
            row.error_message = Some(error_message);
        }
        Ok(())
    }

    async fn list_subtopics(&self, id: &JobId) -> Result<Vec<SubtopicProgress>> {
        let state = self.state.lock().map_err(|_| lock_err())?;
        Ok(state.subtopics.get(id).cloned().unwrap_or_default())
    }

    async fn append_content(&self, id: &JobId, record: &KnowledgeRecord) -> Result<()> {
        let mut state = self.state.lock().map_err(|_| lock_err())?;
        state
            .content
            .entry(id.clone())
            .or_default()
            .push(record.clone());
        Ok(())
    }

    async fn list_content(&self, id: &JobId) -> Result<Vec<KnowledgeRecord>> {
        let state = self.state.lock().map_err(|_| lock_err())?;
        Ok(state.content.get(id).cloned().unwrap_or_default())
    }
}
