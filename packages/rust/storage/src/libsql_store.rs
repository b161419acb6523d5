//! Embedded libSQL implementation of [`JobStore`].

use std::path::Path;

use chrono::{DateTime, Utc};
use libsql::{Connection, Database, params};
use tracing::info;

use lessonforge_shared::{
    JobId, JobStatus, KnowledgeRecord, LessonForgeError, Result, SubtopicProgress,
};

use crate::migrations;
use crate::{JobRecord, JobStore, SubtopicUpdate};

/// [`JobStore`] over an embedded libSQL database file.
pub struct LibsqlStore {
    #[allow(dead_code)]
    db: Database,
    conn: Connection,
}

fn db_err(e: impl std::fmt::Display) -> LessonForgeError {
    LessonForgeError::Storage(e.to_string())
}

impl LibsqlStore {
    /// Open or create a database at `path` and apply pending migrations.
    pub async fn open(path: &Path) -> Result<Self> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent).map_err(db_err)?;
        }

        let db = libsql::Builder::new_local(path).build().await.map_err(db_err)?;
        let conn = db.connect().map_err(db_err)?;

        let store = Self { db, conn };
        store.run_migrations().await?;
        Ok(store)
    }

    /// Run pending schema migrations.
    async fn run_migrations(&self) -> Result<()> {
        let current_version = self.schema_version().await;

        for migration in migrations::all_migrations() {
            if migration.version > current_version {
                info!(
                    version = migration.version,
                    description = migration.description,
                    "applying migration"
                );
                self.conn.execute_batch(migration.sql).await.map_err(|e| {
                    LessonForgeError::Storage(format!(
                        "migration v{} failed: {e}",
                        migration.version
                    ))
                })?;
            }
        }
        Ok(())
    }

    /// Current schema version, or 0 before the first migration.
    async fn schema_version(&self) -> u32 {
        let result = self
            .conn
            .query("SELECT MAX(version) FROM schema_migrations", params![])
            .await;

        match result {
            Ok(mut rows) => {
                if let Ok(Some(row)) = rows.next().await {
                    row.get::<u32>(0).unwrap_or(0)
                } else {
                    0
                }
            }
            Err(_) => 0, // Table doesn't exist yet
        }
    }
}

fn parse_timestamp(s: &str) -> Result<DateTime<Utc>> {
    DateTime::parse_from_rfc3339(s)
        .map(|dt| dt.with_timezone(&Utc))
        .map_err(|e| LessonForgeError::Storage(format!("invalid timestamp: {e}")))
}

fn row_to_job(row: &libsql::Row) -> Result<JobRecord> {
    let id: String = row.get(0).map_err(db_err)?;
    let topic: String = row.get(1).map_err(db_err)?;
    let status: String = row.get(2).map_err(db_err)?;
    let scale: String = row.get(3).map_err(db_err)?;
    let created_at: String = row.get(4).map_err(db_err)?;
    let updated_at: String = row.get(5).map_err(db_err)?;

    Ok(JobRecord {
        id: id.parse().map_err(db_err)?,
        topic,
        status: status.parse().map_err(LessonForgeError::Storage)?,
        scale: scale.parse().map_err(LessonForgeError::Storage)?,
        created_at: parse_timestamp(&created_at)?,
        updated_at: parse_timestamp(&updated_at)?,
    })
}

fn row_to_subtopic(row: &libsql::Row) -> Result<SubtopicProgress> {
    let name: String = row.get(0).map_err(db_err)?;
    let status: String = row.get(1).map_err(db_err)?;
    let source_count: i64 = row.get(2).map_err(db_err)?;
    let word_count: i64 = row.get(3).map_err(db_err)?;
    let error_message: Option<String> = row.get(4).ok();

    Ok(SubtopicProgress {
        name,
        status: status.parse().map_err(LessonForgeError::Storage)?,
        source_count: source_count as usize,
        word_count: word_count as usize,
        error_message,
    })
}

fn row_to_record(row: &libsql::Row) -> Result<KnowledgeRecord> {
    let source_id: String = row.get(0).map_err(db_err)?;
    let subtopic: String = row.get(1).map_err(db_err)?;
    let title: String = row.get(2).map_err(db_err)?;
    let markdown: String = row.get(3).map_err(db_err)?;
    let document_json: String = row.get(4).map_err(db_err)?;
    let index_json: String = row.get(5).map_err(db_err)?;
    let sources_json: String = row.get(6).map_err(db_err)?;
    let word_count: i64 = row.get(7).map_err(db_err)?;
    let created_at: String = row.get(8).map_err(db_err)?;

    Ok(KnowledgeRecord {
        source_id,
        subtopic,
        title,
        markdown,
        document: serde_json::from_str(&document_json).map_err(db_err)?,
        index: serde_json::from_str(&index_json).map_err(db_err)?,
        sources: serde_json::from_str(&sources_json).map_err(db_err)?,
        word_count: word_count as usize,
        created_at: parse_timestamp(&created_at)?,
    })
}

impl JobStore for LibsqlStore {
    async fn create_job(&self, job: &JobRecord) -> Result<()> {
        self.conn
            .execute(
                "INSERT INTO jobs (id, topic, status, scale, created_at, updated_at)
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6)",
                params![
                    job.id.to_string(),
                    job.topic.as_str(),
                    job.status.as_str(),
                    job.scale.as_str(),
                    job.created_at.to_rfc3339(),
                    job.updated_at.to_rfc3339(),
                ],
            )
            .await
            .map_err(db_err)?;
        Ok(())
    }

    async fn get_job(&self, id: &JobId) -> Result<Option<JobRecord>> {
        let mut rows = self
            .conn
            .query(
                "SELECT id, topic, status, scale, created_at, updated_at
                 FROM jobs WHERE id = ?1",
                params![id.to_string()],
            )
            .await
            .map_err(db_err)?;

        match rows.next().await {
            Ok(Some(row)) => Ok(Some(row_to_job(&row)?)),
            Ok(None) => Ok(None),
            Err(e) => Err(db_err(e)),
        }
    }

    async fn update_job_status(&self, id: &JobId, status: JobStatus) -> Result<()> {
        let affected = self
            .conn
            .execute(
                "UPDATE jobs SET status = ?1, updated_at = ?2 WHERE id = ?3",
                params![
                    status.as_str(),
                    Utc::now().to_rfc3339(),
                    id.to_string(),
                ],
            )
            .await
            .map_err(db_err)?;
        if affected == 0 {
            return Err(LessonForgeError::Storage(format!("no such job: {id}")));
        }
        Ok(())
    }

    async fn set_subtopics(&self, id: &JobId, names: &[String]) -> Result<()> {
        self.conn
            .execute(
                "DELETE FROM subtopics WHERE job_id = ?1",
                params![id.to_string()],
            )
            .await
            .map_err(db_err)?;

        for (position, name) in names.iter().enumerate() {
            self.conn
                .execute(
                    "INSERT INTO subtopics (job_id, name, position, status)
                     VALUES (?1, ?2, ?3, 'pending')",
                    params![id.to_string(), name.as_str(), position as i64],
                )
                .await
                .map_err(db_err)?;
        }
        Ok(())
    }

    async fn update_subtopic(&self, id: &JobId, name: &str, update: SubtopicUpdate) -> Result<()> {
        let affected = self
            .conn
            .execute(
                "UPDATE subtopics SET
                   status = COALESCE(?1, status),
                   source_count = COALESCE(?2, source_count),
                   word_count = COALESCE(?3, word_count),
                   error_message = COALESCE(?4, error_message)
                 WHERE job_id = ?5 AND name = ?6",
                params![
                    update.status.map(|s| s.as_str()),
                    update.source_count.map(|c| c as i64),
                    update.word_count.map(|c| c as i64),
                    update.error_message.as_deref(),
                    id.to_string(),
                    name,
                ],
            )
            .await
            .map_err(db_err)?;
        if affected == 0 {
            return Err(LessonForgeError::Storage(format!(
                "no subtopic '{name}' in job {id}"
            )));
        }
        Ok(())
    }

    async fn list_subtopics(&self, id: &JobId) -> Result<Vec<SubtopicProgress>> {
        let mut rows = self
            .conn
            .query(
                "SELECT name, status, source_count, word_count, error_message
                 FROM subtopics WHERE job_id = ?1 ORDER BY position",
                params![id.to_string()],
            )
            .await
            .map_err(db_err)?;

        let mut results = Vec::new();
        while let Ok(Some(row)) = rows.next().await {
            results.push(row_to_subtopic(&row)?);
        }
        Ok(results)
    }

    async fn append_content(&self, id: &JobId, record: &KnowledgeRecord) -> Result<()> {
        let document_json = serde_json::to_string(&record.document).map_err(db_err)?;
        let index_json = serde_json::to_string(&record.index).map_err(db_err)?;
        let sources_json = serde_json::to_string(&record.sources).map_err(db_err)?;

        self.conn
            .execute(
                "INSERT INTO knowledge_content
                   (job_id, source_id, subtopic, title, markdown,
                    document_json, index_json, sources_json, word_count, created_at)
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10)",
                params![
                    id.to_string(),
                    record.source_id.as_str(),
                    record.subtopic.as_str(),
                    record.title.as_str(),
                    record.markdown.as_str(),
                    document_json.as_str(),
                    index_json.as_str(),
                    sources_json.as_str(),
                    record.word_count as i64,
                    record.created_at.to_rfc3339(),
                ],
            )
            .await
            .map_err(db_err)?;
        Ok(())
    }

    async fn list_content(&self, id: &JobId) -> Result<Vec<KnowledgeRecord>> {
        let mut rows = self
            .conn
            .query(
                "SELECT source_id, subtopic, title, markdown,
                        document_json, index_json, sources_json, word_count, created_at
                 FROM knowledge_content WHERE job_id = ?1 ORDER BY id",
                params![id.to_string()],
            )
            .await
            .map_err(db_err)?;

        let mut results = Vec::new();
        while let Ok(Some(row)) = rows.next().await {
            results.push(row_to_record(&row)?);
        }
        Ok(results)
    }
}
