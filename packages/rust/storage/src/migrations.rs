//! SQL migration definitions for the LessonForge job database.
//!
//! Migrations are applied in order on database open. Each migration has a
//! version number and a set of SQL statements executed as a batch.

/// A database migration with a version and SQL statements.
pub(crate) struct Migration {
    pub version: u32,
    pub description: &'static str,
    pub sql: &'static str,
}

/// All migrations, in ascending version order.
pub(crate) fn all_migrations() -> Vec<Migration> {
    vec![Migration {
        version: 1,
        description: "Initial schema: jobs, subtopics, knowledge_content",
        sql: r#"
-- Schema version tracking
CREATE TABLE IF NOT EXISTS schema_migrations (
    version    INTEGER PRIMARY KEY,
    applied_at TEXT NOT NULL DEFAULT (datetime('now'))
);

-- Generation runs
CREATE TABLE IF NOT EXISTS jobs (
    id         TEXT PRIMARY KEY,
    topic      TEXT NOT NULL,
    status     TEXT NOT NULL,
    scale      TEXT NOT NULL,
    created_at TEXT NOT NULL,
    updated_at TEXT NOT NULL
);

-- Per-subtopic progress rows, ordered by position within the job
CREATE TABLE IF NOT EXISTS subtopics (
    id            INTEGER PRIMARY KEY AUTOINCREMENT,
    job_id        TEXT NOT NULL REFERENCES jobs(id) ON DELETE CASCADE,
    name          TEXT NOT NULL,
    position      INTEGER NOT NULL,
    status        TEXT NOT NULL,
    source_count  INTEGER NOT NULL DEFAULT 0,
    word_count    INTEGER NOT NULL DEFAULT 0,
    error_message TEXT,
    UNIQUE(job_id, name)
);

CREATE INDEX IF NOT EXISTS idx_subtopics_job_id ON subtopics(job_id);

-- Finished lesson content; document, index and provenance stored as JSON
CREATE TABLE IF NOT EXISTS knowledge_content (
    id            INTEGER PRIMARY KEY AUTOINCREMENT,
    job_id        TEXT NOT NULL REFERENCES jobs(id) ON DELETE CASCADE,
    source_id     TEXT NOT NULL UNIQUE,
    subtopic      TEXT NOT NULL,
    title         TEXT NOT NULL,
    markdown      TEXT NOT NULL,
    document_json TEXT NOT NULL,
    index_json    TEXT NOT NULL,
    sources_json  TEXT NOT NULL,
    word_count    INTEGER NOT NULL,
    created_at    TEXT NOT NULL
);

CREATE INDEX IF NOT EXISTS idx_knowledge_content_job_id ON knowledge_content(job_id);

INSERT INTO schema_migrations (version) VALUES (1);
"#,
    }]
}
