//! Shared types, error model, and configuration for LessonForge.
//!
//! This crate is the foundation depended on by all other LessonForge crates.
//! It provides:
//! - [`LessonForgeError`] — the unified error type
//! - Domain types ([`LessonDocument`], [`RetrievalIndex`], [`WebSource`],
//!   [`SubtopicProgress`], [`ScalePreset`], [`JobId`])
//! - Configuration ([`AppConfig`], [`Credentials`], config loading)

pub mod config;
pub mod error;
pub mod types;

// Re-export public API at crate root for ergonomic imports.
pub use config::{
    AppConfig, CollectorConfig, Credentials, DefaultsConfig, OpenRouterConfig, RetryConfig,
    TavilyConfig, config_dir, config_file_path, init_config, load_config, load_config_from,
};
pub use error::{LessonForgeError, Result};
pub use types::{
    CommonMistake, ContentSection, Exercise, GrammarRule, Introduction, JobId, JobStatus,
    KnowledgeRecord, LessonContent, LessonDocument, LessonMetadata, Objective, RetrievalIndex,
    RuleExample, ScalePreset, SourceProvenance, SubtopicProgress, SubtopicStatus, Summary,
    VocabularyItem, WebSource,
};
