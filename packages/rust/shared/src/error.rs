//! Error types for LessonForge.
//!
//! Library crates use [`LessonForgeError`] via `thiserror`.
//! The CLI app wraps this with `color-eyre` for rich diagnostics.

/// Top-level error type for all LessonForge operations.
#[derive(Debug, thiserror::Error)]
pub enum LessonForgeError {
    /// Configuration loading or validation error (including missing API
    /// credentials — surfaced at construction, before any job work).
    #[error("config error: {message}")]
    Config { message: String },

    /// Completion-gateway failure (HTTP error or unusable response envelope).
    #[error("completion error: {0}")]
    Completion(String),

    /// Search-gateway failure.
    #[error("search error: {0}")]
    Search(String),

    /// Job/state store failure.
    #[error("storage error: {0}")]
    Storage(String),

    /// Malformed or invalid synthesis output for one subtopic.
    #[error("synthesis error: {message}")]
    Synthesis { message: String },

    /// Data validation error (zero sources, schema mismatch, etc.).
    #[error("validation error: {message}")]
    Validation { message: String },
}

/// Convenience alias used throughout the codebase.
pub type Result<T> = std::result::Result<T, LessonForgeError>;

impl LessonForgeError {
    /// Create a config error from any displayable message.
    pub fn config(msg: impl Into<String>) -> Self {
        Self::Config {
            message: msg.into(),
        }
    }

    /// Create a synthesis error from any displayable message.
    pub fn synthesis(msg: impl Into<String>) -> Self {
        Self::Synthesis {
            message: msg.into(),
        }
    }

    /// Create a validation error from any displayable message.
    pub fn validation(msg: impl Into<String>) -> Self {
        Self::Validation {
            message: msg.into(),
        }
    }
}
