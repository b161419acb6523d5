//! Core domain types for LessonForge knowledge-base generation runs.

use std::collections::BTreeMap;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

// ---------------------------------------------------------------------------
// JobId
// ---------------------------------------------------------------------------

/// A UUID v7 wrapper for scraping-job identifiers (time-sortable).
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct JobId(pub Uuid);

impl JobId {
    /// Generate a new time-sortable job identifier.
    pub fn new() -> Self {
        Self(Uuid::now_v7())
    }
}

impl Default for JobId {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Display for JobId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl std::str::FromStr for JobId {
    type Err = uuid::Error;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        Ok(Self(Uuid::parse_str(s)?))
    }
}

// ---------------------------------------------------------------------------
// Job & subtopic status
// ---------------------------------------------------------------------------

/// Overall status of one knowledge-base generation run.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum JobStatus {
    Pending,
    Running,
    Completed,
    Failed,
}

impl JobStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Pending => "pending",
            Self::Running => "running",
            Self::Completed => "completed",
            Self::Failed => "failed",
        }
    }
}

impl std::fmt::Display for JobStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::str::FromStr for JobStatus {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s {
            "pending" => Ok(Self::Pending),
            "running" => Ok(Self::Running),
            "completed" => Ok(Self::Completed),
            "failed" => Ok(Self::Failed),
            other => Err(format!("unknown job status: {other}")),
        }
    }
}

/// Per-subtopic pipeline status.
///
/// Monotonic along `pending → scraping → synthesizing → optimizing →
/// completed`, with a side-exit to `failed` from any state.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SubtopicStatus {
    Pending,
    Scraping,
    Synthesizing,
    Optimizing,
    Completed,
    Failed,
}

impl SubtopicStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Pending => "pending",
            Self::Scraping => "scraping",
            Self::Synthesizing => "synthesizing",
            Self::Optimizing => "optimizing",
            Self::Completed => "completed",
            Self::Failed => "failed",
        }
    }
}

impl std::fmt::Display for SubtopicStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::str::FromStr for SubtopicStatus {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s {
            "pending" => Ok(Self::Pending),
            "scraping" => Ok(Self::Scraping),
            "synthesizing" => Ok(Self::Synthesizing),
            "optimizing" => Ok(Self::Optimizing),
            "completed" => Ok(Self::Completed),
            "failed" => Ok(Self::Failed),
            other => Err(format!("unknown subtopic status: {other}")),
        }
    }
}

/// One row of per-subtopic progress within a job.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SubtopicProgress {
    /// Subtopic name as discovered (or supplied by the caller).
    pub name: String,
    /// Current pipeline status.
    pub status: SubtopicStatus,
    /// Number of accepted web sources.
    pub source_count: usize,
    /// Word count of the rendered lesson markdown.
    pub word_count: usize,
    /// Failure reason, set when status is `failed`.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error_message: Option<String>,
}

impl SubtopicProgress {
    /// A fresh `pending` row for a named subtopic.
    pub fn pending(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            status: SubtopicStatus::Pending,
            source_count: 0,
            word_count: 0,
            error_message: None,
        }
    }
}

// ---------------------------------------------------------------------------
// Scale presets
// ---------------------------------------------------------------------------

/// Named generation scale controlling subtopic count, per-subtopic source
/// cap, and synthesis sizing.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ScalePreset {
    Quick,
    Standard,
    Comprehensive,
    Book,
}

impl ScalePreset {
    /// Target number of subtopics to discover.
    pub fn subtopic_count(&self) -> usize {
        match self {
            Self::Quick => 5,
            Self::Standard => 10,
            Self::Comprehensive => 25,
            Self::Book => 50,
        }
    }

    /// Maximum accepted sources per subtopic.
    pub fn sources_per_subtopic(&self) -> usize {
        match self {
            Self::Quick => 5,
            Self::Standard => 8,
            Self::Comprehensive => 12,
            Self::Book => 20,
        }
    }

    /// Vocabulary items the synthesis prompt asks for.
    pub fn vocabulary_target(&self) -> usize {
        match self {
            Self::Quick => 8,
            Self::Standard => 10,
            Self::Comprehensive => 15,
            Self::Book => 20,
        }
    }

    /// Exercise items the synthesis prompt asks for.
    pub fn exercise_target(&self) -> usize {
        match self {
            Self::Quick => 5,
            Self::Standard => 6,
            Self::Comprehensive => 8,
            Self::Book => 10,
        }
    }

    /// Completion token budget for one subtopic's synthesis call.
    pub fn completion_max_tokens(&self) -> u32 {
        match self {
            Self::Quick | Self::Standard => 4096,
            Self::Comprehensive => 6144,
            Self::Book => 8192,
        }
    }

    /// Broad presets search without the curated domain allow-list.
    pub fn broad_search(&self) -> bool {
        matches!(self, Self::Comprehensive | Self::Book)
    }

    /// Broad presets issue supplementary query variations when coverage
    /// falls below 70% of the per-subtopic source target.
    pub fn supplemental_search(&self) -> bool {
        matches!(self, Self::Comprehensive | Self::Book)
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Quick => "quick",
            Self::Standard => "standard",
            Self::Comprehensive => "comprehensive",
            Self::Book => "book",
        }
    }
}

impl std::fmt::Display for ScalePreset {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::str::FromStr for ScalePreset {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s {
            "quick" => Ok(Self::Quick),
            "standard" => Ok(Self::Standard),
            "comprehensive" => Ok(Self::Comprehensive),
            "book" => Ok(Self::Book),
            other => Err(format!(
                "unknown scale preset: {other} (expected quick|standard|comprehensive|book)"
            )),
        }
    }
}

// ---------------------------------------------------------------------------
// Web sources
// ---------------------------------------------------------------------------

/// One fetched web document, held in memory while synthesizing a subtopic.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WebSource {
    pub url: String,
    pub title: String,
    /// Host derived from `url` (empty when the URL does not parse).
    pub domain: String,
    /// Extracted text, truncated to the collector's character budget.
    pub content: String,
    /// Relevance score from the search gateway, when provided.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub score: Option<f64>,
}

impl WebSource {
    /// Derive the host portion of a URL for display and filtering.
    pub fn domain_of(url: &str) -> String {
        url::Url::parse(url)
            .ok()
            .and_then(|u| u.host_str().map(str::to_string))
            .unwrap_or_default()
    }
}

/// The persisted provenance subset of a [`WebSource`].
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SourceProvenance {
    pub url: String,
    pub title: String,
    pub domain: String,
    pub fetched_at: DateTime<Utc>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub score: Option<f64>,
    /// SHA-256 hex digest of the source content at collection time.
    pub content_hash: String,
}

impl SourceProvenance {
    /// Capture provenance for a source fetched at `fetched_at`.
    pub fn capture(source: &WebSource, fetched_at: DateTime<Utc>) -> Self {
        use sha2::{Digest, Sha256};
        let mut hasher = Sha256::new();
        hasher.update(source.content.as_bytes());
        Self {
            url: source.url.clone(),
            title: source.title.clone(),
            domain: source.domain.clone(),
            fetched_at,
            score: source.score,
            content_hash: format!("{:x}", hasher.finalize()),
        }
    }
}

// ---------------------------------------------------------------------------
// Structured lesson document
// ---------------------------------------------------------------------------

/// Synthesis output for one subtopic: metadata plus structured content.
///
/// List-item ids (`obj-N`, `sec-N`, `vocab-N`, `gram-N`, `ex-N`) are unique
/// within one document only, never across the knowledge base.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LessonDocument {
    pub metadata: LessonMetadata,
    pub content: LessonContent,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LessonMetadata {
    pub title: String,
    /// Secondary-language title, present only for language-learning runs.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub title_localized: Option<String>,
    /// Proficiency/level tag (e.g. "B1", "intermediate").
    pub level: String,
    /// Estimated study duration (free-form, e.g. "45 minutes").
    #[serde(default)]
    pub estimated_duration: String,
    pub topic: String,
    #[serde(default)]
    pub subtopics: Vec<String>,
    #[serde(default)]
    pub tags: Vec<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LessonContent {
    #[serde(default)]
    pub objectives: Vec<Objective>,
    pub introduction: Introduction,
    #[serde(default)]
    pub sections: Vec<ContentSection>,
    #[serde(default)]
    pub vocabulary: Vec<VocabularyItem>,
    #[serde(default)]
    pub grammar_rules: Vec<GrammarRule>,
    #[serde(default)]
    pub exercises: Vec<Exercise>,
    pub summary: Summary,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Objective {
    pub id: String,
    pub text: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Introduction {
    pub text: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ContentSection {
    pub id: String,
    pub heading: String,
    pub body: String,
    #[serde(default)]
    pub examples: Vec<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct VocabularyItem {
    pub id: String,
    pub term: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub term_localized: Option<String>,
    pub definition: String,
    /// Level tag used for `vocabulary_by_level` grouping.
    pub level: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub example: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GrammarRule {
    pub id: String,
    pub name: String,
    pub explanation: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub formula: Option<String>,
    #[serde(default)]
    pub keywords: Vec<String>,
    #[serde(default)]
    pub examples: Vec<RuleExample>,
    #[serde(default)]
    pub common_mistakes: Vec<CommonMistake>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RuleExample {
    pub correct: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub incorrect: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub note: Option<String>,
}

/// One common-mistake entry; also the flattened element of
/// [`RetrievalIndex::mistake_patterns`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CommonMistake {
    pub pattern: String,
    pub mistake_type: String,
    pub correction: String,
    pub explanation: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Exercise {
    pub id: String,
    /// e.g. "fill-in-the-blank", "multiple-choice", "transformation".
    pub exercise_type: String,
    pub question: String,
    #[serde(default)]
    pub options: Vec<String>,
    /// Must be non-empty; synthesis rejects documents violating this.
    pub correct_answer: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub explanation: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Summary {
    pub text: String,
    #[serde(default)]
    pub key_points: Vec<String>,
}

// ---------------------------------------------------------------------------
// Retrieval index
// ---------------------------------------------------------------------------

/// Denormalized lookup tables derived from one [`LessonDocument`].
///
/// A pure projection: recomputed wholesale whenever the document changes,
/// never patched incrementally. `BTreeMap` keys make equality and
/// serialization independent of insertion order.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct RetrievalIndex {
    /// Lowercased keyword → grammar rules containing that keyword.
    pub grammar_index: BTreeMap<String, Vec<GrammarRule>>,
    /// Lowercased term → vocabulary record (last write wins on duplicates).
    pub vocabulary_by_term: BTreeMap<String, VocabularyItem>,
    /// Lowercased secondary-language term → vocabulary record.
    pub vocabulary_by_term_localized: BTreeMap<String, VocabularyItem>,
    /// Level tag → vocabulary records at that level.
    pub vocabulary_by_level: BTreeMap<String, Vec<VocabularyItem>>,
    /// Every grammar rule's common mistakes, flattened in document order.
    pub mistake_patterns: Vec<CommonMistake>,
    /// Deduplicated, lowercased union of keywords, terms, and metadata tags.
    pub topic_keywords: Vec<String>,
}

// ---------------------------------------------------------------------------
// Knowledge record
// ---------------------------------------------------------------------------

/// One persisted knowledge-base content record per completed subtopic —
/// what the downstream tutoring agent looks up at conversation time.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct KnowledgeRecord {
    /// Generated id: slugified subtopic name plus a millisecond timestamp.
    pub source_id: String,
    pub subtopic: String,
    pub title: String,
    pub markdown: String,
    pub document: LessonDocument,
    pub index: RetrievalIndex,
    pub sources: Vec<SourceProvenance>,
    pub word_count: usize,
    pub created_at: DateTime<Utc>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn job_id_roundtrip() {
        let id = JobId::new();
        let s = id.to_string();
        let parsed: JobId = s.parse().expect("parse JobId");
        assert_eq!(id, parsed);
    }

    #[test]
    fn status_string_roundtrip() {
        for status in [
            SubtopicStatus::Pending,
            SubtopicStatus::Scraping,
            SubtopicStatus::Synthesizing,
            SubtopicStatus::Optimizing,
            SubtopicStatus::Completed,
            SubtopicStatus::Failed,
        ] {
            let parsed: SubtopicStatus = status.as_str().parse().expect("parse status");
            assert_eq!(parsed, status);
        }
        assert!("scraped".parse::<SubtopicStatus>().is_err());
    }

    #[test]
    fn scale_preset_knobs() {
        assert_eq!(ScalePreset::Quick.subtopic_count(), 5);
        assert_eq!(ScalePreset::Book.subtopic_count(), 50);
        assert_eq!(ScalePreset::Book.sources_per_subtopic(), 20);
        assert!(!ScalePreset::Standard.supplemental_search());
        assert!(ScalePreset::Book.supplemental_search());
        assert!(
            ScalePreset::Book.completion_max_tokens()
                >= 2 * ScalePreset::Quick.completion_max_tokens()
        );
        let parsed: ScalePreset = "comprehensive".parse().expect("parse preset");
        assert_eq!(parsed, ScalePreset::Comprehensive);
    }

    #[test]
    fn domain_derivation() {
        assert_eq!(
            WebSource::domain_of("https://en.wikipedia.org/wiki/Present_perfect"),
            "en.wikipedia.org"
        );
        assert_eq!(WebSource::domain_of("not a url"), "");
    }

    #[test]
    fn provenance_hashes_content() {
        let source = WebSource {
            url: "https://example.com/a".into(),
            title: "A".into(),
            domain: "example.com".into(),
            content: "hello world".into(),
            score: Some(0.9),
        };
        let prov = SourceProvenance::capture(&source, Utc::now());
        assert_eq!(
            prov.content_hash,
            "b94d27b9934d3e08a52e52d7da7dabfac484efe37a5380ee9088f7ace2efcde9"
        );
        assert_eq!(prov.domain, "example.com");
        assert_eq!(prov.score, Some(0.9));
    }

    #[test]
    fn lesson_document_serialization_roundtrip() {
        let doc = LessonDocument {
            metadata: LessonMetadata {
                title: "Present Perfect Basics".into(),
                title_localized: None,
                level: "B1".into(),
                estimated_duration: "45 minutes".into(),
                topic: "Present Perfect Tense".into(),
                subtopics: vec!["Present Perfect Basics".into()],
                tags: vec!["grammar".into(), "tense".into()],
            },
            content: LessonContent {
                objectives: vec![Objective {
                    id: "obj-1".into(),
                    text: "Form the present perfect".into(),
                }],
                introduction: Introduction {
                    text: "The present perfect connects past and present.".into(),
                },
                sections: vec![],
                vocabulary: vec![],
                grammar_rules: vec![],
                exercises: vec![Exercise {
                    id: "ex-1".into(),
                    exercise_type: "fill-in-the-blank".into(),
                    question: "She ___ (finish) her homework.".into(),
                    options: vec![],
                    correct_answer: "has finished".into(),
                    explanation: None,
                }],
                summary: Summary {
                    text: "Use have/has + past participle.".into(),
                    key_points: vec![],
                },
            },
        };

        let json = serde_json::to_string(&doc).expect("serialize");
        let parsed: LessonDocument = serde_json::from_str(&json).expect("deserialize");
        assert_eq!(parsed, doc);
    }
}
