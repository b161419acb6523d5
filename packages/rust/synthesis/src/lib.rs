//! Lesson synthesis: turn collected web sources into one structured lesson
//! document per subtopic via the completion gateway.
//!
//! The gateway response must be a single JSON object matching
//! [`LessonDocument`]; code fences around it are tolerated. A malformed
//! response or an exercise without an answer key is a synthesis error for
//! that subtopic only.

pub mod markdown;

pub use markdown::render_markdown;

use tracing::{debug, instrument};

use lessonforge_gateways::{strip_code_fences, CompletionGateway};
use lessonforge_shared::{LessonDocument, LessonForgeError, Result, ScalePreset, WebSource};

/// Audience and depth knobs for one synthesis call.
#[derive(Debug, Clone)]
pub struct SynthesisOptions {
    /// Proficiency level tag (e.g. "B1", "beginner").
    pub level: Option<String>,
    /// Target language; enables the localized title and vocabulary fields.
    pub language: Option<String>,
    /// Whether to request practice exercises at all.
    pub include_exercises: bool,
    pub scale: ScalePreset,
}

impl Default for SynthesisOptions {
    fn default() -> Self {
        Self {
            level: None,
            language: None,
            include_exercises: true,
            scale: ScalePreset::Standard,
        }
    }
}

/// Result of synthesizing one subtopic.
#[derive(Debug, Clone)]
pub struct SynthesisOutput {
    pub document: LessonDocument,
    /// Deterministic markdown rendering of `document`.
    pub markdown: String,
    /// Whitespace-separated word count of `markdown`.
    pub word_count: usize,
}

/// Synthesize a lesson document for `subtopic` from the collected sources.
#[instrument(skip(gateway, sources), fields(subtopic, source_count = sources.len()))]
pub async fn synthesize<C: CompletionGateway>(
    gateway: &C,
    subtopic: &str,
    topic: &str,
    sources: &[WebSource],
    options: &SynthesisOptions,
) -> Result<SynthesisOutput> {
    let system_prompt = build_system_prompt(options);
    let user_prompt = build_user_prompt(subtopic, topic, sources, options);

    let raw = gateway
        .complete(
            &system_prompt,
            &user_prompt,
            options.scale.completion_max_tokens(),
        )
        .await?;

    let document = parse_lesson_document(&raw)?;
    validate_document(&document)?;

    let markdown = markdown::render_markdown(&document);
    let word_count = markdown.split_whitespace().count();
    debug!(word_count, "lesson synthesis complete");

    Ok(SynthesisOutput {
        document,
        markdown,
        word_count,
    })
}

/// Parse a gateway response into a lesson document, tolerating code fences.
pub fn parse_lesson_document(raw: &str) -> Result<LessonDocument> {
    let stripped = strip_code_fences(raw);
    serde_json::from_str(stripped).map_err(|e| {
        LessonForgeError::synthesis(format!("lesson document is not valid JSON: {e}"))
    })
}

fn validate_document(document: &LessonDocument) -> Result<()> {
    for exercise in &document.content.exercises {
        if exercise.correct_answer.trim().is_empty() {
            return Err(LessonForgeError::synthesis(format!(
                "exercise '{}' has no answer key",
                exercise.id
            )));
        }
    }
    Ok(())
}

// ---------------------------------------------------------------------------
// Prompt assembly
// ---------------------------------------------------------------------------

fn build_system_prompt(options: &SynthesisOptions) -> String {
    let mut prompt = String::from(
        "You are a master educator writing original lesson material. Study the \
         reference sources, then explain the subject in your own words; never \
         copy sentences from the references. Respond with ONLY a JSON object, \
         no prose and no markdown fences, using this shape:\n\
         {\"metadata\": {\"title\", \"level\", \"estimated_duration\", \"topic\", \
         \"subtopics\", \"tags\"}, \"content\": {\"objectives\": [{\"id\", \"text\"}], \
         \"introduction\": {\"text\"}, \"sections\": [{\"id\", \"heading\", \"body\", \
         \"examples\"}], \"vocabulary\": [{\"id\", \"term\", \"definition\", \"level\", \
         \"example\"}], \"grammar_rules\": [{\"id\", \"name\", \"explanation\", \
         \"formula\", \"keywords\", \"examples\": [{\"correct\", \"incorrect\", \
         \"note\"}], \"common_mistakes\": [{\"pattern\", \"mistake_type\", \
         \"correction\", \"explanation\"}]}], \"exercises\": [{\"id\", \
         \"exercise_type\", \"question\", \"options\", \"correct_answer\", \
         \"explanation\"}], \"summary\": {\"text\", \"key_points\"}}}.",
    );

    prompt.push_str(&format!(
        " Include at least {} vocabulary items.",
        options.scale.vocabulary_target()
    ));
    if options.include_exercises {
        prompt.push_str(&format!(
            " Include at least {} exercises, each with a non-empty correct_answer.",
            options.scale.exercise_target()
        ));
    } else {
        prompt.push_str(" Leave the exercises array empty.");
    }
    if options.scale.broad_search() {
        prompt.push_str(
            " Write a deep-dive lesson: thorough sections, nuanced edge cases, \
             and rule keywords suitable for lookup.",
        );
    }
    if options.language.is_some() {
        prompt.push_str(
            " Also fill metadata.title_localized and vocabulary term_localized \
             with translations in the target language.",
        );
    }
    prompt
}

fn build_user_prompt(
    subtopic: &str,
    topic: &str,
    sources: &[WebSource],
    options: &SynthesisOptions,
) -> String {
    let mut prompt = format!(
        "Write a complete lesson on \"{subtopic}\" (part of the broader topic \
         \"{topic}\")."
    );
    if let Some(level) = &options.level {
        prompt.push_str(&format!(" Target proficiency level: {level}."));
    }
    if let Some(language) = &options.language {
        prompt.push_str(&format!(" The lesson teaches {language}."));
    }
    prompt.push_str("\n\nReference sources:\n\n");
    prompt.push_str(&build_reference_block(sources));
    prompt
}

/// Concatenate sources into the reference block of the user prompt. Pinned
/// sources collected without content are listed by URL only.
fn build_reference_block(sources: &[WebSource]) -> String {
    let mut block = String::new();
    for source in sources {
        if source.domain.is_empty() {
            block.push_str(&format!("### {}\n", source.title));
        } else {
            block.push_str(&format!("### {} ({})\n", source.title, source.domain));
        }
        if source.content.is_empty() {
            block.push_str(&format!("Reference link: {}\n\n", source.url));
        } else {
            block.push_str(source.content.trim());
            block.push_str("\n\n");
        }
    }
    block
}
