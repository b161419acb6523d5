//! Subtopic discovery: expand one topic into an ordered curriculum of
//! subtopics via the completion gateway.
//!
//! Discovery has no retry of its own beyond the gateway's policy; a gateway
//! error propagates and the orchestrator treats it as fatal to the job.

mod parser;

pub use parser::parse_subtopics;

use tracing::{debug, instrument};

use lessonforge_gateways::CompletionGateway;
use lessonforge_shared::{LessonForgeError, Result};

/// Token budget for a discovery call; subtopic lists are short.
const DISCOVERY_MAX_TOKENS: u32 = 2048;

/// Optional audience hints embedded in the discovery prompt.
#[derive(Debug, Clone, Default)]
pub struct DiscoveryOptions {
    /// Proficiency level tag (e.g. "B1", "beginner").
    pub level: Option<String>,
    /// Target language for language-learning curricula.
    pub language: Option<String>,
}

/// Discover up to `target_count` subtopics for `topic`, ordered from
/// fundamental to advanced. If the model returns more than requested, the
/// front of the list wins.
#[instrument(skip(gateway), fields(topic, target_count))]
pub async fn discover_subtopics<C: CompletionGateway>(
    gateway: &C,
    topic: &str,
    target_count: usize,
    options: &DiscoveryOptions,
) -> Result<Vec<String>> {
    let system_prompt = build_system_prompt();
    let user_prompt = build_user_prompt(topic, target_count, options);

    let raw = gateway
        .complete(&system_prompt, &user_prompt, DISCOVERY_MAX_TOKENS)
        .await?;

    let subtopics = parse_subtopics(&raw, target_count);
    if subtopics.is_empty() {
        return Err(LessonForgeError::validation(format!(
            "discovery returned no usable subtopics for topic '{topic}'"
        )));
    }

    debug!(discovered = subtopics.len(), "subtopic discovery complete");
    Ok(subtopics)
}

fn build_system_prompt() -> String {
    "You are an expert curriculum designer. Given a topic, you break it down \
     into focused, teachable subtopics ordered from fundamental to advanced. \
     Respond with ONLY a JSON array of subtopic name strings, nothing else. \
     Example: [\"Subtopic One\", \"Subtopic Two\"]"
        .to_string()
}

fn build_user_prompt(topic: &str, target_count: usize, options: &DiscoveryOptions) -> String {
    let mut prompt = format!(
        "Break down the topic \"{topic}\" into exactly {target_count} subtopics, \
         ordered from fundamental to advanced."
    );
    if let Some(level) = &options.level {
        prompt.push_str(&format!(" The learners are at {level} level."));
    }
    if let Some(language) = &options.language {
        prompt.push_str(&format!(" The curriculum teaches {language}."));
    }
    prompt
}
