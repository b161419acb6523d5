//! External gateway clients for LessonForge.
//!
//! Two hosted collaborators are abstracted behind traits so the pipeline can
//! be driven by stubs in tests:
//! - [`CompletionGateway`] — prompt pair in, raw model text out
//! - [`SearchGateway`] — query in, ranked source records out
//!
//! The shipped implementations ([`OpenRouterClient`], [`TavilyClient`]) are
//! constructed once with explicit credentials and passed down; a missing key
//! fails construction immediately rather than mid-run. Both wrap transient
//! failures in a configurable exponential-backoff [`RetryPolicy`].

pub mod completion;
pub mod retry;
pub mod search;

pub use completion::{CompletionGateway, OpenRouterClient};
pub use retry::RetryPolicy;
pub use search::{SEARCH_RESULT_CAP, SearchDepth, SearchGateway, SearchHit, SearchOptions, TavilyClient};

/// Strip a leading/trailing markdown code fence (```` ``` ```` or
/// ```` ```json ````) from a model response before JSON parsing.
///
/// Unfenced input is returned trimmed and otherwise untouched.
pub fn strip_code_fences(raw: &str) -> &str {
    let trimmed = raw.trim();

    let Some(rest) = trimmed.strip_prefix("```") else {
        return trimmed;
    };

    // Drop the optional language tag on the opening fence line.
    let rest = match rest.find('\n') {
        Some(idx) => &rest[idx + 1..],
        None => rest,
    };

    rest.trim_end()
        .strip_suffix("```")
        .map(str::trim)
        .unwrap_or_else(|| rest.trim())
}

/// First 200 bytes of an error body for diagnostics, cut on a char boundary.
pub(crate) fn truncate_body(body: &str) -> &str {
    const LIMIT: usize = 200;
    if body.len() <= LIMIT {
        return body;
    }
    let mut end = LIMIT;
    while !body.is_char_boundary(end) {
        end -= 1;
    }
    &body[..end]
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn strips_plain_fence() {
        let raw = "```\n[\"a\", \"b\"]\n```";
        assert_eq!(strip_code_fences(raw), "[\"a\", \"b\"]");
    }

    #[test]
    fn strips_json_fence() {
        let raw = "```json\n{\"key\": 1}\n```";
        assert_eq!(strip_code_fences(raw), "{\"key\": 1}");
    }

    #[test]
    fn unfenced_input_is_only_trimmed() {
        assert_eq!(strip_code_fences("  {\"key\": 1}\n"), "{\"key\": 1}");
    }

    #[test]
    fn unterminated_fence_still_yields_body() {
        let raw = "```json\n{\"key\": 1}";
        assert_eq!(strip_code_fences(raw), "{\"key\": 1}");
    }
}
