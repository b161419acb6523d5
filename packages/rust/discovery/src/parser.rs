//! Two-stage parser for subtopic-discovery responses.
//!
//! Stage 1 is a strict JSON decode of a string array. Stage 2 is a heuristic
//! line-extraction fallback that salvages a usable list from free-form model
//! output: leading list markers (digits, bullets, dashes) are stripped and
//! lines outside a plausible length window are dropped. The fallback is a
//! silent-degradation path, so both stages carry their own tests.

use std::sync::LazyLock;

use regex::Regex;

use lessonforge_gateways::strip_code_fences;

/// Plausible subtopic-name length window for the heuristic fallback.
const MIN_SUBTOPIC_LEN: usize = 4;
const MAX_SUBTOPIC_LEN: usize = 99;

/// Matches leading list markers: `1.`, `2)`, `-`, `*`, `•`.
static LIST_MARKER_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^\s*(?:\d+[.)]\s*|[-*•]\s*)").expect("list marker regex"));

/// Parse a discovery response into at most `target_count` subtopic names,
/// preserving the model's fundamentals-first ordering. Extras beyond the
/// target are dropped from the back of the list.
pub fn parse_subtopics(raw: &str, target_count: usize) -> Vec<String> {
    let body = strip_code_fences(raw);

    let mut subtopics = match serde_json::from_str::<Vec<String>>(body) {
        Ok(parsed) => parsed
            .into_iter()
            .map(|s| s.trim().to_string())
            .filter(|s| !s.is_empty())
            .collect(),
        Err(_) => salvage_lines(body),
    };

    subtopics.truncate(target_count);
    subtopics
}

/// Heuristic fallback: treat each line as a candidate subtopic.
fn salvage_lines(body: &str) -> Vec<String> {
    body.lines()
        .map(|line| {
            let stripped = LIST_MARKER_RE.replace(line, "");
            stripped
                .trim()
                .trim_matches(|c| c == '"' || c == '\'' || c == ',')
                .trim()
                .to_string()
        })
        .filter(|line| (MIN_SUBTOPIC_LEN..=MAX_SUBTOPIC_LEN).contains(&line.len()))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn strict_json_array() {
        let raw = r#"["Basics", "Forming Questions", "Irregular Verbs"]"#;
        let parsed = parse_subtopics(raw, 5);
        assert_eq!(parsed, vec!["Basics", "Forming Questions", "Irregular Verbs"]);
    }

    #[test]
    fn fenced_json_array() {
        let raw = "```json\n[\"Subtopic One\", \"Subtopic Two\"]\n```";
        let parsed = parse_subtopics(raw, 5);
        assert_eq!(parsed, vec!["Subtopic One", "Subtopic Two"]);
    }

    #[test]
    fn extras_dropped_from_the_back() {
        let raw = r#"["First", "Second", "Third", "Fourth"]"#;
        let parsed = parse_subtopics(raw, 2);
        assert_eq!(parsed, vec!["First", "Second"]);
    }

    #[test]
    fn fallback_numbered_list() {
        let raw = "Here are the subtopics:\n1. Present Perfect Basics\n2. Present Perfect vs Past Simple\n3. Time Expressions\n";
        let parsed = parse_subtopics(raw, 5);
        assert_eq!(
            parsed,
            vec![
                "Here are the subtopics:",
                "Present Perfect Basics",
                "Present Perfect vs Past Simple",
                "Time Expressions",
            ]
        );
    }

    #[test]
    fn fallback_bulleted_list_strips_markers() {
        let raw = "- Forming the Present Perfect\n* Signal Words\n• Negatives and Questions";
        let parsed = parse_subtopics(raw, 5);
        assert_eq!(
            parsed,
            vec![
                "Forming the Present Perfect",
                "Signal Words",
                "Negatives and Questions",
            ]
        );
    }

    #[test]
    fn fallback_filters_length_window() {
        // "ok" is too short; a 120-char line is too long.
        let long = "x".repeat(120);
        let raw = format!("ok\nUsable Subtopic Name\n{long}");
        let parsed = parse_subtopics(&raw, 5);
        assert_eq!(parsed, vec!["Usable Subtopic Name"]);
    }

    #[test]
    fn fallback_strips_quotes_and_commas() {
        let raw = "\"Present Perfect Basics\",\n\"Time Expressions\",";
        let parsed = parse_subtopics(raw, 5);
        assert_eq!(parsed, vec!["Present Perfect Basics", "Time Expressions"]);
    }

    #[test]
    fn empty_input_yields_empty_list() {
        assert!(parse_subtopics("", 5).is_empty());
        assert!(parse_subtopics("[]", 5).is_empty());
    }
}
