//! Retrieval index construction: a pure projection of one lesson document
//! into denormalized lookup tables.
//!
//! `build_index` never touches storage or the network, and calling it twice
//! on the same document yields equal indexes. The orchestrator rebuilds the
//! index wholesale after every synthesis; nothing patches it in place.

use lessonforge_shared::{GrammarRule, LessonDocument, RetrievalIndex};

/// Keyword fragments this short carry no lookup value.
const MIN_KEYWORD_LEN: usize = 3;

/// Build the retrieval index for one lesson document.
pub fn build_index(document: &LessonDocument) -> RetrievalIndex {
    let mut index = RetrievalIndex::default();

    index_grammar(&mut index, document);
    index_vocabulary(&mut index, document);

    for rule in &document.content.grammar_rules {
        index
            .mistake_patterns
            .extend(rule.common_mistakes.iter().cloned());
    }

    index.topic_keywords = collect_topic_keywords(document);
    index
}

fn index_grammar(index: &mut RetrievalIndex, document: &LessonDocument) {
    for rule in &document.content.grammar_rules {
        for key in grammar_keys(rule) {
            let entries = index.grammar_index.entry(key).or_default();
            if !entries.iter().any(|r| r.id == rule.id) {
                entries.push(rule.clone());
            }
        }
    }
}

/// Lookup keys for one rule: its declared keywords plus the useful words of
/// its name, all lowercased. Keys below [`MIN_KEYWORD_LEN`] are dropped on
/// both paths, so stopword-like keywords ("a", "to") never reach the index.
fn grammar_keys(rule: &GrammarRule) -> Vec<String> {
    let mut keys: Vec<String> = rule
        .keywords
        .iter()
        .map(|k| k.trim().to_lowercase())
        .filter(|k| k.chars().count() >= MIN_KEYWORD_LEN)
        .collect();
    keys.extend(
        rule.name
            .split_whitespace()
            .map(str::to_lowercase)
            .filter(|w| w.chars().count() >= MIN_KEYWORD_LEN),
    );
    keys.sort();
    keys.dedup();
    keys
}

fn index_vocabulary(index: &mut RetrievalIndex, document: &LessonDocument) {
    for item in &document.content.vocabulary {
        // Last write wins: later entries in the document shadow earlier
        // duplicates of the same term.
        index
            .vocabulary_by_term
            .insert(item.term.to_lowercase(), item.clone());

        if let Some(localized) = &item.term_localized {
            index
                .vocabulary_by_term_localized
                .insert(localized.to_lowercase(), item.clone());
        }

        index
            .vocabulary_by_level
            .entry(item.level.clone())
            .or_default()
            .push(item.clone());
    }
}

/// Sorted, deduplicated union of everything a retrieval layer might match a
/// learner query against: metadata topic/subtopics/tags, rule keywords, and
/// vocabulary terms.
fn collect_topic_keywords(document: &LessonDocument) -> Vec<String> {
    let mut keywords: Vec<String> = Vec::new();

    keywords.push(document.metadata.topic.to_lowercase());
    keywords.extend(document.metadata.subtopics.iter().map(|s| s.to_lowercase()));
    keywords.extend(document.metadata.tags.iter().map(|t| t.to_lowercase()));
    for rule in &document.content.grammar_rules {
        keywords.extend(rule.keywords.iter().map(|k| k.to_lowercase()));
    }
    keywords.extend(
        document
            .content
            .vocabulary
            .iter()
            .map(|v| v.term.to_lowercase()),
    );

    keywords.retain(|k| !k.trim().is_empty());
    keywords.sort();
    keywords.dedup();
    keywords
}

#[cfg(test)]
mod tests {
    use super::*;

    use lessonforge_shared::{
        CommonMistake, Introduction, LessonContent, LessonMetadata, RuleExample, Summary,
        VocabularyItem,
    };

    fn rule(id: &str, name: &str, keywords: &[&str], mistakes: usize) -> GrammarRule {
        GrammarRule {
            id: id.into(),
            name: name.into(),
            explanation: "explanation".into(),
            formula: None,
            keywords: keywords.iter().map(|k| k.to_string()).collect(),
            examples: vec![RuleExample {
                correct: "correct".into(),
                incorrect: None,
                note: None,
            }],
            common_mistakes: (0..mistakes)
                .map(|i| CommonMistake {
                    pattern: format!("{id}-mistake-{i}"),
                    mistake_type: "tense-choice".into(),
                    correction: "correction".into(),
                    explanation: "explanation".into(),
                })
                .collect(),
        }
    }

    fn vocab(id: &str, term: &str, level: &str, localized: Option<&str>) -> VocabularyItem {
        VocabularyItem {
            id: id.into(),
            term: term.into(),
            term_localized: localized.map(str::to_string),
            definition: "definition".into(),
            level: level.into(),
            example: None,
        }
    }

    fn document() -> LessonDocument {
        LessonDocument {
            metadata: LessonMetadata {
                title: "Signal Words".into(),
                title_localized: None,
                level: "B1".into(),
                estimated_duration: "30 minutes".into(),
                topic: "Present Perfect Tense".into(),
                subtopics: vec!["Signal Words".into()],
                tags: vec!["grammar".into()],
            },
            content: LessonContent {
                objectives: vec![],
                introduction: Introduction {
                    text: "intro".into(),
                },
                sections: vec![],
                vocabulary: vec![
                    vocab("vocab-1", "Already", "B1", Some("Ya")),
                    vocab("vocab-2", "yet", "B1", None),
                    vocab("vocab-3", "since", "A2", None),
                ],
                grammar_rules: vec![
                    rule("gram-1", "Unfinished Time", &["since", "for"], 2),
                    rule("gram-2", "Life Experience", &["ever", "never"], 1),
                ],
                exercises: vec![],
                summary: Summary {
                    text: "summary".into(),
                    key_points: vec![],
                },
            },
        }
    }

    #[test]
    fn grammar_rules_are_keyed_by_keyword_and_name_words() {
        let index = build_index(&document());

        assert_eq!(index.grammar_index["since"][0].id, "gram-1");
        assert_eq!(index.grammar_index["for"][0].id, "gram-1");
        assert_eq!(index.grammar_index["unfinished"][0].id, "gram-1");
        assert_eq!(index.grammar_index["time"][0].id, "gram-1");
        assert_eq!(index.grammar_index["ever"][0].id, "gram-2");
        // Name words shorter than three characters never become keys.
        assert!(!index.grammar_index.keys().any(|k| k.chars().count() < 3));
    }

    #[test]
    fn short_explicit_keywords_are_dropped() {
        let mut doc = document();
        doc.content.grammar_rules[0]
            .keywords
            .extend(["to".into(), "a".into(), "use".into()]);

        let index = build_index(&doc);
        assert!(!index.grammar_index.contains_key("to"));
        assert!(!index.grammar_index.contains_key("a"));
        assert_eq!(index.grammar_index["use"][0].id, "gram-1");
    }

    #[test]
    fn duplicate_keys_keep_one_rule_copy() {
        let mut doc = document();
        // Keyword repeats a word of the rule's own name.
        doc.content.grammar_rules[0].keywords.push("time".into());

        let index = build_index(&doc);
        assert_eq!(index.grammar_index["time"].len(), 1);
    }

    #[test]
    fn vocabulary_lookups_are_lowercased_with_last_write_wins() {
        let mut doc = document();
        doc.content
            .vocabulary
            .push(vocab("vocab-4", "ALREADY", "B2", None));

        let index = build_index(&doc);
        assert_eq!(index.vocabulary_by_term["already"].id, "vocab-4");
        assert_eq!(index.vocabulary_by_term_localized["ya"].id, "vocab-1");
        assert_eq!(index.vocabulary_by_level["B1"].len(), 2);
        assert_eq!(index.vocabulary_by_level["A2"].len(), 1);
        assert_eq!(index.vocabulary_by_level["B2"].len(), 1);
    }

    #[test]
    fn mistakes_flatten_in_document_order() {
        let index = build_index(&document());
        let patterns: Vec<&str> = index
            .mistake_patterns
            .iter()
            .map(|m| m.pattern.as_str())
            .collect();
        assert_eq!(
            patterns,
            vec!["gram-1-mistake-0", "gram-1-mistake-1", "gram-2-mistake-0"]
        );
    }

    #[test]
    fn topic_keywords_are_sorted_and_deduplicated() {
        let index = build_index(&document());

        assert!(index.topic_keywords.contains(&"present perfect tense".to_string()));
        assert!(index.topic_keywords.contains(&"signal words".to_string()));
        assert!(index.topic_keywords.contains(&"grammar".to_string()));
        assert!(index.topic_keywords.contains(&"already".to_string()));
        assert!(index.topic_keywords.contains(&"ever".to_string()));

        let mut sorted = index.topic_keywords.clone();
        sorted.sort();
        sorted.dedup();
        assert_eq!(index.topic_keywords, sorted);
    }

    #[test]
    fn build_is_pure_and_idempotent() {
        let doc = document();
        let json = serde_json::to_string(&doc).unwrap();

        let first = build_index(&doc);
        let second = build_index(&doc);

        assert_eq!(first, second);
        // The document itself is untouched.
        assert_eq!(serde_json::to_string(&doc).unwrap(), json);
    }

    #[test]
    fn empty_document_yields_empty_index() {
        let mut doc = document();
        doc.content.vocabulary.clear();
        doc.content.grammar_rules.clear();
        doc.metadata.subtopics.clear();
        doc.metadata.tags.clear();

        let index = build_index(&doc);
        assert!(index.grammar_index.is_empty());
        assert!(index.vocabulary_by_term.is_empty());
        assert!(index.mistake_patterns.is_empty());
        assert_eq!(index.topic_keywords, vec!["present perfect tense"]);
    }
}
