//! Deterministic markdown rendering of a structured lesson document.
//!
//! A pure function of the document: rendering the same document twice yields
//! byte-identical output. The rendered markdown is also the basis for the
//! subtopic word count.

use lessonforge_shared::LessonDocument;

/// Render a lesson document as human-readable markdown.
pub fn render_markdown(doc: &LessonDocument) -> String {
    let mut out = String::new();

    match &doc.metadata.title_localized {
        Some(localized) => {
            out.push_str(&format!("# {} ({localized})\n\n", doc.metadata.title));
        }
        None => out.push_str(&format!("# {}\n\n", doc.metadata.title)),
    }
    out.push_str(&format!(
        "**Level:** {} | **Topic:** {}",
        doc.metadata.level, doc.metadata.topic
    ));
    if !doc.metadata.estimated_duration.is_empty() {
        out.push_str(&format!(" | **Duration:** {}", doc.metadata.estimated_duration));
    }
    out.push_str("\n\n");

    if !doc.content.objectives.is_empty() {
        out.push_str("## Learning Objectives\n\n");
        for objective in &doc.content.objectives {
            out.push_str(&format!("- {}\n", objective.text));
        }
        out.push('\n');
    }

    out.push_str("## Introduction\n\n");
    out.push_str(doc.content.introduction.text.trim());
    out.push_str("\n\n");

    for section in &doc.content.sections {
        out.push_str(&format!("## {}\n\n", section.heading));
        out.push_str(section.body.trim());
        out.push_str("\n\n");
        for example in &section.examples {
            out.push_str(&format!("- *{example}*\n"));
        }
        if !section.examples.is_empty() {
            out.push('\n');
        }
    }

    if !doc.content.vocabulary.is_empty() {
        render_vocabulary(&mut out, doc);
    }

    if !doc.content.grammar_rules.is_empty() {
        render_grammar_rules(&mut out, doc);
    }

    if !doc.content.exercises.is_empty() {
        render_exercises(&mut out, doc);
    }

    out.push_str("## Summary\n\n");
    out.push_str(doc.content.summary.text.trim());
    out.push('\n');
    if !doc.content.summary.key_points.is_empty() {
        out.push('\n');
        for point in &doc.content.summary.key_points {
            out.push_str(&format!("- {point}\n"));
        }
    }

    out
}

fn render_vocabulary(out: &mut String, doc: &LessonDocument) {
    out.push_str("## Vocabulary\n\n");

    let localized = doc
        .content
        .vocabulary
        .iter()
        .any(|v| v.term_localized.is_some());

    if localized {
        out.push_str("| Term | Translation | Definition | Level |\n");
        out.push_str("|------|-------------|------------|-------|\n");
    } else {
        out.push_str("| Term | Definition | Level |\n");
        out.push_str("|------|------------|-------|\n");
    }

    for item in &doc.content.vocabulary {
        if localized {
            out.push_str(&format!(
                "| {} | {} | {} | {} |\n",
                item.term,
                item.term_localized.as_deref().unwrap_or("—"),
                item.definition,
                item.level
            ));
        } else {
            out.push_str(&format!(
                "| {} | {} | {} |\n",
                item.term, item.definition, item.level
            ));
        }
    }
    out.push('\n');
}

fn render_grammar_rules(out: &mut String, doc: &LessonDocument) {
    out.push_str("## Grammar Rules\n\n");

    for rule in &doc.content.grammar_rules {
        out.push_str(&format!("### {}\n\n", rule.name));
        out.push_str(rule.explanation.trim());
        out.push_str("\n\n");

        if let Some(formula) = &rule.formula {
            out.push_str(&format!("**Formula:** `{formula}`\n\n"));
        }

        for example in &rule.examples {
            out.push_str(&format!("- ✓ {}\n", example.correct));
            if let Some(incorrect) = &example.incorrect {
                out.push_str(&format!("- ✗ {incorrect}\n"));
            }
            if let Some(note) = &example.note {
                out.push_str(&format!("  - {note}\n"));
            }
        }
        if !rule.examples.is_empty() {
            out.push('\n');
        }

        if !rule.common_mistakes.is_empty() {
            out.push_str("**Common mistakes:**\n\n");
            for mistake in &rule.common_mistakes {
                out.push_str(&format!(
                    "- {} → {} ({})\n",
                    mistake.pattern, mistake.correction, mistake.explanation
                ));
            }
            out.push('\n');
        }
    }
}

fn render_exercises(out: &mut String, doc: &LessonDocument) {
    out.push_str("## Exercises\n\n");

    for (i, exercise) in doc.content.exercises.iter().enumerate() {
        out.push_str(&format!("{}. {}\n", i + 1, exercise.question));
        if !exercise.options.is_empty() {
            for (j, option) in exercise.options.iter().enumerate() {
                let letter = (b'a' + (j % 26) as u8) as char;
                out.push_str(&format!("   {letter}) {option}\n"));
            }
        }
        out.push_str(&format!("   **Answer:** {}\n", exercise.correct_answer));
        if let Some(explanation) = &exercise.explanation {
            out.push_str(&format!("   *{explanation}*\n"));
        }
        out.push('\n');
    }
}
