//! Plain-text output: printable papers, exam results, shareable messages.

use crate::curriculum::{format_timer, ExamResult, SamplePaper};
use crate::session::ChatMessage;
use crate::settings::Language;
use regex::Regex;
use std::fmt::Write as _;
use std::sync::OnceLock;

const RULE_WIDTH: usize = 64;

fn markdown_marks() -> Option<&'static Regex> {
    static MARKS: OnceLock<Option<Regex>> = OnceLock::new();
    MARKS
        .get_or_init(|| Regex::new(r"(?m)(\*\*|__|`{1,3}|^#{1,6}\s+)").ok())
        .as_ref()
}

/// Drops bold/code/heading markers so text reads cleanly outside a renderer.
pub fn strip_markdown(text: &str) -> String {
    match markdown_marks() {
        Some(re) => re.replace_all(text, "").into_owned(),
        None => text.to_string(),
    }
}

fn rule(c: char) -> String {
    std::iter::repeat(c).take(RULE_WIDTH).collect()
}

fn centered(text: &str) -> String {
    let width = text.chars().count();
    let pad = RULE_WIDTH.saturating_sub(width) / 2;
    format!("{}{}", " ".repeat(pad), text)
}

pub fn render_sample_paper(paper: &SamplePaper, with_answers: bool) -> String {
    let mut out = String::new();
    let _ = writeln!(out, "{}", centered(&paper.title));
    let _ = writeln!(out, "{}", centered(&format!("{} | {} | {}", paper.subject, paper.class_label, paper.term)));
    let _ = writeln!(out, "{}", rule('='));
    let _ = writeln!(
        out,
        "Full Marks: {}{}Time: {}",
        paper.full_marks,
        " ".repeat(8),
        paper.time_allowed
    );
    let _ = writeln!(out, "{}", rule('='));

    for section in &paper.sections {
        let _ = writeln!(out);
        let _ = writeln!(out, "{}", section.title);
        if !section.instructions.trim().is_empty() {
            let _ = writeln!(out, "({})", section.instructions.trim());
        }
        if let Some(passage) = section.passage.as_deref().filter(|p| !p.trim().is_empty()) {
            let _ = writeln!(out);
            for line in passage.lines() {
                let _ = writeln!(out, "    {}", line);
            }
        }
        let _ = writeln!(out);

        for (index, question) in section.questions.iter().enumerate() {
            let _ = writeln!(out, "{}. {} [{}]", index + 1, question.text.trim(), question.marks);
            if let Some(options) = &question.options {
                for (i, option) in options.iter().enumerate() {
                    let _ = writeln!(out, "    ({}) {}", option_label(i), option);
                }
            }
            if with_answers {
                if let Some(answer) = question.answer.as_deref().filter(|a| !a.trim().is_empty()) {
                    let _ = writeln!(out, "    Answer: {}", answer.trim());
                }
            }
        }
    }

    let _ = writeln!(out);
    let _ = writeln!(out, "{}", rule('-'));
    out
}

fn option_label(index: usize) -> char {
    (b'a' + (index % 26) as u8) as char
}

pub fn render_exam_result(result: &ExamResult, language: Language) -> String {
    let mut out = String::new();
    let _ = writeln!(
        out,
        "{}: {}/{}",
        language.pick("Score", "अंक"),
        result.score,
        result.total
    );
    let _ = writeln!(out, "{}", result.feedback);
    let _ = writeln!(out, "{}", rule('-'));

    for (index, detail) in result.detailed_results.iter().enumerate() {
        let mark = if detail.is_correct { "✅" } else { "❌" };
        let _ = writeln!(out, "{} {}. {}", mark, index + 1, detail.question);
        let _ = writeln!(out, "   {}: {}", language.pick("Your answer", "आपका उत्तर"), detail.user_answer);
        if !detail.is_correct {
            let _ = writeln!(
                out,
                "   {}: {}",
                language.pick("Correct answer", "सही उत्तर"),
                detail.correct_answer
            );
        }
        if !detail.explanation.trim().is_empty() {
            let _ = writeln!(out, "   {}", detail.explanation.trim());
        }
    }
    out
}

pub fn render_timer(remaining_secs: u64, language: Language) -> String {
    format!("⏱️  {} {}", language.pick("Time left", "शेष समय"), format_timer(remaining_secs))
}

/// Text for copying a tutor reply elsewhere, with its sources.
pub fn share_text(message: &ChatMessage) -> String {
    let mut out = strip_markdown(message.displayed_text());
    let sources: Vec<&str> = message
        .grounding
        .iter()
        .filter_map(|chunk| chunk.uri.as_deref())
        .collect();
    if !sources.is_empty() {
        out.push_str("\n\nSources:");
        for uri in sources {
            out.push_str("\n- ");
            out.push_str(uri);
        }
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn markdown_markers_are_removed() {
        assert_eq!(strip_markdown("## Step 1\n**Force** = `m*a`"), "Step 1\nForce = m*a");
    }

    #[test]
    fn option_labels_wrap() {
        assert_eq!(option_label(0), 'a');
        assert_eq!(option_label(3), 'd');
    }
}
