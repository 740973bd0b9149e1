//! Board-exam domain: terms, paper formats, generated content and exam sessions.

use crate::settings::Language;
use anyhow::{bail, Result};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Deserializer, Serialize};
use serde_json::{json, Value};
use std::fmt;
use std::str::FromStr;

/// Default time allowed for a practice exam, in seconds.
pub const EXAM_TIME_LIMIT_SECS: u64 = 600;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ExamTerm {
    #[serde(rename = "Summative 1")]
    Summative1,
    #[serde(rename = "Summative 2")]
    Summative2,
    #[serde(rename = "Summative 3")]
    Summative3,
    #[serde(rename = "Madhyamik Selection")]
    MadhyamikSelection,
}

impl ExamTerm {
    pub const ALL: [ExamTerm; 4] = [
        ExamTerm::Summative1,
        ExamTerm::Summative2,
        ExamTerm::Summative3,
        ExamTerm::MadhyamikSelection,
    ];

    pub fn as_str(self) -> &'static str {
        match self {
            ExamTerm::Summative1 => "Summative 1",
            ExamTerm::Summative2 => "Summative 2",
            ExamTerm::Summative3 => "Summative 3",
            ExamTerm::MadhyamikSelection => "Madhyamik Selection",
        }
    }
}

impl fmt::Display for ExamTerm {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ExamTerm {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self> {
        let normalized: String = s.chars().filter(|c| !c.is_whitespace() && *c != '-').collect();
        match normalized.to_lowercase().as_str() {
            "summative1" | "s1" | "1" => Ok(ExamTerm::Summative1),
            "summative2" | "s2" | "2" => Ok(ExamTerm::Summative2),
            "summative3" | "s3" | "3" => Ok(ExamTerm::Summative3),
            "madhyamikselection" | "madhyamik" | "selection" => Ok(ExamTerm::MadhyamikSelection),
            _ => bail!("unknown exam term: {}", s),
        }
    }
}

/// Marks and duration of a board paper.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PaperFormat {
    pub full_marks: u32,
    pub time_allowed: &'static str,
}

impl PaperFormat {
    /// Class 10 papers follow the Madhyamik pattern regardless of term.
    pub fn for_paper(class_label: &str, term: ExamTerm) -> Self {
        if class_label.contains("10") {
            Self {
                full_marks: 90,
                time_allowed: "3 Hours 15 Minutes",
            }
        } else if term == ExamTerm::Summative3 {
            Self {
                full_marks: 70,
                time_allowed: "2 Hours 30 Minutes",
            }
        } else {
            Self {
                full_marks: 40,
                time_allowed: "1 Hour 30 Minutes",
            }
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SummaryLength {
    Short,
    #[default]
    Medium,
    Long,
}

impl SummaryLength {
    pub fn as_str(self) -> &'static str {
        match self {
            SummaryLength::Short => "short",
            SummaryLength::Medium => "medium",
            SummaryLength::Long => "long",
        }
    }
}

impl FromStr for SummaryLength {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_lowercase().as_str() {
            "short" => Ok(SummaryLength::Short),
            "medium" => Ok(SummaryLength::Medium),
            "long" | "detailed" => Ok(SummaryLength::Long),
            other => bail!("unknown summary length: {}", other),
        }
    }
}

fn lenient_u32<'de, D: Deserializer<'de>>(deserializer: D) -> std::result::Result<u32, D::Error> {
    let value = Value::deserialize(deserializer)?;
    let number = match &value {
        Value::Number(n) => n.as_f64(),
        Value::String(s) => s.trim().parse::<f64>().ok(),
        _ => None,
    };
    match number {
        Some(n) if n >= 0.0 => Ok(n.round() as u32),
        _ => Err(serde::de::Error::custom(format!("expected marks, got {}", value))),
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PaperQuestion {
    pub id: String,
    pub text: String,
    #[serde(deserialize_with = "lenient_u32")]
    pub marks: u32,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub options: Option<Vec<String>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub answer: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PaperSection {
    pub title: String,
    #[serde(default)]
    pub instructions: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub passage: Option<String>,
    #[serde(default)]
    pub questions: Vec<PaperQuestion>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SamplePaper {
    pub title: String,
    pub subject: String,
    pub class_label: String,
    /// Kept as text: the service occasionally paraphrases term names.
    pub term: String,
    #[serde(deserialize_with = "lenient_u32")]
    pub full_marks: u32,
    pub time_allowed: String,
    #[serde(default)]
    pub sections: Vec<PaperSection>,
}

impl SamplePaper {
    pub fn question_count(&self) -> usize {
        self.sections.iter().map(|s| s.questions.len()).sum()
    }

    pub fn total_question_marks(&self) -> u32 {
        self.sections
            .iter()
            .flat_map(|s| s.questions.iter())
            .map(|q| q.marks)
            .sum()
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChapterQuestion {
    pub question: String,
    pub answer: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ExamQuestion {
    pub question: String,
    pub options: Vec<String>,
    pub correct_answer: usize,
    #[serde(default)]
    pub explanation: String,
}

impl ExamQuestion {
    pub fn is_valid(&self) -> bool {
        !self.question.trim().is_empty() && self.correct_answer < self.options.len()
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DetailedResult {
    pub question: String,
    pub user_answer: String,
    pub correct_answer: String,
    pub is_correct: bool,
    pub explanation: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ExamResult {
    pub score: usize,
    pub total: usize,
    pub feedback: String,
    pub detailed_results: Vec<DetailedResult>,
}

/// An in-progress practice exam. Serialised as-is into the settings store so
/// that it can be resumed.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ExamSession {
    pub id: String,
    pub subject: String,
    pub level: String,
    pub term: ExamTerm,
    pub questions: Vec<ExamQuestion>,
    pub answers: Vec<Option<usize>>,
    pub current: usize,
    pub started_at: DateTime<Utc>,
    pub time_limit_secs: u64,
}

impl ExamSession {
    pub fn new(
        subject: impl Into<String>,
        level: impl Into<String>,
        term: ExamTerm,
        questions: Vec<ExamQuestion>,
        started_at: DateTime<Utc>,
    ) -> Self {
        let answers = vec![None; questions.len()];
        Self {
            id: uuid::Uuid::new_v4().to_string(),
            subject: subject.into(),
            level: level.into(),
            term,
            questions,
            answers,
            current: 0,
            started_at,
            time_limit_secs: EXAM_TIME_LIMIT_SECS,
        }
    }

    pub fn current_question(&self) -> Option<&ExamQuestion> {
        self.questions.get(self.current)
    }

    pub fn answer(&mut self, question: usize, option: usize) -> Result<()> {
        let Some(q) = self.questions.get(question) else {
            bail!("question {} does not exist", question + 1);
        };
        if option >= q.options.len() {
            bail!("question {} has no option {}", question + 1, option + 1);
        }
        match self.answers.get_mut(question) {
            Some(slot) => *slot = Some(option),
            None => bail!("question {} has no answer slot", question + 1),
        }
        Ok(())
    }

    /// Repairs a session read back from storage: one answer slot per
    /// question, answers pointing at real options, cursor in range.
    pub fn normalize(&mut self) {
        self.answers.resize(self.questions.len(), None);
        for (answer, question) in self.answers.iter_mut().zip(&self.questions) {
            if answer.is_some_and(|i| i >= question.options.len()) {
                *answer = None;
            }
        }
        self.current = self.current.min(self.questions.len().saturating_sub(1));
    }

    pub fn answered(&self) -> usize {
        self.answers.iter().filter(|a| a.is_some()).count()
    }

    pub fn next(&mut self) -> bool {
        if self.current + 1 < self.questions.len() {
            self.current += 1;
            true
        } else {
            false
        }
    }

    pub fn previous(&mut self) -> bool {
        if self.current > 0 {
            self.current -= 1;
            true
        } else {
            false
        }
    }

    pub fn remaining_secs(&self, now: DateTime<Utc>) -> u64 {
        let elapsed = (now - self.started_at).num_seconds().max(0) as u64;
        self.time_limit_secs.saturating_sub(elapsed)
    }

    pub fn is_expired(&self, now: DateTime<Utc>) -> bool {
        self.remaining_secs(now) == 0
    }

    pub fn grade(&self, language: Language) -> ExamResult {
        let detailed_results: Vec<DetailedResult> = self
            .questions
            .iter()
            .zip(&self.answers)
            .map(|(q, answer)| {
                let is_correct = *answer == Some(q.correct_answer);
                let user_answer = answer
                    .and_then(|i| q.options.get(i).cloned())
                    .unwrap_or_else(|| language.pick("No answer", "कोई उत्तर नहीं").to_string());
                DetailedResult {
                    question: q.question.clone(),
                    user_answer,
                    correct_answer: q.options.get(q.correct_answer).cloned().unwrap_or_default(),
                    is_correct,
                    explanation: q.explanation.clone(),
                }
            })
            .collect();

        let score = detailed_results.iter().filter(|r| r.is_correct).count();
        let total = self.questions.len();
        let feedback = if total > 0 && score == total {
            language.pick("Excellent performance!", "उत्कृष्ट प्रदर्शन!")
        } else {
            language.pick("Good effort, keep practicing.", "अच्छा प्रयास, और अभ्यास करें।")
        };

        ExamResult {
            score,
            total,
            feedback: feedback.to_string(),
            detailed_results,
        }
    }
}

/// Minutes:seconds, as shown on the exam timer.
pub fn format_timer(seconds: u64) -> String {
    format!("{}:{:02}", seconds / 60, seconds % 60)
}

pub fn sample_paper_schema() -> Value {
    json!({
        "type": "OBJECT",
        "properties": {
            "title": { "type": "STRING" },
            "subject": { "type": "STRING" },
            "classLabel": { "type": "STRING" },
            "term": { "type": "STRING" },
            "fullMarks": { "type": "NUMBER" },
            "timeAllowed": { "type": "STRING" },
            "sections": {
                "type": "ARRAY",
                "items": {
                    "type": "OBJECT",
                    "properties": {
                        "title": { "type": "STRING" },
                        "instructions": { "type": "STRING" },
                        "passage": { "type": "STRING" },
                        "questions": {
                            "type": "ARRAY",
                            "items": {
                                "type": "OBJECT",
                                "properties": {
                                    "id": { "type": "STRING" },
                                    "text": { "type": "STRING" },
                                    "marks": { "type": "NUMBER" },
                                    "options": { "type": "ARRAY", "items": { "type": "STRING" } },
                                    "answer": { "type": "STRING" }
                                },
                                "required": ["id", "text", "marks", "answer"]
                            }
                        }
                    },
                    "required": ["title", "instructions", "questions"]
                }
            }
        },
        "required": ["title", "subject", "classLabel", "term", "fullMarks", "timeAllowed", "sections"]
    })
}

pub fn chapter_questions_schema() -> Value {
    json!({
        "type": "ARRAY",
        "items": {
            "type": "OBJECT",
            "properties": {
                "question": { "type": "STRING" },
                "answer": { "type": "STRING" }
            },
            "required": ["question", "answer"]
        }
    })
}

pub fn exam_questions_schema() -> Value {
    json!({
        "type": "ARRAY",
        "items": {
            "type": "OBJECT",
            "properties": {
                "question": { "type": "STRING" },
                "options": { "type": "ARRAY", "items": { "type": "STRING" } },
                "correctAnswer": { "type": "INTEGER" },
                "explanation": { "type": "STRING" }
            },
            "required": ["question", "options", "correctAnswer", "explanation"]
        }
    })
}
