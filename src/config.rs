use crate::models::Operation;
use crate::retry::BackoffConfig;
use anyhow::Result;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    pub service: ServiceConfig,
    pub retry: RetryConfig,
    pub content: ContentPolicy,
    pub storage: StorageConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ServiceConfig {
    pub name: String,
    pub api_key: Option<String>,
    pub base_url: String,
    pub text_model: String,
    pub speech_model: String,
    pub image_model: String,
    pub timeout_seconds: u64,
}

impl Default for ServiceConfig {
    fn default() -> Self {
        Self {
            name: "gemini".to_string(),
            api_key: None,
            base_url: "https://generativelanguage.googleapis.com".to_string(),
            text_model: "gemini-3-flash-preview".to_string(),
            speech_model: "gemini-2.5-flash-preview-tts".to_string(),
            image_model: "gemini-2.5-flash-image".to_string(),
            timeout_seconds: 60,
        }
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct RetryConfig {
    pub backoff: BackoffConfig,
    pub attempts: AttemptBudgets,
}

/// Maximum attempts per call site.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct AttemptBudgets {
    pub solve: u32,
    pub sample_paper: u32,
    pub summary: u32,
    pub translate: u32,
    pub speech: u32,
    pub diagram: u32,
    pub chapter_questions: u32,
    pub exam_questions: u32,
}

impl Default for AttemptBudgets {
    fn default() -> Self {
        Self {
            solve: 3,
            sample_paper: 3,
            summary: 2,
            translate: 2,
            speech: 1,
            diagram: 1,
            chapter_questions: 2,
            exam_questions: 3,
        }
    }
}

impl AttemptBudgets {
    pub fn for_operation(&self, operation: Operation) -> u32 {
        match operation {
            Operation::Solve => self.solve,
            Operation::SamplePaper => self.sample_paper,
            Operation::Summary => self.summary,
            Operation::Translate => self.translate,
            Operation::Speech => self.speech,
            Operation::Diagram => self.diagram,
            Operation::ChapterQuestions => self.chapter_questions,
            Operation::ExamQuestions => self.exam_questions,
        }
    }

    /// Same budget for every call site.
    pub fn uniform(attempts: u32) -> Self {
        Self {
            solve: attempts,
            sample_paper: attempts,
            summary: attempts,
            translate: attempts,
            speech: attempts,
            diagram: attempts,
            chapter_questions: attempts,
            exam_questions: attempts,
        }
    }
}

/// Content policy attached to every request.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ContentPolicy {
    pub board: String,
    pub medium: String,
    pub target_language: String,
    pub excluded_language: String,
}

impl Default for ContentPolicy {
    fn default() -> Self {
        Self {
            board: "WBBSE".to_string(),
            medium: "Hindi Medium".to_string(),
            target_language: "Hindi".to_string(),
            excluded_language: "Bengali".to_string(),
        }
    }
}

impl ContentPolicy {
    pub fn directive(&self) -> String {
        self.directive_for(&self.target_language)
    }

    /// Directive for a specific output language (e.g. English papers).
    pub fn directive_for(&self, language: &str) -> String {
        format!(
            "Respond in {}. Do not use {} anywhere in the response.",
            language, self.excluded_language
        )
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct StorageConfig {
    pub data_dir: Option<PathBuf>,
}

impl Config {
    pub fn load() -> Result<Self> {
        let config_path = std::env::current_dir()?.join("config.toml");
        Self::load_from(&config_path)
    }

    /// Reads `path` if it exists, otherwise starts from defaults; environment
    /// variables override the file either way.
    pub fn load_from(path: &Path) -> Result<Self> {
        let mut config = if path.exists() {
            let content = std::fs::read_to_string(path)?;
            toml::from_str(&content)?
        } else {
            Self::default()
        };

        config.apply_env();
        Ok(config)
    }

    pub fn apply_env(&mut self) {
        if let Ok(key) = std::env::var("GEMINI_API_KEY").or_else(|_| std::env::var("API_KEY")) {
            if !key.trim().is_empty() {
                self.service.api_key = Some(key.trim().to_string());
            }
        }
        if let Ok(url) = std::env::var("PATHSHALA_BASE_URL") {
            if !url.trim().is_empty() {
                self.service.base_url = url.trim().trim_end_matches('/').to_string();
            }
        }
    }
}
