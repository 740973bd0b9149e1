use crate::errors::ServiceFailure;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::fmt;

/// The outbound operations the tutor issues.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Operation {
    Solve,
    SamplePaper,
    Summary,
    Translate,
    Speech,
    Diagram,
    ChapterQuestions,
    ExamQuestions,
}

impl Operation {
    pub fn as_str(self) -> &'static str {
        match self {
            Operation::Solve => "solve",
            Operation::SamplePaper => "sample_paper",
            Operation::Summary => "summary",
            Operation::Translate => "translate",
            Operation::Speech => "speech",
            Operation::Diagram => "diagram",
            Operation::ChapterQuestions => "chapter_questions",
            Operation::ExamQuestions => "exam_questions",
        }
    }
}

impl fmt::Display for Operation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// What the caller expects back.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum ResponseShape {
    Text,
    Json { schema: Option<Value> },
    Audio { voice: String },
    Image,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct InlineData {
    pub mime_type: String,
    /// Base64 payload, without any `data:` prefix.
    pub data: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum Part {
    Text(String),
    Inline(InlineData),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ToolSpec {
    GoogleSearch,
}

/// Immutable description of one outbound call. Built once by the client and
/// shared with every retry attempt.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RequestDescriptor {
    pub operation: Operation,
    pub model: String,
    pub system_instruction: Option<String>,
    pub parts: Vec<Part>,
    pub shape: ResponseShape,
    pub temperature: Option<f32>,
    pub tools: Vec<ToolSpec>,
    pub thinking_budget: Option<u32>,
    /// Content-policy directive (target language, rejected variant).
    pub language_directive: String,
}

impl RequestDescriptor {
    pub fn new(operation: Operation, model: impl Into<String>, shape: ResponseShape) -> Self {
        Self {
            operation,
            model: model.into(),
            system_instruction: None,
            parts: Vec::new(),
            shape,
            temperature: None,
            tools: Vec::new(),
            thinking_budget: None,
            language_directive: String::new(),
        }
    }

    pub fn with_system_instruction(mut self, instruction: impl Into<String>) -> Self {
        self.system_instruction = Some(instruction.into());
        self
    }

    pub fn with_text(mut self, text: impl Into<String>) -> Self {
        self.parts.push(Part::Text(text.into()));
        self
    }

    pub fn with_inline(mut self, data: InlineData) -> Self {
        self.parts.push(Part::Inline(data));
        self
    }

    pub fn with_temperature(mut self, temperature: f32) -> Self {
        self.temperature = Some(temperature);
        self
    }

    pub fn with_tool(mut self, tool: ToolSpec) -> Self {
        self.tools.push(tool);
        self
    }

    pub fn with_thinking_budget(mut self, budget: u32) -> Self {
        self.thinking_budget = Some(budget);
        self
    }

    pub fn with_language_directive(mut self, directive: impl Into<String>) -> Self {
        self.language_directive = directive.into();
        self
    }

    /// Concatenated text parts, mostly useful for logging and tests.
    pub fn prompt_text(&self) -> String {
        self.parts
            .iter()
            .filter_map(|p| match p {
                Part::Text(t) => Some(t.as_str()),
                Part::Inline(_) => None,
            })
            .collect::<Vec<_>>()
            .join("\n")
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GroundingChunk {
    pub title: Option<String>,
    pub uri: Option<String>,
}

/// Successful answer from the generative service, before shape-specific parsing.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct GenerateResponse {
    pub text: Option<String>,
    pub inline: Vec<InlineData>,
    pub grounding: Vec<GroundingChunk>,
    pub finish_reason: Option<String>,
    pub model_used: String,
    pub response_time_ms: u64,
}

impl GenerateResponse {
    pub fn text(text: impl Into<String>) -> Self {
        Self {
            text: Some(text.into()),
            ..Default::default()
        }
    }

    pub fn inline(data: InlineData) -> Self {
        Self {
            inline: vec![data],
            ..Default::default()
        }
    }

    /// First inline payload whose MIME type starts with `prefix`.
    pub fn first_inline(&self, prefix: &str) -> Option<&InlineData> {
        self.inline.iter().find(|d| d.mime_type.starts_with(prefix))
    }
}

/// The external generative service. Adapters report raw failures; the retry
/// controller classifies them.
#[async_trait]
pub trait GenerativeService: Send + Sync {
    fn name(&self) -> &str;
    fn is_available(&self) -> bool;
    async fn generate(&self, request: &RequestDescriptor) -> Result<GenerateResponse, ServiceFailure>;

    fn metrics(&self) -> Option<ModelMetrics> {
        None
    }
}

#[derive(Clone, Debug, PartialEq)]
pub struct ModelMetrics {
    pub avg_response_time_ms: u64,
    pub success_rate: f32,
    pub last_error: Option<String>,
    pub total_requests: u64,
    pub successful_requests: u64,
}

impl Default for ModelMetrics {
    fn default() -> Self {
        Self {
            avg_response_time_ms: 0,
            success_rate: 1.0,
            last_error: None,
            total_requests: 0,
            successful_requests: 0,
        }
    }
}

impl ModelMetrics {
    pub fn record_success(&mut self, response_time_ms: u64) {
        self.total_requests += 1;
        self.successful_requests += 1;
        self.avg_response_time_ms =
            (self.avg_response_time_ms * (self.successful_requests - 1) + response_time_ms)
            / self.successful_requests;
        self.success_rate = self.successful_requests as f32 / self.total_requests as f32;
    }

    pub fn record_failure(&mut self, error: String) {
        self.total_requests += 1;
        self.last_error = Some(error);
        self.success_rate = self.successful_requests as f32 / self.total_requests as f32;
    }
}
