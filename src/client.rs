//! One method per tutor operation: shapes the request, runs it through the
//! retry controller and parses the answer.

use crate::cancel::AbortSignal;
use crate::config::{AttemptBudgets, Config, ContentPolicy, ServiceConfig};
use crate::curriculum::{
    chapter_questions_schema, exam_questions_schema, sample_paper_schema, ChapterQuestion, ExamQuestion, ExamTerm,
    PaperFormat, SamplePaper, SummaryLength,
};
use crate::errors::ApiError;
use crate::models::{GenerateResponse, GenerativeService, GroundingChunk, Operation, RequestDescriptor, ResponseShape, ToolSpec};
use crate::parse::{parse_json, parse_text, EmptyReason, Parsed};
use crate::retry::RetryController;
use crate::utils::media::{self, Attachment, SPEECH_SAMPLE_RATE};
use std::fmt;
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, info, warn};

#[derive(Debug, Clone, PartialEq)]
pub struct Solution {
    pub text: String,
    pub grounding: Vec<GroundingChunk>,
}

/// Raw 16-bit little-endian PCM.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AudioClip {
    pub pcm: Vec<u8>,
    pub sample_rate: u32,
    pub channels: u16,
}

impl AudioClip {
    pub fn duration(&self) -> Duration {
        let bytes_per_second = self.sample_rate as u64 * self.channels as u64 * 2;
        if bytes_per_second == 0 {
            return Duration::ZERO;
        }
        Duration::from_millis(self.pcm.len() as u64 * 1000 / bytes_per_second)
    }

    pub fn to_wav(&self) -> Vec<u8> {
        media::pcm_to_wav(&self.pcm, self.sample_rate, self.channels)
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Diagram {
    pub mime_type: String,
    pub bytes: Vec<u8>,
}

impl Diagram {
    pub fn to_data_url(&self) -> String {
        media::to_data_url(&self.mime_type, &self.bytes)
    }

    pub fn extension(&self) -> &str {
        match self.mime_type.as_str() {
            "image/jpeg" => "jpg",
            "image/webp" => "webp",
            _ => "png",
        }
    }
}

/// Cheap to clone; clones share the service and nothing mutable.
#[derive(Clone)]
pub struct TutorClient {
    service: Arc<dyn GenerativeService>,
    retry: RetryController,
    budgets: AttemptBudgets,
    models: ServiceConfig,
    policy: ContentPolicy,
}

impl fmt::Debug for TutorClient {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TutorClient")
            .field("service", &self.service.name())
            .field("retry", &self.retry)
            .field("budgets", &self.budgets)
            .finish()
    }
}

impl TutorClient {
    pub fn new(service: Arc<dyn GenerativeService>, config: &Config) -> Self {
        Self {
            service,
            retry: RetryController::new(config.retry.backoff.clone()),
            budgets: config.retry.attempts.clone(),
            models: config.service.clone(),
            policy: config.content.clone(),
        }
    }

    pub fn service(&self) -> &Arc<dyn GenerativeService> {
        &self.service
    }

    pub fn policy(&self) -> &ContentPolicy {
        &self.policy
    }

    async fn execute(&self, descriptor: RequestDescriptor, signal: &AbortSignal) -> Result<GenerateResponse, ApiError> {
        let request = Arc::new(descriptor);
        let attempts = self.budgets.for_operation(request.operation);
        debug!(
            "Issuing {} via {} (up to {} attempt(s))",
            request.operation,
            self.service.name(),
            attempts
        );

        let response = self
            .retry
            .run(attempts, signal, || {
                let service = Arc::clone(&self.service);
                let request = Arc::clone(&request);
                async move { service.generate(&request).await }
            })
            .await?;

        debug!("{} answered in {}ms", request.operation, response.response_time_ms);
        Ok(response)
    }

    fn text_request(&self, operation: Operation, shape: ResponseShape) -> RequestDescriptor {
        RequestDescriptor::new(operation, &self.models.text_model, shape)
            .with_language_directive(self.policy.directive())
    }

    pub async fn solve_problem(
        &self,
        problem: &str,
        attachment: Option<&Attachment>,
        signal: &AbortSignal,
    ) -> Result<Parsed<Solution>, ApiError> {
        let mut request = RequestDescriptor::new(Operation::Solve, &self.models.text_model, ResponseShape::Text)
            .with_system_instruction(format!(
                "Expert {} {} tutor. Solve step by step and keep it concise. \
                 Use Google Search for real-time facts if needed.",
                self.policy.board, self.policy.medium
            ))
            .with_tool(ToolSpec::GoogleSearch)
            .with_language_directive(
                self.policy
                    .directive_for(&format!("{} or English", self.policy.target_language)),
            );
        if let Some(file) = attachment {
            debug!("Attaching {} ({})", file.name, file.mime_type);
            request = request.with_inline(file.to_inline());
        }
        let request = request.with_text(problem);

        let response = self.execute(request, signal).await?;
        let grounding = response.grounding.clone();
        Ok(parse_text(response.text.as_deref()).map(|text| Solution { text, grounding }))
    }

    pub async fn generate_sample_paper(
        &self,
        subject: &str,
        class_label: &str,
        term: ExamTerm,
        signal: &AbortSignal,
    ) -> Result<Parsed<SamplePaper>, ApiError> {
        let is_english = subject.to_lowercase().contains("english");
        let language = if is_english {
            "English"
        } else {
            self.policy.target_language.as_str()
        };
        let format = PaperFormat::for_paper(class_label, term);
        info!("📝 Generating {} sample paper for {} ({})", subject, class_label, term);

        let prompt = format!(
            "Generate an authentic {} sample paper as JSON.\n\
             Subject: {}, Class: {}, Term: {}, Full Marks: {}, Time: {}.\n\
             Language: {}. Follow the board's paper pattern strictly.",
            self.policy.board, subject, class_label, term, format.full_marks, format.time_allowed, language
        );

        let request = RequestDescriptor::new(
            Operation::SamplePaper,
            &self.models.text_model,
            ResponseShape::Json {
                schema: Some(sample_paper_schema()),
            },
        )
        .with_text(prompt)
        .with_temperature(0.1)
        .with_language_directive(self.policy.directive_for(language));

        let response = self.execute(request, signal).await?;
        Ok(parse_json::<SamplePaper>(response.text.as_deref()).and_then(|paper| {
            if paper.sections.is_empty() {
                warn!("Sample paper came back without sections");
                Parsed::Empty(EmptyReason::NoContent)
            } else {
                Parsed::Value(paper)
            }
        }))
    }

    pub async fn summarize_chapter(
        &self,
        title: &str,
        subject: &str,
        length: SummaryLength,
        signal: &AbortSignal,
    ) -> Result<Parsed<String>, ApiError> {
        let request = self
            .text_request(Operation::Summary, ResponseShape::Text)
            .with_text(format!(
                "Summarize the {} {} chapter: {} ({}). Detail: {}.",
                self.policy.board,
                self.policy.medium,
                title,
                subject,
                length.as_str()
            ))
            .with_thinking_budget(0);

        let response = self.execute(request, signal).await?;
        Ok(parse_text(response.text.as_deref()))
    }

    pub async fn translate(&self, text: &str, target_language: &str, signal: &AbortSignal) -> Result<Parsed<String>, ApiError> {
        let request = RequestDescriptor::new(Operation::Translate, &self.models.text_model, ResponseShape::Text)
            .with_text(format!("Translate to {}: {}", target_language, text))
            .with_thinking_budget(0)
            .with_language_directive(self.policy.directive_for(target_language));

        let response = self.execute(request, signal).await?;
        Ok(parse_text(response.text.as_deref()))
    }

    /// Speech is read verbatim, so no language directive is attached.
    pub async fn generate_speech(&self, text: &str, voice: &str, signal: &AbortSignal) -> Result<Parsed<AudioClip>, ApiError> {
        let request = RequestDescriptor::new(
            Operation::Speech,
            &self.models.speech_model,
            ResponseShape::Audio {
                voice: voice.to_string(),
            },
        )
        .with_text(text);

        let response = self.execute(request, signal).await?;
        let Some(audio) = response.first_inline("audio/").or_else(|| response.inline.first()) else {
            return Ok(Parsed::Empty(EmptyReason::NoContent));
        };

        Ok(match media::decode_base64(&audio.data) {
            Ok(pcm) if pcm.is_empty() => Parsed::Empty(EmptyReason::NoContent),
            Ok(pcm) => Parsed::Value(AudioClip {
                pcm,
                sample_rate: sample_rate_of(&audio.mime_type),
                channels: 1,
            }),
            Err(e) => {
                warn!("Discarding undecodable audio: {}", e);
                Parsed::Empty(EmptyReason::Malformed(e.to_string()))
            }
        })
    }

    pub async fn generate_diagram(&self, topic: &str, signal: &AbortSignal) -> Result<Parsed<Diagram>, ApiError> {
        let request = RequestDescriptor::new(Operation::Diagram, &self.models.image_model, ResponseShape::Image)
            .with_text(format!("Diagram for school: {}. Clean labels. White background.", topic))
            .with_language_directive(self.policy.directive());

        let response = self.execute(request, signal).await?;
        let Some(image) = response.first_inline("image/") else {
            return Ok(Parsed::Empty(EmptyReason::NoContent));
        };

        Ok(match media::decode_base64(&image.data) {
            Ok(bytes) => Parsed::Value(Diagram {
                mime_type: image.mime_type.clone(),
                bytes,
            }),
            Err(e) => Parsed::Empty(EmptyReason::Malformed(e.to_string())),
        })
    }

    pub async fn fetch_chapter_questions(
        &self,
        title: &str,
        subject: &str,
        signal: &AbortSignal,
    ) -> Result<Parsed<Vec<ChapterQuestion>>, ApiError> {
        let request = self
            .text_request(
                Operation::ChapterQuestions,
                ResponseShape::Json {
                    schema: Some(chapter_questions_schema()),
                },
            )
            .with_text(format!(
                "5 board-style questions with answers for the {} chapter: {} ({}). JSON format.",
                self.policy.board, title, subject
            ));

        let response = self.execute(request, signal).await?;
        Ok(parse_json::<Vec<ChapterQuestion>>(response.text.as_deref()).and_then(non_empty))
    }

    /// Questions whose answer index is out of range are dropped.
    pub async fn fetch_exam_questions(
        &self,
        subject: &str,
        level: &str,
        term: ExamTerm,
        signal: &AbortSignal,
    ) -> Result<Parsed<Vec<ExamQuestion>>, ApiError> {
        let request = self
            .text_request(
                Operation::ExamQuestions,
                ResponseShape::Json {
                    schema: Some(exam_questions_schema()),
                },
            )
            .with_text(format!(
                "5 multiple-choice questions for {} {} Class {} {}. \
                 correctAnswer is the zero-based index of the right option. JSON.",
                self.policy.board, subject, level, term
            ));

        let response = self.execute(request, signal).await?;
        Ok(
            parse_json::<Vec<ExamQuestion>>(response.text.as_deref()).and_then(|questions| {
                let total = questions.len();
                let valid: Vec<ExamQuestion> = questions.into_iter().filter(ExamQuestion::is_valid).collect();
                if valid.len() < total {
                    warn!("Dropped {} invalid exam question(s)", total - valid.len());
                }
                non_empty(valid)
            }),
        )
    }
}

fn non_empty<T>(items: Vec<T>) -> Parsed<Vec<T>> {
    if items.is_empty() {
        Parsed::Empty(EmptyReason::NoContent)
    } else {
        Parsed::Value(items)
    }
}

/// Reads `rate=` from an `audio/L16;codec=pcm;rate=24000` style MIME type.
fn sample_rate_of(mime_type: &str) -> u32 {
    mime_type
        .split(';')
        .filter_map(|param| param.trim().strip_prefix("rate="))
        .find_map(|rate| rate.parse().ok())
        .unwrap_or(SPEECH_SAMPLE_RATE)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn sample_rate_from_mime() {
        assert_eq!(sample_rate_of("audio/L16;codec=pcm;rate=16000"), 16_000);
        assert_eq!(sample_rate_of("audio/pcm"), SPEECH_SAMPLE_RATE);
    }

    #[test]
    fn clip_duration() {
        let clip = AudioClip {
            pcm: vec![0; 48_000],
            sample_rate: 24_000,
            channels: 1,
        };
        assert_eq!(clip.duration(), Duration::from_secs(1));
    }
}
