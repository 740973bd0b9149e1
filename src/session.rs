//! Chat transcript for the tutor: questions, diagrams, translations, speech.

use crate::cancel::AbortSignal;
use crate::client::{AudioClip, Diagram, TutorClient};
use crate::errors::ApiError;
use crate::models::GroundingChunk;
use crate::notice::{empty_fallback, route_error, Notice};
use crate::remediation::SharedPrompt;
use crate::settings::{Language, Settings, StorageWarning, UploadedFile};
use crate::utils::media::{contains_devanagari, Attachment};
use anyhow::{anyhow, Result};
use chrono::{DateTime, Utc};
use tracing::{debug, info};

pub const HINDI_VOICE: &str = "Kore";
pub const ENGLISH_VOICE: &str = "Zephyr";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Role {
    User,
    Model,
}

#[derive(Debug, Clone, PartialEq)]
pub struct ChatMessage {
    pub id: String,
    pub role: Role,
    pub text: String,
    pub timestamp: DateTime<Utc>,
    pub image: Option<Diagram>,
    pub grounding: Vec<GroundingChunk>,
    pub translated_text: Option<String>,
    pub show_translated: bool,
    pub is_error: bool,
}

impl ChatMessage {
    fn new(role: Role, text: impl Into<String>) -> Self {
        Self {
            id: short_id(),
            role,
            text: text.into(),
            timestamp: Utc::now(),
            image: None,
            grounding: Vec::new(),
            translated_text: None,
            show_translated: false,
            is_error: false,
        }
    }

    /// The translation when toggled on, otherwise the original text.
    pub fn displayed_text(&self) -> &str {
        match (&self.translated_text, self.show_translated) {
            (Some(translated), true) => translated,
            _ => &self.text,
        }
    }
}

/// What a single interaction produced besides transcript changes.
#[derive(Debug, Default)]
pub struct TurnOutcome {
    pub reply: Option<ChatMessage>,
    pub audio: Option<AudioClip>,
    pub notice: Option<Notice>,
    pub warning: Option<StorageWarning>,
}

#[derive(Debug, Clone)]
enum LastRequest {
    Ask { text: String, attachment: Option<Attachment> },
    Diagram { topic: String },
}

#[derive(Debug)]
pub struct StudySession {
    client: TutorClient,
    prompt: SharedPrompt,
    messages: Vec<ChatMessage>,
    last_failed: Option<LastRequest>,
}

impl StudySession {
    pub fn new(client: TutorClient, prompt: SharedPrompt) -> Self {
        Self {
            client,
            prompt,
            messages: Vec::new(),
            last_failed: None,
        }
    }

    pub fn messages(&self) -> &[ChatMessage] {
        &self.messages
    }

    pub fn message(&self, id: &str) -> Option<&ChatMessage> {
        self.messages.iter().find(|m| m.id == id)
    }

    pub fn last_reply(&self) -> Option<&ChatMessage> {
        self.messages.iter().rev().find(|m| m.role == Role::Model)
    }

    pub fn can_retry(&self) -> bool {
        self.last_failed.is_some()
    }

    pub fn clear(&mut self) {
        self.messages.clear();
        self.last_failed = None;
    }

    pub async fn ask(
        &mut self,
        settings: &mut Settings,
        query: &str,
        attachment: Option<Attachment>,
        signal: &AbortSignal,
    ) -> TurnOutcome {
        let query = query.trim();
        if query.is_empty() && attachment.is_none() {
            return TurnOutcome::default();
        }
        let mut warning = settings.record_search(query);
        if let Some(file) = &attachment {
            debug!("Recording upload {} ({} bytes)", file.name, file.size_bytes);
            warning = settings.add_upload(UploadedFile::accepted(file)).or(warning);
        }
        let language = settings.language();

        let text = if query.is_empty() {
            language
                .pick(
                    "Please analyze this file and solve the problem.",
                    "कृपया इस फ़ाइल का विश्लेषण करें और समस्या को हल करें।",
                )
                .to_string()
        } else {
            query.to_string()
        };

        let mut user = ChatMessage::new(Role::User, text.clone());
        if let Some(file) = attachment.as_ref().filter(|f| !f.is_image()) {
            user.text.push_str(&format!("\n[File: {}]", file.name));
        }
        self.messages.push(user);

        let mut outcome = self.solve(text, attachment, language, signal).await;
        outcome.warning = warning;
        outcome
    }

    pub async fn diagram(&mut self, settings: &mut Settings, topic: &str, signal: &AbortSignal) -> TurnOutcome {
        let topic = topic.trim();
        if topic.is_empty() {
            return TurnOutcome::default();
        }
        let warning = settings.record_search(topic);
        let language = settings.language();

        let label = match language {
            Language::English => format!("Generate a diagram for: {}", topic),
            Language::Hindi => format!("चित्र बनाएँ: {}", topic),
        };
        self.messages.push(ChatMessage::new(Role::User, label));

        let mut outcome = self.draw(topic.to_string(), language, signal).await;
        outcome.warning = warning;
        outcome
    }

    /// Re-issues the request that last failed, unchanged.
    pub async fn retry_last(&mut self, settings: &Settings, signal: &AbortSignal) -> TurnOutcome {
        let Some(request) = self.last_failed.take() else {
            return TurnOutcome::default();
        };
        info!("🔁 Retrying the last request");
        let language = settings.language();
        match request {
            LastRequest::Ask { text, attachment } => self.solve(text, attachment, language, signal).await,
            LastRequest::Diagram { topic } => self.draw(topic, language, signal).await,
        }
    }

    /// Shows or hides the translation, fetching it on first use. Text with
    /// Devanagari goes to English, anything else to Hindi.
    pub async fn translate_message(&mut self, settings: &Settings, id: &str, signal: &AbortSignal) -> Result<TurnOutcome> {
        let message = self.message_mut(id)?;
        if message.translated_text.is_some() {
            message.show_translated = !message.show_translated;
            return Ok(TurnOutcome::default());
        }

        let text = message.text.clone();
        let target = if contains_devanagari(&text) { "English" } else { "Hindi" };
        debug!("Translating message {} to {}", id, target);

        match self.client.translate(&text, target, signal).await {
            Ok(parsed) => {
                if let Some(translated) = parsed.value() {
                    let message = self.message_mut(id)?;
                    message.translated_text = Some(translated);
                    message.show_translated = true;
                }
                Ok(TurnOutcome::default())
            }
            Err(e) => Ok(TurnOutcome {
                notice: Some(self.route(&e, settings.language()).await),
                ..Default::default()
            }),
        }
    }

    /// Synthesises whatever text of the message is currently shown.
    pub async fn speak_message(&mut self, settings: &Settings, id: &str, signal: &AbortSignal) -> Result<TurnOutcome> {
        let text = self
            .message(id)
            .map(|m| m.displayed_text().to_string())
            .ok_or_else(|| anyhow!("no message with id {}", id))?;
        let voice = if contains_devanagari(&text) { HINDI_VOICE } else { ENGLISH_VOICE };

        match self.client.generate_speech(&text, voice, signal).await {
            Ok(parsed) => Ok(TurnOutcome {
                audio: parsed.value(),
                ..Default::default()
            }),
            Err(e) => Ok(TurnOutcome {
                notice: Some(self.route(&e, settings.language()).await),
                ..Default::default()
            }),
        }
    }

    async fn solve(
        &mut self,
        text: String,
        attachment: Option<Attachment>,
        language: Language,
        signal: &AbortSignal,
    ) -> TurnOutcome {
        match self.client.solve_problem(&text, attachment.as_ref(), signal).await {
            Ok(parsed) => {
                let mut reply = ChatMessage::new(Role::Model, empty_fallback(language));
                if let Some(solution) = parsed.value() {
                    reply.text = solution.text;
                    reply.grounding = solution.grounding;
                }
                self.push_reply(reply)
            }
            Err(e) => {
                self.last_failed = Some(LastRequest::Ask { text, attachment });
                self.fail(&e, language).await
            }
        }
    }

    async fn draw(&mut self, topic: String, language: Language, signal: &AbortSignal) -> TurnOutcome {
        match self.client.generate_diagram(&topic, signal).await {
            Ok(parsed) => {
                let reply = match parsed.value() {
                    Some(diagram) => {
                        let mut reply = ChatMessage::new(
                            Role::Model,
                            match language {
                                Language::English => format!("Here is the diagram for: {}", topic),
                                Language::Hindi => format!("यह रहा चित्र: {}", topic),
                            },
                        );
                        reply.image = Some(diagram);
                        reply
                    }
                    None => ChatMessage::new(
                        Role::Model,
                        language.pick("Could not generate the diagram.", "चित्र नहीं बन सका।"),
                    ),
                };
                self.push_reply(reply)
            }
            Err(e) => {
                self.last_failed = Some(LastRequest::Diagram { topic });
                self.fail(&e, language).await
            }
        }
    }

    fn push_reply(&mut self, reply: ChatMessage) -> TurnOutcome {
        self.last_failed = None;
        self.messages.push(reply.clone());
        TurnOutcome {
            reply: Some(reply),
            ..Default::default()
        }
    }

    /// Inline notices become an error message in the transcript; the global
    /// prompt and cancellations leave the transcript alone.
    async fn fail(&mut self, error: &ApiError, language: Language) -> TurnOutcome {
        let notice = self.route(error, language).await;
        let reply = notice.message().map(|message| {
            let mut reply = ChatMessage::new(Role::Model, message);
            reply.is_error = true;
            reply
        });
        if let Some(reply) = &reply {
            self.messages.push(reply.clone());
        }
        TurnOutcome {
            reply,
            notice: Some(notice),
            ..Default::default()
        }
    }

    async fn route(&self, error: &ApiError, language: Language) -> Notice {
        let mut prompt = self.prompt.lock().await;
        route_error(error, &mut prompt, language)
    }

    fn message_mut(&mut self, id: &str) -> Result<&mut ChatMessage> {
        self.messages
            .iter_mut()
            .find(|m| m.id == id)
            .ok_or_else(|| anyhow!("no message with id {}", id))
    }
}

fn short_id() -> String {
    let mut id = uuid::Uuid::new_v4().simple().to_string();
    id.truncate(9);
    id
}
