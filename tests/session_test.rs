mod common;

use base64::{engine::general_purpose, Engine as _};
use common::{quota, test_config, ScriptedService};
use pathshala::cancel::AbortSignal;
use pathshala::client::TutorClient;
use pathshala::errors::ServiceFailure;
use pathshala::models::{GenerateResponse, InlineData, ResponseShape};
use pathshala::notice::Notice;
use pathshala::remediation::{PromptState, RemediationPrompt, SharedPrompt};
use pathshala::session::{Role, StudySession, ENGLISH_VOICE, HINDI_VOICE};
use pathshala::settings::{Language, Settings, UploadStatus, KEY_UPLOADED_FILES};
use pathshala::storage::{FileStore, MemoryStore};
use pathshala::utils::media::Attachment;
use tempfile::TempDir;
use std::sync::Arc;

fn session_for(service: &Arc<ScriptedService>) -> (StudySession, SharedPrompt) {
    let prompt = RemediationPrompt::shared();
    let client = TutorClient::new(service.clone(), &test_config(1));
    (StudySession::new(client, prompt.clone()), prompt)
}

fn settings() -> Settings {
    Settings::load(Box::new(MemoryStore::new()))
}

#[tokio::test]
async fn test_ask_appends_reply_and_records_history() {
    let service = Arc::new(ScriptedService::text("Water evaporates, condenses and falls."));
    let (mut session, _) = session_for(&service);
    let mut settings = settings();

    let outcome = session
        .ask(&mut settings, "  What is the water cycle?  ", None, &AbortSignal::never())
        .await;

    assert!(outcome.notice.is_none());
    assert!(outcome.warning.is_none());
    assert_eq!(session.messages().len(), 2);
    assert_eq!(session.messages()[0].role, Role::User);
    assert_eq!(session.messages()[0].text, "What is the water cycle?");
    assert_eq!(session.last_reply().unwrap().text, "Water evaporates, condenses and falls.");
    assert_eq!(settings.history()[0].query, "What is the water cycle?");
}

#[tokio::test]
async fn test_blank_question_is_ignored() {
    let service = Arc::new(ScriptedService::text("unused"));
    let (mut session, _) = session_for(&service);

    let outcome = session.ask(&mut settings(), "   ", None, &AbortSignal::never()).await;

    assert!(outcome.reply.is_none());
    assert!(session.messages().is_empty());
    assert_eq!(service.calls(), 0);
}

#[tokio::test]
async fn test_unknown_error_shows_inline_and_retry_recovers() {
    let service = Arc::new(ScriptedService::new(vec![
        Err(ServiceFailure::new("Gemini API error 400: bad request").with_status(400)),
        Ok(GenerateResponse::text("Recovered answer")),
    ]));
    let (mut session, prompt) = session_for(&service);
    let mut settings = settings();

    let outcome = session.ask(&mut settings, "Explain osmosis", None, &AbortSignal::never()).await;

    assert!(matches!(outcome.notice, Some(Notice::Inline { retry: true, .. })));
    assert!(session.last_reply().unwrap().is_error);
    assert!(session.can_retry());
    assert_eq!(prompt.lock().await.state(), PromptState::Normal);

    let outcome = session.retry_last(&settings, &AbortSignal::never()).await;

    assert_eq!(outcome.reply.unwrap().text, "Recovered answer");
    assert!(!session.can_retry());
    assert_eq!(service.requests()[0].parts, service.requests()[1].parts);
}

#[tokio::test]
async fn test_quota_raises_global_prompt_without_inline_message() {
    let service = Arc::new(ScriptedService::always(Err(quota())));
    let (mut session, prompt) = session_for(&service);

    let outcome = session
        .ask(&mut settings(), "Newton's laws", None, &AbortSignal::never())
        .await;

    assert!(matches!(outcome.notice, Some(Notice::GlobalPrompt)));
    assert!(outcome.reply.is_none());
    assert_eq!(session.messages().len(), 1);
    assert_eq!(prompt.lock().await.state(), PromptState::ErrorShown);
}

#[tokio::test]
async fn test_translation_is_fetched_once_then_toggled() {
    let service = Arc::new(ScriptedService::new(vec![
        Ok(GenerateResponse::text("Plants make food from sunlight.")),
        Ok(GenerateResponse::text("पौधे सूर्य के प्रकाश से भोजन बनाते हैं।")),
    ]));
    let (mut session, _) = session_for(&service);
    let settings_ = &mut settings();

    session.ask(settings_, "Photosynthesis", None, &AbortSignal::never()).await;
    let id = session.last_reply().unwrap().id.clone();

    session.translate_message(settings_, &id, &AbortSignal::never()).await.unwrap();
    assert!(service.last_request().language_directive.starts_with("Respond in Hindi"));
    let message = session.message(&id).unwrap();
    assert!(message.show_translated);
    assert_eq!(message.displayed_text(), "पौधे सूर्य के प्रकाश से भोजन बनाते हैं।");

    session.translate_message(settings_, &id, &AbortSignal::never()).await.unwrap();
    assert_eq!(service.calls(), 2);
    assert_eq!(session.message(&id).unwrap().displayed_text(), "Plants make food from sunlight.");
}

#[tokio::test]
async fn test_speech_voice_follows_script() {
    let audio = GenerateResponse::inline(InlineData {
        mime_type: "audio/L16;rate=24000".to_string(),
        data: general_purpose::STANDARD.encode([0u8, 0, 1, 0]),
    });
    let service = Arc::new(ScriptedService::new(vec![
        Ok(GenerateResponse::text("गुरुत्वाकर्षण एक बल है।")),
        Ok(audio.clone()),
        Ok(GenerateResponse::text("Gravity is a force.")),
        Ok(audio),
    ]));
    let (mut session, _) = session_for(&service);
    let settings_ = &mut settings();
    let _ = settings_.set_language(Language::Hindi);

    session.ask(settings_, "गुरुत्वाकर्षण", None, &AbortSignal::never()).await;
    let hindi = session.last_reply().unwrap().id.clone();
    let outcome = session.speak_message(settings_, &hindi, &AbortSignal::never()).await.unwrap();
    assert!(outcome.audio.is_some());
    assert_eq!(
        service.last_request().shape,
        ResponseShape::Audio { voice: HINDI_VOICE.to_string() }
    );

    session.ask(settings_, "Gravity", None, &AbortSignal::never()).await;
    let english = session.last_reply().unwrap().id.clone();
    session.speak_message(settings_, &english, &AbortSignal::never()).await.unwrap();
    assert_eq!(
        service.last_request().shape,
        ResponseShape::Audio { voice: ENGLISH_VOICE.to_string() }
    );

    assert!(session.speak_message(settings_, "missing", &AbortSignal::never()).await.is_err());
}

#[tokio::test]
async fn test_accepted_attachment_is_recorded_as_upload() {
    let service = Arc::new(ScriptedService::text("The diagram shows a cell."));
    let (mut session, _) = session_for(&service);
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("settings.json");
    let mut settings = Settings::load(Box::new(FileStore::open(&path).unwrap()));
    let attachment = Attachment::from_bytes("cell.png", "image/png", &[0u8; 2048]);

    let outcome = session
        .ask(&mut settings, "Label this", Some(attachment), &AbortSignal::never())
        .await;

    assert!(outcome.warning.is_none());
    let upload = &settings.uploads()[0];
    assert_eq!(upload.name, "cell.png");
    assert_eq!(upload.mime_type, "image/png");
    assert_eq!(upload.size, "2.0 KB");
    assert_eq!(upload.status, UploadStatus::Success);

    let reloaded = Settings::load(Box::new(FileStore::open(&path).unwrap()));
    assert_eq!(reloaded.uploads().len(), 1);
    assert_eq!(reloaded.uploads()[0].name, "cell.png");
}

#[tokio::test]
async fn test_upload_write_failure_is_reported() {
    let service = Arc::new(ScriptedService::text("ok"));
    let (mut session, _) = session_for(&service);
    let mut settings = Settings::load(Box::new(MemoryStore::with_capacity(64)));
    let attachment = Attachment::from_bytes("notes.pdf", "application/pdf", b"%PDF");

    let outcome = session
        .ask(&mut settings, "", Some(attachment), &AbortSignal::never())
        .await;

    let warning = outcome.warning.expect("upload record should not fit");
    assert_eq!(warning.key, KEY_UPLOADED_FILES);
    assert_eq!(settings.uploads().len(), 1);
    assert!(service.last_request().prompt_text().contains("analyze this file"));
}
