use anyhow::{anyhow, Result};
use async_trait::async_trait;
use pathshala::errors::{ApiError, ErrorKind, ServiceFailure};
use pathshala::notice::{route_error, Notice};
use pathshala::remediation::{
    remediate_shared, CredentialFlow, PromptState, RemediationOutcome, RemediationPrompt, SharedPrompt,
};
use pathshala::settings::Language;
use std::sync::atomic::{AtomicBool, AtomicU32, Ordering};
use std::sync::Mutex;

struct FakeFlow {
    available: bool,
    fail: bool,
    opened: AtomicU32,
}

impl FakeFlow {
    fn new(available: bool, fail: bool) -> Self {
        Self {
            available,
            fail,
            opened: AtomicU32::new(0),
        }
    }
}

#[async_trait]
impl CredentialFlow for FakeFlow {
    fn is_available(&self) -> bool {
        self.available
    }

    async fn open_key_selection(&self) -> Result<()> {
        self.opened.fetch_add(1, Ordering::SeqCst);
        if self.fail {
            Err(anyhow!("dialog could not be opened"))
        } else {
            Ok(())
        }
    }
}

fn error(kind: ErrorKind) -> ApiError {
    ApiError::from_failure(kind, ServiceFailure::new("detail"), 3)
}

fn shown_prompt() -> RemediationPrompt {
    let mut prompt = RemediationPrompt::new();
    assert!(prompt.observe(&error(ErrorKind::QuotaExceeded)));
    prompt
}

#[test]
fn test_only_quota_raises_prompt() {
    let mut prompt = RemediationPrompt::new();
    for kind in [ErrorKind::SafetyBlocked, ErrorKind::ServerError, ErrorKind::Unknown, ErrorKind::Cancelled] {
        assert!(!prompt.observe(&error(kind)));
        assert_eq!(prompt.state(), PromptState::Normal);
    }
    assert!(prompt.observe(&error(ErrorKind::QuotaExceeded)));
    assert_eq!(prompt.state(), PromptState::ErrorShown);
    assert_eq!(prompt.last_error(), Some("detail"));
}

#[test]
fn test_repeated_quota_keeps_single_prompt() {
    let mut prompt = shown_prompt();
    assert!(prompt.observe(&error(ErrorKind::QuotaExceeded)));
    assert_eq!(prompt.state(), PromptState::ErrorShown);
}

#[test]
fn test_dismiss_returns_to_normal() {
    let mut prompt = shown_prompt();
    prompt.dismiss().unwrap();
    assert_eq!(prompt.state(), PromptState::Normal);
    assert!(prompt.last_error().is_none());
}

#[test]
fn test_invalid_transitions_leave_state_unchanged() {
    let mut prompt = RemediationPrompt::new();
    let err = prompt.begin().unwrap_err();
    assert_eq!(err.state, PromptState::Normal);
    assert!(prompt.dismiss().is_err());
    assert!(prompt.complete(Ok(())).is_err());
    assert_eq!(prompt.state(), PromptState::Normal);

    let mut prompt = shown_prompt();
    prompt.begin().unwrap();
    assert!(prompt.dismiss().is_err());
    assert_eq!(prompt.state(), PromptState::RemediationPending);
}

#[test]
fn test_manual_transitions() {
    let mut prompt = shown_prompt();
    prompt.begin().unwrap();
    assert_eq!(prompt.state(), PromptState::RemediationPending);
    let outcome = prompt.complete(Err(anyhow!("no dialog"))).unwrap();
    assert!(matches!(outcome, RemediationOutcome::Failed(_)));
    assert_eq!(prompt.state(), PromptState::ErrorShown);

    prompt.begin().unwrap();
    assert_eq!(prompt.complete(Ok(())).unwrap(), RemediationOutcome::Completed);
    assert_eq!(prompt.state(), PromptState::Normal);
}

#[tokio::test]
async fn test_successful_flow_closes_prompt_optimistically() {
    let mut prompt = shown_prompt();
    let flow = FakeFlow::new(true, false);

    let outcome = prompt.remediate(&flow).await.unwrap();

    assert_eq!(outcome, RemediationOutcome::Completed);
    assert_eq!(prompt.state(), PromptState::Normal);
    assert_eq!(flow.opened.load(Ordering::SeqCst), 1);
}

#[tokio::test]
async fn test_failed_flow_keeps_prompt_open() {
    let mut prompt = shown_prompt();
    let flow = FakeFlow::new(true, true);

    let outcome = prompt.remediate(&flow).await.unwrap();

    assert_eq!(
        outcome,
        RemediationOutcome::Failed("dialog could not be opened".to_string())
    );
    assert_eq!(prompt.state(), PromptState::ErrorShown);
}

#[tokio::test]
async fn test_missing_capability_closes_prompt() {
    let mut prompt = shown_prompt();
    let flow = FakeFlow::new(false, false);

    let outcome = prompt.remediate(&flow).await.unwrap();

    assert_eq!(outcome, RemediationOutcome::Unavailable);
    assert_eq!(prompt.state(), PromptState::Normal);
    assert_eq!(flow.opened.load(Ordering::SeqCst), 0);
}

#[tokio::test]
async fn test_remediate_requires_shown_prompt() {
    let mut prompt = RemediationPrompt::new();
    let flow = FakeFlow::new(true, false);
    assert!(prompt.remediate(&flow).await.is_err());
    assert_eq!(flow.opened.load(Ordering::SeqCst), 0);
}

#[test]
fn test_routing_localises_inline_messages() {
    let mut prompt = RemediationPrompt::new();

    let english = route_error(&error(ErrorKind::SafetyBlocked), &mut prompt, Language::English);
    let hindi = route_error(&error(ErrorKind::SafetyBlocked), &mut prompt, Language::Hindi);
    assert!(english.message().unwrap().contains("safety"));
    assert!(hindi.message().unwrap().contains("सुरक्षा"));

    match route_error(&error(ErrorKind::Unknown), &mut prompt, Language::English) {
        Notice::Inline { retry, details, .. } => {
            assert!(retry);
            assert_eq!(details, "detail");
        }
        other => panic!("unexpected notice {:?}", other),
    }
    assert_eq!(prompt.state(), PromptState::Normal);
}

/// Looks at the shared prompt from inside the host flow, the way a
/// concurrent call routing its own error would.
struct ObservingFlow {
    prompt: SharedPrompt,
    unlocked: AtomicBool,
    seen: Mutex<Option<PromptState>>,
}

#[async_trait]
impl CredentialFlow for ObservingFlow {
    fn is_available(&self) -> bool {
        true
    }

    async fn open_key_selection(&self) -> Result<()> {
        if let Ok(mut prompt) = self.prompt.try_lock() {
            self.unlocked.store(true, Ordering::SeqCst);
            *self.seen.lock().unwrap() = Some(prompt.state());
            let _ = route_error(&error(ErrorKind::ServerError), &mut prompt, Language::English);
        }
        Ok(())
    }
}

#[tokio::test]
async fn test_shared_prompt_is_unlocked_while_key_is_entered() {
    let prompt = RemediationPrompt::shared();
    assert!(prompt.lock().await.observe(&error(ErrorKind::QuotaExceeded)));
    let flow = ObservingFlow {
        prompt: prompt.clone(),
        unlocked: AtomicBool::new(false),
        seen: Mutex::new(None),
    };

    let outcome = remediate_shared(&prompt, &flow).await.unwrap();

    assert_eq!(outcome, RemediationOutcome::Completed);
    assert!(flow.unlocked.load(Ordering::SeqCst));
    assert_eq!(*flow.seen.lock().unwrap(), Some(PromptState::RemediationPending));
    assert_eq!(prompt.lock().await.state(), PromptState::Normal);
}

#[tokio::test]
async fn test_shared_remediation_without_capability() {
    let prompt = RemediationPrompt::shared();
    assert!(prompt.lock().await.observe(&error(ErrorKind::QuotaExceeded)));
    let flow = FakeFlow::new(false, false);

    let outcome = remediate_shared(&prompt, &flow).await.unwrap();

    assert_eq!(outcome, RemediationOutcome::Unavailable);
    assert_eq!(flow.opened.load(Ordering::SeqCst), 0);
    assert_eq!(prompt.lock().await.state(), PromptState::Normal);
}
