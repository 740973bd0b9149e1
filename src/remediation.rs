//! Global quota-remediation prompt.
//!
//! One prompt per process, shared by every call site. A quota failure raises
//! it; the student either dismisses it or goes through the host's credential
//! flow. Success is taken on trust: the flow resolving is enough to close the
//! prompt, and the failed operation is left for the student to retry.

use crate::errors::{ApiError, ErrorKind};
use crate::providers::ApiKeyHandle;
use crate::utils::paths;
use anyhow::{anyhow, bail, Result};
use async_trait::async_trait;
use std::fmt;
use std::io::Write;
use std::path::PathBuf;
use std::sync::Arc;
use thiserror::Error;
use tracing::{error, info, warn};

pub const KEY_PAGE_URL: &str = "https://aistudio.google.com/app/apikey";

/// The process-wide prompt, shared by every call site.
pub type SharedPrompt = Arc<tokio::sync::Mutex<RemediationPrompt>>;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PromptState {
    Normal,
    ErrorShown,
    RemediationPending,
}

impl fmt::Display for PromptState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            PromptState::Normal => "normal",
            PromptState::ErrorShown => "error shown",
            PromptState::RemediationPending => "remediation pending",
        };
        f.write_str(name)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("cannot {action} while the prompt is {state}")]
pub struct TransitionError {
    pub action: &'static str,
    pub state: PromptState,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RemediationOutcome {
    /// The host flow resolved; the prompt is closed.
    Completed,
    /// The host flow could not be opened; the prompt stays up.
    Failed(String),
    /// The host has no credential capability; the prompt is closed.
    Unavailable,
}

/// Host capability that lets the student supply a different credential.
#[async_trait]
pub trait CredentialFlow: Send + Sync {
    fn is_available(&self) -> bool;
    async fn open_key_selection(&self) -> Result<()>;
}

#[derive(Debug)]
pub struct RemediationPrompt {
    state: PromptState,
    last_error: Option<String>,
}

impl Default for RemediationPrompt {
    fn default() -> Self {
        Self::new()
    }
}

impl RemediationPrompt {
    pub fn shared() -> SharedPrompt {
        Arc::new(tokio::sync::Mutex::new(Self::new()))
    }

    pub fn new() -> Self {
        Self {
            state: PromptState::Normal,
            last_error: None,
        }
    }

    pub fn state(&self) -> PromptState {
        self.state
    }

    pub fn is_shown(&self) -> bool {
        self.state != PromptState::Normal
    }

    pub fn last_error(&self) -> Option<&str> {
        self.last_error.as_deref()
    }

    /// Returns `true` when the error belongs to the global prompt, in which
    /// case the call site shows nothing of its own.
    pub fn observe(&mut self, error: &ApiError) -> bool {
        if error.kind != ErrorKind::QuotaExceeded {
            return false;
        }
        if self.state == PromptState::Normal {
            warn!("🔑 Quota exceeded, showing key prompt");
            self.state = PromptState::ErrorShown;
        }
        self.last_error = Some(error.message.clone());
        true
    }

    pub fn begin(&mut self) -> Result<(), TransitionError> {
        self.expect(PromptState::ErrorShown, "begin remediation")?;
        self.state = PromptState::RemediationPending;
        Ok(())
    }

    pub fn complete(&mut self, result: Result<()>) -> Result<RemediationOutcome, TransitionError> {
        self.expect(PromptState::RemediationPending, "complete remediation")?;
        Ok(match result {
            Ok(()) => {
                info!("✅ Credential flow finished, closing key prompt");
                self.state = PromptState::Normal;
                self.last_error = None;
                RemediationOutcome::Completed
            }
            Err(e) => {
                error!("❌ Could not open the key selection: {}", e);
                self.state = PromptState::ErrorShown;
                RemediationOutcome::Failed(e.to_string())
            }
        })
    }

    pub fn dismiss(&mut self) -> Result<(), TransitionError> {
        self.expect(PromptState::ErrorShown, "dismiss")?;
        self.state = PromptState::Normal;
        self.last_error = None;
        Ok(())
    }

    pub async fn remediate(&mut self, flow: &dyn CredentialFlow) -> Result<RemediationOutcome, TransitionError> {
        if let Some(outcome) = self.prepare(flow)? {
            return Ok(outcome);
        }
        let result = flow.open_key_selection().await;
        self.complete(result)
    }

    /// Moves to `RemediationPending`, or closes the prompt and returns
    /// `Unavailable` when the host has no credential flow.
    fn prepare(&mut self, flow: &dyn CredentialFlow) -> Result<Option<RemediationOutcome>, TransitionError> {
        self.expect(PromptState::ErrorShown, "begin remediation")?;
        if !flow.is_available() {
            warn!("No credential flow available in this environment");
            self.state = PromptState::Normal;
            self.last_error = None;
            return Ok(Some(RemediationOutcome::Unavailable));
        }
        self.begin()?;
        Ok(None)
    }

    fn expect(&self, required: PromptState, action: &'static str) -> Result<(), TransitionError> {
        if self.state == required {
            Ok(())
        } else {
            Err(TransitionError {
                action,
                state: self.state,
            })
        }
    }
}

/// Runs the credential flow against the shared prompt. The lock is released
/// while the host flow runs, so other calls can still route their errors.
pub async fn remediate_shared(
    prompt: &SharedPrompt,
    flow: &dyn CredentialFlow,
) -> Result<RemediationOutcome, TransitionError> {
    if let Some(outcome) = prompt.lock().await.prepare(flow)? {
        return Ok(outcome);
    }
    let result = flow.open_key_selection().await;
    prompt.lock().await.complete(result)
}

/// Terminal credential flow: opens the key page, reads a key with a masked
/// prompt, saves it to the data-dir `.env` and swaps it into the provider.
pub struct KeyEntryFlow {
    handle: ApiKeyHandle,
    env_path: PathBuf,
    open_browser: bool,
}

impl KeyEntryFlow {
    pub fn new(handle: ApiKeyHandle, data_dir: &std::path::Path) -> Self {
        Self {
            handle,
            env_path: paths::env_file(data_dir),
            open_browser: true,
        }
    }

    pub fn without_browser(mut self) -> Self {
        self.open_browser = false;
        self
    }
}

#[async_trait]
impl CredentialFlow for KeyEntryFlow {
    fn is_available(&self) -> bool {
        std::io::IsTerminal::is_terminal(&std::io::stdin())
    }

    async fn open_key_selection(&self) -> Result<()> {
        if self.open_browser {
            println!("🌐 Opening {} ...", KEY_PAGE_URL);
            if let Err(e) = open::that(KEY_PAGE_URL) {
                println!("⚠️  Could not open the browser ({}). Visit the page manually.", e);
            }
        }

        let key = tokio::task::spawn_blocking(read_api_key)
            .await
            .map_err(|e| anyhow!("key prompt task failed: {}", e))??;

        if key.is_empty() {
            bail!("no key provided");
        }

        save_api_key(&self.env_path, &key)?;
        self.handle.set(key);
        println!("✅ API key saved to {:?}", self.env_path);
        Ok(())
    }
}

/// Reads an API key from the terminal without echoing it. Blocks.
pub fn read_api_key() -> Result<String> {
    let key = inquire::Password::new("🔑 Paste your Gemini API key:")
        .without_confirmation()
        .with_display_mode(inquire::PasswordDisplayMode::Masked)
        .prompt()?;
    Ok(key.trim().to_string())
}

/// Updates or appends `GEMINI_API_KEY=` in a dotenv file.
pub fn save_api_key(env_path: &std::path::Path, key: &str) -> Result<()> {
    let existing = if env_path.exists() {
        std::fs::read_to_string(env_path)?
    } else {
        String::new()
    };

    let mut found = false;
    let mut lines: Vec<String> = existing
        .lines()
        .map(|line| {
            if line.starts_with("GEMINI_API_KEY=") {
                found = true;
                format!("GEMINI_API_KEY={}", key)
            } else {
                line.to_string()
            }
        })
        .collect();
    if !found {
        lines.push(format!("GEMINI_API_KEY={}", key));
    }

    if let Some(parent) = env_path.parent() {
        std::fs::create_dir_all(parent)?;
    }
    let mut file = std::fs::File::create(env_path)?;
    for line in lines {
        writeln!(file, "{}", line)?;
    }
    Ok(())
}
