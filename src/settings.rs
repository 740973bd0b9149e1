//! Process-wide settings service: loaded once at start, saved on every change.
//!
//! Writes that fail (full or unwritable store) never undo the in-memory change;
//! they come back as a [`StorageWarning`] for the front-end to display.

use crate::curriculum::ExamSession;
use crate::storage::{KeyValueStore, StorageError};
use crate::utils::media::{size_label, Attachment};
use anyhow::{bail, Result};
use chrono::{DateTime, Utc};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use tracing::{debug, warn};

pub const KEY_LANGUAGE: &str = "lang";
pub const KEY_DARK_MODE: &str = "darkMode";
pub const KEY_SEARCH_HISTORY: &str = "searchHistory";
pub const KEY_UPLOADED_FILES: &str = "uploadedFiles";
pub const KEY_SAVED_EXAM: &str = "savedExam";

pub const MAX_HISTORY: usize = 10;
pub const MAX_UPLOADS: usize = 20;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum Language {
    #[default]
    #[serde(rename = "en")]
    English,
    #[serde(rename = "hi")]
    Hindi,
}

impl Language {
    pub fn code(self) -> &'static str {
        match self {
            Language::English => "en",
            Language::Hindi => "hi",
        }
    }

    pub fn name(self) -> &'static str {
        match self {
            Language::English => "English",
            Language::Hindi => "Hindi",
        }
    }

    pub fn pick<'a>(self, english: &'a str, hindi: &'a str) -> &'a str {
        match self {
            Language::English => english,
            Language::Hindi => hindi,
        }
    }
}

impl FromStr for Language {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_lowercase().as_str() {
            "en" | "english" => Ok(Language::English),
            "hi" | "hindi" => Ok(Language::Hindi),
            other => bail!("unsupported language: {}", other),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Theme {
    #[default]
    Light,
    Dark,
}

impl Theme {
    pub fn is_dark(self) -> bool {
        self == Theme::Dark
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SearchHistoryItem {
    pub id: String,
    pub query: String,
    pub timestamp: DateTime<Utc>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum UploadStatus {
    Uploading,
    Success,
    Error,
}

/// Metadata of a file the student attached. Contents are not persisted.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UploadedFile {
    pub id: String,
    pub name: String,
    pub size: String,
    pub mime_type: String,
    pub status: UploadStatus,
    pub timestamp: DateTime<Utc>,
}

impl UploadedFile {
    /// Record for an attachment that was accepted for a question.
    pub fn accepted(attachment: &Attachment) -> Self {
        Self {
            id: uuid::Uuid::new_v4().to_string(),
            name: attachment.name.clone(),
            size: size_label(attachment.size_bytes),
            mime_type: attachment.mime_type.clone(),
            status: UploadStatus::Success,
            timestamp: Utc::now(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StorageWarning {
    pub key: &'static str,
    pub message: String,
}

impl fmt::Display for StorageWarning {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Could not save {}: {}", self.key, self.message)
    }
}

pub struct Settings {
    store: Box<dyn KeyValueStore>,
    language: Language,
    theme: Theme,
    history: Vec<SearchHistoryItem>,
    uploads: Vec<UploadedFile>,
    saved_exam: Option<ExamSession>,
}

impl fmt::Debug for Settings {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Settings")
            .field("language", &self.language)
            .field("theme", &self.theme)
            .field("history", &self.history.len())
            .field("uploads", &self.uploads.len())
            .field("saved_exam", &self.saved_exam.is_some())
            .finish()
    }
}

impl Settings {
    /// Reads every key once. Missing or unreadable values fall back to defaults.
    pub fn load(store: Box<dyn KeyValueStore>) -> Self {
        let language = read_raw(store.as_ref(), KEY_LANGUAGE)
            .and_then(|raw| raw.parse().ok())
            .unwrap_or_default();
        let theme = match read_json::<bool>(store.as_ref(), KEY_DARK_MODE) {
            Some(true) => Theme::Dark,
            _ => Theme::Light,
        };
        let history = read_json(store.as_ref(), KEY_SEARCH_HISTORY).unwrap_or_default();
        let uploads = read_json(store.as_ref(), KEY_UPLOADED_FILES).unwrap_or_default();
        let saved_exam = read_json::<ExamSession>(store.as_ref(), KEY_SAVED_EXAM).map(|mut exam| {
            exam.normalize();
            exam
        });

        Self {
            store,
            language,
            theme,
            history,
            uploads,
            saved_exam,
        }
    }

    pub fn language(&self) -> Language {
        self.language
    }

    pub fn theme(&self) -> Theme {
        self.theme
    }

    pub fn history(&self) -> &[SearchHistoryItem] {
        &self.history
    }

    pub fn uploads(&self) -> &[UploadedFile] {
        &self.uploads
    }

    pub fn saved_exam(&self) -> Option<&ExamSession> {
        self.saved_exam.as_ref()
    }

    #[must_use]
    pub fn set_language(&mut self, language: Language) -> Option<StorageWarning> {
        self.language = language;
        self.persist_raw(KEY_LANGUAGE, language.code().to_string())
    }

    #[must_use]
    pub fn set_theme(&mut self, theme: Theme) -> Option<StorageWarning> {
        self.theme = theme;
        self.persist_json(KEY_DARK_MODE, &theme.is_dark())
    }

    /// Moves `query` to the front of the history, dropping older duplicates
    /// and keeping at most [`MAX_HISTORY`] entries. Blank queries are ignored.
    #[must_use]
    pub fn record_search(&mut self, query: &str) -> Option<StorageWarning> {
        let query = query.trim();
        if query.is_empty() {
            return None;
        }
        self.history.retain(|h| h.query != query);
        self.history.insert(
            0,
            SearchHistoryItem {
                id: uuid::Uuid::new_v4().to_string(),
                query: query.to_string(),
                timestamp: Utc::now(),
            },
        );
        self.history.truncate(MAX_HISTORY);
        let history = self.history.clone();
        self.persist_json(KEY_SEARCH_HISTORY, &history)
    }

    #[must_use]
    pub fn clear_history(&mut self) -> Option<StorageWarning> {
        self.history.clear();
        self.persist_json(KEY_SEARCH_HISTORY, &Vec::<SearchHistoryItem>::new())
    }

    #[must_use]
    pub fn add_upload(&mut self, file: UploadedFile) -> Option<StorageWarning> {
        self.uploads.retain(|f| f.id != file.id);
        self.uploads.insert(0, file);
        self.uploads.truncate(MAX_UPLOADS);
        let uploads = self.uploads.clone();
        self.persist_json(KEY_UPLOADED_FILES, &uploads)
    }

    #[must_use]
    pub fn remove_upload(&mut self, id: &str) -> Option<StorageWarning> {
        let before = self.uploads.len();
        self.uploads.retain(|f| f.id != id);
        if self.uploads.len() == before {
            return None;
        }
        let uploads = self.uploads.clone();
        self.persist_json(KEY_UPLOADED_FILES, &uploads)
    }

    #[must_use]
    pub fn save_exam(&mut self, session: &ExamSession) -> Option<StorageWarning> {
        self.saved_exam = Some(session.clone());
        self.persist_json(KEY_SAVED_EXAM, session)
    }

    #[must_use]
    pub fn clear_saved_exam(&mut self) -> Option<StorageWarning> {
        self.saved_exam = None;
        match self.store.remove(KEY_SAVED_EXAM) {
            Ok(()) => None,
            Err(e) => Some(warning(KEY_SAVED_EXAM, e)),
        }
    }

    fn persist_json<T: Serialize + ?Sized>(&mut self, key: &'static str, value: &T) -> Option<StorageWarning> {
        match serde_json::to_string(value) {
            Ok(raw) => self.persist_raw(key, raw),
            Err(e) => Some(warning(key, StorageError::Corrupt(e))),
        }
    }

    fn persist_raw(&mut self, key: &'static str, raw: String) -> Option<StorageWarning> {
        match self.store.set(key, &raw) {
            Ok(()) => {
                debug!("Saved {} ({} bytes)", key, raw.len());
                None
            }
            Err(e) => Some(warning(key, e)),
        }
    }
}

fn warning(key: &'static str, error: StorageError) -> StorageWarning {
    warn!("⚠️  Failed to persist {}: {}", key, error);
    StorageWarning {
        key,
        message: error.to_string(),
    }
}

fn read_raw(store: &dyn KeyValueStore, key: &str) -> Option<String> {
    match store.get(key) {
        Ok(value) => value,
        Err(e) => {
            warn!("Failed to read {} from storage: {}", key, e);
            None
        }
    }
}

fn read_json<T: DeserializeOwned>(store: &dyn KeyValueStore, key: &str) -> Option<T> {
    let raw = read_raw(store, key)?;
    match serde_json::from_str(&raw) {
        Ok(value) => Some(value),
        Err(e) => {
            warn!("Ignoring unreadable {} in storage: {}", key, e);
            None
        }
    }
}
