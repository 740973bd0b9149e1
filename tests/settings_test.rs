use chrono::Utc;
use pathshala::curriculum::{ExamQuestion, ExamSession, ExamTerm};
use pathshala::settings::{
    Language, Settings, Theme, UploadStatus, UploadedFile, KEY_SEARCH_HISTORY, MAX_HISTORY,
};
use pathshala::storage::{FileStore, KeyValueStore, MemoryStore, StorageError};
use tempfile::TempDir;

/// Reads fine, refuses every write.
struct ReadOnlyStore(MemoryStore);

impl KeyValueStore for ReadOnlyStore {
    fn get(&self, key: &str) -> Result<Option<String>, StorageError> {
        self.0.get(key)
    }

    fn set(&mut self, _key: &str, _value: &str) -> Result<(), StorageError> {
        Err(StorageError::Io(std::io::Error::new(
            std::io::ErrorKind::PermissionDenied,
            "read-only",
        )))
    }

    fn remove(&mut self, _key: &str) -> Result<(), StorageError> {
        Ok(())
    }
}

fn sample_exam() -> ExamSession {
    let questions = vec![ExamQuestion {
        question: "Capital of India?".to_string(),
        options: vec!["Kolkata".to_string(), "New Delhi".to_string()],
        correct_answer: 1,
        explanation: String::new(),
    }];
    ExamSession::new("Geography", "8", ExamTerm::Summative2, questions, Utc::now())
}

#[test]
fn test_scenario_d_full_store_keeps_history_in_memory() {
    let mut settings = Settings::load(Box::new(MemoryStore::with_capacity(40)));

    let warning = settings.record_search("Explain the water cycle in detail please");

    let warning = warning.expect("write past the quota should warn");
    assert_eq!(warning.key, KEY_SEARCH_HISTORY);
    assert!(warning.message.contains("quota"));
    assert_eq!(settings.history().len(), 1);
    assert_eq!(settings.history()[0].query, "Explain the water cycle in detail please");
}

#[test]
fn test_write_failures_never_undo_changes() {
    let mut settings = Settings::load(Box::new(ReadOnlyStore(MemoryStore::new())));

    assert!(settings.set_language(Language::Hindi).is_some());
    assert!(settings.set_theme(Theme::Dark).is_some());
    assert!(settings.save_exam(&sample_exam()).is_some());

    assert_eq!(settings.language(), Language::Hindi);
    assert!(settings.theme().is_dark());
    assert!(settings.saved_exam().is_some());
}

#[test]
fn test_history_is_deduplicated_newest_first_and_capped() {
    let mut settings = Settings::load(Box::new(MemoryStore::new()));
    for i in 0..12 {
        assert!(settings.record_search(&format!("query {}", i)).is_none());
    }
    assert!(settings.record_search("  query 5  ").is_none());
    assert!(settings.record_search("   ").is_none());

    let queries: Vec<&str> = settings.history().iter().map(|h| h.query.as_str()).collect();
    assert_eq!(queries.len(), MAX_HISTORY);
    assert_eq!(queries[0], "query 5");
    assert_eq!(queries.iter().filter(|q| **q == "query 5").count(), 1);
    assert_eq!(queries[1], "query 11");
}

#[test]
fn test_settings_survive_reload() {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("settings.json");
    let exam = sample_exam();

    {
        let mut settings = Settings::load(Box::new(FileStore::open(&path).unwrap()));
        assert!(settings.set_language(Language::Hindi).is_none());
        assert!(settings.set_theme(Theme::Dark).is_none());
        assert!(settings.record_search("photosynthesis").is_none());
        assert!(settings.save_exam(&exam).is_none());
        assert!(settings
            .add_upload(UploadedFile {
                id: "f1".to_string(),
                name: "notes.pdf".to_string(),
                size: "1.0 KB".to_string(),
                mime_type: "application/pdf".to_string(),
                status: UploadStatus::Success,
                timestamp: Utc::now(),
            })
            .is_none());
    }

    let raw = std::fs::read_to_string(&path).unwrap();
    assert!(raw.contains("\"lang\": \"hi\""));
    assert!(raw.contains("\"darkMode\": \"true\""));

    let mut settings = Settings::load(Box::new(FileStore::open(&path).unwrap()));
    assert_eq!(settings.language(), Language::Hindi);
    assert_eq!(settings.theme(), Theme::Dark);
    assert_eq!(settings.history()[0].query, "photosynthesis");
    assert_eq!(settings.saved_exam(), Some(&exam));
    assert_eq!(settings.uploads()[0].name, "notes.pdf");

    assert!(settings.remove_upload("f1").is_none());
    assert!(settings.clear_saved_exam().is_none());
    assert!(settings.clear_history().is_none());
    let settings = Settings::load(Box::new(FileStore::open(&path).unwrap()));
    assert!(settings.uploads().is_empty());
    assert!(settings.saved_exam().is_none());
    assert!(settings.history().is_empty());
}

#[test]
fn test_unreadable_values_fall_back_to_defaults() {
    let mut store = MemoryStore::new();
    store.set("lang", "fr").unwrap();
    store.set("darkMode", "not json").unwrap();
    store.set("searchHistory", "[{\"broken\": true}]").unwrap();

    let settings = Settings::load(Box::new(store));
    assert_eq!(settings.language(), Language::English);
    assert_eq!(settings.theme(), Theme::Light);
    assert!(settings.history().is_empty());
}

#[test]
fn test_saved_exam_with_mismatched_answers_is_repaired_on_load() {
    let mut stored = serde_json::to_value(sample_exam()).unwrap();
    stored["answers"] = serde_json::json!([]);
    stored["current"] = serde_json::json!(7);
    let mut store = MemoryStore::new();
    store.set("savedExam", &stored.to_string()).unwrap();

    let settings = Settings::load(Box::new(store));
    let mut exam = settings.saved_exam().cloned().unwrap();

    assert_eq!(exam.answers, vec![None]);
    assert_eq!(exam.current, 0);
    assert!(exam.current_question().is_some());
    exam.answer(0, 1).unwrap();
    assert_eq!(exam.grade(Language::English).score, 1);
}

#[test]
fn test_saved_exam_drops_out_of_range_answers() {
    let mut stored = serde_json::to_value(sample_exam()).unwrap();
    stored["answers"] = serde_json::json!([9, 1, 0]);
    let mut store = MemoryStore::new();
    store.set("savedExam", &stored.to_string()).unwrap();

    let settings = Settings::load(Box::new(store));

    assert_eq!(settings.saved_exam().unwrap().answers, vec![None]);
}
