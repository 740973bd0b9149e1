//! # Pathshala - WBBSE Hindi-medium study companion
//!
//! A terminal tutor backed by the Gemini generative API.
//!
//! ## Features
//!
//! - Problem solving with search grounding and file attachments
//! - Chapter summaries, board-style Q&A and timed practice exams
//! - Printable sample papers following the board's paper format
//! - Translation, speech synthesis and diagram generation
//! - Retry with exponential backoff and a global quota-remediation prompt
//!
//! ## Usage
//!
//! ```rust,no_run
//! use std::sync::Arc;
//! use pathshala::{AbortSignal, Config, GeminiProvider, TutorClient};
//!
//! #[tokio::main]
//! async fn main() -> anyhow::Result<()> {
//!     let config = Config::load()?;
//!     let provider = Arc::new(GeminiProvider::new(config.service.clone())?);
//!     let client = TutorClient::new(provider, &config);
//!
//!     let answer = client
//!         .solve_problem("What is photosynthesis?", None, &AbortSignal::never())
//!         .await?;
//!     if let Some(solution) = answer.value() {
//!         println!("{}", solution.text);
//!     }
//!
//!     Ok(())
//! }
//! ```

pub mod cancel;
pub mod client;
pub mod config;
pub mod curriculum;
pub mod errors;
pub mod models;
pub mod notice;
pub mod parse;
pub mod providers;
pub mod remediation;
pub mod render;
pub mod retry;
pub mod session;
pub mod settings;
pub mod storage;
pub mod utils;

// Re-export commonly used types for convenience
pub use cancel::{AbortController, AbortSignal};
pub use client::{AudioClip, Diagram, Solution, TutorClient};
pub use config::Config;
pub use errors::{ApiError, ErrorKind, ServiceFailure};
pub use models::{GenerateResponse, GenerativeService, Operation, RequestDescriptor, ResponseShape};
pub use parse::{EmptyReason, Parsed};
pub use providers::{ApiKeyHandle, GeminiProvider};
pub use remediation::{CredentialFlow, PromptState, RemediationOutcome, RemediationPrompt};
pub use retry::{BackoffConfig, RetryController};
pub use settings::{Language, Settings};
