pub mod gemini;

pub use gemini::{ApiKeyHandle, GeminiProvider};
