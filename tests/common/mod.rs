#![allow(dead_code)]

use async_trait::async_trait;
use pathshala::config::{AttemptBudgets, Config};
use pathshala::errors::ServiceFailure;
use pathshala::models::{GenerateResponse, GenerativeService, RequestDescriptor};
use pathshala::retry::BackoffConfig;
use std::collections::VecDeque;
use std::sync::Mutex;

/// In-process stand-in for the generative service. Replies are handed out in
/// order; once the script runs out the last reply repeats.
pub struct ScriptedService {
    replies: Mutex<VecDeque<Result<GenerateResponse, ServiceFailure>>>,
    last: Mutex<Option<Result<GenerateResponse, ServiceFailure>>>,
    requests: Mutex<Vec<RequestDescriptor>>,
}

impl ScriptedService {
    pub fn new(replies: Vec<Result<GenerateResponse, ServiceFailure>>) -> Self {
        Self {
            replies: Mutex::new(replies.into()),
            last: Mutex::new(None),
            requests: Mutex::new(Vec::new()),
        }
    }

    pub fn always(reply: Result<GenerateResponse, ServiceFailure>) -> Self {
        Self::new(vec![reply])
    }

    pub fn text(text: &str) -> Self {
        Self::always(Ok(GenerateResponse::text(text)))
    }

    pub fn calls(&self) -> usize {
        self.requests.lock().unwrap().len()
    }

    pub fn requests(&self) -> Vec<RequestDescriptor> {
        self.requests.lock().unwrap().clone()
    }

    pub fn last_request(&self) -> RequestDescriptor {
        self.requests.lock().unwrap().last().cloned().expect("no request issued")
    }
}

#[async_trait]
impl GenerativeService for ScriptedService {
    fn name(&self) -> &str {
        "Scripted"
    }

    fn is_available(&self) -> bool {
        true
    }

    async fn generate(&self, request: &RequestDescriptor) -> Result<GenerateResponse, ServiceFailure> {
        self.requests.lock().unwrap().push(request.clone());
        let next = self.replies.lock().unwrap().pop_front();
        let mut last = self.last.lock().unwrap();
        match next {
            Some(reply) => {
                *last = Some(reply.clone());
                reply
            }
            None => last
                .clone()
                .unwrap_or_else(|| Err(ServiceFailure::new("script exhausted"))),
        }
    }
}

pub fn quota() -> ServiceFailure {
    ServiceFailure::new("Gemini API error 429: Resource has been exhausted").with_status(429)
}

pub fn unavailable() -> ServiceFailure {
    ServiceFailure::new("Gemini API error 503: The model is overloaded").with_status(503)
}

/// Deterministic backoff for tests: 100ms, 200ms, 400ms... no jitter.
pub fn fixed_backoff() -> BackoffConfig {
    BackoffConfig {
        base_delay_ms: 100,
        factor: 2.0,
        max_delay_ms: 1_000,
        jitter_ms: 0,
    }
}

pub fn test_config(attempts: u32) -> Config {
    let mut config = Config::default();
    config.retry.backoff = fixed_backoff();
    config.retry.attempts = AttemptBudgets::uniform(attempts);
    config
}
