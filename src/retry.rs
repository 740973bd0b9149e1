//! Retry/backoff controller around outbound generative-service calls.
//!
//! This is the single place where raw [`ServiceFailure`]s are turned into
//! typed [`ApiError`]s. Every call site goes through [`RetryController::run`].

use crate::cancel::AbortSignal;
use crate::errors::{ApiError, ErrorKind, ServiceFailure};
use rand::Rng;
use serde::{Deserialize, Serialize};
use std::future::Future;
use std::time::Duration;
use tracing::{debug, error, info, warn};

/// API status codes that name a content-policy block.
const SAFETY_CODES: &[&str] = &["SAFETY", "BLOCKLIST", "PROHIBITED_CONTENT", "SPII", "RECITATION"];
const QUOTA_CODES: &[&str] = &["RESOURCE_EXHAUSTED"];
const SERVER_CODES: &[&str] = &["INTERNAL", "UNAVAILABLE", "DEADLINE_EXCEEDED"];

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct BackoffConfig {
    pub base_delay_ms: u64,
    pub factor: f64,
    pub max_delay_ms: u64,
    pub jitter_ms: u64,
}

impl Default for BackoffConfig {
    fn default() -> Self {
        Self {
            base_delay_ms: 500,
            factor: 2.0,
            max_delay_ms: 8_000,
            jitter_ms: 500,
        }
    }
}

impl BackoffConfig {
    /// Delay to wait after `attempt` (1-based) failed, before the next one.
    /// `jitter` is the random component, clamped to `jitter_ms`.
    pub fn delay_for_attempt(&self, attempt: u32, jitter: u64) -> Duration {
        let exp = attempt.saturating_sub(1).min(i32::MAX as u32) as i32;
        let factor = if self.factor.is_finite() { self.factor.max(1.0) } else { 1.0 };
        let base = (self.base_delay_ms as f64) * factor.powi(exp);
        let capped = base.min(self.max_delay_ms as f64).max(0.0);
        Duration::from_millis((capped.round() as u64).saturating_add(jitter.min(self.jitter_ms)))
    }

    fn sample_jitter(&self) -> u64 {
        if self.jitter_ms == 0 {
            return 0;
        }
        rand::thread_rng().gen_range(0..=self.jitter_ms)
    }
}

/// What the controller did after an attempt.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Decision {
    Succeeded,
    Retry,
    GiveUp,
    Cancelled,
}

/// One attempt of one call sequence. Never persisted.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AttemptRecord {
    pub attempt: u32,
    pub delay: Duration,
    pub classification: Option<ErrorKind>,
    pub decision: Decision,
}

#[derive(Debug)]
pub struct RetryOutcome<T> {
    pub result: Result<T, ApiError>,
    pub attempts: Vec<AttemptRecord>,
}

impl<T> RetryOutcome<T> {
    pub fn total_delay(&self) -> Duration {
        self.attempts.iter().map(|a| a.delay).sum()
    }
}

/// Classifies a raw failure.
///
/// Structured fields (API status code, HTTP status) are consulted first. The
/// message heuristics below them exist for adapters and transports that only
/// report free text; they are a compatibility shim and match case-insensitively.
pub fn classify(failure: &ServiceFailure) -> ErrorKind {
    if let Some(code) = failure.code.as_deref() {
        let code = code.to_ascii_uppercase();
        if SAFETY_CODES.contains(&code.as_str()) {
            return ErrorKind::SafetyBlocked;
        }
        if QUOTA_CODES.contains(&code.as_str()) {
            return ErrorKind::QuotaExceeded;
        }
        if SERVER_CODES.contains(&code.as_str()) {
            return ErrorKind::ServerError;
        }
    }

    match failure.status {
        Some(429) => return ErrorKind::QuotaExceeded,
        Some(500..=599) => return ErrorKind::ServerError,
        _ => {}
    }

    let message = failure.message.to_lowercase();
    if message.contains("429") || message.contains("quota") {
        ErrorKind::QuotaExceeded
    } else if message.contains("500") {
        ErrorKind::ServerError
    } else if message.contains("safety") || message.contains("blocked") || message.contains("candidate") {
        ErrorKind::SafetyBlocked
    } else {
        ErrorKind::Unknown
    }
}

/// Stateless between invocations; clone freely.
#[derive(Debug, Clone, Default)]
pub struct RetryController {
    backoff: BackoffConfig,
}

impl RetryController {
    pub fn new(backoff: BackoffConfig) -> Self {
        Self { backoff }
    }

    pub fn backoff(&self) -> &BackoffConfig {
        &self.backoff
    }

    pub async fn run<T, F, Fut>(&self, max_attempts: u32, signal: &AbortSignal, op: F) -> Result<T, ApiError>
    where
        F: FnMut() -> Fut,
        Fut: Future<Output = Result<T, ServiceFailure>>,
    {
        self.run_traced(max_attempts, signal, op).await.result
    }

    /// Executes `op` up to `max_attempts` times (at least once) and reports
    /// every attempt alongside the result.
    pub async fn run_traced<T, F, Fut>(&self, max_attempts: u32, signal: &AbortSignal, mut op: F) -> RetryOutcome<T>
    where
        F: FnMut() -> Fut,
        Fut: Future<Output = Result<T, ServiceFailure>>,
    {
        let max_attempts = max_attempts.max(1);
        let mut attempts = Vec::new();
        let mut attempt = 0;

        loop {
            attempt += 1;
            if signal.is_aborted() {
                debug!("Call aborted before attempt {}", attempt);
                return RetryOutcome {
                    result: Err(ApiError::cancelled(attempt - 1)),
                    attempts,
                };
            }

            let result = tokio::select! {
                result = op() => result,
                _ = signal.aborted() => {
                    debug!("Call aborted during attempt {}", attempt);
                    attempts.push(AttemptRecord {
                        attempt,
                        delay: Duration::ZERO,
                        classification: None,
                        decision: Decision::Cancelled,
                    });
                    return RetryOutcome {
                        result: Err(ApiError::cancelled(attempt)),
                        attempts,
                    };
                }
            };

            let failure = match result {
                Ok(value) => {
                    if attempt > 1 {
                        info!("✅ Request recovered on attempt {}/{}", attempt, max_attempts);
                    }
                    attempts.push(AttemptRecord {
                        attempt,
                        delay: Duration::ZERO,
                        classification: None,
                        decision: Decision::Succeeded,
                    });
                    return RetryOutcome { result: Ok(value), attempts };
                }
                Err(failure) => failure,
            };

            let kind = classify(&failure);
            let has_budget = attempt < max_attempts;

            if !kind.is_retryable() || !has_budget {
                if kind.is_retryable() {
                    error!("❌ {} after {} attempt(s): {}", kind, attempt, failure.message);
                } else {
                    warn!("❌ Non-retryable {} on attempt {}: {}", kind, attempt, failure.message);
                }
                attempts.push(AttemptRecord {
                    attempt,
                    delay: Duration::ZERO,
                    classification: Some(kind),
                    decision: Decision::GiveUp,
                });
                return RetryOutcome {
                    result: Err(ApiError::from_failure(kind, failure, attempt)),
                    attempts,
                };
            }

            if signal.is_aborted() {
                attempts.push(AttemptRecord {
                    attempt,
                    delay: Duration::ZERO,
                    classification: Some(kind),
                    decision: Decision::Cancelled,
                });
                return RetryOutcome {
                    result: Err(ApiError::cancelled(attempt)),
                    attempts,
                };
            }

            let delay = self.backoff.delay_for_attempt(attempt, self.backoff.sample_jitter());
            warn!(
                "⚠️  {} on attempt {}/{} ({}), retrying in {}ms",
                kind,
                attempt,
                max_attempts,
                failure.message,
                delay.as_millis()
            );

            let started = tokio::time::Instant::now();
            let aborted = tokio::select! {
                _ = tokio::time::sleep(delay) => false,
                _ = signal.aborted() => true,
            };

            if aborted {
                debug!("Call aborted during backoff after attempt {}", attempt);
                attempts.push(AttemptRecord {
                    attempt,
                    delay: started.elapsed(),
                    classification: Some(kind),
                    decision: Decision::Cancelled,
                });
                return RetryOutcome {
                    result: Err(ApiError::cancelled(attempt)),
                    attempts,
                };
            }

            attempts.push(AttemptRecord {
                attempt,
                delay,
                classification: Some(kind),
                decision: Decision::Retry,
            });
        }
    }
}
