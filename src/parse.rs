//! Parse-or-empty handling of successful service responses.

use serde::de::DeserializeOwned;
use tracing::warn;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum EmptyReason {
    /// The service answered without usable content.
    NoContent,
    /// Content was present but did not match the expected shape.
    Malformed(String),
}

/// Outcome of parsing a successful response. Never an error: the caller picks
/// a fallback for `Empty` and stays renderable.
#[derive(Debug, Clone, PartialEq)]
pub enum Parsed<T> {
    Value(T),
    Empty(EmptyReason),
}

impl<T> Parsed<T> {
    pub fn is_empty(&self) -> bool {
        matches!(self, Parsed::Empty(_))
    }

    pub fn value(self) -> Option<T> {
        match self {
            Parsed::Value(v) => Some(v),
            Parsed::Empty(_) => None,
        }
    }

    pub fn as_value(&self) -> Option<&T> {
        match self {
            Parsed::Value(v) => Some(v),
            Parsed::Empty(_) => None,
        }
    }

    pub fn unwrap_or(self, fallback: T) -> T {
        self.value().unwrap_or(fallback)
    }

    pub fn unwrap_or_else(self, fallback: impl FnOnce(&EmptyReason) -> T) -> T {
        match self {
            Parsed::Value(v) => v,
            Parsed::Empty(reason) => fallback(&reason),
        }
    }

    pub fn unwrap_or_default(self) -> T
    where
        T: Default,
    {
        self.value().unwrap_or_default()
    }

    pub fn map<U>(self, f: impl FnOnce(T) -> U) -> Parsed<U> {
        match self {
            Parsed::Value(v) => Parsed::Value(f(v)),
            Parsed::Empty(reason) => Parsed::Empty(reason),
        }
    }

    pub fn and_then<U>(self, f: impl FnOnce(T) -> Parsed<U>) -> Parsed<U> {
        match self {
            Parsed::Value(v) => f(v),
            Parsed::Empty(reason) => Parsed::Empty(reason),
        }
    }
}

/// Non-blank text or `Empty(NoContent)`.
pub fn parse_text(text: Option<&str>) -> Parsed<String> {
    match text.map(str::trim) {
        Some(t) if !t.is_empty() => Parsed::Value(t.to_string()),
        _ => Parsed::Empty(EmptyReason::NoContent),
    }
}

/// Deserializes a JSON body, tolerating a surrounding markdown code fence.
pub fn parse_json<T: DeserializeOwned>(text: Option<&str>) -> Parsed<T> {
    let Some(raw) = text.map(str::trim).filter(|t| !t.is_empty()) else {
        return Parsed::Empty(EmptyReason::NoContent);
    };

    match serde_json::from_str(strip_code_fence(raw)) {
        Ok(value) => Parsed::Value(value),
        Err(e) => {
            warn!("Discarding malformed JSON response: {}", e);
            Parsed::Empty(EmptyReason::Malformed(e.to_string()))
        }
    }
}

fn strip_code_fence(raw: &str) -> &str {
    let Some(rest) = raw.strip_prefix("```") else {
        return raw;
    };
    // drop the info string ("json") on the opening line
    let body = rest.split_once('\n').map(|(_, body)| body).unwrap_or("");
    body.trim_end().strip_suffix("```").unwrap_or(body).trim()
}
