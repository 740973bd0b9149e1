//! Maps a failed call to what the student sees.

use crate::errors::{ApiError, ErrorKind};
use crate::remediation::RemediationPrompt;
use crate::settings::Language;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Notice {
    /// The global key prompt owns the error; show nothing locally.
    GlobalPrompt,
    Inline {
        message: String,
        details: String,
        /// Re-issuing the same request is offered.
        retry: bool,
    },
    /// The student cancelled; nothing to show.
    Silent,
}

impl Notice {
    pub fn message(&self) -> Option<&str> {
        match self {
            Notice::Inline { message, .. } => Some(message),
            _ => None,
        }
    }
}

pub fn route_error(error: &ApiError, prompt: &mut RemediationPrompt, language: Language) -> Notice {
    if prompt.observe(error) {
        return Notice::GlobalPrompt;
    }

    let message = match error.kind {
        ErrorKind::Cancelled => return Notice::Silent,
        ErrorKind::QuotaExceeded => return Notice::GlobalPrompt,
        ErrorKind::SafetyBlocked => language.pick(
            "This request was blocked by the content safety filter. Try rephrasing your question.",
            "यह अनुरोध सुरक्षा फ़िल्टर द्वारा रोका गया। कृपया अपना प्रश्न दूसरे शब्दों में पूछें।",
        ),
        ErrorKind::ServerError => language.pick(
            "The AI service is having trouble right now. Please try again in a moment.",
            "AI सेवा में अभी समस्या है। कृपया थोड़ी देर बाद फिर से प्रयास करें।",
        ),
        ErrorKind::Unknown => language.pick(
            "Something went wrong. Please try again.",
            "कुछ गलत हो गया। कृपया फिर से प्रयास करें।",
        ),
    };

    Notice::Inline {
        message: message.to_string(),
        details: error.message.clone(),
        retry: true,
    }
}

/// Text of the global key prompt.
pub fn quota_prompt_text(language: Language) -> &'static str {
    language.pick(
        "The usage quota for the current API key is exhausted. Select a different (paid) API key to continue.",
        "वर्तमान API कुंजी का उपयोग कोटा समाप्त हो गया है। जारी रखने के लिए दूसरी (सशुल्क) API कुंजी चुनें।",
    )
}

/// Fallback shown when a successful response had nothing usable.
pub fn empty_fallback(language: Language) -> &'static str {
    language.pick("Solution unavailable.", "समाधान उपलब्ध नहीं है।")
}
