//! Attachments, data URLs and audio containers.

use crate::models::InlineData;
use anyhow::{anyhow, bail, Result};
use base64::{engine::general_purpose, Engine as _};
use std::path::Path;

/// Largest file accepted as an attachment.
pub const MAX_ATTACHMENT_BYTES: usize = 20 * 1024 * 1024;

/// Sample rate of the speech the service returns.
pub const SPEECH_SAMPLE_RATE: u32 = 24_000;

/// A file the student attached to a question, held as base64.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Attachment {
    pub name: String,
    pub mime_type: String,
    pub data: String,
    pub size_bytes: usize,
}

impl Attachment {
    pub fn from_path(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let bytes = std::fs::read(path).map_err(|e| anyhow!("Cannot read {}: {}", path.display(), e))?;
        if bytes.len() > MAX_ATTACHMENT_BYTES {
            bail!(
                "{} is too large ({}), the limit is {}",
                path.display(),
                size_label(bytes.len()),
                size_label(MAX_ATTACHMENT_BYTES)
            );
        }

        let name = path
            .file_name()
            .map(|n| n.to_string_lossy().to_string())
            .unwrap_or_else(|| "attachment".to_string());
        let mime_type = mime_guess::from_path(path)
            .first_or_octet_stream()
            .essence_str()
            .to_string();

        Ok(Self::from_bytes(name, mime_type, &bytes))
    }

    pub fn from_bytes(name: impl Into<String>, mime_type: impl Into<String>, bytes: &[u8]) -> Self {
        Self {
            name: name.into(),
            mime_type: mime_type.into(),
            data: general_purpose::STANDARD.encode(bytes),
            size_bytes: bytes.len(),
        }
    }

    /// Accepts a `data:<mime>;base64,<payload>` URL.
    pub fn from_data_url(name: impl Into<String>, url: &str) -> Result<Self> {
        let (mime_type, data) = split_data_url(url).ok_or_else(|| anyhow!("not a base64 data URL"))?;
        let size_bytes = general_purpose::STANDARD
            .decode(data)
            .map_err(|e| anyhow!("invalid base64 payload: {}", e))?
            .len();
        Ok(Self {
            name: name.into(),
            mime_type: mime_type.to_string(),
            data: data.to_string(),
            size_bytes,
        })
    }

    pub fn is_image(&self) -> bool {
        self.mime_type.starts_with("image/")
    }

    pub fn to_inline(&self) -> InlineData {
        InlineData {
            mime_type: self.mime_type.clone(),
            data: self.data.clone(),
        }
    }

    pub fn to_data_url(&self) -> String {
        format!("data:{};base64,{}", self.mime_type, self.data)
    }
}

/// Splits a base64 data URL into its MIME type and payload.
pub fn split_data_url(url: &str) -> Option<(&str, &str)> {
    let rest = url.strip_prefix("data:")?;
    let (header, payload) = rest.split_once(',')?;
    let mime_type = header.strip_suffix(";base64")?;
    Some((mime_type, payload))
}

pub fn to_data_url(mime_type: &str, bytes: &[u8]) -> String {
    format!("data:{};base64,{}", mime_type, general_purpose::STANDARD.encode(bytes))
}

pub fn decode_base64(data: &str) -> Result<Vec<u8>> {
    general_purpose::STANDARD
        .decode(data.trim())
        .map_err(|e| anyhow!("invalid base64 payload: {}", e))
}

pub fn contains_devanagari(text: &str) -> bool {
    text.chars().any(|c| ('\u{0900}'..='\u{097F}').contains(&c))
}

/// Human-readable size, e.g. "12.3 KB".
pub fn size_label(bytes: usize) -> String {
    const UNITS: [&str; 4] = ["B", "KB", "MB", "GB"];
    let mut value = bytes as f64;
    let mut unit = 0;
    while value >= 1024.0 && unit < UNITS.len() - 1 {
        value /= 1024.0;
        unit += 1;
    }
    if unit == 0 {
        format!("{} {}", bytes, UNITS[0])
    } else {
        format!("{:.1} {}", value, UNITS[unit])
    }
}

/// Wraps raw little-endian 16-bit PCM in a RIFF/WAVE container.
pub fn pcm_to_wav(pcm: &[u8], sample_rate: u32, channels: u16) -> Vec<u8> {
    let bits_per_sample: u16 = 16;
    let block_align = channels * bits_per_sample / 8;
    let byte_rate = sample_rate * block_align as u32;
    let data_len = pcm.len() as u32;

    let mut wav = Vec::with_capacity(44 + pcm.len());
    wav.extend_from_slice(b"RIFF");
    wav.extend_from_slice(&(36 + data_len).to_le_bytes());
    wav.extend_from_slice(b"WAVE");
    wav.extend_from_slice(b"fmt ");
    wav.extend_from_slice(&16u32.to_le_bytes());
    wav.extend_from_slice(&1u16.to_le_bytes()); // PCM
    wav.extend_from_slice(&channels.to_le_bytes());
    wav.extend_from_slice(&sample_rate.to_le_bytes());
    wav.extend_from_slice(&byte_rate.to_le_bytes());
    wav.extend_from_slice(&block_align.to_le_bytes());
    wav.extend_from_slice(&bits_per_sample.to_le_bytes());
    wav.extend_from_slice(b"data");
    wav.extend_from_slice(&data_len.to_le_bytes());
    wav.extend_from_slice(pcm);
    wav
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn data_url_round_trip() {
        let attachment = Attachment::from_bytes("a.png", "image/png", b"abc");
        let url = attachment.to_data_url();
        assert_eq!(split_data_url(&url), Some(("image/png", "YWJj")));
        let parsed = Attachment::from_data_url("a.png", &url).unwrap();
        assert_eq!(parsed.size_bytes, 3);
        assert!(parsed.is_image());
        assert!(split_data_url("data:text/plain,hello").is_none());
    }

    #[test]
    fn attachment_guesses_mime_from_extension() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("notes.pdf");
        std::fs::write(&path, b"%PDF-1.4").unwrap();
        let attachment = Attachment::from_path(&path).unwrap();
        assert_eq!(attachment.mime_type, "application/pdf");
        assert_eq!(attachment.name, "notes.pdf");
    }

    #[test]
    fn devanagari_detection() {
        assert!(contains_devanagari("प्रकाश संश्लेषण"));
        assert!(!contains_devanagari("photosynthesis"));
    }

    #[test]
    fn sizes() {
        assert_eq!(size_label(512), "512 B");
        assert_eq!(size_label(1536), "1.5 KB");
    }

    #[test]
    fn wav_header_describes_payload() {
        let wav = pcm_to_wav(&[0u8; 8], SPEECH_SAMPLE_RATE, 1);
        assert_eq!(wav.len(), 52);
        assert_eq!(&wav[0..4], b"RIFF");
        assert_eq!(&wav[8..12], b"WAVE");
        assert_eq!(u32::from_le_bytes([wav[24], wav[25], wav[26], wav[27]]), 24_000);
        assert_eq!(u32::from_le_bytes([wav[40], wav[41], wav[42], wav[43]]), 8);
    }
}
