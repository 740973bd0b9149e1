use crate::config::ServiceConfig;
use crate::errors::ServiceFailure;
use crate::models::{
    GenerateResponse, GenerativeService, GroundingChunk, InlineData, ModelMetrics, Part,
    RequestDescriptor, ResponseShape, ToolSpec,
};
use anyhow::Result;
use async_trait::async_trait;
use reqwest::Client;
use serde_json::{json, Map, Value};
use std::sync::{Arc, Mutex, RwLock};
use std::time::Instant;
use tracing::{debug, error, warn};

/// Finish reasons that mean the candidate was withheld by a content filter.
const BLOCKING_FINISH_REASONS: &[&str] = &["SAFETY", "BLOCKLIST", "PROHIBITED_CONTENT", "SPII", "RECITATION"];

/// Shared, hot-swappable API key. The remediation flow writes it, the
/// provider reads it on every request.
#[derive(Clone, Default)]
pub struct ApiKeyHandle(Arc<RwLock<Option<String>>>);

impl ApiKeyHandle {
    pub fn new(key: Option<String>) -> Self {
        Self(Arc::new(RwLock::new(key)))
    }

    pub fn get(&self) -> Option<String> {
        self.0.read().ok().and_then(|k| k.clone())
    }

    pub fn set(&self, key: impl Into<String>) {
        if let Ok(mut guard) = self.0.write() {
            *guard = Some(key.into());
        }
    }

    pub fn is_set(&self) -> bool {
        self.get().map(|k| !k.is_empty()).unwrap_or(false)
    }
}

impl std::fmt::Debug for ApiKeyHandle {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_tuple("ApiKeyHandle")
            .field(&if self.is_set() { "<set>" } else { "<unset>" })
            .finish()
    }
}

pub struct GeminiProvider {
    config: ServiceConfig,
    client: Client,
    api_key: ApiKeyHandle,
    metrics: Arc<Mutex<ModelMetrics>>,
}

impl GeminiProvider {
    pub fn new(config: ServiceConfig) -> Result<Self> {
        if config.api_key.is_none() {
            warn!("Gemini API key not provided, requests will fail until one is supplied");
        }

        let client = Client::builder()
            .timeout(std::time::Duration::from_secs(config.timeout_seconds))
            .build()?;

        Ok(Self {
            api_key: ApiKeyHandle::new(config.api_key.clone()),
            config,
            client,
            metrics: Arc::new(Mutex::new(ModelMetrics::default())),
        })
    }

    pub fn key_handle(&self) -> ApiKeyHandle {
        self.api_key.clone()
    }

    fn endpoint(&self, model: &str) -> String {
        format!(
            "{}/v1beta/models/{}:generateContent",
            self.config.base_url.trim_end_matches('/'),
            model
        )
    }

    fn record(&self, outcome: std::result::Result<u64, &ServiceFailure>) {
        if let Ok(mut metrics) = self.metrics.lock() {
            match outcome {
                Ok(ms) => metrics.record_success(ms),
                Err(failure) => metrics.record_failure(failure.message.clone()),
            }
        }
    }

    async fn send(&self, request: &RequestDescriptor) -> Result<GenerateResponse, ServiceFailure> {
        let api_key = self
            .api_key
            .get()
            .filter(|k| !k.is_empty())
            .ok_or_else(|| ServiceFailure::new("Gemini API key not configured").with_status(401))?;

        let start = Instant::now();
        let payload = build_payload(request);
        debug!("Sending {} request to Gemini model {}", request.operation, request.model);

        let response = self
            .client
            .post(self.endpoint(&request.model))
            .header("x-goog-api-key", api_key)
            .header("Content-Type", "application/json")
            .json(&payload)
            .send()
            .await
            .map_err(transport_failure)?;

        let status = response.status();
        let body = response.text().await.map_err(transport_failure)?;

        if !status.is_success() {
            return Err(failure_from_error_body(status.as_u16(), &body));
        }

        let json: Value = serde_json::from_str(&body).map_err(|e| {
            ServiceFailure::new(format!("Gemini returned a non-JSON body: {}", e)).with_status(status.as_u16())
        })?;

        let mut parsed = parse_response(&json)?;
        parsed.model_used = format!("Gemini-{}", request.model);
        parsed.response_time_ms = start.elapsed().as_millis() as u64;
        Ok(parsed)
    }
}

#[async_trait]
impl GenerativeService for GeminiProvider {
    fn name(&self) -> &str {
        "Gemini"
    }

    fn is_available(&self) -> bool {
        self.api_key.is_set()
    }

    async fn generate(&self, request: &RequestDescriptor) -> Result<GenerateResponse, ServiceFailure> {
        match self.send(request).await {
            Ok(response) => {
                self.record(Ok(response.response_time_ms));
                Ok(response)
            }
            Err(failure) => {
                error!("Gemini {} request failed: {}", request.operation, failure.message);
                self.record(Err(&failure));
                Err(failure)
            }
        }
    }

    fn metrics(&self) -> Option<ModelMetrics> {
        self.metrics.lock().ok().map(|m| m.clone())
    }
}

fn transport_failure(e: reqwest::Error) -> ServiceFailure {
    let failure = ServiceFailure::new(format!("Gemini request failed: {}", e));
    let failure = match e.status() {
        Some(status) => failure.with_status(status.as_u16()),
        None => failure,
    };
    if e.is_timeout() || e.is_connect() {
        failure.with_code("UNAVAILABLE")
    } else {
        failure
    }
}

/// Maps a non-2xx body (`{"error": {"code", "message", "status"}}`) to a failure.
pub fn failure_from_error_body(status: u16, body: &str) -> ServiceFailure {
    let parsed: Option<Value> = serde_json::from_str(body).ok();
    let error = parsed.as_ref().map(|v| &v["error"]);

    let message = error
        .and_then(|e| e["message"].as_str())
        .map(|m| format!("Gemini API error {}: {}", status, m))
        .unwrap_or_else(|| {
            let snippet: String = body.chars().take(200).collect();
            format!("Gemini API error {}: {}", status, snippet)
        });

    let failure = ServiceFailure::new(message).with_status(status);
    match error.and_then(|e| e["status"].as_str()) {
        Some(code) => failure.with_code(code),
        None => failure,
    }
}

pub fn build_payload(request: &RequestDescriptor) -> Value {
    let parts: Vec<Value> = request
        .parts
        .iter()
        .map(|part| match part {
            Part::Text(text) => json!({ "text": text }),
            Part::Inline(data) => json!({
                "inlineData": { "mimeType": data.mime_type, "data": data.data }
            }),
        })
        .collect();

    let mut payload = json!({
        "contents": [{ "role": "user", "parts": parts }]
    });

    let instruction = match (&request.system_instruction, request.language_directive.is_empty()) {
        (Some(system), false) => Some(format!("{}\n{}", system, request.language_directive)),
        (Some(system), true) => Some(system.clone()),
        (None, false) => Some(request.language_directive.clone()),
        (None, true) => None,
    };
    if let Some(instruction) = instruction {
        payload["systemInstruction"] = json!({ "parts": [{ "text": instruction }] });
    }

    if !request.tools.is_empty() {
        let tools: Vec<Value> = request
            .tools
            .iter()
            .map(|tool| match tool {
                ToolSpec::GoogleSearch => json!({ "googleSearch": {} }),
            })
            .collect();
        payload["tools"] = Value::Array(tools);
    }

    let mut generation = Map::new();
    if let Some(temperature) = request.temperature {
        generation.insert("temperature".to_string(), json!(temperature));
    }
    if let Some(budget) = request.thinking_budget {
        generation.insert("thinkingConfig".to_string(), json!({ "thinkingBudget": budget }));
    }
    match &request.shape {
        ResponseShape::Text => {}
        ResponseShape::Json { schema } => {
            generation.insert("responseMimeType".to_string(), json!("application/json"));
            if let Some(schema) = schema {
                generation.insert("responseSchema".to_string(), schema.clone());
            }
        }
        ResponseShape::Audio { voice } => {
            generation.insert("responseModalities".to_string(), json!(["AUDIO"]));
            generation.insert(
                "speechConfig".to_string(),
                json!({ "voiceConfig": { "prebuiltVoiceConfig": { "voiceName": voice } } }),
            );
        }
        ResponseShape::Image => {
            generation.insert("responseModalities".to_string(), json!(["TEXT", "IMAGE"]));
        }
    }
    if !generation.is_empty() {
        payload["generationConfig"] = Value::Object(generation);
    }

    payload
}

/// Extracts text, inline data and grounding from a successful body.
///
/// A blocked prompt or a candidate withheld by a safety filter is reported as
/// a failure with a structured code so that it classifies as a safety block.
/// An otherwise empty candidate is a successful empty response.
pub fn parse_response(json: &Value) -> Result<GenerateResponse, ServiceFailure> {
    if let Some(reason) = json["promptFeedback"]["blockReason"].as_str() {
        return Err(ServiceFailure::new(format!("prompt blocked by safety filters: {}", reason))
            .with_code(block_code(reason)));
    }

    let Some(candidate) = json["candidates"].as_array().and_then(|c| c.first()) else {
        return Ok(GenerateResponse::default());
    };

    let finish_reason = candidate["finishReason"].as_str().map(str::to_string);
    let parts = candidate["content"]["parts"].as_array().cloned().unwrap_or_default();

    let mut text = String::new();
    let mut inline = Vec::new();
    for part in &parts {
        if let Some(t) = part["text"].as_str() {
            text.push_str(t);
        }
        let data = &part["inlineData"];
        if let (Some(mime_type), Some(data)) = (data["mimeType"].as_str(), data["data"].as_str()) {
            inline.push(InlineData {
                mime_type: mime_type.to_string(),
                data: data.to_string(),
            });
        }
    }

    if text.is_empty() && inline.is_empty() {
        if let Some(reason) = finish_reason.as_deref() {
            if BLOCKING_FINISH_REASONS.contains(&reason) {
                return Err(ServiceFailure::new(format!("candidate blocked by safety filters ({})", reason))
                    .with_code(reason));
            }
        }
    }

    let grounding = candidate["groundingMetadata"]["groundingChunks"]
        .as_array()
        .map(|chunks| {
            chunks
                .iter()
                .map(|chunk| GroundingChunk {
                    title: chunk["web"]["title"].as_str().map(str::to_string),
                    uri: chunk["web"]["uri"].as_str().map(str::to_string),
                })
                .filter(|chunk| chunk.title.is_some() || chunk.uri.is_some())
                .collect()
        })
        .unwrap_or_default();

    Ok(GenerateResponse {
        text: if text.is_empty() { None } else { Some(text) },
        inline,
        grounding,
        finish_reason,
        model_used: String::new(),
        response_time_ms: 0,
    })
}

fn block_code(reason: &str) -> &str {
    if BLOCKING_FINISH_REASONS.contains(&reason) {
        reason
    } else {
        "SAFETY"
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn api_key_handle_swaps_key() {
        let handle = ApiKeyHandle::new(None);
        assert!(!handle.is_set());
        let other = handle.clone();
        other.set("new-key");
        assert_eq!(handle.get().as_deref(), Some("new-key"));
        assert!(!format!("{:?}", handle).contains("new-key"));
    }

    #[test]
    fn block_code_defaults_to_safety() {
        assert_eq!(block_code("OTHER"), "SAFETY");
        assert_eq!(block_code("BLOCKLIST"), "BLOCKLIST");
    }
}
