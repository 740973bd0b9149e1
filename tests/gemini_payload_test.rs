use pathshala::config::ServiceConfig;
use pathshala::errors::ErrorKind;
use pathshala::models::{GenerativeService, InlineData, Operation, RequestDescriptor, ResponseShape, ToolSpec};
use pathshala::providers::gemini::{build_payload, failure_from_error_body, parse_response};
use pathshala::providers::GeminiProvider;
use pathshala::retry::classify;
use serde_json::json;

#[test]
fn test_solve_payload_shape() {
    let request = RequestDescriptor::new(Operation::Solve, "gemini-3-flash-preview", ResponseShape::Text)
        .with_system_instruction("Expert tutor.")
        .with_inline(InlineData {
            mime_type: "image/png".to_string(),
            data: "AAAA".to_string(),
        })
        .with_text("Solve this")
        .with_tool(ToolSpec::GoogleSearch)
        .with_language_directive("Respond in Hindi. Do not use Bengali anywhere in the response.");

    let payload = build_payload(&request);

    assert_eq!(payload["contents"][0]["role"], "user");
    assert_eq!(payload["contents"][0]["parts"][0]["inlineData"]["mimeType"], "image/png");
    assert_eq!(payload["contents"][0]["parts"][1]["text"], "Solve this");
    assert_eq!(payload["tools"], json!([{ "googleSearch": {} }]));
    let instruction = payload["systemInstruction"]["parts"][0]["text"].as_str().unwrap();
    assert!(instruction.starts_with("Expert tutor."));
    assert!(instruction.contains("Do not use Bengali"));
    assert!(payload.get("generationConfig").is_none());
}

#[test]
fn test_json_payload_carries_schema_and_temperature() {
    let schema = json!({ "type": "ARRAY" });
    let request = RequestDescriptor::new(
        Operation::ExamQuestions,
        "m",
        ResponseShape::Json {
            schema: Some(schema.clone()),
        },
    )
    .with_text("5 MCQs")
    .with_temperature(0.1)
    .with_thinking_budget(0);

    let config = &build_payload(&request)["generationConfig"];
    assert_eq!(config["responseMimeType"], "application/json");
    assert_eq!(config["responseSchema"], schema);
    assert!((config["temperature"].as_f64().unwrap() - 0.1).abs() < 1e-6);
    assert_eq!(config["thinkingConfig"]["thinkingBudget"], 0);
}

#[test]
fn test_speech_and_image_modalities() {
    let speech = RequestDescriptor::new(
        Operation::Speech,
        "tts",
        ResponseShape::Audio {
            voice: "Kore".to_string(),
        },
    )
    .with_text("नमस्ते");
    let payload = build_payload(&speech);
    assert_eq!(payload["generationConfig"]["responseModalities"], json!(["AUDIO"]));
    assert_eq!(
        payload["generationConfig"]["speechConfig"]["voiceConfig"]["prebuiltVoiceConfig"]["voiceName"],
        "Kore"
    );
    assert!(payload.get("systemInstruction").is_none());

    let image = RequestDescriptor::new(Operation::Diagram, "img", ResponseShape::Image).with_text("water cycle");
    assert_eq!(
        build_payload(&image)["generationConfig"]["responseModalities"],
        json!(["TEXT", "IMAGE"])
    );
}

#[test]
fn test_parse_text_inline_and_grounding() {
    let body = json!({
        "candidates": [{
            "content": { "parts": [
                { "text": "Hello " },
                { "text": "world" },
                { "inlineData": { "mimeType": "image/png", "data": "iVBO" } }
            ]},
            "finishReason": "STOP",
            "groundingMetadata": { "groundingChunks": [
                { "web": { "uri": "https://example.org", "title": "Example" } },
                { "retrievedContext": {} }
            ]}
        }]
    });

    let response = parse_response(&body).unwrap();
    assert_eq!(response.text.as_deref(), Some("Hello world"));
    assert_eq!(response.first_inline("image/").unwrap().data, "iVBO");
    assert_eq!(response.grounding.len(), 1);
    assert_eq!(response.finish_reason.as_deref(), Some("STOP"));
}

#[test]
fn test_empty_candidate_list_is_successful_empty() {
    let response = parse_response(&json!({ "candidates": [] })).unwrap();
    assert!(response.text.is_none());
    assert!(response.inline.is_empty());
}

#[test]
fn test_blocked_prompt_classifies_as_safety() {
    let failure = parse_response(&json!({ "promptFeedback": { "blockReason": "PROHIBITED_CONTENT" } })).unwrap_err();
    assert_eq!(failure.code.as_deref(), Some("PROHIBITED_CONTENT"));
    assert_eq!(classify(&failure), ErrorKind::SafetyBlocked);

    let failure = parse_response(&json!({
        "candidates": [{ "finishReason": "SAFETY", "content": { "parts": [] } }]
    }))
    .unwrap_err();
    assert_eq!(classify(&failure), ErrorKind::SafetyBlocked);
}

#[test]
fn test_error_bodies_map_to_structured_failures() {
    let body = r#"{"error": {"code": 429, "message": "Resource has been exhausted", "status": "RESOURCE_EXHAUSTED"}}"#;
    let failure = failure_from_error_body(429, body);
    assert_eq!(failure.status, Some(429));
    assert_eq!(failure.code.as_deref(), Some("RESOURCE_EXHAUSTED"));
    assert!(failure.message.contains("Resource has been exhausted"));
    assert_eq!(classify(&failure), ErrorKind::QuotaExceeded);

    let failure = failure_from_error_body(503, "<html>Service Unavailable</html>");
    assert!(failure.code.is_none());
    assert_eq!(classify(&failure), ErrorKind::ServerError);

    let failure = failure_from_error_body(
        400,
        r#"{"error": {"code": 400, "message": "API key not valid", "status": "INVALID_ARGUMENT"}}"#,
    );
    assert_eq!(classify(&failure), ErrorKind::Unknown);
}

#[tokio::test]
async fn test_missing_key_fails_without_network() {
    let provider = GeminiProvider::new(ServiceConfig {
        api_key: None,
        base_url: "http://127.0.0.1:9".to_string(),
        ..Default::default()
    })
    .unwrap();
    assert!(!provider.is_available());

    let request = RequestDescriptor::new(Operation::Summary, "m", ResponseShape::Text).with_text("x");
    let failure = provider.generate(&request).await.unwrap_err();
    assert_eq!(failure.status, Some(401));
    assert_eq!(classify(&failure), ErrorKind::Unknown);

    let metrics = provider.metrics().unwrap();
    assert_eq!(metrics.total_requests, 1);
    assert_eq!(metrics.successful_requests, 0);

    provider.key_handle().set("swapped-in");
    assert!(provider.is_available());
}
