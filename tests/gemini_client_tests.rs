use std::time::Duration;

use httpmock::prelude::*;
use pqf_bot::ai::{GeminiClient, LanguageModel};
use pqf_bot::errors::BridgeError;
use serde_json::json;

fn client(server: &MockServer) -> GeminiClient {
    GeminiClient::new(
        "llm-key".to_string(),
        "gemini-2.5-flash".to_string(),
        &server.base_url(),
        Duration::from_secs(5),
    )
    .unwrap()
}

#[tokio::test]
async fn test_complete_returns_candidate_text() {
    let server = MockServer::start();
    let mock = server.mock(|when, then| {
        when.method(POST)
            .path("/models/gemini-2.5-flash:generateContent")
            .header("x-goog-api-key", "llm-key")
            .body_includes("\"responseMimeType\":\"application/json\"")
            .body_includes("THREAD:");
        then.status(200).json_body(json!({
            "candidates": [{
                "content": {
                    "role": "model",
                    "parts": [{ "text": "{\"type\":\"Question\",\"description\":\"d\",\"sentiment\":\"Neutral\",\"urgency\":\"Low\",\"summary\":\"s\"}" }]
                },
                "finishReason": "STOP"
            }]
        }));
    });

    let text = client(&server)
        .complete("system", "THREAD:\n[2023-11-14 22:13] Ani: halo\n")
        .await
        .unwrap();

    mock.assert_calls(1);
    assert!(text.contains("\"type\":\"Question\""));
}

#[tokio::test]
async fn test_quota_error_is_model_unavailable() {
    let server = MockServer::start();
    let mock = server.mock(|when, then| {
        when.method(POST)
            .path("/models/gemini-2.5-flash:generateContent");
        then.status(429)
            .json_body(json!({ "error": { "code": 429, "status": "RESOURCE_EXHAUSTED" } }));
    });

    let err = client(&server).complete("system", "prompt").await.unwrap_err();

    // No retry inside the client.
    mock.assert_calls(1);
    let BridgeError::ModelUnavailable(detail) = err else {
        panic!("expected ModelUnavailable");
    };
    assert!(detail.contains("429"));
}

#[tokio::test]
async fn test_blocked_answer_is_empty_text() {
    let server = MockServer::start();
    server.mock(|when, then| {
        when.method(POST)
            .path("/models/gemini-2.5-flash:generateContent");
        then.status(200)
            .json_body(json!({ "promptFeedback": { "blockReason": "SAFETY" } }));
    });

    let text = client(&server).complete("system", "prompt").await.unwrap();
    assert_eq!(text, "");
}

#[tokio::test]
async fn test_garbage_body_is_model_unavailable() {
    let server = MockServer::start();
    server.mock(|when, then| {
        when.method(POST)
            .path("/models/gemini-2.5-flash:generateContent");
        then.status(200).body("<html>proxy error</html>");
    });

    let err = client(&server).complete("system", "prompt").await.unwrap_err();
    assert!(matches!(err, BridgeError::ModelUnavailable(_)));
}
