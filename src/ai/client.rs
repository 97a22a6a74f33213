//! LLM (Gemini) API client module
//!
//! Encapsulates the `generateContent` call used for thread classification.

use std::time::Duration;

use async_trait::async_trait;
use reqwest::Client;
use serde_json::{Value, json};
use tracing::{debug, info};

use super::LanguageModel;
use crate::errors::BridgeError;

/// Low temperature keeps the labels stable across runs.
const TEMPERATURE: f64 = 0.2;

pub struct GeminiClient {
    http: Client,
    api_key: String,
    model_name: String,
    api_base: String,
}

impl GeminiClient {
    /// # Errors
    ///
    /// Returns an error if the underlying HTTP client cannot be built.
    pub fn new(
        api_key: String,
        model_name: String,
        api_base: &str,
        timeout: Duration,
    ) -> Result<Self, BridgeError> {
        let http = Client::builder().timeout(timeout).build().map_err(|e| {
            BridgeError::Config(format!("Failed to build LLM HTTP client: {e}"))
        })?;

        Ok(Self {
            http,
            api_key,
            model_name,
            api_base: api_base.trim_end_matches('/').to_string(),
        })
    }

    #[must_use]
    pub fn model_name(&self) -> &str {
        &self.model_name
    }

    fn endpoint(&self) -> String {
        format!("{}/models/{}:generateContent", self.api_base, self.model_name)
    }
}

/// Request body for `generateContent`, asking for a JSON answer.
#[must_use]
pub fn build_request_body(system: &str, prompt: &str) -> Value {
    json!({
        "systemInstruction": {
            "parts": [{ "text": system }]
        },
        "contents": [{
            "role": "user",
            "parts": [{ "text": prompt }]
        }],
        "generationConfig": {
            "temperature": TEMPERATURE,
            "responseMimeType": "application/json"
        }
    })
}

/// Concatenated text parts of the first candidate, or `""` when there are none.
#[must_use]
pub fn extract_candidate_text(response: &Value) -> String {
    response
        .pointer("/candidates/0/content/parts")
        .and_then(Value::as_array)
        .map(|parts| {
            parts
                .iter()
                .filter_map(|p| p.get("text").and_then(Value::as_str))
                .collect::<Vec<_>>()
                .join("")
        })
        .unwrap_or_default()
}

#[async_trait]
impl LanguageModel for GeminiClient {
    async fn complete(&self, system: &str, prompt: &str) -> Result<String, BridgeError> {
        info!(model = %self.model_name, prompt_chars = prompt.chars().count(), "Calling language model");

        let response = self
            .http
            .post(self.endpoint())
            .header("x-goog-api-key", &self.api_key)
            .json(&build_request_body(system, prompt))
            .send()
            .await
            .map_err(|e| BridgeError::ModelUnavailable(format!("Gemini request failed: {e}")))?;

        let status = response.status();
        if !status.is_success() {
            let error_text = response.text().await.unwrap_or_default();
            return Err(BridgeError::ModelUnavailable(format!(
                "Gemini API error (status {status}): {}",
                error_text.chars().take(300).collect::<String>()
            )));
        }

        let response_json: Value = response.json().await.map_err(|e| {
            BridgeError::ModelUnavailable(format!("Failed to parse Gemini response: {e}"))
        })?;

        let text = extract_candidate_text(&response_json);
        debug!(chars = text.len(), "Language model answered");
        Ok(text)
    }
}
