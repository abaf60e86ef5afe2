// src/ai/gemini.rs

use std::{sync::LazyLock, time::Duration};

use async_trait::async_trait;
use base64::{Engine, engine::general_purpose::STANDARD};
use regex::Regex;
use serde::Deserialize;
use serde_json::{Value, json};

use crate::{
    ai::{AiError, GenerativeModel, ModelRequest},
    config::Config,
};

const REQUEST_TIMEOUT: Duration = Duration::from_secs(90);

/// Upstream error bodies are cut to this many characters before logging.
const MAX_ERROR_BODY_CHARS: usize = 500;

static CODE_FENCE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?s)```(?:json)?\s*(.*?)\s*```").expect("code fence regex is invalid")
});

/// Gemini `generateContent` over REST.
#[derive(Debug, Clone)]
pub struct GeminiModel {
    client: reqwest::Client,
    endpoint: String,
    api_key: String,
}

#[derive(Debug, Deserialize)]
struct GenerateResponse {
    #[serde(default)]
    candidates: Vec<Candidate>,
}

#[derive(Debug, Deserialize)]
struct Candidate {
    content: Option<Content>,
}

#[derive(Debug, Deserialize)]
struct Content {
    #[serde(default)]
    parts: Vec<Part>,
}

#[derive(Debug, Deserialize)]
struct Part {
    text: Option<String>,
}

impl GeminiModel {
    pub fn new(base_url: &str, model: &str, api_key: String) -> Result<Self, AiError> {
        let client = reqwest::Client::builder()
            .timeout(REQUEST_TIMEOUT)
            .build()
            .map_err(|e| AiError::Transport(e.to_string()))?;

        Ok(Self {
            client,
            endpoint: format!(
                "{}/v1beta/models/{}:generateContent",
                base_url.trim_end_matches('/'),
                model
            ),
            api_key,
        })
    }

    /// `None` when no API key is configured.
    pub fn from_config(config: &Config) -> Result<Option<Self>, AiError> {
        match &config.gemini_api_key {
            Some(key) => Self::new(&config.gemini_base_url, &config.gemini_model, key.clone()).map(Some),
            None => Ok(None),
        }
    }

    fn request_body(request: &ModelRequest) -> Value {
        let mut parts = vec![json!({ "text": request.prompt })];
        if let Some(document) = &request.document {
            parts.push(json!({
                "inline_data": {
                    "mime_type": document.mime_type,
                    "data": STANDARD.encode(&document.data),
                }
            }));
        }

        json!({
            "contents": [{ "role": "user", "parts": parts }],
            "generationConfig": {
                "responseMimeType": "application/json",
                "responseSchema": request.schema,
            }
        })
    }
}

#[async_trait]
impl GenerativeModel for GeminiModel {
    async fn generate_json(&self, request: ModelRequest) -> Result<Value, AiError> {
        let response = self
            .client
            .post(&self.endpoint)
            .header("x-goog-api-key", &self.api_key)
            .json(&Self::request_body(&request))
            .send()
            .await
            .map_err(|e| {
                tracing::error!("Gemini request failed: {:?}", e);
                AiError::Transport(e.to_string())
            })?;

        let status = response.status();
        if !status.is_success() {
            let body: String = response
                .text()
                .await
                .unwrap_or_default()
                .chars()
                .take(MAX_ERROR_BODY_CHARS)
                .collect();
            tracing::error!("Gemini returned {}: {}", status, body);
            return Err(AiError::Upstream {
                status: status.as_u16(),
                body,
            });
        }

        let payload: GenerateResponse = response
            .json()
            .await
            .map_err(|e| AiError::InvalidResponse(format!("response envelope: {}", e)))?;

        let text = response_text(payload).ok_or(AiError::EmptyResponse)?;
        extract_json(&text)
    }
}

fn response_text(payload: GenerateResponse) -> Option<String> {
    let text: String = payload
        .candidates
        .into_iter()
        .next()?
        .content?
        .parts
        .into_iter()
        .filter_map(|part| part.text)
        .collect();

    if text.trim().is_empty() { None } else { Some(text) }
}

/// Parses the model text as JSON, tolerating a surrounding markdown code fence.
pub fn extract_json(text: &str) -> Result<Value, AiError> {
    let body = CODE_FENCE
        .captures(text)
        .and_then(|c| c.get(1))
        .map_or(text.trim(), |m| m.as_str());

    serde_json::from_str(body).map_err(|e| AiError::InvalidResponse(format!("not JSON: {}", e)))
}
