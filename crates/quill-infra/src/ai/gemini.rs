//! Google Gemini `generateContent` client.

use std::time::Duration;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use quill_core::ports::{ChatError, ChatModel};

#[derive(Debug, Clone)]
pub struct GeminiConfig {
    pub api_key: String,
    pub model: String,
    pub base_url: String,
}

impl GeminiConfig {
    pub const DEFAULT_MODEL: &'static str = "gemini-1.5-pro-latest";
    pub const DEFAULT_BASE_URL: &'static str = "https://generativelanguage.googleapis.com";

    pub fn new(api_key: impl Into<String>) -> Self {
        Self {
            api_key: api_key.into(),
            model: Self::DEFAULT_MODEL.to_string(),
            base_url: Self::DEFAULT_BASE_URL.to_string(),
        }
    }

    pub fn with_model(mut self, model: impl Into<String>) -> Self {
        self.model = model.into();
        self
    }

    fn endpoint(&self) -> String {
        format!(
            "{}/v1beta/models/{}:generateContent",
            self.base_url.trim_end_matches('/'),
            self.model
        )
    }
}

#[derive(Debug, Serialize)]
struct GenerateRequest<'a> {
    contents: Vec<Content<'a>>,
}

#[derive(Debug, Serialize)]
struct Content<'a> {
    parts: Vec<OutPart<'a>>,
}

#[derive(Debug, Serialize)]
struct OutPart<'a> {
    text: &'a str,
}

#[derive(Debug, Deserialize)]
struct GenerateResponse {
    #[serde(default)]
    candidates: Vec<Candidate>,
}

#[derive(Debug, Deserialize)]
struct Candidate {
    content: Option<CandidateContent>,
}

#[derive(Debug, Deserialize)]
struct CandidateContent {
    #[serde(default)]
    parts: Vec<InPart>,
}

#[derive(Debug, Deserialize)]
struct InPart {
    text: Option<String>,
}

#[derive(Debug, Deserialize)]
struct ErrorEnvelope {
    error: ErrorBody,
}

#[derive(Debug, Deserialize)]
struct ErrorBody {
    #[serde(default)]
    message: String,
    #[serde(default)]
    status: String,
}

/// Single-turn chat against a Gemini model.
pub struct GeminiChatModel {
    client: reqwest::Client,
    config: GeminiConfig,
}

impl GeminiChatModel {
    pub fn new(config: GeminiConfig) -> Self {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(60))
            .build()
            .unwrap_or_else(|_| reqwest::Client::new());

        Self { client, config }
    }
}

/// Concatenated text parts of the first candidate.
fn reply_text(response: GenerateResponse) -> Result<String, ChatError> {
    let text: String = response
        .candidates
        .into_iter()
        .next()
        .and_then(|c| c.content)
        .map(|c| c.parts.into_iter().filter_map(|p| p.text).collect())
        .unwrap_or_default();

    if text.is_empty() {
        return Err(ChatError::Provider("Empty response from model".to_string()));
    }

    Ok(text)
}

fn classify(status: u16, body: &str, model: &str) -> ChatError {
    let error = serde_json::from_str::<ErrorEnvelope>(body).ok().map(|e| e.error);
    let message = error
        .as_ref()
        .map(|e| e.message.clone())
        .unwrap_or_else(|| body.chars().take(200).collect());
    let invalid_key = error.as_ref().is_some_and(|e| {
        e.status == "PERMISSION_DENIED"
            || e.status == "UNAUTHENTICATED"
            || e.message.contains("API key not valid")
            || e.message.contains("API_KEY_INVALID")
    }) || body.contains("API_KEY_INVALID");

    match status {
        429 => ChatError::RateLimited,
        404 => ChatError::ModelNotFound(model.to_string()),
        401 | 403 => ChatError::AuthenticationFailed,
        400 if invalid_key => ChatError::AuthenticationFailed,
        _ => ChatError::Provider(format!("HTTP {status}: {message}")),
    }
}

#[async_trait]
impl ChatModel for GeminiChatModel {
    async fn generate(&self, prompt: &str) -> Result<String, ChatError> {
        let request = GenerateRequest {
            contents: vec![Content {
                parts: vec![OutPart { text: prompt }],
            }],
        };

        let response = self
            .client
            .post(self.config.endpoint())
            .query(&[("key", self.config.api_key.as_str())])
            .json(&request)
            .send()
            .await
            .map_err(|e| ChatError::Provider(e.to_string()))?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            let err = classify(status.as_u16(), &body, &self.config.model);
            tracing::warn!(status = status.as_u16(), error = %err, "Gemini request failed");
            return Err(err);
        }

        let body: GenerateResponse = response
            .json()
            .await
            .map_err(|e| ChatError::Provider(e.to_string()))?;

        reply_text(body)
    }
}
