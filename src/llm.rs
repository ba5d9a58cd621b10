//! Language-model completion capabilities.
//!
//! The pipeline needs exactly two things from a model provider:
//!
//! - **structured JSON** — a prompt in, a body that is *probably* a JSON
//!   object out. Callers must still parse defensively.
//! - **free-form text** — a system instruction and prompt in, prose out.
//!
//! [`CompletionClient`] is that seam. [`OpenAIClient`] implements it against
//! any OpenAI-compatible `POST /chat/completions` endpoint.
//!
//! # Failure policy
//!
//! No retries. A transport error or non-2xx status is returned as a
//! [`CompletionError`] and fails the request that made the call.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::time::{Duration, Instant};
use thiserror::Error;

use crate::config::LlmConfig;

#[derive(Debug, Error)]
pub enum CompletionError {
    /// The credential environment variable is unset or empty.
    #[error("environment variable {0} is not set")]
    MissingCredentials(String),

    #[error("network error: {0}")]
    Network(String),

    #[error("completion API returned {status}: {body}")]
    Api { status: u16, body: String },

    #[error("unexpected completion response: {0}")]
    Parse(String),
}

/// The two completion capabilities used by the pipeline.
#[async_trait]
pub trait CompletionClient: Send + Sync {
    /// Ask for a JSON object. Returns the raw body, unparsed.
    async fn complete_json(&self, prompt: &str) -> Result<String, CompletionError>;

    /// Ask for free-form text under a system instruction.
    async fn complete_text(&self, system: &str, prompt: &str) -> Result<String, CompletionError>;
}

#[derive(Debug, Serialize)]
struct ChatMessage<'a> {
    role: &'a str,
    content: &'a str,
}

#[derive(Debug, Serialize)]
struct ResponseFormat {
    #[serde(rename = "type")]
    kind: &'static str,
}

#[derive(Debug, Serialize)]
struct ChatRequest<'a> {
    model: &'a str,
    messages: Vec<ChatMessage<'a>>,
    temperature: f32,
    #[serde(skip_serializing_if = "Option::is_none")]
    response_format: Option<ResponseFormat>,
}

#[derive(Debug, Deserialize)]
struct ChatResponse {
    #[serde(default)]
    choices: Vec<ChatChoice>,
}

#[derive(Debug, Deserialize)]
struct ChatChoice {
    message: ChatChoiceMessage,
}

#[derive(Debug, Deserialize)]
struct ChatChoiceMessage {
    #[serde(default)]
    content: Option<String>,
}

/// Client for an OpenAI-compatible chat completions API.
pub struct OpenAIClient {
    http: reqwest::Client,
    api_key: String,
    base_url: String,
    selection_model: String,
    answer_model: String,
    answer_temperature: f32,
}

impl OpenAIClient {
    /// Build a client from config, reading the API key from the
    /// environment variable named by `api_key_env`.
    pub fn from_config(config: &LlmConfig) -> Result<Self, CompletionError> {
        let api_key = std::env::var(&config.api_key_env)
            .ok()
            .filter(|k| !k.trim().is_empty())
            .ok_or_else(|| CompletionError::MissingCredentials(config.api_key_env.clone()))?;
        Self::with_api_key(config, api_key)
    }

    pub fn with_api_key(
        config: &LlmConfig,
        api_key: impl Into<String>,
    ) -> Result<Self, CompletionError> {
        let http = reqwest::Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .build()
            .map_err(|e| CompletionError::Network(e.to_string()))?;

        Ok(Self {
            http,
            api_key: api_key.into(),
            base_url: config.base_url.trim_end_matches('/').to_string(),
            selection_model: config.selection_model.clone(),
            answer_model: config.answer_model.clone(),
            answer_temperature: config.answer_temperature,
        })
    }

    async fn chat(&self, request: &ChatRequest<'_>) -> Result<String, CompletionError> {
        let start = Instant::now();

        let response = self
            .http
            .post(format!("{}/chat/completions", self.base_url))
            .header("Authorization", format!("Bearer {}", self.api_key))
            .header("Content-Type", "application/json")
            .json(request)
            .send()
            .await
            .map_err(|e| {
                tracing::warn!(error = %e, "completion request failed");
                CompletionError::Network(e.to_string())
            })?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            tracing::warn!(status = %status, "completion API error");
            return Err(CompletionError::Api {
                status: status.as_u16(),
                body,
            });
        }

        let parsed: ChatResponse = response
            .json()
            .await
            .map_err(|e| CompletionError::Parse(e.to_string()))?;

        let content = parsed
            .choices
            .into_iter()
            .next()
            .and_then(|c| c.message.content)
            .ok_or_else(|| CompletionError::Parse("no message content in response".into()))?;

        tracing::debug!(
            model = %request.model,
            duration_ms = start.elapsed().as_millis() as u64,
            "chat completion"
        );

        Ok(content)
    }
}

#[async_trait]
impl CompletionClient for OpenAIClient {
    async fn complete_json(&self, prompt: &str) -> Result<String, CompletionError> {
        let request = ChatRequest {
            model: &self.selection_model,
            messages: vec![ChatMessage {
                role: "user",
                content: prompt,
            }],
            temperature: 0.0,
            response_format: Some(ResponseFormat {
                kind: "json_object",
            }),
        };
        self.chat(&request).await
    }

    async fn complete_text(&self, system: &str, prompt: &str) -> Result<String, CompletionError> {
        let request = ChatRequest {
            model: &self.answer_model,
            messages: vec![
                ChatMessage {
                    role: "system",
                    content: system,
                },
                ChatMessage {
                    role: "user",
                    content: prompt,
                },
            ],
            temperature: self.answer_temperature,
            response_format: None,
        };
        self.chat(&request).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_missing_credentials() {
        let config = LlmConfig {
            api_key_env: "FILINGS_ADVISOR_TEST_UNSET_KEY".to_string(),
            ..LlmConfig::default()
        };
        match OpenAIClient::from_config(&config) {
            Err(CompletionError::MissingCredentials(var)) => {
                assert_eq!(var, "FILINGS_ADVISOR_TEST_UNSET_KEY")
            }
            Err(e) => panic!("unexpected error: {}", e),
            Ok(_) => panic!("expected missing credentials"),
        }
    }

    #[test]
    fn test_json_request_shape() {
        let request = ChatRequest {
            model: "m",
            messages: vec![ChatMessage {
                role: "user",
                content: "pick",
            }],
            temperature: 0.0,
            response_format: Some(ResponseFormat {
                kind: "json_object",
            }),
        };
        let v = serde_json::to_value(&request).unwrap();
        assert_eq!(v["response_format"]["type"], "json_object");
        assert_eq!(v["messages"][0]["role"], "user");
    }

    #[test]
    fn test_text_request_omits_response_format() {
        let request = ChatRequest {
            model: "m",
            messages: vec![],
            temperature: 0.3,
            response_format: None,
        };
        let v = serde_json::to_value(&request).unwrap();
        assert!(v.get("response_format").is_none());
    }

    #[test]
    fn test_response_without_choices() {
        let parsed: ChatResponse = serde_json::from_str("{}").unwrap();
        assert!(parsed.choices.is_empty());
    }
}
