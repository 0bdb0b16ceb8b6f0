//! OpenAI API Provider
//!
//! Chat Completions over reqwest, blocking or streamed. Non-2xx statuses are
//! classified so the caller can report a meaningful `errorType`.

use async_trait::async_trait;
use secrecy::{ExposeSecret, SecretString};
use serde::{Deserialize, Serialize};
use std::time::Duration;
use tracing::{debug, info, warn};

use super::{ChatRequest, DeltaStream, LlmProvider, delta_stream};
use crate::config::LlmConfig;
use crate::constants::llm::CONNECT_TIMEOUT_SECS;
use crate::types::{ErrorClassifier, FitError, Result};

const PROVIDER: &str = "openai";

/// OpenAI API Provider with secure API key handling
pub struct OpenAiProvider {
    /// API key stored securely - never exposed in logs or debug output
    api_key: SecretString,
    api_base: String,
    client: reqwest::Client,
}

impl std::fmt::Debug for OpenAiProvider {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("OpenAiProvider")
            .field("api_key", &"[REDACTED]")
            .field("api_base", &self.api_base)
            .finish()
    }
}

impl OpenAiProvider {
    pub fn new(config: &LlmConfig) -> Result<Self> {
        let api_key_str = config
            .api_key
            .clone()
            .or_else(|| std::env::var("OPENAI_API_KEY").ok())
            .filter(|key| !key.trim().is_empty())
            .ok_or_else(|| {
                FitError::Config(
                    "OpenAI API key not found. Set OPENAI_API_KEY env var or provide in config"
                        .to_string(),
                )
            })?;

        // Whole-call deadlines are applied per client class by the caller
        let client = reqwest::Client::builder()
            .connect_timeout(Duration::from_secs(CONNECT_TIMEOUT_SECS))
            .build()
            .map_err(|e| FitError::LlmApi(format!("Failed to create HTTP client: {}", e)))?;

        Ok(Self {
            api_key: SecretString::from(api_key_str),
            api_base: config.api_base.trim_end_matches('/').to_string(),
            client,
        })
    }

    fn build_request(request: &ChatRequest, stream: bool) -> ChatCompletionRequest {
        ChatCompletionRequest {
            model: request.model.clone(),
            messages: vec![
                ChatMessage {
                    role: "system".to_string(),
                    content: request.system.clone(),
                },
                ChatMessage {
                    role: "user".to_string(),
                    content: request.user.clone(),
                },
            ],
            temperature: request.temperature,
            max_tokens: Some(request.max_tokens),
            response_format: request.json_mode.then(|| ResponseFormat {
                format_type: "json_object".to_string(),
            }),
            stream,
        }
    }

    async fn send(&self, request: &ChatRequest, stream: bool) -> Result<reqwest::Response> {
        let body = Self::build_request(request, stream);
        let url = format!("{}/chat/completions", self.api_base);

        debug!(model = %request.model, stream, "Sending request to OpenAI API");

        let response = self
            .client
            .post(&url)
            .header(
                "Authorization",
                format!("Bearer {}", self.api_key.expose_secret()),
            )
            .header("Content-Type", "application/json")
            .json(&body)
            .send()
            .await
            .map_err(|e| {
                FitError::Llm(ErrorClassifier::classify(
                    &format!("OpenAI request failed: {}", e),
                    PROVIDER,
                ))
            })?;

        if !response.status().is_success() {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            return Err(FitError::Llm(ErrorClassifier::classify_http_status(
                status.as_u16(),
                &format!("OpenAI API error ({}): {}", status, body),
                PROVIDER,
            )));
        }

        Ok(response)
    }
}

#[async_trait]
impl LlmProvider for OpenAiProvider {
    async fn complete(&self, request: &ChatRequest) -> Result<String> {
        info!(
            "Generating with OpenAI (model: {}, temperature: {})",
            request.model, request.temperature
        );

        let response = self.send(request, false).await?;

        let response_body: ChatCompletionResponse = response
            .json()
            .await
            .map_err(|e| FitError::LlmApi(format!("Failed to parse OpenAI response: {}", e)))?;

        if let Some(usage) = &response_body.usage {
            debug!(
                prompt_tokens = usage.prompt_tokens,
                completion_tokens = usage.completion_tokens,
                "OpenAI token usage"
            );
        }

        response_body
            .choices
            .into_iter()
            .next()
            .and_then(|c| c.message.content)
            .ok_or_else(|| FitError::LlmApi("No content in OpenAI response".to_string()))
    }

    async fn stream(&self, request: &ChatRequest) -> Result<DeltaStream> {
        info!("Streaming with OpenAI (model: {})", request.model);
        let response = self.send(request, true).await?;
        Ok(delta_stream(response.bytes_stream()))
    }

    fn name(&self) -> &str {
        PROVIDER
    }

    async fn health_check(&self) -> Result<bool> {
        let url = format!("{}/models", self.api_base);

        let response = self
            .client
            .get(&url)
            .header(
                "Authorization",
                format!("Bearer {}", self.api_key.expose_secret()),
            )
            .send()
            .await;

        match response {
            Ok(resp) if resp.status().is_success() => {
                info!("OpenAI API is available");
                Ok(true)
            }
            Ok(resp) => {
                warn!("OpenAI API check failed: {}", resp.status());
                Ok(false)
            }
            Err(e) => {
                warn!("OpenAI API check failed: {}", e);
                Ok(false)
            }
        }
    }
}

// Request/Response types

#[derive(Debug, Serialize)]
struct ChatCompletionRequest {
    model: String,
    messages: Vec<ChatMessage>,
    temperature: f32,
    #[serde(skip_serializing_if = "Option::is_none")]
    max_tokens: Option<u32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    response_format: Option<ResponseFormat>,
    #[serde(skip_serializing_if = "std::ops::Not::not")]
    stream: bool,
}

#[derive(Debug, Serialize)]
struct ChatMessage {
    role: String,
    content: String,
}

#[derive(Debug, Serialize)]
struct ResponseFormat {
    #[serde(rename = "type")]
    format_type: String,
}

#[derive(Debug, Deserialize)]
struct ChatCompletionResponse {
    choices: Vec<Choice>,
    usage: Option<UsageInfo>,
}

#[derive(Debug, Deserialize)]
struct Choice {
    message: ResponseMessage,
}

#[derive(Debug, Deserialize)]
struct ResponseMessage {
    content: Option<String>,
}

#[derive(Debug, Deserialize)]
struct UsageInfo {
    prompt_tokens: u32,
    completion_tokens: u32,
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn chat(json_mode: bool) -> ChatRequest {
        ChatRequest {
            model: "gpt-3.5-turbo-0125".into(),
            system: "You are a coach".into(),
            user: r#"{"level":"Beginner"}"#.into(),
            temperature: 0.5,
            max_tokens: 1500,
            json_mode,
        }
    }

    #[test]
    fn test_build_request_json_mode() {
        let body = serde_json::to_value(OpenAiProvider::build_request(&chat(true), false)).unwrap();
        assert_eq!(
            body,
            json!({
                "model": "gpt-3.5-turbo-0125",
                "messages": [
                    {"role": "system", "content": "You are a coach"},
                    {"role": "user", "content": "{\"level\":\"Beginner\"}"}
                ],
                "temperature": 0.5,
                "max_tokens": 1500,
                "response_format": {"type": "json_object"}
            })
        );
    }

    #[test]
    fn test_build_request_streaming_without_json_mode() {
        let body = serde_json::to_value(OpenAiProvider::build_request(&chat(false), true)).unwrap();
        assert_eq!(body["stream"], true);
        assert!(body.get("response_format").is_none());
    }

    #[test]
    fn test_debug_redacts_key() {
        let config = LlmConfig {
            api_key: Some("sk-secret-value".into()),
            ..Default::default()
        };
        let provider = OpenAiProvider::new(&config).unwrap();
        let debug = format!("{:?}", provider);
        assert!(debug.contains("[REDACTED]"));
        assert!(!debug.contains("sk-secret-value"));
    }

    #[test]
    fn test_parse_completion_response() {
        let body: ChatCompletionResponse = serde_json::from_value(json!({
            "choices": [{"message": {"role": "assistant", "content": "{\"title\":\"x\"}"}}],
            "usage": {"prompt_tokens": 10, "completion_tokens": 5, "total_tokens": 15}
        }))
        .unwrap();
        assert_eq!(body.choices[0].message.content.as_deref(), Some("{\"title\":\"x\"}"));
        assert_eq!(body.usage.unwrap().completion_tokens, 5);
    }
}
