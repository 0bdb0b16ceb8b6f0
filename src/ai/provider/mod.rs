//! LLM Provider Abstraction
//!
//! Defines the LlmProvider trait for chat-completion backends. Providers
//! return raw text; JSON repair and schema decoding happen in the gateway.
//!
//! ## Modules
//!
//! - `chain`: Ordered model fallback (primary, then secondary model)
//! - `openai`: OpenAI-compatible Chat Completions over reqwest
//! - `streaming`: Server-sent event parsing for streamed completions

mod chain;
mod openai;
mod streaming;

pub use chain::{ChainAttemptResult, ChainStats, FallbackChain, ModelStrategy};
pub use openai::OpenAiProvider;
pub use streaming::{SseEvent, delta_stream, parse_sse_event};

use std::pin::Pin;
use std::sync::Arc;

use async_trait::async_trait;
use futures::Stream;

use crate::config::LlmConfig;
use crate::types::{FitError, Result};

/// Incremental content deltas of a streamed completion
pub type DeltaStream = Pin<Box<dyn Stream<Item = Result<String>> + Send>>;

/// Shared LLM provider type for concurrent access across requests
pub type SharedProvider = Arc<dyn LlmProvider>;

/// One chat-completion call: a system prompt plus a single user message
#[derive(Debug, Clone, PartialEq)]
pub struct ChatRequest {
    pub model: String,
    pub system: String,
    pub user: String,
    pub temperature: f32,
    pub max_tokens: u32,
    /// Ask the backend for a JSON-typed response
    pub json_mode: bool,
}

impl ChatRequest {
    /// Same request against a different model
    pub fn with_model(&self, model: &str) -> Self {
        Self {
            model: model.to_string(),
            ..self.clone()
        }
    }
}

// =============================================================================
// LLM Provider Trait
// =============================================================================

#[async_trait]
pub trait LlmProvider: Send + Sync {
    /// Full completion text
    async fn complete(&self, request: &ChatRequest) -> Result<String>;

    /// Completion as a stream of content deltas
    async fn stream(&self, request: &ChatRequest) -> Result<DeltaStream>;

    /// Provider name for logging
    fn name(&self) -> &str;

    /// Check if the provider is reachable
    async fn health_check(&self) -> Result<bool>;
}

/// Create a shared provider from configuration
pub fn create_provider(config: &LlmConfig) -> Result<SharedProvider> {
    match config.provider.as_str() {
        "openai" => Ok(Arc::new(OpenAiProvider::new(config)?)),
        _ => Err(FitError::Config(format!(
            "Unknown provider: {}. Supported: openai",
            config.provider
        ))),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_unknown_provider_rejected() {
        let config = LlmConfig {
            provider: "carrier-pigeon".to_string(),
            ..Default::default()
        };
        assert!(matches!(create_provider(&config), Err(FitError::Config(_))));
    }

    #[test]
    fn test_with_model_keeps_prompt() {
        let request = ChatRequest {
            model: "primary".into(),
            system: "sys".into(),
            user: "{}".into(),
            temperature: 0.5,
            max_tokens: 100,
            json_mode: true,
        };
        let fallback = request.with_model("secondary");
        assert_eq!(fallback.model, "secondary");
        assert_eq!(fallback.system, "sys");
        assert!(fallback.json_mode);
    }
}
