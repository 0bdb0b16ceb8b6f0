//! Configuration Types
//!
//! All configuration structures with sensible defaults.

use serde::{Deserialize, Serialize};
use std::time::Duration;

use crate::ai::retry::RetryPolicy;
use crate::constants::{cache, history, llm, server};
use crate::types::{ClientClass, FitError, Result};

/// Root configuration structure
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// HTTP listener settings
    pub server: ServerConfig,

    /// LLM provider settings
    pub llm: LlmConfig,

    /// Retry policies per client class
    pub retry: RetryConfig,

    /// Response cache settings
    pub cache: CacheConfig,

    /// Workout history settings
    pub history: HistoryConfig,

    /// Nutrition fallback settings
    pub nutrition: NutritionConfig,
}

impl Config {
    /// Validate configuration values are within acceptable ranges.
    /// Returns `FitError::Config` on validation failure.
    pub fn validate(&self) -> Result<()> {
        if !(0.0..=2.0).contains(&self.llm.temperature) {
            return Err(FitError::Config(format!(
                "LLM temperature must be between 0.0 and 2.0, got {}",
                self.llm.temperature
            )));
        }

        if self.llm.standard_timeout_secs == 0 || self.llm.mobile_timeout_secs == 0 {
            return Err(FitError::Config(
                "LLM timeouts must be greater than 0".to_string(),
            ));
        }

        if self.llm.max_tokens == 0 || self.llm.mobile_max_tokens == 0 {
            return Err(FitError::Config(
                "LLM max_tokens must be greater than 0".to_string(),
            ));
        }

        match url::Url::parse(&self.llm.api_base) {
            Ok(parsed) if matches!(parsed.scheme(), "http" | "https") => {}
            Ok(parsed) => {
                return Err(FitError::Config(format!(
                    "LLM api_base must use http or https, got {}",
                    parsed.scheme()
                )));
            }
            Err(e) => {
                return Err(FitError::Config(format!(
                    "LLM api_base is not a valid URL ({}): {}",
                    self.llm.api_base, e
                )));
            }
        }

        if self.cache.max_size == 0 {
            return Err(FitError::Config(
                "Cache max_size must be greater than 0".to_string(),
            ));
        }

        if self.history.max_entries == 0 {
            return Err(FitError::Config(
                "History max_entries must be greater than 0".to_string(),
            ));
        }

        for (name, policy) in [("standard", &self.retry.standard), ("mobile", &self.retry.mobile)] {
            if policy.backoff_factor < 1.0 {
                return Err(FitError::Config(format!(
                    "Retry {} backoff_factor must be at least 1.0, got {}",
                    name, policy.backoff_factor
                )));
            }
        }

        Ok(())
    }
}

// =============================================================================
// Server Configuration
// =============================================================================

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: server::DEFAULT_HOST.to_string(),
            port: server::DEFAULT_PORT,
        }
    }
}

impl ServerConfig {
    pub fn bind_address(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }
}

// =============================================================================
// LLM Configuration
// =============================================================================

#[derive(Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LlmConfig {
    /// Provider name
    pub provider: String,

    /// OpenAI-compatible API base URL
    pub api_base: String,

    /// Model name
    pub model: String,

    /// Model tried after the primary fails
    pub fallback_model: Option<String>,

    /// API key; `OPENAI_API_KEY` is used when unset
    #[serde(skip_serializing)]
    pub api_key: Option<String>,

    /// Completion budget for standard clients
    pub max_tokens: u32,

    /// Completion ceiling for mobile clients
    pub mobile_max_tokens: u32,

    /// Sampling temperature
    pub temperature: f32,

    /// Per-call timeout for standard clients
    pub standard_timeout_secs: u64,

    /// Per-call timeout for mobile clients
    pub mobile_timeout_secs: u64,
}

impl Default for LlmConfig {
    fn default() -> Self {
        Self {
            provider: "openai".to_string(),
            api_base: llm::DEFAULT_API_BASE.to_string(),
            model: llm::DEFAULT_MODEL.to_string(),
            fallback_model: Some(llm::DEFAULT_FALLBACK_MODEL.to_string()),
            api_key: None,
            max_tokens: llm::DEFAULT_MAX_TOKENS,
            mobile_max_tokens: llm::MOBILE_MAX_TOKENS,
            temperature: llm::DEFAULT_TEMPERATURE,
            standard_timeout_secs: llm::STANDARD_TIMEOUT_SECS,
            mobile_timeout_secs: llm::MOBILE_TIMEOUT_SECS,
        }
    }
}

impl std::fmt::Debug for LlmConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("LlmConfig")
            .field("provider", &self.provider)
            .field("api_base", &self.api_base)
            .field("model", &self.model)
            .field("fallback_model", &self.fallback_model)
            .field("api_key", &self.api_key.as_ref().map(|_| "[REDACTED]"))
            .field("max_tokens", &self.max_tokens)
            .field("mobile_max_tokens", &self.mobile_max_tokens)
            .field("temperature", &self.temperature)
            .field("standard_timeout_secs", &self.standard_timeout_secs)
            .field("mobile_timeout_secs", &self.mobile_timeout_secs)
            .finish()
    }
}

impl LlmConfig {
    /// Completion budget for a client class
    pub fn max_tokens_for(&self, client: ClientClass) -> u32 {
        match client {
            ClientClass::Standard => self.max_tokens,
            ClientClass::Mobile => self.max_tokens.min(self.mobile_max_tokens),
        }
    }

    /// Per-call timeout for a client class
    pub fn timeout_for(&self, client: ClientClass) -> Duration {
        match client {
            ClientClass::Standard => Duration::from_secs(self.standard_timeout_secs),
            ClientClass::Mobile => Duration::from_secs(self.mobile_timeout_secs),
        }
    }
}

// =============================================================================
// Retry Configuration
// =============================================================================

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct RetryConfig {
    pub standard: RetryPolicy,
    pub mobile: RetryPolicy,
}

impl Default for RetryConfig {
    fn default() -> Self {
        Self {
            standard: RetryPolicy::standard(),
            mobile: RetryPolicy::mobile(),
        }
    }
}

impl RetryConfig {
    pub fn for_client(&self, client: ClientClass) -> RetryPolicy {
        match client {
            ClientClass::Standard => self.standard,
            ClientClass::Mobile => self.mobile,
        }
    }
}

// =============================================================================
// Cache Configuration
// =============================================================================

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct CacheConfig {
    /// Maximum entries before least-recently-used eviction
    pub max_size: usize,

    /// Entry lifetime in seconds
    pub ttl_secs: u64,
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self {
            max_size: cache::MAX_ENTRIES,
            ttl_secs: cache::TTL_SECS,
        }
    }
}

impl CacheConfig {
    pub fn ttl(&self) -> Duration {
        Duration::from_secs(self.ttl_secs)
    }
}

// =============================================================================
// History Configuration
// =============================================================================

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct HistoryConfig {
    /// Plans kept per bucket
    pub max_entries: usize,

    /// Bucket lifetime since its last update, in seconds
    pub ttl_secs: u64,
}

impl Default for HistoryConfig {
    fn default() -> Self {
        Self {
            max_entries: history::MAX_ENTRIES,
            ttl_secs: history::TTL_SECS,
        }
    }
}

impl HistoryConfig {
    pub fn ttl(&self) -> Duration {
        Duration::from_secs(self.ttl_secs)
    }
}

// =============================================================================
// Nutrition Configuration
// =============================================================================

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct NutritionConfig {
    /// How long the last successful plan per user key stays servable
    pub last_good_ttl_secs: u64,
}

impl Default for NutritionConfig {
    fn default() -> Self {
        Self {
            last_good_ttl_secs: cache::LAST_GOOD_TTL_SECS,
        }
    }
}

impl NutritionConfig {
    pub fn last_good_ttl(&self) -> Duration {
        Duration::from_secs(self.last_good_ttl_secs)
    }
}
