//! Unified Error Type System
//!
//! Centralized error types for the plan-generation pipeline.
//!
//! ## Error Categories
//!
//! Categories label failures for logging and for the `errorType` field of the
//! terminal error object. The retry executor deliberately ignores them: every
//! error is retried until the attempt budget runs out.

use std::time::Duration;
use thiserror::Error;

// =============================================================================
// Error Categories
// =============================================================================

/// Failure categories reported to callers and logs
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorCategory {
    /// Rate limited by the model provider
    RateLimit,
    /// Authentication failed (missing or invalid API key)
    Auth,
    /// Network/connectivity issues
    Network,
    /// Call exceeded its time budget
    Timeout,
    /// Provider unavailable or returned a server error
    Unavailable,
    /// Request rejected by the provider
    BadRequest,
    /// Model output could not be parsed
    ParseError,
    /// Temporary server issues
    Transient,
    /// Anything else
    Unknown,
}

impl std::fmt::Display for ErrorCategory {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::RateLimit => write!(f, "RATE_LIMIT"),
            Self::Auth => write!(f, "AUTH"),
            Self::Network => write!(f, "NETWORK"),
            Self::Timeout => write!(f, "TIMEOUT"),
            Self::Unavailable => write!(f, "UNAVAILABLE"),
            Self::BadRequest => write!(f, "BAD_REQUEST"),
            Self::ParseError => write!(f, "PARSE_ERROR"),
            Self::Transient => write!(f, "TRANSIENT"),
            Self::Unknown => write!(f, "UNKNOWN"),
        }
    }
}

impl ErrorCategory {
    /// Value used for `errorType` in user-visible error objects
    pub fn error_type(&self) -> &'static str {
        match self {
            Self::RateLimit => "rate_limit",
            Self::Auth => "auth",
            Self::Network | Self::Transient | Self::Unknown => "network",
            Self::Timeout => "timeout",
            Self::Unavailable => "unavailable",
            Self::BadRequest => "bad_request",
            Self::ParseError => "parse",
        }
    }
}

// =============================================================================
// LLM Error
// =============================================================================

/// LLM error with category and provider context
#[derive(Debug, Clone)]
pub struct LlmError {
    /// Error category for reporting
    pub category: ErrorCategory,
    /// Detailed error message
    pub message: String,
    /// Provider that produced the error
    pub provider: Option<String>,
    /// Provider-suggested wait time, when one was given
    pub retry_after: Option<Duration>,
}

impl std::fmt::Display for LlmError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        if let Some(provider) = &self.provider {
            write!(f, "[{}:{}] {}", provider, self.category, self.message)
        } else {
            write!(f, "[{}] {}", self.category, self.message)
        }
    }
}

impl std::error::Error for LlmError {}

impl LlmError {
    pub fn with_provider(
        category: ErrorCategory,
        message: impl Into<String>,
        provider: impl Into<String>,
    ) -> Self {
        Self {
            category,
            message: message.into(),
            provider: Some(provider.into()),
            retry_after: None,
        }
    }

    pub fn retry_after(mut self, duration: Duration) -> Self {
        self.retry_after = Some(duration);
        self
    }
}

// =============================================================================
// Error Classifier
// =============================================================================

/// Maps raw failures onto an [`ErrorCategory`]
pub struct ErrorClassifier;

impl ErrorClassifier {
    /// Classify an error message from any provider
    pub fn classify(message: &str, provider: &str) -> LlmError {
        let lower = message.to_lowercase();

        if lower.contains("rate limit")
            || lower.contains("429")
            || lower.contains("too many requests")
            || lower.contains("quota exceeded")
        {
            return LlmError::with_provider(ErrorCategory::RateLimit, message, provider);
        }

        if lower.contains("auth")
            || lower.contains("401")
            || lower.contains("403")
            || lower.contains("api key")
            || lower.contains("unauthorized")
        {
            return LlmError::with_provider(ErrorCategory::Auth, message, provider);
        }

        if lower.contains("timeout") || lower.contains("timed out") {
            return LlmError::with_provider(ErrorCategory::Timeout, message, provider);
        }

        if lower.contains("network")
            || lower.contains("connection")
            || lower.contains("dns")
            || lower.contains("unreachable")
        {
            return LlmError::with_provider(ErrorCategory::Network, message, provider);
        }

        if lower.contains("503")
            || lower.contains("502")
            || lower.contains("service unavailable")
            || lower.contains("server error")
            || lower.contains("500")
            || lower.contains("not found")
        {
            return LlmError::with_provider(ErrorCategory::Unavailable, message, provider);
        }

        if lower.contains("400") || lower.contains("bad request") || lower.contains("invalid") {
            return LlmError::with_provider(ErrorCategory::BadRequest, message, provider);
        }

        if lower.contains("parse") || lower.contains("json") || lower.contains("syntax") {
            return LlmError::with_provider(ErrorCategory::ParseError, message, provider);
        }

        if lower.contains("retry") || lower.contains("temporary") || lower.contains("overloaded")
        {
            return LlmError::with_provider(ErrorCategory::Transient, message, provider);
        }

        LlmError::with_provider(ErrorCategory::Unknown, message, provider)
    }

    /// Classify HTTP status code directly (more accurate than string matching)
    pub fn classify_http_status(status: u16, message: &str, provider: &str) -> LlmError {
        match status {
            429 => LlmError::with_provider(ErrorCategory::RateLimit, message, provider)
                .retry_after(Duration::from_secs(30)),
            401 | 403 => LlmError::with_provider(ErrorCategory::Auth, message, provider),
            400 | 422 => LlmError::with_provider(ErrorCategory::BadRequest, message, provider),
            408 => LlmError::with_provider(ErrorCategory::Timeout, message, provider),
            500 | 502 | 503 | 504 => {
                LlmError::with_provider(ErrorCategory::Transient, message, provider)
            }
            404 => LlmError::with_provider(ErrorCategory::Unavailable, message, provider),
            _ => LlmError::with_provider(ErrorCategory::Unknown, message, provider),
        }
    }

    /// Classify a [`FitError`] with type-based routing before falling back to
    /// message heuristics
    pub fn classify_error(err: &FitError, provider: &str) -> LlmError {
        match err {
            FitError::Llm(llm_err) => llm_err.clone(),
            FitError::LlmApi(msg) | FitError::Stream(msg) => Self::classify(msg, provider),
            FitError::Timeout { .. } => {
                LlmError::with_provider(ErrorCategory::Timeout, err.to_string(), provider)
            }
            FitError::Io(_) => {
                LlmError::with_provider(ErrorCategory::Network, err.to_string(), provider)
            }
            FitError::Json(_) | FitError::Parse { .. } => {
                LlmError::with_provider(ErrorCategory::ParseError, err.to_string(), provider)
            }
            FitError::Config(_) => {
                LlmError::with_provider(ErrorCategory::BadRequest, err.to_string(), provider)
            }
            FitError::Exhausted { last, .. } => Self::classify_error(last, provider),
        }
    }
}

// =============================================================================
// Application Error
// =============================================================================

#[derive(Debug, Error)]
pub enum FitError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("Config error: {0}")]
    Config(String),

    /// Structured LLM error with category
    #[error("LLM error: {0}")]
    Llm(LlmError),

    /// Simple LLM API error (use Llm variant for structured errors)
    #[error("LLM API error: {0}")]
    LlmApi(String),

    #[error("Timeout after {duration:?}: {operation}")]
    Timeout {
        operation: String,
        duration: Duration,
    },

    /// Model output that survived none of the repair stages
    #[error("Parse error: {message} (preview: {preview})")]
    Parse { message: String, preview: String },

    #[error("Stream error: {0}")]
    Stream(String),

    /// Retry budget spent; carries the final attempt's error
    #[error("Gave up after {attempts} attempts: {last}")]
    Exhausted {
        attempts: u32,
        #[source]
        last: Box<FitError>,
    },
}

impl From<LlmError> for FitError {
    fn from(err: LlmError) -> Self {
        FitError::Llm(err)
    }
}

pub type Result<T> = std::result::Result<T, FitError>;

impl FitError {
    /// Create a timeout error
    pub fn timeout(operation: impl Into<String>, duration: Duration) -> Self {
        Self::Timeout {
            operation: operation.into(),
            duration,
        }
    }

    /// Create a parse error keeping a bounded preview of the offending text
    pub fn parse(message: impl Into<String>, raw: &str) -> Self {
        Self::Parse {
            message: message.into(),
            preview: raw
                .chars()
                .take(crate::constants::llm::LOG_PREVIEW_CHARS)
                .collect(),
        }
    }

    /// Wrap the final error of a spent retry budget
    pub fn exhausted(attempts: u32, last: FitError) -> Self {
        Self::Exhausted {
            attempts,
            last: Box::new(last),
        }
    }

    /// Provider-suggested wait before the next attempt
    pub fn retry_after(&self) -> Option<Duration> {
        match self {
            FitError::Llm(llm_err) => llm_err.retry_after,
            FitError::Exhausted { last, .. } => last.retry_after(),
            _ => None,
        }
    }

    /// Category used for reporting
    pub fn category(&self) -> ErrorCategory {
        ErrorClassifier::classify_error(self, "fitplan").category
    }
}

// =============================================================================
// Tests
// =============================================================================
