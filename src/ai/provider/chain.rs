//! Model Fallback Chain
//!
//! Ordered list of model strategies evaluated in sequence: the primary
//! model first, then the fallback model. Each strategy yields the completion
//! text or an error; the first success wins. The order is plain data so it
//! can be inspected and tested without a network.

use std::time::Duration;

use tracing::{debug, info, instrument, warn};

use super::{ChatRequest, DeltaStream, SharedProvider};
use crate::ai::timeout::with_timeout;
use crate::config::LlmConfig;
use crate::types::{ErrorClassifier, FitError, LlmError, Result};

/// One step of the chain: a label for logs and the model to call
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ModelStrategy {
    pub label: String,
    pub model: String,
}

impl ModelStrategy {
    pub fn new(label: &str, model: &str) -> Self {
        Self {
            label: label.to_string(),
            model: model.to_string(),
        }
    }
}

/// Result of a chain execution attempt
#[derive(Debug)]
pub struct ChainAttemptResult {
    pub strategy: String,
    pub model: String,
    pub success: bool,
    pub error: Option<LlmError>,
    pub duration_ms: u64,
}

/// Execution statistics for the chain
#[derive(Debug, Default)]
pub struct ChainStats {
    pub total_attempts: usize,
    pub successful_model: Option<String>,
    pub attempts: Vec<ChainAttemptResult>,
    pub total_duration_ms: u64,
}

/// Primary-then-fallback model chain over a single provider
#[derive(Clone)]
pub struct FallbackChain {
    provider: SharedProvider,
    strategies: Vec<ModelStrategy>,
}

impl FallbackChain {
    pub fn new(provider: SharedProvider, strategies: Vec<ModelStrategy>) -> Self {
        Self {
            provider,
            strategies,
        }
    }

    /// Primary model, plus the fallback model when one is configured and
    /// differs from the primary
    pub fn from_config(provider: SharedProvider, config: &LlmConfig) -> Self {
        let mut strategies = vec![ModelStrategy::new("primary", &config.model)];
        if let Some(fallback) = config.fallback_model.as_deref()
            && !fallback.trim().is_empty()
            && fallback != config.model
        {
            strategies.push(ModelStrategy::new("fallback", fallback));
        }
        Self::new(provider, strategies)
    }

    pub fn strategies(&self) -> &[ModelStrategy] {
        &self.strategies
    }

    /// Model of the first strategy
    pub fn primary_model(&self) -> &str {
        self.strategies
            .first()
            .map(|s| s.model.as_str())
            .unwrap_or("unknown")
    }

    /// Run each strategy in order under `timeout` until one succeeds.
    /// Returns the last error when every strategy fails.
    #[instrument(skip(self, request), fields(strategies = self.strategies.len()))]
    pub async fn complete(
        &self,
        request: &ChatRequest,
        timeout: Duration,
    ) -> Result<(String, ChainStats)> {
        let mut stats = ChainStats::default();
        let start_time = std::time::Instant::now();
        let mut last_error: Option<FitError> = None;

        for strategy in &self.strategies {
            stats.total_attempts += 1;
            let attempt_start = std::time::Instant::now();
            let attempt = request.with_model(&strategy.model);

            debug!(strategy = %strategy.label, model = %strategy.model, "Chain attempt");

            let result = with_timeout(
                timeout,
                self.provider.complete(&attempt),
                &format!("chat completion ({})", strategy.model),
            )
            .await;
            let duration_ms = attempt_start.elapsed().as_millis() as u64;

            match result {
                Ok(text) => {
                    stats.attempts.push(ChainAttemptResult {
                        strategy: strategy.label.clone(),
                        model: strategy.model.clone(),
                        success: true,
                        error: None,
                        duration_ms,
                    });
                    stats.successful_model = Some(strategy.model.clone());
                    stats.total_duration_ms = start_time.elapsed().as_millis() as u64;

                    if stats.total_attempts > 1 {
                        info!(model = %strategy.model, "Fallback model succeeded");
                    }
                    return Ok((text, stats));
                }
                Err(err) => {
                    let classified = ErrorClassifier::classify_error(&err, self.provider.name());
                    warn!(
                        strategy = %strategy.label,
                        model = %strategy.model,
                        error = %err,
                        category = %classified.category,
                        "Model call failed"
                    );
                    stats.attempts.push(ChainAttemptResult {
                        strategy: strategy.label.clone(),
                        model: strategy.model.clone(),
                        success: false,
                        error: Some(classified),
                        duration_ms,
                    });
                    last_error = Some(err);
                }
            }
        }

        stats.total_duration_ms = start_time.elapsed().as_millis() as u64;
        Err(last_error
            .unwrap_or_else(|| FitError::Config("No models configured in chain".to_string())))
    }

    /// Open a delta stream with the first strategy that connects.
    /// Returns the stream and the model serving it.
    #[instrument(skip(self, request), fields(strategies = self.strategies.len()))]
    pub async fn open_stream(
        &self,
        request: &ChatRequest,
        timeout: Duration,
    ) -> Result<(DeltaStream, String)> {
        let mut last_error: Option<FitError> = None;

        for strategy in &self.strategies {
            let attempt = request.with_model(&strategy.model);
            let result = with_timeout(
                timeout,
                self.provider.stream(&attempt),
                &format!("open stream ({})", strategy.model),
            )
            .await;

            match result {
                Ok(stream) => return Ok((stream, strategy.model.clone())),
                Err(err) => {
                    warn!(strategy = %strategy.label, model = %strategy.model, error = %err, "Stream open failed");
                    last_error = Some(err);
                }
            }
        }

        Err(last_error
            .unwrap_or_else(|| FitError::Config("No models configured in chain".to_string())))
    }
}
