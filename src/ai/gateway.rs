//! Model Gateway
//!
//! Turns a generation request into a renderable outcome:
//!
//! ```text
//! sanitize -> cache check -> retry(primary -> fallback model) -> repair -> cache -> return
//! ```
//!
//! Every path ends in a [`GenerationOutcome`]: a plan, a degraded stub when
//! the model output cannot be repaired, or an error object once the retry
//! budget is spent. Nothing here surfaces an error to the caller.

use std::sync::Arc;
use std::time::Duration;

use futures::StreamExt;
use serde_json::{Map, Value, json};
use sha2::{Digest, Sha256};
use tracing::{debug, info, instrument, warn};

use super::cache::ResponseCache;
use super::provider::{ChatRequest, FallbackChain, SharedProvider};
use super::retry::retry_with_backoff;
use super::sanitize::reduced_payload;
use super::sink::{ResponseSink, StreamEvent, open_event_stream};
use super::timeout::{TimeoutConfig, with_timeout};
use super::validation::JsonRepairer;
use crate::config::{Config, LlmConfig, RetryConfig};
use crate::constants::llm::LOG_PREVIEW_CHARS;
use crate::types::{
    ClientClass, ErrorObject, FitError, GenerationOutcome, GenerationRequest, Plan, RequestKind,
    Result,
};

/// Shared plan cache type
pub type SharedCache = Arc<ResponseCache<Plan>>;

fn preview(text: &str) -> String {
    text.chars().take(LOG_PREVIEW_CHARS).collect()
}

pub struct ModelGateway {
    chain: FallbackChain,
    cache: SharedCache,
    llm: LlmConfig,
    timeouts: TimeoutConfig,
    retry: RetryConfig,
    cache_ttl: Duration,
    repairer: JsonRepairer,
}

impl ModelGateway {
    pub fn new(provider: SharedProvider, config: &Config) -> Self {
        Self {
            chain: FallbackChain::from_config(provider, &config.llm),
            cache: Arc::new(ResponseCache::new(config.cache.max_size)),
            llm: config.llm.clone(),
            timeouts: TimeoutConfig::from_llm_config(&config.llm),
            retry: config.retry.clone(),
            cache_ttl: config.cache.ttl(),
            repairer: JsonRepairer::new(),
        }
    }

    pub fn cache(&self) -> &SharedCache {
        &self.cache
    }

    /// Cache fingerprint: payload, system prompt and model. A prompt edit or
    /// a model change yields new keys, leaving older entries to age out.
    pub fn cache_key(payload: &Map<String, Value>, system_prompt: &str, model: &str) -> String {
        let keyed = json!({
            "payload": payload,
            "systemPrompt": system_prompt,
            "model": model,
        });
        let mut hasher = Sha256::new();
        hasher.update(keyed.to_string().as_bytes());
        format!("{:x}", hasher.finalize())
    }

    fn is_cacheable(kind: RequestKind, request: &GenerationRequest) -> bool {
        // Workouts trade cache hits for variety
        kind == RequestKind::Nutrition && !request.disable_caching
    }

    fn chat_request(
        &self,
        payload: &Map<String, Value>,
        system_prompt: &str,
        client: ClientClass,
    ) -> Result<ChatRequest> {
        Ok(ChatRequest {
            model: self.chain.primary_model().to_string(),
            system: system_prompt.to_string(),
            user: serde_json::to_string(payload)?,
            temperature: self.llm.temperature,
            max_tokens: self.llm.max_tokens_for(client),
            json_mode: true,
        })
    }

    /// Fresh cached plan for `key`; stale entries are dropped
    fn cached(&self, key: &str) -> Option<Plan> {
        let entry = self.cache.get(key)?;
        if entry.is_fresh(self.cache_ttl) {
            return Some(entry.value);
        }
        debug!(age_ms = entry.age().as_millis() as u64, "Cache entry expired");
        self.cache.remove(key);
        None
    }

    fn parse_plan(&self, kind: RequestKind, raw: &str) -> Result<Plan> {
        debug!(preview = %preview(raw), "Model response");
        let (value, stage) = self.repairer.repair(raw)?;
        if stage.was_repaired() {
            debug!(stage = %stage, "Model response needed repair");
        }
        Plan::from_value(kind, value)
    }

    fn degraded(&self, kind: RequestKind, err: &FitError) -> GenerationOutcome {
        warn!(kind = %kind, error = %err, "Unrecoverable model output, returning degraded stub");
        GenerationOutcome::Degraded(Plan::degraded(kind))
    }

    /// Non-streaming generation with cache, retries and model fallback
    #[instrument(skip(self, request, system_prompt), fields(kind = %kind, client = %client))]
    pub async fn generate(
        &self,
        kind: RequestKind,
        request: &GenerationRequest,
        system_prompt: &str,
        client: ClientClass,
    ) -> GenerationOutcome {
        let payload = match reduced_payload(request) {
            Ok(payload) => payload,
            Err(e) => return GenerationOutcome::Failed(ErrorObject::from_error(&e)),
        };

        let cache_key = Self::is_cacheable(kind, request)
            .then(|| Self::cache_key(&payload, system_prompt, self.chain.primary_model()));

        if let Some(key) = cache_key.as_deref()
            && let Some(plan) = self.cached(key)
        {
            info!(cache = "hit", "Serving cached plan");
            return GenerationOutcome::Plan(plan);
        }

        let chat = match self.chat_request(&payload, system_prompt, client) {
            Ok(chat) => chat,
            Err(e) => return GenerationOutcome::Failed(ErrorObject::from_error(&e)),
        };

        let policy = self.retry.for_client(client);
        let timeout = self.timeouts.for_client(client);
        let chain = &self.chain;
        let chat = &chat;

        let result = retry_with_backoff(&policy, "chat completion", move |attempt| async move {
            debug!(attempt, "Dispatching chat completion");
            chain.complete(chat, timeout).await
        })
        .await;

        let raw = match result {
            Ok((raw, stats)) => {
                debug!(
                    model = stats.successful_model.as_deref().unwrap_or("unknown"),
                    attempts = stats.total_attempts,
                    duration_ms = stats.total_duration_ms,
                    "Model call succeeded"
                );
                raw
            }
            Err(e) => {
                let exhausted = FitError::exhausted(policy.max_attempts(), e);
                warn!(error = %exhausted, "Generation failed");
                return GenerationOutcome::Failed(ErrorObject::from_error(&exhausted));
            }
        };

        match self.parse_plan(kind, &raw) {
            Ok(plan) => {
                info!(title = plan.title(), "Plan generated");
                if let Some(key) = cache_key {
                    info!(cache = "miss", "Caching generated plan");
                    self.cache.set(key, plan.clone());
                }
                GenerationOutcome::Plan(plan)
            }
            Err(e) => self.degraded(kind, &e),
        }
    }

    /// Streaming generation. Content deltas are forwarded to `sink` as they
    /// arrive; the assembled text is repaired once the stream ends. The
    /// `complete` event is left to the caller so it can post-process the
    /// outcome first. Streaming results are never cached.
    #[instrument(skip(self, request, system_prompt, sink), fields(kind = %kind, client = %client))]
    pub async fn generate_stream(
        &self,
        kind: RequestKind,
        request: &GenerationRequest,
        system_prompt: &str,
        client: ClientClass,
        sink: &dyn ResponseSink,
    ) -> GenerationOutcome {
        let chat = match reduced_payload(request)
            .and_then(|payload| self.chat_request(&payload, system_prompt, client))
        {
            Ok(chat) => chat,
            Err(e) => return GenerationOutcome::Failed(ErrorObject::from_error(&e)),
        };

        let timeout = self.timeouts.for_client(client);
        let (mut deltas, model) = match self.chain.open_stream(&chat, timeout).await {
            Ok(opened) => opened,
            Err(e) => {
                warn!(error = %e, "Could not open model stream");
                return GenerationOutcome::Failed(ErrorObject::from_error(&e));
            }
        };
        debug!(model = %model, "Model stream opened");

        open_event_stream(sink);

        let mut text = String::new();
        let mut client_gone = false;
        let consumed = with_timeout(
            timeout,
            async {
                while let Some(delta) = deltas.next().await {
                    let content = delta?;
                    text.push_str(&content);
                    if client_gone {
                        continue;
                    }
                    let written = match (StreamEvent::Delta { content: &content }).frame() {
                        Ok(frame) => sink.write(&frame).await,
                        Err(e) => Err(e),
                    };
                    if let Err(e) = written {
                        // Keep draining so the full plan can still be assembled
                        warn!(error = %e, "Client write failed, continuing without forwarding");
                        client_gone = true;
                    }
                }
                Ok::<(), FitError>(())
            },
            "stream completion",
        )
        .await;

        match (consumed, self.parse_plan(kind, &text)) {
            (_, Ok(plan)) => GenerationOutcome::Plan(plan),
            (Ok(()), Err(e)) => self.degraded(kind, &e),
            (Err(stream_err), Err(_)) => {
                warn!(error = %stream_err, received = text.len(), "Model stream failed");
                GenerationOutcome::Failed(ErrorObject::from_error(&stream_err))
            }
        }
    }
}
