//! AI Integration Layer
//!
//! Resilient LLM pipeline for plan generation: prompt construction,
//! provider calls with model fallback, retries, caching, streaming and
//! repair of malformed JSON output.

pub mod cache;
pub mod gateway;
pub mod prompt;
pub mod provider;
pub mod retry;
pub mod sanitize;
pub mod sink;
pub mod timeout;
pub mod validation;

pub use cache::{CacheEntry, CacheStats, ResponseCache};
pub use gateway::{ModelGateway, SharedCache};
pub use prompt::{PromptBuilder, PromptOptimizer, PromptSection, PromptTemplates};
pub use provider::{
    ChatRequest, DeltaStream, FallbackChain, LlmProvider, ModelStrategy, OpenAiProvider,
    SharedProvider, create_provider,
};
pub use retry::{RetryPolicy, retry_with_backoff};
pub use sink::{DONE_FRAME, ResponseSink, StreamEvent, finish_stream, open_event_stream};
pub use timeout::{TimeoutConfig, with_timeout};
pub use validation::{JsonRepairer, RepairStage, repair};
