//! fitplan - Resilient LLM Plan Generation
//!
//! Generates personalized workout and nutrition plans by prompting a chat
//! model and turning its JSON answer into typed plans, surviving flaky
//! networks and malformed output along the way.
//!
//! ## Core Features
//!
//! - **JSON Repair**: Staged recovery of truncated or fenced model output
//! - **Retry/Backoff**: Exponential backoff with per-client policies
//! - **Response Cache**: LRU with TTL for nutrition plans
//! - **Model Fallback**: Primary model, then a fallback model
//! - **Streaming**: Server-sent deltas with repair at the end
//! - **Nutrition Fallback**: Deterministic local plan when the model fails
//!
//! ## Quick Start
//!
//! ```ignore
//! use fitplan::{ConfigLoader, create_provider};
//! use fitplan::server::{AppState, router};
//!
//! let config = ConfigLoader::load(None)?;
//! let provider = create_provider(&config.llm)?;
//! let app = router(Arc::new(AppState::new(provider, &config)));
//! ```
//!
//! ## Modules
//!
//! - [`ai`]: Provider abstraction, gateway, cache, retry, repair, prompts
//! - [`plans`]: Workout and nutrition controllers
//! - [`server`]: axum routes and streaming sink
//! - [`config`]: Layered configuration

pub mod ai;
pub mod config;
pub mod constants;
pub mod plans;
pub mod server;
pub mod types;

// =============================================================================
// Core Re-exports
// =============================================================================

pub use config::{Config, ConfigLoader};
pub use types::{
    ClientClass, ErrorCategory, FitError, GenerationOutcome, GenerationRequest, Plan,
    RequestKind, Result,
};

pub use ai::{
    LlmProvider, ModelGateway, ResponseSink, SharedProvider, create_provider,
    JsonRepairer, RetryPolicy, retry_with_backoff,
};
pub use plans::{NutritionController, WorkoutController, synthesize_fallback};
