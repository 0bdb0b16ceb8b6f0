//! Nutrition Controller
//!
//! Adds calorie and macro anchors to the request, remembers the last good
//! plan per user profile, and never leaves the caller without a plan: when
//! generation fails it serves the remembered plan or a locally synthesized
//! one.

use std::sync::Arc;
use std::time::Duration;

use dashmap::DashMap;
use tokio::time::Instant;
use tracing::{debug, info, instrument, warn};

use super::nutrition_fallback::{estimate_calories, estimate_macros, synthesize_fallback};
use crate::ai::{ModelGateway, PromptOptimizer, PromptTemplates, ResponseSink, finish_stream};
use crate::config::NutritionConfig;
use crate::types::{
    ClientClass, GenerationOutcome, GenerationRequest, NutritionPlan, Plan, RequestKind,
};

/// Last successful plan per user key
#[derive(Debug)]
pub struct LastGoodPlans {
    plans: DashMap<String, (NutritionPlan, Instant)>,
    ttl: Duration,
}

impl LastGoodPlans {
    pub fn new(ttl: Duration) -> Self {
        Self {
            plans: DashMap::new(),
            ttl,
        }
    }

    pub fn remember(&self, key: &str, plan: NutritionPlan) {
        self.plans.insert(key.to_string(), (plan, Instant::now()));
    }

    /// Stored plan while younger than the TTL
    pub fn fresh(&self, key: &str) -> Option<NutritionPlan> {
        let entry = self.plans.get(key)?;
        let (plan, stored_at) = entry.value();
        (stored_at.elapsed() < self.ttl).then(|| plan.clone())
    }

    pub fn len(&self) -> usize {
        self.plans.len()
    }

    pub fn is_empty(&self) -> bool {
        self.plans.is_empty()
    }
}

/// `weight-height-age-goal-activity-restrictions` with restrictions sorted
pub fn user_key(request: &GenerationRequest) -> String {
    fn num(value: Option<f64>) -> String {
        value.map(|v| v.to_string()).unwrap_or_default()
    }

    let mut restrictions = request.dietary_restrictions.clone();
    restrictions.sort();

    format!(
        "{}-{}-{}-{}-{}-{}",
        num(request.weight),
        num(request.height),
        num(request.age),
        request.effective_goal().unwrap_or_default(),
        request.activity_level.as_deref().unwrap_or_default(),
        restrictions.join("-"),
    )
}

/// Fill in calorie and macro estimates the caller did not supply
pub fn with_estimates(mut request: GenerationRequest) -> GenerationRequest {
    if request.estimated_calories.is_none() {
        request.estimated_calories = estimate_calories(&request);
    }
    if request.estimated_macros.is_none() {
        request.estimated_macros = estimate_macros(&request);
    }
    request
}

pub struct NutritionController {
    gateway: Arc<ModelGateway>,
    last_good: LastGoodPlans,
    base_prompt: String,
}

impl NutritionController {
    pub fn new(gateway: Arc<ModelGateway>, config: &NutritionConfig) -> Self {
        Self {
            gateway,
            last_good: LastGoodPlans::new(config.last_good_ttl()),
            base_prompt: PromptTemplates::nutrition(),
        }
    }

    pub fn last_good(&self) -> &LastGoodPlans {
        &self.last_good
    }

    fn prepare(&self, request: GenerationRequest) -> (String, GenerationRequest, String) {
        let key = user_key(&request);
        let request = with_estimates(request);
        if let Some(calories) = request.estimated_calories {
            debug!(calories, "Anchoring prompt with calorie estimate");
        }
        let system_prompt =
            PromptOptimizer::optimize(&self.base_prompt, RequestKind::Nutrition, &request);
        (key, request, system_prompt)
    }

    #[instrument(skip(self, request), fields(client = %client))]
    pub async fn generate(
        &self,
        request: GenerationRequest,
        client: ClientClass,
    ) -> GenerationOutcome {
        let (key, request, system_prompt) = self.prepare(request);
        let outcome = self
            .gateway
            .generate(RequestKind::Nutrition, &request, &system_prompt, client)
            .await;
        self.settle(&key, &request, outcome)
    }

    /// Streaming variant; writes the final `complete` event to `sink`
    #[instrument(skip(self, request, sink), fields(client = %client))]
    pub async fn generate_stream(
        &self,
        request: GenerationRequest,
        client: ClientClass,
        sink: &dyn ResponseSink,
    ) -> GenerationOutcome {
        let (key, request, system_prompt) = self.prepare(request);
        let outcome = self
            .gateway
            .generate_stream(RequestKind::Nutrition, &request, &system_prompt, client, sink)
            .await;
        let outcome = self.settle(&key, &request, outcome);
        finish_stream(sink, &outcome).await;
        outcome
    }

    /// Model plans are remembered and returned. Anything else is replaced
    /// by the remembered plan or a synthesized one, marked `Degraded`.
    fn settle(
        &self,
        key: &str,
        request: &GenerationRequest,
        outcome: GenerationOutcome,
    ) -> GenerationOutcome {
        match outcome {
            GenerationOutcome::Plan(Plan::Nutrition(plan)) => {
                self.last_good.remember(key, plan.clone());
                GenerationOutcome::Plan(Plan::Nutrition(plan))
            }
            other => {
                if let GenerationOutcome::Failed(err) = &other {
                    warn!(error_type = %err.error_type, "Nutrition generation failed");
                }
                if let Some(plan) = self.last_good.fresh(key) {
                    info!("Serving last good nutrition plan");
                    return GenerationOutcome::Degraded(Plan::Nutrition(plan));
                }
                info!("Serving synthesized nutrition plan");
                GenerationOutcome::Degraded(Plan::Nutrition(synthesize_fallback(request)))
            }
        }
    }
}
