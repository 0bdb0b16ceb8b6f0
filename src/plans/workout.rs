//! Workout Controller
//!
//! Injects recent history into the request so the model avoids repeating
//! exercises, enforces the requested duration and level on the result, and
//! records successful plans back into history.

use std::sync::Arc;

use tracing::{debug, info, instrument};

use super::history::WorkoutHistory;
use crate::ai::{ModelGateway, PromptOptimizer, PromptTemplates, ResponseSink, finish_stream};
use crate::types::{
    ClientClass, GenerationOutcome, GenerationRequest, PreviousWorkout, RequestKind, WorkoutPlan,
};

pub struct WorkoutController {
    gateway: Arc<ModelGateway>,
    history: Arc<WorkoutHistory>,
    base_prompt: String,
}

impl WorkoutController {
    pub fn new(gateway: Arc<ModelGateway>, history: Arc<WorkoutHistory>) -> Self {
        Self {
            gateway,
            history,
            base_prompt: PromptTemplates::workout(),
        }
    }

    pub fn history(&self) -> &WorkoutHistory {
        &self.history
    }

    /// History key, history-enriched request and optimized system prompt
    fn prepare(&self, mut request: GenerationRequest) -> (String, GenerationRequest, String) {
        let key = request.fingerprint();
        let previous = self.history.recent(&key);
        if !previous.is_empty() {
            debug!(count = previous.len(), "Injecting previous workouts");
        }
        request.previous_workouts = previous;

        let system_prompt =
            PromptOptimizer::optimize(&self.base_prompt, RequestKind::Workout, &request);
        (key, request, system_prompt)
    }

    #[instrument(skip(self, request), fields(client = %client))]
    pub async fn generate(
        &self,
        request: GenerationRequest,
        client: ClientClass,
    ) -> GenerationOutcome {
        let (key, request, system_prompt) = self.prepare(request);
        let mut outcome = self
            .gateway
            .generate(RequestKind::Workout, &request, &system_prompt, client)
            .await;
        self.settle(&key, &request, &mut outcome);
        outcome
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
        let mut outcome = self
            .gateway
            .generate_stream(RequestKind::Workout, &request, &system_prompt, client, sink)
            .await;
        self.settle(&key, &request, &mut outcome);
        finish_stream(sink, &outcome).await;
        outcome
    }

    fn settle(&self, key: &str, request: &GenerationRequest, outcome: &mut GenerationOutcome) {
        if let Some(plan) = outcome.plan_mut().and_then(|p| p.as_workout_mut()) {
            enforce_requested_fields(plan, request);
        }

        if let GenerationOutcome::Plan(plan) = outcome
            && let Some(workout) = plan.as_workout()
        {
            self.history.record(
                key,
                PreviousWorkout {
                    title: workout.title.clone(),
                    exercises: workout.exercise_names(),
                },
            );
            info!(title = %workout.title, "Recorded workout in history");
        }
    }
}

/// Requested duration and level win over whatever the model returned.
/// A zero duration or an empty level counts as not supplied; any other
/// level string is echoed exactly as sent.
pub fn enforce_requested_fields(plan: &mut WorkoutPlan, request: &GenerationRequest) {
    if let Some(duration) = request.duration.filter(|d| *d != 0) {
        plan.duration = duration;
    }
    if let Some(level) = request.level.as_deref().filter(|l| !l.is_empty()) {
        plan.difficulty_level = level.to_string();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_enforce_requested_fields() {
        let mut plan = WorkoutPlan {
            duration: 60,
            difficulty_level: "advanced".into(),
            ..Default::default()
        };
        let request = GenerationRequest {
            duration: Some(30),
            level: Some("beginner".into()),
            ..Default::default()
        };
        enforce_requested_fields(&mut plan, &request);
        assert_eq!(plan.duration, 30);
        assert_eq!(plan.difficulty_level, "beginner");
    }

    #[test]
    fn test_zero_duration_and_empty_level_not_echoed() {
        let mut plan = WorkoutPlan {
            duration: 60,
            difficulty_level: "advanced".into(),
            ..Default::default()
        };
        let request = GenerationRequest {
            duration: Some(0),
            level: Some(String::new()),
            ..Default::default()
        };
        enforce_requested_fields(&mut plan, &request);
        assert_eq!(plan.duration, 60);
        assert_eq!(plan.difficulty_level, "advanced");

        let padded = GenerationRequest {
            level: Some("  Beginner ".into()),
            ..Default::default()
        };
        enforce_requested_fields(&mut plan, &padded);
        assert_eq!(plan.difficulty_level, "  Beginner ");
    }

    #[test]
    fn test_unset_fields_keep_model_values() {
        let mut plan = WorkoutPlan {
            duration: 45,
            difficulty_level: "intermediate".into(),
            ..Default::default()
        };
        enforce_requested_fields(&mut plan, &GenerationRequest::default());
        assert_eq!(plan.duration, 45);
        assert_eq!(plan.difficulty_level, "intermediate");
    }
}
