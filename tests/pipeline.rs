//! End-to-end controller behavior against in-process providers

mod common;

use std::collections::HashSet;
use std::sync::Arc;

use common::{CooperativeProvider, NUTRITION_JSON, ScriptedProvider, WORKOUT_JSON};
use fitplan::ai::DONE_FRAME;
use fitplan::server::{AppState, ChannelSink};
use fitplan::{ClientClass, Config, GenerationOutcome, GenerationRequest, Plan};
use serde_json::{Value, json};

fn state_with(provider: Arc<dyn fitplan::LlmProvider>) -> AppState {
    AppState::new(provider, &Config::default())
}

fn nutrition_request() -> GenerationRequest {
    serde_json::from_value(json!({
        "weight": 70,
        "height": 175,
        "age": 30,
        "goal": "weight_loss",
        "activityLevel": "moderate",
        "dietaryRestrictions": []
    }))
    .unwrap()
}

fn workout_request() -> GenerationRequest {
    serde_json::from_value(json!({
        "fitnessGoal": "strength",
        "level": "beginner",
        "duration": "30",
        "equipment": ["dumbbells"]
    }))
    .unwrap()
}

fn exercise_names(outcome: &GenerationOutcome) -> Vec<String> {
    outcome
        .plan()
        .and_then(Plan::as_workout)
        .map(|w| w.exercise_names())
        .unwrap_or_default()
}

#[tokio::test]
async fn identical_nutrition_requests_hit_the_cache() {
    let provider = Arc::new(ScriptedProvider::always(NUTRITION_JSON));
    let state = state_with(provider.clone());

    let first = state
        .nutrition
        .generate(nutrition_request(), ClientClass::Standard)
        .await;
    let second = state
        .nutrition
        .generate(nutrition_request(), ClientClass::Standard)
        .await;

    assert_eq!(provider.calls(), 1);
    assert!(first.is_plan());
    assert_eq!(first, second);
}

#[tokio::test]
async fn nutrition_prompt_carries_calorie_anchor() {
    let provider = Arc::new(ScriptedProvider::always(NUTRITION_JSON));
    let state = state_with(provider.clone());
    state
        .nutrition
        .generate(nutrition_request(), ClientClass::Standard)
        .await;

    let sent: Value = serde_json::from_str(&provider.requests()[0].user).unwrap();
    assert_eq!(sent["estimatedCalories"], 2173);
    assert_eq!(sent["estimatedMacros"]["protein"], 154);
}

#[tokio::test]
async fn workout_requests_are_never_cached() {
    let provider = Arc::new(ScriptedProvider::always(WORKOUT_JSON));
    let state = state_with(provider.clone());

    state
        .workout
        .generate(workout_request(), ClientClass::Standard)
        .await;
    state
        .workout
        .generate(workout_request(), ClientClass::Standard)
        .await;

    assert_eq!(provider.calls(), 2);
}

#[tokio::test]
async fn requested_duration_and_level_override_model_values() {
    let provider = Arc::new(ScriptedProvider::always(WORKOUT_JSON));
    let state = state_with(provider);

    let outcome = state
        .workout
        .generate(workout_request(), ClientClass::Standard)
        .await;

    let plan = outcome.plan().and_then(Plan::as_workout).unwrap();
    assert_eq!(plan.duration, 30);
    assert_eq!(plan.difficulty_level, "beginner");
    assert_eq!(plan.exercises[1].sets, 3);
}

#[tokio::test]
async fn consecutive_workouts_do_not_repeat_exercises() {
    let provider = Arc::new(CooperativeProvider::new(3));
    let state = state_with(provider);

    let mut seen: HashSet<String> = HashSet::new();
    for round in 0..5 {
        let outcome = state
            .workout
            .generate(workout_request(), ClientClass::Standard)
            .await;
        let names = exercise_names(&outcome);
        assert_eq!(names.len(), 3, "round {round}");
        for name in names {
            assert!(
                seen.insert(name.to_lowercase()),
                "round {round} repeated {name}"
            );
        }
    }

    let key = workout_request().fingerprint();
    let history = state.workout.history().recent(&key);
    assert_eq!(history.len(), 5);
    assert_eq!(history[0].title, "Session 5");
}

#[tokio::test(start_paused = true)]
async fn failing_model_yields_exact_local_nutrition_plan() {
    let provider = Arc::new(ScriptedProvider::failing("connection refused"));
    let state = state_with(provider.clone());

    let outcome = state
        .nutrition
        .generate(nutrition_request(), ClientClass::Standard)
        .await;

    // 3 attempts, each trying the primary then the fallback model
    assert_eq!(provider.calls(), 6);
    assert!(matches!(outcome, GenerationOutcome::Degraded(_)));

    let body = serde_json::to_value(&outcome).unwrap();
    assert_eq!(body["fallback"], true);
    assert_eq!(body["dailyCalories"], 2173);
    assert_eq!(body["macros"]["protein"], 154);
    assert_eq!(body["macros"]["fat"], 70);
    assert_eq!(body["macros"]["carbs"], 232);
    assert_eq!(body["meals"].as_array().unwrap().len(), 4);
}

#[tokio::test(start_paused = true)]
async fn last_good_plan_is_served_before_synthesis() {
    let provider = Arc::new(ScriptedProvider::new(
        vec![Ok(NUTRITION_JSON)],
        Err("connection refused"),
    ));
    let state = state_with(provider);

    let first = state
        .nutrition
        .generate(nutrition_request(), ClientClass::Standard)
        .await;
    assert!(first.is_plan());

    let mut uncached = nutrition_request();
    uncached.disable_caching = true;
    let second = state
        .nutrition
        .generate(uncached, ClientClass::Standard)
        .await;

    assert!(matches!(second, GenerationOutcome::Degraded(_)));
    assert_eq!(
        second.plan().map(Plan::title),
        Some("Model Nutrition Plan")
    );
}

#[tokio::test(start_paused = true)]
async fn failing_workout_returns_error_object() {
    let provider = Arc::new(ScriptedProvider::failing("ECONNRESET"));
    let state = state_with(provider);

    let outcome = state
        .workout
        .generate(workout_request(), ClientClass::Mobile)
        .await;

    let body = serde_json::to_value(&outcome).unwrap();
    assert_eq!(body["error"], true);
    assert_eq!(body["errorType"], "network");
    assert!(body["title"].is_string());
    assert!(state.workout.history().is_empty());
}

#[tokio::test]
async fn unparseable_workout_degrades_to_stub() {
    let provider = Arc::new(ScriptedProvider::always("Sorry, I cannot help with that."));
    let state = state_with(provider);

    let outcome = state
        .workout
        .generate(workout_request(), ClientClass::Standard)
        .await;

    let body = serde_json::to_value(&outcome).unwrap();
    assert_eq!(body["degraded"], true);
    assert_eq!(body["duration"], 30);
    assert_eq!(body["difficultyLevel"], "beginner");
}

fn frames(mut rx: tokio::sync::mpsc::Receiver<String>) -> Vec<String> {
    let mut frames = Vec::new();
    while let Ok(frame) = rx.try_recv() {
        frames.push(frame);
    }
    frames
}

#[tokio::test]
async fn workout_stream_emits_deltas_then_complete_then_done() {
    let provider = Arc::new(ScriptedProvider::always(WORKOUT_JSON));
    let state = state_with(provider);
    let (sink, rx) = ChannelSink::channel(512);

    let outcome = state
        .workout
        .generate_stream(workout_request(), ClientClass::Standard, &sink)
        .await;
    assert!(outcome.is_plan());

    let frames = frames(rx);
    assert_eq!(frames.last().map(String::as_str), Some(DONE_FRAME));

    let events: Vec<Value> = frames[..frames.len() - 1]
        .iter()
        .map(|f| serde_json::from_str(f.trim_start_matches("data: ").trim()).unwrap())
        .collect();

    let (complete, deltas) = events.split_last().unwrap();
    let streamed: String = deltas
        .iter()
        .map(|e| {
            assert_eq!(e["type"], "delta");
            e["content"].as_str().unwrap().to_string()
        })
        .collect();
    assert_eq!(streamed, WORKOUT_JSON);

    assert_eq!(complete["type"], "complete");
    assert_eq!(complete["result"]["duration"], 30);
    assert_eq!(complete["result"]["difficultyLevel"], "beginner");
    assert_eq!(
        state
            .workout
            .history()
            .recent(&workout_request().fingerprint())
            .len(),
        1
    );
}

#[tokio::test(start_paused = true)]
async fn nutrition_stream_failure_completes_with_fallback() {
    let provider = Arc::new(ScriptedProvider::failing("connection refused"));
    let state = state_with(provider);
    let (sink, rx) = ChannelSink::channel(64);

    state
        .nutrition
        .generate_stream(nutrition_request(), ClientClass::Standard, &sink)
        .await;

    let frames = frames(rx);
    assert_eq!(frames.len(), 2);
    let complete: Value =
        serde_json::from_str(frames[0].trim_start_matches("data: ").trim()).unwrap();
    assert_eq!(complete["type"], "complete");
    assert_eq!(complete["result"]["fallback"], true);
    assert_eq!(complete["result"]["dailyCalories"], 2173);
    assert_eq!(frames[1], DONE_FRAME);
}
