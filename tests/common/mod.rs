//! Shared in-process providers for integration tests

#![allow(dead_code)]

use std::collections::{HashSet, VecDeque};
use std::sync::Mutex;
use std::sync::atomic::{AtomicU32, Ordering};

use async_trait::async_trait;
use fitplan::ai::{ChatRequest, DeltaStream, LlmProvider};
use fitplan::{FitError, Result};
use serde_json::json;

pub const WORKOUT_JSON: &str = r#"{
  "title": "Leg Day",
  "description": "Lower body strength",
  "duration": 60,
  "difficultyLevel": "advanced",
  "exercises": [
    {"name": "Goblet Squat", "sets": 3, "reps": "10", "rest": "60s"},
    {"name": "Romanian Deadlift", "sets": "3", "reps": "8"}
  ],
  "notes": ["Warm up first"]
}"#;

pub const NUTRITION_JSON: &str = r#"{
  "title": "Model Nutrition Plan",
  "description": "From the model",
  "dailyCalories": 2050,
  "macros": {"protein": 150, "carbs": 200, "fat": 70, "fiber": 30},
  "meals": [{"name": "Breakfast", "time": "8:00 AM", "calories": 500}]
}"#;

/// Replays a script of completions, then repeats `then` forever.
/// Counts every call, streaming ones included.
pub struct ScriptedProvider {
    script: Mutex<VecDeque<std::result::Result<String, String>>>,
    then: std::result::Result<String, String>,
    calls: AtomicU32,
    requests: Mutex<Vec<ChatRequest>>,
}

impl ScriptedProvider {
    pub fn new(
        script: Vec<std::result::Result<&str, &str>>,
        then: std::result::Result<&str, &str>,
    ) -> Self {
        Self {
            script: Mutex::new(
                script
                    .into_iter()
                    .map(|r| r.map(String::from).map_err(String::from))
                    .collect(),
            ),
            then: then.map(String::from).map_err(String::from),
            calls: AtomicU32::new(0),
            requests: Mutex::new(Vec::new()),
        }
    }

    pub fn always(text: &str) -> Self {
        Self::new(Vec::new(), Ok(text))
    }

    pub fn failing(message: &str) -> Self {
        Self::new(Vec::new(), Err(message))
    }

    pub fn calls(&self) -> u32 {
        self.calls.load(Ordering::SeqCst)
    }

    pub fn requests(&self) -> Vec<ChatRequest> {
        self.requests.lock().unwrap().clone()
    }

    fn next(&self, request: &ChatRequest) -> Result<String> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        self.requests.lock().unwrap().push(request.clone());
        let step = self
            .script
            .lock()
            .unwrap()
            .pop_front()
            .unwrap_or_else(|| self.then.clone());
        step.map_err(FitError::LlmApi)
    }
}

fn chunked(text: &str) -> DeltaStream {
    let parts: Vec<Result<String>> = text
        .as_bytes()
        .chunks(9)
        .map(|c| Ok(String::from_utf8_lossy(c).into_owned()))
        .collect();
    Box::pin(futures::stream::iter(parts))
}

#[async_trait]
impl LlmProvider for ScriptedProvider {
    async fn complete(&self, request: &ChatRequest) -> Result<String> {
        self.next(request)
    }

    async fn stream(&self, request: &ChatRequest) -> Result<DeltaStream> {
        Ok(chunked(&self.next(request)?))
    }

    fn name(&self) -> &str {
        "scripted"
    }

    async fn health_check(&self) -> Result<bool> {
        Ok(true)
    }
}

pub const EXERCISE_POOL: &[&str] = &[
    "Goblet Squat",
    "Romanian Deadlift",
    "Push-Up",
    "Bent-Over Row",
    "Walking Lunge",
    "Kettlebell Swing",
    "Face Pull",
    "Farmer Carry",
    "Dead Bug",
    "Bird Dog",
    "Hip Thrust",
    "Step-Up",
    "Pallof Press",
    "Burpee",
    "Inverted Row",
];

/// Model stand-in that honors the "do not include" list in the system
/// prompt by picking the first unlisted pool exercises
pub struct CooperativeProvider {
    per_plan: usize,
    calls: AtomicU32,
}

impl CooperativeProvider {
    pub fn new(per_plan: usize) -> Self {
        Self {
            per_plan,
            calls: AtomicU32::new(0),
        }
    }

    fn banned(system: &str) -> HashSet<String> {
        let mut banned = HashSet::new();
        let mut in_list = false;
        for line in system.lines() {
            if line.contains("Do NOT include any of them") {
                in_list = true;
                continue;
            }
            if in_list {
                match line.strip_prefix("- ") {
                    Some(name) => {
                        banned.insert(name.trim().to_lowercase());
                    }
                    None => break,
                }
            }
        }
        banned
    }
}

#[async_trait]
impl LlmProvider for CooperativeProvider {
    async fn complete(&self, request: &ChatRequest) -> Result<String> {
        let n = self.calls.fetch_add(1, Ordering::SeqCst) + 1;
        let banned = Self::banned(&request.system);
        let exercises: Vec<_> = EXERCISE_POOL
            .iter()
            .filter(|name| !banned.contains(&name.to_lowercase()))
            .take(self.per_plan)
            .map(|name| json!({"name": name, "sets": 3, "reps": "10"}))
            .collect();

        Ok(json!({
            "title": format!("Session {n}"),
            "duration": 45,
            "difficultyLevel": "intermediate",
            "exercises": exercises,
        })
        .to_string())
    }

    async fn stream(&self, request: &ChatRequest) -> Result<DeltaStream> {
        Ok(chunked(&self.complete(request).await?))
    }

    fn name(&self) -> &str {
        "cooperative"
    }

    async fn health_check(&self) -> Result<bool> {
        Ok(true)
    }
}
