//! Generation requests as they arrive from the HTTP layer.

use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};

use super::lenient;
use super::plan::Macros;

/// Which plan a request asks for. Set by the caller, never inferred from
/// prompt text.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RequestKind {
    Workout,
    Nutrition,
}

impl std::fmt::Display for RequestKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            RequestKind::Workout => write!(f, "workout"),
            RequestKind::Nutrition => write!(f, "nutrition"),
        }
    }
}

/// Network class of the calling client; selects timeout, retry policy and
/// token budget.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ClientClass {
    #[default]
    Standard,
    Mobile,
}

impl ClientClass {
    pub fn from_mobile_flag(is_mobile: bool) -> Self {
        if is_mobile { Self::Mobile } else { Self::Standard }
    }
}

impl std::fmt::Display for ClientClass {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ClientClass::Standard => write!(f, "standard"),
            ClientClass::Mobile => write!(f, "mobile"),
        }
    }
}

/// Summary of an earlier plan, used to steer the model toward new exercises
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct PreviousWorkout {
    #[serde(deserialize_with = "lenient::string")]
    pub title: String,
    #[serde(deserialize_with = "lenient::string_list")]
    pub exercises: Vec<String>,
}

/// Caller input for a single generation.
///
/// Range and enum validation happens upstream; fields here are only decoded
/// leniently (numbers may arrive as strings) and sanitized before they reach
/// the model.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct GenerationRequest {
    #[serde(
        deserialize_with = "lenient::opt_f64",
        skip_serializing_if = "Option::is_none"
    )]
    pub weight: Option<f64>,
    #[serde(
        deserialize_with = "lenient::opt_f64",
        skip_serializing_if = "Option::is_none"
    )]
    pub height: Option<f64>,
    #[serde(
        deserialize_with = "lenient::opt_f64",
        skip_serializing_if = "Option::is_none"
    )]
    pub age: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub gender: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub goal: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub fitness_goal: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub activity_level: Option<String>,
    /// Echoed back verbatim as the plan's `difficultyLevel`
    #[serde(skip_serializing_if = "Option::is_none")]
    pub level: Option<String>,
    /// Minutes; echoed back verbatim as the plan's `duration`
    #[serde(
        deserialize_with = "lenient::opt_unsigned",
        skip_serializing_if = "Option::is_none"
    )]
    pub duration: Option<u32>,
    #[serde(
        deserialize_with = "lenient::string_list",
        skip_serializing_if = "Vec::is_empty"
    )]
    pub equipment: Vec<String>,
    #[serde(
        deserialize_with = "lenient::string_list",
        skip_serializing_if = "Vec::is_empty"
    )]
    pub restrictions: Vec<String>,
    #[serde(
        deserialize_with = "lenient::string_list",
        skip_serializing_if = "Vec::is_empty"
    )]
    pub dietary_restrictions: Vec<String>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub previous_workouts: Vec<PreviousWorkout>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub estimated_calories: Option<i64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub estimated_macros: Option<Macros>,
    #[serde(skip_serializing_if = "std::ops::Not::not")]
    pub is_mobile: bool,
    #[serde(skip_serializing_if = "std::ops::Not::not")]
    pub disable_caching: bool,
}

impl GenerationRequest {
    /// Goal used by prompts: `goal`, falling back to `fitnessGoal`
    pub fn effective_goal(&self) -> Option<&str> {
        self.goal
            .as_deref()
            .or(self.fitness_goal.as_deref())
            .filter(|g| !g.trim().is_empty())
    }

    /// Stable key derived from the stated inputs.
    ///
    /// Injected history is excluded so that the key does not drift as the
    /// history grows. Two people with identical inputs share a key.
    pub fn fingerprint(&self) -> String {
        let mut keyed = self.clone();
        keyed.previous_workouts.clear();
        let canonical = serde_json::to_string(&keyed).unwrap_or_default();
        let mut hasher = Sha256::new();
        hasher.update(canonical.as_bytes());
        format!("{:x}", hasher.finalize())
    }
}
