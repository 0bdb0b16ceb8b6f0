//! Plan schemas and pipeline outcomes.
//!
//! Every field carries a default so that partially formed model output still
//! yields a complete, renderable plan.

use serde::{Deserialize, Serialize};
use serde_json::Value;

use super::error::{ErrorClassifier, FitError, Result};
use super::lenient;
use super::request::RequestKind;

fn is_false(flag: &bool) -> bool {
    !*flag
}

// =============================================================================
// Workout Plan
// =============================================================================

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct WorkoutPlan {
    #[serde(deserialize_with = "lenient::string")]
    pub title: String,
    #[serde(deserialize_with = "lenient::string")]
    pub description: String,
    #[serde(deserialize_with = "lenient::unsigned")]
    pub duration: u32,
    #[serde(deserialize_with = "lenient::string")]
    pub difficulty_level: String,
    #[serde(deserialize_with = "lenient::string_list")]
    pub schedule: Vec<String>,
    #[serde(deserialize_with = "lenient::list")]
    pub warmup: Vec<TimedActivity>,
    #[serde(deserialize_with = "lenient::list")]
    pub exercises: Vec<Exercise>,
    #[serde(deserialize_with = "lenient::list")]
    pub cooldown: Vec<TimedActivity>,
    #[serde(deserialize_with = "lenient::object")]
    pub progression_plan: ProgressionPlan,
    #[serde(deserialize_with = "lenient::string_list")]
    pub notes: Vec<String>,
    #[serde(skip_serializing_if = "is_false")]
    pub degraded: bool,
}

/// Warm-up or cool-down item
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct TimedActivity {
    #[serde(deserialize_with = "lenient::string")]
    pub name: String,
    #[serde(deserialize_with = "lenient::string")]
    pub duration: String,
    #[serde(deserialize_with = "lenient::string")]
    pub instructions: String,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct Exercise {
    #[serde(deserialize_with = "lenient::string")]
    pub name: String,
    #[serde(deserialize_with = "lenient::unsigned")]
    pub sets: u32,
    #[serde(deserialize_with = "lenient::string")]
    pub reps: String,
    #[serde(deserialize_with = "lenient::string")]
    pub rest: String,
    #[serde(deserialize_with = "lenient::string")]
    pub tempo: String,
    #[serde(deserialize_with = "lenient::string")]
    pub instructions: String,
    #[serde(deserialize_with = "lenient::string_list")]
    pub muscle_groups: Vec<String>,
    #[serde(deserialize_with = "lenient::string_list")]
    pub equipment: Vec<String>,
    #[serde(deserialize_with = "lenient::string_list")]
    pub alternatives: Vec<String>,
    #[serde(deserialize_with = "lenient::string")]
    pub progression_tips: String,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ProgressionPlan {
    #[serde(deserialize_with = "lenient::string")]
    pub week1: String,
    #[serde(deserialize_with = "lenient::string")]
    pub week2: String,
    #[serde(deserialize_with = "lenient::string")]
    pub week3: String,
    #[serde(deserialize_with = "lenient::string")]
    pub week4: String,
}

impl WorkoutPlan {
    /// Minimal plan returned when model output cannot be parsed
    pub fn degraded_stub() -> Self {
        let activity = |name: &str, duration: &str, instructions: &str| TimedActivity {
            name: name.to_string(),
            duration: duration.to_string(),
            instructions: instructions.to_string(),
        };
        let exercise = |name: &str, muscles: &[&str]| Exercise {
            name: name.to_string(),
            sets: 3,
            reps: "10-12".to_string(),
            rest: "60 seconds".to_string(),
            tempo: "2-0-2-0".to_string(),
            instructions: "Move with control through the full range of motion.".to_string(),
            muscle_groups: muscles.iter().map(|m| m.to_string()).collect(),
            equipment: vec!["Bodyweight".to_string()],
            alternatives: Vec::new(),
            progression_tips: String::new(),
        };

        Self {
            title: "Generated Plan".to_string(),
            description: "A basic plan was generated, but some details may be missing due to technical issues.".to_string(),
            warmup: vec![activity("Light Cardio", "5 minutes", "March or jog in place at an easy pace.")],
            exercises: vec![
                exercise("Bodyweight Squat", &["Quadriceps", "Glutes"]),
                exercise("Push-Up", &["Chest", "Triceps"]),
                exercise("Plank", &["Core"]),
            ],
            cooldown: vec![activity("Full Body Stretch", "5 minutes", "Hold each stretch for 20-30 seconds.")],
            notes: vec!["This is a fallback plan due to data processing issues. Please try again later.".to_string()],
            degraded: true,
            ..Default::default()
        }
    }

    /// Exercise names in plan order
    pub fn exercise_names(&self) -> Vec<String> {
        self.exercises.iter().map(|e| e.name.clone()).collect()
    }
}

// =============================================================================
// Nutrition Plan
// =============================================================================

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct NutritionPlan {
    #[serde(deserialize_with = "lenient::string")]
    pub title: String,
    #[serde(deserialize_with = "lenient::string")]
    pub description: String,
    #[serde(deserialize_with = "lenient::integer")]
    pub daily_calories: i64,
    #[serde(deserialize_with = "lenient::object")]
    pub macros: Macros,
    #[serde(deserialize_with = "lenient::list")]
    pub meals: Vec<Meal>,
    #[serde(deserialize_with = "lenient::object")]
    pub hydration: Hydration,
    #[serde(deserialize_with = "lenient::object")]
    pub weekly_meal_plan: WeeklyMealPlan,
    #[serde(deserialize_with = "lenient::string_list")]
    pub grocery_list: Vec<String>,
    #[serde(deserialize_with = "lenient::string_list")]
    pub notes: Vec<String>,
    #[serde(deserialize_with = "lenient::string_list")]
    pub supplement_recommendations: Vec<String>,
    /// Synthesized locally without the model
    #[serde(skip_serializing_if = "is_false")]
    pub fallback: bool,
    #[serde(skip_serializing_if = "is_false")]
    pub degraded: bool,
}

/// Daily macronutrient targets in grams
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Macros {
    #[serde(deserialize_with = "lenient::integer")]
    pub protein: i64,
    #[serde(deserialize_with = "lenient::integer")]
    pub carbs: i64,
    #[serde(deserialize_with = "lenient::integer")]
    pub fat: i64,
    #[serde(deserialize_with = "lenient::integer")]
    pub fiber: i64,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct Meal {
    #[serde(deserialize_with = "lenient::string")]
    pub name: String,
    #[serde(deserialize_with = "lenient::string")]
    pub time: String,
    #[serde(deserialize_with = "lenient::integer")]
    pub calories: i64,
    #[serde(deserialize_with = "lenient::list")]
    pub ingredients: Vec<Ingredient>,
    #[serde(deserialize_with = "lenient::string")]
    pub preparation_instructions: String,
    #[serde(deserialize_with = "lenient::string")]
    pub cooking_instructions: String,
    #[serde(deserialize_with = "lenient::object")]
    pub nutritional_info: NutritionalInfo,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Ingredient {
    #[serde(deserialize_with = "lenient::string")]
    pub name: String,
    #[serde(deserialize_with = "lenient::string")]
    pub amount: String,
    #[serde(deserialize_with = "lenient::integer")]
    pub calories: i64,
}

impl Ingredient {
    pub fn new(name: &str, amount: &str, calories: i64) -> Self {
        Self {
            name: name.to_string(),
            amount: amount.to_string(),
            calories,
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct NutritionalInfo {
    #[serde(deserialize_with = "lenient::integer")]
    pub protein: i64,
    #[serde(deserialize_with = "lenient::integer")]
    pub carbs: i64,
    #[serde(deserialize_with = "lenient::integer")]
    pub fat: i64,
    #[serde(deserialize_with = "lenient::integer")]
    pub fiber: i64,
    #[serde(deserialize_with = "lenient::string_list")]
    pub vitamins: Vec<String>,
    #[serde(deserialize_with = "lenient::string_list")]
    pub minerals: Vec<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct Hydration {
    #[serde(deserialize_with = "lenient::string")]
    pub daily_water_intake: String,
    #[serde(deserialize_with = "lenient::string_list")]
    pub recommended_drinks: Vec<String>,
    #[serde(deserialize_with = "lenient::string_list")]
    pub avoid_drinks: Vec<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct WeeklyMealPlan {
    #[serde(deserialize_with = "lenient::string_list")]
    pub monday: Vec<String>,
    #[serde(deserialize_with = "lenient::string_list")]
    pub tuesday: Vec<String>,
    #[serde(deserialize_with = "lenient::string_list")]
    pub wednesday: Vec<String>,
    #[serde(deserialize_with = "lenient::string_list")]
    pub thursday: Vec<String>,
    #[serde(deserialize_with = "lenient::string_list")]
    pub friday: Vec<String>,
    #[serde(deserialize_with = "lenient::string_list")]
    pub saturday: Vec<String>,
    #[serde(deserialize_with = "lenient::string_list")]
    pub sunday: Vec<String>,
}

impl NutritionPlan {
    /// Minimal plan returned when model output cannot be parsed
    pub fn degraded_stub() -> Self {
        Self {
            title: "Generated Plan".to_string(),
            description: "A basic plan was generated, but some details may be missing due to technical issues.".to_string(),
            daily_calories: 2000,
            macros: Macros {
                protein: 150,
                carbs: 200,
                fat: 70,
                fiber: 30,
            },
            meals: vec![Meal {
                name: "Basic Meal".to_string(),
                time: "8:00 AM".to_string(),
                calories: 500,
                ingredients: vec![
                    Ingredient::new("Protein Source", "100g", 200),
                    Ingredient::new("Carbs Source", "100g", 200),
                ],
                nutritional_info: NutritionalInfo {
                    protein: 30,
                    carbs: 50,
                    fat: 15,
                    fiber: 5,
                    ..Default::default()
                },
                ..Default::default()
            }],
            notes: vec!["This is a fallback plan due to data processing issues. Please try again later.".to_string()],
            degraded: true,
            ..Default::default()
        }
    }
}

// =============================================================================
// Plan
// =============================================================================

/// A generated plan. Serializes as the bare plan object.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(untagged)]
pub enum Plan {
    Workout(WorkoutPlan),
    Nutrition(NutritionPlan),
}

impl Plan {
    /// Decode a repaired JSON object into the schema for `kind`
    pub fn from_value(kind: RequestKind, value: Value) -> Result<Self> {
        if !value.is_object() {
            return Err(FitError::parse(
                "plan is not a JSON object",
                &value.to_string(),
            ));
        }
        match kind {
            RequestKind::Workout => Ok(Plan::Workout(serde_json::from_value(value)?)),
            RequestKind::Nutrition => Ok(Plan::Nutrition(serde_json::from_value(value)?)),
        }
    }

    /// Degraded stub for `kind`
    pub fn degraded(kind: RequestKind) -> Self {
        match kind {
            RequestKind::Workout => Plan::Workout(WorkoutPlan::degraded_stub()),
            RequestKind::Nutrition => Plan::Nutrition(NutritionPlan::degraded_stub()),
        }
    }

    pub fn title(&self) -> &str {
        match self {
            Plan::Workout(plan) => &plan.title,
            Plan::Nutrition(plan) => &plan.title,
        }
    }

    pub fn as_workout(&self) -> Option<&WorkoutPlan> {
        match self {
            Plan::Workout(plan) => Some(plan),
            Plan::Nutrition(_) => None,
        }
    }

    pub fn as_workout_mut(&mut self) -> Option<&mut WorkoutPlan> {
        match self {
            Plan::Workout(plan) => Some(plan),
            Plan::Nutrition(_) => None,
        }
    }

    pub fn as_nutrition(&self) -> Option<&NutritionPlan> {
        match self {
            Plan::Nutrition(plan) => Some(plan),
            Plan::Workout(_) => None,
        }
    }
}

// =============================================================================
// Outcome
// =============================================================================

/// Terminal, user-visible failure. Always renderable, never thrown.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ErrorObject {
    pub error: bool,
    pub error_type: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error_message: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
}

impl ErrorObject {
    /// Error object for a pipeline whose retry budget ran out
    pub fn from_error(err: &FitError) -> Self {
        let classified = ErrorClassifier::classify_error(err, "fitplan");
        Self {
            error: true,
            error_type: classified.category.error_type().to_string(),
            error_message: Some(err.to_string()),
            title: Some("Connection Error".to_string()),
            description: Some(
                "Unable to generate content due to connection issues. Please try again later when your internet connection is more stable."
                    .to_string(),
            ),
        }
    }
}

/// Where a generation ended up
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(untagged)]
pub enum GenerationOutcome {
    /// Model output repaired and decoded
    Plan(Plan),
    /// Not a fresh model plan: the stub for unparseable output, or a
    /// remembered or synthesized nutrition plan
    Degraded(Plan),
    /// Retry budget exhausted
    Failed(ErrorObject),
}

impl GenerationOutcome {
    pub fn is_plan(&self) -> bool {
        matches!(self, GenerationOutcome::Plan(_))
    }

    pub fn plan(&self) -> Option<&Plan> {
        match self {
            GenerationOutcome::Plan(plan) | GenerationOutcome::Degraded(plan) => Some(plan),
            GenerationOutcome::Failed(_) => None,
        }
    }

    pub fn plan_mut(&mut self) -> Option<&mut Plan> {
        match self {
            GenerationOutcome::Plan(plan) | GenerationOutcome::Degraded(plan) => Some(plan),
            GenerationOutcome::Failed(_) => None,
        }
    }
}
