pub mod error;
mod lenient;
pub mod plan;
pub mod request;

pub use error::{ErrorCategory, ErrorClassifier, FitError, LlmError, Result};
pub use plan::{
    ErrorObject, Exercise, GenerationOutcome, Hydration, Ingredient, Macros, Meal, NutritionPlan,
    NutritionalInfo, Plan, ProgressionPlan, TimedActivity, WeeklyMealPlan, WorkoutPlan,
};
pub use request::{ClientClass, GenerationRequest, PreviousWorkout, RequestKind};
