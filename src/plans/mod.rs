//! Plan Controllers
//!
//! Request-level orchestration on top of the model gateway: workout history
//! and the nutrition last-good store and fallback.

pub mod history;
pub mod nutrition;
pub mod nutrition_fallback;
pub mod workout;

pub use history::WorkoutHistory;
pub use nutrition::{LastGoodPlans, NutritionController, user_key, with_estimates};
pub use nutrition_fallback::{DietaryFlags, estimate_calories, estimate_macros, synthesize_fallback};
pub use workout::{WorkoutController, enforce_requested_fields};
