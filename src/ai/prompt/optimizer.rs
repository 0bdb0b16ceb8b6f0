//! Prompt Optimizer
//!
//! Appends request-specific instructions to a base system prompt: recent
//! exercises to avoid for workouts, restriction adherence for nutrition.
//! Pure with respect to its inputs.

use std::collections::HashSet;

use super::PromptBuilder;
use crate::ai::sanitize::clean_text;
use crate::constants::sanitize::MAX_LIST_ITEM_CHARS;
use crate::types::{GenerationRequest, RequestKind};

pub struct PromptOptimizer;

impl PromptOptimizer {
    /// Base prompt plus the instructions for this request
    pub fn optimize(base: &str, kind: RequestKind, request: &GenerationRequest) -> String {
        match kind {
            RequestKind::Workout => Self::workout(base, request),
            RequestKind::Nutrition => Self::nutrition(base, request),
        }
    }

    /// Exercise names from injected history, deduplicated case-insensitively
    /// in first-seen order
    pub fn previous_exercises(request: &GenerationRequest) -> Vec<String> {
        let mut seen = HashSet::new();
        request
            .previous_workouts
            .iter()
            .flat_map(|workout| workout.exercises.iter())
            .map(|name| clean_text(name.trim(), MAX_LIST_ITEM_CHARS))
            .filter(|name| !name.is_empty())
            .filter(|name| seen.insert(name.to_lowercase()))
            .collect()
    }

    fn workout(base: &str, request: &GenerationRequest) -> String {
        let parameters = Self::workout_parameters(request);
        let previous = Self::previous_exercises(request);

        let builder = PromptBuilder::extend(base);
        let builder = if previous.is_empty() {
            builder.focus(
                "Create a fresh workout with a varied exercise selection.",
                vec![
                    "Do not fall back on the most common exercise for each muscle group.",
                    "Vary rep schemes, rest periods and training methods.",
                ],
            )
        } else {
            builder
                .list(
                    "The user recently completed these exercises. Do NOT include any of them",
                    previous,
                )
                .focus(
                    "Use different exercises that train the same muscle groups.",
                    vec!["Exercise names must not match any name in the list above, ignoring case."],
                )
        };

        if parameters.is_empty() {
            builder.build()
        } else {
            builder
                .list("Honor these parameters exactly", parameters)
                .build()
        }
    }

    fn workout_parameters(request: &GenerationRequest) -> Vec<String> {
        let mut parameters = Vec::new();
        if let Some(level) = request.level.as_deref().filter(|l| !l.trim().is_empty()) {
            parameters.push(format!("Difficulty level: {}", level));
        }
        if let Some(duration) = request.duration {
            parameters.push(format!("Duration: {} minutes", duration));
        }
        if let Some(goal) = request.effective_goal() {
            parameters.push(format!("Goal: {}", clean_text(goal, MAX_LIST_ITEM_CHARS)));
        }
        parameters
    }

    fn nutrition(base: &str, request: &GenerationRequest) -> String {
        let restrictions: Vec<String> = request
            .dietary_restrictions
            .iter()
            .map(|r| clean_text(r.trim(), MAX_LIST_ITEM_CHARS))
            .filter(|r| !r.is_empty())
            .collect();

        let builder = PromptBuilder::extend(base);
        let builder = if restrictions.is_empty() {
            builder.focus(
                "Return a complete plan.",
                vec![
                    "Fill every section of the response format.",
                    "Meal calories and macros must add up to the daily totals.",
                ],
            )
        } else {
            builder
                .list("STRICT DIETARY RESTRICTIONS", restrictions)
                .focus(
                    "Every meal, ingredient, grocery item and supplement must comply with the restrictions above.",
                    vec!["Substitute compliant ingredients rather than dropping meals."],
                )
        };

        match request.effective_goal() {
            Some(goal) => builder
                .section("Goal", &clean_text(goal, MAX_LIST_ITEM_CHARS))
                .build(),
            None => builder.build(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::PreviousWorkout;

    fn history(exercises: &[&[&str]]) -> Vec<PreviousWorkout> {
        exercises
            .iter()
            .enumerate()
            .map(|(i, names)| PreviousWorkout {
                title: format!("Plan {}", i + 1),
                exercises: names.iter().map(|n| n.to_string()).collect(),
            })
            .collect()
    }

    #[test]
    fn test_previous_exercises_deduplicated_case_insensitively() {
        let request = GenerationRequest {
            previous_workouts: history(&[&["Goblet Squat", "Push-Up"], &["push-up", "Plank", ""]]),
            ..Default::default()
        };
        assert_eq!(
            PromptOptimizer::previous_exercises(&request),
            vec!["Goblet Squat", "Push-Up", "Plank"]
        );
    }

    #[test]
    fn test_workout_with_history_lists_exclusions() {
        let request = GenerationRequest {
            level: Some("Advanced".into()),
            duration: Some(45),
            goal: Some("strength".into()),
            previous_workouts: history(&[&["Deadlift", "Bench Press"]]),
            ..Default::default()
        };
        let prompt = PromptOptimizer::optimize("BASE", RequestKind::Workout, &request);

        assert!(prompt.starts_with("BASE\n\n"));
        assert!(prompt.contains("Do NOT include any of them:\n- Deadlift\n- Bench Press"));
        assert!(prompt.contains("same muscle groups"));
        assert!(prompt.contains("Difficulty level: Advanced"));
        assert!(prompt.contains("Duration: 45 minutes"));
        assert!(prompt.contains("Goal: strength"));
    }

    #[test]
    fn test_workout_without_history_asks_for_variety() {
        let prompt =
            PromptOptimizer::optimize("BASE", RequestKind::Workout, &GenerationRequest::default());
        assert!(prompt.contains("fresh workout"));
        assert!(!prompt.contains("Do NOT include"));
        assert!(!prompt.contains("Honor these parameters"));
    }

    #[test]
    fn test_nutrition_restrictions_are_strict() {
        let request = GenerationRequest {
            dietary_restrictions: vec!["vegan".into(), "<b>gluten-free</b>".into()],
            goal: Some("weight_loss".into()),
            ..Default::default()
        };
        let prompt = PromptOptimizer::optimize("BASE", RequestKind::Nutrition, &request);
        assert!(prompt.contains("STRICT DIETARY RESTRICTIONS:\n- vegan\n- gluten-free"));
        assert!(prompt.contains("Goal:\nweight_loss"));
    }

    #[test]
    fn test_nutrition_without_restrictions_asks_for_completeness() {
        let prompt =
            PromptOptimizer::optimize("BASE", RequestKind::Nutrition, &GenerationRequest::default());
        assert!(prompt.contains("Return a complete plan."));
        assert!(!prompt.contains("STRICT"));
    }

    #[test]
    fn test_optimize_is_deterministic() {
        let request = GenerationRequest {
            previous_workouts: history(&[&["Row"]]),
            ..Default::default()
        };
        assert_eq!(
            PromptOptimizer::optimize("BASE", RequestKind::Workout, &request),
            PromptOptimizer::optimize("BASE", RequestKind::Workout, &request)
        );
    }
}
