//! Prompt Builder System
//!
//! Standardized prompt construction for plan generation.
//! Base system prompts are assembled from sections here; the optimizer
//! appends request-specific sections on top of them.

mod optimizer;

pub use optimizer::PromptOptimizer;

use crate::types::RequestKind;

/// Prompt section types
#[derive(Debug, Clone)]
pub enum PromptSection {
    /// Role definition with expertise area
    Role { expertise: String, task: String },
    /// Numbered objectives under a header
    Objectives { header: String, items: Vec<String> },
    /// Raw text section with optional header
    Text {
        header: Option<String>,
        content: String,
    },
    /// Bulleted list under a header
    List { header: String, items: Vec<String> },
    /// Focus enforcement with restrictions
    Focus {
        target: String,
        restrictions: Vec<String>,
    },
}

/// Prompt builder for consistent prompt construction
#[derive(Debug, Clone, Default)]
pub struct PromptBuilder {
    base: Option<String>,
    sections: Vec<PromptSection>,
}

impl PromptBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    /// Start from an existing prompt; new sections are appended after it
    pub fn extend(base: &str) -> Self {
        Self {
            base: Some(base.trim_end().to_string()),
            sections: Vec::new(),
        }
    }

    /// Add a role definition section
    pub fn role(mut self, expertise: &str, task: &str) -> Self {
        self.sections.push(PromptSection::Role {
            expertise: expertise.to_string(),
            task: task.to_string(),
        });
        self
    }

    /// Add numbered objectives under `header`
    pub fn objectives(mut self, header: &str, items: Vec<&str>) -> Self {
        self.sections.push(PromptSection::Objectives {
            header: header.to_string(),
            items: items.into_iter().map(String::from).collect(),
        });
        self
    }

    /// Add text section
    pub fn text(mut self, content: &str) -> Self {
        self.sections.push(PromptSection::Text {
            header: None,
            content: content.to_string(),
        });
        self
    }

    /// Add text section with header
    pub fn section(mut self, header: &str, content: &str) -> Self {
        self.sections.push(PromptSection::Text {
            header: Some(header.to_string()),
            content: content.to_string(),
        });
        self
    }

    /// Add bulleted list under `header`
    pub fn list(mut self, header: &str, items: Vec<String>) -> Self {
        self.sections.push(PromptSection::List {
            header: header.to_string(),
            items,
        });
        self
    }

    /// Add focus enforcement section
    pub fn focus(mut self, target: &str, restrictions: Vec<&str>) -> Self {
        self.sections.push(PromptSection::Focus {
            target: target.to_string(),
            restrictions: restrictions.into_iter().map(String::from).collect(),
        });
        self
    }

    /// Build the final prompt string
    pub fn build(self) -> String {
        let mut prompt = String::new();

        if let Some(base) = self.base {
            prompt.push_str(&base);
            prompt.push_str("\n\n");
        }

        for section in self.sections {
            match section {
                PromptSection::Role { expertise, task } => {
                    prompt.push_str(&format!(
                        "You are an expert {} specializing in {}.\n\n",
                        expertise, task
                    ));
                }
                PromptSection::Objectives { header, items } => {
                    prompt.push_str(&format!("{}:\n", header));
                    for (i, item) in items.iter().enumerate() {
                        prompt.push_str(&format!("{}. {}\n", i + 1, item));
                    }
                    prompt.push('\n');
                }
                PromptSection::Text { header, content } => {
                    if let Some(h) = header {
                        prompt.push_str(&format!("{}:\n", h));
                    }
                    prompt.push_str(&content);
                    prompt.push_str("\n\n");
                }
                PromptSection::List { header, items } => {
                    prompt.push_str(&format!("{}:\n", header));
                    for item in items {
                        prompt.push_str(&format!("- {}\n", item));
                    }
                    prompt.push('\n');
                }
                PromptSection::Focus {
                    target,
                    restrictions,
                } => {
                    prompt.push_str(&format!("IMPORTANT: {}\n", target));
                    for restriction in restrictions {
                        prompt.push_str(&format!("- {}\n", restriction));
                    }
                    prompt.push('\n');
                }
            }
        }

        prompt.trim_end().to_string()
    }
}

const WORKOUT_SCHEMA: &str = r#"{
    "title": "string",
    "description": "string",
    "duration": "number",
    "difficultyLevel": "string",
    "schedule": ["string"],
    "warmup": [{"name": "string", "duration": "string", "instructions": "string"}],
    "exercises": [
        {
            "name": "string",
            "sets": "number",
            "reps": "string",
            "rest": "string",
            "tempo": "string",
            "instructions": "string",
            "muscleGroups": ["string"],
            "equipment": ["string"],
            "alternatives": ["string"],
            "progressionTips": "string"
        }
    ],
    "cooldown": [{"name": "string", "duration": "string", "instructions": "string"}],
    "progressionPlan": {"week1": "string", "week2": "string", "week3": "string", "week4": "string"},
    "notes": ["string"]
}"#;

const NUTRITION_SCHEMA: &str = r#"{
    "title": "string",
    "description": "string (keep brief)",
    "dailyCalories": number,
    "macros": {"protein": number, "carbs": number, "fat": number, "fiber": number},
    "meals": [
        {
            "name": "string",
            "time": "string",
            "calories": number,
            "ingredients": [{"name": "string", "amount": "string", "calories": number}],
            "preparationInstructions": "string (brief)",
            "cookingInstructions": "string (brief)",
            "nutritionalInfo": {
                "protein": number,
                "carbs": number,
                "fat": number,
                "fiber": number,
                "vitamins": ["string"],
                "minerals": ["string"]
            }
        }
    ],
    "hydration": {"dailyWaterIntake": "string", "recommendedDrinks": ["string"], "avoidDrinks": ["string"]},
    "weeklyMealPlan": {
        "monday": ["string"], "tuesday": ["string"], "wednesday": ["string"], "thursday": ["string"],
        "friday": ["string"], "saturday": ["string"], "sunday": ["string"]
    },
    "groceryList": ["string"],
    "notes": ["string"],
    "supplementRecommendations": ["string"]
}"#;

/// Base system prompts per request kind
pub struct PromptTemplates;

impl PromptTemplates {
    pub fn for_kind(kind: RequestKind) -> String {
        match kind {
            RequestKind::Workout => Self::workout(),
            RequestKind::Nutrition => Self::nutrition(),
        }
    }

    pub fn workout() -> String {
        PromptBuilder::new()
            .role(
                "fitness trainer and workout plan generator",
                "exercise science, kinesiology and athletic training",
            )
            .text(
                "Generate a detailed workout plan from the user's input. Apply progressive \
                 overload, sensible periodization and exercise variety.",
            )
            .objectives(
                "CRITICAL INSTRUCTIONS",
                vec![
                    "Respond with a single JSON object and no text before or after it.",
                    "Pick exercises that serve the user's goal and fitness level.",
                    "Beginners get fundamental movements with an emphasis on form.",
                    "Intermediate and advanced users get more complex exercises.",
                    "Never include exercises that conflict with the user's restrictions or available equipment.",
                    "Recommend specific loads or resistance for the fitness level.",
                    "Keep short workouts (under 30 minutes) efficient.",
                    "Give exact tempo instructions.",
                ],
            )
            .objectives(
                "VARIETY",
                vec![
                    "Select different exercises for each muscle group every time.",
                    "Vary rep schemes, sets and rest periods.",
                    "Use different training methods such as supersets, drop sets and circuits.",
                    "Create distinct progression patterns.",
                ],
            )
            .section("The response must use this JSON format", WORKOUT_SCHEMA)
            .build()
    }

    pub fn nutrition() -> String {
        PromptBuilder::new()
            .role("nutritionist", "fast, accurate meal plan generation")
            .text("Create a personalized meal plan from the user's input data.")
            .objectives(
                "SPEED",
                vec![
                    "Respond with valid JSON only, no text before or after it.",
                    "Prioritize the main meals and accurate macros.",
                    "Use estimatedCalories and estimatedMacros from the input when present.",
                    "Keep meal instructions brief but clear.",
                    "Use standard measurements and portion sizes.",
                    "Plan 3-4 core meals with 3-5 ingredients each.",
                ],
            )
            .objectives(
                "CRITICAL REQUIREMENTS",
                vec![
                    "Always adhere to dietary restrictions (vegetarian, vegan, gluten-free and so on).",
                    "Balance macronutrients for the stated goal.",
                    "Include at least 0.8g protein per kg of bodyweight.",
                    "Provide 25-35g of fiber daily.",
                    "Use practical, everyday ingredients with exact gram or ounce amounts.",
                    "Never exceed the estimated daily calories without explanation.",
                    "Avoid repeating the same meals throughout the week.",
                ],
            )
            .section("RESPONSE FORMAT: return a JSON object with this structure", NUTRITION_SCHEMA)
            .build()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_basic_prompt() {
        let prompt = PromptBuilder::new()
            .role("coach", "strength training")
            .objectives("GOALS", vec!["Build strength", "Stay safe"])
            .build();

        assert!(prompt.contains("You are an expert coach specializing in strength training."));
        assert!(prompt.contains("GOALS:\n1. Build strength\n2. Stay safe"));
    }

    #[test]
    fn test_extend_keeps_base_first() {
        let prompt = PromptBuilder::extend("BASE PROMPT\n")
            .list("Avoid", vec!["Squat".to_string()])
            .focus("Stay on topic", vec!["No prose"])
            .build();

        assert!(prompt.starts_with("BASE PROMPT\n\nAvoid:\n- Squat"));
        assert!(prompt.ends_with("IMPORTANT: Stay on topic\n- No prose"));
    }

    #[test]
    fn test_templates_carry_schema() {
        let workout = PromptTemplates::for_kind(RequestKind::Workout);
        assert!(workout.contains("\"progressionPlan\""));
        assert!(workout.contains("single JSON object"));

        let nutrition = PromptTemplates::for_kind(RequestKind::Nutrition);
        assert!(nutrition.contains("\"weeklyMealPlan\""));
        assert!(nutrition.contains("estimatedCalories"));
    }
}
