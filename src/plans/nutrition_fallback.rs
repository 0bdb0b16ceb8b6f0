//! Local Nutrition Arithmetic
//!
//! Mifflin-St Jeor calorie estimates, macro anchors and the locally
//! synthesized fallback plan. Everything here is pure arithmetic over
//! static tables: no I/O, no randomness, no failure paths.

use crate::constants::nutrition::{
    DEFAULT_ACTIVITY_MULTIPLIER, DEFAULT_CALORIES, FIBER_RATIO, REFERENCE_WEIGHT_KG,
};
use crate::types::{
    GenerationRequest, Hydration, Ingredient, Macros, Meal, NutritionPlan, NutritionalInfo,
    WeeklyMealPlan,
};

const DEFAULT_GOAL: &str = "maintenance";

/// Round half away from zero for positives, matching `Math.round` semantics
pub fn round_half_up(x: f64) -> i64 {
    (x + 0.5).floor() as i64
}

pub fn activity_multiplier(activity_level: Option<&str>) -> f64 {
    match activity_level.map(str::trim) {
        Some("sedentary") => 1.2,
        Some("light") => 1.375,
        Some("moderate") => 1.55,
        Some("active") => 1.725,
        Some("very_active") => 1.9,
        _ => DEFAULT_ACTIVITY_MULTIPLIER,
    }
}

pub fn goal_factor(goal: Option<&str>) -> f64 {
    match goal.map(str::trim) {
        Some("weight_loss") => 0.85,
        Some("muscle_gain") => 1.15,
        _ => 1.0,
    }
}

/// Mifflin-St Jeor BMR (kg, cm, years)
pub fn basal_metabolic_rate(weight: f64, height: f64, age: f64) -> f64 {
    10.0 * weight + 6.25 * height - 5.0 * age + 5.0
}

/// `round(round(bmr * activity) * goal)`; `None` without full body metrics
pub fn estimate_calories(request: &GenerationRequest) -> Option<i64> {
    let (Some(weight), Some(height), Some(age)) = (request.weight, request.height, request.age)
    else {
        return None;
    };

    let bmr = basal_metabolic_rate(weight, height, age);
    let maintenance = round_half_up(bmr * activity_multiplier(request.activity_level.as_deref()));
    Some(round_half_up(
        maintenance as f64 * goal_factor(request.effective_goal()),
    ))
}

/// Macro anchor sent to the model alongside the calorie estimate
pub fn estimate_macros(request: &GenerationRequest) -> Option<Macros> {
    let calories = estimate_calories(request)?;
    let weight = request.weight?;

    let protein_per_kg = if request.effective_goal() == Some("muscle_gain") {
        2.2
    } else {
        1.8
    };
    let protein = round_half_up(weight * protein_per_kg);
    let fat = round_half_up(calories as f64 * 0.25 / 9.0);
    let carbs = round_half_up((calories - (protein * 4 + fat * 9)) as f64 / 4.0);

    Some(Macros {
        protein,
        carbs,
        fat,
        fiber: round_half_up(carbs as f64 * FIBER_RATIO),
    })
}

/// Goal-specific macro split for the fallback plan
pub fn fallback_macros(calories: i64, weight: f64, goal: Option<&str>) -> Macros {
    let carbs_from_rest =
        |protein: i64, fat: i64| round_half_up((calories - (protein * 4 + fat * 9)) as f64 / 4.0);
    let fat_from_rest =
        |protein: i64, carbs: i64| round_half_up((calories - (protein * 4 + carbs * 4)) as f64 / 9.0);

    let (protein, mut carbs, mut fat) = match goal.map(str::trim) {
        Some("weight_loss") => {
            let protein = round_half_up(weight * 2.2);
            let fat = round_half_up(weight);
            (protein, carbs_from_rest(protein, fat), fat)
        }
        Some("muscle_gain") => {
            let protein = round_half_up(weight * 2.0);
            let carbs = round_half_up(weight * 4.0);
            (protein, carbs, fat_from_rest(protein, carbs))
        }
        _ => {
            let protein = round_half_up(weight * 1.8);
            let carbs = round_half_up(weight * 3.0);
            (protein, carbs, fat_from_rest(protein, carbs))
        }
    };

    let fat_floor = round_half_up(weight * 0.5);
    if fat < fat_floor {
        fat = fat_floor;
        carbs = carbs_from_rest(protein, fat);
    }

    Macros {
        protein,
        carbs,
        fat,
        fiber: round_half_up(carbs as f64 * FIBER_RATIO),
    }
}

/// Restrictions recognized by the substitution tables
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct DietaryFlags {
    pub vegan: bool,
    pub vegetarian: bool,
    pub gluten_free: bool,
    pub lactose_free: bool,
}

impl DietaryFlags {
    /// Substring match, case-insensitive. Vegan implies dairy-free.
    pub fn from_restrictions(restrictions: &[String]) -> Self {
        let lowered: Vec<String> = restrictions.iter().map(|r| r.to_lowercase()).collect();
        let any = |needle: &str| lowered.iter().any(|r| r.contains(needle));

        let vegan = any("vegan");
        Self {
            vegan,
            vegetarian: any("vegetarian"),
            gluten_free: any("gluten"),
            lactose_free: vegan || any("lactose") || any("dairy"),
        }
    }

    fn plant_based(&self) -> bool {
        self.vegan || self.vegetarian
    }
}

fn protein_sources(flags: DietaryFlags) -> [Ingredient; 4] {
    if flags.vegan {
        [
            Ingredient::new("Tofu", "150g", 120),
            Ingredient::new("Tempeh", "100g", 165),
            Ingredient::new("Lentils", "200g (cooked)", 230),
            Ingredient::new("Chickpeas", "200g (cooked)", 240),
        ]
    } else if flags.vegetarian {
        [
            Ingredient::new("Eggs", "3 large", 210),
            Ingredient::new("Greek Yogurt", "200g", 130),
            Ingredient::new("Cottage Cheese", "200g", 160),
            Ingredient::new("Tofu", "150g", 120),
        ]
    } else {
        [
            Ingredient::new("Chicken Breast", "150g", 165),
            Ingredient::new("Salmon", "150g", 210),
            Ingredient::new("Lean Beef", "150g", 180),
            Ingredient::new("Tuna", "150g (canned in water)", 130),
        ]
    }
}

fn carb_sources(flags: DietaryFlags) -> [Ingredient; 4] {
    if flags.gluten_free {
        [
            Ingredient::new("Brown Rice", "200g (cooked)", 220),
            Ingredient::new("Sweet Potato", "200g", 180),
            Ingredient::new("Quinoa", "150g (cooked)", 180),
            Ingredient::new("Gluten-Free Oats", "80g (dry)", 300),
        ]
    } else {
        [
            Ingredient::new("Brown Rice", "200g (cooked)", 220),
            Ingredient::new("Whole Grain Bread", "2 slices", 160),
            Ingredient::new("Oatmeal", "80g (dry)", 300),
            Ingredient::new("Sweet Potato", "200g", 180),
        ]
    }
}

fn strings(items: &[&str]) -> Vec<String> {
    items.iter().map(|s| s.to_string()).collect()
}

struct MealShare {
    name: &'static str,
    time: &'static str,
    share: f64,
    vitamins: &'static [&'static str],
    minerals: &'static [&'static str],
}

const BREAKFAST: MealShare = MealShare {
    name: "Breakfast",
    time: "8:00 AM",
    share: 0.25,
    vitamins: &["Vitamin C", "Vitamin D", "B-vitamins"],
    minerals: &["Calcium", "Iron", "Potassium"],
};

const LUNCH: MealShare = MealShare {
    name: "Lunch",
    time: "12:30 PM",
    share: 0.35,
    vitamins: &["Vitamin A", "Vitamin C", "B-vitamins"],
    minerals: &["Iron", "Zinc", "Magnesium"],
};

const DINNER: MealShare = MealShare {
    name: "Dinner",
    time: "6:30 PM",
    share: 0.30,
    vitamins: &["Vitamin K", "Vitamin E", "B-vitamins"],
    minerals: &["Calcium", "Magnesium", "Potassium"],
};

const SNACK: MealShare = MealShare {
    name: "Snack",
    time: "3:00 PM",
    share: 0.10,
    vitamins: &["Vitamin C", "Vitamin E"],
    minerals: &["Magnesium", "Potassium"],
};

fn meal(
    slot: &MealShare,
    calories: i64,
    macros: Macros,
    ingredients: Vec<Ingredient>,
    preparation: &str,
    cooking: &str,
) -> Meal {
    let portion = |grams: i64| round_half_up(grams as f64 * slot.share);
    Meal {
        name: slot.name.to_string(),
        time: slot.time.to_string(),
        calories: portion(calories),
        ingredients,
        preparation_instructions: preparation.to_string(),
        cooking_instructions: cooking.to_string(),
        nutritional_info: NutritionalInfo {
            protein: portion(macros.protein),
            carbs: portion(macros.carbs),
            fat: portion(macros.fat),
            fiber: round_half_up(macros.carbs as f64 * slot.share * FIBER_RATIO),
            vitamins: strings(slot.vitamins),
            minerals: strings(slot.minerals),
        },
    }
}

fn daily_meals(calories: i64, macros: Macros, flags: DietaryFlags) -> Vec<Meal> {
    let [p0, p1, ..] = protein_sources(flags);
    let [c0, c1, ..] = carb_sources(flags);

    let (lunch_protein, dinner_protein) = if flags.vegetarian && !flags.vegan {
        (p1, p0)
    } else {
        (p0, p1)
    };

    let breakfast = meal(
        &BREAKFAST,
        calories,
        macros,
        vec![
            if flags.plant_based() {
                Ingredient::new("Plant-Based Yogurt", "200g", 120)
            } else {
                Ingredient::new("Greek Yogurt", "200g", 130)
            },
            Ingredient::new("Berries", "100g", 50),
            Ingredient::new("Chia Seeds", "15g", 80),
            if flags.gluten_free {
                Ingredient::new("Gluten-Free Oats", "50g", 190)
            } else {
                Ingredient::new("Oatmeal", "50g", 190)
            },
        ],
        "Mix all ingredients in a bowl. For overnight oats, prepare the night before and refrigerate.",
        "No cooking required if using pre-cooked oats. Otherwise, cook oats according to package instructions.",
    );

    let lunch = meal(
        &LUNCH,
        calories,
        macros,
        vec![
            lunch_protein,
            c0,
            Ingredient::new("Mixed Vegetables", "200g", 70),
            Ingredient::new("Olive Oil", "15ml", 120),
        ],
        "Chop vegetables into bite-sized pieces. Prepare protein according to type.",
        if flags.plant_based() {
            "Stir-fry vegetables and plant protein with olive oil and seasonings."
        } else {
            "Grill protein and steam vegetables. Serve with cooked rice or grain of choice."
        },
    );

    let dinner = meal(
        &DINNER,
        calories,
        macros,
        vec![
            dinner_protein,
            c1,
            Ingredient::new("Green Leafy Vegetables", "150g", 50),
            Ingredient::new("Healthy Oil/Fat", "15ml", 120),
        ],
        "Wash and chop vegetables. Prepare protein based on type chosen.",
        "Cook protein with minimal oil. Steam or roast vegetables to preserve nutrients.",
    );

    let snack = meal(
        &SNACK,
        calories,
        macros,
        vec![
            if flags.lactose_free {
                Ingredient::new("Nuts", "30g", 180)
            } else {
                Ingredient::new("Greek Yogurt", "100g", 60)
            },
            Ingredient::new("Fruit", "1 medium piece", 80),
        ],
        "Wash fruit and portion nuts or yogurt.",
        "No cooking required.",
    );

    vec![breakfast, lunch, dinner, snack]
}

fn weekly_meal_plan() -> WeeklyMealPlan {
    WeeklyMealPlan {
        monday: strings(&[
            "Breakfast: Oatmeal Bowl",
            "Lunch: Protein with Rice",
            "Dinner: Protein with Vegetables",
        ]),
        tuesday: strings(&[
            "Breakfast: Smoothie Bowl",
            "Lunch: Protein Wrap",
            "Dinner: Stir-Fry",
        ]),
        wednesday: strings(&[
            "Breakfast: Yogurt Parfait",
            "Lunch: Grain Bowl",
            "Dinner: Protein with Sweet Potato",
        ]),
        thursday: strings(&[
            "Breakfast: Oatmeal with Fruit",
            "Lunch: Protein Salad",
            "Dinner: One-Pot Meal",
        ]),
        friday: strings(&[
            "Breakfast: Toast with Toppings",
            "Lunch: Leftovers",
            "Dinner: Protein with Grain",
        ]),
        saturday: strings(&[
            "Breakfast: Weekend Special",
            "Lunch: Meal Out (within macros)",
            "Dinner: Homemade Healthy Option",
        ]),
        sunday: strings(&[
            "Breakfast: Prep Day Special",
            "Lunch: Meal Prep",
            "Dinner: Meal Prep",
        ]),
    }
}

/// "weight_loss" -> "Weight Loss"
fn title_case(goal: &str) -> String {
    let spaced = goal.replace('_', " ");
    let mut titled = String::with_capacity(spaced.len());
    let mut at_word_start = true;
    for ch in spaced.chars() {
        if at_word_start && ch.is_alphanumeric() {
            titled.extend(ch.to_uppercase());
        } else {
            titled.push(ch);
        }
        at_word_start = !(ch.is_alphanumeric() || ch == '_');
    }
    titled
}

/// Complete, restriction-aware plan built without the model
pub fn synthesize_fallback(request: &GenerationRequest) -> NutritionPlan {
    let goal = request.effective_goal().unwrap_or(DEFAULT_GOAL).trim();
    let calories = estimate_calories(request).unwrap_or(DEFAULT_CALORIES);
    let weight = request.weight.unwrap_or(REFERENCE_WEIGHT_KG);
    let macros = fallback_macros(calories, weight, Some(goal));
    let flags = DietaryFlags::from_restrictions(&request.dietary_restrictions);

    let restrictions = request.dietary_restrictions.join(", ");
    let title = if restrictions.is_empty() {
        format!("{} Nutrition Plan", title_case(goal))
    } else {
        format!("{} Nutrition Plan ({})", title_case(goal), restrictions)
    };
    let description = format!(
        "A quick-response nutrition plan designed to support your {} goal{}.",
        goal.replace('_', " "),
        if restrictions.is_empty() {
            ""
        } else {
            ", while respecting your dietary restrictions"
        }
    );

    let mut supplements = Vec::new();
    if flags.vegan {
        supplements.push("Vitamin B12 - Essential for vegans".to_string());
    }
    supplements.extend(strings(&[
        "Vitamin D - Especially if limited sun exposure",
        "Omega-3 - For heart and brain health",
        "Protein supplement - If struggling to meet protein goals through food alone",
    ]));

    NutritionPlan {
        title,
        description,
        daily_calories: calories,
        macros,
        meals: daily_meals(calories, macros, flags),
        hydration: Hydration {
            daily_water_intake: "2-3 liters".to_string(),
            recommended_drinks: strings(&["Water", "Green Tea", "Black Coffee (in moderation)"]),
            avoid_drinks: strings(&["Sugary Sodas", "Alcohol", "High-Calorie Coffee Drinks"]),
        },
        weekly_meal_plan: weekly_meal_plan(),
        grocery_list: strings(&[
            "Protein Sources (based on restrictions)",
            "Complex Carbohydrates (based on restrictions)",
            "Vegetables (variety of colors)",
            "Fruits (seasonal options)",
            "Healthy Fats (nuts, seeds, oils)",
            "Seasonings and Spices",
        ]),
        notes: strings(&[
            "This is a quick-response meal plan. For a more detailed plan, please try again later.",
            "Adjust portion sizes to match your specific calorie needs.",
            "Stay hydrated throughout the day.",
            "Meal timing can be adjusted to fit your schedule.",
        ]),
        supplement_recommendations: supplements,
        fallback: true,
        degraded: false,
    }
}
