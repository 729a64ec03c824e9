//! Prompt construction for the specialist responders.

use crate::lookup::NutritionFacts;
use crate::store::model::UserProfile;

pub(crate) const HEALTH_DISCLAIMER: &str = "⚠️ I'm not a doctor. This is educational only.";

/// Which slice of the profile a responder cares about.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum ProfileView {
    Fitness,
    Nutrition,
    Health,
    Goals,
}

fn or_unknown<T: ToString>(value: &Option<T>) -> String {
    value
        .as_ref()
        .map(|v| v.to_string())
        .unwrap_or_else(|| "unknown".to_string())
}

fn or_none(value: &Option<String>) -> &str {
    match value.as_deref() {
        Some(v) if !v.trim().is_empty() => v,
        _ => "none",
    }
}

fn yes_no(value: Option<bool>) -> &'static str {
    match value {
        Some(true) => "Yes",
        Some(false) => "No",
        None => "unknown",
    }
}

fn bmi(profile: &UserProfile) -> String {
    profile
        .bmi
        .map(|b| format!("{b:.1}"))
        .unwrap_or_else(|| "unknown".to_string())
}

/// Render the profile lines relevant to `view`. Empty when there is no profile.
pub(crate) fn profile_context(profile: Option<&UserProfile>, view: ProfileView) -> String {
    let Some(p) = profile else {
        return String::new();
    };

    let lines = match view {
        ProfileView::Fitness => vec![
            format!("- Age: {}, Gender: {}", or_unknown(&p.age), or_unknown(&p.gender)),
            format!("- Fitness Level: {}", or_unknown(&p.fitness_experience)),
            format!("- Primary Goal: {}", or_unknown(&p.primary_goal)),
            format!("- Activity Level: {}", or_unknown(&p.activity_level)),
            format!("- BMI: {}", bmi(p)),
            format!("- Health Conditions: {}", or_none(&p.health_conditions)),
        ],
        ProfileView::Nutrition => vec![
            format!("- Age: {}, Gender: {}", or_unknown(&p.age), or_unknown(&p.gender)),
            format!(
                "- Weight: {}kg, Height: {}cm",
                or_unknown(&p.weight_kg),
                or_unknown(&p.height_cm)
            ),
            format!("- Primary Goal: {}", or_unknown(&p.primary_goal)),
            format!("- Activity Level: {}", or_unknown(&p.activity_level)),
            format!("- Daily Calorie Goal: {}", or_unknown(&p.daily_calorie_goal)),
            format!("- Allergies: {}", or_none(&p.allergies)),
            format!("- Health Conditions: {}", or_none(&p.health_conditions)),
        ],
        ProfileView::Health => vec![
            format!("- Age: {}, Gender: {}", or_unknown(&p.age), or_unknown(&p.gender)),
            format!("- BMI: {}", bmi(p)),
            format!("- Health Conditions: {}", or_none(&p.health_conditions)),
            format!("- Medications: {}", or_none(&p.medications)),
            format!("- Allergies: {}", or_none(&p.allergies)),
            format!(
                "- Sleep: {}h, Stress: {}",
                or_unknown(&p.sleep_hours),
                or_unknown(&p.stress_level)
            ),
            format!("- Smoking: {}", yes_no(p.smoking)),
            format!("- Activity Level: {}", or_unknown(&p.activity_level)),
        ],
        ProfileView::Goals => vec![
            format!("- Daily Calorie Goal: {}", or_unknown(&p.daily_calorie_goal)),
            format!("- Primary Goal: {}", or_unknown(&p.primary_goal)),
            format!("- Allergies: {}", or_none(&p.allergies)),
        ],
    };

    format!("User Profile Context:\n{}\n", lines.join("\n"))
}

pub(crate) fn fitness_prompt(message: &str, profile: &str, context: &str) -> String {
    format!(
        "You are a fitness coach. User says: '{message}'\n\n\
         {profile}\n\
         Context: {context}\n\n\
         Give a concise, actionable response (2-3 sentences max). \
         Be specific and encouraging. Tailor to their fitness level and goals. \
         Focus on safety and proper form."
    )
}

pub(crate) fn nutrition_prompt(message: &str, profile: &str, context: &str) -> String {
    format!(
        "You are a nutrition coach. User says: '{message}'\n\n\
         {profile}\n\
         Context: {context}\n\n\
         Give a concise, helpful response (2-3 sentences max). \
         Consider their calorie goals and dietary restrictions. \
         Be specific and actionable."
    )
}

/// The record as the prompt shows it. Also used as the body of a degraded reply.
pub(crate) fn food_summary(facts: &NutritionFacts) -> String {
    format!(
        "Food Database Results:\n\
         - Food: {}\n\
         - Serving: {}\n\
         - Calories: {}\n\
         - Protein: {}g\n\
         - Carbs: {}g\n\
         - Fat: {}g\n\
         - Fiber: {}g\n\
         - Source: {}",
        facts.name,
        facts.serving_size,
        facts.calories,
        facts.protein_g,
        facts.carbs_g,
        facts.fat_g,
        facts.fiber_g,
        facts.source,
    )
}

pub(crate) fn nutrition_data_prompt(message: &str, profile: &str, facts: &NutritionFacts) -> String {
    format!(
        "You are a nutrition coach. User asked: '{message}'\n\n\
         {profile}\n\
         {food}\n\n\
         Provide a helpful response using this food database information. \
         Give context about how this fits their goals and daily needs. \
         Be specific and actionable (2-3 sentences max).",
        food = food_summary(facts),
    )
}

pub(crate) fn health_prompt(message: &str, profile: &str, context: &str) -> String {
    format!(
        "You are a health assistant. {HEALTH_DISCLAIMER}\n\n\
         User says: '{message}'\n\n\
         {profile}\n\
         Context: {context}\n\n\
         Give a concise, helpful response (2-3 sentences max). \
         Address their specific concern with practical tips. \
         Remind them to consult healthcare professionals for serious concerns."
    )
}
