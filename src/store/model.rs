//! Stored records: user profiles and activity counts.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

/// A user's wellness profile. Every field except `user_id` is optional.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct UserProfile {
    #[serde(default)]
    pub user_id: String,
    #[serde(default)]
    pub age: Option<i64>,
    #[serde(default)]
    pub gender: Option<String>,
    #[serde(default)]
    pub height_cm: Option<f64>,
    #[serde(default)]
    pub weight_kg: Option<f64>,
    /// sedentary, lightly_active, moderately_active, very_active, extremely_active
    #[serde(default)]
    pub activity_level: Option<String>,
    /// weight_loss, muscle_gain, maintenance, endurance, strength
    #[serde(default)]
    pub primary_goal: Option<String>,
    /// beginner, intermediate, advanced
    #[serde(default)]
    pub fitness_experience: Option<String>,
    #[serde(default)]
    pub daily_calorie_goal: Option<i64>,
    #[serde(default)]
    pub health_conditions: Option<String>,
    #[serde(default)]
    pub medications: Option<String>,
    #[serde(default)]
    pub allergies: Option<String>,
    #[serde(default)]
    pub sleep_hours: Option<f64>,
    /// low, moderate, high
    #[serde(default)]
    pub stress_level: Option<String>,
    #[serde(default)]
    pub bmi: Option<f64>,
    #[serde(default)]
    pub smoking: Option<bool>,
}

impl UserProfile {
    pub fn new(user_id: impl Into<String>) -> Self {
        Self {
            user_id: user_id.into(),
            ..Default::default()
        }
    }
}

/// Kind of logged activity.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ActivityKind {
    Meal,
    Workout,
}

impl ActivityKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Meal => "meal",
            Self::Workout => "workout",
        }
    }
}

impl fmt::Display for ActivityKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ActivityKind {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "meal" => Ok(Self::Meal),
            "workout" => Ok(Self::Workout),
            other => Err(format!("unknown activity kind: '{other}'")),
        }
    }
}

/// Totals shown by the progress tracker.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct ActivityCounts {
    pub meals: u64,
    pub workouts: u64,
}
