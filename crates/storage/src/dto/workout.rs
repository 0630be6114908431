use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;
use validator::Validate;

/// Request payload for recording a workout.
///
/// Label fields stay plain strings here so an unknown value surfaces as a
/// field-level validation error rather than a JSON decoding failure.
#[derive(Debug, Clone, Serialize, Deserialize, Validate, ToSchema)]
pub struct CreateWorkoutRequest {
    pub date: NaiveDate,

    #[serde(default)]
    #[validate(range(min = 0, max = 10000))]
    pub kettlebell_swings: i64,

    #[serde(default)]
    #[validate(range(min = 0, max = 100))]
    pub turkish_get_ups: i64,

    #[serde(default = "default_weight_kg")]
    #[validate(range(exclusive_min = 0.0, max = 200.0))]
    pub swing_weight_kg: f64,

    #[serde(default = "default_swing_style")]
    #[schema(example = "2-handed")]
    pub swing_style: String,

    #[serde(default = "default_workout_type")]
    #[schema(example = "EMOM")]
    pub swing_workout_type: String,

    #[serde(default = "default_weight_kg")]
    #[validate(range(exclusive_min = 0.0, max = 200.0))]
    pub getup_weight_1_kg: f64,

    #[serde(default)]
    #[validate(range(min = 0, max = 100))]
    pub getup_reps_1: i64,

    #[serde(default)]
    #[validate(range(exclusive_min = 0.0, max = 200.0))]
    pub getup_weight_2_kg: Option<f64>,

    #[serde(default)]
    #[validate(range(min = 0, max = 100))]
    pub getup_reps_2: i64,

    #[serde(default = "default_workout_type")]
    #[schema(example = "Standard")]
    pub getup_workout_type: String,
}

fn default_weight_kg() -> f64 {
    16.0
}

fn default_swing_style() -> String {
    "2-handed".to_string()
}

fn default_workout_type() -> String {
    "Standard".to_string()
}

/// Confirmation body returned after a delete.
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct MessageResponse {
    pub message: String,
}

impl MessageResponse {
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
        }
    }
}
