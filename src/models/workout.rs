//! Workout, planned exercise and exercise template models.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use sqlx::FromRow;
use uuid::Uuid;
use validator::Validate;

#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct Workout {
    pub id: String,
    pub user_id: String,
    pub name: String,
    pub description: Option<String>,
    /// Workout style, e.g. "hiit", "strength", "conditioning".
    pub workout_type: String,
    pub duration_minutes: Option<i32>,
    pub difficulty_level: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Workout {
    pub fn new(user_id: String, name: String, workout_type: String) -> Self {
        let now = Utc::now();
        Self {
            id: Uuid::new_v4().to_string(),
            user_id,
            name,
            description: None,
            workout_type,
            duration_minutes: None,
            difficulty_level: None,
            created_at: now,
            updated_at: now,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct WorkoutExercise {
    pub id: String,
    pub workout_id: String,
    pub exercise_name: String,
    pub exercise_type: String,
    pub sets: Option<i32>,
    /// Free-form rep prescription: "10", "10-12", "30 seconds", "AMRAP".
    pub reps: Option<String>,
    pub weight_percentage: Option<f64>,
    pub rest_time_seconds: Option<i32>,
    pub notes: Option<String>,
    pub order_index: i32,
    pub equipment_required: Option<String>,
}

impl WorkoutExercise {
    pub fn new(workout_id: String, exercise_name: String, exercise_type: String, order_index: i32) -> Self {
        Self {
            id: Uuid::new_v4().to_string(),
            workout_id,
            exercise_name,
            exercise_type,
            sets: None,
            reps: None,
            weight_percentage: None,
            rest_time_seconds: None,
            notes: None,
            order_index,
            equipment_required: None,
        }
    }
}

/// Global exercise library entry.
#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct ExerciseTemplate {
    pub id: String,
    pub name: String,
    pub category: String,
    pub muscle_groups: Value,
    pub equipment_required: Option<String>,
    pub difficulty_level: Option<String>,
    pub description: Option<String>,
    pub instructions: Option<String>,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct WorkoutResponse {
    #[serde(flatten)]
    pub workout: Workout,
    pub exercises: Vec<WorkoutExercise>,
}

#[derive(Debug, Deserialize, Validate)]
pub struct CreateWorkoutRequest {
    #[validate(length(min = 1, max = 200))]
    pub name: String,
    pub description: Option<String>,
    #[validate(length(min = 1, max = 50))]
    pub workout_type: String,
    #[validate(range(min = 1, max = 600))]
    pub duration_minutes: Option<i32>,
    pub difficulty_level: Option<String>,
    #[serde(default)]
    pub exercises: Vec<CreateWorkoutExercise>,
}

#[derive(Debug, Deserialize, Validate)]
pub struct CreateWorkoutExercise {
    #[validate(length(min = 1, max = 200))]
    pub exercise_name: String,
    #[validate(length(min = 1, max = 50))]
    pub exercise_type: String,
    pub sets: Option<i32>,
    pub reps: Option<String>,
    pub weight_percentage: Option<f64>,
    pub rest_time_seconds: Option<i32>,
    pub notes: Option<String>,
    pub equipment_required: Option<String>,
}

#[derive(Debug, Deserialize, Validate)]
pub struct UpdateWorkoutRequest {
    #[validate(length(min = 1, max = 200))]
    pub name: Option<String>,
    pub description: Option<String>,
    #[validate(length(min = 1, max = 50))]
    pub workout_type: Option<String>,
    #[validate(range(min = 1, max = 600))]
    pub duration_minutes: Option<i32>,
    pub difficulty_level: Option<String>,
}

/// Parameters accepted by the generation endpoint.
#[derive(Debug, Deserialize, Validate)]
pub struct GenerateWorkoutRequest {
    #[serde(default = "default_workout_type")]
    pub workout_type: String,
    #[serde(default = "default_duration")]
    #[validate(range(min = 5, max = 180))]
    pub duration_minutes: i32,
    #[serde(default)]
    pub focus_areas: Vec<String>,
    #[serde(default)]
    pub available_equipment: Vec<String>,
    #[serde(default = "default_use_ai")]
    pub use_ai: bool,
}

fn default_workout_type() -> String {
    "hiit".to_string()
}

fn default_duration() -> i32 {
    30
}

fn default_use_ai() -> bool {
    true
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn generate_request_defaults() {
        let request: GenerateWorkoutRequest = serde_json::from_str("{}").unwrap();
        assert_eq!(request.workout_type, "hiit");
        assert_eq!(request.duration_minutes, 30);
        assert!(request.use_ai);
        assert!(request.focus_areas.is_empty());
    }

    #[test]
    fn generate_request_rejects_tiny_duration() {
        let request: GenerateWorkoutRequest =
            serde_json::from_str(r#"{"duration_minutes": 2}"#).unwrap();
        assert!(request.validate().is_err());
    }

    #[test]
    fn workout_response_flattens_workout_fields() {
        let workout = Workout::new("user-1".into(), "Leg Day".into(), "strength".into());
        let response = WorkoutResponse {
            workout,
            exercises: vec![],
        };
        let json = serde_json::to_value(&response).unwrap();
        assert_eq!(json["name"], "Leg Day");
        assert!(json["exercises"].as_array().unwrap().is_empty());
    }
}
