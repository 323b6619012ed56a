//! User fitness profile used to personalize generation and records.

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use sqlx::FromRow;
use uuid::Uuid;
use validator::Validate;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, sqlx::Type)]
#[sqlx(type_name = "TEXT", rename_all = "snake_case")]
#[serde(rename_all = "snake_case")]
pub enum FitnessLevel {
    Beginner,
    Intermediate,
    Advanced,
}

impl FitnessLevel {
    pub fn as_str(&self) -> &'static str {
        match self {
            FitnessLevel::Beginner => "beginner",
            FitnessLevel::Intermediate => "intermediate",
            FitnessLevel::Advanced => "advanced",
        }
    }
}

/// Informal body-type bucket used by the rule-based recommendations.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, sqlx::Type)]
#[sqlx(type_name = "TEXT", rename_all = "snake_case")]
#[serde(rename_all = "snake_case")]
pub enum Somatotype {
    Ectomorph,
    Mesomorph,
    Endomorph,
}

impl Somatotype {
    pub fn as_str(&self) -> &'static str {
        match self {
            Somatotype::Ectomorph => "ectomorph",
            Somatotype::Mesomorph => "mesomorph",
            Somatotype::Endomorph => "endomorph",
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct UserProfile {
    pub id: String,
    pub user_id: String,
    pub fitness_level: FitnessLevel,
    pub body_type: Option<Somatotype>,
    pub fitness_goals: Value,
    pub available_equipment: Value,
    pub workout_preferences: Value,
    pub height_cm: Option<i32>,
    pub weight_kg: Option<f64>,
    pub date_of_birth: Option<NaiveDate>,
    pub gender: Option<String>,
    /// Unit stamped onto weight personal records ("kg" or "lbs").
    pub preferred_weight_unit: String,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl UserProfile {
    pub fn new(user_id: String, fitness_level: FitnessLevel) -> Self {
        let now = Utc::now();
        Self {
            id: Uuid::new_v4().to_string(),
            user_id,
            fitness_level,
            body_type: None,
            fitness_goals: Value::Array(vec![]),
            available_equipment: Value::Array(vec![]),
            workout_preferences: Value::Object(Default::default()),
            height_cm: None,
            weight_kg: None,
            date_of_birth: None,
            gender: None,
            preferred_weight_unit: "kg".into(),
            created_at: now,
            updated_at: now,
        }
    }
}

#[derive(Debug, Deserialize, Validate)]
pub struct UpsertProfileRequest {
    pub fitness_level: FitnessLevel,
    pub body_type: Option<Somatotype>,
    pub fitness_goals: Option<Vec<String>>,
    pub available_equipment: Option<Vec<String>>,
    pub workout_preferences: Option<Value>,
    #[validate(range(min = 50, max = 300))]
    pub height_cm: Option<i32>,
    #[validate(range(min = 20.0, max = 500.0))]
    pub weight_kg: Option<f64>,
    pub date_of_birth: Option<NaiveDate>,
    pub gender: Option<String>,
    pub preferred_weight_unit: Option<String>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn fitness_level_serde_snake_case() {
        let level: FitnessLevel = serde_json::from_str("\"beginner\"").unwrap();
        assert_eq!(level, FitnessLevel::Beginner);
        let value = serde_json::to_value(FitnessLevel::Advanced).unwrap();
        assert_eq!(value, serde_json::json!("advanced"));
    }

    #[test]
    fn new_profile_defaults_to_kg() {
        let profile = UserProfile::new("user-1".into(), FitnessLevel::Intermediate);
        assert_eq!(profile.preferred_weight_unit, "kg");
        assert_eq!(profile.fitness_goals, serde_json::json!([]));
    }

    #[test]
    fn upsert_rejects_out_of_range_measurements() {
        let request = UpsertProfileRequest {
            fitness_level: FitnessLevel::Beginner,
            body_type: None,
            fitness_goals: None,
            available_equipment: None,
            workout_preferences: None,
            height_cm: Some(10),
            weight_kg: Some(1000.0),
            date_of_birth: None,
            gender: None,
            preferred_weight_unit: None,
        };
        let errors = request.validate().unwrap_err();
        assert!(errors.field_errors().contains_key("height_cm"));
        assert!(errors.field_errors().contains_key("weight_kg"));
    }
}
