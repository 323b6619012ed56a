//! Equipment inventory models.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use sqlx::FromRow;
use uuid::Uuid;
use validator::Validate;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, sqlx::Type)]
#[sqlx(type_name = "TEXT", rename_all = "snake_case")]
#[serde(rename_all = "snake_case")]
pub enum AvailabilityStatus {
    Available,
    Unavailable,
    Maintenance,
}

impl Default for AvailabilityStatus {
    fn default() -> Self {
        AvailabilityStatus::Available
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct Equipment {
    pub id: String,
    pub user_id: String,
    pub name: String,
    pub category: String,
    pub availability_status: AvailabilityStatus,
    pub weight_range_min: Option<f64>,
    pub weight_range_max: Option<f64>,
    pub quantity: i32,
    pub notes: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Equipment {
    pub fn new(user_id: String, name: String, category: String) -> Self {
        let now = Utc::now();
        Self {
            id: Uuid::new_v4().to_string(),
            user_id,
            name,
            category,
            availability_status: AvailabilityStatus::Available,
            weight_range_min: None,
            weight_range_max: None,
            quantity: 1,
            notes: None,
            created_at: now,
            updated_at: now,
        }
    }
}

/// Global catalog entry describing a kind of equipment.
#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct EquipmentTemplate {
    pub id: String,
    pub name: String,
    pub category: String,
    pub description: Option<String>,
    pub typical_exercises: Value,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Deserialize, Validate)]
pub struct CreateEquipmentRequest {
    #[validate(length(min = 1, max = 200))]
    pub name: String,
    #[validate(length(min = 1, max = 50))]
    pub category: String,
    pub availability_status: Option<AvailabilityStatus>,
    pub weight_range_min: Option<f64>,
    pub weight_range_max: Option<f64>,
    #[validate(range(min = 1))]
    pub quantity: Option<i32>,
    pub notes: Option<String>,
}

#[derive(Debug, Deserialize, Validate)]
pub struct UpdateEquipmentRequest {
    #[validate(length(min = 1, max = 200))]
    pub name: Option<String>,
    #[validate(length(min = 1, max = 50))]
    pub category: Option<String>,
    pub availability_status: Option<AvailabilityStatus>,
    pub weight_range_min: Option<f64>,
    pub weight_range_max: Option<f64>,
    #[validate(range(min = 1))]
    pub quantity: Option<i32>,
    pub notes: Option<String>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn availability_status_serde_snake_case() {
        let status: AvailabilityStatus = serde_json::from_str("\"maintenance\"").unwrap();
        assert_eq!(status, AvailabilityStatus::Maintenance);
    }

    #[test]
    fn create_request_rejects_zero_quantity() {
        let request = CreateEquipmentRequest {
            name: "Kettlebell".into(),
            category: "weights".into(),
            availability_status: None,
            weight_range_min: None,
            weight_range_max: None,
            quantity: Some(0),
            notes: None,
        };
        assert!(request.validate().is_err());
    }
}
