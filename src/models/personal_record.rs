//! Personal record model.
//!
//! Records are keyed by exercise name rather than exercise id, so a rename
//! fractures the record history. Kept as-is; see DESIGN.md open questions.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use uuid::Uuid;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, sqlx::Type)]
#[sqlx(type_name = "TEXT", rename_all = "snake_case")]
#[serde(rename_all = "snake_case")]
pub enum RecordType {
    MaxWeight,
    MaxReps,
    BestTime,
    MaxDuration,
}

impl RecordType {
    pub fn as_str(&self) -> &'static str {
        match self {
            RecordType::MaxWeight => "max_weight",
            RecordType::MaxReps => "max_reps",
            RecordType::BestTime => "best_time",
            RecordType::MaxDuration => "max_duration",
        }
    }
}

/// Best observed value for a (user, exercise name, record type) triple.
#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct PersonalRecord {
    pub id: String,
    pub user_id: String,
    pub exercise_name: String,
    pub record_type: RecordType,
    pub value: f64,
    pub unit: Option<String>,
    pub achieved_date: DateTime<Utc>,
    pub session_id: Option<String>,
    pub notes: Option<String>,
}

impl PersonalRecord {
    pub fn new(
        user_id: String,
        exercise_name: String,
        record_type: RecordType,
        value: f64,
        unit: Option<String>,
        achieved_date: DateTime<Utc>,
        session_id: Option<String>,
    ) -> Self {
        Self {
            id: Uuid::new_v4().to_string(),
            user_id,
            exercise_name,
            record_type,
            value,
            unit,
            achieved_date,
            session_id,
            notes: None,
        }
    }
}

/// Filters accepted by the personal-records listing endpoint.
#[derive(Debug, Default, Deserialize)]
pub struct RecordQuery {
    pub exercise_name: Option<String>,
    pub record_type: Option<RecordType>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn record_type_serde_snake_case() {
        let record_type: RecordType = serde_json::from_str("\"max_weight\"").unwrap();
        assert_eq!(record_type, RecordType::MaxWeight);
        assert_eq!(RecordType::MaxReps.as_str(), "max_reps");
    }
}
