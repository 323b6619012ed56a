//! Personal-record derivation from completed session performances.
//!
//! Runs after a session completes. A new best strictly greater than the
//! stored value replaces it; ties keep the existing record untouched.

use async_trait::async_trait;
use chrono::{DateTime, Utc};

use crate::db::DbPool;
use crate::models::personal_record::{PersonalRecord, RecordType};
use crate::validation::rules::parse_rep_count;

/// Completed performance joined with its planned exercise name.
#[derive(Debug, Clone, sqlx::FromRow)]
pub struct CompletedPerformance {
    pub exercise_name: String,
    pub actual_weight: Option<f64>,
    pub actual_reps: Option<String>,
}

/// Storage seam for record evaluation, mockable in tests.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait RecordStore: Send + Sync {
    async fn completed_performances(
        &self,
        session_id: &str,
    ) -> Result<Vec<CompletedPerformance>, sqlx::Error>;

    async fn preferred_weight_unit(&self, user_id: &str) -> Result<Option<String>, sqlx::Error>;

    async fn find_record(
        &self,
        user_id: &str,
        exercise_name: &str,
        record_type: RecordType,
    ) -> Result<Option<PersonalRecord>, sqlx::Error>;

    async fn insert_record(&self, record: &PersonalRecord) -> Result<(), sqlx::Error>;

    async fn update_record(
        &self,
        id: &str,
        value: f64,
        achieved_date: DateTime<Utc>,
        session_id: &str,
    ) -> Result<(), sqlx::Error>;
}

pub struct SqlxRecordStore<'a> {
    pool: &'a DbPool,
}

impl<'a> SqlxRecordStore<'a> {
    pub fn new(pool: &'a DbPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl RecordStore for SqlxRecordStore<'_> {
    async fn completed_performances(
        &self,
        session_id: &str,
    ) -> Result<Vec<CompletedPerformance>, sqlx::Error> {
        sqlx::query_as::<_, CompletedPerformance>(
            "SELECT we.exercise_name, ep.actual_weight, ep.actual_reps \
             FROM exercise_performances ep \
             JOIN workout_exercises we ON we.id = ep.exercise_id \
             WHERE ep.session_id = $1 AND ep.completed = TRUE",
        )
        .bind(session_id)
        .fetch_all(self.pool)
        .await
    }

    async fn preferred_weight_unit(&self, user_id: &str) -> Result<Option<String>, sqlx::Error> {
        sqlx::query_scalar::<_, String>(
            "SELECT preferred_weight_unit FROM user_profiles WHERE user_id = $1",
        )
        .bind(user_id)
        .fetch_optional(self.pool)
        .await
    }

    async fn find_record(
        &self,
        user_id: &str,
        exercise_name: &str,
        record_type: RecordType,
    ) -> Result<Option<PersonalRecord>, sqlx::Error> {
        sqlx::query_as::<_, PersonalRecord>(
            "SELECT id, user_id, exercise_name, record_type, value, unit, \
             achieved_date, session_id, notes \
             FROM personal_records \
             WHERE user_id = $1 AND exercise_name = $2 AND record_type = $3",
        )
        .bind(user_id)
        .bind(exercise_name)
        .bind(record_type)
        .fetch_optional(self.pool)
        .await
    }

    async fn insert_record(&self, record: &PersonalRecord) -> Result<(), sqlx::Error> {
        sqlx::query(
            "INSERT INTO personal_records \
             (id, user_id, exercise_name, record_type, value, unit, achieved_date, session_id, notes) \
             VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9)",
        )
        .bind(&record.id)
        .bind(&record.user_id)
        .bind(&record.exercise_name)
        .bind(record.record_type)
        .bind(record.value)
        .bind(&record.unit)
        .bind(record.achieved_date)
        .bind(&record.session_id)
        .bind(&record.notes)
        .execute(self.pool)
        .await?;
        Ok(())
    }

    async fn update_record(
        &self,
        id: &str,
        value: f64,
        achieved_date: DateTime<Utc>,
        session_id: &str,
    ) -> Result<(), sqlx::Error> {
        sqlx::query(
            "UPDATE personal_records \
             SET value = $2, achieved_date = $3, session_id = $4 \
             WHERE id = $1",
        )
        .bind(id)
        .bind(value)
        .bind(achieved_date)
        .bind(session_id)
        .execute(self.pool)
        .await?;
        Ok(())
    }
}

/// Candidate best value extracted from a single performance.
#[derive(Debug, Clone, PartialEq)]
struct Candidate {
    exercise_name: String,
    record_type: RecordType,
    value: f64,
    unit: String,
}

fn candidates(performance: &CompletedPerformance, weight_unit: &str) -> Vec<Candidate> {
    let mut out = Vec::new();
    if let Some(weight) = performance.actual_weight {
        if weight > 0.0 {
            out.push(Candidate {
                exercise_name: performance.exercise_name.clone(),
                record_type: RecordType::MaxWeight,
                value: weight,
                unit: weight_unit.to_string(),
            });
        }
    }
    if let Some(reps) = performance
        .actual_reps
        .as_deref()
        .and_then(parse_rep_count)
    {
        if reps > 0 {
            out.push(Candidate {
                exercise_name: performance.exercise_name.clone(),
                record_type: RecordType::MaxReps,
                value: reps as f64,
                unit: "reps".to_string(),
            });
        }
    }
    out
}

/// Upserts personal records from a completed session's performances and
/// returns the records that were newly created or improved.
pub async fn evaluate_session_records<S: RecordStore + ?Sized>(
    store: &S,
    user_id: &str,
    session_id: &str,
    now: DateTime<Utc>,
) -> Result<Vec<PersonalRecord>, sqlx::Error> {
    let performances = store.completed_performances(session_id).await?;
    if performances.is_empty() {
        return Ok(Vec::new());
    }

    let weight_unit = store
        .preferred_weight_unit(user_id)
        .await?
        .unwrap_or_else(|| "kg".to_string());

    let mut achieved = Vec::new();
    for performance in &performances {
        for candidate in candidates(performance, &weight_unit) {
            let existing = store
                .find_record(user_id, &candidate.exercise_name, candidate.record_type)
                .await?;
            match existing {
                None => {
                    let record = PersonalRecord::new(
                        user_id.to_string(),
                        candidate.exercise_name.clone(),
                        candidate.record_type,
                        candidate.value,
                        Some(candidate.unit.clone()),
                        now,
                        Some(session_id.to_string()),
                    );
                    store.insert_record(&record).await?;
                    achieved.push(record);
                }
                Some(mut record) if candidate.value > record.value => {
                    store
                        .update_record(&record.id, candidate.value, now, session_id)
                        .await?;
                    record.value = candidate.value;
                    record.achieved_date = now;
                    record.session_id = Some(session_id.to_string());
                    achieved.push(record);
                }
                Some(_) => {}
            }
        }
    }

    Ok(achieved)
}

/// Best-effort wrapper: record evaluation must never fail session
/// completion, so storage errors are logged and swallowed.
pub async fn evaluate_session_records_best_effort(
    pool: &DbPool,
    user_id: &str,
    session_id: &str,
    achieved_at: DateTime<Utc>,
) -> Vec<PersonalRecord> {
    let store = SqlxRecordStore::new(pool);
    match evaluate_session_records(&store, user_id, session_id, achieved_at).await {
        Ok(records) => records,
        Err(err) => {
            tracing::warn!(
                session_id = %session_id,
                "Personal record evaluation failed: {}",
                err
            );
            Vec::new()
        }
    }
}
