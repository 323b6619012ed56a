//! Session lifecycle, performance logging and personal-record handlers.

use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    response::IntoResponse,
    Extension, Json,
};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;
use validator::Validate;

use crate::error::AppError;
use crate::models::personal_record::{PersonalRecord, RecordQuery};
use crate::models::session::{
    CreateSessionRequest, ExercisePerformance, LogPerformanceRequest, SessionFeedback,
    SessionResponse, SessionStatus, TransitionError, WorkoutSession,
};
use crate::models::user::User;
use crate::models::{PaginatedResponse, PaginationQuery};
use crate::services::records;
use crate::state::AppState;

const SESSION_COLUMNS: &str =
    "id, user_id, workout_id, status, scheduled_date, started_at, completed_at, \
     overall_rating, feedback_notes, duration_minutes, calories_burned, created_at, updated_at";

const PERFORMANCE_COLUMNS: &str =
    "id, session_id, exercise_id, actual_sets, actual_reps, actual_weight, \
     actual_duration, perceived_exertion, notes, completed, created_at";

impl From<TransitionError> for AppError {
    fn from(err: TransitionError) -> Self {
        AppError::Conflict(err.to_string())
    }
}

async fn find_session(
    pool: &sqlx::PgPool,
    user_id: &str,
    session_id: &str,
) -> Result<WorkoutSession, AppError> {
    sqlx::query_as::<_, WorkoutSession>(&format!(
        "SELECT {} FROM workout_sessions WHERE id = $1 AND user_id = $2",
        SESSION_COLUMNS
    ))
    .bind(session_id)
    .bind(user_id)
    .fetch_optional(pool)
    .await?
    .ok_or_else(|| AppError::NotFound("Session not found".to_string()))
}

async fn session_performances(
    pool: &sqlx::PgPool,
    session_id: &str,
) -> Result<Vec<ExercisePerformance>, sqlx::Error> {
    sqlx::query_as::<_, ExercisePerformance>(&format!(
        "SELECT {} FROM exercise_performances WHERE session_id = $1 ORDER BY created_at",
        PERFORMANCE_COLUMNS
    ))
    .bind(session_id)
    .fetch_all(pool)
    .await
}

async fn update_session(
    pool: &sqlx::PgPool,
    session: &WorkoutSession,
) -> Result<(), sqlx::Error> {
    sqlx::query(
        "UPDATE workout_sessions SET status = $2, started_at = $3, completed_at = $4, \
         overall_rating = $5, feedback_notes = $6, duration_minutes = $7, \
         calories_burned = $8, updated_at = $9 WHERE id = $1",
    )
    .bind(&session.id)
    .bind(session.status)
    .bind(session.started_at)
    .bind(session.completed_at)
    .bind(session.overall_rating)
    .bind(&session.feedback_notes)
    .bind(session.duration_minutes)
    .bind(session.calories_burned)
    .bind(session.updated_at)
    .execute(pool)
    .await?;
    Ok(())
}

#[derive(Debug, Default, Deserialize)]
pub struct SessionFilters {
    pub status: Option<SessionStatus>,
    pub from: Option<DateTime<Utc>>,
    pub to: Option<DateTime<Utc>>,
}

pub async fn list_sessions(
    State(state): State<AppState>,
    Extension(user): Extension<User>,
    Query(filters): Query<SessionFilters>,
    Query(pagination): Query<PaginationQuery>,
) -> Result<impl IntoResponse, AppError> {
    let mut count_query = sqlx::QueryBuilder::<sqlx::Postgres>::new(
        "SELECT COUNT(*) FROM workout_sessions WHERE user_id = ",
    );
    push_session_filters(&mut count_query, &user.id, &filters);
    let total: i64 = count_query.build_query_scalar().fetch_one(&state.pool).await?;

    let mut query = sqlx::QueryBuilder::<sqlx::Postgres>::new(format!(
        "SELECT {} FROM workout_sessions WHERE user_id = ",
        SESSION_COLUMNS
    ));
    push_session_filters(&mut query, &user.id, &filters);
    query.push(" ORDER BY scheduled_date DESC NULLS LAST, created_at DESC");
    query.push(" LIMIT ");
    query.push_bind(pagination.limit());
    query.push(" OFFSET ");
    query.push_bind(pagination.offset());

    let sessions: Vec<WorkoutSession> =
        query.build_query_as().fetch_all(&state.pool).await?;

    Ok(Json(PaginatedResponse::new(
        sessions,
        total,
        pagination.limit(),
        pagination.offset(),
    )))
}

fn push_session_filters(
    query: &mut sqlx::QueryBuilder<'_, sqlx::Postgres>,
    user_id: &str,
    filters: &SessionFilters,
) {
    query.push_bind(user_id.to_string());
    if let Some(status) = filters.status {
        query.push(" AND status = ");
        query.push_bind(status);
    }
    if let Some(from) = filters.from {
        query.push(" AND scheduled_date >= ");
        query.push_bind(from);
    }
    if let Some(to) = filters.to {
        query.push(" AND scheduled_date <= ");
        query.push_bind(to);
    }
}

pub async fn create_session(
    State(state): State<AppState>,
    Extension(user): Extension<User>,
    Json(payload): Json<CreateSessionRequest>,
) -> Result<impl IntoResponse, AppError> {
    payload.validate()?;

    let owns_workout = sqlx::query_scalar::<_, String>(
        "SELECT id FROM workouts WHERE id = $1 AND user_id = $2",
    )
    .bind(&payload.workout_id)
    .bind(&user.id)
    .fetch_optional(&state.pool)
    .await?
    .is_some();
    if !owns_workout {
        return Err(AppError::NotFound("Workout not found".to_string()));
    }

    let session = WorkoutSession::new(user.id.clone(), payload.workout_id, payload.scheduled_date);
    sqlx::query(
        "INSERT INTO workout_sessions \
         (id, user_id, workout_id, status, scheduled_date, started_at, completed_at, \
          overall_rating, feedback_notes, duration_minutes, calories_burned, created_at, updated_at) \
         VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12, $13)",
    )
    .bind(&session.id)
    .bind(&session.user_id)
    .bind(&session.workout_id)
    .bind(session.status)
    .bind(session.scheduled_date)
    .bind(session.started_at)
    .bind(session.completed_at)
    .bind(session.overall_rating)
    .bind(&session.feedback_notes)
    .bind(session.duration_minutes)
    .bind(session.calories_burned)
    .bind(session.created_at)
    .bind(session.updated_at)
    .execute(&state.pool)
    .await?;

    Ok((StatusCode::CREATED, Json(session)))
}

pub async fn get_session(
    State(state): State<AppState>,
    Extension(user): Extension<User>,
    Path(session_id): Path<String>,
) -> Result<impl IntoResponse, AppError> {
    let session = find_session(&state.pool, &user.id, &session_id).await?;
    let performances = session_performances(&state.pool, &session.id).await?;
    Ok(Json(SessionResponse {
        session,
        performances,
    }))
}

pub async fn start_session(
    State(state): State<AppState>,
    Extension(user): Extension<User>,
    Path(session_id): Path<String>,
) -> Result<impl IntoResponse, AppError> {
    let mut session = find_session(&state.pool, &user.id, &session_id).await?;
    session.start(Utc::now())?;
    update_session(&state.pool, &session).await?;
    Ok(Json(session))
}

#[derive(Debug, Serialize)]
pub struct CompleteSessionResponse {
    #[serde(flatten)]
    pub session: WorkoutSession,
    /// Records newly created or improved by this session.
    pub new_records: Vec<PersonalRecord>,
}

pub async fn complete_session(
    State(state): State<AppState>,
    Extension(user): Extension<User>,
    Path(session_id): Path<String>,
    payload: Option<Json<SessionFeedback>>,
) -> Result<impl IntoResponse, AppError> {
    let feedback = payload.map(|Json(f)| f).unwrap_or_default();
    feedback.validate()?;

    let mut session = find_session(&state.pool, &user.id, &session_id).await?;
    session.complete(&feedback, Utc::now())?;
    update_session(&state.pool, &session).await?;

    // Record evaluation must never fail the completion. New records are
    // stamped with the session's completion time.
    let completed_at = session.completed_at.unwrap_or_else(Utc::now);
    let new_records = records::evaluate_session_records_best_effort(
        &state.pool,
        &user.id,
        &session.id,
        completed_at,
    )
    .await;
    if !new_records.is_empty() {
        tracing::info!(
            session_id = %session.id,
            count = new_records.len(),
            "Personal records achieved"
        );
    }

    Ok(Json(CompleteSessionResponse {
        session,
        new_records,
    }))
}

pub async fn skip_session(
    State(state): State<AppState>,
    Extension(user): Extension<User>,
    Path(session_id): Path<String>,
) -> Result<impl IntoResponse, AppError> {
    let mut session = find_session(&state.pool, &user.id, &session_id).await?;
    session.skip(Utc::now())?;
    update_session(&state.pool, &session).await?;
    Ok(Json(session))
}

/// Amends feedback on an already-completed session.
pub async fn session_feedback(
    State(state): State<AppState>,
    Extension(user): Extension<User>,
    Path(session_id): Path<String>,
    Json(feedback): Json<SessionFeedback>,
) -> Result<impl IntoResponse, AppError> {
    feedback.validate()?;

    let mut session = find_session(&state.pool, &user.id, &session_id).await?;
    if session.status != SessionStatus::Completed {
        return Err(AppError::Conflict(
            "Feedback can only be added to completed sessions".to_string(),
        ));
    }

    if feedback.overall_rating.is_some() {
        session.overall_rating = feedback.overall_rating;
    }
    if feedback.feedback_notes.is_some() {
        session.feedback_notes = feedback.feedback_notes;
    }
    if feedback.calories_burned.is_some() {
        session.calories_burned = feedback.calories_burned;
    }
    session.updated_at = Utc::now();
    update_session(&state.pool, &session).await?;
    Ok(Json(session))
}

/// Upserts the performance for one planned exercise of the session.
pub async fn log_performance(
    State(state): State<AppState>,
    Extension(user): Extension<User>,
    Path(session_id): Path<String>,
    Json(payload): Json<LogPerformanceRequest>,
) -> Result<impl IntoResponse, AppError> {
    payload.validate()?;

    let session = find_session(&state.pool, &user.id, &session_id).await?;

    let exercise_in_workout = sqlx::query_scalar::<_, String>(
        "SELECT id FROM workout_exercises WHERE id = $1 AND workout_id = $2",
    )
    .bind(&payload.exercise_id)
    .bind(&session.workout_id)
    .fetch_optional(&state.pool)
    .await?
    .is_some();
    if !exercise_in_workout {
        return Err(AppError::NotFound(
            "Exercise not found in this session's workout".to_string(),
        ));
    }

    let performance = ExercisePerformance {
        id: Uuid::new_v4().to_string(),
        session_id: session.id.clone(),
        exercise_id: payload.exercise_id,
        actual_sets: payload.actual_sets,
        actual_reps: payload.actual_reps,
        actual_weight: payload.actual_weight,
        actual_duration: payload.actual_duration,
        perceived_exertion: payload.perceived_exertion,
        notes: payload.notes,
        completed: payload.completed.unwrap_or(true),
        created_at: Utc::now(),
    };

    let stored = sqlx::query_as::<_, ExercisePerformance>(&format!(
        "INSERT INTO exercise_performances \
         (id, session_id, exercise_id, actual_sets, actual_reps, actual_weight, \
          actual_duration, perceived_exertion, notes, completed, created_at) \
         VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11) \
         ON CONFLICT (session_id, exercise_id) DO UPDATE SET \
            actual_sets = EXCLUDED.actual_sets, \
            actual_reps = EXCLUDED.actual_reps, \
            actual_weight = EXCLUDED.actual_weight, \
            actual_duration = EXCLUDED.actual_duration, \
            perceived_exertion = EXCLUDED.perceived_exertion, \
            notes = EXCLUDED.notes, \
            completed = EXCLUDED.completed \
         RETURNING {}",
        PERFORMANCE_COLUMNS
    ))
    .bind(&performance.id)
    .bind(&performance.session_id)
    .bind(&performance.exercise_id)
    .bind(performance.actual_sets)
    .bind(&performance.actual_reps)
    .bind(performance.actual_weight)
    .bind(performance.actual_duration)
    .bind(performance.perceived_exertion)
    .bind(&performance.notes)
    .bind(performance.completed)
    .bind(performance.created_at)
    .fetch_one(&state.pool)
    .await?;

    Ok(Json(stored))
}

pub async fn list_personal_records(
    State(state): State<AppState>,
    Extension(user): Extension<User>,
    Query(filters): Query<RecordQuery>,
) -> Result<impl IntoResponse, AppError> {
    let mut query = sqlx::QueryBuilder::<sqlx::Postgres>::new(
        "SELECT id, user_id, exercise_name, record_type, value, unit, achieved_date, \
         session_id, notes FROM personal_records WHERE user_id = ",
    );
    query.push_bind(user.id.clone());
    if let Some(exercise_name) = &filters.exercise_name {
        query.push(" AND exercise_name = ");
        query.push_bind(exercise_name.clone());
    }
    if let Some(record_type) = filters.record_type {
        query.push(" AND record_type = ");
        query.push_bind(record_type);
    }
    query.push(" ORDER BY exercise_name, record_type");

    let records: Vec<PersonalRecord> =
        query.build_query_as().fetch_all(&state.pool).await?;
    Ok(Json(records))
}
