//! Workout CRUD, generation and analysis handlers.

use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    response::IntoResponse,
    Extension, Json,
};
use chrono::Utc;
use serde::Serialize;
use validator::Validate;

use crate::error::AppError;
use crate::models::profile::UserProfile;
use crate::models::user::User;
use crate::models::workout::{
    CreateWorkoutRequest, ExerciseTemplate, GenerateWorkoutRequest, UpdateWorkoutRequest, Workout,
    WorkoutExercise, WorkoutResponse,
};
use crate::models::{PaginatedResponse, PaginationQuery};
use crate::services::generation::{generate_rule_based, GeneratedWorkout};
use crate::services::llm;
use crate::state::AppState;

const WORKOUT_COLUMNS: &str =
    "id, user_id, name, description, workout_type, duration_minutes, \
     difficulty_level, created_at, updated_at";

const EXERCISE_COLUMNS: &str =
    "id, workout_id, exercise_name, exercise_type, sets, reps, weight_percentage, \
     rest_time_seconds, notes, order_index, equipment_required";

async fn find_workout(
    pool: &sqlx::PgPool,
    user_id: &str,
    workout_id: &str,
) -> Result<Workout, AppError> {
    sqlx::query_as::<_, Workout>(&format!(
        "SELECT {} FROM workouts WHERE id = $1 AND user_id = $2",
        WORKOUT_COLUMNS
    ))
    .bind(workout_id)
    .bind(user_id)
    .fetch_optional(pool)
    .await?
    .ok_or_else(|| AppError::NotFound("Workout not found".to_string()))
}

async fn workout_exercises(
    pool: &sqlx::PgPool,
    workout_id: &str,
) -> Result<Vec<WorkoutExercise>, sqlx::Error> {
    sqlx::query_as::<_, WorkoutExercise>(&format!(
        "SELECT {} FROM workout_exercises WHERE workout_id = $1 ORDER BY order_index",
        EXERCISE_COLUMNS
    ))
    .bind(workout_id)
    .fetch_all(pool)
    .await
}

async fn insert_exercise(
    tx: &mut sqlx::Transaction<'_, sqlx::Postgres>,
    exercise: &WorkoutExercise,
) -> Result<(), sqlx::Error> {
    sqlx::query(
        "INSERT INTO workout_exercises \
         (id, workout_id, exercise_name, exercise_type, sets, reps, weight_percentage, \
          rest_time_seconds, notes, order_index, equipment_required) \
         VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11)",
    )
    .bind(&exercise.id)
    .bind(&exercise.workout_id)
    .bind(&exercise.exercise_name)
    .bind(&exercise.exercise_type)
    .bind(exercise.sets)
    .bind(&exercise.reps)
    .bind(exercise.weight_percentage)
    .bind(exercise.rest_time_seconds)
    .bind(&exercise.notes)
    .bind(exercise.order_index)
    .bind(&exercise.equipment_required)
    .execute(&mut **tx)
    .await?;
    Ok(())
}

async fn insert_workout(
    tx: &mut sqlx::Transaction<'_, sqlx::Postgres>,
    workout: &Workout,
) -> Result<(), sqlx::Error> {
    sqlx::query(
        "INSERT INTO workouts \
         (id, user_id, name, description, workout_type, duration_minutes, \
          difficulty_level, created_at, updated_at) \
         VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9)",
    )
    .bind(&workout.id)
    .bind(&workout.user_id)
    .bind(&workout.name)
    .bind(&workout.description)
    .bind(&workout.workout_type)
    .bind(workout.duration_minutes)
    .bind(&workout.difficulty_level)
    .bind(workout.created_at)
    .bind(workout.updated_at)
    .execute(&mut **tx)
    .await?;
    Ok(())
}

pub async fn list_workouts(
    State(state): State<AppState>,
    Extension(user): Extension<User>,
    Query(pagination): Query<PaginationQuery>,
) -> Result<impl IntoResponse, AppError> {
    let total =
        sqlx::query_scalar::<_, i64>("SELECT COUNT(*) FROM workouts WHERE user_id = $1")
            .bind(&user.id)
            .fetch_one(&state.pool)
            .await?;

    let workouts = sqlx::query_as::<_, Workout>(&format!(
        "SELECT {} FROM workouts WHERE user_id = $1 \
         ORDER BY created_at DESC LIMIT $2 OFFSET $3",
        WORKOUT_COLUMNS
    ))
    .bind(&user.id)
    .bind(pagination.limit())
    .bind(pagination.offset())
    .fetch_all(&state.pool)
    .await?;

    Ok(Json(PaginatedResponse::new(
        workouts,
        total,
        pagination.limit(),
        pagination.offset(),
    )))
}

pub async fn create_workout(
    State(state): State<AppState>,
    Extension(user): Extension<User>,
    Json(payload): Json<CreateWorkoutRequest>,
) -> Result<impl IntoResponse, AppError> {
    payload.validate()?;
    for exercise in &payload.exercises {
        exercise.validate()?;
    }

    let mut workout = Workout::new(user.id.clone(), payload.name, payload.workout_type);
    workout.description = payload.description;
    workout.duration_minutes = payload.duration_minutes;
    workout.difficulty_level = payload.difficulty_level;

    let mut tx = state.pool.begin().await?;
    insert_workout(&mut tx, &workout).await?;

    let mut exercises = Vec::with_capacity(payload.exercises.len());
    for (index, spec) in payload.exercises.into_iter().enumerate() {
        let mut exercise = WorkoutExercise::new(
            workout.id.clone(),
            spec.exercise_name,
            spec.exercise_type,
            index as i32,
        );
        exercise.sets = spec.sets;
        exercise.reps = spec.reps;
        exercise.weight_percentage = spec.weight_percentage;
        exercise.rest_time_seconds = spec.rest_time_seconds;
        exercise.notes = spec.notes;
        exercise.equipment_required = spec.equipment_required;
        insert_exercise(&mut tx, &exercise).await?;
        exercises.push(exercise);
    }
    tx.commit().await?;

    Ok((
        StatusCode::CREATED,
        Json(WorkoutResponse { workout, exercises }),
    ))
}

pub async fn get_workout(
    State(state): State<AppState>,
    Extension(user): Extension<User>,
    Path(workout_id): Path<String>,
) -> Result<impl IntoResponse, AppError> {
    let workout = find_workout(&state.pool, &user.id, &workout_id).await?;
    let exercises = workout_exercises(&state.pool, &workout.id).await?;
    Ok(Json(WorkoutResponse { workout, exercises }))
}

pub async fn update_workout(
    State(state): State<AppState>,
    Extension(user): Extension<User>,
    Path(workout_id): Path<String>,
    Json(payload): Json<UpdateWorkoutRequest>,
) -> Result<impl IntoResponse, AppError> {
    payload.validate()?;

    let mut workout = find_workout(&state.pool, &user.id, &workout_id).await?;
    if let Some(name) = payload.name {
        workout.name = name;
    }
    if payload.description.is_some() {
        workout.description = payload.description;
    }
    if let Some(workout_type) = payload.workout_type {
        workout.workout_type = workout_type;
    }
    if payload.duration_minutes.is_some() {
        workout.duration_minutes = payload.duration_minutes;
    }
    if payload.difficulty_level.is_some() {
        workout.difficulty_level = payload.difficulty_level;
    }
    workout.updated_at = Utc::now();

    sqlx::query(
        "UPDATE workouts SET name = $2, description = $3, workout_type = $4, \
         duration_minutes = $5, difficulty_level = $6, updated_at = $7 WHERE id = $1",
    )
    .bind(&workout.id)
    .bind(&workout.name)
    .bind(&workout.description)
    .bind(&workout.workout_type)
    .bind(workout.duration_minutes)
    .bind(&workout.difficulty_level)
    .bind(workout.updated_at)
    .execute(&state.pool)
    .await?;

    Ok(Json(workout))
}

pub async fn delete_workout(
    State(state): State<AppState>,
    Extension(user): Extension<User>,
    Path(workout_id): Path<String>,
) -> Result<impl IntoResponse, AppError> {
    let result = sqlx::query("DELETE FROM workouts WHERE id = $1 AND user_id = $2")
        .bind(&workout_id)
        .bind(&user.id)
        .execute(&state.pool)
        .await?;

    if result.rows_affected() == 0 {
        return Err(AppError::NotFound("Workout not found".to_string()));
    }
    Ok(StatusCode::NO_CONTENT)
}

fn json_string_array(value: &serde_json::Value) -> Vec<String> {
    value
        .as_array()
        .map(|items| {
            items
                .iter()
                .filter_map(|item| item.as_str().map(str::to_string))
                .collect()
        })
        .unwrap_or_default()
}

#[derive(Debug, Serialize)]
pub struct GenerateWorkoutResponse {
    pub generated_by: &'static str,
    #[serde(flatten)]
    pub workout: WorkoutResponse,
}

/// Generates and persists a workout. The LLM path falls back to the rule
/// tables on any error; `use_ai = false` skips the LLM entirely.
pub async fn generate_workout(
    State(state): State<AppState>,
    Extension(user): Extension<User>,
    Json(payload): Json<GenerateWorkoutRequest>,
) -> Result<impl IntoResponse, AppError> {
    payload.validate()?;

    let profile = sqlx::query_as::<_, UserProfile>(
        "SELECT id, user_id, fitness_level, body_type, fitness_goals, available_equipment, \
         workout_preferences, height_cm, weight_kg, date_of_birth, gender, \
         preferred_weight_unit, created_at, updated_at \
         FROM user_profiles WHERE user_id = $1",
    )
    .bind(&user.id)
    .fetch_optional(&state.pool)
    .await?
    .ok_or_else(|| {
        AppError::BadRequest("A fitness profile is required before generating workouts".to_string())
    })?;

    let equipment = if payload.available_equipment.is_empty() {
        json_string_array(&profile.available_equipment)
    } else {
        payload.available_equipment.clone()
    };

    let (generated, generated_by) = if payload.use_ai && !state.config.llm_api_key.is_empty() {
        let recent_workouts = sqlx::query_as::<_, Workout>(&format!(
            "SELECT {} FROM workouts WHERE user_id = $1 ORDER BY created_at DESC LIMIT 10",
            WORKOUT_COLUMNS
        ))
        .bind(&user.id)
        .fetch_all(&state.pool)
        .await?
        .iter()
        .map(|workout| format!("{} ({})", workout.name, workout.workout_type))
        .collect::<Vec<_>>();

        match llm::generate_with_llm(
            &state.http,
            &state.config,
            &payload,
            profile.fitness_level,
            profile.body_type,
            &equipment,
            &recent_workouts,
        )
        .await
        {
            Ok(workout) => (workout, "ai"),
            Err(err) => {
                tracing::warn!("LLM generation failed, using rule-based fallback: {}", err);
                (
                    generate_rule_based(
                        &payload.workout_type,
                        payload.duration_minutes,
                        profile.fitness_level,
                        &equipment,
                    ),
                    "fallback",
                )
            }
        }
    } else {
        (
            generate_rule_based(
                &payload.workout_type,
                payload.duration_minutes,
                profile.fitness_level,
                &equipment,
            ),
            "basic",
        )
    };

    let workout = persist_generated(&state, &user.id, generated).await?;

    Ok((
        StatusCode::CREATED,
        Json(GenerateWorkoutResponse {
            generated_by,
            workout,
        }),
    ))
}

async fn persist_generated(
    state: &AppState,
    user_id: &str,
    generated: GeneratedWorkout,
) -> Result<WorkoutResponse, AppError> {
    let mut workout = Workout::new(
        user_id.to_string(),
        generated.name,
        generated.workout_type,
    );
    workout.description = generated.description;
    workout.duration_minutes = Some(generated.duration_minutes);
    workout.difficulty_level = Some(generated.difficulty_level);

    let mut tx = state.pool.begin().await?;
    insert_workout(&mut tx, &workout).await?;

    let mut exercises = Vec::with_capacity(generated.exercises.len());
    for (index, spec) in generated.exercises.into_iter().enumerate() {
        let mut exercise = WorkoutExercise::new(
            workout.id.clone(),
            spec.exercise_name,
            spec.exercise_type,
            index as i32,
        );
        exercise.sets = Some(spec.sets);
        exercise.reps = Some(spec.reps);
        exercise.rest_time_seconds = Some(spec.rest_time_seconds);
        exercise.equipment_required = spec.equipment_required;
        exercise.notes = spec.notes;
        insert_exercise(&mut tx, &exercise).await?;
        exercises.push(exercise);
    }
    tx.commit().await?;

    Ok(WorkoutResponse { workout, exercises })
}

pub async fn list_exercise_templates(
    State(state): State<AppState>,
) -> Result<impl IntoResponse, AppError> {
    let templates = sqlx::query_as::<_, ExerciseTemplate>(
        "SELECT id, name, category, muscle_groups, equipment_required, difficulty_level, \
         description, instructions, created_at \
         FROM exercise_templates ORDER BY name",
    )
    .fetch_all(&state.pool)
    .await?;

    Ok(Json(templates))
}

#[derive(Debug, sqlx::FromRow)]
struct SessionFeedbackRow {
    session_id: String,
    overall_rating: Option<i32>,
    average_exertion: Option<f64>,
}

#[derive(Debug, Serialize)]
pub struct AnalyzeWorkoutResponse {
    pub workout_id: String,
    pub session_id: String,
    pub overall_rating: Option<i32>,
    pub average_exertion: Option<f64>,
    pub suggestions: Vec<String>,
}

fn analysis_suggestions(rating: Option<i32>, exertion: Option<f64>) -> Vec<String> {
    let mut suggestions = Vec::new();
    match rating {
        Some(r) if r <= 2 => suggestions.push(
            "Low rating: consider swapping exercises or reducing volume next time".to_string(),
        ),
        Some(r) if r >= 5 => suggestions
            .push("High rating: keep this structure and progress the load gradually".to_string()),
        _ => {}
    }
    match exertion {
        Some(e) if e >= 8.5 => suggestions.push(
            "Very high perceived exertion: add rest time or drop a set per exercise".to_string(),
        ),
        Some(e) if e <= 4.0 => suggestions.push(
            "Low perceived exertion: increase weight or reduce rest to raise intensity"
                .to_string(),
        ),
        _ => {}
    }
    if suggestions.is_empty() {
        suggestions.push("Workout is well calibrated; no changes suggested".to_string());
    }
    suggestions
}

/// Rule-based feedback analysis over the latest completed session of a
/// workout.
pub async fn analyze_workout(
    State(state): State<AppState>,
    Extension(user): Extension<User>,
    Path(workout_id): Path<String>,
) -> Result<impl IntoResponse, AppError> {
    let workout = find_workout(&state.pool, &user.id, &workout_id).await?;

    let row = sqlx::query_as::<_, SessionFeedbackRow>(
        "SELECT ws.id AS session_id, ws.overall_rating, \
         AVG(ep.perceived_exertion)::DOUBLE PRECISION AS average_exertion \
         FROM workout_sessions ws \
         LEFT JOIN exercise_performances ep ON ep.session_id = ws.id \
         WHERE ws.workout_id = $1 AND ws.user_id = $2 AND ws.status = 'completed' \
         GROUP BY ws.id, ws.overall_rating, ws.completed_at \
         ORDER BY ws.completed_at DESC NULLS LAST LIMIT 1",
    )
    .bind(&workout.id)
    .bind(&user.id)
    .fetch_optional(&state.pool)
    .await?
    .ok_or_else(|| {
        AppError::NotFound("No completed sessions to analyze for this workout".to_string())
    })?;

    let suggestions = analysis_suggestions(row.overall_rating, row.average_exertion);

    Ok(Json(AnalyzeWorkoutResponse {
        workout_id: workout.id,
        session_id: row.session_id,
        overall_rating: row.overall_rating,
        average_exertion: row.average_exertion,
        suggestions,
    }))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn json_string_array_filters_non_strings() {
        let value = serde_json::json!(["barbell", 3, "kettlebell", null]);
        assert_eq!(json_string_array(&value), vec!["barbell", "kettlebell"]);
        assert!(json_string_array(&serde_json::json!({})).is_empty());
    }

    #[test]
    fn suggestions_for_low_rating_and_high_exertion() {
        let suggestions = analysis_suggestions(Some(2), Some(9.0));
        assert_eq!(suggestions.len(), 2);
        assert!(suggestions[0].contains("Low rating"));
        assert!(suggestions[1].contains("perceived exertion"));
    }

    #[test]
    fn suggestions_default_when_balanced() {
        let suggestions = analysis_suggestions(Some(4), Some(6.0));
        assert_eq!(suggestions.len(), 1);
        assert!(suggestions[0].contains("well calibrated"));
    }
}
