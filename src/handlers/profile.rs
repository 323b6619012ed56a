//! Fitness profile handlers.

use axum::{extract::State, response::IntoResponse, Extension, Json};
use chrono::Utc;
use serde_json::Value;
use validator::Validate;

use crate::error::AppError;
use crate::models::profile::{UpsertProfileRequest, UserProfile};
use crate::models::user::User;
use crate::state::AppState;

const PROFILE_COLUMNS: &str =
    "id, user_id, fitness_level, body_type, fitness_goals, available_equipment, \
     workout_preferences, height_cm, weight_kg, date_of_birth, gender, \
     preferred_weight_unit, created_at, updated_at";

pub async fn get_profile(
    State(state): State<AppState>,
    Extension(user): Extension<User>,
) -> Result<impl IntoResponse, AppError> {
    let profile = sqlx::query_as::<_, UserProfile>(&format!(
        "SELECT {} FROM user_profiles WHERE user_id = $1",
        PROFILE_COLUMNS
    ))
    .bind(&user.id)
    .fetch_optional(&state.pool)
    .await?
    .ok_or_else(|| AppError::NotFound("Profile not found".to_string()))?;

    Ok(Json(profile))
}

/// Creates the profile on first write, updates it afterwards.
pub async fn upsert_profile(
    State(state): State<AppState>,
    Extension(user): Extension<User>,
    Json(payload): Json<UpsertProfileRequest>,
) -> Result<impl IntoResponse, AppError> {
    payload.validate()?;

    if let Some(unit) = payload.preferred_weight_unit.as_deref() {
        if unit != "kg" && unit != "lbs" {
            return Err(AppError::BadRequest(
                "preferred_weight_unit must be 'kg' or 'lbs'".to_string(),
            ));
        }
    }

    let mut profile = match sqlx::query_as::<_, UserProfile>(&format!(
        "SELECT {} FROM user_profiles WHERE user_id = $1",
        PROFILE_COLUMNS
    ))
    .bind(&user.id)
    .fetch_optional(&state.pool)
    .await?
    {
        Some(existing) => existing,
        None => UserProfile::new(user.id.clone(), payload.fitness_level),
    };

    profile.fitness_level = payload.fitness_level;
    if payload.body_type.is_some() {
        profile.body_type = payload.body_type;
    }
    if let Some(goals) = payload.fitness_goals {
        profile.fitness_goals = Value::from(goals);
    }
    if let Some(equipment) = payload.available_equipment {
        profile.available_equipment = Value::from(equipment);
    }
    if let Some(preferences) = payload.workout_preferences {
        profile.workout_preferences = preferences;
    }
    if payload.height_cm.is_some() {
        profile.height_cm = payload.height_cm;
    }
    if payload.weight_kg.is_some() {
        profile.weight_kg = payload.weight_kg;
    }
    if payload.date_of_birth.is_some() {
        profile.date_of_birth = payload.date_of_birth;
    }
    if payload.gender.is_some() {
        profile.gender = payload.gender;
    }
    if let Some(unit) = payload.preferred_weight_unit {
        profile.preferred_weight_unit = unit;
    }
    profile.updated_at = Utc::now();

    sqlx::query(
        "INSERT INTO user_profiles \
         (id, user_id, fitness_level, body_type, fitness_goals, available_equipment, \
          workout_preferences, height_cm, weight_kg, date_of_birth, gender, \
          preferred_weight_unit, created_at, updated_at) \
         VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12, $13, $14) \
         ON CONFLICT (user_id) DO UPDATE SET \
            fitness_level = EXCLUDED.fitness_level, \
            body_type = EXCLUDED.body_type, \
            fitness_goals = EXCLUDED.fitness_goals, \
            available_equipment = EXCLUDED.available_equipment, \
            workout_preferences = EXCLUDED.workout_preferences, \
            height_cm = EXCLUDED.height_cm, \
            weight_kg = EXCLUDED.weight_kg, \
            date_of_birth = EXCLUDED.date_of_birth, \
            gender = EXCLUDED.gender, \
            preferred_weight_unit = EXCLUDED.preferred_weight_unit, \
            updated_at = EXCLUDED.updated_at",
    )
    .bind(&profile.id)
    .bind(&profile.user_id)
    .bind(profile.fitness_level)
    .bind(profile.body_type)
    .bind(&profile.fitness_goals)
    .bind(&profile.available_equipment)
    .bind(&profile.workout_preferences)
    .bind(profile.height_cm)
    .bind(profile.weight_kg)
    .bind(profile.date_of_birth)
    .bind(&profile.gender)
    .bind(&profile.preferred_weight_unit)
    .bind(profile.created_at)
    .bind(profile.updated_at)
    .execute(&state.pool)
    .await?;

    Ok(Json(profile))
}
