//! Equipment inventory handlers.

use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    response::IntoResponse,
    Extension, Json,
};
use chrono::Utc;
use validator::Validate;

use crate::error::AppError;
use crate::models::equipment::{
    CreateEquipmentRequest, Equipment, EquipmentTemplate, UpdateEquipmentRequest,
};
use crate::models::user::User;
use crate::models::{PaginatedResponse, PaginationQuery};
use crate::state::AppState;

const EQUIPMENT_COLUMNS: &str =
    "id, user_id, name, category, availability_status, weight_range_min, \
     weight_range_max, quantity, notes, created_at, updated_at";

async fn find_equipment(
    pool: &sqlx::PgPool,
    user_id: &str,
    equipment_id: &str,
) -> Result<Equipment, AppError> {
    sqlx::query_as::<_, Equipment>(&format!(
        "SELECT {} FROM equipment WHERE id = $1 AND user_id = $2",
        EQUIPMENT_COLUMNS
    ))
    .bind(equipment_id)
    .bind(user_id)
    .fetch_optional(pool)
    .await?
    .ok_or_else(|| AppError::NotFound("Equipment not found".to_string()))
}

pub async fn list_equipment(
    State(state): State<AppState>,
    Extension(user): Extension<User>,
    Query(pagination): Query<PaginationQuery>,
) -> Result<impl IntoResponse, AppError> {
    let total = sqlx::query_scalar::<_, i64>(
        "SELECT COUNT(*) FROM equipment WHERE user_id = $1",
    )
    .bind(&user.id)
    .fetch_one(&state.pool)
    .await?;

    let items = sqlx::query_as::<_, Equipment>(&format!(
        "SELECT {} FROM equipment WHERE user_id = $1 \
         ORDER BY created_at DESC LIMIT $2 OFFSET $3",
        EQUIPMENT_COLUMNS
    ))
    .bind(&user.id)
    .bind(pagination.limit())
    .bind(pagination.offset())
    .fetch_all(&state.pool)
    .await?;

    Ok(Json(PaginatedResponse::new(
        items,
        total,
        pagination.limit(),
        pagination.offset(),
    )))
}

pub async fn create_equipment(
    State(state): State<AppState>,
    Extension(user): Extension<User>,
    Json(payload): Json<CreateEquipmentRequest>,
) -> Result<impl IntoResponse, AppError> {
    payload.validate()?;

    let mut equipment = Equipment::new(user.id.clone(), payload.name, payload.category);
    if let Some(status) = payload.availability_status {
        equipment.availability_status = status;
    }
    equipment.weight_range_min = payload.weight_range_min;
    equipment.weight_range_max = payload.weight_range_max;
    if let Some(quantity) = payload.quantity {
        equipment.quantity = quantity;
    }
    equipment.notes = payload.notes;

    sqlx::query(
        "INSERT INTO equipment \
         (id, user_id, name, category, availability_status, weight_range_min, \
          weight_range_max, quantity, notes, created_at, updated_at) \
         VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11)",
    )
    .bind(&equipment.id)
    .bind(&equipment.user_id)
    .bind(&equipment.name)
    .bind(&equipment.category)
    .bind(equipment.availability_status)
    .bind(equipment.weight_range_min)
    .bind(equipment.weight_range_max)
    .bind(equipment.quantity)
    .bind(&equipment.notes)
    .bind(equipment.created_at)
    .bind(equipment.updated_at)
    .execute(&state.pool)
    .await?;

    Ok((StatusCode::CREATED, Json(equipment)))
}

pub async fn get_equipment(
    State(state): State<AppState>,
    Extension(user): Extension<User>,
    Path(equipment_id): Path<String>,
) -> Result<impl IntoResponse, AppError> {
    let equipment = find_equipment(&state.pool, &user.id, &equipment_id).await?;
    Ok(Json(equipment))
}

pub async fn update_equipment(
    State(state): State<AppState>,
    Extension(user): Extension<User>,
    Path(equipment_id): Path<String>,
    Json(payload): Json<UpdateEquipmentRequest>,
) -> Result<impl IntoResponse, AppError> {
    payload.validate()?;

    let mut equipment = find_equipment(&state.pool, &user.id, &equipment_id).await?;
    if let Some(name) = payload.name {
        equipment.name = name;
    }
    if let Some(category) = payload.category {
        equipment.category = category;
    }
    if let Some(status) = payload.availability_status {
        equipment.availability_status = status;
    }
    if payload.weight_range_min.is_some() {
        equipment.weight_range_min = payload.weight_range_min;
    }
    if payload.weight_range_max.is_some() {
        equipment.weight_range_max = payload.weight_range_max;
    }
    if let Some(quantity) = payload.quantity {
        equipment.quantity = quantity;
    }
    if payload.notes.is_some() {
        equipment.notes = payload.notes;
    }
    equipment.updated_at = Utc::now();

    sqlx::query(
        "UPDATE equipment SET name = $2, category = $3, availability_status = $4, \
         weight_range_min = $5, weight_range_max = $6, quantity = $7, notes = $8, \
         updated_at = $9 WHERE id = $1",
    )
    .bind(&equipment.id)
    .bind(&equipment.name)
    .bind(&equipment.category)
    .bind(equipment.availability_status)
    .bind(equipment.weight_range_min)
    .bind(equipment.weight_range_max)
    .bind(equipment.quantity)
    .bind(&equipment.notes)
    .bind(equipment.updated_at)
    .execute(&state.pool)
    .await?;

    Ok(Json(equipment))
}

pub async fn delete_equipment(
    State(state): State<AppState>,
    Extension(user): Extension<User>,
    Path(equipment_id): Path<String>,
) -> Result<impl IntoResponse, AppError> {
    let result = sqlx::query("DELETE FROM equipment WHERE id = $1 AND user_id = $2")
        .bind(&equipment_id)
        .bind(&user.id)
        .execute(&state.pool)
        .await?;

    if result.rows_affected() == 0 {
        return Err(AppError::NotFound("Equipment not found".to_string()));
    }
    Ok(StatusCode::NO_CONTENT)
}

/// Global equipment catalog, not scoped to the user.
pub async fn list_equipment_templates(
    State(state): State<AppState>,
) -> Result<impl IntoResponse, AppError> {
    let templates = sqlx::query_as::<_, EquipmentTemplate>(
        "SELECT id, name, category, description, typical_exercises, created_at \
         FROM equipment_templates ORDER BY name",
    )
    .fetch_all(&state.pool)
    .await?;

    Ok(Json(templates))
}
