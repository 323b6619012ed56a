//! Registration, login and refresh-token handlers.

use axum::{extract::State, http::StatusCode, response::IntoResponse, Extension, Json};
use serde::Deserialize;
use validator::Validate;

use crate::error::AppError;
use crate::models::user::{LoginRequest, LoginResponse, RegisterRequest, User, UserResponse};
use crate::state::AppState;
use crate::utils::jwt::{
    create_access_token, create_refresh_token, decode_refresh_token, verify_refresh_secret,
    RefreshToken,
};
use crate::utils::password::{hash_password, verify_password};

async fn store_refresh_token(
    pool: &sqlx::PgPool,
    token: &RefreshToken,
) -> Result<(), sqlx::Error> {
    sqlx::query(
        "INSERT INTO refresh_tokens (id, user_id, token_hash, expires_at) \
         VALUES ($1, $2, $3, $4)",
    )
    .bind(&token.id)
    .bind(&token.user_id)
    .bind(&token.token_hash)
    .bind(token.expires_at)
    .execute(pool)
    .await?;
    Ok(())
}

async fn issue_tokens(state: &AppState, user: &User) -> Result<LoginResponse, AppError> {
    let access_token = create_access_token(
        user.id.clone(),
        user.username.clone(),
        &state.config.jwt_secret,
        state.config.jwt_expiration_hours,
    )?;
    let refresh_token =
        create_refresh_token(user.id.clone(), state.config.refresh_token_expiration_days)?;
    store_refresh_token(&state.pool, &refresh_token).await?;

    Ok(LoginResponse {
        access_token,
        refresh_token: refresh_token.encoded(),
        user: UserResponse::from(user.clone()),
    })
}

pub async fn register(
    State(state): State<AppState>,
    Json(payload): Json<RegisterRequest>,
) -> Result<impl IntoResponse, AppError> {
    payload.validate()?;

    let existing = sqlx::query_scalar::<_, String>(
        "SELECT id FROM users WHERE username = $1 OR email = $2",
    )
    .bind(&payload.username)
    .bind(&payload.email)
    .fetch_optional(&state.pool)
    .await?;
    if existing.is_some() {
        return Err(AppError::Conflict(
            "Username or email already taken".to_string(),
        ));
    }

    let password_hash = hash_password(&payload.password)?;
    let user = User::new(
        payload.username,
        payload.email,
        password_hash,
        payload.full_name,
    );

    sqlx::query(
        "INSERT INTO users (id, username, email, password_hash, full_name, created_at, updated_at) \
         VALUES ($1, $2, $3, $4, $5, $6, $7)",
    )
    .bind(&user.id)
    .bind(&user.username)
    .bind(&user.email)
    .bind(&user.password_hash)
    .bind(&user.full_name)
    .bind(user.created_at)
    .bind(user.updated_at)
    .execute(&state.pool)
    .await?;

    tracing::info!(user_id = %user.id, "New user registered");

    let response = issue_tokens(&state, &user).await?;
    Ok((StatusCode::CREATED, Json(response)))
}

pub async fn login(
    State(state): State<AppState>,
    Json(payload): Json<LoginRequest>,
) -> Result<impl IntoResponse, AppError> {
    let user = sqlx::query_as::<_, User>(
        "SELECT id, username, email, password_hash, full_name, created_at, updated_at \
         FROM users WHERE username = $1",
    )
    .bind(&payload.username)
    .fetch_optional(&state.pool)
    .await?
    .ok_or_else(|| AppError::Unauthorized("Invalid username or password".to_string()))?;

    if !verify_password(&payload.password, &user.password_hash)? {
        return Err(AppError::Unauthorized(
            "Invalid username or password".to_string(),
        ));
    }

    let response = issue_tokens(&state, &user).await?;
    Ok(Json(response))
}

#[derive(Debug, Deserialize)]
pub struct RefreshRequest {
    pub refresh_token: String,
}

#[derive(Debug, sqlx::FromRow)]
struct StoredRefreshToken {
    user_id: String,
    token_hash: String,
    expires_at: chrono::DateTime<chrono::Utc>,
}

/// Rotates the refresh token: the presented token is consumed and a new
/// pair is issued.
pub async fn refresh(
    State(state): State<AppState>,
    Json(payload): Json<RefreshRequest>,
) -> Result<impl IntoResponse, AppError> {
    let (token_id, secret) = decode_refresh_token(&payload.refresh_token)
        .map_err(|_| AppError::Unauthorized("Invalid refresh token".to_string()))?;

    let stored = sqlx::query_as::<_, StoredRefreshToken>(
        "SELECT user_id, token_hash, expires_at FROM refresh_tokens WHERE id = $1",
    )
    .bind(&token_id)
    .fetch_optional(&state.pool)
    .await?
    .ok_or_else(|| AppError::Unauthorized("Invalid refresh token".to_string()))?;

    if stored.expires_at <= chrono::Utc::now()
        || !verify_refresh_secret(&secret, &stored.token_hash)?
    {
        return Err(AppError::Unauthorized("Invalid refresh token".to_string()));
    }

    let user = sqlx::query_as::<_, User>(
        "SELECT id, username, email, password_hash, full_name, created_at, updated_at \
         FROM users WHERE id = $1",
    )
    .bind(&stored.user_id)
    .fetch_optional(&state.pool)
    .await?
    .ok_or_else(|| AppError::Unauthorized("Invalid refresh token".to_string()))?;

    sqlx::query("DELETE FROM refresh_tokens WHERE id = $1")
        .bind(&token_id)
        .execute(&state.pool)
        .await?;

    let response = issue_tokens(&state, &user).await?;
    Ok(Json(response))
}

pub async fn logout(
    State(state): State<AppState>,
    Extension(user): Extension<User>,
    Json(payload): Json<RefreshRequest>,
) -> Result<impl IntoResponse, AppError> {
    if let Ok((token_id, _)) = decode_refresh_token(&payload.refresh_token) {
        sqlx::query("DELETE FROM refresh_tokens WHERE id = $1 AND user_id = $2")
            .bind(&token_id)
            .bind(&user.id)
            .execute(&state.pool)
            .await?;
    }
    Ok(StatusCode::NO_CONTENT)
}

pub async fn me(Extension(user): Extension<User>) -> Json<UserResponse> {
    Json(UserResponse::from(user))
}
