//! Calendar OAuth connect/callback and session sync handlers.

use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    response::IntoResponse,
    Extension, Json,
};
use chrono::{Duration, Utc};
use serde::{Deserialize, Serialize};

use crate::error::AppError;
use crate::models::calendar::{CalendarIntegration, CalendarProvider, CalendarStatusEntry};
use crate::models::user::User;
use crate::services::calendar::{self, WorkoutEvent};
use crate::state::AppState;

const INTEGRATION_COLUMNS: &str =
    "id, user_id, provider, access_token, refresh_token, token_expiry, calendar_id, \
     is_active, created_at, updated_at";

fn parse_provider(value: &str) -> Result<CalendarProvider, AppError> {
    CalendarProvider::parse(value)
        .ok_or_else(|| AppError::NotFound(format!("Unknown calendar provider '{}'", value)))
}

#[derive(Debug, Serialize)]
pub struct ConnectResponse {
    pub authorization_url: String,
}

/// Returns the provider consent URL. The OAuth state parameter carries
/// the user id so the public callback can attribute the tokens.
pub async fn connect(
    State(state): State<AppState>,
    Extension(user): Extension<User>,
    Path(provider): Path<String>,
) -> Result<impl IntoResponse, AppError> {
    let provider = parse_provider(&provider)?;
    let authorization_url = calendar::authorization_url(&state.config, provider, &user.id)?;
    Ok(Json(ConnectResponse { authorization_url }))
}

#[derive(Debug, Deserialize)]
pub struct CallbackQuery {
    pub code: String,
    pub state: String,
}

/// OAuth redirect target. Exchanges the code and upserts the integration
/// for the user named in the state parameter.
pub async fn callback(
    State(state): State<AppState>,
    Path(provider): Path<String>,
    Query(query): Query<CallbackQuery>,
) -> Result<impl IntoResponse, AppError> {
    let provider = parse_provider(&provider)?;

    let user_exists = sqlx::query_scalar::<_, String>("SELECT id FROM users WHERE id = $1")
        .bind(&query.state)
        .fetch_optional(&state.pool)
        .await?
        .is_some();
    if !user_exists {
        return Err(AppError::BadRequest("Invalid OAuth state".to_string()));
    }

    let tokens = calendar::exchange_code(&state.http, &state.config, provider, &query.code).await?;

    let now = Utc::now();
    let token_expiry = tokens.expiry(now);
    let mut integration =
        CalendarIntegration::new(query.state.clone(), provider, tokens.access_token);
    integration.refresh_token = tokens.refresh_token;
    integration.token_expiry = token_expiry;

    sqlx::query(
        "INSERT INTO calendar_integrations \
         (id, user_id, provider, access_token, refresh_token, token_expiry, calendar_id, \
          is_active, created_at, updated_at) \
         VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10) \
         ON CONFLICT (user_id, provider) DO UPDATE SET \
            access_token = EXCLUDED.access_token, \
            refresh_token = COALESCE(EXCLUDED.refresh_token, calendar_integrations.refresh_token), \
            token_expiry = EXCLUDED.token_expiry, \
            is_active = TRUE, \
            updated_at = EXCLUDED.updated_at",
    )
    .bind(&integration.id)
    .bind(&integration.user_id)
    .bind(integration.provider)
    .bind(&integration.access_token)
    .bind(&integration.refresh_token)
    .bind(integration.token_expiry)
    .bind(&integration.calendar_id)
    .bind(integration.is_active)
    .bind(integration.created_at)
    .bind(integration.updated_at)
    .execute(&state.pool)
    .await?;

    tracing::info!(user_id = %integration.user_id, provider = provider.as_str(), "Calendar connected");

    Ok(Json(serde_json::json!({
        "message": format!("{} calendar connected", provider.as_str())
    })))
}

pub async fn status(
    State(state): State<AppState>,
    Extension(user): Extension<User>,
) -> Result<impl IntoResponse, AppError> {
    let integrations = sqlx::query_as::<_, CalendarIntegration>(&format!(
        "SELECT {} FROM calendar_integrations WHERE user_id = $1 AND is_active = TRUE",
        INTEGRATION_COLUMNS
    ))
    .bind(&user.id)
    .fetch_all(&state.pool)
    .await?;

    let entries: Vec<CalendarStatusEntry> =
        [CalendarProvider::Google, CalendarProvider::Microsoft]
            .into_iter()
            .map(|provider| {
                let integration = integrations
                    .iter()
                    .find(|integration| integration.provider == provider);
                CalendarStatusEntry {
                    provider,
                    connected: integration.is_some(),
                    calendar_id: integration.and_then(|i| i.calendar_id.clone()),
                }
            })
            .collect();

    Ok(Json(entries))
}

pub async fn disconnect(
    State(state): State<AppState>,
    Extension(user): Extension<User>,
    Path(provider): Path<String>,
) -> Result<impl IntoResponse, AppError> {
    let provider = parse_provider(&provider)?;
    let result = sqlx::query(
        "DELETE FROM calendar_integrations WHERE user_id = $1 AND provider = $2",
    )
    .bind(&user.id)
    .bind(provider)
    .execute(&state.pool)
    .await?;

    if result.rows_affected() == 0 {
        return Err(AppError::NotFound("Calendar integration not found".to_string()));
    }
    Ok(StatusCode::NO_CONTENT)
}

/// Refreshes the stored access token when expired, persisting the new one.
async fn usable_access_token(
    state: &AppState,
    integration: &CalendarIntegration,
) -> Result<String, AppError> {
    if !integration.token_expired(Utc::now()) {
        return Ok(integration.access_token.clone());
    }
    let refresh_token = integration.refresh_token.as_deref().ok_or_else(|| {
        AppError::Upstream(format!(
            "{} access token expired and no refresh token is stored",
            integration.provider.as_str()
        ))
    })?;

    let tokens = calendar::refresh_access_token(
        &state.http,
        &state.config,
        integration.provider,
        refresh_token,
    )
    .await?;

    let now = Utc::now();
    sqlx::query(
        "UPDATE calendar_integrations SET access_token = $2, \
         refresh_token = COALESCE($3, refresh_token), token_expiry = $4, updated_at = $5 \
         WHERE id = $1",
    )
    .bind(&integration.id)
    .bind(&tokens.access_token)
    .bind(&tokens.refresh_token)
    .bind(tokens.expiry(now))
    .bind(now)
    .execute(&state.pool)
    .await?;

    Ok(tokens.access_token)
}

#[derive(Debug, Serialize)]
pub struct SyncResult {
    pub provider: CalendarProvider,
    pub event_id: String,
}

/// Creates a calendar event for a scheduled session on every connected
/// provider.
pub async fn sync_session(
    State(state): State<AppState>,
    Extension(user): Extension<User>,
    Path(session_id): Path<String>,
) -> Result<impl IntoResponse, AppError> {
    #[derive(sqlx::FromRow)]
    struct SessionForSync {
        scheduled_date: Option<chrono::DateTime<Utc>>,
        duration_minutes: Option<i32>,
        workout_name: String,
        workout_type: String,
    }

    let session = sqlx::query_as::<_, SessionForSync>(
        "SELECT ws.scheduled_date, w.duration_minutes, w.name AS workout_name, \
         w.workout_type \
         FROM workout_sessions ws JOIN workouts w ON w.id = ws.workout_id \
         WHERE ws.id = $1 AND ws.user_id = $2",
    )
    .bind(&session_id)
    .bind(&user.id)
    .fetch_optional(&state.pool)
    .await?
    .ok_or_else(|| AppError::NotFound("Session not found".to_string()))?;

    let start = session.scheduled_date.ok_or_else(|| {
        AppError::BadRequest("Session has no scheduled date to sync".to_string())
    })?;
    let end = start + Duration::minutes(session.duration_minutes.unwrap_or(60) as i64);

    let integrations = sqlx::query_as::<_, CalendarIntegration>(&format!(
        "SELECT {} FROM calendar_integrations WHERE user_id = $1 AND is_active = TRUE",
        INTEGRATION_COLUMNS
    ))
    .bind(&user.id)
    .fetch_all(&state.pool)
    .await?;

    if integrations.is_empty() {
        return Err(AppError::BadRequest(
            "No calendar integration connected".to_string(),
        ));
    }

    let event = WorkoutEvent {
        title: format!("Workout: {}", session.workout_name),
        description: format!("{} session scheduled via ForgeFit", session.workout_type),
        start,
        end,
    };

    let mut results = Vec::with_capacity(integrations.len());
    for integration in &integrations {
        let access_token = usable_access_token(&state, integration).await?;
        let event_id = calendar::create_event(
            &state.http,
            integration.provider,
            &access_token,
            integration.calendar_id.as_deref(),
            &event,
        )
        .await?;
        results.push(SyncResult {
            provider: integration.provider,
            event_id,
        });
    }

    Ok(Json(results))
}
