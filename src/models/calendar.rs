//! Calendar integration models.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use uuid::Uuid;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, sqlx::Type)]
#[sqlx(type_name = "TEXT", rename_all = "snake_case")]
#[serde(rename_all = "snake_case")]
pub enum CalendarProvider {
    Google,
    Microsoft,
}

impl CalendarProvider {
    pub fn as_str(&self) -> &'static str {
        match self {
            CalendarProvider::Google => "google",
            CalendarProvider::Microsoft => "microsoft",
        }
    }

    pub fn parse(value: &str) -> Option<Self> {
        match value {
            "google" => Some(CalendarProvider::Google),
            "microsoft" => Some(CalendarProvider::Microsoft),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct CalendarIntegration {
    pub id: String,
    pub user_id: String,
    pub provider: CalendarProvider,
    pub access_token: String,
    pub refresh_token: Option<String>,
    pub token_expiry: Option<DateTime<Utc>>,
    pub calendar_id: Option<String>,
    pub is_active: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl CalendarIntegration {
    pub fn new(user_id: String, provider: CalendarProvider, access_token: String) -> Self {
        let now = Utc::now();
        Self {
            id: Uuid::new_v4().to_string(),
            user_id,
            provider,
            access_token,
            refresh_token: None,
            token_expiry: None,
            calendar_id: None,
            is_active: true,
            created_at: now,
            updated_at: now,
        }
    }

    /// True when the stored access token has passed its recorded expiry.
    pub fn token_expired(&self, now: DateTime<Utc>) -> bool {
        matches!(self.token_expiry, Some(expiry) if expiry <= now)
    }
}

/// Per-provider connection status reported to the client.
#[derive(Debug, Serialize)]
pub struct CalendarStatusEntry {
    pub provider: CalendarProvider,
    pub connected: bool,
    pub calendar_id: Option<String>,
}
