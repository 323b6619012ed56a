//! OAuth plumbing and event creation for Google and Microsoft calendars.

use chrono::{DateTime, SecondsFormat, Utc};
use serde::Deserialize;
use serde_json::json;
use url::Url;

use crate::config::Config;
use crate::error::AppError;
use crate::models::calendar::CalendarProvider;

const GOOGLE_AUTH_URL: &str = "https://accounts.google.com/o/oauth2/v2/auth";
const GOOGLE_TOKEN_URL: &str = "https://oauth2.googleapis.com/token";
const GOOGLE_SCOPE: &str = "https://www.googleapis.com/auth/calendar.events";

const MICROSOFT_AUTH_URL: &str =
    "https://login.microsoftonline.com/common/oauth2/v2.0/authorize";
const MICROSOFT_TOKEN_URL: &str =
    "https://login.microsoftonline.com/common/oauth2/v2.0/token";
const MICROSOFT_SCOPE: &str = "offline_access Calendars.ReadWrite";

/// Token payload returned by both providers' token endpoints.
#[derive(Debug, Deserialize)]
pub struct TokenResponse {
    pub access_token: String,
    pub refresh_token: Option<String>,
    pub expires_in: Option<i64>,
}

impl TokenResponse {
    pub fn expiry(&self, now: DateTime<Utc>) -> Option<DateTime<Utc>> {
        self.expires_in
            .map(|seconds| now + chrono::Duration::seconds(seconds))
    }
}

/// Calendar event describing a scheduled workout session.
#[derive(Debug, Clone)]
pub struct WorkoutEvent {
    pub title: String,
    pub description: String,
    pub start: DateTime<Utc>,
    pub end: DateTime<Utc>,
}

struct OAuthClient<'a> {
    client_id: &'a str,
    client_secret: &'a str,
    redirect_uri: &'a str,
    auth_url: &'a str,
    token_url: &'a str,
    scope: &'a str,
}

fn oauth_client(config: &Config, provider: CalendarProvider) -> OAuthClient<'_> {
    match provider {
        CalendarProvider::Google => OAuthClient {
            client_id: &config.google_client_id,
            client_secret: &config.google_client_secret,
            redirect_uri: &config.google_redirect_uri,
            auth_url: GOOGLE_AUTH_URL,
            token_url: GOOGLE_TOKEN_URL,
            scope: GOOGLE_SCOPE,
        },
        CalendarProvider::Microsoft => OAuthClient {
            client_id: &config.microsoft_client_id,
            client_secret: &config.microsoft_client_secret,
            redirect_uri: &config.microsoft_redirect_uri,
            auth_url: MICROSOFT_AUTH_URL,
            token_url: MICROSOFT_TOKEN_URL,
            scope: MICROSOFT_SCOPE,
        },
    }
}

/// Builds the provider consent URL the client is redirected to.
pub fn authorization_url(
    config: &Config,
    provider: CalendarProvider,
    state: &str,
) -> Result<String, AppError> {
    let client = oauth_client(config, provider);
    let mut params = vec![
        ("client_id", client.client_id),
        ("redirect_uri", client.redirect_uri),
        ("response_type", "code"),
        ("scope", client.scope),
        ("state", state),
    ];
    if provider == CalendarProvider::Google {
        params.push(("access_type", "offline"));
        params.push(("prompt", "consent"));
    }

    let url = Url::parse_with_params(client.auth_url, params)
        .map_err(|err| AppError::InternalServerError(err.into()))?;
    Ok(url.into())
}

/// Exchanges the OAuth authorization code for tokens.
pub async fn exchange_code(
    http: &reqwest::Client,
    config: &Config,
    provider: CalendarProvider,
    code: &str,
) -> Result<TokenResponse, AppError> {
    let client = oauth_client(config, provider);
    let response = http
        .post(client.token_url)
        .form(&[
            ("client_id", client.client_id),
            ("client_secret", client.client_secret),
            ("redirect_uri", client.redirect_uri),
            ("grant_type", "authorization_code"),
            ("code", code),
        ])
        .send()
        .await?;

    if !response.status().is_success() {
        return Err(AppError::Upstream(format!(
            "{} token exchange failed with status {}",
            provider.as_str(),
            response.status()
        )));
    }
    Ok(response.json().await?)
}

/// Trades a refresh token for a fresh access token.
pub async fn refresh_access_token(
    http: &reqwest::Client,
    config: &Config,
    provider: CalendarProvider,
    refresh_token: &str,
) -> Result<TokenResponse, AppError> {
    let client = oauth_client(config, provider);
    let mut form = vec![
        ("client_id", client.client_id),
        ("client_secret", client.client_secret),
        ("grant_type", "refresh_token"),
        ("refresh_token", refresh_token),
    ];
    if provider == CalendarProvider::Microsoft {
        form.push(("scope", client.scope));
    }

    let response = http.post(client.token_url).form(&form).send().await?;
    if !response.status().is_success() {
        return Err(AppError::Upstream(format!(
            "{} token refresh failed with status {}",
            provider.as_str(),
            response.status()
        )));
    }
    Ok(response.json().await?)
}

fn rfc3339(value: DateTime<Utc>) -> String {
    value.to_rfc3339_opts(SecondsFormat::Secs, true)
}

/// Creates the workout event on the user's calendar, returning the
/// provider's event id.
pub async fn create_event(
    http: &reqwest::Client,
    provider: CalendarProvider,
    access_token: &str,
    calendar_id: Option<&str>,
    event: &WorkoutEvent,
) -> Result<String, AppError> {
    let (url, body) = match provider {
        CalendarProvider::Google => {
            let calendar = calendar_id.unwrap_or("primary");
            (
                format!(
                    "https://www.googleapis.com/calendar/v3/calendars/{}/events",
                    calendar
                ),
                json!({
                    "summary": event.title,
                    "description": event.description,
                    "start": { "dateTime": rfc3339(event.start) },
                    "end": { "dateTime": rfc3339(event.end) },
                }),
            )
        }
        CalendarProvider::Microsoft => (
            "https://graph.microsoft.com/v1.0/me/events".to_string(),
            json!({
                "subject": event.title,
                "body": { "contentType": "text", "content": event.description },
                "start": { "dateTime": rfc3339(event.start), "timeZone": "UTC" },
                "end": { "dateTime": rfc3339(event.end), "timeZone": "UTC" },
            }),
        ),
    };

    let response = http
        .post(url)
        .bearer_auth(access_token)
        .json(&body)
        .send()
        .await?;

    if !response.status().is_success() {
        return Err(AppError::Upstream(format!(
            "{} event creation failed with status {}",
            provider.as_str(),
            response.status()
        )));
    }

    #[derive(Deserialize)]
    struct CreatedEvent {
        id: String,
    }
    let created: CreatedEvent = response.json().await?;
    Ok(created.id)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn test_config() -> Config {
        let mut config = Config::load().expect("load config");
        config.google_client_id = "google-client".into();
        config.google_redirect_uri = "http://localhost:3000/api/calendar/google/callback".into();
        config.microsoft_client_id = "ms-client".into();
        config
    }

    #[test]
    fn google_authorization_url_carries_offline_access() {
        let config = test_config();
        let url = authorization_url(&config, CalendarProvider::Google, "state-123").unwrap();
        assert!(url.starts_with(GOOGLE_AUTH_URL));
        assert!(url.contains("client_id=google-client"));
        assert!(url.contains("state=state-123"));
        assert!(url.contains("access_type=offline"));
        assert!(url.contains("response_type=code"));
    }

    #[test]
    fn microsoft_authorization_url_requests_calendar_scope() {
        let config = test_config();
        let url = authorization_url(&config, CalendarProvider::Microsoft, "xyz").unwrap();
        assert!(url.starts_with(MICROSOFT_AUTH_URL));
        assert!(url.contains("client_id=ms-client"));
        assert!(url.contains("Calendars.ReadWrite"));
        assert!(!url.contains("access_type=offline"));
    }

    #[test]
    fn token_expiry_derived_from_expires_in() {
        let now = Utc::now();
        let token = TokenResponse {
            access_token: "tok".into(),
            refresh_token: None,
            expires_in: Some(3600),
        };
        assert_eq!(token.expiry(now), Some(now + chrono::Duration::seconds(3600)));

        let token = TokenResponse {
            access_token: "tok".into(),
            refresh_token: None,
            expires_in: None,
        };
        assert_eq!(token.expiry(now), None);
    }
}
