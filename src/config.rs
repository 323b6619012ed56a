use serde::{Deserialize, Serialize};
use std::env;

/// Subscription plan as priced for Stripe (amounts in cents).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Plan {
    pub name: String,
    pub price_cents: i64,
    pub currency: String,
    pub interval: String,
    pub stripe_price_id: String,
    pub features: Vec<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    pub database_url: String,
    pub jwt_secret: String,
    pub jwt_expiration_hours: u64,
    pub refresh_token_expiration_days: u64,

    // LLM generation
    pub llm_api_base: String,
    pub llm_api_key: String,
    pub llm_model: String,

    // Calendar OAuth
    pub google_client_id: String,
    pub google_client_secret: String,
    pub google_redirect_uri: String,
    pub microsoft_client_id: String,
    pub microsoft_client_secret: String,
    pub microsoft_redirect_uri: String,

    // Stripe
    pub stripe_secret_key: String,
    pub premium_plan: Plan,
    pub pro_plan: Plan,
}

impl Config {
    pub fn load() -> anyhow::Result<Self> {
        dotenvy::dotenv().ok();

        let database_url = env::var("DATABASE_URL")
            .unwrap_or_else(|_| "postgres://localhost/forgefit".to_string());

        let jwt_secret = env::var("JWT_SECRET")
            .unwrap_or_else(|_| "your-secret-key-change-this-in-production".to_string());

        let jwt_expiration_hours = env::var("JWT_EXPIRATION_HOURS")
            .unwrap_or_else(|_| "1".to_string())
            .parse()
            .unwrap_or(1);

        let refresh_token_expiration_days = env::var("REFRESH_TOKEN_EXPIRATION_DAYS")
            .unwrap_or_else(|_| "7".to_string())
            .parse()
            .unwrap_or(7);

        let llm_api_base = env::var("LLM_API_BASE")
            .unwrap_or_else(|_| "https://api.openai.com/v1".to_string());
        let llm_api_key = env::var("LLM_API_KEY").unwrap_or_default();
        let llm_model = env::var("LLM_MODEL").unwrap_or_else(|_| "gpt-4".to_string());

        let google_client_id = env::var("GOOGLE_CLIENT_ID").unwrap_or_default();
        let google_client_secret = env::var("GOOGLE_CLIENT_SECRET").unwrap_or_default();
        let google_redirect_uri = env::var("GOOGLE_REDIRECT_URI").unwrap_or_else(|_| {
            "http://localhost:3000/api/calendar/google/callback".to_string()
        });

        let microsoft_client_id = env::var("MICROSOFT_CLIENT_ID").unwrap_or_default();
        let microsoft_client_secret = env::var("MICROSOFT_CLIENT_SECRET").unwrap_or_default();
        let microsoft_redirect_uri = env::var("MICROSOFT_REDIRECT_URI").unwrap_or_else(|_| {
            "http://localhost:3000/api/calendar/microsoft/callback".to_string()
        });

        let stripe_secret_key = env::var("STRIPE_SECRET_KEY").unwrap_or_default();

        Ok(Config {
            database_url,
            jwt_secret,
            jwt_expiration_hours,
            refresh_token_expiration_days,
            llm_api_base,
            llm_api_key,
            llm_model,
            google_client_id,
            google_client_secret,
            google_redirect_uri,
            microsoft_client_id,
            microsoft_client_secret,
            microsoft_redirect_uri,
            stripe_secret_key,
            premium_plan: Plan {
                name: "Premium Plan".into(),
                price_cents: 1999,
                currency: "usd".into(),
                interval: "month".into(),
                stripe_price_id: env::var("STRIPE_PREMIUM_PRICE_ID").unwrap_or_default(),
                features: vec![
                    "AI-powered workout generation".into(),
                    "Unlimited workouts".into(),
                    "Calendar synchronization".into(),
                    "Progress tracking".into(),
                    "Email support".into(),
                ],
            },
            pro_plan: Plan {
                name: "Pro Plan".into(),
                price_cents: 3999,
                currency: "usd".into(),
                interval: "month".into(),
                stripe_price_id: env::var("STRIPE_PRO_PRICE_ID").unwrap_or_default(),
                features: vec![
                    "Everything in Premium".into(),
                    "Advanced analytics".into(),
                    "Priority support".into(),
                    "Custom workout templates".into(),
                ],
            },
        })
    }

    /// Looks up a purchasable plan by its API name.
    pub fn plan(&self, plan_type: &str) -> Option<&Plan> {
        match plan_type {
            "premium" => Some(&self.premium_plan),
            "pro" => Some(&self.pro_plan),
            _ => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn plan_lookup_by_name() {
        let config = Config::load().expect("load config");
        assert_eq!(config.plan("premium").unwrap().price_cents, 1999);
        assert_eq!(config.plan("pro").unwrap().price_cents, 3999);
        assert!(config.plan("platinum").is_none());
    }
}
