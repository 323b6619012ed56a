//! Thin Stripe REST client for customers, subscriptions and webhooks.
//!
//! Uses the form-encoded v1 API directly. Webhook payloads are trusted as
//! received; signature verification is handled upstream of this service.

use chrono::{DateTime, Utc};
use serde::Deserialize;

use crate::error::AppError;

const STRIPE_API_BASE: &str = "https://api.stripe.com/v1";

#[derive(Debug, Deserialize)]
pub struct StripeCustomer {
    pub id: String,
}

#[derive(Debug, Deserialize)]
pub struct StripeSubscription {
    pub id: String,
    pub status: String,
    pub current_period_start: Option<i64>,
    pub current_period_end: Option<i64>,
    #[serde(default)]
    pub cancel_at_period_end: bool,
}

impl StripeSubscription {
    pub fn period_start(&self) -> Option<DateTime<Utc>> {
        self.current_period_start
            .and_then(|secs| DateTime::from_timestamp(secs, 0))
    }

    pub fn period_end(&self) -> Option<DateTime<Utc>> {
        self.current_period_end
            .and_then(|secs| DateTime::from_timestamp(secs, 0))
    }
}

/// Webhook envelope; `data.object` stays untyped since each event type
/// carries a different object.
#[derive(Debug, Deserialize)]
pub struct WebhookEvent {
    #[serde(rename = "type")]
    pub event_type: String,
    pub data: WebhookData,
}

#[derive(Debug, Deserialize)]
pub struct WebhookData {
    pub object: serde_json::Value,
}

impl WebhookEvent {
    pub fn customer_id(&self) -> Option<&str> {
        self.data.object.get("customer").and_then(|v| v.as_str())
    }

    pub fn object_id(&self) -> Option<&str> {
        self.data.object.get("id").and_then(|v| v.as_str())
    }

    pub fn amount_cents(&self) -> Option<i64> {
        self.data
            .object
            .get("amount_paid")
            .or_else(|| self.data.object.get("amount_due"))
            .and_then(|v| v.as_i64())
    }
}

async fn read_error(response: reqwest::Response, context: &str) -> AppError {
    let status = response.status();
    let detail = response
        .json::<serde_json::Value>()
        .await
        .ok()
        .and_then(|body| {
            body.get("error")
                .and_then(|e| e.get("message"))
                .and_then(|m| m.as_str())
                .map(str::to_string)
        })
        .unwrap_or_else(|| status.to_string());
    AppError::Upstream(format!("Stripe {} failed: {}", context, detail))
}

pub async fn create_customer(
    http: &reqwest::Client,
    secret_key: &str,
    email: &str,
    name: &str,
) -> Result<StripeCustomer, AppError> {
    let response = http
        .post(format!("{}/customers", STRIPE_API_BASE))
        .bearer_auth(secret_key)
        .form(&[("email", email), ("name", name)])
        .send()
        .await?;

    if !response.status().is_success() {
        return Err(read_error(response, "customer creation").await);
    }
    Ok(response.json().await?)
}

pub async fn create_subscription(
    http: &reqwest::Client,
    secret_key: &str,
    customer_id: &str,
    price_id: &str,
    payment_method_id: Option<&str>,
) -> Result<StripeSubscription, AppError> {
    let mut form = vec![
        ("customer", customer_id),
        ("items[0][price]", price_id),
    ];
    if let Some(payment_method) = payment_method_id {
        form.push(("default_payment_method", payment_method));
    }

    let response = http
        .post(format!("{}/subscriptions", STRIPE_API_BASE))
        .bearer_auth(secret_key)
        .form(&form)
        .send()
        .await?;

    if !response.status().is_success() {
        return Err(read_error(response, "subscription creation").await);
    }
    Ok(response.json().await?)
}

/// Cancels at period end by default; immediate cancellation deletes the
/// subscription outright.
pub async fn cancel_subscription(
    http: &reqwest::Client,
    secret_key: &str,
    subscription_id: &str,
    at_period_end: bool,
) -> Result<StripeSubscription, AppError> {
    let response = if at_period_end {
        http.post(format!(
            "{}/subscriptions/{}",
            STRIPE_API_BASE, subscription_id
        ))
        .bearer_auth(secret_key)
        .form(&[("cancel_at_period_end", "true")])
        .send()
        .await?
    } else {
        http.delete(format!(
            "{}/subscriptions/{}",
            STRIPE_API_BASE, subscription_id
        ))
        .bearer_auth(secret_key)
        .send()
        .await?
    };

    if !response.status().is_success() {
        return Err(read_error(response, "subscription cancellation").await);
    }
    Ok(response.json().await?)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn webhook_event_extracts_customer_and_amount() {
        let event: WebhookEvent = serde_json::from_str(
            r#"{
                "type": "invoice.payment_succeeded",
                "data": {
                    "object": {
                        "id": "in_123",
                        "customer": "cus_456",
                        "amount_paid": 1999
                    }
                }
            }"#,
        )
        .unwrap();
        assert_eq!(event.event_type, "invoice.payment_succeeded");
        assert_eq!(event.customer_id(), Some("cus_456"));
        assert_eq!(event.object_id(), Some("in_123"));
        assert_eq!(event.amount_cents(), Some(1999));
    }

    #[test]
    fn webhook_event_falls_back_to_amount_due() {
        let event: WebhookEvent = serde_json::from_str(
            r#"{
                "type": "invoice.payment_failed",
                "data": { "object": { "customer": "cus_1", "amount_due": 3999 } }
            }"#,
        )
        .unwrap();
        assert_eq!(event.amount_cents(), Some(3999));
        assert_eq!(event.object_id(), None);
    }

    #[test]
    fn subscription_periods_convert_from_unix() {
        let subscription: StripeSubscription = serde_json::from_str(
            r#"{
                "id": "sub_1",
                "status": "active",
                "current_period_start": 1735689600,
                "current_period_end": 1738368000
            }"#,
        )
        .unwrap();
        let start = subscription.period_start().unwrap();
        assert_eq!(start.timestamp(), 1735689600);
        assert!(!subscription.cancel_at_period_end);
    }
}
