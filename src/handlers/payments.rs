//! Subscription billing and Stripe webhook handlers.

use axum::{
    extract::{Query, State},
    http::StatusCode,
    response::IntoResponse,
    Extension, Json,
};
use chrono::Utc;
use serde::Serialize;
use uuid::Uuid;

use crate::config::Plan;
use crate::error::AppError;
use crate::models::subscription::{
    PaymentRecord, PlanType, SubscribeRequest, Subscription, SubscriptionStatus,
};
use crate::models::user::User;
use crate::models::{PaginatedResponse, PaginationQuery};
use crate::services::stripe::{self, WebhookEvent};
use crate::state::AppState;

const SUBSCRIPTION_COLUMNS: &str =
    "id, user_id, plan_type, status, stripe_customer_id, stripe_subscription_id, \
     current_period_start, current_period_end, cancel_at_period_end, created_at, updated_at";

fn map_stripe_status(status: &str) -> SubscriptionStatus {
    match status {
        "active" => SubscriptionStatus::Active,
        "trialing" => SubscriptionStatus::Trialing,
        "past_due" | "incomplete" | "incomplete_expired" | "unpaid" => {
            SubscriptionStatus::PastDue
        }
        "canceled" | "cancelled" => SubscriptionStatus::Cancelled,
        other => {
            tracing::warn!(status = other, "Unrecognized Stripe subscription status");
            SubscriptionStatus::PastDue
        }
    }
}

/// Loads the user's subscription, creating the free-tier row on first
/// access.
async fn ensure_subscription(
    pool: &sqlx::PgPool,
    user_id: &str,
) -> Result<Subscription, AppError> {
    if let Some(existing) = sqlx::query_as::<_, Subscription>(&format!(
        "SELECT {} FROM subscriptions WHERE user_id = $1",
        SUBSCRIPTION_COLUMNS
    ))
    .bind(user_id)
    .fetch_optional(pool)
    .await?
    {
        return Ok(existing);
    }

    let subscription = Subscription::new(user_id.to_string());
    sqlx::query(
        "INSERT INTO subscriptions \
         (id, user_id, plan_type, status, stripe_customer_id, stripe_subscription_id, \
          current_period_start, current_period_end, cancel_at_period_end, created_at, updated_at) \
         VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11) \
         ON CONFLICT (user_id) DO NOTHING",
    )
    .bind(&subscription.id)
    .bind(&subscription.user_id)
    .bind(subscription.plan_type)
    .bind(subscription.status)
    .bind(&subscription.stripe_customer_id)
    .bind(&subscription.stripe_subscription_id)
    .bind(subscription.current_period_start)
    .bind(subscription.current_period_end)
    .bind(subscription.cancel_at_period_end)
    .bind(subscription.created_at)
    .bind(subscription.updated_at)
    .execute(pool)
    .await?;

    Ok(subscription)
}

async fn save_subscription(
    pool: &sqlx::PgPool,
    subscription: &Subscription,
) -> Result<(), sqlx::Error> {
    sqlx::query(
        "UPDATE subscriptions SET plan_type = $2, status = $3, stripe_customer_id = $4, \
         stripe_subscription_id = $5, current_period_start = $6, current_period_end = $7, \
         cancel_at_period_end = $8, updated_at = $9 WHERE id = $1",
    )
    .bind(&subscription.id)
    .bind(subscription.plan_type)
    .bind(subscription.status)
    .bind(&subscription.stripe_customer_id)
    .bind(&subscription.stripe_subscription_id)
    .bind(subscription.current_period_start)
    .bind(subscription.current_period_end)
    .bind(subscription.cancel_at_period_end)
    .bind(subscription.updated_at)
    .execute(pool)
    .await?;
    Ok(())
}

#[derive(Debug, Serialize)]
pub struct PlanEntry {
    pub plan_type: PlanType,
    #[serde(flatten)]
    pub plan: Plan,
}

pub async fn list_plans(State(state): State<AppState>) -> Json<Vec<PlanEntry>> {
    let free = Plan {
        name: "Free Plan".into(),
        price_cents: 0,
        currency: "usd".into(),
        interval: "month".into(),
        stripe_price_id: String::new(),
        features: vec![
            "Basic workout tracking".into(),
            "Rule-based workout generation".into(),
        ],
    };
    Json(vec![
        PlanEntry {
            plan_type: PlanType::Free,
            plan: free,
        },
        PlanEntry {
            plan_type: PlanType::Premium,
            plan: state.config.premium_plan.clone(),
        },
        PlanEntry {
            plan_type: PlanType::Pro,
            plan: state.config.pro_plan.clone(),
        },
    ])
}

pub async fn get_subscription(
    State(state): State<AppState>,
    Extension(user): Extension<User>,
) -> Result<impl IntoResponse, AppError> {
    let subscription = ensure_subscription(&state.pool, &user.id).await?;
    Ok(Json(subscription))
}

pub async fn subscribe(
    State(state): State<AppState>,
    Extension(user): Extension<User>,
    Json(payload): Json<SubscribeRequest>,
) -> Result<impl IntoResponse, AppError> {
    let plan_type = PlanType::parse(&payload.plan_type)
        .filter(|plan| *plan != PlanType::Free)
        .ok_or_else(|| {
            AppError::BadRequest(format!("Unknown paid plan '{}'", payload.plan_type))
        })?;
    let plan = state
        .config
        .plan(&payload.plan_type)
        .ok_or_else(|| AppError::BadRequest("Plan is not purchasable".to_string()))?;

    let mut subscription = ensure_subscription(&state.pool, &user.id).await?;

    let customer_id = match &subscription.stripe_customer_id {
        Some(id) => id.clone(),
        None => {
            let customer = stripe::create_customer(
                &state.http,
                &state.config.stripe_secret_key,
                &user.email,
                &user.full_name,
            )
            .await?;
            // Persisted before the subscription call so a failed attempt
            // reuses this customer instead of creating another one.
            subscription.stripe_customer_id = Some(customer.id.clone());
            subscription.updated_at = Utc::now();
            save_subscription(&state.pool, &subscription).await?;
            customer.id
        }
    };

    let stripe_subscription = stripe::create_subscription(
        &state.http,
        &state.config.stripe_secret_key,
        &customer_id,
        &plan.stripe_price_id,
        payload.payment_method_id.as_deref(),
    )
    .await?;

    subscription.plan_type = plan_type;
    subscription.status = map_stripe_status(&stripe_subscription.status);
    subscription.stripe_customer_id = Some(customer_id);
    subscription.stripe_subscription_id = Some(stripe_subscription.id.clone());
    subscription.current_period_start = stripe_subscription.period_start();
    subscription.current_period_end = stripe_subscription.period_end();
    subscription.cancel_at_period_end = false;
    subscription.updated_at = Utc::now();
    save_subscription(&state.pool, &subscription).await?;

    tracing::info!(user_id = %user.id, plan = plan_type.as_str(), "Subscription created");

    Ok(Json(subscription))
}

pub async fn cancel(
    State(state): State<AppState>,
    Extension(user): Extension<User>,
) -> Result<impl IntoResponse, AppError> {
    let mut subscription = ensure_subscription(&state.pool, &user.id).await?;
    let stripe_subscription_id = subscription
        .stripe_subscription_id
        .clone()
        .ok_or_else(|| AppError::BadRequest("No active paid subscription".to_string()))?;

    stripe::cancel_subscription(
        &state.http,
        &state.config.stripe_secret_key,
        &stripe_subscription_id,
        true,
    )
    .await?;

    subscription.cancel_at_period_end = true;
    subscription.updated_at = Utc::now();
    save_subscription(&state.pool, &subscription).await?;

    Ok(Json(subscription))
}

pub async fn payment_history(
    State(state): State<AppState>,
    Extension(user): Extension<User>,
    Query(pagination): Query<PaginationQuery>,
) -> Result<impl IntoResponse, AppError> {
    let total =
        sqlx::query_scalar::<_, i64>("SELECT COUNT(*) FROM payment_history WHERE user_id = $1")
            .bind(&user.id)
            .fetch_one(&state.pool)
            .await?;

    let payments = sqlx::query_as::<_, PaymentRecord>(
        "SELECT id, user_id, amount_cents, currency, status, description, \
         stripe_payment_intent_id, created_at \
         FROM payment_history WHERE user_id = $1 \
         ORDER BY created_at DESC LIMIT $2 OFFSET $3",
    )
    .bind(&user.id)
    .bind(pagination.limit())
    .bind(pagination.offset())
    .fetch_all(&state.pool)
    .await?;

    Ok(Json(PaginatedResponse::new(
        payments,
        total,
        pagination.limit(),
        pagination.offset(),
    )))
}

async fn subscription_by_customer(
    pool: &sqlx::PgPool,
    customer_id: &str,
) -> Result<Option<Subscription>, sqlx::Error> {
    sqlx::query_as::<_, Subscription>(&format!(
        "SELECT {} FROM subscriptions WHERE stripe_customer_id = $1",
        SUBSCRIPTION_COLUMNS
    ))
    .bind(customer_id)
    .fetch_optional(pool)
    .await
}

enum WebhookAction {
    /// Persist the subscription and record a payment of this many cents.
    RecordPayment { amount_cents: i64 },
    /// Persist the subscription.
    Save,
    /// Acknowledge without touching the database.
    Ignore,
}

/// Applies a Stripe webhook event to the local subscription row and
/// reports what the caller must persist.
fn apply_webhook_event(subscription: &mut Subscription, event: &WebhookEvent) -> WebhookAction {
    match event.event_type.as_str() {
        "invoice.payment_succeeded" => {
            subscription.status = SubscriptionStatus::Active;
            WebhookAction::RecordPayment {
                amount_cents: event.amount_cents().unwrap_or(0),
            }
        }
        "invoice.payment_failed" => {
            subscription.status = SubscriptionStatus::PastDue;
            tracing::warn!(user_id = %subscription.user_id, "Subscription payment failed");
            WebhookAction::Save
        }
        "customer.subscription.updated" => {
            match serde_json::from_value::<stripe::StripeSubscription>(event.data.object.clone()) {
                Ok(remote) => {
                    subscription.status = map_stripe_status(&remote.status);
                    subscription.current_period_start = remote.period_start();
                    subscription.current_period_end = remote.period_end();
                    subscription.cancel_at_period_end = remote.cancel_at_period_end;
                    WebhookAction::Save
                }
                Err(error) => {
                    tracing::warn!(%error, "Malformed subscription.updated payload");
                    WebhookAction::Ignore
                }
            }
        }
        "customer.subscription.deleted" => {
            subscription.status = SubscriptionStatus::Cancelled;
            subscription.plan_type = PlanType::Free;
            subscription.stripe_subscription_id = None;
            WebhookAction::Save
        }
        other => {
            tracing::debug!(event_type = other, "Ignoring unhandled Stripe event");
            WebhookAction::Ignore
        }
    }
}

/// Stripe webhook endpoint. The payload is trusted JSON; unrecognized
/// event types are acknowledged and ignored.
pub async fn webhook(
    State(state): State<AppState>,
    Json(event): Json<WebhookEvent>,
) -> Result<impl IntoResponse, AppError> {
    let Some(customer_id) = event.customer_id().map(str::to_string) else {
        return Ok(StatusCode::OK);
    };
    let Some(mut subscription) = subscription_by_customer(&state.pool, &customer_id).await? else {
        tracing::warn!(customer_id = %customer_id, "Webhook for unknown Stripe customer");
        return Ok(StatusCode::OK);
    };

    let action = apply_webhook_event(&mut subscription, &event);
    if let WebhookAction::Ignore = action {
        return Ok(StatusCode::OK);
    }

    if let WebhookAction::RecordPayment { amount_cents } = action {
        sqlx::query(
            "INSERT INTO payment_history \
             (id, user_id, amount_cents, currency, status, description, \
              stripe_payment_intent_id, created_at) \
             VALUES ($1, $2, $3, $4, $5, $6, $7, $8)",
        )
        .bind(Uuid::new_v4().to_string())
        .bind(&subscription.user_id)
        .bind(amount_cents)
        .bind("usd")
        .bind("succeeded")
        .bind(format!("{} subscription payment", subscription.plan_type.as_str()))
        .bind(event.object_id())
        .bind(Utc::now())
        .execute(&state.pool)
        .await?;
    }

    subscription.updated_at = Utc::now();
    save_subscription(&state.pool, &subscription).await?;
    Ok(StatusCode::OK)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn event(json: &str) -> WebhookEvent {
        serde_json::from_str(json).unwrap()
    }

    #[test]
    fn stripe_status_mapping() {
        assert_eq!(map_stripe_status("active"), SubscriptionStatus::Active);
        assert_eq!(map_stripe_status("trialing"), SubscriptionStatus::Trialing);
        assert_eq!(map_stripe_status("past_due"), SubscriptionStatus::PastDue);
        assert_eq!(map_stripe_status("canceled"), SubscriptionStatus::Cancelled);
        assert_eq!(map_stripe_status("incomplete"), SubscriptionStatus::PastDue);
        assert_eq!(map_stripe_status("unpaid"), SubscriptionStatus::PastDue);
        assert_eq!(map_stripe_status("paused"), SubscriptionStatus::PastDue);
    }

    #[test]
    fn payment_succeeded_activates_and_records_payment() {
        let mut subscription = Subscription::new("user-1".to_string());
        subscription.status = SubscriptionStatus::PastDue;
        let action = apply_webhook_event(
            &mut subscription,
            &event(
                r#"{
                    "type": "invoice.payment_succeeded",
                    "data": { "object": { "customer": "cus_1", "amount_paid": 1999 } }
                }"#,
            ),
        );
        assert!(matches!(
            action,
            WebhookAction::RecordPayment { amount_cents: 1999 }
        ));
        assert_eq!(subscription.status, SubscriptionStatus::Active);
    }

    #[test]
    fn payment_failed_marks_past_due() {
        let mut subscription = Subscription::new("user-1".to_string());
        subscription.status = SubscriptionStatus::Active;
        let action = apply_webhook_event(
            &mut subscription,
            &event(
                r#"{
                    "type": "invoice.payment_failed",
                    "data": { "object": { "customer": "cus_1", "amount_due": 1999 } }
                }"#,
            ),
        );
        assert!(matches!(action, WebhookAction::Save));
        assert_eq!(subscription.status, SubscriptionStatus::PastDue);
    }

    #[test]
    fn subscription_updated_refreshes_billing_period() {
        let mut subscription = Subscription::new("user-1".to_string());
        subscription.status = SubscriptionStatus::Active;
        let action = apply_webhook_event(
            &mut subscription,
            &event(
                r#"{
                    "type": "customer.subscription.updated",
                    "data": {
                        "object": {
                            "id": "sub_1",
                            "customer": "cus_1",
                            "status": "active",
                            "current_period_start": 1735689600,
                            "current_period_end": 1738368000,
                            "cancel_at_period_end": true
                        }
                    }
                }"#,
            ),
        );
        assert!(matches!(action, WebhookAction::Save));
        assert_eq!(subscription.status, SubscriptionStatus::Active);
        assert_eq!(
            subscription.current_period_start.map(|t| t.timestamp()),
            Some(1735689600)
        );
        assert_eq!(
            subscription.current_period_end.map(|t| t.timestamp()),
            Some(1738368000)
        );
        assert!(subscription.cancel_at_period_end);
    }

    #[test]
    fn malformed_subscription_update_is_ignored() {
        let mut subscription = Subscription::new("user-1".to_string());
        let before = subscription.status;
        let action = apply_webhook_event(
            &mut subscription,
            &event(
                r#"{
                    "type": "customer.subscription.updated",
                    "data": { "object": { "customer": "cus_1" } }
                }"#,
            ),
        );
        assert!(matches!(action, WebhookAction::Ignore));
        assert_eq!(subscription.status, before);
    }

    #[test]
    fn subscription_deleted_reverts_to_free() {
        let mut subscription = Subscription::new("user-1".to_string());
        subscription.plan_type = PlanType::Premium;
        subscription.status = SubscriptionStatus::Active;
        subscription.stripe_subscription_id = Some("sub_1".to_string());
        let action = apply_webhook_event(
            &mut subscription,
            &event(
                r#"{
                    "type": "customer.subscription.deleted",
                    "data": { "object": { "id": "sub_1", "customer": "cus_1" } }
                }"#,
            ),
        );
        assert!(matches!(action, WebhookAction::Save));
        assert_eq!(subscription.status, SubscriptionStatus::Cancelled);
        assert_eq!(subscription.plan_type, PlanType::Free);
        assert!(subscription.stripe_subscription_id.is_none());
    }

    #[test]
    fn unhandled_events_are_ignored() {
        let mut subscription = Subscription::new("user-1".to_string());
        let action = apply_webhook_event(
            &mut subscription,
            &event(
                r#"{
                    "type": "charge.refunded",
                    "data": { "object": { "customer": "cus_1" } }
                }"#,
            ),
        );
        assert!(matches!(action, WebhookAction::Ignore));
    }
}
