use axum::{
    http::Method,
    middleware as axum_middleware,
    routing::{delete, get, post},
    Router,
};
use std::net::SocketAddr;
use tower::ServiceBuilder;
use tower_http::{
    cors::{Any, CorsLayer},
    trace::TraceLayer,
};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use forgefit_backend::{
    config::Config,
    db::{create_pool, DbPool},
    handlers, middleware,
    state::AppState,
};

fn mask_secret(s: &str) -> String {
    if s.is_empty() {
        return "<empty>".into();
    }
    let prefix = s.chars().take(4).collect::<String>();
    format!("{}*** (len={})", prefix, s.len())
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Initialize tracing
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "forgefit_backend=debug,tower_http=debug".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    // Load configuration
    let config = Config::load()?;
    tracing::info!(
        database_url = %config.database_url,
        jwt_secret = %mask_secret(&config.jwt_secret),
        jwt_expiration_hours = config.jwt_expiration_hours,
        refresh_token_expiration_days = config.refresh_token_expiration_days,
        llm_api_base = %config.llm_api_base,
        llm_api_key = %mask_secret(&config.llm_api_key),
        stripe_secret_key = %mask_secret(&config.stripe_secret_key),
        "Loaded configuration from environment/.env"
    );

    // Initialize database
    let pool: DbPool = create_pool(&config.database_url).await?;
    sqlx::migrate!("./migrations").run(&pool).await?;

    let state = AppState::new(pool, config);

    // Public routes (no auth): registration, login, webhooks, OAuth redirects
    let public_routes = Router::new()
        .route("/api/auth/register", post(handlers::auth::register))
        .route("/api/auth/login", post(handlers::auth::login))
        .route("/api/auth/refresh", post(handlers::auth::refresh))
        .route("/api/payments/webhook", post(handlers::payments::webhook))
        .route(
            "/api/calendar/{provider}/callback",
            get(handlers::calendar::callback),
        );

    // User-protected routes (bearer token required)
    let user_routes = Router::new()
        .route("/api/auth/me", get(handlers::auth::me))
        .route("/api/auth/logout", post(handlers::auth::logout))
        .route(
            "/api/profile",
            get(handlers::profile::get_profile).put(handlers::profile::upsert_profile),
        )
        .route(
            "/api/equipment",
            get(handlers::equipment::list_equipment).post(handlers::equipment::create_equipment),
        )
        .route(
            "/api/equipment/{id}",
            get(handlers::equipment::get_equipment)
                .put(handlers::equipment::update_equipment)
                .delete(handlers::equipment::delete_equipment),
        )
        .route(
            "/api/equipment-templates",
            get(handlers::equipment::list_equipment_templates),
        )
        .route(
            "/api/workouts",
            get(handlers::workouts::list_workouts).post(handlers::workouts::create_workout),
        )
        .route(
            "/api/workouts/generate",
            post(handlers::workouts::generate_workout),
        )
        .route(
            "/api/workouts/{id}",
            get(handlers::workouts::get_workout)
                .put(handlers::workouts::update_workout)
                .delete(handlers::workouts::delete_workout),
        )
        .route(
            "/api/workouts/{id}/analyze",
            post(handlers::workouts::analyze_workout),
        )
        .route(
            "/api/exercise-templates",
            get(handlers::workouts::list_exercise_templates),
        )
        .route(
            "/api/sessions",
            get(handlers::sessions::list_sessions).post(handlers::sessions::create_session),
        )
        .route("/api/sessions/{id}", get(handlers::sessions::get_session))
        .route(
            "/api/sessions/{id}/start",
            post(handlers::sessions::start_session),
        )
        .route(
            "/api/sessions/{id}/complete",
            post(handlers::sessions::complete_session),
        )
        .route(
            "/api/sessions/{id}/skip",
            post(handlers::sessions::skip_session),
        )
        .route(
            "/api/sessions/{id}/feedback",
            post(handlers::sessions::session_feedback),
        )
        .route(
            "/api/sessions/{id}/performance",
            post(handlers::sessions::log_performance),
        )
        .route(
            "/api/personal-records",
            get(handlers::sessions::list_personal_records),
        )
        .route(
            "/api/calendar/{provider}/connect",
            get(handlers::calendar::connect),
        )
        .route("/api/calendar/status", get(handlers::calendar::status))
        .route(
            "/api/calendar/{provider}",
            delete(handlers::calendar::disconnect),
        )
        .route(
            "/api/calendar/sync/{session_id}",
            post(handlers::calendar::sync_session),
        )
        .route("/api/payments/plans", get(handlers::payments::list_plans))
        .route(
            "/api/payments/subscribe",
            post(handlers::payments::subscribe),
        )
        .route("/api/payments/cancel", post(handlers::payments::cancel))
        .route(
            "/api/payments/history",
            get(handlers::payments::payment_history),
        )
        .route(
            "/api/payments/subscription",
            get(handlers::payments::get_subscription),
        )
        .route_layer(axum_middleware::from_fn_with_state(
            state.clone(),
            middleware::auth::auth,
        ));

    // Compose app with shared layers (CORS/Trace) and shared state
    let app = Router::new()
        .merge(public_routes)
        .merge(user_routes)
        .layer(
            ServiceBuilder::new()
                .layer(TraceLayer::new_for_http())
                .layer(
                    CorsLayer::new()
                        .allow_origin(Any)
                        .allow_methods([
                            Method::GET,
                            Method::POST,
                            Method::PUT,
                            Method::DELETE,
                            Method::OPTIONS,
                        ])
                        .allow_headers(Any)
                        .max_age(std::time::Duration::from_secs(24 * 60 * 60)),
                ),
        )
        .with_state(state);

    // Start server
    let addr = SocketAddr::from(([0, 0, 0, 0], 3000));
    tracing::info!("Server listening on {}", addr);

    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app).await?;

    Ok(())
}
