#![allow(deprecated)] // TimeoutLayer::new is deprecated but replacement API not stable

use axum::{
    extract::DefaultBodyLimit,
    routing::{get, patch, post},
    Router,
};
use sqlx::postgres::PgPoolOptions;
use sqlx::PgPool;
use std::sync::Arc;
use std::time::Duration;

use smiletrip_auth::AuthConfig;
use smiletrip_storage::{LocalStorage, Storage};

mod auth_handlers;
mod files;
mod health;
mod quotes;
mod rate_limit;

// Application state shared across all handlers
#[derive(Clone)]
pub struct AppState {
    pub pool: PgPool,
    pub storage: Arc<dyn Storage>,
    pub auth: Arc<AuthConfig>,
    pub submit_limiter: Arc<rate_limit::IpRateLimiter>,
}

#[tokio::main]
async fn main() {
    // Initialize tracing
    tracing_subscriber::fmt::init();

    // Upload directory, created on startup if absent
    let upload_dir = std::env::var("UPLOAD_DIR").unwrap_or_else(|_| "uploads".to_string());
    let storage: Arc<dyn Storage> = Arc::new(LocalStorage::new(&upload_dir));
    tracing::info!("Upload directory: {}", upload_dir);

    // Admin identity and token signing material
    let auth = Arc::new(AuthConfig::from_env());
    if auth.admin_email.is_none() || auth.admin_password.is_none() {
        tracing::warn!("Admin credentials not configured; all login attempts will fail");
    }

    // Initialize database with production pool settings
    let database_url = std::env::var("DATABASE_URL").expect("DATABASE_URL must be set");

    let max_connections: u32 = std::env::var("DB_MAX_CONNECTIONS")
        .unwrap_or_else(|_| "20".to_string())
        .parse()
        .unwrap_or(20);
    let min_connections: u32 = std::env::var("DB_MIN_CONNECTIONS")
        .unwrap_or_else(|_| "2".to_string())
        .parse()
        .unwrap_or(2);
    let acquire_timeout_secs: u64 = std::env::var("DB_ACQUIRE_TIMEOUT_SECS")
        .unwrap_or_else(|_| "3".to_string())
        .parse()
        .unwrap_or(3);

    tracing::info!(
        "Connecting to database (max_conn: {}, min_conn: {})...",
        max_connections,
        min_connections
    );

    let pool = PgPoolOptions::new()
        .max_connections(max_connections)
        .min_connections(min_connections)
        .acquire_timeout(Duration::from_secs(acquire_timeout_secs))
        .connect(&database_url)
        .await
        .expect("Failed to connect to database");

    tracing::info!("Database connected successfully");

    // Run migrations if needed
    sqlx::migrate!("../../migrations")
        .run(&pool)
        .await
        .expect("Failed to run migrations");

    // Resolve the urgency capability once at startup; cached for the
    // process lifetime (a schema migration needs a restart to be observed)
    let has_urgency = smiletrip_core::schema_caps::quotes_has_urgency(&pool).await;
    tracing::info!("Urgency column support: {}", has_urgency);

    let app_state = Arc::new(AppState {
        pool,
        storage,
        auth: auth.clone(),
        submit_limiter: Arc::new(rate_limit::submission_limiter()),
    });

    let cors = configure_cors();

    // Public intake route: rate-limited per client IP, larger body limit
    // to accommodate up to 10 attachments of 10 MiB each
    let intake_routes = Router::new()
        .route(
            "/api/quotes/multipart",
            post(quotes::submit_quote).layer(DefaultBodyLimit::max(quotes::MAX_SUBMISSION_BODY)),
        )
        .layer(axum::middleware::from_fn_with_state(
            app_state.clone(),
            rate_limit::rate_limit_submissions,
        ));

    // Health check routes (no rate limiting - needed for load balancers/monitoring)
    let health_routes = Router::new()
        .route("/api/health", get(health::liveness))
        .route("/api/health/ready", get(health::readiness));

    let login_routes = Router::new().route("/api/auth/login", post(auth_handlers::login));

    // Admin review routes behind the strict guard (header token only)
    let admin_routes = Router::new()
        .route("/api/admin/quotes", get(quotes::list_quotes))
        .route("/api/admin/quotes/{id}", get(quotes::get_quote))
        .route("/api/admin/quotes/{id}/status", patch(quotes::update_quote_status))
        .layer(axum::middleware::from_fn_with_state(
            auth.clone(),
            smiletrip_auth::middleware::require_admin,
        ));

    // Downloads behind the lenient guard so inline links work from a browser
    let file_routes = Router::new()
        .route("/api/admin/files/{id}", get(files::download_file))
        .layer(axum::middleware::from_fn_with_state(
            auth.clone(),
            smiletrip_auth::middleware::require_admin_lenient,
        ));

    let app = Router::new()
        .merge(health_routes)
        .merge(intake_routes)
        .merge(login_routes)
        .merge(admin_routes)
        .merge(file_routes)
        .with_state(app_state)
        .layer(tower_http::trace::TraceLayer::new_for_http())
        // Hard ceiling above the per-route multipart limit
        .layer(tower_http::limit::RequestBodyLimitLayer::new(120 * 1024 * 1024))
        .layer(tower_http::timeout::TimeoutLayer::new(Duration::from_secs(120)))
        .layer(tower::limit::ConcurrencyLimitLayer::new(1024))
        .layer(cors);

    // Run server
    let port = std::env::var("PORT").unwrap_or_else(|_| "3000".to_string());
    let listener = tokio::net::TcpListener::bind(format!("0.0.0.0:{}", port))
        .await
        .expect("Failed to bind listener");

    tracing::info!("Server listening on {}", listener.local_addr().unwrap());
    // Connect info makes the client SocketAddr available to rate limiting
    axum::serve(
        listener,
        app.into_make_service_with_connect_info::<std::net::SocketAddr>(),
    )
    .await
    .expect("Server error");
}

/// Configure CORS from an explicit origin allowlist.
///
/// CORS_ALLOWED_ORIGINS: comma-separated list of allowed origins.
/// Unset or empty blocks all cross-origin requests (fail safe).
fn configure_cors() -> tower_http::cors::CorsLayer {
    use axum::http::{header, Method};
    use tower_http::cors::{AllowHeaders, AllowMethods, AllowOrigin, CorsLayer};

    let allowed_methods = AllowMethods::list([Method::GET, Method::POST, Method::PATCH, Method::OPTIONS]);

    let allowed_headers = AllowHeaders::list([
        header::AUTHORIZATION,
        header::CONTENT_TYPE,
        header::ACCEPT,
        header::ORIGIN,
    ]);

    let origins: Vec<String> = std::env::var("CORS_ALLOWED_ORIGINS")
        .unwrap_or_default()
        .split(',')
        .map(|s| s.trim().to_string())
        .filter(|s| !s.is_empty())
        .collect();

    let allow_origin = if origins.is_empty() {
        tracing::warn!("CORS: no CORS_ALLOWED_ORIGINS configured, blocking all cross-origin requests");
        AllowOrigin::predicate(|_, _| false)
    } else {
        tracing::info!("CORS: {} allowed origins", origins.len());
        AllowOrigin::predicate(move |origin, _| {
            origin
                .to_str()
                .map(|o| origins.iter().any(|allowed| allowed == o))
                .unwrap_or(false)
        })
    };

    CorsLayer::new()
        .allow_origin(allow_origin)
        .allow_methods(allowed_methods)
        .allow_headers(allowed_headers)
        .max_age(Duration::from_secs(3600))
}
