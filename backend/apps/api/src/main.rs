//! API Server Entry Point
//!
//! Application entry point and server initialization.
//! Uses `anyhow` for startup errors, but application-level
//! errors should use `kernel::error::AppError`.

use axum::{
    Router, http,
    http::{Method, header},
};
use exam::domain::repository::SessionStore;
use exam::{
    ExamAppState, ExamConfig, ExpiringSessionStore, IdentityResolver, MemoryExamRepository,
    PgExamRepository, exam_router, exam_router_generic, spawn_sweeper,
};
use sqlx::postgres::PgPoolOptions;
use std::env;
use std::net::SocketAddr;
use std::sync::Arc;
use tokio::net::TcpListener;
use tower_http::cors::{AllowHeaders, AllowMethods, CorsLayer};
use tower_http::trace::TraceLayer;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

// Re-export unified error types for use in handlers
pub use kernel::error::{
    app_error::{AppError, AppResult},
    kind::ErrorKind,
};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Load .env file
    dotenvy::dotenv().ok();

    // Initialize tracing
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "api=info,exam=info,tower_http=info".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    // Exam configuration (random token secret unless EXAM_TOKEN_SECRET is set)
    let exam_config = ExamConfig::from_env()?;
    tracing::info!(
        max_entries = exam_config.store.max_entries,
        ttl_secs = exam_config.store.ttl.as_secs(),
        lock_stripes = exam_config.lock_stripes,
        debug_endpoints = exam_config.debug_endpoints,
        "Exam configuration loaded"
    );

    // Live sessions are process-local and expire on their own
    let store: Arc<dyn SessionStore> = Arc::new(ExpiringSessionStore::new(
        exam_config.store.max_entries,
        exam_config.store.ttl,
    ));
    let _sweeper = spawn_sweeper(store.clone(), exam_config.store.sweep_interval);

    let identity = match env::var("EXAM_TRUST_USER_HEADER").as_deref() {
        Ok("1") | Ok("true") => IdentityResolver::TrustedHeader,
        _ => IdentityResolver::Anonymous,
    };

    let exam_routes = match env::var("DATABASE_URL") {
        Ok(database_url) => {
            let pool = PgPoolOptions::new()
                .max_connections(5)
                .connect(&database_url)
                .await?;

            tracing::info!("Connected to database");

            // Run migrations
            sqlx::migrate!("../../../database/migrations")
                .run(&pool)
                .await?;

            tracing::info!("Migrations completed");

            exam_router(PgExamRepository::new(pool), store, exam_config, identity)
        }
        Err(_) => {
            tracing::warn!("DATABASE_URL not set, using the in-memory sample question bank");
            let state = ExamAppState::new(MemoryExamRepository::sample(5), store, exam_config)
                .with_identity(identity);
            exam_router_generic(state)
        }
    };

    // CORS configuration
    let frontend_origins = env::var("FRONTEND_ORIGINS")
        .unwrap_or_else(|_| "http://localhost:40922,http://127.0.0.1:40922".to_string());

    let allowed_origins: Vec<http::HeaderValue> = frontend_origins
        .split(',')
        .filter_map(|origin| origin.trim().parse().ok())
        .collect();

    let cors = CorsLayer::new()
        .allow_origin(allowed_origins)
        .allow_methods(AllowMethods::list([
            Method::GET,
            Method::POST,
            Method::OPTIONS,
        ]))
        .allow_headers(AllowHeaders::list([
            header::CONTENT_TYPE,
            header::AUTHORIZATION,
            header::ACCEPT,
        ]))
        .allow_credentials(true);

    // Build router
    let app = Router::new()
        .nest("/api/exam", exam_routes)
        .layer(TraceLayer::new_for_http())
        .layer(cors);

    // Start server
    let addr: SocketAddr = env::var("BIND_ADDR")
        .unwrap_or_else(|_| "0.0.0.0:31113".to_string())
        .parse()?;
    tracing::info!("Listening on {}", addr);

    let listener = TcpListener::bind(addr).await?;
    axum::serve(
        listener,
        app.into_make_service_with_connect_info::<SocketAddr>(),
    )
    .await?;

    Ok(())
}
