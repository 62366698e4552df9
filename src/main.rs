//! Employee ID Card Backend
//!
//! Enrolls employees, renders their printable ID cards with an embedded QR code,
//! and records attendance scans, persisted in SQLite.

mod api;
mod auth;
mod card;
mod config;
mod db;
mod errors;
mod models;
mod roster;

use std::sync::Arc;

use axum::{
    extract::DefaultBodyLimit,
    middleware,
    routing::{get, post},
    Router,
};
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use card::{text::CardFont, CardCompositor};
use config::Config;
use db::Repository;
use roster::RosterStore;

/// Largest accepted request body; uploads arrive base64-encoded inside JSON.
const MAX_BODY_BYTES: usize = 16 * 1024 * 1024;

/// Application state shared across all handlers.
#[derive(Clone)]
pub struct AppState {
    pub roster: Arc<RosterStore>,
    pub compositor: Arc<CardCompositor>,
    pub config: Arc<Config>,
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    // Load configuration
    let config = Config::from_env();

    // Initialize logging
    let env_filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(&config.log_level));

    tracing_subscriber::registry()
        .with(env_filter)
        .with(tracing_subscriber::fmt::layer())
        .init();

    tracing::info!("Starting Employee ID Card Backend");
    tracing::info!("Database path: {:?}", config.db_path);
    tracing::info!("Bind address: {}", config.bind_addr);

    if config.admin_password.is_none() {
        tracing::warn!(
            "No admin password configured (IDCARD_ADMIN_PASSWORD). Admin routes are open!"
        );
    }

    // Initialize database and load the roster
    let pool = db::init_database(&config.db_path).await?;
    let repo = Repository::new(pool);
    match repo.schema_version().await {
        Ok(version) => tracing::info!("Schema version: {}", version),
        Err(e) => tracing::warn!("Cannot read schema version: {}", e),
    }
    let roster = Arc::new(RosterStore::open(repo, config.id_prefix.clone()).await);

    let compositor = Arc::new(build_compositor(&config));

    let state = AppState {
        roster: roster.clone(),
        compositor,
        config: Arc::new(config.clone()),
    };

    // Build router
    let app = create_router(state);

    // Start server
    let listener = tokio::net::TcpListener::bind(&config.bind_addr).await?;
    tracing::info!("Server listening on {}", config.bind_addr);

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    // Retry anything a failed save left queued
    if let Err(e) = roster.flush().await {
        tracing::error!("Unsaved changes lost on shutdown: {}", e);
    }

    Ok(())
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::error!("Cannot listen for shutdown signal: {}", e);
        std::future::pending::<()>().await;
    }
    tracing::info!("Shutting down");
}

/// Build the card compositor from the configured font and default logo.
pub fn build_compositor(config: &Config) -> CardCompositor {
    let font = CardFont::load(config.font_path.as_deref());
    let compositor = CardCompositor::new(font, config.card_title.clone());

    let Some(path) = &config.logo_path else {
        return compositor;
    };
    match std::fs::read(path) {
        Ok(bytes) => compositor.with_default_logo(bytes),
        Err(e) => {
            tracing::warn!("Cannot read default logo {:?}: {}", path, e);
            compositor
        }
    }
}

/// Create the application router with all routes.
pub fn create_router(state: AppState) -> Router {
    // CORS configuration
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    // Clone the password for the auth layer
    let password = state.config.admin_password.clone();

    // Admin routes
    let admin_routes = Router::new()
        .route("/employees", get(api::list_employees))
        .route("/employees/{id}", get(api::get_employee))
        .route(
            "/attendance",
            get(api::list_attendance).post(api::record_attendance),
        )
        .route("/attendance/export", get(api::export_attendance))
        .layer(middleware::from_fn(move |req, next| {
            auth::admin_auth_layer(password.clone(), req, next)
        }));

    // Public API routes
    let api_routes = Router::new()
        .route("/employees", post(api::create_employee))
        .route("/employees/{id}/card", get(api::get_card))
        .nest("/admin", admin_routes);

    // Health check (no auth required)
    let health_routes = Router::new().route("/health", get(health_check));

    Router::new()
        .nest("/api", api_routes)
        .merge(health_routes)
        .layer(DefaultBodyLimit::max(MAX_BODY_BYTES))
        .layer(cors)
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

/// Health check endpoint.
async fn health_check() -> &'static str {
    "OK"
}

#[cfg(test)]
mod tests;
