//! Fit Hub Backend
//!
//! Weekly team-activity tracker: per-member checklists, counters and
//! roleplay logs keyed by ISO week, with SQLite persistence.

mod api;
mod auth;
mod config;
mod db;
mod errors;
mod models;
mod tracker;

use std::sync::Arc;

use axum::{
    middleware,
    routing::{get, put},
    Router,
};
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use config::Config;
use tracker::Tracker;

/// Application state shared across all handlers.
#[derive(Clone)]
pub struct AppState {
    pub tracker: Arc<Tracker>,
    pub config: Arc<Config>,
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    // Load configuration
    let config = Config::from_env()?;

    // Initialize logging
    let env_filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(&config.log_level));

    tracing_subscriber::registry()
        .with(env_filter)
        .with(tracing_subscriber::fmt::layer())
        .init();

    tracing::info!("Starting Fit Hub Backend");
    tracing::info!("Database path: {:?}", config.db_path);
    tracing::info!("Storage backend: {}", config.storage.as_str());
    tracing::info!("Teams: {:?}", config.teams);
    tracing::info!("Bind address: {}", config.bind_addr);

    if config.admin_token.is_none() {
        tracing::warn!("No admin token configured (FITHUB_ADMIN_TOKEN). Authentication is disabled!");
    }
    if config.persist_on_read {
        tracing::info!("Default weeks and rosters are stored on first read");
    }

    // Initialize database
    let pool = db::init_database(&config.db_path).await?;
    let store = db::open_store(pool, config.storage);
    let tracker = Arc::new(Tracker::new(
        store,
        config.teams.clone(),
        config.persist_on_read,
    ));

    // Create application state
    let state = AppState {
        tracker,
        config: Arc::new(config.clone()),
    };

    // Build router
    let app = create_router(state);

    // Start server
    let listener = tokio::net::TcpListener::bind(&config.bind_addr).await?;
    tracing::info!("Server listening on {}", config.bind_addr);

    axum::serve(listener, app).await?;

    Ok(())
}

/// Create the application router with all routes.
pub fn create_router(state: AppState) -> Router {
    // CORS configuration
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    // Clone token for the auth layer
    let token = state.config.admin_token.clone();

    // API routes
    let api_routes = Router::new()
        // Weeks
        .route("/week", get(api::get_week).patch(api::patch_week))
        .route("/week/current", get(api::current_week))
        .route("/weeks", get(api::list_weeks))
        .route("/audit", get(api::get_audit_log))
        // Roster
        .route("/roster", get(api::get_roster))
        .route("/roster", put(api::save_roster))
        // History
        .route("/history", get(api::export_history))
        .fallback(api::not_found)
        // Apply admin token middleware
        .layer(middleware::from_fn(move |req, next| {
            auth::admin_auth_layer(token.clone(), req, next)
        }));

    // Health check (no auth required)
    let health_routes = Router::new().route("/health", get(health_check));

    Router::new()
        .nest("/api", api_routes)
        .merge(health_routes)
        .layer(cors)
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

/// Health check endpoint.
async fn health_check() -> &'static str {
    "OK"
}
