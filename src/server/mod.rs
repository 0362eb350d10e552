//! HTTP server
//!
//! Thin axum layer over the [`Orchestrator`]: handlers translate JSON
//! payloads into orchestrator calls and [`ApiError`] maps failures onto
//! status codes.

pub mod error;
pub mod handlers;
pub mod types;

pub use error::ApiError;

use crate::config::ServerConfig;
use crate::conversation::Orchestrator;
use crate::error::Result;

use axum::extract::DefaultBodyLimit;
use axum::routing::{get, post};
use axum::Router;
use std::sync::Arc;
use tower_http::cors::CorsLayer;
use tower_http::services::ServeDir;
use tower_http::trace::TraceLayer;

/// Slack on top of the upload limit for multipart boundaries and headers
const MULTIPART_OVERHEAD: usize = 64 * 1024;

/// Shared handler state
#[derive(Clone)]
pub struct AppState {
    /// Conversation orchestrator shared by all requests
    pub orchestrator: Arc<Orchestrator>,
    /// Include internal error details in error bodies
    pub expose_error_details: bool,
    /// Maximum accepted upload size for `/transcribe`
    pub max_upload_bytes: usize,
}

impl AppState {
    pub fn new(orchestrator: Arc<Orchestrator>, config: &ServerConfig) -> Self {
        Self {
            orchestrator,
            expose_error_details: !config.is_production(),
            max_upload_bytes: config.max_upload_bytes,
        }
    }

    /// Wraps an error for the HTTP layer
    pub fn reject(&self, error: impl Into<anyhow::Error>) -> ApiError {
        ApiError::new(error.into(), self.expose_error_details)
    }
}

/// Builds the application router
pub fn router(state: AppState, config: &ServerConfig) -> Router {
    let upload_limit = state.max_upload_bytes.saturating_add(MULTIPART_OVERHEAD);

    let mut app = Router::new()
        .route("/init", post(handlers::init))
        .route("/chat", post(handlers::chat))
        .route("/voice-settings", post(handlers::voice_settings))
        .route("/clear-history", post(handlers::clear_history))
        .route(
            "/transcribe",
            post(handlers::transcribe).layer(DefaultBodyLimit::max(upload_limit)),
        )
        .route("/health", get(handlers::health));

    if let Some(dir) = &config.static_dir {
        if dir.is_dir() {
            tracing::info!("Serving static files from {}", dir.display());
            app = app.fallback_service(ServeDir::new(dir));
        } else {
            tracing::warn!("Static directory {} does not exist; not serving files", dir.display());
        }
    }

    let app = app.with_state(state).layer(TraceLayer::new_for_http());

    if config.cors {
        app.layer(CorsLayer::permissive())
    } else {
        app
    }
}

/// Binds the configured address and serves until Ctrl-C
pub async fn run(state: AppState, config: &ServerConfig) -> Result<()> {
    let addr = format!("{}:{}", config.host, config.port);
    let listener = tokio::net::TcpListener::bind(&addr).await?;
    tracing::info!("VoxChat listening on http://{}", listener.local_addr()?);

    axum::serve(listener, router(state, config))
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    tracing::info!("Server stopped");
    Ok(())
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::error!("Failed to listen for shutdown signal: {}", e);
        std::future::pending::<()>().await;
    }
    tracing::info!("Shutdown signal received");
}
