//! # API Module
//!
//! HTTP transport for Geowatch.
//!
//! ## Endpoints
//!
//! | Method | Path        | Description                              |
//! |--------|-------------|------------------------------------------|
//! | POST   | `/location` | Submit a position report `{tag, lat, lon}` |
//! | GET    | `/health`   | Liveness check                           |
//! | GET    | `/status`   | Fence and presence overview              |
//!
//! Invalid reports answer `400 {"status": "error", "message": ...}`.

mod handlers;
pub mod types;

pub use handlers::*;
pub use types::*;

use crate::config::Config;
use crate::notify::{Dispatcher, NotifyError};
use axum::Router;
use axum::routing::{get, post};
use geowatch_core::GeofenceTracker;
use std::net::SocketAddr;
use std::sync::Arc;
use thiserror::Error;
use tower::ServiceBuilder;
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;

// =============================================================================
// STATE
// =============================================================================

/// Shared state for all handlers.
#[derive(Debug)]
pub struct AppState {
    pub tracker: Arc<GeofenceTracker>,
    pub dispatcher: Dispatcher,
    /// Tag applied to reports that omit one.
    pub default_tag: String,
}

impl AppState {
    #[must_use]
    pub fn new(
        tracker: Arc<GeofenceTracker>,
        dispatcher: Dispatcher,
        default_tag: impl Into<String>,
    ) -> Self {
        Self {
            tracker,
            dispatcher,
            default_tag: default_tag.into(),
        }
    }

    /// Build state from configuration, choosing the sink it names.
    pub fn from_config(config: &Config) -> Result<Self, NotifyError> {
        let tracker = Arc::new(GeofenceTracker::new(
            config.reference,
            config.authorized.clone(),
        ));
        let dispatcher = Dispatcher::from_config(config)?;
        Ok(Self::new(tracker, dispatcher, config.default_tag.clone()))
    }
}

// =============================================================================
// ROUTER
// =============================================================================

/// Build the application router.
pub fn create_router(state: Arc<AppState>) -> Router {
    Router::new()
        .route("/location", post(location_handler))
        .route("/health", get(health_handler))
        .route("/status", get(status_handler))
        .layer(
            ServiceBuilder::new()
                .layer(TraceLayer::new_for_http())
                .layer(CorsLayer::permissive()),
        )
        .with_state(state)
}

// =============================================================================
// SERVER
// =============================================================================

/// Errors that stop the server.
#[derive(Debug, Error)]
pub enum ServeError {
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("notifier setup failed: {0}")]
    Notify(#[from] NotifyError),
}

/// Run the HTTP server until Ctrl-C.
pub async fn serve(config: Config) -> Result<(), ServeError> {
    let state = Arc::new(AppState::from_config(&config)?);
    let app = create_router(state);

    let addr = SocketAddr::from(([0, 0, 0, 0], config.port));
    tracing::info!(
        %addr,
        home = %config.reference.location,
        radius_m = config.reference.radius_m,
        authorized = config.authorized.len(),
        notifier = if config.twilio.is_some() { "twilio" } else { "log" },
        "Geowatch listening"
    );

    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    tracing::info!("Geowatch stopped");
    Ok(())
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::error!("failed to listen for shutdown signal: {}", e);
        std::future::pending::<()>().await;
    }
}
