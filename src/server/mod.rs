mod app_error;
mod body;
mod handlers;

use anyhow::{Context, Result};
use axum::{
    Router,
    extract::DefaultBodyLimit,
    routing::{get, post},
};
use std::sync::Arc;
use tower_http::{catch_panic::CatchPanicLayer, trace::TraceLayer};
use tracing::info;

use crate::{
    config::Config,
    enrichment::{CommandIdentityResolver, EnrichmentCoordinator, HttpSnapshotFetcher},
    server::handlers::{post_webhook, welcome},
};

/// Devices attach pictures to multipart notifications.
const MAX_BODY_BYTES: usize = 10 * 1024 * 1024;

/// Shared application state.
pub struct AppState {
    pub enrichment: EnrichmentCoordinator,
}

impl AppState {
    /// Wires the device and face recognition clients described by the configuration.
    pub fn from_config(config: &Config) -> Result<Self> {
        let snapshots = HttpSnapshotFetcher::new(config.device.clone())
            .context("Failed to create snapshot client")?;
        let resolver = CommandIdentityResolver::new(config.resolver.clone());
        Ok(Self {
            enrichment: EnrichmentCoordinator::new(Arc::new(snapshots), Arc::new(resolver)),
        })
    }
}

/// Creates the router for the given state. Used for testing, too.
pub fn make_server(state: AppState) -> Router {
    Router::new()
        .route("/webhook", post(post_webhook))
        .route("/", get(welcome))
        .layer(DefaultBodyLimit::max(MAX_BODY_BYTES))
        .layer(CatchPanicLayer::custom(app_error::panic_response))
        .layer(TraceLayer::new_for_http())
        .with_state(Arc::new(state))
}

/// Starts the server on the configured port.
pub async fn serve(config: Config) -> Result<()> {
    let app = make_server(AppState::from_config(&config)?);
    let port = config.port;

    info!("Listening on http://localhost:{port}");
    let listener = tokio::net::TcpListener::bind(format!("0.0.0.0:{port}"))
        .await
        .with_context(|| format!("Failed to bind to port {port}"))?;

    axum::serve(listener, app)
        .await
        .with_context(|| "Failed to start server")
}
