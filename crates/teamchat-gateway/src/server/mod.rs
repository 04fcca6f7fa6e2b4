//! Gateway server setup
//!
//! Provides the WebSocket route, health endpoints and process wiring.

mod handler;
mod state;

pub use handler::gateway_handler;
pub use state::GatewayState;

use std::net::SocketAddr;
use std::sync::Arc;

use axum::extract::State;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::routing::get;
use axum::{Json, Router};
use teamchat_common::{AppConfig, AppError, JwtService};
use tokio::net::TcpListener;
use tower_http::trace::TraceLayer;

use crate::collaborators::{Collaborators, InMemoryDirectory};
use crate::hub::spawn_hub;

/// Create the gateway router
pub fn create_router() -> Router<GatewayState> {
    Router::new()
        .route("/gateway", get(gateway_handler))
        .route("/health", get(health_check))
        .route("/health/stats", get(health_stats))
}

/// Health check endpoint
async fn health_check() -> &'static str {
    "OK"
}

/// Live hub counters
async fn health_stats(State(state): State<GatewayState>) -> Response {
    match state.handle().stats().await {
        Ok(stats) => Json(stats).into_response(),
        Err(e) => {
            tracing::error!(error = %e, "Stats unavailable");
            (StatusCode::SERVICE_UNAVAILABLE, e.to_string()).into_response()
        }
    }
}

/// Build the complete application
pub fn create_app(state: GatewayState) -> Router {
    create_router()
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

/// Wire the hub and the collaborators into a `GatewayState`
///
/// The hub task runs until the returned state (and every clone of it) is
/// dropped.
pub fn create_gateway_state(config: &AppConfig, collaborators: Collaborators) -> GatewayState {
    let (handle, _hub_task) = spawn_hub(&config.realtime, collaborators.presence.clone());
    GatewayState::new(handle, collaborators, config.realtime.clone())
}

/// Collaborators backed by the in-memory directory, seeded from
/// `DIRECTORY_SEED` when set
pub async fn development_collaborators(config: &AppConfig) -> Result<Collaborators, AppError> {
    let directory = match &config.directory.seed_path {
        Some(path) => {
            tracing::info!(path = %path.display(), "Loading directory seed");
            InMemoryDirectory::load(path).await?
        }
        None => {
            tracing::warn!("DIRECTORY_SEED not set, starting with an empty directory");
            InMemoryDirectory::new()
        }
    };

    let jwt = JwtService::new(&config.jwt.secret, config.jwt.token_expiry);
    Ok(Collaborators::in_memory(Arc::new(directory), Arc::new(jwt)))
}

/// Run the gateway server
pub async fn run_server(app: Router, listener: TcpListener) -> Result<(), AppError> {
    let addr = listener.local_addr()?;
    tracing::info!("Gateway listening on ws://{}/gateway", addr);

    axum::serve(listener, app).await?;

    Ok(())
}

/// Run the complete gateway server with configuration
pub async fn run(config: AppConfig) -> Result<(), AppError> {
    let addr: SocketAddr = config
        .gateway
        .address()
        .parse()
        .map_err(|e| AppError::internal(anyhow::anyhow!("Invalid gateway address: {e}")))?;

    let collaborators = development_collaborators(&config).await?;
    let state = create_gateway_state(&config, collaborators);
    let app = create_app(state);

    tracing::info!("Starting Gateway server on {}", addr);
    let listener = TcpListener::bind(addr).await?;

    run_server(app, listener).await
}
