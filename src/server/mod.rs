//! HTTP Server
//!
//! Stateless JSON surface over the classifier, planner, executor and
//! responder.

pub mod dto;
pub mod handlers;

use std::net::SocketAddr;

use axum::routing::{get, post};
use axum::Router;
use tracing::info;

use crate::state::AppState;
use crate::utils::error::AppResult;

/// Build the application router.
pub fn router(state: AppState) -> Router {
    Router::new()
        .route("/", get(handlers::root))
        .route("/health", get(handlers::health))
        .route("/classify-query", post(handlers::classify))
        .route("/plan-tasks", post(handlers::plan))
        .route("/execute-tasks", post(handlers::execute))
        .route("/respond", post(handlers::respond_query))
        .with_state(state)
}

/// Bind `addr` and serve until the listener fails.
pub async fn serve(state: AppState, addr: SocketAddr) -> AppResult<()> {
    let listener = tokio::net::TcpListener::bind(addr).await?;
    info!(
        addr = %listener.local_addr()?,
        provider = state.provider.name(),
        model = state.provider.model(),
        "server: listening"
    );
    axum::serve(listener, router(state)).await?;
    Ok(())
}
