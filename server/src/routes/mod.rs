//! Route definitions for the oracle server API

use std::future::Future;
use std::net::SocketAddr;

use anyhow::Context;
use axum::{
    routing::{get, post},
    Router,
};
use tracing::info;

use crate::app_state::AppState;
use crate::handlers::*;
use crate::services::{ListenerStats, RunningCoordinator};

pub fn oracle_routes() -> Router<AppState> {
    Router::new()
        .route("/api", get(api_info))
        .route("/api/oracles", get(list_oracles))
        .route("/api/operational", get(operational_status))
        .route("/api/flights/status", post(fetch_flight_status))
}

pub fn app_router(state: AppState) -> Router {
    Router::new()
        .route("/", get(root))
        .route("/health", get(health_check))
        .merge(oracle_routes())
        .with_state(state)
}

/// Serves `app` on `addr` until `shutdown` resolves, then stops the
/// coordinator. The coordinator is stopped even if the server never comes up.
pub async fn serve<F>(
    addr: SocketAddr,
    app: Router,
    coordinator: RunningCoordinator,
    shutdown: F,
) -> anyhow::Result<ListenerStats>
where
    F: Future<Output = ()> + Send + 'static,
{
    let served = async {
        let listener = tokio::net::TcpListener::bind(addr)
            .await
            .with_context(|| format!("failed to bind {addr}"))?;
        info!("Server starting on {}", addr);
        axum::serve(listener, app)
            .with_graceful_shutdown(shutdown)
            .await
            .context("http server failed")
    }
    .await;

    let stats = coordinator.shutdown().await;
    served.map(|()| stats)
}
