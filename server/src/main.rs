//! FlightSurety Oracle Server
//!
//! Registers the simulated oracle pool, answers `OracleRequest` events with
//! random flight statuses and serves a small HTTP API for the dapp.

use std::net::SocketAddr;
use std::sync::Arc;

use anyhow::Context;
use axum::http::{header, HeaderValue, Method};
use tower_http::{cors::CorsLayer, trace::TraceLayer};
use tracing::{error, info};
use tracing_subscriber::EnvFilter;

use flightsurety_oracle_server::{
    app_state::AppState,
    chain::{ChainClient, JsonRpcChainClient},
    config::AppConfig,
    routes,
    services::Coordinator,
};

#[tokio::main]
async fn main() {
    // Load environment variables
    dotenvy::dotenv().ok();

    // Initialize tracing
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .init();

    if let Err(err) = run().await {
        error!(error = %format!("{err:#}"), "oracle server failed");
        std::process::exit(1);
    }
}

async fn run() -> anyhow::Result<()> {
    let config = AppConfig::from_env().context("invalid configuration")?;
    info!(
        rpc_url = %config.chain.rpc_url,
        app = ?config.chain.app_address,
        data = ?config.chain.data_address,
        "connecting to FlightSurety contracts"
    );

    let client = Arc::new(JsonRpcChainClient::new(&config.chain));
    let coordinator = Coordinator::new(client.clone(), config.oracles.clone())
        .start()
        .await
        .context("oracle startup failed")?;

    let chain: Arc<dyn ChainClient> = client;
    let state = AppState::new(chain, coordinator.registry(), coordinator.owner());
    let app = routes::app_router(state)
        .layer(TraceLayer::new_for_http())
        .layer(build_cors_layer(&config.server.cors_allowed_origins));

    let addr = SocketAddr::from(([127, 0, 0, 1], config.server.port));
    let stats = routes::serve(addr, app, coordinator, shutdown_signal()).await?;
    info!(
        delivered = stats.delivered,
        duplicates = stats.duplicates,
        "oracle server stopped"
    );
    Ok(())
}

async fn shutdown_signal() {
    if let Err(err) = tokio::signal::ctrl_c().await {
        error!(error = %err, "failed to listen for shutdown signal");
        std::future::pending::<()>().await;
    }
    info!("shutdown signal received");
}

fn build_cors_layer(origins: &[String]) -> CorsLayer {
    let allowed_origins = origins
        .iter()
        .filter_map(|origin| origin.parse::<HeaderValue>().ok())
        .collect::<Vec<_>>();

    CorsLayer::new()
        .allow_origin(allowed_origins)
        .allow_methods([Method::GET, Method::POST, Method::OPTIONS])
        .allow_headers([header::CONTENT_TYPE, header::ACCEPT])
        .allow_credentials(false)
}
