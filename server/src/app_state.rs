//! Application state shared across handlers

use std::sync::Arc;

use axum::extract::FromRef;
use alloy_primitives::Address;

use crate::chain::ChainClient;
use crate::services::OracleRegistry;

/// Shared application state
#[derive(Clone)]
pub struct AppState {
    pub chain: Arc<dyn ChainClient>,
    pub registry: Arc<OracleRegistry>,
    /// Account used for contract reads and owner transactions.
    pub owner: Address,
}

impl AppState {
    pub fn new(chain: Arc<dyn ChainClient>, registry: Arc<OracleRegistry>, owner: Address) -> Self {
        Self {
            chain,
            registry,
            owner,
        }
    }
}

impl FromRef<AppState> for Arc<OracleRegistry> {
    fn from_ref(app_state: &AppState) -> Self {
        app_state.registry.clone()
    }
}
