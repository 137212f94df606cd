use std::sync::Arc;

use axum::{extract::State, http::StatusCode, Json};
use alloy_primitives::U256;
use serde_json::{json, Value};
use tracing::{info, warn};
use validator::Validate;

use crate::app_state::AppState;
use crate::chain::{ContractMethod, SendOptions};
use crate::models::{ApiResponse, FetchFlightStatusRequest, FetchFlightStatusResponse, OracleIdentity};
use crate::services::OracleRegistry;

pub async fn api_info() -> Json<Value> {
    Json(json!({
        "message": "An API for use with your Dapp!"
    }))
}

pub async fn list_oracles(
    State(registry): State<Arc<OracleRegistry>>,
) -> Json<ApiResponse<Vec<OracleIdentity>>> {
    Json(ApiResponse::ok(registry.iter().cloned().collect()))
}

pub async fn operational_status(
    State(state): State<AppState>,
) -> (StatusCode, Json<ApiResponse<bool>>) {
    let method = ContractMethod::IsOperational;
    match state
        .chain
        .call(&method, state.owner)
        .await
        .and_then(|output| output.into_bool(&method))
    {
        Ok(operational) => (StatusCode::OK, Json(ApiResponse::ok(operational))),
        Err(e) => {
            warn!(error = %e, "isOperational call failed");
            (StatusCode::BAD_GATEWAY, Json(ApiResponse::err(e.to_string())))
        }
    }
}

/// Asks the contract to open an oracle request for a flight, sent from the
/// owner account like the dapp's "Submit to Oracles" button.
pub async fn fetch_flight_status(
    State(state): State<AppState>,
    Json(payload): Json<FetchFlightStatusRequest>,
) -> (StatusCode, Json<ApiResponse<FetchFlightStatusResponse>>) {
    if let Err(e) = payload.validate() {
        return (
            StatusCode::BAD_REQUEST,
            Json(ApiResponse::err(format!("Validation error: {}", e))),
        );
    }

    let method = ContractMethod::FetchFlightStatus {
        airline: payload.airline,
        flight: payload.flight.clone(),
        timestamp: U256::from(payload.timestamp),
    };

    match state.chain.send(&method, SendOptions::sender(state.owner)).await {
        Ok(receipt) => {
            info!(
                airline = ?payload.airline,
                flight = %payload.flight,
                tx = ?receipt.transaction_hash,
                "flight status requested"
            );
            (
                StatusCode::OK,
                Json(ApiResponse::ok(FetchFlightStatusResponse {
                    transaction_hash: receipt.transaction_hash,
                    airline: payload.airline,
                    flight: payload.flight,
                    timestamp: payload.timestamp,
                })),
            )
        }
        Err(e) if e.is_rejection() => (
            StatusCode::UNPROCESSABLE_ENTITY,
            Json(ApiResponse::err(e.to_string())),
        ),
        Err(e) => {
            warn!(error = %e, "fetchFlightStatus failed");
            (StatusCode::BAD_GATEWAY, Json(ApiResponse::err(e.to_string())))
        }
    }
}
