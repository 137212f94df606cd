//! Data models for the oracle server

use alloy_primitives::{Address, B256};
use serde::{Deserialize, Serialize};
use validator::{Validate, ValidationError};

pub mod oracle;

pub use oracle::{
    EventId, EventMeta, FlightStatusInfo, IndexTriple, OracleIdentity, StatusCode, StatusRequest,
};

/// API response wrapper
#[derive(Debug, Serialize, Deserialize)]
pub struct ApiResponse<T> {
    pub success: bool,
    pub data: Option<T>,
    pub error: Option<String>,
}

impl<T> ApiResponse<T> {
    pub fn ok(data: T) -> Self {
        Self {
            success: true,
            data: Some(data),
            error: None,
        }
    }

    pub fn err(error: impl Into<String>) -> Self {
        Self {
            success: false,
            data: None,
            error: Some(error.into()),
        }
    }
}

/// Body of `POST /api/flights/status`
#[derive(Debug, Deserialize, Validate)]
pub struct FetchFlightStatusRequest {
    pub airline: Address,
    #[validate(length(min = 1), custom = "not_blank")]
    pub flight: String,
    /// Unix seconds
    pub timestamp: u64,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct FetchFlightStatusResponse {
    pub transaction_hash: B256,
    pub airline: Address,
    pub flight: String,
    pub timestamp: u64,
}

fn not_blank(value: &str) -> Result<(), ValidationError> {
    if value.trim().is_empty() {
        return Err(ValidationError::new("blank"));
    }
    Ok(())
}
