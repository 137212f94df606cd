//! API handlers for the oracle server

pub mod oracle;

pub use oracle::{api_info, fetch_flight_status, list_oracles, operational_status};

pub async fn root() -> &'static str {
    "FlightSurety Oracle Server"
}

pub async fn health_check() -> &'static str {
    "OK"
}
