use std::time::Duration;

use alloy_primitives::Address;

use super::{optional, parse_address, ConfigError, Lookup};

const DEFAULT_RPC_URL: &str = "http://127.0.0.1:7545";
const DEFAULT_TX_GAS: u64 = 2_000_000;
const DEFAULT_POLL_INTERVAL_MS: u64 = 1_000;

/// Chain endpoint and deployed FlightSurety contracts.
#[derive(Clone, Debug)]
pub struct ChainConfig {
    pub rpc_url: String,
    pub app_address: Address,
    /// Only reported at startup; the oracle flow never touches the data contract.
    pub data_address: Option<Address>,
    pub gas: u64,
    pub poll_interval: Duration,
}

impl ChainConfig {
    pub(crate) fn from_lookup(lookup: &Lookup<'_>) -> Result<Self, ConfigError> {
        let app_address = lookup("FLIGHT_SURETY_APP_ADDRESS")
            .ok_or(ConfigError::Missing("FLIGHT_SURETY_APP_ADDRESS"))
            .and_then(|value| parse_address("FLIGHT_SURETY_APP_ADDRESS", &value))?;
        let data_address = lookup("FLIGHT_SURETY_DATA_ADDRESS")
            .filter(|value| !value.trim().is_empty())
            .map(|value| parse_address("FLIGHT_SURETY_DATA_ADDRESS", &value))
            .transpose()?;

        Ok(Self {
            rpc_url: lookup("CHAIN_RPC_URL").unwrap_or_else(|| DEFAULT_RPC_URL.to_string()),
            app_address,
            data_address,
            gas: optional(lookup, "TX_GAS", DEFAULT_TX_GAS)?,
            poll_interval: Duration::from_millis(optional(
                lookup,
                "EVENT_POLL_INTERVAL_MS",
                DEFAULT_POLL_INTERVAL_MS,
            )?),
        })
    }
}
