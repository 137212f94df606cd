use std::fmt;

use alloy_primitives::{Address, B256, U256};
use rand::Rng;
use serde::{Deserialize, Serialize};

/// Three request indexes the contract assigns to an oracle when it registers.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct IndexTriple(pub [u8; 3]);

impl IndexTriple {
    pub fn contains(&self, index: u8) -> bool {
        self.0.contains(&index)
    }
}

impl fmt::Display for IndexTriple {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}, {}, {}", self.0[0], self.0[1], self.0[2])
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct OracleIdentity {
    pub address: Address,
    pub indexes: IndexTriple,
}

/// A flight status request as emitted by the `OracleRequest` event.
///
/// `airline`, `flight` and `timestamp` are only ever echoed back to the
/// contract, never interpreted here.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize)]
pub struct StatusRequest {
    pub index: u8,
    pub airline: Address,
    pub flight: String,
    pub timestamp: U256,
}

/// Flight status codes understood by the contract.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StatusCode {
    Unknown,
    OnTime,
    LateAirline,
    LateWeather,
    LateTechnical,
    LateOther,
}

impl StatusCode {
    pub const ALL: [StatusCode; 6] = [
        StatusCode::Unknown,
        StatusCode::OnTime,
        StatusCode::LateAirline,
        StatusCode::LateWeather,
        StatusCode::LateTechnical,
        StatusCode::LateOther,
    ];

    pub fn code(self) -> u8 {
        match self {
            StatusCode::Unknown => 0,
            StatusCode::OnTime => 10,
            StatusCode::LateAirline => 20,
            StatusCode::LateWeather => 30,
            StatusCode::LateTechnical => 40,
            StatusCode::LateOther => 50,
        }
    }

    /// Picks one of the six codes with equal probability.
    pub fn random<R: Rng + ?Sized>(rng: &mut R) -> Self {
        Self::ALL[rng.gen_range(0..Self::ALL.len())]
    }
}

impl TryFrom<u8> for StatusCode {
    type Error = u8;

    fn try_from(value: u8) -> Result<Self, Self::Error> {
        Self::ALL
            .into_iter()
            .find(|status| status.code() == value)
            .ok_or(value)
    }
}

impl fmt::Display for StatusCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            StatusCode::Unknown => "Unknown",
            StatusCode::OnTime => "On Time",
            StatusCode::LateAirline => "Late Airline",
            StatusCode::LateWeather => "Late Weather",
            StatusCode::LateTechnical => "Late Technical",
            StatusCode::LateOther => "Late Other",
        };
        f.write_str(label)
    }
}

/// Position of a delivered log on chain.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct EventMeta {
    pub block_number: u64,
    pub transaction_hash: B256,
    pub log_index: u64,
}

impl EventMeta {
    pub fn id(&self) -> EventId {
        EventId {
            transaction_hash: self.transaction_hash,
            log_index: self.log_index,
        }
    }
}

/// Identity of a single chain log; two deliveries with the same id are the
/// same event.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct EventId {
    pub transaction_hash: B256,
    pub log_index: u64,
}

/// Consensus outcome reported by the contract once enough oracles agree.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct FlightStatusInfo {
    pub airline: Address,
    pub flight: String,
    pub timestamp: U256,
    pub status: u8,
}
