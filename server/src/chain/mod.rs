//! Chain client adapter for the FlightSurety app contract
//!
//! The coordinator only ever talks to the chain through [`ChainClient`]. The
//! contract surface it needs is spelled out as typed [`ContractMethod`] and
//! [`ContractEvent`] values, so the ABI details stay inside this module.

use std::str::FromStr;

use alloy_primitives::{Address, LogData, B256, U256};
use alloy_sol_types::{SolCall, SolEvent};
use async_trait::async_trait;
use thiserror::Error;

pub mod abi;
pub mod json_rpc;
mod subscription;

use abi::FlightSuretyApp;
use crate::models::{EventMeta, FlightStatusInfo, IndexTriple, StatusCode, StatusRequest};

pub use json_rpc::JsonRpcChainClient;
pub use subscription::EventSubscription;

#[derive(Debug, Error)]
pub enum ChainError {
    #[error("transport error: {0}")]
    Transport(String),
    #[error("rpc error {code}: {message}")]
    Rpc { code: i64, message: String },
    #[error("transaction reverted: {0}")]
    Reverted(String),
    #[error("no receipt for transaction {0:?}")]
    ReceiptTimeout(B256),
    #[error("malformed chain response: {0}")]
    Malformed(String),
    #[error("abi: {0}")]
    Abi(#[from] alloy_sol_types::Error),
    #[error("{method} returned {actual}, expected {expected}")]
    UnexpectedOutput {
        method: &'static str,
        expected: &'static str,
        actual: &'static str,
    },
}

impl ChainError {
    /// A contract-level rejection, as opposed to the node being unreachable.
    pub fn is_rejection(&self) -> bool {
        matches!(self, ChainError::Reverted(_))
    }
}

impl From<reqwest::Error> for ChainError {
    fn from(err: reqwest::Error) -> Self {
        ChainError::Transport(err.to_string())
    }
}

/// Contract functions the server invokes.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ContractMethod {
    RegistrationFee,
    RegisterOracle,
    GetMyIndexes,
    IsOperational,
    SubmitOracleResponse {
        request: StatusRequest,
        status: StatusCode,
    },
    FetchFlightStatus {
        airline: Address,
        flight: String,
        timestamp: U256,
    },
}

impl ContractMethod {
    pub fn name(&self) -> &'static str {
        match self {
            ContractMethod::RegistrationFee => "REGISTRATION_FEE",
            ContractMethod::RegisterOracle => "registerOracle",
            ContractMethod::GetMyIndexes => "getMyIndexes",
            ContractMethod::IsOperational => "isOperational",
            ContractMethod::SubmitOracleResponse { .. } => "submitOracleResponse",
            ContractMethod::FetchFlightStatus { .. } => "fetchFlightStatus",
        }
    }

    pub fn signature(&self) -> &'static str {
        match self {
            ContractMethod::RegistrationFee => FlightSuretyApp::REGISTRATION_FEECall::SIGNATURE,
            ContractMethod::RegisterOracle => FlightSuretyApp::registerOracleCall::SIGNATURE,
            ContractMethod::GetMyIndexes => FlightSuretyApp::getMyIndexesCall::SIGNATURE,
            ContractMethod::IsOperational => FlightSuretyApp::isOperationalCall::SIGNATURE,
            ContractMethod::SubmitOracleResponse { .. } => {
                FlightSuretyApp::submitOracleResponseCall::SIGNATURE
            }
            ContractMethod::FetchFlightStatus { .. } => {
                FlightSuretyApp::fetchFlightStatusCall::SIGNATURE
            }
        }
    }

    pub fn calldata(&self) -> Vec<u8> {
        match self {
            ContractMethod::RegistrationFee => FlightSuretyApp::REGISTRATION_FEECall {}.abi_encode(),
            ContractMethod::RegisterOracle => FlightSuretyApp::registerOracleCall {}.abi_encode(),
            ContractMethod::GetMyIndexes => FlightSuretyApp::getMyIndexesCall {}.abi_encode(),
            ContractMethod::IsOperational => FlightSuretyApp::isOperationalCall {}.abi_encode(),
            ContractMethod::SubmitOracleResponse { request, status } => {
                FlightSuretyApp::submitOracleResponseCall {
                    index: request.index,
                    airline: request.airline,
                    flight: request.flight.clone(),
                    timestamp: request.timestamp,
                    statusCode: status.code(),
                }
                .abi_encode()
            }
            ContractMethod::FetchFlightStatus {
                airline,
                flight,
                timestamp,
            } => FlightSuretyApp::fetchFlightStatusCall {
                airline: *airline,
                flight: flight.clone(),
                timestamp: *timestamp,
            }
            .abi_encode(),
        }
    }

    pub fn decode_output(&self, data: &[u8]) -> Result<CallOutput, alloy_sol_types::Error> {
        let output = match self {
            ContractMethod::RegistrationFee => CallOutput::Uint(
                FlightSuretyApp::REGISTRATION_FEECall::abi_decode_returns(data, true)?._0,
            ),
            ContractMethod::GetMyIndexes => CallOutput::Indexes(IndexTriple(
                FlightSuretyApp::getMyIndexesCall::abi_decode_returns(data, true)?._0,
            )),
            ContractMethod::IsOperational => CallOutput::Bool(
                FlightSuretyApp::isOperationalCall::abi_decode_returns(data, true)?._0,
            ),
            _ => CallOutput::Empty,
        };
        Ok(output)
    }
}

/// Decoded return value of a read-only call.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CallOutput {
    Empty,
    Uint(U256),
    Bool(bool),
    Indexes(IndexTriple),
}

impl CallOutput {
    fn kind(&self) -> &'static str {
        match self {
            CallOutput::Empty => "nothing",
            CallOutput::Uint(_) => "uint",
            CallOutput::Bool(_) => "bool",
            CallOutput::Indexes(_) => "index triple",
        }
    }

    fn unexpected(&self, method: &ContractMethod, expected: &'static str) -> ChainError {
        ChainError::UnexpectedOutput {
            method: method.name(),
            expected,
            actual: self.kind(),
        }
    }

    pub fn into_uint(self, method: &ContractMethod) -> Result<U256, ChainError> {
        match self {
            CallOutput::Uint(value) => Ok(value),
            other => Err(other.unexpected(method, "uint")),
        }
    }

    pub fn into_bool(self, method: &ContractMethod) -> Result<bool, ChainError> {
        match self {
            CallOutput::Bool(value) => Ok(value),
            other => Err(other.unexpected(method, "bool")),
        }
    }

    pub fn into_indexes(self, method: &ContractMethod) -> Result<IndexTriple, ChainError> {
        match self {
            CallOutput::Indexes(value) => Ok(value),
            other => Err(other.unexpected(method, "index triple")),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SendOptions {
    pub from: Address,
    pub value: Option<U256>,
}

impl SendOptions {
    pub fn sender(from: Address) -> Self {
        Self { from, value: None }
    }

    pub fn with_value(mut self, value: U256) -> Self {
        self.value = Some(value);
        self
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Receipt {
    pub transaction_hash: B256,
    pub block_number: Option<u64>,
}

/// Where a subscription starts reading history from.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BlockSelector {
    Genesis,
    Latest,
    Number(u64),
}

impl FromStr for BlockSelector {
    type Err = String;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value.trim().to_ascii_lowercase().as_str() {
            "genesis" | "earliest" | "0" => Ok(BlockSelector::Genesis),
            "latest" => Ok(BlockSelector::Latest),
            other => other
                .parse::<u64>()
                .map(BlockSelector::Number)
                .map_err(|_| format!("invalid block selector: {value}")),
        }
    }
}

/// Contract events the server subscribes to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ContractEvent {
    OracleRequest,
    FlightStatusInfo,
}

impl ContractEvent {
    pub fn signature(self) -> &'static str {
        match self {
            ContractEvent::OracleRequest => FlightSuretyApp::OracleRequest::SIGNATURE,
            ContractEvent::FlightStatusInfo => FlightSuretyApp::FlightStatusInfo::SIGNATURE,
        }
    }

    pub fn topic(self) -> B256 {
        match self {
            ContractEvent::OracleRequest => FlightSuretyApp::OracleRequest::SIGNATURE_HASH,
            ContractEvent::FlightStatusInfo => FlightSuretyApp::FlightStatusInfo::SIGNATURE_HASH,
        }
    }

    /// Decodes a raw log of this event. Topic 0 must match the event
    /// signature.
    pub fn decode(self, log: &LogData) -> Result<EventPayload, alloy_sol_types::Error> {
        match self {
            ContractEvent::OracleRequest => {
                let event = FlightSuretyApp::OracleRequest::decode_log_data(log, true)?;
                Ok(EventPayload::OracleRequest(StatusRequest {
                    index: event.index,
                    airline: event.airline,
                    flight: event.flight,
                    timestamp: event.timestamp,
                }))
            }
            ContractEvent::FlightStatusInfo => {
                let event = FlightSuretyApp::FlightStatusInfo::decode_log_data(log, true)?;
                Ok(EventPayload::FlightStatusInfo(FlightStatusInfo {
                    airline: event.airline,
                    flight: event.flight,
                    timestamp: event.timestamp,
                    status: event.status,
                }))
            }
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum EventPayload {
    OracleRequest(StatusRequest),
    FlightStatusInfo(FlightStatusInfo),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ChainEvent {
    pub meta: EventMeta,
    pub payload: EventPayload,
}

/// Accounts, contract calls and event subscriptions against one deployed
/// FlightSurety app contract.
#[async_trait]
pub trait ChainClient: Send + Sync {
    async fn accounts(&self) -> Result<Vec<Address>, ChainError>;

    /// Read-only invocation; no transaction is created.
    async fn call(&self, method: &ContractMethod, from: Address) -> Result<CallOutput, ChainError>;

    /// State-changing transaction signed by `options.from`. Resolves once the
    /// transaction is mined.
    async fn send(
        &self,
        method: &ContractMethod,
        options: SendOptions,
    ) -> Result<Receipt, ChainError>;

    async fn subscribe(
        &self,
        event: ContractEvent,
        from_block: BlockSelector,
    ) -> Result<EventSubscription, ChainError>;
}
