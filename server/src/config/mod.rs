//! Process configuration, read from the environment (and `.env` via dotenvy).

use std::str::FromStr;
use std::time::Duration;

use alloy_primitives::Address;
use thiserror::Error;

mod contracts;

pub use contracts::ChainConfig;

use crate::chain::BlockSelector;
use crate::services::listener::DeliveryPolicy;

const DEFAULT_ORACLE_COUNT: usize = 20;
const DEFAULT_ORACLE_ACCOUNT_OFFSET: usize = 20;
const DEFAULT_SUBMISSION_TIMEOUT_SECONDS: u64 = 30;
const DEFAULT_PORT: u16 = 3000;

/// Source of configuration values by key.
pub type Lookup<'a> = dyn Fn(&str) -> Option<String> + 'a;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("{0} must be set")]
    Missing(&'static str),
    #[error("{key} has an invalid value {value:?}: {reason}")]
    Invalid {
        key: &'static str,
        value: String,
        reason: String,
    },
}

/// Oracle pool and dispatch settings.
#[derive(Clone, Debug)]
pub struct OracleConfig {
    /// Index of the first account reserved for oracles.
    pub account_offset: usize,
    pub count: usize,
    pub requests_from_block: BlockSelector,
    pub delivery_policy: DeliveryPolicy,
    pub submission_timeout: Duration,
}

impl Default for OracleConfig {
    fn default() -> Self {
        Self {
            account_offset: DEFAULT_ORACLE_ACCOUNT_OFFSET,
            count: DEFAULT_ORACLE_COUNT,
            requests_from_block: BlockSelector::Genesis,
            delivery_policy: DeliveryPolicy::default(),
            submission_timeout: Duration::from_secs(DEFAULT_SUBMISSION_TIMEOUT_SECONDS),
        }
    }
}

impl OracleConfig {
    fn from_lookup(lookup: &Lookup<'_>) -> Result<Self, ConfigError> {
        Ok(Self {
            account_offset: optional(lookup, "ORACLE_ACCOUNT_OFFSET", DEFAULT_ORACLE_ACCOUNT_OFFSET)?,
            count: optional(lookup, "ORACLE_COUNT", DEFAULT_ORACLE_COUNT)?,
            requests_from_block: optional(
                lookup,
                "ORACLE_REQUESTS_FROM_BLOCK",
                BlockSelector::Genesis,
            )?,
            delivery_policy: optional(lookup, "ORACLE_DELIVERY_POLICY", DeliveryPolicy::default())?,
            submission_timeout: Duration::from_secs(optional(
                lookup,
                "SUBMISSION_TIMEOUT_SECONDS",
                DEFAULT_SUBMISSION_TIMEOUT_SECONDS,
            )?),
        })
    }
}

#[derive(Clone, Debug)]
pub struct ServerConfig {
    pub port: u16,
    pub cors_allowed_origins: Vec<String>,
}

#[derive(Clone, Debug)]
pub struct AppConfig {
    pub chain: ChainConfig,
    pub oracles: OracleConfig,
    pub server: ServerConfig,
}

impl AppConfig {
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(&|key| std::env::var(key).ok())
    }

    pub fn from_lookup(lookup: &Lookup<'_>) -> Result<Self, ConfigError> {
        let cors_allowed_origins = lookup("CORS_ALLOWED_ORIGINS")
            .unwrap_or_else(|| "http://localhost:8080".to_string())
            .split(',')
            .map(|origin| origin.trim().to_string())
            .filter(|origin| !origin.is_empty())
            .collect();

        Ok(Self {
            chain: ChainConfig::from_lookup(lookup)?,
            oracles: OracleConfig::from_lookup(lookup)?,
            server: ServerConfig {
                port: optional(lookup, "PORT", DEFAULT_PORT)?,
                cors_allowed_origins,
            },
        })
    }
}

pub(crate) fn optional<T>(lookup: &Lookup<'_>, key: &'static str, default: T) -> Result<T, ConfigError>
where
    T: FromStr,
    T::Err: std::fmt::Display,
{
    match lookup(key) {
        Some(value) if !value.trim().is_empty() => {
            value.trim().parse().map_err(|err: T::Err| ConfigError::Invalid {
                key,
                value: value.clone(),
                reason: err.to_string(),
            })
        }
        _ => Ok(default),
    }
}

pub(crate) fn parse_address(key: &'static str, value: &str) -> Result<Address, ConfigError> {
    let invalid = |reason: String| ConfigError::Invalid {
        key,
        value: value.to_string(),
        reason,
    };
    let bytes = hex::decode(value.trim().trim_start_matches("0x")).map_err(|err| invalid(err.to_string()))?;
    if bytes.len() != 20 {
        return Err(invalid(format!("expected 20 bytes, got {}", bytes.len())));
    }
    Ok(Address::from_slice(&bytes))
}
