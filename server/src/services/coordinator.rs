//! Startup sequencing and lifetime of the oracle pool.

use std::sync::Arc;

use alloy_primitives::{Address, U256};
use thiserror::Error;
use tracing::{info, warn};

use super::dispatcher::ResponseDispatcher;
use super::flight_status::spawn_flight_status_watcher;
use super::listener::{ListenerHandle, ListenerStats, StatusRequestListener};
use super::registry::{OracleRegistry, RegistryError};
use crate::chain::{ChainClient, ChainError, ContractEvent, ContractMethod, SendOptions};
use crate::config::OracleConfig;
use crate::models::IndexTriple;

#[derive(Debug, Error)]
pub enum CoordinatorError {
    #[error("failed to enumerate accounts: {0}")]
    Accounts(#[source] ChainError),
    #[error(
        "{count} oracles at offset {offset} need {required} accounts, node has {available}"
    )]
    InsufficientAccounts {
        offset: usize,
        count: usize,
        required: usize,
        available: usize,
    },
    #[error("oracle account offset must be at least 1, account 0 is the contract owner")]
    OwnerInOraclePool,
    #[error("failed to read the oracle registration fee: {0}")]
    RegistrationFee(#[source] ChainError),
    #[error("failed to register oracle {oracle:?}: {source}")]
    Registration { oracle: Address, source: ChainError },
    #[error("failed to read indexes of oracle {oracle:?}: {source}")]
    Indexes { oracle: Address, source: ChainError },
    #[error(transparent)]
    Registry(#[from] RegistryError),
    #[error("failed to subscribe to oracle requests: {0}")]
    Subscribe(#[source] ChainError),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AccountPartition {
    pub owner: Address,
    pub oracles: Vec<Address>,
}

/// Account 0 owns the contracts; `count` accounts starting at `offset` act
/// as oracles. The owner is never part of the pool.
pub fn partition_accounts(
    accounts: &[Address],
    offset: usize,
    count: usize,
) -> Result<AccountPartition, CoordinatorError> {
    if offset == 0 && count > 0 {
        return Err(CoordinatorError::OwnerInOraclePool);
    }
    let required = offset.saturating_add(count).max(1);
    if accounts.len() < required {
        return Err(CoordinatorError::InsufficientAccounts {
            offset,
            count,
            required,
            available: accounts.len(),
        });
    }

    Ok(AccountPartition {
        owner: accounts[0],
        oracles: accounts[offset..offset + count].to_vec(),
    })
}

pub struct Coordinator<C: ?Sized> {
    client: Arc<C>,
    config: OracleConfig,
}

impl<C: ChainClient + ?Sized + 'static> Coordinator<C> {
    pub fn new(client: Arc<C>, config: OracleConfig) -> Self {
        Self { client, config }
    }

    /// Registers the oracle pool, then starts answering requests.
    ///
    /// Each step waits for the previous one. Any failure before the
    /// subscription is returned as is and nothing is left running.
    pub async fn start(self) -> Result<RunningCoordinator, CoordinatorError> {
        let accounts = self
            .client
            .accounts()
            .await
            .map_err(CoordinatorError::Accounts)?;
        let partition =
            partition_accounts(&accounts, self.config.account_offset, self.config.count)?;
        info!(
            owner = ?partition.owner,
            offset = self.config.account_offset,
            oracles = partition.oracles.len(),
            "registration of oracles"
        );

        let fee = self.registration_fee(partition.owner).await?;
        let registry = Arc::new(self.register_oracles(&partition.oracles, fee).await?);
        info!(oracles = registry.len(), fee = %fee, "oracle pool registered");

        let dispatcher = Arc::new(ResponseDispatcher::new(
            self.client.clone(),
            registry.clone(),
            self.config.submission_timeout,
        ));
        let subscription = self
            .client
            .subscribe(ContractEvent::OracleRequest, self.config.requests_from_block)
            .await
            .map_err(CoordinatorError::Subscribe)?;
        let listener =
            StatusRequestListener::spawn(subscription, dispatcher, self.config.delivery_policy);

        let status_watcher = match self
            .client
            .subscribe(ContractEvent::FlightStatusInfo, self.config.requests_from_block)
            .await
        {
            Ok(subscription) => Some(spawn_flight_status_watcher(subscription)),
            Err(err) => {
                warn!(error = %err, "flight status watcher unavailable");
                None
            }
        };

        Ok(RunningCoordinator {
            owner: partition.owner,
            registry,
            listener,
            status_watcher,
        })
    }

    async fn registration_fee(&self, owner: Address) -> Result<U256, CoordinatorError> {
        let method = ContractMethod::RegistrationFee;
        self.client
            .call(&method, owner)
            .await
            .and_then(|output| output.into_uint(&method))
            .map_err(CoordinatorError::RegistrationFee)
    }

    /// Registers one oracle at a time: each registration and its index
    /// read-back complete before the next account is touched.
    async fn register_oracles(
        &self,
        oracles: &[Address],
        fee: U256,
    ) -> Result<OracleRegistry, CoordinatorError> {
        let mut registry = OracleRegistry::new();
        for &oracle in oracles {
            if registry.contains(&oracle) {
                return Err(RegistryError::AlreadyRegistered(oracle).into());
            }
            let indexes = self.register_oracle(oracle, fee).await?;
            registry.register(oracle, indexes)?;
            info!(oracle = ?oracle, indexes = %indexes, "oracle registered");
        }
        Ok(registry)
    }

    async fn register_oracle(&self, oracle: Address, fee: U256) -> Result<IndexTriple, CoordinatorError> {
        self.client
            .send(
                &ContractMethod::RegisterOracle,
                SendOptions::sender(oracle).with_value(fee),
            )
            .await
            .map_err(|source| CoordinatorError::Registration { oracle, source })?;

        let method = ContractMethod::GetMyIndexes;
        self.client
            .call(&method, oracle)
            .await
            .and_then(|output| output.into_indexes(&method))
            .map_err(|source| CoordinatorError::Indexes { oracle, source })
    }
}

/// A started coordinator. Owns the listeners; the registry is frozen.
pub struct RunningCoordinator {
    owner: Address,
    registry: Arc<OracleRegistry>,
    listener: ListenerHandle,
    status_watcher: Option<ListenerHandle>,
}

impl RunningCoordinator {
    pub fn owner(&self) -> Address {
        self.owner
    }

    pub fn registry(&self) -> Arc<OracleRegistry> {
        self.registry.clone()
    }

    /// Cancels both subscriptions and waits for in-flight dispatches.
    pub async fn shutdown(self) -> ListenerStats {
        if let Some(watcher) = self.status_watcher {
            watcher.shutdown().await;
        }
        self.listener.shutdown().await
    }
}
