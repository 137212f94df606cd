//! In-memory registry of the oracle accounts this process registered.

use alloy_primitives::Address;
use thiserror::Error;

use crate::models::{IndexTriple, OracleIdentity};

#[derive(Debug, Error, PartialEq, Eq)]
pub enum RegistryError {
    #[error("oracle {0:?} is already registered")]
    AlreadyRegistered(Address),
}

/// Oracles in registration order.
///
/// Filled once during startup through `&mut self`, then shared behind an
/// `Arc` as a read-only value.
#[derive(Debug, Default)]
pub struct OracleRegistry {
    oracles: Vec<OracleIdentity>,
}

impl OracleRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn register(&mut self, address: Address, indexes: IndexTriple) -> Result<(), RegistryError> {
        if self.contains(&address) {
            return Err(RegistryError::AlreadyRegistered(address));
        }
        self.oracles.push(OracleIdentity { address, indexes });
        Ok(())
    }

    /// Every oracle whose index triple contains `index`, in registration order.
    pub fn find_eligible(&self, index: u8) -> Vec<&OracleIdentity> {
        self.oracles
            .iter()
            .filter(|oracle| oracle.indexes.contains(index))
            .collect()
    }

    pub fn contains(&self, address: &Address) -> bool {
        self.oracles.iter().any(|oracle| oracle.address == *address)
    }

    pub fn iter(&self) -> impl Iterator<Item = &OracleIdentity> {
        self.oracles.iter()
    }

    pub fn len(&self) -> usize {
        self.oracles.len()
    }

    pub fn is_empty(&self) -> bool {
        self.oracles.is_empty()
    }
}
