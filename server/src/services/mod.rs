//! Oracle coordination services

pub mod coordinator;
pub mod dispatcher;
pub mod flight_status;
pub mod listener;
pub mod registry;

pub use coordinator::{partition_accounts, AccountPartition, Coordinator, CoordinatorError, RunningCoordinator};
pub use dispatcher::{DispatchSummary, ResponseDispatcher};
pub use listener::{DeliveryPolicy, ListenerHandle, ListenerStats, StatusRequestHandler, StatusRequestListener};
pub use registry::{OracleRegistry, RegistryError};
