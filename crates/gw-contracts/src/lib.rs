//! Contract bindings for the GlobalWay suite: ABI loading, per-contract
//! handles, unit conversion and the role-gated admin command layer.

pub mod abi;
pub mod admin;
mod error;
mod guard;
mod manager;
pub mod units;

#[cfg(test)]
mod testkit;

pub use abi::{AbiRegistry, AbiSource, ContractHandle, parse_abi_document};
pub use admin::{AdminCommand, AdminError, AdminManager, required_votes};
pub use error::{ContractError, Result, friendly_revert};
pub use guard::{InFlight, InFlightGuard};
pub use manager::ContractsManager;
