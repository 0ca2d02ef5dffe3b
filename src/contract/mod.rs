//! Smart contracts and their lifecycle
//!
//! This module provides:
//! - The contract types: timelock, multisig, escrow, conditional
//! - The manager owning deployed contracts and their persistence

pub mod contract;
pub mod manager;

pub use contract::{Contract, ContractError, ContractKind, EscrowStatus, ExecutionRecord};
pub use manager::{ContractManager, StatusFilter};
