//! Core ledger types
//!
//! This module provides:
//! - Transactions with ECDSA signatures and canonical hashing
//! - Blocks with hex-digit proof-of-work
//! - The mempool with fee prioritization
//! - Periodic difficulty retargeting
//! - The chain: validation, balances, mining entry points

pub mod block;
pub mod chain;
pub mod config;
pub mod difficulty;
pub mod mempool;
pub mod transaction;

pub use block::{Block, GENESIS_PREVIOUS_HASH};
pub use chain::{Chain, ChainError, ChainInfo, GENESIS_ADDRESS};
pub use config::ChainConfig;
pub use difficulty::{Adjustment, AdjustmentInfo, DifficultyAdjuster};
pub use mempool::{Mempool, MempoolError};
pub use transaction::{Transaction, TransactionError, SYSTEM_SENDER};
