//! Mining
//!
//! Miners drive the proof-of-work search over the chain's pending
//! transactions, with optional cooperative cancellation.

pub mod miner;

pub use miner::{Miner, MiningStats};
