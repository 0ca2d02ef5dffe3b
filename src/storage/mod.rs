//! Persistence
//!
//! Whole-document JSON storage with atomic file replacement.

pub mod persistence;

pub use persistence::{ChainStore, ContractStore, StorageConfig, StorageError};
