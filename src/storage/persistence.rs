//! JSON persistence for the chain and contracts
//!
//! Both stores write a whole document to a temporary file and atomically
//! rename it into place, so a crash mid-write never leaves a truncated
//! file behind. A missing file on load is not an error: it just means a
//! fresh start.

use log::info;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};
use thiserror::Error;

use crate::contract::contract::Contract;
use crate::core::block::Block;
use crate::core::chain::Chain;
use crate::core::config::ChainConfig;

/// On-disk document format version
const FORMAT_VERSION: &str = "1.0";

#[derive(Error, Debug)]
pub enum StorageError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
    #[error("Invalid data: {0}")]
    InvalidData(String),
}

/// Where the stores keep their files
#[derive(Debug, Clone)]
pub struct StorageConfig {
    pub data_dir: PathBuf,
    pub chain_file: String,
    pub contracts_file: String,
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self {
            data_dir: PathBuf::from("data"),
            chain_file: "chain.json".to_string(),
            contracts_file: "contracts.json".to_string(),
        }
    }
}

/// On-disk representation of the chain
#[derive(Debug, Serialize, Deserialize)]
struct ChainDocument {
    version: String,
    difficulty: u32,
    mining_reward: f64,
    blocks: Vec<Block>,
}

/// On-disk representation of the contract set
#[derive(Debug, Serialize, Deserialize)]
struct ContractDocument {
    version: String,
    next_id: u64,
    contracts: BTreeMap<String, Contract>,
}

/// Write `contents` next to `path` and rename into place
fn write_atomic(path: &Path, contents: &str) -> Result<(), StorageError> {
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent)?;
    }
    let tmp = path.with_extension("tmp");
    fs::write(&tmp, contents)?;
    fs::rename(&tmp, path)?;
    Ok(())
}

fn check_version(found: &str) -> Result<(), StorageError> {
    if found != FORMAT_VERSION {
        return Err(StorageError::InvalidData(format!(
            "unsupported format version {} (expected {})",
            found, FORMAT_VERSION
        )));
    }
    Ok(())
}

/// Persistence for the block chain
#[derive(Debug, Clone)]
pub struct ChainStore {
    config: StorageConfig,
}

impl ChainStore {
    pub fn new(config: StorageConfig) -> Self {
        Self { config }
    }

    fn path(&self) -> PathBuf {
        self.config.data_dir.join(&self.config.chain_file)
    }

    pub fn save(&self, chain: &Chain) -> Result<(), StorageError> {
        let doc = ChainDocument {
            version: FORMAT_VERSION.to_string(),
            difficulty: chain.current_difficulty(),
            mining_reward: chain.mining_reward(),
            blocks: chain.blocks.clone(),
        };
        write_atomic(&self.path(), &serde_json::to_string_pretty(&doc)?)?;
        info!("Saved chain ({} blocks) to {:?}", doc.blocks.len(), self.path());
        Ok(())
    }

    /// Load the chain, rebuilding it under `chain_config`.
    /// Returns `Ok(None)` when no file exists yet.
    pub fn load(&self, chain_config: ChainConfig) -> Result<Option<Chain>, StorageError> {
        let path = self.path();
        if !path.exists() {
            return Ok(None);
        }
        let doc: ChainDocument = serde_json::from_str(&fs::read_to_string(&path)?)?;
        check_version(&doc.version)?;
        let block_count = doc.blocks.len();
        let chain = Chain::from_parts(doc.blocks, doc.difficulty, doc.mining_reward, chain_config)
            .map_err(|e| StorageError::InvalidData(e.to_string()))?;
        info!("Loaded chain ({} blocks) from {:?}", block_count, path);
        Ok(Some(chain))
    }
}

/// Persistence for deployed contracts
#[derive(Debug, Clone)]
pub struct ContractStore {
    config: StorageConfig,
}

impl ContractStore {
    pub fn new(config: StorageConfig) -> Self {
        Self { config }
    }

    fn path(&self) -> PathBuf {
        self.config.data_dir.join(&self.config.contracts_file)
    }

    pub fn save(
        &self,
        next_id: u64,
        contracts: &BTreeMap<String, Contract>,
    ) -> Result<(), StorageError> {
        let doc = ContractDocument {
            version: FORMAT_VERSION.to_string(),
            next_id,
            contracts: contracts.clone(),
        };
        write_atomic(&self.path(), &serde_json::to_string_pretty(&doc)?)?;
        Ok(())
    }

    /// Load the contract set and id counter.
    /// Returns `Ok(None)` when no file exists yet.
    pub fn load(&self) -> Result<Option<(u64, BTreeMap<String, Contract>)>, StorageError> {
        let path = self.path();
        if !path.exists() {
            return Ok(None);
        }
        let doc: ContractDocument = serde_json::from_str(&fs::read_to_string(&path)?)?;
        check_version(&doc.version)?;
        Ok(Some((doc.next_id, doc.contracts)))
    }
}
