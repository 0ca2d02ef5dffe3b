//! Chain configuration
//!
//! Every tunable of the ledger lives here and is threaded explicitly into
//! `Chain`, the mempool and the difficulty adjuster. Tests construct modified
//! configs instead of mutating globals.

use serde::{Deserialize, Serialize};

/// Tunable parameters of a chain instance
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ChainConfig {
    /// Difficulty the genesis block is mined at
    pub initial_difficulty: u32,
    /// Coinbase reward paid to the miner of each block
    pub mining_reward: f64,
    /// Fee applied when a transaction does not specify one
    pub default_fee: f64,
    /// Lower bound accepted for an explicit fee
    pub min_fee: f64,
    /// Upper bound accepted for an explicit fee
    pub max_fee: f64,
    /// Order pending transactions by fee, highest first
    pub prioritize_by_fee: bool,
    /// Maximum number of pending transactions held in the mempool
    pub mempool_max_size: usize,
    /// Whether periodic difficulty retargeting runs at all
    pub adjustment_enabled: bool,
    /// Retarget every this many blocks
    pub adjustment_interval: u64,
    /// Desired seconds between consecutive blocks
    pub target_block_time: i64,
    /// Difficulty floor for the adjuster
    pub min_difficulty: u32,
    /// Difficulty ceiling for the adjuster
    pub max_difficulty: u32,
}

impl Default for ChainConfig {
    fn default() -> Self {
        Self {
            initial_difficulty: 4,
            mining_reward: 50.0,
            default_fee: 0.5,
            min_fee: 0.1,
            max_fee: 10.0,
            prioritize_by_fee: true,
            mempool_max_size: 100,
            adjustment_enabled: true,
            adjustment_interval: 10,
            target_block_time: 60,
            min_difficulty: 2,
            max_difficulty: 8,
        }
    }
}

impl ChainConfig {
    /// A low-difficulty config for tests and demos; mining is near-instant
    pub fn fast() -> Self {
        Self {
            initial_difficulty: 1,
            ..Self::default()
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let config = ChainConfig::default();
        assert_eq!(config.initial_difficulty, 4);
        assert_eq!(config.mining_reward, 50.0);
        assert_eq!(config.adjustment_interval, 10);
        assert!(config.min_difficulty <= config.max_difficulty);
    }
}
