//! Mining workers
//!
//! A miner wraps a payout address and drives the chain's mining entry
//! points, reporting hash-rate statistics. The cancellable variant is meant
//! for interactive use: a flag flipped from another thread stops the search
//! between nonce chunks without losing any pending transactions.

use log::info;
use std::sync::atomic::AtomicBool;
use std::time::Instant;

use crate::core::block::Block;
use crate::core::chain::Chain;

/// Statistics for one mining run
#[derive(Debug, Clone)]
pub struct MiningStats {
    pub hash_attempts: u64,
    pub time_ms: u128,
    /// Hashes per second over the run
    pub hash_rate: f64,
}

impl MiningStats {
    fn from_run(hash_attempts: u64, elapsed_ms: u128) -> Self {
        let hash_rate = if elapsed_ms > 0 {
            hash_attempts as f64 / (elapsed_ms as f64 / 1000.0)
        } else {
            hash_attempts as f64
        };
        Self {
            hash_attempts,
            time_ms: elapsed_ms,
            hash_rate,
        }
    }
}

/// A miner with a payout address
#[derive(Debug, Clone)]
pub struct Miner {
    pub address: String,
}

impl Miner {
    pub fn new(address: impl Into<String>) -> Self {
        Self {
            address: address.into(),
        }
    }

    /// Mine all pending transactions into a new block
    pub fn mine_pending(&self, chain: &mut Chain) -> (Block, MiningStats) {
        let start = Instant::now();
        let mut block = chain.prepare_candidate(&self.address);
        let attempts = block.mine(chain.current_difficulty());
        let stats = MiningStats::from_run(attempts, start.elapsed().as_millis());
        info!(
            "Mined block {} in {}ms ({:.0} H/s)",
            block.index, stats.time_ms, stats.hash_rate
        );
        chain.commit_block(block.clone());
        (block, stats)
    }

    /// Like [`mine_pending`](Self::mine_pending), but abandons the search
    /// when `cancel` is set. On cancellation the chain and mempool are left
    /// exactly as they were.
    pub fn mine_pending_cancellable(
        &self,
        chain: &mut Chain,
        cancel: &AtomicBool,
    ) -> Option<(Block, MiningStats)> {
        let start = Instant::now();
        let mut block = chain.prepare_candidate(&self.address);
        let attempts = block.mine_with_cancel(chain.current_difficulty(), cancel)?;
        let stats = MiningStats::from_run(attempts, start.elapsed().as_millis());
        chain.commit_block(block.clone());
        Some((block, stats))
    }
}
