//! Periodic difficulty retargeting
//!
//! Every `adjustment_interval` blocks the chain compares how long the last
//! window actually took against the target block time. Fast windows raise
//! difficulty by one, slow windows lower it by one, and the result is clamped
//! to the configured bounds. A single step per window keeps the hash-rate
//! response gentle enough to observe in an interactive session.

use serde::Serialize;

use crate::core::block::Block;
use crate::core::config::ChainConfig;

/// Windows faster than this fraction of the expected time raise difficulty
const SPEEDUP_THRESHOLD: f64 = 0.75;
/// Windows slower than this multiple of the expected time lower difficulty
const SLOWDOWN_THRESHOLD: f64 = 1.5;

/// Outcome of a retarget check
#[derive(Debug, Clone, Serialize)]
pub struct Adjustment {
    pub changed: bool,
    pub old_difficulty: u32,
    pub new_difficulty: u32,
    pub reason: String,
}

/// Retarget status report
#[derive(Debug, Clone, Serialize)]
pub struct AdjustmentInfo {
    pub current_difficulty: u32,
    /// `None` when retargeting is disabled
    pub blocks_until_adjustment: Option<u64>,
    /// Mean seconds between blocks over the whole chain; `None` below two blocks
    pub average_block_time: Option<f64>,
}

/// Stateless difficulty retargeting over a window of recent blocks
pub struct DifficultyAdjuster;

impl DifficultyAdjuster {
    /// Whether a retarget is due at the current chain length
    pub fn should_adjust(blocks: &[Block], config: &ChainConfig) -> bool {
        config.adjustment_enabled
            && config.adjustment_interval > 0
            && !blocks.is_empty()
            && blocks.len() as u64 % config.adjustment_interval == 0
    }

    /// Compute the next difficulty from the timing of the last window.
    ///
    /// The window spans the last `adjustment_interval` blocks; its actual
    /// duration is the timestamp difference between the window's first and
    /// last block.
    pub fn next_difficulty(blocks: &[Block], current: u32, config: &ChainConfig) -> Adjustment {
        let interval = config.adjustment_interval as usize;
        if blocks.len() < interval {
            return Adjustment {
                changed: false,
                old_difficulty: current,
                new_difficulty: current,
                reason: format!("window incomplete ({}/{} blocks)", blocks.len(), interval),
            };
        }

        let window = &blocks[blocks.len() - interval..];
        let actual = (window[interval - 1].timestamp - window[0].timestamp).max(0);
        let expected = config.target_block_time * config.adjustment_interval as i64;
        let ratio = actual as f64 / expected as f64;

        let proposed = if ratio < SPEEDUP_THRESHOLD {
            current + 1
        } else if ratio > SLOWDOWN_THRESHOLD {
            current.saturating_sub(1)
        } else {
            current
        };
        let new = proposed.clamp(config.min_difficulty, config.max_difficulty);

        let verdict = if new > current {
            "raising difficulty"
        } else if new < current {
            "lowering difficulty"
        } else {
            "difficulty unchanged"
        };
        let reason = format!("window took {}s vs {}s expected, {}", actual, expected, verdict);

        Adjustment {
            changed: new != current,
            old_difficulty: current,
            new_difficulty: new,
            reason,
        }
    }

    /// Snapshot of where the chain stands relative to the next retarget
    pub fn info(blocks: &[Block], current: u32, config: &ChainConfig) -> AdjustmentInfo {
        let interval = config.adjustment_interval;
        let blocks_until = if !config.adjustment_enabled || interval == 0 {
            None
        } else {
            let rem = blocks.len() as u64 % interval;
            Some(if rem == 0 { interval } else { interval - rem })
        };
        let average_block_time = if blocks.len() >= 2 {
            let span = blocks[blocks.len() - 1].timestamp - blocks[0].timestamp;
            Some(span as f64 / (blocks.len() - 1) as f64)
        } else {
            None
        };
        AdjustmentInfo {
            current_difficulty: current,
            blocks_until_adjustment: blocks_until,
            average_block_time,
        }
    }

    /// Run a retarget if one is due, returning the adjustment when it ran
    pub fn adjust_if_due(
        blocks: &[Block],
        current: u32,
        config: &ChainConfig,
    ) -> Option<Adjustment> {
        if !Self::should_adjust(blocks, config) {
            return None;
        }
        Some(Self::next_difficulty(blocks, current, config))
    }
}
