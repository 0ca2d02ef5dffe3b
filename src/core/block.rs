//! Blocks and proof-of-work
//!
//! A block binds an ordered list of transactions to its predecessor through
//! a SHA-256 hash. Proof-of-work requires the hash to start with a number of
//! zero hex digits equal to the block's stored difficulty; each block records
//! the difficulty it was mined at, so historical blocks stay verifiable after
//! a retarget.

use chrono::Utc;
use serde::{Deserialize, Serialize};
use serde_json::json;
use std::sync::atomic::{AtomicBool, Ordering};

use crate::core::transaction::Transaction;
use crate::crypto::{meets_difficulty, sha256_hex};

/// Previous-hash value of the genesis block
pub const GENESIS_PREVIOUS_HASH: &str = "0";

/// Nonce attempts between cancellation checks in [`Block::mine_with_cancel`]
const MINE_CHUNK: u64 = 10_000;

/// A block in the chain
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Block {
    pub index: u64,
    /// Unix timestamp (seconds) at creation
    pub timestamp: i64,
    pub transactions: Vec<Transaction>,
    pub previous_hash: String,
    pub miner_address: String,
    pub nonce: u64,
    /// Difficulty this block was mined at; zero until mined
    pub difficulty: u32,
    pub hash: String,
}

impl Block {
    /// Create an unmined block. The hash is computed but will not satisfy
    /// any non-zero difficulty until [`mine`](Self::mine) runs.
    pub fn new(
        index: u64,
        transactions: Vec<Transaction>,
        previous_hash: impl Into<String>,
        miner_address: impl Into<String>,
    ) -> Self {
        let mut block = Self {
            index,
            timestamp: Utc::now().timestamp(),
            transactions,
            previous_hash: previous_hash.into(),
            miner_address: miner_address.into(),
            nonce: 0,
            difficulty: 0,
            hash: String::new(),
        };
        block.hash = block.compute_hash();
        block
    }

    /// SHA-256 hex digest of the block's canonical record.
    ///
    /// The preimage covers index, miner, nonce, previous hash, timestamp and
    /// the canonical records of all transactions, with alphabetically ordered
    /// keys. The stored difficulty is metadata and not part of the preimage.
    pub fn compute_hash(&self) -> String {
        let transactions: Vec<serde_json::Value> = self
            .transactions
            .iter()
            .map(|tx| tx.canonical_record())
            .collect();
        let record = json!({
            "index": self.index,
            "miner_address": self.miner_address,
            "nonce": self.nonce,
            "previous_hash": self.previous_hash,
            "timestamp": self.timestamp,
            "transactions": transactions,
        });
        sha256_hex(record.to_string().as_bytes())
    }

    /// Brute-force a nonce until the hash meets `difficulty`.
    /// Returns the number of hash attempts.
    pub fn mine(&mut self, difficulty: u32) -> u64 {
        self.difficulty = difficulty;
        self.hash = self.compute_hash();
        let mut attempts: u64 = 1;
        while !self.meets_target() {
            self.nonce += 1;
            self.hash = self.compute_hash();
            attempts += 1;
        }
        attempts
    }

    /// Like [`mine`](Self::mine), but checks `cancel` between chunks of
    /// [`MINE_CHUNK`] attempts. Returns `None` when cancelled; the block is
    /// left unmined from the caller's point of view.
    pub fn mine_with_cancel(&mut self, difficulty: u32, cancel: &AtomicBool) -> Option<u64> {
        self.difficulty = difficulty;
        self.hash = self.compute_hash();
        let mut attempts: u64 = 1;
        loop {
            for _ in 0..MINE_CHUNK {
                if self.meets_target() {
                    return Some(attempts);
                }
                self.nonce += 1;
                self.hash = self.compute_hash();
                attempts += 1;
            }
            if cancel.load(Ordering::Relaxed) {
                return None;
            }
        }
    }

    /// Whether the stored hash satisfies the stored difficulty
    pub fn meets_target(&self) -> bool {
        meets_difficulty(&self.hash, self.difficulty)
    }

    /// Whether the stored hash matches a recomputation from the block's fields
    pub fn verify_hash(&self) -> bool {
        self.hash == self.compute_hash()
    }

    /// Whether every transaction in the block is intrinsically valid
    pub fn has_valid_transactions(&self) -> bool {
        self.transactions.iter().all(|tx| tx.is_valid())
    }

    /// Sum of the fees of all transactions in the block
    pub fn total_fees(&self) -> f64 {
        self.transactions.iter().map(|tx| tx.fee).sum()
    }
}
