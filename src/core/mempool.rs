//! Pending transaction pool
//!
//! Holds transactions waiting to be mined. When fee prioritization is on,
//! the pool keeps itself sorted by fee, highest first, with a stable sort so
//! equal-fee transactions keep arrival order.

use thiserror::Error;

use crate::core::config::ChainConfig;
use crate::core::transaction::Transaction;

#[derive(Error, Debug)]
pub enum MempoolError {
    #[error("Mempool is full ({size}/{max})")]
    Full { size: usize, max: usize },
}

/// Pool of transactions waiting for inclusion in a block
#[derive(Debug, Clone)]
pub struct Mempool {
    pending: Vec<Transaction>,
    prioritize_by_fee: bool,
    max_size: usize,
}

impl Mempool {
    pub fn new(config: &ChainConfig) -> Self {
        Self {
            pending: Vec::new(),
            prioritize_by_fee: config.prioritize_by_fee,
            max_size: config.mempool_max_size,
        }
    }

    /// Add a transaction to the pool, keeping fee ordering if enabled
    pub fn add(&mut self, transaction: Transaction) -> Result<(), MempoolError> {
        if self.pending.len() >= self.max_size {
            return Err(MempoolError::Full {
                size: self.pending.len(),
                max: self.max_size,
            });
        }
        self.pending.push(transaction);
        if self.prioritize_by_fee {
            self.pending.sort_by(|a, b| {
                b.fee
                    .partial_cmp(&a.fee)
                    .unwrap_or(std::cmp::Ordering::Equal)
            });
        }
        Ok(())
    }

    /// Pending transactions in mining order
    pub fn transactions(&self) -> &[Transaction] {
        &self.pending
    }

    /// Sum of fees over all pending transactions
    pub fn total_fees(&self) -> f64 {
        self.pending.iter().map(|tx| tx.fee).sum()
    }

    pub fn len(&self) -> usize {
        self.pending.len()
    }

    pub fn is_empty(&self) -> bool {
        self.pending.is_empty()
    }

    pub fn clear(&mut self) {
        self.pending.clear();
    }
}
