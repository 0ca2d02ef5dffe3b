//! Transactions on the ledger
//!
//! A transaction moves an amount from `sender` to `recipient` and carries a
//! fee claimed by the miner. Signing and hashing operate on a canonical JSON
//! encoding with alphabetically ordered keys, so the same transaction always
//! produces the same bytes regardless of field order in memory.

use chrono::Utc;
use serde::{Deserialize, Serialize};
use serde_json::json;
use thiserror::Error;

use crate::core::config::ChainConfig;
use crate::crypto::{sha256_hex, verify_signature, KeyError, KeyPair};

/// Sender address reserved for coinbase and genesis transactions.
/// System transactions carry no signature and pay no fee.
pub const SYSTEM_SENDER: &str = "MINING";

/// Errors that can occur when building or signing a transaction
#[derive(Error, Debug)]
pub enum TransactionError {
    #[error("Key error: {0}")]
    Key(#[from] KeyError),
}

/// A transfer of value between two addresses
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Transaction {
    /// Hex-encoded public key of the sender, or [`SYSTEM_SENDER`]
    pub sender: String,
    /// Hex-encoded public key of the recipient
    pub recipient: String,
    pub amount: f64,
    pub fee: f64,
    /// Unix timestamp (seconds) at creation
    pub timestamp: i64,
    /// Hex-encoded compact ECDSA signature; `None` until signed
    pub signature: Option<String>,
}

impl Transaction {
    /// Create a new unsigned transaction.
    ///
    /// When no fee is given the config's default fee applies. System
    /// transactions always carry a zero fee, whatever was asked for.
    pub fn new(
        sender: impl Into<String>,
        recipient: impl Into<String>,
        amount: f64,
        fee: Option<f64>,
        config: &ChainConfig,
    ) -> Self {
        let sender = sender.into();
        let fee = if sender == SYSTEM_SENDER {
            0.0
        } else {
            fee.unwrap_or(config.default_fee)
        };
        Self {
            sender,
            recipient: recipient.into(),
            amount,
            fee,
            timestamp: Utc::now().timestamp(),
            signature: None,
        }
    }

    /// Create a coinbase transaction paying `amount` to `recipient`
    pub fn reward(recipient: impl Into<String>, amount: f64) -> Self {
        Self {
            sender: SYSTEM_SENDER.to_string(),
            recipient: recipient.into(),
            amount,
            fee: 0.0,
            timestamp: Utc::now().timestamp(),
            signature: None,
        }
    }

    /// Whether this is a coinbase/genesis transaction
    pub fn is_system(&self) -> bool {
        self.sender == SYSTEM_SENDER
    }

    /// Canonical signing payload: compact JSON of the economic fields with
    /// alphabetically ordered keys. The signature itself is excluded.
    pub fn canonical_payload(&self) -> Vec<u8> {
        json!({
            "amount": self.amount,
            "fee": self.fee,
            "recipient": self.recipient,
            "sender": self.sender,
            "timestamp": self.timestamp,
        })
        .to_string()
        .into_bytes()
    }

    /// Canonical record of the full transaction, signature included.
    /// Blocks embed these records in their hash preimage.
    pub fn canonical_record(&self) -> serde_json::Value {
        json!({
            "amount": self.amount,
            "fee": self.fee,
            "recipient": self.recipient,
            "sender": self.sender,
            "signature": self.signature,
            "timestamp": self.timestamp,
        })
    }

    /// SHA-256 hex digest of the canonical record
    pub fn hash(&self) -> String {
        sha256_hex(self.canonical_record().to_string().as_bytes())
    }

    /// Sign the transaction with the given key pair.
    /// System transactions are never signed; this is a no-op for them.
    pub fn sign(&mut self, keypair: &KeyPair) -> Result<(), TransactionError> {
        if self.is_system() {
            return Ok(());
        }
        self.signature = Some(keypair.sign(&self.canonical_payload())?);
        Ok(())
    }

    /// Check the transaction's intrinsic validity.
    ///
    /// System transactions are always valid. Everything else needs a
    /// non-negative amount and fee, plus a signature that verifies against
    /// the sender's public key.
    pub fn is_valid(&self) -> bool {
        if self.is_system() {
            return true;
        }
        if self.amount < 0.0 || self.fee < 0.0 {
            return false;
        }
        match &self.signature {
            None => false,
            Some(signature) => {
                verify_signature(&self.sender, signature, &self.canonical_payload())
            }
        }
    }
}
