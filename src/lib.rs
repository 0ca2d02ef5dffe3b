//! An educational proof-of-work cryptocurrency
//!
//! The crate models a small but complete coin:
//! - **core**: transactions, blocks, the mempool, difficulty retargeting and
//!   the chain itself, with balances derived by scanning the ledger
//! - **crypto**: SHA-256 hashing and secp256k1 ECDSA keys; the compressed
//!   public key doubles as the wallet address
//! - **script**: a gas-metered stack VM in the spirit of Bitcoin script
//! - **contract**: timelock, multisig, escrow and conditional contracts with
//!   an execute-at-most-once lifecycle
//! - **mining**: proof-of-work workers with hash-rate stats and cooperative
//!   cancellation
//! - **storage**: atomic JSON persistence for the chain and contracts
//!
//! Proof-of-work here counts zero hex digits rather than bits: a block at
//! difficulty `d` needs a hash starting with `d` zeros, so each difficulty
//! step multiplies the expected work by sixteen. Every block stores the
//! difficulty it was mined at and is validated against it, which keeps old
//! blocks verifiable after a retarget.
//!
//! # Example
//!
//! ```
//! use learncoin::core::{Chain, ChainConfig, Transaction};
//! use learncoin::crypto::KeyPair;
//!
//! let mut chain = Chain::new(ChainConfig {
//!     initial_difficulty: 1,
//!     ..ChainConfig::default()
//! });
//!
//! let alice = KeyPair::generate();
//! chain.mine_pending(&alice.public_key_hex());
//! assert_eq!(chain.get_balance(&alice.public_key_hex()), 50.0);
//!
//! let mut tx = Transaction::new(
//!     alice.public_key_hex(),
//!     "bob",
//!     10.0,
//!     Some(0.5),
//!     chain.config(),
//! );
//! tx.sign(&alice).unwrap();
//! chain.add_transaction(tx).unwrap();
//! chain.mine_pending("bob");
//!
//! assert!(chain.is_chain_valid());
//! ```

pub mod contract;
pub mod core;
pub mod crypto;
pub mod mining;
pub mod script;
pub mod storage;

pub use contract::{Contract, ContractManager};
pub use core::{Block, Chain, ChainConfig, Transaction};
pub use crypto::KeyPair;
pub use mining::{Miner, MiningStats};
pub use script::{ScriptEngine, Value};
pub use storage::{ChainStore, ContractStore, StorageConfig};
