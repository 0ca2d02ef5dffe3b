//! Cryptographic utilities for the blockchain
//!
//! This module provides:
//! - SHA-256 hashing
//! - ECDSA key management (secp256k1)

pub mod hash;
pub mod keys;

pub use hash::{meets_difficulty, sha256, sha256_hex};
pub use keys::{verify_signature, KeyError, KeyPair};
