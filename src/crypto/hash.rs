//! Cryptographic hashing utilities for the blockchain
//!
//! Provides the SHA-256 based hashing used for block hashes, transaction
//! hashes and the script engine's SHA256 opcode.

use sha2::{Digest, Sha256};

/// Computes SHA-256 hash of the input data
pub fn sha256(data: &[u8]) -> Vec<u8> {
    let mut hasher = Sha256::new();
    hasher.update(data);
    hasher.finalize().to_vec()
}

/// Computes SHA-256 hash and returns it as a hex string
pub fn sha256_hex(data: &[u8]) -> String {
    hex::encode(sha256(data))
}

/// Checks if a hex-encoded hash meets the difficulty target.
/// The first `difficulty` hex digits must all be `'0'`.
pub fn meets_difficulty(hash: &str, difficulty: u32) -> bool {
    let required = difficulty as usize;
    if hash.len() < required {
        return false;
    }
    hash.as_bytes().iter().take(required).all(|&b| b == b'0')
}
