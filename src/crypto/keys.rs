//! ECDSA key management for the blockchain
//!
//! Provides key pair generation, signing, and verification using the
//! secp256k1 elliptic curve. The hex-encoded compressed public key doubles
//! as the wallet address: transactions carry it in their `sender` field and
//! signatures are verified directly against it.

use rand::rngs::OsRng;
use secp256k1::{Message, PublicKey, Secp256k1, SecretKey};
use thiserror::Error;

use super::hash::sha256;

/// Errors that can occur during key operations
#[derive(Error, Debug)]
pub enum KeyError {
    #[error("Invalid private key")]
    InvalidPrivateKey,
    #[error("Invalid public key")]
    InvalidPublicKey,
    #[error("Invalid signature")]
    InvalidSignature,
    #[error("Secp256k1 error: {0}")]
    Secp256k1Error(#[from] secp256k1::Error),
}

/// A key pair consisting of a private key and its corresponding public key
#[derive(Clone)]
pub struct KeyPair {
    pub secret_key: SecretKey,
    pub public_key: PublicKey,
}

impl KeyPair {
    /// Generate a new random key pair
    pub fn generate() -> Self {
        let secp = Secp256k1::new();
        let (secret_key, public_key) = secp.generate_keypair(&mut OsRng);
        Self {
            secret_key,
            public_key,
        }
    }

    /// Create a key pair from a hex-encoded private key
    pub fn from_private_key_hex(hex_key: &str) -> Result<Self, KeyError> {
        let bytes = hex::decode(hex_key).map_err(|_| KeyError::InvalidPrivateKey)?;
        let secret_key =
            SecretKey::from_slice(&bytes).map_err(|_| KeyError::InvalidPrivateKey)?;
        let secp = Secp256k1::new();
        let public_key = PublicKey::from_secret_key(&secp, &secret_key);
        Ok(Self {
            secret_key,
            public_key,
        })
    }

    /// Get the private key as a hex string
    pub fn private_key_hex(&self) -> String {
        hex::encode(self.secret_key.secret_bytes())
    }

    /// Get the public key as a hex string (compressed format).
    /// This is also the wallet address.
    pub fn public_key_hex(&self) -> String {
        hex::encode(self.public_key.serialize())
    }

    /// Sign a payload with the private key.
    /// The payload is SHA-256 hashed before signing; the compact ECDSA
    /// signature is returned hex-encoded.
    pub fn sign(&self, payload: &[u8]) -> Result<String, KeyError> {
        let secp = Secp256k1::new();
        let digest = sha256(payload);
        let message = Message::from_digest_slice(&digest)?;
        let signature = secp.sign_ecdsa(&message, &self.secret_key);
        Ok(hex::encode(signature.serialize_compact()))
    }
}

/// Verify a hex-encoded signature against a hex-encoded public key.
/// Any malformed key or signature counts as a failed verification rather
/// than an error, so callers can treat the result as a plain predicate.
pub fn verify_signature(public_key_hex: &str, signature_hex: &str, payload: &[u8]) -> bool {
    let Ok(key_bytes) = hex::decode(public_key_hex) else {
        return false;
    };
    let Ok(public_key) = PublicKey::from_slice(&key_bytes) else {
        return false;
    };
    let Ok(sig_bytes) = hex::decode(signature_hex) else {
        return false;
    };
    let Ok(signature) = secp256k1::ecdsa::Signature::from_compact(&sig_bytes) else {
        return false;
    };

    let secp = Secp256k1::new();
    let digest = sha256(payload);
    let Ok(message) = Message::from_digest_slice(&digest) else {
        return false;
    };

    secp.verify_ecdsa(&message, &signature, &public_key).is_ok()
}
