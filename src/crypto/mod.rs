//! Cryptographic utilities for the ledger
//!
//! This module provides:
//! - SHA-256 / RIPEMD-160 hashing and proof-of-work targets
//! - ECDSA key management (secp256k1)
//! - Merkle root calculation
//! - The Base58Check address codec

pub mod address;
pub mod hash;
pub mod keys;
pub mod merkle;

pub use address::AddressError;
pub use hash::{
    calculate_target, double_sha256, hash160, meets_difficulty, meets_target, sha256, sha256_hex,
    Hash, PubKeyHash, SENTINEL_HASH,
};
pub use keys::{sign_message, verify_signature, KeyError, KeyPair, SIGNATURE_LEN};
pub use merkle::calculate_merkle_root;
