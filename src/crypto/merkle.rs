//! Merkle root calculation over transaction ids
//!
//! Builds a binary SHA-256 hash tree bottom-up; an odd node at any level
//! is paired with itself.

use super::hash::{sha256, Hash};

/// Calculate the merkle root from a list of transaction hashes
pub fn calculate_merkle_root(hashes: &[Hash]) -> Hash {
    if hashes.is_empty() {
        return sha256(b"");
    }

    let mut current_level: Vec<Hash> = hashes.to_vec();

    while current_level.len() > 1 {
        current_level = current_level
            .chunks(2)
            .map(|chunk| {
                let right = chunk.get(1).unwrap_or(&chunk[0]);
                let mut data = [0u8; 64];
                data[..32].copy_from_slice(&chunk[0]);
                data[32..].copy_from_slice(right);
                sha256(&data)
            })
            .collect();
    }

    current_level[0]
}
