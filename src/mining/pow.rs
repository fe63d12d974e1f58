//! Proof-of-work search
//!
//! Finds the smallest nonce for which the SHA-256 of a block's
//! proof-of-work preimage, read as a big-endian integer, is strictly
//! below the block's target. The search is single-threaded and blocks
//! the caller until it succeeds.

use std::time::Instant;

use log::{debug, info};
use thiserror::Error;

use crate::core::{Block, BlockError};

/// Mining errors
#[derive(Error, Debug)]
pub enum MiningError {
    #[error("Nonce space exhausted without meeting target")]
    NonceSpaceExhausted,
    #[error("Block error: {0}")]
    Block(#[from] BlockError),
}

/// Mining statistics
#[derive(Debug, Clone)]
pub struct MiningStats {
    /// Number of hash attempts
    pub hash_attempts: u64,
    /// Time taken in milliseconds
    pub time_ms: u128,
    /// Hash rate (hashes per second)
    pub hash_rate: f64,
}

/// Seals blocks by searching for a nonce that meets the target
#[derive(Debug, Clone, Copy, Default)]
pub struct ProofOfWork;

impl ProofOfWork {
    pub fn new() -> Self {
        Self
    }

    /// Search nonces from zero and store the first acceptable nonce and
    /// hash on `block`. All other fields must already be final.
    pub fn seal(&self, block: &mut Block) -> Result<MiningStats, MiningError> {
        let start = Instant::now();
        let target = block.target()?;

        debug!("Mining block on {} with {} bits...", hex::encode(block.prev_hash), block.bits);

        let mut nonce = 0u64;
        loop {
            let hash = block.hash_with_nonce(nonce);
            if hash < target {
                block.nonce = nonce;
                block.hash = hash;
                break;
            }
            nonce = nonce.checked_add(1).ok_or(MiningError::NonceSpaceExhausted)?;
        }

        let attempts = nonce.saturating_add(1);
        let elapsed = start.elapsed().as_millis();
        let hash_rate = if elapsed > 0 {
            (attempts as f64) / (elapsed as f64 / 1000.0)
        } else {
            attempts as f64
        };

        info!(
            "Block {} mined in {}ms ({} attempts, {:.2} H/s)",
            hex::encode(block.hash),
            elapsed,
            attempts,
            hash_rate
        );

        Ok(MiningStats {
            hash_attempts: attempts,
            time_ms: elapsed,
            hash_rate,
        })
    }
}
