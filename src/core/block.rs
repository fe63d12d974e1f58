//! Block implementation for the ledger
//!
//! A block carries header fields, the hash found by the proof-of-work
//! search and the ordered list of transactions. Blocks are built unsealed
//! by [`Block::new`], sealed once by the miner and never mutated after
//! they are persisted.

use std::fmt;

use chrono::{TimeZone, Utc};
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::core::transaction::Transaction;
use crate::crypto::{calculate_merkle_root, calculate_target, meets_target, sha256, Hash, SENTINEL_HASH};

/// Block format version
pub const BLOCK_VERSION: u64 = 0;

/// Required leading zero bits of every block hash
pub const DIFFICULTY_BITS: u32 = 12;

/// Block validation errors
#[derive(Error, Debug)]
pub enum BlockError {
    #[error("Invalid proof of work")]
    InvalidProofOfWork,
    #[error("Invalid difficulty bits: {0}")]
    InvalidDifficulty(u32),
    #[error("Invalid merkle root")]
    InvalidMerkleRoot,
    #[error("Invalid block hash")]
    InvalidBlockHash,
    #[error("Serialization error: {0}")]
    Serialization(#[from] bincode::Error),
}

/// A block in the ledger
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Block {
    pub version: u64,
    /// Hash of the parent block, [`SENTINEL_HASH`] for genesis
    pub prev_hash: Hash,
    /// Merkle root over the contained transaction ids
    pub merkle_root: Hash,
    /// Seconds since the Unix epoch
    pub timestamp: u64,
    /// Difficulty as required leading zero bits
    pub bits: u32,
    pub nonce: u64,
    /// Cached proof-of-work result
    pub hash: Hash,
    pub transactions: Vec<Transaction>,
}

impl Block {
    /// Create a new unsealed block on top of `prev_hash`
    pub fn new(transactions: Vec<Transaction>, prev_hash: Hash) -> Self {
        let merkle_root = Self::calculate_merkle_root(&transactions);

        Self {
            version: BLOCK_VERSION,
            prev_hash,
            merkle_root,
            timestamp: Utc::now().timestamp().max(0) as u64,
            bits: DIFFICULTY_BITS,
            nonce: 0,
            hash: SENTINEL_HASH,
            transactions,
        }
    }

    /// Calculate the merkle root from transaction ids
    pub fn calculate_merkle_root(transactions: &[Transaction]) -> Hash {
        let ids: Vec<Hash> = transactions.iter().map(|tx| tx.id.0).collect();
        calculate_merkle_root(&ids)
    }

    /// The bytes hashed by the proof-of-work search for `nonce`
    pub fn pow_preimage(&self, nonce: u64) -> Vec<u8> {
        let mut data = Vec::with_capacity(32 * 2 + 8 * 4 + 32 * self.transactions.len());
        data.extend_from_slice(&self.version.to_le_bytes());
        data.extend_from_slice(&self.prev_hash);
        data.extend_from_slice(&self.merkle_root);
        data.extend_from_slice(&self.timestamp.to_le_bytes());
        data.extend_from_slice(&u64::from(self.bits).to_le_bytes());
        data.extend_from_slice(&nonce.to_le_bytes());
        for tx in &self.transactions {
            data.extend_from_slice(tx.id.as_bytes());
        }
        data
    }

    /// Hash of the block contents with the given nonce
    pub fn hash_with_nonce(&self, nonce: u64) -> Hash {
        sha256(&self.pow_preimage(nonce))
    }

    /// The integer threshold this block's hash must fall below
    pub fn target(&self) -> Result<Hash, BlockError> {
        calculate_target(self.bits).ok_or(BlockError::InvalidDifficulty(self.bits))
    }

    /// True for the first block of a chain
    pub fn is_genesis(&self) -> bool {
        self.prev_hash == SENTINEL_HASH
    }

    /// Check if the proof of work is valid
    pub fn is_valid_pow(&self) -> bool {
        self.target()
            .map(|target| meets_target(&self.hash, &target))
            .unwrap_or(false)
    }

    /// Verify the block's merkle root
    pub fn verify_merkle_root(&self) -> bool {
        Self::calculate_merkle_root(&self.transactions) == self.merkle_root
    }

    /// Verify the cached hash against the block contents
    pub fn verify_hash(&self) -> bool {
        self.hash_with_nonce(self.nonce) == self.hash
    }

    /// Merkle root, cached hash and proof of work
    pub fn validate(&self) -> Result<(), BlockError> {
        self.target()?;
        if !self.verify_merkle_root() {
            return Err(BlockError::InvalidMerkleRoot);
        }
        if !self.verify_hash() {
            return Err(BlockError::InvalidBlockHash);
        }
        if !self.is_valid_pow() {
            return Err(BlockError::InvalidProofOfWork);
        }
        Ok(())
    }

    /// Canonical serialized form stored under the block hash
    pub fn serialize(&self) -> Result<Vec<u8>, BlockError> {
        Ok(bincode::serialize(self)?)
    }

    /// Decode a block from its canonical serialized form
    pub fn deserialize(bytes: &[u8]) -> Result<Self, BlockError> {
        Ok(bincode::deserialize(bytes)?)
    }

    /// Get number of transactions in this block
    pub fn tx_count(&self) -> usize {
        self.transactions.len()
    }
}

impl fmt::Display for Block {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let time = Utc
            .timestamp_opt(self.timestamp as i64, 0)
            .single()
            .map(|t| t.format("%Y-%m-%d %H:%M:%S").to_string())
            .unwrap_or_else(|| self.timestamp.to_string());

        writeln!(f, "Version     : {}", self.version)?;
        writeln!(f, "PrevHash    : {}", hex::encode(self.prev_hash))?;
        writeln!(f, "MerkleRoot  : {}", hex::encode(self.merkle_root))?;
        writeln!(f, "TimeStamp   : {}", time)?;
        writeln!(f, "Bits        : {}", self.bits)?;
        writeln!(f, "Nonce       : {}", self.nonce)?;
        writeln!(f, "Hash        : {}", hex::encode(self.hash))?;
        write!(f, "Txs         : {}", self.transactions.len())?;
        for tx in &self.transactions {
            write!(f, "\n{}", tx)?;
        }
        Ok(())
    }
}
