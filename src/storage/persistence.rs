//! Ledger persistence layer
//!
//! Blocks live in a single sled tree keyed by their 32-byte hash, next to
//! one fixed key holding the tip hash. A block and the tip update that
//! points at it are always written in one atomic batch.

use std::path::PathBuf;

use log::debug;
use sled::{Batch, Db, Tree};
use thiserror::Error;

use crate::core::{Block, BlockError};
use crate::crypto::Hash;

/// Namespace holding blocks and the tip pointer
pub const BLOCKS_TREE: &str = "blocks";

/// Key of the current tip hash inside [`BLOCKS_TREE`]
pub const TIP_KEY: &[u8] = b"lastBlockHash";

/// Storage errors
#[derive(Error, Debug)]
pub enum StorageError {
    #[error("Ledger store already exists at {0:?}")]
    AlreadyExists(PathBuf),
    #[error("No ledger store at {0:?}")]
    NotFound(PathBuf),
    #[error("Ledger store is corrupt: {0}")]
    Corrupt(String),
    #[error("Database error: {0}")]
    Database(#[from] sled::Error),
    #[error("Block encoding error: {0}")]
    Serialization(#[from] BlockError),
}

/// Storage configuration
#[derive(Debug, Clone)]
pub struct StorageConfig {
    pub data_dir: PathBuf,
    pub db_name: String,
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self {
            data_dir: PathBuf::from(".ledger_data"),
            db_name: "blockchain.db".to_string(),
        }
    }
}

impl StorageConfig {
    /// Configuration rooted at `data_dir` with the default database name
    pub fn with_data_dir(data_dir: impl Into<PathBuf>) -> Self {
        Self {
            data_dir: data_dir.into(),
            ..Default::default()
        }
    }

    /// Location of the sled database
    pub fn db_path(&self) -> PathBuf {
        self.data_dir.join(&self.db_name)
    }

    /// Check if a store exists at the configured location
    pub fn exists(&self) -> bool {
        self.db_path().exists()
    }
}

/// Handle on the opened block store
pub struct Storage {
    db: Db,
    blocks: Tree,
}

impl std::fmt::Debug for Storage {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Storage").finish()
    }
}

impl Storage {
    /// Create a fresh store; fails if one already exists
    pub fn create(config: &StorageConfig) -> Result<Self, StorageError> {
        let path = config.db_path();
        if path.exists() {
            return Err(StorageError::AlreadyExists(path));
        }

        std::fs::create_dir_all(&config.data_dir).map_err(sled::Error::Io)?;
        let db = sled::open(&path)?;
        let blocks = db.open_tree(BLOCKS_TREE)?;
        debug!("Created ledger store at {:?}", path);

        Ok(Self { db, blocks })
    }

    /// Open an existing store; its block namespace must already exist
    pub fn open(config: &StorageConfig) -> Result<Self, StorageError> {
        let path = config.db_path();
        if !path.exists() {
            return Err(StorageError::NotFound(path));
        }

        let db = sled::open(&path)?;
        let has_blocks = db
            .tree_names()
            .iter()
            .any(|name| name.as_ref() == BLOCKS_TREE.as_bytes());
        if !has_blocks {
            return Err(StorageError::Corrupt(format!(
                "namespace '{}' missing",
                BLOCKS_TREE
            )));
        }
        let blocks = db.open_tree(BLOCKS_TREE)?;

        Ok(Self { db, blocks })
    }

    /// Read the tip hash
    pub fn tip(&self) -> Result<Hash, StorageError> {
        let value = self
            .blocks
            .get(TIP_KEY)?
            .ok_or_else(|| StorageError::Corrupt("tip pointer missing".to_string()))?;
        to_hash(&value)
    }

    /// Load the block stored under `hash`
    pub fn get_block(&self, hash: &Hash) -> Result<Block, StorageError> {
        read_block(&self.blocks, hash)
    }

    /// Store `block` under its hash and move the tip to it, atomically
    pub fn append_block(&self, block: &Block) -> Result<(), StorageError> {
        let bytes = block.serialize()?;

        let mut batch = Batch::default();
        batch.insert(&block.hash[..], bytes);
        batch.insert(TIP_KEY, &block.hash[..]);
        self.blocks.apply_batch(batch)?;
        self.db.flush()?;

        Ok(())
    }

    /// Cheap clone of the block namespace for readers
    pub fn blocks_tree(&self) -> Tree {
        self.blocks.clone()
    }

    /// Flushes all pending writes to disk
    pub fn flush(&self) -> Result<(), StorageError> {
        self.db.flush()?;
        Ok(())
    }

    /// Close the store and delete its directory
    pub fn discard(self, config: &StorageConfig) -> Result<(), StorageError> {
        drop(self);
        std::fs::remove_dir_all(config.db_path()).map_err(sled::Error::Io)?;
        Ok(())
    }
}

/// Load and decode a block from the namespace
pub fn read_block(blocks: &Tree, hash: &Hash) -> Result<Block, StorageError> {
    let bytes = blocks.get(hash)?.ok_or_else(|| {
        StorageError::Corrupt(format!("block {} missing", hex::encode(hash)))
    })?;
    Ok(Block::deserialize(&bytes)?)
}

fn to_hash(bytes: &[u8]) -> Result<Hash, StorageError> {
    bytes
        .try_into()
        .map_err(|_| StorageError::Corrupt(format!("tip has {} bytes", bytes.len())))
}
