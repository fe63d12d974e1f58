//! Storage module for ledger persistence

pub mod persistence;

pub use persistence::{read_block, Storage, StorageConfig, StorageError, BLOCKS_TREE, TIP_KEY};
