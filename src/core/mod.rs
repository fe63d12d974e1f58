//! Core ledger components
//!
//! This module contains the fundamental building blocks:
//! - Transactions (UTXO model, per-input signing and verification)
//! - Blocks (canonical encoding and proof-of-work preimage)
//! - Blockchain (the persistent store handle and backward iteration)
//! - UTXO indexing and spend selection

pub mod block;
pub mod blockchain;
pub mod transaction;
pub mod utxo;

pub use block::{Block, BlockError, BLOCK_VERSION, DIFFICULTY_BITS};
pub use blockchain::{BlockIter, Blockchain, BlockchainError};
pub use transaction::{Transaction, TransactionError, TxId, TxInput, TxOutput, MINING_REWARD};
pub use utxo::{scan_unspent, select_outputs, SpendSelection, UnspentOutputs, UtxoRef};
