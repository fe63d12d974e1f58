//! UTXO Ledger: a single-node proof-of-work ledger in Rust
//!
//! This crate provides the ledger engine featuring:
//! - Proof of Work sealing against a fixed target
//! - A content-addressed block store (sled) with atomic tip updates
//! - UTXO accounting by backward chain scans
//! - Per-input ECDSA signatures (secp256k1) bound to the spent output
//! - Base58Check addresses and JSON wallet files
//!
//! # Example
//!
//! ```rust,no_run
//! use utxo_ledger::core::{Blockchain, Transaction};
//! use utxo_ledger::storage::StorageConfig;
//! use utxo_ledger::wallet::Wallet;
//!
//! let config = StorageConfig::with_data_dir("/tmp/ledger");
//! let alice = Wallet::new();
//! let bob = Wallet::new();
//!
//! Blockchain::create(&config, &alice.address(), "genesis").unwrap();
//! let mut chain = Blockchain::open(&config).unwrap();
//!
//! let tx = chain.new_transaction(&alice.address(), &bob.address(), 5, &alice).unwrap();
//! let reward = Transaction::new_mining(&bob.address(), "block 1").unwrap();
//! chain.add_block(vec![reward, tx]).unwrap();
//!
//! println!("Bob has {} coins", chain.balance(&bob.pub_key_hash()).unwrap());
//! chain.close().unwrap();
//! ```

pub mod cli;
pub mod core;
pub mod crypto;
pub mod mining;
pub mod storage;
pub mod wallet;

// Re-export commonly used types
pub use core::{
    Block, BlockIter, Blockchain, BlockchainError, Transaction, TxId, TxInput, TxOutput,
    DIFFICULTY_BITS, MINING_REWARD,
};
pub use crypto::KeyPair;
pub use mining::{MiningStats, ProofOfWork};
pub use storage::{Storage, StorageConfig};
pub use wallet::{KeyProvider, Wallet, WalletManager};
