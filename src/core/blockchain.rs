//! Blockchain implementation
//!
//! [`Blockchain`] is the caller-owned handle on a persistent ledger store.
//! It appends verified, sealed blocks and walks the chain from the tip
//! back to genesis.
//!
//! Concurrency contract: at most one [`Blockchain::add_block`] may be in
//! flight; `&mut self` enforces this within one handle and callers sharing
//! a store across handles must serialize writers themselves. Readers
//! ([`Blockchain::iter`], UTXO scans) may run concurrently with each other.

use std::collections::{HashMap, HashSet};

use log::{debug, info, warn};
use sled::Tree;
use thiserror::Error;

use crate::core::block::{Block, BlockError};
use crate::core::transaction::{Transaction, TransactionError, TxId, TxInput, TxOutput};
use crate::crypto::{address, AddressError, Hash, KeyPair, SENTINEL_HASH};
use crate::mining::{MiningError, ProofOfWork};
use crate::storage::{read_block, Storage, StorageConfig, StorageError};
use crate::wallet::KeyProvider;

/// Blockchain-related errors
#[derive(Error, Debug)]
pub enum BlockchainError {
    #[error("Storage error: {0}")]
    Storage(#[from] StorageError),
    #[error("Transaction error: {0}")]
    Transaction(#[from] TransactionError),
    #[error("Invalid transaction {id}: {source}")]
    InvalidTransaction {
        id: TxId,
        #[source]
        source: TransactionError,
    },
    #[error("Mining error: {0}")]
    Mining(#[from] MiningError),
    #[error("Address error: {0}")]
    Address(#[from] AddressError),
    #[error("Insufficient funds: have {available}, need {needed}")]
    InsufficientFunds { available: u64, needed: u64 },
    #[error("No signing key for address {0}")]
    MissingKey(String),
}

impl From<BlockError> for BlockchainError {
    fn from(e: BlockError) -> Self {
        BlockchainError::Storage(StorageError::Serialization(e))
    }
}

/// Handle on an opened ledger
#[derive(Debug)]
pub struct Blockchain {
    storage: Storage,
    /// Hash of the most recently appended block
    tip: Hash,
    pow: ProofOfWork,
}

impl Blockchain {
    /// Create a new store whose genesis block pays the mining reward to
    /// `address`, carrying `genesis_info` as the coinbase data.
    ///
    /// Fails with [`StorageError::AlreadyExists`] if a store is present.
    pub fn create(
        config: &StorageConfig,
        address: &str,
        genesis_info: &str,
    ) -> Result<(), BlockchainError> {
        if config.exists() {
            return Err(StorageError::AlreadyExists(config.db_path()).into());
        }

        let coinbase = Transaction::new_mining(address, genesis_info)?;
        let mut genesis = Block::new(vec![coinbase], SENTINEL_HASH);
        let pow = ProofOfWork::new();
        pow.seal(&mut genesis)?;

        let storage = Storage::create(config)?;
        if let Err(e) = storage.append_block(&genesis).and_then(|_| storage.flush()) {
            if let Err(cleanup) = storage.discard(config) {
                warn!("Could not remove partial store {:?}: {}", config.db_path(), cleanup);
            }
            return Err(e.into());
        }

        info!(
            "Created ledger at {:?} with genesis block {}",
            config.db_path(),
            hex::encode(genesis.hash)
        );
        Ok(())
    }

    /// Open an existing store and load its tip
    pub fn open(config: &StorageConfig) -> Result<Self, BlockchainError> {
        let storage = Storage::open(config)?;
        let tip = storage.tip()?;
        debug!("Opened ledger at {:?}, tip {}", config.db_path(), hex::encode(tip));

        Ok(Self {
            storage,
            tip,
            pow: ProofOfWork::new(),
        })
    }

    /// Flush and release the store
    pub fn close(self) -> Result<(), BlockchainError> {
        self.storage.flush()?;
        Ok(())
    }

    /// Hash of the current tip
    pub fn tip(&self) -> Hash {
        self.tip
    }

    /// Get blockchain height (genesis is height 0)
    pub fn height(&self) -> Result<u64, BlockchainError> {
        let mut count = 0u64;
        for block in self.iter() {
            block?;
            count += 1;
        }
        Ok(count.saturating_sub(1))
    }

    /// Load the block at the current tip
    pub fn latest_block(&self) -> Result<Block, BlockchainError> {
        Ok(self.storage.get_block(&self.tip)?)
    }

    /// Verify, seal and persist a block holding `transactions`.
    ///
    /// Every non-mining transaction must verify against the chain; the
    /// first failure aborts the call before anything is written. The new
    /// block and the tip update are committed atomically.
    pub fn add_block(&mut self, transactions: Vec<Transaction>) -> Result<Block, BlockchainError> {
        let mut block = Block::new(transactions, self.tip);

        for tx in &block.transactions {
            self.verify_transaction(tx)?;
        }

        let stats = self.pow.seal(&mut block)?;
        self.storage.append_block(&block)?;
        self.tip = block.hash;

        info!(
            "Appended block {} ({} tx, {} attempts)",
            hex::encode(block.hash),
            block.tx_count(),
            stats.hash_attempts
        );
        Ok(block)
    }

    /// Iterate blocks from the tip back to genesis.
    ///
    /// The cursor starts at the tip as of this call. Blocks are immutable
    /// once written, so the walk is never affected by later appends, but an
    /// iterator also never sees blocks appended after it was created.
    pub fn iter(&self) -> BlockIter {
        BlockIter {
            blocks: self.storage.blocks_tree(),
            current: self.tip,
        }
    }

    /// Find a transaction anywhere in the chain
    pub fn find_transaction(&self, id: &TxId) -> Result<Option<Transaction>, BlockchainError> {
        for block in self.iter() {
            if let Some(tx) = block?.transactions.into_iter().find(|tx| tx.id == *id) {
                return Ok(Some(tx));
            }
        }
        Ok(None)
    }

    /// Collect the persisted transactions whose outputs `tx` spends.
    ///
    /// Missing references are simply absent from the map; signing and
    /// verification then fail closed on them.
    pub fn referenced_transactions(
        &self,
        tx: &Transaction,
    ) -> Result<HashMap<TxId, Transaction>, BlockchainError> {
        let mut wanted: HashSet<TxId> = tx.inputs.iter().filter_map(|i| i.prev_tx).collect();
        let mut found = HashMap::new();

        if wanted.is_empty() || tx.is_mining() {
            return Ok(found);
        }

        for block in self.iter() {
            for candidate in block?.transactions {
                if wanted.remove(&candidate.id) {
                    found.insert(candidate.id, candidate);
                }
            }
            if wanted.is_empty() {
                break;
            }
        }

        Ok(found)
    }

    /// Sign `tx` with `key_pair` against the outputs it spends
    pub fn sign_transaction(
        &self,
        tx: &mut Transaction,
        key_pair: &KeyPair,
    ) -> Result<(), BlockchainError> {
        if tx.is_mining() {
            return Ok(());
        }
        let referenced = self.referenced_transactions(tx)?;
        tx.sign(key_pair, &referenced)?;
        Ok(())
    }

    /// Verify the id of `tx` and every input signature against the chain
    pub fn verify_transaction(&self, tx: &Transaction) -> Result<(), BlockchainError> {
        let reject = |source: TransactionError| {
            warn!("Rejected transaction {}: {}", tx.id, source);
            BlockchainError::InvalidTransaction { id: tx.id, source }
        };

        tx.check_id().map_err(reject)?;
        if tx.is_mining() {
            return Ok(());
        }
        let referenced = self.referenced_transactions(tx)?;
        tx.check_signatures(&referenced).map_err(reject)
    }

    /// Build and sign a transfer of `amount` from `from` to `to`.
    ///
    /// Spends unspent outputs of `from` newest first until `amount` is
    /// covered and returns any excess to `from` as a change output.
    pub fn new_transaction(
        &self,
        from: &str,
        to: &str,
        amount: u64,
        keys: &impl KeyProvider,
    ) -> Result<Transaction, BlockchainError> {
        if amount == 0 {
            return Err(TransactionError::InvalidAmount(amount).into());
        }

        let from_hash = address::decode(from)?;
        let to_hash = address::decode(to)?;

        let selection = self.find_needed_utxo(&from_hash, amount)?;
        if selection.total < amount {
            warn!("Transfer {} from {} to {}: not enough money", amount, from, to);
            return Err(BlockchainError::InsufficientFunds {
                available: selection.total,
                needed: amount,
            });
        }

        let key_pair = keys
            .key_pair(from)
            .filter(|kp| kp.pub_key_hash() == from_hash)
            .ok_or_else(|| BlockchainError::MissingKey(from.to_string()))?;
        let public_key = key_pair.public_key_bytes();

        let mut inputs = Vec::with_capacity(selection.input_count());
        for (tx_id, indexes) in &selection.outputs {
            for index in indexes {
                inputs.push(TxInput::spending(*tx_id, *index, public_key.clone()));
            }
        }

        let mut outputs = vec![TxOutput {
            pub_key_hash: to_hash,
            value: amount,
        }];
        if selection.total > amount {
            outputs.push(TxOutput {
                pub_key_hash: from_hash,
                value: selection.total - amount,
            });
        }

        let mut tx = Transaction::new(inputs, outputs)?;
        self.sign_transaction(&mut tx, key_pair)?;

        debug!("Created transaction {} ({} -> {}, {})", tx.id, from, to, amount);
        Ok(tx)
    }

    /// Check every stored block's hash, merkle root, proof of work and
    /// parent link from tip to genesis
    pub fn validate_chain(&self) -> Result<u64, BlockchainError> {
        let mut expected = self.tip;
        let mut checked = 0u64;

        for block in self.iter() {
            let block = block?;
            if block.hash != expected {
                return Err(StorageError::Corrupt(format!(
                    "block stored under {} hashes to {}",
                    hex::encode(expected),
                    hex::encode(block.hash)
                ))
                .into());
            }
            block.validate()?;
            expected = block.prev_hash;
            checked += 1;
        }

        Ok(checked)
    }
}

/// Backward walk over persisted blocks
pub struct BlockIter {
    blocks: Tree,
    current: Hash,
}

impl Iterator for BlockIter {
    type Item = Result<Block, BlockchainError>;

    fn next(&mut self) -> Option<Self::Item> {
        if self.current == SENTINEL_HASH {
            return None;
        }

        match read_block(&self.blocks, &self.current) {
            Ok(block) => {
                self.current = block.prev_hash;
                Some(Ok(block))
            }
            Err(e) => {
                self.current = SENTINEL_HASH;
                Some(Err(e.into()))
            }
        }
    }
}
