//! Transaction handling for the ledger
//!
//! Implements the UTXO transaction model: inputs reference outputs of
//! earlier transactions and prove ownership with a per-input ECDSA
//! signature, outputs lock value to a public-key hash.
//!
//! The signing payload for input `i` is the id of a trimmed copy of the
//! transaction (every input's signature and public key cleared) in which
//! input `i`'s public-key field carries the hash from the output it
//! spends. Other inputs' signature and public-key fields never enter that
//! payload.

use std::collections::HashMap;
use std::fmt;

use chrono::Utc;
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::crypto::{address, hash160, sha256, verify_signature, AddressError, KeyError, KeyPair, PubKeyHash};

/// Reward paid by every mining transaction
pub const MINING_REWARD: u64 = 17;

/// Transaction-related errors
#[derive(Error, Debug)]
pub enum TransactionError {
    #[error("Referenced transaction {0} not found in the chain")]
    UnknownReferencedTransaction(TxId),
    #[error("Output {1} of transaction {0} does not exist")]
    InvalidOutputReference(TxId, u32),
    #[error("Invalid signature on input {0}")]
    SignatureInvalid(usize),
    #[error("Input {0} is not owned by the signing key")]
    WrongOwner(usize),
    #[error("Transaction id {stored} does not match its contents ({computed})")]
    IdMismatch { stored: TxId, computed: TxId },
    #[error("Invalid amount: {0}")]
    InvalidAmount(u64),
    #[error("Serialization error: {0}")]
    Serialization(#[from] bincode::Error),
    #[error("Address error: {0}")]
    Address(#[from] AddressError),
    #[error("Crypto error: {0}")]
    Key(#[from] KeyError),
}

// =============================================================================
// Transaction id
// =============================================================================

/// A transaction id: SHA-256 over the canonical encoding of the transaction
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct TxId(pub [u8; 32]);

impl TxId {
    /// Value the `id` field holds while the id itself is being hashed
    pub const EMPTY: TxId = TxId([0u8; 32]);

    pub fn as_bytes(&self) -> &[u8; 32] {
        &self.0
    }
}

impl fmt::Display for TxId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&hex::encode(self.0))
    }
}

// =============================================================================
// Inputs and outputs
// =============================================================================

/// Transaction input (reference to previous output)
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TxInput {
    /// Id of the transaction holding the spent output; `None` for a mining input
    pub prev_tx: Option<TxId>,
    /// Index of the output in the previous transaction
    pub output_index: u32,
    /// Signature proving ownership, or miner data for a mining input
    pub signature: Vec<u8>,
    /// Public key of the signer (empty for a mining input)
    pub public_key: Vec<u8>,
}

impl TxInput {
    /// An unsigned input spending `output_index` of `prev_tx`
    pub fn spending(prev_tx: TxId, output_index: u32, public_key: Vec<u8>) -> Self {
        Self {
            prev_tx: Some(prev_tx),
            output_index,
            signature: Vec::new(),
            public_key,
        }
    }

    /// True if this input was signed by the key hashing to `pub_key_hash`
    pub fn uses_key(&self, pub_key_hash: &PubKeyHash) -> bool {
        !self.public_key.is_empty() && hash160(&self.public_key) == *pub_key_hash
    }
}

/// Transaction output
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TxOutput {
    /// Recipient's public-key hash
    pub pub_key_hash: PubKeyHash,
    /// Amount of coins
    pub value: u64,
}

impl TxOutput {
    /// Check if this output is locked to the given key hash
    pub fn is_locked_to(&self, pub_key_hash: &PubKeyHash) -> bool {
        self.pub_key_hash == *pub_key_hash
    }
}

// =============================================================================
// Transaction
// =============================================================================

/// A ledger transaction
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Transaction {
    /// Canonical hash of the transaction with this field held empty
    pub id: TxId,
    pub inputs: Vec<TxInput>,
    pub outputs: Vec<TxOutput>,
    /// Creation time, seconds since the Unix epoch
    pub timestamp: u64,
}

impl Transaction {
    /// Create a transaction stamped with the current time and compute its id
    pub fn new(inputs: Vec<TxInput>, outputs: Vec<TxOutput>) -> Result<Self, TransactionError> {
        let mut tx = Self {
            id: TxId::EMPTY,
            inputs,
            outputs,
            timestamp: Utc::now().timestamp().max(0) as u64,
        };
        tx.id = tx.calculate_id()?;
        Ok(tx)
    }

    /// Create a mining (coinbase) transaction paying the reward to `address`.
    ///
    /// The single synthetic input carries `data` in its signature field.
    pub fn new_mining(address: &str, data: &str) -> Result<Self, TransactionError> {
        let pub_key_hash = address::decode(address)?;

        let input = TxInput {
            prev_tx: None,
            output_index: 0,
            signature: data.as_bytes().to_vec(),
            public_key: Vec::new(),
        };
        let output = TxOutput {
            pub_key_hash,
            value: MINING_REWARD,
        };

        Self::new(vec![input], vec![output])
    }

    /// A mining transaction has exactly one input with no referenced id and index 0
    pub fn is_mining(&self) -> bool {
        self.inputs.len() == 1 && self.inputs[0].prev_tx.is_none() && self.inputs[0].output_index == 0
    }

    /// Canonical encoding of the transaction
    pub fn serialize(&self) -> Result<Vec<u8>, bincode::Error> {
        bincode::serialize(self)
    }

    /// SHA-256 of the canonical encoding with `id` held empty
    pub fn calculate_id(&self) -> Result<TxId, bincode::Error> {
        let mut unhashed = self.clone();
        unhashed.id = TxId::EMPTY;
        Ok(TxId(sha256(&unhashed.serialize()?)))
    }

    /// Check that the stored id is the hash of the transaction's contents
    pub fn check_id(&self) -> Result<(), TransactionError> {
        let computed = self.calculate_id()?;
        if computed != self.id {
            return Err(TransactionError::IdMismatch {
                stored: self.id,
                computed,
            });
        }
        Ok(())
    }

    /// Copy with every input's signature and public key cleared
    pub fn trimmed_copy(&self) -> Transaction {
        let inputs = self
            .inputs
            .iter()
            .map(|input| TxInput {
                prev_tx: input.prev_tx,
                output_index: input.output_index,
                signature: Vec::new(),
                public_key: Vec::new(),
            })
            .collect();

        Transaction {
            id: self.id,
            inputs,
            outputs: self.outputs.clone(),
            timestamp: self.timestamp,
        }
    }

    /// Get total output amount
    pub fn total_output(&self) -> u64 {
        self.outputs.iter().map(|o| o.value).sum()
    }

    /// Resolve the output spent by input `index`
    pub fn referenced_output<'a>(
        &self,
        index: usize,
        referenced: &'a HashMap<TxId, Transaction>,
    ) -> Result<&'a TxOutput, TransactionError> {
        let input = &self.inputs[index];
        let prev_id = input.prev_tx.unwrap_or(TxId::EMPTY);
        let prev_tx = referenced
            .get(&prev_id)
            .ok_or(TransactionError::UnknownReferencedTransaction(prev_id))?;
        prev_tx
            .outputs
            .get(input.output_index as usize)
            .ok_or(TransactionError::InvalidOutputReference(prev_id, input.output_index))
    }

    /// The hash that input `index`'s signature commits to
    pub fn signing_payload(
        &self,
        index: usize,
        spent_pub_key_hash: &PubKeyHash,
    ) -> Result<TxId, TransactionError> {
        let mut trimmed = self.trimmed_copy();
        trimmed.inputs[index].public_key = spent_pub_key_hash.to_vec();
        Ok(trimmed.calculate_id()?)
    }

    /// Sign every input with `key_pair`, then recompute the id over the
    /// signed contents.
    ///
    /// `referenced` must hold every transaction whose outputs are spent.
    /// Mining transactions have nothing to sign.
    pub fn sign(
        &mut self,
        key_pair: &KeyPair,
        referenced: &HashMap<TxId, Transaction>,
    ) -> Result<(), TransactionError> {
        if self.is_mining() {
            return Ok(());
        }

        let public_key = key_pair.public_key_bytes();
        for index in 0..self.inputs.len() {
            let spent = self.referenced_output(index, referenced)?;
            let payload = self.signing_payload(index, &spent.pub_key_hash)?;
            let signature = key_pair.sign(&payload.0)?;

            let input = &mut self.inputs[index];
            input.signature = signature;
            input.public_key = public_key.clone();
        }
        self.id = self.calculate_id()?;

        log::debug!("Signed {} input(s) of transaction {}", self.inputs.len(), self.id);
        Ok(())
    }

    /// Check every input's signature, reporting the first failure.
    ///
    /// Besides the signature itself, each input's public key must hash to
    /// the key hash of the output it spends; otherwise the input fails with
    /// [`TransactionError::WrongOwner`]. The signature alone does not
    /// enforce this, since the payload only commits to that key hash.
    pub fn check_signatures(
        &self,
        referenced: &HashMap<TxId, Transaction>,
    ) -> Result<(), TransactionError> {
        if self.is_mining() {
            return Ok(());
        }

        for (index, input) in self.inputs.iter().enumerate() {
            let spent = self.referenced_output(index, referenced)?;
            if !input.uses_key(&spent.pub_key_hash) {
                return Err(TransactionError::WrongOwner(index));
            }

            let payload = self.signing_payload(index, &spent.pub_key_hash)?;
            match verify_signature(&input.public_key, &payload.0, &input.signature) {
                Ok(true) => {}
                Ok(false) | Err(_) => return Err(TransactionError::SignatureInvalid(index)),
            }
        }

        Ok(())
    }

    /// Verify all input signatures; any failure, including a missing
    /// referenced transaction, yields `false`
    pub fn verify(&self, referenced: &HashMap<TxId, Transaction>) -> bool {
        match self.check_signatures(referenced) {
            Ok(()) => true,
            Err(e) => {
                log::warn!("Transaction {} failed verification: {}", self.id, e);
                false
            }
        }
    }
}

impl fmt::Display for TxInput {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.prev_tx {
            Some(prev) => write!(
                f,
                "{}:{} pubkey={} sig={}",
                prev,
                self.output_index,
                hex::encode(&self.public_key),
                hex::encode(&self.signature)
            ),
            None => write!(f, "<coinbase> {}", String::from_utf8_lossy(&self.signature)),
        }
    }
}

impl fmt::Display for TxOutput {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} => {}", self.value, address::encode(&self.pub_key_hash))
    }
}

impl fmt::Display for Transaction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "  Transaction {}", self.id)?;
        for input in &self.inputs {
            writeln!(f, "    in  {}", input)?;
        }
        for output in &self.outputs {
            writeln!(f, "    out {}", output)?;
        }
        write!(f, "    time {}", self.timestamp)
    }
}

// =============================================================================
// Tests
// =============================================================================
