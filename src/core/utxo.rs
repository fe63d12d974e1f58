//! Unspent output indexing
//!
//! UTXOs are computed by walking the chain from tip to genesis. A
//! transaction can only spend outputs created earlier in the chain, so
//! the backward walk always records a spend before it reaches the output
//! being spent.

use std::collections::{HashMap, HashSet};

use serde::{Deserialize, Serialize};

use crate::core::block::Block;
use crate::core::blockchain::{Blockchain, BlockchainError};
use crate::core::transaction::{TxId, TxOutput};
use crate::crypto::PubKeyHash;

/// Unspent Transaction Output (UTXO)
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UtxoRef {
    pub tx_id: TxId,
    pub output_index: u32,
    pub output: TxOutput,
}

/// Unspent outputs of one owner in scan order (newest first)
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct UnspentOutputs {
    pub outputs: Vec<UtxoRef>,
    pub total: u64,
}

/// Outputs chosen to fund a spend, grouped by transaction id in the
/// order each id was first selected
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SpendSelection {
    /// Value of the selected outputs, or the full available balance when
    /// it falls short (in which case `outputs` is empty)
    pub total: u64,
    pub outputs: Vec<(TxId, Vec<u32>)>,
}

impl SpendSelection {
    /// Number of outputs selected
    pub fn input_count(&self) -> usize {
        self.outputs.iter().map(|(_, indexes)| indexes.len()).sum()
    }
}

/// Scan `blocks` (tip first) for outputs locked to `pub_key_hash` that no
/// input signed by the same key has spent
pub fn scan_unspent<I, E>(blocks: I, pub_key_hash: &PubKeyHash) -> Result<UnspentOutputs, E>
where
    I: IntoIterator<Item = Result<Block, E>>,
{
    let mut unspent = UnspentOutputs::default();
    let mut spent: HashMap<TxId, HashSet<u32>> = HashMap::new();

    for block in blocks {
        for tx in block?.transactions {
            for (index, output) in tx.outputs.iter().enumerate() {
                if !output.is_locked_to(pub_key_hash) {
                    continue;
                }
                let index = index as u32;
                if spent.get(&tx.id).is_some_and(|set| set.contains(&index)) {
                    continue;
                }
                unspent.total += output.value;
                unspent.outputs.push(UtxoRef {
                    tx_id: tx.id,
                    output_index: index,
                    output: output.clone(),
                });
            }

            if tx.is_mining() {
                continue;
            }
            for input in &tx.inputs {
                if let Some(prev_tx) = input.prev_tx {
                    if input.uses_key(pub_key_hash) {
                        spent.entry(prev_tx).or_default().insert(input.output_index);
                    }
                }
            }
        }
    }

    Ok(unspent)
}

/// First-fit selection in scan order until `amount` is covered
pub fn select_outputs(unspent: &UnspentOutputs, amount: u64) -> SpendSelection {
    if unspent.total < amount {
        return SpendSelection {
            total: unspent.total,
            outputs: Vec::new(),
        };
    }

    let mut selection = SpendSelection::default();
    for utxo in &unspent.outputs {
        if selection.total >= amount {
            break;
        }
        selection.total += utxo.output.value;
        match selection.outputs.iter_mut().find(|(id, _)| *id == utxo.tx_id) {
            Some((_, indexes)) => indexes.push(utxo.output_index),
            None => selection.outputs.push((utxo.tx_id, vec![utxo.output_index])),
        }
    }

    selection
}

impl Blockchain {
    /// All unspent outputs locked to `pub_key_hash` and their total value
    pub fn find_utxo(&self, pub_key_hash: &PubKeyHash) -> Result<UnspentOutputs, BlockchainError> {
        scan_unspent(self.iter(), pub_key_hash)
    }

    /// Select unspent outputs covering `amount`.
    ///
    /// A `total` below `amount` signals insufficient funds and comes with
    /// an empty selection.
    pub fn find_needed_utxo(
        &self,
        pub_key_hash: &PubKeyHash,
        amount: u64,
    ) -> Result<SpendSelection, BlockchainError> {
        let unspent = self.find_utxo(pub_key_hash)?;
        Ok(select_outputs(&unspent, amount))
    }

    /// Get balance for a key hash
    pub fn balance(&self, pub_key_hash: &PubKeyHash) -> Result<u64, BlockchainError> {
        Ok(self.find_utxo(pub_key_hash)?.total)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::transaction::{Transaction, TxInput};
    use crate::crypto::{KeyPair, SENTINEL_HASH};
    use std::convert::Infallible;

    fn output(owner: &KeyPair, value: u64) -> TxOutput {
        TxOutput {
            pub_key_hash: owner.pub_key_hash(),
            value,
        }
    }

    fn block(transactions: Vec<Transaction>) -> Result<Block, Infallible> {
        Ok(Block::new(transactions, SENTINEL_HASH))
    }

    #[test]
    fn test_unspent_outputs_and_spends() {
        let alice = KeyPair::generate();
        let bob = KeyPair::generate();

        let reward = Transaction::new_mining(&alice.address(), "r1").unwrap();
        let pay = Transaction::new(
            vec![TxInput::spending(reward.id, 0, alice.public_key_bytes())],
            vec![output(&bob, 5), output(&alice, 12)],
        )
        .unwrap();

        // tip first
        let chain = vec![block(vec![pay.clone()]), block(vec![reward.clone()])];

        let alice_utxo = scan_unspent(chain.clone(), &alice.pub_key_hash()).unwrap();
        assert_eq!(alice_utxo.total, 12);
        assert_eq!(alice_utxo.outputs.len(), 1);
        assert_eq!(alice_utxo.outputs[0].tx_id, pay.id);
        assert_eq!(alice_utxo.outputs[0].output_index, 1);

        let bob_utxo = scan_unspent(chain, &bob.pub_key_hash()).unwrap();
        assert_eq!(bob_utxo.total, 5);
    }

    #[test]
    fn test_spend_by_other_key_does_not_count() {
        let alice = KeyPair::generate();
        let mallory = KeyPair::generate();

        let reward = Transaction::new_mining(&alice.address(), "r").unwrap();
        let forged = Transaction::new(
            vec![TxInput::spending(reward.id, 0, mallory.public_key_bytes())],
            vec![output(&mallory, 17)],
        )
        .unwrap();

        let chain = vec![block(vec![forged]), block(vec![reward])];
        assert_eq!(scan_unspent(chain, &alice.pub_key_hash()).unwrap().total, 17);
    }

    #[test]
    fn test_balance_equals_created_minus_spent() {
        let alice = KeyPair::generate();
        let bob = KeyPair::generate();

        let r1 = Transaction::new_mining(&alice.address(), "one").unwrap();
        let r2 = Transaction::new_mining(&alice.address(), "two").unwrap();
        let spend = Transaction::new(
            vec![
                TxInput::spending(r1.id, 0, alice.public_key_bytes()),
                TxInput::spending(r2.id, 0, alice.public_key_bytes()),
            ],
            vec![output(&bob, 30), output(&alice, 4)],
        )
        .unwrap();
        let r3 = Transaction::new_mining(&alice.address(), "three").unwrap();

        let chain = vec![
            block(vec![r3, spend]),
            block(vec![r2]),
            block(vec![r1]),
        ];

        let created = 17 * 3 + 4;
        let spent = 17 * 2;
        assert_eq!(scan_unspent(chain, &alice.pub_key_hash()).unwrap().total, created - spent);
    }

    #[test]
    fn test_scan_propagates_errors() {
        let alice = KeyPair::generate();
        let chain: Vec<Result<Block, &str>> = vec![Err("broken")];
        assert_eq!(scan_unspent(chain, &alice.pub_key_hash()), Err("broken"));
    }

    fn utxo(id: u8, index: u32, value: u64) -> UtxoRef {
        UtxoRef {
            tx_id: TxId([id; 32]),
            output_index: index,
            output: TxOutput {
                pub_key_hash: [0u8; 20],
                value,
            },
        }
    }

    #[test]
    fn test_select_first_fit_prefix() {
        let unspent = UnspentOutputs {
            outputs: vec![utxo(1, 0, 4), utxo(2, 1, 4), utxo(1, 2, 4), utxo(3, 0, 10)],
            total: 22,
        };

        let selection = select_outputs(&unspent, 9);
        assert_eq!(selection.total, 12);
        assert_eq!(
            selection.outputs,
            vec![(TxId([1; 32]), vec![0, 2]), (TxId([2; 32]), vec![1])]
        );
        assert_eq!(selection.input_count(), 3);
    }

    #[test]
    fn test_select_exact_stops_early() {
        let unspent = UnspentOutputs {
            outputs: vec![utxo(1, 0, 5), utxo(2, 0, 5)],
            total: 10,
        };
        let selection = select_outputs(&unspent, 5);
        assert_eq!(selection.total, 5);
        assert_eq!(selection.input_count(), 1);
    }

    #[test]
    fn test_select_shortfall_is_empty() {
        let unspent = UnspentOutputs {
            outputs: vec![utxo(1, 0, 3)],
            total: 3,
        };
        let selection = select_outputs(&unspent, 4);
        assert_eq!(selection.total, 3);
        assert!(selection.outputs.is_empty());
    }
}
