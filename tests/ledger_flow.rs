//! End-to-end ledger flow against an on-disk store

use tempfile::TempDir;
use utxo_ledger::core::{Blockchain, BlockchainError, Transaction, MINING_REWARD};
use utxo_ledger::crypto::SENTINEL_HASH;
use utxo_ledger::storage::StorageConfig;
use utxo_ledger::wallet::Wallet;

fn setup() -> (TempDir, StorageConfig) {
    let dir = TempDir::new().unwrap();
    let config = StorageConfig::with_data_dir(dir.path());
    (dir, config)
}

#[test]
fn test_genesis_pays_reward() {
    let (_dir, config) = setup();
    let miner = Wallet::new();

    Blockchain::create(&config, &miner.address(), "genesis").unwrap();
    let chain = Blockchain::open(&config).unwrap();

    let unspent = chain.find_utxo(&miner.pub_key_hash()).unwrap();
    assert_eq!(unspent.total, MINING_REWARD);
    assert_eq!(unspent.outputs.len(), 1);
    assert_eq!(chain.height().unwrap(), 0);
    assert_eq!(chain.latest_block().unwrap().prev_hash, SENTINEL_HASH);
}

#[test]
fn test_transfer_and_reopen() {
    let (_dir, config) = setup();
    let miner = Wallet::new();
    let alice = Wallet::new();
    let node = Wallet::new();

    Blockchain::create(&config, &miner.address(), "genesis").unwrap();
    let mut chain = Blockchain::open(&config).unwrap();

    let tx = chain
        .new_transaction(&miner.address(), &alice.address(), 5, &miner)
        .unwrap();
    let reward = Transaction::new_mining(&node.address(), "block 1").unwrap();
    let block = chain.add_block(vec![reward, tx]).unwrap();

    assert_eq!(chain.tip(), block.hash);
    assert_eq!(chain.balance(&miner.pub_key_hash()).unwrap(), MINING_REWARD - 5);
    assert_eq!(chain.balance(&alice.pub_key_hash()).unwrap(), 5);
    assert_eq!(chain.balance(&node.pub_key_hash()).unwrap(), MINING_REWARD);

    let before: Vec<_> = chain.iter().map(|b| b.unwrap().hash).collect();
    assert_eq!(before.len() as u64, chain.height().unwrap() + 1);
    assert_eq!(
        chain.iter().last().unwrap().unwrap().prev_hash,
        SENTINEL_HASH
    );

    let tip = chain.tip();
    chain.close().unwrap();

    let chain = Blockchain::open(&config).unwrap();
    assert_eq!(chain.tip(), tip);
    let after: Vec<_> = chain.iter().map(|b| b.unwrap().hash).collect();
    assert_eq!(before, after);
    assert_eq!(chain.validate_chain().unwrap(), 2);
}

#[test]
fn test_insufficient_funds_leaves_chain_untouched() {
    let (_dir, config) = setup();
    let miner = Wallet::new();
    let alice = Wallet::new();

    Blockchain::create(&config, &miner.address(), "genesis").unwrap();
    let chain = Blockchain::open(&config).unwrap();
    let tip = chain.tip();

    let result = chain.new_transaction(&miner.address(), &alice.address(), MINING_REWARD + 1, &miner);
    assert!(matches!(
        result,
        Err(BlockchainError::InsufficientFunds { available, needed })
            if available == MINING_REWARD && needed == MINING_REWARD + 1
    ));

    assert_eq!(chain.tip(), tip);
    assert_eq!(chain.height().unwrap(), 0);
    assert_eq!(chain.balance(&miner.pub_key_hash()).unwrap(), MINING_REWARD);
}

#[test]
fn test_create_twice_fails() {
    let (_dir, config) = setup();
    let miner = Wallet::new();

    Blockchain::create(&config, &miner.address(), "genesis").unwrap();
    assert!(Blockchain::create(&config, &miner.address(), "again").is_err());
}
