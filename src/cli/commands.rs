//! CLI commands for the ledger
//!
//! Implements all command handlers for the CLI interface.

use chrono::Utc;
use std::path::{Path, PathBuf};

use crate::core::{Blockchain, Transaction};
use crate::crypto::address;
use crate::storage::StorageConfig;
use crate::wallet::WalletManager;

/// Result type for CLI operations
pub type CliResult<T> = Result<T, Box<dyn std::error::Error>>;

/// Most blocks `print` will show
pub const MAX_PRINT_BLOCKS: usize = 20;

/// Paths derived from the data directory
#[derive(Debug, Clone)]
pub struct AppConfig {
    pub storage: StorageConfig,
    pub wallet_file: PathBuf,
}

impl AppConfig {
    pub fn new(data_dir: &Path) -> Self {
        Self {
            storage: StorageConfig::with_data_dir(data_dir),
            wallet_file: data_dir.join("wallet.json"),
        }
    }
}

fn require_valid(address: &str) -> CliResult<()> {
    if !address::is_valid(address) {
        return Err(format!("invalid address: {}", address).into());
    }
    Ok(())
}

/// Create a new ledger paying the genesis reward to `miner`
pub fn cmd_create(config: &AppConfig, miner: &str, genesis_info: &str) -> CliResult<()> {
    require_valid(miner)?;
    Blockchain::create(&config.storage, miner, genesis_info)?;

    let chain = Blockchain::open(&config.storage)?;
    println!("✅ Ledger created!");
    println!("   📁 Store: {:?}", config.storage.db_path());
    println!("   🧱 Genesis block hash: {}", hex::encode(chain.tip()));
    chain.close()?;
    Ok(())
}

/// Print up to `count` blocks from the tip backwards
pub fn cmd_print(config: &AppConfig, count: usize) -> CliResult<()> {
    let chain = Blockchain::open(&config.storage)?;

    for block in chain.iter().take(count.min(MAX_PRINT_BLOCKS)) {
        println!("==================================[Block]==================================");
        println!("{}", block?);
    }

    chain.close()?;
    Ok(())
}

/// Get the balance of an address
pub fn cmd_balance(config: &AppConfig, addr: &str) -> CliResult<()> {
    require_valid(addr)?;
    let pub_key_hash = address::decode(addr)?;

    let chain = Blockchain::open(&config.storage)?;
    let unspent = chain.find_utxo(&pub_key_hash)?;

    println!("💰 Balance for {}", addr);
    println!("   Total: {} coins", unspent.total);
    println!("   UTXOs: {}", unspent.outputs.len());
    for utxo in unspent.outputs.iter().take(10) {
        println!(
            "   └─ {}:{} = {} coins",
            &utxo.tx_id.to_string()[..16],
            utxo.output_index,
            utxo.output.value
        );
    }

    chain.close()?;
    Ok(())
}

/// Transfer `amount` from `from` to `to`, mining the block for `miner`
pub fn cmd_send(
    config: &AppConfig,
    from: &str,
    to: &str,
    amount: u64,
    miner: &str,
    data: &str,
) -> CliResult<()> {
    for addr in [from, to, miner] {
        require_valid(addr)?;
    }

    let wallets = WalletManager::load(&config.wallet_file)?;
    let mut chain = Blockchain::open(&config.storage)?;

    let data = if data.is_empty() {
        format!("Reward to {} at {}", miner, Utc::now().to_rfc3339())
    } else {
        data.to_string()
    };
    let coinbase = Transaction::new_mining(miner, &data)?;
    let tx = chain.new_transaction(from, to, amount, &wallets)?;
    let block = chain.add_block(vec![coinbase, tx])?;

    println!("📤 Transfer [{}] from [{}] to [{}] succeeded", amount, from, to);
    println!("   🧱 Block: {}", hex::encode(block.hash));

    chain.close()?;
    Ok(())
}

/// Create a new wallet
pub fn cmd_wallet_new(config: &AppConfig, label: Option<&str>) -> CliResult<()> {
    let mut wallets = WalletManager::load(&config.wallet_file)?;
    let address = wallets.create_wallet(label)?;

    println!("🔐 New wallet created!");
    println!("   📍 Address: {}", address);
    println!("\n   ⚠️  IMPORTANT: Your private key is stored in {:?}.", config.wallet_file);
    println!("   Back up this file to avoid losing access to your funds!");
    Ok(())
}

/// List all wallets
pub fn cmd_wallet_list(config: &AppConfig) -> CliResult<()> {
    let wallets = WalletManager::load(&config.wallet_file)?;
    let addresses = wallets.addresses();

    if addresses.is_empty() {
        println!("📭 No wallets found. Create one with: ledger wallet new");
        return Ok(());
    }

    println!("📋 Wallets:");
    for address in &addresses {
        let label = wallets
            .get(address)
            .and_then(|w| w.label.as_deref())
            .unwrap_or("-");
        println!("   {} ({})", address, label);
    }
    Ok(())
}

/// Validate the stored chain
pub fn cmd_validate(config: &AppConfig) -> CliResult<()> {
    println!("🔍 Validating ledger...");
    let chain = Blockchain::open(&config.storage)?;

    match chain.validate_chain() {
        Ok(count) => {
            println!("✅ Ledger is valid!");
            println!("   {} blocks verified", count);
        }
        Err(e) => {
            println!("❌ Ledger validation FAILED: {}", e);
        }
    }

    chain.close()?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_create_send_and_balances() {
        let temp_dir = tempfile::tempdir().unwrap();
        let config = AppConfig::new(temp_dir.path());

        let mut wallets = WalletManager::load(&config.wallet_file).unwrap();
        let alice = wallets.create_wallet(Some("alice")).unwrap();
        let bob = wallets.create_wallet(None).unwrap();

        cmd_create(&config, &alice, "genesis").unwrap();
        assert!(cmd_create(&config, &alice, "genesis").is_err());

        cmd_send(&config, &alice, &bob, 5, &bob, "block one").unwrap();
        cmd_print(&config, 5).unwrap();
        cmd_balance(&config, &alice).unwrap();
        cmd_validate(&config).unwrap();

        let chain = Blockchain::open(&config.storage).unwrap();
        assert_eq!(chain.balance(&address::decode(&alice).unwrap()).unwrap(), 12);
        assert_eq!(chain.balance(&address::decode(&bob).unwrap()).unwrap(), 22);
    }

    #[test]
    fn test_invalid_addresses_rejected() {
        let temp_dir = tempfile::tempdir().unwrap();
        let config = AppConfig::new(temp_dir.path());
        assert!(cmd_create(&config, "nope", "genesis").is_err());
        assert!(!config.storage.exists());
        assert!(cmd_balance(&config, "nope").is_err());
    }
}
