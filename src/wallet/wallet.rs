//! Wallet implementation for the ledger
//!
//! A wallet holds one secp256k1 key pair; [`WalletManager`] keeps a set of
//! them in a JSON file and supplies keys to transaction signing through
//! [`KeyProvider`].

use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};

use log::info;
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::crypto::{KeyError, KeyPair, PubKeyHash};

/// Wallet-related errors
#[derive(Error, Debug)]
pub enum WalletError {
    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),
    #[error("Serialization error: {0}")]
    SerializationError(#[from] serde_json::Error),
    #[error("Crypto error: {0}")]
    CryptoError(#[from] KeyError),
}

/// Supplies the signing key for an address
pub trait KeyProvider {
    fn key_pair(&self, address: &str) -> Option<&KeyPair>;
}

/// Serializable wallet data for persistence
#[derive(Debug, Serialize, Deserialize)]
struct WalletData {
    private_key_hex: String,
    address: String,
    label: Option<String>,
}

/// A ledger wallet owning one key pair
#[derive(Debug, Clone)]
pub struct Wallet {
    key_pair: KeyPair,
    /// Optional label for the wallet
    pub label: Option<String>,
}

impl Wallet {
    /// Create a new wallet with a fresh key pair
    pub fn new() -> Self {
        Self {
            key_pair: KeyPair::generate(),
            label: None,
        }
    }

    /// Create a wallet with a label
    pub fn with_label(label: &str) -> Self {
        Self {
            key_pair: KeyPair::generate(),
            label: Some(label.to_string()),
        }
    }

    /// Import a wallet from a private key
    pub fn from_private_key(private_key_hex: &str) -> Result<Self, WalletError> {
        let key_pair = KeyPair::from_private_key_hex(private_key_hex)?;
        Ok(Self {
            key_pair,
            label: None,
        })
    }

    /// Get the wallet's address
    pub fn address(&self) -> String {
        self.key_pair.address()
    }

    /// Hash that outputs paid to this wallet are locked to
    pub fn pub_key_hash(&self) -> PubKeyHash {
        self.key_pair.pub_key_hash()
    }

    /// Get the wallet's public key (hex)
    pub fn public_key(&self) -> String {
        self.key_pair.public_key_hex()
    }

    /// Get the wallet's private key (hex)
    /// WARNING: Keep this secret!
    pub fn private_key(&self) -> String {
        self.key_pair.private_key_hex()
    }

    pub fn key_pair(&self) -> &KeyPair {
        &self.key_pair
    }

    fn to_data(&self) -> WalletData {
        WalletData {
            private_key_hex: self.private_key(),
            address: self.address(),
            label: self.label.clone(),
        }
    }

    fn from_data(data: WalletData) -> Result<Self, WalletError> {
        let mut wallet = Self::from_private_key(&data.private_key_hex)?;
        wallet.label = data.label;
        Ok(wallet)
    }
}

impl Default for Wallet {
    fn default() -> Self {
        Self::new()
    }
}

impl KeyProvider for Wallet {
    fn key_pair(&self, address: &str) -> Option<&KeyPair> {
        (self.address() == address).then_some(&self.key_pair)
    }
}

/// Wallet manager persisting every wallet to one JSON file
#[derive(Debug)]
pub struct WalletManager {
    path: PathBuf,
    wallets: BTreeMap<String, Wallet>,
}

impl WalletManager {
    /// Load wallets from `path`; a missing file yields an empty manager
    pub fn load(path: &Path) -> Result<Self, WalletError> {
        let mut wallets = BTreeMap::new();

        if path.exists() {
            let json = fs::read_to_string(path)?;
            let entries: Vec<WalletData> = serde_json::from_str(&json)?;
            for data in entries {
                let wallet = Wallet::from_data(data)?;
                wallets.insert(wallet.address(), wallet);
            }
        }

        Ok(Self {
            path: path.to_path_buf(),
            wallets,
        })
    }

    /// Create, store and persist a new wallet, returning its address
    pub fn create_wallet(&mut self, label: Option<&str>) -> Result<String, WalletError> {
        let wallet = match label {
            Some(l) => Wallet::with_label(l),
            None => Wallet::new(),
        };
        let address = wallet.address();
        self.wallets.insert(address.clone(), wallet);
        self.save()?;

        info!("Created wallet {}", address);
        Ok(address)
    }

    /// Look up a wallet by address
    pub fn get(&self, address: &str) -> Option<&Wallet> {
        self.wallets.get(address)
    }

    /// All managed addresses, sorted
    pub fn addresses(&self) -> Vec<String> {
        self.wallets.keys().cloned().collect()
    }

    /// Write every wallet to the backing file
    pub fn save(&self) -> Result<(), WalletError> {
        if let Some(parent) = self.path.parent() {
            fs::create_dir_all(parent)?;
        }
        let entries: Vec<WalletData> = self.wallets.values().map(Wallet::to_data).collect();
        let json = serde_json::to_string_pretty(&entries)?;
        fs::write(&self.path, json)?;
        Ok(())
    }
}

impl KeyProvider for WalletManager {
    fn key_pair(&self, address: &str) -> Option<&KeyPair> {
        self.wallets.get(address).map(Wallet::key_pair)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_wallet_creation() {
        let wallet = Wallet::new();
        assert!(crate::crypto::address::is_valid(&wallet.address()));
        assert_eq!(wallet.public_key().len(), 66);
        assert_eq!(wallet.private_key().len(), 64);
    }

    #[test]
    fn test_wallet_import() {
        let wallet1 = Wallet::new();
        let wallet2 = Wallet::from_private_key(&wallet1.private_key()).unwrap();
        assert_eq!(wallet1.address(), wallet2.address());
    }

    #[test]
    fn test_wallet_provides_only_its_own_key() {
        let wallet = Wallet::new();
        assert!(KeyProvider::key_pair(&wallet, &wallet.address()).is_some());
        assert!(KeyProvider::key_pair(&wallet, &Wallet::new().address()).is_none());
    }

    #[test]
    fn test_manager_save_load() {
        let temp_dir = tempfile::tempdir().unwrap();
        let path = temp_dir.path().join("wallet.json");

        let mut manager = WalletManager::load(&path).unwrap();
        assert!(manager.addresses().is_empty());
        let address = manager.create_wallet(Some("Test Wallet")).unwrap();

        let reloaded = WalletManager::load(&path).unwrap();
        assert_eq!(reloaded.addresses(), vec![address.clone()]);
        assert_eq!(reloaded.get(&address).unwrap().label.as_deref(), Some("Test Wallet"));
        assert_eq!(
            KeyProvider::key_pair(&reloaded, &address).unwrap().address(),
            address
        );
    }

    #[test]
    fn test_corrupt_file_is_an_error() {
        let temp_dir = tempfile::tempdir().unwrap();
        let path = temp_dir.path().join("wallet.json");
        fs::write(&path, "not json").unwrap();
        assert!(matches!(
            WalletManager::load(&path),
            Err(WalletError::SerializationError(_))
        ));
    }
}
