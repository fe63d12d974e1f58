//! ECDSA key management for the ledger
//!
//! Provides key pair generation, signing, and verification using
//! the secp256k1 elliptic curve. Signatures are the 64-byte compact
//! encoding (`r || s`, each 32 bytes big-endian) and public keys the
//! 33-byte compressed encoding.

use rand::rngs::OsRng;
use secp256k1::ecdsa::Signature;
use secp256k1::{Message, PublicKey, Secp256k1, SecretKey};
use thiserror::Error;

use super::address;
use super::hash::{hash160, Hash, PubKeyHash};

/// Length of a compact ECDSA signature
pub const SIGNATURE_LEN: usize = 64;

/// Errors that can occur during key operations
#[derive(Error, Debug)]
pub enum KeyError {
    #[error("Invalid private key")]
    InvalidPrivateKey,
    #[error("Invalid public key")]
    InvalidPublicKey,
    #[error("Invalid signature")]
    InvalidSignature,
    #[error("Secp256k1 error: {0}")]
    Secp256k1Error(#[from] secp256k1::Error),
}

/// A key pair consisting of a private key and its corresponding public key
#[derive(Clone)]
pub struct KeyPair {
    pub secret_key: SecretKey,
    pub public_key: PublicKey,
}

impl std::fmt::Debug for KeyPair {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("KeyPair")
            .field("public_key", &self.public_key_hex())
            .finish()
    }
}

impl KeyPair {
    /// Generate a new random key pair
    pub fn generate() -> Self {
        let secp = Secp256k1::new();
        let (secret_key, public_key) = secp.generate_keypair(&mut OsRng);
        Self {
            secret_key,
            public_key,
        }
    }

    /// Create a key pair from an existing secret key
    pub fn from_secret_key(secret_key: SecretKey) -> Self {
        let secp = Secp256k1::new();
        let public_key = PublicKey::from_secret_key(&secp, &secret_key);
        Self {
            secret_key,
            public_key,
        }
    }

    /// Create a key pair from a hex-encoded private key
    pub fn from_private_key_hex(hex_key: &str) -> Result<Self, KeyError> {
        let bytes = hex::decode(hex_key).map_err(|_| KeyError::InvalidPrivateKey)?;
        let secret_key =
            SecretKey::from_slice(&bytes).map_err(|_| KeyError::InvalidPrivateKey)?;
        Ok(Self::from_secret_key(secret_key))
    }

    /// Get the private key as a hex string
    pub fn private_key_hex(&self) -> String {
        hex::encode(self.secret_key.secret_bytes())
    }

    /// Compressed public key bytes
    pub fn public_key_bytes(&self) -> Vec<u8> {
        self.public_key.serialize().to_vec()
    }

    /// Get the public key as a hex string (compressed format)
    pub fn public_key_hex(&self) -> String {
        hex::encode(self.public_key.serialize())
    }

    /// Hash identifying this key as the owner of outputs
    pub fn pub_key_hash(&self) -> PubKeyHash {
        hash160(&self.public_key.serialize())
    }

    /// Checksummed text address of this key
    pub fn address(&self) -> String {
        address::encode(&self.pub_key_hash())
    }

    /// Sign a 32-byte message hash with the private key
    pub fn sign(&self, message_hash: &Hash) -> Result<Vec<u8>, KeyError> {
        sign_message(&self.secret_key, message_hash)
    }
}

/// Sign a message hash with a secret key, returning `r || s`
pub fn sign_message(secret_key: &SecretKey, message_hash: &Hash) -> Result<Vec<u8>, KeyError> {
    let secp = Secp256k1::new();
    let message = Message::from_digest_slice(message_hash)?;
    let signature = secp.sign_ecdsa(&message, secret_key);
    Ok(signature.serialize_compact().to_vec())
}

/// Verify a compact signature against serialized public key bytes.
///
/// Malformed keys or signatures are reported as errors; a well-formed
/// signature that does not match yields `Ok(false)`.
pub fn verify_signature(
    public_key: &[u8],
    message_hash: &Hash,
    signature: &[u8],
) -> Result<bool, KeyError> {
    let secp = Secp256k1::verification_only();

    let public_key = PublicKey::from_slice(public_key).map_err(|_| KeyError::InvalidPublicKey)?;
    if signature.len() != SIGNATURE_LEN {
        return Err(KeyError::InvalidSignature);
    }
    let sig = Signature::from_compact(signature).map_err(|_| KeyError::InvalidSignature)?;
    let message = Message::from_digest_slice(message_hash)?;

    Ok(secp.verify_ecdsa(&message, &sig, &public_key).is_ok())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::crypto::hash::sha256;

    #[test]
    fn test_key_pair_generation() {
        let kp = KeyPair::generate();
        assert_eq!(kp.public_key_bytes().len(), 33);
        assert_eq!(kp.private_key_hex().len(), 64);
    }

    #[test]
    fn test_sign_and_verify() {
        let kp = KeyPair::generate();
        let message_hash = sha256(b"Hello, ledger!");

        let signature = kp.sign(&message_hash).unwrap();
        assert_eq!(signature.len(), SIGNATURE_LEN);
        assert!(verify_signature(&kp.public_key_bytes(), &message_hash, &signature).unwrap());

        let other = sha256(b"something else");
        assert!(!verify_signature(&kp.public_key_bytes(), &other, &signature).unwrap());
    }

    #[test]
    fn test_wrong_key_does_not_verify() {
        let kp = KeyPair::generate();
        let stranger = KeyPair::generate();
        let message_hash = sha256(b"payload");
        let signature = kp.sign(&message_hash).unwrap();
        assert!(!verify_signature(&stranger.public_key_bytes(), &message_hash, &signature).unwrap());
    }

    #[test]
    fn test_malformed_inputs_are_errors() {
        let kp = KeyPair::generate();
        let message_hash = sha256(b"payload");
        let signature = kp.sign(&message_hash).unwrap();

        assert!(verify_signature(&[], &message_hash, &signature).is_err());
        assert!(verify_signature(&kp.public_key_bytes(), &message_hash, &signature[..10]).is_err());
    }

    #[test]
    fn test_key_pair_from_hex() {
        let kp1 = KeyPair::generate();
        let kp2 = KeyPair::from_private_key_hex(&kp1.private_key_hex()).unwrap();
        assert_eq!(kp1.public_key_hex(), kp2.public_key_hex());
        assert_eq!(kp1.address(), kp2.address());
        assert!(KeyPair::from_private_key_hex("zz").is_err());
    }

    #[test]
    fn test_address_round_trips_to_key_hash() {
        let kp = KeyPair::generate();
        assert_eq!(address::decode(&kp.address()).unwrap(), kp.pub_key_hash());
    }
}
