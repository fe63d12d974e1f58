//! Cryptographic hashing utilities for the ledger
//!
//! Provides the SHA-256 based digests used for block hashes, transaction
//! ids, address checksums and the proof-of-work target comparison.

use ripemd::Ripemd160;
use sha2::{Digest, Sha256};

/// A 32-byte SHA-256 digest
pub type Hash = [u8; 32];

/// A 20-byte RIPEMD-160(SHA-256(pubkey)) digest identifying an owner
pub type PubKeyHash = [u8; 20];

/// The all-zero hash that marks "no parent" for the genesis block
pub const SENTINEL_HASH: Hash = [0u8; 32];

/// Computes SHA-256 hash of the input data
pub fn sha256(data: &[u8]) -> Hash {
    let mut out = [0u8; 32];
    out.copy_from_slice(&Sha256::digest(data));
    out
}

/// Computes double SHA-256 hash (SHA-256 of SHA-256)
/// Used for address checksums
pub fn double_sha256(data: &[u8]) -> Hash {
    sha256(&sha256(data))
}

/// Computes SHA-256 hash and returns it as a hex string
pub fn sha256_hex(data: &[u8]) -> String {
    hex::encode(sha256(data))
}

/// RIPEMD-160 of the SHA-256 of `data`
pub fn hash160(data: &[u8]) -> PubKeyHash {
    let mut ripemd = Ripemd160::new();
    ripemd.update(sha256(data));
    let mut out = [0u8; 20];
    out.copy_from_slice(&ripemd.finalize());
    out
}

/// Calculate the target for a number of required leading zero bits.
///
/// The target is `2^(256 - bits)` as a big-endian 256-bit integer, so a
/// hash is below it exactly when its first `bits` bits are zero.
/// Returns `None` unless `bits` lies in `1..=255`.
pub fn calculate_target(bits: u32) -> Option<Hash> {
    if !(1..=255).contains(&bits) {
        return None;
    }
    let mut target = [0u8; 32];
    let bit = 256 - bits as usize;
    let byte_index = (255 - bit) / 8;
    target[byte_index] = 1 << (bit % 8);
    Some(target)
}

/// Big-endian comparison: true when `hash < target`
pub fn meets_target(hash: &Hash, target: &Hash) -> bool {
    hash < target
}

/// Checks if a hash has `difficulty` leading zero bits
pub fn meets_difficulty(hash: &[u8], difficulty: u32) -> bool {
    let required_zeros = difficulty as usize / 8;
    let remaining_bits = difficulty as usize % 8;

    for byte in hash.iter().take(required_zeros) {
        if *byte != 0 {
            return false;
        }
    }

    if remaining_bits > 0 && required_zeros < hash.len() {
        let mask = 0xFF << (8 - remaining_bits);
        if hash[required_zeros] & mask != 0 {
            return false;
        }
    }

    true
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_sha256() {
        let data = b"hello world";
        assert_eq!(
            sha256_hex(data),
            "b94d27b9934d3e08a52e52d7da7dabfac484efe37a5380ee9088f7ace2efcde9"
        );
    }

    #[test]
    fn test_double_sha256() {
        let data = b"hello world";
        assert_eq!(double_sha256(data), sha256(&sha256(data)));
    }

    #[test]
    fn test_hash160_length_and_determinism() {
        let a = hash160(b"pubkey");
        let b = hash160(b"pubkey");
        assert_eq!(a, b);
        assert_ne!(a, hash160(b"other"));
    }

    #[test]
    fn test_target_for_twelve_bits() {
        let target = calculate_target(12).unwrap();
        assert_eq!(target[0], 0x00);
        assert_eq!(target[1], 0x10);
        assert!(target[2..].iter().all(|b| *b == 0));
    }

    #[test]
    fn test_target_matches_leading_zero_rule() {
        let target = calculate_target(12).unwrap();

        let mut below = [0xFFu8; 32];
        below[0] = 0x00;
        below[1] = 0x0F;
        assert!(meets_target(&below, &target));
        assert!(meets_difficulty(&below, 12));

        let mut at = [0u8; 32];
        at[1] = 0x10;
        assert!(!meets_target(&at, &target));
        assert!(!meets_difficulty(&at, 12));
    }

    #[test]
    fn test_target_rejects_out_of_range_bits() {
        assert!(calculate_target(0).is_none());
        assert!(calculate_target(256).is_none());
        assert!(calculate_target(u32::MAX).is_none());
        assert_eq!(calculate_target(255).unwrap()[31], 0x01);
        assert_eq!(calculate_target(1).unwrap()[0], 0x80);
    }

    #[test]
    fn test_meets_difficulty() {
        let hash = vec![0x00, 0x00, 0x0F, 0xFF, 0xFF, 0xFF];
        assert!(meets_difficulty(&hash, 16));
        assert!(meets_difficulty(&hash, 12));
        assert!(!meets_difficulty(&hash, 24));
    }
}
