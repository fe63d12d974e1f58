//! Address codec
//!
//! Converts between a 20-byte public-key hash and its Base58Check text
//! form: `base58(version || pkh || checksum)`, where the checksum is the
//! first four bytes of the double SHA-256 of `version || pkh`.

use thiserror::Error;

use super::hash::{double_sha256, PubKeyHash};

/// Version byte prefixed to every address payload
pub const ADDRESS_VERSION: u8 = 0x00;

const CHECKSUM_LEN: usize = 4;
const PAYLOAD_LEN: usize = 1 + 20 + CHECKSUM_LEN;

/// Errors produced while decoding an address
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum AddressError {
    #[error("Invalid address: {0}")]
    InvalidAddress(String),
}

fn checksum(versioned_payload: &[u8]) -> [u8; CHECKSUM_LEN] {
    let digest = double_sha256(versioned_payload);
    let mut out = [0u8; CHECKSUM_LEN];
    out.copy_from_slice(&digest[..CHECKSUM_LEN]);
    out
}

/// Encode a public-key hash as a checksummed address
pub fn encode(pub_key_hash: &PubKeyHash) -> String {
    let mut payload = Vec::with_capacity(PAYLOAD_LEN);
    payload.push(ADDRESS_VERSION);
    payload.extend_from_slice(pub_key_hash);
    let sum = checksum(&payload);
    payload.extend_from_slice(&sum);
    bs58::encode(payload).into_string()
}

/// Decode an address back to the public-key hash it commits to
pub fn decode(address: &str) -> Result<PubKeyHash, AddressError> {
    let invalid = || AddressError::InvalidAddress(address.to_string());

    let payload = bs58::decode(address).into_vec().map_err(|_| invalid())?;
    if payload.len() != PAYLOAD_LEN || payload[0] != ADDRESS_VERSION {
        return Err(invalid());
    }

    let (versioned, sum) = payload.split_at(PAYLOAD_LEN - CHECKSUM_LEN);
    if checksum(versioned)[..] != *sum {
        return Err(invalid());
    }

    let mut pub_key_hash = [0u8; 20];
    pub_key_hash.copy_from_slice(&versioned[1..]);
    Ok(pub_key_hash)
}

/// Check that an address decodes with a matching checksum
pub fn is_valid(address: &str) -> bool {
    decode(address).is_ok()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_address_decodes_to_its_hash() {
        let pkh = [7u8; 20];
        let address = encode(&pkh);
        assert!(address.starts_with('1'));
        assert_eq!(decode(&address).unwrap(), pkh);
        assert!(is_valid(&address));
    }

    #[test]
    fn test_corrupted_checksum_rejected() {
        let address = encode(&[3u8; 20]);
        let mut raw = bs58::decode(&address).into_vec().unwrap();
        let last = raw.len() - 1;
        raw[last] ^= 0x01;
        let tampered = bs58::encode(raw).into_string();
        assert!(!is_valid(&tampered));
        assert!(matches!(decode(&tampered), Err(AddressError::InvalidAddress(_))));
    }

    #[test]
    fn test_wrong_length_and_garbage_rejected() {
        assert!(!is_valid(""));
        assert!(!is_valid("1111"));
        assert!(!is_valid("not-base58-0OIl"));
        let short = bs58::encode([0u8; 24]).into_string();
        assert!(!is_valid(&short));
    }

    #[test]
    fn test_wrong_version_rejected() {
        let mut payload = vec![0x05];
        payload.extend_from_slice(&[9u8; 20]);
        let sum = checksum(&payload);
        payload.extend_from_slice(&sum);
        let address = bs58::encode(payload).into_string();
        assert!(!is_valid(&address));
    }
}
