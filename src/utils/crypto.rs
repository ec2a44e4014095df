//! Hashing and address helpers

use tiny_keccak::{Hasher, Keccak};

/// Keccak256 hash (transaction hashes, signing hashes, addresses)
pub fn keccak256(data: &[u8]) -> [u8; 32] {
    let mut hasher = Keccak::v256();
    hasher.update(data);
    let mut out = [0u8; 32];
    hasher.finalize(&mut out);
    out
}

/// Convert raw address bytes to an EIP-55 checksummed address
pub fn to_checksum_address(address: &[u8]) -> String {
    let lower = hex::encode(address);
    let hash = keccak256(lower.as_bytes());

    let mut result = String::from("0x");
    for (i, ch) in lower.chars().enumerate() {
        let byte = hash[i / 2];
        let nibble = if i % 2 == 0 { byte >> 4 } else { byte & 0x0f };

        if ch.is_ascii_digit() {
            result.push(ch);
        } else if nibble >= 8 {
            result.push(ch.to_ascii_uppercase());
        } else {
            result.push(ch);
        }
    }

    result
}

/// Address owning an uncompressed secp256k1 public key (65 bytes, 0x04 prefix)
pub fn address_from_uncompressed(public_key: &[u8; 65]) -> [u8; 20] {
    let hash = keccak256(&public_key[1..]);
    let mut address = [0u8; 20];
    address.copy_from_slice(&hash[12..]);
    address
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_keccak_empty() {
        assert_eq!(
            hex::encode(keccak256(&[])),
            "c5d2460186f7233c927e7db2dcc703c0e500b653ca82273b7bfad8045d85a470"
        );
    }

    #[test]
    fn test_checksum_address() {
        let raw = hex::decode("a94f5374fce5edbc8e2a8697c15331677e6ebf0b").unwrap();
        assert_eq!(
            to_checksum_address(&raw),
            "0xa94f5374Fce5edBC8E2a8697C15331677e6EbF0B"
        );
    }
}
