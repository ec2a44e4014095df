//! Account key encoding and decoding

use super::types::{
    AccountKey, PublicKey, RoleBased, WeightedMultiSig, WeightedPublicKey, ROLE_COUNT,
};
use crate::error::{TxError, TxResult};
use crate::utils::encoding::{decode_hex, encode_hex};
use rlp::{Rlp, RlpStream};

/// One-byte account key tags
pub mod tag {
    /// Nil is the RLP empty string, with no payload after it
    pub const NIL: u8 = 0x80;
    pub const LEGACY: u8 = 0x01;
    pub const PUBLIC: u8 = 0x02;
    pub const FAIL: u8 = 0x03;
    pub const WEIGHTED_MULTISIG: u8 = 0x04;
    pub const ROLE_BASED: u8 = 0x05;
}

/// RLP empty list, the payload of the legacy and fail keys
const EMPTY_LIST: u8 = 0xc0;

/// Parse `bytes` as exactly one RLP item with nothing trailing
pub(crate) fn strict_rlp(bytes: &[u8]) -> TxResult<Rlp<'_>> {
    let rlp = Rlp::new(bytes);
    let info = rlp.payload_info()?;
    if info.total() != bytes.len() {
        return Err(TxError::decode("Trailing bytes after RLP item"));
    }
    Ok(rlp)
}

impl AccountKey {
    pub fn tag(&self) -> u8 {
        match self {
            AccountKey::Nil => tag::NIL,
            AccountKey::Legacy => tag::LEGACY,
            AccountKey::Public(_) => tag::PUBLIC,
            AccountKey::Fail => tag::FAIL,
            AccountKey::WeightedMultiSig(_) => tag::WEIGHTED_MULTISIG,
            AccountKey::RoleBased(_) => tag::ROLE_BASED,
        }
    }

    /// Canonical tagged encoding
    pub fn encode(&self) -> Vec<u8> {
        match self {
            AccountKey::Nil => vec![tag::NIL],
            AccountKey::Legacy => vec![tag::LEGACY, EMPTY_LIST],
            AccountKey::Fail => vec![tag::FAIL, EMPTY_LIST],
            AccountKey::Public(key) => key.encode(),
            AccountKey::WeightedMultiSig(multisig) => multisig.encode(),
            AccountKey::RoleBased(role_based) => role_based.encode(),
        }
    }

    pub fn to_hex(&self) -> String {
        encode_hex(&self.encode())
    }

    /// Decode any account key from its tagged encoding
    pub fn decode(bytes: &[u8]) -> TxResult<Self> {
        let (&first, rest) = bytes
            .split_first()
            .ok_or_else(|| TxError::decode("Cannot decode an empty account key"))?;

        match first {
            tag::NIL if rest.is_empty() => Ok(AccountKey::Nil),
            tag::LEGACY if rest == [EMPTY_LIST] => Ok(AccountKey::Legacy),
            tag::FAIL if rest == [EMPTY_LIST] => Ok(AccountKey::Fail),
            tag::PUBLIC => Ok(AccountKey::Public(PublicKey::decode(bytes)?)),
            tag::WEIGHTED_MULTISIG => Ok(AccountKey::WeightedMultiSig(WeightedMultiSig::decode(bytes)?)),
            tag::ROLE_BASED => Ok(AccountKey::RoleBased(RoleBased::decode(bytes)?)),
            tag::NIL | tag::LEGACY | tag::FAIL => Err(TxError::decode(format!(
                "Malformed account key payload for tag 0x{:02x}: {}",
                first,
                encode_hex(bytes)
            ))),
            other => Err(TxError::decode(format!(
                "Invalid account key tag 0x{:02x}: {}",
                other,
                encode_hex(bytes)
            ))),
        }
    }

    pub fn from_hex(s: &str) -> TxResult<Self> {
        let bytes = decode_hex(s).map_err(|e| TxError::decode(e.message))?;
        Self::decode(&bytes)
    }

    /// Decode, failing unless the tag matches `expected`
    pub fn decode_as(expected: u8, bytes: &[u8]) -> TxResult<Self> {
        match bytes.first() {
            Some(&found) if found == expected => Self::decode(bytes),
            _ => Err(TxError::decode(format!(
                "Cannot decode account key. The prefix must be 0x{:02x}: {}",
                expected,
                encode_hex(bytes)
            ))),
        }
    }
}

fn check_prefix(bytes: &[u8], expected: u8, name: &str) -> TxResult<()> {
    if bytes.first() != Some(&expected) {
        return Err(TxError::decode(format!(
            "Cannot decode to {}. The prefix must be 0x{:02x}: {}",
            name,
            expected,
            encode_hex(bytes)
        )));
    }
    Ok(())
}

impl PublicKey {
    fn encode(&self) -> Vec<u8> {
        let mut out = vec![tag::PUBLIC];
        out.extend_from_slice(&rlp::encode(&self.compressed().to_vec()));
        out
    }

    fn decode(bytes: &[u8]) -> TxResult<Self> {
        check_prefix(bytes, tag::PUBLIC, "AccountKeyPublic")?;
        let rlp = strict_rlp(&bytes[1..])?;
        let raw = rlp.data()?;
        if raw.len() != 33 {
            return Err(TxError::decode(format!(
                "AccountKeyPublic must hold a 33-byte compressed key, got {} bytes",
                raw.len()
            )));
        }
        PublicKey::from_slice(raw)
    }
}

impl WeightedMultiSig {
    /// `0x04 || rlp([threshold, [[weight, pubkey], ...]])`
    pub fn encode(&self) -> Vec<u8> {
        let keys = self.weighted_public_keys();

        let mut stream = RlpStream::new_list(2);
        stream.append(&self.threshold());
        stream.begin_list(keys.len());
        for key in keys {
            stream.begin_list(2);
            stream.append(&key.weight());
            stream.append(&key.public_key().compressed().to_vec());
        }

        let mut out = vec![tag::WEIGHTED_MULTISIG];
        out.extend_from_slice(&stream.out());
        out
    }

    /// Decode and re-validate threshold and weights
    pub fn decode(bytes: &[u8]) -> TxResult<Self> {
        check_prefix(bytes, tag::WEIGHTED_MULTISIG, "AccountKeyWeightedMultiSig")?;
        let rlp = strict_rlp(&bytes[1..])?;
        if !rlp.is_list() || rlp.item_count()? != 2 {
            return Err(TxError::decode(
                "AccountKeyWeightedMultiSig payload must be [threshold, keys]",
            ));
        }

        let threshold: u32 = rlp.val_at(0)?;
        let key_list = rlp.at(1)?;
        if !key_list.is_list() {
            return Err(TxError::decode("AccountKeyWeightedMultiSig keys must be a list"));
        }

        let mut keys = Vec::with_capacity(key_list.item_count()?);
        for item in key_list.iter() {
            if !item.is_list() || item.item_count()? != 2 {
                return Err(TxError::decode("Weighted public key must be [weight, pubkey]"));
            }
            let weight: u32 = item.val_at(0)?;
            let public_key = PublicKey::from_slice(item.at(1)?.data()?)?;
            keys.push(WeightedPublicKey::new(weight, public_key)?);
        }

        WeightedMultiSig::new(threshold, keys)
    }
}

impl RoleBased {
    /// `0x05 || rlp([encoded_role_key; 3])`, each role key as a byte string
    pub fn encode(&self) -> Vec<u8> {
        let mut stream = RlpStream::new_list(ROLE_COUNT);
        for key in self.keys().iter() {
            stream.append(&key.encode());
        }

        let mut out = vec![tag::ROLE_BASED];
        out.extend_from_slice(&stream.out());
        out
    }

    /// Decode 1 to 3 role keys; absent trailing roles decode as `Nil`.
    pub fn decode(bytes: &[u8]) -> TxResult<Self> {
        check_prefix(bytes, tag::ROLE_BASED, "AccountKeyRoleBased")?;
        let rlp = strict_rlp(&bytes[1..])?;
        if !rlp.is_list() {
            return Err(TxError::decode("AccountKeyRoleBased payload must be a list"));
        }

        let count = rlp.item_count()?;
        if count == 0 || count > ROLE_COUNT {
            return Err(TxError::decode(format!(
                "AccountKeyRoleBased must hold 1 to {} keys, got {}",
                ROLE_COUNT, count
            )));
        }

        let mut keys = [AccountKey::Nil, AccountKey::Nil, AccountKey::Nil];
        for (idx, item) in rlp.iter().enumerate() {
            let encoded = item.data()?;
            if encoded.first() == Some(&tag::ROLE_BASED) {
                return Err(TxError::decode(
                    "AccountKeyRoleBased cannot contain a nested role-based key",
                ));
            }
            keys[idx] = AccountKey::decode(encoded)?;
        }

        RoleBased::new(keys)
    }
}
