//! In-process keyring

use super::types::{SignerError, TransactionSigner};
use crate::account::{Role, ROLE_COUNT};
use crate::transaction::{Address, SignatureData};
use crate::utils::crypto::address_from_uncompressed;
use crate::utils::encoding::decode_hex;
use secp256k1::{Message, PublicKey, Secp256k1, SecretKey};
use std::fmt;
use zeroize::Zeroize;

/// Raw private key bytes, wiped when dropped
#[derive(Clone, Zeroize)]
#[zeroize(drop)]
struct PrivateKey([u8; 32]);

impl PrivateKey {
    fn from_hex(s: &str) -> Result<Self, SignerError> {
        let mut bytes = decode_hex(s).map_err(|e| SignerError::InvalidPrivateKey(e.message))?;
        if bytes.len() != 32 {
            let len = bytes.len();
            bytes.zeroize();
            return Err(SignerError::InvalidPrivateKey(format!(
                "expected 32 bytes, got {}",
                len
            )));
        }

        let mut key = [0u8; 32];
        key.copy_from_slice(&bytes);
        bytes.zeroize();

        // Range check against the curve order
        SecretKey::from_slice(&key).map_err(|e| {
            key.zeroize();
            SignerError::InvalidPrivateKey(e.to_string())
        })?;
        Ok(Self(key))
    }

    fn secret_key(&self) -> Result<SecretKey, SignerError> {
        SecretKey::from_slice(&self.0).map_err(|e| SignerError::InvalidPrivateKey(e.to_string()))
    }

    fn address(&self) -> Result<Address, SignerError> {
        let secp = Secp256k1::signing_only();
        let public_key = PublicKey::from_secret_key(&secp, &self.secret_key()?);
        Ok(address_from_uncompressed(&public_key.serialize_uncompressed()))
    }
}

/// Private keys of one account, grouped by role.
///
/// A keyring built from a single key or a key list uses the same keys for
/// every role. The account address is taken from the first key unless
/// given explicitly, since account keys can be decoupled from the address.
#[derive(Clone)]
pub struct LocalKeyring {
    address: Address,
    keys: [Vec<PrivateKey>; ROLE_COUNT],
}

impl LocalKeyring {
    /// One key for every role, address derived from the key
    pub fn single(private_key: &str) -> Result<Self, SignerError> {
        let key = PrivateKey::from_hex(private_key)?;
        let address = key.address()?;
        Ok(Self {
            address,
            keys: [vec![key.clone()], vec![key.clone()], vec![key]],
        })
    }

    /// One key for every role, bound to an explicit address
    pub fn decoupled(address: Address, private_key: &str) -> Result<Self, SignerError> {
        Self::multiple(address, &[private_key])
    }

    /// The same key list for every role
    pub fn multiple<S: AsRef<str>>(address: Address, private_keys: &[S]) -> Result<Self, SignerError> {
        let keys = parse_keys(private_keys)?;
        Ok(Self {
            address,
            keys: [keys.clone(), keys.clone(), keys],
        })
    }

    /// A separate key list per role, in [`Role::ALL`] order.
    /// A role may be left empty.
    pub fn role_based<S: AsRef<str>>(
        address: Address,
        private_keys: [&[S]; ROLE_COUNT],
    ) -> Result<Self, SignerError> {
        let [transaction, account_update, fee_payer] = private_keys;
        Ok(Self {
            address,
            keys: [
                parse_keys(transaction)?,
                parse_keys(account_update)?,
                parse_keys(fee_payer)?,
            ],
        })
    }
}

fn parse_keys<S: AsRef<str>>(private_keys: &[S]) -> Result<Vec<PrivateKey>, SignerError> {
    private_keys
        .iter()
        .map(|k| PrivateKey::from_hex(k.as_ref()))
        .collect()
}

impl TransactionSigner for LocalKeyring {
    fn address(&self) -> Address {
        self.address
    }

    fn key_count(&self, role: Role) -> usize {
        self.keys[role.index()].len()
    }

    fn sign(
        &self,
        hash: &[u8; 32],
        chain_id: u64,
        role: Role,
        index: usize,
    ) -> Result<SignatureData, SignerError> {
        let keys = &self.keys[role.index()];
        if keys.is_empty() {
            return Err(SignerError::EmptyRole(role));
        }
        let key = keys.get(index).ok_or(SignerError::IndexOutOfRange {
            index,
            count: keys.len(),
        })?;

        let secp = Secp256k1::signing_only();
        let message = Message::from_digest_slice(hash)?;
        let (recovery_id, compact) = secp
            .sign_ecdsa_recoverable(&message, &key.secret_key()?)
            .serialize_compact();

        let mut r = [0u8; 32];
        let mut s = [0u8; 32];
        r.copy_from_slice(&compact[..32]);
        s.copy_from_slice(&compact[32..]);

        let v = chain_id
            .checked_mul(2)
            .and_then(|v| v.checked_add(35 + recovery_id.to_i32() as u64))
            .ok_or_else(|| SignerError::Signing(format!("chainId {} is too large", chain_id)))?;

        Ok(SignatureData::new(v, r, s))
    }
}

impl fmt::Debug for LocalKeyring {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let counts: Vec<usize> = self.keys.iter().map(Vec::len).collect();
        f.debug_struct("LocalKeyring")
            .field("address", &crate::utils::encoding::format_address(&self.address))
            .field("key_counts", &counts)
            .finish()
    }
}
