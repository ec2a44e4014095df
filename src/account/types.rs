//! Account key type definitions

use crate::error::{TxError, TxResult};
use crate::utils::crypto::address_from_uncompressed;
use crate::utils::encoding::{decode_hex, encode_hex};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Maximum number of keys a weighted multisig key may hold
pub const MAX_MULTISIG_KEYS: usize = 10;

/// Number of roles in a role-based key
pub const ROLE_COUNT: usize = 3;

/// Role a key plays in a role-based account
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum Role {
    /// Signs ordinary transactions
    Transaction,
    /// Signs account update transactions
    AccountUpdate,
    /// Signs as fee payer of fee-delegated transactions
    FeePayer,
}

impl Role {
    pub const ALL: [Role; ROLE_COUNT] = [Role::Transaction, Role::AccountUpdate, Role::FeePayer];

    pub fn index(self) -> usize {
        match self {
            Role::Transaction => 0,
            Role::AccountUpdate => 1,
            Role::FeePayer => 2,
        }
    }

    pub fn name(self) -> &'static str {
        match self {
            Role::Transaction => "roleTransactionKey",
            Role::AccountUpdate => "roleAccountUpdateKey",
            Role::FeePayer => "roleFeePayerKey",
        }
    }
}

impl fmt::Display for Role {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// A secp256k1 public key, validated on the curve and stored compressed
#[derive(Clone, Copy, PartialEq, Eq, Hash)]
pub struct PublicKey([u8; 33]);

impl PublicKey {
    /// Accepts a 33-byte compressed key, a 65-byte uncompressed key, or the
    /// 64-byte `x || y` form without the `0x04` prefix.
    pub fn from_slice(bytes: &[u8]) -> TxResult<Self> {
        let parsed = match bytes.len() {
            33 | 65 => secp256k1::PublicKey::from_slice(bytes),
            64 => {
                let mut full = [0u8; 65];
                full[0] = 0x04;
                full[1..].copy_from_slice(bytes);
                secp256k1::PublicKey::from_slice(&full)
            }
            n => {
                return Err(TxError::validation(format!(
                    "Invalid public key: unexpected length {}",
                    n
                )))
            }
        };

        let key = parsed.map_err(|e| TxError::validation(format!("Invalid public key: {}", e)))?;
        Ok(Self(key.serialize()))
    }

    pub fn from_hex(s: &str) -> TxResult<Self> {
        let bytes = decode_hex(s)
            .map_err(|_| TxError::validation(format!("Invalid public key: {}", s)))?;
        Self::from_slice(&bytes)
    }

    pub fn compressed(&self) -> &[u8; 33] {
        &self.0
    }

    pub fn uncompressed(&self) -> TxResult<[u8; 65]> {
        let key = secp256k1::PublicKey::from_slice(&self.0)?;
        Ok(key.serialize_uncompressed())
    }

    /// Address derived from this key
    pub fn address(&self) -> TxResult<[u8; 20]> {
        Ok(address_from_uncompressed(&self.uncompressed()?))
    }

    /// Compressed form as `0x` hex
    pub fn to_hex(&self) -> String {
        encode_hex(&self.0)
    }
}

impl fmt::Debug for PublicKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "PublicKey({})", self.to_hex())
    }
}

impl From<secp256k1::PublicKey> for PublicKey {
    fn from(key: secp256k1::PublicKey) -> Self {
        Self(key.serialize())
    }
}

/// A (weight, public key) pair inside a weighted multisig key
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WeightedPublicKey {
    weight: u32,
    public_key: PublicKey,
}

impl WeightedPublicKey {
    pub fn new(weight: u32, public_key: PublicKey) -> TxResult<Self> {
        if weight == 0 {
            return Err(TxError::validation(
                "Invalid weight of public key: weight must be greater than 0",
            ));
        }
        Ok(Self { weight, public_key })
    }

    pub fn weight(&self) -> u32 {
        self.weight
    }

    pub fn public_key(&self) -> &PublicKey {
        &self.public_key
    }
}

/// Threshold and per-key weights for building a weighted multisig key
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct WeightedMultiSigOptions {
    pub threshold: u32,
    #[serde(rename = "weight")]
    pub weights: Vec<u32>,
}

impl WeightedMultiSigOptions {
    pub fn new(threshold: u32, weights: Vec<u32>) -> Self {
        Self { threshold, weights }
    }
}

/// A weighted-threshold multisig key.
///
/// Invariants: `threshold > 0`, `1 <= keys.len() <= 10`, every weight is
/// positive and the weights sum to at least the threshold.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WeightedMultiSig {
    threshold: u32,
    keys: Vec<WeightedPublicKey>,
}

impl WeightedMultiSig {
    pub fn new(threshold: u32, keys: Vec<WeightedPublicKey>) -> TxResult<Self> {
        validate_multisig(threshold, &keys)?;
        Ok(Self { threshold, keys })
    }

    /// Build from parallel arrays of public keys and weights
    pub fn from_public_keys_and_options<S: AsRef<str>>(
        public_keys: &[S],
        options: &WeightedMultiSigOptions,
    ) -> TxResult<Self> {
        if public_keys.len() != options.weights.len() {
            return Err(TxError::validation(
                "The length of public keys and the length of weight array do not match.",
            ));
        }

        let keys = public_keys
            .iter()
            .zip(&options.weights)
            .map(|(key, &weight)| WeightedPublicKey::new(weight, PublicKey::from_hex(key.as_ref())?))
            .collect::<TxResult<Vec<_>>>()?;

        Self::new(options.threshold, keys)
    }

    pub fn threshold(&self) -> u32 {
        self.threshold
    }

    pub fn weighted_public_keys(&self) -> &[WeightedPublicKey] {
        &self.keys
    }

    /// Replace the threshold, keeping the key untouched on failure
    pub fn set_threshold(&mut self, threshold: u32) -> TxResult<()> {
        validate_multisig(threshold, &self.keys)?;
        self.threshold = threshold;
        Ok(())
    }

    /// Replace the key list, keeping the key untouched on failure
    pub fn set_weighted_public_keys(&mut self, keys: Vec<WeightedPublicKey>) -> TxResult<()> {
        validate_multisig(self.threshold, &keys)?;
        self.keys = keys;
        Ok(())
    }

    pub fn total_weight(&self) -> u64 {
        self.keys.iter().map(|k| u64::from(k.weight)).sum()
    }
}

fn validate_multisig(threshold: u32, keys: &[WeightedPublicKey]) -> TxResult<()> {
    if threshold == 0 {
        return Err(TxError::validation(
            "Invalid threshold of AccountKeyWeightedMultiSig: threshold must be greater than 0",
        ));
    }
    if keys.is_empty() {
        return Err(TxError::validation(
            "weightedPublicKeys should be specified for a multisig account",
        ));
    }
    if keys.len() > MAX_MULTISIG_KEYS {
        return Err(TxError::validation(format!(
            "AccountKeyWeightedMultiSig supports at most {} keys, got {}",
            MAX_MULTISIG_KEYS,
            keys.len()
        )));
    }
    if keys.iter().any(|k| k.weight == 0) {
        return Err(TxError::validation(
            "Invalid weight of public key: weight must be greater than 0",
        ));
    }

    let weight_sum: u64 = keys.iter().map(|k| u64::from(k.weight)).sum();
    if weight_sum < u64::from(threshold) {
        return Err(TxError::validation(
            "Invalid options for AccountKeyWeightedMultiSig: The sum of weights is less than the threshold.",
        )
        .with_details(format!("weights: {}, threshold: {}", weight_sum, threshold)));
    }
    Ok(())
}

/// Three independent keys, one per [`Role`]. No element may itself be
/// role-based.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RoleBased {
    keys: Box<[AccountKey; ROLE_COUNT]>,
}

impl RoleBased {
    pub fn new(keys: [AccountKey; ROLE_COUNT]) -> TxResult<Self> {
        for (role, key) in Role::ALL.iter().zip(keys.iter()) {
            check_role_key(*role, key)?;
        }
        Ok(Self { keys: Box::new(keys) })
    }

    /// Build from per-role public key lists and optional per-role options.
    ///
    /// A role with no keys becomes `Nil`; a single key without options
    /// becomes `Public` (or `Legacy`/`Fail` for the `"legacyKey"` and
    /// `"failKey"` markers); anything else becomes a weighted multisig key
    /// and requires options.
    pub fn from_public_keys_and_options<S: AsRef<str>>(
        role_keys: &[Vec<S>],
        options: &[Option<WeightedMultiSigOptions>],
    ) -> TxResult<Self> {
        if role_keys.len() > ROLE_COUNT {
            return Err(TxError::validation(format!(
                "Role-based key supports at most {} roles, got {}",
                ROLE_COUNT,
                role_keys.len()
            )));
        }
        if options.len() > role_keys.len() {
            return Err(TxError::validation(
                "The length of options is greater than the number of roles with keys.",
            ));
        }

        let mut keys = [AccountKey::Nil, AccountKey::Nil, AccountKey::Nil];
        for (idx, public_keys) in role_keys.iter().enumerate() {
            let role_options = options.get(idx).and_then(|o| o.as_ref());
            keys[idx] = match (public_keys.len(), role_options) {
                (0, None) => AccountKey::Nil,
                (0, Some(_)) => {
                    return Err(TxError::validation(format!(
                        "Options are defined for {} without any public key.",
                        Role::ALL[idx]
                    )))
                }
                (1, None) => AccountKey::from_key_string(public_keys[0].as_ref())?,
                (_, Some(opts)) => AccountKey::WeightedMultiSig(
                    WeightedMultiSig::from_public_keys_and_options(public_keys, opts)?,
                ),
                (_, None) => {
                    return Err(TxError::validation(format!(
                        "Invalid options for {}: options must be defined for multiple public keys.",
                        Role::ALL[idx]
                    )))
                }
            };
        }

        Self::new(keys)
    }

    pub fn key(&self, role: Role) -> &AccountKey {
        &self.keys[role.index()]
    }

    pub fn keys(&self) -> &[AccountKey; ROLE_COUNT] {
        &self.keys
    }

    /// Replace the key of one role, keeping the key untouched on failure
    pub fn set_key(&mut self, role: Role, key: AccountKey) -> TxResult<()> {
        check_role_key(role, &key)?;
        self.keys[role.index()] = key;
        Ok(())
    }
}

fn check_role_key(role: Role, key: &AccountKey) -> TxResult<()> {
    if matches!(key, AccountKey::RoleBased(_)) {
        return Err(TxError::validation(format!(
            "Invalid key for {}: a role-based key cannot be nested in a role-based key",
            role
        )));
    }
    Ok(())
}

/// Authorization policy of an account
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AccountKey {
    /// No explicit key
    Nil,
    /// Key derived from the address
    Legacy,
    /// Account can no longer sign
    Fail,
    Public(PublicKey),
    WeightedMultiSig(WeightedMultiSig),
    RoleBased(RoleBased),
}

impl AccountKey {
    /// Parse `"legacyKey"`, `"failKey"` or a public key hex string
    pub fn from_key_string(s: &str) -> TxResult<Self> {
        match s {
            "legacyKey" => Ok(AccountKey::Legacy),
            "failKey" => Ok(AccountKey::Fail),
            key => Ok(AccountKey::Public(PublicKey::from_hex(key)?)),
        }
    }

    pub fn public(public_key: &str) -> TxResult<Self> {
        Ok(AccountKey::Public(PublicKey::from_hex(public_key)?))
    }

    /// Weighted multisig key from parallel key and weight arrays
    pub fn from_public_keys_and_options<S: AsRef<str>>(
        public_keys: &[S],
        options: &WeightedMultiSigOptions,
    ) -> TxResult<Self> {
        Ok(AccountKey::WeightedMultiSig(
            WeightedMultiSig::from_public_keys_and_options(public_keys, options)?,
        ))
    }

    /// Role-based key from per-role key lists and options
    pub fn from_role_based_public_keys_and_options<S: AsRef<str>>(
        role_keys: &[Vec<S>],
        options: &[Option<WeightedMultiSigOptions>],
    ) -> TxResult<Self> {
        Ok(AccountKey::RoleBased(RoleBased::from_public_keys_and_options(
            role_keys, options,
        )?))
    }

    pub fn type_name(&self) -> &'static str {
        match self {
            AccountKey::Nil => "AccountKeyNil",
            AccountKey::Legacy => "AccountKeyLegacy",
            AccountKey::Fail => "AccountKeyFail",
            AccountKey::Public(_) => "AccountKeyPublic",
            AccountKey::WeightedMultiSig(_) => "AccountKeyWeightedMultiSig",
            AccountKey::RoleBased(_) => "AccountKeyRoleBased",
        }
    }

    /// The key that signs for `role`. Non role-based keys serve every role.
    pub fn key_for_role(&self, role: Role) -> &AccountKey {
        match self {
            AccountKey::RoleBased(rb) => rb.key(role),
            other => other,
        }
    }
}
