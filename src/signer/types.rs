//! Signer interface and errors

use crate::account::Role;
use crate::error::{ErrorCode, TxError};
use crate::transaction::{Address, SignatureData};
use thiserror::Error;

/// Something that can sign transaction hashes on behalf of one account
pub trait TransactionSigner {
    /// Account the signatures are made for
    fn address(&self) -> Address;

    /// Number of keys registered for `role`
    fn key_count(&self, role: Role) -> usize;

    /// Sign `hash` with key `index` of `role`.
    ///
    /// The returned `v` must embed `chain_id` (`recid + chain_id * 2 + 35`).
    fn sign(
        &self,
        hash: &[u8; 32],
        chain_id: u64,
        role: Role,
        index: usize,
    ) -> Result<SignatureData, SignerError>;

    /// Sign `hash` with every key of `role`, in key order
    fn sign_all(
        &self,
        hash: &[u8; 32],
        chain_id: u64,
        role: Role,
    ) -> Result<Vec<SignatureData>, SignerError> {
        let count = self.key_count(role);
        if count == 0 {
            return Err(SignerError::EmptyRole(role));
        }
        (0..count).map(|index| self.sign(hash, chain_id, role, index)).collect()
    }
}

/// Signer errors
#[derive(Debug, Error)]
pub enum SignerError {
    #[error("Invalid index({index}): index must be less than the length of keys({count}).")]
    IndexOutOfRange { index: usize, count: usize },

    #[error("There are no keys for {0}")]
    EmptyRole(Role),

    #[error("Invalid private key: {0}")]
    InvalidPrivateKey(String),

    #[error("Signing failed: {0}")]
    Signing(String),

    #[error("The {0} address of the transaction is different with the address of the keyring to use.")]
    AddressMismatch(&'static str),
}

impl From<SignerError> for TxError {
    fn from(e: SignerError) -> Self {
        let code = match &e {
            SignerError::IndexOutOfRange { .. } | SignerError::EmptyRole(_) => ErrorCode::UnsupportedKey,
            SignerError::AddressMismatch(_) => ErrorCode::Validation,
            SignerError::InvalidPrivateKey(_) | SignerError::Signing(_) => ErrorCode::Signing,
        };
        TxError::new(code, e.to_string())
    }
}

impl From<secp256k1::Error> for SignerError {
    fn from(e: secp256k1::Error) -> Self {
        SignerError::Signing(e.to_string())
    }
}
