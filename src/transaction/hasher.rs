//! Transaction hashes

use super::types::Transaction;
use crate::error::TxResult;
use crate::utils::crypto::keccak256;

impl Transaction {
    /// Hash of the fully signed encoding
    pub fn transaction_hash(&self) -> TxResult<[u8; 32]> {
        Ok(keccak256(&self.rlp_encoding()?))
    }

    /// Hash identifying the transaction regardless of its fee payer.
    ///
    /// Equal to [`Transaction::transaction_hash`] for types without fee
    /// delegation. Otherwise the `feePayer` and `feePayerSignatures` items
    /// are dropped before hashing; sender signatures stay in.
    pub fn sender_tx_hash(&self) -> TxResult<[u8; 32]> {
        Ok(keccak256(&self.sender_encoding()?))
    }

    /// Hash the sender signs
    pub fn hash_for_signature(&self) -> TxResult<[u8; 32]> {
        Ok(keccak256(&self.rlp_encoding_for_signature()?))
    }

    /// Hash the fee payer signs
    pub fn hash_for_fee_payer_signature(&self) -> TxResult<[u8; 32]> {
        Ok(keccak256(&self.rlp_encoding_for_fee_payer_signature()?))
    }
}
