//! Signing transactions and recovering signers

use super::types::{SignerError, TransactionSigner};
use crate::account::Role;
use crate::error::{TxError, TxResult};
use crate::transaction::{Address, SignatureData, Transaction, TxKind};
use crate::utils::crypto::address_from_uncompressed;
use secp256k1::ecdsa::{RecoverableSignature, RecoveryId};
use secp256k1::{Message, Secp256k1};

const LOG_TARGET: &str = "klaytn_tx::signer";

impl Transaction {
    /// Role whose keys sign this transaction as sender
    pub fn sender_role(&self) -> Role {
        match self.tx_type.kind() {
            TxKind::AccountUpdate => Role::AccountUpdate,
            _ => Role::Transaction,
        }
    }

    /// Sign as sender with key `index` of the signer and append the signature
    pub fn sign<S: TransactionSigner + ?Sized>(&mut self, signer: &S, index: usize) -> TxResult<()> {
        self.sign_with(signer, |hash, chain_id, role| {
            Ok(vec![signer.sign(hash, chain_id, role, index)?])
        })
    }

    /// Sign as sender with every key of the signer's role
    pub fn sign_all<S: TransactionSigner + ?Sized>(&mut self, signer: &S) -> TxResult<()> {
        self.sign_with(signer, |hash, chain_id, role| signer.sign_all(hash, chain_id, role))
    }

    /// Sign as fee payer with key `index`. An unset fee payer becomes the
    /// signer's address.
    pub fn sign_as_fee_payer<S: TransactionSigner + ?Sized>(
        &mut self,
        signer: &S,
        index: usize,
    ) -> TxResult<()> {
        self.sign_fee_payer_with(signer, |hash, chain_id| {
            Ok(vec![signer.sign(hash, chain_id, Role::FeePayer, index)?])
        })
    }

    pub fn sign_all_as_fee_payer<S: TransactionSigner + ?Sized>(&mut self, signer: &S) -> TxResult<()> {
        self.sign_fee_payer_with(signer, |hash, chain_id| {
            signer.sign_all(hash, chain_id, Role::FeePayer)
        })
    }

    fn sign_with<S, F>(&mut self, signer: &S, produce: F) -> TxResult<()>
    where
        S: TransactionSigner + ?Sized,
        F: FnOnce(&[u8; 32], u64, Role) -> Result<Vec<SignatureData>, SignerError>,
    {
        let address = signer.address();
        let mut working = self.clone();
        match working.from {
            None if working.tx_type.is_legacy() => working.from = Some(address),
            Some(from) if from == address => {}
            _ => return Err(SignerError::AddressMismatch("from").into()),
        }

        let hash = working.hash_for_signature()?;
        let chain_id = working.chain_id.ok_or_else(|| TxError::missing_field("chainId"))?;
        let role = working.sender_role();
        let signatures = produce(&hash, chain_id, role)?;

        if working.tx_type.is_legacy() && signatures.len() > 1 {
            return Err(TxError::validation(format!(
                "{} cannot be signed with a decoupled keyring.",
                working.tx_type
            )));
        }

        crate::log_debug!(
            LOG_TARGET,
            "signed as sender",
            tx_type = working.tx_type,
            role = role,
            signatures = signatures.len(),
        );
        working.append_signatures(signatures)?;
        *self = working;
        Ok(())
    }

    fn sign_fee_payer_with<S, F>(&mut self, signer: &S, produce: F) -> TxResult<()>
    where
        S: TransactionSigner + ?Sized,
        F: FnOnce(&[u8; 32], u64) -> Result<Vec<SignatureData>, SignerError>,
    {
        let address = signer.address();
        let mut working = self.clone();
        match working.fee_payer().copied() {
            None => working.set_fee_payer(address)?,
            Some(fee_payer) if fee_payer == address => {}
            Some(_) => return Err(SignerError::AddressMismatch("feePayer").into()),
        }

        let hash = working.hash_for_fee_payer_signature()?;
        let chain_id = working.chain_id.ok_or_else(|| TxError::missing_field("chainId"))?;
        let signatures = produce(&hash, chain_id)?;

        crate::log_debug!(
            LOG_TARGET,
            "signed as fee payer",
            tx_type = working.tx_type,
            signatures = signatures.len(),
        );
        working.append_fee_payer_signatures(signatures)?;
        *self = working;
        Ok(())
    }
}

impl SignatureData {
    /// Address whose key produced this signature over `hash`.
    ///
    /// `v` may be replay protected for `chain_id` or the plain `27`/`28` form.
    pub fn recover_address(&self, hash: &[u8; 32], chain_id: u64) -> TxResult<Address> {
        let recovery = match self.v {
            27 | 28 => self.v - 27,
            v => v
                .checked_sub(chain_id.saturating_mul(2).saturating_add(35))
                .filter(|id| *id <= 1)
                .ok_or_else(|| {
                    TxError::signing(format!(
                        "Invalid v {} for chainId {}",
                        crate::utils::encoding::quantity_hex(u128::from(v)),
                        chain_id
                    ))
                })?,
        };

        let secp = Secp256k1::verification_only();
        let message = Message::from_digest_slice(hash)?;
        let recovery_id = RecoveryId::from_i32(recovery as i32)?;

        let mut compact = [0u8; 64];
        compact[..32].copy_from_slice(&self.r);
        compact[32..].copy_from_slice(&self.s);
        let signature = RecoverableSignature::from_compact(&compact, recovery_id)
            .map_err(|e| TxError::signing(format!("Invalid signature: {}", e)))?;

        let public_key = secp
            .recover_ecdsa(&message, &signature)
            .map_err(|e| TxError::signing(format!("Recovery failed: {}", e)))?;
        Ok(address_from_uncompressed(&public_key.serialize_uncompressed()))
    }
}
