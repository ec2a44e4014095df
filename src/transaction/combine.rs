//! Signature lifecycle: appending and combining
//!
//! Combining merges signature lists from independently signed copies of
//! the same transaction. The merge runs on a working copy and is committed
//! only when every candidate has been accepted, so a failed call leaves the
//! transaction unchanged.

use super::codec::detect_type;
use super::types::{Address, SignatureData, Transaction};
use crate::error::{TxError, TxResult};
use crate::utils::encoding::{decode_hex, encode_hex};
use serde_json::Value;

const LOG_TARGET: &str = "klaytn_tx::combine";

const DIFFERENT_TX: &str = "Transactions containing different information cannot be combined.";

impl Transaction {
    /// Append sender signatures in order, without dedup or sorting
    pub fn append_signatures<I>(&mut self, signatures: I) -> TxResult<()>
    where
        I: IntoIterator<Item = SignatureData>,
    {
        let signatures: Vec<SignatureData> = signatures.into_iter().collect();
        if self.tx_type.is_legacy() && self.signatures.len() + signatures.len() > 1 {
            return Err(TxError::validation(
                "Legacy transaction cannot have multiple signatures",
            ));
        }
        self.signatures.extend(signatures);
        Ok(())
    }

    /// Append signatures given as JSON: one `[v, r, s]` triple or a list of them
    pub fn append_signatures_json(&mut self, signatures: &Value) -> TxResult<()> {
        self.append_signatures(SignatureData::list_from_json(signatures)?)
    }

    /// Append fee payer signatures.
    ///
    /// Fails on types without fee delegation, and while no fee payer is set.
    pub fn append_fee_payer_signatures<I>(&mut self, signatures: I) -> TxResult<()>
    where
        I: IntoIterator<Item = SignatureData>,
    {
        let tx_type = self.tx_type;
        let fee_delegation = self.fee_delegation.as_mut().ok_or_else(|| {
            TxError::validation(format!(
                "\"feePayerSignatures\" cannot be used with {} transaction",
                tx_type
            ))
        })?;
        let signatures: Vec<SignatureData> = signatures.into_iter().collect();
        if fee_delegation.fee_payer.is_none() && !signatures.is_empty() {
            return Err(TxError::validation(
                "\"feePayer\" is missing: feePayer must be defined with feePayerSignatures.",
            ));
        }
        fee_delegation.fee_payer_signatures.extend(signatures);
        Ok(())
    }

    pub fn append_fee_payer_signatures_json(&mut self, signatures: &Value) -> TxResult<()> {
        self.append_fee_payer_signatures(SignatureData::list_from_json(signatures)?)
    }

    /// Merge the signatures of `encoded_txs` (hex encodings) into this
    /// transaction and return the combined encoding as hex.
    ///
    /// Every candidate must be of the same type and agree on every field
    /// except the signature lists. An unset fee payer on either side is not
    /// a conflict; a set one is adopted. Other unset fields are filled from
    /// candidates only while this transaction has no signatures at all.
    pub fn combine_signatures<S: AsRef<str>>(&mut self, encoded_txs: &[S]) -> TxResult<String> {
        let mut working = self.clone();
        let fill_unset = working.signatures.is_empty() && working.fee_payer_signatures().is_empty();

        for (index, encoded) in encoded_txs.iter().enumerate() {
            let encoded = encoded.as_ref();
            crate::log_debug!(
                LOG_TARGET,
                "combining candidate",
                tx_type = self.tx_type,
                index = index,
                fill_unset = fill_unset,
            );

            if let Err(e) = working.absorb(encoded, fill_unset) {
                crate::log_warn!(
                    LOG_TARGET,
                    "rejected candidate",
                    tx_type = self.tx_type,
                    index = index,
                    reason = e.message,
                );
                return Err(e);
            }
        }

        let combined = working.rlp_encoding()?;
        *self = working;
        Ok(encode_hex(&combined))
    }

    fn absorb(&mut self, encoded: &str, fill_unset: bool) -> TxResult<()> {
        let bytes = decode_hex(encoded).map_err(|e| TxError::decode(e.message))?;
        if detect_type(&bytes)? != self.tx_type {
            return Err(TxError::type_mismatch(
                "Transaction type mismatch: Signatures from different transactions cannot be combined.",
            ));
        }
        let decoded = Transaction::decode(&bytes)?;

        merge_field("from", &mut self.from, decoded.from, fill_unset)?;
        merge_field("nonce", &mut self.nonce, decoded.nonce, fill_unset)?;
        merge_field("gasPrice", &mut self.gas_price, decoded.gas_price, fill_unset)?;
        merge_chain_id(&mut self.chain_id, decoded.chain_id, fill_unset)?;

        if self.gas != decoded.gas {
            return Err(TxError::inconsistent(DIFFERENT_TX).with_details("field: gas"));
        }
        if self.payload != decoded.payload {
            return Err(TxError::inconsistent(DIFFERENT_TX).with_details("field: payload"));
        }
        if self.fee_ratio() != decoded.fee_ratio() {
            return Err(TxError::inconsistent(DIFFERENT_TX).with_details("field: feeRatio"));
        }

        if let (Some(mine), Some(theirs)) = (self.fee_delegation.as_mut(), decoded.fee_delegation.as_ref()) {
            merge_fee_payer(&mut mine.fee_payer, theirs.fee_payer)?;
        }

        self.append_signatures(decoded.signatures.iter().copied())?;
        if !decoded.fee_payer_signatures().is_empty() {
            self.append_fee_payer_signatures(decoded.fee_payer_signatures().iter().copied())?;
        }
        Ok(())
    }
}

/// Compare one optional field of a candidate with ours.
///
/// A field the candidate does not carry is never a conflict. A field only
/// the candidate carries is adopted when filling is allowed.
fn merge_field<T: PartialEq + Copy>(
    name: &str,
    mine: &mut Option<T>,
    theirs: Option<T>,
    fill_unset: bool,
) -> TxResult<()> {
    match (*mine, theirs) {
        (_, None) => Ok(()),
        (None, Some(value)) if fill_unset => {
            *mine = Some(value);
            Ok(())
        }
        (Some(a), Some(b)) if a == b => Ok(()),
        _ => Err(TxError::inconsistent(DIFFERENT_TX).with_details(format!("field: {}", name))),
    }
}

/// `chainId` is not on the wire, so only two known values can conflict.
fn merge_chain_id(mine: &mut Option<u64>, theirs: Option<u64>, fill_unset: bool) -> TxResult<()> {
    match (*mine, theirs) {
        (Some(a), Some(b)) if a != b => {
            Err(TxError::inconsistent(DIFFERENT_TX).with_details("field: chainId"))
        }
        (None, Some(chain_id)) if fill_unset => {
            *mine = Some(chain_id);
            Ok(())
        }
        _ => Ok(()),
    }
}

fn merge_fee_payer(mine: &mut Option<Address>, theirs: Option<Address>) -> TxResult<()> {
    match (*mine, theirs) {
        (_, None) => Ok(()),
        (None, Some(fee_payer)) => {
            *mine = Some(fee_payer);
            Ok(())
        }
        (Some(a), Some(b)) if a == b => Ok(()),
        _ => Err(TxError::inconsistent(DIFFERENT_TX).with_details("field: feePayer")),
    }
}
