//! Transaction type definitions

use crate::account::AccountKey;
use crate::error::{TxError, TxResult};
use crate::utils::encoding::{decode_hex, encode_hex, left_pad_32, parse_quantity_str, quantity_hex};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::fmt;

/// 20-byte account address
pub type Address = [u8; 20];

/// Lowest accepted fee ratio, in percent
pub const MIN_FEE_RATIO: u8 = 1;
/// Highest accepted fee ratio, in percent
pub const MAX_FEE_RATIO: u8 = 99;

/// Business shape of a transaction, shared by its basic and fee-delegated forms
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum TxKind {
    Legacy,
    ValueTransfer,
    ValueTransferMemo,
    AccountUpdate,
    SmartContractDeploy,
    SmartContractExecution,
    Cancel,
    ChainDataAnchoring,
}

/// Who pays the fee
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum FeeMode {
    /// Sender pays
    Basic,
    /// Fee payer pays everything
    Delegated,
    /// Fee payer pays `feeRatio` percent
    DelegatedWithRatio,
}

/// The concrete transaction types and their one-byte wire tags
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum TxType {
    Legacy,
    ValueTransfer,
    FeeDelegatedValueTransfer,
    FeeDelegatedValueTransferWithRatio,
    ValueTransferMemo,
    FeeDelegatedValueTransferMemo,
    FeeDelegatedValueTransferMemoWithRatio,
    AccountUpdate,
    FeeDelegatedAccountUpdate,
    FeeDelegatedAccountUpdateWithRatio,
    SmartContractDeploy,
    FeeDelegatedSmartContractDeploy,
    FeeDelegatedSmartContractDeployWithRatio,
    SmartContractExecution,
    FeeDelegatedSmartContractExecution,
    FeeDelegatedSmartContractExecutionWithRatio,
    Cancel,
    FeeDelegatedCancel,
    FeeDelegatedCancelWithRatio,
    ChainDataAnchoring,
    FeeDelegatedChainDataAnchoring,
    FeeDelegatedChainDataAnchoringWithRatio,
}

struct TypeInfo {
    tx_type: TxType,
    tag: u8,
    kind: TxKind,
    mode: FeeMode,
    name: &'static str,
}

macro_rules! type_info {
    ($variant:ident, $tag:expr, $kind:ident, $mode:ident) => {
        TypeInfo {
            tx_type: TxType::$variant,
            tag: $tag,
            kind: TxKind::$kind,
            mode: FeeMode::$mode,
            name: concat!("TxType", stringify!($variant)),
        }
    };
}

static TYPE_TABLE: [TypeInfo; 22] = [
    TypeInfo {
        tx_type: TxType::Legacy,
        tag: 0x00,
        kind: TxKind::Legacy,
        mode: FeeMode::Basic,
        name: "TxTypeLegacyTransaction",
    },
    type_info!(ValueTransfer, 0x08, ValueTransfer, Basic),
    type_info!(FeeDelegatedValueTransfer, 0x09, ValueTransfer, Delegated),
    type_info!(FeeDelegatedValueTransferWithRatio, 0x0a, ValueTransfer, DelegatedWithRatio),
    type_info!(ValueTransferMemo, 0x10, ValueTransferMemo, Basic),
    type_info!(FeeDelegatedValueTransferMemo, 0x11, ValueTransferMemo, Delegated),
    type_info!(FeeDelegatedValueTransferMemoWithRatio, 0x12, ValueTransferMemo, DelegatedWithRatio),
    type_info!(AccountUpdate, 0x20, AccountUpdate, Basic),
    type_info!(FeeDelegatedAccountUpdate, 0x21, AccountUpdate, Delegated),
    type_info!(FeeDelegatedAccountUpdateWithRatio, 0x22, AccountUpdate, DelegatedWithRatio),
    type_info!(SmartContractDeploy, 0x28, SmartContractDeploy, Basic),
    type_info!(FeeDelegatedSmartContractDeploy, 0x29, SmartContractDeploy, Delegated),
    type_info!(FeeDelegatedSmartContractDeployWithRatio, 0x2a, SmartContractDeploy, DelegatedWithRatio),
    type_info!(SmartContractExecution, 0x30, SmartContractExecution, Basic),
    type_info!(FeeDelegatedSmartContractExecution, 0x31, SmartContractExecution, Delegated),
    type_info!(FeeDelegatedSmartContractExecutionWithRatio, 0x32, SmartContractExecution, DelegatedWithRatio),
    type_info!(Cancel, 0x38, Cancel, Basic),
    type_info!(FeeDelegatedCancel, 0x39, Cancel, Delegated),
    type_info!(FeeDelegatedCancelWithRatio, 0x3a, Cancel, DelegatedWithRatio),
    type_info!(ChainDataAnchoring, 0x48, ChainDataAnchoring, Basic),
    type_info!(FeeDelegatedChainDataAnchoring, 0x49, ChainDataAnchoring, Delegated),
    type_info!(FeeDelegatedChainDataAnchoringWithRatio, 0x4a, ChainDataAnchoring, DelegatedWithRatio),
];

impl TxType {
    pub fn all() -> impl Iterator<Item = TxType> {
        TYPE_TABLE.iter().map(|info| info.tx_type)
    }

    fn info(self) -> &'static TypeInfo {
        // The table holds every variant exactly once, in declaration order
        &TYPE_TABLE[self as usize]
    }

    /// One-byte wire tag. Legacy transactions carry no tag on the wire.
    pub fn tag(self) -> u8 {
        self.info().tag
    }

    pub fn from_tag(tag: u8) -> Option<TxType> {
        TYPE_TABLE.iter().find(|info| info.tag == tag).map(|info| info.tx_type)
    }

    /// Type name as used in error messages, e.g. `TxTypeValueTransfer`
    pub fn name(self) -> &'static str {
        self.info().name
    }

    pub fn from_name(name: &str) -> Option<TxType> {
        TYPE_TABLE.iter().find(|info| info.name == name).map(|info| info.tx_type)
    }

    pub fn kind(self) -> TxKind {
        self.info().kind
    }

    pub fn fee_mode(self) -> FeeMode {
        self.info().mode
    }

    /// Type for a kind and fee mode; `None` for fee-delegated legacy
    pub fn from_parts(kind: TxKind, mode: FeeMode) -> Option<TxType> {
        TYPE_TABLE
            .iter()
            .find(|info| info.kind == kind && info.mode == mode)
            .map(|info| info.tx_type)
    }

    pub fn is_legacy(self) -> bool {
        self == TxType::Legacy
    }

    pub fn is_fee_delegated(self) -> bool {
        self.fee_mode() != FeeMode::Basic
    }

    pub fn has_fee_ratio(self) -> bool {
        self.fee_mode() == FeeMode::DelegatedWithRatio
    }
}

impl fmt::Display for TxType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Percentage of the fee paid by the fee payer, always within `[1, 99]`
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct FeeRatio(u8);

impl FeeRatio {
    pub fn new(ratio: u64) -> TxResult<Self> {
        if ratio < u64::from(MIN_FEE_RATIO) || ratio > u64::from(MAX_FEE_RATIO) {
            return Err(out_of_range_ratio(ratio));
        }
        Ok(Self(ratio as u8))
    }

    /// Accepts a JSON integer or a `0x` hex string
    pub fn from_json(value: &Value) -> TxResult<Self> {
        let invalid_type = || {
            TxError::validation(
                "Invalid type fo feeRatio: feeRatio should be number type or hex number string.",
            )
            .with_details(value.to_string())
        };

        match value {
            Value::Number(n) => {
                if let Some(ratio) = n.as_u64() {
                    Self::new(ratio)
                } else if n.as_i64().is_some() {
                    Err(out_of_range_ratio(n))
                } else {
                    Err(invalid_type())
                }
            }
            Value::String(s) if s.starts_with("0x") || s.starts_with("0X") => {
                let ratio = parse_quantity_str(s).ok_or_else(invalid_type)?;
                if ratio > u128::from(u64::MAX) {
                    return Err(out_of_range_ratio(s));
                }
                Self::new(ratio as u64)
            }
            _ => Err(invalid_type()),
        }
    }

    pub fn value(self) -> u8 {
        self.0
    }
}

fn out_of_range_ratio(ratio: impl fmt::Display) -> TxError {
    TxError::validation("Invalid feeRatio: feeRatio is out of range. [1, 99]")
        .with_details(format!("feeRatio: {}", ratio))
}

/// One ECDSA signature: recovery value `v` and the `r`, `s` scalars.
///
/// `v` carries the chain id (`recid + chainId * 2 + 35`).
#[derive(Clone, Copy, PartialEq, Eq, Hash)]
pub struct SignatureData {
    pub v: u64,
    pub r: [u8; 32],
    pub s: [u8; 32],
}

impl SignatureData {
    pub fn new(v: u64, r: [u8; 32], s: [u8; 32]) -> Self {
        Self { v, r, s }
    }

    /// Parse a `[v, r, s]` triple of hex strings (or a number for `v`)
    pub fn from_json(value: &Value) -> TxResult<Self> {
        let malformed = || {
            TxError::type_error("Signature must be an array of [v, r, s]")
                .with_details(value.to_string())
        };

        let (v, r, s) = match value {
            Value::Array(items) if items.len() == 3 => (&items[0], &items[1], &items[2]),
            Value::Object(map) => {
                let field = |upper: &str, lower: &str| {
                    map.get(upper).or_else(|| map.get(lower)).ok_or_else(malformed)
                };
                (field("V", "v")?, field("R", "r")?, field("S", "s")?)
            }
            _ => return Err(malformed()),
        };

        let v = match v {
            Value::Number(n) => n.as_u64().ok_or_else(malformed)?,
            Value::String(s) => {
                let wide = parse_quantity_str(s).ok_or_else(malformed)?;
                u64::try_from(wide).map_err(|_| malformed())?
            }
            _ => return Err(malformed()),
        };
        let scalar = |value: &Value| -> TxResult<[u8; 32]> {
            let text = value.as_str().ok_or_else(malformed)?;
            let bytes = decode_hex(text).map_err(|_| malformed())?;
            left_pad_32(&bytes).map_err(|_| malformed())
        };

        Ok(Self::new(v, scalar(r)?, scalar(s)?))
    }

    /// Normalize one triple or a list of triples into a list.
    ///
    /// An empty list and the `[["0x01", "0x", "0x"]]` placeholder both mean
    /// "no signatures".
    pub fn list_from_json(value: &Value) -> TxResult<Vec<Self>> {
        let Value::Array(items) = value else {
            return Err(TxError::type_error("Signatures to append should be an array.")
                .with_details(value.to_string()));
        };

        let is_flat_triple = !items.is_empty() && !items[0].is_array() && !items[0].is_object();
        let entries: Vec<&Value> = if is_flat_triple {
            vec![value]
        } else {
            items.iter().collect()
        };

        let mut signatures = Vec::with_capacity(entries.len());
        for entry in entries {
            if is_placeholder_json(entry) {
                continue;
            }
            signatures.push(Self::from_json(entry)?);
        }
        Ok(signatures)
    }

    /// Chain id encoded in `v`, if `v` follows the replay-protected form
    pub fn chain_id(&self) -> Option<u64> {
        if self.v >= 35 {
            Some((self.v - 35) / 2)
        } else {
            None
        }
    }

    pub fn to_json(&self) -> Value {
        Value::Array(vec![
            Value::String(quantity_hex(u128::from(self.v))),
            Value::String(encode_hex(&self.r)),
            Value::String(encode_hex(&self.s)),
        ])
    }
}

impl fmt::Debug for SignatureData {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SignatureData")
            .field("v", &quantity_hex(u128::from(self.v)))
            .field("r", &encode_hex(&self.r))
            .field("s", &encode_hex(&self.s))
            .finish()
    }
}

fn is_placeholder_json(value: &Value) -> bool {
    let Value::Array(items) = value else {
        return false;
    };
    let empty = |v: &Value| matches!(v.as_str(), Some("0x") | Some(""));
    items.len() == 3 && parse_json_u64(&items[0]) == Some(1) && empty(&items[1]) && empty(&items[2])
}

fn parse_json_u64(value: &Value) -> Option<u64> {
    match value {
        Value::Number(n) => n.as_u64(),
        Value::String(s) => parse_quantity_str(s).and_then(|v| u64::try_from(v).ok()),
        _ => None,
    }
}

/// Type-specific fields
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TxPayload {
    Legacy {
        /// `None` creates a contract from `input`
        to: Option<Address>,
        value: u128,
        input: Vec<u8>,
    },
    ValueTransfer {
        to: Address,
        value: u128,
    },
    ValueTransferMemo {
        to: Address,
        value: u128,
        input: Vec<u8>,
    },
    AccountUpdate {
        account: AccountKey,
    },
    SmartContractDeploy {
        value: u128,
        input: Vec<u8>,
        human_readable: bool,
        code_format: u8,
    },
    SmartContractExecution {
        to: Address,
        value: u128,
        input: Vec<u8>,
    },
    Cancel,
    ChainDataAnchoring {
        input: Vec<u8>,
    },
}

impl TxPayload {
    pub fn kind(&self) -> TxKind {
        match self {
            TxPayload::Legacy { .. } => TxKind::Legacy,
            TxPayload::ValueTransfer { .. } => TxKind::ValueTransfer,
            TxPayload::ValueTransferMemo { .. } => TxKind::ValueTransferMemo,
            TxPayload::AccountUpdate { .. } => TxKind::AccountUpdate,
            TxPayload::SmartContractDeploy { .. } => TxKind::SmartContractDeploy,
            TxPayload::SmartContractExecution { .. } => TxKind::SmartContractExecution,
            TxPayload::Cancel => TxKind::Cancel,
            TxPayload::ChainDataAnchoring { .. } => TxKind::ChainDataAnchoring,
        }
    }

    pub fn to(&self) -> Option<&Address> {
        match self {
            TxPayload::Legacy { to, .. } => to.as_ref(),
            TxPayload::ValueTransfer { to, .. }
            | TxPayload::ValueTransferMemo { to, .. }
            | TxPayload::SmartContractExecution { to, .. } => Some(to),
            _ => None,
        }
    }

    pub fn value(&self) -> Option<u128> {
        match self {
            TxPayload::Legacy { value, .. }
            | TxPayload::ValueTransfer { value, .. }
            | TxPayload::ValueTransferMemo { value, .. }
            | TxPayload::SmartContractDeploy { value, .. }
            | TxPayload::SmartContractExecution { value, .. } => Some(*value),
            _ => None,
        }
    }

    pub fn input(&self) -> Option<&[u8]> {
        match self {
            TxPayload::Legacy { input, .. }
            | TxPayload::ValueTransferMemo { input, .. }
            | TxPayload::SmartContractDeploy { input, .. }
            | TxPayload::SmartContractExecution { input, .. }
            | TxPayload::ChainDataAnchoring { input } => Some(input.as_slice()),
            _ => None,
        }
    }

    pub fn account(&self) -> Option<&AccountKey> {
        match self {
            TxPayload::AccountUpdate { account } => Some(account),
            _ => None,
        }
    }
}

/// Fee payer block of fee-delegated transactions
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct FeeDelegation {
    /// `None` until a fee payer is known; written as an empty string
    pub fee_payer: Option<Address>,
    pub fee_payer_signatures: Vec<SignatureData>,
    /// Present exactly for the with-ratio types
    pub fee_ratio: Option<FeeRatio>,
}

/// A transaction of any supported type.
///
/// Fields are private: construction goes through
/// [`TransactionBuilder`](super::TransactionBuilder) or the decoder, and
/// mutation through the validating setters, the signature operations and
/// default filling.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Transaction {
    pub(crate) tx_type: TxType,
    pub(crate) from: Option<Address>,
    pub(crate) nonce: Option<u64>,
    pub(crate) gas_price: Option<u128>,
    pub(crate) gas: u64,
    pub(crate) chain_id: Option<u64>,
    pub(crate) signatures: Vec<SignatureData>,
    pub(crate) payload: TxPayload,
    pub(crate) fee_delegation: Option<FeeDelegation>,
}

impl Transaction {
    pub fn tx_type(&self) -> TxType {
        self.tx_type
    }

    pub fn from_address(&self) -> Option<&Address> {
        self.from.as_ref()
    }

    pub fn nonce(&self) -> Option<u64> {
        self.nonce
    }

    pub fn gas_price(&self) -> Option<u128> {
        self.gas_price
    }

    pub fn gas(&self) -> u64 {
        self.gas
    }

    pub fn chain_id(&self) -> Option<u64> {
        self.chain_id
    }

    pub fn signatures(&self) -> &[SignatureData] {
        &self.signatures
    }

    pub fn payload(&self) -> &TxPayload {
        &self.payload
    }

    pub fn fee_payer(&self) -> Option<&Address> {
        self.fee_delegation.as_ref().and_then(|fd| fd.fee_payer.as_ref())
    }

    /// Empty for types without fee delegation
    pub fn fee_payer_signatures(&self) -> &[SignatureData] {
        self.fee_delegation
            .as_ref()
            .map(|fd| fd.fee_payer_signatures.as_slice())
            .unwrap_or(&[])
    }

    pub fn fee_ratio(&self) -> Option<FeeRatio> {
        self.fee_delegation.as_ref().and_then(|fd| fd.fee_ratio)
    }

    pub fn set_nonce(&mut self, nonce: u64) {
        self.nonce = Some(nonce);
    }

    pub fn set_gas_price(&mut self, gas_price: u128) {
        self.gas_price = Some(gas_price);
    }

    pub fn set_chain_id(&mut self, chain_id: u64) {
        self.chain_id = Some(chain_id);
    }

    /// Set the fee payer; fails on types without fee delegation
    pub fn set_fee_payer(&mut self, fee_payer: Address) -> TxResult<()> {
        let tx_type = self.tx_type;
        let fd = self.fee_delegation.as_mut().ok_or_else(|| {
            TxError::validation(format!("\"feePayer\" cannot be used with {} transaction", tx_type))
        })?;
        fd.fee_payer = Some(fee_payer);
        Ok(())
    }
}
