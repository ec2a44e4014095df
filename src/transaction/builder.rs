//! Transaction construction
//!
//! Every transaction is built through [`TransactionBuilder::build`], which
//! checks the per-type field rules: required fields must be present and
//! fields that the type does not define must be absent. The JSON intake
//! feeds the same builder, so both paths reject the same inputs.

use super::types::{
    Address, FeeDelegation, FeeRatio, SignatureData, Transaction, TxKind, TxPayload, TxType,
};
use crate::account::AccountKey;
use crate::error::{TxError, TxResult};
use crate::utils::encoding::{
    encode_hex, format_address, parse_address, parse_hex_field, parse_quantity, parse_quantity_u64,
    quantity_hex,
};
use serde_json::{Map, Value};

/// Keys of the retired account-creation API, rejected on every type
const LEGACY_KEY_FIELDS: [&str; 8] = [
    "key",
    "legacyKey",
    "publicKey",
    "failKey",
    "multisig",
    "roleTransactionKey",
    "roleAccountUpdateKey",
    "roleFeePayerKey",
];

/// Only EVM bytecode is deployable
pub const CODE_FORMAT_EVM: u8 = 0;

/// Type-specific fields subject to the required/forbidden rules.
/// `nonce`, `gasPrice`, `chainId` and `signatures` are accepted everywhere.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum Field {
    From,
    To,
    Value,
    Input,
    Gas,
    FeeRatio,
    CodeFormat,
    HumanReadable,
    Account,
    FeePayer,
    FeePayerSignatures,
}

impl Field {
    fn name(self) -> &'static str {
        match self {
            Field::From => "from",
            Field::To => "to",
            Field::Value => "value",
            Field::Input => "input",
            Field::Gas => "gas",
            Field::FeeRatio => "feeRatio",
            Field::CodeFormat => "codeFormat",
            Field::HumanReadable => "humanReadable",
            Field::Account => "account",
            Field::FeePayer => "feePayer",
            Field::FeePayerSignatures => "feePayerSignatures",
        }
    }

    fn from_json_key(key: &str) -> Option<Field> {
        Some(match key {
            "from" => Field::From,
            "to" => Field::To,
            "value" => Field::Value,
            "input" | "data" => Field::Input,
            "gas" => Field::Gas,
            "feeRatio" => Field::FeeRatio,
            "codeFormat" => Field::CodeFormat,
            "humanReadable" => Field::HumanReadable,
            "account" => Field::Account,
            "feePayer" => Field::FeePayer,
            "feePayerSignatures" => Field::FeePayerSignatures,
            _ => return None,
        })
    }
}

struct FieldRules {
    required: Vec<Field>,
    optional: Vec<Field>,
}

impl FieldRules {
    fn for_type(tx_type: TxType) -> Self {
        use Field as F;

        let (mut required, mut optional) = match tx_type.kind() {
            TxKind::Legacy => (vec![F::Gas], vec![F::From, F::To, F::Value, F::Input]),
            TxKind::ValueTransfer => (vec![F::From, F::To, F::Value, F::Gas], vec![]),
            TxKind::ValueTransferMemo => (vec![F::From, F::To, F::Value, F::Input, F::Gas], vec![]),
            TxKind::AccountUpdate => (vec![F::From, F::Gas, F::Account], vec![]),
            TxKind::SmartContractDeploy => (
                vec![F::From, F::Input, F::Gas],
                vec![F::Value, F::HumanReadable, F::CodeFormat],
            ),
            TxKind::SmartContractExecution => (vec![F::From, F::To, F::Input, F::Gas], vec![F::Value]),
            TxKind::Cancel => (vec![F::From, F::Gas], vec![]),
            TxKind::ChainDataAnchoring => (vec![F::From, F::Input, F::Gas], vec![]),
        };

        if tx_type.is_fee_delegated() {
            optional.extend([F::FeePayer, F::FeePayerSignatures]);
        }
        if tx_type.has_fee_ratio() {
            required.push(F::FeeRatio);
        }

        Self { required, optional }
    }

    fn allows(&self, field: Field) -> bool {
        self.required.contains(&field) || self.optional.contains(&field)
    }
}

fn forbidden(key: &str, tx_type: TxType) -> TxError {
    TxError::validation(format!("\"{}\" cannot be used with {} transaction", key, tx_type))
}

fn missing(field: Field) -> TxError {
    TxError::validation(format!("\"{}\" is missing", field.name()))
}

/// Builder for [`Transaction`]
#[derive(Debug, Clone)]
pub struct TransactionBuilder {
    tx_type: TxType,
    from: Option<Address>,
    to: Option<Address>,
    value: Option<u128>,
    input: Option<Vec<u8>>,
    gas: Option<u64>,
    gas_price: Option<u128>,
    nonce: Option<u64>,
    chain_id: Option<u64>,
    fee_ratio: Option<FeeRatio>,
    code_format: Option<u8>,
    human_readable: Option<bool>,
    account: Option<AccountKey>,
    fee_payer: Option<Address>,
    signatures: Vec<SignatureData>,
    fee_payer_signatures: Option<Vec<SignatureData>>,
}

impl TransactionBuilder {
    pub fn new(tx_type: TxType) -> Self {
        Self {
            tx_type,
            from: None,
            to: None,
            value: None,
            input: None,
            gas: None,
            gas_price: None,
            nonce: None,
            chain_id: None,
            fee_ratio: None,
            code_format: None,
            human_readable: None,
            account: None,
            fee_payer: None,
            signatures: Vec::new(),
            fee_payer_signatures: None,
        }
    }

    pub fn from(mut self, from: Address) -> Self {
        self.from = Some(from);
        self
    }

    pub fn to(mut self, to: Address) -> Self {
        self.to = Some(to);
        self
    }

    pub fn value(mut self, value: u128) -> Self {
        self.value = Some(value);
        self
    }

    pub fn input(mut self, input: impl Into<Vec<u8>>) -> Self {
        self.input = Some(input.into());
        self
    }

    pub fn gas(mut self, gas: u64) -> Self {
        self.gas = Some(gas);
        self
    }

    pub fn gas_price(mut self, gas_price: u128) -> Self {
        self.gas_price = Some(gas_price);
        self
    }

    pub fn nonce(mut self, nonce: u64) -> Self {
        self.nonce = Some(nonce);
        self
    }

    pub fn chain_id(mut self, chain_id: u64) -> Self {
        self.chain_id = Some(chain_id);
        self
    }

    pub fn fee_ratio(mut self, fee_ratio: FeeRatio) -> Self {
        self.fee_ratio = Some(fee_ratio);
        self
    }

    pub fn code_format(mut self, code_format: u8) -> Self {
        self.code_format = Some(code_format);
        self
    }

    pub fn human_readable(mut self, human_readable: bool) -> Self {
        self.human_readable = Some(human_readable);
        self
    }

    pub fn account(mut self, account: AccountKey) -> Self {
        self.account = Some(account);
        self
    }

    pub fn fee_payer(mut self, fee_payer: Address) -> Self {
        self.fee_payer = Some(fee_payer);
        self
    }

    pub fn signatures(mut self, signatures: Vec<SignatureData>) -> Self {
        self.signatures = signatures;
        self
    }

    pub fn fee_payer_signatures(mut self, signatures: Vec<SignatureData>) -> Self {
        self.fee_payer_signatures = Some(signatures);
        self
    }

    fn present(&self) -> Vec<Field> {
        let mut fields = Vec::new();
        let mut mark = |set: bool, field: Field| {
            if set {
                fields.push(field);
            }
        };
        mark(self.from.is_some(), Field::From);
        mark(self.to.is_some(), Field::To);
        mark(self.value.is_some(), Field::Value);
        mark(self.input.is_some(), Field::Input);
        mark(self.gas.is_some(), Field::Gas);
        mark(self.fee_ratio.is_some(), Field::FeeRatio);
        mark(self.code_format.is_some(), Field::CodeFormat);
        mark(self.human_readable.is_some(), Field::HumanReadable);
        mark(self.account.is_some(), Field::Account);
        mark(self.fee_payer.is_some(), Field::FeePayer);
        mark(self.fee_payer_signatures.is_some(), Field::FeePayerSignatures);
        fields
    }

    /// Check the field rules and assemble the transaction
    pub fn build(self) -> TxResult<Transaction> {
        let tx_type = self.tx_type;
        let rules = FieldRules::for_type(tx_type);
        let present = self.present();

        if let Some(field) = present.iter().find(|f| !rules.allows(**f)) {
            return Err(forbidden(field.name(), tx_type));
        }
        if let Some(field) = rules.required.iter().find(|f| !present.contains(*f)) {
            return Err(missing(*field));
        }

        let gas = self.gas.ok_or_else(|| missing(Field::Gas))?;
        let value = self.value.unwrap_or(0);
        let input = self.input.unwrap_or_default();

        let payload = match tx_type.kind() {
            TxKind::Legacy => {
                if self.to.is_none() && input.is_empty() {
                    return Err(TxError::validation("contract creation without any data provided"));
                }
                if self.signatures.len() > 1 {
                    return Err(TxError::validation(
                        "Legacy transaction cannot have multiple signatures",
                    ));
                }
                TxPayload::Legacy { to: self.to, value, input }
            }
            TxKind::ValueTransfer => TxPayload::ValueTransfer {
                to: self.to.ok_or_else(|| missing(Field::To))?,
                value,
            },
            TxKind::ValueTransferMemo => TxPayload::ValueTransferMemo {
                to: self.to.ok_or_else(|| missing(Field::To))?,
                value,
                input,
            },
            TxKind::AccountUpdate => TxPayload::AccountUpdate {
                account: self.account.ok_or_else(|| missing(Field::Account))?,
            },
            TxKind::SmartContractDeploy => {
                let code_format = self.code_format.unwrap_or(CODE_FORMAT_EVM);
                if code_format != CODE_FORMAT_EVM {
                    return Err(TxError::validation(format!(
                        "Invalid codeFormat: {}. Only EVM (0x0) is supported",
                        quantity_hex(u128::from(code_format))
                    )));
                }
                TxPayload::SmartContractDeploy {
                    value,
                    input,
                    human_readable: self.human_readable.unwrap_or(false),
                    code_format,
                }
            }
            TxKind::SmartContractExecution => TxPayload::SmartContractExecution {
                to: self.to.ok_or_else(|| missing(Field::To))?,
                value,
                input,
            },
            TxKind::Cancel => TxPayload::Cancel,
            TxKind::ChainDataAnchoring => TxPayload::ChainDataAnchoring { input },
        };

        let fee_delegation = if tx_type.is_fee_delegated() {
            let fee_payer_signatures = self.fee_payer_signatures.unwrap_or_default();
            if self.fee_payer.is_none() && !fee_payer_signatures.is_empty() {
                return Err(TxError::validation(
                    "\"feePayer\" is missing: feePayer must be defined with feePayerSignatures.",
                ));
            }
            Some(FeeDelegation {
                fee_payer: self.fee_payer,
                fee_payer_signatures,
                fee_ratio: self.fee_ratio,
            })
        } else {
            None
        };

        Ok(Transaction {
            tx_type,
            from: self.from,
            nonce: self.nonce,
            gas_price: self.gas_price,
            gas,
            chain_id: self.chain_id,
            signatures: self.signatures,
            payload,
            fee_delegation,
        })
    }
}

impl Transaction {
    pub fn builder(tx_type: TxType) -> TransactionBuilder {
        TransactionBuilder::new(tx_type)
    }

    /// Build a transaction from a JSON field map.
    ///
    /// Quantities may be JSON numbers, `0x` hex strings or decimal strings;
    /// `input` may also be given as `data`; `account` is the hex encoding
    /// of an account key. A `null` value counts as absent.
    pub fn from_json(tx_type: TxType, json: &Value) -> TxResult<Self> {
        let map = json
            .as_object()
            .ok_or_else(|| TxError::validation("Transaction fields must be a JSON object"))?;

        for key in LEGACY_KEY_FIELDS {
            if map.contains_key(key) {
                return Err(forbidden(key, tx_type));
            }
        }
        if map.contains_key("input") && map.contains_key("data") {
            return Err(TxError::validation(
                "\"input\" and \"data\" cannot be defined at the same time, please use either \"input\" or \"data\".",
            ));
        }

        let rules = FieldRules::for_type(tx_type);
        let mut builder = TransactionBuilder::new(tx_type);

        for (key, value) in map.iter().filter(|(_, v)| !v.is_null()) {
            if let Some(field) = Field::from_json_key(key) {
                // A deploy carries an empty `to`; "0x" is the only accepted spelling of it
                if field == Field::To && tx_type.kind() == TxKind::SmartContractDeploy && value == "0x" {
                    continue;
                }
                if !rules.allows(field) {
                    return Err(forbidden(key, tx_type));
                }
            }

            builder = match key.as_str() {
                "from" => builder.from(parse_address(json_str(value, key)?, "from")?),
                "to" => builder.to(parse_address(json_str(value, key)?, "to")?),
                "value" => builder.value(parse_quantity(value, key)?),
                "input" | "data" => builder.input(parse_hex_field(value, key)?),
                "gas" => builder.gas(parse_quantity_u64(value, key)?),
                "gasPrice" => builder.gas_price(parse_quantity(value, key)?),
                "nonce" => builder.nonce(parse_quantity_u64(value, key)?),
                "chainId" => builder.chain_id(parse_quantity_u64(value, key)?),
                "feeRatio" => builder.fee_ratio(FeeRatio::from_json(value)?),
                "codeFormat" => {
                    let code_format = parse_quantity(value, key)?;
                    let code_format = u8::try_from(code_format).map_err(|_| {
                        TxError::validation(format!("Invalid codeFormat: {}", value))
                    })?;
                    builder.code_format(code_format)
                }
                "humanReadable" => builder.human_readable(value.as_bool().ok_or_else(|| {
                    TxError::validation(format!("Invalid humanReadable: {}", value))
                })?),
                "account" => builder.account(AccountKey::from_hex(json_str(value, key)?)?),
                "feePayer" => match json_str(value, key)? {
                    "0x" => builder,
                    address => builder.fee_payer(parse_address(address, "fee payer")?),
                },
                "signatures" => builder.signatures(SignatureData::list_from_json(value)?),
                "feePayerSignatures" => {
                    builder.fee_payer_signatures(SignatureData::list_from_json(value)?)
                }
                _ => builder,
            };
        }

        builder.build()
    }

    /// JSON field map accepted by [`Transaction::from_json`], plus `type`
    pub fn to_json(&self) -> Value {
        let mut map = Map::new();
        let quantity = |v: u128| Value::String(quantity_hex(v));

        map.insert("type".into(), Value::String(self.tx_type.name().into()));
        if let Some(from) = &self.from {
            map.insert("from".into(), Value::String(format_address(from)));
        }
        if let Some(to) = self.payload.to() {
            map.insert("to".into(), Value::String(format_address(to)));
        }
        if let Some(value) = self.payload.value() {
            map.insert("value".into(), quantity(value));
        }
        if let Some(input) = self.payload.input() {
            map.insert("input".into(), Value::String(encode_hex(input)));
        }
        if let TxPayload::SmartContractDeploy { human_readable, code_format, .. } = &self.payload {
            map.insert("humanReadable".into(), Value::Bool(*human_readable));
            map.insert("codeFormat".into(), quantity(u128::from(*code_format)));
        }
        if let Some(account) = self.payload.account() {
            map.insert("account".into(), Value::String(account.to_hex()));
        }

        map.insert("gas".into(), quantity(u128::from(self.gas)));
        if let Some(gas_price) = self.gas_price {
            map.insert("gasPrice".into(), quantity(gas_price));
        }
        if let Some(nonce) = self.nonce {
            map.insert("nonce".into(), quantity(u128::from(nonce)));
        }
        if let Some(chain_id) = self.chain_id {
            map.insert("chainId".into(), quantity(u128::from(chain_id)));
        }
        map.insert("signatures".into(), signature_list_json(&self.signatures));

        if let Some(fd) = &self.fee_delegation {
            if let Some(fee_payer) = &fd.fee_payer {
                map.insert("feePayer".into(), Value::String(format_address(fee_payer)));
            }
            map.insert(
                "feePayerSignatures".into(),
                signature_list_json(&fd.fee_payer_signatures),
            );
            if let Some(ratio) = fd.fee_ratio {
                map.insert("feeRatio".into(), quantity(u128::from(ratio.value())));
            }
        }

        Value::Object(map)
    }
}

fn json_str<'a>(value: &'a Value, key: &str) -> TxResult<&'a str> {
    value
        .as_str()
        .ok_or_else(|| TxError::validation(format!("Invalid {}: expected a string, got {}", key, value)))
}

fn signature_list_json(signatures: &[SignatureData]) -> Value {
    Value::Array(signatures.iter().map(SignatureData::to_json).collect())
}
