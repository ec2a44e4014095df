//! Transaction wire codec
//!
//! Typed transactions are `tag || rlp([fields..., signatures])`, with the
//! fee-delegated types appending `feePayer, feePayerSignatures`. Legacy
//! transactions are a bare RLP list with a single `v, r, s` inline.
//!
//! Signing payloads never contain signatures:
//! - sender: `rlp([rlp([tag, fields...]), chainId, 0, 0])`
//! - fee payer: `rlp([rlp([tag, fields...]), feePayer, chainId, 0, 0])`
//! - legacy: `rlp([nonce, gasPrice, gas, to, value, input, chainId, 0, 0])`

use super::builder::TransactionBuilder;
use super::types::{
    Address, FeeRatio, SignatureData, Transaction, TxKind, TxPayload, TxType,
};
use crate::account::codec::strict_rlp;
use crate::account::AccountKey;
use crate::error::{TxError, TxResult};
use crate::utils::encoding::{decode_hex, encode_hex, left_pad_32};
use rlp::{Rlp, RlpStream};

/// `v` of the placeholder written for an empty signature list
const PLACEHOLDER_V: u64 = 1;

// === Integer and field helpers ===

/// Minimal big-endian bytes; zero is the empty string
fn uint_bytes(value: u128) -> Vec<u8> {
    let bytes = value.to_be_bytes();
    let start = bytes.iter().position(|&b| b != 0).unwrap_or(bytes.len());
    bytes[start..].to_vec()
}

fn append_uint(stream: &mut RlpStream, value: u128) {
    stream.append(&uint_bytes(value));
}

fn append_address(stream: &mut RlpStream, address: Option<&Address>) {
    match address {
        Some(address) => {
            stream.append(&address.to_vec());
        }
        None => {
            stream.append_empty_data();
        }
    }
}

fn append_signature(stream: &mut RlpStream, signature: &SignatureData) {
    stream.begin_list(3);
    append_uint(stream, u128::from(signature.v));
    stream.append(&signature.r.to_vec());
    stream.append(&signature.s.to_vec());
}

/// An empty list is written as `[[0x01, "", ""]]`
fn append_signature_list(stream: &mut RlpStream, signatures: &[SignatureData]) {
    if signatures.is_empty() {
        stream.begin_list(1);
        stream.begin_list(3);
        append_uint(stream, u128::from(PLACEHOLDER_V));
        stream.append_empty_data();
        stream.append_empty_data();
        return;
    }

    stream.begin_list(signatures.len());
    for signature in signatures {
        append_signature(stream, signature);
    }
}

/// Sequential reader over the items of a decoded RLP list
struct FieldReader<'a> {
    list: Rlp<'a>,
    index: usize,
    context: &'static str,
}

impl<'a> FieldReader<'a> {
    fn new(list: Rlp<'a>, context: &'static str) -> Self {
        Self { list, index: 0, context }
    }

    fn item(&mut self) -> TxResult<Rlp<'a>> {
        let item = self.list.at(self.index)?;
        self.index += 1;
        Ok(item)
    }

    fn bytes(&mut self) -> TxResult<Vec<u8>> {
        let item = self.item()?;
        if item.is_list() {
            return Err(TxError::decode(format!(
                "Invalid RLP-encoded {}: item {} must be a byte string",
                self.context,
                self.index - 1
            )));
        }
        Ok(item.data()?.to_vec())
    }

    fn uint(&mut self) -> TxResult<u128> {
        let bytes = self.bytes()?;
        decode_uint(&bytes).map_err(|e| e.with_details(format!("{} item {}", self.context, self.index - 1)))
    }

    fn u64(&mut self) -> TxResult<u64> {
        let value = self.uint()?;
        u64::try_from(value).map_err(|_| {
            TxError::decode(format!("Invalid RLP-encoded {}: integer does not fit in 64 bits", self.context))
        })
    }

    fn address(&mut self) -> TxResult<Address> {
        self.optional_address()?.ok_or_else(|| {
            TxError::decode(format!("Invalid RLP-encoded {}: address is empty", self.context))
        })
    }

    fn optional_address(&mut self) -> TxResult<Option<Address>> {
        let bytes = self.bytes()?;
        match bytes.len() {
            0 => Ok(None),
            20 => {
                let mut address = [0u8; 20];
                address.copy_from_slice(&bytes);
                Ok(Some(address))
            }
            n => Err(TxError::decode(format!(
                "Invalid RLP-encoded {}: address must be 20 bytes, got {}",
                self.context, n
            ))),
        }
    }

    fn signatures(&mut self) -> TxResult<Vec<SignatureData>> {
        let item = self.item()?;
        decode_signature_list(&item)
    }
}

fn decode_uint(bytes: &[u8]) -> TxResult<u128> {
    if bytes.len() > 16 {
        return Err(TxError::decode("Integer is longer than 128 bits"));
    }
    if bytes.first() == Some(&0) {
        return Err(TxError::decode("Integer has leading zero bytes"));
    }
    Ok(bytes.iter().fold(0u128, |acc, &b| (acc << 8) | u128::from(b)))
}

fn decode_scalar(bytes: &[u8]) -> TxResult<[u8; 32]> {
    left_pad_32(bytes).map_err(|e| TxError::decode(format!("Invalid signature scalar: {}", e.message)))
}

/// Decode a signature list, dropping placeholder entries
fn decode_signature_list(list: &Rlp<'_>) -> TxResult<Vec<SignatureData>> {
    if !list.is_list() {
        return Err(TxError::decode("Signatures must be an RLP list"));
    }

    let mut signatures = Vec::with_capacity(list.item_count()?);
    for entry in list.iter() {
        if !entry.is_list() || entry.item_count()? != 3 {
            return Err(TxError::decode("Signature must be a list of [v, r, s]"));
        }
        let mut reader = FieldReader::new(entry, "signature");
        let v = reader.u64()?;
        let r = reader.bytes()?;
        let s = reader.bytes()?;
        if r.is_empty() && s.is_empty() {
            continue;
        }
        signatures.push(SignatureData::new(v, decode_scalar(&r)?, decode_scalar(&s)?));
    }
    Ok(signatures)
}

/// Chain id carried by the first replay-protected signature
fn chain_id_from_signatures<'a>(signatures: impl IntoIterator<Item = &'a SignatureData>) -> Option<u64> {
    signatures.into_iter().find_map(SignatureData::chain_id)
}

/// Read the transaction type from the first byte of an encoding
pub fn detect_type(bytes: &[u8]) -> TxResult<TxType> {
    let first = *bytes
        .first()
        .ok_or_else(|| TxError::decode("Cannot decode an empty transaction"))?;

    if first >= 0xc0 {
        return Ok(TxType::Legacy);
    }
    match TxType::from_tag(first) {
        Some(tx_type) if !tx_type.is_legacy() => Ok(tx_type),
        _ => Err(TxError::decode(format!("Invalid transaction type: 0x{:02x}", first))),
    }
}

// === Encoding ===

struct Defaults {
    nonce: u64,
    gas_price: u128,
    chain_id: u64,
}

impl Transaction {
    /// `nonce`, `gasPrice` and `chainId` must be known before any encoding
    fn defaults(&self) -> TxResult<Defaults> {
        let nonce = self.nonce.ok_or_else(|| TxError::missing_field("nonce"))?;
        let gas_price = self.gas_price.ok_or_else(|| TxError::missing_field("gasPrice"))?;
        let chain_id = self.chain_id.ok_or_else(|| TxError::missing_field("chainId"))?;
        Ok(Defaults { nonce, gas_price, chain_id })
    }

    fn sender(&self) -> TxResult<&Address> {
        self.from.as_ref().ok_or_else(|| TxError::validation("\"from\" is missing"))
    }

    fn field_count(&self) -> usize {
        field_count(self.tx_type)
    }

    fn append_fields(&self, stream: &mut RlpStream, defaults: &Defaults) -> TxResult<()> {
        append_uint(stream, u128::from(defaults.nonce));
        append_uint(stream, defaults.gas_price);
        append_uint(stream, u128::from(self.gas));

        let fee_ratio = self.fee_ratio();
        let mut ratio_written = false;

        match &self.payload {
            TxPayload::Legacy { to, value, input } => {
                append_address(stream, to.as_ref());
                append_uint(stream, *value);
                stream.append(input);
            }
            TxPayload::ValueTransfer { to, value } => {
                stream.append(&to.to_vec());
                append_uint(stream, *value);
                stream.append(&self.sender()?.to_vec());
            }
            TxPayload::ValueTransferMemo { to, value, input }
            | TxPayload::SmartContractExecution { to, value, input } => {
                stream.append(&to.to_vec());
                append_uint(stream, *value);
                stream.append(&self.sender()?.to_vec());
                stream.append(input);
            }
            TxPayload::AccountUpdate { account } => {
                stream.append(&self.sender()?.to_vec());
                stream.append(&account.encode());
            }
            TxPayload::SmartContractDeploy { value, input, human_readable, code_format } => {
                stream.append_empty_data();
                append_uint(stream, *value);
                stream.append(&self.sender()?.to_vec());
                stream.append(input);
                append_uint(stream, u128::from(*human_readable));
                if let Some(ratio) = fee_ratio {
                    append_uint(stream, u128::from(ratio.value()));
                    ratio_written = true;
                }
                append_uint(stream, u128::from(*code_format));
            }
            TxPayload::Cancel => {
                stream.append(&self.sender()?.to_vec());
            }
            TxPayload::ChainDataAnchoring { input } => {
                stream.append(&self.sender()?.to_vec());
                stream.append(input);
            }
        }

        if let (Some(ratio), false) = (fee_ratio, ratio_written) {
            append_uint(stream, u128::from(ratio.value()));
        }
        Ok(())
    }

    /// Fully signed encoding; the bytes submitted to the network
    pub fn rlp_encoding(&self) -> TxResult<Vec<u8>> {
        let defaults = self.defaults()?;

        if self.tx_type.is_legacy() {
            let mut stream = RlpStream::new_list(9);
            self.append_fields(&mut stream, &defaults)?;
            match self.signatures.first() {
                Some(signature) => {
                    append_uint(&mut stream, u128::from(signature.v));
                    stream.append(&signature.r.to_vec());
                    stream.append(&signature.s.to_vec());
                }
                None => {
                    append_uint(&mut stream, u128::from(PLACEHOLDER_V));
                    stream.append_empty_data();
                    stream.append_empty_data();
                }
            }
            return Ok(stream.out().to_vec());
        }

        let fee_delegation = self.fee_delegation.as_ref();
        let items = self.field_count() + 1 + if fee_delegation.is_some() { 2 } else { 0 };

        let mut stream = RlpStream::new_list(items);
        self.append_fields(&mut stream, &defaults)?;
        append_signature_list(&mut stream, &self.signatures);
        if let Some(fd) = fee_delegation {
            append_address(&mut stream, fd.fee_payer.as_ref());
            append_signature_list(&mut stream, &fd.fee_payer_signatures);
        }

        let mut out = vec![self.tx_type.tag()];
        out.extend_from_slice(&stream.out());
        Ok(out)
    }

    /// `0x` hex of [`Transaction::rlp_encoding`]
    pub fn raw_transaction(&self) -> TxResult<String> {
        Ok(encode_hex(&self.rlp_encoding()?))
    }

    /// Encoding with the fee payer block removed: `tag || rlp([fields..., signatures])`
    pub(crate) fn sender_encoding(&self) -> TxResult<Vec<u8>> {
        if self.tx_type.is_legacy() || !self.tx_type.is_fee_delegated() {
            return self.rlp_encoding();
        }
        let defaults = self.defaults()?;

        let mut stream = RlpStream::new_list(self.field_count() + 1);
        self.append_fields(&mut stream, &defaults)?;
        append_signature_list(&mut stream, &self.signatures);

        let mut out = vec![self.tx_type.tag()];
        out.extend_from_slice(&stream.out());
        Ok(out)
    }

    /// `rlp([tag, fields...])`, shared by the sender and fee payer payloads
    pub fn common_rlp_encoding_for_signature(&self) -> TxResult<Vec<u8>> {
        if self.tx_type.is_legacy() {
            return Err(TxError::validation(
                "Legacy transactions have no common signing encoding",
            ));
        }
        let defaults = self.defaults()?;

        let mut stream = RlpStream::new_list(self.field_count() + 1);
        append_uint(&mut stream, u128::from(self.tx_type.tag()));
        self.append_fields(&mut stream, &defaults)?;
        Ok(stream.out().to_vec())
    }

    /// Payload the sender signs
    pub fn rlp_encoding_for_signature(&self) -> TxResult<Vec<u8>> {
        let defaults = self.defaults()?;

        if self.tx_type.is_legacy() {
            let mut stream = RlpStream::new_list(9);
            self.append_fields(&mut stream, &defaults)?;
            append_uint(&mut stream, u128::from(defaults.chain_id));
            stream.append_empty_data();
            stream.append_empty_data();
            return Ok(stream.out().to_vec());
        }

        let mut stream = RlpStream::new_list(4);
        stream.append(&self.common_rlp_encoding_for_signature()?);
        append_uint(&mut stream, u128::from(defaults.chain_id));
        stream.append_empty_data();
        stream.append_empty_data();
        Ok(stream.out().to_vec())
    }

    /// Payload the fee payer signs; only defined for fee-delegated types
    pub fn rlp_encoding_for_fee_payer_signature(&self) -> TxResult<Vec<u8>> {
        let fee_delegation = self.fee_delegation.as_ref().ok_or_else(|| {
            TxError::validation(format!(
                "{} transaction has no fee payer signature",
                self.tx_type
            ))
        })?;
        let defaults = self.defaults()?;

        let mut stream = RlpStream::new_list(5);
        stream.append(&self.common_rlp_encoding_for_signature()?);
        append_address(&mut stream, fee_delegation.fee_payer.as_ref());
        append_uint(&mut stream, u128::from(defaults.chain_id));
        stream.append_empty_data();
        stream.append_empty_data();
        Ok(stream.out().to_vec())
    }
}

// === Decoding ===

impl Transaction {
    /// Decode any supported transaction, detecting its type from the tag
    pub fn decode(bytes: &[u8]) -> TxResult<Self> {
        match detect_type(bytes)? {
            TxType::Legacy => decode_legacy(bytes),
            tx_type => decode_typed(tx_type, &bytes[1..]),
        }
    }

    /// Decode, failing with `TypeMismatch` unless the encoding is `expected`
    pub fn decode_as(expected: TxType, bytes: &[u8]) -> TxResult<Self> {
        let found = detect_type(bytes)?;
        if found != expected {
            return Err(TxError::type_mismatch(format!(
                "Cannot decode to {}. The type of the given transaction is {}",
                expected, found
            )));
        }
        Self::decode(bytes)
    }

    /// Decode a `0x` hex encoding
    pub fn from_raw_transaction(raw: &str) -> TxResult<Self> {
        let bytes = decode_hex(raw).map_err(|e| TxError::decode(e.message))?;
        Self::decode(&bytes)
    }
}

fn decode_legacy(bytes: &[u8]) -> TxResult<Transaction> {
    let list = strict_rlp(bytes)?;
    if !list.is_list() || list.item_count()? != 9 {
        return Err(TxError::decode(
            "Invalid RLP-encoded legacy transaction: expected 9 items",
        ));
    }

    let mut reader = FieldReader::new(list, "TxTypeLegacyTransaction");
    let nonce = reader.u64()?;
    let gas_price = reader.uint()?;
    let gas = reader.u64()?;
    let to = reader.optional_address()?;
    let value = reader.uint()?;
    let input = reader.bytes()?;
    let v = reader.u64()?;
    let r = reader.bytes()?;
    let s = reader.bytes()?;

    let mut builder = TransactionBuilder::new(TxType::Legacy)
        .nonce(nonce)
        .gas_price(gas_price)
        .gas(gas)
        .value(value)
        .input(input);
    if let Some(to) = to {
        builder = builder.to(to);
    }
    if !(r.is_empty() && s.is_empty()) {
        let signature = SignatureData::new(v, decode_scalar(&r)?, decode_scalar(&s)?);
        if let Some(chain_id) = signature.chain_id() {
            builder = builder.chain_id(chain_id);
        }
        builder = builder.signatures(vec![signature]);
    }

    builder.build()
}

fn decode_typed(tx_type: TxType, body: &[u8]) -> TxResult<Transaction> {
    let list = strict_rlp(body)?;
    let context = tx_type.name();

    let expected = expected_item_count(tx_type);
    if !list.is_list() || list.item_count()? != expected {
        return Err(TxError::decode(format!(
            "Invalid RLP-encoded {}: expected {} items",
            context, expected
        )));
    }

    let mut reader = FieldReader::new(list, context);
    let mut builder = TransactionBuilder::new(tx_type)
        .nonce(reader.u64()?)
        .gas_price(reader.uint()?)
        .gas(reader.u64()?);

    let mut ratio_read = false;
    builder = match tx_type.kind() {
        TxKind::ValueTransfer => {
            let to = reader.address()?;
            let value = reader.uint()?;
            builder.to(to).value(value).from(reader.address()?)
        }
        TxKind::ValueTransferMemo | TxKind::SmartContractExecution => {
            let to = reader.address()?;
            let value = reader.uint()?;
            let from = reader.address()?;
            builder.to(to).value(value).from(from).input(reader.bytes()?)
        }
        TxKind::AccountUpdate => {
            let from = reader.address()?;
            let account = AccountKey::decode(&reader.bytes()?)?;
            builder.from(from).account(account)
        }
        TxKind::SmartContractDeploy => {
            if reader.optional_address()?.is_some() {
                return Err(TxError::decode(format!(
                    "Invalid RLP-encoded {}: \"to\" must be empty",
                    context
                )));
            }
            let value = reader.uint()?;
            let from = reader.address()?;
            let input = reader.bytes()?;
            let human_readable = match reader.uint()? {
                0 => false,
                1 => true,
                other => {
                    return Err(TxError::decode(format!("Invalid humanReadable flag: {}", other)))
                }
            };
            builder = builder.value(value).from(from).input(input).human_readable(human_readable);
            if tx_type.has_fee_ratio() {
                builder = builder.fee_ratio(FeeRatio::new(reader.u64()?)?);
                ratio_read = true;
            }
            let code_format = u8::try_from(reader.uint()?)
                .map_err(|_| TxError::decode("Invalid codeFormat"))?;
            builder.code_format(code_format)
        }
        TxKind::Cancel => builder.from(reader.address()?),
        TxKind::ChainDataAnchoring => {
            let from = reader.address()?;
            builder.from(from).input(reader.bytes()?)
        }
        TxKind::Legacy => {
            return Err(TxError::internal("legacy transactions are not tagged"));
        }
    };

    if tx_type.has_fee_ratio() && !ratio_read {
        builder = builder.fee_ratio(FeeRatio::new(reader.u64()?)?);
    }

    let signatures = reader.signatures()?;
    let mut chain_id = chain_id_from_signatures(&signatures);
    builder = builder.signatures(signatures);

    if tx_type.is_fee_delegated() {
        if let Some(fee_payer) = reader.optional_address()? {
            builder = builder.fee_payer(fee_payer);
        }
        let fee_payer_signatures = reader.signatures()?;
        chain_id = chain_id.or_else(|| chain_id_from_signatures(&fee_payer_signatures));
        builder = builder.fee_payer_signatures(fee_payer_signatures);
    }

    if let Some(chain_id) = chain_id {
        builder = builder.chain_id(chain_id);
    }
    builder.build()
}

/// Number of type-specific fields, fee ratio included
fn field_count(tx_type: TxType) -> usize {
    let fields = match tx_type.kind() {
        TxKind::Legacy => 6,
        TxKind::ValueTransfer => 6,
        TxKind::ValueTransferMemo => 7,
        TxKind::AccountUpdate => 5,
        TxKind::SmartContractDeploy => 9,
        TxKind::SmartContractExecution => 7,
        TxKind::Cancel => 4,
        TxKind::ChainDataAnchoring => 5,
    };
    fields + usize::from(tx_type.has_fee_ratio())
}

/// Fields, sender signatures and the fee payer block if any
fn expected_item_count(tx_type: TxType) -> usize {
    let fee_payer_block = if tx_type.is_fee_delegated() { 2 } else { 0 };
    field_count(tx_type) + 1 + fee_payer_block
}
