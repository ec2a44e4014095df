//! Hex string conversions shared by the account key and transaction layers
//!
//! All hex input may carry a `0x` prefix. Odd-length input is left-padded
//! with a zero nibble, matching how RPC nodes print quantities.

use crate::error::{TxError, TxResult};
use crate::utils::crypto::to_checksum_address;
use serde_json::Value;

pub fn strip_0x(s: &str) -> &str {
    s.strip_prefix("0x")
        .or_else(|| s.strip_prefix("0X"))
        .unwrap_or(s)
}

/// Decode a hex string into bytes. `"0x"` decodes to an empty vector.
pub fn decode_hex(s: &str) -> TxResult<Vec<u8>> {
    let body = strip_0x(s.trim());
    if body.len() % 2 == 1 {
        return Ok(hex::decode(format!("0{}", body))?);
    }
    Ok(hex::decode(body)?)
}

/// Encode bytes as a `0x`-prefixed lowercase hex string
pub fn encode_hex(bytes: &[u8]) -> String {
    format!("0x{}", hex::encode(bytes))
}

/// Encode an integer quantity as `0x`-prefixed minimal hex
pub fn quantity_hex(value: u128) -> String {
    format!("0x{:x}", value)
}

/// Parse a 20-byte address.
///
/// Mixed-case input must carry a valid EIP-55 checksum; all-lowercase and
/// all-uppercase input is accepted as is.
pub fn parse_address(s: &str, field: &str) -> TxResult<[u8; 20]> {
    let invalid = || TxError::validation(format!("Invalid address of {}: {}", field, s));

    if !(s.starts_with("0x") || s.starts_with("0X")) {
        return Err(invalid());
    }
    let body = strip_0x(s);
    if body.len() != 40 || !body.chars().all(|c| c.is_ascii_hexdigit()) {
        return Err(invalid());
    }

    let bytes = hex::decode(body).map_err(|_| invalid())?;
    let mut address = [0u8; 20];
    address.copy_from_slice(&bytes);

    let has_lower = body.chars().any(|c| c.is_ascii_lowercase());
    let has_upper = body.chars().any(|c| c.is_ascii_uppercase());
    if has_lower && has_upper && to_checksum_address(&address)[2..] != *body {
        return Err(invalid().with_details("checksum mismatch"));
    }

    Ok(address)
}

/// Lowercase `0x` form of an address
pub fn format_address(address: &[u8; 20]) -> String {
    encode_hex(address)
}

/// Parse a numeric quantity from a JSON number, a `0x` hex string, or a
/// decimal string.
pub fn parse_quantity(value: &Value, field: &str) -> TxResult<u128> {
    let invalid = || TxError::validation(format!("Invalid {}: {}", field, value));

    match value {
        Value::Number(n) => n.as_u64().map(u128::from).ok_or_else(invalid),
        Value::String(s) => parse_quantity_str(s).ok_or_else(invalid),
        _ => Err(invalid()),
    }
}

/// Parse a quantity string (`0x` hex or decimal)
pub fn parse_quantity_str(s: &str) -> Option<u128> {
    let s = s.trim();
    if s.starts_with("0x") || s.starts_with("0X") {
        let body = strip_0x(s);
        if body.is_empty() {
            return Some(0);
        }
        u128::from_str_radix(body, 16).ok()
    } else if !s.is_empty() && s.chars().all(|c| c.is_ascii_digit()) {
        s.parse::<u128>().ok()
    } else {
        None
    }
}

/// Like [`parse_quantity`] but bounded to `u64`
pub fn parse_quantity_u64(value: &Value, field: &str) -> TxResult<u64> {
    let wide = parse_quantity(value, field)?;
    u64::try_from(wide)
        .map_err(|_| TxError::validation(format!("Invalid {}: {} does not fit in 64 bits", field, value)))
}

/// Parse a JSON string field holding hex data
pub fn parse_hex_field(value: &Value, field: &str) -> TxResult<Vec<u8>> {
    match value {
        Value::String(s) => decode_hex(s)
            .map_err(|e| TxError::validation(format!("Invalid {}: {}", field, s)).with_details(e.message)),
        _ => Err(TxError::validation(format!("Invalid {}: expected a hex string", field))),
    }
}

/// Left-pad a big-endian byte string to 32 bytes
pub fn left_pad_32(bytes: &[u8]) -> TxResult<[u8; 32]> {
    if bytes.len() > 32 {
        return Err(TxError::validation(format!(
            "value is {} bytes long, at most 32 allowed",
            bytes.len()
        )));
    }
    let mut out = [0u8; 32];
    out[32 - bytes.len()..].copy_from_slice(bytes);
    Ok(out)
}
