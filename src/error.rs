//! Unified error types for the transaction core
//!
//! All errors flow through this module so that callers see one error
//! type no matter which layer (account key, codec, combine, signer,
//! provider) rejected the input.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Main error type for all transaction and account key operations
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TxError {
    pub code: ErrorCode,
    pub message: String,
    pub details: Option<String>,
}

impl TxError {
    pub fn new(code: ErrorCode, message: impl Into<String>) -> Self {
        Self {
            code,
            message: message.into(),
            details: None,
        }
    }

    pub fn with_details(mut self, details: impl Into<String>) -> Self {
        self.details = Some(details.into());
        self
    }

    // Convenience constructors
    pub fn validation(msg: impl Into<String>) -> Self {
        Self::new(ErrorCode::Validation, msg)
    }

    pub fn decode(msg: impl Into<String>) -> Self {
        Self::new(ErrorCode::Decode, msg)
    }

    pub fn type_mismatch(msg: impl Into<String>) -> Self {
        Self::new(ErrorCode::TypeMismatch, msg)
    }

    pub fn inconsistent(msg: impl Into<String>) -> Self {
        Self::new(ErrorCode::InconsistentTransaction, msg)
    }

    /// A field that the RPC filler is expected to provide is still unset.
    pub fn missing_field(field: &str) -> Self {
        Self::new(
            ErrorCode::MissingField,
            format!(
                "{} is undefined. Define {} in transaction or use 'fill_transaction' to fill values.",
                field, field
            ),
        )
    }

    pub fn unsupported_key(msg: impl Into<String>) -> Self {
        Self::new(ErrorCode::UnsupportedKey, msg)
    }

    pub fn type_error(msg: impl Into<String>) -> Self {
        Self::new(ErrorCode::TypeError, msg)
    }

    pub fn signing(msg: impl Into<String>) -> Self {
        Self::new(ErrorCode::Signing, msg)
    }

    pub fn network(msg: impl Into<String>) -> Self {
        Self::new(ErrorCode::Network, msg)
    }

    pub fn internal(msg: impl Into<String>) -> Self {
        Self::new(ErrorCode::Internal, msg)
    }

    pub fn is(&self, code: ErrorCode) -> bool {
        self.code == code
    }
}

impl fmt::Display for TxError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "[{:?}] {}", self.code, self.message)?;
        if let Some(ref details) = self.details {
            write!(f, " ({})", details)?;
        }
        Ok(())
    }
}

impl std::error::Error for TxError {}

/// Error codes for categorization
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ErrorCode {
    // Construction errors
    Validation,
    TypeError,

    // Wire errors
    Decode,
    TypeMismatch,

    // Lifecycle errors
    InconsistentTransaction,
    MissingField,

    // Key errors
    UnsupportedKey,
    Signing,

    // Collaborator errors
    Network,

    // Parse errors
    Json,
    Hex,

    // Internal
    Internal,
}

/// Result type alias for transaction operations
pub type TxResult<T> = Result<T, TxError>;

// Conversions from common error types

impl From<serde_json::Error> for TxError {
    fn from(e: serde_json::Error) -> Self {
        TxError::new(ErrorCode::Json, e.to_string())
    }
}

impl From<hex::FromHexError> for TxError {
    fn from(e: hex::FromHexError) -> Self {
        TxError::new(ErrorCode::Hex, e.to_string())
    }
}

impl From<rlp::DecoderError> for TxError {
    fn from(e: rlp::DecoderError) -> Self {
        TxError::new(ErrorCode::Decode, format!("RLP error: {}", e))
    }
}

impl From<secp256k1::Error> for TxError {
    fn from(e: secp256k1::Error) -> Self {
        TxError::new(ErrorCode::Validation, format!("Secp256k1 error: {}", e))
    }
}

impl From<reqwest::Error> for TxError {
    fn from(e: reqwest::Error) -> Self {
        if e.is_timeout() {
            TxError::new(ErrorCode::Network, "Request timed out")
        } else if e.is_connect() {
            TxError::new(ErrorCode::Network, "Connection failed")
        } else {
            TxError::new(ErrorCode::Network, e.to_string())
        }
    }
}
