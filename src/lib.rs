//! Klaytn Transaction Core
//!
//! Account keys, typed transactions and their signature lifecycle for
//! Klaytn clients.
//!
//! # Architecture
//!
//! This crate provides:
//! - **account**: account key model, weighted multisig validation and the
//!   tagged key encoding
//! - **transaction**: the 22 transaction types, their RLP encodings,
//!   signing payloads, hashes, and signature append/combine
//! - **signer**: the signing interface and an in-process keyring
//! - **rpc**: default filling (`nonce`, `gasPrice`, `chainId`) from a node
//!
//! # Security
//!
//! Private keys held by [`signer::LocalKeyring`] are zeroized on drop and
//! never appear in `Debug` output or log entries.
//!
//! # Example
//!
//! ```rust,ignore
//! use klaytn_tx::{LocalKeyring, Transaction, TxType};
//! use serde_json::json;
//!
//! let mut tx = Transaction::from_json(TxType::ValueTransfer, &json!({
//!     "from": "0xa94f5374fce5edbc8e2a8697c15331677e6ebf0b",
//!     "to": "0x7b65b75d204abed71587c9e519a89277766ee1d0",
//!     "value": "0xa",
//!     "gas": "0xf4240",
//! }))?;
//! tx.fill_transaction(&provider).await?;
//! tx.sign(&LocalKeyring::single(private_key)?, 0)?;
//! let raw = tx.raw_transaction()?;
//! ```

pub mod error;
pub mod utils;
pub mod account;
pub mod transaction;
pub mod signer;
pub mod rpc;

pub use error::{ErrorCode, TxError, TxResult};
pub use account::{AccountKey, PublicKey, Role, RoleBased, WeightedMultiSig, WeightedPublicKey};
pub use transaction::{
    detect_type, Address, FeeRatio, SignatureData, Transaction, TransactionBuilder, TxType,
};
pub use signer::{LocalKeyring, SignerError, TransactionSigner};
pub use rpc::{ChainDataProvider, JsonRpcProvider, ProviderError, RpcConfig};
