//! Typed Transactions
//!
//! The transaction family: a legacy type plus seven business kinds, each in
//! a basic, fee-delegated and fee-delegated-with-ratio form.
//!
//! Lifecycle:
//! 1. Build with [`TransactionBuilder`] or [`Transaction::from_json`]
//! 2. Fill `nonce`, `gasPrice` and `chainId` (directly or through
//!    [`Transaction::fill_transaction`])
//! 3. Sign the payload from [`Transaction::hash_for_signature`] and append
//! 4. Optionally combine peer-signed copies with
//!    [`Transaction::combine_signatures`]
//! 5. Submit [`Transaction::raw_transaction`]

pub mod types;
pub mod builder;
pub mod codec;
pub mod hasher;
pub mod combine;

#[cfg(test)]
mod tests;

pub use types::*;
pub use builder::{TransactionBuilder, CODE_FORMAT_EVM};
pub use codec::detect_type;
