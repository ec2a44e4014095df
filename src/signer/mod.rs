//! Transaction Signing
//!
//! The transaction core never touches key material. It hands a 32-byte
//! hash, the chain id, a [`Role`](crate::account::Role) and a key index to a
//! [`TransactionSigner`] and appends whatever signatures come back.
//!
//! [`LocalKeyring`] is the in-process implementation, holding secp256k1
//! private keys per role.

pub mod types;
pub mod keyring;
pub mod flow;

#[cfg(test)]
mod tests;

pub use types::*;
pub use keyring::LocalKeyring;
