//! Account Keys
//!
//! Models the on-ledger authorization policy of an account and its
//! canonical tagged encoding:
//!
//! | tag    | key                 | payload                                   |
//! |--------|---------------------|-------------------------------------------|
//! | `0x80` | Nil                 | none                                      |
//! | `0x01` | Legacy              | `rlp([])`                                 |
//! | `0x02` | Public              | `rlp(compressed_pubkey)`                  |
//! | `0x03` | Fail                | `rlp([])`                                 |
//! | `0x04` | WeightedMultiSig    | `rlp([threshold, [[weight, pubkey]..]])`  |
//! | `0x05` | RoleBased           | `rlp([encoded_key; 3])`                   |
//!
//! Threshold and weight invariants are enforced by the constructors of
//! [`WeightedMultiSig`], so every construction path (builder, decoder,
//! setter) goes through the same check.

pub mod types;
pub mod codec;


pub use types::*;
pub use codec::tag;
