//! Utilities Module
//!
//! Common utilities used across the crate.

pub mod crypto;
pub mod encoding;
pub mod logging;

pub use crypto::*;
