//! Node access for transaction defaults
//!
//! `nonce`, `gasPrice` and `chainId` come from the chain. The
//! [`ChainDataProvider`] trait is the seam; [`JsonRpcProvider`] is the
//! JSON-RPC implementation and [`RpcConfig`] its configuration.

pub mod config;
pub mod provider;
pub mod fill;


pub use config::RpcConfig;
pub use provider::{ChainDataProvider, JsonRpcProvider, ProviderError};
