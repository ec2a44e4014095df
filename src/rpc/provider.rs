//! Chain data lookups

use super::config::RpcConfig;
use crate::error::{ErrorCode, TxError};
use crate::transaction::Address;
use crate::utils::encoding::{format_address, parse_quantity_str};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use thiserror::Error;

/// Node queries needed to fill transaction defaults
#[allow(async_fn_in_trait)]
pub trait ChainDataProvider {
    async fn get_gas_price(&self) -> Result<u128, ProviderError>;

    /// Pending transaction count of `address`
    async fn get_transaction_count(&self, address: &Address) -> Result<u64, ProviderError>;

    async fn get_chain_id(&self) -> Result<u64, ProviderError>;
}

#[derive(Debug, Error)]
pub enum ProviderError {
    #[error("Invalid RPC configuration: {0}")]
    Config(String),

    #[error("HTTP request failed: {0}")]
    Http(#[from] reqwest::Error),

    #[error("RPC error {code}: {message}")]
    Rpc { code: i64, message: String },

    #[error("Invalid RPC response: {0}")]
    InvalidResponse(String),
}

impl From<ProviderError> for TxError {
    fn from(e: ProviderError) -> Self {
        let code = match &e {
            ProviderError::Config(_) => ErrorCode::Validation,
            _ => ErrorCode::Network,
        };
        TxError::new(code, e.to_string())
    }
}

#[derive(Serialize)]
struct RpcRequest<'a> {
    jsonrpc: &'static str,
    method: &'a str,
    params: Vec<Value>,
    id: u64,
}

#[derive(Deserialize)]
struct RpcResponse {
    result: Option<Value>,
    error: Option<RpcErrorBody>,
}

#[derive(Deserialize)]
struct RpcErrorBody {
    code: i64,
    message: String,
}

/// [`ChainDataProvider`] over a node's JSON-RPC endpoint
#[derive(Debug, Clone)]
pub struct JsonRpcProvider {
    config: RpcConfig,
    client: reqwest::Client,
}

impl JsonRpcProvider {
    pub fn new(config: RpcConfig) -> Result<Self, ProviderError> {
        config.validate()?;
        let client = reqwest::Client::builder()
            .timeout(config.timeout)
            .user_agent(concat!("klaytn-tx/", env!("CARGO_PKG_VERSION")))
            .build()?;
        Ok(Self { config, client })
    }

    pub fn config(&self) -> &RpcConfig {
        &self.config
    }

    async fn call(&self, method: &str, params: Vec<Value>) -> Result<Value, ProviderError> {
        let request = RpcRequest {
            jsonrpc: "2.0",
            method,
            params,
            id: 1,
        };

        let response: RpcResponse = self
            .client
            .post(self.config.endpoint.clone())
            .json(&request)
            .send()
            .await?
            .error_for_status()?
            .json()
            .await?;

        into_result(method, response)
    }

    async fn call_quantity(&self, method: &str, params: Vec<Value>) -> Result<u128, ProviderError> {
        let result = self.call(method, params).await?;
        parse_quantity_result(method, &result)
    }
}

fn into_result(method: &str, response: RpcResponse) -> Result<Value, ProviderError> {
    if let Some(error) = response.error {
        return Err(ProviderError::Rpc {
            code: error.code,
            message: error.message,
        });
    }
    response
        .result
        .ok_or_else(|| ProviderError::InvalidResponse(format!("{} returned no result", method)))
}

/// Node quantities arrive as `0x` hex strings
pub(crate) fn parse_quantity_result(method: &str, result: &Value) -> Result<u128, ProviderError> {
    result
        .as_str()
        .filter(|s| s.starts_with("0x"))
        .and_then(parse_quantity_str)
        .ok_or_else(|| ProviderError::InvalidResponse(format!("{} returned {}", method, result)))
}

fn narrow(method: &str, value: u128) -> Result<u64, ProviderError> {
    u64::try_from(value)
        .map_err(|_| ProviderError::InvalidResponse(format!("{} result out of range: {}", method, value)))
}

impl ChainDataProvider for JsonRpcProvider {
    async fn get_gas_price(&self) -> Result<u128, ProviderError> {
        self.call_quantity("klay_gasPrice", vec![]).await
    }

    async fn get_transaction_count(&self, address: &Address) -> Result<u64, ProviderError> {
        let params = vec![Value::String(format_address(address)), Value::String("pending".into())];
        let count = self.call_quantity("klay_getTransactionCount", params).await?;
        narrow("klay_getTransactionCount", count)
    }

    async fn get_chain_id(&self) -> Result<u64, ProviderError> {
        let chain_id = self.call_quantity("klay_chainID", vec![]).await?;
        narrow("klay_chainID", chain_id)
    }
}

#[cfg(test)]
pub(crate) fn decode_response(method: &str, body: &str) -> Result<Value, ProviderError> {
    let response: RpcResponse = serde_json::from_str(body)
        .map_err(|e| ProviderError::InvalidResponse(e.to_string()))?;
    into_result(method, response)
}
