//! RPC endpoint configuration

use super::provider::ProviderError;
use serde::{Deserialize, Deserializer};
use std::time::Duration;
use url::Url;

pub const ENV_RPC_URL: &str = "KLAYTN_RPC_URL";
pub const ENV_RPC_TIMEOUT_SECS: &str = "KLAYTN_RPC_TIMEOUT_SECS";

pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(30);

/// Where and how to reach a node
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RpcConfig {
    pub endpoint: Url,
    #[serde(default = "default_timeout", rename = "timeoutSecs", deserialize_with = "duration_from_secs")]
    pub timeout: Duration,
    /// Permit plain `http` to hosts other than loopback
    #[serde(default)]
    pub allow_insecure: bool,
}

fn default_timeout() -> Duration {
    DEFAULT_TIMEOUT
}

fn duration_from_secs<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Duration, D::Error> {
    u64::deserialize(deserializer).map(Duration::from_secs)
}

impl RpcConfig {
    pub fn new(endpoint: &str) -> Result<Self, ProviderError> {
        let endpoint = Url::parse(endpoint)
            .map_err(|e| ProviderError::Config(format!("invalid endpoint {}: {}", endpoint, e)))?;
        let config = Self {
            endpoint,
            timeout: DEFAULT_TIMEOUT,
            allow_insecure: false,
        };
        config.validate()?;
        Ok(config)
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    pub fn allow_insecure(mut self, allow: bool) -> Self {
        self.allow_insecure = allow;
        self
    }

    /// Read `KLAYTN_RPC_URL` and the optional `KLAYTN_RPC_TIMEOUT_SECS`
    pub fn from_env() -> Result<Self, ProviderError> {
        Self::from_lookup(|name| std::env::var(name).ok())
    }

    pub(crate) fn from_lookup<F>(lookup: F) -> Result<Self, ProviderError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let endpoint = lookup(ENV_RPC_URL)
            .ok_or_else(|| ProviderError::Config(format!("{} is not set", ENV_RPC_URL)))?;
        let mut config = Self::new(endpoint.trim())?;

        if let Some(secs) = lookup(ENV_RPC_TIMEOUT_SECS) {
            let secs: u64 = secs.trim().parse().map_err(|_| {
                ProviderError::Config(format!("{} must be a whole number of seconds", ENV_RPC_TIMEOUT_SECS))
            })?;
            config.timeout = Duration::from_secs(secs);
        }
        Ok(config)
    }

    /// Scheme and host checks; run again by the provider for deserialized configs
    pub fn validate(&self) -> Result<(), ProviderError> {
        match self.endpoint.scheme() {
            "https" => {}
            "http" if self.allow_insecure || self.is_loopback() => {}
            "http" => {
                return Err(ProviderError::Config(format!(
                    "plain http is only allowed for loopback hosts: {}",
                    self.endpoint
                )))
            }
            scheme => {
                return Err(ProviderError::Config(format!("unsupported scheme: {}", scheme)));
            }
        }

        if self.endpoint.host_str().is_none() {
            return Err(ProviderError::Config(format!("endpoint has no host: {}", self.endpoint)));
        }
        if self.timeout.is_zero() {
            return Err(ProviderError::Config("timeout must be positive".into()));
        }
        Ok(())
    }

    fn is_loopback(&self) -> bool {
        match self.endpoint.host() {
            Some(url::Host::Domain(domain)) => domain.eq_ignore_ascii_case("localhost"),
            Some(url::Host::Ipv4(ip)) => ip.is_loopback(),
            Some(url::Host::Ipv6(ip)) => ip.is_loopback(),
            None => false,
        }
    }
}
