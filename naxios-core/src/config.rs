//! Configuration types

use crate::*;
use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Default cache entry lifetime (1 minute).
pub const DEFAULT_CACHE_EXPIRATION_SECS: u64 = 60;

/// Default interval between polling probes.
pub const DEFAULT_POLL_INTERVAL_MS: u64 = 200;

/// Default time a caller waits on another caller's in-flight read.
pub const DEFAULT_FETCHING_TIMEOUT_MS: u64 = 15_000;

/// Default HTTP timeout for a single RPC request.
pub const DEFAULT_REQUEST_TIMEOUT_SECS: u64 = 10;

/// Client configuration for a contract API.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ClientConfig {
    /// Account id of the contract every read and call targets.
    pub contract_id: String,
    pub network: Network,
    /// Custom primary RPC endpoint; the network default is used when absent.
    pub rpc_node_url: Option<String>,
    /// Endpoints tried, in order, after the primary one fails.
    pub fallback_rpc_urls: Vec<String>,
    /// Expiration applied to cached reads without a per-call override.
    pub default_expiration: Duration,
    /// Interval between probes while waiting on an in-flight read.
    pub poll_interval: Duration,
    /// How long a caller waits on an in-flight read before giving up.
    pub fetching_timeout: Duration,
    /// HTTP timeout for a single RPC request.
    pub request_timeout: Duration,
}

impl ClientConfig {
    /// Create a configuration with default timings.
    pub fn new(contract_id: impl Into<String>, network: Network) -> Self {
        Self {
            contract_id: contract_id.into(),
            network,
            rpc_node_url: None,
            fallback_rpc_urls: Vec::new(),
            default_expiration: Duration::from_secs(DEFAULT_CACHE_EXPIRATION_SECS),
            poll_interval: Duration::from_millis(DEFAULT_POLL_INTERVAL_MS),
            fetching_timeout: Duration::from_millis(DEFAULT_FETCHING_TIMEOUT_MS),
            request_timeout: Duration::from_secs(DEFAULT_REQUEST_TIMEOUT_SECS),
        }
    }

    /// Set a custom primary RPC endpoint.
    pub fn with_rpc_node_url(mut self, url: impl Into<String>) -> Self {
        self.rpc_node_url = Some(url.into());
        self
    }

    /// Set the fallback RPC endpoints.
    pub fn with_fallback_rpc_urls<I, S>(mut self, urls: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.fallback_rpc_urls = urls.into_iter().map(Into::into).collect();
        self
    }

    /// Set the default cache expiration.
    pub fn with_default_expiration(mut self, expiration: Duration) -> Self {
        self.default_expiration = expiration;
        self
    }

    /// Set the polling interval used while waiting on in-flight reads.
    pub fn with_poll_interval(mut self, interval: Duration) -> Self {
        self.poll_interval = interval;
        self
    }

    /// Set how long callers wait on an in-flight read.
    pub fn with_fetching_timeout(mut self, timeout: Duration) -> Self {
        self.fetching_timeout = timeout;
        self
    }

    /// Set the per-request HTTP timeout.
    pub fn with_request_timeout(mut self, timeout: Duration) -> Self {
        self.request_timeout = timeout;
        self
    }

    /// Create from environment variables with fallback to defaults.
    ///
    /// Environment variables:
    /// - `NAXIOS_CONTRACT_ID`: Contract account id (required)
    /// - `NAXIOS_NETWORK`: `mainnet`, `testnet` or `localnet` (default: testnet)
    /// - `NAXIOS_RPC_URL`: Custom primary RPC endpoint
    /// - `NAXIOS_FALLBACK_RPC_URLS`: Comma separated fallback endpoints
    /// - `NAXIOS_CACHE_EXPIRATION_SECS`: Default cache expiration (default: 60)
    /// - `NAXIOS_FETCHING_TIMEOUT_MS`: In-flight wait timeout (default: 15000)
    /// - `NAXIOS_REQUEST_TIMEOUT_SECS`: Per-request HTTP timeout (default: 10)
    pub fn from_env() -> NaxiosResult<Self> {
        let contract_id = std::env::var("NAXIOS_CONTRACT_ID").map_err(|_| {
            ConfigError::MissingRequired {
                field: "NAXIOS_CONTRACT_ID".to_string(),
            }
        })?;

        let network = match std::env::var("NAXIOS_NETWORK") {
            Ok(value) => value.parse::<Network>()?,
            Err(_) => Network::Testnet,
        };

        let mut config = Self::new(contract_id, network);

        config.rpc_node_url = std::env::var("NAXIOS_RPC_URL")
            .ok()
            .filter(|url| !url.trim().is_empty());

        config.fallback_rpc_urls = std::env::var("NAXIOS_FALLBACK_RPC_URLS")
            .map(|raw| {
                raw.split(',')
                    .map(str::trim)
                    .filter(|url| !url.is_empty())
                    .map(str::to_string)
                    .collect()
            })
            .unwrap_or_default();

        if let Some(secs) = std::env::var("NAXIOS_CACHE_EXPIRATION_SECS")
            .ok()
            .and_then(|s| s.parse().ok())
        {
            config.default_expiration = Duration::from_secs(secs);
        }

        if let Some(ms) = std::env::var("NAXIOS_FETCHING_TIMEOUT_MS")
            .ok()
            .and_then(|s| s.parse().ok())
        {
            config.fetching_timeout = Duration::from_millis(ms);
        }

        if let Some(secs) = std::env::var("NAXIOS_REQUEST_TIMEOUT_SECS")
            .ok()
            .and_then(|s| s.parse().ok())
        {
            config.request_timeout = Duration::from_secs(secs);
        }

        config.validate()?;
        Ok(config)
    }

    /// Ordered RPC endpoints: the primary endpoint first, then the fallbacks.
    ///
    /// Duplicates keep their first position.
    pub fn rpc_endpoints(&self) -> Vec<String> {
        let primary = self
            .rpc_node_url
            .clone()
            .unwrap_or_else(|| self.network.default_rpc_url().to_string());

        let mut endpoints = vec![primary];
        for url in &self.fallback_rpc_urls {
            if !endpoints.contains(url) {
                endpoints.push(url.clone());
            }
        }
        endpoints
    }

    /// Validate the configuration.
    ///
    /// Validates:
    /// - contract_id is non-empty
    /// - every RPC endpoint is an http(s) URL
    /// - poll_interval and request_timeout are positive
    pub fn validate(&self) -> NaxiosResult<()> {
        if self.contract_id.trim().is_empty() {
            return Err(NaxiosError::Config(ConfigError::MissingRequired {
                field: "contract_id".to_string(),
            }));
        }

        for url in self.rpc_endpoints() {
            if !(url.starts_with("http://") || url.starts_with("https://")) {
                return Err(NaxiosError::Config(ConfigError::InvalidValue {
                    field: "rpc_endpoints".to_string(),
                    value: url,
                    reason: "RPC endpoints must be http(s) URLs".to_string(),
                }));
            }
        }

        if self.poll_interval.is_zero() {
            return Err(NaxiosError::Config(ConfigError::InvalidValue {
                field: "poll_interval".to_string(),
                value: format!("{:?}", self.poll_interval),
                reason: "poll_interval must be positive".to_string(),
            }));
        }

        if self.request_timeout.is_zero() {
            return Err(NaxiosError::Config(ConfigError::InvalidValue {
                field: "request_timeout".to_string(),
                value: format!("{:?}", self.request_timeout),
                reason: "request_timeout must be positive".to_string(),
            }));
        }

        Ok(())
    }
}

// =============================================================================
// TESTS
// =============================================================================
