//! NEAR network selection

use crate::ConfigError;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Default RPC endpoint for mainnet.
pub const MAINNET_RPC_URL: &str = "https://rpc.mainnet.near.org";

/// Default RPC endpoint for testnet.
pub const TESTNET_RPC_URL: &str = "https://rpc.testnet.near.org";

/// Default RPC endpoint for a local node.
pub const LOCALNET_RPC_URL: &str = "http://localhost:3030";

/// The network a contract lives on.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Network {
    Mainnet,
    Testnet,
    Localnet,
}

impl Network {
    /// Name used in cache keys and configuration.
    pub fn as_str(&self) -> &'static str {
        match self {
            Network::Mainnet => "mainnet",
            Network::Testnet => "testnet",
            Network::Localnet => "localnet",
        }
    }

    /// The public RPC endpoint used when no custom URL is configured.
    pub fn default_rpc_url(&self) -> &'static str {
        match self {
            Network::Mainnet => MAINNET_RPC_URL,
            Network::Testnet => TESTNET_RPC_URL,
            Network::Localnet => LOCALNET_RPC_URL,
        }
    }
}

impl fmt::Display for Network {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Network {
    type Err = ConfigError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "mainnet" => Ok(Network::Mainnet),
            "testnet" => Ok(Network::Testnet),
            "localnet" => Ok(Network::Localnet),
            other => Err(ConfigError::InvalidValue {
                field: "network".to_string(),
                value: other.to_string(),
                reason: "expected one of mainnet, testnet, localnet".to_string(),
            }),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_network_round_trips_through_str() {
        for network in [Network::Mainnet, Network::Testnet, Network::Localnet] {
            let parsed: Network = network.as_str().parse().expect("network should parse");
            assert_eq!(parsed, network);
        }
    }

    #[test]
    fn test_network_parse_is_case_insensitive() {
        assert_eq!("MainNet".parse::<Network>(), Ok(Network::Mainnet));
    }

    #[test]
    fn test_network_parse_rejects_unknown() {
        let err = "betanet".parse::<Network>().expect_err("betanet is not supported");
        assert!(matches!(err, ConfigError::InvalidValue { ref field, .. } if field == "network"));
    }

    #[test]
    fn test_default_rpc_urls() {
        assert_eq!(Network::Mainnet.default_rpc_url(), "https://rpc.mainnet.near.org");
        assert_eq!(Network::Testnet.default_rpc_url(), "https://rpc.testnet.near.org");
        assert_eq!(Network::Localnet.default_rpc_url(), "http://localhost:3030");
    }
}
