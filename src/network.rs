use std::fmt;

use url::Url;

use crate::error::ConfigError;

pub const MAINNET_API_URL: &str = "https://api.hyperliquid.xyz";
pub const TESTNET_API_URL: &str = "https://api.hyperliquid-testnet.xyz";

/// Chain id of the EIP-712 domain used for L1 action signing. It is the same
/// on both networks; the phantom agent source is what tells them apart.
pub const L1_SIGNING_CHAIN_ID: u64 = 1337;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Network {
    #[default]
    Testnet,
    Mainnet,
}

impl Network {
    pub fn is_mainnet(self) -> bool {
        matches!(self, Network::Mainnet)
    }

    pub fn default_api_url(self) -> &'static str {
        match self {
            Network::Mainnet => MAINNET_API_URL,
            Network::Testnet => TESTNET_API_URL,
        }
    }
}

impl fmt::Display for Network {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Network::Mainnet => write!(f, "mainnet"),
            Network::Testnet => write!(f, "testnet"),
        }
    }
}

/// Which exchange deployment every call of this process talks to.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NetworkContext {
    network: Network,
    base_endpoint: String,
}

impl NetworkContext {
    pub fn new(network: Network) -> Self {
        NetworkContext {
            network,
            base_endpoint: network.default_api_url().to_string(),
        }
    }

    /// Same network, different base endpoint (local mocks, proxies).
    pub fn with_endpoint(network: Network, endpoint: &str) -> Result<Self, ConfigError> {
        let parsed = Url::parse(endpoint).map_err(|e| ConfigError::InvalidValue {
            name: "HYPERLIQUID_API_URL",
            reason: format!("{}: {}", endpoint, e),
        })?;

        if !matches!(parsed.scheme(), "http" | "https") {
            return Err(ConfigError::InvalidValue {
                name: "HYPERLIQUID_API_URL",
                reason: format!("unsupported scheme '{}'", parsed.scheme()),
            });
        }

        Ok(NetworkContext {
            network,
            base_endpoint: parsed.as_str().trim_end_matches('/').to_string(),
        })
    }

    pub fn network(&self) -> Network {
        self.network
    }

    pub fn base_endpoint(&self) -> &str {
        &self.base_endpoint
    }

    pub fn info_url(&self) -> String {
        self.join("info")
    }

    pub fn exchange_url(&self) -> String {
        self.join("exchange")
    }

    /// Phantom agent source: "a" on mainnet, "b" on testnet.
    pub fn agent_source(&self) -> &'static str {
        if self.network.is_mainnet() {
            "a"
        } else {
            "b"
        }
    }

    pub fn signing_chain_id(&self) -> u64 {
        L1_SIGNING_CHAIN_ID
    }

    fn join(&self, path: &str) -> String {
        format!("{}/{}", self.base_endpoint.trim_end_matches('/'), path)
    }
}

impl fmt::Display for NetworkContext {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} ({})", self.network, self.base_endpoint)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_network_is_testnet() {
        assert_eq!(Network::default(), Network::Testnet);
    }

    #[test]
    fn test_endpoints_per_network() {
        let testnet = NetworkContext::new(Network::Testnet);
        assert_eq!(
            testnet.info_url(),
            "https://api.hyperliquid-testnet.xyz/info"
        );
        assert_eq!(testnet.agent_source(), "b");

        let mainnet = NetworkContext::new(Network::Mainnet);
        assert_eq!(mainnet.exchange_url(), "https://api.hyperliquid.xyz/exchange");
        assert_eq!(mainnet.agent_source(), "a");
        assert_eq!(mainnet.signing_chain_id(), 1337);
    }

    #[test]
    fn test_endpoint_override() {
        let ctx = NetworkContext::with_endpoint(Network::Testnet, "http://127.0.0.1:1234/").unwrap();
        assert_eq!(ctx.info_url(), "http://127.0.0.1:1234/info");
        assert_eq!(ctx.network(), Network::Testnet);
    }

    #[test]
    fn test_endpoint_override_rejects_garbage() {
        assert!(NetworkContext::with_endpoint(Network::Mainnet, "not a url").is_err());
        assert!(NetworkContext::with_endpoint(Network::Mainnet, "ftp://example.com").is_err());
    }
}
