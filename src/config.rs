use std::env;
use std::net::SocketAddr;
use std::str::FromStr;
use std::time::Duration;

use alloy::primitives::Address;
use rust_decimal::Decimal;
use secrecy::{ExposeSecret, SecretString};

use crate::credential::Credential;
use crate::error::ConfigError;
use crate::network::{Network, NetworkContext};

pub const DEFAULT_TIMEOUT_MS: u64 = 10_000;
pub const DEFAULT_READ_ATTEMPTS: usize = 3;
pub const DEFAULT_MARKET_SLIPPAGE: &str = "0.05";
pub const DEFAULT_LISTEN_ADDR: &str = "127.0.0.1:8080";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Transport {
    Stdio,
    Tcp(SocketAddr),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LogConfig {
    pub level: String,
    pub json: bool,
}

impl LogConfig {
    /// Never fails: logging must be up before anything else is reported.
    pub fn from_env() -> Self {
        let level = env::var("LOG_LEVEL")
            .or_else(|_| env::var("RUST_LOG"))
            .unwrap_or_else(|_| "info".to_string());
        let json = env::var("LOG_FORMAT")
            .map(|v| v.trim().eq_ignore_ascii_case("json"))
            .unwrap_or(false);
        LogConfig { level, json }
    }
}

#[derive(Debug, Clone)]
pub struct Config {
    pub network: NetworkContext,
    pub credential: Option<Credential>,
    /// Default address for account reads.
    pub account_address: Option<Address>,
    pub timeout: Duration,
    pub read_attempts: usize,
    pub market_slippage: Decimal,
    pub transport: Transport,
}

impl Config {
    pub fn from_env() -> Result<Self, ConfigError> {
        dotenv::dotenv().ok();
        Self::from_lookup(|name| env::var(name).ok())
    }

    /// Build from any variable source; `from_env` passes the process
    /// environment, tests pass a map.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let get = |name: &str| {
            lookup(name)
                .map(|v| v.trim().to_string())
                .filter(|v| !v.is_empty())
        };

        let mainnet = match get("HYPERLIQUID_MAINNET") {
            Some(raw) => parse_flag("HYPERLIQUID_MAINNET", &raw)?,
            None => false,
        };
        let network = if mainnet {
            Network::Mainnet
        } else {
            Network::Testnet
        };
        let network = match get("HYPERLIQUID_API_URL") {
            Some(url) => NetworkContext::with_endpoint(network, &url)?,
            None => NetworkContext::new(network),
        };

        let read_only = match get("HYPERLIQUID_READ_ONLY") {
            Some(raw) => parse_flag("HYPERLIQUID_READ_ONLY", &raw)?,
            None => false,
        };

        // 只读模式下也先校验私钥，再丢弃签名器，只保留地址用于查询
        let key_credential = match get("HYPERLIQUID_PRIVATE_KEY").map(SecretString::from) {
            Some(key) => Some(Credential::from_hex(key.expose_secret())?),
            None if read_only => None,
            None => return Err(ConfigError::MissingPrivateKey),
        };
        let key_address = key_credential.as_ref().map(Credential::address);
        let credential = if read_only { None } else { key_credential };

        let account_address = match get("HYPERLIQUID_ACCOUNT_ADDRESS") {
            Some(raw) => Some(Address::from_str(&raw).map_err(|e| {
                ConfigError::InvalidValue {
                    name: "HYPERLIQUID_ACCOUNT_ADDRESS",
                    reason: e.to_string(),
                }
            })?),
            None => key_address,
        };

        let timeout_ms = parse_or(
            "HYPERLIQUID_TIMEOUT_MS",
            get("HYPERLIQUID_TIMEOUT_MS"),
            DEFAULT_TIMEOUT_MS,
        )?;
        if timeout_ms == 0 {
            return Err(ConfigError::InvalidValue {
                name: "HYPERLIQUID_TIMEOUT_MS",
                reason: "must be greater than zero".to_string(),
            });
        }

        let read_attempts = parse_or(
            "HYPERLIQUID_READ_ATTEMPTS",
            get("HYPERLIQUID_READ_ATTEMPTS"),
            DEFAULT_READ_ATTEMPTS,
        )?
        .max(1);

        let slippage_raw = get("HYPERLIQUID_MARKET_SLIPPAGE")
            .unwrap_or_else(|| DEFAULT_MARKET_SLIPPAGE.to_string());
        let market_slippage =
            Decimal::from_str(&slippage_raw).map_err(|e| ConfigError::InvalidValue {
                name: "HYPERLIQUID_MARKET_SLIPPAGE",
                reason: e.to_string(),
            })?;
        if market_slippage < Decimal::ZERO || market_slippage >= Decimal::ONE {
            return Err(ConfigError::InvalidValue {
                name: "HYPERLIQUID_MARKET_SLIPPAGE",
                reason: format!("must be in [0, 1), got {}", market_slippage),
            });
        }

        let transport_raw = get("MCP_TRANSPORT").map(|v| v.to_ascii_lowercase());
        let transport = match transport_raw.as_deref() {
            None | Some("stdio") => Transport::Stdio,
            Some("tcp") => {
                let addr =
                    get("MCP_LISTEN_ADDR").unwrap_or_else(|| DEFAULT_LISTEN_ADDR.to_string());
                Transport::Tcp(addr.parse().map_err(|e| ConfigError::InvalidValue {
                    name: "MCP_LISTEN_ADDR",
                    reason: format!("{}: {}", addr, e),
                })?)
            }
            Some(other) => {
                return Err(ConfigError::InvalidValue {
                    name: "MCP_TRANSPORT",
                    reason: format!("expected 'stdio' or 'tcp', got '{}'", other),
                })
            }
        };

        Ok(Config {
            network,
            credential,
            account_address,
            timeout: Duration::from_millis(timeout_ms),
            read_attempts,
            market_slippage,
            transport,
        })
    }
}

fn parse_flag(name: &'static str, raw: &str) -> Result<bool, ConfigError> {
    match raw.to_ascii_lowercase().as_str() {
        "true" | "1" | "yes" | "on" => Ok(true),
        "false" | "0" | "no" | "off" => Ok(false),
        other => Err(ConfigError::InvalidValue {
            name,
            reason: format!("expected a boolean, got '{}'", other),
        }),
    }
}

fn parse_or<T>(name: &'static str, raw: Option<String>, default: T) -> Result<T, ConfigError>
where
    T: FromStr,
    T::Err: std::fmt::Display,
{
    match raw {
        Some(value) => value.parse::<T>().map_err(|e| ConfigError::InvalidValue {
            name,
            reason: format!("{}: {}", value, e),
        }),
        None => Ok(default),
    }
}
