use anyhow::{Context, Result};
use serde::Deserialize;
use std::{fs, path::Path};

use poolrouter::shared::config::{DEFAULT_DEADLINE_SECS, DEFAULT_DISPLAY_DECIMALS};

/// Local node; it holds the account and signs `eth_sendTransaction`
pub const DEFAULT_RPC_URL: &str = "http://127.0.0.1:8545";
pub const DEFAULT_POLL_INTERVAL_MS: u64 = 1000;

#[derive(Debug, Clone, Deserialize)]
pub struct RpcCfg {
    pub url: String,
    #[serde(default = "default_poll_interval_ms")]
    pub poll_interval_ms: u64,
    /// Give up waiting for a receipt after this long; unset waits indefinitely
    pub confirmation_timeout_secs: Option<u64>,
}

impl Default for RpcCfg {
    fn default() -> Self {
        Self {
            url: DEFAULT_RPC_URL.to_string(),
            poll_interval_ms: DEFAULT_POLL_INTERVAL_MS,
            confirmation_timeout_secs: None,
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct AccountCfg {
    pub address: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct RouterCfg {
    pub address: String,
    pub factory: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct TradeCfg {
    #[serde(default = "default_deadline_secs")]
    pub deadline_secs: u64,
    #[serde(default = "default_display_decimals")]
    pub display_decimals: usize,
}

impl Default for TradeCfg {
    fn default() -> Self {
        Self {
            deadline_secs: DEFAULT_DEADLINE_SECS,
            display_decimals: DEFAULT_DISPLAY_DECIMALS,
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct TokenInfo {
    pub symbol: String,
    pub address: String,
    pub decimals: u8,
    pub name: Option<String>,
}

/// On-disk configuration. Every section is optional; missing ones fall back
/// to the reference deployment.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub rpc: RpcCfg,
    pub account: Option<AccountCfg>,
    pub router: Option<RouterCfg>,
    #[serde(default)]
    pub trade: TradeCfg,
    #[serde(default)]
    pub tokens: Vec<TokenInfo>,
}

impl Config {
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        let s = fs::read_to_string(path)
            .with_context(|| format!("read config {}", path.display()))?;
        let cfg: Self = toml::from_str(&s).context("parse config TOML")?;
        Ok(cfg)
    }
}

fn default_poll_interval_ms() -> u64 {
    DEFAULT_POLL_INTERVAL_MS
}

fn default_deadline_secs() -> u64 {
    DEFAULT_DEADLINE_SECS
}

fn default_display_decimals() -> usize {
    DEFAULT_DISPLAY_DECIMALS
}
