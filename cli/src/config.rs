//! `chainbind.yaml` loading, with environment overrides.
//!
//! ```yaml
//! endpoint:
//!   http_url: https://eth.llamarpc.com
//!   ws_url: wss://eth.llamarpc.com
//!   request_timeout_ms: 30000
//! log:
//!   level: info
//!   components: { chainbind-rpc: debug }
//!   json: false
//! contracts:
//!   usdc:
//!     address: "0xA0b86991c6218b36c1D19D4a2e9Eb0cE3606eB48"
//!     abi: abis/erc20.json
//! ```
//!
//! `CHAINBIND_HTTP_URL`, `CHAINBIND_WS_URL` and `CHAINBIND_LOG_LEVEL`
//! override the file.

use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;

use anyhow::{bail, Context, Result};
use chainbind_core::Address;
use chainbind_observability::LogConfig;
use chainbind_rpc::{HttpClientConfig, HttpRpcClient, RpcEndpoint, WsClientConfig, WsRpcClient};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub endpoint: EndpointConfig,
    #[serde(default)]
    pub log: LogConfig,
    /// Named contracts: name → address + ABI file.
    #[serde(default)]
    pub contracts: HashMap<String, ContractConfig>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EndpointConfig {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub http_url: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub ws_url: Option<String>,
    #[serde(default = "default_timeout_ms")]
    pub request_timeout_ms: u64,
}

fn default_timeout_ms() -> u64 {
    30_000
}

impl Default for EndpointConfig {
    fn default() -> Self {
        Self {
            http_url: None,
            ws_url: None,
            request_timeout_ms: default_timeout_ms(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ContractConfig {
    pub address: String,
    pub abi: PathBuf,
}

impl Config {
    /// Read `path` if given (a missing default file is not an error), then
    /// apply environment overrides.
    pub fn load(path: Option<&Path>) -> Result<Self> {
        let mut config = match path {
            Some(p) => {
                let text = std::fs::read_to_string(p)
                    .with_context(|| format!("read config '{}'", p.display()))?;
                Self::from_yaml(&text).with_context(|| format!("parse config '{}'", p.display()))?
            }
            None => match std::fs::read_to_string("chainbind.yaml") {
                Ok(text) => Self::from_yaml(&text).context("parse config 'chainbind.yaml'")?,
                Err(_) => Self::default(),
            },
        };
        config.apply_env(|key| std::env::var(key).ok());
        Ok(config)
    }

    pub fn from_yaml(text: &str) -> Result<Self> {
        Ok(serde_yaml::from_str(text)?)
    }

    pub fn apply_env(&mut self, lookup: impl Fn(&str) -> Option<String>) {
        if let Some(url) = lookup("CHAINBIND_HTTP_URL") {
            self.endpoint.http_url = Some(url);
        }
        if let Some(url) = lookup("CHAINBIND_WS_URL") {
            self.endpoint.ws_url = Some(url);
        }
        if let Some(level) = lookup("CHAINBIND_LOG_LEVEL") {
            self.log.level = level;
        }
    }

    /// Resolve `target` (a configured name or a literal address) to an
    /// address and ABI JSON. `abi` overrides the configured ABI file.
    pub fn contract(&self, target: &str, abi: Option<&Path>) -> Result<(Address, String)> {
        let (address, configured_abi) = match self.contracts.get(target) {
            Some(c) => (c.address.as_str(), Some(c.abi.as_path())),
            None => (target, None),
        };
        let address: Address = address
            .parse()
            .with_context(|| format!("'{target}' is neither a configured contract nor an address"))?;

        let Some(abi_path) = abi.or(configured_abi) else {
            bail!("no ABI for '{target}'; pass --abi <path.json> or configure it");
        };
        let abi_json = std::fs::read_to_string(abi_path)
            .with_context(|| format!("read ABI file '{}'", abi_path.display()))?;
        Ok((address, abi_json))
    }

    /// Build the node endpoint. Subscriptions need `ws_url`.
    pub async fn connect(&self, pubsub: bool) -> Result<RpcEndpoint> {
        let ep = &self.endpoint;
        let ws = if pubsub || ep.http_url.is_none() {
            let Some(url) = ep.ws_url.as_deref() else {
                if pubsub {
                    bail!("watching requires a WebSocket endpoint; set endpoint.ws_url or CHAINBIND_WS_URL");
                }
                bail!("no endpoint configured; set CHAINBIND_HTTP_URL or endpoint.http_url");
            };
            Some(Arc::new(WsRpcClient::connect(url, WsClientConfig::default()).await?))
        } else {
            None
        };

        let endpoint = match (&ep.http_url, ws) {
            (Some(url), ws) => {
                let http = HttpRpcClient::new(
                    url.clone(),
                    HttpClientConfig {
                        request_timeout: Duration::from_millis(ep.request_timeout_ms),
                    },
                )?;
                let endpoint = RpcEndpoint::new(Arc::new(http));
                match ws {
                    Some(ws) => endpoint.with_pubsub(ws),
                    None => endpoint,
                }
            }
            (None, Some(ws)) => RpcEndpoint::new(ws),
            (None, None) => bail!("no endpoint configured"),
        };
        Ok(endpoint)
    }
}
