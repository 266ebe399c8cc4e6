use anyhow::{bail, Context, Result};
use serde::{Deserialize, Serialize};
use std::{env, path::Path, time::Duration};
use tokio::fs;
use tracing::info;

pub const ENV_RPC_URL: &str = "AUCTION_RPC_URL";
pub const ENV_FACTORY: &str = "AUCTION_FACTORY";
pub const ENV_ACCOUNT: &str = "AUCTION_ACCOUNT";

fn default_receipt_poll_ms() -> u64 {
    500
}

fn default_receipt_timeout_ms() -> u64 {
    60_000
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RpcConfig {
    pub url: String,
    pub timeout_ms: u64,
    #[serde(default = "default_receipt_poll_ms")]
    pub receipt_poll_ms: u64,
    #[serde(default = "default_receipt_timeout_ms")]
    pub receipt_timeout_ms: u64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CollectionConfig {
    pub factory_address: String,
}

/// Sender for write calls. The node must hold the key (development chains).
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct AccountConfig {
    #[serde(default)]
    pub address: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ListingConfig {
    pub page_size: usize,
}

impl Default for ListingConfig {
    fn default() -> Self {
        Self { page_size: 5 }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DetailConfig {
    pub poll_interval_ms: u64,
}

impl Default for DetailConfig {
    fn default() -> Self {
        Self {
            poll_interval_ms: 2_000,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ClientConfig {
    pub rpc: RpcConfig,
    pub collection: CollectionConfig,
    #[serde(default)]
    pub account: AccountConfig,
    #[serde(default)]
    pub listing: ListingConfig,
    #[serde(default)]
    pub detail: DetailConfig,
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            rpc: RpcConfig {
                url: "http://127.0.0.1:8545".to_string(),
                timeout_ms: 10_000,
                receipt_poll_ms: default_receipt_poll_ms(),
                receipt_timeout_ms: default_receipt_timeout_ms(),
            },
            collection: CollectionConfig {
                factory_address: "0x5FbDB2315678afecb367f032d93F642f64180aa3".to_string(),
            },
            account: AccountConfig {
                address: "0xf39Fd6e51aad88F6F4ce6aB8827279cffFb92266".to_string(),
            },
            listing: ListingConfig::default(),
            detail: DetailConfig::default(),
        }
    }
}

impl ClientConfig {
    pub fn request_timeout(&self) -> Duration {
        Duration::from_millis(self.rpc.timeout_ms)
    }

    pub fn poll_interval(&self) -> Duration {
        Duration::from_millis(self.detail.poll_interval_ms.max(100))
    }

    pub fn validate(&self) -> Result<()> {
        if self.listing.page_size == 0 {
            bail!("listing.page_size must be at least 1");
        }
        if self.rpc.url.trim().is_empty() {
            bail!("rpc.url must not be empty");
        }
        url::Url::parse(&self.rpc.url)
            .with_context(|| format!("rpc.url is not a valid url: {}", self.rpc.url))?;
        if self.collection.factory_address.trim().is_empty() {
            bail!("collection.factory_address must not be empty");
        }
        Ok(())
    }

    fn apply_overrides<F>(&mut self, lookup: F)
    where
        F: Fn(&str) -> Option<String>,
    {
        if let Some(url) = lookup(ENV_RPC_URL) {
            self.rpc.url = url;
        }
        if let Some(factory) = lookup(ENV_FACTORY) {
            self.collection.factory_address = factory;
        }
        if let Some(account) = lookup(ENV_ACCOUNT) {
            self.account.address = account;
        }
    }
}

/// Reads the JSON config at `config_path`, falling back to defaults when the
/// file does not exist, then applies `AUCTION_*` environment overrides.
pub async fn load_config(config_path: &Path) -> Result<ClientConfig> {
    let mut cfg = if fs::try_exists(config_path).await.unwrap_or(false) {
        let raw = fs::read(config_path)
            .await
            .with_context(|| format!("read config file: {}", config_path.display()))?;
        serde_json::from_slice::<ClientConfig>(&raw).context("parse config json")?
    } else {
        info!(
            target: "config",
            "no config at {}, using defaults",
            config_path.display()
        );
        ClientConfig::default()
    };
    cfg.apply_overrides(|key| env::var(key).ok());
    cfg.validate()?;
    Ok(cfg)
}
