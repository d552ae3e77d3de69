// src/config/models.rs
use anyhow::{bail, Result};
use serde::{Deserialize, Serialize};
use std::net::SocketAddr;
use std::time::Duration;
use url::Url;

/// Top-level daemon configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    pub node: NodeConfig,
    pub ping: PingConfig,
    #[serde(default)]
    pub admin: AdminConfig,
}

/// Which kind of node backend to probe.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum NodeConfig {
    Http { endpoint: Url },
    Tcp { addr: SocketAddr },
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PingConfig {
    /// Seconds between ping attempts.
    pub interval_secs: u64,
    /// Per-attempt deadline in milliseconds; omit to wait on the provider
    /// indefinitely.
    #[serde(default)]
    pub timeout_ms: Option<u64>,
}

impl PingConfig {
    pub fn interval(&self) -> Duration {
        Duration::from_secs(self.interval_secs)
    }

    pub fn timeout(&self) -> Option<Duration> {
        self.timeout_ms.map(Duration::from_millis)
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AdminConfig {
    pub enabled: bool,
    pub port: u16,
}

impl Default for AdminConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            port: 9090,
        }
    }
}

impl Config {
    /// Reject values the ping coordinator would refuse at construction.
    pub fn validate(&self) -> Result<()> {
        if self.ping.interval_secs == 0 {
            bail!("ping.interval_secs must be greater than zero");
        }
        if self.ping.timeout_ms == Some(0) {
            bail!("ping.timeout_ms must be greater than zero when set");
        }
        Ok(())
    }
}
