// src/provider/http.rs
use super::NodeProvider;
use anyhow::{bail, Context, Result};
use async_trait::async_trait;
use reqwest::Client;
use std::time::Duration;
use url::Url;

/// Probes a node's HTTP health endpoint; any non-success status counts as a
/// failed probe.
pub struct HttpNodeProvider {
    endpoint: Url,
    client: Client,
}

impl HttpNodeProvider {
    pub fn new(endpoint: Url) -> Result<Self> {
        // Only a connect timeout: the overall deadline belongs to whoever
        // schedules the probe.
        let client = Client::builder()
            .connect_timeout(Duration::from_secs(5))
            .build()
            .context("Failed to create HTTP client")?;

        Ok(Self { endpoint, client })
    }
}

#[async_trait]
impl NodeProvider for HttpNodeProvider {
    async fn probe(&self) -> Result<()> {
        let response = self
            .client
            .get(self.endpoint.as_str())
            .send()
            .await
            .with_context(|| format!("Health request to {} failed", self.endpoint))?;

        let status = response.status();
        if !status.is_success() {
            bail!("Health endpoint {} returned HTTP {}", self.endpoint, status);
        }
        Ok(())
    }
}
