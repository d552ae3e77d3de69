// src/provider/tcp.rs
use super::NodeProvider;
use anyhow::{Context, Result};
use async_trait::async_trait;
use std::net::SocketAddr;
use tokio::io::AsyncWriteExt;
use tokio::net::TcpStream;

/// Probes a node by opening (and immediately closing) a TCP connection to
/// its service port. Useful for nodes that expose no HTTP surface.
pub struct TcpNodeProvider {
    addr: SocketAddr,
}

impl TcpNodeProvider {
    pub fn new(addr: SocketAddr) -> Self {
        Self { addr }
    }
}

#[async_trait]
impl NodeProvider for TcpNodeProvider {
    async fn probe(&self) -> Result<()> {
        let mut stream = TcpStream::connect(self.addr)
            .await
            .with_context(|| format!("Failed to connect to {}", self.addr))?;
        let _ = stream.shutdown().await;
        Ok(())
    }
}
