// src/provider/mod.rs
mod http;
mod tcp;

pub use http::HttpNodeProvider;
pub use tcp::TcpNodeProvider;

use anyhow::Result;
use async_trait::async_trait;

/// The node backend the coordinator watches.
///
/// `probe` answers one question: is the node behind this provider still
/// reachable right now. Cadence, deadlines, and result caching all live in
/// the caller; implementations should simply try once and report.
#[async_trait]
pub trait NodeProvider: Send + Sync + 'static {
    async fn probe(&self) -> Result<()>;
}
