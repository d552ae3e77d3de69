// src/ping/result.rs
use chrono::{DateTime, Utc};
use std::sync::Arc;
use std::time::Duration;

/// Failures are broadcast to every coalesced waiter, so they are wrapped in
/// `Arc` to stay clonable.
pub type SharedError = Arc<anyhow::Error>;

#[derive(Debug, Clone, thiserror::Error)]
pub enum PingError {
    #[error("Provider ping failed: {0}")]
    Provider(SharedError),

    #[error("Ping timed out after {0:?}")]
    Timeout(Duration),

    #[error("Ping cancelled by shutdown")]
    Cancelled,
}

/// Outcome of the most recent ping attempt.
///
/// `observed_at` is set when a provider call actually finished, regardless of
/// whether it succeeded. An attempt that was cut off by its deadline or by
/// shutdown never saw the call complete, so it carries no timestamp.
#[derive(Debug, Clone, Default)]
pub struct PingResult {
    pub observed_at: Option<DateTime<Utc>>,
    pub error: Option<PingError>,
}

impl PingResult {
    pub fn healthy(observed_at: DateTime<Utc>) -> Self {
        Self {
            observed_at: Some(observed_at),
            error: None,
        }
    }

    pub fn failed(observed_at: DateTime<Utc>, error: PingError) -> Self {
        Self {
            observed_at: Some(observed_at),
            error: Some(error),
        }
    }

    pub fn interrupted(error: PingError) -> Self {
        Self {
            observed_at: None,
            error: Some(error),
        }
    }

    pub fn is_healthy(&self) -> bool {
        self.error.is_none()
    }
}
