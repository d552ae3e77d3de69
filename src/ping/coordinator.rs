// src/ping/coordinator.rs
use crate::metrics::MetricsCollector;
use crate::ping::flight::FlightGroup;
use crate::ping::result::{PingError, PingResult};
use crate::provider::NodeProvider;
use chrono::Utc;
use std::sync::{Arc, Mutex, PoisonError};
use std::time::{Duration, Instant};
use tokio::sync::watch;
use tokio::time::{interval, sleep, MissedTickBehavior};
use tracing::{debug, error, info, warn};

/// Every attempt shares this key, so overlapping attempts coalesce into one
/// provider call.
const PING_FLIGHT_KEY: &str = "node-ping";

/// Periodically pings the node provider and keeps the latest outcome
/// available to concurrent readers.
///
/// A slow provider never stacks up calls: attempts that fire while an
/// earlier call is still running join it through the flight group, and an
/// attempt that hits its deadline records a timeout while the call keeps
/// running in the background.
pub struct PingCoordinator {
    provider: Arc<dyn NodeProvider>,
    interval: Duration,
    timeout: Option<Duration>,
    flight: FlightGroup<&'static str, PingResult>,
    current: Mutex<PingResult>,
    ready_tx: watch::Sender<bool>,
    ready_rx: watch::Receiver<bool>,
    shutdown_tx: watch::Sender<bool>,
    shutdown_rx: watch::Receiver<bool>,
    metrics: Option<Arc<MetricsCollector>>,
}

impl PingCoordinator {
    /// Panics if `interval` is zero or `timeout` is `Some(0)`; both describe
    /// a coordinator that could never run and are caller bugs.
    pub fn new(
        provider: Arc<dyn NodeProvider>,
        interval: Duration,
        timeout: Option<Duration>,
        metrics: Option<Arc<MetricsCollector>>,
    ) -> Self {
        if interval.is_zero() {
            panic!("Ping interval must be greater than zero");
        }
        if timeout.is_some_and(|t| t.is_zero()) {
            panic!("Ping timeout must be greater than zero when set");
        }

        let (ready_tx, ready_rx) = watch::channel(false);
        let (shutdown_tx, shutdown_rx) = watch::channel(false);

        Self {
            provider,
            interval,
            timeout,
            flight: FlightGroup::new(),
            current: Mutex::new(PingResult::default()),
            ready_tx,
            ready_rx,
            shutdown_tx,
            shutdown_rx,
            metrics,
        }
    }

    /// Drive the ping loop until `shutdown` is called.
    ///
    /// The first attempt runs before the cadence starts; only once its
    /// outcome is stored does the readiness barrier open, so readers never
    /// observe the initial placeholder result.
    pub async fn run(self: Arc<Self>) {
        info!(
            interval = ?self.interval,
            timeout = ?self.timeout,
            "Starting node ping loop"
        );

        self.probe_once().await;
        self.ready_tx.send_replace(true);

        let mut ticker = interval(self.interval);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
        let mut shutdown_rx = self.shutdown_rx.clone();

        loop {
            tokio::select! {
                _ = shutdown_rx.changed() => {
                    if *shutdown_rx.borrow() {
                        info!("Node ping loop shutting down");
                        break;
                    }
                }
                _ = ticker.tick() => {
                    self.probe_once().await;
                }
            }
        }
    }

    pub fn shutdown(&self) {
        let _ = self.shutdown_tx.send(true);
    }

    /// Whether the first attempt has completed and `result` would return
    /// without blocking.
    pub fn is_ready(&self) -> bool {
        *self.ready_rx.borrow()
    }

    /// Latest ping outcome, waiting for the first attempt to complete if it
    /// has not yet.
    ///
    /// There is no deadline here; callers that cannot wait indefinitely wrap
    /// this in their own `tokio::time::timeout`.
    pub async fn result(&self) -> PingResult {
        let mut ready = self.ready_rx.clone();
        // The barrier sender is a field of self, so the channel cannot close
        // while a caller holds a reference.
        let _ = ready.wait_for(|ready| *ready).await;

        let guard = self
            .current
            .lock()
            .unwrap_or_else(PoisonError::into_inner);
        guard.clone()
    }

    /// One probe attempt: join or start the shared provider call, then race
    /// its completion against the attempt deadline and shutdown.
    async fn probe_once(&self) {
        let started = Instant::now();

        let provider = self.provider.clone();
        let mut rx = self.flight.submit(PING_FLIGHT_KEY, move || async move {
            let outcome = provider.probe().await;
            let observed_at = Utc::now();
            match outcome {
                Ok(()) => PingResult::healthy(observed_at),
                Err(e) => PingResult::failed(observed_at, PingError::Provider(Arc::new(e))),
            }
        });

        let deadline = async {
            match self.timeout {
                Some(t) => {
                    sleep(t).await;
                    t
                }
                None => std::future::pending::<Duration>().await,
            }
        };

        let mut shutdown_rx = self.shutdown_rx.clone();

        let result = tokio::select! {
            received = rx.recv() => match received {
                Ok(result) => result,
                Err(_) => {
                    error!("Ping flight dropped its result channel");
                    PingResult::interrupted(PingError::Provider(Arc::new(anyhow::anyhow!(
                        "Ping task aborted before reporting a result"
                    ))))
                }
            },
            elapsed = deadline => {
                warn!(
                    timeout = ?elapsed,
                    "Ping attempt timed out; the provider call continues in the background"
                );
                PingResult::interrupted(PingError::Timeout(elapsed))
            }
            _ = shutdown_rx.wait_for(|stop| *stop) => {
                debug!("Ping attempt interrupted by shutdown");
                PingResult::interrupted(PingError::Cancelled)
            }
        };

        match &result.error {
            None => debug!("Node ping succeeded"),
            Some(err) => warn!(error = %err, "Node ping failed"),
        }

        if let Some(metrics) = &self.metrics {
            let outcome = match &result.error {
                None => "success",
                Some(PingError::Provider(_)) => "provider_error",
                Some(PingError::Timeout(_)) => "timeout",
                Some(PingError::Cancelled) => "cancelled",
            };
            metrics.record_ping(outcome, started.elapsed());
            metrics.set_node_ready(result.is_healthy());
        }

        let mut guard = self
            .current
            .lock()
            .unwrap_or_else(PoisonError::into_inner);
        *guard = result;
    }
}
