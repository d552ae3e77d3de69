// src/metrics/collector.rs
use anyhow::Result;
use prometheus::{
    Encoder, Histogram, HistogramOpts, IntCounterVec, IntGauge, Opts, Registry, TextEncoder,
};
use std::sync::Arc;
use tracing::error;

pub struct MetricsRegistry {
    registry: Registry,
    collector: Arc<MetricsCollector>,
}

impl MetricsRegistry {
    pub fn new() -> Result<Self> {
        let registry = Registry::new();
        let collector = Arc::new(MetricsCollector::new(&registry)?);

        Ok(Self {
            registry,
            collector,
        })
    }

    pub fn collector(&self) -> Arc<MetricsCollector> {
        self.collector.clone()
    }

    /// Render everything registered so far in the Prometheus text format.
    pub fn gather(&self) -> Vec<u8> {
        let encoder = TextEncoder::new();
        let metric_families = self.registry.gather();
        let mut buffer = Vec::new();
        if let Err(e) = encoder.encode(&metric_families, &mut buffer) {
            error!("Failed to encode metrics: {}", e);
        }
        buffer
    }
}

pub struct MetricsCollector {
    pub pings_total: IntCounterVec,
    pub ping_duration_seconds: Histogram,
    pub node_ready: IntGauge,
}

impl MetricsCollector {
    pub fn new(registry: &Registry) -> Result<Self> {
        let pings_total = IntCounterVec::new(
            Opts::new("node_pings_total", "Total node ping attempts by outcome"),
            &["outcome"],
        )?;
        registry.register(Box::new(pings_total.clone()))?;

        let ping_duration_seconds = Histogram::with_opts(HistogramOpts::new(
            "node_ping_duration_seconds",
            "Wall time of node ping attempts in seconds",
        ))?;
        registry.register(Box::new(ping_duration_seconds.clone()))?;

        let node_ready = IntGauge::new(
            "node_ready",
            "Whether the most recent node ping succeeded (1=ready)",
        )?;
        registry.register(Box::new(node_ready.clone()))?;

        Ok(Self {
            pings_total,
            ping_duration_seconds,
            node_ready,
        })
    }

    pub fn record_ping(&self, outcome: &str, duration: std::time::Duration) {
        self.pings_total.with_label_values(&[outcome]).inc();
        self.ping_duration_seconds.observe(duration.as_secs_f64());
    }

    pub fn set_node_ready(&self, ready: bool) {
        self.node_ready.set(if ready { 1 } else { 0 });
    }
}
