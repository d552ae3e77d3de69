// tests/ping_coordinator_tests.rs
//
// End-to-end scenarios for the ping coordinator driven through the public
// API, with providers standing in for real nodes.

use anyhow::bail;
use async_trait::async_trait;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tokio::time::{sleep, timeout};
use url::Url;

use virtual_node_agent::ping::{PingCoordinator, PingError};
use virtual_node_agent::provider::{HttpNodeProvider, NodeProvider};

/// Provider whose health can be flipped while the coordinator is running.
struct SwitchableProvider {
    healthy: AtomicBool,
    calls: AtomicUsize,
    delay: Duration,
}

impl SwitchableProvider {
    fn new(healthy: bool) -> Arc<Self> {
        Self::with_delay(healthy, Duration::ZERO)
    }

    fn with_delay(healthy: bool, delay: Duration) -> Arc<Self> {
        Arc::new(Self {
            healthy: AtomicBool::new(healthy),
            calls: AtomicUsize::new(0),
            delay,
        })
    }

    fn set_healthy(&self, healthy: bool) {
        self.healthy.store(healthy, Ordering::SeqCst);
    }

    fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl NodeProvider for SwitchableProvider {
    async fn probe(&self) -> anyhow::Result<()> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        if !self.delay.is_zero() {
            sleep(self.delay).await;
        }
        if self.healthy.load(Ordering::SeqCst) {
            Ok(())
        } else {
            bail!("node reports unhealthy")
        }
    }
}

#[tokio::test]
async fn test_query_hangs_until_the_caller_gives_up_when_run_never_starts() {
    let provider = SwitchableProvider::new(true);
    let coordinator = Arc::new(PingCoordinator::new(
        provider.clone(),
        Duration::from_secs(10),
        None,
        None,
    ));

    // Nobody called run, so the barrier can never open; the caller's own
    // deadline is the only way out.
    let waited = timeout(Duration::from_millis(80), coordinator.result()).await;
    assert!(waited.is_err());
    assert_eq!(provider.calls(), 0);
}

#[tokio::test]
async fn test_readers_before_and_after_the_first_ping_agree() {
    // A 40ms probe keeps the follow-up attempt far enough away that both
    // readers observe the first outcome.
    let provider = SwitchableProvider::with_delay(true, Duration::from_millis(40));
    let coordinator = Arc::new(PingCoordinator::new(
        provider,
        Duration::from_secs(3600),
        None,
        None,
    ));

    // Start a reader first, then the loop; both it and a late reader must
    // see the same first outcome.
    let early = {
        let coordinator = coordinator.clone();
        tokio::spawn(async move { coordinator.result().await })
    };
    sleep(Duration::from_millis(30)).await;
    tokio::spawn(coordinator.clone().run());

    let early_result = early.await.unwrap();
    let late_result = coordinator.result().await;
    assert!(early_result.is_healthy());
    assert!(late_result.is_healthy());
    assert_eq!(early_result.observed_at, late_result.observed_at);

    coordinator.shutdown();
}

#[tokio::test]
async fn test_recovery_is_visible_to_readers() {
    let provider = SwitchableProvider::new(false);
    let coordinator = Arc::new(PingCoordinator::new(
        provider.clone(),
        Duration::from_millis(25),
        Some(Duration::from_secs(1)),
        None,
    ));
    tokio::spawn(coordinator.clone().run());

    let first = coordinator.result().await;
    assert!(matches!(first.error, Some(PingError::Provider(_))));

    provider.set_healthy(true);
    sleep(Duration::from_millis(120)).await;

    let recovered = coordinator.result().await;
    assert!(recovered.is_healthy());
    assert!(recovered.observed_at.is_some());

    coordinator.shutdown();
}

#[tokio::test]
async fn test_http_provider_drives_the_coordinator() {
    let mut server = mockito::Server::new_async().await;
    // The first interval tick lands right after the manual first probe, so
    // the endpoint may be hit more than once before shutdown.
    let mock = server
        .mock("GET", "/healthz")
        .with_status(200)
        .with_body("OK")
        .expect_at_least(1)
        .create_async()
        .await;

    let endpoint = Url::parse(&format!("{}/healthz", server.url())).unwrap();
    let provider = Arc::new(HttpNodeProvider::new(endpoint).unwrap());
    let coordinator = Arc::new(PingCoordinator::new(
        provider,
        Duration::from_secs(3600),
        Some(Duration::from_secs(2)),
        None,
    ));
    tokio::spawn(coordinator.clone().run());

    let result = coordinator.result().await;
    assert!(result.is_healthy());
    mock.assert_async().await;

    coordinator.shutdown();
}

#[tokio::test]
async fn test_failing_http_endpoint_is_reported_not_retried() {
    let mut server = mockito::Server::new_async().await;
    let _mock = server
        .mock("GET", "/healthz")
        .with_status(500)
        .create_async()
        .await;

    let endpoint = Url::parse(&format!("{}/healthz", server.url())).unwrap();
    let provider = Arc::new(HttpNodeProvider::new(endpoint).unwrap());
    let coordinator = Arc::new(PingCoordinator::new(
        provider,
        Duration::from_secs(3600),
        Some(Duration::from_secs(2)),
        None,
    ));
    tokio::spawn(coordinator.clone().run());

    let result = coordinator.result().await;
    let err = result.error.expect("probe should have failed");
    assert!(err.to_string().contains("500"));
    // A failed attempt carries the completion timestamp; only interrupted
    // attempts go without one.
    assert!(result.observed_at.is_some());

    coordinator.shutdown();
}

#[tokio::test]
async fn test_shutdown_mid_wait_leaves_the_last_result_in_place() {
    let provider = SwitchableProvider::new(true);
    let coordinator = Arc::new(PingCoordinator::new(
        provider.clone(),
        Duration::from_millis(20),
        None,
        None,
    ));
    tokio::spawn(coordinator.clone().run());

    let before = coordinator.result().await;
    assert!(before.is_healthy());

    coordinator.shutdown();
    sleep(Duration::from_millis(60)).await;

    // Queries after shutdown answer from the stored result instead of
    // blocking, and with the loop stopped that result no longer changes.
    let after = timeout(Duration::from_millis(50), coordinator.result())
        .await
        .expect("query should answer immediately after shutdown");
    let again = coordinator.result().await;
    assert_eq!(after.observed_at, again.observed_at);
    assert_eq!(after.is_healthy(), again.is_healthy());
}

#[tokio::test]
async fn test_healthy_ticks_advance_the_observed_time() {
    let provider = SwitchableProvider::new(true);
    let coordinator = Arc::new(PingCoordinator::new(
        provider,
        Duration::from_millis(20),
        None,
        None,
    ));
    tokio::spawn(coordinator.clone().run());

    let mut last = coordinator
        .result()
        .await
        .observed_at
        .expect("healthy results carry a timestamp");

    // Sample across several ticks: timestamps never move backwards, and a
    // 45ms window over a 20ms cadence must produce fresh ones.
    let mut advances = 0;
    for _ in 0..6 {
        sleep(Duration::from_millis(45)).await;
        let next = coordinator
            .result()
            .await
            .observed_at
            .expect("healthy results carry a timestamp");
        assert!(next >= last, "observed_at moved backwards");
        if next > last {
            advances += 1;
        }
        last = next;
    }
    assert!(advances >= 3, "observed_at advanced only {advances} times");

    coordinator.shutdown();
}
