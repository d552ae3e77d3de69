// src/resources/store.rs
use super::objects::{Keyed, ObjectKey};
use anyhow::{anyhow, Result};
use async_trait::async_trait;
use dashmap::DashMap;
use std::sync::Arc;
use tokio::sync::{broadcast, watch};
use tracing::{debug, warn};

/// A single change reported by an object source.
#[derive(Debug, Clone)]
pub enum WatchEvent<T> {
    Put(T),
    Delete(ObjectKey),
}

/// Where cached objects come from: a snapshot that seeds the cache and a
/// stream of the changes that follow it.
#[async_trait]
pub trait ObjectSource<T>: Send + Sync + 'static {
    async fn snapshot(&self) -> Result<Vec<T>>;
    fn events(&self) -> broadcast::Receiver<WatchEvent<T>>;
}

/// Local cache of one object kind, kept current by a background task that
/// seeds from the source snapshot and then applies its watch events.
///
/// Readers see whatever the cache holds at the moment; `wait_synced` is the
/// only ordering guarantee on offer, marking that the initial snapshot has
/// been fully applied.
pub struct WatchedStore<T> {
    items: Arc<DashMap<ObjectKey, Arc<T>>>,
    synced_rx: watch::Receiver<bool>,
}

impl<T> WatchedStore<T>
where
    T: Keyed + Clone + Send + Sync + 'static,
{
    /// Start a store syncing from `source`.
    ///
    /// The sync task owns the synced flag's sender; if the snapshot fails,
    /// the task exits and drops it, which `wait_synced` reports as an error
    /// instead of blocking forever.
    pub fn with_source(source: Arc<dyn ObjectSource<T>>) -> Self {
        let (synced_tx, synced_rx) = watch::channel(false);
        let items: Arc<DashMap<ObjectKey, Arc<T>>> = Arc::new(DashMap::new());

        let cache = items.clone();
        tokio::spawn(async move {
            // Subscribe before taking the snapshot so no event is missed in
            // between.
            let mut events = source.events();

            match source.snapshot().await {
                Ok(objects) => {
                    debug!(count = objects.len(), "Applied initial snapshot");
                    for obj in objects {
                        cache.insert(obj.key(), Arc::new(obj));
                    }
                }
                Err(e) => {
                    warn!(error = %e, "Initial snapshot failed; store stays unsynced");
                    return;
                }
            }
            synced_tx.send_replace(true);

            loop {
                match events.recv().await {
                    Ok(WatchEvent::Put(obj)) => {
                        cache.insert(obj.key(), Arc::new(obj));
                    }
                    Ok(WatchEvent::Delete(key)) => {
                        cache.remove(&key);
                    }
                    Err(broadcast::error::RecvError::Lagged(missed)) => {
                        warn!(missed, "Watch stream lagged; cache may be stale");
                    }
                    Err(broadcast::error::RecvError::Closed) => {
                        debug!("Watch stream closed");
                        break;
                    }
                }
            }
        });

        Self { items, synced_rx }
    }

    /// Block until the initial snapshot has been applied. No deadline;
    /// callers decide how long they are willing to wait.
    pub async fn wait_synced(&self) -> Result<()> {
        let mut synced = self.synced_rx.clone();
        synced
            .wait_for(|synced| *synced)
            .await
            .map(|_| ())
            .map_err(|_| anyhow!("Object source failed before completing its initial sync"))
    }

    pub fn is_synced(&self) -> bool {
        *self.synced_rx.borrow()
    }

    pub fn get(&self, key: &ObjectKey) -> Option<Arc<T>> {
        self.items.get(key).map(|entry| entry.value().clone())
    }

    pub fn list(&self) -> Vec<Arc<T>> {
        self.items.iter().map(|entry| entry.value().clone()).collect()
    }
}

/// In-memory source seeded with a fixed object set; tests inject further
/// changes through `publish`.
pub struct FakeSource<T> {
    objects: Vec<T>,
    events_tx: broadcast::Sender<WatchEvent<T>>,
}

impl<T: Clone> FakeSource<T> {
    pub fn new(objects: Vec<T>) -> Self {
        let (events_tx, _) = broadcast::channel(16);
        Self { objects, events_tx }
    }

    pub fn publish(&self, event: WatchEvent<T>) {
        let _ = self.events_tx.send(event);
    }
}

#[async_trait]
impl<T> ObjectSource<T> for FakeSource<T>
where
    T: Keyed + Clone + Send + Sync + 'static,
{
    async fn snapshot(&self) -> Result<Vec<T>> {
        Ok(self.objects.clone())
    }

    fn events(&self) -> broadcast::Receiver<WatchEvent<T>> {
        self.events_tx.subscribe()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::resources::objects::ComputeUnit;
    use anyhow::bail;
    use std::time::Duration;
    use tokio::time::sleep;

    struct BrokenSource;

    #[async_trait]
    impl ObjectSource<ComputeUnit> for BrokenSource {
        async fn snapshot(&self) -> Result<Vec<ComputeUnit>> {
            bail!("source unavailable");
        }

        fn events(&self) -> broadcast::Receiver<WatchEvent<ComputeUnit>> {
            let (tx, rx) = broadcast::channel(1);
            drop(tx);
            rx
        }
    }

    #[tokio::test]
    async fn test_snapshot_seeds_the_cache() {
        let source = Arc::new(FakeSource::new(vec![
            ComputeUnit::new("default", "web-0", "nginx:1.25"),
            ComputeUnit::new("default", "web-1", "nginx:1.25"),
        ]));
        let store = WatchedStore::with_source(source);

        store.wait_synced().await.unwrap();
        assert!(store.is_synced());
        assert_eq!(store.list().len(), 2);
        assert!(store.get(&ObjectKey::new("default", "web-0")).is_some());
        assert!(store.get(&ObjectKey::new("default", "missing")).is_none());
    }

    #[tokio::test]
    async fn test_watch_events_update_the_cache() {
        let source = Arc::new(FakeSource::new(vec![ComputeUnit::new(
            "default", "web-0", "nginx:1.25",
        )]));
        let store = WatchedStore::with_source(source.clone());
        store.wait_synced().await.unwrap();

        source.publish(WatchEvent::Put(ComputeUnit::new(
            "default", "web-1", "nginx:1.25",
        )));
        source.publish(WatchEvent::Delete(ObjectKey::new("default", "web-0")));

        // Delivery runs on the sync task; give it a moment.
        sleep(Duration::from_millis(50)).await;
        assert!(store.get(&ObjectKey::new("default", "web-1")).is_some());
        assert!(store.get(&ObjectKey::new("default", "web-0")).is_none());
    }

    #[tokio::test]
    async fn test_failed_snapshot_surfaces_instead_of_hanging() {
        let store = WatchedStore::with_source(Arc::new(BrokenSource));

        let err = store.wait_synced().await.unwrap_err();
        assert!(err.to_string().contains("initial sync"));
        assert!(!store.is_synced());
    }

    #[tokio::test]
    async fn test_updated_objects_replace_their_old_version() {
        let mut unit = ComputeUnit::new("default", "web-0", "nginx:1.24");
        let source = Arc::new(FakeSource::new(vec![unit.clone()]));
        let store = WatchedStore::with_source(source.clone());
        store.wait_synced().await.unwrap();

        unit.image = "nginx:1.25".to_string();
        source.publish(WatchEvent::Put(unit));

        sleep(Duration::from_millis(50)).await;
        let cached = store.get(&ObjectKey::new("default", "web-0")).unwrap();
        assert_eq!(cached.image, "nginx:1.25");
        assert_eq!(store.list().len(), 1);
    }
}
