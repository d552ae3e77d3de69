// src/resources/view.rs
use super::objects::{
    ClusterObject, ComputeUnit, ConfigObject, ObjectKey, Secret, ServiceRecord,
};
use super::store::{FakeSource, WatchedStore};
use anyhow::Result;
use std::sync::Arc;
use tracing::info;

/// Read-only, cache-backed view of the cluster objects this node cares
/// about: its compute units plus the config objects, secrets, and service
/// records they reference.
///
/// Readers get whatever the caches currently hold and never talk to the
/// underlying sources directly.
pub struct ResourceView {
    compute_units: WatchedStore<ComputeUnit>,
    config_objects: WatchedStore<ConfigObject>,
    secrets: WatchedStore<Secret>,
    service_records: WatchedStore<ServiceRecord>,
}

impl ResourceView {
    /// Wrap four already-syncing stores. Callers that need a complete view
    /// should await `wait_synced` before reading.
    pub fn new(
        compute_units: WatchedStore<ComputeUnit>,
        config_objects: WatchedStore<ConfigObject>,
        secrets: WatchedStore<Secret>,
        service_records: WatchedStore<ServiceRecord>,
    ) -> Self {
        Self {
            compute_units,
            config_objects,
            secrets,
            service_records,
        }
    }

    /// Build a view over fabricated in-memory sources seeded with `objects`,
    /// split by kind.
    ///
    /// Panics if the fabricated stores cannot complete their initial sync.
    pub async fn fake(objects: Vec<ClusterObject>) -> Self {
        let mut compute_units = Vec::new();
        let mut config_objects = Vec::new();
        let mut secrets = Vec::new();
        let mut service_records = Vec::new();

        for object in objects {
            match object {
                ClusterObject::ComputeUnit(o) => compute_units.push(o),
                ClusterObject::ConfigObject(o) => config_objects.push(o),
                ClusterObject::Secret(o) => secrets.push(o),
                ClusterObject::ServiceRecord(o) => service_records.push(o),
            }
        }

        let view = Self::new(
            WatchedStore::with_source(Arc::new(FakeSource::new(compute_units))),
            WatchedStore::with_source(Arc::new(FakeSource::new(config_objects))),
            WatchedStore::with_source(Arc::new(FakeSource::new(secrets))),
            WatchedStore::with_source(Arc::new(FakeSource::new(service_records))),
        );

        if let Err(e) = view.wait_synced().await {
            panic!("Fake resource view failed to sync: {e}");
        }
        info!("Fake resource view synced");
        view
    }

    /// Wait for every store to finish applying its initial snapshot.
    pub async fn wait_synced(&self) -> Result<()> {
        futures::try_join!(
            self.compute_units.wait_synced(),
            self.config_objects.wait_synced(),
            self.secrets.wait_synced(),
            self.service_records.wait_synced(),
        )?;
        Ok(())
    }

    pub fn list_compute_units(&self) -> Vec<Arc<ComputeUnit>> {
        self.compute_units.list()
    }

    pub fn config_object(&self, namespace: &str, name: &str) -> Option<Arc<ConfigObject>> {
        self.config_objects.get(&ObjectKey::new(namespace, name))
    }

    pub fn secret(&self, namespace: &str, name: &str) -> Option<Arc<Secret>> {
        self.secrets.get(&ObjectKey::new(namespace, name))
    }

    pub fn list_service_records(&self) -> Vec<Arc<ServiceRecord>> {
        self.service_records.list()
    }
}
