// src/resources/objects.rs
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;
use uuid::Uuid;

/// Identifying metadata shared by every cached object kind.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ObjectMeta {
    pub name: String,
    pub namespace: String,
    pub uid: Uuid,
    #[serde(default)]
    pub labels: BTreeMap<String, String>,
}

impl ObjectMeta {
    pub fn new(namespace: &str, name: &str) -> Self {
        Self {
            name: name.to_string(),
            namespace: namespace.to_string(),
            uid: Uuid::new_v4(),
            labels: BTreeMap::new(),
        }
    }

    pub fn key(&self) -> ObjectKey {
        ObjectKey::new(&self.namespace, &self.name)
    }
}

/// Namespace-qualified lookup key for the object caches.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ObjectKey {
    pub namespace: String,
    pub name: String,
}

impl ObjectKey {
    pub fn new(namespace: &str, name: &str) -> Self {
        Self {
            namespace: namespace.to_string(),
            name: name.to_string(),
        }
    }
}

impl fmt::Display for ObjectKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}", self.namespace, self.name)
    }
}

/// Implemented by every cacheable kind so stores can index uniformly.
pub trait Keyed {
    fn key(&self) -> ObjectKey;
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub enum ComputePhase {
    #[default]
    Pending,
    Running,
    Succeeded,
    Failed,
}

/// A workload assigned to this node.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ComputeUnit {
    pub meta: ObjectMeta,
    pub image: String,
    #[serde(default)]
    pub phase: ComputePhase,
}

impl ComputeUnit {
    pub fn new(namespace: &str, name: &str, image: &str) -> Self {
        Self {
            meta: ObjectMeta::new(namespace, name),
            image: image.to_string(),
            phase: ComputePhase::default(),
        }
    }
}

/// Plain configuration payload mounted into compute units.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ConfigObject {
    pub meta: ObjectMeta,
    #[serde(default)]
    pub data: BTreeMap<String, String>,
}

impl ConfigObject {
    pub fn new(namespace: &str, name: &str) -> Self {
        Self {
            meta: ObjectMeta::new(namespace, name),
            data: BTreeMap::new(),
        }
    }
}

/// Sensitive payload; values stay opaque bytes at this layer.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Secret {
    pub meta: ObjectMeta,
    #[serde(default)]
    pub data: BTreeMap<String, Vec<u8>>,
}

impl Secret {
    pub fn new(namespace: &str, name: &str) -> Self {
        Self {
            meta: ObjectMeta::new(namespace, name),
            data: BTreeMap::new(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ServicePort {
    pub name: String,
    pub port: u16,
}

/// A stable virtual address in front of a set of compute units.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ServiceRecord {
    pub meta: ObjectMeta,
    pub cluster_ip: String,
    #[serde(default)]
    pub ports: Vec<ServicePort>,
}

impl ServiceRecord {
    pub fn new(namespace: &str, name: &str, cluster_ip: &str) -> Self {
        Self {
            meta: ObjectMeta::new(namespace, name),
            cluster_ip: cluster_ip.to_string(),
            ports: Vec::new(),
        }
    }
}

/// Any object the resource view can hold, used when seeding fakes.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum ClusterObject {
    ComputeUnit(ComputeUnit),
    ConfigObject(ConfigObject),
    Secret(Secret),
    ServiceRecord(ServiceRecord),
}

impl Keyed for ComputeUnit {
    fn key(&self) -> ObjectKey {
        self.meta.key()
    }
}

impl Keyed for ConfigObject {
    fn key(&self) -> ObjectKey {
        self.meta.key()
    }
}

impl Keyed for Secret {
    fn key(&self) -> ObjectKey {
        self.meta.key()
    }
}

impl Keyed for ServiceRecord {
    fn key(&self) -> ObjectKey {
        self.meta.key()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    #[test]
    fn test_keys_are_namespace_qualified() {
        let unit = ComputeUnit::new("workloads", "web-0", "nginx:1.25");
        assert_eq!(unit.key(), ObjectKey::new("workloads", "web-0"));
        assert_eq!(unit.key().to_string(), "workloads/web-0");
    }

    #[test]
    fn test_metadata_gets_a_fresh_uid() {
        let a = ObjectMeta::new("ns", "same");
        let b = ObjectMeta::new("ns", "same");
        assert_ne!(a.uid, b.uid);
        assert_eq!(a.key(), b.key());
    }

    proptest! {
        #[test]
        fn test_key_display_round_trips(
            namespace in "[a-z][a-z0-9-]{0,20}",
            name in "[a-z][a-z0-9-]{0,20}",
        ) {
            let key = ObjectKey::new(&namespace, &name);
            let shown = key.to_string();
            let (ns, n) = shown.split_once('/').unwrap();
            prop_assert_eq!(ns, namespace);
            prop_assert_eq!(n, name);
        }
    }
}
