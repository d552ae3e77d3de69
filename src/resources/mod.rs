// src/resources/mod.rs
mod objects;
mod store;
mod view;

pub use objects::{
    ClusterObject, ComputePhase, ComputeUnit, ConfigObject, Keyed, ObjectKey, ObjectMeta,
    Secret, ServicePort, ServiceRecord,
};
pub use store::{FakeSource, ObjectSource, WatchEvent, WatchedStore};
pub use view::ResourceView;
