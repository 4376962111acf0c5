//! Infrastructure around the inventory engine: configuration, snapshot
//! persistence, and the serialized [`InventoryService`].

pub mod config;
pub mod service;
pub mod snapshot;

pub use config::{ConfigError, LogOutput, MedkitConfig};
pub use service::{InventoryService, ServiceError};
pub use snapshot::{
    load_catalog, InMemorySnapshotStore, JsonFileSnapshotStore, SnapshotError, SnapshotStore,
};
