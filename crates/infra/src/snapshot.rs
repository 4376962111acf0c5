//! Whole-state snapshot persistence.
//!
//! The engine only defines the in-memory shape; these stores decide where a
//! snapshot lives. The JSON file store is the default medium.

use std::fs;
use std::io::Write;
use std::path::{Path, PathBuf};
use std::sync::RwLock;

use thiserror::Error;
use tracing::debug;

use medkit_core::DomainError;
use medkit_inventory::{InventoryState, Material, MaterialCatalog};

#[derive(Debug, Error)]
pub enum SnapshotError {
    #[error("snapshot io error: {0}")]
    Io(#[from] std::io::Error),

    #[error("snapshot is not valid JSON: {0}")]
    Serde(#[from] serde_json::Error),

    #[error("snapshot violates inventory invariants: {0}")]
    Invalid(DomainError),

    #[error("snapshot store lock poisoned")]
    Poisoned,
}

/// Storage for the complete [`InventoryState`].
pub trait SnapshotStore: Send + Sync {
    /// `None` when nothing has been saved yet.
    fn load(&self) -> Result<Option<InventoryState>, SnapshotError>;

    fn save(&self, state: &InventoryState) -> Result<(), SnapshotError>;
}

impl<S> SnapshotStore for std::sync::Arc<S>
where
    S: SnapshotStore + ?Sized,
{
    fn load(&self) -> Result<Option<InventoryState>, SnapshotError> {
        (**self).load()
    }

    fn save(&self, state: &InventoryState) -> Result<(), SnapshotError> {
        (**self).save(state)
    }
}

/// In-memory snapshot store for tests/dev.
#[derive(Debug, Default)]
pub struct InMemorySnapshotStore {
    latest: RwLock<Option<InventoryState>>,
}

impl InMemorySnapshotStore {
    pub fn new() -> Self {
        Self::default()
    }
}

impl SnapshotStore for InMemorySnapshotStore {
    fn load(&self) -> Result<Option<InventoryState>, SnapshotError> {
        let latest = self.latest.read().map_err(|_| SnapshotError::Poisoned)?;
        Ok(latest.clone())
    }

    fn save(&self, state: &InventoryState) -> Result<(), SnapshotError> {
        let mut latest = self.latest.write().map_err(|_| SnapshotError::Poisoned)?;
        *latest = Some(state.clone());
        Ok(())
    }
}

/// Pretty-printed JSON file. Saves go to a sibling temp file that is then
/// renamed over the target, so a crash never leaves a half-written snapshot.
#[derive(Debug, Clone)]
pub struct JsonFileSnapshotStore {
    path: PathBuf,
}

impl JsonFileSnapshotStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    fn temp_path(&self) -> PathBuf {
        let mut name = self
            .path
            .file_name()
            .map(|n| n.to_os_string())
            .unwrap_or_default();
        name.push(".tmp");
        self.path.with_file_name(name)
    }
}

impl SnapshotStore for JsonFileSnapshotStore {
    fn load(&self) -> Result<Option<InventoryState>, SnapshotError> {
        if !self.path.exists() {
            debug!(path = %self.path.display(), "no snapshot yet");
            return Ok(None);
        }
        let raw = fs::read_to_string(&self.path)?;
        let state: InventoryState = serde_json::from_str(&raw)?;
        state.check_invariants().map_err(SnapshotError::Invalid)?;
        Ok(Some(state))
    }

    fn save(&self, state: &InventoryState) -> Result<(), SnapshotError> {
        let tmp = self.temp_path();
        {
            let mut file = fs::File::create(&tmp)?;
            serde_json::to_writer_pretty(&mut file, state)?;
            file.write_all(b"\n")?;
            file.sync_all()?;
        }
        fs::rename(&tmp, &self.path)?;
        debug!(path = %self.path.display(), "snapshot saved");
        Ok(())
    }
}

/// Read a catalog from a JSON array of materials. A missing file is an
/// empty catalog.
pub fn load_catalog(path: &Path) -> Result<MaterialCatalog, SnapshotError> {
    if !path.exists() {
        return Ok(MaterialCatalog::new());
    }
    let raw = fs::read_to_string(path)?;
    let materials: Vec<Material> = serde_json::from_str(&raw)?;
    Ok(materials.into_iter().collect())
}
