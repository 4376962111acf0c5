//! Serialized, persistent wrapper around the allocation engine.
//!
//! Every mutating call runs inside one critical section:
//!
//! ```text
//! lock
//!   ↓
//! 1. run the engine operation (check, pick lot, mutate)
//!   ↓
//! 2. save a whole-state snapshot (roll back in memory if it fails)
//!   ↓
//! 3. publish the movement events
//!   ↓
//! unlock
//! ```
//!
//! Publication happens after the snapshot is durable. A publish failure is
//! reported as [`ServiceError::Publish`] but the state change stands.

use std::sync::{Arc, Mutex, MutexGuard};

use chrono::NaiveDate;
use thiserror::Error;
use tracing::{error, info, warn};

use medkit_core::{Clock, DomainError, KitId, LotId, SystemClock};
use medkit_events::{EventBus, Subscription};
use medkit_inventory::{
    AllocationEngine, BulkAdjustment, InventoryEvent, InventoryQueryEngine, InventoryState, Kit,
    KitTemplate, MaterialCatalog, WarehouseLot, DEFAULT_KIT_CAPACITY,
};

use crate::snapshot::{SnapshotError, SnapshotStore};

#[derive(Debug, Error)]
pub enum ServiceError {
    #[error(transparent)]
    Domain(#[from] DomainError),

    #[error(transparent)]
    Snapshot(#[from] SnapshotError),

    /// The state change was saved but its events could not be delivered.
    #[error("event publication failed after commit: {0}")]
    Publish(String),

    #[error("inventory lock poisoned")]
    Poisoned,
}

impl ServiceError {
    pub fn as_domain(&self) -> Option<&DomainError> {
        match self {
            ServiceError::Domain(err) => Some(err),
            _ => None,
        }
    }
}

type Engine<C> = AllocationEngine<Arc<MaterialCatalog>, C>;

pub struct InventoryService<S, B, C = SystemClock> {
    engine: Mutex<Engine<C>>,
    catalog: Arc<MaterialCatalog>,
    store: S,
    bus: B,
    default_kit_capacity: u32,
}

impl<S, B, C> InventoryService<S, B, C>
where
    S: SnapshotStore,
    B: EventBus<InventoryEvent>,
    C: Clock,
{
    /// Start from an explicit state. Nothing is saved until the first mutation.
    pub fn new(state: InventoryState, catalog: MaterialCatalog, store: S, bus: B, clock: C) -> Self {
        let catalog = Arc::new(catalog);
        Self {
            engine: Mutex::new(AllocationEngine::new(state, Arc::clone(&catalog), clock)),
            catalog,
            store,
            bus,
            default_kit_capacity: DEFAULT_KIT_CAPACITY,
        }
    }

    /// Start from whatever the store holds, or an empty inventory.
    pub fn open(catalog: MaterialCatalog, store: S, bus: B, clock: C) -> Result<Self, ServiceError> {
        let state = store.load()?.unwrap_or_default();
        info!(
            lots = state.warehouse.lots().len(),
            kits = state.kits.kits().len(),
            "inventory opened"
        );
        Ok(Self::new(state, catalog, store, bus, clock))
    }

    pub fn with_default_kit_capacity(mut self, capacity: u32) -> Self {
        self.default_kit_capacity = capacity;
        self
    }

    pub fn catalog(&self) -> &MaterialCatalog {
        &self.catalog
    }

    pub fn subscribe(&self) -> Subscription<InventoryEvent> {
        self.bus.subscribe()
    }

    pub fn allocate_unit(&self, kit_id: KitId, material_code: &str) -> Result<InventoryEvent, ServiceError> {
        self.mutate("allocate", |engine| engine.allocate_unit(kit_id, material_code), |e| vec![e.clone()])
    }

    pub fn return_unit(&self, kit_id: KitId, material_code: &str) -> Result<InventoryEvent, ServiceError> {
        self.mutate("return", |engine| engine.return_unit(kit_id, material_code), |e| vec![e.clone()])
    }

    pub fn consume_unit(
        &self,
        kit_id: KitId,
        material_code: &str,
        expiry_date: NaiveDate,
    ) -> Result<InventoryEvent, ServiceError> {
        self.mutate(
            "consume",
            |engine| engine.consume_unit(kit_id, material_code, expiry_date),
            |e| vec![e.clone()],
        )
    }

    /// Applied steps are kept and saved even when the adjustment halts early.
    pub fn bulk_adjust(
        &self,
        kit_id: KitId,
        material_code: &str,
        delta: i32,
    ) -> Result<BulkAdjustment, ServiceError> {
        self.mutate(
            "bulk_adjust",
            |engine| engine.bulk_adjust(kit_id, material_code, delta),
            |adj| adj.events.clone(),
        )
    }

    pub fn receive_lot(
        &self,
        material_code: &str,
        quantity: u32,
        expiry_date: NaiveDate,
        notes: Option<String>,
    ) -> Result<LotId, ServiceError> {
        self.mutate(
            "receive_lot",
            |engine| {
                engine
                    .state_mut()
                    .warehouse
                    .receive_lot(material_code, quantity, expiry_date, notes)
            },
            |_| Vec::new(),
        )
    }

    pub fn remove_lot(&self, lot_id: LotId) -> Result<WarehouseLot, ServiceError> {
        self.mutate(
            "remove_lot",
            |engine| engine.state_mut().warehouse.remove_lot(lot_id),
            |_| Vec::new(),
        )
    }

    /// Template slots without a capacity stay unbounded; a template without
    /// a kit capacity gets the configured default.
    pub fn create_kit(&self, template: KitTemplate) -> Result<KitId, ServiceError> {
        let default_capacity = self.default_kit_capacity;
        self.mutate(
            "create_kit",
            |engine| engine.state_mut().kits.create_kit(template, default_capacity),
            |_| Vec::new(),
        )
    }

    pub fn remove_kit(&self, kit_id: KitId) -> Result<Kit, ServiceError> {
        self.mutate(
            "remove_kit",
            |engine| engine.state_mut().kits.remove_kit(kit_id),
            |_| Vec::new(),
        )
    }

    /// A consistent copy of the whole inventory.
    pub fn snapshot(&self) -> Result<InventoryState, ServiceError> {
        Ok(self.lock()?.state().clone())
    }

    /// Run read-only queries against a consistent view, dated by the clock.
    pub fn with_queries<T>(&self, f: impl FnOnce(&InventoryQueryEngine<'_>) -> T) -> Result<T, ServiceError> {
        let engine = self.lock()?;
        let queries = InventoryQueryEngine::new(engine.state(), &self.catalog, engine.clock().today());
        Ok(f(&queries))
    }

    fn lock(&self) -> Result<MutexGuard<'_, Engine<C>>, ServiceError> {
        self.engine.lock().map_err(|_| ServiceError::Poisoned)
    }

    fn mutate<T>(
        &self,
        operation: &'static str,
        op: impl FnOnce(&mut Engine<C>) -> Result<T, DomainError>,
        events_of: impl FnOnce(&T) -> Vec<InventoryEvent>,
    ) -> Result<T, ServiceError> {
        let mut engine = self.lock()?;
        let before = engine.state().clone();

        let output = match op(&mut *engine) {
            Ok(output) => output,
            Err(err) => {
                warn!(operation, reason = err.kind(), error = %err, "operation rejected");
                return Err(err.into());
            }
        };

        if engine.state() != &before {
            if let Err(err) = self.store.save(engine.state()) {
                error!(operation, error = %err, "snapshot save failed; rolling back");
                engine.replace_state(before);
                return Err(err.into());
            }
        }

        for event in events_of(&output) {
            self.bus.publish(event).map_err(|e| {
                error!(operation, error = ?e, "event publication failed");
                ServiceError::Publish(format!("{e:?}"))
            })?;
        }
        Ok(output)
    }
}
