//! Inventory allocation engine for first-aid warehouse stock and kits.
//!
//! This crate contains the transfer rules as deterministic domain logic
//! (no IO, no storage, no locking). Time comes from an injected
//! [`medkit_core::Clock`] and material equivalence from an injected
//! [`MaterialResolver`].

pub mod allocation;
pub mod catalog;
pub mod events;
pub mod kits;
pub mod model;
pub mod query;
pub mod state;
pub mod warehouse;

pub use allocation::{AllocationEngine, BulkAdjustment};
pub use catalog::{CanonicalId, MaterialCatalog, MaterialResolver};
pub use events::{InventoryEvent, UnitAllocated, UnitConsumed, UnitDiscarded, UnitReturned};
pub use kits::KitRegistry;
pub use model::{
    DEFAULT_KIT_CAPACITY, Kit, KitItem, KitTemplate, KitTemplateItem, Material, MonthOfYear,
    SlotCapacity, WarehouseLot,
};
pub use query::{InventoryQueryEngine, MaterialTotals, StockRow, ZeroStockRow, WAREHOUSE_LOCATION};
pub use state::InventoryState;
pub use warehouse::WarehouseStock;
