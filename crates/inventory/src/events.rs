//! Unit movement events produced by the allocation engine.

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};

use medkit_core::{KitId, LotId};
use medkit_events::Event;

/// Event: one unit left a warehouse lot for a kit slot.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UnitAllocated {
    pub kit_id: KitId,
    pub material_code: String,
    /// Lot the unit was taken from. It may no longer exist.
    pub lot_id: LotId,
    pub expiry_date: NaiveDate,
    pub occurred_at: DateTime<Utc>,
}

/// Event: the longest-held unit of a slot went back to the warehouse.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UnitReturned {
    pub kit_id: KitId,
    pub material_code: String,
    /// Lot credited with the unit (merged or newly created).
    pub lot_id: LotId,
    pub expiry_date: NaiveDate,
    pub occurred_at: DateTime<Utc>,
}

/// Event: a unit was used up. Not credited anywhere.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UnitConsumed {
    pub kit_id: KitId,
    pub material_code: String,
    pub expiry_date: NaiveDate,
    pub occurred_at: DateTime<Utc>,
}

/// Event: a unit was written off by an audit correction. Not credited anywhere.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UnitDiscarded {
    pub kit_id: KitId,
    pub material_code: String,
    pub expiry_date: NaiveDate,
    pub occurred_at: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum InventoryEvent {
    UnitAllocated(UnitAllocated),
    UnitReturned(UnitReturned),
    UnitConsumed(UnitConsumed),
    UnitDiscarded(UnitDiscarded),
}

impl InventoryEvent {
    pub fn kit_id(&self) -> KitId {
        match self {
            InventoryEvent::UnitAllocated(e) => e.kit_id,
            InventoryEvent::UnitReturned(e) => e.kit_id,
            InventoryEvent::UnitConsumed(e) => e.kit_id,
            InventoryEvent::UnitDiscarded(e) => e.kit_id,
        }
    }

    pub fn material_code(&self) -> &str {
        match self {
            InventoryEvent::UnitAllocated(e) => &e.material_code,
            InventoryEvent::UnitReturned(e) => &e.material_code,
            InventoryEvent::UnitConsumed(e) => &e.material_code,
            InventoryEvent::UnitDiscarded(e) => &e.material_code,
        }
    }

    pub fn expiry_date(&self) -> NaiveDate {
        match self {
            InventoryEvent::UnitAllocated(e) => e.expiry_date,
            InventoryEvent::UnitReturned(e) => e.expiry_date,
            InventoryEvent::UnitConsumed(e) => e.expiry_date,
            InventoryEvent::UnitDiscarded(e) => e.expiry_date,
        }
    }
}

impl Event for InventoryEvent {
    fn event_type(&self) -> &'static str {
        match self {
            InventoryEvent::UnitAllocated(_) => "inventory.unit.allocated",
            InventoryEvent::UnitReturned(_) => "inventory.unit.returned",
            InventoryEvent::UnitConsumed(_) => "inventory.unit.consumed",
            InventoryEvent::UnitDiscarded(_) => "inventory.unit.discarded",
        }
    }

    fn version(&self) -> u32 {
        1
    }

    fn occurred_at(&self) -> DateTime<Utc> {
        match self {
            InventoryEvent::UnitAllocated(e) => e.occurred_at,
            InventoryEvent::UnitReturned(e) => e.occurred_at,
            InventoryEvent::UnitConsumed(e) => e.occurred_at,
            InventoryEvent::UnitDiscarded(e) => e.occurred_at,
        }
    }
}
