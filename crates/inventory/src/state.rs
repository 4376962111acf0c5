//! The complete inventory, owned by one engine instance.

use serde::{Deserialize, Serialize};

use medkit_core::{CapacityScope, DomainError, DomainResult};

use crate::kits::KitRegistry;
use crate::warehouse::WarehouseStock;

/// Warehouse stock plus kits: the whole state a snapshot persists.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct InventoryState {
    #[serde(default)]
    pub warehouse: WarehouseStock,
    #[serde(default)]
    pub kits: KitRegistry,
}

impl InventoryState {
    pub fn new() -> Self {
        Self::default()
    }

    /// Physical units of exactly this code, warehouse and kits combined.
    pub fn units_of(&self, material_code: &str) -> u64 {
        let in_kits: usize = self
            .kits
            .kits()
            .iter()
            .filter_map(|k| k.item(material_code))
            .map(|i| i.current_quantity())
            .sum();
        self.warehouse.total_units(material_code) + in_kits as u64
    }

    /// Verify the structural invariants. Run on state loaded from outside.
    pub fn check_invariants(&self) -> DomainResult<()> {
        for lot in self.warehouse.lots() {
            if lot.quantity() == 0 {
                return Err(DomainError::validation(format!(
                    "lot {} has zero quantity",
                    lot.id
                )));
            }
        }

        for kit in self.kits.kits() {
            for item in &kit.items {
                if let Some(limit) = item.max_quantity.limit() {
                    if item.current_quantity() > limit as usize {
                        return Err(DomainError::CapacityExceeded {
                            scope: CapacityScope::Slot,
                            limit,
                        });
                    }
                }
            }
            if kit.total_units() > kit.max_capacity as usize {
                return Err(DomainError::CapacityExceeded {
                    scope: CapacityScope::Kit,
                    limit: kit.max_capacity,
                });
            }
        }

        Ok(())
    }
}
