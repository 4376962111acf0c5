//! Warehouse stock lots.

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use tracing::debug;

use medkit_core::{DomainError, DomainResult, LotId};

use crate::catalog::{MaterialCatalog, MaterialResolver};
use crate::model::{Material, MonthOfYear, WarehouseLot};

/// All lots currently in the warehouse, in insertion order.
///
/// Insertion order is the tie-breaker for lots sharing an expiry date, so
/// lots are only ever appended or removed, never reordered.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct WarehouseStock {
    lots: Vec<WarehouseLot>,
}

impl WarehouseStock {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn lots(&self) -> &[WarehouseLot] {
        &self.lots
    }

    pub fn get(&self, lot_id: LotId) -> Option<&WarehouseLot> {
        self.lots.iter().find(|l| l.id == lot_id)
    }

    /// Record a delivery as a new lot.
    pub fn receive_lot(
        &mut self,
        material_code: impl Into<String>,
        quantity: u32,
        expiry_date: NaiveDate,
        notes: Option<String>,
    ) -> DomainResult<LotId> {
        let material_code = material_code.into();
        if quantity == 0 {
            return Err(DomainError::validation("lot quantity must be positive"));
        }
        if material_code.trim().is_empty() {
            return Err(DomainError::validation("material code cannot be empty"));
        }

        let id = LotId::new();
        self.lots.push(WarehouseLot {
            id,
            material_code,
            quantity,
            expiry_date,
            notes,
        });
        Ok(id)
    }

    pub fn remove_lot(&mut self, lot_id: LotId) -> DomainResult<WarehouseLot> {
        let idx = self
            .position(lot_id)
            .ok_or_else(|| DomainError::not_found(format!("lot {lot_id}")))?;
        Ok(self.lots.remove(idx))
    }

    /// Lots that may be issued for `material_code`, earliest expiry first.
    ///
    /// Lots carrying the exact code win. Only when no lot carries that code
    /// are lots of any code resolving to the same material considered.
    /// Expired lots are excluded; ties keep insertion order.
    pub fn find_eligible_lots<R>(
        &self,
        material_code: &str,
        resolver: &R,
        today: NaiveDate,
    ) -> Vec<&WarehouseLot>
    where
        R: MaterialResolver + ?Sized,
    {
        let mut matching: Vec<&WarehouseLot> = self
            .lots
            .iter()
            .filter(|l| l.material_code == material_code)
            .collect();

        if matching.is_empty() {
            if let Some(wanted) = resolver.resolve_material(material_code) {
                matching = self
                    .lots
                    .iter()
                    .filter(|l| resolver.resolve_material(&l.material_code).as_ref() == Some(&wanted))
                    .collect();
            }
        }

        matching.retain(|l| l.quantity > 0 && !l.is_expired(today));
        // Stable sort: equal expiry dates stay in insertion order.
        matching.sort_by_key(|l| l.expiry_date);
        matching
    }

    /// Take `n` units out of a lot, deleting the lot when it empties.
    ///
    /// Returns the quantity left in the lot (0 means the lot is gone).
    pub fn decrement(&mut self, lot_id: LotId, n: u32) -> DomainResult<u32> {
        if n == 0 {
            return Err(DomainError::validation("decrement must take at least one unit"));
        }
        let idx = self
            .position(lot_id)
            .ok_or_else(|| DomainError::not_found(format!("lot {lot_id}")))?;

        let lot = &mut self.lots[idx];
        if n > lot.quantity {
            return Err(DomainError::InsufficientStock {
                lot_id,
                available: lot.quantity,
                requested: n,
            });
        }

        lot.quantity -= n;
        let remaining = lot.quantity;
        if remaining == 0 {
            self.lots.remove(idx);
            debug!(%lot_id, "lot emptied and removed");
        }
        Ok(remaining)
    }

    /// Put `n` units back, merging into the lot with the same code and expiry.
    pub fn credit_return(
        &mut self,
        material_code: &str,
        expiry_date: NaiveDate,
        n: u32,
    ) -> DomainResult<LotId> {
        if n == 0 {
            return Err(DomainError::validation("credit must return at least one unit"));
        }

        if let Some(lot) = self
            .lots
            .iter_mut()
            .find(|l| l.material_code == material_code && l.expiry_date == expiry_date)
        {
            let Some(quantity) = lot.quantity.checked_add(n) else {
                return Err(DomainError::validation(format!(
                    "lot {} cannot take {n} more units on top of {}",
                    lot.id, lot.quantity
                )));
            };
            lot.quantity = quantity;
            debug!(lot_id = %lot.id, quantity = lot.quantity, "merged return into existing lot");
            return Ok(lot.id);
        }

        let id = self.receive_lot(material_code, n, expiry_date, None)?;
        debug!(lot_id = %id, "return created a new lot");
        Ok(id)
    }

    pub fn list_expired(&self, today: NaiveDate) -> Vec<&WarehouseLot> {
        self.lots.iter().filter(|l| l.is_expired(today)).collect()
    }

    pub fn list_expiring_in(&self, month: u32, year: i32) -> DomainResult<Vec<&WarehouseLot>> {
        let window = MonthOfYear::new(month, year)?;
        Ok(self
            .lots
            .iter()
            .filter(|l| window.contains(l.expiry_date))
            .collect())
    }

    /// Catalog materials without any warehouse lot, under any equivalent code.
    pub fn list_zero_stock<'c>(&self, catalog: &'c MaterialCatalog) -> Vec<&'c Material> {
        catalog
            .materials()
            .filter(|m| !self.has_stock_of(&m.code, catalog))
            .collect()
    }

    /// Units held for exactly this code, expired lots included.
    pub fn total_units(&self, material_code: &str) -> u64 {
        self.lots
            .iter()
            .filter(|l| l.material_code == material_code)
            .map(|l| u64::from(l.quantity))
            .sum()
    }

    fn has_stock_of<R>(&self, material_code: &str, resolver: &R) -> bool
    where
        R: MaterialResolver + ?Sized,
    {
        let wanted = resolver.resolve_material(material_code);
        self.lots.iter().any(|l| {
            l.quantity > 0
                && (l.material_code == material_code
                    || (wanted.is_some()
                        && resolver.resolve_material(&l.material_code) == wanted))
        })
    }

    fn position(&self, lot_id: LotId) -> Option<usize> {
        self.lots.iter().position(|l| l.id == lot_id)
    }
}
