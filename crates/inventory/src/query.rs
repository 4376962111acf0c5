//! Read-only views for dashboards, order requests, and notifications.

use chrono::{Days, NaiveDate};
use serde::Serialize;

use medkit_core::{DomainResult, KitId};

use crate::catalog::MaterialCatalog;
use crate::model::{Kit, MonthOfYear, WarehouseLot};
use crate::state::InventoryState;

pub const WAREHOUSE_LOCATION: &str = "Warehouse";

/// A quantity of one material at one expiry date, in one place.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct StockRow {
    pub code: String,
    pub name: String,
    pub quantity: u32,
    pub expiry_date: NaiveDate,
    /// `"Warehouse"` or `"Kit: <name>"`.
    pub location: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub kit_id: Option<KitId>,
}

/// A material missing from the warehouse or from a kit slot.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ZeroStockRow {
    pub code: String,
    pub name: String,
    pub location: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub kit_id: Option<KitId>,
}

#[derive(Debug, Copy, Clone, PartialEq, Eq, Serialize)]
pub struct MaterialTotals {
    pub warehouse: u64,
    pub kits: u64,
}

impl MaterialTotals {
    pub fn total(&self) -> u64 {
        self.warehouse + self.kits
    }
}

/// Derived queries over a borrowed [`InventoryState`].
#[derive(Debug, Clone, Copy)]
pub struct InventoryQueryEngine<'a> {
    state: &'a InventoryState,
    catalog: &'a MaterialCatalog,
    today: NaiveDate,
}

impl<'a> InventoryQueryEngine<'a> {
    pub fn new(state: &'a InventoryState, catalog: &'a MaterialCatalog, today: NaiveDate) -> Self {
        Self {
            state,
            catalog,
            today,
        }
    }

    /// Warehouse lots and kit units expiring in the given month.
    ///
    /// A kit contributes one row per held unit, each with quantity 1.
    pub fn expiring_items(&self, month: u32, year: i32) -> DomainResult<Vec<StockRow>> {
        let window = MonthOfYear::new(month, year)?;

        let mut rows: Vec<StockRow> = self
            .state
            .warehouse
            .lots()
            .iter()
            .filter(|l| window.contains(l.expiry_date))
            .map(|l| self.lot_row(l))
            .collect();
        rows.extend(self.kit_unit_rows(|date| window.contains(date)));
        Ok(rows)
    }

    /// Everything expiring between today and `days` from now, soonest first.
    ///
    /// Horizons past the last representable date cover everything from today on.
    pub fn expiring_within(&self, days: u32) -> Vec<StockRow> {
        let horizon = self
            .today
            .checked_add_days(Days::new(u64::from(days)))
            .unwrap_or(NaiveDate::MAX);
        let in_range = |date: NaiveDate| date >= self.today && date <= horizon;

        let mut rows: Vec<StockRow> = self
            .state
            .warehouse
            .lots()
            .iter()
            .filter(|l| in_range(l.expiry_date))
            .map(|l| self.lot_row(l))
            .collect();
        rows.extend(self.kit_unit_rows(in_range));
        rows.sort_by_key(|r| r.expiry_date);
        rows
    }

    /// Catalog materials with no warehouse lot, then every empty kit slot.
    ///
    /// A material can appear several times: once for the warehouse and once
    /// per empty slot.
    pub fn zero_quantity_items(&self) -> Vec<ZeroStockRow> {
        let mut rows: Vec<ZeroStockRow> = self
            .state
            .warehouse
            .list_zero_stock(self.catalog)
            .into_iter()
            .map(|m| ZeroStockRow {
                code: m.code.clone(),
                name: m.name.clone(),
                location: WAREHOUSE_LOCATION.to_string(),
                kit_id: None,
            })
            .collect();

        for kit in self.state.kits.kits() {
            for item in kit.items.iter().filter(|i| i.is_empty()) {
                rows.push(ZeroStockRow {
                    code: item.material_code.clone(),
                    name: self.catalog.display_name(&item.material_code),
                    location: kit_location(kit),
                    kit_id: Some(kit.id),
                });
            }
        }
        rows
    }

    /// Warehouse lots already past expiry.
    pub fn expired_items(&self) -> Vec<StockRow> {
        self.state
            .warehouse
            .list_expired(self.today)
            .into_iter()
            .map(|l| self.lot_row(l))
            .collect()
    }

    /// Kit-held units already past expiry, one row per unit.
    pub fn expired_kit_units(&self) -> Vec<StockRow> {
        let today = self.today;
        self.kit_unit_rows(|date| date < today)
    }

    pub fn material_totals(&self, material_code: &str) -> MaterialTotals {
        let kits: usize = self
            .state
            .kits
            .kits()
            .iter()
            .filter_map(|k| k.item(material_code))
            .map(|i| i.current_quantity())
            .sum();
        MaterialTotals {
            warehouse: self.state.warehouse.total_units(material_code),
            kits: kits as u64,
        }
    }

    fn lot_row(&self, lot: &WarehouseLot) -> StockRow {
        StockRow {
            code: lot.material_code.clone(),
            name: self.catalog.display_name(&lot.material_code),
            quantity: lot.quantity(),
            expiry_date: lot.expiry_date,
            location: WAREHOUSE_LOCATION.to_string(),
            kit_id: None,
        }
    }

    fn kit_unit_rows(&self, keep: impl Fn(NaiveDate) -> bool) -> Vec<StockRow> {
        let mut rows = Vec::new();
        for kit in self.state.kits.kits() {
            for item in &kit.items {
                for date in item.expiry_dates().iter().copied().filter(|d| keep(*d)) {
                    rows.push(StockRow {
                        code: item.material_code.clone(),
                        name: self.catalog.display_name(&item.material_code),
                        quantity: 1,
                        expiry_date: date,
                        location: kit_location(kit),
                        kit_id: Some(kit.id),
                    });
                }
            }
        }
        rows
    }
}

fn kit_location(kit: &Kit) -> String {
    format!("Kit: {}", kit.name)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::{KitItem, Material, SlotCapacity};

    fn d(y: i32, m: u32, day: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, day).unwrap()
    }

    fn fixture() -> (InventoryState, MaterialCatalog) {
        let catalog: MaterialCatalog = [Material::new("X", "Bandage"), Material::new("Y", "Saline")]
            .into_iter()
            .collect();

        let mut state = InventoryState::new();
        state.warehouse.receive_lot("X", 4, d(2025, 3, 5), None).unwrap();
        state.warehouse.receive_lot("X", 2, d(2024, 12, 1), None).unwrap();
        state
            .kits
            .insert(Kit {
                id: KitId::new(),
                name: "K1".into(),
                location: "Lobby".into(),
                max_capacity: 50,
                items: vec![
                    KitItem::holding(
                        "X",
                        SlotCapacity::Unbounded,
                        vec![d(2025, 3, 1), d(2025, 3, 1), d(2024, 12, 20)],
                    ),
                    KitItem::empty("Y", SlotCapacity::Limited(2)),
                ],
            })
            .unwrap();
        (state, catalog)
    }

    #[test]
    fn expiring_items_counts_kit_units_individually() {
        let (state, catalog) = fixture();
        let queries = InventoryQueryEngine::new(&state, &catalog, d(2025, 1, 1));

        let rows = queries.expiring_items(3, 2025).unwrap();
        assert_eq!(rows.len(), 3);
        assert_eq!(rows[0].location, "Warehouse");
        assert_eq!(rows[0].quantity, 4);
        assert!(rows[1..].iter().all(|r| r.quantity == 1 && r.location == "Kit: K1"));
        assert_eq!(rows[1].name, "Bandage");
    }

    #[test]
    fn expiring_items_validates_month() {
        let (state, catalog) = fixture();
        let queries = InventoryQueryEngine::new(&state, &catalog, d(2025, 1, 1));
        assert!(queries.expiring_items(0, 2025).is_err());
    }

    #[test]
    fn expired_views() {
        let (state, catalog) = fixture();
        let queries = InventoryQueryEngine::new(&state, &catalog, d(2025, 1, 1));

        let expired = queries.expired_items();
        assert_eq!(expired.len(), 1);
        assert_eq!(expired[0].quantity, 2);
        assert_eq!(expired[0].expiry_date, d(2024, 12, 1));

        let kit_expired = queries.expired_kit_units();
        assert_eq!(kit_expired.len(), 1);
        assert_eq!(kit_expired[0].expiry_date, d(2024, 12, 20));
    }

    #[test]
    fn expiring_within_is_sorted_and_bounded() {
        let (state, catalog) = fixture();
        let queries = InventoryQueryEngine::new(&state, &catalog, d(2025, 2, 25));

        let rows = queries.expiring_within(7);
        let dates: Vec<_> = rows.iter().map(|r| r.expiry_date).collect();
        assert_eq!(dates, vec![d(2025, 3, 1), d(2025, 3, 1)]);
    }

    #[test]
    fn expiring_within_saturates_on_huge_horizons() {
        let (state, catalog) = fixture();
        let queries = InventoryQueryEngine::new(&state, &catalog, d(2025, 1, 1));

        let rows = queries.expiring_within(u32::MAX);
        let dates: Vec<_> = rows.iter().map(|r| r.expiry_date).collect();
        assert_eq!(dates, vec![d(2025, 3, 1), d(2025, 3, 1), d(2025, 3, 5)]);

        let empty = InventoryState::new();
        assert!(InventoryQueryEngine::new(&empty, &catalog, d(2025, 1, 1))
            .expiring_within(u32::MAX)
            .is_empty());
    }

    #[test]
    fn zero_quantity_lists_warehouse_and_empty_slots() {
        let (state, catalog) = fixture();
        let queries = InventoryQueryEngine::new(&state, &catalog, d(2025, 1, 1));

        let rows = queries.zero_quantity_items();
        let summary: Vec<_> = rows
            .iter()
            .map(|r| (r.code.as_str(), r.location.as_str()))
            .collect();
        assert_eq!(summary, vec![("Y", "Warehouse"), ("Y", "Kit: K1")]);
    }

    #[test]
    fn material_totals_split_by_pool() {
        let (state, catalog) = fixture();
        let totals = InventoryQueryEngine::new(&state, &catalog, d(2025, 1, 1)).material_totals("X");
        assert_eq!(totals, MaterialTotals { warehouse: 6, kits: 3 });
        assert_eq!(totals.total(), 9);
    }
}
