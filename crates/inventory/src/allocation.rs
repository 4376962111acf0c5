//! Unit transfers between warehouse lots and kit slots.
//!
//! Every operation moves a single physical unit and either applies completely
//! or returns an error with the state untouched. The engine assumes exclusive
//! access to its [`InventoryState`]; callers that share an engine across
//! threads must serialize whole operations (see `medkit-infra`'s
//! `InventoryService`), since the check → pick lot → mutate → append sequence
//! is only atomic under that exclusion.

use chrono::NaiveDate;
use tracing::{debug, info, warn};

use medkit_core::{CapacityScope, Clock, DomainError, DomainResult, KitId, SystemClock};

use crate::catalog::MaterialResolver;
use crate::events::{InventoryEvent, UnitAllocated, UnitConsumed, UnitDiscarded, UnitReturned};
use crate::state::InventoryState;

/// Outcome of [`AllocationEngine::bulk_adjust`].
///
/// A bulk adjustment stops at the first failing step and keeps the steps
/// already applied; `halted` carries the failure that stopped it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BulkAdjustment {
    pub requested: u32,
    pub applied: u32,
    pub events: Vec<InventoryEvent>,
    pub halted: Option<DomainError>,
}

impl BulkAdjustment {
    pub fn is_complete(&self) -> bool {
        self.applied == self.requested
    }
}

/// Owns the inventory state and applies FIFO/capacity rules to it.
#[derive(Debug)]
pub struct AllocationEngine<R, C = SystemClock> {
    state: InventoryState,
    resolver: R,
    clock: C,
}

impl<R, C> AllocationEngine<R, C>
where
    R: MaterialResolver,
    C: Clock,
{
    pub fn new(state: InventoryState, resolver: R, clock: C) -> Self {
        Self {
            state,
            resolver,
            clock,
        }
    }

    pub fn state(&self) -> &InventoryState {
        &self.state
    }

    /// Direct access for data entry (receiving lots, creating kits).
    ///
    /// Unit transfers must go through the engine operations instead.
    pub fn state_mut(&mut self) -> &mut InventoryState {
        &mut self.state
    }

    /// Swap in a whole new state, returning the old one.
    pub fn replace_state(&mut self, state: InventoryState) -> InventoryState {
        std::mem::replace(&mut self.state, state)
    }

    pub fn clock(&self) -> &C {
        &self.clock
    }

    /// Move one unit of `material_code` from the earliest-expiring eligible
    /// lot into the kit's slot.
    pub fn allocate_unit(&mut self, kit_id: KitId, material_code: &str) -> DomainResult<InventoryEvent> {
        let today = self.clock.today();
        let occurred_at = self.clock.now();
        let resolver = &self.resolver;
        let InventoryState { warehouse, kits } = &mut self.state;

        let kit = kits.get_kit(kit_id)?;
        let kit_total = kit.total_units();
        let kit_limit = kit.max_capacity;
        let item = kits.get_item_mut(kit_id, material_code)?;

        if kit_total >= kit_limit as usize {
            debug!(%kit_id, material_code, kit_total, "kit is full");
            return Err(DomainError::CapacityExceeded {
                scope: CapacityScope::Kit,
                limit: kit_limit,
            });
        }
        if !item.max_quantity.admits_another(item.current_quantity()) {
            let limit = item.max_quantity.limit().unwrap_or(u32::MAX);
            debug!(%kit_id, material_code, limit, "slot is full");
            return Err(DomainError::CapacityExceeded {
                scope: CapacityScope::Slot,
                limit,
            });
        }

        let (lot_id, expiry_date) = match warehouse
            .find_eligible_lots(material_code, resolver, today)
            .first()
        {
            Some(lot) => (lot.id, lot.expiry_date),
            None => {
                debug!(%kit_id, material_code, %today, "no eligible lot");
                return Err(DomainError::out_of_stock(material_code));
            }
        };
        debug!(%lot_id, %expiry_date, material_code, "selected lot");

        warehouse.decrement(lot_id, 1)?;
        item.expiry_dates.push(expiry_date);

        info!(%kit_id, material_code, %lot_id, %expiry_date, "unit allocated");
        Ok(InventoryEvent::UnitAllocated(UnitAllocated {
            kit_id,
            material_code: material_code.to_string(),
            lot_id,
            expiry_date,
            occurred_at,
        }))
    }

    /// Send the unit that has been in the slot longest back to the warehouse.
    ///
    /// "Longest" is arrival order, not expiry order.
    pub fn return_unit(&mut self, kit_id: KitId, material_code: &str) -> DomainResult<InventoryEvent> {
        let occurred_at = self.clock.now();
        let InventoryState { warehouse, kits } = &mut self.state;

        let item = kits.get_item_mut(kit_id, material_code)?;
        let expiry_date = *item
            .expiry_dates
            .first()
            .ok_or_else(|| nothing_to_return(kit_id, material_code))?;

        let lot_id = warehouse.credit_return(material_code, expiry_date, 1)?;
        item.expiry_dates.remove(0);

        info!(%kit_id, material_code, %lot_id, %expiry_date, "unit returned");
        Ok(InventoryEvent::UnitReturned(UnitReturned {
            kit_id,
            material_code: material_code.to_string(),
            lot_id,
            expiry_date,
            occurred_at,
        }))
    }

    /// Permanently remove one unit with exactly `expiry_date` from the slot.
    ///
    /// Irreversible. Asking for confirmation is up to the caller.
    pub fn consume_unit(
        &mut self,
        kit_id: KitId,
        material_code: &str,
        expiry_date: NaiveDate,
    ) -> DomainResult<InventoryEvent> {
        let occurred_at = self.clock.now();
        let item = self.state.kits.get_item_mut(kit_id, material_code)?;

        let idx = item
            .expiry_dates
            .iter()
            .position(|d| *d == expiry_date)
            .ok_or_else(|| DomainError::InvalidExpiry {
                kit_id,
                material_code: material_code.to_string(),
                expiry_date,
            })?;
        item.expiry_dates.remove(idx);

        info!(%kit_id, material_code, %expiry_date, "unit consumed");
        Ok(InventoryEvent::UnitConsumed(UnitConsumed {
            kit_id,
            material_code: material_code.to_string(),
            expiry_date,
            occurred_at,
        }))
    }

    /// Apply `delta` single-unit steps to a slot.
    ///
    /// Positive deltas allocate from the warehouse. Negative deltas discard the
    /// oldest-arrived units without crediting the warehouse (audit
    /// corrections). Stops at the first failing step; applied steps stay.
    pub fn bulk_adjust(
        &mut self,
        kit_id: KitId,
        material_code: &str,
        delta: i32,
    ) -> DomainResult<BulkAdjustment> {
        self.state.kits.get_item(kit_id, material_code)?;

        let mut adjustment = BulkAdjustment {
            requested: delta.unsigned_abs(),
            applied: 0,
            events: Vec::new(),
            halted: None,
        };

        for _ in 0..adjustment.requested {
            let step = if delta > 0 {
                self.allocate_unit(kit_id, material_code)
            } else {
                self.discard_oldest(kit_id, material_code)
            };
            match step {
                Ok(event) => {
                    adjustment.applied += 1;
                    adjustment.events.push(event);
                }
                Err(err) => {
                    adjustment.halted = Some(err);
                    break;
                }
            }
        }

        if let Some(err) = &adjustment.halted {
            warn!(
                %kit_id,
                material_code,
                delta,
                applied = adjustment.applied,
                reason = err.kind(),
                "bulk adjustment stopped early"
            );
        }
        Ok(adjustment)
    }

    fn discard_oldest(&mut self, kit_id: KitId, material_code: &str) -> DomainResult<InventoryEvent> {
        let occurred_at = self.clock.now();
        let item = self.state.kits.get_item_mut(kit_id, material_code)?;
        if item.expiry_dates.is_empty() {
            return Err(nothing_to_return(kit_id, material_code));
        }
        let expiry_date = item.expiry_dates.remove(0);

        info!(%kit_id, material_code, %expiry_date, "unit discarded");
        Ok(InventoryEvent::UnitDiscarded(UnitDiscarded {
            kit_id,
            material_code: material_code.to_string(),
            expiry_date,
            occurred_at,
        }))
    }
}

fn nothing_to_return(kit_id: KitId, material_code: &str) -> DomainError {
    DomainError::NothingToReturn {
        kit_id,
        material_code: material_code.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::catalog::MaterialCatalog;
    use crate::model::{KitTemplate, KitTemplateItem, Material};
    use medkit_core::FixedClock;

    fn d(y: i32, m: u32, day: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, day).unwrap()
    }

    fn catalog() -> MaterialCatalog {
        [
            Material::new("X", "Bandage"),
            Material::new("Y", "Saline"),
            Material::new("X-ALT", "bandage"),
        ]
        .into_iter()
        .collect()
    }

    fn engine_with_kit(
        kit_capacity: u32,
        slot_capacity: Option<u32>,
    ) -> (AllocationEngine<MaterialCatalog, FixedClock>, KitId) {
        let mut state = InventoryState::new();
        let kit_id = state
            .kits
            .create_kit(
                KitTemplate {
                    name: "K1".into(),
                    location: "Lobby".into(),
                    max_capacity: Some(kit_capacity),
                    items: vec![
                        KitTemplateItem {
                            material_code: "X".into(),
                            max_quantity: slot_capacity,
                        },
                        KitTemplateItem {
                            material_code: "Y".into(),
                            max_quantity: None,
                        },
                    ],
                },
                50,
            )
            .unwrap();
        let engine = AllocationEngine::new(state, catalog(), FixedClock::on(d(2024, 12, 1)));
        (engine, kit_id)
    }

    #[test]
    fn allocation_takes_earliest_lot_and_records_its_expiry() {
        let (mut engine, kit) = engine_with_kit(50, None);
        let late = engine
            .state_mut()
            .warehouse
            .receive_lot("X", 1, d(2025, 6, 1), None)
            .unwrap();
        let early = engine
            .state_mut()
            .warehouse
            .receive_lot("X", 1, d(2025, 1, 1), None)
            .unwrap();

        let event = engine.allocate_unit(kit, "X").unwrap();
        match event {
            InventoryEvent::UnitAllocated(e) => {
                assert_eq!(e.lot_id, early);
                assert_eq!(e.expiry_date, d(2025, 1, 1));
            }
            other => panic!("unexpected event {other:?}"),
        }
        assert!(engine.state().warehouse.get(early).is_none());
        assert_eq!(engine.state().warehouse.get(late).unwrap().quantity(), 1);
        assert_eq!(
            engine.state().kits.get_item(kit, "X").unwrap().expiry_dates(),
            &[d(2025, 1, 1)]
        );
    }

    #[test]
    fn allocation_skips_expired_lots() {
        let (mut engine, kit) = engine_with_kit(50, None);
        engine
            .state_mut()
            .warehouse
            .receive_lot("X", 3, d(2024, 11, 1), None)
            .unwrap();

        assert_eq!(
            engine.allocate_unit(kit, "X").unwrap_err(),
            DomainError::out_of_stock("X")
        );
        assert_eq!(engine.state().warehouse.total_units("X"), 3);
    }

    #[test]
    fn allocation_falls_back_to_equivalent_code() {
        let (mut engine, kit) = engine_with_kit(50, None);
        let alt = engine
            .state_mut()
            .warehouse
            .receive_lot("X-ALT", 1, d(2025, 1, 1), None)
            .unwrap();

        engine.allocate_unit(kit, "X").unwrap();
        assert!(engine.state().warehouse.get(alt).is_none());
        assert_eq!(engine.state().kits.get_item(kit, "X").unwrap().current_quantity(), 1);
    }

    #[test]
    fn kit_capacity_is_checked_across_slots() {
        let (mut engine, kit) = engine_with_kit(1, None);
        engine
            .state_mut()
            .warehouse
            .receive_lot("Y", 5, d(2025, 1, 1), None)
            .unwrap();
        engine
            .state_mut()
            .warehouse
            .receive_lot("X", 5, d(2025, 1, 1), None)
            .unwrap();

        engine.allocate_unit(kit, "Y").unwrap();
        assert_eq!(
            engine.allocate_unit(kit, "X").unwrap_err(),
            DomainError::CapacityExceeded {
                scope: CapacityScope::Kit,
                limit: 1
            }
        );
        assert_eq!(engine.state().warehouse.total_units("X"), 5);
    }

    #[test]
    fn unknown_kit_or_slot_is_not_found() {
        let (mut engine, kit) = engine_with_kit(50, None);
        assert!(matches!(
            engine.allocate_unit(KitId::new(), "X"),
            Err(DomainError::NotFound(_))
        ));
        assert!(matches!(
            engine.return_unit(kit, "Z"),
            Err(DomainError::NotFound(_))
        ));
        assert!(matches!(
            engine.bulk_adjust(kit, "Z", 2),
            Err(DomainError::NotFound(_))
        ));
    }

    #[test]
    fn return_removes_oldest_arrival_not_soonest_expiry() {
        let (mut engine, kit) = engine_with_kit(50, None);
        let warehouse = &mut engine.state_mut().warehouse;
        warehouse.receive_lot("X", 1, d(2025, 6, 1), None).unwrap();
        engine.allocate_unit(kit, "X").unwrap();
        engine
            .state_mut()
            .warehouse
            .receive_lot("X", 1, d(2025, 2, 1), None)
            .unwrap();
        engine.allocate_unit(kit, "X").unwrap();
        assert_eq!(
            engine.state().kits.get_item(kit, "X").unwrap().expiry_dates(),
            &[d(2025, 6, 1), d(2025, 2, 1)]
        );

        let event = engine.return_unit(kit, "X").unwrap();
        assert_eq!(event.expiry_date(), d(2025, 6, 1));
        assert_eq!(
            engine.state().kits.get_item(kit, "X").unwrap().expiry_dates(),
            &[d(2025, 2, 1)]
        );
        let lots = engine.state().warehouse.lots();
        assert_eq!(lots.len(), 1);
        assert_eq!(lots[0].expiry_date, d(2025, 6, 1));
    }

    #[test]
    fn return_into_a_full_lot_fails_without_side_effects() {
        let (mut engine, kit) = engine_with_kit(50, None);
        engine
            .state_mut()
            .warehouse
            .receive_lot("X", 1, d(2025, 6, 1), None)
            .unwrap();
        engine.allocate_unit(kit, "X").unwrap();
        engine
            .state_mut()
            .warehouse
            .receive_lot("X", u32::MAX, d(2025, 6, 1), None)
            .unwrap();

        let before = engine.state().clone();
        assert!(matches!(
            engine.return_unit(kit, "X"),
            Err(DomainError::Validation(_))
        ));
        assert_eq!(engine.state(), &before);
    }

    #[test]
    fn return_from_empty_slot_fails() {
        let (mut engine, kit) = engine_with_kit(50, None);
        assert!(matches!(
            engine.return_unit(kit, "X"),
            Err(DomainError::NothingToReturn { .. })
        ));
    }

    #[test]
    fn consume_requires_an_exact_expiry_match() {
        let (mut engine, kit) = engine_with_kit(50, None);
        engine
            .state_mut()
            .warehouse
            .receive_lot("X", 2, d(2025, 1, 1), None)
            .unwrap();
        engine.allocate_unit(kit, "X").unwrap();

        let err = engine.consume_unit(kit, "X", d(2025, 1, 2)).unwrap_err();
        assert!(matches!(err, DomainError::InvalidExpiry { .. }));
        assert_eq!(engine.state().kits.get_item(kit, "X").unwrap().current_quantity(), 1);

        engine.consume_unit(kit, "X", d(2025, 1, 1)).unwrap();
        assert!(engine.state().kits.get_item(kit, "X").unwrap().is_empty());
        assert_eq!(engine.state().warehouse.total_units("X"), 1);
    }

    #[test]
    fn bulk_increase_stops_at_capacity_and_keeps_applied_units() {
        let (mut engine, kit) = engine_with_kit(50, Some(3));
        engine
            .state_mut()
            .warehouse
            .receive_lot("X", 10, d(2025, 1, 1), None)
            .unwrap();

        let adjustment = engine.bulk_adjust(kit, "X", 5).unwrap();
        assert_eq!(adjustment.requested, 5);
        assert_eq!(adjustment.applied, 3);
        assert_eq!(adjustment.events.len(), 3);
        assert!(!adjustment.is_complete());
        assert!(matches!(
            adjustment.halted,
            Some(DomainError::CapacityExceeded {
                scope: CapacityScope::Slot,
                limit: 3
            })
        ));
        assert_eq!(engine.state().warehouse.total_units("X"), 7);
    }

    #[test]
    fn bulk_decrease_discards_without_credit() {
        let (mut engine, kit) = engine_with_kit(50, None);
        engine
            .state_mut()
            .warehouse
            .receive_lot("X", 2, d(2025, 1, 1), None)
            .unwrap();
        engine.bulk_adjust(kit, "X", 2).unwrap();

        let adjustment = engine.bulk_adjust(kit, "X", -3).unwrap();
        assert_eq!(adjustment.applied, 2);
        assert!(matches!(
            adjustment.halted,
            Some(DomainError::NothingToReturn { .. })
        ));
        assert!(adjustment
            .events
            .iter()
            .all(|e| matches!(e, InventoryEvent::UnitDiscarded(_))));
        assert_eq!(engine.state().units_of("X"), 0);
    }

    #[test]
    fn zero_delta_is_a_complete_no_op() {
        let (mut engine, kit) = engine_with_kit(50, None);
        let adjustment = engine.bulk_adjust(kit, "X", 0).unwrap();
        assert!(adjustment.is_complete());
        assert!(adjustment.events.is_empty());
        assert!(adjustment.halted.is_none());
    }

    #[cfg(test)]
    mod proptest_tests {
        use super::*;
        use proptest::prelude::*;

        #[derive(Debug, Clone)]
        enum Op {
            Allocate(usize),
            Return(usize),
            Consume(usize, usize),
            Adjust(usize, i32),
        }

        const CODES: [&str; 2] = ["X", "Y"];

        fn op() -> impl Strategy<Value = Op> {
            prop_oneof![
                (0..2usize).prop_map(Op::Allocate),
                (0..2usize).prop_map(Op::Return),
                (0..2usize, 0..8usize).prop_map(|(m, i)| Op::Consume(m, i)),
                (0..2usize, -4i32..5).prop_map(|(m, delta)| Op::Adjust(m, delta)),
            ]
        }

        fn lots() -> impl Strategy<Value = Vec<(usize, u32, i64)>> {
            prop::collection::vec((0..2usize, 1u32..5, -30i64..400), 0..8)
        }

        fn seeded(
            lots: &[(usize, u32, i64)],
            kit_capacity: u32,
            slot_capacity: u32,
        ) -> (AllocationEngine<MaterialCatalog, FixedClock>, KitId) {
            let (mut engine, kit) = engine_with_kit(kit_capacity, Some(slot_capacity));
            let today = engine.clock().today();
            for (m, qty, offset) in lots {
                engine
                    .state_mut()
                    .warehouse
                    .receive_lot(CODES[*m], *qty, today + chrono::Duration::days(*offset), None)
                    .unwrap();
            }
            (engine, kit)
        }

        proptest! {
            #![proptest_config(ProptestConfig {
                cases: 256,
                ..ProptestConfig::default()
            })]

            /// Property: allocate/return cycles neither create nor destroy units.
            #[test]
            fn allocate_and_return_conserve_units(
                lots in lots(),
                steps in prop::collection::vec((any::<bool>(), 0..2usize), 0..40),
                kit_capacity in 1u32..12,
                slot_capacity in 1u32..8,
            ) {
                let (mut engine, kit) = seeded(&lots, kit_capacity, slot_capacity);
                let before: Vec<u64> = CODES.iter().map(|c| engine.state().units_of(c)).collect();

                for (allocate, m) in steps {
                    let _ = if allocate {
                        engine.allocate_unit(kit, CODES[m])
                    } else {
                        engine.return_unit(kit, CODES[m])
                    };
                    let now: Vec<u64> = CODES.iter().map(|c| engine.state().units_of(c)).collect();
                    prop_assert_eq!(&before, &now);
                }
            }

            /// Property: no sequence of operations breaks capacity or leaves empty lots.
            #[test]
            fn invariants_hold_after_every_operation(
                lots in lots(),
                ops in prop::collection::vec(op(), 0..40),
                kit_capacity in 1u32..12,
                slot_capacity in 1u32..8,
            ) {
                let (mut engine, kit) = seeded(&lots, kit_capacity, slot_capacity);

                for op in ops {
                    let snapshot = engine.state().clone();
                    let result = match op {
                        Op::Allocate(m) => engine.allocate_unit(kit, CODES[m]).map(|_| ()),
                        Op::Return(m) => engine.return_unit(kit, CODES[m]).map(|_| ()),
                        Op::Consume(m, i) => {
                            let held = engine.state().kits.get_item(kit, CODES[m]).unwrap().expiry_dates().to_vec();
                            let date = held.get(i).copied().unwrap_or(engine.clock().today());
                            engine.consume_unit(kit, CODES[m], date).map(|_| ())
                        }
                        Op::Adjust(m, delta) => engine.bulk_adjust(kit, CODES[m], delta).map(|_| ()),
                    };

                    prop_assert!(engine.state().check_invariants().is_ok());
                    if result.is_err() {
                        prop_assert_eq!(&snapshot, engine.state());
                    }
                }
            }

            /// Property: allocation always takes the soonest-expiring unexpired unit.
            #[test]
            fn allocation_is_fifo_by_expiry(
                lots in lots(),
                picks in prop::collection::vec(0..2usize, 1..20),
            ) {
                let (mut engine, kit) = seeded(&lots, 50, 7);
                let today = engine.clock().today();

                for m in picks {
                    let expected = engine
                        .state()
                        .warehouse
                        .lots()
                        .iter()
                        .filter(|l| l.material_code == CODES[m] && l.expiry_date >= today)
                        .map(|l| l.expiry_date)
                        .min();

                    match engine.allocate_unit(kit, CODES[m]) {
                        Ok(event) => {
                            prop_assert_eq!(Some(event.expiry_date()), expected);
                            prop_assert!(event.expiry_date() >= today);
                        }
                        Err(DomainError::OutOfStock { .. }) => prop_assert_eq!(expected, None),
                        Err(DomainError::CapacityExceeded { .. }) => {}
                        Err(other) => prop_assert!(false, "unexpected error {:?}", other),
                    }
                }
            }
        }
    }
}
