//! In-memory shape of warehouse stock and kits.

use chrono::{Datelike, NaiveDate};
use serde::{Deserialize, Serialize};

use medkit_core::{DomainError, DomainResult, KitId, LotId};

/// Kit capacity used when a template does not name one.
pub const DEFAULT_KIT_CAPACITY: u32 = 50;

/// Catalog reference data. Never mutated by the engine.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Material {
    pub code: String,
    pub name: String,
    #[serde(default)]
    pub tags: Vec<String>,
}

impl Material {
    pub fn new(code: impl Into<String>, name: impl Into<String>) -> Self {
        Self {
            code: code.into(),
            name: name.into(),
            tags: Vec::new(),
        }
    }

    pub fn with_tags(mut self, tags: impl IntoIterator<Item = impl Into<String>>) -> Self {
        self.tags = tags.into_iter().map(Into::into).collect();
        self
    }
}

/// One batch of a material sitting in the warehouse.
///
/// `quantity` is always positive while the lot exists; [`WarehouseStock`]
/// deletes a lot the moment it would drop to zero.
///
/// [`WarehouseStock`]: crate::warehouse::WarehouseStock
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct WarehouseLot {
    pub id: LotId,
    pub material_code: String,
    pub(crate) quantity: u32,
    pub expiry_date: NaiveDate,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub notes: Option<String>,
}

impl WarehouseLot {
    pub fn quantity(&self) -> u32 {
        self.quantity
    }

    pub fn is_expired(&self, today: NaiveDate) -> bool {
        self.expiry_date < today
    }
}

/// Capacity of a single kit slot.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SlotCapacity {
    Unbounded,
    Limited(u32),
}

impl SlotCapacity {
    /// Whether a slot already holding `held` units can take one more.
    pub fn admits_another(&self, held: usize) -> bool {
        match self {
            SlotCapacity::Unbounded => true,
            SlotCapacity::Limited(max) => held < *max as usize,
        }
    }

    pub fn limit(&self) -> Option<u32> {
        match self {
            SlotCapacity::Unbounded => None,
            SlotCapacity::Limited(max) => Some(*max),
        }
    }
}

impl From<Option<u32>> for SlotCapacity {
    fn from(value: Option<u32>) -> Self {
        value.map_or(SlotCapacity::Unbounded, SlotCapacity::Limited)
    }
}

/// One material slot in a kit.
///
/// Each entry of `expiry_dates` is one physical unit, in the order the units
/// arrived. The held quantity is the length of that sequence and is never
/// stored separately.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct KitItem {
    pub material_code: String,
    pub max_quantity: SlotCapacity,
    #[serde(default)]
    pub(crate) expiry_dates: Vec<NaiveDate>,
}

impl KitItem {
    pub fn empty(material_code: impl Into<String>, max_quantity: SlotCapacity) -> Self {
        Self {
            material_code: material_code.into(),
            max_quantity,
            expiry_dates: Vec::new(),
        }
    }

    /// A slot that already holds units, e.g. from an initial audit count.
    pub fn holding(
        material_code: impl Into<String>,
        max_quantity: SlotCapacity,
        expiry_dates: Vec<NaiveDate>,
    ) -> Self {
        Self {
            material_code: material_code.into(),
            max_quantity,
            expiry_dates,
        }
    }

    pub fn current_quantity(&self) -> usize {
        self.expiry_dates.len()
    }

    pub fn expiry_dates(&self) -> &[NaiveDate] {
        &self.expiry_dates
    }

    pub fn is_empty(&self) -> bool {
        self.expiry_dates.is_empty()
    }
}

/// A named, located container of material slots.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Kit {
    pub id: KitId,
    pub name: String,
    #[serde(default)]
    pub location: String,
    pub max_capacity: u32,
    #[serde(default)]
    pub items: Vec<KitItem>,
}

impl Kit {
    /// Units held across all slots.
    pub fn total_units(&self) -> usize {
        self.items.iter().map(KitItem::current_quantity).sum()
    }

    pub fn item(&self, material_code: &str) -> Option<&KitItem> {
        self.items.iter().find(|i| i.material_code == material_code)
    }

    pub(crate) fn item_mut(&mut self, material_code: &str) -> Option<&mut KitItem> {
        self.items.iter_mut().find(|i| i.material_code == material_code)
    }
}

/// Initial slot set for a new kit, supplied by whoever creates kits.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct KitTemplate {
    pub name: String,
    #[serde(default)]
    pub location: String,
    #[serde(default)]
    pub max_capacity: Option<u32>,
    pub items: Vec<KitTemplateItem>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct KitTemplateItem {
    pub material_code: String,
    #[serde(default)]
    pub max_quantity: Option<u32>,
}

/// A calendar month, used by "expiring in" reports.
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub struct MonthOfYear {
    month: u32,
    year: i32,
}

impl MonthOfYear {
    pub fn new(month: u32, year: i32) -> DomainResult<Self> {
        if !(1..=12).contains(&month) {
            return Err(DomainError::validation(format!(
                "month must be within 1..=12, got {month}"
            )));
        }
        Ok(Self { month, year })
    }

    pub fn contains(&self, date: NaiveDate) -> bool {
        date.month() == self.month && date.year() == self.year
    }
}
