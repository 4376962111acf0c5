use serde::Serialize;

use medkit_inventory::{BulkAdjustment, InventoryEvent, StockRow};

/// Print a serializable response as pretty JSON on stdout.
pub fn output<T: Serialize>(value: &T) -> anyhow::Result<()> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}

#[derive(Debug, Serialize)]
pub struct AdjustmentReport {
    pub requested: u32,
    pub applied: u32,
    pub events: Vec<InventoryEvent>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub halted: Option<HaltReason>,
}

#[derive(Debug, Serialize)]
pub struct HaltReason {
    pub kind: &'static str,
    pub message: String,
}

impl From<BulkAdjustment> for AdjustmentReport {
    fn from(adj: BulkAdjustment) -> Self {
        Self {
            requested: adj.requested,
            applied: adj.applied,
            events: adj.events,
            halted: adj.halted.map(|err| HaltReason {
                kind: err.kind(),
                message: err.to_string(),
            }),
        }
    }
}

#[derive(Debug, Serialize)]
pub struct ExpiredReport {
    pub warehouse: Vec<StockRow>,
    pub kits: Vec<StockRow>,
}
