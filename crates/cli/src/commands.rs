use std::fs;
use std::path::Path;

use anyhow::{bail, Context};
use serde_json::json;
use tracing::debug;

use medkit_core::SystemClock;
use medkit_events::InMemoryEventBus;
use medkit_infra::{
    load_catalog, InventoryService, JsonFileSnapshotStore, LogOutput, MedkitConfig,
};
use medkit_inventory::{InventoryEvent, KitTemplate};
use medkit_observability::LogFormat;

use crate::cli::{Cli, Commands};
use crate::output::{output, AdjustmentReport, ExpiredReport};

type Service = InventoryService<JsonFileSnapshotStore, InMemoryEventBus<InventoryEvent>, SystemClock>;

pub fn run(cli: Cli) -> anyhow::Result<()> {
    let config = MedkitConfig::load(cli.config.as_deref()).context("loading configuration")?;

    let format = match (cli.pretty_logs, config.log.format) {
        (true, _) | (false, LogOutput::Pretty) => LogFormat::Pretty,
        (false, LogOutput::Json) => LogFormat::Json,
    };
    medkit_observability::init_with(Some(config.log.filter.as_str()), format);

    let service = open_service(&config)?;
    dispatch(&service, &config, cli.command)
}

fn open_service(config: &MedkitConfig) -> anyhow::Result<Service> {
    let catalog = load_catalog(&config.storage.catalog_path).with_context(|| {
        format!("loading catalog {}", config.storage.catalog_path.display())
    })?;
    debug!(materials = catalog.len(), "catalog loaded");

    let service = InventoryService::open(
        catalog,
        JsonFileSnapshotStore::new(&config.storage.snapshot_path),
        InMemoryEventBus::new(),
        SystemClock,
    )
    .with_context(|| format!("opening snapshot {}", config.storage.snapshot_path.display()))?;
    Ok(service.with_default_kit_capacity(config.inventory.default_kit_capacity))
}

pub fn dispatch(service: &Service, config: &MedkitConfig, command: Commands) -> anyhow::Result<()> {
    match command {
        Commands::Allocate(slot) => output(&service.allocate_unit(slot.kit, &slot.material)?),
        Commands::Return(slot) => output(&service.return_unit(slot.kit, &slot.material)?),
        Commands::Consume { slot, expiry, yes } => {
            if !yes {
                bail!("consuming a unit cannot be undone; pass --yes to confirm");
            }
            output(&service.consume_unit(slot.kit, &slot.material, expiry)?)
        }
        Commands::Adjust { slot, delta } => {
            let adjustment = service.bulk_adjust(slot.kit, &slot.material, delta)?;
            output(&AdjustmentReport::from(adjustment))
        }
        Commands::Receive {
            material,
            quantity,
            expiry,
            notes,
        } => {
            let lot_id = service.receive_lot(&material, quantity, expiry, notes)?;
            output(&json!({ "lot_id": lot_id }))
        }
        Commands::CreateKit { template } => {
            let template = read_template(&template)?;
            let kit_id = service.create_kit(template)?;
            output(&json!({ "kit_id": kit_id }))
        }
        Commands::Expiring { month, year } => {
            let rows = service.with_queries(|q| q.expiring_items(month, year))??;
            output(&rows)
        }
        Commands::ExpiringSoon { days } => {
            let days = days.unwrap_or(config.inventory.expiring_soon_days);
            output(&service.with_queries(|q| q.expiring_within(days))?)
        }
        Commands::ZeroStock => output(&service.with_queries(|q| q.zero_quantity_items())?),
        Commands::Expired => {
            let report = service.with_queries(|q| ExpiredReport {
                warehouse: q.expired_items(),
                kits: q.expired_kit_units(),
            })?;
            output(&report)
        }
        Commands::Show => output(&service.snapshot()?),
    }
}

fn read_template(path: &Path) -> anyhow::Result<KitTemplate> {
    let raw = fs::read_to_string(path)
        .with_context(|| format!("reading kit template {}", path.display()))?;
    serde_json::from_str(&raw).with_context(|| format!("parsing kit template {}", path.display()))
}
