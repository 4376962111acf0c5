use std::path::PathBuf;

use chrono::NaiveDate;
use clap::{Parser, Subcommand};

use medkit_core::KitId;

/// Top-level CLI parser for the `medkit` binary.
#[derive(Debug, Parser)]
#[command(name = "medkit", version, about = "First-aid kit and warehouse stock keeping")]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,

    /// Configuration file (defaults to ./medkit.toml when present)
    #[arg(short, long, global = true)]
    pub config: Option<PathBuf>,

    /// Human-readable logs instead of JSON
    #[arg(long, global = true)]
    pub pretty_logs: bool,
}

#[derive(Clone, Debug, Subcommand)]
pub enum Commands {
    /// Move one unit from the warehouse into a kit.
    Allocate(SlotArgs),
    /// Send the oldest unit in a kit slot back to the warehouse.
    Return(SlotArgs),
    /// Record that a unit with the given expiry was used up.
    Consume {
        #[command(flatten)]
        slot: SlotArgs,
        /// Expiry date of the unit, YYYY-MM-DD
        #[arg(long)]
        expiry: NaiveDate,
        /// Confirm the irreversible removal
        #[arg(long)]
        yes: bool,
    },
    /// Apply a signed number of single-unit steps to a kit slot.
    Adjust {
        #[command(flatten)]
        slot: SlotArgs,
        #[arg(long, allow_negative_numbers = true)]
        delta: i32,
    },
    /// Register a new warehouse lot.
    Receive {
        #[arg(long)]
        material: String,
        #[arg(long)]
        quantity: u32,
        /// YYYY-MM-DD
        #[arg(long)]
        expiry: NaiveDate,
        #[arg(long)]
        notes: Option<String>,
    },
    /// Create an empty kit from a JSON template file.
    CreateKit {
        template: PathBuf,
    },
    /// Stock expiring in a calendar month.
    Expiring {
        #[arg(long)]
        month: u32,
        #[arg(long)]
        year: i32,
    },
    /// Stock expiring within the next N days.
    ExpiringSoon {
        /// Defaults to inventory.expiring_soon_days
        #[arg(long)]
        days: Option<u32>,
    },
    /// Materials missing from the warehouse and empty kit slots.
    ZeroStock,
    /// Stock already past expiry.
    Expired,
    /// Dump the whole inventory.
    Show,
}

#[derive(Clone, Debug, clap::Args)]
pub struct SlotArgs {
    #[arg(long)]
    pub kit: KitId,
    #[arg(long)]
    pub material: String,
}
