//! Operator command line over the inventory service.

pub mod cli;
pub mod commands;
pub mod output;

pub use cli::{Cli, Commands};
pub use commands::run;
