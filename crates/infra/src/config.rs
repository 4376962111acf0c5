//! Configuration loading and representation.
//!
//! Sources, highest priority first:
//! 1. `MEDKIT_*` environment variables (`__` separates sections, e.g.
//!    `MEDKIT_INVENTORY__EXPIRING_SOON_DAYS=14`)
//! 2. a TOML file (`medkit.toml` in the working directory unless a path is given)
//! 3. built-in defaults

use std::path::{Path, PathBuf};

use figment::{
    Figment,
    providers::{Env, Format, Serialized, Toml},
};
use serde::{Deserialize, Serialize};
use thiserror::Error;

use medkit_inventory::DEFAULT_KIT_CAPACITY;

pub const DEFAULT_CONFIG_FILE: &str = "medkit.toml";

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("configuration error: {0}")]
    Figment(#[from] Box<figment::Error>),

    #[error("configuration file not found: {0}")]
    MissingFile(PathBuf),

    #[error("invalid configuration value for '{field}': {reason}")]
    InvalidValue { field: String, reason: String },
}

impl From<figment::Error> for ConfigError {
    fn from(value: figment::Error) -> Self {
        Self::Figment(Box::new(value))
    }
}

const fn default_kit_capacity() -> u32 {
    DEFAULT_KIT_CAPACITY
}

const fn default_expiring_soon_days() -> u32 {
    30
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
pub struct InventoryConfig {
    /// Capacity for kits whose template does not set one.
    #[serde(default = "default_kit_capacity")]
    pub default_kit_capacity: u32,

    /// Horizon of the "expiring soon" dashboard view.
    #[serde(default = "default_expiring_soon_days")]
    pub expiring_soon_days: u32,
}

impl Default for InventoryConfig {
    fn default() -> Self {
        Self {
            default_kit_capacity: default_kit_capacity(),
            expiring_soon_days: default_expiring_soon_days(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
pub struct StorageConfig {
    pub snapshot_path: PathBuf,
    pub catalog_path: PathBuf,
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self {
            snapshot_path: PathBuf::from("medkit-state.json"),
            catalog_path: PathBuf::from("medkit-catalog.json"),
        }
    }
}

#[derive(Debug, Copy, Clone, PartialEq, Eq, Default, Deserialize, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum LogOutput {
    #[default]
    Json,
    Pretty,
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
pub struct LogConfig {
    /// `EnvFilter` directive; `RUST_LOG` still wins when set.
    pub filter: String,
    pub format: LogOutput,
}

impl Default for LogConfig {
    fn default() -> Self {
        Self {
            filter: "info".to_string(),
            format: LogOutput::Json,
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize, Serialize)]
pub struct MedkitConfig {
    #[serde(default)]
    pub inventory: InventoryConfig,
    #[serde(default)]
    pub storage: StorageConfig,
    #[serde(default)]
    pub log: LogConfig,
}

impl MedkitConfig {
    /// Load from all sources. An explicit `path` must exist; the default
    /// `medkit.toml` is optional.
    pub fn load(path: Option<&Path>) -> Result<Self, ConfigError> {
        if let Some(path) = path {
            if !path.exists() {
                return Err(ConfigError::MissingFile(path.to_path_buf()));
            }
        }
        let config: Self = Self::figment(path).extract()?;
        config.validate()?;
        Ok(config)
    }

    pub fn figment(path: Option<&Path>) -> Figment {
        let file = path.map_or_else(|| PathBuf::from(DEFAULT_CONFIG_FILE), Path::to_path_buf);
        Figment::from(Serialized::defaults(Self::default()))
            .merge(Toml::file(file))
            .merge(Env::prefixed("MEDKIT_").split("__"))
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.inventory.default_kit_capacity == 0 {
            return Err(ConfigError::InvalidValue {
                field: "inventory.default_kit_capacity".to_string(),
                reason: "must be at least 1".to_string(),
            });
        }
        for (field, path) in [
            ("storage.snapshot_path", &self.storage.snapshot_path),
            ("storage.catalog_path", &self.storage.catalog_path),
        ] {
            if path.as_os_str().is_empty() {
                return Err(ConfigError::InvalidValue {
                    field: field.to_string(),
                    reason: "cannot be empty".to_string(),
                });
            }
        }
        Ok(())
    }
}
