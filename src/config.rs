//! Store configuration
//!
//! Loaded in layers: built-in defaults, then an optional TOML file, then
//! `WEARSLOT__*` environment variables (e.g. `WEARSLOT__SLOT_COUNT=8`,
//! `WEARSLOT__DEVICE__PATH=/tmp/eeprom.bin`).

use crate::device::ERASED_BYTE;
use crate::error::{Error, Result};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::{Path, PathBuf};
use std::str::FromStr;
use tracing::debug;

/// Environment prefix for configuration overrides
pub const ENV_PREFIX: &str = "WEARSLOT";

/// Value type stored in every slot
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ValueKind {
    U8,
    U16,
    U32,
    U64,
    I8,
    I16,
    I32,
    I64,
    F32,
    F64,
}

impl ValueKind {
    /// Encoded width in bytes
    pub fn size(self) -> usize {
        match self {
            ValueKind::U8 | ValueKind::I8 => 1,
            ValueKind::U16 | ValueKind::I16 => 2,
            ValueKind::U32 | ValueKind::I32 | ValueKind::F32 => 4,
            ValueKind::U64 | ValueKind::I64 | ValueKind::F64 => 8,
        }
    }

    fn name(self) -> &'static str {
        match self {
            ValueKind::U8 => "u8",
            ValueKind::U16 => "u16",
            ValueKind::U32 => "u32",
            ValueKind::U64 => "u64",
            ValueKind::I8 => "i8",
            ValueKind::I16 => "i16",
            ValueKind::I32 => "i32",
            ValueKind::I64 => "i64",
            ValueKind::F32 => "f32",
            ValueKind::F64 => "f64",
        }
    }
}

impl fmt::Display for ValueKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for ValueKind {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.to_ascii_lowercase().as_str() {
            "u8" => Ok(ValueKind::U8),
            "u16" => Ok(ValueKind::U16),
            "u32" => Ok(ValueKind::U32),
            "u64" => Ok(ValueKind::U64),
            "i8" => Ok(ValueKind::I8),
            "i16" => Ok(ValueKind::I16),
            "i32" => Ok(ValueKind::I32),
            "i64" => Ok(ValueKind::I64),
            "f32" => Ok(ValueKind::F32),
            "f64" => Ok(ValueKind::F64),
            other => Err(Error::InvalidConfig(format!("unknown value type: {}", other))),
        }
    }
}

/// Backing device settings
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct DeviceConfig {
    /// Image file emulating the EEPROM
    pub path: PathBuf,
    /// Device size in bytes
    pub capacity: u32,
}

impl Default for DeviceConfig {
    fn default() -> Self {
        Self {
            path: PathBuf::from("data/eeprom.bin"),
            capacity: 1024,
        }
    }
}

/// Slot store settings
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct StoreConfig {
    /// First byte of the reserved region
    pub base_address: u32,
    /// Size of the reserved region in bytes
    pub total_bytes: u32,
    /// Number of value slots
    pub slot_count: usize,
    /// Type stored in every slot
    pub value_type: ValueKind,
    /// Byte written by `erase`
    pub erase_pattern: u8,
    pub device: DeviceConfig,
}

impl Default for StoreConfig {
    fn default() -> Self {
        Self {
            base_address: 0,
            total_bytes: 1024,
            slot_count: 4,
            value_type: ValueKind::U32,
            erase_pattern: ERASED_BYTE,
            device: DeviceConfig::default(),
        }
    }
}

impl StoreConfig {
    /// Load defaults, then `path` (if given and present), then environment overrides
    pub fn load(path: Option<&Path>) -> Result<Self> {
        let mut builder = config::Config::builder()
            .add_source(config::Config::try_from(&StoreConfig::default()).map_err(config_error)?);

        if let Some(path) = path {
            debug!(path = ?path, "Reading configuration file");
            builder = builder.add_source(config::File::from(path).required(false));
        }

        let config: StoreConfig = builder
            .add_source(
                config::Environment::with_prefix(ENV_PREFIX)
                    .prefix_separator("__")
                    .separator("__")
                    .try_parsing(true),
            )
            .build()
            .map_err(config_error)?
            .try_deserialize()
            .map_err(config_error)?;

        config.validate()?;
        Ok(config)
    }

    /// Parse a TOML document on top of the defaults
    pub fn from_toml(text: &str) -> Result<Self> {
        let config: StoreConfig = toml::from_str(text)
            .map_err(|e| Error::InvalidConfig(format!("Failed to parse config: {}", e)))?;
        config.validate()?;
        Ok(config)
    }

    /// Render as TOML
    pub fn to_toml(&self) -> Result<String> {
        toml::to_string_pretty(self)
            .map_err(|e| Error::InvalidConfig(format!("Failed to serialize config: {}", e)))
    }

    /// Cheap checks that do not need the partition planner
    pub fn validate(&self) -> Result<()> {
        if self.slot_count == 0 {
            return Err(Error::InvalidConfig("slot_count must be at least 1".into()));
        }
        if self.base_address as u64 + self.total_bytes as u64 > self.device.capacity as u64 {
            return Err(Error::InvalidConfig(format!(
                "region {}..+{} exceeds device capacity {}",
                self.base_address, self.total_bytes, self.device.capacity
            )));
        }
        Ok(())
    }
}

fn config_error(err: config::ConfigError) -> Error {
    Error::InvalidConfig(err.to_string())
}
