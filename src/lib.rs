// wearslot - wear-leveling ring storage for EEPROM-class memory
// Spreads repeated writes of fixed-size values across many physical cells

#![warn(rust_2018_idioms)]

pub mod config;
pub mod device;
pub mod value;
pub mod wear;

// Re-exports for convenience
pub use crate::config::{StoreConfig, ValueKind};
pub use device::{erase_region, FileDevice, MemoryDevice, PersistentMemory, ERASED_BYTE};
pub use value::CellValue;
pub use wear::{BlockInfo, RegionLayout, Seam, SlotStore, WearLevelBlock};

/// wearslot error types
pub mod error {
    use thiserror::Error;

    #[derive(Error, Debug)]
    pub enum Error {
        #[error("Invalid configuration: {0}")]
        InvalidConfig(String),

        #[error("Slot index {index} out of range (store has {slot_count} slots)")]
        SlotOutOfRange { index: usize, slot_count: usize },

        #[error("Address range {address}..+{len} outside device of {capacity} bytes")]
        AddressOutOfRange { address: u32, len: usize, capacity: u32 },

        #[error("I/O error: {0}")]
        Io(#[from] std::io::Error),

        #[error("Storage error: {0}")]
        Storage(String),
    }

    pub type Result<T> = std::result::Result<T, Error>;
}

/// Version information
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
