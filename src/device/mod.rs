//! Persistent-memory device layer
//!
//! # Architecture
//!
//! ```text
//! PersistentMemory (byte-addressable, bounded write endurance)
//!   ├─→ MemoryDevice  → Vec<u8> + per-cell write counters (tests, simulation)
//!   └─→ FileDevice    → emulated EEPROM image on disk
//! ```
//!
//! The wear-leveling core only ever talks to a device through this trait.
//! Multi-byte values go through `write_value`, which updates byte by byte so
//! cells that already hold the right byte are not rewritten.

pub mod file;
pub mod memory;

pub use file::FileDevice;
pub use memory::MemoryDevice;

use crate::error::{Error, Result};
use crate::value::CellValue;
use tracing::info;

/// Factory state of an EEPROM cell.
pub const ERASED_BYTE: u8 = 0xFF;

/// Byte-addressable persistent memory
pub trait PersistentMemory {
    /// Device size in bytes. Valid addresses are `0..capacity()`.
    fn capacity(&self) -> u32;

    fn read_byte(&self, address: u32) -> Result<u8>;

    /// Unconditional write. Always costs one write cycle.
    fn write_byte(&mut self, address: u32, value: u8) -> Result<()>;

    /// Write only if the stored byte differs.
    fn update_byte(&mut self, address: u32, value: u8) -> Result<()> {
        if self.read_byte(address)? != value {
            self.write_byte(address, value)?;
        }
        Ok(())
    }

    fn read_bytes(&self, address: u32, buf: &mut [u8]) -> Result<()> {
        check_range(self.capacity(), address, buf.len())?;
        for (offset, byte) in buf.iter_mut().enumerate() {
            *byte = self.read_byte(address + offset as u32)?;
        }
        Ok(())
    }

    fn write_bytes(&mut self, address: u32, bytes: &[u8]) -> Result<()> {
        check_range(self.capacity(), address, bytes.len())?;
        for (offset, &byte) in bytes.iter().enumerate() {
            self.write_byte(address + offset as u32, byte)?;
        }
        Ok(())
    }

    fn update_bytes(&mut self, address: u32, bytes: &[u8]) -> Result<()> {
        check_range(self.capacity(), address, bytes.len())?;
        for (offset, &byte) in bytes.iter().enumerate() {
            self.update_byte(address + offset as u32, byte)?;
        }
        Ok(())
    }

    fn read_value<T: CellValue>(&self, address: u32) -> Result<T>
    where
        Self: Sized,
    {
        let mut buf = vec![0u8; T::SIZE];
        self.read_bytes(address, &mut buf)?;
        Ok(T::decode(&buf))
    }

    fn write_value<T: CellValue>(&mut self, address: u32, value: &T) -> Result<()>
    where
        Self: Sized,
    {
        let mut buf = vec![0u8; T::SIZE];
        value.encode(&mut buf);
        self.update_bytes(address, &buf)
    }

    /// Make previous writes durable
    fn flush(&mut self) -> Result<()> {
        Ok(())
    }
}

/// Reject an access of `len` bytes at `address` that leaves `0..capacity`.
pub(crate) fn check_range(capacity: u32, address: u32, len: usize) -> Result<()> {
    let end = (address as u64).checked_add(len as u64);
    match end {
        Some(end) if end <= capacity as u64 => Ok(()),
        _ => Err(Error::AddressOutOfRange {
            address,
            len,
            capacity,
        }),
    }
}

/// Fill `len` bytes starting at `base` with `pattern`.
///
/// Uses `update_byte`, so cells already holding the pattern are left alone.
/// Not part of the ring algorithm: callers run it before building a store
/// when they want a known starting state.
pub fn erase_region<D: PersistentMemory + ?Sized>(
    device: &mut D,
    base: u32,
    len: u32,
    pattern: u8,
) -> Result<()> {
    check_range(device.capacity(), base, len as usize)?;
    info!(base, len, pattern, "Erasing region");
    for address in base..base + len {
        device.update_byte(address, pattern)?;
    }
    device.flush()
}
