//! In-memory device
//!
//! A plain byte array standing in for EEPROM. Tracks how many times each
//! cell has been written so wear distribution can be inspected.

use super::{check_range, PersistentMemory, ERASED_BYTE};
use crate::error::Result;

/// In-memory persistent-memory double
#[derive(Debug, Clone)]
pub struct MemoryDevice {
    cells: Vec<u8>,
    writes: Vec<u32>,
}

impl MemoryDevice {
    /// Create a device of `capacity` bytes in the erased state (0xFF)
    pub fn new(capacity: u32) -> Self {
        Self::with_fill(capacity, ERASED_BYTE)
    }

    /// Create a device with every cell set to `fill`
    pub fn with_fill(capacity: u32, fill: u8) -> Self {
        Self {
            cells: vec![fill; capacity as usize],
            writes: vec![0; capacity as usize],
        }
    }

    /// Wrap an existing memory image
    pub fn from_bytes(bytes: Vec<u8>) -> Self {
        let writes = vec![0; bytes.len()];
        Self {
            cells: bytes,
            writes,
        }
    }

    /// Raw memory image
    pub fn as_bytes(&self) -> &[u8] {
        &self.cells
    }

    /// Number of physical writes `address` has absorbed
    pub fn write_count(&self, address: u32) -> u32 {
        self.writes.get(address as usize).copied().unwrap_or(0)
    }

    /// Highest write count of any single cell
    pub fn max_write_count(&self) -> u32 {
        self.writes.iter().copied().max().unwrap_or(0)
    }

    /// Total physical writes across all cells
    pub fn total_writes(&self) -> u64 {
        self.writes.iter().map(|&w| w as u64).sum()
    }

    /// Forget recorded wear without touching contents
    pub fn reset_wear(&mut self) {
        self.writes.iter_mut().for_each(|w| *w = 0);
    }
}

impl PersistentMemory for MemoryDevice {
    fn capacity(&self) -> u32 {
        self.cells.len() as u32
    }

    fn read_byte(&self, address: u32) -> Result<u8> {
        check_range(self.capacity(), address, 1)?;
        Ok(self.cells[address as usize])
    }

    fn write_byte(&mut self, address: u32, value: u8) -> Result<()> {
        check_range(self.capacity(), address, 1)?;
        self.cells[address as usize] = value;
        self.writes[address as usize] = self.writes[address as usize].saturating_add(1);
        Ok(())
    }

    fn read_bytes(&self, address: u32, buf: &mut [u8]) -> Result<()> {
        check_range(self.capacity(), address, buf.len())?;
        let start = address as usize;
        buf.copy_from_slice(&self.cells[start..start + buf.len()]);
        Ok(())
    }
}
