//! Block introspection

use serde::{Deserialize, Serialize};
use std::fmt;

/// Snapshot of one slot's bounds and cursors
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct BlockInfo {
    /// Slot index within the store
    pub slot: usize,
    /// Encoded value width in bytes
    pub value_size: usize,
    pub data_begin: u32,
    pub data_end: u32,
    pub status_begin: u32,
    pub status_end: u32,
    /// Number of cells in the ring
    pub capacity: u32,
    /// Status address the next put will write
    pub next_write: u32,
    /// Data address the next get will read
    pub next_read: u32,
    /// False when the status ring had no seam and the first cell was assumed
    pub seam_found: bool,
}

impl fmt::Display for BlockInfo {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(
            f,
            "Slot {} ({}-byte values, {} cells)",
            self.slot, self.value_size, self.capacity
        )?;
        writeln!(f, "  Data:   {}..={}", self.data_begin, self.data_end)?;
        writeln!(f, "  Status: {}..={}", self.status_begin, self.status_end)?;
        writeln!(f, "  Next write (status): {}", self.next_write)?;
        write!(f, "  Next read (data):    {}", self.next_read)?;
        if !self.seam_found {
            write!(f, "\n  No seam in status ring, first cell assumed")?;
        }
        Ok(())
    }
}
