//! Partition planning
//!
//! Splits a reserved region into one equal partition per slot. Inside each
//! partition the data ring comes first and the status ring follows it, in a
//! `value_size : 1` byte ratio.

use crate::error::{Error, Result};
use serde::{Deserialize, Serialize};

/// Largest ring the 8-bit status counters can track.
///
/// On uniformly erased memory cell `k` receives `erased + 1 + k`, so cell 254
/// is followed by an untouched cell that already looks consecutive. Any ring
/// past 255 cells would lose its seam during the first fill.
pub const MAX_CAPACITY: u64 = 255;

/// Address bounds of one slot's rings (all bounds inclusive)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct RegionLayout {
    pub data_begin: u32,
    pub data_end: u32,
    pub status_begin: u32,
    pub status_end: u32,
}

impl RegionLayout {
    /// Number of (data cell, status byte) pairs
    pub fn capacity(&self) -> u32 {
        self.status_end - self.status_begin + 1
    }

    /// Bytes occupied by the data ring
    pub fn data_len(&self) -> u32 {
        self.data_end - self.data_begin + 1
    }

    /// First address past the status ring
    pub fn end(&self) -> u64 {
        self.status_end as u64 + 1
    }

    /// Address of the data cell paired with `status_addr`
    pub fn data_cell(&self, status_addr: u32, value_size: usize) -> u32 {
        self.data_begin + (status_addr - self.status_begin) * value_size as u32
    }

    /// Whether two layouts share any address
    pub fn overlaps(&self, other: &RegionLayout) -> bool {
        (self.data_begin as u64) < other.end() && (other.data_begin as u64) < self.end()
    }
}

/// Compute the layout of every slot.
///
/// `capacity = (total_bytes / slot_count) / (value_size + 1)`; trailing
/// remainder bytes stay unused. Rejects any configuration that would leave
/// a slot without a usable ring, or with more cells than [`MAX_CAPACITY`].
pub fn plan_partitions(
    base_address: u32,
    total_bytes: u32,
    slot_count: usize,
    value_size: usize,
) -> Result<Vec<RegionLayout>> {
    if slot_count == 0 {
        return Err(Error::InvalidConfig("slot_count must be at least 1".into()));
    }
    if value_size == 0 {
        return Err(Error::InvalidConfig("value size must be at least 1 byte".into()));
    }
    if (base_address as u64) + (total_bytes as u64) > u32::MAX as u64 + 1 {
        return Err(Error::InvalidConfig(format!(
            "region {}..+{} exceeds the 32-bit address space",
            base_address, total_bytes
        )));
    }

    let partition_size = total_bytes as u64 / slot_count as u64;
    let cell_size = value_size as u64 + 1;
    if partition_size < cell_size {
        return Err(Error::InvalidConfig(format!(
            "{} bytes across {} slots leaves {} bytes per slot, need at least {}",
            total_bytes, slot_count, partition_size, cell_size
        )));
    }

    let capacity = partition_size / cell_size;
    if capacity > MAX_CAPACITY {
        return Err(Error::InvalidConfig(format!(
            "ring capacity {} exceeds {} cells; shrink total_bytes or add slots",
            capacity, MAX_CAPACITY
        )));
    }
    let data_bytes = capacity * value_size as u64;

    let layouts = (0..slot_count as u64)
        .map(|i| {
            let data_begin = base_address as u64 + i * partition_size;
            let data_end = data_begin + data_bytes - 1;
            let status_begin = data_end + 1;
            let status_end = status_begin + capacity - 1;
            RegionLayout {
                data_begin: data_begin as u32,
                data_end: data_end as u32,
                status_begin: status_begin as u32,
                status_end: status_end as u32,
            }
        })
        .collect();

    Ok(layouts)
}
