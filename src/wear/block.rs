//! Wear-level block: one slot's data ring and status ring
//!
//! The write cursor is never stored. Each status byte holds the previous
//! byte's value plus one (mod 256); the single place where that breaks is
//! the seam, and the seam is the next cell to overwrite. Every call rescans
//! the status ring, so a power loss can never leave a stale cursor behind.

use super::info::BlockInfo;
use super::planner::RegionLayout;
use crate::device::PersistentMemory;
use crate::error::{Error, Result};
use crate::value::CellValue;
use std::fmt;
use std::marker::PhantomData;
use tracing::{debug, warn};

/// Outcome of scanning a status ring
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Seam {
    /// Status address of the next cell to write
    Found(u32),
    /// Every counter follows its predecessor around the whole ring
    NotFound,
}

impl Seam {
    pub fn address(self) -> Option<u32> {
        match self {
            Seam::Found(addr) => Some(addr),
            Seam::NotFound => None,
        }
    }
}

/// Index of the first cell whose counter is not `previous + 1`.
///
/// Cell 0 is compared against the last cell, so a ring that has just wrapped
/// reports index 0.
pub fn locate_seam(ring: &[u8]) -> Option<usize> {
    let last = *ring.last()?;
    if ring[0] != last.wrapping_add(1) {
        return Some(0);
    }
    ring.windows(2)
        .position(|pair| pair[1] != pair[0].wrapping_add(1))
        .map(|i| i + 1)
}

/// Wear-leveled storage for a single value of type `T`
pub struct WearLevelBlock<T> {
    layout: RegionLayout,
    _value: PhantomData<fn() -> T>,
}

impl<T> fmt::Debug for WearLevelBlock<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("WearLevelBlock")
            .field("layout", &self.layout)
            .finish()
    }
}

impl<T: CellValue> WearLevelBlock<T> {
    /// Bind a block to its bounds. The layout must hold whole `T` cells,
    /// one per status byte.
    pub fn new(layout: RegionLayout) -> Result<Self> {
        let well_formed = layout.data_begin <= layout.data_end
            && layout.data_end < layout.status_begin
            && layout.status_begin <= layout.status_end
            && layout.data_len() as u64 == layout.capacity() as u64 * T::SIZE as u64;
        if !well_formed {
            return Err(Error::InvalidConfig(format!(
                "layout {:?} does not pair {}-byte cells with status bytes",
                layout,
                T::SIZE
            )));
        }
        Ok(Self {
            layout,
            _value: PhantomData,
        })
    }

    pub fn layout(&self) -> &RegionLayout {
        &self.layout
    }

    pub fn capacity(&self) -> u32 {
        self.layout.capacity()
    }

    fn status_ring<D: PersistentMemory>(&self, device: &D) -> Result<Vec<u8>> {
        let mut ring = vec![0u8; self.layout.capacity() as usize];
        device.read_bytes(self.layout.status_begin, &mut ring)?;
        Ok(ring)
    }

    /// Scan the status ring for the seam
    pub fn find_seam<D: PersistentMemory>(&self, device: &D) -> Result<Seam> {
        let ring = self.status_ring(device)?;
        Ok(match locate_seam(&ring) {
            Some(index) => Seam::Found(self.layout.status_begin + index as u32),
            None => Seam::NotFound,
        })
    }

    /// Status address where the next `put` lands.
    ///
    /// A ring without a seam (only possible on memory this block never wrote)
    /// starts over at the first cell.
    pub fn write_position<D: PersistentMemory>(&self, device: &D) -> Result<u32> {
        Ok(self.resolve(self.find_seam(device)?))
    }

    fn resolve(&self, seam: Seam) -> u32 {
        seam.address().unwrap_or_else(|| {
            warn!(
                status_begin = self.layout.status_begin,
                "Status ring has no seam, restarting at first cell"
            );
            self.layout.status_begin
        })
    }

    /// Status address preceding `status_addr` around the ring
    fn previous_status(&self, status_addr: u32) -> u32 {
        if status_addr == self.layout.status_begin {
            self.layout.status_end
        } else {
            status_addr - 1
        }
    }

    /// Counter to store at `write_addr`: its predecessor plus one
    pub fn next_status_value<D: PersistentMemory>(
        &self,
        device: &D,
        write_addr: u32,
    ) -> Result<u8> {
        let previous = device.read_byte(self.previous_status(write_addr))?;
        Ok(previous.wrapping_add(1))
    }

    /// Data address of the most recently written value
    pub fn read_position<D: PersistentMemory>(&self, device: &D) -> Result<u32> {
        let write_addr = self.write_position(device)?;
        Ok(self.layout.data_cell(self.previous_status(write_addr), T::SIZE))
    }

    /// Store `value` in the next cell of the ring.
    ///
    /// The data cell is written before its status byte; an interruption in
    /// between leaves the previous value current.
    pub fn put<D: PersistentMemory>(&self, device: &mut D, value: &T) -> Result<()> {
        let write_addr = self.write_position(device)?;
        let data_addr = self.layout.data_cell(write_addr, T::SIZE);
        device.write_value(data_addr, value)?;

        let status = self.next_status_value(device, write_addr)?;
        device.write_byte(write_addr, status)?;

        debug!(status_addr = write_addr, data_addr, status, "Put value");
        Ok(())
    }

    /// Load the most recently written value
    pub fn get<D: PersistentMemory>(&self, device: &D) -> Result<T> {
        let data_addr = self.read_position(device)?;
        let value = device.read_value(data_addr)?;
        debug!(data_addr, "Got value");
        Ok(value)
    }

    /// Bounds and cursor positions of this block
    pub fn info<D: PersistentMemory>(&self, device: &D, slot: usize) -> Result<BlockInfo> {
        let seam = self.find_seam(device)?;
        let next_write = self.resolve(seam);
        Ok(BlockInfo {
            slot,
            value_size: T::SIZE,
            data_begin: self.layout.data_begin,
            data_end: self.layout.data_end,
            status_begin: self.layout.status_begin,
            status_end: self.layout.status_end,
            capacity: self.layout.capacity(),
            next_write,
            next_read: self
                .layout
                .data_cell(self.previous_status(next_write), T::SIZE),
            seam_found: seam != Seam::NotFound,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::device::MemoryDevice;
    use crate::wear::planner::plan_partitions;

    fn block_of<T: CellValue>(total: u32) -> WearLevelBlock<T> {
        let layout = plan_partitions(0, total, 1, T::SIZE).unwrap()[0];
        WearLevelBlock::new(layout).unwrap()
    }

    fn status_bytes<'a>(device: &'a MemoryDevice, layout: &RegionLayout) -> &'a [u8] {
        &device.as_bytes()[layout.status_begin as usize..=layout.status_end as usize]
    }

    fn seam_count(ring: &[u8]) -> usize {
        (0..ring.len())
            .filter(|&i| {
                let prev = ring[(i + ring.len() - 1) % ring.len()];
                ring[i] != prev.wrapping_add(1)
            })
            .count()
    }

    #[test]
    fn test_locate_seam() {
        assert_eq!(locate_seam(&[]), None);
        assert_eq!(locate_seam(&[7]), Some(0));
        assert_eq!(locate_seam(&[0xFF, 0xFF, 0xFF]), Some(0));
        assert_eq!(locate_seam(&[1, 2, 3, 0]), Some(3));
        assert_eq!(locate_seam(&[5, 2, 3, 4]), Some(1));
        assert_eq!(locate_seam(&[1, 2, 3, 4]), Some(0));
        assert_eq!(locate_seam(&[255, 0, 1, 254]), Some(3));
    }

    #[test]
    fn test_locate_seam_without_break() {
        let ring: Vec<u8> = (0..=255u8).collect();
        assert_eq!(locate_seam(&ring), None);
    }

    #[test]
    fn test_scenario_four_cells() -> Result<()> {
        let block = block_of::<u32>(20);
        assert_eq!(block.capacity(), 4);
        let layout = *block.layout();
        let mut device = MemoryDevice::with_fill(20, 0);

        block.put(&mut device, &10)?;
        block.put(&mut device, &20)?;
        block.put(&mut device, &30)?;
        assert_eq!(&device.as_bytes()[16..20], &[1, 2, 3, 0]);
        assert_eq!(block.write_position(&device)?, layout.status_begin + 3);
        assert_eq!(block.get(&device)?, 30);

        block.put(&mut device, &40)?;
        assert_eq!(&device.as_bytes()[16..20], &[1, 2, 3, 4]);
        assert_eq!(block.write_position(&device)?, layout.status_begin);
        assert_eq!(block.get(&device)?, 40);
        Ok(())
    }

    #[test]
    fn test_round_trip_on_erased_memory() -> Result<()> {
        let block = block_of::<u16>(30);
        let mut device = MemoryDevice::new(30);

        block.put(&mut device, &111)?;
        block.put(&mut device, &222)?;
        assert_eq!(block.get(&device)?, 222);
        Ok(())
    }

    #[test]
    fn test_wrap_lands_on_first_cell() -> Result<()> {
        let block = block_of::<u32>(20);
        let layout = *block.layout();
        let mut device = MemoryDevice::new(20);

        for v in 1..=4u32 {
            block.put(&mut device, &v)?;
        }
        assert_eq!(block.write_position(&device)?, layout.status_begin);

        let expected = device.read_byte(layout.status_end)?.wrapping_add(1);
        block.put(&mut device, &5)?;
        assert_eq!(device.read_value::<u32>(layout.data_begin)?, 5);
        assert_eq!(device.read_byte(layout.status_begin)?, expected);
        assert_eq!(block.get(&device)?, 5);
        assert_eq!(block.write_position(&device)?, layout.status_begin + 1);
        Ok(())
    }

    #[test]
    fn test_counter_wraparound() -> Result<()> {
        let block = block_of::<u32>(20);
        let layout = *block.layout();
        let mut device = MemoryDevice::new(20);

        for i in 0..1100u32 {
            let expected_cell = i % 4;
            assert_eq!(
                block.write_position(&device)?,
                layout.status_begin + expected_cell
            );
            block.put(&mut device, &i)?;
            assert_eq!(block.get(&device)?, i);
        }
        // 1100 writes spread over four cells: 275 each, far past 256.
        assert_eq!(device.write_count(layout.status_begin), 275);
        Ok(())
    }

    #[test]
    fn test_single_seam_after_fill() -> Result<()> {
        let block = block_of::<u8>(14);
        let layout = *block.layout();
        let mut device = MemoryDevice::new(14);

        for i in 0..40u8 {
            block.put(&mut device, &i)?;
            if i as u32 + 1 >= block.capacity() {
                let ring = status_bytes(&device, &layout);
                assert_eq!(seam_count(ring), 1, "ring {:?}", ring);
            }
        }
        Ok(())
    }

    #[test]
    fn test_longest_ring_rotates_on_any_fill() -> Result<()> {
        // 510 bytes of one-byte values: the largest ring the planner accepts.
        let block = block_of::<u8>(510);
        let layout = *block.layout();
        assert_eq!(block.capacity(), 255);

        for fill in [0x00u8, 0x7F, 0xFF] {
            let mut device = MemoryDevice::with_fill(510, fill);
            for i in 0..(3 * 255 + 10u32) {
                assert_eq!(
                    block.write_position(&device)?,
                    layout.status_begin + i % 255,
                    "fill {:#04x} put {}",
                    fill,
                    i
                );
                let value = (i % 251) as u8;
                block.put(&mut device, &value)?;
                assert_eq!(block.get(&device)?, value, "fill {:#04x} put {}", fill, i);
            }
            assert_eq!(seam_count(status_bytes(&device, &layout)), 1);
        }
        Ok(())
    }

    #[test]
    fn test_write_position_idempotent() -> Result<()> {
        let block = block_of::<u32>(40);
        let mut device = MemoryDevice::new(40);
        block.put(&mut device, &1)?;
        block.put(&mut device, &2)?;

        let first = block.write_position(&device)?;
        let writes = device.total_writes();
        assert_eq!(block.write_position(&device)?, first);
        assert_eq!(block.read_position(&device)?, block.read_position(&device)?);
        assert_eq!(device.total_writes(), writes);
        Ok(())
    }

    #[test]
    fn test_seamless_ring_falls_back_to_first_cell() -> Result<()> {
        // The planner never yields a ring this long; build one by hand over
        // status bytes primed with 0..=255.
        let layout = RegionLayout {
            data_begin: 0,
            data_end: 255,
            status_begin: 256,
            status_end: 511,
        };
        let block = WearLevelBlock::<u8>::new(layout)?;
        let mut image = vec![0u8; 512];
        for (i, byte) in image[256..].iter_mut().enumerate() {
            *byte = i as u8;
        }
        let mut device = MemoryDevice::from_bytes(image);

        assert_eq!(block.find_seam(&device)?, Seam::NotFound);
        assert_eq!(block.find_seam(&device)?.address(), None);
        assert_eq!(block.write_position(&device)?, layout.status_begin);
        assert_eq!(block.read_position(&device)?, layout.data_end);
        let info = block.info(&device, 0)?;
        assert!(!info.seam_found);
        assert_eq!(info.next_write, layout.status_begin);
        assert_eq!(info.next_read, layout.data_end);

        block.put(&mut device, &9)?;
        assert_eq!(device.read_byte(0)?, 9);
        Ok(())
    }

    #[test]
    fn test_interrupted_put_keeps_previous_value() -> Result<()> {
        let block = block_of::<u32>(40);
        let layout = *block.layout();
        let mut device = MemoryDevice::new(40);
        block.put(&mut device, &100)?;

        // Data half of a put without the status half.
        let write_addr = block.write_position(&device)?;
        device.write_value(layout.data_cell(write_addr, 4), &200u32)?;

        assert_eq!(block.get(&device)?, 100);
        assert_eq!(block.write_position(&device)?, write_addr);

        block.put(&mut device, &300)?;
        assert_eq!(block.get(&device)?, 300);
        Ok(())
    }

    #[test]
    fn test_next_status_value_wraps() -> Result<()> {
        let block = block_of::<u8>(8);
        let layout = *block.layout();
        let mut device = MemoryDevice::new(8);
        device.write_byte(layout.status_end, 0xFF)?;
        device.write_byte(layout.status_begin, 0x10)?;

        assert_eq!(block.next_status_value(&device, layout.status_begin)?, 0x00);
        assert_eq!(block.next_status_value(&device, layout.status_begin + 1)?, 0x11);
        Ok(())
    }

    #[test]
    fn test_block_info() -> Result<()> {
        let block = block_of::<u32>(20);
        let mut device = MemoryDevice::new(20);
        block.put(&mut device, &1)?;

        let info = block.info(&device, 3)?;
        assert_eq!(info.slot, 3);
        assert_eq!(info.value_size, 4);
        assert_eq!(info.capacity, 4);
        assert_eq!(info.data_begin, 0);
        assert_eq!(info.data_end, 15);
        assert_eq!(info.status_begin, 16);
        assert_eq!(info.status_end, 19);
        assert_eq!(info.next_write, 17);
        assert_eq!(info.next_read, 0);
        assert!(info.seam_found);
        Ok(())
    }

    #[test]
    fn test_rejects_mismatched_layout() {
        let layout = RegionLayout {
            data_begin: 0,
            data_end: 9,
            status_begin: 10,
            status_end: 13,
        };
        assert!(matches!(
            WearLevelBlock::<u32>::new(layout),
            Err(Error::InvalidConfig(_))
        ));
        assert!(WearLevelBlock::<u16>::new(RegionLayout {
            data_end: 7,
            status_begin: 8,
            status_end: 11,
            ..layout
        })
        .is_ok());
    }
}
