//! Slot store: the public face of the wear-leveling engine
//!
//! Owns the device handle and one [`WearLevelBlock`] per slot, and routes
//! each call to its slot's block. Blocks never interact.

use super::block::WearLevelBlock;
use super::info::BlockInfo;
use super::planner::{plan_partitions, RegionLayout};
use crate::config::StoreConfig;
use crate::device::PersistentMemory;
use crate::error::{Error, Result};
use crate::value::CellValue;
use tracing::{debug, info};

/// Fixed set of wear-leveled value slots on one device
pub struct SlotStore<D, T> {
    device: D,
    blocks: Vec<WearLevelBlock<T>>,
    base_address: u32,
    total_bytes: u32,
}

impl<D, T> std::fmt::Debug for SlotStore<D, T> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SlotStore")
            .field("base_address", &self.base_address)
            .field("total_bytes", &self.total_bytes)
            .field("slots", &self.blocks.len())
            .finish()
    }
}

impl<D: PersistentMemory, T: CellValue> SlotStore<D, T> {
    /// Partition `total_bytes` starting at `base_address` into `slot_count` rings
    ///
    /// Existing device contents are used as-is; erase first with
    /// [`crate::device::erase_region`] for a known starting state.
    pub fn new(device: D, base_address: u32, total_bytes: u32, slot_count: usize) -> Result<Self> {
        let region_end = base_address as u64 + total_bytes as u64;
        if region_end > device.capacity() as u64 {
            return Err(Error::InvalidConfig(format!(
                "region {}..{} does not fit in a {}-byte device",
                base_address,
                region_end,
                device.capacity()
            )));
        }

        let blocks = plan_partitions(base_address, total_bytes, slot_count, T::SIZE)?
            .into_iter()
            .map(WearLevelBlock::<T>::new)
            .collect::<Result<Vec<_>>>()?;

        info!(
            base_address,
            total_bytes,
            slot_count,
            value_size = T::SIZE,
            capacity = blocks[0].capacity(),
            "Initialized slot store"
        );

        Ok(Self {
            device,
            blocks,
            base_address,
            total_bytes,
        })
    }

    /// Build a store from configuration
    pub fn from_config(device: D, config: &StoreConfig) -> Result<Self> {
        if config.value_type.size() != T::SIZE {
            return Err(Error::InvalidConfig(format!(
                "configured value type {} is {} bytes, store value is {} bytes",
                config.value_type,
                config.value_type.size(),
                T::SIZE
            )));
        }
        Self::new(device, config.base_address, config.total_bytes, config.slot_count)
    }

    fn block(&self, index: usize) -> Result<&WearLevelBlock<T>> {
        self.blocks.get(index).ok_or(Error::SlotOutOfRange {
            index,
            slot_count: self.blocks.len(),
        })
    }

    /// Most recently stored value of slot `index`
    pub fn get(&self, index: usize) -> Result<T> {
        let block = self.block(index)?;
        block.get(&self.device)
    }

    /// Store `value` in slot `index`
    pub fn put(&mut self, index: usize, value: T) -> Result<()> {
        let slot_count = self.blocks.len();
        let block = self.blocks.get(index).ok_or(Error::SlotOutOfRange { index, slot_count })?;
        block.put(&mut self.device, &value)?;
        debug!(slot = index, "Stored value");
        Ok(())
    }

    /// Bounds and cursors of slot `index`
    pub fn block_info(&self, index: usize) -> Result<BlockInfo> {
        self.block(index)?.info(&self.device, index)
    }

    /// Bounds and cursors of every slot
    pub fn blocks_info(&self) -> Result<Vec<BlockInfo>> {
        self.blocks
            .iter()
            .enumerate()
            .map(|(index, block)| block.info(&self.device, index))
            .collect()
    }

    /// Region bounds of slot `index`
    pub fn layout(&self, index: usize) -> Result<RegionLayout> {
        Ok(*self.block(index)?.layout())
    }

    pub fn slot_count(&self) -> usize {
        self.blocks.len()
    }

    pub fn base_address(&self) -> u32 {
        self.base_address
    }

    pub fn total_bytes(&self) -> u32 {
        self.total_bytes
    }

    pub fn device(&self) -> &D {
        &self.device
    }

    /// Flush the device
    pub fn flush(&mut self) -> Result<()> {
        self.device.flush()
    }

    /// Release the device
    pub fn into_device(self) -> D {
        self.device
    }
}
