//! Wear-leveling engine
//!
//! Each slot gets a ring of data cells paired with a ring of one-byte
//! sequence counters. Writes walk around the ring, so every physical cell
//! takes `1 / capacity` of the slot's write load.
//!
//! # Architecture
//!
//! ```text
//! SlotStore<D, T>
//!   ├─→ device: D (PersistentMemory)
//!   └─→ WearLevelBlock<T> × slot_count
//!
//! One partition (value_size = 4, capacity = 5):
//!
//!   data ring                          status ring
//!   [ v0 | v1 | v2 | v3 | v4 ]         [ 7 | 8 | 4 | 5 | 6 ]
//!                                              ^ seam: 4 != 8 + 1
//!
//!   next write -> cell 2, next read -> cell 1
//! ```
//!
//! No cursor is persisted anywhere: the seam is found by scanning the status
//! ring on every call.

pub mod block;
pub mod info;
pub mod planner;
pub mod store;

pub use block::{locate_seam, Seam, WearLevelBlock};
pub use info::BlockInfo;
pub use planner::{plan_partitions, RegionLayout, MAX_CAPACITY};
pub use store::SlotStore;
