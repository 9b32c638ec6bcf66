//! Accelerator seam.
//!
//! The multi-substep sweep runs against a mirror of the slot table held by a
//! compute backend. Structural changes (births, deaths) happen on the host,
//! so the backend only needs bulk allocation and bulk copies in each
//! direction.

use crate::error::DeviceError;
use crate::state::CellSlot;

/// What the backend reports about itself at start-up
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DeviceProperties {
    pub name: String,
    /// Bytes available for state; `None` when unbounded
    pub total_memory: Option<usize>,
    /// Independent execution units
    pub compute_units: u32,
}

/// Bulk storage and transfer for the mirrored slot table
pub trait ComputeBackend {
    fn query_device_properties(&self) -> DeviceProperties;

    /// Seed the per-node noise streams used by the sweep.
    fn init_random_streams(&mut self, seed: u64);

    /// Allocate state for `slot_count` cells of `patch_len` nodes each.
    fn allocate_state(&mut self, slot_count: usize, patch_len: usize) -> Result<(), DeviceError>;

    fn free_state(&mut self);

    /// Scratch space for the fields of two daughters
    fn allocate_birth_delta(&mut self) -> Result<(), DeviceError>;

    fn free_birth_delta(&mut self);

    /// Upload the whole slot table.
    fn copy_to_device(&mut self, cells: &[CellSlot]) -> Result<(), DeviceError>;

    /// Download the fields the sweep evolves. Host-owned bookkeeping (clock,
    /// lineage id, inherited properties) is left untouched.
    fn copy_from_device(&mut self, cells: &mut [CellSlot]) -> Result<(), DeviceError>;

    /// Slots currently allocated; `None` when nothing is allocated
    fn allocated_slots(&self) -> Option<usize>;
}
