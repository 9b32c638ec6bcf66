//! Two-phase synchronisation between host slots and the device mirror.
//!
//! Births and deaths resize the slot table, so they run behind a barrier:
//! the device state is downloaded and freed before the first resize and
//! reallocated and re-uploaded once every resize of the step is done. No
//! sweep may run while the barrier is open.

use super::backend::ComputeBackend;
use crate::error::DeviceError;
use crate::state::CellStore;

/// Which copy of the slot table is authoritative
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SyncState {
    /// Nothing allocated on the device
    Unallocated,
    /// Host and device agree
    Clean,
    /// The device has evolved state the host has not seen
    DeviceAhead,
    /// A structural change is in progress
    Frozen,
}

/// Open structural barrier; hand it back to
/// [`DeviceMirror::end_structural_change`] to reallocate and upload.
#[must_use = "the device stays frozen until the barrier is closed"]
#[derive(Debug)]
pub struct StructuralChange {
    slots_before: usize,
}

impl StructuralChange {
    /// Population when the barrier opened
    pub fn slots_before(&self) -> usize {
        self.slots_before
    }
}

/// Owner of the compute backend and of the synchronisation state
#[derive(Debug)]
pub struct DeviceMirror<B: ComputeBackend> {
    backend: B,
    state: SyncState,
    patch_len: usize,
}

impl<B: ComputeBackend> DeviceMirror<B> {
    pub fn new(backend: B, patch_len: usize) -> Self {
        Self { backend, state: SyncState::Unallocated, patch_len }
    }

    pub fn state(&self) -> SyncState {
        self.state
    }

    pub fn backend(&self) -> &B {
        &self.backend
    }

    pub fn backend_mut(&mut self) -> &mut B {
        &mut self.backend
    }

    /// First allocation and upload.
    pub fn initialize(&mut self, cells: &CellStore, seed: u64) -> Result<(), DeviceError> {
        let props = self.backend.query_device_properties();
        log::info!(
            "compute backend '{}': {} units, memory {}",
            props.name,
            props.compute_units,
            props
                .total_memory
                .map_or_else(|| "unbounded".to_string(), |m| format!("{} bytes", m)),
        );
        self.backend.init_random_streams(seed);
        self.allocate_and_upload(cells)
    }

    fn allocate_and_upload(&mut self, cells: &CellStore) -> Result<(), DeviceError> {
        self.backend.allocate_state(cells.len(), self.patch_len)?;
        self.backend.allocate_birth_delta()?;
        self.backend.copy_to_device(cells.slots())?;
        self.state = SyncState::Clean;
        Ok(())
    }

    /// Check that a sweep over `host_slots` cells may run.
    pub fn begin_sweep(&self, host_slots: usize) -> Result<(), DeviceError> {
        match self.state {
            SyncState::Frozen => return Err(DeviceError::Frozen),
            SyncState::Unallocated => return Err(DeviceError::NotAllocated),
            SyncState::Clean | SyncState::DeviceAhead => {}
        }
        match self.backend.allocated_slots() {
            Some(device) if device == host_slots => Ok(()),
            Some(device) => Err(DeviceError::SlotCountMismatch { device, host: host_slots }),
            None => Err(DeviceError::NotAllocated),
        }
    }

    /// Record that kernels have advanced the device copy.
    pub fn mark_device_advanced(&mut self) {
        if self.state == SyncState::Clean {
            self.state = SyncState::DeviceAhead;
        }
    }

    /// Upload state changed on the host outside a structural change.
    pub fn commit_host_changes(&mut self, cells: &CellStore) -> Result<(), DeviceError> {
        if self.state == SyncState::Frozen {
            return Err(DeviceError::Frozen);
        }
        self.backend.copy_to_device(cells.slots())?;
        self.state = SyncState::Clean;
        Ok(())
    }

    /// Download if the device is ahead of the host.
    pub fn sync_to_host(&mut self, cells: &mut CellStore) -> Result<(), DeviceError> {
        if self.state == SyncState::DeviceAhead {
            self.backend.copy_from_device(cells.slots_mut())?;
            self.state = SyncState::Clean;
        }
        Ok(())
    }

    /// Open the barrier: bring the host up to date and free device memory.
    pub fn begin_structural_change(
        &mut self,
        cells: &mut CellStore,
    ) -> Result<StructuralChange, DeviceError> {
        if self.state == SyncState::Frozen {
            return Err(DeviceError::Frozen);
        }
        self.sync_to_host(cells)?;
        self.backend.free_state();
        self.backend.free_birth_delta();
        self.state = SyncState::Frozen;
        Ok(StructuralChange { slots_before: cells.len() })
    }

    /// Close the barrier: allocate for the new population and upload it.
    pub fn end_structural_change(
        &mut self,
        token: StructuralChange,
        cells: &CellStore,
    ) -> Result<(), DeviceError> {
        log::debug!(
            "structural change: {} -> {} slots",
            token.slots_before,
            cells.len()
        );
        self.allocate_and_upload(cells)
    }

    /// Free everything on the device.
    pub fn release(&mut self) {
        self.backend.free_state();
        self.backend.free_birth_delta();
        self.state = SyncState::Unallocated;
    }
}
