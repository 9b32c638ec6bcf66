//! Host-memory implementation of [`ComputeBackend`].
//!
//! Phase fields are stored as flat arrays and the per-cell scalars as a
//! packed byte buffer of [`DeviceCellRecord`], the layout a GPU kernel would
//! read.

use bytemuck::{Pod, Zeroable};
use glam::DVec3;
use rand::rngs::StdRng;
use rand::SeedableRng;

use super::backend::{ComputeBackend, DeviceProperties};
use crate::error::DeviceError;
use crate::state::{CellSlot, StressTensor};

/// Per-cell scalars as laid out in device memory
#[repr(C)]
#[derive(Copy, Clone, Debug, Default, PartialEq, Pod, Zeroable)]
pub struct DeviceCellRecord {
    pub com: [f64; 3],
    pub velocity: [f64; 3],
    pub polarization: [f64; 3],
    pub theta_pol: f64,
    pub volume: f64,
    /// xx, xy, xz, yy, yz, zz
    pub stress: [f64; 6],
}

const RECORD_SIZE: usize = std::mem::size_of::<DeviceCellRecord>();

impl DeviceCellRecord {
    pub fn from_slot(slot: &CellSlot) -> Self {
        let s = &slot.stress;
        Self {
            com: slot.com.to_array(),
            velocity: slot.velocity.to_array(),
            polarization: slot.polarization.to_array(),
            theta_pol: slot.theta_pol,
            volume: slot.volume,
            stress: [s.xx, s.xy, s.xz, s.yy, s.yz, s.zz],
        }
    }

    pub fn apply_to(&self, slot: &mut CellSlot) {
        slot.com = DVec3::from_array(self.com);
        slot.velocity = DVec3::from_array(self.velocity);
        slot.polarization = DVec3::from_array(self.polarization);
        slot.theta_pol = self.theta_pol;
        slot.volume = self.volume;
        let [xx, xy, xz, yy, yz, zz] = self.stress;
        slot.stress = StressTensor { xx, xy, xz, yy, yz, zz };
    }
}

/// State buffers for one allocation
#[derive(Debug)]
struct DeviceState {
    slots: usize,
    patch_len: usize,
    phi: Vec<f64>,
    phi_old: Vec<f64>,
    records: Vec<u8>,
}

/// Backend keeping the mirror in ordinary host memory
#[derive(Debug, Default)]
pub struct HostBackend {
    memory_limit: Option<usize>,
    state: Option<DeviceState>,
    birth_delta: Option<Vec<f64>>,
    streams: Option<StdRng>,
    uploads: u64,
    downloads: u64,
}

impl HostBackend {
    pub fn new() -> Self {
        Self::default()
    }

    /// Backend that refuses allocations beyond `bytes`.
    pub fn with_memory_limit(bytes: usize) -> Self {
        Self { memory_limit: Some(bytes), ..Self::default() }
    }

    /// Bytes needed to mirror `slots` cells of `patch_len` nodes
    pub fn state_bytes(slots: usize, patch_len: usize) -> usize {
        slots * (2 * patch_len * std::mem::size_of::<f64>() + RECORD_SIZE)
    }

    fn birth_delta_bytes(&self) -> usize {
        self.birth_delta
            .as_ref()
            .map_or(0, |d| d.len() * std::mem::size_of::<f64>())
    }

    fn state_bytes_in_use(&self) -> usize {
        self.state
            .as_ref()
            .map_or(0, |s| Self::state_bytes(s.slots, s.patch_len))
    }

    fn reserve(&self, requested: usize, in_use: usize) -> Result<(), DeviceError> {
        if let Some(limit) = self.memory_limit {
            let available = limit.saturating_sub(in_use);
            if requested > available {
                return Err(DeviceError::OutOfMemory { requested, available });
            }
        }
        Ok(())
    }

    /// Device copy of the phase field of `slot`
    pub fn phi(&self, slot: usize) -> Option<&[f64]> {
        let state = self.state.as_ref()?;
        let n = state.patch_len;
        state.phi.get(slot * n..(slot + 1) * n)
    }

    /// Mutable device copy of the phase field of `slot`, for kernels run in
    /// host memory.
    pub fn phi_mut(&mut self, slot: usize) -> Option<&mut [f64]> {
        let state = self.state.as_mut()?;
        let n = state.patch_len;
        state.phi.get_mut(slot * n..(slot + 1) * n)
    }

    /// Decoded scalar record of `slot`
    pub fn record(&self, slot: usize) -> Option<DeviceCellRecord> {
        let state = self.state.as_ref()?;
        state
            .records
            .get(slot * RECORD_SIZE..(slot + 1) * RECORD_SIZE)
            .map(bytemuck::pod_read_unaligned)
    }

    pub fn has_birth_delta(&self) -> bool {
        self.birth_delta.is_some()
    }

    /// Noise stream seeded by `init_random_streams`
    pub fn random_stream(&mut self) -> Option<&mut StdRng> {
        self.streams.as_mut()
    }

    pub fn uploads(&self) -> u64 {
        self.uploads
    }

    pub fn downloads(&self) -> u64 {
        self.downloads
    }
}

impl ComputeBackend for HostBackend {
    fn query_device_properties(&self) -> DeviceProperties {
        DeviceProperties {
            name: "host".to_string(),
            total_memory: self.memory_limit,
            compute_units: std::thread::available_parallelism().map_or(1, |n| n.get() as u32),
        }
    }

    fn init_random_streams(&mut self, seed: u64) {
        self.streams = Some(StdRng::seed_from_u64(seed));
    }

    fn allocate_state(&mut self, slot_count: usize, patch_len: usize) -> Result<(), DeviceError> {
        self.free_state();
        let requested = Self::state_bytes(slot_count, patch_len);
        self.reserve(requested, self.birth_delta_bytes())?;

        self.state = Some(DeviceState {
            slots: slot_count,
            patch_len,
            phi: vec![0.0; slot_count * patch_len],
            phi_old: vec![0.0; slot_count * patch_len],
            records: vec![0u8; slot_count * RECORD_SIZE],
        });
        log::debug!("allocated device state: {} slots, {} bytes", slot_count, requested);
        Ok(())
    }

    fn free_state(&mut self) {
        self.state = None;
    }

    fn allocate_birth_delta(&mut self) -> Result<(), DeviceError> {
        let patch_len = self
            .state
            .as_ref()
            .map(|s| s.patch_len)
            .ok_or(DeviceError::NotAllocated)?;
        self.birth_delta = None;
        let len = 2 * patch_len;
        self.reserve(len * std::mem::size_of::<f64>(), self.state_bytes_in_use())?;
        self.birth_delta = Some(vec![0.0; len]);
        Ok(())
    }

    fn free_birth_delta(&mut self) {
        self.birth_delta = None;
    }

    fn copy_to_device(&mut self, cells: &[CellSlot]) -> Result<(), DeviceError> {
        let state = self.state.as_mut().ok_or(DeviceError::NotAllocated)?;
        if state.slots != cells.len() {
            return Err(DeviceError::SlotCountMismatch { device: state.slots, host: cells.len() });
        }
        let n = state.patch_len;
        state.records.clear();
        for (i, cell) in cells.iter().enumerate() {
            state.phi[i * n..(i + 1) * n].copy_from_slice(&cell.fields.phi);
            state.phi_old[i * n..(i + 1) * n].copy_from_slice(&cell.fields.phi_old);
            state
                .records
                .extend_from_slice(bytemuck::bytes_of(&DeviceCellRecord::from_slot(cell)));
        }
        self.uploads += 1;
        Ok(())
    }

    fn copy_from_device(&mut self, cells: &mut [CellSlot]) -> Result<(), DeviceError> {
        let state = self.state.as_ref().ok_or(DeviceError::NotAllocated)?;
        if state.slots != cells.len() {
            return Err(DeviceError::SlotCountMismatch { device: state.slots, host: cells.len() });
        }
        let n = state.patch_len;
        let records = state.records.chunks_exact(RECORD_SIZE);
        for (i, (cell, bytes)) in cells.iter_mut().zip(records).enumerate() {
            cell.fields.phi.copy_from_slice(&state.phi[i * n..(i + 1) * n]);
            cell.fields.phi_old.copy_from_slice(&state.phi_old[i * n..(i + 1) * n]);
            bytemuck::pod_read_unaligned::<DeviceCellRecord>(bytes).apply_to(cell);
        }
        self.downloads += 1;
        Ok(())
    }

    fn allocated_slots(&self) -> Option<usize> {
        self.state.as_ref().map(|s| s.slots)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::Rng;

    fn cells(count: usize, patch_len: usize) -> Vec<CellSlot> {
        (0..count)
            .map(|i| {
                let mut c = CellSlot::zeroed(patch_len);
                c.fields.phi.fill(i as f64 + 1.0);
                c.com = DVec3::new(i as f64, 2.0, 3.0);
                c.stress.xy = 0.25;
                c
            })
            .collect()
    }

    #[test]
    fn test_record_is_packed() {
        assert_eq!(RECORD_SIZE, 17 * std::mem::size_of::<f64>());
    }

    #[test]
    fn test_random_stream_follows_seed() {
        let mut a = HostBackend::new();
        let mut b = HostBackend::new();
        assert!(a.random_stream().is_none());

        a.init_random_streams(99);
        b.init_random_streams(99);
        let x: u64 = a.random_stream().unwrap().gen();
        let y: u64 = b.random_stream().unwrap().gen();
        assert_eq!(x, y);
    }

    #[test]
    fn test_upload_then_download() {
        let mut backend = HostBackend::new();
        let mut host = cells(3, 8);
        backend.allocate_state(3, 8).unwrap();
        backend.copy_to_device(&host).unwrap();
        assert_eq!(backend.phi(2).unwrap()[0], 3.0);
        assert_eq!(backend.record(1).unwrap().com, [1.0, 2.0, 3.0]);

        backend.phi_mut(0).unwrap().fill(0.5);
        host[0].clock.timer = 42.0;
        backend.copy_from_device(&mut host).unwrap();
        assert_eq!(host[0].fields.phi[3], 0.5);
        assert_eq!(host[0].clock.timer, 42.0, "clock is host-owned");
        assert_eq!(host[1].stress.xy, 0.25);
    }

    #[test]
    fn test_slot_count_mismatch_rejected() {
        let mut backend = HostBackend::new();
        backend.allocate_state(2, 4).unwrap();
        let host = cells(3, 4);
        assert!(matches!(
            backend.copy_to_device(&host),
            Err(DeviceError::SlotCountMismatch { device: 2, host: 3 })
        ));
    }

    #[test]
    fn test_memory_limit_enforced() {
        let limit = HostBackend::state_bytes(4, 27);
        let mut backend = HostBackend::with_memory_limit(limit);
        assert!(backend.allocate_state(4, 27).is_ok());
        // No headroom left for the birth delta.
        assert!(matches!(
            backend.allocate_birth_delta(),
            Err(DeviceError::OutOfMemory { .. })
        ));
        assert!(matches!(
            backend.allocate_state(5, 27),
            Err(DeviceError::OutOfMemory { .. })
        ));
    }

    #[test]
    fn test_birth_delta_requires_state() {
        let mut backend = HostBackend::new();
        assert!(matches!(backend.allocate_birth_delta(), Err(DeviceError::NotAllocated)));
    }
}
