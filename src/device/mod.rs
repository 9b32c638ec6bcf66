//! Compute backend abstraction and the host/device mirror.

pub mod backend;
pub mod host;
pub mod mirror;

pub use backend::{ComputeBackend, DeviceProperties};
pub use host::{DeviceCellRecord, HostBackend};
pub use mirror::{DeviceMirror, StructuralChange, SyncState};
