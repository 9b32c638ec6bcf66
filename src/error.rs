//! Error types for configuration, device memory and lineage bookkeeping.

use thiserror::Error;

/// Fatal configuration problems, raised before stepping begins.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("margin {margin} is too small, make it bigger than R = {radius}")]
    MarginTooSmall { margin: u32, radius: f64 },

    #[error("birth boundaries have wrong format: expected 4 values, got {len}")]
    BirthBoundaries { len: usize },

    #[error("domain size {size:?} has an empty axis")]
    EmptyDomain { size: [u32; 3] },

    #[error("invalid parameter {name}: {reason}")]
    Invalid { name: &'static str, reason: String },
}

impl ConfigError {
    pub(crate) fn invalid(name: &'static str, reason: impl Into<String>) -> Self {
        Self::Invalid { name, reason: reason.into() }
    }
}

/// Accelerator memory and synchronisation failures.
#[derive(Debug, Error)]
pub enum DeviceError {
    #[error("device allocation of {requested} bytes exceeds the {available} bytes available")]
    OutOfMemory { requested: usize, available: usize },

    #[error("device state is not allocated")]
    NotAllocated,

    #[error("device holds {device} slots but host holds {host}")]
    SlotCountMismatch { device: usize, host: usize },

    #[error("a structural change is in progress; the device mirror is frozen")]
    Frozen,
}

/// Ledger bookkeeping defects.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum LineageError {
    #[error("no ledger entry for lineage id {0}")]
    UnknownId(i32),

    #[error("lineage id {0} already has a death time")]
    AlreadyDead(i32),

    #[error("death time for lineage id {id} precedes its birth")]
    DeathBeforeBirth { id: i32 },
}

/// Failures of the birth/death sequence.
#[derive(Debug, Error)]
pub enum LifecycleError {
    #[error(transparent)]
    Config(#[from] ConfigError),

    #[error(transparent)]
    Device(#[from] DeviceError),

    #[error(transparent)]
    Lineage(#[from] LineageError),

    #[error("identity counters exhausted after {0} cells")]
    IdentityExhausted(i64),

    #[error("slot {slot} is out of range for a population of {len}")]
    SlotOutOfRange { slot: usize, len: usize },
}
