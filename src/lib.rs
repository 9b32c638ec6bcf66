//! Phase-field cell population engine
//!
//! Cells live on small periodic patches of a global lattice. This library
//! provides the patch addressing, the per-cell slot table, stochastic
//! division with stress-driven mutation, and the lineage ledger that
//! records every birth and death.

pub mod config;
pub mod device;
pub mod division;
pub mod error;
pub mod export;
pub mod geometry;
pub mod lifecycle;
pub mod mechanics;
pub mod state;

pub use config::Parameters;
pub use device::{ComputeBackend, DeviceMirror, HostBackend};
pub use error::{ConfigError, DeviceError, LifecycleError, LineageError};
pub use geometry::{Grid, NeighborTable, PatchGeometry};
pub use lifecycle::{proliferate, DivisionReport, SimulationContext};
pub use state::{CellSlot, CellStore, LineageLedger, PopulationMetrics, PopulationRegistry};
