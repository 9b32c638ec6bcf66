//! State management for the cell population.
//!
//! Contains the slot table holding every live cell, the domain-wide
//! accumulators, the population registry with its lineage ledger, and the
//! aggregated metrics.

mod cell;
mod fields;
mod lineage;
mod metrics;
mod registry;

pub use cell::{CellSlot, CellStore, InheritedTraits, PatchFields, StressTensor};
pub use fields::{GlobalFields, StressField};
pub use lineage::{LineageLedger, LineageRecord, ALIVE, NO_PARENT};
pub use metrics::{PopulationMetrics, PopulationStatus};
pub use registry::{PopulationRegistry, Registration};
