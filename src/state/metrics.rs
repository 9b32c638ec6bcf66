//! Population metrics for logging and export.
//!
//! A single snapshot structure aggregated from the slot table and the
//! ledger, suitable for the CSV time series and the JSON snapshot.

use serde::{Deserialize, Serialize};

use super::cell::{CellSlot, CellStore};
use super::registry::PopulationRegistry;

/// Growth regime of the population
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
pub enum PopulationStatus {
    /// Before the warm-up step; timers are frozen
    #[default]
    WarmingUp,
    /// Timers running and room below the cap
    Growing,
    /// Population reached the cap; no further divisions
    AtCapacity,
}

impl PopulationStatus {
    pub fn from_state(step: u64, warmup_step: u64, population: usize, max_cells: usize) -> Self {
        if population >= max_cells {
            PopulationStatus::AtCapacity
        } else if step <= warmup_step {
            PopulationStatus::WarmingUp
        } else {
            PopulationStatus::Growing
        }
    }
}

/// Snapshot of the population at one step
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct PopulationMetrics {
    /// Simulation step
    pub step: u64,
    /// Time in reporting intervals
    pub time: f64,
    pub status: PopulationStatus,
    /// Live cells
    pub cell_count: usize,
    /// Cells ever created
    pub ledger_size: usize,
    pub max_generation: i32,
    /// Mean of the mutable physical property over live cells
    pub mean_property: f64,
    /// Mean hydrostatic stress over live cells
    pub mean_hydrostatic_stress: f64,
    /// Mean division timer over live cells
    pub mean_timer: f64,
    /// Total phase-field mass over live cells
    pub total_mass: f64,
    /// Divisions performed since the start
    pub divisions: u64,
    /// Ledger defects detected (e.g. death recorded for an unknown id)
    pub lineage_anomalies: u64,
}

impl PopulationMetrics {
    /// Aggregate the current population.
    pub fn collect(cells: &CellStore, registry: &PopulationRegistry) -> Self {
        Self {
            cell_count: cells.len(),
            ledger_size: registry.ledger().len(),
            max_generation: registry.ledger().max_generation(),
            mean_property: mean_over(cells, |c| c.gamma),
            mean_hydrostatic_stress: mean_over(cells, |c| c.stress.hydrostatic()),
            mean_timer: mean_over(cells, |c| c.clock.timer),
            total_mass: cells.iter().map(|c| c.fields.mass()).sum(),
            ..Default::default()
        }
    }
}

fn mean_over(cells: &CellStore, f: impl Fn(&CellSlot) -> f64) -> f64 {
    if cells.is_empty() {
        0.0
    } else {
        cells.iter().map(f).sum::<f64>() / cells.len() as f64
    }
}
