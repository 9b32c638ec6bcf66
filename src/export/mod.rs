//! Export functionality for simulation data.
//!
//! Provides the binary lineage log, CSV time-series export, and JSON
//! snapshot export.

mod csv_export;
mod json_export;
mod lineage_log;

pub use csv_export::{CsvExporter, PopulationRecord};
pub use json_export::{export_lineage_json, export_lineage_json_to, LineageEntry, LineageExport};
pub use lineage_log::{read_lineage_log, LineageLogWriter, LineageSnapshot, ENTRY_SIZE};
