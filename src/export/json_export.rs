//! JSON snapshot of the population and its lineage.

use std::path::{Path, PathBuf};

use anyhow::Result;
use chrono::Local;
use serde::Serialize;

use crate::state::{LineageLedger, LineageRecord, PopulationMetrics};

/// Ledger entry with its id inlined
#[derive(Debug, Clone, Serialize)]
pub struct LineageEntry {
    pub id: i32,
    #[serde(flatten)]
    pub record: LineageRecord,
}

/// Full snapshot export structure
#[derive(Debug, Clone, Serialize)]
pub struct LineageExport {
    /// Export timestamp
    pub exported_at: String,
    /// Export version for compatibility
    pub version: &'static str,
    pub metrics: PopulationMetrics,
    pub lineage: Vec<LineageEntry>,
}

impl LineageExport {
    pub fn new(metrics: &PopulationMetrics, ledger: &LineageLedger) -> Self {
        Self {
            exported_at: Local::now().to_rfc3339(),
            version: env!("CARGO_PKG_VERSION"),
            metrics: metrics.clone(),
            lineage: ledger
                .iter()
                .map(|(id, record)| LineageEntry { id, record: *record })
                .collect(),
        }
    }
}

/// Export the snapshot into `dir` as `lineage_YYYYMMDD_HHMMSS.json`.
///
/// Returns the path to the saved JSON file.
pub fn export_lineage_json<P: AsRef<Path>>(
    dir: P,
    metrics: &PopulationMetrics,
    ledger: &LineageLedger,
) -> Result<PathBuf> {
    let dir = dir.as_ref();
    std::fs::create_dir_all(dir)?;
    let filename = format!("lineage_{}.json", Local::now().format("%Y%m%d_%H%M%S"));
    let path = dir.join(filename);
    export_lineage_json_to(metrics, ledger, &path)?;
    Ok(path)
}

/// Export the snapshot to a specific file
pub fn export_lineage_json_to(
    metrics: &PopulationMetrics,
    ledger: &LineageLedger,
    path: &Path,
) -> Result<()> {
    let export = LineageExport::new(metrics, ledger);
    let file = std::fs::File::create(path)?;
    serde_json::to_writer_pretty(file, &export)?;

    log::info!("JSON lineage exported: {}", path.display());
    Ok(())
}
