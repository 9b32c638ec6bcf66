//! CSV time-series export for population metrics.

use std::fs::File;
use std::path::{Path, PathBuf};

use anyhow::Result;
use chrono::Local;
use serde::Serialize;

use crate::state::{PopulationMetrics, PopulationStatus};

/// Record for CSV time-series export
#[derive(Debug, Clone, Serialize)]
pub struct PopulationRecord {
    pub step: u64,
    /// Time in reporting intervals
    pub time: f64,
    pub status: PopulationStatus,
    pub cell_count: usize,
    pub ledger_size: usize,
    pub max_generation: i32,
    pub mean_property: f64,
    pub mean_hydrostatic_stress: f64,
    pub mean_timer: f64,
    pub total_mass: f64,
    pub divisions: u64,
    pub lineage_anomalies: u64,
}

impl From<&PopulationMetrics> for PopulationRecord {
    fn from(m: &PopulationMetrics) -> Self {
        Self {
            step: m.step,
            time: m.time,
            status: m.status,
            cell_count: m.cell_count,
            ledger_size: m.ledger_size,
            max_generation: m.max_generation,
            mean_property: m.mean_property,
            mean_hydrostatic_stress: m.mean_hydrostatic_stress,
            mean_timer: m.mean_timer,
            total_mass: m.total_mass,
            divisions: m.divisions,
            lineage_anomalies: m.lineage_anomalies,
        }
    }
}

/// CSV exporter for population time series
pub struct CsvExporter {
    writer: csv::Writer<File>,
    /// Sample interval in steps
    sample_interval: u64,
    last_sample_step: Option<u64>,
    path: PathBuf,
}

impl CsvExporter {
    /// Create an exporter writing into `dir`.
    ///
    /// Creates the directory if it doesn't exist. Filename is generated with
    /// a timestamp.
    pub fn new<P: AsRef<Path>>(dir: P, sample_interval: u64) -> Result<Self> {
        let dir = dir.as_ref();
        std::fs::create_dir_all(dir)?;

        let timestamp = Local::now().format("%Y%m%d_%H%M%S");
        let path = dir.join(format!("population_{}.csv", timestamp));

        let file = File::create(&path)?;
        let writer = csv::Writer::from_writer(file);

        log::info!("CSV export started: {}", path.display());

        Ok(Self {
            writer,
            sample_interval: sample_interval.max(1),
            last_sample_step: None,
            path,
        })
    }

    /// Record a sample if the interval has elapsed
    pub fn maybe_record(&mut self, metrics: &PopulationMetrics) -> Result<bool> {
        let due = match self.last_sample_step {
            None => true,
            Some(last) => metrics.step >= last + self.sample_interval,
        };
        if due {
            self.record(metrics)?;
        }
        Ok(due)
    }

    /// Force record a sample regardless of interval
    pub fn record(&mut self, metrics: &PopulationMetrics) -> Result<()> {
        self.writer.serialize(PopulationRecord::from(metrics))?;
        self.last_sample_step = Some(metrics.step);
        Ok(())
    }

    /// Finish writing and return the output path
    pub fn finish(mut self) -> Result<PathBuf> {
        self.writer.flush()?;
        log::info!("CSV export completed: {}", self.path.display());
        Ok(self.path)
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_sampling_interval() {
        let dir = tempfile::tempdir().unwrap();
        let mut exporter = CsvExporter::new(dir.path(), 10).unwrap();
        let mut m = PopulationMetrics::default();
        assert!(exporter.maybe_record(&m).unwrap());
        m.step = 5;
        assert!(!exporter.maybe_record(&m).unwrap());
        m.step = 10;
        assert!(exporter.maybe_record(&m).unwrap());

        let path = exporter.finish().unwrap();
        let contents = std::fs::read_to_string(path).unwrap();
        let lines: Vec<&str> = contents.lines().collect();
        assert_eq!(lines.len(), 3);
        assert!(lines[0].starts_with("step,time,status,cell_count"));
    }
}
