//! Binary lineage log.
//!
//! One snapshot per reporting interval, appended to the same file with no
//! header. All values are little-endian:
//!
//! ```text
//! [f64 time][i32 count]
//! count x [i32 id][f64 birth][f64 death][i32 parent][f64 property][i32 generation]
//! ```

use std::fs::OpenOptions;
use std::io::Write;
use std::path::{Path, PathBuf};

use anyhow::{bail, Context, Result};

use crate::state::{LineageLedger, LineageRecord};

/// Bytes per ledger entry
pub const ENTRY_SIZE: usize = 4 + 8 + 8 + 4 + 8 + 4;

/// Appends ledger snapshots to the lineage log.
///
/// The file is opened in append mode for every snapshot, so a failed open
/// only costs that snapshot and the next one tries again.
#[derive(Debug, Clone)]
pub struct LineageLogWriter {
    path: PathBuf,
    written: u64,
}

impl LineageLogWriter {
    /// Writer appending to `path`; nothing is opened until the first snapshot.
    pub fn new<P: AsRef<Path>>(path: P) -> Self {
        let path = path.as_ref().to_path_buf();
        log::info!("lineage log: {}", path.display());
        Self { path, written: 0 }
    }

    /// Append the full ledger as of `time` (reporting intervals).
    pub fn write_snapshot(&mut self, time: f64, ledger: &LineageLedger) -> Result<()> {
        let count = i32::try_from(ledger.len()).context("ledger too large for the lineage log")?;
        let mut buf = Vec::with_capacity(12 + ledger.len() * ENTRY_SIZE);
        buf.extend_from_slice(&time.to_le_bytes());
        buf.extend_from_slice(&count.to_le_bytes());
        for (id, r) in ledger.iter() {
            buf.extend_from_slice(&id.to_le_bytes());
            buf.extend_from_slice(&r.birth_time.to_le_bytes());
            buf.extend_from_slice(&r.death_time.to_le_bytes());
            buf.extend_from_slice(&r.parent.to_le_bytes());
            buf.extend_from_slice(&r.property.to_le_bytes());
            buf.extend_from_slice(&r.generation.to_le_bytes());
        }

        let mut file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(&self.path)
            .with_context(|| format!("opening lineage log {}", self.path.display()))?;
        file.write_all(&buf)
            .with_context(|| format!("writing lineage log {}", self.path.display()))?;
        self.written += 1;
        Ok(())
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Snapshots successfully appended by this writer
    pub fn snapshots_written(&self) -> u64 {
        self.written
    }
}

/// One decoded snapshot
#[derive(Debug, Clone, PartialEq)]
pub struct LineageSnapshot {
    pub time: f64,
    pub entries: Vec<(i32, LineageRecord)>,
}

struct Cursor<'a> {
    bytes: &'a [u8],
    pos: usize,
}

impl<'a> Cursor<'a> {
    fn take<const N: usize>(&mut self) -> Result<[u8; N]> {
        let Some(chunk) = self.bytes.get(self.pos..self.pos + N) else {
            bail!("lineage log truncated at byte {}", self.pos);
        };
        self.pos += N;
        let mut out = [0u8; N];
        out.copy_from_slice(chunk);
        Ok(out)
    }

    fn f64(&mut self) -> Result<f64> {
        Ok(f64::from_le_bytes(self.take()?))
    }

    fn i32(&mut self) -> Result<i32> {
        Ok(i32::from_le_bytes(self.take()?))
    }

    fn done(&self) -> bool {
        self.pos >= self.bytes.len()
    }
}

/// Decode every snapshot in a lineage log.
pub fn read_lineage_log<P: AsRef<Path>>(path: P) -> Result<Vec<LineageSnapshot>> {
    let bytes = std::fs::read(path.as_ref())
        .with_context(|| format!("reading lineage log {}", path.as_ref().display()))?;
    let mut cursor = Cursor { bytes: &bytes, pos: 0 };
    let mut snapshots = Vec::new();

    while !cursor.done() {
        let time = cursor.f64()?;
        let count = cursor.i32()?;
        if count < 0 {
            bail!("negative entry count {} in lineage log", count);
        }
        let mut entries = Vec::with_capacity(count as usize);
        for _ in 0..count {
            let id = cursor.i32()?;
            let birth_time = cursor.f64()?;
            let death_time = cursor.f64()?;
            let parent = cursor.i32()?;
            let property = cursor.f64()?;
            let generation = cursor.i32()?;
            entries.push((
                id,
                LineageRecord { parent, generation, birth_time, death_time, property },
            ));
        }
        snapshots.push(LineageSnapshot { time, entries });
    }
    Ok(snapshots)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::state::PopulationRegistry;

    #[test]
    fn test_snapshot_layout() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("lineage.bin");
        let mut registry = PopulationRegistry::new();
        registry.register_founder(0.007).unwrap();

        let mut writer = LineageLogWriter::new(&path);
        writer.write_snapshot(1.5, registry.ledger()).unwrap();

        let bytes = std::fs::read(&path).unwrap();
        assert_eq!(bytes.len(), 12 + ENTRY_SIZE);
        assert_eq!(&bytes[0..8], &1.5f64.to_le_bytes());
        assert_eq!(&bytes[8..12], &1i32.to_le_bytes());
        // parent of a founder
        assert_eq!(&bytes[12 + 20..12 + 24], &(-1i32).to_le_bytes());
    }

    #[test]
    fn test_unopenable_path_recovers_on_next_write() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("lineage.bin");
        std::fs::create_dir(&path).unwrap();
        let mut registry = PopulationRegistry::new();
        registry.register_founder(0.007).unwrap();

        let mut writer = LineageLogWriter::new(&path);
        assert!(writer.write_snapshot(1.0, registry.ledger()).is_err());
        assert_eq!(writer.snapshots_written(), 0);

        std::fs::remove_dir(&path).unwrap();
        writer.write_snapshot(2.0, registry.ledger()).unwrap();
        let snapshots = read_lineage_log(&path).unwrap();
        assert_eq!(snapshots.len(), 1);
        assert_eq!(snapshots[0].time, 2.0);
        assert_eq!(writer.snapshots_written(), 1);
    }

    #[test]
    fn test_truncated_log_is_an_error() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("lineage.bin");
        std::fs::write(&path, [0u8; 10]).unwrap();
        assert!(read_lineage_log(&path).is_err());
    }
}
