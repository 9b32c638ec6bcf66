//! Append-only history of every cell ever created.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::error::LineageError;

/// Parent id of founders
pub const NO_PARENT: i32 = -1;
/// Death time of cells still alive
pub const ALIVE: f64 = -1.0;

/// One ledger entry
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct LineageRecord {
    /// Lineage id of the parent, [`NO_PARENT`] for founders
    pub parent: i32,
    /// Divisions since the founder ancestor
    pub generation: i32,
    /// Birth time in reporting intervals
    pub birth_time: f64,
    /// Death time in reporting intervals, [`ALIVE`] until set
    pub death_time: f64,
    /// Physical property at creation
    pub property: f64,
}

impl LineageRecord {
    pub fn founder(property: f64) -> Self {
        Self {
            parent: NO_PARENT,
            generation: 0,
            birth_time: 0.0,
            death_time: ALIVE,
            property,
        }
    }

    pub fn is_alive(&self) -> bool {
        self.death_time == ALIVE
    }
}

/// Ledger keyed by lineage id
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct LineageLedger {
    entries: BTreeMap<i32, LineageRecord>,
}

impl LineageLedger {
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert a new entry. Returns `false` and leaves the ledger untouched
    /// if the id is already present.
    pub(crate) fn insert(&mut self, id: i32, record: LineageRecord) -> bool {
        use std::collections::btree_map::Entry;
        match self.entries.entry(id) {
            Entry::Vacant(slot) => {
                slot.insert(record);
                true
            }
            Entry::Occupied(_) => false,
        }
    }

    /// Set the death time of an existing entry, exactly once.
    pub fn record_death(&mut self, id: i32, time: f64) -> Result<(), LineageError> {
        let record = self.entries.get_mut(&id).ok_or(LineageError::UnknownId(id))?;
        if !record.is_alive() {
            return Err(LineageError::AlreadyDead(id));
        }
        if time < record.birth_time {
            return Err(LineageError::DeathBeforeBirth { id });
        }
        record.death_time = time;
        Ok(())
    }

    pub fn get(&self, id: i32) -> Option<&LineageRecord> {
        self.entries.get(&id)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Entries in ascending id order
    pub fn iter(&self) -> impl Iterator<Item = (i32, &LineageRecord)> + '_ {
        self.entries.iter().map(|(&id, record)| (id, record))
    }

    /// Ids of the direct children of `id`
    pub fn children_of(&self, id: i32) -> Vec<i32> {
        self.iter()
            .filter(|(_, r)| r.parent == id)
            .map(|(child, _)| child)
            .collect()
    }

    pub fn max_generation(&self) -> i32 {
        self.entries.values().map(|r| r.generation).max().unwrap_or(0)
    }
}
