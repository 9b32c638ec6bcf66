//! Population registry: live slot identities and the identity counters.
//!
//! Slot identities and lineage ids are separate counters that advance
//! together at each birth. Neither is ever reused; running past
//! `i32::MAX` births is a fatal error because the lineage log stores ids as
//! 32-bit integers.

use crate::error::{LifecycleError, LineageError};

use super::lineage::{LineageLedger, LineageRecord};

/// Identity of a cell as seen by the registry
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Registration {
    /// Slot identity appended to the live list
    pub slot_identity: u64,
    /// Ledger key
    pub lineage_id: i32,
}

/// Live slot list, identity counters and the lineage ledger
#[derive(Debug, Clone, Default)]
pub struct PopulationRegistry {
    nphases_index: Vec<u64>,
    next_slot_identity: u64,
    next_lineage_id: i64,
    ledger: LineageLedger,
}

impl PopulationRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Seed a founder: no parent, generation 0, born at time 0.
    pub fn register_founder(&mut self, property: f64) -> Result<Registration, LifecycleError> {
        self.register(LineageRecord::founder(property))
    }

    /// Register a daughter of `parent` born at `time` (reporting intervals).
    pub fn register_birth(
        &mut self,
        parent: i32,
        time: f64,
        property: f64,
    ) -> Result<Registration, LifecycleError> {
        let parent_generation = self
            .ledger
            .get(parent)
            .map(|r| r.generation)
            .ok_or(LineageError::UnknownId(parent))?;

        self.register(LineageRecord {
            parent,
            generation: parent_generation + 1,
            birth_time: time,
            death_time: super::lineage::ALIVE,
            property,
        })
    }

    /// Fail unless `count` more births fit in the 32-bit lineage id space.
    ///
    /// Lets a caller that registers several cells at once check up front
    /// instead of leaving a partial registration behind.
    pub fn ensure_capacity(&self, count: usize) -> Result<(), LifecycleError> {
        let last = self.next_lineage_id + count as i64 - 1;
        if count > 0 && last > i64::from(i32::MAX) {
            return Err(LifecycleError::IdentityExhausted(self.next_lineage_id));
        }
        Ok(())
    }

    #[cfg(test)]
    pub(crate) fn set_next_lineage_id(&mut self, next: i64) {
        self.next_lineage_id = next;
    }

    fn register(&mut self, record: LineageRecord) -> Result<Registration, LifecycleError> {
        let lineage_id = i32::try_from(self.next_lineage_id)
            .map_err(|_| LifecycleError::IdentityExhausted(self.next_lineage_id))?;
        let slot_identity = self.next_slot_identity;

        if !self.ledger.insert(lineage_id, record) {
            // Counters only move forward, so a collision means the ledger was
            // edited behind the registry's back.
            log::error!("lineage id {} already present in the ledger", lineage_id);
        }
        self.next_lineage_id += 1;
        self.next_slot_identity += 1;
        self.nphases_index.push(slot_identity);

        Ok(Registration { slot_identity, lineage_id })
    }

    /// Finalise a ledger entry.
    pub fn record_death(&mut self, lineage_id: i32, time: f64) -> Result<(), LineageError> {
        self.ledger.record_death(lineage_id, time)
    }

    /// Drop dense slot `i` from the live list.
    pub fn remove(&mut self, i: usize) -> u64 {
        self.nphases_index.remove(i)
    }

    /// Current dense position of a slot identity
    pub fn position_of(&self, slot_identity: u64) -> Option<usize> {
        self.nphases_index.iter().position(|&id| id == slot_identity)
    }

    /// Dense slot to slot identity
    pub fn identities(&self) -> &[u64] {
        &self.nphases_index
    }

    pub fn live_count(&self) -> usize {
        self.nphases_index.len()
    }

    pub fn next_slot_identity(&self) -> u64 {
        self.next_slot_identity
    }

    pub fn next_lineage_id(&self) -> i64 {
        self.next_lineage_id
    }

    pub fn ledger(&self) -> &LineageLedger {
        &self.ledger
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_founders_then_births() {
        let mut registry = PopulationRegistry::new();
        let a = registry.register_founder(0.007).unwrap();
        let b = registry.register_founder(0.007).unwrap();
        assert_eq!((a.lineage_id, b.lineage_id), (0, 1));

        let child = registry.register_birth(b.lineage_id, 2.0, 0.008).unwrap();
        assert_eq!(child.lineage_id, 2);
        assert_eq!(child.slot_identity, 2);

        let record = registry.ledger().get(child.lineage_id).unwrap();
        assert_eq!(record.parent, 1);
        assert_eq!(record.generation, 1);
        assert_eq!(record.birth_time, 2.0);
        assert!(record.is_alive());
    }

    #[test]
    fn test_identities_never_reused_after_removal() {
        let mut registry = PopulationRegistry::new();
        let a = registry.register_founder(1.0).unwrap();
        registry.register_founder(1.0).unwrap();
        registry.remove(0);
        let c = registry.register_birth(a.lineage_id, 1.0, 1.0).unwrap();
        assert_eq!(c.slot_identity, 2);
        assert_eq!(registry.live_count(), 2);
        assert_eq!(registry.position_of(c.slot_identity), Some(1));
        assert_eq!(registry.position_of(a.slot_identity), None);
    }

    #[test]
    fn test_birth_from_unknown_parent_fails() {
        let mut registry = PopulationRegistry::new();
        let err = registry.register_birth(9, 0.0, 1.0).unwrap_err();
        assert!(matches!(err, LifecycleError::Lineage(LineageError::UnknownId(9))));
        assert_eq!(registry.live_count(), 0);
    }

    #[test]
    fn test_capacity_checked_before_registering() {
        let mut registry = PopulationRegistry::new();
        let founder = registry.register_founder(0.007).unwrap();
        registry.set_next_lineage_id(i64::from(i32::MAX));

        assert!(registry.ensure_capacity(1).is_ok());
        assert!(matches!(
            registry.ensure_capacity(2),
            Err(LifecycleError::IdentityExhausted(_))
        ));

        registry.register_birth(founder.lineage_id, 1.0, 0.007).unwrap();
        assert!(matches!(
            registry.register_birth(founder.lineage_id, 1.0, 0.007),
            Err(LifecycleError::IdentityExhausted(_))
        ));
        assert_eq!(registry.ledger().len(), 2);
        assert_eq!(registry.live_count(), 2);
    }
}
