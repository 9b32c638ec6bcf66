//! Per-cell slot table.
//!
//! Each live cell occupies one dense slot holding its patch fields and every
//! scalar attribute. Slots only grow through [`CellStore::grow_to`] and only
//! shrink through [`CellStore::erase`], so no attribute can fall out of step
//! with the others.

use glam::{DVec3, UVec3};

use crate::division::DivisionClock;
use crate::geometry::{Grid, PatchGeometry};

/// Fields stored on the patch of one cell
#[derive(Debug, Clone, Default, PartialEq)]
pub struct PatchFields {
    /// Phase field
    pub phi: Vec<f64>,
    /// Phase field at the previous step
    pub phi_old: Vec<f64>,
    pub phi_dx: Vec<f64>,
    pub phi_dy: Vec<f64>,
    pub phi_dz: Vec<f64>,
    /// Interaction potential
    pub potential: Vec<f64>,
    pub dphi: Vec<f64>,
    pub dphi_old: Vec<f64>,
}

impl PatchFields {
    pub fn zeroed(patch_len: usize) -> Self {
        Self {
            phi: vec![0.0; patch_len],
            phi_old: vec![0.0; patch_len],
            phi_dx: vec![0.0; patch_len],
            phi_dy: vec![0.0; patch_len],
            phi_dz: vec![0.0; patch_len],
            potential: vec![0.0; patch_len],
            dphi: vec![0.0; patch_len],
            dphi_old: vec![0.0; patch_len],
        }
    }

    pub fn len(&self) -> usize {
        self.phi.len()
    }

    pub fn is_empty(&self) -> bool {
        self.phi.is_empty()
    }

    /// Integral of the phase field over the patch
    pub fn mass(&self) -> f64 {
        self.phi.iter().sum()
    }
}

/// Symmetric stress tensor averaged over a cell
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct StressTensor {
    pub xx: f64,
    pub xy: f64,
    pub xz: f64,
    pub yy: f64,
    pub yz: f64,
    pub zz: f64,
}

impl StressTensor {
    /// Mean of the normal components
    pub fn hydrostatic(&self) -> f64 {
        (self.xx + self.yy + self.zz) / 3.0
    }
}

/// Properties copied verbatim from parent to daughters
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct InheritedTraits {
    pub omega_cc: f64,
    pub omega_cs: f64,
    pub alpha: f64,
    pub dpol: f64,
}

/// Complete state of one live cell
#[derive(Debug, Clone, PartialEq)]
pub struct CellSlot {
    /// Ledger key of this cell
    pub lineage_id: i32,
    pub fields: PatchFields,
    /// Sum of phi squared over the patch
    pub volume: f64,
    /// Global coordinate of the patch's local origin
    pub anchor: UVec3,
    pub patch_min: UVec3,
    pub patch_max: UVec3,
    pub com: DVec3,
    pub com_prev: DVec3,
    pub velocity: DVec3,
    pub polarization: DVec3,
    pub theta_pol: f64,
    pub theta_pol_old: f64,
    pub delta_theta_pol: f64,
    pub vorticity: DVec3,
    pub force_pressure: DVec3,
    pub force_shape: DVec3,
    pub force_polarity: DVec3,
    pub stress: StressTensor,
    pub clock: DivisionClock,
    /// Mutable physical property (surface tension)
    pub gamma: f64,
    pub traits: InheritedTraits,
}

impl CellSlot {
    /// A zero-initialised slot with fields sized for the patch
    pub fn zeroed(patch_len: usize) -> Self {
        Self {
            lineage_id: -1,
            fields: PatchFields::zeroed(patch_len),
            volume: 0.0,
            anchor: UVec3::ZERO,
            patch_min: UVec3::ZERO,
            patch_max: UVec3::ZERO,
            com: DVec3::ZERO,
            com_prev: DVec3::ZERO,
            velocity: DVec3::ZERO,
            polarization: DVec3::ZERO,
            theta_pol: 0.0,
            theta_pol_old: 0.0,
            delta_theta_pol: 0.0,
            vorticity: DVec3::ZERO,
            force_pressure: DVec3::ZERO,
            force_shape: DVec3::ZERO,
            force_polarity: DVec3::ZERO,
            stress: StressTensor::default(),
            clock: DivisionClock::default(),
            gamma: 0.0,
            traits: InheritedTraits::default(),
        }
    }

    /// Recompute the volume from the current phase field.
    pub fn refresh_volume(&mut self) {
        self.volume = self.fields.phi.iter().map(|p| p * p).sum();
    }

    /// Centre of mass of the nodes with positive phase.
    ///
    /// Coordinates are taken relative to the anchor before wrapping so a
    /// cell straddling the periodic seam is not torn in half.
    pub fn occupied_center(&self, domain: &Grid, patch: &PatchGeometry) -> Option<DVec3> {
        let mut sum = DVec3::ZERO;
        let mut count = 0usize;
        for (q, &phi) in self.fields.phi.iter().enumerate() {
            if phi > 0.0 {
                sum += (self.anchor + patch.local_coords(q)).as_dvec3();
                count += 1;
            }
        }
        if count == 0 {
            return None;
        }
        let size = domain.size().as_dvec3();
        let c = sum / count as f64;
        Some(DVec3::new(
            c.x.rem_euclid(size.x),
            c.y.rem_euclid(size.y),
            c.z.rem_euclid(size.z),
        ))
    }
}

/// Dense table of live cell slots
#[derive(Debug, Clone)]
pub struct CellStore {
    slots: Vec<CellSlot>,
    patch_len: usize,
}

impl CellStore {
    pub fn new(patch_len: usize) -> Self {
        Self { slots: Vec::new(), patch_len }
    }

    /// Nodes per patch
    pub fn patch_len(&self) -> usize {
        self.patch_len
    }

    pub fn len(&self) -> usize {
        self.slots.len()
    }

    pub fn is_empty(&self) -> bool {
        self.slots.is_empty()
    }

    /// Append zero-initialised slots until the table holds `count` slots.
    /// Never shrinks.
    pub fn grow_to(&mut self, count: usize) {
        let patch_len = self.patch_len;
        if count > self.slots.len() {
            self.slots.resize_with(count, || CellSlot::zeroed(patch_len));
        }
    }

    /// Remove slot `i`, shifting later slots down by one.
    pub fn erase(&mut self, i: usize) -> CellSlot {
        self.slots.remove(i)
    }

    pub fn get(&self, i: usize) -> Option<&CellSlot> {
        self.slots.get(i)
    }

    pub fn get_mut(&mut self, i: usize) -> Option<&mut CellSlot> {
        self.slots.get_mut(i)
    }

    pub fn slots(&self) -> &[CellSlot] {
        &self.slots
    }

    pub fn slots_mut(&mut self) -> &mut [CellSlot] {
        &mut self.slots
    }

    pub fn iter(&self) -> std::slice::Iter<'_, CellSlot> {
        self.slots.iter()
    }

    pub fn iter_mut(&mut self) -> std::slice::IterMut<'_, CellSlot> {
        self.slots.iter_mut()
    }

    /// Global index of patch node `q` of slot `slot`.
    pub fn patch_index_to_global(
        &self,
        slot: usize,
        q: usize,
        domain: &Grid,
        patch: &PatchGeometry,
    ) -> usize {
        patch.to_global(domain, self.slots[slot].anchor, q)
    }

    /// Borrow a parent immutably and two later slots mutably.
    ///
    /// Requires `parent < a < b`, which holds for daughters appended after
    /// their parent.
    pub fn parent_and_daughters(
        &mut self,
        parent: usize,
        a: usize,
        b: usize,
    ) -> (&CellSlot, &mut CellSlot, &mut CellSlot) {
        assert!(parent < a && a < b && b < self.slots.len(), "slots must be ordered parent < a < b");
        let (head, tail) = self.slots.split_at_mut(a);
        let (first, rest) = tail.split_at_mut(b - a);
        (&head[parent], &mut first[0], &mut rest[0])
    }
}

impl<'a> IntoIterator for &'a CellStore {
    type Item = &'a CellSlot;
    type IntoIter = std::slice::Iter<'a, CellSlot>;

    fn into_iter(self) -> Self::IntoIter {
        self.slots.iter()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_grow_appends_zeroed_slots() {
        let mut store = CellStore::new(27);
        store.grow_to(3);
        assert_eq!(store.len(), 3);
        assert!(store.iter().all(|s| s.fields.len() == 27 && s.fields.mass() == 0.0));

        store.grow_to(1);
        assert_eq!(store.len(), 3, "grow_to never shrinks");
    }

    #[test]
    fn test_erase_compacts() {
        let mut store = CellStore::new(8);
        store.grow_to(3);
        for (i, slot) in store.iter_mut().enumerate() {
            slot.lineage_id = i as i32;
        }
        let removed = store.erase(1);
        assert_eq!(removed.lineage_id, 1);
        let ids: Vec<i32> = store.iter().map(|s| s.lineage_id).collect();
        assert_eq!(ids, vec![0, 2]);
    }

    #[test]
    fn test_parent_and_daughters_borrows() {
        let mut store = CellStore::new(4);
        store.grow_to(4);
        store.get_mut(0).unwrap().gamma = 2.0;
        let (parent, a, b) = store.parent_and_daughters(0, 2, 3);
        a.gamma = parent.gamma;
        b.gamma = parent.gamma * 2.0;
        assert_eq!(store.get(2).unwrap().gamma, 2.0);
        assert_eq!(store.get(3).unwrap().gamma, 4.0);
    }

    #[test]
    fn test_occupied_center_unwraps_seam() {
        let domain = Grid::new([10, 10, 10]);
        let patch = PatchGeometry::new(&domain, 1);
        let mut slot = CellSlot::zeroed(patch.len());
        slot.anchor = UVec3::new(9, 4, 4);
        // Nodes at local x = 0 and x = 2 sit at global x = 9 and x = 1.
        slot.fields.phi[patch.grid().to_index(0, 1, 1)] = 1.0;
        slot.fields.phi[patch.grid().to_index(2, 1, 1)] = 1.0;
        let c = slot.occupied_center(&domain, &patch).unwrap();
        assert!((c.x - 0.0).abs() < 1e-12, "centre should sit on the seam, got {}", c.x);
        assert!((c.y - 5.0).abs() < 1e-12);
    }
}
