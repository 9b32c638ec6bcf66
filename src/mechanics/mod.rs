//! Stress collaborator.
//!
//! The lifecycle only consumes stress: some [`StressSource`] fills the six
//! per-node components every step and [`reduce_cell_stress`] turns them
//! into one tensor per cell for the mutation criterion.

use crate::geometry::{Grid, PatchGeometry};
use crate::state::{CellStore, GlobalFields, StressField, StressTensor};

/// Anything able to produce a per-node stress field
pub trait StressSource {
    fn fill(&mut self, step: u64, domain: &Grid, fields: &mut GlobalFields);
}

/// Pressure from overlapping cells.
///
/// `sum_one^2 - sum_two` vanishes where at most one cell is present and
/// grows with the overlap, so the isotropic part of the stress tracks
/// crowding. Aligned polarisation adds a shear component.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct CrowdingStress {
    /// Pressure per unit overlap
    pub stiffness: f64,
    /// Shear per unit polarisation alignment
    pub shear: f64,
}

impl Default for CrowdingStress {
    fn default() -> Self {
        Self { stiffness: 1.0, shear: 0.1 }
    }
}

impl StressSource for CrowdingStress {
    fn fill(&mut self, _step: u64, _domain: &Grid, fields: &mut GlobalFields) {
        let GlobalFields { sum_one, sum_two, pressure, polarization, stress, .. } = fields;
        let [px, py, pz] = polarization;
        for k in 0..sum_one.len() {
            let p = self.stiffness * (sum_one[k] * sum_one[k] - sum_two[k]);
            pressure[k] = p;
            stress.sxx[k] = p - self.shear * px[k] * px[k];
            stress.syy[k] = p - self.shear * py[k] * py[k];
            stress.szz[k] = p - self.shear * pz[k] * pz[k];
            stress.sxy[k] = -self.shear * px[k] * py[k];
            stress.sxz[k] = -self.shear * px[k] * pz[k];
            stress.syz[k] = -self.shear * py[k] * pz[k];
        }
    }
}

/// Rebuild the global phase sums and phi-weighted polarisation and
/// velocity fields from the cell patches.
pub fn accumulate_phase_sums(
    cells: &CellStore,
    domain: &Grid,
    patch: &PatchGeometry,
    fields: &mut GlobalFields,
) {
    fields.sum_one.fill(0.0);
    fields.sum_two.fill(0.0);
    for axis in 0..3 {
        fields.polarization[axis].fill(0.0);
        fields.velocity[axis].fill(0.0);
    }

    for cell in cells {
        let p = cell.polarization.to_array();
        let v = cell.velocity.to_array();
        for (q, &phi) in cell.fields.phi.iter().enumerate() {
            if phi == 0.0 {
                continue;
            }
            let k = patch.to_global(domain, cell.anchor, q);
            fields.sum_one[k] += phi;
            fields.sum_two[k] += phi * phi;
            for axis in 0..3 {
                fields.polarization[axis][k] += phi * p[axis];
                fields.velocity[axis][k] += phi * v[axis];
            }
        }
    }
}

/// Phi-weighted average of the stress field over each cell's patch.
pub fn reduce_cell_stress(
    cells: &mut CellStore,
    domain: &Grid,
    patch: &PatchGeometry,
    stress: &StressField,
) {
    for cell in cells.iter_mut() {
        let mut acc = StressTensor::default();
        let mut weight = 0.0;
        for (q, &phi) in cell.fields.phi.iter().enumerate() {
            if phi <= 0.0 {
                continue;
            }
            let k = patch.to_global(domain, cell.anchor, q);
            acc.xx += phi * stress.sxx[k];
            acc.xy += phi * stress.sxy[k];
            acc.xz += phi * stress.sxz[k];
            acc.yy += phi * stress.syy[k];
            acc.yz += phi * stress.syz[k];
            acc.zz += phi * stress.szz[k];
            weight += phi;
        }
        cell.stress = if weight > 0.0 {
            StressTensor {
                xx: acc.xx / weight,
                xy: acc.xy / weight,
                xz: acc.xz / weight,
                yy: acc.yy / weight,
                yz: acc.yz / weight,
                zz: acc.zz / weight,
            }
        } else {
            StressTensor::default()
        };
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use glam::UVec3;

    #[test]
    fn test_overlap_pressure() {
        let domain = Grid::new([8, 8, 8]);
        let patch = PatchGeometry::new(&domain, 1);
        let mut cells = CellStore::new(patch.len());
        cells.grow_to(2);
        for (i, cell) in cells.iter_mut().enumerate() {
            cell.anchor = UVec3::new(2 + i as u32, 2, 2);
            cell.fields.phi.fill(1.0);
        }

        let mut fields = GlobalFields::zeroed(domain.len());
        accumulate_phase_sums(&cells, &domain, &patch, &mut fields);
        let mut source = CrowdingStress { stiffness: 1.0, shear: 0.0 };
        source.fill(0, &domain, &mut fields);

        // Shared node: two unit phases give 2^2 - 2 = 2.
        let shared = domain.to_index(3, 3, 3);
        assert_eq!(fields.pressure[shared], 2.0);
        let lone = domain.to_index(2, 3, 3);
        assert_eq!(fields.pressure[lone], 0.0);

        reduce_cell_stress(&mut cells, &domain, &patch, &fields.stress);
        let s = cells.get(0).unwrap().stress;
        // Two of the three x-planes of each patch overlap.
        assert!((s.hydrostatic() - 2.0 * 2.0 / 3.0).abs() < 1e-12);
        assert_eq!(s.xy, 0.0);
    }

    #[test]
    fn test_empty_cell_has_zero_stress() {
        let domain = Grid::new([6, 6, 6]);
        let patch = PatchGeometry::new(&domain, 1);
        let mut cells = CellStore::new(patch.len());
        cells.grow_to(1);
        cells.get_mut(0).unwrap().stress.xx = 5.0;
        let field = StressField::zeroed(domain.len());
        reduce_cell_stress(&mut cells, &domain, &patch, &field);
        assert_eq!(cells.get(0).unwrap().stress, StressTensor::default());
    }
}
