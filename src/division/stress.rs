//! Stress-based division criteria.
//!
//! The in-plane stress sub-tensor of a cell,
//!
//! ```text
//! | sxx  sxy |
//! | sxy  syy |
//! ```
//!
//! is eigen-decomposed in closed form. Its principal direction is reported
//! alongside the mutation decision; the field split draws its own direction.

use glam::DVec2;

use crate::config::ProliferationParameters;
use crate::state::CellSlot;

/// Eigenpairs of a symmetric 2x2 matrix, `lambda_max >= lambda_min`
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Eigen2 {
    pub lambda_max: f64,
    pub lambda_min: f64,
    /// Unit eigenvector of `lambda_max`
    pub v_max: DVec2,
    /// Unit eigenvector of `lambda_min`
    pub v_min: DVec2,
}

/// Closed-form eigen-decomposition of `[[sxx, sxy], [sxy, syy]]`.
///
/// For a diagonal input (|sxy| within machine epsilon) the eigenvectors
/// are the coordinate axes, so no near-zero norm is ever divided by.
pub fn eigen_2x2(sxx: f64, sxy: f64, syy: f64) -> Eigen2 {
    let trace = sxx + syy;
    let delta = ((sxx - syy) * (sxx - syy) + 4.0 * sxy * sxy).sqrt();
    let eig1 = 0.5 * (trace + delta);
    let eig2 = 0.5 * (trace - delta);
    let (lambda_max, lambda_min) = if eig1 >= eig2 { (eig1, eig2) } else { (eig2, eig1) };

    let (v_max, v_min) = if sxy.abs() > f64::EPSILON {
        (
            DVec2::new(lambda_max - syy, sxy),
            DVec2::new(lambda_min - syy, sxy),
        )
    } else if sxx >= syy {
        (DVec2::X, DVec2::Y)
    } else {
        (DVec2::Y, DVec2::X)
    };

    Eigen2 {
        lambda_max,
        lambda_min,
        v_max: normalize_or_keep(v_max),
        v_min: normalize_or_keep(v_min),
    }
}

fn normalize_or_keep(v: DVec2) -> DVec2 {
    let norm = v.length();
    if norm > f64::EPSILON {
        v / norm
    } else {
        v
    }
}

/// Outcome of the stress-based mutation criterion
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct MutationDecision {
    /// Candidate is under more hydrostatic load than the rest of the population
    pub mutate: bool,
    /// Principal in-plane stress direction (radians)
    pub angle: f64,
}

/// Compare the candidate's hydrostatic stress with the mean over every
/// other live slot and report its principal stress direction.
pub fn decide_mutation(slots: &[CellSlot], candidate: usize) -> MutationDecision {
    let (sum, count) = slots
        .iter()
        .enumerate()
        .filter(|&(i, _)| i != candidate)
        .fold((0.0, 0usize), |(sum, count), (_, slot)| {
            (sum + slot.stress.hydrostatic(), count + 1)
        });
    let average = if count > 0 { sum / count as f64 } else { 0.0 };

    let stress = &slots[candidate].stress;
    let eigen = eigen_2x2(stress.xx, stress.xy, stress.yy);

    MutationDecision {
        mutate: stress.hydrostatic() > average,
        angle: eigen.v_max.y.atan2(eigen.v_max.x),
    }
}

/// Property a daughter receives: the parent's, or the parent's scaled by
/// `1 + mutation_strength` and clamped to the configured range.
pub fn daughter_property(parent: f64, mutate: bool, params: &ProliferationParameters) -> f64 {
    if mutate {
        (parent + parent * params.mutation_strength).clamp(params.min_property, params.max_property)
    } else {
        parent
    }
}

/// Winner of the anisotropy criterion
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct AnisotropyPick {
    pub slot: usize,
    /// `lambda_max / lambda_min`
    pub ratio: f64,
    /// Principal in-plane stress direction (radians)
    pub angle: f64,
}

/// Slot with the most anisotropic in-plane stress.
///
/// Slots whose minor eigenvalue is within machine epsilon of zero are
/// skipped rather than divided by.
pub fn most_anisotropic(slots: &[CellSlot]) -> Option<AnisotropyPick> {
    slots
        .iter()
        .enumerate()
        .filter_map(|(slot, cell)| {
            let e = eigen_2x2(cell.stress.xx, cell.stress.xy, cell.stress.yy);
            if e.lambda_min.abs() <= f64::EPSILON {
                log::debug!("slot {} skipped: degenerate minor stress", slot);
                return None;
            }
            Some(AnisotropyPick {
                slot,
                ratio: e.lambda_max / e.lambda_min,
                angle: e.v_max.y.atan2(e.v_max.x),
            })
        })
        .fold(None, |best: Option<AnisotropyPick>, pick| match best {
            Some(b) if b.ratio >= pick.ratio => Some(b),
            _ => Some(pick),
        })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::state::StressTensor;

    fn slot_with_stress(stress: StressTensor) -> CellSlot {
        let mut slot = CellSlot::zeroed(1);
        slot.stress = stress;
        slot
    }

    #[test]
    fn test_diagonal_fallback() {
        let e = eigen_2x2(1.0, 0.0, 3.0);
        assert_eq!(e.lambda_max, 3.0);
        assert_eq!(e.lambda_min, 1.0);
        assert_eq!(e.v_max, DVec2::Y);
        assert_eq!(e.v_min, DVec2::X);
    }

    #[test]
    fn test_isotropic_zero_matrix() {
        let e = eigen_2x2(0.0, 0.0, 0.0);
        assert_eq!((e.lambda_max, e.lambda_min), (0.0, 0.0));
        assert!(e.v_max.is_finite() && e.v_min.is_finite());
    }

    #[test]
    fn test_mutation_when_above_average() {
        let slots = vec![
            slot_with_stress(StressTensor { xx: 3.0, yy: 3.0, zz: 3.0, ..Default::default() }),
            slot_with_stress(StressTensor { xx: 1.0, yy: 1.0, zz: 1.0, ..Default::default() }),
            slot_with_stress(StressTensor { xx: 2.0, yy: 2.0, zz: 2.0, ..Default::default() }),
        ];
        assert!(decide_mutation(&slots, 0).mutate);
        assert!(!decide_mutation(&slots, 1).mutate);
        // 2.0 vs mean(3.0, 1.0) = 2.0: not strictly greater
        assert!(!decide_mutation(&slots, 2).mutate);
    }

    #[test]
    fn test_single_cell_compares_against_zero() {
        let slots = vec![slot_with_stress(StressTensor { xx: 0.3, ..Default::default() })];
        assert!(decide_mutation(&slots, 0).mutate);
    }

    #[test]
    fn test_angle_follows_principal_axis() {
        let slots = vec![slot_with_stress(StressTensor { xx: 0.0, yy: 5.0, ..Default::default() })];
        let d = decide_mutation(&slots, 0);
        assert!((d.angle - std::f64::consts::FRAC_PI_2).abs() < 1e-12);
    }

    #[test]
    fn test_mutated_property_clamped() {
        let params = ProliferationParameters {
            mutation_strength: 0.5,
            min_property: 0.005,
            max_property: 0.009,
            ..Default::default()
        };
        assert_eq!(daughter_property(0.008, false, &params), 0.008);
        assert_eq!(daughter_property(0.008, true, &params), 0.009);
        assert!((daughter_property(0.005, true, &params) - 0.0075).abs() < 1e-15);
    }

    #[test]
    fn test_anisotropy_skips_degenerate() {
        let slots = vec![
            slot_with_stress(StressTensor { xx: 10.0, yy: 0.0, ..Default::default() }),
            slot_with_stress(StressTensor { xx: 4.0, yy: 1.0, ..Default::default() }),
            slot_with_stress(StressTensor { xx: 2.0, yy: 1.0, ..Default::default() }),
        ];
        let pick = most_anisotropic(&slots).unwrap();
        assert_eq!(pick.slot, 1);
        assert!((pick.ratio - 4.0).abs() < 1e-12);

        let degenerate = vec![slot_with_stress(StressTensor::default())];
        assert_eq!(most_anisotropic(&degenerate), None);
    }
}
