//! Mass-conserving split of a parent phase field into two daughters.
//!
//! Two foci are placed a cell radius either side of the parent's centre of
//! mass along a random in-plane direction. Each patch node is weighted by a
//! smoothed half-plane indicator of its signed distance along the foci axis,
//!
//! ```text
//! chi = (1 + tanh(g / epsilon)) / 2
//! ```
//!
//! daughter A receives `phi * chi` and daughter B the exact remainder.

use glam::DVec3;

use crate::geometry::{Grid, PatchGeometry};
use crate::state::CellSlot;

/// Width of the tanh interface between the two daughters (nodes)
pub const SPLIT_SHARPNESS: f64 = 25.0;

/// Plane separating the daughters
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SplitPlane {
    /// Midpoint between the foci
    pub origin: DVec3,
    /// Unit vector from focus B to focus A
    pub axis: DVec3,
}

impl SplitPlane {
    /// Plane through `center` normal to the in-plane direction `angle`,
    /// built from foci at distance `radius` on either side.
    pub fn through(center: DVec3, angle: f64, radius: f64) -> Self {
        let offset = DVec3::new(angle.cos(), angle.sin(), 0.0) * radius;
        let focus_a = center + offset;
        let focus_b = center - offset;
        Self {
            origin: (focus_a + focus_b) * 0.5,
            axis: (focus_a - focus_b).normalize_or_zero(),
        }
    }

    /// Share of the field at `r` that goes to daughter A
    #[inline]
    pub fn weight(&self, r: DVec3) -> f64 {
        self.weight_of_offset(r - self.origin)
    }

    #[inline]
    fn weight_of_offset(&self, d: DVec3) -> f64 {
        let g = self.axis.dot(d);
        0.5 * (1.0 + (g / SPLIT_SHARPNESS).tanh())
    }
}

/// Fill two daughter slots from `parent`.
///
/// Fields are split across `plane`; the stored properties, patch bounds,
/// anchor and threshold are copied; timers are reset and both daughters get
/// `property` as their physical property. Threshold means, polarisation and
/// lineage ids are left to the caller.
pub fn split_cell(
    parent: &CellSlot,
    a: &mut CellSlot,
    b: &mut CellSlot,
    plane: &SplitPlane,
    property: f64,
    domain: &Grid,
    patch: &PatchGeometry,
) {
    for daughter in [&mut *a, &mut *b] {
        daughter.gamma = property;
        daughter.traits = parent.traits;
        daughter.patch_min = parent.patch_min;
        daughter.patch_max = parent.patch_max;
        daughter.anchor = parent.anchor;
        daughter.clock = parent.clock.daughter(parent.clock.threshold_mean);
    }

    // Offsets use the nearest periodic image so a parent on the seam splits
    // along one plane rather than two.
    let size = domain.size().as_dvec3();
    for (q, &phi) in parent.fields.phi.iter().enumerate() {
        let r = patch.global_coords(domain, parent.anchor, q).as_dvec3();
        let d = r - plane.origin;
        let share = phi * plane.weight_of_offset(d - size * (d / size).round());
        a.fields.phi[q] = share;
        b.fields.phi[q] = phi - share;
    }
    a.fields.phi_old.copy_from_slice(&a.fields.phi);
    b.fields.phi_old.copy_from_slice(&b.fields.phi);

    a.refresh_volume();
    b.refresh_volume();
}
