//! The per-cell patch window.
//!
//! Every cell stores its field on a `(2 * margin + 1)^3` window whose local
//! origin sits at the cell's anchor offset in the global grid. Local indices
//! wrap with the patch's own periodic topology.

use glam::{IVec3, UVec3};

use super::{Grid, NeighborTable};

/// Shape of the patch shared by every cell
#[derive(Debug, Clone)]
pub struct PatchGeometry {
    margin: UVec3,
    grid: Grid,
    neighbors: NeighborTable,
}

impl PatchGeometry {
    /// Build the patch for a domain, clamping the margin per axis so the
    /// window never exceeds half the domain.
    pub fn new(domain: &Grid, margin: u32) -> Self {
        let size = domain.size();
        let clamp = |l: u32| margin.min((l / 2 + l % 2).saturating_sub(1));
        let margin = UVec3::new(clamp(size.x), clamp(size.y), clamp(size.z));
        let grid = Grid::new((margin * 2 + UVec3::ONE).to_array());
        let neighbors = NeighborTable::build(&grid);

        log::debug!(
            "patch margin {:?} -> {} nodes per cell",
            margin.to_array(),
            grid.len()
        );

        Self { margin, grid, neighbors }
    }

    pub fn margin(&self) -> UVec3 {
        self.margin
    }

    pub fn size(&self) -> UVec3 {
        self.grid.size()
    }

    /// Number of nodes in a patch (`patch_N`)
    pub fn len(&self) -> usize {
        self.grid.len()
    }

    pub fn is_empty(&self) -> bool {
        self.grid.is_empty()
    }

    /// Patch-local lattice
    pub fn grid(&self) -> &Grid {
        &self.grid
    }

    /// Periodic stencils inside the patch
    pub fn neighbors(&self) -> &NeighborTable {
        &self.neighbors
    }

    /// Local coordinate of patch node `q`
    pub fn local_coords(&self, q: usize) -> UVec3 {
        self.grid.from_index(q)
    }

    /// Global coordinate of patch node `q` for a patch anchored at `anchor`.
    pub fn global_coords(&self, domain: &Grid, anchor: UVec3, q: usize) -> UVec3 {
        domain.wrap(anchor.as_ivec3() + self.local_coords(q).as_ivec3())
    }

    /// Global index of patch node `q` for a patch anchored at `anchor`.
    #[inline]
    pub fn to_global(&self, domain: &Grid, anchor: UVec3, q: usize) -> usize {
        domain.index_of(self.global_coords(domain, anchor, q))
    }

    /// Anchor that centres the patch on `center`.
    pub fn anchor_for_center(&self, domain: &Grid, center: UVec3) -> UVec3 {
        domain.wrap(center.as_ivec3() - self.margin.as_ivec3())
    }

    /// Local coordinate of the patch centre
    pub fn center(&self) -> IVec3 {
        self.margin.as_ivec3()
    }
}
