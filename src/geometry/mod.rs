//! Grid addressing and neighbour topology.
//!
//! The global domain and the per-cell patch are both periodic lattices; the
//! same [`Grid`] and [`NeighborTable`] construction serves both.

mod grid;
mod neighbors;
mod patch;

pub use grid::Grid;
pub use neighbors::{NeighborTable, STENCIL_SIZE};
pub use patch::PatchGeometry;
