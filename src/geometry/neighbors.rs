//! Precomputed 27-point periodic stencils.

use glam::IVec3;

use super::Grid;

/// Number of stencil entries (3 x 3 x 3, identity included)
pub const STENCIL_SIZE: usize = 27;

/// Neighbour indices for every node of a [`Grid`], built once so the hot
/// loops never do modulo arithmetic.
#[derive(Debug, Clone)]
pub struct NeighborTable {
    table: Vec<[usize; STENCIL_SIZE]>,
}

impl NeighborTable {
    pub fn build(grid: &Grid) -> Self {
        let table = (0..grid.len())
            .map(|k| {
                let p = grid.from_index(k).as_ivec3();
                let mut stencil = [0usize; STENCIL_SIZE];
                for dx in -1..=1 {
                    for dy in -1..=1 {
                        for dz in -1..=1 {
                            let q = grid.wrap(p + IVec3::new(dx, dy, dz));
                            stencil[Self::slot(dx, dy, dz)] = grid.index_of(q);
                        }
                    }
                }
                stencil
            })
            .collect();
        Self { table }
    }

    #[inline]
    fn slot(dx: i32, dy: i32, dz: i32) -> usize {
        debug_assert!((-1..=1).contains(&dx) && (-1..=1).contains(&dy) && (-1..=1).contains(&dz));
        ((dx + 1) * 9 + (dy + 1) * 3 + (dz + 1)) as usize
    }

    /// Index of the node at offset `(dx, dy, dz)` from `k`, offsets in `-1..=1`.
    #[inline]
    pub fn neighbor(&self, k: usize, dx: i32, dy: i32, dz: i32) -> usize {
        self.table[k][Self::slot(dx, dy, dz)]
    }

    /// Full stencil of `k`
    pub fn stencil(&self, k: usize) -> &[usize; STENCIL_SIZE] {
        &self.table[k]
    }

    pub fn len(&self) -> usize {
        self.table.len()
    }

    pub fn is_empty(&self) -> bool {
        self.table.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_identity_offset() {
        let grid = Grid::new([4, 3, 5]);
        let table = NeighborTable::build(&grid);
        for k in 0..grid.len() {
            assert_eq!(table.neighbor(k, 0, 0, 0), k);
        }
    }

    #[test]
    fn test_corner_wraps() {
        let grid = Grid::new([4, 3, 5]);
        let table = NeighborTable::build(&grid);
        let origin = grid.to_index(0, 0, 0);
        assert_eq!(table.neighbor(origin, -1, -1, -1), grid.to_index(3, 2, 4));
    }
}
