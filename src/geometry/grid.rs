//! Periodic addressing on a rectangular lattice.
//!
//! Linear layout: `k = y + Ly * (x + Lx * z)`. The same type describes the
//! global domain and the patch window, which is why patches wrap as a small
//! torus of their own.

use glam::{IVec3, UVec3};

/// Rectangular lattice with periodic wrap on every axis
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Grid {
    size: UVec3,
}

impl Grid {
    /// Create a lattice of the given size. Every axis must be non-zero.
    pub fn new(size: [u32; 3]) -> Self {
        debug_assert!(size.iter().all(|&l| l > 0), "grid axes must be non-zero");
        Self { size: UVec3::from_array(size) }
    }

    pub fn size(&self) -> UVec3 {
        self.size
    }

    /// Number of nodes
    pub fn len(&self) -> usize {
        (self.size.x as usize) * (self.size.y as usize) * (self.size.z as usize)
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Wrap a signed coordinate back into the lattice.
    pub fn wrap(&self, p: IVec3) -> UVec3 {
        let s = self.size.as_ivec3();
        UVec3::new(
            p.x.rem_euclid(s.x) as u32,
            p.y.rem_euclid(s.y) as u32,
            p.z.rem_euclid(s.z) as u32,
        )
    }

    /// Linear index of `(x, y, z)`, wrapping each axis.
    pub fn to_index(&self, x: i32, y: i32, z: i32) -> usize {
        self.index_of(self.wrap(IVec3::new(x, y, z)))
    }

    /// Linear index of an in-range coordinate.
    #[inline]
    pub fn index_of(&self, p: UVec3) -> usize {
        let (lx, ly) = (self.size.x as usize, self.size.y as usize);
        p.y as usize + ly * (p.x as usize + lx * p.z as usize)
    }

    /// Inverse of [`Grid::index_of`]; `k` is taken modulo the node count.
    #[inline]
    pub fn from_index(&self, k: usize) -> UVec3 {
        let k = k % self.len();
        let (lx, ly) = (self.size.x as usize, self.size.y as usize);
        UVec3::new(((k / ly) % lx) as u32, (k % ly) as u32, (k / (lx * ly)) as u32)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_round_trip_every_index() {
        let grid = Grid::new([5, 4, 3]);
        for k in 0..grid.len() {
            let p = grid.from_index(k);
            assert_eq!(grid.to_index(p.x as i32, p.y as i32, p.z as i32), k);
        }
    }

    #[test]
    fn test_negative_coordinates_wrap() {
        let grid = Grid::new([5, 4, 3]);
        assert_eq!(grid.to_index(-1, 0, 0), grid.to_index(4, 0, 0));
        assert_eq!(grid.to_index(0, -1, -1), grid.to_index(0, 3, 2));
        assert_eq!(grid.to_index(5, 4, 3), 0);
    }

    #[test]
    fn test_y_is_fastest_axis() {
        let grid = Grid::new([5, 4, 3]);
        assert_eq!(grid.to_index(0, 1, 0), 1);
        assert_eq!(grid.to_index(1, 0, 0), 4);
        assert_eq!(grid.to_index(0, 0, 1), 20);
    }
}
