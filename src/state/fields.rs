//! Fields defined on the whole domain.

/// The six independent components of the stress tensor at every node
#[derive(Debug, Clone, Default, PartialEq)]
pub struct StressField {
    pub sxx: Vec<f64>,
    pub sxy: Vec<f64>,
    pub sxz: Vec<f64>,
    pub syy: Vec<f64>,
    pub syz: Vec<f64>,
    pub szz: Vec<f64>,
}

impl StressField {
    pub fn zeroed(n: usize) -> Self {
        Self {
            sxx: vec![0.0; n],
            sxy: vec![0.0; n],
            sxz: vec![0.0; n],
            syy: vec![0.0; n],
            syz: vec![0.0; n],
            szz: vec![0.0; n],
        }
    }

    pub fn fill(&mut self, value: f64) {
        for c in [
            &mut self.sxx,
            &mut self.sxy,
            &mut self.sxz,
            &mut self.syy,
            &mut self.syz,
            &mut self.szz,
        ] {
            c.fill(value);
        }
    }
}

/// Global accumulators shared by all cells
#[derive(Debug, Clone, Default, PartialEq)]
pub struct GlobalFields {
    /// Sum of phi over cells
    pub sum_one: Vec<f64>,
    /// Sum of phi squared over cells
    pub sum_two: Vec<f64>,
    pub pressure: Vec<f64>,
    pub polarization: [Vec<f64>; 3],
    pub velocity: [Vec<f64>; 3],
    pub stress: StressField,
}

impl GlobalFields {
    pub fn zeroed(n: usize) -> Self {
        Self {
            sum_one: vec![0.0; n],
            sum_two: vec![0.0; n],
            pressure: vec![0.0; n],
            polarization: [vec![0.0; n], vec![0.0; n], vec![0.0; n]],
            velocity: [vec![0.0; n], vec![0.0; n], vec![0.0; n]],
            stress: StressField::zeroed(n),
        }
    }

    pub fn len(&self) -> usize {
        self.sum_one.len()
    }

    pub fn is_empty(&self) -> bool {
        self.sum_one.is_empty()
    }

    /// Zero the accumulators at the given global nodes, as done when a
    /// cell is removed.
    pub fn clear_footprint<I: IntoIterator<Item = usize>>(&mut self, nodes: I) {
        for k in nodes {
            self.pressure[k] = 0.0;
            self.sum_one[k] = 0.0;
            self.sum_two[k] = 0.0;
            for axis in 0..3 {
                self.polarization[axis][k] = 0.0;
                self.velocity[axis][k] = 0.0;
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_clear_footprint_only_touches_listed_nodes() {
        let mut fields = GlobalFields::zeroed(4);
        fields.sum_one.fill(1.0);
        fields.velocity[2].fill(3.0);
        fields.stress.fill(5.0);

        fields.clear_footprint([1, 3]);

        assert_eq!(fields.sum_one, vec![1.0, 0.0, 1.0, 0.0]);
        assert_eq!(fields.velocity[2], vec![3.0, 0.0, 3.0, 0.0]);
        assert_eq!(fields.stress.sxx, vec![5.0; 4], "stress is owned by the force model");
    }
}
