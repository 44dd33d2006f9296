// src/vector_field.rs

use crate::vec3::dot;

/// One scalar per site (energies, magnetic moments).
pub type ScalarField = Vec<f64>;

/// Per-site 3-vector field (spins, gradients).
/// Each site stores (x, y, z).
#[derive(Debug, Clone, PartialEq)]
pub struct VectorField {
    pub data: Vec<[f64; 3]>,
}

impl VectorField {
    /// Create a new field with `n` sites, initialised along +z.
    pub fn new(n: usize) -> Self {
        Self {
            data: vec![[0.0, 0.0, 1.0]; n],
        }
    }

    /// Field with `n` sites set to zero.
    pub fn zeros(n: usize) -> Self {
        Self {
            data: vec![[0.0; 3]; n],
        }
    }

    pub fn from_vec(data: Vec<[f64; 3]>) -> Self {
        Self { data }
    }

    pub fn len(&self) -> usize {
        self.data.len()
    }

    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }

    /// Set all sites to the same vector (x, y, z).
    pub fn set_uniform(&mut self, x: f64, y: f64, z: f64) {
        for v in &mut self.data {
            *v = [x, y, z];
        }
    }

    /// Normalise every non-zero site to unit length.
    pub fn normalize(&mut self) {
        for v in &mut self.data {
            let n2 = dot(*v, *v);
            if n2 > 0.0 {
                let inv = 1.0 / n2.sqrt();
                v[0] *= inv;
                v[1] *= inv;
                v[2] *= inv;
            }
        }
    }

    /// Sum over sites of self[i] · other[i].
    pub fn dot_sum(&self, other: &VectorField) -> f64 {
        debug_assert_eq!(self.len(), other.len());
        self.data
            .iter()
            .zip(other.data.iter())
            .map(|(a, b)| dot(*a, *b))
            .sum()
    }

    /// Largest component-wise absolute difference to `other`.
    pub fn max_abs_diff(&self, other: &VectorField) -> f64 {
        debug_assert_eq!(self.len(), other.len());
        let mut max_abs: f64 = 0.0;
        for (a, b) in self.data.iter().zip(other.data.iter()) {
            for d in 0..3 {
                max_abs = max_abs.max((a[d] - b[d]).abs());
            }
        }
        max_abs
    }

    /// Largest component magnitude.
    pub fn max_abs(&self) -> f64 {
        self.data
            .iter()
            .flat_map(|v| v.iter())
            .fold(0.0_f64, |acc, x| acc.max(x.abs()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn normalize_skips_zero_sites_and_scales_others() {
        let mut f = VectorField::from_vec(vec![[0.0, 0.0, 0.0], [0.0, 3.0, 4.0]]);
        f.normalize();
        assert_eq!(f.data[0], [0.0, 0.0, 0.0]);
        let v = f.data[1];
        let norm = (v[0] * v[0] + v[1] * v[1] + v[2] * v[2]).sqrt();
        assert!((norm - 1.0).abs() < 1e-12, "norm not ~1 (got {})", norm);
    }

    #[test]
    fn dot_sum_and_diffs() {
        let a = VectorField::new(4);
        let mut b = VectorField::zeros(4);
        assert_eq!(a.dot_sum(&b), 0.0);
        b.set_uniform(0.0, 0.0, 2.0);
        assert_eq!(a.dot_sum(&b), 8.0);
        assert_eq!(a.max_abs_diff(&b), 1.0);
        assert_eq!(b.max_abs(), 2.0);
    }
}
