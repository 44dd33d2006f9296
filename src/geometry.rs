// src/geometry.rs
//
// Immutable lattice description: Bravais vectors, basis atoms, cell counts,
// per-site magnetic moments and the vacancy mask.
//
// Site ordering:
//   ispin = ibasis + n_cell_atoms * (a + Na * (b + Nb * c))

use crate::error::{HamiltonianError, Result};
use crate::neighbours::Pair;
use crate::vec3;

/// Periodicity flag per lattice axis (a, b, c).
pub type BoundaryConditions = [bool; 3];

/// Atom type marking a vacant site. Any negative type is treated as vacant.
pub const VACANCY: i32 = -1;

#[derive(Debug, Clone)]
pub struct Geometry {
    /// Bravais vectors (dimensionless, scaled by `lattice_constant`).
    pub bravais_vectors: [[f64; 3]; 3],
    /// Lattice constant in Angstrom.
    pub lattice_constant: f64,
    pub n_cells: [usize; 3],
    /// Basis atom positions in units of the Bravais vectors.
    pub cell_atoms: Vec<[f64; 3]>,
    pub n_cell_atoms: usize,
    pub n_cells_total: usize,
    /// Number of sites.
    pub nos: usize,
    /// Magnetic moment per site (Bohr magnetons).
    pub mu_s: Vec<f64>,
    pub atom_types: Vec<i32>,
    /// Site positions in Angstrom.
    pub positions: Vec<[f64; 3]>,
}

impl Geometry {
    /// Build a lattice with `n_cells` unit cells, one moment `mu_s[ibasis]` per basis atom.
    pub fn new(
        bravais_vectors: [[f64; 3]; 3],
        n_cells: [usize; 3],
        cell_atoms: Vec<[f64; 3]>,
        lattice_constant: f64,
        mu_s: Vec<f64>,
    ) -> Result<Self> {
        let n_cell_atoms = cell_atoms.len();
        if mu_s.len() != n_cell_atoms {
            return Err(HamiltonianError::GeometryMismatch {
                what: "basis magnetic moments",
                expected: n_cell_atoms,
                got: mu_s.len(),
            });
        }

        let n_cells_total = n_cells[0] * n_cells[1] * n_cells[2];
        let nos = n_cells_total * n_cell_atoms;

        let [ta, tb, tc] = bravais_vectors;
        let mut positions = Vec::with_capacity(nos);
        let mut mu = Vec::with_capacity(nos);
        for c in 0..n_cells[2] {
            for b in 0..n_cells[1] {
                for a in 0..n_cells[0] {
                    for (ibasis, atom) in cell_atoms.iter().enumerate() {
                        let p = vec3::combine(
                            a as f64 + atom[0],
                            ta,
                            b as f64 + atom[1],
                            tb,
                            c as f64 + atom[2],
                            tc,
                        );
                        positions.push(vec3::scale(p, lattice_constant));
                        mu.push(mu_s[ibasis]);
                    }
                }
            }
        }

        Ok(Self {
            bravais_vectors,
            lattice_constant,
            n_cells,
            cell_atoms,
            n_cell_atoms,
            n_cells_total,
            nos,
            mu_s: mu,
            atom_types: vec![0; nos],
            positions,
        })
    }

    /// Simple cubic lattice, one atom per cell.
    pub fn simple_cubic(n_cells: [usize; 3], lattice_constant: f64, mu_s: f64) -> Self {
        let n_cells_total = n_cells[0] * n_cells[1] * n_cells[2];
        let mut positions = Vec::with_capacity(n_cells_total);
        for c in 0..n_cells[2] {
            for b in 0..n_cells[1] {
                for a in 0..n_cells[0] {
                    positions.push([
                        a as f64 * lattice_constant,
                        b as f64 * lattice_constant,
                        c as f64 * lattice_constant,
                    ]);
                }
            }
        }
        Self {
            bravais_vectors: [[1.0, 0.0, 0.0], [0.0, 1.0, 0.0], [0.0, 0.0, 1.0]],
            lattice_constant,
            n_cells,
            cell_atoms: vec![[0.0; 3]],
            n_cell_atoms: 1,
            n_cells_total,
            nos: n_cells_total,
            mu_s: vec![mu_s; n_cells_total],
            atom_types: vec![0; n_cells_total],
            positions,
        }
    }

    /// Replace the per-site magnetic moments.
    pub fn with_mu_s(mut self, mu_s: Vec<f64>) -> Result<Self> {
        if mu_s.len() != self.nos {
            return Err(HamiltonianError::GeometryMismatch {
                what: "site magnetic moments",
                expected: self.nos,
                got: mu_s.len(),
            });
        }
        self.mu_s = mu_s;
        Ok(self)
    }

    /// Replace the per-site atom types (negative = vacancy).
    pub fn with_atom_types(mut self, atom_types: Vec<i32>) -> Result<Self> {
        if atom_types.len() != self.nos {
            return Err(HamiltonianError::GeometryMismatch {
                what: "atom types",
                expected: self.nos,
                got: atom_types.len(),
            });
        }
        self.atom_types = atom_types;
        Ok(self)
    }

    /// Mark the given sites as vacant. Out-of-range sites are ignored.
    pub fn with_vacancies(mut self, sites: &[usize]) -> Self {
        for &s in sites {
            if let Some(t) = self.atom_types.get_mut(s) {
                *t = VACANCY;
            }
        }
        self
    }

    #[inline]
    pub fn is_vacancy(&self, ispin: usize) -> bool {
        self.atom_types[ispin] < 0
    }

    /// Flat cell index for cell translations (a, b, c).
    #[inline]
    pub fn cell_index(&self, t: [usize; 3]) -> usize {
        debug_assert!(t[0] < self.n_cells[0] && t[1] < self.n_cells[1] && t[2] < self.n_cells[2]);
        t[0] + self.n_cells[0] * (t[1] + self.n_cells[1] * t[2])
    }

    /// Cell translations (a, b, c) of a flat cell index.
    #[inline]
    pub fn cell_translations(&self, icell: usize) -> [usize; 3] {
        let na = self.n_cells[0];
        let nb = self.n_cells[1];
        [icell % na, (icell / na) % nb, icell / (na * nb)]
    }

    /// Site index for basis atom `ibasis` in cell (a, b, c).
    #[inline]
    pub fn idx(&self, ibasis: usize, t: [usize; 3]) -> usize {
        ibasis + self.n_cell_atoms * self.cell_index(t)
    }

    /// Translate a cell by `d`, wrapping periodic axes and clipping open ones.
    #[inline]
    pub fn translate_cell(
        &self,
        t: [usize; 3],
        d: [i32; 3],
        bc: &BoundaryConditions,
    ) -> Option<[usize; 3]> {
        let mut out = [0usize; 3];
        for ax in 0..3 {
            let n = self.n_cells[ax] as i64;
            let v = t[ax] as i64 + d[ax] as i64;
            if (0..n).contains(&v) {
                out[ax] = v as usize;
            } else if bc[ax] {
                out[ax] = v.rem_euclid(n) as usize;
            } else {
                return None;
            }
        }
        Some(out)
    }

    /// Partner site of `ispin` along a pair template.
    ///
    /// Forward (`invert == false`): `ispin` is the `i` end, the result is the `j` end at
    /// translation `+t`. Inverted: `ispin` is the `j` end, the result is the `i` end at `-t`.
    /// Returns `None` when the partner falls outside an open boundary or either end is vacant.
    pub fn idx_from_pair(
        &self,
        ispin: usize,
        bc: &BoundaryConditions,
        pair: &Pair,
        invert: bool,
    ) -> Option<usize> {
        if self.is_vacancy(ispin) {
            return None;
        }
        let t = pair.translations;
        let (target_basis, d) = if invert {
            (pair.i, [-t[0], -t[1], -t[2]])
        } else {
            (pair.j, t)
        };
        let cell = self.cell_translations(ispin / self.n_cell_atoms);
        let cell = self.translate_cell(cell, d, bc)?;
        let jspin = self.idx(target_basis, cell);
        if self.is_vacancy(jspin) {
            None
        } else {
            Some(jspin)
        }
    }

    /// Site of basis atom `ibasis` in the cell reached from `cell` by `d`, vacancy-aware.
    #[inline]
    pub fn idx_from_translations(
        &self,
        ibasis: usize,
        cell: [usize; 3],
        d: [i32; 3],
        bc: &BoundaryConditions,
    ) -> Option<usize> {
        let cell = self.translate_cell(cell, d, bc)?;
        let ispin = self.idx(ibasis, cell);
        if self.is_vacancy(ispin) {
            None
        } else {
            Some(ispin)
        }
    }

    /// Real-space vector (Angstrom) for fractional lattice coordinates `d`.
    #[inline]
    pub fn lattice_vector(&self, d: [f64; 3]) -> [f64; 3] {
        let [ta, tb, tc] = self.bravais_vectors;
        vec3::scale(vec3::combine(d[0], ta, d[1], tb, d[2], tc), self.lattice_constant)
    }

    /// Separation r_j - r_i (Angstrom) of a pair template.
    pub fn pair_vector(&self, pair: &Pair) -> [f64; 3] {
        let ci = self.cell_atoms[pair.i];
        let cj = self.cell_atoms[pair.j];
        let t = pair.translations;
        self.lattice_vector([
            t[0] as f64 + cj[0] - ci[0],
            t[1] as f64 + cj[1] - ci[1],
            t[2] as f64 + cj[2] - ci[2],
        ])
    }

    /// Shift of one full periodic image along each axis (Angstrom), scaled by `images`.
    pub fn image_shift(&self, images: [i32; 3]) -> [f64; 3] {
        self.lattice_vector([
            (images[0] as i64 * self.n_cells[0] as i64) as f64,
            (images[1] as i64 * self.n_cells[1] as i64) as f64,
            (images[2] as i64 * self.n_cells[2] as i64) as f64,
        ])
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn two_atom_chain() -> Geometry {
        Geometry::new(
            [[1.0, 0.0, 0.0], [0.0, 1.0, 0.0], [0.0, 0.0, 1.0]],
            [4, 1, 1],
            vec![[0.0, 0.0, 0.0], [0.5, 0.0, 0.0]],
            2.0,
            vec![1.0, 2.0],
        )
        .unwrap()
    }

    #[test]
    fn site_indexing_is_consistent() {
        let g = two_atom_chain();
        assert_eq!(g.nos, 8);
        assert_eq!(g.idx(0, [0, 0, 0]), 0);
        assert_eq!(g.idx(1, [0, 0, 0]), 1);
        assert_eq!(g.idx(1, [3, 0, 0]), 7);
        assert_eq!(g.cell_translations(3), [3, 0, 0]);
        assert_eq!(g.mu_s[7], 2.0);
        assert!((g.positions[3][0] - 3.0).abs() < 1e-12); // cell 1, basis 1: (1 + 0.5) * 2
    }

    #[test]
    fn pair_lookup_wraps_or_clips() {
        let g = two_atom_chain();
        let p = Pair::new(1, 0, [1, 0, 0]);
        let last = g.idx(1, [3, 0, 0]);

        assert_eq!(g.idx_from_pair(last, &[false, false, false], &p, false), None);
        assert_eq!(g.idx_from_pair(last, &[true, false, false], &p, false), Some(0));

        // Inverted lookup from the j end recovers the i end.
        assert_eq!(g.idx_from_pair(0, &[true, false, false], &p, true), Some(last));
    }

    #[test]
    fn vacancies_are_never_partners() {
        let g = two_atom_chain().with_vacancies(&[2]);
        let p = Pair::new(1, 0, [1, 0, 0]);
        assert!(g.is_vacancy(2));
        assert_eq!(g.idx_from_pair(1, &[false; 3], &p, false), None);
        assert_eq!(g.idx_from_pair(2, &[false; 3], &p, true), None);
    }

    #[test]
    fn mismatched_arrays_are_rejected() {
        let err = Geometry::simple_cubic([2, 2, 1], 1.0, 1.0).with_atom_types(vec![0; 3]);
        assert!(matches!(
            err,
            Err(HamiltonianError::GeometryMismatch { expected: 4, got: 3, .. })
        ));
    }
}
