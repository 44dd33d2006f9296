// src/effective_field/mod.rs
//
// Energy and gradient kernels, one module per interaction category.
//
// NOTE: "gradient" here is dE/ds_i (meV per unit spin), the convention the
// integrators expect. The effective field is its negative divided by mu_s.
pub mod anisotropy;
pub mod ddi;
pub mod ddi_fft;
pub mod dmi;
pub mod exchange;
pub mod quadruplet;
pub mod triplet;
pub mod zeeman;

use rayon::prelude::*;

use crate::geometry::{BoundaryConditions, Geometry};
use crate::neighbours::Pair;

/// Accumulate a per-bond quantity into a per-site buffer.
///
/// Every (cell, pair) bond with a valid partner is visited once. `own` updates the
/// `i` end. With `redundant` the cell loop runs in parallel and each iteration
/// writes only the sites of its own cell, relying on the mirrored pair in the
/// table for the `j` end. Otherwise the loop is serial and `partner` updates the
/// `j` end in the same pass.
pub(crate) fn accumulate_pairs<T, F, G>(
    geometry: &Geometry,
    bc: &BoundaryConditions,
    pairs: &[Pair],
    redundant: bool,
    out: &mut [T],
    own: F,
    partner: G,
) where
    T: Send,
    F: Fn(usize, usize, usize, &mut T) + Sync,
    G: Fn(usize, usize, usize, &mut T),
{
    let n = geometry.n_cell_atoms;
    if pairs.is_empty() || n == 0 {
        return;
    }
    debug_assert_eq!(out.len(), geometry.nos);

    if redundant {
        out.par_chunks_mut(n)
            .enumerate()
            .for_each(|(icell, cell)| {
                for (ipair, pair) in pairs.iter().enumerate() {
                    let ispin = icell * n + pair.i;
                    if let Some(jspin) = geometry.idx_from_pair(ispin, bc, pair, false) {
                        own(ipair, ispin, jspin, &mut cell[pair.i]);
                    }
                }
            });
    } else {
        for icell in 0..geometry.n_cells_total {
            for (ipair, pair) in pairs.iter().enumerate() {
                let ispin = icell * n + pair.i;
                if let Some(jspin) = geometry.idx_from_pair(ispin, bc, pair, false) {
                    own(ipair, ispin, jspin, &mut out[ispin]);
                    partner(ipair, ispin, jspin, &mut out[jspin]);
                }
            }
        }
    }
}

/// Visit every bond incident on `ispin` as `(ipair, i_end, j_end)`.
///
/// In non-redundant mode bonds where `ispin` is the `j` end are found through the
/// inverted lookup, so each incident bond is reported exactly once in both modes.
pub(crate) fn for_each_incident_pair<F>(
    geometry: &Geometry,
    bc: &BoundaryConditions,
    pairs: &[Pair],
    redundant: bool,
    ispin: usize,
    mut f: F,
) where
    F: FnMut(usize, usize, usize),
{
    let ibasis = ispin % geometry.n_cell_atoms;
    for (ipair, pair) in pairs.iter().enumerate() {
        if pair.i == ibasis {
            if let Some(jspin) = geometry.idx_from_pair(ispin, bc, pair, false) {
                f(ipair, ispin, jspin);
            }
        }
        if !redundant && pair.j == ibasis {
            if let Some(other) = geometry.idx_from_pair(ispin, bc, pair, true) {
                f(ipair, other, ispin);
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn both_modes_visit_every_bond_end_once() {
        let g = Geometry::simple_cubic([4, 1, 1], 1.0, 1.0);
        let bc = [false; 3];
        let forward = [Pair::new(0, 0, [1, 0, 0])];
        let mirrored = [forward[0], forward[0].reversed()];

        let mut serial = vec![0usize; 4];
        accumulate_pairs(&g, &bc, &forward, false, &mut serial, |_, _, _, c| *c += 1, |_, _, _, c| *c += 1);

        let mut parallel = vec![0usize; 4];
        accumulate_pairs(&g, &bc, &mirrored, true, &mut parallel, |_, _, _, c| *c += 1, |_, _, _, _| {});

        assert_eq!(serial, vec![1, 2, 2, 1]);
        assert_eq!(parallel, serial);

        for ispin in 0..4 {
            let mut n_single = 0;
            for_each_incident_pair(&g, &bc, &forward, false, ispin, |_, _, _| n_single += 1);
            let mut n_mirrored = 0;
            for_each_incident_pair(&g, &bc, &mirrored, true, ispin, |_, _, _| n_mirrored += 1);
            assert_eq!(n_single, serial[ispin]);
            assert_eq!(n_mirrored, serial[ispin]);
        }
    }
}
