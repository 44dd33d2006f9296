// src/hessian.rs
//
// Dense 3N x 3N second-derivative matrix of the energy with respect to the
// Cartesian spin components, site `i` occupying rows/columns 3i..3i+3.
//
// Only the terms that are quadratic in the spins are assembled: anisotropy,
// exchange and DMI. Zeeman is linear and contributes nothing.

use nalgebra::DMatrix;

use crate::geometry::{BoundaryConditions, Geometry};
use crate::tables::{AnisotropyTable, PairTable};

/// Add -2K n n^T on the diagonal blocks.
pub fn add_anisotropy_hessian(geometry: &Geometry, table: &AnisotropyTable, hessian: &mut DMatrix<f64>) {
    let n = geometry.n_cell_atoms;
    for icell in 0..geometry.n_cells_total {
        for ((&ibasis, &k), &axis) in table
            .indices
            .iter()
            .zip(table.magnitudes.iter())
            .zip(table.normals.iter())
        {
            let ispin = icell * n + ibasis;
            if geometry.is_vacancy(ispin) {
                continue;
            }
            let i = 3 * ispin;
            for a in 0..3 {
                for b in 0..3 {
                    hessian[(i + a, i + b)] -= 2.0 * k * axis[a] * axis[b];
                }
            }
        }
    }
}

/// Visit every bond (ispin, jspin) of a pair table, serially.
fn for_each_bond<F>(geometry: &Geometry, bc: &BoundaryConditions, table: &PairTable, mut f: F)
where
    F: FnMut(usize, usize, usize),
{
    let n = geometry.n_cell_atoms;
    for icell in 0..geometry.n_cells_total {
        for (ipair, pair) in table.pairs.iter().enumerate() {
            let ispin = icell * n + pair.i;
            if let Some(jspin) = geometry.idx_from_pair(ispin, bc, pair, false) {
                f(ipair, ispin, jspin);
            }
        }
    }
}

/// Add -J on the diagonal of each off-diagonal (i, j) block.
///
/// In redundant mode the mirrored pair supplies the (j, i) block.
pub fn add_exchange_hessian(
    geometry: &Geometry,
    bc: &BoundaryConditions,
    table: &PairTable,
    redundant: bool,
    hessian: &mut DMatrix<f64>,
) {
    for_each_bond(geometry, bc, table, |ipair, ispin, jspin| {
        let (i, j) = (3 * ispin, 3 * jspin);
        let jm = table.magnitudes[ipair];
        for a in 0..3 {
            hessian[(i + a, j + a)] -= jm;
            if !redundant {
                hessian[(j + a, i + a)] -= jm;
            }
        }
    });
}

/// Block M_ab = -D eps_abc n_c from E = -D n . (s_i x s_j); (j, i) carries M^T.
pub fn add_dmi_hessian(
    geometry: &Geometry,
    bc: &BoundaryConditions,
    table: &PairTable,
    redundant: bool,
    hessian: &mut DMatrix<f64>,
) {
    for_each_bond(geometry, bc, table, |ipair, ispin, jspin| {
        let (i, j) = (3 * ispin, 3 * jspin);
        let d = table.magnitudes[ipair];
        let [nx, ny, nz] = table.normals[ipair];
        let block = [
            [0.0, -d * nz, d * ny],
            [d * nz, 0.0, -d * nx],
            [-d * ny, d * nx, 0.0],
        ];
        for a in 0..3 {
            for b in 0..3 {
                hessian[(i + a, j + b)] += block[a][b];
                if !redundant {
                    hessian[(j + b, i + a)] += block[a][b];
                }
            }
        }
    });
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::neighbours::Pair;

    #[test]
    fn dmi_block_reproduces_bond_energy() {
        let g = Geometry::simple_cubic([2, 1, 1], 1.0, 1.0);
        let bc = [false; 3];
        let table = PairTable {
            pairs: vec![Pair::new(0, 0, [1, 0, 0])],
            magnitudes: vec![0.8],
            normals: vec![[0.3, -0.5, 0.81]],
        };
        let mut h = DMatrix::zeros(6, 6);
        add_dmi_hessian(&g, &bc, &table, false, &mut h);

        let si = [0.2, 0.9, -0.3];
        let sj = [-0.7, 0.1, 0.6];
        let x = nalgebra::DVector::from_vec(vec![si[0], si[1], si[2], sj[0], sj[1], sj[2]]);
        let quadratic = 0.5 * x.dot(&(&h * &x));

        let n = table.normals[0];
        let c = crate::vec3::cross(si, sj);
        let expected = -0.8 * crate::vec3::dot(n, c);
        assert!(
            (quadratic - expected).abs() < 1e-12,
            "0.5 x^T H x = {quadratic}, bond energy {expected}"
        );
        assert!((&h - h.transpose()).abs().max() < 1e-15, "hessian must be symmetric");
    }
}
