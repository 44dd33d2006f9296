// src/effective_field/quadruplet.rs
//
// Four-spin interaction E_ijkl = -K (s_i . s_j)(s_k . s_l), shared equally by
// the four sites of each instance.

use crate::geometry::{BoundaryConditions, Geometry};
use crate::neighbours::Quadruplet;
use crate::tables::QuadrupletTable;
use crate::vec3::{add_scaled, dot};
use crate::vector_field::VectorField;

fn resolve(
    geometry: &Geometry,
    bc: &BoundaryConditions,
    q: &Quadruplet,
    cell: [usize; 3],
) -> Option<[usize; 4]> {
    Some([
        geometry.idx_from_translations(q.i, cell, [0, 0, 0], bc)?,
        geometry.idx_from_translations(q.j, cell, q.d_j, bc)?,
        geometry.idx_from_translations(q.k, cell, q.d_k, bc)?,
        geometry.idx_from_translations(q.l, cell, q.d_l, bc)?,
    ])
}

pub fn add_quadruplet_energy(
    geometry: &Geometry,
    bc: &BoundaryConditions,
    table: &QuadrupletTable,
    spins: &VectorField,
    energy: &mut [f64],
) {
    let s = &spins.data;
    for icell in 0..geometry.n_cells_total {
        let cell = geometry.cell_translations(icell);
        for (q, &k_mag) in table.quadruplets.iter().zip(&table.magnitudes) {
            if let Some(sites) = resolve(geometry, bc, q, cell) {
                let [i, j, k, l] = sites;
                let e = -k_mag * dot(s[i], s[j]) * dot(s[k], s[l]);
                for site in sites {
                    energy[site] += 0.25 * e;
                }
            }
        }
    }
}

pub fn add_quadruplet_gradient(
    geometry: &Geometry,
    bc: &BoundaryConditions,
    table: &QuadrupletTable,
    spins: &VectorField,
    gradient: &mut VectorField,
) {
    let s = &spins.data;
    let g = &mut gradient.data;
    for icell in 0..geometry.n_cells_total {
        let cell = geometry.cell_translations(icell);
        for (q, &k_mag) in table.quadruplets.iter().zip(&table.magnitudes) {
            let Some([i, j, k, l]) = resolve(geometry, bc, q, cell) else {
                continue;
            };
            let ij = dot(s[i], s[j]);
            let kl = dot(s[k], s[l]);
            add_scaled(&mut g[i], s[j], -k_mag * kl);
            add_scaled(&mut g[j], s[i], -k_mag * kl);
            add_scaled(&mut g[k], s[l], -k_mag * ij);
            add_scaled(&mut g[l], s[k], -k_mag * ij);
        }
    }
}

pub fn quadruplet_energy_single_spin(
    geometry: &Geometry,
    bc: &BoundaryConditions,
    table: &QuadrupletTable,
    ispin: usize,
    spins: &VectorField,
) -> f64 {
    if geometry.is_vacancy(ispin) {
        return 0.0;
    }
    let s = &spins.data;
    let ibasis = ispin % geometry.n_cell_atoms;
    let own_cell = geometry.cell_translations(ispin / geometry.n_cell_atoms);

    let mut e = 0.0;
    for (q, &k_mag) in table.quadruplets.iter().zip(&table.magnitudes) {
        let roles = [(q.i, [0; 3]), (q.j, q.d_j), (q.k, q.d_k), (q.l, q.d_l)];
        for (role, (basis, d)) in roles.into_iter().enumerate() {
            if basis != ibasis {
                continue;
            }
            let Some(anchor) = geometry.translate_cell(own_cell, [-d[0], -d[1], -d[2]], bc) else {
                continue;
            };
            let Some(sites) = resolve(geometry, bc, q, anchor) else {
                continue;
            };
            if sites[role] == ispin {
                let [i, j, k, l] = sites;
                e -= 0.25 * k_mag * dot(s[i], s[j]) * dot(s[k], s[l]);
            }
        }
    }
    e
}

#[cfg(test)]
mod tests {
    use super::*;

    fn plaquette() -> (Geometry, QuadrupletTable) {
        let g = Geometry::simple_cubic([3, 3, 1], 1.0, 1.0);
        let table = QuadrupletTable {
            quadruplets: vec![Quadruplet {
                i: 0,
                j: 0,
                k: 0,
                l: 0,
                d_j: [1, 0, 0],
                d_k: [0, 1, 0],
                d_l: [1, 1, 0],
            }],
            magnitudes: vec![0.4],
        };
        (g, table)
    }

    fn canted(n: usize) -> VectorField {
        let data = (0..n)
            .map(|i| {
                let phi = 0.37 * i as f64;
                let theta = 0.2 + 0.11 * i as f64;
                [theta.sin() * phi.cos(), theta.sin() * phi.sin(), theta.cos()]
            })
            .collect();
        VectorField::from_vec(data)
    }

    #[test]
    fn aligned_plaquettes_on_open_lattice() {
        let (g, table) = plaquette();
        let spins = VectorField::new(g.nos);
        let mut energy = vec![0.0; g.nos];
        add_quadruplet_energy(&g, &[false; 3], &table, &spins, &mut energy);

        // 2x2 anchors fit in a 3x3 open lattice, each contributing -K.
        let total: f64 = energy.iter().sum();
        assert!((total + 4.0 * 0.4).abs() < 1e-12, "total {total}");
        // The centre site belongs to all four plaquettes.
        assert!((energy[4] + 0.4).abs() < 1e-12, "centre {}", energy[4]);
    }

    #[test]
    fn gradient_matches_finite_differences() {
        let (g, table) = plaquette();
        let bc = [true, true, false];
        let spins = canted(g.nos);
        let mut grad = VectorField::zeros(g.nos);
        add_quadruplet_gradient(&g, &bc, &table, &spins, &mut grad);

        let total = |sp: &VectorField| {
            let mut e = vec![0.0; g.nos];
            add_quadruplet_energy(&g, &bc, &table, sp, &mut e);
            e.iter().sum::<f64>()
        };
        let h = 1e-6;
        for site in [0, 4, 8] {
            for comp in 0..3 {
                let mut plus = spins.clone();
                plus.data[site][comp] += h;
                let mut minus = spins.clone();
                minus.data[site][comp] -= h;
                let fd = (total(&plus) - total(&minus)) / (2.0 * h);
                assert!(
                    (fd - grad.data[site][comp]).abs() < 1e-6,
                    "site {site} comp {comp}: analytic {} vs numeric {fd}",
                    grad.data[site][comp]
                );
            }
        }
    }

    #[test]
    fn single_spin_shares_sum_to_total() {
        let (g, table) = plaquette();
        let spins = canted(g.nos);
        for bc in [[false; 3], [true, true, false]] {
            let mut energy = vec![0.0; g.nos];
            add_quadruplet_energy(&g, &bc, &table, &spins, &mut energy);
            for ispin in 0..g.nos {
                let single = quadruplet_energy_single_spin(&g, &bc, &table, ispin, &spins);
                assert!(
                    (single - energy[ispin]).abs() < 1e-12,
                    "bc {bc:?} site {ispin}: single {single} vs field {}",
                    energy[ispin]
                );
            }
        }
    }
}
