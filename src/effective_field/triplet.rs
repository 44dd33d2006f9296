// src/effective_field/triplet.rs
//
// Three-spin scalar chirality.
//
//   T      = s_i . (s_j x s_k)
//   E_ijk  = -c1 T^2 - c2 T (n . (s_i + s_j + s_k))
//
// The energy of each triplet instance is shared equally by its three sites.
// Evaluation is serial: a single instance writes to three sites that can live
// in different cells.

use crate::geometry::{BoundaryConditions, Geometry};
use crate::neighbours::Triplet;
use crate::tables::TripletTable;
use crate::vec3::{add, add_scaled, cross, dot};
use crate::vector_field::VectorField;

/// Sites (i, j, k) of a triplet anchored at `cell`, or `None` if any is clipped or vacant.
fn resolve(
    geometry: &Geometry,
    bc: &BoundaryConditions,
    t: &Triplet,
    cell: [usize; 3],
) -> Option<(usize, usize, usize)> {
    let i = geometry.idx_from_translations(t.i, cell, [0, 0, 0], bc)?;
    let j = geometry.idx_from_translations(t.j, cell, t.d_j, bc)?;
    let k = geometry.idx_from_translations(t.k, cell, t.d_k, bc)?;
    Some((i, j, k))
}

fn triplet_energy(t: &Triplet, c1: f64, c2: f64, si: [f64; 3], sj: [f64; 3], sk: [f64; 3]) -> f64 {
    let chirality = dot(si, cross(sj, sk));
    let ns = dot(t.n, add(add(si, sj), sk));
    -c1 * chirality * chirality - c2 * chirality * ns
}

fn negate(d: [i32; 3]) -> [i32; 3] {
    [-d[0], -d[1], -d[2]]
}

pub fn add_triplet_energy(
    geometry: &Geometry,
    bc: &BoundaryConditions,
    table: &TripletTable,
    spins: &VectorField,
    energy: &mut [f64],
) {
    let s = &spins.data;
    for icell in 0..geometry.n_cells_total {
        let cell = geometry.cell_translations(icell);
        for (it, t) in table.triplets.iter().enumerate() {
            if let Some((i, j, k)) = resolve(geometry, bc, t, cell) {
                let e = triplet_energy(t, table.magnitudes1[it], table.magnitudes2[it], s[i], s[j], s[k]);
                energy[i] += e / 3.0;
                energy[j] += e / 3.0;
                energy[k] += e / 3.0;
            }
        }
    }
}

pub fn add_triplet_gradient(
    geometry: &Geometry,
    bc: &BoundaryConditions,
    table: &TripletTable,
    spins: &VectorField,
    gradient: &mut VectorField,
) {
    let s = &spins.data;
    for icell in 0..geometry.n_cells_total {
        let cell = geometry.cell_translations(icell);
        for (it, t) in table.triplets.iter().enumerate() {
            let Some((i, j, k)) = resolve(geometry, bc, t, cell) else {
                continue;
            };
            let (c1, c2) = (table.magnitudes1[it], table.magnitudes2[it]);
            let (si, sj, sk) = (s[i], s[j], s[k]);
            let chirality = dot(si, cross(sj, sk));
            let ns = dot(t.n, add(add(si, sj), sk));

            // dT/ds for each participant
            let partials = [(i, cross(sj, sk)), (j, cross(sk, si)), (k, cross(si, sj))];
            for (site, dt) in partials {
                let g = &mut gradient.data[site];
                add_scaled(g, dt, -2.0 * c1 * chirality - c2 * ns);
                add_scaled(g, t.n, -c2 * chirality);
            }
        }
    }
}

/// Share of the triplet energy carried by `ispin`, over every role it can play.
pub fn triplet_energy_single_spin(
    geometry: &Geometry,
    bc: &BoundaryConditions,
    table: &TripletTable,
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
    for (it, t) in table.triplets.iter().enumerate() {
        let roles = [
            (t.i, [0, 0, 0]),
            (t.j, negate(t.d_j)),
            (t.k, negate(t.d_k)),
        ];
        for (role, (basis, back)) in roles.into_iter().enumerate() {
            if basis != ibasis {
                continue;
            }
            let Some(anchor) = geometry.translate_cell(own_cell, back, bc) else {
                continue;
            };
            let Some((i, j, k)) = resolve(geometry, bc, t, anchor) else {
                continue;
            };
            let site = [i, j, k][role];
            if site == ispin {
                e += triplet_energy(t, table.magnitudes1[it], table.magnitudes2[it], s[i], s[j], s[k]) / 3.0;
            }
        }
    }
    e
}

#[cfg(test)]
mod tests {
    use super::*;

    fn chiral_triangle() -> (Geometry, TripletTable, VectorField) {
        let g = Geometry::simple_cubic([2, 2, 1], 1.0, 1.0);
        let table = TripletTable {
            triplets: vec![Triplet {
                i: 0,
                j: 0,
                k: 0,
                d_j: [1, 0, 0],
                d_k: [0, 1, 0],
                n: [0.0, 0.0, 1.0],
            }],
            magnitudes1: vec![0.7],
            magnitudes2: vec![0.3],
        };
        let mut spins = VectorField::zeros(4);
        spins.data[0] = [1.0, 0.0, 0.0];
        spins.data[1] = [0.0, 1.0, 0.0];
        spins.data[2] = [0.0, 0.0, 1.0];
        spins.data[3] = [0.0, 0.0, 1.0];
        (g, table, spins)
    }

    #[test]
    fn orthogonal_triad_has_unit_chirality() {
        let (g, table, spins) = chiral_triangle();
        let bc = [false; 3];
        let mut energy = vec![0.0; 4];
        add_triplet_energy(&g, &bc, &table, &spins, &mut energy);

        // T = 1, n . S = 1: E = -0.7 - 0.3
        let total: f64 = energy.iter().sum();
        assert!((total + 1.0).abs() < 1e-12, "total triplet energy {total}");
        assert!((energy[0] + 1.0 / 3.0).abs() < 1e-12);
        assert_eq!(energy[3], 0.0, "site 3 is not part of the only open-boundary instance");
    }

    #[test]
    fn gradient_matches_finite_differences() {
        let (g, table, mut spins) = chiral_triangle();
        spins.data[0] = [0.8, 0.1, 0.3];
        spins.data[2] = [0.2, -0.4, 0.9];
        let bc = [false; 3];

        let mut grad = VectorField::zeros(4);
        add_triplet_gradient(&g, &bc, &table, &spins, &mut grad);

        let total = |sp: &VectorField| {
            let mut e = vec![0.0; 4];
            add_triplet_energy(&g, &bc, &table, sp, &mut e);
            e.iter().sum::<f64>()
        };
        let h = 1e-6;
        for site in 0..4 {
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
        let (g, table, spins) = chiral_triangle();
        let bc = [true, true, false];
        let mut energy = vec![0.0; 4];
        add_triplet_energy(&g, &bc, &table, &spins, &mut energy);
        for ispin in 0..4 {
            let single = triplet_energy_single_spin(&g, &bc, &table, ispin, &spins);
            assert!(
                (single - energy[ispin]).abs() < 1e-12,
                "site {ispin}: single {single} vs field {}",
                energy[ispin]
            );
        }
    }
}
