// src/effective_field/exchange.rs
//
// Isotropic Heisenberg exchange.
//
// Bond energy:  E_ij = -J s_i . s_j   (split 0.5 / 0.5 between the two sites)
// Gradient:     dE/ds_i = -J s_j

use crate::effective_field::{accumulate_pairs, for_each_incident_pair};
use crate::geometry::{BoundaryConditions, Geometry};
use crate::tables::PairTable;
use crate::vec3::{add_scaled, dot};
use crate::vector_field::VectorField;

pub fn add_exchange_energy(
    geometry: &Geometry,
    bc: &BoundaryConditions,
    table: &PairTable,
    redundant: bool,
    spins: &VectorField,
    energy: &mut [f64],
) {
    let s = &spins.data;
    let half_bond = |ipair: usize, i: usize, j: usize| -0.5 * table.magnitudes[ipair] * dot(s[i], s[j]);
    accumulate_pairs(
        geometry,
        bc,
        &table.pairs,
        redundant,
        energy,
        |ipair, i, j, e| *e += half_bond(ipair, i, j),
        |ipair, i, j, e| *e += half_bond(ipair, i, j),
    );
}

pub fn add_exchange_gradient(
    geometry: &Geometry,
    bc: &BoundaryConditions,
    table: &PairTable,
    redundant: bool,
    spins: &VectorField,
    gradient: &mut VectorField,
) {
    let s = &spins.data;
    accumulate_pairs(
        geometry,
        bc,
        &table.pairs,
        redundant,
        &mut gradient.data,
        |ipair, _, j, g| add_scaled(g, s[j], -table.magnitudes[ipair]),
        |ipair, i, _, g| add_scaled(g, s[i], -table.magnitudes[ipair]),
    );
}

pub fn exchange_energy_single_spin(
    geometry: &Geometry,
    bc: &BoundaryConditions,
    table: &PairTable,
    redundant: bool,
    ispin: usize,
    spins: &VectorField,
) -> f64 {
    let s = &spins.data;
    let mut e = 0.0;
    for_each_incident_pair(geometry, bc, &table.pairs, redundant, ispin, |ipair, i, j| {
        e -= 0.5 * table.magnitudes[ipair] * dot(s[i], s[j]);
    });
    e
}
