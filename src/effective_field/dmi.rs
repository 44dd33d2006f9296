// src/effective_field/dmi.rs
//
// Dzyaloshinskii-Moriya interaction between bond partners.
//
// Bond energy:
//   E_ij = -D n_ij . (s_i x s_j)
//
// Gradient:
//   dE/ds_i = -D (s_j x n_ij)
//   dE/ds_j = +D (s_i x n_ij)

use crate::effective_field::{accumulate_pairs, for_each_incident_pair};
use crate::geometry::{BoundaryConditions, Geometry};
use crate::tables::PairTable;
use crate::vec3::{add_scaled, cross, dot};
use crate::vector_field::VectorField;

pub fn add_dmi_energy(
    geometry: &Geometry,
    bc: &BoundaryConditions,
    table: &PairTable,
    redundant: bool,
    spins: &VectorField,
    energy: &mut [f64],
) {
    let s = &spins.data;
    let half_bond = |ipair: usize, i: usize, j: usize| {
        -0.5 * table.magnitudes[ipair] * dot(table.normals[ipair], cross(s[i], s[j]))
    };
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

pub fn add_dmi_gradient(
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
        |ipair, _, j, g| {
            add_scaled(g, cross(s[j], table.normals[ipair]), -table.magnitudes[ipair])
        },
        |ipair, i, _, g| {
            add_scaled(g, cross(s[i], table.normals[ipair]), table.magnitudes[ipair])
        },
    );
}

pub fn dmi_energy_single_spin(
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
        e -= 0.5 * table.magnitudes[ipair] * dot(table.normals[ipair], cross(s[i], s[j]));
    });
    e
}
