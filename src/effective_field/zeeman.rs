// src/effective_field/zeeman.rs
//
// E_i = -mu_i * mu_B * B (h . s_i)

use rayon::prelude::*;

use crate::geometry::Geometry;
use crate::params::MU_B;
use crate::vec3::dot;
use crate::vector_field::VectorField;

/// Add the Zeeman energy (meV) of every site.
pub fn add_zeeman_energy(
    geometry: &Geometry,
    magnitude: f64,
    normal: [f64; 3],
    spins: &VectorField,
    energy: &mut [f64],
) {
    let b = magnitude * MU_B;
    energy.par_iter_mut().enumerate().for_each(|(ispin, e)| {
        if !geometry.is_vacancy(ispin) {
            *e -= geometry.mu_s[ispin] * b * dot(normal, spins.data[ispin]);
        }
    });
}

pub fn add_zeeman_gradient(
    geometry: &Geometry,
    magnitude: f64,
    normal: [f64; 3],
    gradient: &mut VectorField,
) {
    let b = magnitude * MU_B;
    gradient
        .data
        .par_iter_mut()
        .enumerate()
        .for_each(|(ispin, g)| {
            if !geometry.is_vacancy(ispin) {
                let s = geometry.mu_s[ispin] * b;
                g[0] -= s * normal[0];
                g[1] -= s * normal[1];
                g[2] -= s * normal[2];
            }
        });
}

pub fn zeeman_energy_single_spin(
    geometry: &Geometry,
    magnitude: f64,
    normal: [f64; 3],
    ispin: usize,
    spins: &VectorField,
) -> f64 {
    if geometry.is_vacancy(ispin) {
        return 0.0;
    }
    -geometry.mu_s[ispin] * magnitude * MU_B * dot(normal, spins.data[ispin])
}
