// src/effective_field/ddi.rs
//
// Dipole-dipole interaction. Three evaluation strategies share one tensor:
//
//   D(r) = C (3 r r^T / |r|^5 - I / |r|^3),   C = DDI_PREFACTOR
//
// Gradient: dE/ds_i = -mu_i sum_j mu_j D(r_ij) s_j, energy E_i = 0.5 s_i . dE/ds_i.

use rayon::prelude::*;

use crate::effective_field::ddi_fft::DdiFft;
use crate::effective_field::{accumulate_pairs, for_each_incident_pair};
use crate::error::Result;
use crate::geometry::{BoundaryConditions, Geometry};
use crate::params::{DdiMethod, DDI_PREFACTOR};
use crate::tables::PairTable;
use crate::vec3::{add, dot, norm};
use crate::vector_field::VectorField;

/// Separations below this are treated as the same site.
const MIN_DISTANCE: f64 = 1e-10;

/// Independent entries (xx, xy, xz, yy, yz, zz) of the dipole tensor, zero for r ~ 0.
#[inline]
pub(crate) fn dipole_tensor(r: [f64; 3]) -> [f64; 6] {
    let d = norm(r);
    if d < MIN_DISTANCE {
        return [0.0; 6];
    }
    let inv3 = DDI_PREFACTOR / (d * d * d);
    let inv5 = 3.0 * inv3 / (d * d);
    [
        inv5 * r[0] * r[0] - inv3,
        inv5 * r[0] * r[1],
        inv5 * r[0] * r[2],
        inv5 * r[1] * r[1] - inv3,
        inv5 * r[1] * r[2],
        inv5 * r[2] * r[2] - inv3,
    ]
}

#[inline]
fn tensor_apply(d: [f64; 6], s: [f64; 3]) -> [f64; 3] {
    [
        d[0] * s[0] + d[1] * s[1] + d[2] * s[2],
        d[1] * s[0] + d[3] * s[1] + d[4] * s[2],
        d[2] * s[0] + d[4] * s[1] + d[5] * s[2],
    ]
}

/// sum_j mu_j D(r_ij) s_j over all sites and periodic images.
fn direct_sum_at(geometry: &Geometry, images: [i32; 3], spins: &VectorField, ispin: usize) -> [f64; 3] {
    let ri = geometry.positions[ispin];
    let mut field = [0.0; 3];
    for jspin in 0..geometry.nos {
        if geometry.is_vacancy(jspin) {
            continue;
        }
        let rj = geometry.positions[jspin];
        let base = [rj[0] - ri[0], rj[1] - ri[1], rj[2] - ri[2]];
        let mut d = [0.0; 6];
        for ia in -images[0]..=images[0] {
            for ib in -images[1]..=images[1] {
                for ic in -images[2]..=images[2] {
                    let t = dipole_tensor(add(base, geometry.image_shift([ia, ib, ic])));
                    for (acc, v) in d.iter_mut().zip(t) {
                        *acc += v;
                    }
                }
            }
        }
        let h = tensor_apply(d, spins.data[jspin]);
        let mu_j = geometry.mu_s[jspin];
        field[0] += mu_j * h[0];
        field[1] += mu_j * h[1];
        field[2] += mu_j * h[2];
    }
    field
}

/// O(N^2) gradient, parallel over target sites.
pub fn add_ddi_direct_gradient(
    geometry: &Geometry,
    images: [i32; 3],
    spins: &VectorField,
    gradient: &mut VectorField,
) {
    gradient
        .data
        .par_iter_mut()
        .enumerate()
        .for_each(|(ispin, g)| {
            if geometry.is_vacancy(ispin) {
                return;
            }
            let f = direct_sum_at(geometry, images, spins, ispin);
            let mu_i = geometry.mu_s[ispin];
            g[0] -= mu_i * f[0];
            g[1] -= mu_i * f[1];
            g[2] -= mu_i * f[2];
        });
}

/// Bond energy of a cutoff pair at distance `r` along unit vector `n`.
#[inline]
fn cutoff_bond_energy(mu_i: f64, mu_j: f64, r: f64, n: [f64; 3], si: [f64; 3], sj: [f64; 3]) -> f64 {
    let c = DDI_PREFACTOR * mu_i * mu_j / (r * r * r);
    -c * (3.0 * dot(si, n) * dot(sj, n) - dot(si, sj))
}

#[inline]
fn cutoff_partner_gradient(g: &mut [f64; 3], mu_i: f64, mu_j: f64, r: f64, n: [f64; 3], s_other: [f64; 3]) {
    let c = DDI_PREFACTOR * mu_i * mu_j / (r * r * r);
    let sn = dot(s_other, n);
    for ax in 0..3 {
        g[ax] -= c * (3.0 * n[ax] * sn - s_other[ax]);
    }
}

pub fn add_ddi_cutoff_energy(
    geometry: &Geometry,
    bc: &BoundaryConditions,
    table: &PairTable,
    redundant: bool,
    spins: &VectorField,
    energy: &mut [f64],
) {
    let s = &spins.data;
    let mu = &geometry.mu_s;
    let half_bond = |ipair: usize, i: usize, j: usize| {
        0.5 * cutoff_bond_energy(mu[i], mu[j], table.magnitudes[ipair], table.normals[ipair], s[i], s[j])
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

pub fn add_ddi_cutoff_gradient(
    geometry: &Geometry,
    bc: &BoundaryConditions,
    table: &PairTable,
    redundant: bool,
    spins: &VectorField,
    gradient: &mut VectorField,
) {
    let s = &spins.data;
    let mu = &geometry.mu_s;
    accumulate_pairs(
        geometry,
        bc,
        &table.pairs,
        redundant,
        &mut gradient.data,
        |ipair, i, j, g| {
            cutoff_partner_gradient(g, mu[i], mu[j], table.magnitudes[ipair], table.normals[ipair], s[j])
        },
        |ipair, i, j, g| {
            cutoff_partner_gradient(g, mu[i], mu[j], table.magnitudes[ipair], table.normals[ipair], s[i])
        },
    );
}

/// Prepared DDI evaluation strategy.
#[derive(Debug, Default)]
pub enum DdiEvaluator {
    #[default]
    None,
    Cutoff,
    Direct {
        images: [i32; 3],
    },
    Fft(Box<DdiFft>),
}

impl DdiEvaluator {
    /// Select and prepare the strategy. The FFT transform is planned here, eagerly.
    pub fn prepare(
        geometry: &Geometry,
        method: &DdiMethod,
        bc: &BoundaryConditions,
        cutoff_table: &PairTable,
    ) -> Result<Self> {
        Ok(match method {
            DdiMethod::None => DdiEvaluator::None,
            DdiMethod::Cutoff { .. } if cutoff_table.is_empty() => DdiEvaluator::None,
            DdiMethod::Cutoff { .. } => DdiEvaluator::Cutoff,
            DdiMethod::Direct { .. } => DdiEvaluator::Direct {
                images: method.images(bc),
            },
            DdiMethod::Fft { .. } => {
                DdiEvaluator::Fft(Box::new(DdiFft::new(geometry, method.images(bc))?))
            }
        })
    }

    pub fn is_active(&self) -> bool {
        !matches!(self, DdiEvaluator::None)
    }

    pub fn add_gradient(
        &self,
        geometry: &Geometry,
        bc: &BoundaryConditions,
        cutoff_table: &PairTable,
        redundant: bool,
        spins: &VectorField,
        gradient: &mut VectorField,
    ) {
        match self {
            DdiEvaluator::None => {}
            DdiEvaluator::Cutoff => {
                add_ddi_cutoff_gradient(geometry, bc, cutoff_table, redundant, spins, gradient)
            }
            DdiEvaluator::Direct { images } => {
                add_ddi_direct_gradient(geometry, *images, spins, gradient)
            }
            DdiEvaluator::Fft(fft) => fft.add_gradient(geometry, spins, gradient),
        }
    }

    pub fn add_energy(
        &self,
        geometry: &Geometry,
        bc: &BoundaryConditions,
        cutoff_table: &PairTable,
        redundant: bool,
        spins: &VectorField,
        energy: &mut [f64],
    ) {
        match self {
            DdiEvaluator::None => {}
            DdiEvaluator::Cutoff => {
                add_ddi_cutoff_energy(geometry, bc, cutoff_table, redundant, spins, energy)
            }
            DdiEvaluator::Direct { .. } | DdiEvaluator::Fft(_) => {
                let mut gradient = VectorField::zeros(geometry.nos);
                self.add_gradient(geometry, bc, cutoff_table, redundant, spins, &mut gradient);
                energy
                    .par_iter_mut()
                    .zip_eq(gradient.data.par_iter())
                    .zip_eq(spins.data.par_iter())
                    .for_each(|((e, g), s)| *e += 0.5 * dot(*s, *g));
            }
        }
    }

    /// Dipolar energy share of one site. FFT evaluation falls back to the direct sum.
    pub fn energy_single_spin(
        &self,
        geometry: &Geometry,
        bc: &BoundaryConditions,
        cutoff_table: &PairTable,
        redundant: bool,
        ispin: usize,
        spins: &VectorField,
    ) -> f64 {
        if geometry.is_vacancy(ispin) {
            return 0.0;
        }
        let images = match self {
            DdiEvaluator::None => return 0.0,
            DdiEvaluator::Cutoff => {
                let s = &spins.data;
                let mu = &geometry.mu_s;
                let mut e = 0.0;
                for_each_incident_pair(geometry, bc, &cutoff_table.pairs, redundant, ispin, |ipair, i, j| {
                    e += 0.5
                        * cutoff_bond_energy(
                            mu[i],
                            mu[j],
                            cutoff_table.magnitudes[ipair],
                            cutoff_table.normals[ipair],
                            s[i],
                            s[j],
                        );
                });
                return e;
            }
            DdiEvaluator::Direct { images } => *images,
            DdiEvaluator::Fft(fft) => fft.images(),
        };
        let f = direct_sum_at(geometry, images, spins, ispin);
        -0.5 * geometry.mu_s[ispin] * dot(spins.data[ispin], f)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn tensor_is_symmetric_traceless_and_even() {
        let r = [1.3, -0.4, 2.1];
        let d = dipole_tensor(r);
        let trace = d[0] + d[3] + d[5];
        assert!(trace.abs() < 1e-12 * DDI_PREFACTOR, "trace {trace}");
        assert_eq!(d, dipole_tensor([-r[0], -r[1], -r[2]]));
        assert_eq!(dipole_tensor([0.0; 3]), [0.0; 6]);
    }

    #[test]
    fn head_to_tail_pair_prefers_alignment_along_bond() {
        // Two moments on the x axis, 2 A apart
        let g = Geometry::simple_cubic([2, 1, 1], 2.0, 1.0);
        let along = VectorField::from_vec(vec![[1.0, 0.0, 0.0]; 2]);
        let across = VectorField::from_vec(vec![[0.0, 0.0, 1.0]; 2]);

        let energy = |spins: &VectorField| {
            let mut grad = VectorField::zeros(2);
            add_ddi_direct_gradient(&g, [0; 3], spins, &mut grad);
            0.5 * spins.dot_sum(&grad)
        };
        let c = DDI_PREFACTOR / 8.0;
        assert!((energy(&along) + 2.0 * c).abs() < 1e-15, "head-to-tail {}", energy(&along));
        assert!((energy(&across) - c).abs() < 1e-15, "side-by-side {}", energy(&across));
    }
}
