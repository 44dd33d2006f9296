// src/effective_field/anisotropy.rs

use rayon::prelude::*;

use crate::geometry::Geometry;
use crate::tables::AnisotropyTable;
use crate::vec3::{add_scaled, dot};
use crate::vector_field::VectorField;

/// Add uniaxial anisotropy energy per site.
///
/// For E_i = -K (n . s_i)^2 the minimum is at s_i parallel or antiparallel to n.
pub fn add_anisotropy_energy(
    geometry: &Geometry,
    table: &AnisotropyTable,
    spins: &VectorField,
    energy: &mut [f64],
) {
    let n = geometry.n_cell_atoms;
    if table.is_empty() || n == 0 {
        return;
    }
    energy.par_chunks_mut(n).enumerate().for_each(|(icell, cell)| {
        for ((&ibasis, &k), &axis) in table
            .indices
            .iter()
            .zip(table.magnitudes.iter())
            .zip(table.normals.iter())
        {
            let ispin = icell * n + ibasis;
            if !geometry.is_vacancy(ispin) {
                let sn = dot(axis, spins.data[ispin]);
                cell[ibasis] -= k * sn * sn;
            }
        }
    });
}

/// Gradient of the anisotropy energy: -2K (n . s_i) n.
pub fn add_anisotropy_gradient(
    geometry: &Geometry,
    table: &AnisotropyTable,
    spins: &VectorField,
    gradient: &mut VectorField,
) {
    let n = geometry.n_cell_atoms;
    if table.is_empty() || n == 0 {
        return;
    }
    gradient
        .data
        .par_chunks_mut(n)
        .enumerate()
        .for_each(|(icell, cell)| {
            for ((&ibasis, &k), &axis) in table
                .indices
                .iter()
                .zip(table.magnitudes.iter())
                .zip(table.normals.iter())
            {
                let ispin = icell * n + ibasis;
                if !geometry.is_vacancy(ispin) {
                    let sn = dot(axis, spins.data[ispin]);
                    add_scaled(&mut cell[ibasis], axis, -2.0 * k * sn);
                }
            }
        });
}

pub fn anisotropy_energy_single_spin(
    geometry: &Geometry,
    table: &AnisotropyTable,
    ispin: usize,
    spins: &VectorField,
) -> f64 {
    if geometry.is_vacancy(ispin) {
        return 0.0;
    }
    let ibasis = ispin % geometry.n_cell_atoms;
    let mut e = 0.0;
    for ((&idx, &k), &axis) in table
        .indices
        .iter()
        .zip(table.magnitudes.iter())
        .zip(table.normals.iter())
    {
        if idx == ibasis {
            let sn = dot(axis, spins.data[ispin]);
            e -= k * sn * sn;
        }
    }
    e
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn vacant_site_has_no_anisotropy_energy() {
        let g = Geometry::simple_cubic([2, 1, 1], 1.0, 1.0).with_vacancies(&[0]);
        let table = AnisotropyTable {
            indices: vec![0],
            magnitudes: vec![0.5],
            normals: vec![[0.0, 0.0, 1.0]],
        };
        let spins = VectorField::new(2);
        assert_eq!(anisotropy_energy_single_spin(&g, &table, 0, &spins), 0.0);
        assert_eq!(anisotropy_energy_single_spin(&g, &table, 1, &spins), -0.5);
    }
}
