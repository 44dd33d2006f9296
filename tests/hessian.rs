// tests/hessian.rs
//
// For the quadratic terms (anisotropy, exchange, DMI):
//   E(s) = 1/2 s^T H s   and   dE/ds = H s
//
// Run only these: cargo test --test hessian

use std::sync::Arc;

use nalgebra::DVector;

use heisenberg_core::params::{Anisotropy, DdiMethod, DmiChirality, PairInteraction};
use heisenberg_core::{Geometry, Hamiltonian, HamiltonianParams, VectorField};

fn spins_as_vector(spins: &VectorField) -> DVector<f64> {
    DVector::from_iterator(3 * spins.len(), spins.data.iter().flat_map(|s| s.iter().copied()))
}

fn twisted(n: usize) -> VectorField {
    let data = (0..n)
        .map(|i| {
            let theta = 0.25 + 0.6 * i as f64;
            let phi = 0.45 * (i * i) as f64;
            [theta.sin() * phi.cos(), theta.sin() * phi.sin(), theta.cos()]
        })
        .collect();
    VectorField::from_vec(data)
}

fn quadratic_params(redundant: bool) -> HamiltonianParams {
    HamiltonianParams {
        boundary_conditions: [true, false, false],
        anisotropy: Anisotropy {
            indices: vec![0],
            magnitudes: vec![0.6],
            normals: vec![[0.0, 1.0, 1.0]],
        },
        exchange: PairInteraction::Shells(vec![1.0, 0.25]),
        dmi: PairInteraction::Shells(vec![0.3]),
        dmi_chirality: DmiChirality::Bloch,
        redundant_neighbours: redundant,
        ..HamiltonianParams::default()
    }
}

#[test]
fn hessian_reproduces_quadratic_energy_and_gradient() {
    let geometry = Arc::new(Geometry::simple_cubic([4, 3, 1], 1.0, 1.0));
    let spins = twisted(geometry.nos);
    let x = spins_as_vector(&spins);

    for redundant in [true, false] {
        let h = Hamiltonian::new(geometry.clone(), quadratic_params(redundant)).unwrap();
        let hess = h.hessian(&spins).unwrap();
        assert_eq!(hess.nrows(), 3 * geometry.nos);
        assert_eq!(hess.ncols(), 3 * geometry.nos);

        let asym = (&hess - hess.transpose()).abs().max();
        assert!(asym < 1e-14, "redundant={redundant}: hessian asymmetry {asym}");

        let hx = &hess * &x;
        let e_quadratic = 0.5 * x.dot(&hx);
        let e = h.energy(&spins).unwrap();
        assert!(
            (e - e_quadratic).abs() < 1e-10,
            "redundant={redundant}: E = {e}, 1/2 s^T H s = {e_quadratic}"
        );

        let grad = spins_as_vector(&h.gradient(&spins).unwrap());
        let diff = (&grad - &hx).amax();
        assert!(diff < 1e-10, "redundant={redundant}: |grad - H s| = {diff}");
    }
}

#[test]
fn storage_mode_does_not_change_the_hessian() {
    let geometry = Arc::new(Geometry::simple_cubic([3, 3, 2], 1.0, 1.0));
    let spins = twisted(geometry.nos);
    let a = Hamiltonian::new(geometry.clone(), quadratic_params(true))
        .unwrap()
        .hessian(&spins)
        .unwrap();
    let b = Hamiltonian::new(geometry, quadratic_params(false))
        .unwrap()
        .hessian(&spins)
        .unwrap();
    assert!((&a - &b).abs().max() < 1e-14);
}

#[test]
fn unsupported_terms_are_left_out() {
    let geometry = Arc::new(Geometry::simple_cubic([2, 2, 1], 1.0, 1.0));
    let spins = twisted(geometry.nos);
    let params = HamiltonianParams {
        external_field_magnitude: 1.0,
        ddi: DdiMethod::Direct {
            n_periodic_images: [0; 3],
        },
        ..HamiltonianParams::default()
    };
    let h = Hamiltonian::new(geometry, params).unwrap();
    let hess = h.hessian(&spins).unwrap();
    assert_eq!(hess.amax(), 0.0, "Zeeman and DDI do not contribute to the assembled Hessian");
}
