// tests/scenarios.rs
//
// Small hand-checkable lattices with known energies and gradients.
// Run only these: cargo test --test scenarios

use std::sync::Arc;

use heisenberg_core::energy::EnergyCategory;
use heisenberg_core::neighbours::Pair;
use heisenberg_core::params::{Anisotropy, DdiMethod, DmiChirality, PairInteraction};
use heisenberg_core::tables::InteractionTables;
use heisenberg_core::{Geometry, Hamiltonian, HamiltonianParams, VectorField};

fn approx_eq(a: f64, b: f64, tol: f64) -> bool {
    (a - b).abs() <= tol
}

#[test]
fn aligned_ferromagnet_on_periodic_cube() {
    let geometry = Arc::new(Geometry::simple_cubic([2, 2, 2], 1.0, 1.0));
    for redundant in [true, false] {
        let params = HamiltonianParams {
            boundary_conditions: [true; 3],
            exchange: PairInteraction::Shells(vec![1.0]),
            redundant_neighbours: redundant,
            ..HamiltonianParams::default()
        };
        let h = Hamiltonian::new(geometry.clone(), params).unwrap();
        let spins = VectorField::new(geometry.nos);

        let grad = h.gradient(&spins).unwrap();
        for (i, g) in grad.data.iter().enumerate() {
            assert!(
                approx_eq(g[0], 0.0, 1e-12) && approx_eq(g[1], 0.0, 1e-12),
                "redundant={redundant} site {i}: transverse gradient {g:?}"
            );
            assert!(
                approx_eq(g[2], -6.0, 1e-12),
                "redundant={redundant} site {i}: expected -J * 6 along z, got {}",
                g[2]
            );
        }

        let e = h.energy(&spins).unwrap();
        assert!(approx_eq(e, -24.0, 1e-12), "redundant={redundant}: energy {e}");
    }
}

#[test]
fn two_site_dmi_splits_bond_energy() {
    let geometry = Arc::new(Geometry::simple_cubic([2, 1, 1], 1.0, 1.0));
    let d = 0.75;
    let params = HamiltonianParams {
        dmi: PairInteraction::Pairs {
            pairs: vec![Pair::new(0, 0, [1, 0, 0])],
            magnitudes: vec![d],
            normals: vec![[0.0, 0.0, 1.0]],
        },
        ..HamiltonianParams::default()
    };
    let h = Hamiltonian::new(geometry, params).unwrap();
    let spins = VectorField::from_vec(vec![[1.0, 0.0, 0.0], [0.0, 1.0, 0.0]]);

    let contributions = h.energy_contributions_per_spin(&spins).unwrap();
    assert_eq!(contributions.len(), 1);
    assert_eq!(contributions[0].category, EnergyCategory::Dmi);
    assert_eq!(contributions[0].name(), "DMI");
    for (i, e) in contributions[0].per_spin.iter().enumerate() {
        assert!(approx_eq(*e, -0.5 * d, 1e-14), "site {i}: {e}");
    }
    assert!(approx_eq(h.energy(&spins).unwrap(), -d, 1e-14));

    // Reversing the chirality of the pair flips the sign.
    let swapped = VectorField::from_vec(vec![[0.0, 1.0, 0.0], [1.0, 0.0, 0.0]]);
    assert!(approx_eq(h.energy(&swapped).unwrap(), d, 1e-14));
}

#[test]
fn all_magnitudes_off_is_fully_inactive() {
    let geometry = Arc::new(Geometry::simple_cubic([3, 3, 1], 1.0, 1.0));
    let params = HamiltonianParams {
        boundary_conditions: [true, true, false],
        external_field_magnitude: 0.0,
        exchange: PairInteraction::Shells(vec![0.0, 0.0]),
        dmi: PairInteraction::Shells(vec![0.0]),
        dmi_chirality: DmiChirality::Neel,
        anisotropy: Anisotropy {
            indices: vec![0],
            magnitudes: vec![0.0],
            normals: vec![[0.0, 0.0, 1.0]],
        },
        ddi: DdiMethod::None,
        ..HamiltonianParams::default()
    };
    let h = Hamiltonian::new(geometry.clone(), params).unwrap();
    let mut spins = VectorField::new(geometry.nos);
    spins.data[4] = [0.6, 0.0, 0.8];

    assert!(h.active_categories().is_empty());
    assert!(h.energy_contributions_per_spin(&spins).unwrap().is_empty());
    assert_eq!(h.gradient(&spins).unwrap().max_abs(), 0.0);
    assert_eq!(h.energy_single_spin(4, &spins).unwrap(), 0.0);
}

#[test]
fn rebuilding_tables_is_deterministic() {
    let geometry = Geometry::new(
        [[1.0, 0.0, 0.0], [0.5, 0.75f64.sqrt(), 0.0], [0.0, 0.0, 1.0]],
        [4, 4, 1],
        vec![[0.0, 0.0, 0.0], [1.0 / 3.0, 1.0 / 3.0, 0.0]],
        2.7,
        vec![2.0, 1.5],
    )
    .unwrap();
    let params = HamiltonianParams {
        boundary_conditions: [true, true, false],
        exchange: PairInteraction::Shells(vec![1.0, 0.3, -0.1]),
        dmi: PairInteraction::Shells(vec![0.2]),
        dmi_chirality: DmiChirality::Neel,
        ddi: DdiMethod::Cutoff { radius: 6.0 },
        ..HamiltonianParams::default()
    };
    let first = InteractionTables::build(&geometry, &params).unwrap();
    let second = InteractionTables::build(&geometry, &params).unwrap();
    assert!(!first.exchange.is_empty());
    assert_eq!(first, second, "tables must be identical across rebuilds");

    let mut h = Hamiltonian::new(Arc::new(geometry), params).unwrap();
    let before = h.tables().clone();
    h.update_interactions().unwrap();
    assert_eq!(h.tables(), &before);
}

#[test]
fn easy_axis_prefers_alignment() {
    let geometry = Arc::new(Geometry::simple_cubic([2, 2, 1], 1.0, 1.0));
    let params = HamiltonianParams {
        anisotropy: Anisotropy {
            indices: vec![0],
            magnitudes: vec![0.4],
            normals: vec![[0.0, 0.0, 3.0]],
        },
        ..HamiltonianParams::default()
    };
    let h = Hamiltonian::new(geometry, params).unwrap();

    let up = VectorField::new(4);
    let mut tilted = VectorField::new(4);
    tilted.set_uniform(1.0, 0.0, 1.0);
    tilted.normalize();

    let e_up = h.energy(&up).unwrap();
    let e_tilted = h.energy(&tilted).unwrap();
    assert!(approx_eq(e_up, -4.0 * 0.4, 1e-12), "aligned energy {e_up}");
    assert!(approx_eq(e_tilted, -4.0 * 0.2, 1e-12), "45 degree energy {e_tilted}");
}
