// src/hamiltonian.rs
//
// Heisenberg Hamiltonian on a fixed lattice: owns the raw parameters, the
// resolved interaction tables and the prepared DDI strategy, and evaluates
// energies, gradients and the Hessian for a spin configuration.
//
// Any parameter change goes through `set_params`, which rebuilds everything
// before swapping it in. On error the previous state is kept intact.

use std::sync::Arc;

use log::{debug, info};
use nalgebra::DMatrix;

use crate::effective_field::anisotropy::{
    add_anisotropy_energy, add_anisotropy_gradient, anisotropy_energy_single_spin,
};
use crate::effective_field::ddi::DdiEvaluator;
use crate::effective_field::dmi::{add_dmi_energy, add_dmi_gradient, dmi_energy_single_spin};
use crate::effective_field::exchange::{
    add_exchange_energy, add_exchange_gradient, exchange_energy_single_spin,
};
use crate::effective_field::quadruplet::{
    add_quadruplet_energy, add_quadruplet_gradient, quadruplet_energy_single_spin,
};
use crate::effective_field::triplet::{
    add_triplet_energy, add_triplet_gradient, triplet_energy_single_spin,
};
use crate::effective_field::zeeman::{
    add_zeeman_energy, add_zeeman_gradient, zeeman_energy_single_spin,
};
use crate::energy::{EnergyBreakdown, EnergyCategory, EnergyContribution};
use crate::error::{HamiltonianError, Result};
use crate::geometry::{BoundaryConditions, Geometry};
use crate::hessian::{add_anisotropy_hessian, add_dmi_hessian, add_exchange_hessian};
use crate::params::{
    Anisotropy, DdiMethod, DmiChirality, HamiltonianParams, PairInteraction,
    QuadrupletInteraction, TripletInteraction,
};
use crate::tables::InteractionTables;
use crate::vec3::normalize;
use crate::vector_field::VectorField;

#[derive(Debug)]
pub struct Hamiltonian {
    geometry: Arc<Geometry>,
    params: HamiltonianParams,
    tables: InteractionTables,
    ddi: DdiEvaluator,
    active: Vec<EnergyCategory>,
}

impl Hamiltonian {
    pub fn new(geometry: Arc<Geometry>, params: HamiltonianParams) -> Result<Self> {
        let mut params = params;
        params.external_field_normal = normalize(params.external_field_normal);

        let tables = InteractionTables::build(&geometry, &params)?;
        let ddi = DdiEvaluator::prepare(&geometry, &params.ddi, &params.boundary_conditions, &tables.ddi)?;
        let mut hamiltonian = Self {
            geometry,
            params,
            tables,
            ddi,
            active: Vec::new(),
        };
        hamiltonian.update_energy_contributions();
        Ok(hamiltonian)
    }

    pub fn name(&self) -> &'static str {
        "Heisenberg"
    }

    pub fn geometry(&self) -> &Arc<Geometry> {
        &self.geometry
    }

    pub fn params(&self) -> &HamiltonianParams {
        &self.params
    }

    pub fn tables(&self) -> &InteractionTables {
        &self.tables
    }

    pub fn boundary_conditions(&self) -> &BoundaryConditions {
        &self.params.boundary_conditions
    }

    /// Categories that currently contribute, in reporting order.
    pub fn active_categories(&self) -> &[EnergyCategory] {
        &self.active
    }

    pub fn is_active(&self, category: EnergyCategory) -> bool {
        self.active.contains(&category)
    }

    /// Replace all parameters and rebuild tables and the DDI strategy.
    pub fn set_params(&mut self, params: HamiltonianParams) -> Result<()> {
        let mut params = params;
        params.external_field_normal = normalize(params.external_field_normal);

        let tables = InteractionTables::build(&self.geometry, &params)?;

        let ddi = DdiEvaluator::prepare(
            &self.geometry,
            &params.ddi,
            &params.boundary_conditions,
            &tables.ddi,
        )?;

        self.params = params;
        self.tables = tables;
        self.ddi = ddi;
        self.update_energy_contributions();
        Ok(())
    }

    /// Rebuild tables and DDI state from the current parameters.
    pub fn update_interactions(&mut self) -> Result<()> {
        self.set_params(self.params.clone())
    }

    pub fn set_external_field(&mut self, magnitude: f64, normal: [f64; 3]) -> Result<()> {
        let mut params = self.params.clone();
        params.external_field_magnitude = magnitude;
        params.external_field_normal = normal;
        self.set_params(params)
    }

    pub fn set_anisotropy(&mut self, anisotropy: Anisotropy) -> Result<()> {
        let mut params = self.params.clone();
        params.anisotropy = anisotropy;
        self.set_params(params)
    }

    pub fn set_exchange(&mut self, exchange: PairInteraction) -> Result<()> {
        let mut params = self.params.clone();
        params.exchange = exchange;
        self.set_params(params)
    }

    pub fn set_dmi(&mut self, dmi: PairInteraction, chirality: DmiChirality) -> Result<()> {
        let mut params = self.params.clone();
        params.dmi = dmi;
        params.dmi_chirality = chirality;
        self.set_params(params)
    }

    pub fn set_ddi(&mut self, method: DdiMethod) -> Result<()> {
        let mut params = self.params.clone();
        params.ddi = method;
        self.set_params(params)
    }

    pub fn set_triplets(&mut self, triplets: TripletInteraction) -> Result<()> {
        let mut params = self.params.clone();
        params.triplets = triplets;
        self.set_params(params)
    }

    pub fn set_quadruplets(&mut self, quadruplets: QuadrupletInteraction) -> Result<()> {
        let mut params = self.params.clone();
        params.quadruplets = quadruplets;
        self.set_params(params)
    }

    pub fn set_boundary_conditions(&mut self, bc: BoundaryConditions) -> Result<()> {
        let mut params = self.params.clone();
        params.boundary_conditions = bc;
        self.set_params(params)
    }

    pub fn set_redundant_neighbours(&mut self, redundant: bool) -> Result<()> {
        let mut params = self.params.clone();
        params.redundant_neighbours = redundant;
        self.set_params(params)
    }

    fn update_energy_contributions(&mut self) {
        let t = &self.tables;
        self.active = EnergyCategory::ALL
            .into_iter()
            .filter(|c| match c {
                EnergyCategory::Zeeman => self.params.external_field_magnitude != 0.0,
                EnergyCategory::Anisotropy => !t.anisotropy.is_empty(),
                EnergyCategory::Exchange => !t.exchange.is_empty(),
                EnergyCategory::Dmi => !t.dmi.is_empty(),
                EnergyCategory::Ddi => self.ddi.is_active(),
                EnergyCategory::Triplet => !t.triplets.is_empty(),
                EnergyCategory::Quadruplet => !t.quadruplets.is_empty(),
            })
            .collect();
        info!(
            "Hamiltonian updated: active terms [{}]",
            self.active
                .iter()
                .map(|c| c.name())
                .collect::<Vec<_>>()
                .join(", ")
        );
    }

    fn check_spins(&self, spins: &VectorField) -> Result<()> {
        if spins.len() != self.geometry.nos {
            return Err(HamiltonianError::GeometryMismatch {
                what: "spin field",
                expected: self.geometry.nos,
                got: spins.len(),
            });
        }
        Ok(())
    }

    fn add_category_gradient(&self, category: EnergyCategory, spins: &VectorField, gradient: &mut VectorField) {
        let g = &*self.geometry;
        let p = &self.params;
        let t = &self.tables;
        let bc = &p.boundary_conditions;
        let redundant = p.redundant_neighbours;
        match category {
            EnergyCategory::Zeeman => add_zeeman_gradient(
                g,
                p.external_field_magnitude,
                p.external_field_normal,
                gradient,
            ),
            EnergyCategory::Anisotropy => add_anisotropy_gradient(g, &t.anisotropy, spins, gradient),
            EnergyCategory::Exchange => {
                add_exchange_gradient(g, bc, &t.exchange, redundant, spins, gradient)
            }
            EnergyCategory::Dmi => add_dmi_gradient(g, bc, &t.dmi, redundant, spins, gradient),
            EnergyCategory::Ddi => self.ddi.add_gradient(g, bc, &t.ddi, redundant, spins, gradient),
            EnergyCategory::Triplet => add_triplet_gradient(g, bc, &t.triplets, spins, gradient),
            EnergyCategory::Quadruplet => {
                add_quadruplet_gradient(g, bc, &t.quadruplets, spins, gradient)
            }
        }
    }

    fn add_category_energy(&self, category: EnergyCategory, spins: &VectorField, energy: &mut [f64]) {
        let g = &*self.geometry;
        let p = &self.params;
        let t = &self.tables;
        let bc = &p.boundary_conditions;
        let redundant = p.redundant_neighbours;
        match category {
            EnergyCategory::Zeeman => add_zeeman_energy(
                g,
                p.external_field_magnitude,
                p.external_field_normal,
                spins,
                energy,
            ),
            EnergyCategory::Anisotropy => add_anisotropy_energy(g, &t.anisotropy, spins, energy),
            EnergyCategory::Exchange => {
                add_exchange_energy(g, bc, &t.exchange, redundant, spins, energy)
            }
            EnergyCategory::Dmi => add_dmi_energy(g, bc, &t.dmi, redundant, spins, energy),
            EnergyCategory::Ddi => self.ddi.add_energy(g, bc, &t.ddi, redundant, spins, energy),
            EnergyCategory::Triplet => add_triplet_energy(g, bc, &t.triplets, spins, energy),
            EnergyCategory::Quadruplet => add_quadruplet_energy(g, bc, &t.quadruplets, spins, energy),
        }
    }

    /// Overwrite `gradient` with dE/ds for every site.
    pub fn gradient_into(&self, spins: &VectorField, gradient: &mut VectorField) -> Result<()> {
        self.check_spins(spins)?;
        self.check_spins(gradient)?;
        gradient.set_uniform(0.0, 0.0, 0.0);
        for &category in &self.active {
            self.add_category_gradient(category, spins, gradient);
        }
        Ok(())
    }

    pub fn gradient(&self, spins: &VectorField) -> Result<VectorField> {
        let mut gradient = VectorField::zeros(self.geometry.nos);
        self.gradient_into(spins, &mut gradient)?;
        Ok(gradient)
    }

    /// Gradient of a single category, zero if it is inactive.
    pub fn gradient_of(&self, category: EnergyCategory, spins: &VectorField) -> Result<VectorField> {
        self.check_spins(spins)?;
        let mut gradient = VectorField::zeros(self.geometry.nos);
        if self.is_active(category) {
            self.add_category_gradient(category, spins, &mut gradient);
        }
        Ok(gradient)
    }

    /// Per-site energy of every active category, in reporting order.
    pub fn energy_contributions_per_spin(&self, spins: &VectorField) -> Result<Vec<EnergyContribution>> {
        self.check_spins(spins)?;
        let nos = self.geometry.nos;
        Ok(self
            .active
            .iter()
            .map(|&category| {
                let mut contribution = EnergyContribution::new(category, nos);
                self.add_category_energy(category, spins, &mut contribution.per_spin);
                contribution
            })
            .collect())
    }

    pub fn energy_contributions(&self, spins: &VectorField) -> Result<EnergyBreakdown> {
        let per_spin = self.energy_contributions_per_spin(spins)?;
        Ok(EnergyBreakdown::from_contributions(&per_spin))
    }

    /// Total energy (meV).
    pub fn energy(&self, spins: &VectorField) -> Result<f64> {
        Ok(self.energy_contributions(spins)?.total())
    }

    /// Energy share of site `ispin`, consistent with the per-site contributions.
    pub fn energy_single_spin(&self, ispin: usize, spins: &VectorField) -> Result<f64> {
        self.check_spins(spins)?;
        if ispin >= self.geometry.nos {
            return Err(HamiltonianError::GeometryMismatch {
                what: "site index",
                expected: self.geometry.nos,
                got: ispin,
            });
        }
        let g = &*self.geometry;
        if g.is_vacancy(ispin) {
            return Ok(0.0);
        }
        let p = &self.params;
        let t = &self.tables;
        let bc = &p.boundary_conditions;
        let redundant = p.redundant_neighbours;

        let mut e = 0.0;
        for &category in &self.active {
            e += match category {
                EnergyCategory::Zeeman => zeeman_energy_single_spin(
                    g,
                    p.external_field_magnitude,
                    p.external_field_normal,
                    ispin,
                    spins,
                ),
                EnergyCategory::Anisotropy => {
                    anisotropy_energy_single_spin(g, &t.anisotropy, ispin, spins)
                }
                EnergyCategory::Exchange => {
                    exchange_energy_single_spin(g, bc, &t.exchange, redundant, ispin, spins)
                }
                EnergyCategory::Dmi => dmi_energy_single_spin(g, bc, &t.dmi, redundant, ispin, spins),
                EnergyCategory::Ddi => {
                    self.ddi
                        .energy_single_spin(g, bc, &t.ddi, redundant, ispin, spins)
                }
                EnergyCategory::Triplet => triplet_energy_single_spin(g, bc, &t.triplets, ispin, spins),
                EnergyCategory::Quadruplet => {
                    quadruplet_energy_single_spin(g, bc, &t.quadruplets, ispin, spins)
                }
            };
        }
        Ok(e)
    }

    /// Dense Hessian of the anisotropy, exchange and DMI terms.
    ///
    /// DDI, triplet and quadruplet terms are not assembled.
    pub fn hessian(&self, spins: &VectorField) -> Result<DMatrix<f64>> {
        self.check_spins(spins)?;
        let g = &*self.geometry;
        let t = &self.tables;
        let bc = &self.params.boundary_conditions;
        let redundant = self.params.redundant_neighbours;

        let dim = 3 * g.nos;
        let mut hessian = DMatrix::zeros(dim, dim);
        for &category in &self.active {
            match category {
                EnergyCategory::Anisotropy => add_anisotropy_hessian(g, &t.anisotropy, &mut hessian),
                EnergyCategory::Exchange => {
                    add_exchange_hessian(g, bc, &t.exchange, redundant, &mut hessian)
                }
                EnergyCategory::Dmi => add_dmi_hessian(g, bc, &t.dmi, redundant, &mut hessian),
                EnergyCategory::Zeeman => {}
                other => debug!("hessian: {} term not assembled", other.name()),
            }
        }
        Ok(hessian)
    }
}
