// src/energy.rs

use serde::Serialize;

use crate::vector_field::ScalarField;

/// Interaction categories, in the order their contributions are reported.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
pub enum EnergyCategory {
    Zeeman,
    Anisotropy,
    Exchange,
    Dmi,
    Ddi,
    Triplet,
    Quadruplet,
}

impl EnergyCategory {
    pub const ALL: [EnergyCategory; 7] = [
        EnergyCategory::Zeeman,
        EnergyCategory::Anisotropy,
        EnergyCategory::Exchange,
        EnergyCategory::Dmi,
        EnergyCategory::Ddi,
        EnergyCategory::Triplet,
        EnergyCategory::Quadruplet,
    ];

    pub fn name(self) -> &'static str {
        match self {
            EnergyCategory::Zeeman => "Zeeman",
            EnergyCategory::Anisotropy => "Anisotropy",
            EnergyCategory::Exchange => "Exchange",
            EnergyCategory::Dmi => "DMI",
            EnergyCategory::Ddi => "DDI",
            EnergyCategory::Triplet => "Triplets",
            EnergyCategory::Quadruplet => "Quadruplets",
        }
    }
}

/// Per-site energy of one category (meV).
#[derive(Debug, Clone, PartialEq)]
pub struct EnergyContribution {
    pub category: EnergyCategory,
    pub per_spin: ScalarField,
}

impl EnergyContribution {
    pub fn new(category: EnergyCategory, nos: usize) -> Self {
        Self {
            category,
            per_spin: vec![0.0; nos],
        }
    }

    pub fn name(&self) -> &'static str {
        self.category.name()
    }

    pub fn total(&self) -> f64 {
        self.per_spin.iter().sum()
    }
}

/// Category totals, the itemised counterpart of `Hamiltonian::energy`.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct EnergyBreakdown {
    pub terms: Vec<(EnergyCategory, f64)>,
}

impl EnergyBreakdown {
    pub fn from_contributions(contributions: &[EnergyContribution]) -> Self {
        Self {
            terms: contributions
                .iter()
                .map(|c| (c.category, c.total()))
                .collect(),
        }
    }

    pub fn total(&self) -> f64 {
        self.terms.iter().map(|(_, e)| e).sum()
    }

    pub fn get(&self, category: EnergyCategory) -> Option<f64> {
        self.terms
            .iter()
            .find(|(c, _)| *c == category)
            .map(|(_, e)| *e)
    }
}
