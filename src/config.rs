// src/config.rs
//
// JSON snapshot of a Hamiltonian setup, written next to simulation output so a
// run can be reproduced.

use serde::{Deserialize, Serialize};
use std::fs::File;
use std::io::Read;
use std::path::Path;

use crate::error::Result;
use crate::geometry::Geometry;
use crate::hamiltonian::Hamiltonian;
use crate::params::HamiltonianParams;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LatticeConfig {
    pub bravais_vectors: [[f64; 3]; 3],
    /// Angstrom
    pub lattice_constant: f64,
    pub n_cells: [usize; 3],
    pub cell_atoms: Vec<[f64; 3]>,
    pub nos: usize,
}

impl From<&Geometry> for LatticeConfig {
    fn from(g: &Geometry) -> Self {
        Self {
            bravais_vectors: g.bravais_vectors,
            lattice_constant: g.lattice_constant,
            n_cells: g.n_cells,
            cell_atoms: g.cell_atoms.clone(),
            nos: g.nos,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HamiltonianConfig {
    pub hamiltonian: String,
    pub lattice: LatticeConfig,
    pub params: HamiltonianParams,
    /// Names of the terms active at snapshot time.
    #[serde(default)]
    pub active_terms: Vec<String>,
}

impl HamiltonianConfig {
    pub fn from_hamiltonian(hamiltonian: &Hamiltonian) -> Self {
        Self {
            hamiltonian: hamiltonian.name().to_string(),
            lattice: LatticeConfig::from(&**hamiltonian.geometry()),
            params: hamiltonian.params().clone(),
            active_terms: hamiltonian
                .active_categories()
                .iter()
                .map(|c| c.name().to_string())
                .collect(),
        }
    }

    pub fn write_to_dir(&self, out_dir: &Path) -> Result<()> {
        let path = out_dir.join("config.json");
        let file = File::create(path)?;
        serde_json::to_writer_pretty(file, self)?;
        Ok(())
    }

    pub fn from_reader<R: Read>(reader: R) -> Result<Self> {
        Ok(serde_json::from_reader(reader)?)
    }
}
