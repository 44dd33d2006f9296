// src/error.rs

use thiserror::Error;

#[derive(Debug, Error)]
pub enum HamiltonianError {
    /// Per-site geometry arrays disagree with the lattice size.
    #[error("geometry mismatch for {what}: expected {expected} entries, got {got}")]
    GeometryMismatch {
        what: &'static str,
        expected: usize,
        got: usize,
    },

    /// Parallel parameter lists (indices / magnitudes / normals) of different length.
    #[error("parameter mismatch for {what}: expected {expected} entries, got {got}")]
    ParameterMismatch {
        what: &'static str,
        expected: usize,
        got: usize,
    },

    #[error("basis index {index} out of range (lattice has {n_cell_atoms} basis atoms)")]
    InvalidBasisIndex { index: usize, n_cell_atoms: usize },

    /// The transform backend could not be prepared. Fatal for DDI-FFT evaluation.
    #[error("DDI-FFT setup failed: {0}")]
    FftSetup(String),

    #[error("failed to (de)serialise configuration: {0}")]
    Config(#[from] serde_json::Error),

    #[error(transparent)]
    Io(#[from] std::io::Error),
}

pub type Result<T> = std::result::Result<T, HamiltonianError>;
