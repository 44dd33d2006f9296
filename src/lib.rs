// src/lib.rs

pub mod config;
pub mod effective_field;
pub mod energy;
pub mod error;
pub mod geometry;
pub mod hamiltonian;
pub mod hessian;
pub mod neighbours;
pub mod params;
pub mod tables;
pub mod vec3;
pub mod vector_field;

pub use error::{HamiltonianError, Result};
pub use geometry::Geometry;
pub use hamiltonian::Hamiltonian;
pub use params::HamiltonianParams;
pub use vector_field::VectorField;
