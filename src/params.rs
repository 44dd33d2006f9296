// src/params.rs

use serde::{Deserialize, Serialize};

use crate::geometry::BoundaryConditions;
use crate::neighbours::{Pair, Quadruplet, Triplet};

/// Bohr magneton in meV / T.
pub const MU_B: f64 = 0.057_883_817_555;

/// Vacuum permeability in T^2 m^3 / meV.
pub const MU_0: f64 = 2.013_354_5e-28;

/// Dipolar prefactor for moments in Bohr magnetons and distances in Angstrom (meV A^3).
pub const DDI_PREFACTOR: f64 = MU_0 * MU_B * MU_B / (4.0 * std::f64::consts::PI * 1e-30);

/// Sense and type of the DMI vector generated from a bond direction.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum DmiChirality {
    /// D parallel to the bond.
    #[default]
    Bloch,
    BlochInverted,
    /// D perpendicular to the bond, in-plane (z × r).
    Neel,
    NeelInverted,
}

impl DmiChirality {
    pub fn sign(self) -> f64 {
        match self {
            DmiChirality::Bloch | DmiChirality::Neel => 1.0,
            DmiChirality::BlochInverted | DmiChirality::NeelInverted => -1.0,
        }
    }
}

/// Algorithm used for the dipole-dipole interaction.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub enum DdiMethod {
    #[default]
    None,
    /// Real-space sum restricted to pairs within `radius` (Angstrom).
    Cutoff { radius: f64 },
    /// Zero-padded convolution, summing `n_periodic_images` replicas along periodic axes.
    Fft { n_periodic_images: [usize; 3] },
    /// O(N^2) real-space sum over all site pairs and periodic images.
    Direct { n_periodic_images: [usize; 3] },
}

impl DdiMethod {
    pub fn is_active(&self) -> bool {
        !matches!(self, DdiMethod::None)
    }

    /// Periodic images actually summed for the given boundary conditions.
    pub fn images(&self, bc: &BoundaryConditions) -> [i32; 3] {
        let n = match self {
            DdiMethod::Fft { n_periodic_images } | DdiMethod::Direct { n_periodic_images } => {
                *n_periodic_images
            }
            _ => [0; 3],
        };
        std::array::from_fn(|ax| if bc[ax] { n[ax] as i32 } else { 0 })
    }
}

/// A pairwise interaction given either per neighbour shell or as an explicit list.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum PairInteraction {
    /// One magnitude per neighbour shell (meV).
    Shells(Vec<f64>),
    /// Explicit templates with per-pair magnitudes (and, for DMI, normals).
    Pairs {
        pairs: Vec<Pair>,
        magnitudes: Vec<f64>,
        #[serde(default)]
        normals: Vec<[f64; 3]>,
    },
}

impl Default for PairInteraction {
    fn default() -> Self {
        PairInteraction::Shells(Vec::new())
    }
}

/// On-site uniaxial anisotropy per basis atom.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Anisotropy {
    pub indices: Vec<usize>,
    /// meV
    pub magnitudes: Vec<f64>,
    pub normals: Vec<[f64; 3]>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct TripletInteraction {
    pub triplets: Vec<Triplet>,
    /// Coupling of (s_i . (s_j x s_k))^2 (meV).
    pub magnitudes1: Vec<f64>,
    /// Coupling of (s_i . (s_j x s_k)) (n . (s_i + s_j + s_k)) (meV).
    pub magnitudes2: Vec<f64>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct QuadrupletInteraction {
    pub quadruplets: Vec<Quadruplet>,
    /// meV
    pub magnitudes: Vec<f64>,
}

/// Raw interaction inputs. Any change requires a rebuild of the interaction tables.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HamiltonianParams {
    pub boundary_conditions: BoundaryConditions,
    /// External field magnitude (T).
    pub external_field_magnitude: f64,
    pub external_field_normal: [f64; 3],
    pub anisotropy: Anisotropy,
    pub exchange: PairInteraction,
    pub dmi: PairInteraction,
    pub dmi_chirality: DmiChirality,
    pub ddi: DdiMethod,
    pub triplets: TripletInteraction,
    pub quadruplets: QuadrupletInteraction,
    /// Store every bond in both directions so kernels can run in parallel with
    /// each iteration writing only the sites it owns.
    pub redundant_neighbours: bool,
}

impl Default for HamiltonianParams {
    fn default() -> Self {
        Self {
            boundary_conditions: [false; 3],
            external_field_magnitude: 0.0,
            external_field_normal: [0.0, 0.0, 1.0],
            anisotropy: Anisotropy::default(),
            exchange: PairInteraction::default(),
            dmi: PairInteraction::default(),
            dmi_chirality: DmiChirality::default(),
            ddi: DdiMethod::None,
            triplets: TripletInteraction::default(),
            quadruplets: QuadrupletInteraction::default(),
            redundant_neighbours: true,
        }
    }
}
