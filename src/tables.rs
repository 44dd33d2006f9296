// src/tables.rs
//
// Resolved interaction tables built from raw parameters and the lattice.
//
// Every table stores parallel arrays indexed in lockstep. Entries with zero
// magnitude are dropped while building, so an empty table means the category
// is inactive.

use log::{debug, info, warn};

use crate::error::{HamiltonianError, Result};
use crate::geometry::Geometry;
use crate::neighbours::{self, Pair, Quadruplet, Triplet};
use crate::params::{
    Anisotropy, DdiMethod, DmiChirality, HamiltonianParams, PairInteraction,
    QuadrupletInteraction, TripletInteraction,
};

/// Pair templates with per-pair magnitude and (for DMI/DDI) normal.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct PairTable {
    pub pairs: Vec<Pair>,
    pub magnitudes: Vec<f64>,
    pub normals: Vec<[f64; 3]>,
}

impl PairTable {
    pub fn len(&self) -> usize {
        self.pairs.len()
    }

    pub fn is_empty(&self) -> bool {
        self.pairs.is_empty()
    }

    fn push(&mut self, pair: Pair, magnitude: f64, normal: Option<[f64; 3]>) {
        self.pairs.push(pair);
        self.magnitudes.push(magnitude);
        if let Some(n) = normal {
            self.normals.push(n);
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct AnisotropyTable {
    pub indices: Vec<usize>,
    pub magnitudes: Vec<f64>,
    pub normals: Vec<[f64; 3]>,
}

impl AnisotropyTable {
    pub fn is_empty(&self) -> bool {
        self.indices.is_empty()
    }
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct TripletTable {
    pub triplets: Vec<Triplet>,
    pub magnitudes1: Vec<f64>,
    pub magnitudes2: Vec<f64>,
}

impl TripletTable {
    pub fn is_empty(&self) -> bool {
        self.triplets.is_empty()
    }
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct QuadrupletTable {
    pub quadruplets: Vec<Quadruplet>,
    pub magnitudes: Vec<f64>,
}

impl QuadrupletTable {
    pub fn is_empty(&self) -> bool {
        self.quadruplets.is_empty()
    }
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct InteractionTables {
    pub anisotropy: AnisotropyTable,
    pub exchange: PairTable,
    pub dmi: PairTable,
    /// Cutoff DDI pairs: magnitude is the distance, normal the unit separation.
    pub ddi: PairTable,
    pub triplets: TripletTable,
    pub quadruplets: QuadrupletTable,
}

fn check_len(what: &'static str, expected: usize, got: usize) -> Result<()> {
    if expected != got {
        return Err(HamiltonianError::ParameterMismatch {
            what,
            expected,
            got,
        });
    }
    Ok(())
}

fn check_basis(index: usize, geometry: &Geometry) -> Result<()> {
    if index >= geometry.n_cell_atoms {
        return Err(HamiltonianError::InvalidBasisIndex {
            index,
            n_cell_atoms: geometry.n_cell_atoms,
        });
    }
    Ok(())
}

impl InteractionTables {
    /// Resolve all raw interaction parameters against the lattice.
    pub fn build(geometry: &Geometry, params: &HamiltonianParams) -> Result<Self> {
        let redundant = params.redundant_neighbours;

        let tables = Self {
            anisotropy: build_anisotropy(geometry, &params.anisotropy)?,
            exchange: build_pair_table("exchange", geometry, &params.exchange, None, redundant)?,
            dmi: build_pair_table(
                "DMI",
                geometry,
                &params.dmi,
                Some(params.dmi_chirality),
                redundant,
            )?,
            ddi: build_ddi(geometry, &params.ddi, redundant),
            triplets: build_triplets(geometry, &params.triplets)?,
            quadruplets: build_quadruplets(geometry, &params.quadruplets)?,
        };

        info!(
            "interaction tables: anisotropy={} exchange={} dmi={} ddi={} triplets={} quadruplets={} (redundant={})",
            tables.anisotropy.indices.len(),
            tables.exchange.len(),
            tables.dmi.len(),
            tables.ddi.len(),
            tables.triplets.triplets.len(),
            tables.quadruplets.quadruplets.len(),
            redundant
        );
        Ok(tables)
    }
}

fn build_anisotropy(geometry: &Geometry, ani: &Anisotropy) -> Result<AnisotropyTable> {
    check_len("anisotropy magnitudes", ani.indices.len(), ani.magnitudes.len())?;
    check_len("anisotropy normals", ani.indices.len(), ani.normals.len())?;

    let mut table = AnisotropyTable::default();
    for ((&idx, &k), &n) in ani
        .indices
        .iter()
        .zip(ani.magnitudes.iter())
        .zip(ani.normals.iter())
    {
        check_basis(idx, geometry)?;
        if k == 0.0 {
            continue;
        }
        table.indices.push(idx);
        table.magnitudes.push(k);
        table.normals.push(crate::vec3::normalize(n));
    }
    Ok(table)
}

/// Exchange (`chirality == None`) or DMI table from shells or explicit pairs.
fn build_pair_table(
    what: &'static str,
    geometry: &Geometry,
    interaction: &PairInteraction,
    chirality: Option<DmiChirality>,
    redundant: bool,
) -> Result<PairTable> {
    let mut table = PairTable::default();

    match interaction {
        PairInteraction::Shells(shell_magnitudes) => {
            if shell_magnitudes.iter().all(|&m| m == 0.0) {
                return Ok(table);
            }
            let (pairs, shells) =
                neighbours::neighbours_in_shells(geometry, shell_magnitudes.len(), redundant);
            for (pair, shell) in pairs.into_iter().zip(shells) {
                let magnitude = shell_magnitudes[shell];
                if magnitude == 0.0 {
                    continue;
                }
                let normal =
                    chirality.map(|c| neighbours::dmi_normal_from_pair(geometry, &pair, c));
                table.push(pair, magnitude, normal);
            }
        }
        PairInteraction::Pairs {
            pairs,
            magnitudes,
            normals,
        } => {
            check_len(what, pairs.len(), magnitudes.len())?;
            let derive_normals = chirality.is_some() && normals.is_empty() && !pairs.is_empty();
            if chirality.is_some() && !derive_normals {
                check_len("DMI normals", pairs.len(), normals.len())?;
            }
            if derive_normals {
                warn!(
                    "{} pairs given without normals, deriving them from the bond geometry",
                    what
                );
            }

            for (ipair, (pair, &magnitude)) in pairs.iter().zip(magnitudes.iter()).enumerate() {
                check_basis(pair.i, geometry)?;
                check_basis(pair.j, geometry)?;
                if magnitude == 0.0 {
                    continue;
                }
                let normal = chirality.map(|c| {
                    if derive_normals {
                        neighbours::dmi_normal_from_pair(geometry, pair, c)
                    } else {
                        normals[ipair]
                    }
                });
                table.push(*pair, magnitude, normal);
            }

            if redundant {
                for ipair in 0..table.len() {
                    let reversed = table.pairs[ipair].reversed();
                    let magnitude = table.magnitudes[ipair];
                    let normal = chirality.map(|_| {
                        let n = table.normals[ipair];
                        [-n[0], -n[1], -n[2]]
                    });
                    table.push(reversed, magnitude, normal);
                }
            }
        }
    }

    Ok(table)
}

/// DDI pairs are regenerated from scratch; only the cutoff method searches a non-zero radius.
fn build_ddi(geometry: &Geometry, method: &DdiMethod, redundant: bool) -> PairTable {
    let radius = match method {
        DdiMethod::Cutoff { radius } => {
            if *radius <= 0.0 {
                warn!("DDI cutoff radius {} is not positive, no pairs generated", radius);
            }
            *radius
        }
        _ => 0.0,
    };

    let mut table = PairTable::default();
    for pair in neighbours::pairs_in_radius(geometry, radius, redundant) {
        let (distance, normal) = neighbours::ddi_from_pair(geometry, &pair);
        table.push(pair, distance, Some(normal));
    }
    debug!("DDI cutoff radius {} -> {} pairs", radius, table.len());
    table
}

fn build_triplets(geometry: &Geometry, interaction: &TripletInteraction) -> Result<TripletTable> {
    check_len("triplet magnitudes1", interaction.triplets.len(), interaction.magnitudes1.len())?;
    check_len("triplet magnitudes2", interaction.triplets.len(), interaction.magnitudes2.len())?;

    let mut table = TripletTable::default();
    for ((t, &c1), &c2) in interaction
        .triplets
        .iter()
        .zip(interaction.magnitudes1.iter())
        .zip(interaction.magnitudes2.iter())
    {
        for b in [t.i, t.j, t.k] {
            check_basis(b, geometry)?;
        }
        if c1 == 0.0 && c2 == 0.0 {
            continue;
        }
        table.triplets.push(*t);
        table.magnitudes1.push(c1);
        table.magnitudes2.push(c2);
    }
    Ok(table)
}

fn build_quadruplets(
    geometry: &Geometry,
    interaction: &QuadrupletInteraction,
) -> Result<QuadrupletTable> {
    check_len("quadruplet magnitudes", interaction.quadruplets.len(), interaction.magnitudes.len())?;

    let mut table = QuadrupletTable::default();
    for (q, &k) in interaction.quadruplets.iter().zip(interaction.magnitudes.iter()) {
        for b in [q.i, q.j, q.k, q.l] {
            check_basis(b, geometry)?;
        }
        if k == 0.0 {
            continue;
        }
        table.quadruplets.push(*q);
        table.magnitudes.push(k);
    }
    Ok(table)
}
