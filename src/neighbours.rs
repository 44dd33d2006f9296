// src/neighbours.rs
//
// Interaction templates (pairs, triplets, quadruplets) and the neighbour
// searches that generate them from the lattice geometry.
//
// A template is defined relative to one unit cell and applied at every cell
// via periodic translation (see `Geometry::idx_from_pair`).

use std::collections::HashSet;

use log::warn;
use serde::{Deserialize, Serialize};

use crate::geometry::Geometry;
use crate::params::DmiChirality;
use crate::vec3;

/// Absolute tolerance (Angstrom) for two neighbour distances to belong to the same shell.
const SHELL_TOLERANCE: f64 = 1e-5;

/// Bond template: basis atom `i` in cell `t0` to basis atom `j` in cell `t0 + translations`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Pair {
    pub i: usize,
    pub j: usize,
    pub translations: [i32; 3],
}

impl Pair {
    pub fn new(i: usize, j: usize, translations: [i32; 3]) -> Self {
        Self { i, j, translations }
    }

    /// The same bond seen from the other end.
    pub fn reversed(&self) -> Self {
        let t = self.translations;
        Self {
            i: self.j,
            j: self.i,
            translations: [-t[0], -t[1], -t[2]],
        }
    }
}

/// Three-site template with partner offsets for `j` and `k` and a normal `n`.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Triplet {
    pub i: usize,
    pub j: usize,
    pub k: usize,
    pub d_j: [i32; 3],
    pub d_k: [i32; 3],
    pub n: [f64; 3],
}

/// Four-site template with partner offsets for `j`, `k` and `l`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Quadruplet {
    pub i: usize,
    pub j: usize,
    pub k: usize,
    pub l: usize,
    pub d_j: [i32; 3],
    pub d_k: [i32; 3],
    pub d_l: [i32; 3],
}

/// Distance between lattice planes along each axis (Angstrom).
fn plane_spacings(geometry: &Geometry) -> [f64; 3] {
    let [ta, tb, tc] = geometry.bravais_vectors;
    let volume = vec3::dot(ta, vec3::cross(tb, tc)).abs();
    let faces = [vec3::cross(tb, tc), vec3::cross(tc, ta), vec3::cross(ta, tb)];
    let mut out = [0.0; 3];
    for ax in 0..3 {
        let area = vec3::norm(faces[ax]);
        out[ax] = if area > 0.0 {
            geometry.lattice_constant * volume / area
        } else {
            0.0
        };
    }
    out
}

/// Enumerate candidate pairs starting at basis atom `i` within `range` cells per axis.
fn candidates(geometry: &Geometry, i: usize, range: [i32; 3]) -> Vec<(f64, Pair)> {
    let mut out = Vec::new();
    for dc in -range[2]..=range[2] {
        for db in -range[1]..=range[1] {
            for da in -range[0]..=range[0] {
                for j in 0..geometry.n_cell_atoms {
                    if i == j && da == 0 && db == 0 && dc == 0 {
                        continue;
                    }
                    let pair = Pair::new(i, j, [da, db, dc]);
                    let d = vec3::norm(geometry.pair_vector(&pair));
                    out.push((d, pair));
                }
            }
        }
    }
    out
}

/// Keep a pair unless its reverse has already been kept.
fn push_unique(
    pair: Pair,
    redundant: bool,
    seen: &mut HashSet<Pair>,
    out: &mut Vec<Pair>,
) -> bool {
    if !redundant && seen.contains(&pair.reversed()) {
        return false;
    }
    seen.insert(pair);
    out.push(pair);
    true
}

/// Generate neighbour pairs in the first `n_shells` shells of every basis atom.
///
/// Shells are the distinct neighbour distances counted separately for each basis atom.
/// Axes with a single cell are not searched (thin films stay two-dimensional).
/// Returns the pairs and, in lockstep, the shell index of each pair.
pub fn neighbours_in_shells(
    geometry: &Geometry,
    n_shells: usize,
    redundant: bool,
) -> (Vec<Pair>, Vec<usize>) {
    let mut pairs = Vec::new();
    let mut shells = Vec::new();
    if n_shells == 0 || geometry.n_cell_atoms == 0 {
        return (pairs, shells);
    }

    let spacing = plane_spacings(geometry);
    let active: [bool; 3] = std::array::from_fn(|ax| geometry.n_cells[ax] > 1);
    let min_spacing = (0..3)
        .filter(|&ax| active[ax])
        .map(|ax| spacing[ax])
        .fold(f64::INFINITY, f64::min);

    let mut seen = HashSet::new();

    for i in 0..geometry.n_cell_atoms {
        let search = shell_radii(geometry, i, n_shells, active, min_spacing, n_shells as i32 + 8);
        if !search.complete {
            warn!(
                "shell search for basis atom {} stopped at range {}: found {} of {} shells, outer shells may be incomplete",
                i,
                search.range,
                search.radii.len(),
                n_shells
            );
        }
        let ShellSearch { cands, radii, .. } = search;

        for (ishell, &radius) in radii.iter().enumerate() {
            for (d, pair) in &cands {
                if (d - radius).abs() <= SHELL_TOLERANCE
                    && push_unique(*pair, redundant, &mut seen, &mut pairs)
                {
                    shells.push(ishell);
                }
            }
        }
    }

    (pairs, shells)
}

struct ShellSearch {
    cands: Vec<(f64, Pair)>,
    radii: Vec<f64>,
    range: i32,
    complete: bool,
}

/// Grow the translation box around basis atom `i` until the first `n_shells`
/// distinct distances all lie inside the fully covered sphere, or until
/// `max_range` is passed.
fn shell_radii(
    geometry: &Geometry,
    i: usize,
    n_shells: usize,
    active: [bool; 3],
    min_spacing: f64,
    max_range: i32,
) -> ShellSearch {
    let mut range = (n_shells as i32).min(max_range).max(1);
    loop {
        let r: [i32; 3] = std::array::from_fn(|ax| if active[ax] { range } else { 0 });
        let cands = candidates(geometry, i, r);

        let mut dists: Vec<f64> = cands.iter().map(|(d, _)| *d).collect();
        dists.sort_by(|a, b| a.total_cmp(b));
        let mut radii: Vec<f64> = Vec::with_capacity(n_shells);
        for d in dists {
            if radii.len() == n_shells {
                break;
            }
            if radii.last().map_or(true, |&last| d - last > SHELL_TOLERANCE) {
                radii.push(d);
            }
        }

        // Shells beyond (range - 1) plane spacings may be incomplete inside the search box.
        let covered = (range as f64 - 1.0) * min_spacing;
        // With no searchable axis the box cannot grow: what was found is all there is.
        let complete = !active.contains(&true)
            || (radii.len() == n_shells
                && radii.last().map_or(true, |&r| r <= covered + SHELL_TOLERANCE));
        if complete || range >= max_range {
            return ShellSearch {
                cands,
                radii,
                range,
                complete,
            };
        }
        range += 1;
    }
}

/// All pairs with `0 < |r_ij| <= radius`. A non-positive radius yields no pairs.
pub fn pairs_in_radius(geometry: &Geometry, radius: f64, redundant: bool) -> Vec<Pair> {
    let mut pairs = Vec::new();
    if radius <= 0.0 || geometry.n_cell_atoms == 0 {
        return pairs;
    }

    let spacing = plane_spacings(geometry);
    let range: [i32; 3] = std::array::from_fn(|ax| {
        if spacing[ax] > 0.0 {
            (radius / spacing[ax]).ceil() as i32 + 1
        } else {
            0
        }
    });

    let mut seen = HashSet::new();
    for i in 0..geometry.n_cell_atoms {
        for (d, pair) in candidates(geometry, i, range) {
            if d > 0.0 && d <= radius {
                push_unique(pair, redundant, &mut seen, &mut pairs);
            }
        }
    }
    pairs
}

/// DMI vector direction for a pair under the given chirality convention.
pub fn dmi_normal_from_pair(geometry: &Geometry, pair: &Pair, chirality: DmiChirality) -> [f64; 3] {
    let r = geometry.pair_vector(pair);
    let d = vec3::norm(r);
    if d == 0.0 {
        return [0.0; 3];
    }
    let r_hat = vec3::scale(r, 1.0 / d);
    let n = match chirality {
        DmiChirality::Bloch | DmiChirality::BlochInverted => r_hat,
        DmiChirality::Neel | DmiChirality::NeelInverted => {
            let c = vec3::cross([0.0, 0.0, 1.0], r_hat);
            let cn = vec3::norm(c);
            if cn < 1e-12 {
                return [0.0; 3];
            }
            vec3::scale(c, 1.0 / cn)
        }
    };
    vec3::scale(n, chirality.sign())
}

/// Distance (Angstrom) and unit separation vector of a pair.
pub fn ddi_from_pair(geometry: &Geometry, pair: &Pair) -> (f64, [f64; 3]) {
    let r = geometry.pair_vector(pair);
    let d = vec3::norm(r);
    if d == 0.0 {
        (0.0, [0.0; 3])
    } else {
        (d, vec3::scale(r, 1.0 / d))
    }
}
