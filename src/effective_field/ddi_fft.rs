// src/effective_field/ddi_fft.rs
//
// Dipole-dipole interaction via FFT-accelerated convolution over sublattices.
//
// For every target sublattice b1 we compute
//   F_b1(x) = sum_{b2, y} D_b1b2(x - y) mu_b2(y) s_b2(y)
// and the gradient contribution is -mu_i F(i).
//
// - zero-padding to 2N along every axis with more than one cell (linear convolution)
// - a second single-cell axis is padded to 2 so that at least two axes are transformed
// - periodic images are summed into the real-space tensor before the transform,
//   so the padded convolution reproduces the direct image sum exactly
// - the tensor is stored once per distinct sublattice pair; all diagonal pairs
//   (b, b) share the (0, 0) block because their offsets coincide
//
// Buffers are lattice-major: padded cell index (a fastest), then component,
// then sublattice block. The same layout is used for spins, tensor and field.

use std::fmt;
use std::sync::Arc;
use std::time::Instant;

use log::debug;
use rayon::prelude::*;
use rustfft::num_complex::Complex;
use rustfft::{Fft, FftPlanner};

use crate::effective_field::ddi::dipole_tensor;
use crate::error::{HamiltonianError, Result};
use crate::geometry::Geometry;
use crate::vector_field::VectorField;

fn ddi_timing_enabled() -> bool {
    std::env::var("HEISENBERG_DDI_TIMING").is_ok()
}

/// Padded lattice size used for the convolution.
pub fn padded_dims(n_cells: [usize; 3]) -> [usize; 3] {
    let mut padded = [1usize; 3];
    let mut n_degenerate = 0;
    for ax in 0..3 {
        if n_cells[ax] > 1 {
            padded[ax] = 2 * n_cells[ax];
        } else {
            n_degenerate += 1;
            if n_degenerate > 1 {
                padded[ax] = 2;
            }
        }
    }
    padded
}

/// Shape and strides of a batched padded buffer.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FftLayout {
    pub padded: [usize; 3],
    pub n_components: usize,
    pub n_blocks: usize,
    /// Strides of the padded cell axes.
    pub axis: [usize; 3],
    pub comp: usize,
    pub block: usize,
}

impl FftLayout {
    pub fn new(padded: [usize; 3], n_components: usize, n_blocks: usize) -> Self {
        let sublattice_size = padded[0] * padded[1] * padded[2];
        Self {
            padded,
            n_components,
            n_blocks,
            axis: [1, padded[0], padded[0] * padded[1]],
            comp: sublattice_size,
            block: n_components * sublattice_size,
        }
    }

    /// Number of padded cells, the length of one transform.
    #[inline]
    pub fn sublattice_size(&self) -> usize {
        self.comp
    }

    pub fn len(&self) -> usize {
        self.block * self.n_blocks
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    #[inline]
    pub fn cell_offset(&self, t: [usize; 3]) -> usize {
        t[0] * self.axis[0] + t[1] * self.axis[1] + t[2] * self.axis[2]
    }

    /// Padded cell of a flat offset within one sublattice.
    #[inline]
    pub fn cell_of(&self, offset: usize) -> [usize; 3] {
        let [pa, pb, _] = self.padded;
        [offset % pa, (offset / pa) % pb, offset / (pa * pb)]
    }

    #[inline]
    pub fn at(&self, block: usize, comp: usize, offset: usize) -> usize {
        block * self.block + comp * self.comp + offset
    }

    #[inline]
    pub fn index(&self, block: usize, comp: usize, t: [usize; 3]) -> usize {
        self.at(block, comp, self.cell_offset(t))
    }
}

/// Maps an ordered sublattice pair to its tensor block.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SublatticeLookup {
    n_cell_atoms: usize,
    index: Vec<usize>,
    blocks: Vec<(usize, usize)>,
}

impl SublatticeLookup {
    pub fn new(n_cell_atoms: usize) -> Self {
        let mut index = vec![0; n_cell_atoms * n_cell_atoms];
        let mut blocks = Vec::new();
        for b1 in 0..n_cell_atoms {
            for b2 in 0..n_cell_atoms {
                if b1 == b2 && b1 != 0 {
                    continue;
                }
                index[b1 + b2 * n_cell_atoms] = blocks.len();
                blocks.push((b1, b2));
            }
        }
        Self {
            n_cell_atoms,
            index,
            blocks,
        }
    }

    #[inline]
    pub fn get(&self, b1: usize, b2: usize) -> usize {
        self.index[b1 + b2 * self.n_cell_atoms]
    }

    /// Number of distinct tensor blocks.
    pub fn n_inter(&self) -> usize {
        self.blocks.len()
    }

    pub fn blocks(&self) -> &[(usize, usize)] {
        &self.blocks
    }
}

type AxisPlans = Vec<(usize, Arc<dyn Fft<f64>>)>;

/// Prepared transform state. Valid until the geometry or DDI parameters change.
pub struct DdiFft {
    n_cells: [usize; 3],
    images: [i32; 3],
    lookup: SublatticeLookup,
    spin_layout: FftLayout,
    dipole_layout: FftLayout,

    // Transformed tensor, 6 components per distinct sublattice pair
    dipole_k: Vec<Complex<f64>>,

    forward: AxisPlans,
    inverse: AxisPlans,
    max_len: usize,
}

impl fmt::Debug for DdiFft {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("DdiFft")
            .field("n_cells", &self.n_cells)
            .field("padded", &self.spin_layout.padded)
            .field("images", &self.images)
            .field("n_inter", &self.lookup.n_inter())
            .finish()
    }
}

impl DdiFft {
    pub fn new(geometry: &Geometry, images: [i32; 3]) -> Result<Self> {
        if geometry.nos == 0 || geometry.n_cell_atoms == 0 {
            return Err(HamiltonianError::FftSetup(
                "lattice has no sites to transform".to_string(),
            ));
        }

        let do_timing = ddi_timing_enabled();
        let t_total = Instant::now();

        let padded = padded_dims(geometry.n_cells);
        let lookup = SublatticeLookup::new(geometry.n_cell_atoms);
        let spin_layout = FftLayout::new(padded, 3, geometry.n_cell_atoms);
        let dipole_layout = FftLayout::new(padded, 6, lookup.n_inter());

        let mut planner = FftPlanner::<f64>::new();
        let mut forward: AxisPlans = Vec::new();
        let mut inverse: AxisPlans = Vec::new();
        for (ax, &len) in padded.iter().enumerate() {
            if len > 1 {
                forward.push((ax, planner.plan_fft_forward(len)));
                inverse.push((ax, planner.plan_fft_inverse(len)));
            }
        }
        if forward.is_empty() {
            return Err(HamiltonianError::FftSetup(format!(
                "no axis to transform for padded lattice {padded:?}"
            )));
        }
        let max_len = padded.iter().copied().max().unwrap_or(1);

        debug!(
            "DDI-FFT: n_cells={:?} padded={:?} n_inter={} images={:?}",
            geometry.n_cells,
            padded,
            lookup.n_inter(),
            images
        );

        let t_build = Instant::now();
        let mut dipole_k = build_dipole_tensor(geometry, images, &lookup, &dipole_layout);
        if do_timing {
            debug!(
                "[ddi timing] real-space tensor took {:.3}s",
                t_build.elapsed().as_secs_f64()
            );
        }

        let t_fft = Instant::now();
        transform_blocks(&mut dipole_k, &dipole_layout, &forward, max_len);
        if do_timing {
            debug!(
                "[ddi timing] tensor -> k-space took {:.3}s, prepare total {:.3}s",
                t_fft.elapsed().as_secs_f64(),
                t_total.elapsed().as_secs_f64()
            );
        }

        Ok(Self {
            n_cells: geometry.n_cells,
            images,
            lookup,
            spin_layout,
            dipole_layout,
            dipole_k,
            forward,
            inverse,
            max_len,
        })
    }

    pub fn padded(&self) -> [usize; 3] {
        self.spin_layout.padded
    }

    pub fn images(&self) -> [i32; 3] {
        self.images
    }

    pub fn lookup(&self) -> &SublatticeLookup {
        &self.lookup
    }

    /// Add the dipolar gradient -mu_i F_i to `gradient`.
    ///
    /// Transform buffers are per call; the prepared plan is only read.
    pub fn add_gradient(&self, geometry: &Geometry, spins: &VectorField, gradient: &mut VectorField) {
        debug_assert_eq!(geometry.n_cells, self.n_cells);

        let do_timing = ddi_timing_enabled();
        let t_total = Instant::now();

        let layout = &self.spin_layout;
        let size = layout.sublattice_size();
        let n = geometry.n_cell_atoms;
        let nc = self.n_cells;
        let zero = Complex::new(0.0, 0.0);

        let mut spins_k = vec![zero; layout.len()];
        let mut field_k = vec![zero; layout.len()];

        // Pack mu * s into the physical region of each (basis, component) block
        spins_k
            .par_chunks_mut(size)
            .enumerate()
            .for_each(|(iblock, block)| {
                let (basis, comp) = (iblock / 3, iblock % 3);
                for c in 0..nc[2] {
                    for b in 0..nc[1] {
                        for a in 0..nc[0] {
                            let ispin = geometry.idx(basis, [a, b, c]);
                            if !geometry.is_vacancy(ispin) {
                                block[layout.cell_offset([a, b, c])].re =
                                    geometry.mu_s[ispin] * spins.data[ispin][comp];
                            }
                        }
                    }
                }
            });

        transform_blocks(&mut spins_k, layout, &self.forward, self.max_len);

        // k-space contraction, one target sublattice per task; each bin sums over b2 serially
        let dipole = &self.dipole_k;
        let dl = &self.dipole_layout;
        let lookup = &self.lookup;
        let spins_ro: &[Complex<f64>] = &spins_k;

        field_k
            .par_chunks_mut(layout.block)
            .enumerate()
            .for_each(|(b1, out)| {
                let (fx, rest) = out.split_at_mut(size);
                let (fy, fz) = rest.split_at_mut(size);
                fx.par_iter_mut()
                    .zip_eq(fy.par_iter_mut())
                    .zip_eq(fz.par_iter_mut())
                    .enumerate()
                    .for_each(|(bin, ((x, y), z))| {
                        let mut acc = [zero; 3];
                        for b2 in 0..n {
                            let d = lookup.get(b1, b2);
                            let dxx = dipole[dl.at(d, 0, bin)];
                            let dxy = dipole[dl.at(d, 1, bin)];
                            let dxz = dipole[dl.at(d, 2, bin)];
                            let dyy = dipole[dl.at(d, 3, bin)];
                            let dyz = dipole[dl.at(d, 4, bin)];
                            let dzz = dipole[dl.at(d, 5, bin)];

                            let sx = spins_ro[layout.at(b2, 0, bin)];
                            let sy = spins_ro[layout.at(b2, 1, bin)];
                            let sz = spins_ro[layout.at(b2, 2, bin)];

                            acc[0] += dxx * sx + dxy * sy + dxz * sz;
                            acc[1] += dxy * sx + dyy * sy + dyz * sz;
                            acc[2] += dxz * sx + dyz * sy + dzz * sz;
                        }
                        *x = acc[0];
                        *y = acc[1];
                        *z = acc[2];
                    });
            });

        transform_blocks(&mut field_k, layout, &self.inverse, self.max_len);

        // rustfft is unnormalised: divide by the padded volume on write-back
        let scale = 1.0 / size as f64;
        let field: &[Complex<f64>] = &field_k;
        gradient
            .data
            .par_iter_mut()
            .enumerate()
            .for_each(|(ispin, g)| {
                if geometry.is_vacancy(ispin) {
                    return;
                }
                let basis = ispin % n;
                let t = geometry.cell_translations(ispin / n);
                let mu = geometry.mu_s[ispin] * scale;
                for (comp, gc) in g.iter_mut().enumerate() {
                    *gc -= mu * field[layout.index(basis, comp, t)].re;
                }
            });

        if do_timing {
            debug!(
                "[ddi timing] convolution took {:.3}s",
                t_total.elapsed().as_secs_f64()
            );
        }
    }
}

/// Real-space tensor blocks with periodic images folded in.
fn build_dipole_tensor(
    geometry: &Geometry,
    images: [i32; 3],
    lookup: &SublatticeLookup,
    layout: &FftLayout,
) -> Vec<Complex<f64>> {
    let size = layout.sublattice_size();
    let n = geometry.n_cells;
    let padded = layout.padded;
    let mut out = vec![Complex::new(0.0, 0.0); layout.len()];

    // a < N is a forward offset, the upper half of the padded axis holds negative ones
    let signed = |t: [usize; 3]| -> [i64; 3] {
        std::array::from_fn(|ax| {
            if t[ax] < n[ax] {
                t[ax] as i64
            } else {
                t[ax] as i64 - padded[ax] as i64
            }
        })
    };

    for (iblock, &(b1, b2)) in lookup.blocks().iter().enumerate() {
        let ca1 = geometry.cell_atoms[b1];
        let ca2 = geometry.cell_atoms[b2];

        let tensors: Vec<[f64; 6]> = (0..size)
            .into_par_iter()
            .map(|offset| {
                let off = signed(layout.cell_of(offset));
                let mut d = [0.0; 6];
                for ia in -images[0]..=images[0] {
                    for ib in -images[1]..=images[1] {
                        for ic in -images[2]..=images[2] {
                            let r = geometry.lattice_vector([
                                (off[0] + ia as i64 * n[0] as i64) as f64 + ca1[0] - ca2[0],
                                (off[1] + ib as i64 * n[1] as i64) as f64 + ca1[1] - ca2[1],
                                (off[2] + ic as i64 * n[2] as i64) as f64 + ca1[2] - ca2[2],
                            ]);
                            let t = dipole_tensor(r);
                            for (acc, v) in d.iter_mut().zip(t) {
                                *acc += v;
                            }
                        }
                    }
                }
                d
            })
            .collect();

        for (offset, d) in tensors.iter().enumerate() {
            for (comp, &v) in d.iter().enumerate() {
                out[layout.at(iblock, comp, offset)] = Complex::new(v, 0.0);
            }
        }
    }
    out
}

/// In-place 3D transform of every sublattice-sized block of `data`.
fn transform_blocks(
    data: &mut [Complex<f64>],
    layout: &FftLayout,
    plans: &AxisPlans,
    max_len: usize,
) {
    let size = layout.sublattice_size();
    data.par_chunks_mut(size).for_each_init(
        || vec![Complex::new(0.0, 0.0); max_len],
        |buf, block| transform_block(block, layout, plans, buf),
    );
}

/// Rows along `a` are contiguous and transformed in place; `b` and `c` are gathered.
fn transform_block(
    block: &mut [Complex<f64>],
    layout: &FftLayout,
    plans: &AxisPlans,
    buf: &mut [Complex<f64>],
) {
    for (ax, plan) in plans {
        let len = layout.padded[*ax];
        let stride = layout.axis[*ax];
        if stride == 1 {
            block.chunks_exact_mut(len).for_each(|row| plan.process(row));
            continue;
        }
        let col = &mut buf[..len];
        let span = stride * len;
        for outer in 0..block.len() / span {
            for inner in 0..stride {
                let base = outer * span + inner;
                for (k, v) in col.iter_mut().enumerate() {
                    *v = block[base + k * stride];
                }
                plan.process(col);
                for (k, v) in col.iter().enumerate() {
                    block[base + k * stride] = *v;
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn padding_doubles_extended_axes_and_keeps_two_transform_axes() {
        assert_eq!(padded_dims([4, 4, 4]), [8, 8, 8]);
        assert_eq!(padded_dims([5, 3, 1]), [10, 6, 1]);
        assert_eq!(padded_dims([6, 1, 1]), [12, 1, 2]);
        assert_eq!(padded_dims([1, 1, 1]), [1, 2, 2]);
    }

    #[test]
    fn layout_strides_are_lattice_major() {
        let layout = FftLayout::new([4, 2, 2], 3, 2);
        assert_eq!(layout.sublattice_size(), 16);
        assert_eq!(layout.axis, [1, 4, 8]);
        assert_eq!(layout.comp, 16);
        assert_eq!(layout.block, 48);
        assert_eq!(layout.len(), 96);
        assert_eq!(layout.index(1, 2, [3, 1, 1]), 48 + 32 + 3 + 4 + 8);

        for offset in 0..layout.sublattice_size() {
            assert_eq!(layout.cell_offset(layout.cell_of(offset)), offset);
        }
    }

    #[test]
    fn lookup_shares_diagonal_blocks() {
        let lookup = SublatticeLookup::new(3);
        assert_eq!(lookup.n_inter(), 7);
        assert_eq!(lookup.get(0, 0), 0);
        assert_eq!(lookup.get(1, 1), 0);
        assert_eq!(lookup.get(2, 2), 0);

        let mut off_diagonal: Vec<usize> = (0..3)
            .flat_map(|b1| (0..3).map(move |b2| (b1, b2)))
            .filter(|(b1, b2)| b1 != b2)
            .map(|(b1, b2)| lookup.get(b1, b2))
            .collect();
        off_diagonal.sort_unstable();
        assert_eq!(off_diagonal, vec![1, 2, 3, 4, 5, 6]);

        for (i, &(b1, b2)) in lookup.blocks().iter().enumerate() {
            assert_eq!(lookup.get(b1, b2), i);
        }
        assert_eq!(SublatticeLookup::new(1).n_inter(), 1);
    }

    #[test]
    fn transform_round_trip_recovers_input() {
        let layout = FftLayout::new([4, 2, 2], 1, 1);
        let mut planner = FftPlanner::<f64>::new();
        let forward: AxisPlans = (0..3)
            .map(|ax| (ax, planner.plan_fft_forward(layout.padded[ax])))
            .collect();
        let inverse: AxisPlans = (0..3)
            .map(|ax| (ax, planner.plan_fft_inverse(layout.padded[ax])))
            .collect();

        let input: Vec<Complex<f64>> = (0..layout.len())
            .map(|i| Complex::new((i as f64 * 0.7).sin(), 0.0))
            .collect();
        let mut data = input.clone();
        transform_blocks(&mut data, &layout, &forward, 4);
        transform_blocks(&mut data, &layout, &inverse, 4);

        let scale = 1.0 / layout.sublattice_size() as f64;
        for (a, b) in data.iter().zip(&input) {
            assert!((a.re * scale - b.re).abs() < 1e-12);
            assert!((a.im * scale).abs() < 1e-12);
        }
    }
}
