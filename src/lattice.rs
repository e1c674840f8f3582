// SPDX-License-Identifier: AGPL-3.0-only

//! Two-dimensional periodic lattice: indexing, checkerboard partition,
//! and frozen-parity stencils.
//!
//! Fields live on an L × T lattice with periodic boundaries in both
//! directions. Site layout: `idx = x * T + t` with x ∈ [0, L) spatial and
//! t ∈ [0, T) temporal, so a flattened configuration reads as L rows of T
//! time slices.
//!
//! The checkerboard partition splits sites by the parity of x + t. Coupling
//! layers transform one parity conditioned on the other; the stencil
//! offsets around an active site all carry odd coordinate parity and
//! therefore always land on frozen sites.

use crate::constants::{lcg_gaussian, N_DIM, N_PARITIES};

/// Shape of a 2D periodic lattice.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Lattice2d {
    /// Extents `[L, T]` (spatial, temporal). Both must be even for the
    /// checkerboard partition to tile exactly.
    pub dims: [usize; N_DIM],
}

impl Lattice2d {
    /// Create a lattice with extents `[l, t]`.
    #[must_use]
    pub const fn new(l: usize, t: usize) -> Self {
        Self { dims: [l, t] }
    }

    /// Square lattice L × L.
    #[must_use]
    pub const fn square(l: usize) -> Self {
        Self { dims: [l, l] }
    }

    /// Total number of sites.
    #[must_use]
    pub const fn volume(&self) -> usize {
        self.dims[0] * self.dims[1]
    }

    /// Whether both extents are even (checkerboard-compatible).
    #[must_use]
    pub const fn is_even(&self) -> bool {
        self.dims[0] % 2 == 0 && self.dims[1] % 2 == 0
    }

    /// Flat site index from coordinates (x, t).
    #[inline]
    #[must_use]
    pub const fn site_index(&self, x: usize, t: usize) -> usize {
        x * self.dims[1] + t
    }

    /// Coordinates (x, t) from a flat site index.
    #[inline]
    #[must_use]
    pub const fn site_coords(&self, idx: usize) -> (usize, usize) {
        (idx / self.dims[1], idx % self.dims[1])
    }

    /// Neighbor site in direction +μ with periodic boundaries.
    /// μ = 0: spatial, μ = 1: temporal.
    #[inline]
    #[must_use]
    pub const fn neighbor_fwd(&self, x: usize, t: usize, mu: usize) -> (usize, usize) {
        if mu == 0 {
            ((x + 1) % self.dims[0], t)
        } else {
            (x, (t + 1) % self.dims[1])
        }
    }

    /// Neighbor site in direction −μ with periodic boundaries.
    #[inline]
    #[must_use]
    pub const fn neighbor_bwd(&self, x: usize, t: usize, mu: usize) -> (usize, usize) {
        if mu == 0 {
            ((x + self.dims[0] - 1) % self.dims[0], t)
        } else {
            (x, (t + self.dims[1] - 1) % self.dims[1])
        }
    }

    /// Site displaced by a signed offset (dx, dt) with periodic wrapping.
    #[inline]
    #[must_use]
    pub fn shifted_index(&self, x: usize, t: usize, dx: isize, dt: isize) -> usize {
        let l = self.dims[0] as isize;
        let tt = self.dims[1] as isize;
        let xs = (x as isize + dx).rem_euclid(l) as usize;
        let ts = (t as isize + dt).rem_euclid(tt) as usize;
        self.site_index(xs, ts)
    }

    /// Checkerboard parity of a site: (x + t) mod 2.
    #[inline]
    #[must_use]
    pub const fn parity(&self, x: usize, t: usize) -> usize {
        (x + t) % N_PARITIES
    }

    /// Flat indices of all sites with checkerboard parity `p` (0 or 1),
    /// in ascending index order.
    #[must_use]
    pub fn parity_sites(&self, p: usize) -> Vec<usize> {
        let mut sites = Vec::with_capacity(self.volume() / 2);
        for x in 0..self.dims[0] {
            for t in 0..self.dims[1] {
                if self.parity(x, t) == p % 2 {
                    sites.push(self.site_index(x, t));
                }
            }
        }
        sites
    }
}

/// Stencil offsets within a radius-`r` window that carry odd coordinate
/// parity.
///
/// These are the frozen-parity sites around an active site: for a window of
/// size K = 2r + 1 there are 2r(r + 1) of them, and for r = 1 they are the
/// four nearest neighbors. Ordering is row-major over (dx, dt), fixed so
/// conditioner inputs are reproducible.
#[must_use]
pub fn stencil_offsets(radius: usize) -> Vec<(isize, isize)> {
    let r = radius as isize;
    let mut offsets = Vec::new();
    for dx in -r..=r {
        for dt in -r..=r {
            if (dx + dt).rem_euclid(2) == 1 {
                offsets.push((dx, dt));
            }
        }
    }
    offsets
}

/// A batch of scalar field configurations on a common lattice.
///
/// Layout: `data[sample * volume + site]`.
#[derive(Clone, Debug)]
#[allow(missing_docs)]
pub struct FieldBatch {
    pub lattice: Lattice2d,
    pub batch: usize,
    pub data: Vec<f64>,
}

impl FieldBatch {
    /// All-zero batch.
    #[must_use]
    pub fn zeros(lattice: Lattice2d, batch: usize) -> Self {
        Self {
            lattice,
            batch,
            data: vec![0.0; batch * lattice.volume()],
        }
    }

    /// Batch of independent standard-normal configurations.
    #[must_use]
    pub fn gaussian(lattice: Lattice2d, batch: usize, seed: &mut u64) -> Self {
        let data = (0..batch * lattice.volume())
            .map(|_| lcg_gaussian(seed))
            .collect();
        Self {
            lattice,
            batch,
            data,
        }
    }

    /// Lattice volume (sites per configuration).
    #[must_use]
    pub const fn volume(&self) -> usize {
        self.lattice.volume()
    }

    /// Read-only view of configuration `i`.
    #[must_use]
    pub fn sample(&self, i: usize) -> &[f64] {
        let v = self.volume();
        &self.data[i * v..(i + 1) * v]
    }

    /// Mutable view of configuration `i`.
    pub fn sample_mut(&mut self, i: usize) -> &mut [f64] {
        let v = self.volume();
        &mut self.data[i * v..(i + 1) * v]
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn index_coords_round_trip() {
        let lat = Lattice2d::new(6, 4);
        for idx in 0..lat.volume() {
            let (x, t) = lat.site_coords(idx);
            assert_eq!(lat.site_index(x, t), idx);
        }
    }

    #[test]
    fn neighbors_wrap_periodically() {
        let lat = Lattice2d::new(4, 4);
        assert_eq!(lat.neighbor_fwd(3, 2, 0), (0, 2));
        assert_eq!(lat.neighbor_fwd(1, 3, 1), (1, 0));
        assert_eq!(lat.neighbor_bwd(0, 2, 0), (3, 2));
        assert_eq!(lat.neighbor_bwd(1, 0, 1), (1, 3));
    }

    #[test]
    fn neighbor_fwd_then_bwd_is_identity() {
        let lat = Lattice2d::new(8, 6);
        for idx in 0..lat.volume() {
            let (x, t) = lat.site_coords(idx);
            for mu in 0..2 {
                let (xf, tf) = lat.neighbor_fwd(x, t, mu);
                assert_eq!(lat.neighbor_bwd(xf, tf, mu), (x, t));
            }
        }
    }

    #[test]
    fn shifted_index_matches_neighbors() {
        let lat = Lattice2d::new(4, 6);
        for idx in 0..lat.volume() {
            let (x, t) = lat.site_coords(idx);
            let (xf, tf) = lat.neighbor_fwd(x, t, 0);
            assert_eq!(lat.shifted_index(x, t, 1, 0), lat.site_index(xf, tf));
            let (xb, tb) = lat.neighbor_bwd(x, t, 1);
            assert_eq!(lat.shifted_index(x, t, 0, -1), lat.site_index(xb, tb));
        }
    }

    #[test]
    fn shifted_index_wraps_large_negative() {
        let lat = Lattice2d::new(4, 4);
        // -5 ≡ -1 ≡ +3 (mod 4)
        assert_eq!(lat.shifted_index(0, 0, -5, 0), lat.site_index(3, 0));
    }

    #[test]
    fn parities_partition_the_lattice() {
        let lat = Lattice2d::new(8, 8);
        let even = lat.parity_sites(0);
        let odd = lat.parity_sites(1);
        assert_eq!(even.len(), lat.volume() / 2);
        assert_eq!(odd.len(), lat.volume() / 2);
        let mut all: Vec<usize> = even.iter().chain(odd.iter()).copied().collect();
        all.sort_unstable();
        let expected: Vec<usize> = (0..lat.volume()).collect();
        assert_eq!(all, expected, "parities must tile the lattice");
    }

    #[test]
    fn stencil_radius_one_is_nearest_neighbors() {
        let offsets = stencil_offsets(1);
        assert_eq!(offsets.len(), 4);
        for &(dx, dt) in &offsets {
            assert_eq!(dx.abs() + dt.abs(), 1, "r=1 stencil is the 4 neighbors");
        }
    }

    #[test]
    fn stencil_count_matches_formula() {
        for r in 1..=4 {
            let n = stencil_offsets(r).len();
            assert_eq!(n, 2 * r * (r + 1), "2r(r+1) offsets for radius {r}");
        }
    }

    #[test]
    fn stencil_offsets_have_odd_parity() {
        for &(dx, dt) in &stencil_offsets(3) {
            assert_eq!((dx + dt).rem_euclid(2), 1);
        }
    }

    #[test]
    fn stencil_lands_on_frozen_parity() {
        let lat = Lattice2d::new(6, 6);
        let offsets = stencil_offsets(2);
        for &site in &lat.parity_sites(0) {
            let (x, t) = lat.site_coords(site);
            for &(dx, dt) in &offsets {
                let (nx, nt) = lat.site_coords(lat.shifted_index(x, t, dx, dt));
                assert_eq!(lat.parity(nx, nt), 1, "stencil must read the other parity");
            }
        }
    }

    #[test]
    fn field_batch_views_are_disjoint() {
        let lat = Lattice2d::new(4, 4);
        let mut batch = FieldBatch::zeros(lat, 3);
        batch.sample_mut(1)[5] = 2.5;
        assert!((batch.sample(0)[5]).abs() < f64::EPSILON);
        assert!((batch.sample(1)[5] - 2.5).abs() < f64::EPSILON);
        assert!((batch.sample(2)[5]).abs() < f64::EPSILON);
    }

    #[test]
    fn gaussian_batch_deterministic() {
        let lat = Lattice2d::new(4, 4);
        let mut s1 = 42u64;
        let mut s2 = 42u64;
        let a = FieldBatch::gaussian(lat, 2, &mut s1);
        let b = FieldBatch::gaussian(lat, 2, &mut s2);
        assert_eq!(a.data, b.data, "same seed must give identical fields");
    }
}
