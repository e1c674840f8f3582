// SPDX-License-Identifier: AGPL-3.0-only

//! Coupling layers: transform one partition of sites conditioned on the
//! other.
//!
//! Invertibility is structural: the conditioner only ever reads frozen
//! sites, which the layer does not modify, so the inverse recomputes the
//! same affine parameters from the (unchanged) frozen partition and undoes
//! the pointwise map exactly.
//!
//! Two partition schemes:
//!
//! - [`DenseCoupling`] — flattened field split in half by site index,
//!   alternating which half is active by layer id; the conditioner sees
//!   the whole frozen half.
//! - [`StencilCoupling`] — checkerboard partition; each active site is
//!   conditioned on the frozen sites inside a radius-r stencil, with one
//!   pointwise network shared across sites.

use rayon::prelude::*;

use crate::flow::transform::AffineTransform;
use crate::flow::FlowLayer;
use crate::lattice::{stencil_offsets, FieldBatch, Lattice2d};
use crate::nn::Mlp;

/// Half-split coupling on the flattened field.
#[derive(Clone, Debug)]
pub struct DenseCoupling {
    /// Lattice volume (must be even).
    pub volume: usize,
    /// Even ids transform the first half, odd ids the second.
    pub layer_id: usize,
    /// Conditioner: frozen half → per-active-site affine parameters.
    pub net: Mlp,
    /// Pointwise transform applied to active sites.
    pub transform: AffineTransform,
}

impl DenseCoupling {
    /// Build with a seeded conditioner (zero head: identity layer).
    ///
    /// # Panics
    ///
    /// Panics if `volume` is odd.
    #[must_use]
    pub fn new(volume: usize, layer_id: usize, hidden: &[usize], seed: &mut u64) -> Self {
        assert!(volume % 2 == 0, "dense coupling needs an even volume");
        let half = volume / 2;
        let mut widths = vec![half];
        widths.extend_from_slice(hidden);
        widths.push(half * AffineTransform::N_PARAMS);
        Self {
            volume,
            layer_id,
            net: Mlp::seeded(&widths, seed),
            transform: AffineTransform::default(),
        }
    }

    /// Index ranges (active, frozen) for this layer id.
    #[must_use]
    pub fn split(&self) -> (std::ops::Range<usize>, std::ops::Range<usize>) {
        let half = self.volume / 2;
        if self.layer_id % 2 == 0 {
            (0..half, half..self.volume)
        } else {
            (half..self.volume, 0..half)
        }
    }

    fn apply(&self, phi: &mut [f64], ldj: &mut f64, invert: bool) {
        let (active, frozen) = self.split();
        let context: Vec<f64> = phi[frozen].to_vec();
        let params = self.net.forward(&context);
        for (k, idx) in active.enumerate() {
            let p = [params[2 * k], params[2 * k + 1]];
            let (out, dl) = if invert {
                self.transform.inverse(phi[idx], p)
            } else {
                self.transform.forward(phi[idx], p)
            };
            phi[idx] = out;
            *ldj += dl;
        }
    }
}

impl FlowLayer for DenseCoupling {
    fn forward(&self, fields: &mut FieldBatch, ldj: &mut [f64]) {
        assert_eq!(self.volume, fields.volume(), "coupling volume mismatch");
        let v = fields.volume();
        fields
            .data
            .par_chunks_mut(v)
            .zip(ldj.par_iter_mut())
            .for_each(|(phi, l)| self.apply(phi, l, false));
    }

    fn inverse(&self, fields: &mut FieldBatch, ldj: &mut [f64]) {
        assert_eq!(self.volume, fields.volume(), "coupling volume mismatch");
        let v = fields.volume();
        fields
            .data
            .par_chunks_mut(v)
            .zip(ldj.par_iter_mut())
            .for_each(|(phi, l)| self.apply(phi, l, true));
    }
}

/// Checkerboard coupling with a pointwise stencil conditioner.
#[derive(Clone, Debug)]
pub struct StencilCoupling {
    /// Lattice geometry.
    pub lattice: Lattice2d,
    /// Active checkerboard parity (layer id mod 2).
    pub parity: usize,
    /// Frozen-parity offsets read by the conditioner, fixed order.
    pub offsets: Vec<(isize, isize)>,
    /// Pointwise conditioner: stencil values → affine parameters.
    pub net: Mlp,
    /// Pointwise transform applied to active sites.
    pub transform: AffineTransform,
}

impl StencilCoupling {
    /// Build with a seeded pointwise conditioner (zero head: identity
    /// layer).
    ///
    /// # Panics
    ///
    /// Panics if the lattice extents are not both even.
    #[must_use]
    pub fn new(
        lattice: Lattice2d,
        radius: usize,
        layer_id: usize,
        hidden: &[usize],
        seed: &mut u64,
    ) -> Self {
        assert!(lattice.is_even(), "checkerboard needs even extents");
        let offsets = stencil_offsets(radius);
        let mut widths = vec![offsets.len()];
        widths.extend_from_slice(hidden);
        widths.push(AffineTransform::N_PARAMS);
        Self {
            lattice,
            parity: layer_id % 2,
            offsets,
            net: Mlp::seeded(&widths, seed),
            transform: AffineTransform::default(),
        }
    }

    fn apply(&self, phi: &mut [f64], ldj: &mut f64, invert: bool) {
        let lat = self.lattice;
        let mut context = vec![0.0; self.offsets.len()];
        for x in 0..lat.dims[0] {
            for t in 0..lat.dims[1] {
                if lat.parity(x, t) != self.parity {
                    continue;
                }
                // Stencil offsets have odd parity, so every read lands on a
                // frozen site; in-place writes to active sites are safe.
                for (c, &(dx, dt)) in context.iter_mut().zip(self.offsets.iter()) {
                    *c = phi[lat.shifted_index(x, t, dx, dt)];
                }
                let out = self.net.forward(&context);
                let p = [out[0], out[1]];
                let idx = lat.site_index(x, t);
                let (value, dl) = if invert {
                    self.transform.inverse(phi[idx], p)
                } else {
                    self.transform.forward(phi[idx], p)
                };
                phi[idx] = value;
                *ldj += dl;
            }
        }
    }
}

impl FlowLayer for StencilCoupling {
    fn forward(&self, fields: &mut FieldBatch, ldj: &mut [f64]) {
        assert_eq!(self.lattice, fields.lattice, "coupling lattice mismatch");
        let v = fields.volume();
        fields
            .data
            .par_chunks_mut(v)
            .zip(ldj.par_iter_mut())
            .for_each(|(phi, l)| self.apply(phi, l, false));
    }

    fn inverse(&self, fields: &mut FieldBatch, ldj: &mut [f64]) {
        assert_eq!(self.lattice, fields.lattice, "coupling lattice mismatch");
        let v = fields.volume();
        fields
            .data
            .par_chunks_mut(v)
            .zip(ldj.par_iter_mut())
            .for_each(|(phi, l)| self.apply(phi, l, true));
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::nn::DenseLayer;
    use crate::tolerances;

    /// Replace the zero head so the coupling actually transforms.
    fn randomize_head(net: &mut Mlp, seed: &mut u64) {
        let last = net.layers.len() - 1;
        let (n_in, n_out) = (net.layers[last].n_in, net.layers[last].n_out);
        net.layers[last] = DenseLayer::seeded(n_in, n_out, seed);
    }

    fn gaussian_batch(l: usize, batch: usize, seed: u64) -> FieldBatch {
        let mut s = seed;
        FieldBatch::gaussian(Lattice2d::square(l), batch, &mut s)
    }

    #[test]
    fn fresh_stencil_coupling_is_identity() {
        let lat = Lattice2d::square(4);
        let mut seed = 3u64;
        let layer = StencilCoupling::new(lat, 1, 0, &[8], &mut seed);
        let mut fields = gaussian_batch(4, 2, 17);
        let orig = fields.data.clone();
        let mut ldj = vec![0.0; 2];
        layer.forward(&mut fields, &mut ldj);
        assert_eq!(fields.data, orig, "zero head must give the identity");
        assert!(ldj.iter().all(|v| v.abs() < f64::EPSILON));
    }

    #[test]
    fn fresh_dense_coupling_is_identity() {
        let mut seed = 3u64;
        let layer = DenseCoupling::new(16, 0, &[8], &mut seed);
        let mut fields = gaussian_batch(4, 2, 19);
        let orig = fields.data.clone();
        let mut ldj = vec![0.0; 2];
        layer.forward(&mut fields, &mut ldj);
        assert_eq!(fields.data, orig);
        assert!(ldj.iter().all(|v| v.abs() < f64::EPSILON));
    }

    #[test]
    fn stencil_coupling_round_trip() {
        let lat = Lattice2d::square(6);
        let mut seed = 5u64;
        let mut layer = StencilCoupling::new(lat, 2, 1, &[8, 8], &mut seed);
        randomize_head(&mut layer.net, &mut seed);

        let mut fields = gaussian_batch(6, 3, 23);
        let orig = fields.data.clone();
        let mut ldj = vec![0.0; 3];
        layer.forward(&mut fields, &mut ldj);
        assert_ne!(fields.data, orig, "randomized head must transform");
        layer.inverse(&mut fields, &mut ldj);
        for (got, want) in fields.data.iter().zip(orig.iter()) {
            assert!((got - want).abs() < tolerances::EXACT_F64, "{got} vs {want}");
        }
        assert!(
            ldj.iter().all(|v| v.abs() < tolerances::EXACT_F64),
            "ldj must cancel: {ldj:?}"
        );
    }

    #[test]
    fn dense_coupling_round_trip() {
        let mut seed = 5u64;
        let mut layer = DenseCoupling::new(16, 1, &[12], &mut seed);
        randomize_head(&mut layer.net, &mut seed);

        let mut fields = gaussian_batch(4, 3, 29);
        let orig = fields.data.clone();
        let mut ldj = vec![0.0; 3];
        layer.forward(&mut fields, &mut ldj);
        layer.inverse(&mut fields, &mut ldj);
        for (got, want) in fields.data.iter().zip(orig.iter()) {
            assert!((got - want).abs() < tolerances::EXACT_F64);
        }
        assert!(ldj.iter().all(|v| v.abs() < tolerances::EXACT_F64));
    }

    #[test]
    fn stencil_coupling_preserves_frozen_sites() {
        let lat = Lattice2d::square(4);
        let mut seed = 7u64;
        let mut layer = StencilCoupling::new(lat, 1, 0, &[8], &mut seed);
        randomize_head(&mut layer.net, &mut seed);

        let mut fields = gaussian_batch(4, 1, 31);
        let orig = fields.data.clone();
        let mut ldj = vec![0.0];
        layer.forward(&mut fields, &mut ldj);
        for &site in &lat.parity_sites(1 - layer.parity) {
            assert!(
                (fields.sample(0)[site] - orig[site]).abs() < f64::EPSILON,
                "frozen site {site} must pass through"
            );
        }
    }

    #[test]
    fn dense_coupling_split_alternates() {
        let mut seed = 1u64;
        let even = DenseCoupling::new(8, 0, &[4], &mut seed);
        let odd = DenseCoupling::new(8, 1, &[4], &mut seed);
        assert_eq!(even.split().0, 0..4);
        assert_eq!(odd.split().0, 4..8);
    }

    #[test]
    fn dense_coupling_only_touches_active_half() {
        let mut seed = 11u64;
        let mut layer = DenseCoupling::new(16, 1, &[8], &mut seed);
        randomize_head(&mut layer.net, &mut seed);

        let mut fields = gaussian_batch(4, 1, 37);
        let orig = fields.data.clone();
        let mut ldj = vec![0.0];
        layer.forward(&mut fields, &mut ldj);
        let (_, frozen) = layer.split();
        for idx in frozen {
            assert!((fields.sample(0)[idx] - orig[idx]).abs() < f64::EPSILON);
        }
    }

    #[test]
    fn coupling_forward_deterministic() {
        let lat = Lattice2d::square(4);
        let mut seed = 13u64;
        let mut layer = StencilCoupling::new(lat, 1, 1, &[8], &mut seed);
        randomize_head(&mut layer.net, &mut seed);

        let run = |layer: &StencilCoupling| {
            let mut fields = gaussian_batch(4, 2, 41);
            let mut ldj = vec![0.0; 2];
            layer.forward(&mut fields, &mut ldj);
            (fields.data, ldj)
        };
        let (d1, l1) = run(&layer);
        let (d2, l2) = run(&layer);
        assert_eq!(d1, d2);
        assert_eq!(l1, l2);
    }
}
