// SPDX-License-Identifier: AGPL-3.0-only

//! Scalar φ⁴ action on the 2D periodic lattice.
//!
//! S(φ) = Σ_x [ ½ Σ_μ (φ(x+μ̂) − φ(x))² + ½ m² φ(x)² + λ φ(x)⁴ ]
//!
//! At λ = 0 this is the free theory with kinetic operator
//!
//!   K = (4 + m²) δ_xy − Σ_μ (δ_{y,x+μ̂} + δ_{y,x−μ̂})
//!
//! whose momentum eigenvalues are K̃(q) = m² + Σ_μ 4 sin²(q_μ/2). The exact
//! free propagator G = K⁻¹ gives the analytic baselines the validation
//! binaries check against: susceptibility χ = G̃(0) = 1/m², and the cosh
//! pole mass 2 asinh(m/2).

use rayon::prelude::*;
use std::f64::consts::PI;

use crate::error::LatticeFlowError;
use crate::lattice::{FieldBatch, Lattice2d};

/// φ⁴ action parameters bound to a lattice shape.
#[derive(Clone, Copy, Debug)]
pub struct Phi4Action {
    /// Bare mass squared. Must be positive for the free covariance.
    pub m_sq: f64,
    /// Quartic coupling. λ = 0 is the free theory.
    pub lambda: f64,
    /// Lattice the action is evaluated on.
    pub lattice: Lattice2d,
}

impl Phi4Action {
    /// Free-theory action (λ = 0).
    #[must_use]
    pub const fn free(m_sq: f64, lattice: Lattice2d) -> Self {
        Self {
            m_sq,
            lambda: 0.0,
            lattice,
        }
    }

    /// Action of a single configuration.
    ///
    /// Forward differences only; each bond is counted once.
    #[must_use]
    pub fn action(&self, phi: &[f64]) -> f64 {
        let lat = self.lattice;
        let mut s = 0.0;
        for x in 0..lat.dims[0] {
            for t in 0..lat.dims[1] {
                let p = phi[lat.site_index(x, t)];
                let p_sq = p * p;
                s += 0.5 * self.m_sq * p_sq + self.lambda * p_sq * p_sq;
                for mu in 0..2 {
                    let (xf, tf) = lat.neighbor_fwd(x, t, mu);
                    let d = phi[lat.site_index(xf, tf)] - p;
                    s += 0.5 * d * d;
                }
            }
        }
        s
    }

    /// Action of every configuration in a batch.
    #[must_use]
    pub fn action_batch(&self, fields: &FieldBatch) -> Vec<f64> {
        fields
            .data
            .par_chunks(fields.volume())
            .map(|phi| self.action(phi))
            .collect()
    }

    /// Apply the free kinetic operator: (Kφ)(x) = (4 + m²)φ(x) − Σ_± φ(x ± μ̂).
    #[must_use]
    pub fn apply_kinetic(&self, phi: &[f64]) -> Vec<f64> {
        let lat = self.lattice;
        let mut out = vec![0.0; lat.volume()];
        for x in 0..lat.dims[0] {
            for t in 0..lat.dims[1] {
                let idx = lat.site_index(x, t);
                let mut v = (4.0 + self.m_sq) * phi[idx];
                for mu in 0..2 {
                    let (xf, tf) = lat.neighbor_fwd(x, t, mu);
                    let (xb, tb) = lat.neighbor_bwd(x, t, mu);
                    v -= phi[lat.site_index(xf, tf)] + phi[lat.site_index(xb, tb)];
                }
                out[idx] = v;
            }
        }
        out
    }

    /// Quadratic form ½ φᵀ K φ — equals [`Self::action`] when λ = 0.
    #[must_use]
    pub fn quadratic_action(&self, phi: &[f64]) -> f64 {
        let k_phi = self.apply_kinetic(phi);
        0.5 * phi.iter().zip(k_phi.iter()).map(|(p, kp)| p * kp).sum::<f64>()
    }

    /// Exact free two-point function G(δ) for every displacement, by the
    /// momentum double sum
    ///
    ///   G(δ) = (1/V) Σ_q cos(q · δ) / K̃(q).
    ///
    /// # Errors
    ///
    /// [`LatticeFlowError::InvalidParameter`] if `m_sq <= 0` (the q = 0
    /// mode diverges).
    pub fn free_correlator(&self) -> Result<Vec<f64>, LatticeFlowError> {
        if self.m_sq <= 0.0 {
            return Err(LatticeFlowError::InvalidParameter(format!(
                "free correlator needs m_sq > 0, got {}",
                self.m_sq
            )));
        }
        let lat = self.lattice;
        let (l, t) = (lat.dims[0], lat.dims[1]);
        let vol = lat.volume();

        // Momentum eigenvalues K̃(q) on the dual lattice.
        let mut kt = vec![0.0; vol];
        for n1 in 0..l {
            let sx = (PI * n1 as f64 / l as f64).sin();
            for n2 in 0..t {
                let st = (PI * n2 as f64 / t as f64).sin();
                kt[n1 * t + n2] = 4.0f64.mul_add(st * st, 4.0f64.mul_add(sx * sx, self.m_sq));
            }
        }

        let g: Vec<f64> = (0..vol)
            .into_par_iter()
            .map(|idx| {
                let (dx, dt) = lat.site_coords(idx);
                let mut sum = 0.0;
                for n1 in 0..l {
                    let px = 2.0 * PI * (n1 * dx) as f64 / l as f64;
                    for n2 in 0..t {
                        let pt = 2.0 * PI * (n2 * dt) as f64 / t as f64;
                        sum += (px + pt).cos() / kt[n1 * t + n2];
                    }
                }
                sum / vol as f64
            })
            .collect();
        Ok(g)
    }

    /// Exact free covariance Σ = K⁻¹ as a dense V × V matrix,
    /// Σ(x, y) = G(x − y).
    ///
    /// # Errors
    ///
    /// Propagates [`Self::free_correlator`] failures.
    pub fn free_covariance(&self) -> Result<Vec<f64>, LatticeFlowError> {
        let g = self.free_correlator()?;
        let lat = self.lattice;
        let vol = lat.volume();
        let mut sigma = vec![0.0; vol * vol];
        for i in 0..vol {
            let (xi, ti) = lat.site_coords(i);
            for j in 0..vol {
                let (xj, tj) = lat.site_coords(j);
                let dx = (xi + lat.dims[0] - xj) % lat.dims[0];
                let dt = (ti + lat.dims[1] - tj) % lat.dims[1];
                sigma[i * vol + j] = g[lat.site_index(dx, dt)];
            }
        }
        Ok(sigma)
    }
}

/// Standard-normal base action S_z = ½ Σ z² per configuration.
#[must_use]
pub fn gaussian_action_batch(fields: &FieldBatch) -> Vec<f64> {
    fields
        .data
        .par_chunks(fields.volume())
        .map(|z| 0.5 * z.iter().map(|v| v * v).sum::<f64>())
        .collect()
}
