// SPDX-License-Identifier: AGPL-3.0-only

//! Linear flow layers: global rescaling, diagonal, and triangular maps.
//!
//! All scale parameters pass through the crate softplus (β = ln 2), so a
//! zero-initialized layer is the identity and positivity of every Jacobian
//! diagonal is structural rather than a runtime check.
//!
//! The triangular layer doubles as the exact sampler for the free theory:
//! loading it with the Cholesky factor of the free covariance turns the
//! Gaussian base into exact free-field configurations with constant
//! importance weights.

use crate::error::LatticeFlowError;
use crate::flow::{softplus, softplus_inv, FlowLayer};
use crate::lattice::FieldBatch;

/// Single learnable scale applied to every site.
#[derive(Clone, Debug, Default)]
pub struct GlobalRescaling {
    /// Raw parameter; the applied scale is softplus(scale).
    pub scale: f64,
}

impl GlobalRescaling {
    /// Identity-initialized layer.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Layer applying a given positive scale.
    #[must_use]
    pub fn with_scale(sigma: f64) -> Self {
        Self {
            scale: softplus_inv(sigma),
        }
    }
}

impl FlowLayer for GlobalRescaling {
    fn forward(&self, fields: &mut FieldBatch, ldj: &mut [f64]) {
        let sigma = softplus(self.scale);
        let log_sigma_vol = sigma.ln() * fields.volume() as f64;
        for v in &mut fields.data {
            *v *= sigma;
        }
        for l in ldj.iter_mut() {
            *l += log_sigma_vol;
        }
    }

    fn inverse(&self, fields: &mut FieldBatch, ldj: &mut [f64]) {
        let sigma = softplus(self.scale);
        let log_sigma_vol = sigma.ln() * fields.volume() as f64;
        for v in &mut fields.data {
            *v /= sigma;
        }
        for l in ldj.iter_mut() {
            *l -= log_sigma_vol;
        }
    }
}

/// Per-site positive diagonal scaling.
#[derive(Clone, Debug)]
pub struct DiagonalLinear {
    /// Raw parameters, one per site; applied scale is softplus(weight).
    pub weight: Vec<f64>,
}

impl DiagonalLinear {
    /// Identity-initialized layer for `size` sites.
    #[must_use]
    pub fn new(size: usize) -> Self {
        Self {
            weight: vec![0.0; size],
        }
    }

    /// Layer applying the given positive scales.
    ///
    /// # Errors
    ///
    /// [`LatticeFlowError::InvalidParameter`] if any scale is not positive.
    pub fn from_scales(scales: &[f64]) -> Result<Self, LatticeFlowError> {
        if let Some(bad) = scales.iter().find(|s| **s <= 0.0) {
            return Err(LatticeFlowError::InvalidParameter(format!(
                "diagonal scale must be positive, got {bad}"
            )));
        }
        Ok(Self {
            weight: scales.iter().map(|s| softplus_inv(*s)).collect(),
        })
    }

    fn scales_and_log_det(&self) -> (Vec<f64>, f64) {
        let scales: Vec<f64> = self.weight.iter().map(|w| softplus(*w)).collect();
        let log_det = scales.iter().map(|s| s.ln()).sum();
        (scales, log_det)
    }
}

impl FlowLayer for DiagonalLinear {
    fn forward(&self, fields: &mut FieldBatch, ldj: &mut [f64]) {
        assert_eq!(self.weight.len(), fields.volume(), "diagonal size mismatch");
        let (scales, log_det) = self.scales_and_log_det();
        for i in 0..fields.batch {
            for (v, s) in fields.sample_mut(i).iter_mut().zip(scales.iter()) {
                *v *= s;
            }
            ldj[i] += log_det;
        }
    }

    fn inverse(&self, fields: &mut FieldBatch, ldj: &mut [f64]) {
        assert_eq!(self.weight.len(), fields.volume(), "diagonal size mismatch");
        let (scales, log_det) = self.scales_and_log_det();
        for i in 0..fields.batch {
            for (v, s) in fields.sample_mut(i).iter_mut().zip(scales.iter()) {
                *v /= s;
            }
            ldj[i] -= log_det;
        }
    }
}

/// Lower-triangular linear map with softplus-positive diagonal.
///
/// Strictly-lower entries are stored row-major in `tril` (row i holds i
/// entries at offset i(i−1)/2).
#[derive(Clone, Debug)]
pub struct TriangularLinear {
    /// Matrix dimension (lattice volume).
    pub size: usize,
    /// Raw diagonal parameters; applied diagonal is softplus(diag).
    pub diag: Vec<f64>,
    /// Strictly-lower-triangular entries, applied as-is.
    pub tril: Vec<f64>,
}

impl TriangularLinear {
    /// Identity-initialized layer.
    #[must_use]
    pub fn identity(size: usize) -> Self {
        Self {
            size,
            diag: vec![0.0; size],
            tril: vec![0.0; size * (size - 1) / 2],
        }
    }

    /// Load the layer with a lower-triangular factor (row-major n × n),
    /// e.g. a Cholesky factor of a target covariance.
    ///
    /// # Errors
    ///
    /// [`LatticeFlowError::ShapeMismatch`] if `l` is not n × n;
    /// [`LatticeFlowError::InvalidParameter`] if a diagonal entry is not
    /// positive.
    pub fn from_cholesky(l: &[f64], n: usize) -> Result<Self, LatticeFlowError> {
        if l.len() != n * n {
            return Err(LatticeFlowError::ShapeMismatch {
                expected: n * n,
                found: l.len(),
            });
        }
        let mut diag = Vec::with_capacity(n);
        let mut tril = Vec::with_capacity(n * (n - 1) / 2);
        for i in 0..n {
            let d = l[i * n + i];
            if d <= 0.0 {
                return Err(LatticeFlowError::InvalidParameter(format!(
                    "triangular diagonal must be positive, got {d} at row {i}"
                )));
            }
            diag.push(softplus_inv(d));
            for j in 0..i {
                tril.push(l[i * n + j]);
            }
        }
        Ok(Self { size: n, diag, tril })
    }

    /// Materialize the applied matrix (row-major, upper part zero).
    #[must_use]
    pub fn weight(&self) -> Vec<f64> {
        let n = self.size;
        let mut l = vec![0.0; n * n];
        for i in 0..n {
            l[i * n + i] = softplus(self.diag[i]);
            let off = i * i.saturating_sub(1) / 2;
            for j in 0..i {
                l[i * n + j] = self.tril[off + j];
            }
        }
        l
    }

    fn log_det(&self) -> f64 {
        self.diag.iter().map(|d| softplus(*d).ln()).sum()
    }
}

impl FlowLayer for TriangularLinear {
    fn forward(&self, fields: &mut FieldBatch, ldj: &mut [f64]) {
        assert_eq!(self.size, fields.volume(), "triangular size mismatch");
        let l = self.weight();
        let n = self.size;
        let log_det = self.log_det();
        for b in 0..fields.batch {
            let phi = fields.sample_mut(b);
            // In-place φ = L z: descending rows only read untouched lower
            // indices.
            for i in (0..n).rev() {
                let row = &l[i * n..i * n + i + 1];
                let mut acc = 0.0;
                for (j, lij) in row.iter().enumerate() {
                    acc += lij * phi[j];
                }
                phi[i] = acc;
            }
            ldj[b] += log_det;
        }
    }

    fn inverse(&self, fields: &mut FieldBatch, ldj: &mut [f64]) {
        assert_eq!(self.size, fields.volume(), "triangular size mismatch");
        let l = self.weight();
        let n = self.size;
        let log_det = self.log_det();
        for b in 0..fields.batch {
            let phi = fields.sample_mut(b);
            // Forward substitution in place.
            for i in 0..n {
                let mut acc = phi[i];
                for j in 0..i {
                    acc -= l[i * n + j] * phi[j];
                }
                phi[i] = acc / l[i * n + i];
            }
            ldj[b] -= log_det;
        }
    }
}
