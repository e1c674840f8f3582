// SPDX-License-Identifier: AGPL-3.0-only

//! Finite-difference Jacobians of flow layers and log-det cross-checks.
//!
//! Every layer reports its own log|det J| analytically; these utilities
//! rebuild the full Jacobian matrix by central differences and compare its
//! LU log-determinant against the layer's claim. Linear layers are exact
//! under central differences (no truncation term); nonlinear coupling
//! layers agree to the documented finite-difference tolerance.

use crate::error::LatticeFlowError;
use crate::flow::FlowLayer;
use crate::lattice::{FieldBatch, Lattice2d};
use crate::linalg::lu_log_abs_det;
use crate::model::FlowModel;
use crate::tolerances::FD_STEP;

/// Apply a layer to a single configuration; returns (output, ldj).
#[must_use]
pub fn apply_single(layer: &dyn FlowLayer, lattice: Lattice2d, z: &[f64]) -> (Vec<f64>, f64) {
    let mut fields = FieldBatch {
        lattice,
        batch: 1,
        data: z.to_vec(),
    };
    let mut ldj = vec![0.0];
    layer.forward(&mut fields, &mut ldj);
    (fields.data, ldj[0])
}

/// Central-difference Jacobian J[i][j] = ∂φ_i/∂z_j at `z` (row-major V × V).
#[must_use]
pub fn finite_difference_jacobian(
    layer: &dyn FlowLayer,
    lattice: Lattice2d,
    z: &[f64],
    step: f64,
) -> Vec<f64> {
    let n = lattice.volume();
    let mut jac = vec![0.0; n * n];
    let mut probe = z.to_vec();
    for j in 0..n {
        probe[j] = z[j] + step;
        let (plus, _) = apply_single(layer, lattice, &probe);
        probe[j] = z[j] - step;
        let (minus, _) = apply_single(layer, lattice, &probe);
        probe[j] = z[j];
        for i in 0..n {
            jac[i * n + j] = (plus[i] - minus[i]) / (2.0 * step);
        }
    }
    jac
}

/// Finite-difference and analytic log|det J| at `z`.
///
/// # Errors
///
/// [`LatticeFlowError::SingularMatrix`] if the numerical Jacobian is
/// singular (a non-invertible layer).
pub fn check_log_det(
    layer: &dyn FlowLayer,
    lattice: Lattice2d,
    z: &[f64],
) -> Result<(f64, f64), LatticeFlowError> {
    let jac = finite_difference_jacobian(layer, lattice, z, FD_STEP);
    let fd = lu_log_abs_det(&jac, lattice.volume())?;
    let (_, analytic) = apply_single(layer, lattice, z);
    Ok((fd, analytic))
}

/// Jacobian probe of a model's flow at one base draw.
#[derive(Clone, Debug)]
pub struct JacobianProbe {
    /// Base input z.
    pub input: Vec<f64>,
    /// Flowed output φ(z).
    pub output: Vec<f64>,
    /// Central-difference Jacobian ∂φ/∂z (row-major V × V).
    pub jacobian: Vec<f64>,
}

/// Probe the flow Jacobian at `batch` base draws, mirroring the layer-wise
/// ldj bookkeeping with full matrices.
#[must_use]
pub fn model_jacobian(model: &FlowModel, batch: usize, seed: &mut u64) -> Vec<JacobianProbe> {
    let (fields, _) = model.sample_base(batch, seed);
    (0..batch)
        .map(|b| {
            let z = fields.sample(b).to_vec();
            let jacobian = finite_difference_jacobian(&model.flow, model.lattice, &z, FD_STEP);
            let (output, _) = apply_single(&model.flow, model.lattice, &z);
            JacobianProbe {
                input: z,
                output,
                jacobian,
            }
        })
        .collect()
}
