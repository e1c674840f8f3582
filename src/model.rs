// SPDX-License-Identifier: AGPL-3.0-only

//! Flow model: Gaussian base, invertible flow, target action.
//!
//! Sampling draws z ~ N(0, 1) per site, pushes it through the flow to get
//! field configurations φ, and attaches the unnormalized importance
//! log-weight
//!
//!   log w = S_z(z) + log|det ∂φ/∂z| − S(φ)
//!
//! which is constant exactly when the flow maps the base onto the target.
//! The weights feed either direct reweighting (effective sample size) or
//! the Metropolis independence chain in `sampler`.

use crate::action::{gaussian_action_batch, Phi4Action};
use crate::flow::{Composition, FlowLayer};
use crate::lattice::{FieldBatch, Lattice2d};

/// Base + flow + target bundle.
pub struct FlowModel {
    /// Lattice shared by base, flow, and target.
    pub lattice: Lattice2d,
    /// Target action the flow approximates.
    pub target: Phi4Action,
    /// Invertible map from base noise to field space.
    pub flow: Composition,
}

/// One batch drawn from the model.
#[derive(Clone, Debug)]
pub struct FlowSample {
    /// Field configurations φ.
    pub fields: FieldBatch,
    /// Unnormalized importance log-weights, one per configuration.
    pub log_weights: Vec<f64>,
}

impl FlowModel {
    /// Bundle a target action with a flow.
    #[must_use]
    pub fn new(target: Phi4Action, flow: Composition) -> Self {
        Self {
            lattice: target.lattice,
            target,
            flow,
        }
    }

    /// Draw base noise z with its action S_z = ½ Σ z².
    #[must_use]
    pub fn sample_base(&self, batch: usize, seed: &mut u64) -> (FieldBatch, Vec<f64>) {
        let z = FieldBatch::gaussian(self.lattice, batch, seed);
        let s_z = gaussian_action_batch(&z);
        (z, s_z)
    }

    /// Push a batch through the flow in place; returns per-sample
    /// log|det ∂φ/∂z|.
    #[must_use]
    pub fn flow_forward(&self, fields: &mut FieldBatch) -> Vec<f64> {
        let mut ldj = vec![0.0; fields.batch];
        self.flow.forward(fields, &mut ldj);
        ldj
    }

    /// Pull a batch back through the flow in place; returns the accumulated
    /// log-determinant of the inverse map.
    #[must_use]
    pub fn flow_inverse(&self, fields: &mut FieldBatch) -> Vec<f64> {
        let mut ldj = vec![0.0; fields.batch];
        self.flow.inverse(fields, &mut ldj);
        ldj
    }

    /// Draw a weighted batch of field configurations.
    #[must_use]
    pub fn sample(&self, batch: usize, seed: &mut u64) -> FlowSample {
        let (mut fields, s_z) = self.sample_base(batch, seed);
        let ldj = self.flow_forward(&mut fields);
        let s_phi = self.target.action_batch(&fields);
        let log_weights = s_z
            .iter()
            .zip(ldj.iter())
            .zip(s_phi.iter())
            .map(|((sz, l), sp)| sz + l - sp)
            .collect();
        FlowSample {
            fields,
            log_weights,
        }
    }
}

/// Normalized effective sample size per draw: (Σw)² / (N Σw²) ∈ (0, 1].
///
/// Weights are shifted by their maximum before exponentiation, so the
/// estimate is stable for any overall weight scale.
#[must_use]
pub fn ess_per_sample(log_weights: &[f64]) -> f64 {
    let n = log_weights.len();
    if n == 0 {
        return 0.0;
    }
    let max = log_weights.iter().fold(f64::NEG_INFINITY, |a, &b| a.max(b));
    let mut sum = 0.0;
    let mut sum_sq = 0.0;
    for lw in log_weights {
        let w = (lw - max).exp();
        sum += w;
        sum_sq += w * w;
    }
    sum * sum / (n as f64 * sum_sq)
}

/// Mean and (population) variance of the log-weights.
#[must_use]
pub fn log_weight_stats(log_weights: &[f64]) -> (f64, f64) {
    let n = log_weights.len() as f64;
    if log_weights.is_empty() {
        return (0.0, 0.0);
    }
    let mean = log_weights.iter().sum::<f64>() / n;
    let var = log_weights.iter().map(|lw| (lw - mean).powi(2)).sum::<f64>() / n;
    (mean, var)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::flow::TriangularLinear;
    use crate::linalg::cholesky;
    use crate::tolerances;

    #[test]
    fn identity_flow_log_weights_match_direct() {
        let lat = Lattice2d::square(4);
        let target = Phi4Action::free(1.0, lat);
        let model = FlowModel::new(target, Composition::new());
        let mut seed = 42u64;
        let sample = model.sample(8, &mut seed);
        for i in 0..8 {
            let z = sample.fields.sample(i);
            let s_z: f64 = 0.5 * z.iter().map(|v| v * v).sum::<f64>();
            let expected = s_z - target.action(z);
            assert!(
                (sample.log_weights[i] - expected).abs() < tolerances::EXACT_F64,
                "identity flow: log w = S_z − S(φ)"
            );
        }
    }

    #[test]
    fn exact_free_flow_has_constant_log_weights() {
        let lat = Lattice2d::square(4);
        let target = Phi4Action::free(1.0, lat);
        let sigma = target.free_covariance().expect("m_sq > 0");
        let l = cholesky(&sigma, lat.volume()).expect("covariance is SPD");
        let layer = TriangularLinear::from_cholesky(&l, lat.volume()).expect("positive diag");

        let mut flow = Composition::new();
        flow.push(Box::new(layer));
        let model = FlowModel::new(target, flow);

        let mut seed = 7u64;
        let sample = model.sample(64, &mut seed);
        let (_, var) = log_weight_stats(&sample.log_weights);
        assert!(
            var < tolerances::EXACT_FLOW_LOGW_VARIANCE,
            "exact flow must give constant log-weights, var = {var:.3e}"
        );
        let ess = ess_per_sample(&sample.log_weights);
        assert!(
            ess > tolerances::EXACT_FLOW_RATE,
            "exact flow ESS/N should be 1, got {ess}"
        );
    }

    #[test]
    fn ess_equal_weights_is_one() {
        let lw = vec![3.2; 50];
        let ess = ess_per_sample(&lw);
        assert!((ess - 1.0).abs() < tolerances::EXACT_F64, "got {ess}");
    }

    #[test]
    fn ess_single_dominant_weight() {
        let mut lw = vec![-1000.0; 10];
        lw[0] = 0.0;
        let ess = ess_per_sample(&lw);
        assert!((ess - 0.1).abs() < tolerances::EXACT_F64, "ESS/N → 1/N, got {ess}");
    }

    #[test]
    fn ess_empty_is_zero() {
        assert!(ess_per_sample(&[]).abs() < f64::EPSILON);
    }

    #[test]
    fn sampling_is_deterministic() {
        let lat = Lattice2d::square(4);
        let target = Phi4Action::free(0.5, lat);
        let model = FlowModel::new(target, Composition::new());
        let mut s1 = 99u64;
        let mut s2 = 99u64;
        let a = model.sample(4, &mut s1);
        let b = model.sample(4, &mut s2);
        assert_eq!(a.fields.data, b.fields.data);
        assert_eq!(a.log_weights, b.log_weights);
    }

    #[test]
    fn flow_forward_inverse_round_trip_through_model() {
        let lat = Lattice2d::square(4);
        let target = Phi4Action::free(1.0, lat);
        let sigma = target.free_covariance().expect("m_sq > 0");
        let l = cholesky(&sigma, lat.volume()).expect("SPD");
        let mut flow = Composition::new();
        flow.push(Box::new(
            TriangularLinear::from_cholesky(&l, lat.volume()).expect("positive diag"),
        ));
        let model = FlowModel::new(target, flow);

        let mut seed = 5u64;
        let (mut fields, _) = model.sample_base(3, &mut seed);
        let orig = fields.data.clone();
        let ldj_f = model.flow_forward(&mut fields);
        let ldj_i = model.flow_inverse(&mut fields);
        for (got, want) in fields.data.iter().zip(orig.iter()) {
            assert!((got - want).abs() < tolerances::ACCUMULATED_F64);
        }
        for (f, i) in ldj_f.iter().zip(ldj_i.iter()) {
            assert!((f + i).abs() < tolerances::ACCUMULATED_F64, "ldj must cancel");
        }
    }
}
