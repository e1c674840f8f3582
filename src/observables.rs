// SPDX-License-Identifier: AGPL-3.0-only

//! Estimators on chains and field samples.
//!
//! Series statistics (autocorrelation, integrated autocorrelation time) act
//! on scalar observable histories from the sampler. Field statistics build
//! the volume-averaged two-point function and derive from it the
//! zero-momentum correlator, effective pole mass, susceptibility, energy
//! density, and the low-momentum correlation-length estimator
//!
//!   ξ² = ( G̃(0,0) / G̃(2π/L, 0) − 1 ) / (4 sin²(π/L))
//!
//! which returns exactly 1/m on the free-theory correlator.
//!
//! # References
//!
//! - Caracciolo, Edwards, Pelissetto & Sokal, PRD 58, 105007 (1998) —
//!   low-momentum ξ estimator
//! - Wolff, CPC 156, 143 (2004) — autocorrelation windowing

use rayon::prelude::*;
use std::f64::consts::PI;

use crate::constants::lcg_index;
use crate::lattice::FieldBatch;

/// Raw-series autocorrelation: windowed lag products normalized by lag 0,
/// Γ(t) = Σ_{s<N−t} o_s o_{s+t}, returned as Γ(t)/Γ(0).
///
/// No mean subtraction — a constant series gives (N−t)/N, not 1. Use
/// [`autocovariance`] for the mean-subtracted variant.
#[must_use]
pub fn autocorrelation(series: &[f64]) -> Vec<f64> {
    let n = series.len();
    if n == 0 {
        return Vec::new();
    }
    let mut gamma = vec![0.0; n];
    for (t, g) in gamma.iter_mut().enumerate() {
        *g = series[..n - t]
            .iter()
            .zip(series[t..].iter())
            .map(|(a, b)| a * b)
            .sum();
    }
    let g0 = gamma[0];
    if g0 != 0.0 {
        for g in &mut gamma {
            *g /= g0;
        }
    }
    gamma
}

/// Mean-subtracted, count-normalized autocovariance ρ(t) = C(t)/C(0) with
/// C(t) = ⟨(o_s − ō)(o_{s+t} − ō)⟩.
#[must_use]
pub fn autocovariance(series: &[f64]) -> Vec<f64> {
    let n = series.len();
    if n == 0 {
        return Vec::new();
    }
    let mean = series.iter().sum::<f64>() / n as f64;
    let centered: Vec<f64> = series.iter().map(|o| o - mean).collect();
    let mut rho = vec![0.0; n];
    for (t, r) in rho.iter_mut().enumerate() {
        let c: f64 = centered[..n - t]
            .iter()
            .zip(centered[t..].iter())
            .map(|(a, b)| a * b)
            .sum();
        *r = c / (n - t) as f64;
    }
    let c0 = rho[0];
    if c0 != 0.0 {
        for r in &mut rho {
            *r /= c0;
        }
    }
    rho
}

/// Integrated autocorrelation time τ_int = ½ + Σ ρ(t), truncated at the
/// first non-positive ρ (simple first-crossing window).
///
/// An uncorrelated series gives τ_int ≈ ½; a chain with rejection runs of
/// typical length R gives τ_int = O(R).
#[must_use]
pub fn integrated_autocorrelation_time(series: &[f64]) -> f64 {
    let rho = autocovariance(series);
    let mut tau = 0.5;
    for r in rho.iter().skip(1) {
        if *r <= 0.0 {
            break;
        }
        tau += r;
    }
    tau
}

/// Evaluate a per-configuration functional over a batch.
#[must_use]
pub fn one_point<F>(samples: &FieldBatch, f: F) -> Vec<f64>
where
    F: Fn(&[f64]) -> f64 + Sync,
{
    samples
        .data
        .par_chunks(samples.volume())
        .map(|phi| f(phi))
        .collect()
}

/// Sample mean and bootstrap standard error of the mean.
///
/// `n_bootstrap` resamples with replacement; the returned error is the
/// standard deviation of the resampled means. A constant input gives a
/// zero error exactly.
#[must_use]
pub fn bootstrap_mean_std(values: &[f64], n_bootstrap: usize, seed: &mut u64) -> (f64, f64) {
    let n = values.len();
    if n == 0 {
        return (0.0, 0.0);
    }
    let mean = values.iter().sum::<f64>() / n as f64;
    if n_bootstrap == 0 {
        return (mean, 0.0);
    }
    let mut boot_means = Vec::with_capacity(n_bootstrap);
    for _ in 0..n_bootstrap {
        let mut sum = 0.0;
        for _ in 0..n {
            sum += values[lcg_index(seed, n)];
        }
        boot_means.push(sum / n as f64);
    }
    let bm = boot_means.iter().sum::<f64>() / n_bootstrap as f64;
    let var = boot_means.iter().map(|m| (m - bm).powi(2)).sum::<f64>() / n_bootstrap as f64;
    (mean, var.sqrt())
}

/// Volume-averaged two-point function over a subset of configurations:
/// G(δ) = ⟨φ(x) φ(x+δ)⟩ averaged over x and the given sample indices.
#[must_use]
pub fn correlator_with_indices(samples: &FieldBatch, indices: &[usize]) -> Vec<f64> {
    let lat = samples.lattice;
    let vol = lat.volume();
    let norm = (indices.len() * vol) as f64;
    (0..vol)
        .into_par_iter()
        .map(|delta| {
            let (dx, dt) = lat.site_coords(delta);
            let mut sum = 0.0;
            for &s in indices {
                let phi = samples.sample(s);
                for x in 0..lat.dims[0] {
                    for t in 0..lat.dims[1] {
                        let a = phi[lat.site_index(x, t)];
                        let b = phi[lat.shifted_index(x, t, dx as isize, dt as isize)];
                        sum += a * b;
                    }
                }
            }
            sum / norm
        })
        .collect()
}

/// Volume-averaged two-point function over all configurations.
#[must_use]
pub fn two_point_correlator(samples: &FieldBatch) -> Vec<f64> {
    let indices: Vec<usize> = (0..samples.batch).collect();
    correlator_with_indices(samples, &indices)
}

/// Observables derived from the two-point correlator.
#[derive(Clone, Debug)]
pub struct TwoPointObservables {
    /// G(δ) indexed like a field configuration (δx · T + δt).
    pub correlator: Vec<f64>,
    /// Lattice extents `[L, T]`.
    pub dims: [usize; 2],
}

impl TwoPointObservables {
    /// Measure from a batch of configurations.
    #[must_use]
    pub fn from_samples(samples: &FieldBatch) -> Self {
        Self {
            correlator: two_point_correlator(samples),
            dims: samples.lattice.dims,
        }
    }

    /// Wrap a precomputed correlator (e.g. the exact free one).
    #[must_use]
    pub const fn from_correlator(correlator: Vec<f64>, dims: [usize; 2]) -> Self {
        Self { correlator, dims }
    }

    /// Zero-momentum correlator g(t) = Σ_x G(x, t).
    #[must_use]
    pub fn zero_momentum_correlator(&self) -> Vec<f64> {
        let [l, t_len] = self.dims;
        let mut g = vec![0.0; t_len];
        for x in 0..l {
            for t in 0..t_len {
                g[t] += self.correlator[x * t_len + t];
            }
        }
        g
    }

    /// Effective pole mass m_eff(t) = acosh((g(t−1) + g(t+1)) / 2g(t)) for
    /// t = 1 .. T−2.
    ///
    /// Arguments below 1 (noisy correlators) produce NaN entries, which are
    /// surfaced rather than masked.
    #[must_use]
    pub fn effective_pole_mass(&self) -> Vec<f64> {
        let g = self.zero_momentum_correlator();
        let t_len = g.len();
        (1..t_len.saturating_sub(1))
            .map(|t| ((g[t - 1] + g[t + 1]) / (2.0 * g[t])).acosh())
            .collect()
    }

    /// Susceptibility χ = Σ_δ G(δ). Exactly 1/m² in the free theory.
    #[must_use]
    pub fn susceptibility(&self) -> f64 {
        self.correlator.iter().sum()
    }

    /// Energy density (G(1,0) + G(0,1)) / 2.
    #[must_use]
    pub fn energy_density(&self) -> f64 {
        let [_, t_len] = self.dims;
        (self.correlator[t_len] + self.correlator[1]) / 2.0
    }

    /// Low-momentum correlation-length estimator.
    ///
    /// ξ² = (G̃(0,0)/G̃(2π/L,0) − 1) / (4 sin²(π/L)). The square root of a
    /// negative estimate (possible on noisy data) is NaN; callers decide
    /// how to treat such entries.
    #[must_use]
    pub fn correlation_length(&self) -> f64 {
        let [l, t_len] = self.dims;
        let g00 = self.susceptibility();
        let mut g10 = 0.0;
        for x in 0..l {
            let c = (2.0 * PI * x as f64 / l as f64).cos();
            for t in 0..t_len {
                g10 += c * self.correlator[x * t_len + t];
            }
        }
        let s = (PI / l as f64).sin();
        let xi_sq = (g00 / g10 - 1.0) / (4.0 * s * s);
        xi_sq.sqrt()
    }
}

/// Bootstrap replicas of the two-point suite from a single chain.
#[must_use]
pub fn bootstrap_two_point(
    samples: &FieldBatch,
    n_bootstrap: usize,
    seed: &mut u64,
) -> Vec<TwoPointObservables> {
    let n = samples.batch;
    (0..n_bootstrap)
        .map(|_| {
            let indices: Vec<usize> = (0..n).map(|_| lcg_index(seed, n)).collect();
            TwoPointObservables {
                correlator: correlator_with_indices(samples, &indices),
                dims: samples.lattice.dims,
            }
        })
        .collect()
}

/// Mean and sample standard deviation (Bessel-corrected) over replica
/// values of a derived observable.
#[must_use]
pub fn replica_mean_std(values: &[f64]) -> (f64, f64) {
    let n = values.len();
    if n == 0 {
        return (0.0, 0.0);
    }
    let mean = values.iter().sum::<f64>() / n as f64;
    if n == 1 {
        return (mean, 0.0);
    }
    let var = values.iter().map(|v| (v - mean).powi(2)).sum::<f64>() / (n - 1) as f64;
    (mean, var.sqrt())
}
