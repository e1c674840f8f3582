// SPDX-License-Identifier: AGPL-3.0-only

//! Run configuration: JSON loading, validation, and the scan case matrix.
//!
//! A run configuration fixes the target theory (L, m², λ), the chain
//! length, and the flow architecture. Configurations come either from a
//! JSON file (streaming `from_reader`) or from the built-in free-scalar
//! case matrix used by `production_flow_scan`.

use serde::Deserialize;
use std::fs::File;
use std::io::BufReader;
use std::path::Path;

use crate::action::Phi4Action;
use crate::error::LatticeFlowError;
use crate::flow::{Composition, StencilCoupling, TriangularLinear};
use crate::lattice::Lattice2d;
use crate::linalg::cholesky;
use crate::model::FlowModel;
use crate::sampler::SamplerConfig;

/// Flow architecture parameters.
#[derive(Debug, Clone, Deserialize)]
pub struct FlowSpec {
    /// Checkerboard coupling-layer pairs (2 layers per block).
    #[serde(default = "default_n_blocks")]
    pub n_blocks: usize,
    /// Stencil radius of the coupling conditioners.
    #[serde(default = "default_radius")]
    pub radius: usize,
    /// Hidden widths of the pointwise conditioner networks.
    #[serde(default = "default_hidden")]
    pub hidden: Vec<usize>,
}

fn default_n_blocks() -> usize {
    2
}
fn default_radius() -> usize {
    1
}
fn default_hidden() -> Vec<usize> {
    vec![8, 8]
}

impl Default for FlowSpec {
    fn default() -> Self {
        Self {
            n_blocks: default_n_blocks(),
            radius: default_radius(),
            hidden: default_hidden(),
        }
    }
}

/// One sampling run: target theory, chain length, flow architecture.
#[derive(Debug, Clone, Deserialize)]
pub struct RunConfig {
    /// Case label used in reports and filenames.
    pub label: String,
    /// Lattice extent (square lattice, must be even).
    pub lattice_length: usize,
    /// Bare mass squared (must be positive).
    pub m_sq: f64,
    /// Quartic coupling (0 = free theory).
    #[serde(default)]
    pub lambda: f64,
    /// Recorded chain length.
    #[serde(default = "default_n_samples")]
    pub n_samples: usize,
    /// Discarded thermalization steps.
    #[serde(default = "default_n_thermalization")]
    pub n_thermalization: usize,
    /// Seed for flow init, proposals, and accept-reject draws.
    #[serde(default = "default_seed")]
    pub seed: u64,
    /// Flow architecture.
    #[serde(default)]
    pub flow: FlowSpec,
}

fn default_n_samples() -> usize {
    2000
}
fn default_n_thermalization() -> usize {
    200
}
fn default_seed() -> u64 {
    42
}

impl RunConfig {
    /// Check parameter domains.
    ///
    /// # Errors
    ///
    /// [`LatticeFlowError::InvalidParameter`] on an odd or zero lattice
    /// extent, non-positive m², negative λ, or an empty chain.
    pub fn validate(&self) -> Result<(), LatticeFlowError> {
        if self.lattice_length == 0 || self.lattice_length % 2 != 0 {
            return Err(LatticeFlowError::InvalidParameter(format!(
                "lattice_length must be even and positive, got {}",
                self.lattice_length
            )));
        }
        if self.m_sq <= 0.0 {
            return Err(LatticeFlowError::InvalidParameter(format!(
                "m_sq must be positive, got {}",
                self.m_sq
            )));
        }
        if self.lambda < 0.0 {
            return Err(LatticeFlowError::InvalidParameter(format!(
                "lambda must be non-negative, got {}",
                self.lambda
            )));
        }
        if self.n_samples == 0 {
            return Err(LatticeFlowError::InvalidParameter(
                "n_samples must be positive".into(),
            ));
        }
        Ok(())
    }

    /// Lattice shape.
    #[must_use]
    pub const fn lattice(&self) -> Lattice2d {
        Lattice2d::square(self.lattice_length)
    }

    /// Target action.
    #[must_use]
    pub const fn action(&self) -> Phi4Action {
        Phi4Action {
            m_sq: self.m_sq,
            lambda: self.lambda,
            lattice: self.lattice(),
        }
    }

    /// Sampler parameters for this run.
    #[must_use]
    pub fn sampler_config(&self, verbose: bool) -> SamplerConfig {
        SamplerConfig {
            n_samples: self.n_samples,
            n_thermalization: self.n_thermalization,
            batch_size: 64,
            seed: self.seed,
            verbose,
        }
    }

    /// Stencil-coupling flow per the architecture spec: 2·`n_blocks`
    /// layers with alternating checkerboard parity, conditioners seeded
    /// from the run seed.
    #[must_use]
    pub fn build_stencil_flow(&self) -> Composition {
        let lat = self.lattice();
        let mut seed = self.seed;
        let mut flow = Composition::new();
        for layer_id in 0..2 * self.flow.n_blocks {
            flow.push(Box::new(StencilCoupling::new(
                lat,
                self.flow.radius,
                layer_id,
                &self.flow.hidden,
                &mut seed,
            )));
        }
        flow
    }

    /// Exact free-theory flow: the triangular Cholesky factor of the free
    /// covariance.
    ///
    /// # Errors
    ///
    /// [`LatticeFlowError::InvalidParameter`] if λ ≠ 0 (no exact flow) or
    /// m² ≤ 0; factorization errors propagate.
    pub fn build_exact_free_flow(&self) -> Result<Composition, LatticeFlowError> {
        if self.lambda != 0.0 {
            return Err(LatticeFlowError::InvalidParameter(format!(
                "exact flow exists only for the free theory, got lambda = {}",
                self.lambda
            )));
        }
        let act = self.action();
        let vol = self.lattice().volume();
        let sigma = act.free_covariance()?;
        let l = cholesky(&sigma, vol)?;
        let mut flow = Composition::new();
        flow.push(Box::new(TriangularLinear::from_cholesky(&l, vol)?));
        Ok(flow)
    }

    /// Model with the exact free flow when λ = 0, otherwise the stencil
    /// flow.
    ///
    /// # Errors
    ///
    /// Propagates [`Self::build_exact_free_flow`] failures.
    pub fn build_model(&self) -> Result<FlowModel, LatticeFlowError> {
        let flow = if self.lambda == 0.0 {
            self.build_exact_free_flow()?
        } else {
            self.build_stencil_flow()
        };
        Ok(FlowModel::new(self.action(), flow))
    }
}

/// Load a run configuration from a JSON file.
///
/// Streams with `from_reader` to avoid buffering the file as a string.
///
/// # Errors
///
/// [`LatticeFlowError::ConfigLoad`] on I/O or parse failure; parameter
/// domain errors from [`RunConfig::validate`].
pub fn load_run_config(path: &Path) -> Result<RunConfig, LatticeFlowError> {
    let file = File::open(path)
        .map_err(|e| LatticeFlowError::ConfigLoad(format!("{}: {e}", path.display())))?;
    let config: RunConfig = serde_json::from_reader(BufReader::new(file))
        .map_err(|e| LatticeFlowError::ConfigLoad(format!("{}: {e}", path.display())))?;
    config.validate()?;
    Ok(config)
}

/// Free-scalar scan matrix: three masses per lattice size.
///
/// The masses bracket correlation lengths ξ = 1/m of 2, 1, and 0.5 lattice
/// units, keeping ξ ≪ L so the low-momentum estimator stays in its window.
#[must_use]
pub fn free_scalar_cases(lite: bool) -> Vec<RunConfig> {
    let (sizes, n_samples): (&[usize], usize) = if lite {
        (&[8], 2000)
    } else {
        (&[8, 16], 5000)
    };

    let mut cases = Vec::new();
    for &l in sizes {
        for &m_sq in &[0.25, 1.0, 4.0] {
            cases.push(RunConfig {
                label: format!("L{l}_msq{m_sq}"),
                lattice_length: l,
                m_sq,
                lambda: 0.0,
                n_samples,
                n_thermalization: 200,
                seed: 42,
                flow: FlowSpec::default(),
            });
        }
    }
    cases
}
