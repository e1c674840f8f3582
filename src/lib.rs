// SPDX-License-Identifier: AGPL-3.0-only

//! latticeflow — scalar lattice field theory with normalizing-flow sampling.
//!
//! CPU reference implementation of flow-based sampling for the φ⁴ scalar
//! field on a two-dimensional periodic lattice. A normalizing flow maps a
//! Gaussian base distribution to an approximation of the Boltzmann weight
//! e^{−S(φ)}; exact importance weights then correct the approximation, either
//! by reweighting or through a Metropolis independence chain.
//!
//! | Component | Role |
//! |-----------|------|
//! | State | Real scalar field φ(x) on an L×T lattice |
//! | Target | φ⁴ action, free (Gaussian) theory at λ = 0 |
//! | Proposal | Invertible flow from N(0, 1) noise |
//! | Correction | Importance weights / Metropolis accept-reject |
//! | Observables | Correlators, susceptibility, pole mass, ξ |
//!
//! # Modules
//!
//! | Module | Purpose |
//! |--------|---------|
//! | `lattice` | 2D periodic lattice, checkerboard partition, stencils |
//! | `action` | φ⁴ action, Gaussian base action, exact free covariance |
//! | `flow` | Invertible layers, affine transforms, composition |
//! | `nn` | Seeded dense networks conditioning the coupling layers |
//! | `model` | Base + flow + target with importance log-weights |
//! | `sampler` | Metropolis independence sampler on flow proposals |
//! | `observables` | Autocorrelation, one- and two-point estimators |
//! | `jacobian` | Finite-difference Jacobian and log-det cross-checks |
//! | `linalg` | Dense Cholesky, forward substitution, LU log-det |
//! | `validation` | Check harness for the validation binaries |
//!
//! # Validation binaries
//!
//! - `validate_free_flow` — exact Cholesky flow on the free theory: unit
//!   acceptance, unit ESS, χ = 1/m², ξ = 1/m, cosh pole mass
//! - `production_flow_scan` — case-matrix sampling runs with JSON records
//!
//! # References
//!
//! - Albergo, Kanwar & Shanahan, PRD 100, 034515 (2019) — flow-based MCMC
//!   for lattice φ⁴
//! - Caracciolo et al., PRD 58, 105007 (1998) — low-momentum ξ estimator
//! - Duane et al., PLB 195, 216 (1987) — Metropolis-corrected proposals

pub mod action;
pub mod config;
pub mod constants;
pub mod error;
pub mod flow;
pub mod jacobian;
pub mod lattice;
pub mod linalg;
pub mod model;
pub mod nn;
pub mod observables;
pub mod provenance;
pub mod report;
pub mod sampler;
pub mod tolerances;
pub mod validation;
