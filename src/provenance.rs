// SPDX-License-Identifier: AGPL-3.0-only

//! Provenance of the analytic baselines used by the validation binaries.
//!
//! Every expected value checked by `validate_free_flow` is an exact
//! identity of the free lattice theory, not a fitted or simulated number.
//! This module records each identity with its literature source so the
//! validation chain is auditable:
//!
//! ```text
//! analytic identity → reference → Rust check
//! ```
//!
//! | Identity | Source |
//! |----------|--------|
//! | χ = G̃(0) = 1/m² | textbook free propagator |
//! | ξ (low-momentum estimator) = 1/m | Caracciolo et al., PRD 58, 105007 |
//! | m_pole = 2 asinh(m/2) | lattice dispersion relation |
//! | exact flow ⇒ constant log w | Albergo et al., PRD 100, 034515 |

/// A single analytic baseline with its literature source.
#[derive(Debug, Clone)]
pub struct AnalyticBaseline {
    /// Human-readable label used in harness check names.
    pub label: &'static str,
    /// The identity being relied on, in closed form.
    pub identity: &'static str,
    /// Literature reference.
    pub reference: &'static str,
    /// DOI where one exists.
    pub doi: &'static str,
}

/// Free-theory susceptibility: the zero-momentum propagator.
pub const FREE_SUSCEPTIBILITY: AnalyticBaseline = AnalyticBaseline {
    label: "free susceptibility",
    identity: "chi = G~(0) = 1/m^2",
    reference: "free lattice propagator, e.g. Montvay & Münster, \
                \"Quantum Fields on a Lattice\" (1994), Ch. 2",
    doi: "10.1017/CBO9780511470783",
};

/// Low-momentum correlation-length estimator, exact on the free correlator.
pub const CORRELATION_LENGTH_ESTIMATOR: AnalyticBaseline = AnalyticBaseline {
    label: "second-moment xi",
    identity: "xi^2 = (G~(0)/G~(2pi/L) - 1) / (4 sin^2(pi/L)) = 1/m^2",
    reference: "Caracciolo, Edwards, Pelissetto & Sokal, PRD 58, 105007 (1998)",
    doi: "10.1103/PhysRevD.58.105007",
};

/// Cosh pole mass of the free lattice propagator.
pub const FREE_POLE_MASS: AnalyticBaseline = AnalyticBaseline {
    label: "free pole mass",
    identity: "m_pole = 2 asinh(m/2), from 4 sinh^2(m_pole/2) = m^2",
    reference: "lattice dispersion relation; Gattringer & Lang, \
                \"QCD on the Lattice\" (2010), Ch. 6",
    doi: "10.1007/978-3-642-01850-3",
};

/// Exactness condition for flow-based sampling: a flow that maps the base
/// onto the target has constant importance weights, hence unit acceptance.
pub const EXACT_FLOW_WEIGHTS: AnalyticBaseline = AnalyticBaseline {
    label: "exact flow weights",
    identity: "phi = L z with L L^T = K^{-1} gives log w = log det L (const)",
    reference: "Albergo, Kanwar & Shanahan, PRD 100, 034515 (2019)",
    doi: "10.1103/PhysRevD.100.034515",
};

/// All baselines in citation order, for the validation binary preamble.
pub const ALL_BASELINES: [&AnalyticBaseline; 4] = [
    &FREE_SUSCEPTIBILITY,
    &CORRELATION_LENGTH_ESTIMATOR,
    &FREE_POLE_MASS,
    &EXACT_FLOW_WEIGHTS,
];
