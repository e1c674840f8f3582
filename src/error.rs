// SPDX-License-Identifier: AGPL-3.0-only

//! Typed errors for flow construction, linear algebra, and run I/O.
//!
//! Public APIs return this enum instead of `Result<_, String>` so callers
//! can pattern-match on the failure mode (bad configuration, shape
//! mismatch, non-positive-definite covariance) rather than parsing
//! opaque strings.

use std::fmt;

/// Errors arising from flow construction, sampling, or configuration I/O.
#[derive(Debug)]
pub enum LatticeFlowError {
    /// Run-configuration file loading or parsing failed (path, cause).
    ConfigLoad(String),

    /// A parameter violates its documented domain (description).
    InvalidParameter(String),

    /// A buffer length does not match the expected lattice volume or
    /// parameter count.
    ShapeMismatch {
        /// Length the operation requires.
        expected: usize,
        /// Length actually supplied.
        found: usize,
    },

    /// Cholesky factorization hit a non-positive pivot (row index).
    NotPositiveDefinite(usize),

    /// LU factorization found the matrix singular to working precision.
    SingularMatrix,
}

impl fmt::Display for LatticeFlowError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::ConfigLoad(msg) => write!(f, "Config loading failed: {msg}"),
            Self::InvalidParameter(msg) => write!(f, "Invalid parameter: {msg}"),
            Self::ShapeMismatch { expected, found } => {
                write!(f, "Shape mismatch: expected length {expected}, found {found}")
            }
            Self::NotPositiveDefinite(row) => {
                write!(f, "Matrix not positive definite: non-positive pivot at row {row}")
            }
            Self::SingularMatrix => write!(f, "Matrix is singular to working precision"),
        }
    }
}

impl std::error::Error for LatticeFlowError {}

impl From<std::io::Error> for LatticeFlowError {
    fn from(e: std::io::Error) -> Self {
        Self::ConfigLoad(e.to_string())
    }
}
