// SPDX-License-Identifier: AGPL-3.0-only

//! Dense linear algebra for exact flow construction and Jacobian checks.
//!
//! Matrices are row-major `Vec<f64>` with explicit dimension `n`. Sizes here
//! are lattice volumes (V ≤ a few hundred), so unblocked O(n³) algorithms
//! are more than adequate and keep the reference implementation auditable.

use crate::error::LatticeFlowError;

/// Cholesky factorization A = L Lᵀ of a symmetric positive-definite matrix.
///
/// Returns the lower-triangular factor L (row-major, upper part zeroed).
///
/// # Errors
///
/// [`LatticeFlowError::ShapeMismatch`] if `a` is not n × n;
/// [`LatticeFlowError::NotPositiveDefinite`] with the offending row if a
/// pivot is non-positive.
pub fn cholesky(a: &[f64], n: usize) -> Result<Vec<f64>, LatticeFlowError> {
    if a.len() != n * n {
        return Err(LatticeFlowError::ShapeMismatch {
            expected: n * n,
            found: a.len(),
        });
    }
    let mut l = vec![0.0; n * n];
    for i in 0..n {
        for j in 0..=i {
            let mut sum = a[i * n + j];
            for k in 0..j {
                sum -= l[i * n + k] * l[j * n + k];
            }
            if i == j {
                if sum <= 0.0 {
                    return Err(LatticeFlowError::NotPositiveDefinite(i));
                }
                l[i * n + i] = sum.sqrt();
            } else {
                l[i * n + j] = sum / l[j * n + j];
            }
        }
    }
    Ok(l)
}

/// Solve L x = b in place for lower-triangular L (forward substitution).
///
/// # Errors
///
/// [`LatticeFlowError::ShapeMismatch`] on inconsistent lengths;
/// [`LatticeFlowError::SingularMatrix`] if a diagonal entry vanishes.
pub fn forward_substitute(l: &[f64], n: usize, b: &mut [f64]) -> Result<(), LatticeFlowError> {
    if l.len() != n * n || b.len() != n {
        return Err(LatticeFlowError::ShapeMismatch {
            expected: n * n,
            found: l.len(),
        });
    }
    for i in 0..n {
        let mut sum = b[i];
        for j in 0..i {
            sum -= l[i * n + j] * b[j];
        }
        let d = l[i * n + i];
        if d == 0.0 {
            return Err(LatticeFlowError::SingularMatrix);
        }
        b[i] = sum / d;
    }
    Ok(())
}

/// ln|det A| via partial-pivot LU factorization.
///
/// # Errors
///
/// [`LatticeFlowError::ShapeMismatch`] if `a` is not n × n;
/// [`LatticeFlowError::SingularMatrix`] if no usable pivot remains.
pub fn lu_log_abs_det(a: &[f64], n: usize) -> Result<f64, LatticeFlowError> {
    if a.len() != n * n {
        return Err(LatticeFlowError::ShapeMismatch {
            expected: n * n,
            found: a.len(),
        });
    }
    let mut m = a.to_vec();
    let mut log_det = 0.0;
    for col in 0..n {
        // Partial pivot: largest magnitude on or below the diagonal.
        let mut pivot_row = col;
        let mut pivot_val = m[col * n + col].abs();
        for row in (col + 1)..n {
            let v = m[row * n + col].abs();
            if v > pivot_val {
                pivot_val = v;
                pivot_row = row;
            }
        }
        if pivot_val == 0.0 {
            return Err(LatticeFlowError::SingularMatrix);
        }
        if pivot_row != col {
            for k in 0..n {
                m.swap(col * n + k, pivot_row * n + k);
            }
        }
        let pivot = m[col * n + col];
        log_det += pivot.abs().ln();
        for row in (col + 1)..n {
            let factor = m[row * n + col] / pivot;
            m[row * n + col] = factor;
            for k in (col + 1)..n {
                m[row * n + k] -= factor * m[col * n + k];
            }
        }
    }
    Ok(log_det)
}

/// Multiply y = A x for a row-major n × n matrix.
#[must_use]
pub fn matvec(a: &[f64], n: usize, x: &[f64]) -> Vec<f64> {
    let mut y = vec![0.0; n];
    for i in 0..n {
        let row = &a[i * n..(i + 1) * n];
        y[i] = row.iter().zip(x.iter()).map(|(aij, xj)| aij * xj).sum();
    }
    y
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::tolerances;

    #[test]
    fn cholesky_of_identity_is_identity() {
        let n = 4;
        let mut a = vec![0.0; n * n];
        for i in 0..n {
            a[i * n + i] = 1.0;
        }
        let l = cholesky(&a, n).expect("identity is SPD");
        assert_eq!(l, a);
    }

    #[test]
    fn cholesky_reconstructs_matrix() {
        // SPD by construction: A = B Bᵀ + I for a fixed B.
        let n = 3;
        let b = [1.0, 0.5, -0.3, 0.2, 1.5, 0.4, -0.7, 0.1, 0.9];
        let mut a = vec![0.0; n * n];
        for i in 0..n {
            for j in 0..n {
                let mut s = f64::from(u8::from(i == j));
                for k in 0..n {
                    s += b[i * n + k] * b[j * n + k];
                }
                a[i * n + j] = s;
            }
        }
        let l = cholesky(&a, n).expect("SPD");
        for i in 0..n {
            for j in 0..n {
                let mut s = 0.0;
                for k in 0..n {
                    s += l[i * n + k] * l[j * n + k];
                }
                assert!(
                    (s - a[i * n + j]).abs() < tolerances::EXACT_F64,
                    "LLᵀ[{i}][{j}] = {s} should equal A = {}",
                    a[i * n + j]
                );
            }
        }
    }

    #[test]
    fn cholesky_rejects_indefinite() {
        let a = [1.0, 2.0, 2.0, 1.0]; // eigenvalues 3, -1
        let err = cholesky(&a, 2).unwrap_err();
        assert!(matches!(err, LatticeFlowError::NotPositiveDefinite(_)));
    }

    #[test]
    fn forward_substitute_solves_lower_system() {
        let n = 3;
        let l = [2.0, 0.0, 0.0, 1.0, 3.0, 0.0, -1.0, 0.5, 4.0];
        let x_true = [1.0, -2.0, 0.5];
        let mut b = matvec(&l, n, &x_true);
        forward_substitute(&l, n, &mut b).expect("nonsingular");
        for (got, want) in b.iter().zip(x_true.iter()) {
            assert!((got - want).abs() < tolerances::EXACT_F64, "{got} vs {want}");
        }
    }

    #[test]
    fn lu_log_det_diagonal() {
        let a = [3.0, 0.0, 0.0, 0.0, 5.0, 0.0, 0.0, 0.0, 2.0];
        let ld = lu_log_abs_det(&a, 3).expect("nonsingular");
        let expected = 30.0_f64.ln();
        assert!((ld - expected).abs() < tolerances::EXACT_F64, "{ld} vs {expected}");
    }

    #[test]
    fn lu_log_det_handles_permutation() {
        // Row-swapped identity: |det| = 1, log = 0.
        let a = [0.0, 1.0, 1.0, 0.0];
        let ld = lu_log_abs_det(&a, 2).expect("nonsingular");
        assert!(ld.abs() < tolerances::EXACT_F64, "log|det| should be 0, got {ld}");
    }

    #[test]
    fn lu_detects_singular() {
        let a = [1.0, 2.0, 2.0, 4.0];
        let err = lu_log_abs_det(&a, 2).unwrap_err();
        assert!(matches!(err, LatticeFlowError::SingularMatrix));
    }

    #[test]
    fn shape_mismatch_reported() {
        let a = [1.0, 2.0, 3.0];
        assert!(matches!(
            cholesky(&a, 2),
            Err(LatticeFlowError::ShapeMismatch { expected: 4, found: 3 })
        ));
    }
}
