// SPDX-License-Identifier: AGPL-3.0-only

//! Check harness for the validation binaries.
//!
//! Every validation binary follows the same pattern: analytic expected
//! values (see `provenance`), explicit pass/fail checks against the
//! tolerances module, a machine-readable summary on stdout, and exit code
//! 0 only if every check passed.

use std::process;

/// How a threshold is applied to a check.
#[derive(Clone, Copy, Debug)]
pub enum CheckKind {
    /// |observed − expected| < tolerance.
    Absolute,
    /// |observed − expected| / |expected| < tolerance.
    Relative,
    /// observed < threshold.
    UpperBound,
    /// observed > threshold.
    LowerBound,
    /// |observed − expected| < n·σ (statistical).
    Sigma,
}

impl std::fmt::Display for CheckKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Absolute => write!(f, "abs"),
            Self::Relative => write!(f, "rel"),
            Self::UpperBound => write!(f, "<"),
            Self::LowerBound => write!(f, ">"),
            Self::Sigma => write!(f, "nσ"),
        }
    }
}

/// One recorded check.
#[derive(Clone, Debug)]
#[allow(missing_docs)]
pub struct Check {
    pub label: String,
    pub passed: bool,
    pub observed: f64,
    pub expected: f64,
    pub tolerance: f64,
    pub kind: CheckKind,
}

/// Accumulates checks and reports a summary with an exit code.
#[derive(Debug, Default)]
#[must_use]
pub struct CheckHarness {
    /// Validation binary name, printed in the summary header.
    pub name: String,
    /// All recorded checks, in order.
    pub checks: Vec<Check>,
}

impl CheckHarness {
    /// New harness for a named validation binary.
    #[must_use]
    pub fn new(name: &str) -> Self {
        Self {
            name: name.to_string(),
            checks: Vec::new(),
        }
    }

    fn record(&mut self, label: &str, passed: bool, observed: f64, expected: f64, tol: f64, kind: CheckKind) {
        self.checks.push(Check {
            label: label.to_string(),
            passed,
            observed,
            expected,
            tolerance: tol,
            kind,
        });
    }

    /// |observed − expected| < tolerance.
    pub fn check_abs(&mut self, label: &str, observed: f64, expected: f64, tolerance: f64) {
        let passed = (observed - expected).abs() < tolerance;
        self.record(label, passed, observed, expected, tolerance, CheckKind::Absolute);
    }

    /// |observed − expected| / |expected| < tolerance, falling back to the
    /// absolute form when expected is zero.
    pub fn check_rel(&mut self, label: &str, observed: f64, expected: f64, tolerance: f64) {
        let passed = if expected.abs() > f64::EPSILON {
            ((observed - expected) / expected).abs() < tolerance
        } else {
            observed.abs() < tolerance
        };
        self.record(label, passed, observed, expected, tolerance, CheckKind::Relative);
    }

    /// observed < threshold.
    pub fn check_upper(&mut self, label: &str, observed: f64, threshold: f64) {
        self.record(label, observed < threshold, observed, threshold, threshold, CheckKind::UpperBound);
    }

    /// observed > threshold.
    pub fn check_lower(&mut self, label: &str, observed: f64, threshold: f64) {
        self.record(label, observed > threshold, observed, threshold, threshold, CheckKind::LowerBound);
    }

    /// |observed − expected| < n·σ for a statistical estimate with error σ.
    ///
    /// σ is floored at machine epsilon so a zero bootstrap error (constant
    /// resamples) still yields a meaningful exact comparison.
    pub fn check_sigma(&mut self, label: &str, observed: f64, expected: f64, sigma: f64, n_sigma: f64) {
        let bound = n_sigma * sigma.max(f64::EPSILON);
        let passed = (observed - expected).abs() < bound;
        self.record(label, passed, observed, expected, bound, CheckKind::Sigma);
    }

    /// Record a boolean condition.
    pub fn check_bool(&mut self, label: &str, passed: bool) {
        self.record(label, passed, f64::from(u8::from(passed)), 1.0, 0.0, CheckKind::Absolute);
    }

    /// Number of passed checks.
    #[must_use]
    pub fn passed_count(&self) -> usize {
        self.checks.iter().filter(|c| c.passed).count()
    }

    /// Whether every check passed.
    #[must_use]
    pub fn all_passed(&self) -> bool {
        self.checks.iter().all(|c| c.passed)
    }

    /// Render the summary block.
    #[must_use]
    pub fn summary(&self) -> String {
        use std::fmt::Write;
        let mut s = String::new();
        let _ = writeln!(
            s,
            "═══ {}: {}/{} checks passed ═══",
            self.name,
            self.passed_count(),
            self.checks.len()
        );
        for c in &self.checks {
            let icon = if c.passed { "✓" } else { "✗" };
            let _ = writeln!(
                s,
                "  {icon} {}: observed={:.6e}, expected={:.6e}, tol={:.2e} ({})",
                c.label, c.observed, c.expected, c.tolerance, c.kind
            );
        }
        s
    }

    /// Print the summary and exit: 0 if all checks passed, 1 otherwise.
    pub fn finish(&self) -> ! {
        println!();
        print!("{}", self.summary());
        if self.all_passed() {
            println!("ALL CHECKS PASSED");
            process::exit(0);
        }
        let failed: Vec<&str> = self
            .checks
            .iter()
            .filter(|c| !c.passed)
            .map(|c| c.label.as_str())
            .collect();
        println!("FAILED CHECKS: {}", failed.join(", "));
        process::exit(1);
    }
}
