// SPDX-License-Identifier: AGPL-3.0-only

//! Pointwise affine transform applied by the coupling layers.
//!
//! Each active site is mapped by y = e^s · z + t where the parameters
//! (s, t) come from a conditioner network evaluated on frozen sites only.
//! The log-gradient contribution of a site is s, summed over active sites
//! into the per-sample log-det-Jacobian.

/// Which affine parameters the transform uses.
#[derive(Clone, Copy, Debug, Default, Eq, PartialEq)]
pub enum AffineMode {
    /// Scale and shift.
    #[default]
    Full,
    /// Shift only (s forced to 0, unit Jacobian).
    ShiftOnly,
    /// Rescale only (t forced to 0).
    RescaleOnly,
}

/// Pointwise affine map y = e^s z + t with mode-restricted parameters.
#[derive(Clone, Copy, Debug, Default)]
pub struct AffineTransform {
    /// Parameter restriction.
    pub mode: AffineMode,
}

impl AffineTransform {
    /// Number of raw parameters the conditioner produces per site.
    pub const N_PARAMS: usize = 2;

    /// Effective (s, t) after applying the mode restriction.
    #[inline]
    #[must_use]
    pub fn effective_params(&self, params: [f64; 2]) -> (f64, f64) {
        match self.mode {
            AffineMode::Full => (params[0], params[1]),
            AffineMode::ShiftOnly => (0.0, params[1]),
            AffineMode::RescaleOnly => (params[0], 0.0),
        }
    }

    /// Forward map: returns (y, log-gradient).
    #[inline]
    #[must_use]
    pub fn forward(&self, z: f64, params: [f64; 2]) -> (f64, f64) {
        let (s, t) = self.effective_params(params);
        (s.exp().mul_add(z, t), s)
    }

    /// Inverse map: returns (z, log-gradient of the inverse).
    #[inline]
    #[must_use]
    pub fn inverse(&self, y: f64, params: [f64; 2]) -> (f64, f64) {
        let (s, t) = self.effective_params(params);
        ((y - t) * (-s).exp(), -s)
    }
}
