//! Conversion between limits-of-agreement and measurement sigma.
//!
//! A method's repeatability is often published as the half-width of the 95%
//! limits of agreement (LoA) between two measurements of the same sample.
//! With two i.i.d. readings of noise σ the difference has sd `σ·√2`, so
//!
//! ```text
//! loa_half = 1.96 · √2 · σ
//! ```

use std::f64::consts::SQRT_2;

use crate::error::{Result, UncertaintyError};

/// Two-sided 95% normal critical value used by the LoA convention.
pub const Z_95: f64 = 1.96;

/// σ from a 95% LoA half-width: `loa_half / (1.96·√2)`.
///
/// # Errors
/// `InvalidParameter` unless `loa_half > 0`.
///
/// # Examples
/// ```
/// use sodium_uncertainty::variability::loa_half_to_sigma;
/// let sigma = loa_half_to_sigma(3.0).unwrap();
/// assert!((sigma - 1.0823).abs() < 1e-4);
/// ```
pub fn loa_half_to_sigma(loa_half: f64) -> Result<f64> {
    if !loa_half.is_finite() || loa_half <= 0.0 {
        return Err(UncertaintyError::invalid(
            "LoA half-width must be positive.",
        ));
    }
    Ok(loa_half / (Z_95 * SQRT_2))
}

/// 95% LoA half-width from σ: `1.96·√2·σ`.
///
/// # Errors
/// `InvalidParameter` unless `sigma > 0`.
pub fn sigma_to_loa_half(sigma: f64) -> Result<f64> {
    if !sigma.is_finite() || sigma <= 0.0 {
        return Err(UncertaintyError::invalid("Sigma must be positive."));
    }
    Ok(Z_95 * SQRT_2 * sigma)
}

/// Standard deviation of a paired difference implied by a LoA half-width.
pub fn loa_half_to_sd_diff(loa_half: f64) -> f64 {
    loa_half / Z_95
}

/// Noise sd of `y2 − y1` for independent readings: `√(σ1² + σ2²)`.
pub fn combined_noise_sd(sigma1: f64, sigma2: f64) -> f64 {
    sigma1.hypot(sigma2)
}
