//! Special mathematical functions.
//!
//! Numerical approximations of the error function and the standard
//! normal density, distribution and quantile functions. Everything else in
//! the crate evaluates the normal distribution through these.

use std::f64::consts::FRAC_1_SQRT_2;

/// 1/√(2π) ≈ 0.3989422804014327
const FRAC_1_SQRT_2PI: f64 = 0.3989422804014326779399460599343818684758586311649;

/// Newton steps applied on top of the rational quantile approximation.
const QUANTILE_POLISH_STEPS: usize = 2;

/// Approximation of the error function.
///
/// ```text
/// erf(x) = (2/√π) ∫₀ˣ exp(-t²) dt
/// ```
///
/// # Algorithm
/// Abramowitz & Stegun formula 7.1.26, maximum absolute error < 1.5 × 10⁻⁷.
/// Odd symmetry is exact: `erf(-x) == -erf(x)`.
///
/// # Examples
/// ```
/// use sodium_uncertainty::special::erf;
/// assert!(erf(0.0).abs() < 1e-7);
/// assert!((erf(1.0) - 0.8427007929).abs() < 1e-6);
/// ```
pub fn erf(x: f64) -> f64 {
    if x.is_nan() {
        return f64::NAN;
    }
    let sign = if x >= 0.0 { 1.0 } else { -1.0 };
    sign * (1.0 - erfc_positive(x.abs()))
}

/// Complementary error function erfc(x) = 1 − erf(x).
///
/// For `x ≥ 0` the tail is evaluated directly instead of as `1.0 - erf(x)`,
/// so small tail probabilities keep their relative precision.
///
/// # Examples
/// ```
/// use sodium_uncertainty::special::erfc;
/// assert!((erfc(0.0) - 1.0).abs() < 1e-7);
/// assert!((erfc(3.0)).abs() < 0.001);
/// assert!((erfc(-3.0) - 2.0).abs() < 0.001);
/// ```
pub fn erfc(x: f64) -> f64 {
    if x.is_nan() {
        return f64::NAN;
    }
    if x >= 0.0 {
        erfc_positive(x)
    } else {
        2.0 - erfc_positive(-x)
    }
}

/// A&S 7.1.26 tail term `t·P(t)·exp(-x²)` for `x ≥ 0`.
fn erfc_positive(x: f64) -> f64 {
    const P: f64 = 0.3275911;
    const A1: f64 = 0.254829592;
    const A2: f64 = -0.284496736;
    const A3: f64 = 1.421413741;
    const A4: f64 = -1.453152027;
    const A5: f64 = 1.061405429;

    let t = 1.0 / (1.0 + P * x);
    let poly = t * (A1 + t * (A2 + t * (A3 + t * (A4 + t * A5))));
    poly * (-x * x).exp()
}

/// Standard normal CDF Φ(x) = P(Z ≤ x) for Z ~ N(0,1).
///
/// # Algorithm
/// `Φ(x) = ½·(1 + erf(x/√2))`. The lower tail is taken from [`erfc`]
/// so that `Φ(-8)` does not collapse to zero through cancellation.
///
/// # Examples
/// ```
/// use sodium_uncertainty::special::standard_normal_cdf;
/// assert!((standard_normal_cdf(0.0) - 0.5).abs() < 1e-7);
/// assert!((standard_normal_cdf(1.96) - 0.975).abs() < 1e-4);
/// ```
pub fn standard_normal_cdf(x: f64) -> f64 {
    if x.is_nan() {
        return f64::NAN;
    }
    if x == f64::INFINITY {
        return 1.0;
    }
    if x == f64::NEG_INFINITY {
        return 0.0;
    }

    if x >= 0.0 {
        0.5 * (1.0 + erf(x * FRAC_1_SQRT_2))
    } else {
        0.5 * erfc(-x * FRAC_1_SQRT_2)
    }
}

/// Standard normal PDF φ(x) = (1/√(2π)) exp(-x²/2).
///
/// # Examples
/// ```
/// use sodium_uncertainty::special::standard_normal_pdf;
/// let peak = standard_normal_pdf(0.0);
/// assert!((peak - 0.3989422804014327).abs() < 1e-15);
/// ```
pub fn standard_normal_pdf(x: f64) -> f64 {
    if x.is_nan() {
        return f64::NAN;
    }
    FRAC_1_SQRT_2PI * (-0.5 * x * x).exp()
}

/// Inverse standard normal CDF (quantile function).
///
/// Given a probability `p ∈ (0, 1)`, returns `z` such that `Φ(z) = p`.
///
/// # Algorithm
/// Abramowitz & Stegun formula 26.2.23 gives a starting point with
/// absolute error < 4.5 × 10⁻⁴. Two Newton steps against
/// [`standard_normal_cdf`] then bring the error down to the accuracy of
/// the CDF itself (≈ 10⁻⁶ in `z` for the usual CI levels).
///
/// # Returns
/// - `f64::NAN` if `p` is outside `[0, 1]` or NaN.
/// - `f64::NEG_INFINITY` if `p == 0.0`.
/// - `f64::INFINITY` if `p == 1.0`.
///
/// # Examples
/// ```
/// use sodium_uncertainty::special::inverse_normal_cdf;
/// assert!((inverse_normal_cdf(0.5)).abs() < 1e-6);
/// assert!((inverse_normal_cdf(0.975) - 1.959964).abs() < 1e-4);
/// ```
pub fn inverse_normal_cdf(p: f64) -> f64 {
    if p.is_nan() || !(0.0..=1.0).contains(&p) {
        return f64::NAN;
    }
    if p == 0.0 {
        return f64::NEG_INFINITY;
    }
    if p == 1.0 {
        return f64::INFINITY;
    }

    // Work in the lower tail; reflect at the end.
    let (q, upper) = if p > 0.5 { (1.0 - p, true) } else { (p, false) };

    // A&S 26.2.23: t = √(-2 ln(q))
    let t = (-2.0 * q.ln()).sqrt();

    const C0: f64 = 2.515517;
    const C1: f64 = 0.802853;
    const C2: f64 = 0.010328;
    const D1: f64 = 1.432788;
    const D2: f64 = 0.189269;
    const D3: f64 = 0.001308;

    let mut z = -(t - (C0 + C1 * t + C2 * t * t) / (1.0 + D1 * t + D2 * t * t + D3 * t * t * t));

    for _ in 0..QUANTILE_POLISH_STEPS {
        let density = standard_normal_pdf(z);
        if density < f64::MIN_POSITIVE {
            break;
        }
        z -= (standard_normal_cdf(z) - q) / density;
    }

    if upper {
        -z
    } else {
        z
    }
}
