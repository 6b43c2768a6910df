//! Normal-distribution primitives.
//!
//! Density, distribution function, two-sided confidence intervals and
//! plotting curves for a normal distribution with arbitrary mean and
//! standard deviation.
//!
//! # Degenerate distributions
//!
//! Several model outputs are point masses (σ = 0): the true difference under
//! the same-sample model is exactly zero, for instance. Rather than have every
//! consumer special-case `sd == 0`, [`Gaussian`] captures the policy once:
//!
//! | Operation | Proper N(μ, σ) | Point mass at μ |
//! |---|---|---|
//! | `P(X > x)` | 1 − Φ((x−μ)/σ) | 1 if μ > x, else 0 |
//! | `P(X < x)` | Φ((x−μ)/σ) | 1 if μ < x, else 0 |
//! | CI at any level | μ ± z·σ | (μ, μ) |
//! | Curve | sampled PDF | 3-point spike |
//!
//! The free functions [`pdf`] and [`cdf`] stay strict and reject σ ≤ 0.

use serde::{Deserialize, Serialize};

use crate::error::{Result, UncertaintyError};
use crate::special;

/// Default number of points on a density curve.
pub const DEFAULT_CURVE_POINTS: usize = 401;

/// Default half-span of a density curve, in standard deviations.
pub const DEFAULT_SPAN_SD: f64 = 4.0;

// ============================================================================
// Normal Distribution
// ============================================================================

/// Normal (Gaussian) distribution N(μ, σ²) with σ > 0.
///
/// # Mathematical Definition
/// - PDF: φ(x) = (1/(σ√(2π))) exp(−(x−μ)²/(2σ²))
/// - CDF: ½·(1 + erf((x−μ)/(σ√2)))
/// - Mean: μ
/// - Variance: σ²
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Normal {
    mu: f64,
    sigma: f64,
}

impl Normal {
    /// Creates a new normal distribution N(μ, σ).
    ///
    /// # Errors
    /// Returns `InvalidParameter` if `sigma ≤ 0` or parameters are not finite.
    pub fn new(mu: f64, sigma: f64) -> Result<Self> {
        if !mu.is_finite() {
            return Err(UncertaintyError::invalid("Mean must be a finite number."));
        }
        if !sigma.is_finite() || sigma <= 0.0 {
            return Err(UncertaintyError::invalid(
                "Standard deviation must be positive.",
            ));
        }
        Ok(Self { mu, sigma })
    }

    pub fn mean(&self) -> f64 {
        self.mu
    }

    pub fn std_dev(&self) -> f64 {
        self.sigma
    }

    /// PDF: φ((x−μ)/σ)/σ.
    pub fn pdf(&self, x: f64) -> f64 {
        let z = (x - self.mu) / self.sigma;
        special::standard_normal_pdf(z) / self.sigma
    }

    /// CDF: Φ((x−μ)/σ).
    pub fn cdf(&self, x: f64) -> f64 {
        let z = (x - self.mu) / self.sigma;
        special::standard_normal_cdf(z)
    }

    /// Inverse CDF (quantile): μ + σ·Φ⁻¹(p).
    ///
    /// Returns `None` if `p` is outside `(0, 1)`.
    pub fn quantile(&self, p: f64) -> Option<f64> {
        if p.is_nan() || p <= 0.0 || p >= 1.0 {
            return None;
        }
        Some(self.mu + self.sigma * special::inverse_normal_cdf(p))
    }
}

// ============================================================================
// Degenerate-aware normal
// ============================================================================

/// A normal distribution that may have collapsed to a point mass.
///
/// This is the single place where `sd == 0` is interpreted. See the
/// module docs for the policy table.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Gaussian {
    /// All probability at `mean`.
    Point { mean: f64 },
    /// A proper normal with σ > 0.
    Proper(Normal),
}

impl Gaussian {
    /// Builds a point mass when `sd == 0`, otherwise a proper normal.
    ///
    /// # Errors
    /// `InvalidParameter` for a negative or non-finite `sd`, or a
    /// non-finite `mean`.
    pub fn new(mean: f64, sd: f64) -> Result<Self> {
        if !sd.is_finite() || sd < 0.0 {
            return Err(UncertaintyError::invalid(
                "Standard deviation must be non-negative.",
            ));
        }
        if sd == 0.0 {
            if !mean.is_finite() {
                return Err(UncertaintyError::invalid("Mean must be a finite number."));
            }
            return Ok(Gaussian::Point { mean });
        }
        Normal::new(mean, sd).map(Gaussian::Proper)
    }

    pub fn mean(&self) -> f64 {
        match self {
            Gaussian::Point { mean } => *mean,
            Gaussian::Proper(n) => n.mean(),
        }
    }

    pub fn std_dev(&self) -> f64 {
        match self {
            Gaussian::Point { .. } => 0.0,
            Gaussian::Proper(n) => n.std_dev(),
        }
    }

    pub fn is_degenerate(&self) -> bool {
        matches!(self, Gaussian::Point { .. })
    }

    /// P(X > x).
    pub fn prob_above(&self, x: f64) -> f64 {
        match self {
            Gaussian::Point { mean } => indicator(*mean > x),
            Gaussian::Proper(n) => 1.0 - n.cdf(x),
        }
    }

    /// P(X < x).
    pub fn prob_below(&self, x: f64) -> f64 {
        match self {
            Gaussian::Point { mean } => indicator(*mean < x),
            Gaussian::Proper(n) => n.cdf(x),
        }
    }

    /// Two-sided interval holding `level` of the mass.
    ///
    /// # Errors
    /// `InvalidParameter` unless `0 < level < 1`.
    pub fn interval(&self, level: f64) -> Result<(f64, f64)> {
        check_level(level)?;
        match self {
            Gaussian::Point { mean } => Ok((*mean, *mean)),
            Gaussian::Proper(n) => {
                let upper = n
                    .quantile(1.0 - (1.0 - level) / 2.0)
                    .ok_or_else(|| UncertaintyError::invalid(LEVEL_MESSAGE))?;
                let half = upper - n.mean();
                Ok((n.mean() - half, n.mean() + half))
            }
        }
    }

    /// Evenly sampled density over `mean ± span_sd·σ`.
    ///
    /// A point mass renders as the spike `[(μ−1, 0), (μ, 1), (μ+1, 0)]`.
    /// That shape is for display only; it is not a density.
    ///
    /// # Errors
    /// `InvalidParameter` if `n < 2` or `span_sd` is not positive and finite.
    pub fn curve(&self, n: usize, span_sd: f64) -> Result<Curve> {
        if n < 2 {
            return Err(UncertaintyError::invalid("n must be at least 2."));
        }
        if !span_sd.is_finite() || span_sd <= 0.0 {
            return Err(UncertaintyError::invalid("Curve span must be positive."));
        }
        match self {
            Gaussian::Point { mean } => Ok(Curve {
                x: vec![mean - 1.0, *mean, mean + 1.0],
                y: vec![0.0, 1.0, 0.0],
            }),
            Gaussian::Proper(dist) => {
                let start = dist.mean() - span_sd * dist.std_dev();
                let step = (2.0 * span_sd * dist.std_dev()) / (n - 1) as f64;
                let x: Vec<f64> = (0..n).map(|i| start + i as f64 * step).collect();
                let y = x.iter().map(|&xi| dist.pdf(xi)).collect();
                Ok(Curve { x, y })
            }
        }
    }
}

fn indicator(condition: bool) -> f64 {
    if condition {
        1.0
    } else {
        0.0
    }
}

const LEVEL_MESSAGE: &str = "CI level must be between 0 and 1.";

fn check_level(level: f64) -> Result<()> {
    if level.is_nan() || level <= 0.0 || level >= 1.0 {
        return Err(UncertaintyError::invalid(LEVEL_MESSAGE));
    }
    Ok(())
}

// ============================================================================
// Summaries and curves
// ============================================================================

/// A normal (or point) distribution with one confidence interval.
///
/// Invariant: `ci_low ≤ mean ≤ ci_high`, and `ci_low == ci_high == mean`
/// when `sd == 0`.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct NormalSummary {
    pub mean: f64,
    pub sd: f64,
    pub ci_low: f64,
    pub ci_high: f64,
}

impl NormalSummary {
    /// Summarizes N(mean, sd) with a two-sided interval at `level`.
    pub fn new(mean: f64, sd: f64, level: f64) -> Result<Self> {
        let (ci_low, ci_high) = confidence_interval(mean, sd, level)?;
        Ok(Self {
            mean,
            sd,
            ci_low,
            ci_high,
        })
    }

    /// The distribution this summary describes.
    pub fn gaussian(&self) -> Result<Gaussian> {
        Gaussian::new(self.mean, self.sd)
    }

    pub fn half_width(&self) -> f64 {
        (self.ci_high - self.ci_low) / 2.0
    }
}

/// Sampled curve for plotting: parallel `x` and `y` vectors.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Curve {
    pub x: Vec<f64>,
    pub y: Vec<f64>,
}

// ============================================================================
// Free-function primitives
// ============================================================================

/// Density of N(mean, sd) at `x`.
///
/// # Errors
/// `InvalidParameter` when `sd ≤ 0`.
///
/// # Examples
/// ```
/// use sodium_uncertainty::normal::pdf;
/// let peak = pdf(140.0, 140.0, 2.0).unwrap();
/// assert!((peak - 0.3989422804014327 / 2.0).abs() < 1e-15);
/// assert!(pdf(140.0, 140.0, 0.0).is_err());
/// ```
pub fn pdf(x: f64, mean: f64, sd: f64) -> Result<f64> {
    Ok(Normal::new(mean, sd)?.pdf(x))
}

/// Distribution function of N(mean, sd) at `x`.
///
/// # Errors
/// `InvalidParameter` when `sd ≤ 0`.
///
/// # Examples
/// ```
/// use sodium_uncertainty::normal::cdf;
/// assert!((cdf(140.0, 140.0, 2.0).unwrap() - 0.5).abs() < 1e-7);
/// ```
pub fn cdf(x: f64, mean: f64, sd: f64) -> Result<f64> {
    Ok(Normal::new(mean, sd)?.cdf(x))
}

/// Two-sided interval `mean ± z·sd` with `z = Φ⁻¹(1 − (1−level)/2)`.
///
/// With `sd == 0` the interval is `(mean, mean)` and the quantile function
/// is never evaluated.
///
/// # Errors
/// `InvalidParameter` unless `0 < level < 1` and `sd ≥ 0`.
///
/// # Examples
/// ```
/// use sodium_uncertainty::normal::confidence_interval;
/// let (lo, hi) = confidence_interval(0.0, 1.0, 0.95).unwrap();
/// assert!((hi - 1.959964).abs() < 1e-4);
/// assert!((lo + hi).abs() < 1e-12);
/// assert_eq!(confidence_interval(5.0, 0.0, 0.5).unwrap(), (5.0, 5.0));
/// ```
pub fn confidence_interval(mean: f64, sd: f64, level: f64) -> Result<(f64, f64)> {
    if sd.is_nan() || sd < 0.0 {
        return Err(UncertaintyError::invalid(
            "Standard deviation must be non-negative.",
        ));
    }
    check_level(level)?;
    Gaussian::new(mean, sd)?.interval(level)
}

/// Density curve of N(mean, sd) over `mean ± span_sd·sd`, `n` points.
///
/// For `sd ≤ 0` returns the 3-point display spike instead of failing.
///
/// # Errors
/// `InvalidParameter` if `n < 2`.
pub fn density_curve(mean: f64, sd: f64, n: usize, span_sd: f64) -> Result<Curve> {
    if n < 2 {
        return Err(UncertaintyError::invalid("n must be at least 2."));
    }
    let gaussian = if sd > 0.0 {
        Gaussian::new(mean, sd)?
    } else {
        Gaussian::Point { mean }
    };
    gaussian.curve(n, span_sd)
}

/// [`density_curve`] with 401 points over ±4σ.
pub fn default_curve(mean: f64, sd: f64) -> Result<Curve> {
    density_curve(mean, sd, DEFAULT_CURVE_POINTS, DEFAULT_SPAN_SD)
}
