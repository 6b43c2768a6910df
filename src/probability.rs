//! Probabilities and interval ladders derived from the scenario output.

use serde::{Deserialize, Serialize};

use crate::error::{Result, UncertaintyError};
use crate::normal::{Gaussian, Normal};
use crate::variability::combined_noise_sd;

/// CI levels reported in every interval ladder, narrowest first.
pub const LADDER_LEVELS: [f64; 3] = [0.5, 0.95, 0.99];

/// Two-sided p-value of the gap `y2 − y1` when both readings share one
/// true value.
///
/// The noise sd of the gap is `√(σ1² + σ2²)`.
///
/// # Errors
/// `InvalidParameter` unless both sigmas are positive.
pub fn same_sample_p_value(y1: f64, y2: f64, sigma1: f64, sigma2: f64) -> Result<f64> {
    if !(sigma1 > 0.0 && sigma2 > 0.0) {
        return Err(UncertaintyError::invalid("Sigma values must be positive."));
    }
    chance_probability_under_null(y2 - y1, combined_noise_sd(sigma1, sigma2))
}

/// Two-sided probability of a gap at least as large as `|delta|` arising
/// from noise of sd `sigma_delta` alone: `2·(1 − Φ(|delta|/sigma_delta))`.
///
/// # Errors
/// `InvalidParameter` unless `sigma_delta > 0`.
///
/// # Examples
/// ```
/// use sodium_uncertainty::probability::chance_probability_under_null;
/// assert!((chance_probability_under_null(0.0, 2.0).unwrap() - 1.0).abs() < 1e-6);
/// let p = chance_probability_under_null(3.92, 2.0).unwrap();
/// assert!((p - 0.05).abs() < 1e-4);
/// ```
pub fn chance_probability_under_null(delta: f64, sigma_delta: f64) -> Result<f64> {
    let null = Normal::new(0.0, sigma_delta)?;
    Ok(2.0 * (1.0 - null.cdf(delta.abs())))
}

/// Qualitative reading of a chance probability.
///
/// Each band includes its lower edge.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ChanceBucket {
    /// p < 0.01
    VeryUnlikely,
    /// 0.01 ≤ p < 0.05
    Uncommon,
    /// 0.05 ≤ p < 0.2
    Plausible,
    /// p ≥ 0.2
    Common,
}

impl ChanceBucket {
    pub fn key(&self) -> &'static str {
        match self {
            ChanceBucket::Common => "common",
            ChanceBucket::Plausible => "plausible",
            ChanceBucket::Uncommon => "uncommon",
            ChanceBucket::VeryUnlikely => "very_unlikely",
        }
    }

    pub fn label(&self) -> &'static str {
        match self {
            ChanceBucket::Common => "Common from measurement noise alone",
            ChanceBucket::Plausible => "Plausible from measurement noise alone",
            ChanceBucket::Uncommon => "Uncommon from measurement noise alone",
            ChanceBucket::VeryUnlikely => "Very unlikely from measurement noise alone",
        }
    }
}

/// Buckets a p-value; see [`ChanceBucket`] for the bands.
pub fn qualitative_bucket(p_value: f64) -> ChanceBucket {
    if p_value >= 0.2 {
        ChanceBucket::Common
    } else if p_value >= 0.05 {
        ChanceBucket::Plausible
    } else if p_value >= 0.01 {
        ChanceBucket::Uncommon
    } else {
        ChanceBucket::VeryUnlikely
    }
}

/// P(X > 0) for X ~ N(mean, sd); a point mass when `sd == 0`.
pub fn probability_greater_than_zero(mean: f64, sd: f64) -> Result<f64> {
    Ok(Gaussian::new(mean, sd)?.prob_above(0.0))
}

/// P(|X| > threshold) = P(X > t) + P(X < −t) for X ~ N(mean, sd).
///
/// # Errors
/// `InvalidParameter` for a negative threshold or negative sd.
pub fn probability_abs_greater_than_threshold(mean: f64, sd: f64, threshold: f64) -> Result<f64> {
    if threshold.is_nan() || threshold < 0.0 {
        return Err(UncertaintyError::invalid("Threshold must be non-negative."));
    }
    let g = Gaussian::new(mean, sd)?;
    Ok(g.prob_above(threshold) + g.prob_below(-threshold))
}

/// One rung of an interval ladder.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct LevelInterval {
    pub level: f64,
    pub low: f64,
    pub high: f64,
}

/// Intervals of N(mean, sd) at each of [`LADDER_LEVELS`].
pub fn interval_ladder(mean: f64, sd: f64) -> Result<Vec<LevelInterval>> {
    let g = Gaussian::new(mean, sd)?;
    LADDER_LEVELS
        .iter()
        .map(|&level| {
            let (low, high) = g.interval(level)?;
            Ok(LevelInterval { level, low, high })
        })
        .collect()
}
