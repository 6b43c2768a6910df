//! Measurement-scenario models.
//!
//! Two readings `y1`, `y2` with method noise `σ1`, `σ2` can be interpreted
//! in two ways, selected by [`Context`]:
//!
//! - [`Context::AnalyticRepeatability`]: both readings come from **one**
//!   sample. They measure the same true value, so the posterior for that value
//!   is the inverse-variance weighted combination. The true difference is
//!   exactly zero and any observed gap is pure noise.
//! - [`Context::SequentialDraws`]: the readings come from two draws and each
//!   measures its own true value. The difference is a real quantity with
//!   sd `√(σ1² + σ2²)`.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::{Result, UncertaintyError};
use crate::normal::NormalSummary;
use crate::variability::combined_noise_sd;

/// Which scenario model applies to a pair of readings.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Context {
    /// Same sample measured twice.
    AnalyticRepeatability,
    /// Two independent samples drawn in sequence.
    SequentialDraws,
}

impl Context {
    pub const ALL: [Context; 2] = [Context::AnalyticRepeatability, Context::SequentialDraws];

    /// Key used in request payloads and the defaults document.
    pub fn as_str(&self) -> &'static str {
        match self {
            Context::AnalyticRepeatability => "analytic_repeatability",
            Context::SequentialDraws => "sequential_draws",
        }
    }

    /// Runs this context's model.
    pub fn evaluate(
        self,
        y1: f64,
        y2: f64,
        sigma1: f64,
        sigma2: f64,
        ci_level: f64,
    ) -> Result<ScenarioResult> {
        match self {
            Context::AnalyticRepeatability => {
                posterior_same_sample(y1, y2, sigma1, sigma2, ci_level)
                    .map(ScenarioResult::SameSample)
            }
            Context::SequentialDraws => {
                posterior_sequential_draws(y1, y2, sigma1, sigma2, ci_level)
                    .map(ScenarioResult::SequentialDraws)
            }
        }
    }
}

impl fmt::Display for Context {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Context {
    type Err = UncertaintyError;

    fn from_str(s: &str) -> Result<Self> {
        Context::ALL
            .into_iter()
            .find(|c| c.as_str() == s)
            .ok_or_else(|| UncertaintyError::InvalidContext(s.to_string()))
    }
}

/// Output of the same-sample model.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SameSampleResult {
    /// Posterior for the single true value; stands for both na1 and na2.
    pub combined: NormalSummary,
    /// Point mass at zero.
    pub delta_true: NormalSummary,
    /// Sampling distribution of the raw gap: N(0, √(σ1² + σ2²)).
    pub delta_observed: NormalSummary,
    pub observed_delta: f64,
}

/// Output of the sequential-draws model.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SequentialDrawsResult {
    pub na1: NormalSummary,
    pub na2: NormalSummary,
    pub delta_true: NormalSummary,
    pub observed_delta: f64,
}

/// Result of either scenario model.
///
/// Only the same-sample variant carries a separate raw-gap distribution;
/// under sequential draws the observed and true differences coincide.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum ScenarioResult {
    SameSample(SameSampleResult),
    SequentialDraws(SequentialDrawsResult),
}

impl ScenarioResult {
    pub fn context(&self) -> Context {
        match self {
            ScenarioResult::SameSample(_) => Context::AnalyticRepeatability,
            ScenarioResult::SequentialDraws(_) => Context::SequentialDraws,
        }
    }

    pub fn na1(&self) -> &NormalSummary {
        match self {
            ScenarioResult::SameSample(r) => &r.combined,
            ScenarioResult::SequentialDraws(r) => &r.na1,
        }
    }

    pub fn na2(&self) -> &NormalSummary {
        match self {
            ScenarioResult::SameSample(r) => &r.combined,
            ScenarioResult::SequentialDraws(r) => &r.na2,
        }
    }

    pub fn delta_true(&self) -> &NormalSummary {
        match self {
            ScenarioResult::SameSample(r) => &r.delta_true,
            ScenarioResult::SequentialDraws(r) => &r.delta_true,
        }
    }

    /// Always `y2 − y1`, independent of the modelled distributions.
    pub fn observed_delta(&self) -> f64 {
        match self {
            ScenarioResult::SameSample(r) => r.observed_delta,
            ScenarioResult::SequentialDraws(r) => r.observed_delta,
        }
    }

    /// Raw-gap distribution, present only for the same-sample model.
    pub fn delta_observed(&self) -> Option<&NormalSummary> {
        match self {
            ScenarioResult::SameSample(r) => Some(&r.delta_observed),
            ScenarioResult::SequentialDraws(_) => None,
        }
    }

    /// [`delta_observed`](Self::delta_observed), falling back to
    /// [`delta_true`](Self::delta_true).
    pub fn delta_observed_or_true(&self) -> &NormalSummary {
        self.delta_observed().unwrap_or_else(|| self.delta_true())
    }
}

fn check_sigmas(sigma1: f64, sigma2: f64) -> Result<()> {
    let valid = |s: f64| s.is_finite() && s > 0.0;
    if !valid(sigma1) || !valid(sigma2) {
        return Err(UncertaintyError::invalid("Sigma values must be positive."));
    }
    Ok(())
}

/// Same-sample posterior via inverse-variance weighting.
///
/// # Errors
/// `InvalidParameter` unless both sigmas are positive and `ci_level`
/// lies in `(0, 1)`.
pub fn posterior_same_sample(
    y1: f64,
    y2: f64,
    sigma1: f64,
    sigma2: f64,
    ci_level: f64,
) -> Result<SameSampleResult> {
    check_sigmas(sigma1, sigma2)?;

    // Relative weights keep tiny sigmas from overflowing 1/σ².
    let noise = combined_noise_sd(sigma1, sigma2);
    let share2 = (sigma1 / noise).powi(2);
    let combined_mean = y1 + (y2 - y1) * share2;
    let combined_sd = sigma1 * (sigma2 / noise);

    Ok(SameSampleResult {
        combined: NormalSummary::new(combined_mean, combined_sd, ci_level)?,
        delta_true: NormalSummary::new(0.0, 0.0, ci_level)?,
        delta_observed: NormalSummary::new(0.0, noise, ci_level)?,
        observed_delta: y2 - y1,
    })
}

/// Sequential-draws posterior: each reading is its own point estimate.
///
/// # Errors
/// `InvalidParameter` unless both sigmas are positive and `ci_level`
/// lies in `(0, 1)`.
pub fn posterior_sequential_draws(
    y1: f64,
    y2: f64,
    sigma1: f64,
    sigma2: f64,
    ci_level: f64,
) -> Result<SequentialDrawsResult> {
    check_sigmas(sigma1, sigma2)?;

    Ok(SequentialDrawsResult {
        na1: NormalSummary::new(y1, sigma1, ci_level)?,
        na2: NormalSummary::new(y2, sigma2, ci_level)?,
        delta_true: NormalSummary::new(y2 - y1, combined_noise_sd(sigma1, sigma2), ci_level)?,
        observed_delta: y2 - y1,
    })
}
