//! JSON request/response adapter around the statistical core.
//!
//! A request carries two sodium readings, the scenario context, a method per
//! reading and (optionally) a variability defaults document. The adapter:
//!
//! 1. parses and range-checks the user inputs, collecting every problem;
//! 2. resolves each method's sigma, optionally scaled by `y / na_ref`;
//! 3. runs the scenario model and derives probabilities, curves and
//!    interval ladders.
//!
//! Nothing here panics or returns a raw error to the caller. Every
//! failure becomes a string in the response's `errors` list.

use std::ops::RangeInclusive;

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::defaults::{resolve_sigma, DefaultsDocument, Numeric, VariabilityDefaults};
use crate::error::{Result, UncertaintyError};
use crate::normal::{default_curve, Curve, NormalSummary};
use crate::probability::{
    chance_probability_under_null, interval_ladder, probability_abs_greater_than_threshold,
    probability_greater_than_zero, qualitative_bucket, same_sample_p_value, LevelInterval,
};
use crate::scenario::Context;
use crate::variability::{combined_noise_sd, loa_half_to_sd_diff};

/// Sodium values outside this range (mmol/L) draw a warning.
pub const PHYSIOLOGIC_RANGE: RangeInclusive<f64> = 100.0..=170.0;

/// Reference sodium for proportional sigma scaling when none is given.
pub const DEFAULT_NA_REF: f64 = 140.0;

/// Incoming computation request.
///
/// Fields are kept as raw JSON so that a missing or mistyped value becomes
/// a validation message rather than a parse failure.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ComputeRequest {
    #[serde(default)]
    pub y1: Value,
    #[serde(default)]
    pub y2: Value,
    #[serde(default)]
    pub ci_level: Value,
    #[serde(default)]
    pub threshold: Value,
    #[serde(default)]
    pub context: Value,
    #[serde(default)]
    pub method1: Value,
    #[serde(default)]
    pub method2: Value,
    /// A defaults document (`{"defaults": {...}}`).
    #[serde(default)]
    pub params: Option<Value>,
    /// `true`, `false` or absent.
    #[serde(default)]
    pub scale_with_na: Value,
    #[serde(default)]
    pub na_ref: Value,
}

impl ComputeRequest {
    /// A request at 95% CI with zero threshold and no inline params.
    pub fn new(y1: f64, y2: f64, context: Context, method1: &str, method2: &str) -> Self {
        Self {
            y1: y1.into(),
            y2: y2.into(),
            ci_level: Value::from(0.95_f64),
            threshold: Value::from(0.0_f64),
            context: context.as_str().into(),
            method1: method1.into(),
            method2: method2.into(),
            ..Self::default()
        }
    }

    pub fn with_ci_level(mut self, level: f64) -> Self {
        self.ci_level = level.into();
        self
    }

    pub fn with_threshold(mut self, threshold: f64) -> Self {
        self.threshold = threshold.into();
        self
    }

    pub fn with_params(mut self, params: Value) -> Self {
        self.params = Some(params);
        self
    }

    pub fn with_scaling(mut self, na_ref: f64) -> Self {
        self.scale_with_na = Value::Bool(true);
        self.na_ref = na_ref.into();
        self
    }
}

/// Response for a request that could not be computed.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Rejection {
    pub errors: Vec<String>,
    pub warnings: Vec<String>,
}

/// Response for a successful computation.
#[derive(Debug, Clone, Serialize)]
pub struct Computation {
    /// Always empty; present so both response shapes carry `errors`.
    pub errors: Vec<String>,
    pub warnings: Vec<String>,
    pub inputs: Inputs,
    pub context: Context,
    pub ci_level: f64,
    pub threshold: f64,
    pub observed_delta: f64,
    pub na1: NormalSummary,
    pub na2: NormalSummary,
    pub delta_true: NormalSummary,
    /// Raw-gap distribution; the true-difference summary under sequential draws.
    pub delta_observed: NormalSummary,
    pub probabilities: Probabilities,
    pub curves: PerQuantity<Curve>,
    pub intervals: PerQuantity<Vec<LevelInterval>>,
    pub details: Details,
}

#[derive(Debug, Clone, Serialize)]
#[serde(untagged)]
pub enum ComputeResponse {
    Rejected(Rejection),
    Computed(Box<Computation>),
}

impl ComputeResponse {
    fn rejected(errors: Vec<String>, warnings: Vec<String>) -> Self {
        ComputeResponse::Rejected(Rejection { errors, warnings })
    }

    pub fn is_rejected(&self) -> bool {
        matches!(self, ComputeResponse::Rejected(_))
    }

    pub fn errors(&self) -> &[String] {
        match self {
            ComputeResponse::Rejected(r) => &r.errors,
            ComputeResponse::Computed(c) => &c.errors,
        }
    }

    pub fn warnings(&self) -> &[String] {
        match self {
            ComputeResponse::Rejected(r) => &r.warnings,
            ComputeResponse::Computed(c) => &c.warnings,
        }
    }

    pub fn computation(&self) -> Option<&Computation> {
        match self {
            ComputeResponse::Rejected(_) => None,
            ComputeResponse::Computed(c) => Some(c.as_ref()),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct Inputs {
    pub y1: f64,
    pub y2: f64,
    pub sigma1: f64,
    pub sigma2: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Probabilities {
    pub delta_gt_zero: f64,
    pub delta_abs_gt_threshold: f64,
    /// Only under the same-sample context; `null` otherwise.
    pub same_sample_p: Option<f64>,
    pub chance_under_null: f64,
    pub chance_bucket_key: String,
    pub chance_bucket_label: String,
}

/// One value per plotted quantity.
///
/// `delta_null` is the pure-noise gap N(0, √(σ1²+σ2²)); `na1_obs` and
/// `na2_obs` are the raw readings with their own method noise.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PerQuantity<T> {
    pub na1: T,
    pub na2: T,
    pub delta_true: T,
    pub delta_observed: T,
    pub delta_null: T,
    pub na1_obs: T,
    pub na2_obs: T,
}

impl<T> PerQuantity<T> {
    fn try_map<U>(&self, f: impl Fn(&T) -> Result<U>) -> Result<PerQuantity<U>> {
        Ok(PerQuantity {
            na1: f(&self.na1)?,
            na2: f(&self.na2)?,
            delta_true: f(&self.delta_true)?,
            delta_observed: f(&self.delta_observed)?,
            delta_null: f(&self.delta_null)?,
            na1_obs: f(&self.na1_obs)?,
            na2_obs: f(&self.na2_obs)?,
        })
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Details {
    pub context: Context,
    pub method1: String,
    pub method2: String,
    pub sigma1: f64,
    pub sigma2: f64,
    pub sigma_delta: f64,
    pub scale_with_na: bool,
    pub na_ref: f64,
    pub entry1: EntryDetail,
    pub entry2: EntryDetail,
}

/// How one side's sigma was obtained.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct EntryDetail {
    pub loa_half_pair: Option<f64>,
    pub sigma_override: Option<f64>,
    pub override_used: bool,
    /// Sigma handed to the model, after scaling.
    pub sigma_used: f64,
    /// Sigma before scaling.
    pub sigma_raw: f64,
    pub scale_factor: f64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub sd_diff: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub sigma_from_loa: Option<f64>,
}

#[derive(Clone, Copy)]
struct Validated {
    y1: f64,
    y2: f64,
    ci_level: f64,
    threshold: f64,
    scale_with_na: bool,
    na_ref: f64,
}

fn parse_number(value: &Value, label: &str, errors: &mut Vec<String>) -> Option<f64> {
    match Numeric::read(Some(value)) {
        Numeric::Present(v) if v.is_finite() => Some(v),
        _ => {
            errors.push(format!("{label} must be a number."));
            None
        }
    }
}

fn parse_flag(value: &Value, label: &str, errors: &mut Vec<String>) -> Option<bool> {
    match value {
        Value::Null => Some(false),
        Value::Bool(flag) => Some(*flag),
        _ => {
            errors.push(format!("{label} must be true or false."));
            None
        }
    }
}

/// Runs a request end to end.
///
/// `fallback` supplies the variability table when the request carries no
/// `params`.
pub fn compute(request: &ComputeRequest, fallback: Option<&VariabilityDefaults>) -> ComputeResponse {
    let mut errors = Vec::new();
    let mut warnings = Vec::new();

    let y1 = parse_number(&request.y1, "Na1", &mut errors);
    let y2 = parse_number(&request.y2, "Na2", &mut errors);
    let ci_level = parse_number(&request.ci_level, "CI level", &mut errors);
    let threshold = parse_number(&request.threshold, "Threshold", &mut errors);
    let na_ref = if request.na_ref.is_null() {
        Some(DEFAULT_NA_REF)
    } else {
        parse_number(&request.na_ref, "Reference Na", &mut errors)
    };
    let scale_with_na = parse_flag(&request.scale_with_na, "Scale with Na", &mut errors);

    if matches!(y1, Some(y) if !PHYSIOLOGIC_RANGE.contains(&y)) {
        warnings.push("Na1 is outside typical physiologic ranges.".to_string());
    }
    if matches!(y2, Some(y) if !PHYSIOLOGIC_RANGE.contains(&y)) {
        warnings.push("Na2 is outside typical physiologic ranges.".to_string());
    }
    if matches!(ci_level, Some(level) if !(level > 0.0 && level < 1.0)) {
        errors.push("CI level must be between 0 and 1.".to_string());
    }
    if matches!(threshold, Some(t) if t < 0.0) {
        errors.push("Threshold must be non-negative.".to_string());
    }
    if matches!(na_ref, Some(r) if r <= 0.0) {
        errors.push("Reference Na must be positive.".to_string());
    }

    let inputs = match (y1, y2, ci_level, threshold, scale_with_na, na_ref) {
        (Some(y1), Some(y2), Some(ci_level), Some(threshold), Some(scale_with_na), Some(na_ref))
            if errors.is_empty() =>
        {
            Validated {
                y1,
                y2,
                ci_level,
                threshold,
                scale_with_na,
                na_ref,
            }
        }
        _ => {
            tracing::warn!(errors = ?errors, "request failed validation");
            return ComputeResponse::rejected(errors, warnings);
        }
    };

    match evaluate(request, &inputs, fallback, &warnings) {
        Ok(computation) => ComputeResponse::Computed(Box::new(computation)),
        Err(e) => {
            tracing::warn!(error = %e, "computation rejected");
            ComputeResponse::rejected(vec![e.to_string()], warnings)
        }
    }
}

/// Parses a JSON request and runs it.
///
/// A payload that is not a JSON object of the expected shape yields a
/// rejection, never an `Err`.
pub fn respond(payload: &str, fallback: Option<&VariabilityDefaults>) -> ComputeResponse {
    let parsed = serde_json::from_str::<Map<String, Value>>(payload)
        .and_then(|fields| serde_json::from_value::<ComputeRequest>(Value::Object(fields)));
    match parsed {
        Ok(request) => compute(&request, fallback),
        Err(e) => {
            tracing::warn!(error = %e, "request payload not understood");
            let message = format!("Request is not a valid JSON object: {e}.");
            ComputeResponse::rejected(vec![message], Vec::new())
        }
    }
}

/// [`respond`], serialized to a JSON string.
pub fn compute_json(
    payload: &str,
    fallback: Option<&VariabilityDefaults>,
) -> serde_json::Result<String> {
    serde_json::to_string(&respond(payload, fallback))
}

struct Side {
    sigma: f64,
    detail: EntryDetail,
}

fn resolve_side(
    table: &VariabilityDefaults,
    context: Context,
    method: &str,
    y: f64,
    scale_with_na: bool,
    na_ref: f64,
) -> Result<Side> {
    let sigma_raw = resolve_sigma(table, context.as_str(), method)?;
    let entry = table
        .entry(context.as_str(), method)
        .copied()
        .unwrap_or_default();
    let scale_factor = if scale_with_na { y / na_ref } else { 1.0 };
    let sigma = sigma_raw * scale_factor;
    let sd_diff = entry.loa_half_pair.map(loa_half_to_sd_diff);

    Ok(Side {
        sigma,
        detail: EntryDetail {
            loa_half_pair: entry.loa_half_pair,
            sigma_override: entry.sigma,
            override_used: entry.override_used(),
            sigma_used: sigma,
            sigma_raw,
            scale_factor,
            sd_diff,
            sigma_from_loa: sd_diff.map(|sd| sd / std::f64::consts::SQRT_2),
        },
    })
}

fn evaluate(
    request: &ComputeRequest,
    inputs: &Validated,
    fallback: Option<&VariabilityDefaults>,
    warnings: &[String],
) -> Result<Computation> {
    let context: Context = match &request.context {
        Value::String(name) => name.parse()?,
        other => return Err(UncertaintyError::InvalidContext(other.to_string())),
    };
    let method1 = request
        .method1
        .as_str()
        .ok_or_else(|| UncertaintyError::missing("Method 1 must be selected."))?;
    let method2 = request
        .method2
        .as_str()
        .ok_or_else(|| UncertaintyError::missing("Method 2 must be selected."))?;

    let inline;
    let table = match &request.params {
        Some(params) => {
            inline = DefaultsDocument::from_value(params)?.defaults;
            &inline
        }
        None => fallback
            .ok_or_else(|| UncertaintyError::missing("Variability parameters must be provided."))?,
    };

    let Validated {
        y1,
        y2,
        ci_level,
        threshold,
        scale_with_na: scale,
        na_ref,
    } = *inputs;
    let side1 = resolve_side(table, context, method1, y1, scale, na_ref)?;
    let side2 = resolve_side(table, context, method2, y2, scale, na_ref)?;
    let (sigma1, sigma2) = (side1.sigma, side2.sigma);
    let sigma_delta = combined_noise_sd(sigma1, sigma2);

    tracing::debug!(%context, method1, method2, sigma1, sigma2, scale, "resolved measurement variability");

    let result = context.evaluate(y1, y2, sigma1, sigma2, ci_level)?;
    let delta_true = *result.delta_true();
    let delta_observed = *result.delta_observed_or_true();

    let chance = chance_probability_under_null(y2 - y1, sigma_delta)?;
    let bucket = qualitative_bucket(chance);
    let same_sample_p = match context {
        Context::AnalyticRepeatability => Some(same_sample_p_value(y1, y2, sigma1, sigma2)?),
        Context::SequentialDraws => None,
    };
    let probabilities = Probabilities {
        delta_gt_zero: probability_greater_than_zero(delta_true.mean, delta_true.sd)?,
        delta_abs_gt_threshold: probability_abs_greater_than_threshold(
            delta_true.mean,
            delta_true.sd,
            threshold,
        )?,
        same_sample_p,
        chance_under_null: chance,
        chance_bucket_key: bucket.key().to_string(),
        chance_bucket_label: bucket.label().to_string(),
    };

    let spreads = PerQuantity {
        na1: (result.na1().mean, result.na1().sd),
        na2: (result.na2().mean, result.na2().sd),
        delta_true: (delta_true.mean, delta_true.sd),
        delta_observed: (delta_observed.mean, delta_observed.sd),
        delta_null: (0.0, sigma_delta),
        na1_obs: (y1, sigma1),
        na2_obs: (y2, sigma2),
    };
    let curves = spreads.try_map(|&(mean, sd)| default_curve(mean, sd))?;
    let intervals = spreads.try_map(|&(mean, sd)| interval_ladder(mean, sd))?;

    tracing::debug!(%context, chance, bucket = bucket.key(), "scenario evaluated");

    Ok(Computation {
        errors: Vec::new(),
        warnings: warnings.to_vec(),
        inputs: Inputs {
            y1,
            y2,
            sigma1,
            sigma2,
        },
        context,
        ci_level,
        threshold,
        observed_delta: result.observed_delta(),
        na1: *result.na1(),
        na2: *result.na2(),
        delta_true,
        delta_observed,
        probabilities,
        curves,
        intervals,
        details: Details {
            context,
            method1: method1.to_string(),
            method2: method2.to_string(),
            sigma1,
            sigma2,
            sigma_delta,
            scale_with_na: scale,
            na_ref,
            entry1: side1.detail,
            entry2: side2.detail,
        },
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::probability::LADDER_LEVELS;
    use crate::variability::loa_half_to_sigma;
    use serde_json::json;

    const LAB: &str = "central_lab_indirect_ISE";
    const GAS: &str = "blood_gas_direct_ISE";

    fn params(entries: Value) -> Value {
        json!({
            "version": 1,
            "units": "mmol/L",
            "defaults": {
                "analytic_repeatability": entries.clone(),
                "sequential_draws": entries,
            }
        })
    }

    fn lab_params() -> Value {
        params(json!({
            LAB: { "loa_half_pair": 3.0 },
            GAS: { "loa_half_pair": 2.0, "sigma": "" },
        }))
    }

    fn computed(response: &ComputeResponse) -> &Computation {
        match response.computation() {
            Some(c) => c,
            None => panic!("expected computation, got errors {:?}", response.errors()),
        }
    }

    // --- validation ---

    #[test]
    fn test_non_numeric_inputs_collected() {
        let mut request = ComputeRequest::new(130.0, 133.0, Context::SequentialDraws, LAB, LAB)
            .with_params(lab_params());
        request.y1 = json!("abc");
        request.threshold = Value::Null;
        let response = compute(&request, None);
        assert!(response.is_rejected());
        assert_eq!(
            response.errors(),
            ["Na1 must be a number.", "Threshold must be a number."]
        );
    }

    #[test]
    fn test_range_errors_collected_together() {
        let request = ComputeRequest::new(130.0, 133.0, Context::SequentialDraws, LAB, LAB)
            .with_params(lab_params())
            .with_ci_level(1.0)
            .with_threshold(-1.0)
            .with_scaling(0.0);
        let response = compute(&request, None);
        assert_eq!(
            response.errors(),
            [
                "CI level must be between 0 and 1.",
                "Threshold must be non-negative.",
                "Reference Na must be positive.",
            ]
        );
    }

    #[test]
    fn test_warnings_do_not_block() {
        let request = ComputeRequest::new(95.0, 172.0, Context::SequentialDraws, LAB, LAB)
            .with_params(lab_params());
        let response = compute(&request, None);
        assert!(!response.is_rejected());
        assert_eq!(
            response.warnings(),
            [
                "Na1 is outside typical physiologic ranges.",
                "Na2 is outside typical physiologic ranges.",
            ]
        );
    }

    #[test]
    fn test_warnings_kept_on_rejection() {
        let request = ComputeRequest::new(90.0, 133.0, Context::SequentialDraws, LAB, LAB)
            .with_params(lab_params())
            .with_ci_level(0.0);
        let response = compute(&request, None);
        assert!(response.is_rejected());
        assert_eq!(response.warnings().len(), 1);
    }

    #[test]
    fn test_numeric_strings_accepted() {
        let mut request = ComputeRequest::new(0.0, 0.0, Context::SequentialDraws, LAB, LAB)
            .with_params(lab_params());
        request.y1 = json!("130");
        request.y2 = json!("133.5");
        let c = computed(&compute(&request, None)).clone();
        assert_eq!(c.inputs.y1, 130.0);
        assert_eq!(c.observed_delta, 3.5);
    }

    // --- context / params errors ---

    #[test]
    fn test_invalid_context() {
        let mut request = ComputeRequest::new(130.0, 133.0, Context::SequentialDraws, LAB, LAB)
            .with_params(lab_params());
        request.context = json!("same_patient");
        let response = compute(&request, None);
        assert_eq!(response.errors(), ["Invalid context selection."]);

        request.context = Value::Null;
        assert_eq!(compute(&request, None).errors(), ["Invalid context selection."]);
    }

    #[test]
    fn test_non_string_context_is_invalid_context() {
        let mut payload = serde_json::to_value(
            ComputeRequest::new(130.0, 133.0, Context::SequentialDraws, LAB, LAB)
                .with_params(lab_params()),
        )
        .unwrap();
        for context in [json!(5), json!(true), json!(["sequential_draws"])] {
            payload["context"] = context;
            let response = respond(&payload.to_string(), None);
            assert_eq!(response.errors(), ["Invalid context selection."]);
        }
    }

    #[test]
    fn test_non_string_method_is_missing() {
        let mut request = ComputeRequest::new(130.0, 133.0, Context::SequentialDraws, LAB, LAB)
            .with_params(lab_params());
        request.method2 = json!(7);
        assert_eq!(compute(&request, None).errors(), ["Method 2 must be selected."]);
        request.method1 = Value::Null;
        assert_eq!(compute(&request, None).errors(), ["Method 1 must be selected."]);
    }

    #[test]
    fn test_non_bool_scaling_collected_with_other_errors() {
        let mut payload = serde_json::to_value(
            ComputeRequest::new(130.0, 133.0, Context::SequentialDraws, LAB, LAB)
                .with_params(lab_params()),
        )
        .unwrap();
        payload["scale_with_na"] = json!("true");
        payload["y2"] = json!("high");
        let response = respond(&payload.to_string(), None);
        assert_eq!(
            response.errors(),
            ["Na2 must be a number.", "Scale with Na must be true or false."]
        );

        payload["scale_with_na"] = Value::Null;
        payload["y2"] = json!(133.0);
        assert!(!respond(&payload.to_string(), None).is_rejected());
    }

    #[test]
    fn test_unknown_method_is_missing_parameter() {
        let request = ComputeRequest::new(130.0, 133.0, Context::SequentialDraws, LAB, "abacus")
            .with_params(lab_params());
        let response = compute(&request, None);
        assert!(response.is_rejected());
        assert!(response.errors()[0].contains("abacus"));
    }

    #[test]
    fn test_schema_error_surfaces() {
        let request = ComputeRequest::new(130.0, 133.0, Context::SequentialDraws, LAB, LAB)
            .with_params(json!({ "version": 1 }));
        let response = compute(&request, None);
        assert_eq!(
            response.errors(),
            ["Defaults JSON must include a defaults section."]
        );
    }

    #[test]
    fn test_non_positive_override_is_invalid() {
        let request = ComputeRequest::new(130.0, 133.0, Context::SequentialDraws, LAB, LAB)
            .with_params(params(json!({ LAB: { "loa_half_pair": 3.0, "sigma": 0 } })));
        assert_eq!(compute(&request, None).errors(), ["Sigma must be positive."]);
    }

    #[test]
    fn test_missing_params_without_fallback() {
        let request = ComputeRequest::new(130.0, 133.0, Context::SequentialDraws, LAB, LAB);
        let response = compute(&request, None);
        assert_eq!(
            response.errors(),
            ["Variability parameters must be provided."]
        );
    }

    #[test]
    fn test_fallback_table_used() {
        let doc = DefaultsDocument::bundled().unwrap();
        let request = ComputeRequest::new(130.0, 133.0, Context::AnalyticRepeatability, LAB, LAB);
        let c = computed(&compute(&request, Some(&doc.defaults))).clone();
        assert!((c.inputs.sigma1 - loa_half_to_sigma(3.0).unwrap()).abs() < 1e-12);
    }

    // --- sequential draws ---

    #[test]
    fn test_sequential_response() {
        let request = ComputeRequest::new(130.0, 133.0, Context::SequentialDraws, LAB, GAS)
            .with_params(lab_params())
            .with_threshold(2.0);
        let response = compute(&request, None);
        let c = computed(&response);

        let s1 = loa_half_to_sigma(3.0).unwrap();
        let s2 = loa_half_to_sigma(2.0).unwrap();
        assert_eq!(c.context, Context::SequentialDraws);
        assert_eq!(c.observed_delta, 3.0);
        assert!((c.details.sigma_delta - s1.hypot(s2)).abs() < 1e-12);
        assert_eq!(c.delta_observed, c.delta_true);
        assert_eq!(c.probabilities.same_sample_p, None);
        assert!(c.probabilities.delta_gt_zero > 0.9);
        assert!(c.probabilities.delta_abs_gt_threshold > 0.5);
        assert!(!c.details.entry2.override_used);
    }

    #[test]
    fn test_chance_uses_combined_noise_in_both_contexts() {
        let base = ComputeRequest::new(130.0, 134.0, Context::SequentialDraws, LAB, LAB)
            .with_params(lab_params());
        let mut same = base.clone();
        same.context = json!("analytic_repeatability");

        let seq = computed(&compute(&base, None)).probabilities.clone();
        let rep = computed(&compute(&same, None)).probabilities.clone();
        assert_eq!(seq.chance_under_null, rep.chance_under_null);
        assert_eq!(seq.chance_bucket_key, rep.chance_bucket_key);
    }

    // --- same sample ---

    #[test]
    fn test_same_sample_response() {
        let request = ComputeRequest::new(130.0, 133.0, Context::AnalyticRepeatability, LAB, LAB)
            .with_params(lab_params())
            .with_threshold(1.0);
        let response = compute(&request, None);
        let c = computed(&response);

        assert_eq!(c.na1, c.na2);
        assert!((c.na1.mean - 131.5).abs() < 1e-12);
        assert_eq!(c.delta_true.sd, 0.0);
        assert_eq!(c.delta_observed.mean, 0.0);
        assert!(c.delta_observed.sd > 0.0);
        // Point mass at 0: neither direction nor threshold exceedance.
        assert_eq!(c.probabilities.delta_gt_zero, 0.0);
        assert_eq!(c.probabilities.delta_abs_gt_threshold, 0.0);
        let p = c.probabilities.same_sample_p.unwrap();
        assert!((p - c.probabilities.chance_under_null).abs() < 1e-15);
        // Point-mass curve renders as the spike.
        assert_eq!(c.curves.delta_true.y, vec![0.0, 1.0, 0.0]);
    }

    #[test]
    fn test_sigma_override_detail() {
        let request = ComputeRequest::new(130.0, 133.0, Context::AnalyticRepeatability, LAB, LAB)
            .with_params(params(json!({ LAB: { "loa_half_pair": 3.0, "sigma": 1.2 } })));
        let c = computed(&compute(&request, None)).clone();
        let d = c.details.entry1;
        assert!(d.override_used);
        assert_eq!(d.sigma_used, 1.2);
        assert_eq!(d.sigma_override, Some(1.2));
        assert!((d.sd_diff.unwrap() - 3.0 / 1.96).abs() < 1e-12);
        assert!((d.sigma_from_loa.unwrap() - loa_half_to_sigma(3.0).unwrap()).abs() < 1e-12);
    }

    // --- scaling ---

    #[test]
    fn test_scaling_with_na() {
        let request = ComputeRequest::new(126.0, 154.0, Context::SequentialDraws, LAB, LAB)
            .with_params(lab_params())
            .with_scaling(140.0);
        let c = computed(&compute(&request, None)).clone();
        let base = loa_half_to_sigma(3.0).unwrap();
        assert!((c.inputs.sigma1 - base * 0.9).abs() < 1e-12);
        assert!((c.inputs.sigma2 - base * 1.1).abs() < 1e-12);
        assert!((c.details.entry1.scale_factor - 0.9).abs() < 1e-12);
        assert!((c.details.entry1.sigma_raw - base).abs() < 1e-12);
        assert!(c.details.scale_with_na);
    }

    #[test]
    fn test_scaling_off_by_default() {
        let request = ComputeRequest::new(126.0, 154.0, Context::SequentialDraws, LAB, LAB)
            .with_params(lab_params());
        let c = computed(&compute(&request, None)).clone();
        assert_eq!(c.details.entry1.scale_factor, 1.0);
        assert_eq!(c.details.na_ref, DEFAULT_NA_REF);
    }

    #[test]
    fn test_scaling_to_zero_sigma_rejected() {
        let request = ComputeRequest::new(0.0, 133.0, Context::SequentialDraws, LAB, LAB)
            .with_params(lab_params())
            .with_scaling(140.0);
        assert_eq!(
            compute(&request, None).errors(),
            ["Sigma values must be positive."]
        );
    }

    // --- shape ---

    #[test]
    fn test_curves_and_ladders() {
        let request = ComputeRequest::new(130.0, 133.0, Context::SequentialDraws, LAB, LAB)
            .with_params(lab_params());
        let c = computed(&compute(&request, None)).clone();
        assert_eq!(c.curves.na1.x.len(), 401);
        assert_eq!(c.curves.delta_null.x.len(), 401);
        let levels: Vec<f64> = c.intervals.na2_obs.iter().map(|r| r.level).collect();
        assert_eq!(levels, LADDER_LEVELS.to_vec());
    }

    #[test]
    fn test_compute_json_success_shape() {
        let payload = json!({
            "y1": 130, "y2": 133, "ci_level": 0.95, "threshold": 2,
            "context": "sequential_draws", "method1": LAB, "method2": LAB,
            "params": lab_params(),
        });
        let out = compute_json(&payload.to_string(), None).unwrap();
        let v: Value = serde_json::from_str(&out).unwrap();
        assert_eq!(v["errors"], json!([]));
        for key in [
            "inputs", "context", "ci_level", "threshold", "observed_delta", "na1", "na2",
            "delta_true", "delta_observed", "probabilities", "curves", "intervals", "details",
        ] {
            assert!(v.get(key).is_some(), "missing {key}");
        }
        assert_eq!(v["context"], "sequential_draws");
        assert!(v["probabilities"]["same_sample_p"].is_null());
        assert_eq!(v["intervals"]["delta_true"][1]["level"], json!(0.95));
        assert!(v["details"]["entry1"]["sigma_override"].is_null());
    }

    #[test]
    fn test_compute_json_rejection_shape() {
        let out = compute_json(r#"{"y1": "x"}"#, None).unwrap();
        let v: Value = serde_json::from_str(&out).unwrap();
        let keys: Vec<&String> = v.as_object().unwrap().keys().collect();
        assert_eq!(keys.len(), 2);
        assert!(!v["errors"].as_array().unwrap().is_empty());
        assert_eq!(v["warnings"], json!([]));
    }

    #[test]
    fn test_tiny_sigma_same_sample_computes() {
        let request = ComputeRequest::new(130.0, 133.0, Context::AnalyticRepeatability, LAB, LAB)
            .with_params(params(json!({ LAB: { "sigma": 1e-200 } })));
        let response = compute(&request, None);
        let c = computed(&response);
        assert!((c.na1.mean - 131.5).abs() < 1e-12);
        assert!(c.na1.sd > 0.0);
        assert_eq!(c.probabilities.chance_bucket_key, "very_unlikely");
    }

    #[test]
    fn test_compute_json_not_an_object() {
        for payload in ["[130, 133]", "130"] {
            let rejected = respond(payload, None);
            assert_eq!(rejected.errors().len(), 1);
            assert!(rejected.errors()[0].starts_with("Request is not a valid JSON object"));
        }
        let out = compute_json("{ y1: 130", None).unwrap();
        let v: Value = serde_json::from_str(&out).unwrap();
        assert_eq!(v["errors"].as_array().unwrap().len(), 1);
    }
}
