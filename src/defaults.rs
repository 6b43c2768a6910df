//! Per-method measurement variability defaults.
//!
//! The defaults document maps a scenario context and a measurement method
//! to the method's noise, given either directly as `sigma` or as a 95%
//! limits-of-agreement half-width `loa_half_pair`:
//!
//! ```json
//! {
//!   "version": 1,
//!   "units": "mmol/L",
//!   "defaults": {
//!     "analytic_repeatability": {
//!       "central_lab_indirect_ISE": { "loa_half_pair": 3.0, "sigma": 1.2 }
//!     }
//!   }
//! }
//! ```
//!
//! Numeric fields may be JSON numbers or numeric strings. `null` and `""`
//! mean "not given", which lets a form post an empty sigma override.

use std::collections::BTreeMap;
use std::path::Path;

use serde::Serialize;
use serde_json::{Map, Value};

use crate::error::{Result, UncertaintyError};
use crate::variability::loa_half_to_sigma;

/// Units assumed when a document does not name any.
pub const DEFAULT_UNITS: &str = "mmol/L";

const BUNDLED_DEFAULTS: &str = include_str!("../data/variability_defaults.json");

/// A JSON scalar read leniently as a number.
#[derive(Debug, Clone, Copy, PartialEq)]
pub(crate) enum Numeric {
    Absent,
    Present(f64),
    Malformed,
}

impl Numeric {
    pub(crate) fn read(value: Option<&Value>) -> Self {
        match value {
            None | Some(Value::Null) => Numeric::Absent,
            Some(Value::Number(n)) => n.as_f64().map_or(Numeric::Malformed, Numeric::Present),
            Some(Value::String(s)) if s.trim().is_empty() => Numeric::Absent,
            Some(Value::String(s)) => s
                .trim()
                .parse::<f64>()
                .map_or(Numeric::Malformed, Numeric::Present),
            Some(_) => Numeric::Malformed,
        }
    }
}

/// Variability parameters for one (context, method) pair.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize)]
pub struct MethodVariability {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub sigma: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub loa_half_pair: Option<f64>,
}

impl MethodVariability {
    /// Whether an explicit sigma takes precedence over the LoA.
    pub fn override_used(&self) -> bool {
        self.sigma.is_some()
    }

    /// Effective sigma: the explicit override if given, else derived from
    /// the LoA half-width.
    ///
    /// # Errors
    /// - `InvalidParameter` if the override or the LoA is not positive.
    /// - `MissingParameter` if neither is given.
    pub fn resolve_sigma(&self) -> Result<f64> {
        if let Some(sigma) = self.sigma {
            if !sigma.is_finite() || sigma <= 0.0 {
                return Err(UncertaintyError::invalid("Sigma must be positive."));
            }
            return Ok(sigma);
        }
        match self.loa_half_pair {
            Some(loa_half) => loa_half_to_sigma(loa_half),
            None => Err(UncertaintyError::missing(
                "LoA half-width must be provided when sigma is empty.",
            )),
        }
    }

    fn from_value(value: &Value, context: &str, method: &str) -> Result<Self> {
        let entry = value.as_object().ok_or_else(|| {
            UncertaintyError::schema(format!("Defaults for {context}/{method} must be a mapping."))
        })?;
        let field = |key: &str, label: &str| match Numeric::read(entry.get(key)) {
            Numeric::Absent => Ok(None),
            Numeric::Present(v) => Ok(Some(v)),
            Numeric::Malformed => Err(UncertaintyError::schema(format!(
                "{label} for {context}/{method} must be a number."
            ))),
        };
        Ok(Self {
            sigma: field("sigma", "Sigma")?,
            loa_half_pair: field("loa_half_pair", "LoA half-width")?,
        })
    }

    fn validate(&self, context: &str, method: &str) -> Result<()> {
        if self.sigma.is_none() && self.loa_half_pair.is_none() {
            return Err(UncertaintyError::schema(format!(
                "Defaults for {context}/{method} require loa_half_pair or sigma."
            )));
        }
        if matches!(self.loa_half_pair, Some(v) if !(v.is_finite() && v > 0.0)) {
            return Err(UncertaintyError::schema(format!(
                "LoA half-width for {context}/{method} must be positive."
            )));
        }
        if matches!(self.sigma, Some(v) if !(v.is_finite() && v > 0.0)) {
            return Err(UncertaintyError::schema(format!(
                "Sigma for {context}/{method} must be positive."
            )));
        }
        Ok(())
    }
}

/// Table of context → method → [`MethodVariability`].
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
#[serde(transparent)]
pub struct VariabilityDefaults {
    contexts: BTreeMap<String, BTreeMap<String, MethodVariability>>,
}

impl VariabilityDefaults {
    /// Reads the table structure from the value of a `defaults` key.
    ///
    /// Only shape is checked here; see [`validate`](Self::validate).
    pub fn from_value(value: &Value) -> Result<Self> {
        let contexts = value
            .as_object()
            .ok_or_else(|| UncertaintyError::schema("Defaults section must be a mapping."))?;

        let mut table = BTreeMap::new();
        for (context, methods) in contexts {
            let methods = methods.as_object().ok_or_else(|| {
                UncertaintyError::schema(format!("Defaults for {context} must be a mapping."))
            })?;
            let mut entries = BTreeMap::new();
            for (method, entry) in methods {
                entries.insert(
                    method.clone(),
                    MethodVariability::from_value(entry, context, method)?,
                );
            }
            table.insert(context.clone(), entries);
        }
        Ok(Self { contexts: table })
    }

    /// Checks every entry has a positive sigma or LoA.
    ///
    /// # Errors
    /// `Schema` naming the first offending context/method.
    pub fn validate(&self) -> Result<()> {
        for (context, method, entry) in self.iter() {
            entry.validate(context, method)?;
        }
        Ok(())
    }

    pub fn entry(&self, context: &str, method: &str) -> Option<&MethodVariability> {
        self.contexts.get(context)?.get(method)
    }

    pub fn contains_context(&self, context: &str) -> bool {
        self.contexts.contains_key(context)
    }

    /// All entries as `(context, method, entry)`, in key order.
    pub fn iter(&self) -> impl Iterator<Item = (&str, &str, &MethodVariability)> {
        self.contexts.iter().flat_map(|(context, methods)| {
            methods
                .iter()
                .map(move |(method, entry)| (context.as_str(), method.as_str(), entry))
        })
    }

    pub fn insert(&mut self, context: &str, method: &str, entry: MethodVariability) {
        self.contexts
            .entry(context.to_string())
            .or_default()
            .insert(method.to_string(), entry);
    }
}

/// A parsed defaults document.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct DefaultsDocument {
    pub version: u64,
    pub units: String,
    pub defaults: VariabilityDefaults,
}

impl DefaultsDocument {
    /// Reads document shape without checking entry values.
    ///
    /// Request payloads go through this path; their entries are checked
    /// lazily by [`resolve_sigma`].
    pub fn from_value(value: &Value) -> Result<Self> {
        let doc: &Map<String, Value> = value
            .as_object()
            .ok_or_else(|| UncertaintyError::schema("Defaults JSON must be an object."))?;
        let defaults = doc.get("defaults").ok_or_else(|| {
            UncertaintyError::schema("Defaults JSON must include a defaults section.")
        })?;
        Ok(Self {
            version: doc.get("version").and_then(Value::as_u64).unwrap_or(1),
            units: doc
                .get("units")
                .and_then(Value::as_str)
                .unwrap_or(DEFAULT_UNITS)
                .to_string(),
            defaults: VariabilityDefaults::from_value(defaults)?,
        })
    }

    /// Parses and fully validates a document.
    ///
    /// # Errors
    /// `Schema` for malformed JSON, a missing `defaults` section, non-object
    /// entries, entries with neither field, or non-positive values.
    pub fn parse(source: &str) -> Result<Self> {
        let value: Value = serde_json::from_str(source)
            .map_err(|e| UncertaintyError::schema(format!("Defaults JSON is not valid: {e}.")))?;
        let doc = Self::from_value(&value)?;
        doc.defaults.validate()?;
        Ok(doc)
    }

    /// The document shipped with the crate.
    pub fn bundled() -> Result<Self> {
        Self::parse(BUNDLED_DEFAULTS)
    }
}

/// Loads and validates a defaults document, or the bundled one if `path`
/// is `None`.
pub fn load_defaults(path: Option<&Path>) -> Result<DefaultsDocument> {
    let Some(path) = path else {
        tracing::debug!("using bundled variability defaults");
        return DefaultsDocument::bundled();
    };
    let source = std::fs::read_to_string(path).map_err(|source| UncertaintyError::Io {
        path: path.to_path_buf(),
        source,
    })?;
    let doc = DefaultsDocument::parse(&source)?;
    tracing::debug!(
        path = %path.display(),
        version = doc.version,
        units = %doc.units,
        "loaded variability defaults"
    );
    Ok(doc)
}

/// Effective sigma for `method` under `context`.
///
/// # Errors
/// - `MissingParameter` if the table has no such entry or the entry has
///   neither sigma nor LoA.
/// - `InvalidParameter` if the chosen source is not positive.
pub fn resolve_sigma(table: &VariabilityDefaults, context: &str, method: &str) -> Result<f64> {
    table
        .entry(context, method)
        .ok_or_else(|| {
            UncertaintyError::missing(format!("No variability defaults for {context}/{method}."))
        })?
        .resolve_sigma()
}
