//! # sodium-uncertainty
//!
//! Measurement-uncertainty statistics for a pair of sodium results.
//!
//! Given two readings and each method's measurement noise, this crate
//! computes posterior summaries for each reading and for their difference.
//! It also derives confidence intervals, the probability that the gap
//! arose from noise alone, and density curves for plotting.
//!
//! ## Modules
//!
//! - [`special`]: erf and the standard normal Φ, φ, Φ⁻¹
//! - [`normal`]: normal primitives with one shared zero-sd policy
//! - [`variability`]: limits-of-agreement ↔ sigma conversion
//! - [`scenario`]: same-sample and sequential-draws models
//! - [`probability`]: p-values, buckets, directional probabilities
//! - [`defaults`]: the per-method variability table
//! - [`request`]: JSON request/response adapter
//!
//! ## Example
//!
//! ```
//! use sodium_uncertainty::scenario::Context;
//! use sodium_uncertainty::variability::loa_half_to_sigma;
//!
//! let sigma = loa_half_to_sigma(3.0).unwrap();
//! let result = Context::SequentialDraws
//!     .evaluate(130.0, 133.0, sigma, sigma, 0.95)
//!     .unwrap();
//! assert!((result.delta_true().half_width() - 3.0).abs() < 0.05);
//! ```

pub mod cli;
pub mod defaults;
pub mod error;
pub mod normal;
pub mod probability;
pub mod request;
pub mod scenario;
pub mod special;
pub mod variability;

pub use defaults::{load_defaults, resolve_sigma, DefaultsDocument, VariabilityDefaults};
pub use error::{Result, UncertaintyError};
pub use normal::{Curve, Gaussian, NormalSummary};
pub use request::{compute, compute_json, respond, ComputeRequest, ComputeResponse};
pub use scenario::{Context, ScenarioResult};
