use nalgebra::*;
use serde::{Serialize, Deserialize};
use std::fs::File;
use std::io::Read;
use std::path::Path;
use std::fmt;
use tracing::debug;
use crate::calc::NumericPolicy;
use crate::distr::DcmError;

/// Weighted histograms of row norms and per-dimension counts, consumed by the
/// recurrence-based estimator.
pub mod histogram;

pub use histogram::*;

/// Digamma-based fixed-point iteration over the full count matrix.
pub mod minka;

pub use minka::*;

/// Digamma-recurrence fixed-point iteration over precomputed histograms.
pub mod wallach;

pub use wallach::*;

/// Settings shared by both fixed-point estimators.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct FixedPoint {

    /// Iteration stops once the summed |ratio - 1| over all dimensions of a sweep
    /// falls below this value.
    pub threshold : f64,

    /// Upper bound on the number of sweeps.
    pub max_iterations : usize,

    /// Handling of floating-point conditions met during the call.
    pub policy : NumericPolicy

}

impl Default for FixedPoint {

    fn default() -> Self {
        Self { threshold : 1E-6, max_iterations : 1000, policy : NumericPolicy::default() }
    }

}

impl FixedPoint {

    pub fn new(threshold : f64, max_iterations : usize) -> Self {
        Self { threshold, max_iterations, ..Default::default() }
    }

}

/// Why a fixed-point iteration stopped.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Termination {

    /// The summed relative change of a sweep fell below the threshold.
    Converged,

    /// The iteration budget ran out before convergence.
    Exhausted,

    /// The concentration parameters grew past the divergence limit; the
    /// estimate is the first value whose sum exceeds the limit.
    Diverged

}

impl fmt::Display for Termination {

    fn fmt(&self, f : &mut fmt::Formatter) -> fmt::Result {
        let name = match self {
            Termination::Converged => "converged",
            Termination::Exhausted => "exhausted",
            Termination::Diverged => "diverged"
        };
        f.write_str(name)
    }

}

/// Result of a fixed-point estimation: the concentration vector plus how the
/// iteration ended.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Estimate {

    pub alpha : DVector<f64>,

    pub termination : Termination,

    /// Number of complete sweeps performed.
    pub iterations : usize,

    /// How many times a component was clamped to the estimator floor, over all sweeps.
    /// A large value usually points at a dimension with no observed counts.
    pub clamped : usize

}

impl Estimate {

    pub fn converged(&self) -> bool {
        self.termination == Termination::Converged
    }

    pub fn into_alpha(self) -> DVector<f64> {
        self.alpha
    }

}

/// Outcome of a single fixed-point sweep over all dimensions.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Sweep {

    /// Sum over dimensions of |ratio_d - 1|.
    pub difference : f64,

    /// Number of components clamped to the floor during this sweep.
    pub clamped : usize

}

/// Estimator behind the maximum-likelihood operation of the DCM distribution.
/// Serialized with a "method" tag, e.g.
/// `{ "method" : "wallach", "threshold" : 1e-8, "divergence_limit" : 1e6 }`.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(tag = "method", rename_all = "lowercase")]
pub enum Method {
    Minka(MinkaConfig),
    Wallach(WallachConfig)
}

impl Default for Method {

    fn default() -> Self {
        Method::Wallach(WallachConfig::default())
    }

}

impl Method {

    pub fn estimate(&self, counts : &DMatrix<u32>, weights : &DVector<f64>) -> Result<Estimate, DcmError> {
        match self {
            Method::Minka(config) => Minka::new(*config).estimate(counts, weights),
            Method::Wallach(config) => Wallach::new(*config).estimate(counts, weights)
        }
    }

    pub fn fixed_point(&self) -> &FixedPoint {
        match self {
            Method::Minka(config) => &config.fixed,
            Method::Wallach(config) => &config.fixed
        }
    }

    pub fn load_from_path<P>(path : P) -> Result<Self, anyhow::Error>
    where
        P : AsRef<Path>
    {
        let f = File::open(path)?;
        Self::load(f)
    }

    pub fn load<R>(mut reader : R) -> Result<Self, anyhow::Error>
    where
        R : Read
    {
        let mut content = String::new();
        reader.read_to_string(&mut content)?;
        let method : Method = serde_json::from_str(&content[..])?;
        Ok(method)
    }

}

/// Verifies the count matrix, weights and fixed-point settings agree before an estimator runs.
pub(crate) fn validate(counts : &DMatrix<u32>, weights : &DVector<f64>, fixed : &FixedPoint) -> Result<(), DcmError> {
    if counts.ncols() == 0 {
        return Err(DcmError::NoDimensions);
    }
    if weights.nrows() != counts.nrows() {
        return Err(DcmError::DimensionMismatch { expected : counts.nrows(), found : weights.nrows() });
    }
    if let Some((index, value)) = weights.iter().enumerate().find(|(_, w)| !(w.is_finite() && **w >= 0.0) ) {
        return Err(DcmError::InvalidWeight { index, value : *value });
    }
    if !(fixed.threshold.is_finite() && fixed.threshold > 0.0) {
        return Err(DcmError::InvalidThreshold(fixed.threshold));
    }
    Ok(())
}

/// Applies the estimator floor to a single component, returning whether it was clamped.
pub(crate) fn clamp_to_floor(alpha : &mut f64, floor : f64, dim : usize) -> bool {
    if *alpha < floor {
        debug!(dim, value = *alpha, floor, "clamping concentration to floor");
        *alpha = floor;
        true
    } else {
        false
    }
}

/// Maximum-likelihood concentration vector using the digamma fixed point, starting from a
/// vector of ones and using the default numeric policy.
pub fn estimate_minka(
    counts : &DMatrix<u32>,
    weights : &DVector<f64>,
    threshold : f64,
    max_iterations : usize
) -> Result<Estimate, DcmError> {
    let config = MinkaConfig { fixed : FixedPoint::new(threshold, max_iterations), ..Default::default() };
    Minka::new(config).estimate(counts, weights)
}

/// Maximum-likelihood concentration vector using the digamma recurrence over count
/// histograms, starting from a vector of ones and using the default numeric policy
/// and divergence limit.
pub fn estimate_wallach(
    counts : &DMatrix<u32>,
    weights : &DVector<f64>,
    threshold : f64,
    max_iterations : usize
) -> Result<Estimate, DcmError> {
    let config = WallachConfig { fixed : FixedPoint::new(threshold, max_iterations), ..Default::default() };
    Wallach::new(config).estimate(counts, weights)
}
