use nalgebra::*;
use serde::{Serialize, Deserialize};
use tracing::{debug, info, warn};
use super::*;

/// Smallest concentration the recurrence iteration lets a component reach
/// (the smallest positive normal double).
pub const WALLACH_FLOOR : f64 = f64::MIN_POSITIVE;

/// Sum of the concentration vector above which the iteration is abandoned.
pub const DIVERGENCE_LIMIT : f64 = 1E6;

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct WallachConfig {

    #[serde(flatten)]
    pub fixed : FixedPoint,

    /// Components falling below this value are clamped to it.
    pub floor : f64,

    /// The iteration stops (reporting Termination::Diverged) as soon as the sum of
    /// the concentration vector exceeds this value.
    pub divergence_limit : f64

}

impl Default for WallachConfig {

    fn default() -> Self {
        Self { fixed : FixedPoint::default(), floor : WALLACH_FLOOR, divergence_limit : DIVERGENCE_LIMIT }
    }

}

/// Fixed-point maximum-likelihood estimator for the DCM concentration vector that solves
/// the same equation as Minka, but replaces each digamma difference
/// psi(a + k) - psi(a) by the finite sum 1/a + 1/(a+1) + ... + 1/(a+k-1). Rows sharing a
/// count value are collapsed into a single histogram bin beforehand, so a sweep costs
/// O(max count + distinct counts) per dimension instead of O(N). This pays off for sparse
/// data with many repeated small counts (e.g. word counts over documents).
///
/// # References
/// Wallach, H. M. (2008). Structured topic models for language. PhD thesis, University of Cambridge.
#[derive(Debug, Clone, Copy, Default)]
pub struct Wallach {
    config : WallachConfig
}

impl Wallach {

    pub fn new(config : WallachConfig) -> Self {
        Self { config }
    }

    pub fn config(&self) -> &WallachConfig {
        &self.config
    }

    /// Builds the histograms for this call and iterates from alpha = (1, ..., 1).
    /// The histograms are dropped when this returns, whatever the outcome.
    pub fn estimate(&self, counts : &DMatrix<u32>, weights : &DVector<f64>) -> Result<Estimate, DcmError> {
        validate(counts, weights, &self.config.fixed)?;
        let hist = Histograms::build(counts, weights);
        self.estimate_from(&hist)
    }

    /// Iterates over already-built histograms (for callers re-estimating from the same data
    /// under several configurations).
    pub fn estimate_from(&self, hist : &Histograms) -> Result<Estimate, DcmError> {
        let fixed = &self.config.fixed;
        if hist.ndims() == 0 {
            return Err(DcmError::NoDimensions);
        }
        if !(fixed.threshold.is_finite() && fixed.threshold > 0.0) {
            return Err(DcmError::InvalidThreshold(fixed.threshold));
        }
        let mut alpha = DVector::from_element(hist.ndims(), 1.0);
        let mut clamped = 0;
        for iteration in 0..fixed.max_iterations {
            let sum_alpha = alpha.sum();
            if sum_alpha > self.config.divergence_limit {
                warn!(iterations = iteration, sum_alpha, "wallach estimate diverged");
                return Ok(Estimate { alpha, termination : Termination::Diverged, iterations : iteration, clamped });
            }
            let sweep = self.sweep(hist, &mut alpha)?;
            clamped += sweep.clamped;
            debug!(iteration = iteration + 1, difference = sweep.difference, sum_alpha, "wallach sweep");
            if sweep.difference < fixed.threshold {
                info!(iterations = iteration + 1, "wallach estimate converged");
                return Ok(Estimate { alpha, termination : Termination::Converged, iterations : iteration + 1, clamped });
            }
        }
        let sum_alpha = alpha.sum();
        if sum_alpha > self.config.divergence_limit {
            warn!(iterations = fixed.max_iterations, sum_alpha, "wallach estimate diverged");
            return Ok(Estimate { alpha, termination : Termination::Diverged, iterations : fixed.max_iterations, clamped });
        }
        info!(iterations = fixed.max_iterations, "wallach estimate exhausted iteration budget");
        Ok(Estimate { alpha, termination : Termination::Exhausted, iterations : fixed.max_iterations, clamped })
    }

    /// Applies a single fixed-point update to alpha in place.
    pub fn sweep(&self, hist : &Histograms, alpha : &mut DVector<f64>) -> Result<Sweep, DcmError> {
        if alpha.nrows() != hist.ndims() {
            return Err(DcmError::DimensionMismatch { expected : hist.ndims(), found : alpha.nrows() });
        }
        let policy = &self.config.fixed.policy;
        let sum_alpha = policy.check(alpha.sum(), "wallach alpha sum")?;
        let s = policy.check(hist.norms().rising_sum(sum_alpha), "wallach denominator")?;
        let mut difference = 0.0;
        let mut clamped = 0;
        for (d, dim_hist) in hist.dims().iter().enumerate() {
            let a = alpha[d];
            let s_k = policy.check(dim_hist.rising_sum(a), "wallach numerator")?;
            let ratio = policy.divide(s_k, s, "wallach ratio")?;
            alpha[d] = policy.multiply(a, ratio, "wallach update")?;
            difference += (ratio - 1.).abs();
            if clamp_to_floor(&mut alpha[d], self.config.floor, d) {
                clamped += 1;
            }
        }
        Ok(Sweep { difference, clamped })
    }

}
