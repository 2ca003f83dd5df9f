use nalgebra::*;
use serde::{Serialize, Deserialize};
use tracing::{debug, info};
use super::*;
use crate::calc::row_norms;

/// Smallest concentration the digamma iteration lets a component reach.
pub const MINKA_FLOOR : f64 = 1E-16;

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct MinkaConfig {

    #[serde(flatten)]
    pub fixed : FixedPoint,

    /// Components falling below this value are clamped to it.
    pub floor : f64

}

impl Default for MinkaConfig {

    fn default() -> Self {
        Self { fixed : FixedPoint::default(), floor : MINKA_FLOOR }
    }

}

/// Fixed-point maximum-likelihood estimator for the DCM concentration vector, applying
/// at every sweep the update
///
/// alpha_d <- alpha_d * sum_n w_n [psi(alpha_d + x_nd) - psi(alpha_d)] / sum_n w_n [psi(|x_n| + A) - psi(A)]
///
/// where A is the sum of alpha and |x_n| the L1 norm of row n. Each sweep evaluates the
/// digamma function for every non-zero entry of the count matrix, so its cost grows with N * D.
///
/// # References
/// Minka, T. P. (2000). Estimating a Dirichlet distribution. Technical report, MIT.
#[derive(Debug, Clone, Copy, Default)]
pub struct Minka {
    config : MinkaConfig
}

/// Per-call quantities computed once from the count matrix.
struct RowStats {

    norms : Vec<u64>

}

impl Minka {

    pub fn new(config : MinkaConfig) -> Self {
        Self { config }
    }

    pub fn config(&self) -> &MinkaConfig {
        &self.config
    }

    /// Iterates from alpha = (1, ..., 1) until the summed relative change of a sweep
    /// falls below the threshold or the iteration budget runs out.
    pub fn estimate(&self, counts : &DMatrix<u32>, weights : &DVector<f64>) -> Result<Estimate, DcmError> {
        let fixed = &self.config.fixed;
        validate(counts, weights, fixed)?;
        let stats = RowStats { norms : row_norms(counts) };
        let mut alpha = DVector::from_element(counts.ncols(), 1.0);
        let mut clamped = 0;
        for iteration in 1..=fixed.max_iterations {
            let sweep = self.sweep_with(&stats, counts, weights, &mut alpha)?;
            clamped += sweep.clamped;
            debug!(iteration, difference = sweep.difference, "minka sweep");
            if sweep.difference < fixed.threshold {
                info!(iterations = iteration, "minka estimate converged");
                return Ok(Estimate { alpha, termination : Termination::Converged, iterations : iteration, clamped });
            }
        }
        info!(iterations = fixed.max_iterations, "minka estimate exhausted iteration budget");
        Ok(Estimate { alpha, termination : Termination::Exhausted, iterations : fixed.max_iterations, clamped })
    }

    /// Applies a single fixed-point update to alpha in place.
    pub fn sweep(&self, counts : &DMatrix<u32>, weights : &DVector<f64>, alpha : &mut DVector<f64>) -> Result<Sweep, DcmError> {
        validate(counts, weights, &self.config.fixed)?;
        if alpha.nrows() != counts.ncols() {
            return Err(DcmError::DimensionMismatch { expected : counts.ncols(), found : alpha.nrows() });
        }
        let stats = RowStats { norms : row_norms(counts) };
        self.sweep_with(&stats, counts, weights, alpha)
    }

    fn sweep_with(
        &self,
        stats : &RowStats,
        counts : &DMatrix<u32>,
        weights : &DVector<f64>,
        alpha : &mut DVector<f64>
    ) -> Result<Sweep, DcmError> {
        let policy = &self.config.fixed.policy;
        let alpha_sum = policy.check(alpha.sum(), "minka alpha sum")?;
        let psi_sum = policy.digamma(alpha_sum, "minka alpha sum")?;

        // Rows of norm zero contribute psi(A) - psi(A) = 0 and are skipped.
        let mut den = 0.0;
        for (norm, w) in stats.norms.iter().zip(weights.iter()) {
            if *norm > 0 {
                den += w * (policy.digamma(*norm as f64 + alpha_sum, "minka denominator")? - psi_sum);
            }
        }
        let den = policy.check(den, "minka denominator")?;

        let mut difference = 0.0;
        let mut clamped = 0;
        for (d, col) in counts.column_iter().enumerate() {
            let a = alpha[d];
            let psi_a = policy.digamma(a, "minka numerator")?;
            let mut num = 0.0;
            for (c, w) in col.iter().zip(weights.iter()) {
                if *c > 0 {
                    num += w * (policy.digamma(a + f64::from(*c), "minka numerator")? - psi_a);
                }
            }
            let num = policy.check(num, "minka numerator")?;
            let ratio = policy.divide(num, den, "minka ratio")?;
            alpha[d] = policy.multiply(a, ratio, "minka update")?;
            difference += (ratio - 1.).abs();
            if clamp_to_floor(&mut alpha[d], self.config.floor, d) {
                clamped += 1;
            }
        }
        Ok(Sweep { difference, clamped })
    }

}
