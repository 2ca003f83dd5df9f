use nalgebra::*;
use std::fmt::Debug;
use rand::Rng;
use thiserror::Error;
use crate::calc::Condition;

/// Dirichlet-compound-multinomial distribution (closed-form log-likelihood,
/// posterior parameter, random variates and maximum-likelihood estimation).
pub mod dcm;

pub use dcm::*;

/// Binomial success counts, with shared or per-observation numbers of trials.
pub mod binomial;

pub use binomial::*;

/// Product of two independent distributions.
pub mod tuple;

pub use tuple::*;

/// Capability shared by the component distributions an expectation-maximization
/// driver works with. A distribution value carries only its configuration
/// (estimation method, sample norm, etc.); parameters are passed explicitly, so the
/// same distribution can evaluate and re-estimate the parameters of many mixture
/// components. Samples are batched: an implementor decides how a batch is laid out
/// (the DCM uses a count matrix with one observation per row).
///
/// The four operations map to what a mixture driver needs: drawing synthetic data
/// (rv), scoring observations under a parameter (ll), re-estimating a parameter from
/// responsibility-weighted observations (ml), and conditioning a parameter on
/// observed data (given).
pub trait Distribution
    where Self : Debug
{

    type Parameter : Clone + Debug;

    type Samples : Debug;

    /// Draws n independent observations under the informed parameter.
    fn rv<R>(&self, par : &Self::Parameter, n : usize, rng : &mut R) -> Result<Self::Samples, DcmError>
    where
        R : Rng + ?Sized;

    /// Log-likelihood of each observation in the batch, in batch order.
    fn ll(&self, par : &Self::Parameter, samples : &Self::Samples) -> Result<DVector<f64>, DcmError>;

    /// Maximum-likelihood parameter given observations weighted by the informed
    /// (possibly fractional) weights, one per observation.
    fn ml(&self, samples : &Self::Samples, weights : &DVector<f64>) -> Result<Self::Parameter, DcmError>;

    /// Posterior parameter after observing the batch, starting from par.
    fn given(&self, par : &Self::Parameter, samples : &Self::Samples) -> Result<Self::Parameter, DcmError>;

}

#[derive(Debug, Clone, PartialEq, Error)]
pub enum DcmError {

    #[error("Dimension mismatch: expected {expected}, found {found}")]
    DimensionMismatch { expected : usize, found : usize },

    #[error("Count data must have at least one dimension")]
    NoDimensions,

    #[error("Parameter component {index} has invalid value {value} (must be positive and finite)")]
    InvalidParameter { index : usize, value : f64 },

    #[error("Weight {index} has invalid value {value} (must be non-negative and finite)")]
    InvalidWeight { index : usize, value : f64 },

    #[error("Sample {index} has {successes} successes out of {trials} trials")]
    InvalidSample { index : usize, successes : u32, trials : u32 },

    #[error("Convergence threshold {0} must be positive and finite")]
    InvalidThreshold(f64),

    #[error("Floating-point {condition} at {context}")]
    Numeric { condition : Condition, context : &'static str },

    #[error("Could not draw random variate: {0}")]
    Sampling(String)

}

/// Verifies every component of a concentration vector is strictly positive and finite.
pub fn check_alpha(alpha : &DVector<f64>) -> Result<(), DcmError> {
    if alpha.nrows() == 0 {
        return Err(DcmError::NoDimensions);
    }
    match alpha.iter().enumerate().find(|(_, a)| !(a.is_finite() && **a > 0.0) ) {
        Some((index, value)) => Err(DcmError::InvalidParameter { index, value : *value }),
        None => Ok(())
    }
}
