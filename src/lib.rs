//! Maximum-likelihood estimation for the Dirichlet-compound-multinomial (DCM, or Polya)
//! distribution: closed-form log-likelihood, posterior update, random variates,
//! and two fixed-point estimators for the concentration vector.
//!
//! ```
//! use polya::*;
//! use nalgebra::*;
//!
//! let counts = DMatrix::from_row_slice(4, 3, &[5, 0, 0, 0, 5, 0, 0, 0, 5, 2, 2, 1]);
//! let weights = DVector::from_element(4, 1.0);
//! let minka = estimate_minka(&counts, &weights, 1E-10, 1000).unwrap();
//! let wallach = estimate_wallach(&counts, &weights, 1E-10, 1000).unwrap();
//! assert_eq!(minka.termination, Termination::Converged);
//! assert!((&minka.alpha - &wallach.alpha).norm() < 1E-3 * minka.alpha.norm());
//! ```

/// Special functions and call-scoped floating-point policy.
pub mod calc;

/// Distribution capability (random variates, log-likelihood, maximum likelihood and
/// posterior) and its DCM, binomial and product implementations.
pub mod distr;

/// Fixed-point maximum-likelihood estimators for the DCM concentration vector
/// (digamma iteration and histogram-based digamma recurrence).
pub mod optim;

pub use distr::{Distribution, DcmError, Dcm, Binomial, BinomialParameter, MixedBinomial, Tuple, log_likelihood, posterior};

pub use optim::{Estimate, Termination, Method, estimate_minka, estimate_wallach};
