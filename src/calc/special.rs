use special::Gamma;

/// Below this many factors the rising factorial is accumulated term by term, which
/// avoids the cancellation of two large log-gamma values when x is large and k small.
const DIRECT_SUM_LIMIT : u64 = 32;

/// Digamma (psi) function, the derivative of the log-gamma function.
/// Only defined here for positive arguments; callers that may receive
/// non-positive values go through NumericPolicy::digamma.
pub fn digamma(x : f64) -> f64 {
    Gamma::digamma(x)
}

/// Natural logarithm of the gamma function.
pub fn ln_gamma(x : f64) -> f64 {
    Gamma::ln_gamma(x).0
}

/// Logarithm of the rising factorial (Pochhammer symbol):
/// log(x) + log(x+1) + ... + log(x+k-1) = lgamma(x+k) - lgamma(x).
/// Returns zero for k = 0 (the empty product).
///
/// When x is at least k the two log-gamma values are close and their difference
/// loses most of its digits, so the sum is taken as k log(x) + sum_j log1p(j / x) instead.
pub fn log_pochhammer(x : f64, k : u64) -> f64 {
    match k {
        0 => 0.0,
        k if x >= k as f64 => {
            (1..k).fold(k as f64 * x.ln(), |s, j| s + (j as f64 / x).ln_1p() )
        },
        k if k <= DIRECT_SUM_LIMIT => (0..k).fold(0.0, |s, j| s + (x + j as f64).ln() ),
        k => ln_gamma(x + k as f64) - ln_gamma(x)
    }
}

/// Difference digamma(x + k) - digamma(x), evaluated through the recurrence
/// sum_{j=0}^{k-1} 1 / (x + j). This is the quantity the recurrence-based
/// estimator accumulates incrementally over a sorted histogram.
pub fn digamma_difference(x : f64, k : u64) -> f64 {
    (0..k).fold(0.0, |s, j| s + 1. / (x + j as f64) )
}
