use nalgebra::*;
use rand::Rng;
use rand_distr::Distribution as _;
use serde::{Serialize, Deserialize};
use super::*;
use crate::calc::{ln_gamma, NumericPolicy};

/// Success probability together with the number of trials of each observation.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct BinomialParameter {

    pub p : f64,

    pub trials : u32

}

impl BinomialParameter {

    pub fn new(p : f64, trials : u32) -> Self {
        Self { p, trials }
    }

}

/// Binomial distribution over success counts, every observation sharing the number of
/// trials held by the parameter. Samples are a vector of success counts.
///
/// Maximum likelihood is the weighted fraction of successes, smoothed by epsilon:
/// p = (sum_n w_n k_n + epsilon) / (sum_n w_n * trials + epsilon), where trials is the
/// number of trials this distribution assumes when estimating.
///
/// ```
/// use polya::distr::*;
/// use nalgebra::*;
///
/// let binom = Binomial::new(4, 0.0);
/// let samples = DVector::from_vec(vec![1u32, 3, 2, 2]);
/// let par = binom.ml(&samples, &DVector::from_element(4, 1.0)).unwrap();
/// assert_eq!(par, BinomialParameter::new(0.5, 4));
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Binomial {

    trials : u32,

    epsilon : f64

}

impl Default for Binomial {

    fn default() -> Self {
        Self { trials : 1, epsilon : 0.0 }
    }

}

impl Binomial {

    pub fn new(trials : u32, epsilon : f64) -> Self {
        Self { trials, epsilon }
    }

    pub fn trials(&self) -> u32 {
        self.trials
    }

}

impl super::Distribution for Binomial {

    type Parameter = BinomialParameter;

    type Samples = DVector<u32>;

    fn rv<R>(&self, par : &BinomialParameter, n : usize, rng : &mut R) -> Result<DVector<u32>, DcmError>
    where
        R : Rng + ?Sized
    {
        check_probability(par.p)?;
        let sampler = rand_distr::Binomial::new(u64::from(par.trials), par.p)
            .map_err(|e| DcmError::Sampling(format!("{:?}", e)) )?;
        Ok(DVector::from_fn(n, |_, _| sampler.sample(rng) as u32 ))
    }

    fn ll(&self, par : &BinomialParameter, samples : &DVector<u32>) -> Result<DVector<f64>, DcmError> {
        check_probability(par.p)?;
        let mut out = DVector::zeros(samples.nrows());
        for (i, k) in samples.iter().enumerate() {
            out[i] = binomial_log_pmf(i, *k, par.trials, par.p)?;
        }
        Ok(out)
    }

    fn ml(&self, samples : &DVector<u32>, weights : &DVector<f64>) -> Result<BinomialParameter, DcmError> {
        check_weights(samples.nrows(), weights)?;
        let (successes, total) = samples.iter()
            .zip(weights.iter())
            .fold((0.0, 0.0), |(s, t), (k, w)| (s + w * f64::from(*k), t + w * f64::from(self.trials)) );
        let p = NumericPolicy::default().divide(successes + self.epsilon, total + self.epsilon, "binomial ml")?;
        Ok(BinomialParameter { p, trials : self.trials })
    }

    /// Posterior mean of the success probability under a Beta prior worth the trials
    /// of one observation (trials * p prior successes).
    fn given(&self, par : &BinomialParameter, samples : &DVector<u32>) -> Result<BinomialParameter, DcmError> {
        check_probability(par.p)?;
        let prior = f64::from(par.trials);
        let successes = samples.iter().fold(0.0, |s, k| s + f64::from(*k) );
        let total = prior + prior * samples.nrows() as f64;
        let p = NumericPolicy::default().divide(prior * par.p + successes, total, "binomial posterior")?;
        Ok(BinomialParameter { p, trials : par.trials })
    }

}

/// Binomial distribution whose observations each carry their own number of trials,
/// as (successes, trials) pairs. The parameter is the success probability alone.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct MixedBinomial {

    /// Smoothing added to both sides of the success fraction in ml.
    epsilon : f64,

    /// Trials of the observations produced by rv.
    trials : u32

}

impl Default for MixedBinomial {

    fn default() -> Self {
        Self { epsilon : 1E-3, trials : 1 }
    }

}

impl MixedBinomial {

    pub fn new(epsilon : f64, trials : u32) -> Self {
        Self { epsilon, trials }
    }

}

impl super::Distribution for MixedBinomial {

    type Parameter = f64;

    type Samples = Vec<(u32, u32)>;

    fn rv<R>(&self, par : &f64, n : usize, rng : &mut R) -> Result<Vec<(u32, u32)>, DcmError>
    where
        R : Rng + ?Sized
    {
        check_probability(*par)?;
        let sampler = rand_distr::Binomial::new(u64::from(self.trials), *par)
            .map_err(|e| DcmError::Sampling(format!("{:?}", e)) )?;
        Ok((0..n).map(|_| (sampler.sample(rng) as u32, self.trials) ).collect())
    }

    fn ll(&self, par : &f64, samples : &Vec<(u32, u32)>) -> Result<DVector<f64>, DcmError> {
        check_probability(*par)?;
        let mut out = DVector::zeros(samples.len());
        for (i, (k, n)) in samples.iter().enumerate() {
            out[i] = binomial_log_pmf(i, *k, *n, *par)?;
        }
        Ok(out)
    }

    fn ml(&self, samples : &Vec<(u32, u32)>, weights : &DVector<f64>) -> Result<f64, DcmError> {
        check_weights(samples.len(), weights)?;
        let (successes, total) = samples.iter()
            .zip(weights.iter())
            .fold((0.0, 0.0), |(s, t), ((k, n), w)| (s + w * f64::from(*k), t + w * f64::from(*n)) );
        NumericPolicy::default().divide(successes + self.epsilon, total + self.epsilon, "mixed binomial ml")
    }

    /// Posterior mean of the success probability under a Beta prior worth
    /// the configured number of trials.
    fn given(&self, par : &f64, samples : &Vec<(u32, u32)>) -> Result<f64, DcmError> {
        check_probability(*par)?;
        let prior = f64::from(self.trials);
        let (successes, total) = samples.iter()
            .fold((0.0, 0.0), |(s, t), (k, n)| (s + f64::from(*k), t + f64::from(*n)) );
        NumericPolicy::default().divide(prior * par + successes, prior + total, "mixed binomial posterior")
    }

}

/// log C(n, k) + k log(p) + (n - k) log(1 - p). Zero-count terms are dropped so the
/// boundary probabilities 0 and 1 give finite values where the pmf is one.
pub fn binomial_log_pmf(index : usize, k : u32, n : u32, p : f64) -> Result<f64, DcmError> {
    if k > n {
        return Err(DcmError::InvalidSample { index, successes : k, trials : n });
    }
    let (kf, nf) = (f64::from(k), f64::from(n));
    let mut ll = ln_gamma(nf + 1.) - ln_gamma(kf + 1.) - ln_gamma(nf - kf + 1.);
    if k > 0 {
        ll += kf * p.ln();
    }
    if n > k {
        ll += (nf - kf) * (-p).ln_1p();
    }
    Ok(ll)
}

fn check_probability(p : f64) -> Result<(), DcmError> {
    if p.is_finite() && p >= 0.0 && p <= 1.0 {
        Ok(())
    } else {
        Err(DcmError::InvalidParameter { index : 0, value : p })
    }
}

fn check_weights(n : usize, weights : &DVector<f64>) -> Result<(), DcmError> {
    if weights.nrows() != n {
        return Err(DcmError::DimensionMismatch { expected : n, found : weights.nrows() });
    }
    match weights.iter().enumerate().find(|(_, w)| !(w.is_finite() && **w >= 0.0) ) {
        Some((index, value)) => Err(DcmError::InvalidWeight { index, value : *value }),
        None => Ok(())
    }
}
