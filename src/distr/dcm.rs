use nalgebra::*;
use nalgebra::storage::*;
use rand::Rng;
use rand_distr::{Distribution as _, Gamma, Binomial};
use serde::{Serialize, Deserialize};
use super::*;
use crate::calc::{log_pochhammer, count_sum};
use crate::optim::{Method, Estimate};

/// The Dirichlet-compound-multinomial (Polya) distribution over count vectors
/// of a fixed L1 norm: multinomial proportions are drawn from a Dirichlet with
/// concentration alpha, then counts are drawn from that multinomial. Smaller
/// concentrations mean burstier data (counts concentrated in few dimensions);
/// as the concentrations grow the distribution approaches a multinomial.
///
/// The distribution value holds how parameters are estimated (Method) and the
/// norm of the count vectors it draws; the concentration vector itself is
/// passed to each operation.
///
/// # Example
///
/// ```
/// use polya::distr::*;
/// use nalgebra::*;
///
/// let dcm = Dcm::default();
/// let counts = DMatrix::from_row_slice(4, 3, &[5, 0, 0, 0, 5, 0, 0, 0, 5, 2, 2, 1]);
/// let alpha = dcm.ml(&counts, &DVector::from_element(4, 1.0)).unwrap();
/// let ll = dcm.ll(&alpha, &counts).unwrap();
/// assert_eq!(ll.nrows(), 4);
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Dcm {

    method : Method,

    /// L1 norm of the count vectors produced by rv.
    norm : u32

}

impl Default for Dcm {

    fn default() -> Self {
        Self { method : Method::default(), norm : 1 }
    }

}

impl Dcm {

    pub fn new(method : Method, norm : u32) -> Self {
        Self { method, norm }
    }

    pub fn method(&self) -> &Method {
        &self.method
    }

    pub fn norm(&self) -> u32 {
        self.norm
    }

    /// Full estimation result (alpha plus the reason the iteration stopped), for
    /// callers that want to tell a converged estimate from an exhausted or diverged one.
    pub fn estimate(&self, counts : &DMatrix<u32>, weights : &DVector<f64>) -> Result<Estimate, DcmError> {
        self.method.estimate(counts, weights)
    }

}

impl super::Distribution for Dcm {

    type Parameter = DVector<f64>;

    type Samples = DMatrix<u32>;

    fn rv<R>(&self, par : &DVector<f64>, n : usize, rng : &mut R) -> Result<DMatrix<u32>, DcmError>
    where
        R : Rng + ?Sized
    {
        check_alpha(par)?;
        let gammas = par.iter()
            .map(|a| Gamma::<f64>::new(*a, 1.0).map_err(|e| DcmError::Sampling(format!("{:?}", e)) ) )
            .collect::<Result<Vec<_>, _>>()?;
        let mut out = DMatrix::zeros(n, par.nrows());
        for i in 0..n {
            let row = draw_counts(&gammas, self.norm, rng)?;
            out.row_mut(i).iter_mut().zip(row.iter()).for_each(|(o, c)| *o = *c );
        }
        Ok(out)
    }

    fn ll(&self, par : &DVector<f64>, samples : &DMatrix<u32>) -> Result<DVector<f64>, DcmError> {
        if samples.ncols() != par.nrows() {
            return Err(DcmError::DimensionMismatch { expected : par.nrows(), found : samples.ncols() });
        }
        let mut out = DVector::zeros(samples.nrows());
        for (i, row) in samples.row_iter().enumerate() {
            out[i] = log_likelihood(par, &row)?;
        }
        Ok(out)
    }

    fn ml(&self, samples : &DMatrix<u32>, weights : &DVector<f64>) -> Result<DVector<f64>, DcmError> {
        self.estimate(samples, weights).map(|est| est.into_alpha() )
    }

    fn given(&self, par : &DVector<f64>, samples : &DMatrix<u32>) -> Result<DVector<f64>, DcmError> {
        posterior(par, samples)
    }

}

/// Draws one count vector of L1 norm `norm`: Dirichlet proportions from independent
/// Gamma(alpha_d, 1) variates, then multinomial counts through a chain of binomials
/// (each dimension takes its share of what the previous dimensions left over).
fn draw_counts<R>(gammas : &[Gamma<f64>], norm : u32, rng : &mut R) -> Result<Vec<u32>, DcmError>
where
    R : Rng + ?Sized
{
    let g : Vec<f64> = gammas.iter().map(|gamma| gamma.sample(rng) ).collect();
    let mut rest : f64 = g.iter().sum();
    if !(rest.is_finite() && rest > 0.0) {
        return Err(DcmError::Sampling(format!("Degenerate Dirichlet draw (gamma sum = {})", rest)));
    }
    let mut counts = vec![0u32; g.len()];
    let mut left = u64::from(norm);
    let last = g.len() - 1;
    for (d, gd) in g.iter().enumerate() {
        if left == 0 {
            break;
        }
        if d == last || *gd >= rest {
            counts[d] = left as u32;
            break;
        }
        let p = (gd / rest).max(0.0);
        let c = if p > 0.0 {
            Binomial::new(left, p)
                .map_err(|e| DcmError::Sampling(format!("{:?}", e)) )?
                .sample(rng)
        } else {
            0
        };
        counts[d] = c as u32;
        left -= c;
        rest -= gd;
    }
    Ok(counts)
}

/// Log-likelihood of a single count vector under the DCM with concentration alpha:
///
/// sum_d logPochhammer(alpha_d, x_d) - logPochhammer(sum(alpha), sum(x)),
///
/// where logPochhammer(a, k) = log(a) + log(a+1) + ... + log(a+k-1). This is the probability
/// of one particular sequence of draws with those counts; it omits the multinomial coefficient,
/// which does not depend on alpha. The sample may be any row or column view of counts.
///
/// ```
/// use polya::distr::log_likelihood;
/// use nalgebra::*;
///
/// let alpha = DVector::from_element(3, 1.0);
/// let sample = DVector::from_vec(vec![5u32, 0, 0]);
/// let ll = log_likelihood(&alpha, &sample).unwrap();
/// assert!((ll + (21.0f64).ln()).abs() < 1E-12);
/// ```
pub fn log_likelihood<R, C, S>(alpha : &DVector<f64>, sample : &Matrix<u32, R, C, S>) -> Result<f64, DcmError>
where
    R : Dim,
    C : Dim,
    S : Storage<u32, R, C>
{
    if sample.len() != alpha.nrows() {
        return Err(DcmError::DimensionMismatch { expected : alpha.nrows(), found : sample.len() });
    }
    check_alpha(alpha)?;
    let ll = alpha.iter()
        .zip(sample.iter())
        .fold(0.0, |ll, (a, x)| ll + log_pochhammer(*a, u64::from(*x)) );
    Ok(ll - log_pochhammer(alpha.sum(), count_sum(sample)))
}

/// Posterior concentration after observing the rows of samples: alpha plus the
/// column sums of the count matrix (not normalized).
pub fn posterior(alpha : &DVector<f64>, samples : &DMatrix<u32>) -> Result<DVector<f64>, DcmError> {
    if samples.ncols() != alpha.nrows() {
        return Err(DcmError::DimensionMismatch { expected : alpha.nrows(), found : samples.ncols() });
    }
    let mut post = alpha.clone();
    for (p, col) in post.iter_mut().zip(samples.column_iter()) {
        *p += count_sum(&col) as f64;
    }
    Ok(post)
}

#[cfg(test)]
mod tests {

    use super::*;
    use crate::calc::ln_gamma;
    use rand::SeedableRng;
    use rand::rngs::StdRng;

    #[test]
    fn log_likelihood_concentrated_sample() {
        let alpha = DVector::from_element(3, 1.0);
        let sample = DVector::from_vec(vec![5u32, 0, 0]);
        let ll = log_likelihood(&alpha, &sample).unwrap();

        // lgamma(alpha_d + x_d) - lgamma(alpha_d) summed, minus the same for the totals.
        let expected = (ln_gamma(6.0) - ln_gamma(1.0)) - (ln_gamma(8.0) - ln_gamma(3.0));
        assert!((ll - expected).abs() < 1E-9 * expected.abs());
        assert!((ll - (1.0f64 / 21.0).ln()).abs() < 1E-9);
    }

    #[test]
    fn log_likelihood_matches_gamma_functions() {
        let alpha = DVector::from_vec(vec![0.3, 2.5, 11.0, 0.05]);
        let samples = DMatrix::from_row_slice(3, 4, &[0, 3, 40, 1, 7, 0, 0, 0, 12, 50, 3, 2]);
        for row in samples.row_iter() {
            let n : u32 = row.iter().sum();
            let mut expected = ln_gamma(alpha.sum()) - ln_gamma(alpha.sum() + n as f64);
            for (a, x) in alpha.iter().zip(row.iter()) {
                expected += ln_gamma(a + *x as f64) - ln_gamma(*a);
            }
            let ll = log_likelihood(&alpha, &row).unwrap();
            assert!((ll - expected).abs() < 1E-9 * expected.abs().max(1.0));
        }
    }

    #[test]
    fn log_likelihood_dimension_mismatch() {
        let alpha = DVector::from_element(3, 1.0);
        let sample = DVector::from_vec(vec![1u32, 2]);
        assert_eq!(
            log_likelihood(&alpha, &sample),
            Err(DcmError::DimensionMismatch { expected : 3, found : 2 })
        );
        let alpha = DVector::from_vec(vec![1.0, 0.0]);
        assert_eq!(
            log_likelihood(&alpha, &sample),
            Err(DcmError::InvalidParameter { index : 1, value : 0.0 })
        );
    }

    #[test]
    fn empty_sample_has_zero_log_likelihood() {
        let alpha = DVector::from_vec(vec![0.4, 1.2]);
        let sample = DVector::from_vec(vec![0u32, 0]);
        assert_eq!(log_likelihood(&alpha, &sample).unwrap(), 0.0);
    }

    #[test]
    fn posterior_adds_column_sums() {
        let alpha = DVector::from_vec(vec![0.5, 1.0, 2.0]);
        let samples = DMatrix::from_row_slice(2, 3, &[1, 0, 4, 2, 3, 0]);
        let post = posterior(&alpha, &samples).unwrap();
        assert_eq!(post, DVector::from_vec(vec![3.5, 4.0, 6.0]));
        assert!(posterior(&alpha, &DMatrix::<u32>::zeros(1, 2)).is_err());
        assert_eq!(Dcm::default().given(&alpha, &samples).unwrap(), post);
    }

    #[test]
    fn batched_log_likelihood_per_row() {
        let dcm = Dcm::default();
        let alpha = DVector::from_vec(vec![0.5, 1.0, 2.0]);
        let samples = DMatrix::from_row_slice(2, 3, &[1, 0, 4, 2, 3, 0]);
        let ll = dcm.ll(&alpha, &samples).unwrap();
        assert_eq!(ll.nrows(), 2);
        assert_eq!(ll[1], log_likelihood(&alpha, &samples.row(1)).unwrap());
        assert!(dcm.ll(&alpha, &DMatrix::<u32>::zeros(2, 4)).is_err());
    }

    #[test]
    fn variates_have_fixed_norm() {
        let mut rng = StdRng::seed_from_u64(42);
        let dcm = Dcm::new(Method::default(), 25);
        let alpha = DVector::from_vec(vec![0.7, 3.0, 1.5, 0.2]);
        let samples = dcm.rv(&alpha, 200, &mut rng).unwrap();
        assert_eq!(samples.shape(), (200, 4));
        assert!(samples.row_iter().all(|row| row.iter().sum::<u32>() == 25 ));

        // Column shares approach alpha / sum(alpha).
        let total = (200 * 25) as f64;
        let share = samples.column(1).iter().map(|c| *c as f64 ).sum::<f64>() / total;
        assert!((share - 3.0 / 5.4).abs() < 0.1);
    }

    #[test]
    fn variates_reject_invalid_alpha() {
        let mut rng = StdRng::seed_from_u64(1);
        let alpha = DVector::from_vec(vec![1.0, -1.0]);
        assert!(Dcm::default().rv(&alpha, 3, &mut rng).is_err());
    }

}
