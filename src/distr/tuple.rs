use nalgebra::*;
use rand::Rng;
use super::*;

/// Joint distribution of two independent components observed together: each
/// observation is a pair (one sample of A, one of B) and its log-likelihood is the
/// sum of the component log-likelihoods. Parameters and sample batches are pairs,
/// with both batches holding the same number of observations. Nest tuples to
/// combine more than two components.
///
/// ```
/// use polya::distr::*;
/// use nalgebra::*;
///
/// let pair = Tuple::new(Dcm::default(), Dcm::default());
/// let words = DMatrix::from_row_slice(2, 3, &[4, 0, 1, 0, 2, 3]);
/// let tags = DMatrix::from_row_slice(2, 2, &[1, 1, 2, 0]);
/// let par = (DVector::from_element(3, 1.0), DVector::from_element(2, 1.0));
/// let ll = pair.ll(&par, &(words, tags)).unwrap();
/// assert_eq!(ll.nrows(), 2);
/// ```
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Tuple<A, B> {

    first : A,

    second : B

}

impl<A, B> Tuple<A, B>
where
    A : Distribution,
    B : Distribution
{

    pub fn new(first : A, second : B) -> Self {
        Self { first, second }
    }

    pub fn first(&self) -> &A {
        &self.first
    }

    pub fn second(&self) -> &B {
        &self.second
    }

}

impl<A, B> Distribution for Tuple<A, B>
where
    A : Distribution,
    B : Distribution
{

    type Parameter = (A::Parameter, B::Parameter);

    type Samples = (A::Samples, B::Samples);

    fn rv<R>(&self, par : &Self::Parameter, n : usize, rng : &mut R) -> Result<Self::Samples, DcmError>
    where
        R : Rng + ?Sized
    {
        Ok((self.first.rv(&par.0, n, rng)?, self.second.rv(&par.1, n, rng)?))
    }

    fn ll(&self, par : &Self::Parameter, samples : &Self::Samples) -> Result<DVector<f64>, DcmError> {
        let ll_a = self.first.ll(&par.0, &samples.0)?;
        let ll_b = self.second.ll(&par.1, &samples.1)?;
        if ll_a.nrows() != ll_b.nrows() {
            return Err(DcmError::DimensionMismatch { expected : ll_a.nrows(), found : ll_b.nrows() });
        }
        Ok(ll_a + ll_b)
    }

    fn ml(&self, samples : &Self::Samples, weights : &DVector<f64>) -> Result<Self::Parameter, DcmError> {
        Ok((self.first.ml(&samples.0, weights)?, self.second.ml(&samples.1, weights)?))
    }

    fn given(&self, par : &Self::Parameter, samples : &Self::Samples) -> Result<Self::Parameter, DcmError> {
        Ok((self.first.given(&par.0, &samples.0)?, self.second.given(&par.1, &samples.1)?))
    }

}
