/// Special functions (digamma and the log rising factorial) backing the
/// DCM log-likelihood and both fixed-point estimators.
pub mod special;

pub use special::*;

/// Call-scoped handling of floating-point conditions (divide-by-zero, invalid
/// operations, overflow and underflow), configured per estimator.
pub mod policy;

pub use policy::*;

use nalgebra::*;
use nalgebra::storage::*;

/// L1 norm of every row of the count matrix. The matrix is walked column by column,
/// which is the storage order of nalgebra matrices.
pub fn row_norms(counts : &DMatrix<u32>) -> Vec<u64> {
    let mut norms = vec![0u64; counts.nrows()];
    for col in counts.column_iter() {
        norms.iter_mut()
            .zip(col.iter())
            .for_each(|(n, c)| *n += u64::from(*c) );
    }
    norms
}

/// Sum over all entries of a count vector (a row or column of a count matrix).
pub fn count_sum<R, C, S>(counts : &Matrix<u32, R, C, S>) -> u64
where
    R : Dim,
    C : Dim,
    S : Storage<u32, R, C>
{
    counts.iter().fold(0, |s, c| s + u64::from(*c) )
}
