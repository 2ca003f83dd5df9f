use nalgebra::*;
use crate::calc::row_norms;

/// Weighted histogram of non-negative integer counts: each bin pairs a distinct
/// count value with the total weight of the rows showing that value. Bins are
/// stored strictly descending by count value; the recurrence walks them from the
/// back, which visits count values in ascending order without re-sorting.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Histogram {
    bins : Vec<(u64, f64)>
}

impl Histogram {

    /// Builds the histogram from (count, weight) pairs in any order. Pairs are sorted
    /// by count (descending, stable so equal counts keep their input order) and equal
    /// counts are merged by summing their weights. Zero counts must be filtered out by the caller.
    pub fn from_pairs(mut pairs : Vec<(u64, f64)>) -> Self {
        pairs.sort_by(|a, b| b.0.cmp(&a.0) );
        let mut bins : Vec<(u64, f64)> = Vec::with_capacity(pairs.len());
        for (count, weight) in pairs {
            match bins.last_mut() {
                Some(last) if last.0 == count => last.1 += weight,
                _ => bins.push((count, weight))
            }
        }
        bins.shrink_to_fit();
        Self { bins }
    }

    pub fn bins(&self) -> &[(u64, f64)] {
        &self.bins[..]
    }

    pub fn len(&self) -> usize {
        self.bins.len()
    }

    pub fn is_empty(&self) -> bool {
        self.bins.is_empty()
    }

    /// Largest count value present (the first bin).
    pub fn max_count(&self) -> Option<u64> {
        self.bins.first().map(|b| b.0 )
    }

    pub fn total_weight(&self) -> f64 {
        self.bins.iter().fold(0.0, |s, b| s + b.1 )
    }

    /// Evaluates sum_bins weight * (digamma(base + count) - digamma(base)) through the
    /// digamma recurrence. Bins are visited by ascending count while a running sum of
    /// 1 / (base + k) is extended up to each count, so the total cost is proportional to
    /// the largest count plus the number of bins, independently of how many rows share
    /// each count value.
    pub fn rising_sum(&self, base : f64) -> f64 {
        let mut total = 0.0;
        let mut partial = 0.0;
        let mut k : u64 = 0;
        for (count, weight) in self.bins.iter().rev() {
            while k < *count {
                partial += 1. / (k as f64 + base);
                k += 1;
            }
            total += weight * partial;
        }
        total
    }

}

/// Scratch structures for one recurrence-based estimation: the histogram of row
/// L1 norms and one histogram of non-zero counts per dimension. The value owns all
/// of its buffers, so they are released when it goes out of scope on any exit path.
#[derive(Debug, Clone, PartialEq)]
pub struct Histograms {

    norms : Histogram,

    dims : Vec<Histogram>

}

impl Histograms {

    /// Aggregates the weights of the rows by their L1 norm (rows with norm zero
    /// are skipped) and, for each dimension, by the non-zero count at that dimension.
    /// The count matrix and weight vector are assumed to have the same number of rows.
    pub fn build(counts : &DMatrix<u32>, weights : &DVector<f64>) -> Self {
        let norm_pairs : Vec<(u64, f64)> = row_norms(counts).into_iter()
            .zip(weights.iter())
            .filter(|(n, _)| *n > 0 )
            .map(|(n, w)| (n, *w) )
            .collect();
        let dims = counts.column_iter()
            .map(|col| {
                let pairs : Vec<(u64, f64)> = col.iter()
                    .zip(weights.iter())
                    .filter(|(c, _)| **c > 0 )
                    .map(|(c, w)| (u64::from(*c), *w) )
                    .collect();
                Histogram::from_pairs(pairs)
            })
            .collect();
        Self { norms : Histogram::from_pairs(norm_pairs), dims }
    }

    pub fn norms(&self) -> &Histogram {
        &self.norms
    }

    /// Histogram of dimension d, or None when d is out of range.
    pub fn dim(&self, d : usize) -> Option<&Histogram> {
        self.dims.get(d)
    }

    pub fn dims(&self) -> &[Histogram] {
        &self.dims[..]
    }

    /// Number of dimensions (columns of the count matrix the histograms were built from).
    pub fn ndims(&self) -> usize {
        self.dims.len()
    }

}

#[cfg(test)]
mod tests {

    use super::*;
    use crate::calc::digamma_difference;

    fn example() -> (DMatrix<u32>, DVector<f64>) {
        let counts = DMatrix::from_row_slice(5, 3, &[
            2, 0, 1,
            0, 0, 0,
            1, 2, 0,
            2, 1, 0,
            0, 0, 3
        ]);
        let weights = DVector::from_vec(vec![1.0, 4.0, 0.5, 0.25, 2.0]);
        (counts, weights)
    }

    #[test]
    fn norms_are_aggregated_and_descending() {
        let (counts, weights) = example();
        let hist = Histograms::build(&counts, &weights);
        assert_eq!(hist.norms().bins(), &[(3, 1.0 + 0.5 + 0.25 + 2.0)]);
        assert_eq!(hist.ndims(), 3);
        assert_eq!(hist.dim(0).unwrap().bins(), &[(2, 1.25), (1, 0.5)]);
        assert_eq!(hist.dim(1).unwrap().bins(), &[(2, 0.5), (1, 0.25)]);
        assert_eq!(hist.dim(2).unwrap().bins(), &[(3, 2.0), (1, 1.0)]);
        assert!(hist.dim(3).is_none());
    }

    #[test]
    fn zero_rows_are_excluded() {
        let (counts, weights) = example();
        let hist = Histograms::build(&counts, &weights);
        assert!(hist.norms().bins().iter().all(|b| b.0 > 0 ));
        assert!(hist.dims().iter().all(|h| h.bins().iter().all(|b| b.0 > 0 ) ));

        // The weight of the all-zero row (4.0) appears nowhere.
        let total : f64 = hist.norms().total_weight();
        assert!((total - 3.75).abs() < 1E-12);
    }

    #[test]
    fn keys_strictly_descending() {
        let pairs = vec![(1, 1.0), (5, 1.0), (3, 2.0), (5, 0.5), (1, 1.0), (9, 0.1)];
        let hist = Histogram::from_pairs(pairs);
        assert_eq!(hist.bins(), &[(9, 0.1), (5, 1.5), (3, 2.0), (1, 2.0)]);
        assert!(hist.bins().windows(2).all(|w| w[0].0 > w[1].0 ));
        assert_eq!(hist.max_count(), Some(9));
        assert!(Histogram::from_pairs(Vec::new()).is_empty());
    }

    #[test]
    fn rising_sum_matches_per_row_recurrence() {
        let (counts, weights) = example();
        let hist = Histograms::build(&counts, &weights);
        for base in [1E-3, 0.3, 1.0, 12.5].iter() {
            for d in 0..counts.ncols() {
                let per_row : f64 = counts.column(d).iter()
                    .zip(weights.iter())
                    .map(|(c, w)| w * digamma_difference(*base, u64::from(*c)) )
                    .sum();
                assert!((hist.dim(d).unwrap().rising_sum(*base) - per_row).abs() < 1E-9 * per_row.abs().max(1.0));
            }
        }
    }

    #[test]
    fn empty_histogram_sums_to_zero() {
        assert_eq!(Histogram::default().rising_sum(0.5), 0.0);
    }

}
