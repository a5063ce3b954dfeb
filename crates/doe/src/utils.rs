use linfa::Float;
use ndarray::{Array1, Array2, ArrayBase, Data, Ix2, Zip};
use ndarray_stats::DeviationExt;
use rayon::prelude::*;

fn l2<F: Float>(a: ndarray::ArrayView1<F>, b: ndarray::ArrayView1<F>) -> F {
    // shapes are checked by the callers, l2_dist only fails on a length mismatch
    a.l2_dist(&b).map(|d| F::cast(d)).unwrap_or_else(|_| F::infinity())
}

/// Distances between every pair of rows of `x`, in row-major pair order
/// `(0,1), (0,2), ..., (1,2), ...`
pub fn pdist<F: Float>(x: &ArrayBase<impl Data<Elem = F> + Sync, Ix2>) -> Array1<F> {
    let n = x.nrows();
    let pairs: Vec<(usize, usize)> = (0..n)
        .flat_map(|i| ((i + 1)..n).map(move |j| (i, j)))
        .collect();
    let distances: Vec<F> = pairs
        .par_iter()
        .map(|&(i, j)| l2(x.row(i), x.row(j)))
        .collect();
    Array1::from_vec(distances)
}

/// Smallest distance between two distinct rows of `x`,
/// `None` when `x` has fewer than two rows
pub fn min_pdist<F: Float>(x: &ArrayBase<impl Data<Elem = F> + Sync, Ix2>) -> Option<F> {
    pdist(x)
        .iter()
        .copied()
        .fold(None, |acc: Option<F>, d| match acc {
            Some(m) if m <= d => Some(m),
            _ => Some(d),
        })
}

/// Distances between rows of `xa` and rows of `xb` as a (ma, mb) matrix
///
/// **Panics** if `xa` and `xb` do not have the same number of columns.
pub fn cdist<F: Float>(
    xa: &ArrayBase<impl Data<Elem = F> + Sync, Ix2>,
    xb: &ArrayBase<impl Data<Elem = F> + Sync, Ix2>,
) -> Array2<F> {
    assert!(
        xa.ncols() == xb.ncols(),
        "cdist: operands should have same nb of columns. Found {} and {}",
        xa.ncols(),
        xb.ncols()
    );
    let mut res = Array2::zeros((xa.nrows(), xb.nrows()));
    Zip::from(res.rows_mut())
        .and(xa.rows())
        .par_for_each(|mut dists, a| {
            for (j, b) in xb.rows().into_iter().enumerate() {
                dists[j] = l2(a, b);
            }
        });
    res
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_abs_diff_eq;
    use ndarray::array;

    #[test]
    fn test_pdist() {
        let x = array![[0., 0.], [3., 4.], [0., 1.]];
        let expected = array![5., 1., 18f64.sqrt()];
        assert_abs_diff_eq!(pdist(&x), expected, epsilon = 1e-12);
    }

    #[test]
    fn test_min_pdist() {
        let x = array![[0., 0.], [3., 4.], [0., 1.]];
        assert_abs_diff_eq!(min_pdist(&x).unwrap(), 1., epsilon = 1e-12);
        assert!(min_pdist(&array![[0.5, 0.5]]).is_none());
    }

    #[test]
    fn test_cdist() {
        let xa = array![[0., 0.], [1., 1.]];
        let xb = array![[0., 1.], [4., 4.], [1., 1.]];
        let expected = array![[1., 32f64.sqrt(), 2f64.sqrt()], [1., 18f64.sqrt(), 0.]];
        assert_abs_diff_eq!(cdist(&xa, &xb), expected, epsilon = 1e-12);
    }
}
