use linfa::Float;
use ndarray::{Array1, Array2, ArrayBase, Axis, Data, Ix2, Zip};

/// A (n, nx) data matrix standardized column-wise, with the statistics
/// needed to map new points into the same scale
#[derive(Debug, Clone)]
pub(crate) struct NormalizedData<F: Float> {
    pub data: Array2<F>,
    pub mean: Array1<F>,
    pub std: Array1<F>,
}

impl<F: Float> NormalizedData<F> {
    pub fn new(x: &ArrayBase<impl Data<Elem = F>, Ix2>) -> NormalizedData<F> {
        let (data, mean, std) = normalize(x);
        NormalizedData { data, mean, std }
    }

    /// Scales `x` with the statistics of the training data
    pub fn apply(&self, x: &ArrayBase<impl Data<Elem = F>, Ix2>) -> Array2<F> {
        (x - &self.mean) / &self.std
    }
}

/// Column-wise standardization, a column with zero or undefined deviation
/// (constant column, single row) is only centered
pub(crate) fn normalize<F: Float>(
    x: &ArrayBase<impl Data<Elem = F>, Ix2>,
) -> (Array2<F>, Array1<F>, Array1<F>) {
    let mean = x
        .mean_axis(Axis(0))
        .unwrap_or_else(|| Array1::zeros(x.ncols()));
    let std = if x.nrows() < 2 {
        Array1::ones(x.ncols())
    } else {
        x.std_axis(Axis(0), F::one())
            .mapv(|v| if v > F::zero() && v.is_finite() { v } else { F::one() })
    };
    let xnorm = (x - &mean) / &std;
    (xnorm, mean, std)
}

/// Absolute componentwise differences between every pair of rows of a
/// (n_obs, nx) matrix, used to build the correlation matrix
#[derive(Debug)]
pub(crate) struct DiffMatrix<F: Float> {
    /// (n_obs * (n_obs - 1) / 2, nx) differences
    pub d: Array2<F>,
    /// (i, j) row indices with i < j of each difference
    pub d_indices: Vec<(usize, usize)>,
    pub n_obs: usize,
}

impl<F: Float> DiffMatrix<F> {
    pub fn new(x: &ArrayBase<impl Data<Elem = F>, Ix2>) -> DiffMatrix<F> {
        let n_obs = x.nrows();
        let d_indices: Vec<(usize, usize)> = (0..n_obs)
            .flat_map(|i| ((i + 1)..n_obs).map(move |j| (i, j)))
            .collect();
        let mut d = Array2::zeros((d_indices.len(), x.ncols()));
        for (mut row, &(i, j)) in d.rows_mut().into_iter().zip(d_indices.iter()) {
            Zip::from(&mut row)
                .and(x.row(i))
                .and(x.row(j))
                .for_each(|dij, &a, &b| *dij = (a - b).abs());
        }
        DiffMatrix {
            d,
            d_indices,
            n_obs,
        }
    }

    /// Whether two training points are at the same location
    pub fn has_duplicates(&self) -> bool {
        self.d
            .rows()
            .into_iter()
            .any(|row| row.iter().all(|v| *v == F::zero()))
    }
}

/// Absolute componentwise differences between each row of `x` and each row of `y`
/// as a (nrows(x) * nrows(y), ncols) matrix, `x` rows varying slowest.
///
/// **Panics** if x and y have not the same number of columns.
pub(crate) fn pairwise_differences<F: Float>(
    x: &ArrayBase<impl Data<Elem = F>, Ix2>,
    y: &ArrayBase<impl Data<Elem = F>, Ix2>,
) -> Array2<F> {
    assert!(x.ncols() == y.ncols());
    let ny = y.nrows();
    let mut result = Array2::zeros((x.nrows() * ny, x.ncols()));
    for (i, xi) in x.rows().into_iter().enumerate() {
        for (j, yj) in y.rows().into_iter().enumerate() {
            Zip::from(result.row_mut(i * ny + j))
                .and(&xi)
                .and(&yj)
                .for_each(|r, &a, &b| *r = (a - b).abs());
        }
    }
    result
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_abs_diff_eq;
    use ndarray::array;

    #[test]
    fn test_normalize() {
        let x = array![[1., 5.], [3., 5.]];
        let (xnorm, mean, std) = normalize(&x);
        assert_abs_diff_eq!(mean, array![2., 5.]);
        assert_abs_diff_eq!(std, array![2f64.sqrt(), 1.]);
        assert_abs_diff_eq!(
            xnorm,
            array![[-1. / 2f64.sqrt(), 0.], [1. / 2f64.sqrt(), 0.]],
            epsilon = 1e-12
        );
    }

    #[test]
    fn test_normalize_single_row() {
        let (xnorm, mean, std) = normalize(&array![[4., 2.]]);
        assert_abs_diff_eq!(mean, array![4., 2.]);
        assert_abs_diff_eq!(std, array![1., 1.]);
        assert_abs_diff_eq!(xnorm, array![[0., 0.]]);
    }

    #[test]
    fn test_diff_matrix() {
        let x = array![[0., 1.], [2., 1.], [0., 1.]];
        let dm = DiffMatrix::new(&x);
        assert_eq!(dm.d_indices, vec![(0, 1), (0, 2), (1, 2)]);
        assert_abs_diff_eq!(dm.d, array![[2., 0.], [0., 0.], [2., 0.]]);
        assert!(dm.has_duplicates());
        assert!(!DiffMatrix::new(&array![[0.], [1.]]).has_duplicates());
        assert_eq!(DiffMatrix::new(&array![[0.5, 0.5]]).d.nrows(), 0);
    }

    #[test]
    fn test_pairwise_differences() {
        let x = array![[-0.9486833], [-0.82219219]];
        let y = array![[-1.26491106], [-0.63245553], [0.], [0.63245553], [1.26491106]];
        let expected = array![
            [0.31622777],
            [0.31622777],
            [0.9486833],
            [1.58113883],
            [2.21359436],
            [0.44271887],
            [0.18973666],
            [0.82219219],
            [1.45464772],
            [2.08710325]
        ];
        assert_abs_diff_eq!(pairwise_differences(&x, &y), expected, epsilon = 1e-6);
    }
}
