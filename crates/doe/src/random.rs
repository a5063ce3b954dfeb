use std::sync::{Arc, RwLock};

use crate::SamplingMethod;
use linfa::Float;
use ndarray::{Array, Array2, ArrayBase, Data, Ix2};
use ndarray_rand::{rand::Rng, rand::SeedableRng, rand_distr::Uniform, RandomExt};
use rand_xoshiro::Xoshiro256Plus;

type RngRef<R> = Arc<RwLock<R>>;

/// Uniform random design: every sample is drawn independently in the sample space.
#[derive(Clone, Debug)]
pub struct Random<F: Float, R: Rng> {
    /// Sampling space as a (nx, 2) matrix of [lower, upper] rows
    xlimits: Array2<F>,
    /// Shared random generator, advanced by each call to `sample`
    rng: RngRef<R>,
}

impl<F: Float> Random<F, Xoshiro256Plus> {
    /// Random design over `xlimits` seeded from system entropy
    ///
    /// ```
    /// use egolab_doe::Random;
    /// use ndarray::arr2;
    ///
    /// let doe = Random::new(&arr2(&[[20.0, 100.0], [1.0, 60.0]]));
    /// ```
    pub fn new(xlimits: &ArrayBase<impl Data<Elem = F>, Ix2>) -> Self {
        Self::new_with_rng(xlimits, Xoshiro256Plus::from_entropy())
    }
}

impl<F: Float, R: Rng> Random<F, R> {
    /// Random design over `xlimits` drawing from `rng`
    ///
    /// **Panics** if xlimits number of columns is different from 2.
    pub fn new_with_rng(xlimits: &ArrayBase<impl Data<Elem = F>, Ix2>, rng: R) -> Self {
        assert!(
            xlimits.ncols() == 2,
            "xlimits must have 2 columns (lower, upper)"
        );
        Random {
            xlimits: xlimits.to_owned(),
            rng: Arc::new(RwLock::new(rng)),
        }
    }

    /// Replaces the random generator
    pub fn with_rng<R2: Rng>(self, rng: R2) -> Random<F, R2> {
        Random {
            xlimits: self.xlimits,
            rng: Arc::new(RwLock::new(rng)),
        }
    }
}

impl<F: Float, R: Rng> SamplingMethod<F> for Random<F, R> {
    fn sampling_space(&self) -> &Array2<F> {
        &self.xlimits
    }

    fn normalized_sample(&self, ns: usize) -> Array2<F> {
        let nx = self.xlimits.nrows();
        // a poisoned lock still holds a usable generator state
        let mut rng = match self.rng.write() {
            Ok(guard) => guard,
            Err(poisoned) => poisoned.into_inner(),
        };
        Array::random_using((ns, nx), Uniform::new(0., 1.), &mut *rng).mapv(|v| F::cast(v))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_abs_diff_eq;
    use ndarray::arr2;

    #[test]
    fn test_random_within_bounds() {
        let xlimits = arr2(&[[20., 100.], [1., 60.]]);
        let doe = Random::new(&xlimits)
            .with_rng(Xoshiro256Plus::seed_from_u64(42))
            .sample(200);
        assert_eq!(doe.dim(), (200, 2));
        for row in doe.rows() {
            assert!((20. ..=100.).contains(&row[0]));
            assert!((1. ..=60.).contains(&row[1]));
        }
    }

    #[test]
    fn test_random_reproducible() {
        let xlimits = arr2(&[[5., 10.], [0., 1.]]);
        let first = Random::new(&xlimits)
            .with_rng(Xoshiro256Plus::seed_from_u64(7))
            .sample(9);
        let second = Random::new(&xlimits)
            .with_rng(Xoshiro256Plus::seed_from_u64(7))
            .sample(9);
        assert_abs_diff_eq!(first, second, epsilon = 0.);
    }

    #[test]
    fn test_random_advances_generator() {
        let doe = Random::new(&arr2(&[[0., 1.]])).with_rng(Xoshiro256Plus::seed_from_u64(7));
        let first = doe.normalized_sample(4);
        let second = doe.normalized_sample(4);
        assert!(first != second);
    }
}
