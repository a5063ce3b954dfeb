use crate::errors::{ForestError, Result};
use crate::parameters::{ForestKind, ForestParams, ForestValidParams};
use crate::tree::RegressionTree;

use linfa::prelude::{DatasetBase, Fit, Float};
use ndarray::{Array1, Array2, ArrayBase, Axis, Data, Ix1, Ix2, Zip};
use ndarray_rand::rand::{Rng, SeedableRng};
use rand_xoshiro::Xoshiro256Plus;

use log::debug;
use rayon::prelude::*;
use std::fmt;
use std::time::Instant;

/// An ensemble of regression trees fitted on the same training data.
///
/// The mean prediction is the average of the trees predictions and the
/// variance is the (population) variance of the trees predictions.
#[derive(Debug, Clone)]
pub struct Forest<F: Float> {
    trees: Vec<RegressionTree<F>>,
    kind: ForestKind,
    nx: usize,
}

impl<F: Float> fmt::Display for Forest<F> {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        let name = match self.kind {
            ForestKind::RandomForest => "RandomForest",
            ForestKind::ExtraTrees => "ExtraTrees",
        };
        write!(f, "{}(n_trees={}, nx={})", name, self.trees.len(), self.nx)
    }
}

impl<F: Float> Forest<F> {
    /// Tree ensemble parameters of the given kind
    pub fn params(kind: ForestKind) -> ForestParams<F> {
        ForestParams::new(kind)
    }

    /// Predictions of every tree as a (n_trees, n) matrix
    pub fn tree_predictions(&self, x: &ArrayBase<impl Data<Elem = F>, Ix2>) -> Array2<F> {
        let x = x.view();
        let mut preds = Array2::zeros((self.trees.len(), x.nrows()));
        Zip::from(preds.rows_mut())
            .and(&self.trees)
            .par_for_each(|mut row, tree| {
                Zip::from(&mut row)
                    .and(x.rows())
                    .for_each(|p, xi| *p = tree.predict_one(&xi));
            });
        preds
    }

    /// Mean predictions at n points given as a (n, nx) matrix
    pub fn predict(&self, x: &ArrayBase<impl Data<Elem = F>, Ix2>) -> Array1<F> {
        self.predict_valvar(x).0
    }

    /// Mean predictions and variances across trees at n points given as a (n, nx) matrix
    pub fn predict_valvar(&self, x: &ArrayBase<impl Data<Elem = F>, Ix2>) -> (Array1<F>, Array1<F>) {
        let preds = self.tree_predictions(x);
        let n_trees = F::cast(self.trees.len());
        let mean = preds.sum_axis(Axis(0)) / n_trees;
        let centered = &preds - &mean.view().insert_axis(Axis(0));
        let var = (&centered * &centered).sum_axis(Axis(0)) / n_trees;
        (mean, var)
    }

    /// Number of trees
    pub fn n_trees(&self) -> usize {
        self.trees.len()
    }

    /// Ensemble kind
    pub fn kind(&self) -> ForestKind {
        self.kind
    }

    /// Member trees
    pub fn trees(&self) -> &[RegressionTree<F>] {
        &self.trees
    }
}

impl<F: Float, D: Data<Elem = F>> Fit<ArrayBase<D, Ix2>, ArrayBase<D, Ix1>, ForestError>
    for ForestValidParams<F>
{
    type Object = Forest<F>;

    /// Grow the trees in parallel, each with its own generator seeded from the parameters one
    fn fit(
        &self,
        dataset: &DatasetBase<ArrayBase<D, Ix2>, ArrayBase<D, Ix1>>,
    ) -> Result<Self::Object> {
        let x = dataset.records().view();
        let y = dataset.targets().view();
        let n = x.nrows();
        if n == 0 {
            return Err(ForestError::InsufficientData(
                "at least one training point is required".to_string(),
            ));
        }
        if n != y.len() {
            return Err(ForestError::InvalidValueError(format!(
                "{} inputs given for {} outputs",
                n,
                y.len()
            )));
        }

        let mut rng = self.rng.clone();
        let seeds: Vec<u64> = (0..self.n_trees()).map(|_| rng.gen()).collect();
        let now = Instant::now();
        let trees = seeds
            .into_par_iter()
            .map(|seed| {
                let mut rng = Xoshiro256Plus::seed_from_u64(seed);
                let samples = match self.kind() {
                    ForestKind::RandomForest => (0..n).map(|_| rng.gen_range(0..n)).collect(),
                    ForestKind::ExtraTrees => (0..n).collect(),
                };
                RegressionTree::grow(x, y, samples, self, &mut rng)
            })
            .collect::<Vec<_>>();
        debug!(
            "{} trees grown in {} ms",
            trees.len(),
            now.elapsed().as_millis()
        );
        Ok(Forest {
            trees,
            kind: self.kind(),
            nx: x.ncols(),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_abs_diff_eq;
    use linfa::{Dataset, ParamGuard};
    use ndarray::array;

    fn step_data() -> (Array2<f64>, Array1<f64>) {
        let xt = Array2::from_shape_fn((20, 1), |(i, _)| i as f64 / 2.);
        let yt = xt.column(0).mapv(|v| if v < 5. { 0. } else { 10. });
        (xt, yt)
    }

    #[test]
    fn test_random_forest_step_function() {
        let (xt, yt) = step_data();
        let forest = Forest::params(ForestKind::RandomForest)
            .n_trees(30)
            .min_samples_leaf(1)
            .with_rng(Xoshiro256Plus::seed_from_u64(0))
            .fit(&Dataset::new(xt, yt))
            .expect("Forest fitted");
        assert_eq!(forest.n_trees(), 30);
        let mean = forest.predict(&array![[0.5], [9.]]);
        assert!(mean[0] < 2.);
        assert!(mean[1] > 8.);
    }

    #[test]
    fn test_extra_trees_step_function() {
        let (xt, yt) = step_data();
        let forest = Forest::params(ForestKind::ExtraTrees)
            .n_trees(30)
            .min_samples_leaf(1)
            .with_rng(Xoshiro256Plus::seed_from_u64(0))
            .fit(&Dataset::new(xt.clone(), yt.clone()))
            .expect("Forest fitted");
        // trees are grown on every training point down to single-sample leaves
        let (mean, var) = forest.predict_valvar(&xt);
        assert_abs_diff_eq!(mean, yt, epsilon = 1e-12);
        assert_abs_diff_eq!(var, Array1::zeros(20), epsilon = 1e-12);
    }

    #[test]
    fn test_disagreement_between_trees() {
        let (xt, yt) = step_data();
        let forest = Forest::params(ForestKind::ExtraTrees)
            .n_trees(30)
            .min_samples_leaf(1)
            .with_rng(Xoshiro256Plus::seed_from_u64(1))
            .fit(&Dataset::new(xt, yt))
            .expect("Forest fitted");
        // between the two training points around the step, trees cut anywhere
        let (mean, var) = forest.predict_valvar(&array![[4.75]]);
        assert!(var[0] > 0.);
        assert!(mean[0] > 0. && mean[0] < 10.);
    }

    #[test]
    fn test_reproducible_with_seed() {
        let (xt, yt) = step_data();
        let dataset = Dataset::new(xt, yt);
        let x = array![[1.3], [4.8], [7.1]];
        let fit = |seed| {
            Forest::params(ForestKind::RandomForest)
                .n_trees(10)
                .with_rng(Xoshiro256Plus::seed_from_u64(seed))
                .fit(&dataset)
                .expect("Forest fitted")
        };
        assert_eq!(fit(42).tree_predictions(&x), fit(42).tree_predictions(&x));
    }

    #[test]
    fn test_constant_outputs_zero_variance() {
        let xt = array![[0., 0.], [1., 0.], [0., 1.], [1., 1.], [0.5, 0.5]];
        let yt = array![3., 3., 3., 3., 3.];
        let forest = Forest::params(ForestKind::RandomForest)
            .n_trees(5)
            .with_rng(Xoshiro256Plus::seed_from_u64(0))
            .fit(&Dataset::new(xt, yt))
            .expect("Forest fitted");
        let (mean, var) = forest.predict_valvar(&array![[0.2, 0.7]]);
        assert_abs_diff_eq!(mean[0], 3., epsilon = 1e-12);
        assert_abs_diff_eq!(var[0], 0., epsilon = 1e-12);
    }

    #[test]
    fn test_single_tree_zero_variance() {
        let (xt, yt) = step_data();
        let forest = Forest::params(ForestKind::RandomForest)
            .n_trees(1)
            .with_rng(Xoshiro256Plus::seed_from_u64(0))
            .fit(&Dataset::new(xt, yt))
            .expect("Forest fitted");
        let (_, var) = forest.predict_valvar(&array![[4.75], [2.]]);
        assert_abs_diff_eq!(var, array![0., 0.]);
    }

    #[test]
    fn test_no_training_data() {
        let xt = Array2::<f64>::zeros((0, 2));
        let yt = Array1::<f64>::zeros(0);
        let res = Forest::params(ForestKind::ExtraTrees).fit(&Dataset::new(xt, yt));
        assert!(matches!(res, Err(ForestError::InsufficientData(_))));
    }

    #[test]
    fn test_invalid_params_fit() {
        let (xt, yt) = step_data();
        let res = Forest::params(ForestKind::ExtraTrees)
            .n_trees(0)
            .fit(&Dataset::new(xt, yt));
        assert!(matches!(res, Err(ForestError::InvalidValueError(_))));
        assert!(Forest::<f64>::params(ForestKind::RandomForest)
            .min_samples_leaf(2)
            .check()
            .is_ok());
    }
}
