use crate::errors::{ForestError, Result};
use linfa::{Float, ParamGuard};
use ndarray_rand::rand::SeedableRng;
use rand_xoshiro::Xoshiro256Plus;

/// Default number of trees
pub const DEFAULT_N_TREES: usize = 100;
/// Default minimum number of training samples in a leaf
pub const DEFAULT_MIN_SAMPLES_LEAF: usize = 3;

/// How member trees are randomized
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ForestKind {
    /// Each tree is grown on a bootstrap resample, splits use the best threshold
    RandomForest,
    /// Each tree is grown on the whole training set, splits use one random
    /// threshold per candidate feature
    ExtraTrees,
}

/// A set of validated tree ensemble parameters.
#[derive(Clone, Debug)]
pub struct ForestValidParams<F: Float> {
    pub(crate) kind: ForestKind,
    pub(crate) n_trees: usize,
    pub(crate) min_samples_leaf: usize,
    pub(crate) max_depth: Option<usize>,
    /// Features drawn as split candidates at each node, all when None
    pub(crate) max_features: Option<usize>,
    /// A split is kept when it decreases the node squared error by more than this
    pub(crate) min_impurity_decrease: F,
    pub(crate) rng: Xoshiro256Plus,
}

impl<F: Float> ForestValidParams<F> {
    /// Get the ensemble kind
    pub fn kind(&self) -> ForestKind {
        self.kind
    }

    /// Get the number of trees
    pub fn n_trees(&self) -> usize {
        self.n_trees
    }

    /// Get the minimum number of samples in a leaf
    pub fn min_samples_leaf(&self) -> usize {
        self.min_samples_leaf
    }

    /// Get the maximum tree depth
    pub fn max_depth(&self) -> Option<usize> {
        self.max_depth
    }

    /// Get the number of split candidate features
    pub fn max_features(&self) -> Option<usize> {
        self.max_features
    }

    /// Get the minimum impurity decrease of a split
    pub fn min_impurity_decrease(&self) -> F {
        self.min_impurity_decrease
    }
}

/// The set of hyperparameters that can be specified for the execution of
/// the [tree ensemble algorithm](crate::Forest).
#[derive(Clone, Debug)]
pub struct ForestParams<F: Float>(ForestValidParams<F>);

impl<F: Float> ForestParams<F> {
    /// Ensemble parameters of the given kind with default settings
    pub fn new(kind: ForestKind) -> ForestParams<F> {
        Self(ForestValidParams {
            kind,
            n_trees: DEFAULT_N_TREES,
            min_samples_leaf: DEFAULT_MIN_SAMPLES_LEAF,
            max_depth: None,
            max_features: None,
            min_impurity_decrease: F::zero(),
            rng: Xoshiro256Plus::from_entropy(),
        })
    }

    /// Set the number of trees
    pub fn n_trees(mut self, n_trees: usize) -> Self {
        self.0.n_trees = n_trees;
        self
    }

    /// Set the minimum number of samples in a leaf
    pub fn min_samples_leaf(mut self, min_samples_leaf: usize) -> Self {
        self.0.min_samples_leaf = min_samples_leaf;
        self
    }

    /// Set the maximum depth of trees, unlimited when None
    pub fn max_depth(mut self, max_depth: Option<usize>) -> Self {
        self.0.max_depth = max_depth;
        self
    }

    /// Set the number of features drawn as split candidates, all when None
    pub fn max_features(mut self, max_features: Option<usize>) -> Self {
        self.0.max_features = max_features;
        self
    }

    /// Set the minimum impurity decrease of a split
    pub fn min_impurity_decrease(mut self, min_impurity_decrease: F) -> Self {
        self.0.min_impurity_decrease = min_impurity_decrease;
        self
    }

    /// Set the random generator, the fit is reproducible for a given generator state
    pub fn with_rng(mut self, rng: Xoshiro256Plus) -> Self {
        self.0.rng = rng;
        self
    }
}

impl<F: Float> ParamGuard for ForestParams<F> {
    type Checked = ForestValidParams<F>;
    type Error = ForestError;

    fn check_ref(&self) -> Result<&Self::Checked> {
        if self.0.n_trees == 0 {
            return Err(ForestError::InvalidValueError(
                "`n_trees` should be at least 1".to_string(),
            ));
        }
        if self.0.min_samples_leaf == 0 {
            return Err(ForestError::InvalidValueError(
                "`min_samples_leaf` should be at least 1".to_string(),
            ));
        }
        if self.0.max_features == Some(0) {
            return Err(ForestError::InvalidValueError(
                "`max_features` should be at least 1".to_string(),
            ));
        }
        if self.0.min_impurity_decrease < F::zero() {
            return Err(ForestError::InvalidValueError(
                "`min_impurity_decrease` should be non-negative".to_string(),
            ));
        }
        Ok(&self.0)
    }

    fn check(self) -> Result<Self::Checked> {
        self.check_ref()?;
        Ok(self.0)
    }
}
