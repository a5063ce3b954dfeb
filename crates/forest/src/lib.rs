//! Ensembles of regression trees used as surrogate models when a gaussian process
//! is not wanted: [Random Forest](https://en.wikipedia.org/wiki/Random_forest)
//! and Extremely Randomized Trees.
//!
//! Beside the mean prediction, a [Forest] reports the variance of its member trees
//! predictions, an empirical measure of disagreement used as uncertainty.
//!
//! ```
//! use egolab_forest::{Forest, ForestKind};
//! use linfa::prelude::*;
//! use ndarray::array;
//! use ndarray_rand::rand::SeedableRng;
//! use rand_xoshiro::Xoshiro256Plus;
//!
//! let xt = array![[0.], [1.], [2.], [3.], [4.], [5.], [6.], [7.]];
//! let yt = array![0., 0., 0., 0., 1., 1., 1., 1.];
//! let forest = Forest::params(ForestKind::ExtraTrees)
//!     .n_trees(50)
//!     .min_samples_leaf(1)
//!     .with_rng(Xoshiro256Plus::seed_from_u64(42))
//!     .fit(&Dataset::new(xt, yt))
//!     .expect("Forest fitted");
//! let (mean, variance) = forest.predict_valvar(&array![[1.5], [5.5]]);
//! ```
#![warn(missing_docs)]
#![warn(rustdoc::broken_intra_doc_links)]
mod algorithm;
mod errors;
mod parameters;
mod tree;

pub use algorithm::*;
pub use errors::*;
pub use parameters::*;
pub use tree::RegressionTree;
