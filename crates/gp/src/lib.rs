//! This library implements [Gaussian Process](https://en.wikipedia.org/wiki/Gaussian_process) regression
//! also known as [Kriging](https://en.wikipedia.org/wiki/Kriging), used as the default surrogate
//! model of a sequential experiment design.
//!
//! GP models are implemented by [GaussianProcess] parameterized by [GpParams]:
//! a regression model for the trend (see [mean_models]) and a kernel (see [correlation_models])
//! whose length-scale hyperparameters are estimated by maximizing the reduced likelihood.
//!
//! ```
//! use egolab_gp::{correlation_models::Matern52Corr, mean_models::ConstantMean, GaussianProcess};
//! use linfa::prelude::*;
//! use ndarray::array;
//!
//! let xt = array![[0.0], [1.0], [2.0], [3.0], [4.0]];
//! let yt = array![0.0, 1.0, 1.5, 0.9, 1.0];
//! let gp = GaussianProcess::<f64, ConstantMean, Matern52Corr>::params(
//!     ConstantMean::default(),
//!     Matern52Corr::default(),
//! )
//! .fit(&Dataset::new(xt, yt))
//! .expect("GP fitted");
//! let (mean, variance) = gp.predict_valvar(&array![[2.5]]).expect("GP prediction");
//! ```
#![warn(missing_docs)]
#![warn(rustdoc::broken_intra_doc_links)]
mod algorithm;
pub mod correlation_models;
mod errors;
pub mod mean_models;

mod optimization;
mod parameters;
mod utils;

pub use algorithm::*;
pub use errors::*;
pub use parameters::*;
