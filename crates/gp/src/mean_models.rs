//! Regression models for the trend term of the GP model.
//!
//! The following models are implemented:
//! * constant (ordinary kriging),
//! * linear (universal kriging of degree one).

use linfa::Float;
use ndarray::{concatenate, Array2, ArrayBase, Axis, Data, Ix2};
use std::fmt;

/// A trait for mean models used in GP regression
pub trait RegressionModel<F: Float>: Clone + Copy + Default + fmt::Display + Sync + Send {
    /// Regression basis evaluated at `x` points given as a (n, nx) matrix,
    /// returns a (n, p) matrix where p is the number of basis functions.
    fn value(&self, x: &ArrayBase<impl Data<Elem = F>, Ix2>) -> Array2<F>;
}

/// A constant function as mean of the GP
#[derive(Clone, Copy, Debug, PartialEq, Eq, Default)]
pub struct ConstantMean();

impl<F: Float> RegressionModel<F> for ConstantMean {
    /// regr(x) = [1, ..., 1].T
    fn value(&self, x: &ArrayBase<impl Data<Elem = F>, Ix2>) -> Array2<F> {
        Array2::ones((x.nrows(), 1))
    }
}

impl fmt::Display for ConstantMean {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "Constant")
    }
}

/// An affine function as mean of the GP
#[derive(Clone, Copy, Debug, PartialEq, Eq, Default)]
pub struct LinearMean();

impl<F: Float> RegressionModel<F> for LinearMean {
    /// regr(x) = [1, x_1, ..., x_nx].T
    fn value(&self, x: &ArrayBase<impl Data<Elem = F>, Ix2>) -> Array2<F> {
        concatenate![Axis(1), Array2::ones((x.nrows(), 1)), x.to_owned()]
    }
}

impl fmt::Display for LinearMean {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "Linear")
    }
}
