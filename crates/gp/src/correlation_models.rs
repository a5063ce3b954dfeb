//! Stationary correlation kernels modelling the error term of the GP model.
//!
//! Each kernel has one length-scale hyperparameter `theta_j` per input component.
//! The following models are implemented:
//! * squared exponential,
//! * matern 5/2.

use linfa::Float;
use ndarray::{Array2, ArrayBase, Axis, Data, Ix1, Ix2};
use std::fmt;

/// A trait for using a correlation model in GP regression
pub trait CorrelationModel<F: Float>: Clone + Copy + Default + fmt::Display + Sync + Send {
    /// Correlations `r(x, x')` given componentwise absolute differences `d`
    /// as a (n, nx) matrix and `theta` as a (nx,) vector.
    /// Returns a (n, 1) matrix.
    fn value(
        &self,
        d: &ArrayBase<impl Data<Elem = F>, Ix2>,
        theta: &ArrayBase<impl Data<Elem = F>, Ix1>,
    ) -> Array2<F>;
}

/// Squared exponential correlation model
#[derive(Clone, Copy, Debug, PartialEq, Eq, Default)]
pub struct SquaredExponentialCorr();

impl<F: Float> CorrelationModel<F> for SquaredExponentialCorr {
    ///  nx
    /// prod exp( - (theta_j * d_j)^2 / 2 )
    ///  j=1
    fn value(
        &self,
        d: &ArrayBase<impl Data<Elem = F>, Ix2>,
        theta: &ArrayBase<impl Data<Elem = F>, Ix1>,
    ) -> Array2<F> {
        let half = F::cast(0.5);
        let theta2 = theta.mapv(|t| t * t);
        (d.mapv(|v| v * v) * &theta2)
            .sum_axis(Axis(1))
            .mapv(|s| F::exp(-half * s))
            .insert_axis(Axis(1))
    }
}

impl fmt::Display for SquaredExponentialCorr {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "SquaredExponential")
    }
}

/// Matern 5/2 correlation model
#[derive(Clone, Copy, Debug, PartialEq, Eq, Default)]
pub struct Matern52Corr();

impl<F: Float> CorrelationModel<F> for Matern52Corr {
    ///  nx
    /// prod (1 + sqrt(5) * theta_j * d_j + 5/3 * (theta_j * d_j)^2) exp( - sqrt(5) * theta_j * d_j )
    ///  j=1
    fn value(
        &self,
        d: &ArrayBase<impl Data<Elem = F>, Ix2>,
        theta: &ArrayBase<impl Data<Elem = F>, Ix1>,
    ) -> Array2<F> {
        let sqrt5 = F::cast(5f64.sqrt());
        let five_thirds = F::cast(5. / 3.);
        let td = d.mapv(|v| v.abs()) * theta;
        let poly = td.fold_axis(Axis(1), F::one(), |acc, &v| {
            *acc * (F::one() + sqrt5 * v + five_thirds * v * v)
        });
        let decay = td.sum_axis(Axis(1)).mapv(|s| F::exp(-sqrt5 * s));
        (poly * decay).insert_axis(Axis(1))
    }
}

impl fmt::Display for Matern52Corr {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "Matern52")
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_abs_diff_eq;
    use ndarray::array;

    #[test]
    fn test_squared_exponential() {
        let d = array![[0., 0.], [1., 0.], [1., 2.]];
        let theta = array![1., 0.5];
        let r = SquaredExponentialCorr().value(&d, &theta);
        let expected = array![[1.], [(-0.5f64).exp()], [(-1f64).exp()]];
        assert_abs_diff_eq!(r, expected, epsilon = 1e-12);
    }

    #[test]
    fn test_matern52() {
        let d = array![[0.], [1.]];
        let theta = array![2.];
        let r = Matern52Corr().value(&d, &theta);
        let s = 5f64.sqrt() * 2.;
        let expected = array![[1.], [(1. + s + s * s / 3.) * (-s).exp()]];
        assert_abs_diff_eq!(r, expected, epsilon = 1e-12);
    }

    #[test]
    fn test_correlation_decreases_with_distance() {
        let d = array![[0.1], [0.5], [2.0]];
        let theta = array![1.];
        for r in [
            SquaredExponentialCorr().value(&d, &theta),
            Matern52Corr().value(&d, &theta),
        ] {
            assert!(r[[0, 0]] > r[[1, 0]] && r[[1, 0]] > r[[2, 0]]);
        }
    }
}
