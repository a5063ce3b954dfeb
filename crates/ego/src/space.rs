//! Continuous search space of an optimization session.
use crate::errors::{EgoError, Result};
use ndarray::{Array1, Array2, ArrayBase, Axis, Data, Ix1, Ix2, Zip};
use serde::{Deserialize, Serialize};
use std::collections::HashSet;

/// Relative tolerance on bounds, scaled by the parameter range
const BOUNDS_RTOL: f64 = 1e-9;

/// A named continuous input variable within [lower, upper]
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Parameter {
    /// Name, unique within a search space
    pub name: String,
    /// Lower bound
    pub lower: f64,
    /// Upper bound
    pub upper: f64,
}

impl Parameter {
    /// Constructor
    pub fn new(name: impl Into<String>, lower: f64, upper: f64) -> Self {
        Parameter {
            name: name.into(),
            lower,
            upper,
        }
    }

    fn width(&self) -> f64 {
        self.upper - self.lower
    }
}

/// Ordered list of parameters, the order gives the components order of
/// every input vector exchanged with the session.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct SearchSpace {
    parameters: Vec<Parameter>,
}

impl SearchSpace {
    /// Validates the parameters and builds the search space.
    ///
    /// Fails when no parameter is given, names are duplicated or
    /// bounds are not finite with lower < upper.
    pub fn new(parameters: Vec<Parameter>) -> Result<Self> {
        if parameters.is_empty() {
            return Err(EgoError::InvalidConfigError(
                "search space should contain at least one parameter".to_string(),
            ));
        }
        let mut names = HashSet::new();
        for p in parameters.iter() {
            if !names.insert(p.name.as_str()) {
                return Err(EgoError::InvalidConfigError(format!(
                    "parameter name `{}` is duplicated",
                    p.name
                )));
            }
            if !(p.lower.is_finite() && p.upper.is_finite()) {
                return Err(EgoError::InvalidConfigError(format!(
                    "parameter `{}` bounds should be finite",
                    p.name
                )));
            }
            if p.lower >= p.upper {
                return Err(EgoError::InvalidConfigError(format!(
                    "parameter `{}` lower bound {} should be less than upper bound {}",
                    p.name, p.lower, p.upper
                )));
            }
        }
        Ok(SearchSpace { parameters })
    }

    /// Number of parameters
    pub fn dim(&self) -> usize {
        self.parameters.len()
    }

    /// Parameters in order
    pub fn parameters(&self) -> &[Parameter] {
        &self.parameters
    }

    /// Bounds as a (nx, 2) matrix of [lower, upper] rows
    pub fn xlimits(&self) -> Array2<f64> {
        let mut xlimits = Array2::zeros((self.dim(), 2));
        Zip::from(xlimits.rows_mut())
            .and(&self.parameters)
            .for_each(|mut row, p| {
                row[0] = p.lower;
                row[1] = p.upper;
            });
        xlimits
    }

    /// Maps `x` from parameter units to the unit hypercube
    pub fn normalize(&self, x: &ArrayBase<impl Data<Elem = f64>, Ix1>) -> Array1<f64> {
        Zip::from(x)
            .and(&self.parameters)
            .map_collect(|v, p| (v - p.lower) / p.width())
    }

    /// Maps `x` from the unit hypercube to parameter units
    pub fn denormalize(&self, x: &ArrayBase<impl Data<Elem = f64>, Ix1>) -> Array1<f64> {
        Zip::from(x)
            .and(&self.parameters)
            .map_collect(|v, p| p.lower + v * p.width())
    }

    /// Row-wise [SearchSpace::normalize] of a (n, nx) matrix
    pub fn normalize_rows(&self, x: &ArrayBase<impl Data<Elem = f64>, Ix2>) -> Array2<f64> {
        let mut xnorm = x.to_owned();
        xnorm
            .axis_iter_mut(Axis(0))
            .for_each(|mut row| row.assign(&self.normalize(&row)));
        xnorm
    }

    /// Row-wise [SearchSpace::denormalize] of a (n, nx) matrix
    pub fn denormalize_rows(&self, x: &ArrayBase<impl Data<Elem = f64>, Ix2>) -> Array2<f64> {
        let mut xraw = x.to_owned();
        xraw.axis_iter_mut(Axis(0))
            .for_each(|mut row| row.assign(&self.denormalize(&row)));
        xraw
    }

    /// Whether `x` has one component per parameter, each within its bounds
    pub fn validate(&self, x: &ArrayBase<impl Data<Elem = f64>, Ix1>) -> bool {
        self.check(x).is_ok()
    }

    /// Returns `x` clamped into bounds when every component lies within
    /// the bounds up to a tolerance relative to the parameter range,
    /// an error otherwise.
    pub fn check(&self, x: &ArrayBase<impl Data<Elem = f64>, Ix1>) -> Result<Array1<f64>> {
        if x.len() != self.dim() {
            return Err(EgoError::DimensionMismatch {
                expected: self.dim(),
                actual: x.len(),
            });
        }
        for (v, p) in x.iter().zip(self.parameters.iter()) {
            let tol = BOUNDS_RTOL * p.width();
            if !(*v >= p.lower - tol && *v <= p.upper + tol) {
                return Err(EgoError::OutOfBounds(format!(
                    "{} = {} not in [{}, {}]",
                    p.name, v, p.lower, p.upper
                )));
            }
        }
        Ok(Zip::from(x)
            .and(&self.parameters)
            .map_collect(|v, p| (*v).clamp(p.lower, p.upper)))
    }
}
