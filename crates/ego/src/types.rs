use ndarray::Array1;
use serde::{Deserialize, Serialize};

/// Whether the objective is to be minimized or maximized.
///
/// Internally the engine always minimizes: outputs of a maximized
/// objective are negated on the way in and on the way out.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum Direction {
    /// Lower is better
    Minimize,
    /// Higher is better
    Maximize,
}

impl Direction {
    fn sign(&self) -> f64 {
        match self {
            Direction::Minimize => 1.,
            Direction::Maximize => -1.,
        }
    }

    /// Objective value in the internal minimization convention
    pub fn internal(&self, y: f64) -> f64 {
        self.sign() * y
    }

    /// Objective value in the caller convention
    pub fn external(&self, y: f64) -> f64 {
        self.sign() * y
    }
}

/// An evaluated experiment
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Observation {
    /// Input values in search space order
    pub x: Array1<f64>,
    /// Measured outcome
    pub y: f64,
}

impl Observation {
    /// Constructor
    pub fn new(x: Array1<f64>, y: f64) -> Self {
        Observation { x, y }
    }
}

/// Next experiment suggested by the session
#[derive(Clone, Debug, PartialEq)]
pub struct Proposal {
    /// Input values in search space order and units
    pub x: Array1<f64>,
    /// Predicted outcome at `x`, None while warming up
    pub predicted_mean: Option<f64>,
    /// Predicted standard deviation at `x`, None while warming up
    pub predicted_uncertainty: Option<f64>,
}

/// Lifecycle of an optimization session
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum SessionState {
    /// Proposals come from the initial space-filling design
    WarmingUp,
    /// Proposals come from the surrogate model
    Modeling,
    /// No more proposals or observations accepted
    Closed,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_direction_roundtrip() {
        for dir in [Direction::Minimize, Direction::Maximize] {
            assert_eq!(dir.external(dir.internal(3.5)), 3.5);
        }
        assert_eq!(Direction::Maximize.internal(2.), -2.);
        assert_eq!(Direction::Minimize.internal(2.), 2.);
    }
}
