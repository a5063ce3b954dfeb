//! Acquisition criteria scoring candidate points from the surrogate prediction
mod ei;
mod hedge;
mod lcb;
mod pi;

pub use ei::ExpectedImprovement;
pub use hedge::Hedge;
pub use lcb::LowerConfidenceBound;
pub use pi::ProbabilityOfImprovement;

use serde::{Deserialize, Serialize};

/// Default exploration margin of EI and PI
pub const DEFAULT_XI: f64 = 0.01;
/// Default standard deviation weight of LCB
pub const DEFAULT_KAPPA: f64 = 1.96;
/// Default learning rate of the Hedge portfolio
pub const DEFAULT_ETA: f64 = 1.0;

/// A trait for acquisition criteria which maximum location
/// determines the next most promising point to evaluate.
///
/// Values are computed in the minimization convention: `mean` and
/// `fmin` are internal objective values, higher criterion is better.
pub trait AcquisitionCriterion: Sync + Send {
    /// Name of the criterion
    fn name(&self) -> &'static str;

    /// Criterion value given the surrogate predicted mean and standard
    /// deviation at a point and the current best objective value
    fn value(&self, mean: f64, sigma: f64, fmin: f64) -> f64;
}

impl std::fmt::Debug for dyn AcquisitionCriterion {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        write!(f, "{}", self.name())
    }
}

/// Acquisition function used to select the next point
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub enum AcquisitionSpec {
    /// Expected Improvement with exploration margin `xi`
    EI {
        /// exploration margin
        xi: f64,
    },
    /// Probability of Improvement with exploration margin `xi`
    PI {
        /// exploration margin
        xi: f64,
    },
    /// Lower Confidence Bound with standard deviation weight `kappa`
    LCB {
        /// standard deviation weight
        kappa: f64,
    },
    /// Portfolio of EI, PI and LCB, one of them chosen at each proposal
    /// with a probability growing with its past gains
    Hedge {
        /// learning rate
        eta: f64,
        /// exploration margin of EI and PI
        xi: f64,
        /// standard deviation weight of LCB
        kappa: f64,
    },
}

impl Default for AcquisitionSpec {
    fn default() -> Self {
        AcquisitionSpec::ei()
    }
}

impl AcquisitionSpec {
    /// Expected Improvement with default margin
    pub fn ei() -> Self {
        AcquisitionSpec::EI { xi: DEFAULT_XI }
    }

    /// Probability of Improvement with default margin
    pub fn pi() -> Self {
        AcquisitionSpec::PI { xi: DEFAULT_XI }
    }

    /// Lower Confidence Bound with default weight
    pub fn lcb() -> Self {
        AcquisitionSpec::LCB {
            kappa: DEFAULT_KAPPA,
        }
    }

    /// Hedge portfolio with default settings
    pub fn hedge() -> Self {
        AcquisitionSpec::Hedge {
            eta: DEFAULT_ETA,
            xi: DEFAULT_XI,
            kappa: DEFAULT_KAPPA,
        }
    }

    /// Whether the criterion needs the surrogate uncertainty. Every
    /// available criterion does, there is no mean-only fallback.
    pub fn requires_uncertainty(&self) -> bool {
        true
    }

    /// Criteria evaluated at each proposal, one per Hedge arm
    pub fn arms(&self) -> Vec<Box<dyn AcquisitionCriterion>> {
        match *self {
            AcquisitionSpec::EI { xi } => vec![Box::new(ExpectedImprovement::new(xi))],
            AcquisitionSpec::PI { xi } => vec![Box::new(ProbabilityOfImprovement::new(xi))],
            AcquisitionSpec::LCB { kappa } => vec![Box::new(LowerConfidenceBound::new(kappa))],
            AcquisitionSpec::Hedge { xi, kappa, .. } => vec![
                Box::new(ExpectedImprovement::new(xi)),
                Box::new(ProbabilityOfImprovement::new(xi)),
                Box::new(LowerConfidenceBound::new(kappa)),
            ],
        }
    }

    pub(crate) fn check(&self) -> Result<(), String> {
        match *self {
            AcquisitionSpec::EI { xi } | AcquisitionSpec::PI { xi } if !xi.is_finite() => {
                Err(format!("`xi` should be finite, got {xi}"))
            }
            AcquisitionSpec::LCB { kappa } if !(kappa >= 0. && kappa.is_finite()) => {
                Err(format!("`kappa` should be non-negative, got {kappa}"))
            }
            AcquisitionSpec::Hedge { eta, xi, kappa } => {
                if !(eta > 0. && eta.is_finite()) {
                    Err(format!("`eta` should be positive, got {eta}"))
                } else if !xi.is_finite() {
                    Err(format!("`xi` should be finite, got {xi}"))
                } else if !(kappa >= 0. && kappa.is_finite()) {
                    Err(format!("`kappa` should be non-negative, got {kappa}"))
                } else {
                    Ok(())
                }
            }
            _ => Ok(()),
        }
    }
}

/// Whether a standard deviation is too small to discriminate points
#[inline]
pub(crate) fn negligible(sigma: f64) -> bool {
    !(sigma * sigma >= f64::EPSILON)
}
