use crate::criteria::{negligible, AcquisitionCriterion};
use crate::utils::norm_cdf;

/// Probability of improving the current minimum by more than a margin `xi`
#[derive(Clone, Debug)]
pub struct ProbabilityOfImprovement {
    xi: f64,
}

impl ProbabilityOfImprovement {
    /// Constructor
    pub fn new(xi: f64) -> Self {
        ProbabilityOfImprovement { xi }
    }
}

impl AcquisitionCriterion for ProbabilityOfImprovement {
    fn name(&self) -> &'static str {
        "PI"
    }

    fn value(&self, mean: f64, sigma: f64, fmin: f64) -> f64 {
        let improvement = fmin - mean - self.xi;
        if negligible(sigma) {
            if improvement > 0. {
                1.
            } else {
                0.
            }
        } else {
            norm_cdf(improvement / sigma)
        }
    }
}
