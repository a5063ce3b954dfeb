use crate::criteria::{negligible, AcquisitionCriterion};
use crate::utils::{norm_cdf, norm_pdf};

/// Expected Improvement over the current minimum, reduced by a margin `xi`
#[derive(Clone, Debug)]
pub struct ExpectedImprovement {
    xi: f64,
}

impl ExpectedImprovement {
    /// Constructor
    pub fn new(xi: f64) -> Self {
        ExpectedImprovement { xi }
    }
}

impl AcquisitionCriterion for ExpectedImprovement {
    fn name(&self) -> &'static str {
        "EI"
    }

    /// `(fmin - mean - xi) * cdf(z) + sigma * pdf(z)` with `z = (fmin - mean - xi) / sigma`,
    /// the improvement itself (if any) when the uncertainty vanishes
    fn value(&self, mean: f64, sigma: f64, fmin: f64) -> f64 {
        let improvement = fmin - mean - self.xi;
        if negligible(sigma) {
            improvement.max(0.)
        } else {
            let z = improvement / sigma;
            improvement * norm_cdf(z) + sigma * norm_pdf(z)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_abs_diff_eq;

    #[test]
    fn test_ei_value() {
        let ei = ExpectedImprovement::new(0.);
        // z = 0
        assert_abs_diff_eq!(ei.value(1., 2., 1.), 2. * 0.3989422804014327, epsilon = 1e-12);
        // grows with uncertainty and with the predicted improvement
        assert!(ei.value(0., 2., 1.) > ei.value(0., 1., 1.));
        assert!(ei.value(-1., 1., 1.) > ei.value(0., 1., 1.));
        assert!(ei.value(5., 1., 1.) >= 0.);
    }

    #[test]
    fn test_ei_without_uncertainty() {
        let ei = ExpectedImprovement::new(0.);
        assert_abs_diff_eq!(ei.value(0.25, 0., 1.), 0.75);
        assert_abs_diff_eq!(ei.value(2., 0., 1.), 0.);
        let ei = ExpectedImprovement::new(0.5);
        assert_abs_diff_eq!(ei.value(0.25, 0., 1.), 0.25);
    }
}
