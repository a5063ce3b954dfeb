use crate::criteria::AcquisitionCriterion;

/// Lower Confidence Bound `mean - kappa * sigma`, negated so that
/// higher is better
#[derive(Clone, Debug)]
pub struct LowerConfidenceBound {
    kappa: f64,
}

impl LowerConfidenceBound {
    /// Constructor
    pub fn new(kappa: f64) -> Self {
        LowerConfidenceBound { kappa }
    }
}

impl AcquisitionCriterion for LowerConfidenceBound {
    fn name(&self) -> &'static str {
        "LCB"
    }

    fn value(&self, mean: f64, sigma: f64, _fmin: f64) -> f64 {
        -(mean - self.kappa * sigma)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_abs_diff_eq;

    #[test]
    fn test_lcb_value() {
        let lcb = LowerConfidenceBound::new(1.96);
        assert_abs_diff_eq!(lcb.value(1., 0.5, 0.), -(1. - 0.98), epsilon = 1e-15);
        assert_abs_diff_eq!(lcb.value(1., 0., 123.), -1.);
    }
}
