use crate::correlation_models::CorrelationModel;
use crate::errors::{GpError, Result};
use crate::mean_models::RegressionModel;
use crate::{GP_COBYLA_MAX_EVAL, GP_OPTIM_N_START};
use linfa::{Float, ParamGuard};
use ndarray::{array, Array1};

/// How the kernel length-scale hyperparameters are obtained
#[derive(Clone, Debug, PartialEq)]
pub enum ThetaTuning<F: Float> {
    /// Given values, no estimation
    Fixed(Array1<F>),
    /// Estimated by likelihood maximization within `bounds` starting from `init`.
    /// A 1-dim `init` is broadcast to every input component.
    Full {
        /// Initial guess
        init: Array1<F>,
        /// (lower, upper) bounds shared by every component
        bounds: (F, F),
    },
}

impl<F: Float> Default for ThetaTuning<F> {
    fn default() -> Self {
        ThetaTuning::Full {
            init: array![F::cast(Self::DEFAULT_INIT)],
            bounds: Self::default_bounds(),
        }
    }
}

impl<F: Float> ThetaTuning<F> {
    /// Default initial theta value
    pub const DEFAULT_INIT: f64 = 1e-1;
    /// Default bounds for theta values
    pub const DEFAULT_BOUNDS: (f64, f64) = (1e-2, 1e1);

    fn default_bounds() -> (F, F) {
        (
            F::cast(Self::DEFAULT_BOUNDS.0),
            F::cast(Self::DEFAULT_BOUNDS.1),
        )
    }

    /// Initial (or fixed) theta value
    pub fn init(&self) -> &Array1<F> {
        match self {
            ThetaTuning::Fixed(init) | ThetaTuning::Full { init, .. } => init,
        }
    }
}

/// A set of validated GP parameters.
#[derive(Clone, Debug, PartialEq)]
pub struct GpValidParams<F: Float, Mean: RegressionModel<F>, Corr: CorrelationModel<F>> {
    pub(crate) theta_tuning: ThetaTuning<F>,
    /// Regression model representing the trend
    pub(crate) mean: Mean,
    /// Kernel correlating the errors at x and x'
    pub(crate) corr: Corr,
    /// Number of likelihood optimization restarts in addition to the initial guess
    pub(crate) n_start: usize,
    /// Max number of likelihood evaluations of one optimization
    pub(crate) max_eval: usize,
    /// Added to the correlation matrix diagonal for numerical stability
    pub(crate) nugget: F,
}

impl<F: Float, Mean: RegressionModel<F>, Corr: CorrelationModel<F>> Default
    for GpValidParams<F, Mean, Corr>
{
    fn default() -> GpValidParams<F, Mean, Corr> {
        GpValidParams {
            theta_tuning: ThetaTuning::default(),
            mean: Mean::default(),
            corr: Corr::default(),
            n_start: GP_OPTIM_N_START,
            max_eval: GP_COBYLA_MAX_EVAL,
            nugget: F::cast(100.0) * F::epsilon(),
        }
    }
}

impl<F: Float, Mean: RegressionModel<F>, Corr: CorrelationModel<F>> GpValidParams<F, Mean, Corr> {
    /// Get mean model
    pub fn mean(&self) -> &Mean {
        &self.mean
    }

    /// Get correlation model
    pub fn corr(&self) -> &Corr {
        &self.corr
    }

    /// Get theta tuning strategy
    pub fn theta_tuning(&self) -> &ThetaTuning<F> {
        &self.theta_tuning
    }

    /// Get the number of likelihood optimization restarts
    pub fn n_start(&self) -> usize {
        self.n_start
    }

    /// Get the max number of likelihood evaluations of one optimization
    pub fn max_eval(&self) -> usize {
        self.max_eval
    }

    /// Get the nugget
    pub fn nugget(&self) -> F {
        self.nugget
    }
}

/// The set of hyperparameters that can be specified for the execution of
/// the [GP algorithm](crate::GaussianProcess).
#[derive(Clone, Debug)]
pub struct GpParams<F: Float, Mean: RegressionModel<F>, Corr: CorrelationModel<F>>(
    GpValidParams<F, Mean, Corr>,
);

impl<F: Float, Mean: RegressionModel<F>, Corr: CorrelationModel<F>> GpParams<F, Mean, Corr> {
    /// GP parameters given mean and correlation models
    pub fn new(mean: Mean, corr: Corr) -> GpParams<F, Mean, Corr> {
        Self(GpValidParams {
            mean,
            corr,
            ..Default::default()
        })
    }

    /// Set mean model.
    pub fn mean(mut self, mean: Mean) -> Self {
        self.0.mean = mean;
        self
    }

    /// Set correlation model.
    pub fn corr(mut self, corr: Corr) -> Self {
        self.0.corr = corr;
        self
    }

    /// Set the theta tuning strategy
    pub fn theta_tuning(mut self, theta_tuning: ThetaTuning<F>) -> Self {
        self.0.theta_tuning = theta_tuning;
        self
    }

    /// Set the initial guess of theta, keeping the current bounds
    /// (or the default ones when theta was fixed).
    pub fn theta_init(mut self, init: Array1<F>) -> Self {
        let bounds = match self.0.theta_tuning {
            ThetaTuning::Full { bounds, .. } => bounds,
            ThetaTuning::Fixed(_) => ThetaTuning::default_bounds(),
        };
        self.0.theta_tuning = ThetaTuning::Full { init, bounds };
        self
    }

    /// Set the (lower, upper) bounds of theta, keeping the current initial guess
    pub fn theta_bounds(mut self, bounds: (F, F)) -> Self {
        let init = self.0.theta_tuning.init().to_owned();
        self.0.theta_tuning = ThetaTuning::Full { init, bounds };
        self
    }

    /// Set the number of likelihood optimization restarts
    pub fn n_start(mut self, n_start: usize) -> Self {
        self.0.n_start = n_start;
        self
    }

    /// Set the max number of likelihood evaluations of one optimization
    pub fn max_eval(mut self, max_eval: usize) -> Self {
        self.0.max_eval = max_eval;
        self
    }

    /// Set nugget value, should be non-negative.
    pub fn nugget(mut self, nugget: F) -> Self {
        self.0.nugget = nugget;
        self
    }
}

impl<F: Float, Mean: RegressionModel<F>, Corr: CorrelationModel<F>> ParamGuard
    for GpParams<F, Mean, Corr>
{
    type Checked = GpValidParams<F, Mean, Corr>;
    type Error = GpError;

    fn check_ref(&self) -> Result<&Self::Checked> {
        let init = self.0.theta_tuning.init();
        if init.is_empty() || init.iter().any(|v| !(*v > F::zero())) {
            return Err(GpError::InvalidValueError(
                "`theta` values should be positive".to_string(),
            ));
        }
        if let ThetaTuning::Full { bounds, .. } = &self.0.theta_tuning {
            if !(bounds.0 > F::zero() && bounds.0 < bounds.1) {
                return Err(GpError::InvalidValueError(
                    "`theta` bounds should verify 0 < lower < upper".to_string(),
                ));
            }
        }
        if !(self.0.nugget >= F::zero()) {
            return Err(GpError::InvalidValueError(
                "`nugget` should be non-negative".to_string(),
            ));
        }
        Ok(&self.0)
    }

    fn check(self) -> Result<Self::Checked> {
        self.check_ref()?;
        Ok(self.0)
    }
}
