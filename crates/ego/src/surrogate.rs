//! Surrogate models of the objective fitted on the session history.
//!
//! A [SurrogateSpec] selects the model family and its hyperparameters,
//! fitting it yields a boxed [Surrogate] used by the acquisition optimizer.
use crate::errors::{EgoError, Result};
use egolab_forest::{Forest, ForestKind};
use egolab_gp::correlation_models::{Matern52Corr, SquaredExponentialCorr};
use egolab_gp::mean_models::{ConstantMean, LinearMean};
use egolab_gp::GaussianProcess;
use linfa::prelude::{Dataset, Fit};
use ndarray::{Array1, ArrayView1, ArrayView2};
use ndarray_rand::rand::SeedableRng;
use paste::paste;
use rand_xoshiro::Xoshiro256Plus;
use serde::{Deserialize, Serialize};
use std::fmt;

/// A fitted model of the objective
pub trait Surrogate: fmt::Display + Sync + Send {
    /// Predicted means at n points given as a (n, nx) matrix
    fn predict(&self, x: &ArrayView2<f64>) -> Result<Array1<f64>>;
    /// Predicted means and variances at n points given as a (n, nx) matrix
    fn predict_valvar(&self, x: &ArrayView2<f64>) -> Result<(Array1<f64>, Array1<f64>)>;
}

macro_rules! declare_gp_surrogate {
    ($regr:ident, $corr:ident) => {
        paste! {
            #[doc = "GP surrogate with `" $regr "` regression model and `" $corr "` correlation model."]
            #[derive(Clone, Debug)]
            pub struct [<Gp $regr $corr Surrogate>](
                pub GaussianProcess<f64, [<$regr Mean>], [<$corr Corr>]>,
            );

            impl [<Gp $regr $corr Surrogate>] {
                fn train(
                    config: &GpConfig,
                    x: &ArrayView2<f64>,
                    y: &ArrayView1<f64>,
                ) -> Result<Box<dyn Surrogate>> {
                    let gp = GaussianProcess::<f64, [<$regr Mean>], [<$corr Corr>]>::params(
                        [<$regr Mean>]::default(),
                        [<$corr Corr>]::default(),
                    )
                    .n_start(config.n_start)
                    .nugget(config.nugget)
                    .fit(&Dataset::new(x.to_owned(), y.to_owned()))?;
                    Ok(Box::new([<Gp $regr $corr Surrogate>](gp)))
                }
            }

            impl Surrogate for [<Gp $regr $corr Surrogate>] {
                fn predict(&self, x: &ArrayView2<f64>) -> Result<Array1<f64>> {
                    Ok(self.0.predict(x)?)
                }

                fn predict_valvar(&self, x: &ArrayView2<f64>) -> Result<(Array1<f64>, Array1<f64>)> {
                    Ok(self.0.predict_valvar(x)?)
                }
            }

            impl fmt::Display for [<Gp $regr $corr Surrogate>] {
                fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
                    write!(f, "{}", self.0)
                }
            }
        }
    };
}

declare_gp_surrogate!(Constant, SquaredExponential);
declare_gp_surrogate!(Constant, Matern52);
declare_gp_surrogate!(Linear, SquaredExponential);
declare_gp_surrogate!(Linear, Matern52);

/// Tree ensemble surrogate, the uncertainty is the disagreement between trees
#[derive(Clone, Debug)]
pub struct ForestSurrogate(pub Forest<f64>);

impl Surrogate for ForestSurrogate {
    fn predict(&self, x: &ArrayView2<f64>) -> Result<Array1<f64>> {
        Ok(self.0.predict(x))
    }

    fn predict_valvar(&self, x: &ArrayView2<f64>) -> Result<(Array1<f64>, Array1<f64>)> {
        Ok(self.0.predict_valvar(x))
    }
}

impl fmt::Display for ForestSurrogate {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Trend of the gaussian process
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub enum RegressionSpec {
    /// Constant mean
    #[default]
    Constant,
    /// Linear mean
    Linear,
}

/// Kernel of the gaussian process
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub enum CorrelationSpec {
    /// Squared exponential kernel
    SquaredExponential,
    /// Matérn 5/2 kernel
    #[default]
    Matern52,
}

/// Gaussian process surrogate settings
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct GpConfig {
    /// Trend model
    pub regression: RegressionSpec,
    /// Kernel model
    pub correlation: CorrelationSpec,
    /// Number of likelihood optimization restarts
    pub n_start: usize,
    /// Added to the correlation matrix diagonal, allows noisy or repeated measurements
    pub nugget: f64,
}

impl Default for GpConfig {
    fn default() -> Self {
        GpConfig {
            regression: RegressionSpec::default(),
            correlation: CorrelationSpec::default(),
            n_start: 10,
            nugget: 1e-6,
        }
    }
}

impl GpConfig {
    /// Sets the trend model
    pub fn regression(mut self, regression: RegressionSpec) -> Self {
        self.regression = regression;
        self
    }

    /// Sets the kernel model
    pub fn correlation(mut self, correlation: CorrelationSpec) -> Self {
        self.correlation = correlation;
        self
    }

    /// Sets the number of likelihood optimization restarts
    pub fn n_start(mut self, n_start: usize) -> Self {
        self.n_start = n_start;
        self
    }

    /// Sets the nugget
    pub fn nugget(mut self, nugget: f64) -> Self {
        self.nugget = nugget;
        self
    }
}

/// Tree ensemble surrogate settings
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct ForestConfig {
    /// Number of trees, at least 2 to get an uncertainty
    pub n_trees: usize,
    /// Minimum number of observations in a leaf
    pub min_samples_leaf: usize,
    /// Number of split candidate features, all when None
    pub max_features: Option<usize>,
}

impl Default for ForestConfig {
    fn default() -> Self {
        ForestConfig {
            n_trees: 100,
            min_samples_leaf: 3,
            max_features: None,
        }
    }
}

impl ForestConfig {
    /// Sets the number of trees
    pub fn n_trees(mut self, n_trees: usize) -> Self {
        self.n_trees = n_trees;
        self
    }

    /// Sets the minimum number of observations in a leaf
    pub fn min_samples_leaf(mut self, min_samples_leaf: usize) -> Self {
        self.min_samples_leaf = min_samples_leaf;
        self
    }

    /// Sets the number of split candidate features
    pub fn max_features(mut self, max_features: Option<usize>) -> Self {
        self.max_features = max_features;
        self
    }
}

/// Surrogate model family with its settings
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub enum SurrogateSpec {
    /// Gaussian process regression
    Gp(GpConfig),
    /// Random forest: bootstrapped trees with best splits
    RandomForest(ForestConfig),
    /// Extremely randomized trees
    ExtraTrees(ForestConfig),
}

impl Default for SurrogateSpec {
    fn default() -> Self {
        SurrogateSpec::gp()
    }
}

impl SurrogateSpec {
    /// Gaussian process with default settings
    pub fn gp() -> Self {
        SurrogateSpec::Gp(GpConfig::default())
    }

    /// Random forest with default settings
    pub fn random_forest() -> Self {
        SurrogateSpec::RandomForest(ForestConfig::default())
    }

    /// Extra trees with default settings
    pub fn extra_trees() -> Self {
        SurrogateSpec::ExtraTrees(ForestConfig::default())
    }

    /// Whether fitted models report a meaningful uncertainty
    pub fn provides_uncertainty(&self) -> bool {
        match self {
            SurrogateSpec::Gp(_) => true,
            SurrogateSpec::RandomForest(config) | SurrogateSpec::ExtraTrees(config) => {
                config.n_trees >= 2
            }
        }
    }

    /// Fits the model on `x` (n, nx) and `y` (n,), `seed` drives any randomness of the fit
    pub fn fit(
        &self,
        x: &ArrayView2<f64>,
        y: &ArrayView1<f64>,
        seed: u64,
    ) -> Result<Box<dyn Surrogate>> {
        if x.nrows() == 0 {
            return Err(EgoError::InsufficientData(
                "at least one observation is required to fit a surrogate".to_string(),
            ));
        }
        match self {
            SurrogateSpec::Gp(config) => match (config.regression, config.correlation) {
                (RegressionSpec::Constant, CorrelationSpec::SquaredExponential) => {
                    GpConstantSquaredExponentialSurrogate::train(config, x, y)
                }
                (RegressionSpec::Constant, CorrelationSpec::Matern52) => {
                    GpConstantMatern52Surrogate::train(config, x, y)
                }
                (RegressionSpec::Linear, CorrelationSpec::SquaredExponential) => {
                    GpLinearSquaredExponentialSurrogate::train(config, x, y)
                }
                (RegressionSpec::Linear, CorrelationSpec::Matern52) => {
                    GpLinearMatern52Surrogate::train(config, x, y)
                }
            },
            SurrogateSpec::RandomForest(config) => {
                fit_forest(ForestKind::RandomForest, config, x, y, seed)
            }
            SurrogateSpec::ExtraTrees(config) => {
                fit_forest(ForestKind::ExtraTrees, config, x, y, seed)
            }
        }
    }

    pub(crate) fn check(&self) -> std::result::Result<(), String> {
        match self {
            SurrogateSpec::Gp(config) => {
                if !(config.nugget >= 0. && config.nugget.is_finite()) {
                    return Err(format!("GP nugget should be non-negative, got {}", config.nugget));
                }
            }
            SurrogateSpec::RandomForest(config) | SurrogateSpec::ExtraTrees(config) => {
                if config.n_trees == 0 {
                    return Err("number of trees should be at least 1".to_string());
                }
                if config.min_samples_leaf == 0 {
                    return Err("min_samples_leaf should be at least 1".to_string());
                }
                if config.max_features == Some(0) {
                    return Err("max_features should be at least 1".to_string());
                }
            }
        }
        Ok(())
    }
}

fn fit_forest(
    kind: ForestKind,
    config: &ForestConfig,
    x: &ArrayView2<f64>,
    y: &ArrayView1<f64>,
    seed: u64,
) -> Result<Box<dyn Surrogate>> {
    let forest = Forest::params(kind)
        .n_trees(config.n_trees)
        .min_samples_leaf(config.min_samples_leaf)
        .max_features(config.max_features)
        .with_rng(Xoshiro256Plus::seed_from_u64(seed))
        .fit(&Dataset::new(x.to_owned(), y.to_owned()))?;
    Ok(Box::new(ForestSurrogate(forest)))
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_abs_diff_eq;
    use ndarray::{array, Array2};

    fn training_data() -> (Array2<f64>, Array1<f64>) {
        let xt = array![[0.], [0.25], [0.5], [0.75], [1.]];
        let yt = xt.column(0).mapv(|v| (v - 0.3) * (v - 0.3));
        (xt, yt)
    }

    macro_rules! test_gp_surrogate {
        ($regr:ident, $corr:ident) => {
            paste! {
                #[test]
                fn [<test_gp_ $regr:snake _ $corr:snake _surrogate>]() {
                    let (xt, yt) = training_data();
                    let spec = SurrogateSpec::Gp(
                        GpConfig::default()
                            .regression(RegressionSpec::$regr)
                            .correlation(CorrelationSpec::$corr),
                    );
                    let model = spec.fit(&xt.view(), &yt.view(), 0).expect("GP surrogate fitted");
                    let (mean, var) = model.predict_valvar(&xt.view()).expect("prediction");
                    assert_abs_diff_eq!(mean, yt, epsilon = 1e-2);
                    assert!(var.iter().all(|v| *v >= 0. && *v < 1e-3));
                }
            }
        };
    }

    test_gp_surrogate!(Constant, SquaredExponential);
    test_gp_surrogate!(Constant, Matern52);
    test_gp_surrogate!(Linear, SquaredExponential);
    test_gp_surrogate!(Linear, Matern52);

    #[test]
    fn test_forest_surrogates() {
        let (xt, yt) = training_data();
        for spec in [
            SurrogateSpec::RandomForest(ForestConfig::default().n_trees(20).min_samples_leaf(1)),
            SurrogateSpec::ExtraTrees(ForestConfig::default().n_trees(20).min_samples_leaf(1)),
        ] {
            let model = spec.fit(&xt.view(), &yt.view(), 42).expect("forest fitted");
            let (mean, var) = model.predict_valvar(&xt.view()).expect("prediction");
            assert_eq!(mean.len(), 5);
            assert!(var.iter().all(|v| *v >= 0.));
            assert_eq!(
                model.predict(&xt.view()).expect("prediction"),
                spec.fit(&xt.view(), &yt.view(), 42)
                    .expect("forest fitted")
                    .predict(&xt.view())
                    .expect("prediction")
            );
        }
    }

    #[test]
    fn test_provides_uncertainty() {
        assert!(SurrogateSpec::gp().provides_uncertainty());
        assert!(SurrogateSpec::extra_trees().provides_uncertainty());
        assert!(!SurrogateSpec::RandomForest(ForestConfig::default().n_trees(1)).provides_uncertainty());
    }

    #[test]
    fn test_no_data() {
        let xt = Array2::<f64>::zeros((0, 1));
        let yt = Array1::<f64>::zeros(0);
        for spec in [SurrogateSpec::gp(), SurrogateSpec::extra_trees()] {
            assert!(matches!(
                spec.fit(&xt.view(), &yt.view(), 0),
                Err(EgoError::InsufficientData(_))
            ));
        }
    }
}
