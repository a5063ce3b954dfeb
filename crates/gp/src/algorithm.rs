use crate::correlation_models::*;
use crate::errors::{GpError, Result};
use crate::mean_models::*;
use crate::optimization::{optimize_params, prepare_multistart, to_f64, CobylaParams};
use crate::parameters::{GpParams, GpValidParams, ThetaTuning};
use crate::utils::{pairwise_differences, DiffMatrix, NormalizedData};

use linfa::prelude::{DatasetBase, Fit, Float};
use linfa_linalg::{cholesky::*, qr::*, svd::*, triangular::*};
use ndarray::{Array1, Array2, ArrayBase, Axis, Data, Ix1, Ix2};

use log::{debug, warn};
use rayon::prelude::*;
use std::fmt;
use std::time::Instant;

/// Default number of multistart for hyperparameters optimization
pub const GP_OPTIM_N_START: usize = 10;
/// Minimum of function evaluations for COBYLA optimizer
pub const GP_COBYLA_MIN_EVAL: usize = 25;
/// Maximum of function evaluations for COBYLA optimizer
pub const GP_COBYLA_MAX_EVAL: usize = 1000;

/// Quantities computed once at training time and reused by every prediction
#[derive(Debug, Clone)]
pub(crate) struct GpInnerParams<F: Float> {
    /// Process variance in output units
    sigma2: F,
    /// Generalized least-squares trend weights
    beta: Array2<F>,
    /// Correlation weights: R^-1 (y - F beta)
    gamma: Array2<F>,
    /// Lower Cholesky factor of the correlation matrix R
    r_chol: Array2<F>,
    /// Solution of L ft = F
    ft: Array2<F>,
    /// R factor of the QR decomposition of ft
    ft_qr_r: Array2<F>,
}

/// Gaussian process regression model.
///
/// The output is modeled as `Y(x) = beta.regr(x) + Z(x)` where `regr` is the
/// regression basis of the mean model and `Z` a centered gaussian process of
/// variance `sigma^2` whose correlation `corr(x, x')` is given by the kernel.
/// Kernel length-scales `theta` are estimated by maximizing the reduced
/// likelihood; inputs and outputs are standardized internally.
///
/// The posterior at new points is available through [GaussianProcess::predict]
/// (mean), [GaussianProcess::predict_var] (variance) or both at once
/// with [GaussianProcess::predict_valvar].
#[derive(Debug, Clone)]
pub struct GaussianProcess<F: Float, Mean: RegressionModel<F>, Corr: CorrelationModel<F>> {
    /// Inverse length-scales of the kernel
    theta: Array1<F>,
    /// Reduced likelihood at `theta`
    likelihood: F,
    inner_params: GpInnerParams<F>,
    xt_norm: NormalizedData<F>,
    yt_norm: NormalizedData<F>,
    /// Training dataset (input, output)
    pub(crate) training_data: (Array2<F>, Array1<F>),
    /// Parameters used to fit this model
    pub(crate) params: GpValidParams<F, Mean, Corr>,
}

/// Ordinary kriging: constant mean and squared exponential kernel
pub type Kriging<F> = GpParams<F, ConstantMean, SquaredExponentialCorr>;

impl<F: Float> Kriging<F> {
    /// Kriging parameters constructor
    pub fn params() -> GpParams<F, ConstantMean, SquaredExponentialCorr> {
        GpParams::new(ConstantMean(), SquaredExponentialCorr())
    }
}

impl<F: Float, Mean: RegressionModel<F>, Corr: CorrelationModel<F>> fmt::Display
    for GaussianProcess<F, Mean, Corr>
{
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(
            f,
            "GP(mean={}, corr={}, theta={}, variance={}, likelihood={})",
            self.params.mean,
            self.params.corr,
            self.theta,
            self.inner_params.sigma2,
            self.likelihood,
        )
    }
}

impl<F: Float, Mean: RegressionModel<F>, Corr: CorrelationModel<F>> GaussianProcess<F, Mean, Corr> {
    /// Gp parameters contructor
    pub fn params<NewMean: RegressionModel<F>, NewCorr: CorrelationModel<F>>(
        mean: NewMean,
        corr: NewCorr,
    ) -> GpParams<F, NewMean, NewCorr> {
        GpParams::new(mean, corr)
    }

    /// Predicted means at n points given as a (n, nx) matrix
    pub fn predict(&self, x: &ArrayBase<impl Data<Elem = F>, Ix2>) -> Result<Array1<F>> {
        let xnorm = self.xt_norm.apply(x);
        let corr = self.correlation(&xnorm);
        Ok(self.mean_from(&xnorm, &corr))
    }

    /// Predicted variances at n points given as a (n, nx) matrix
    pub fn predict_var(&self, x: &ArrayBase<impl Data<Elem = F>, Ix2>) -> Result<Array1<F>> {
        let xnorm = self.xt_norm.apply(x);
        let corr = self.correlation(&xnorm);
        self.variance_from(&xnorm, &corr)
    }

    /// Predicted means and variances at n points given as a (n, nx) matrix
    pub fn predict_valvar(
        &self,
        x: &ArrayBase<impl Data<Elem = F>, Ix2>,
    ) -> Result<(Array1<F>, Array1<F>)> {
        let xnorm = self.xt_norm.apply(x);
        let corr = self.correlation(&xnorm);
        let mean = self.mean_from(&xnorm, &corr);
        let var = self.variance_from(&xnorm, &corr)?;
        Ok((mean, var))
    }

    fn mean_from(&self, xnorm: &Array2<F>, corr: &Array2<F>) -> Array1<F> {
        let f = self.params.mean.value(xnorm);
        let y_ = &f.dot(&self.inner_params.beta) + &corr.dot(&self.inner_params.gamma);
        (&y_ * &self.yt_norm.std + &self.yt_norm.mean).remove_axis(Axis(1))
    }

    /// Kriging mean squared error, clamped to zero against round-off
    fn variance_from(&self, xnorm: &Array2<F>, corr: &Array2<F>) -> Result<Array1<F>> {
        let inners = &self.inner_params;
        let rt = inners.r_chol.solve_triangular(&corr.t(), UPLO::Lower)?;
        let rhs = inners.ft.t().dot(&rt) - self.params.mean.value(xnorm).t();
        let u = inners.ft_qr_r.t().solve_triangular(&rhs, UPLO::Lower)?;

        let mse = Array1::ones(rt.ncols()) - rt.mapv(|v| v * v).sum_axis(Axis(0))
            + u.mapv(|v| v * v).sum_axis(Axis(0));
        Ok(mse.mapv(|v| {
            let v = inners.sigma2 * v;
            if v < F::zero() {
                F::zero()
            } else {
                v
            }
        }))
    }

    /// (n, nt) correlations between normalized points and training points
    fn correlation(&self, xnorm: &Array2<F>) -> Array2<F> {
        let dx = pairwise_differences(xnorm, &self.xt_norm.data);
        let r = self.params.corr.value(&dx, &self.theta);
        let nt = self.xt_norm.data.nrows();
        let mut corr = Array2::zeros((xnorm.nrows(), nt));
        for (k, v) in r.iter().enumerate() {
            corr[[k / nt, k % nt]] = *v;
        }
        corr
    }

    /// Optimized kernel length-scale parameters
    pub fn theta(&self) -> &Array1<F> {
        &self.theta
    }

    /// Estimated process variance
    pub fn variance(&self) -> F {
        self.inner_params.sigma2
    }

    /// Reduced likelihood at optimized theta
    pub fn likelihood(&self) -> F {
        self.likelihood
    }

    /// Input and output dimensions
    pub fn dims(&self) -> (usize, usize) {
        (self.training_data.0.ncols(), 1)
    }

    /// Training inputs and outputs
    pub fn training_data(&self) -> &(Array2<F>, Array1<F>) {
        &self.training_data
    }
}

impl<F: Float, Mean: RegressionModel<F>, Corr: CorrelationModel<F>, D: Data<Elem = F>>
    Fit<ArrayBase<D, Ix2>, ArrayBase<D, Ix1>, GpError> for GpValidParams<F, Mean, Corr>
{
    type Object = GaussianProcess<F, Mean, Corr>;

    /// Fit GP parameters using maximum likelihood
    fn fit(
        &self,
        dataset: &DatasetBase<ArrayBase<D, Ix2>, ArrayBase<D, Ix1>>,
    ) -> Result<Self::Object> {
        let x = dataset.records();
        let y = dataset.targets().to_owned().insert_axis(Axis(1));
        if x.nrows() == 0 {
            return Err(GpError::InsufficientData(
                "at least one training point is required".to_string(),
            ));
        }
        if x.nrows() != y.nrows() {
            return Err(GpError::InvalidValueError(format!(
                "{} inputs given for {} outputs",
                x.nrows(),
                y.nrows()
            )));
        }

        let nx = x.ncols();
        let init = self.theta_tuning().init();
        let theta0 = if init.len() == 1 {
            Array1::from_elem(nx, init[0])
        } else if init.len() == nx {
            init.to_owned()
        } else {
            return Err(GpError::InvalidValueError(format!(
                "theta initial guess should be either 1-dim or {nx}-dim, got {}",
                init.len()
            )));
        };

        let xtrain = NormalizedData::new(x);
        let ytrain = NormalizedData::new(&y);
        let x_distances = DiffMatrix::new(&xtrain.data);
        if x_distances.has_duplicates() {
            warn!("Training points contain the same input location twice, relying on nugget");
        }
        let fx = self.mean().value(&xtrain.data);

        let theta = match self.theta_tuning() {
            ThetaTuning::Fixed(_) => theta0,
            // a single point carries no information about length-scales
            ThetaTuning::Full { .. } if x.nrows() < 2 => theta0,
            ThetaTuning::Full { bounds, .. } => {
                let base: f64 = 10.;
                let objfn = |x: &[f64], _gradient: Option<&mut [f64]>, _params: &mut ()| -> f64 {
                    if x.iter().any(|v| v.is_nan()) {
                        return f64::INFINITY;
                    }
                    let theta: Array1<F> = x.iter().map(|v| F::cast(base.powf(*v))).collect();
                    let rxx = self.corr().value(&x_distances.d, &theta);
                    match reduced_likelihood(&fx, &rxx, &x_distances, &ytrain, self.nugget()) {
                        Ok((lkh, _)) => -to_f64(lkh),
                        Err(_) => f64::INFINITY,
                    }
                };

                let bounds = vec![*bounds; nx];
                let (theta_inits, log_bounds) = prepare_multistart(self.n_start(), &theta0, &bounds);
                debug!("GP likelihood multistart from {} points", theta_inits.nrows());
                let now = Instant::now();
                let maxeval = (10 * nx).clamp(GP_COBYLA_MIN_EVAL, self.max_eval().max(GP_COBYLA_MIN_EVAL));
                let best = (0..theta_inits.nrows())
                    .into_par_iter()
                    .map(|i| {
                        let (fval, x_opt) = optimize_params(
                            objfn,
                            &theta_inits.row(i).to_owned(),
                            &log_bounds,
                            CobylaParams {
                                maxeval,
                                ..CobylaParams::default()
                            },
                        );
                        if x_opt.iter().all(|v| v.is_finite()) {
                            (fval, x_opt)
                        } else {
                            (f64::INFINITY, x_opt)
                        }
                    })
                    .reduce(
                        || (f64::INFINITY, theta0.mapv(|v| to_f64(v.log10()))),
                        |a, b| if b.0 < a.0 { b } else { a },
                    );
                debug!("GP likelihood optimized in {} ms", now.elapsed().as_millis());
                best.1.mapv(|v| F::cast(base.powf(v)))
            }
        };

        let rxx = self.corr().value(&x_distances.d, &theta);
        let (likelihood, inner_params) =
            reduced_likelihood(&fx, &rxx, &x_distances, &ytrain, self.nugget())?;
        Ok(GaussianProcess {
            theta,
            likelihood,
            inner_params,
            xt_norm: xtrain,
            yt_norm: ytrain,
            training_data: (x.to_owned(), y.remove_axis(Axis(1))),
            params: self.clone(),
        })
    }
}

/// Reduced likelihood of the normalized training data and the fitted quantities.
/// fx: regression basis at training points,
/// rxx: correlations of the training point pairs listed in `x_distances`,
/// nugget: added to the diagonal for numerical stability
fn reduced_likelihood<F: Float>(
    fx: &Array2<F>,
    rxx: &Array2<F>,
    x_distances: &DiffMatrix<F>,
    ytrain: &NormalizedData<F>,
    nugget: F,
) -> Result<(F, GpInnerParams<F>)> {
    let n = x_distances.n_obs;
    let mut r_mx: Array2<F> = Array2::eye(n) * (F::one() + nugget);
    for (k, &(i, j)) in x_distances.d_indices.iter().enumerate() {
        r_mx[[i, j]] = rxx[[k, 0]];
        r_mx[[j, i]] = rxx[[k, 0]];
    }
    let r_chol = r_mx.cholesky()?;
    // generalized least squares
    let ft = r_chol.solve_triangular(fx, UPLO::Lower)?;
    let (ft_qr_q, ft_qr_r) = ft.qr()?.into_decomp();

    let (_, sv_qr_r, _) = ft_qr_r.svd(false, false)?;
    let sv_max = sv_qr_r.fold(F::zero(), |m, &v| if v > m { v } else { m });
    let sv_min = sv_qr_r.fold(F::infinity(), |m, &v| if v < m { v } else { m });
    if !(sv_min / sv_max >= F::cast(1e-10)) {
        return Err(GpError::LikelihoodComputationError(
            "ft is too ill conditioned, poor combination of regression model and observations"
                .to_string(),
        ));
    }

    let yt = r_chol.solve_triangular(&ytrain.data, UPLO::Lower)?;
    let beta = ft_qr_r.solve_triangular_into(ft_qr_q.t().dot(&yt), UPLO::Upper)?;
    let rho = yt - ft.dot(&beta);
    let rho_sqr = rho.mapv(|v| v * v).sum();
    let gamma = r_chol.t().solve_triangular_into(rho, UPLO::Upper)?;

    // det(R) is the squared product of the Cholesky factor diagonal
    let n_obs = F::cast(n);
    let logdet = r_chol.diag().mapv(|v| v.log10()).sum() * F::cast(2.) / n_obs;
    let sigma2 = rho_sqr / n_obs;
    let likelihood = -n_obs * (sigma2.log10() + logdet);

    Ok((
        likelihood,
        GpInnerParams {
            sigma2: sigma2 * ytrain.std[0] * ytrain.std[0],
            beta,
            gamma,
            r_chol,
            ft,
            ft_qr_r,
        },
    ))
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_abs_diff_eq;
    use egolab_doe::{Lhs, SamplingMethod};
    use linfa::prelude::Dataset;
    use linfa::ParamGuard;
    use ndarray::{arr1, arr2, array, Array};
    use ndarray_rand::rand::SeedableRng;
    use paste::paste;
    use rand_xoshiro::Xoshiro256Plus;

    fn xsinx(x: &Array2<f64>) -> Array1<f64> {
        ((x - 3.5) * ((x - 3.5) / std::f64::consts::PI).mapv(|v| v.sin())).remove_axis(Axis(1))
    }

    #[test]
    fn test_constant_function() {
        let xlimits = array![[0., 1.], [0., 1.], [0., 1.]];
        let nt = 5;
        let xt = Lhs::new(&xlimits)
            .with_rng(Xoshiro256Plus::seed_from_u64(42))
            .sample(nt);
        let yt = Array::from_vec(vec![3.1; nt]);
        let gp = GaussianProcess::<f64, ConstantMean, SquaredExponentialCorr>::params(
            ConstantMean::default(),
            SquaredExponentialCorr::default(),
        )
        .theta_init(array![0.1])
        .fit(&Dataset::new(xt, yt))
        .expect("GP fit error");
        let xtest = Lhs::new(&xlimits)
            .with_rng(Xoshiro256Plus::seed_from_u64(43))
            .sample(nt);
        let ytest = gp.predict(&xtest).expect("prediction error");
        assert_abs_diff_eq!(Array::from_elem((nt,), 3.1), ytest, epsilon = 1e-6);
    }

    macro_rules! test_gp {
        ($regr:ident, $corr:ident) => {
            paste! {

                #[test]
                fn [<test_gp_ $regr:snake _ $corr:snake >]() {
                    let xt = array![[0.0], [1.0], [2.0], [3.0], [4.0]];
                    let yt = array![0.0, 1.0, 1.5, 0.9, 1.0];
                    let gp = GaussianProcess::<f64, [<$regr Mean>], [<$corr Corr>] >::params(
                        [<$regr Mean>]::default(),
                        [<$corr Corr>]::default(),
                    )
                    .theta_init(array![0.1])
                    .fit(&Dataset::new(xt, yt))
                    .expect("GP fit error");
                    let yvals = gp
                        .predict(&arr2(&[[1.0], [3.5]]))
                        .expect("prediction error");
                    let expected_y = arr1(&[1.0, 0.9]);
                    assert_abs_diff_eq!(expected_y, yvals, epsilon = 0.5);

                    let yvars = gp
                        .predict_var(&arr2(&[[1.0], [3.5]]))
                        .expect("prediction error");
                    let expected_vars = arr1(&[0., 0.1]);
                    assert_abs_diff_eq!(expected_vars, yvars, epsilon = 0.5);
                    assert!(yvars.iter().all(|v| *v >= 0.));
                }
            }
        };
    }

    test_gp!(Constant, SquaredExponential);
    test_gp!(Constant, Matern52);
    test_gp!(Linear, SquaredExponential);
    test_gp!(Linear, Matern52);

    #[test]
    fn test_interpolates_training_points() {
        let xt = array![[0.0], [5.0], [10.0], [15.0], [18.0], [20.0], [25.0]];
        let yt = xsinx(&xt);
        let gp = Kriging::params()
            .fit(&Dataset::new(xt.to_owned(), yt.to_owned()))
            .expect("GP fit error");
        let (ypred, yvar) = gp.predict_valvar(&xt).expect("prediction error");
        assert_abs_diff_eq!(ypred, yt, epsilon = 1e-3);
        assert!(yvar.iter().all(|v| *v < 1e-3));

        // away from data the model is uncertain
        let (_, var_between) = gp.predict_valvar(&array![[12.5]]).unwrap();
        assert!(var_between[0] > yvar.fold(0., |m: f64, v| m.max(*v)));
    }

    #[test]
    fn test_predict_valvar_consistency() {
        let xt = array![[0.1, 0.2], [0.8, 0.3], [0.5, 0.9], [0.3, 0.6], [0.9, 0.9]];
        let yt = array![1.0, 2.0, 0.5, 1.2, 3.0];
        let gp = GaussianProcess::<f64, ConstantMean, Matern52Corr>::params(
            ConstantMean(),
            Matern52Corr(),
        )
        .fit(&Dataset::new(xt, yt))
        .expect("GP fit error");
        let xtest = array![[0.4, 0.4], [0.0, 1.0]];
        let (mean, var) = gp.predict_valvar(&xtest).unwrap();
        assert_abs_diff_eq!(mean, gp.predict(&xtest).unwrap(), epsilon = 1e-12);
        assert_abs_diff_eq!(var, gp.predict_var(&xtest).unwrap(), epsilon = 1e-12);
        assert_eq!(gp.dims(), (2, 1));
        assert_eq!(gp.theta().len(), 2);
    }

    #[test]
    fn test_single_point() {
        let gp = Kriging::params()
            .fit(&Dataset::new(array![[0.5, 0.5]], array![12.5]))
            .expect("GP fit error");
        let (mean, var) = gp.predict_valvar(&array![[0.1, 0.9], [0.5, 0.5]]).unwrap();
        assert_abs_diff_eq!(mean, array![12.5, 12.5], epsilon = 1e-9);
        assert!(var.iter().all(|v| *v >= 0.));
    }

    #[test]
    fn test_duplicated_points() {
        let xt = array![[0.0], [1.0], [1.0], [2.0], [3.0]];
        let yt = array![0.0, 1.0, 1.1, 0.5, 0.2];
        let gp = GaussianProcess::<f64, ConstantMean, Matern52Corr>::params(
            ConstantMean(),
            Matern52Corr(),
        )
        .nugget(1e-6)
        .fit(&Dataset::new(xt, yt))
        .expect("GP fit error");
        let ypred = gp.predict(&array![[1.0]]).unwrap();
        assert_abs_diff_eq!(ypred[0], 1.05, epsilon = 0.2);
    }

    #[test]
    fn test_no_training_data() {
        let res = Kriging::params().fit(&Dataset::new(
            Array2::<f64>::zeros((0, 2)),
            Array1::<f64>::zeros(0),
        ));
        assert!(matches!(res, Err(GpError::InsufficientData(_))));
    }

    #[test]
    fn test_fixed_theta() {
        let xt = array![[0.0], [1.0], [2.0], [3.0], [4.0]];
        let yt = array![0.0, 1.0, 1.5, 0.9, 1.0];
        let gp = Kriging::params()
            .theta_tuning(ThetaTuning::Fixed(array![0.7]))
            .fit(&Dataset::new(xt, yt))
            .expect("GP fit error");
        assert_abs_diff_eq!(*gp.theta(), array![0.7]);
    }

    #[test]
    fn test_invalid_params() {
        assert!(Kriging::<f64>::params().nugget(-1.).check().is_err());
        assert!(Kriging::<f64>::params()
            .theta_bounds((1., 0.1))
            .check()
            .is_err());
        assert!(Kriging::<f64>::params().check().is_ok());
    }
}
