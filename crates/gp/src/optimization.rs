use egolab_doe::{Lhs, LhsKind, SamplingMethod};
use linfa::Float;
use ndarray::{s, Array1, Array2, Zip};
use ndarray_rand::rand::SeedableRng;
use rand_xoshiro::Xoshiro256Plus;

pub(crate) struct CobylaParams {
    pub rhobeg: f64,
    pub ftol_rel: f64,
    pub maxeval: usize,
}

impl Default for CobylaParams {
    fn default() -> Self {
        CobylaParams {
            rhobeg: 0.5,
            ftol_rel: 1e-4,
            maxeval: 200,
        }
    }
}

#[inline]
pub(crate) fn to_f64<F: Float>(v: F) -> f64 {
    num_traits::cast::<F, f64>(v).unwrap_or(f64::NAN)
}

/// Starting points of the hyperparameters optimization in log10 space:
/// the initial guess followed by `n_start` points of a maximin LHS over the bounds.
/// Returns the starting points and the bounds in log10 space.
pub(crate) fn prepare_multistart<F: Float>(
    n_start: usize,
    theta0: &Array1<F>,
    bounds: &[(F, F)],
) -> (Array2<F>, Vec<(F, F)>) {
    let log_bounds: Vec<(F, F)> = bounds
        .iter()
        .map(|(lo, up)| (lo.log10(), up.log10()))
        .collect();

    let mut starts = Array2::zeros((n_start + 1, theta0.len()));
    starts.row_mut(0).assign(&theta0.mapv(|v| v.log10()));
    if n_start > 0 {
        let mut xlimits = Array2::zeros((log_bounds.len(), 2));
        Zip::from(xlimits.rows_mut())
            .and(&log_bounds)
            .for_each(|mut row, &(lo, up)| {
                row[0] = lo;
                row[1] = up;
            });
        // fixed seed: starting points only need to be spread over the bounds
        let doe = Lhs::new(&xlimits)
            .kind(LhsKind::Maximin)
            .with_rng(Xoshiro256Plus::seed_from_u64(42))
            .sample(n_start);
        starts.slice_mut(s![1.., ..]).assign(&doe);
    }
    (starts, log_bounds)
}

/// Minimizes `objfn` with COBYLA from `param0` within `bounds`.
/// Returns the best value found (infinity on failure) and its location.
pub(crate) fn optimize_params<ObjF, F>(
    objfn: ObjF,
    param0: &Array1<F>,
    bounds: &[(F, F)],
    cobyla: CobylaParams,
) -> (f64, Array1<f64>)
where
    ObjF: Fn(&[f64], Option<&mut [f64]>, &mut ()) -> f64,
    F: Float,
{
    use cobyla::{minimize, Func, RhoBeg, StopTols};

    let cons: Vec<&dyn Func<()>> = vec![];
    let param0: Vec<f64> = param0.iter().map(|v| to_f64(*v)).collect();
    let bounds: Vec<(f64, f64)> = bounds
        .iter()
        .map(|(lo, up)| (to_f64(*lo), to_f64(*up)))
        .collect();

    match minimize(
        |x: &[f64], u: &mut ()| objfn(x, None, u),
        &param0,
        &bounds,
        &cons,
        (),
        cobyla.maxeval,
        RhoBeg::All(cobyla.rhobeg),
        Some(StopTols {
            ftol_rel: cobyla.ftol_rel,
            ..StopTols::default()
        }),
    ) {
        Ok((_, x_opt, fval)) => {
            let fval = if fval.is_nan() { f64::INFINITY } else { fval };
            (fval, Array1::from_vec(x_opt))
        }
        Err((status, x_opt, _)) => {
            log::warn!("Cobyla optimizer failed in GP hyperparameters tuning, status={status:?}");
            (f64::INFINITY, Array1::from_vec(x_opt))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_abs_diff_eq;
    use ndarray::array;

    #[test]
    fn test_prepare_multistart() {
        let (starts, bounds) = prepare_multistart(4, &array![0.1, 1.], &[(1e-2, 1e1), (1e-2, 1e1)]);
        assert_eq!(starts.dim(), (5, 2));
        assert_abs_diff_eq!(starts.row(0), array![-1., 0.], epsilon = 1e-12);
        for (lo, up) in bounds {
            assert_abs_diff_eq!(lo, -2., epsilon = 1e-12);
            assert_abs_diff_eq!(up, 1., epsilon = 1e-12);
        }
        for row in starts.rows() {
            assert!(row.iter().all(|v| *v >= -2. - 1e-12 && *v <= 1. + 1e-12));
        }
    }

    #[test]
    fn test_optimize_params_quadratic() {
        let objfn = |x: &[f64], _g: Option<&mut [f64]>, _u: &mut ()| -> f64 {
            (x[0] - 0.3).powi(2) + (x[1] + 0.5).powi(2)
        };
        let (fmin, xopt) = optimize_params(
            objfn,
            &array![0., 0.],
            &[(-1., 1.), (-1., 1.)],
            CobylaParams::default(),
        );
        assert!(fmin < 1e-3);
        assert_abs_diff_eq!(xopt, array![0.3, -0.5], epsilon = 5e-2);
    }
}
