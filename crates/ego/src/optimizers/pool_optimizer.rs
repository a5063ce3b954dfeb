use crate::criteria::AcquisitionCriterion;
use crate::errors::{EgoError, Result};
use crate::surrogate::Surrogate;
use cobyla::{Func, RhoBeg, StopTols};
use egolab_doe::{cdist, Random, SamplingMethod};
use log::{debug, warn};
use ndarray::{arr1, Array1, Array2, ArrayBase, ArrayView2, Axis, Data, Ix2, Zip};
use ndarray_rand::rand::{Rng, SeedableRng};
use ndarray_stats::QuantileExt;
use rand_xoshiro::Xoshiro256Plus;
use rayon::prelude::*;
use serde::{Deserialize, Serialize};

/// Default number of pool points per input dimension
pub const DEFAULT_POOL_PER_DIM: usize = 1000;
/// Default minimum number of pool points
pub const DEFAULT_MIN_POOL: usize = 2000;
/// Default number of pool points refined locally
pub const DEFAULT_N_LOCAL: usize = 5;
/// Default max number of criterion evaluations of a local refinement
pub const DEFAULT_LOCAL_MAX_EVAL: usize = 200;

/// Relative tolerance under which two criterion values are considered equal
const SCORE_RTOL: f64 = 1e-12;

/// Acquisition optimizer settings
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct OptimizerConfig {
    /// Pool points per input dimension
    pub pool_per_dim: usize,
    /// Minimum number of pool points
    pub min_pool: usize,
    /// Number of best pool points refined by local optimization
    pub n_local: usize,
    /// Max number of criterion evaluations of one local optimization
    pub local_max_eval: usize,
}

impl Default for OptimizerConfig {
    fn default() -> Self {
        OptimizerConfig {
            pool_per_dim: DEFAULT_POOL_PER_DIM,
            min_pool: DEFAULT_MIN_POOL,
            n_local: DEFAULT_N_LOCAL,
            local_max_eval: DEFAULT_LOCAL_MAX_EVAL,
        }
    }
}

impl OptimizerConfig {
    /// Sets the number of pool points per input dimension
    pub fn pool_per_dim(mut self, pool_per_dim: usize) -> Self {
        self.pool_per_dim = pool_per_dim;
        self
    }

    /// Sets the minimum number of pool points
    pub fn min_pool(mut self, min_pool: usize) -> Self {
        self.min_pool = min_pool;
        self
    }

    /// Sets the number of locally refined points, 0 disables refinement
    pub fn n_local(mut self, n_local: usize) -> Self {
        self.n_local = n_local;
        self
    }

    /// Sets the max number of evaluations of one local optimization
    pub fn local_max_eval(mut self, local_max_eval: usize) -> Self {
        self.local_max_eval = local_max_eval;
        self
    }

    /// Number of pool points for an input of dimension `nx`
    pub fn pool_size(&self, nx: usize) -> usize {
        (self.pool_per_dim * nx).max(self.min_pool)
    }
}

/// Best point found by the acquisition optimizer
#[derive(Clone, Debug, PartialEq)]
pub struct Candidate {
    /// Location in the unit hypercube
    pub x: Array1<f64>,
    /// Criterion value
    pub score: f64,
    /// Surrogate predicted mean
    pub mean: f64,
    /// Surrogate predicted variance
    pub variance: f64,
}

/// Maximizes an acquisition criterion over the unit hypercube: a uniform
/// random pool is scored in one batch, then the best pool points are refined
/// with COBYLA.
pub struct PoolOptimizer<'a, R: Rng + Clone + Sync + Send> {
    nx: usize,
    surrogate: &'a dyn Surrogate,
    criterion: &'a dyn AcquisitionCriterion,
    fmin: f64,
    x_data: Array2<f64>,
    config: OptimizerConfig,
    rng: R,
}

impl<'a> PoolOptimizer<'a, Xoshiro256Plus> {
    /// Optimizer of `criterion` computed from the `surrogate` of a function of `nx`
    /// inputs which current minimum is `fmin`
    pub fn new(
        nx: usize,
        surrogate: &'a dyn Surrogate,
        criterion: &'a dyn AcquisitionCriterion,
        fmin: f64,
    ) -> PoolOptimizer<'a, Xoshiro256Plus> {
        Self::new_with_rng(nx, surrogate, criterion, fmin, Xoshiro256Plus::from_entropy())
    }
}

impl<'a, R: Rng + Clone + Sync + Send> PoolOptimizer<'a, R> {
    /// Constructor with given random generator
    pub fn new_with_rng(
        nx: usize,
        surrogate: &'a dyn Surrogate,
        criterion: &'a dyn AcquisitionCriterion,
        fmin: f64,
        rng: R,
    ) -> PoolOptimizer<'a, R> {
        PoolOptimizer {
            nx,
            surrogate,
            criterion,
            fmin,
            x_data: Array2::zeros((0, nx)),
            config: OptimizerConfig::default(),
            rng,
        }
    }

    /// Sets the random generator used to draw the pool
    pub fn with_rng<R2: Rng + Clone + Sync + Send>(self, rng: R2) -> PoolOptimizer<'a, R2> {
        PoolOptimizer {
            nx: self.nx,
            surrogate: self.surrogate,
            criterion: self.criterion,
            fmin: self.fmin,
            x_data: self.x_data,
            config: self.config,
            rng,
        }
    }

    /// Sets the optimizer settings
    pub fn configure(mut self, config: OptimizerConfig) -> Self {
        self.config = config;
        self
    }

    /// Sets the already observed points (unit hypercube), used to break ties
    /// in favor of the candidate farthest from them
    pub fn observed(mut self, x_data: &ArrayBase<impl Data<Elem = f64>, Ix2>) -> Self {
        self.x_data = x_data.to_owned();
        self
    }

    fn scores(&self, mean: &Array1<f64>, var: &Array1<f64>) -> Array1<f64> {
        Zip::from(mean).and(var).par_map_collect(|m, v| {
            let score = self.criterion.value(*m, v.max(0.).sqrt(), self.fmin);
            if score.is_nan() {
                f64::NEG_INFINITY
            } else {
                score
            }
        })
    }

    /// Local maximization of the criterion starting from `x0`,
    /// None when COBYLA fails
    fn refine(&self, x0: &[f64]) -> Option<Array1<f64>> {
        let nx = self.nx;
        let obj = |x: &[f64], _u: &mut ()| -> f64 {
            let score = ArrayView2::from_shape((1, nx), x)
                .ok()
                .and_then(|pt| self.surrogate.predict_valvar(&pt).ok())
                .map(|(m, v)| self.criterion.value(m[0], v[0].max(0.).sqrt(), self.fmin));
            match score {
                Some(s) if !s.is_nan() => -s,
                _ => f64::INFINITY,
            }
        };
        let cons: Vec<&dyn Func<()>> = vec![];
        let bounds = vec![(0., 1.); nx];
        match cobyla::minimize(
            obj,
            x0,
            &bounds,
            &cons,
            (),
            self.config.local_max_eval,
            RhoBeg::All(0.1),
            Some(StopTols {
                ftol_rel: 1e-6,
                ..StopTols::default()
            }),
        ) {
            Ok((_, x_opt, _)) => Some(arr1(&x_opt).mapv(|v| v.clamp(0., 1.))),
            Err((status, _, _)) => {
                warn!("Local refinement of acquisition failed, status={status:?}");
                None
            }
        }
    }

    /// Returns the point of the unit hypercube maximizing the criterion
    pub fn maximize(&self) -> Result<Candidate> {
        let n_pool = self.config.pool_size(self.nx);
        let mut rng = self.rng.clone();
        let unit = Array2::from_shape_fn((self.nx, 2), |(_, j)| j as f64);
        let pool =
            Random::new_with_rng(&unit, Xoshiro256Plus::seed_from_u64(rng.gen())).sample(n_pool);

        let (mean, var) = self.surrogate.predict_valvar(&pool.view())?;
        let scores = self.scores(&mean, &var);
        debug!("Acquisition pool of {} points scored", n_pool);

        // refinement starts from the best pool points
        let mut order: Vec<usize> = (0..n_pool).collect();
        order.sort_by(|&a, &b| scores[b].total_cmp(&scores[a]));
        order.truncate(self.config.n_local);

        let mut candidates = pool;
        let mut cand_mean = mean;
        let mut cand_var = var;
        let mut cand_scores = scores;

        if !order.is_empty() {
            let starts: Vec<Vec<f64>> = order
                .iter()
                .map(|&i| candidates.row(i).to_vec())
                .collect();
            let refined: Vec<Array1<f64>> = starts
                .par_iter()
                .filter_map(|x0| self.refine(x0))
                .collect();
            if !refined.is_empty() {
                let mut xr = Array2::zeros((refined.len(), self.nx));
                Zip::from(xr.rows_mut())
                    .and(&refined)
                    .for_each(|mut row, x| row.assign(x));
                let (m, v) = self.surrogate.predict_valvar(&xr.view())?;
                let s = self.scores(&m, &v);
                candidates = ndarray::concatenate![Axis(0), candidates, xr];
                cand_mean = ndarray::concatenate![Axis(0), cand_mean, m];
                cand_var = ndarray::concatenate![Axis(0), cand_var, v];
                cand_scores = ndarray::concatenate![Axis(0), cand_scores, s];
            }
        }

        let best = *cand_scores
            .max()
            .map_err(|err| EgoError::InvalidValue(format!("no acquisition maximum: {err}")))?;
        let tol = SCORE_RTOL * best.abs().max(1.);
        let ties: Vec<usize> = (0..cand_scores.len())
            .filter(|&i| best - cand_scores[i] <= tol)
            .collect();
        let chosen = if ties.len() > 1 && self.x_data.nrows() > 0 {
            let tied = candidates.select(Axis(0), &ties);
            let nearest = cdist(&tied, &self.x_data)
                .map_axis(Axis(1), |d| d.fold(f64::INFINITY, |m, &v| m.min(v)));
            let farthest = nearest.argmax().unwrap_or(0);
            debug!("{} tied acquisition maxima, farthest from data chosen", ties.len());
            ties[farthest]
        } else {
            ties[0]
        };

        Ok(Candidate {
            x: candidates.row(chosen).to_owned(),
            score: cand_scores[chosen],
            mean: cand_mean[chosen],
            variance: cand_var[chosen].max(0.),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::criteria::{ExpectedImprovement, LowerConfidenceBound};
    use approx::assert_abs_diff_eq;
    use ndarray::array;
    use std::fmt;

    /// Quadratic bowl centered at `center` with a constant uncertainty
    struct Bowl {
        center: Array1<f64>,
        variance: f64,
    }

    impl fmt::Display for Bowl {
        fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
            write!(f, "Bowl")
        }
    }

    impl Surrogate for Bowl {
        fn predict(&self, x: &ArrayView2<f64>) -> Result<Array1<f64>> {
            Ok(x.map_axis(Axis(1), |row| {
                row.iter()
                    .zip(self.center.iter())
                    .map(|(v, c)| (v - c) * (v - c))
                    .sum()
            }))
        }

        fn predict_valvar(&self, x: &ArrayView2<f64>) -> Result<(Array1<f64>, Array1<f64>)> {
            let mean = self.predict(x)?;
            let var = Array1::from_elem(mean.len(), self.variance);
            Ok((mean, var))
        }
    }

    /// Constant prediction, every point is equally good
    struct Flat;

    impl fmt::Display for Flat {
        fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
            write!(f, "Flat")
        }
    }

    impl Surrogate for Flat {
        fn predict(&self, x: &ArrayView2<f64>) -> Result<Array1<f64>> {
            Ok(Array1::zeros(x.nrows()))
        }

        fn predict_valvar(&self, x: &ArrayView2<f64>) -> Result<(Array1<f64>, Array1<f64>)> {
            Ok((Array1::zeros(x.nrows()), Array1::ones(x.nrows())))
        }
    }

    #[test]
    fn test_maximize_finds_bowl_minimum() {
        let bowl = Bowl {
            center: array![0.3, 0.7],
            variance: 0.01,
        };
        let ei = ExpectedImprovement::new(0.);
        let candidate = PoolOptimizer::new(2, &bowl, &ei, 0.1)
            .with_rng(Xoshiro256Plus::seed_from_u64(42))
            .maximize()
            .expect("acquisition maximized");
        assert_abs_diff_eq!(candidate.x, array![0.3, 0.7], epsilon = 2e-2);
        assert_abs_diff_eq!(candidate.variance, 0.01);
        assert!(candidate.score > 0.);
    }

    #[test]
    fn test_maximize_pool_only() {
        let bowl = Bowl {
            center: array![0.5],
            variance: 1.,
        };
        let lcb = LowerConfidenceBound::new(1.96);
        let candidate = PoolOptimizer::new(1, &bowl, &lcb, 0.)
            .with_rng(Xoshiro256Plus::seed_from_u64(0))
            .configure(OptimizerConfig::default().n_local(0))
            .maximize()
            .expect("acquisition maximized");
        assert_abs_diff_eq!(candidate.x[0], 0.5, epsilon = 1e-2);
    }

    #[test]
    fn test_maximize_is_reproducible() {
        let bowl = Bowl {
            center: array![0.2, 0.4, 0.9],
            variance: 0.1,
        };
        let ei = ExpectedImprovement::new(0.01);
        let optimize = |seed| {
            PoolOptimizer::new(3, &bowl, &ei, 0.5)
                .with_rng(Xoshiro256Plus::seed_from_u64(seed))
                .configure(OptimizerConfig::default().min_pool(500).pool_per_dim(100))
                .maximize()
                .expect("acquisition maximized")
        };
        assert_eq!(optimize(7), optimize(7));
    }

    #[test]
    fn test_ties_over_whole_pool() {
        let ei = ExpectedImprovement::new(0.);
        let x_data = array![[0.0, 0.0]];
        for seed in 0..5 {
            let candidate = PoolOptimizer::new(2, &Flat, &ei, 0.)
                .with_rng(Xoshiro256Plus::seed_from_u64(seed))
                .observed(&x_data)
                .maximize()
                .expect("acquisition maximized");
            // among 2000 uniform points some lie in the corner beyond 1.3 from the origin
            let dist = candidate.x.mapv(|v| v * v).sum().sqrt();
            assert!(dist > 1.3, "seed {seed}: distance {dist}");
        }
    }

    #[test]
    fn test_ties_broken_by_distance_to_data() {
        let ei = ExpectedImprovement::new(0.);
        let x_data = array![[0.0, 0.0], [0.1, 0.0], [0.0, 0.1]];
        let candidate = PoolOptimizer::new(2, &Flat, &ei, 0.)
            .with_rng(Xoshiro256Plus::seed_from_u64(3))
            .configure(OptimizerConfig::default().min_pool(200).pool_per_dim(10))
            .observed(&x_data)
            .maximize()
            .expect("acquisition maximized");
        let nearest = x_data
            .rows()
            .into_iter()
            .map(|row| (&row - &candidate.x).mapv(|v| v * v).sum().sqrt())
            .fold(f64::INFINITY, f64::min);
        assert!(nearest > 0.5);
    }
}
