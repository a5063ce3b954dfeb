//! Optimization session implementing an ask-and-tell interface: the session
//! asks for the next experiment to run and is told the measured outcome.
//!
//! The first proposals come from a space-filling design, once enough
//! observations are told a surrogate model is fitted on the whole history
//! at each proposal and an acquisition function is maximized over the
//! search space.
//!
//! ```no_run
//! use egolab_ego::{Parameter, SessionBuilder};
//!
//! let session = SessionBuilder::minimize()
//!     .configure(|conf| conf.seed(42))
//!     .within(vec![
//!         Parameter::new("Temperature", 20., 100.),
//!         Parameter::new("Time", 1., 60.),
//!     ])
//!     .expect("session created");
//!
//! for _ in 0..10 {
//!     let proposal = session.ask().expect("proposal");
//!     let impurity = (proposal.x[0] - 65.).powi(2) / 100. + (proposal.x[1] - 25.).abs();
//!     session.tell(&proposal.x, impurity).expect("observation recorded");
//! }
//! println!("Best experiment so far {:?}", session.best_observed());
//! ```
use crate::criteria::{AcquisitionSpec, Hedge};
use crate::errors::{EgoError, Result};
use crate::optimizers::{Candidate, PoolOptimizer};
use crate::solver::SessionConfig;
use crate::space::{Parameter, SearchSpace};
use crate::types::{Direction, Observation, Proposal, SessionState};

use egolab_doe::{Lhs, LhsKind, SamplingMethod};
use env_logger::{Builder, Env};
use log::{debug, info};
use ndarray::{Array1, Array2, ArrayBase, Data, Ix1, Zip};
use ndarray_rand::rand::{Rng, SeedableRng};
use rand_xoshiro::Xoshiro256Plus;
use std::sync::{Mutex, MutexGuard};
use std::time::Instant;

/// Lower bound of the number of observations required before modeling
pub const MIN_INITIAL_POINTS: usize = 5;
/// Upper bound of the number of observations required before modeling
pub const MAX_INITIAL_POINTS: usize = 10;

/// Optimization session builder
pub struct SessionBuilder {
    direction: Direction,
    config: SessionConfig,
    initial: Vec<Observation>,
}

impl SessionBuilder {
    /// Session looking for the lowest outcome
    pub fn minimize() -> Self {
        Self::optimize(Direction::Minimize)
    }

    /// Session looking for the highest outcome
    pub fn maximize() -> Self {
        Self::optimize(Direction::Maximize)
    }

    /// Session optimizing in the given direction
    pub fn optimize(direction: Direction) -> Self {
        SessionBuilder {
            direction,
            config: SessionConfig::default(),
            initial: vec![],
        }
    }

    /// Configure the session with a closure
    /// taking and returning a SessionConfig structure.
    pub fn configure<F: FnOnce(SessionConfig) -> SessionConfig>(mut self, init: F) -> Self {
        self.config = init(self.config);
        self
    }

    /// Experiments already run, outcomes given in the caller convention
    pub fn initial_observations(mut self, observations: Vec<Observation>) -> Self {
        self.initial = observations;
        self
    }

    /// Build the session over the search space made of `parameters`.
    ///
    /// The search space is validated first, then the configuration and
    /// finally the initial observations.
    pub fn within(self, parameters: Vec<Parameter>) -> Result<OptimizationSession> {
        let env = Env::new().filter_or("EGOLAB_LOG", "warn");
        let mut builder = Builder::from_env(env);
        let builder = builder.target(env_logger::Target::Stdout);
        builder.try_init().ok();

        let space = SearchSpace::new(parameters)?;
        let config = self.config.check()?;
        let history = self
            .initial
            .iter()
            .map(|obs| accept(&space, self.direction, &obs.x, obs.y))
            .collect::<Result<Vec<_>>>()?;
        Ok(OptimizationSession::new(
            space,
            self.direction,
            config,
            history,
        ))
    }
}

/// Proposals of every Hedge arm at the last modeling step
#[derive(Clone, Debug)]
struct Pending {
    /// One row per arm, unit hypercube
    x: Array2<f64>,
    /// History length when proposed
    n_obs: usize,
}

/// Mutable part of the session
struct SessionInner {
    state: SessionState,
    /// Told observations, outcomes in the internal minimization convention
    history: Vec<Observation>,
    /// Number of observations given at construction
    n_prior: usize,
    /// Initial design in the unit hypercube
    doe: Array2<f64>,
    rng: Xoshiro256Plus,
    hedge: Option<Hedge>,
    pending: Option<Pending>,
}

/// Bayesian optimization session with an ask-and-tell interface.
///
/// Calls are serialized on an internal lock so the session can be shared
/// between threads.
pub struct OptimizationSession {
    space: SearchSpace,
    direction: Direction,
    config: SessionConfig,
    n_initial_points: usize,
    inner: Mutex<SessionInner>,
}

/// Validated copy of an observation: `x` clamped within bounds and
/// `y` in the internal minimization convention
fn accept(
    space: &SearchSpace,
    direction: Direction,
    x: &ArrayBase<impl Data<Elem = f64>, Ix1>,
    y: f64,
) -> Result<Observation> {
    let x = space.check(x)?;
    if !y.is_finite() {
        return Err(EgoError::InvalidValue(format!(
            "outcome should be finite, got {y}"
        )));
    }
    Ok(Observation::new(x, direction.internal(y)))
}

impl OptimizationSession {
    fn new(
        space: SearchSpace,
        direction: Direction,
        config: SessionConfig,
        history: Vec<Observation>,
    ) -> Self {
        let n_prior = history.len();
        let n_initial_points = n_prior.clamp(MIN_INITIAL_POINTS, MAX_INITIAL_POINTS);
        let mut rng = match config.seed {
            Some(seed) => Xoshiro256Plus::seed_from_u64(seed),
            None => Xoshiro256Plus::from_entropy(),
        };

        let nx = space.dim();
        let n_doe = n_initial_points.saturating_sub(n_prior);
        let doe = if n_doe > 0 {
            let unit = Array2::from_shape_fn((nx, 2), |(_, j)| j as f64);
            Lhs::new_with_rng(&unit, Xoshiro256Plus::seed_from_u64(rng.gen()))
                .kind(LhsKind::Maximin)
                .sample(n_doe)
        } else {
            Array2::zeros((0, nx))
        };

        let state = if n_prior >= n_initial_points {
            SessionState::Modeling
        } else {
            SessionState::WarmingUp
        };
        let hedge = match config.acquisition {
            AcquisitionSpec::Hedge { eta, .. } => {
                Some(Hedge::new(eta, config.acquisition.arms().len()))
            }
            _ => None,
        };
        info!(
            "Session started over {} parameters with {} prior observations, {} required before modeling",
            nx, n_prior, n_initial_points
        );

        OptimizationSession {
            space,
            direction,
            config,
            n_initial_points,
            inner: Mutex::new(SessionInner {
                state,
                history,
                n_prior,
                doe,
                rng,
                hedge,
                pending: None,
            }),
        }
    }

    fn inner(&self) -> MutexGuard<'_, SessionInner> {
        match self.inner.lock() {
            Ok(guard) => guard,
            Err(poisoned) => poisoned.into_inner(),
        }
    }

    /// Next experiment to run.
    ///
    /// While warming up, asking again without telling returns the same point.
    /// A failed ask leaves the session unchanged.
    pub fn ask(&self) -> Result<Proposal> {
        let mut inner = self.inner();
        match inner.state {
            SessionState::Closed => Err(EgoError::SessionClosed),
            SessionState::WarmingUp => self.next_doe_point(&inner),
            SessionState::Modeling => self.propose(&mut inner),
        }
    }

    fn next_doe_point(&self, inner: &SessionInner) -> Result<Proposal> {
        let index = inner.history.len() - inner.n_prior;
        if index >= inner.doe.nrows() {
            return Err(EgoError::InvalidValue(format!(
                "initial design exhausted after {} points",
                inner.doe.nrows()
            )));
        }
        let x = self.space.denormalize(&inner.doe.row(index));
        info!(
            "Initial design point {}/{}: {}",
            index + 1,
            inner.doe.nrows(),
            x
        );
        Ok(Proposal {
            x,
            predicted_mean: None,
            predicted_uncertainty: None,
        })
    }

    /// History as unit hypercube inputs and internal outcomes
    fn training_data(&self, history: &[Observation]) -> (Array2<f64>, Array1<f64>) {
        let mut x = Array2::zeros((history.len(), self.space.dim()));
        Zip::from(x.rows_mut())
            .and(history)
            .for_each(|mut row, obs| row.assign(&self.space.normalize(&obs.x)));
        let y = history.iter().map(|obs| obs.y).collect::<Array1<_>>();
        (x, y)
    }

    fn propose(&self, inner: &mut SessionInner) -> Result<Proposal> {
        let (x_data, y_data) = self.training_data(&inner.history);
        let fmin = y_data.fold(f64::INFINITY, |m, &y| m.min(y));
        // state is committed only once the proposal is successfully computed
        let mut rng = inner.rng.clone();
        let mut hedge = inner.hedge.clone();

        let now = Instant::now();
        let model = self
            .config
            .surrogate
            .fit(&x_data.view(), &y_data.view(), rng.gen())?;
        debug!(
            "{} fitted on {} observations in {} ms",
            model,
            y_data.len(),
            now.elapsed().as_millis()
        );

        if let (Some(hedge), Some(pending)) = (hedge.as_mut(), inner.pending.as_ref()) {
            if inner.history.len() > pending.n_obs {
                let predictions = model.predict(&pending.x.view())?;
                hedge.update(&predictions);
                debug!("Hedge gains {}", hedge.gains());
            }
        }

        let arms = self.config.acquisition.arms();
        let candidates = arms
            .iter()
            .map(|criterion| {
                PoolOptimizer::new_with_rng(
                    self.space.dim(),
                    model.as_ref(),
                    criterion.as_ref(),
                    fmin,
                    Xoshiro256Plus::seed_from_u64(rng.gen()),
                )
                .configure(self.config.optimizer)
                .observed(&x_data)
                .maximize()
            })
            .collect::<Result<Vec<Candidate>>>()?;

        let chosen = match hedge.as_ref() {
            Some(hedge) => {
                debug!("Hedge probabilities {}", hedge.probabilities());
                let chosen = hedge.choose(&mut rng);
                debug!("Hedge chooses {}", arms[chosen].name());
                chosen
            }
            None => 0,
        };
        let candidate = candidates.get(chosen).ok_or_else(|| {
            EgoError::InvalidValue(format!("no candidate proposed by arm {chosen}"))
        })?;
        let x = self.space.check(&self.space.denormalize(&candidate.x))?;

        if hedge.is_some() {
            let pending = Array2::from_shape_fn((candidates.len(), self.space.dim()), |(i, j)| {
                candidates[i].x[j]
            });
            inner.pending = Some(Pending {
                x: pending,
                n_obs: inner.history.len(),
            });
        }
        inner.hedge = hedge;
        inner.rng = rng;

        let proposal = Proposal {
            x,
            predicted_mean: Some(self.direction.external(candidate.mean)),
            predicted_uncertainty: Some(candidate.variance.sqrt()),
        };
        info!(
            "Proposal {} with predicted outcome {:?} +/- {:?}",
            proposal.x, proposal.predicted_mean, proposal.predicted_uncertainty
        );
        Ok(proposal)
    }

    fn update_state(&self, inner: &mut SessionInner) {
        if inner.state == SessionState::WarmingUp && inner.history.len() >= self.n_initial_points
        {
            inner.state = SessionState::Modeling;
            info!(
                "Initial design completed with {} observations, modeling starts",
                inner.history.len()
            );
        }
    }

    /// Records the outcome `y` (caller convention) of the experiment `x`.
    ///
    /// Fails without modifying the history when `x` is out of bounds or
    /// `y` is not finite.
    pub fn tell(&self, x: &ArrayBase<impl Data<Elem = f64>, Ix1>, y: f64) -> Result<()> {
        let mut inner = self.inner();
        if inner.state == SessionState::Closed {
            return Err(EgoError::SessionClosed);
        }
        let obs = accept(&self.space, self.direction, x, y)?;
        debug!("Told {} -> {}", obs.x, y);
        inner.history.push(obs);
        self.update_state(&mut inner);
        Ok(())
    }

    /// Records several observations: either all are valid and recorded
    /// or none is.
    pub fn tell_many(&self, observations: &[Observation]) -> Result<()> {
        let mut inner = self.inner();
        if inner.state == SessionState::Closed {
            return Err(EgoError::SessionClosed);
        }
        let accepted = observations
            .iter()
            .map(|obs| accept(&self.space, self.direction, &obs.x, obs.y))
            .collect::<Result<Vec<_>>>()?;
        debug!("Told {} observations", accepted.len());
        inner.history.extend(accepted);
        self.update_state(&mut inner);
        Ok(())
    }

    /// Observation with the best outcome, the earliest one in case of ties
    pub fn best_observed(&self) -> Result<Observation> {
        let inner = self.inner();
        let best = inner
            .history
            .iter()
            .fold(None, |best: Option<&Observation>, obs| match best {
                Some(b) if b.y <= obs.y => Some(b),
                _ => Some(obs),
            })
            .ok_or(EgoError::NoObservations)?;
        Ok(Observation::new(
            best.x.clone(),
            self.direction.external(best.y),
        ))
    }

    /// Stops the session, closing twice is allowed
    pub fn close(&self) {
        let mut inner = self.inner();
        if inner.state != SessionState::Closed {
            info!(
                "Session closed after {} observations",
                inner.history.len()
            );
            inner.state = SessionState::Closed;
        }
    }

    /// Current lifecycle state
    pub fn state(&self) -> SessionState {
        self.inner().state
    }

    /// Number of observations required before modeling
    pub fn n_initial_points(&self) -> usize {
        self.n_initial_points
    }

    /// Number of recorded observations
    pub fn n_observations(&self) -> usize {
        self.inner().history.len()
    }

    /// Recorded observations in telling order, outcomes in the caller convention
    pub fn history(&self) -> Vec<Observation> {
        self.inner()
            .history
            .iter()
            .map(|obs| Observation::new(obs.x.clone(), self.direction.external(obs.y)))
            .collect()
    }

    /// Cumulated gains of the Hedge arms, None for a single acquisition function
    pub fn hedge_gains(&self) -> Option<Array1<f64>> {
        self.inner().hedge.as_ref().map(|h| h.gains().to_owned())
    }

    /// Search space
    pub fn search_space(&self) -> &SearchSpace {
        &self.space
    }

    /// Optimization direction
    pub fn direction(&self) -> Direction {
        self.direction
    }

    /// Session configuration
    pub fn config(&self) -> &SessionConfig {
        &self.config
    }
}
