use crate::utils::min_pdist;
use crate::SamplingMethod;
use linfa::Float;
use ndarray::{Array2, ArrayBase, Data, Ix2};
use ndarray_rand::rand::{seq::SliceRandom, Rng, SeedableRng};
use rand_xoshiro::Xoshiro256Plus;
use std::sync::{Arc, RwLock, RwLockWriteGuard};

/// Kinds of Latin Hypercube Design
#[derive(Clone, Debug, Default, Copy, PartialEq, Eq)]
pub enum LhsKind {
    /// sample is drawn uniformly within its stratum
    Classic,
    /// sample is the middle of its stratum
    Centered,
    /// best of several classic designs with respect to the smallest
    /// distance between two samples
    #[default]
    Maximin,
}

/// Number of classic designs compared by [LhsKind::Maximin]
pub const DEFAULT_MAXIMIN_ITERATIONS: usize = 5;

type RngRef<R> = Arc<RwLock<R>>;

/// Latin hypercube design: each component range is cut into `ns` strata of
/// equal width and every stratum holds exactly one of the `ns` samples.
#[derive(Clone, Debug)]
pub struct Lhs<F: Float, R: Rng> {
    /// Sampling space as a (nx, 2) matrix of [lower, upper] rows
    xlimits: Array2<F>,
    kind: LhsKind,
    /// Designs compared by the maximin selection
    iterations: usize,
    rng: RngRef<R>,
}

impl<F: Float> Lhs<F, Xoshiro256Plus> {
    /// LHS over `xlimits` seeded from system entropy
    ///
    /// ```
    /// use egolab_doe::Lhs;
    /// use ndarray::arr2;
    ///
    /// let doe = Lhs::new(&arr2(&[[20.0, 100.0], [1.0, 60.0]]));
    /// ```
    pub fn new(xlimits: &ArrayBase<impl Data<Elem = F>, Ix2>) -> Self {
        Self::new_with_rng(xlimits, Xoshiro256Plus::from_entropy())
    }
}

impl<F: Float, R: Rng> Lhs<F, R> {
    /// LHS over `xlimits` drawing from `rng`
    ///
    /// **Panics** if xlimits number of columns is different from 2.
    pub fn new_with_rng(xlimits: &ArrayBase<impl Data<Elem = F>, Ix2>, rng: R) -> Self {
        assert!(
            xlimits.ncols() == 2,
            "xlimits must have 2 columns (lower, upper)"
        );
        Lhs {
            xlimits: xlimits.to_owned(),
            kind: LhsKind::default(),
            iterations: DEFAULT_MAXIMIN_ITERATIONS,
            rng: Arc::new(RwLock::new(rng)),
        }
    }

    /// Sets the kind of LHS
    pub fn kind(mut self, kind: LhsKind) -> Self {
        self.kind = kind;
        self
    }

    /// Sets the number of designs compared by the maximin selection (at least 1)
    pub fn iterations(mut self, iterations: usize) -> Self {
        self.iterations = iterations.max(1);
        self
    }

    /// Replaces the random generator
    pub fn with_rng<R2: Rng>(self, rng: R2) -> Lhs<F, R2> {
        Lhs {
            xlimits: self.xlimits,
            kind: self.kind,
            iterations: self.iterations,
            rng: Arc::new(RwLock::new(rng)),
        }
    }

    fn rng(&self) -> RwLockWriteGuard<'_, R> {
        match self.rng.write() {
            Ok(guard) => guard,
            Err(poisoned) => poisoned.into_inner(),
        }
    }

    /// One stratum index permutation per component, `offset` gives the
    /// position of the sample within its stratum (None: drawn at random)
    fn stratified(&self, ns: usize, offset: Option<f64>) -> Array2<F> {
        let nx = self.xlimits.nrows();
        let mut rng = self.rng();
        let mut doe = Array2::zeros((ns, nx));
        let mut strata: Vec<usize> = (0..ns).collect();
        for j in 0..nx {
            strata.shuffle(&mut *rng);
            for (i, &k) in strata.iter().enumerate() {
                let u = offset.unwrap_or_else(|| rng.gen::<f64>());
                doe[[i, j]] = F::cast((k as f64 + u) / ns as f64);
            }
        }
        doe
    }

    fn maximin(&self, ns: usize) -> Array2<F> {
        let mut best = self.stratified(ns, None);
        let Some(mut best_dist) = min_pdist(&best) else {
            return best;
        };
        for _ in 1..self.iterations {
            let candidate = self.stratified(ns, None);
            if let Some(dist) = min_pdist(&candidate) {
                if dist > best_dist {
                    best_dist = dist;
                    best = candidate;
                }
            }
        }
        best
    }
}

impl<F: Float, R: Rng> SamplingMethod<F> for Lhs<F, R> {
    fn sampling_space(&self) -> &Array2<F> {
        &self.xlimits
    }

    fn normalized_sample(&self, ns: usize) -> Array2<F> {
        match self.kind {
            LhsKind::Classic => self.stratified(ns, None),
            LhsKind::Centered => self.stratified(ns, Some(0.5)),
            LhsKind::Maximin => self.maximin(ns),
        }
    }
}
