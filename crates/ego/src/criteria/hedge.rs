use ndarray::{Array1, ArrayBase, Data, Ix1};
use ndarray_rand::rand::Rng;

/// Bandit selection among several acquisition criteria (the arms).
///
/// Each arm proposes a point, one proposal is drawn with probability
/// `softmax(eta * gains)`. Once the surrogate is refitted with new data,
/// each arm gain is decreased by the predicted objective at the point it
/// proposed: arms pointing at lower predicted values gain more.
#[derive(Clone, Debug, PartialEq)]
pub struct Hedge {
    eta: f64,
    gains: Array1<f64>,
}

impl Hedge {
    /// Portfolio of `n_arms` arms with null gains
    pub fn new(eta: f64, n_arms: usize) -> Self {
        Hedge {
            eta,
            gains: Array1::zeros(n_arms),
        }
    }

    /// Cumulated gains of the arms
    pub fn gains(&self) -> &Array1<f64> {
        &self.gains
    }

    /// Probabilities of choosing each arm
    pub fn probabilities(&self) -> Array1<f64> {
        let max = self.gains.fold(f64::NEG_INFINITY, |m, &g| m.max(g));
        let weights = self.gains.mapv(|g| (self.eta * (g - max)).exp());
        let total = weights.sum();
        weights / total
    }

    /// Draws an arm index
    pub fn choose<R: Rng>(&self, rng: &mut R) -> usize {
        let probas = self.probabilities();
        let u: f64 = rng.gen();
        let mut cumul = 0.;
        for (i, p) in probas.iter().enumerate() {
            cumul += p;
            if u < cumul {
                return i;
            }
        }
        probas.len() - 1
    }

    /// Decreases each arm gain by the surrogate prediction at the point
    /// it proposed (internal minimization convention)
    pub fn update(&mut self, predictions: &ArrayBase<impl Data<Elem = f64>, Ix1>) {
        self.gains -= predictions;
    }
}
