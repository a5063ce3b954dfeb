use crate::parameters::{ForestKind, ForestValidParams};
use linfa::Float;
use ndarray::{Array1, ArrayBase, ArrayView1, ArrayView2, Data, Ix2};
use ndarray_rand::rand::{seq::SliceRandom, Rng};

#[derive(Debug, Clone)]
enum Node<F: Float> {
    Leaf(F),
    Split {
        feature: usize,
        threshold: F,
        left: usize,
        right: usize,
    },
}

/// A regression tree grown by variance reduction, leaves predict the mean of
/// their training outputs
#[derive(Debug, Clone)]
pub struct RegressionTree<F: Float> {
    /// Root is the first node
    nodes: Vec<Node<F>>,
}

struct Split<F> {
    feature: usize,
    threshold: F,
    sse: F,
}

struct Grower<'a, 'r, F: Float, R: Rng> {
    x: ArrayView2<'a, F>,
    y: ArrayView1<'a, F>,
    params: &'a ForestValidParams<F>,
    /// Minimum leaf size, bounded by half the training size
    min_leaf: usize,
    rng: &'r mut R,
    nodes: Vec<Node<F>>,
}

impl<F: Float> RegressionTree<F> {
    /// Grows a tree on the training rows listed in `samples` (repetitions allowed).
    ///
    /// The minimum leaf size is lowered to half the number of samples so that
    /// small training sets still get split.
    pub(crate) fn grow<'a, 'r, R: Rng>(
        x: ArrayView2<'a, F>,
        y: ArrayView1<'a, F>,
        mut samples: Vec<usize>,
        params: &'a ForestValidParams<F>,
        rng: &'r mut R,
    ) -> Self {
        let min_leaf = params.min_samples_leaf.min((samples.len() / 2).max(1));
        let mut grower = Grower {
            x,
            y,
            params,
            min_leaf,
            rng,
            nodes: Vec::new(),
        };
        grower.node(&mut samples, 0);
        RegressionTree {
            nodes: grower.nodes,
        }
    }

    /// Prediction at a single point
    pub fn predict_one(&self, x: &ArrayView1<F>) -> F {
        let mut idx = 0;
        loop {
            match &self.nodes[idx] {
                Node::Leaf(value) => return *value,
                Node::Split {
                    feature,
                    threshold,
                    left,
                    right,
                } => idx = if x[*feature] <= *threshold { *left } else { *right },
            }
        }
    }

    /// Predictions at n points given as a (n, nx) matrix
    pub fn predict(&self, x: &ArrayBase<impl Data<Elem = F>, Ix2>) -> Array1<F> {
        x.rows().into_iter().map(|row| self.predict_one(&row)).collect()
    }

    /// Number of leaves
    pub fn n_leaves(&self) -> usize {
        self.nodes
            .iter()
            .filter(|n| matches!(n, Node::Leaf(_)))
            .count()
    }
}

impl<'a, 'r, F: Float, R: Rng> Grower<'a, 'r, F, R> {
    fn node(&mut self, samples: &mut [usize], depth: usize) -> usize {
        let idx = self.nodes.len();
        let n = F::cast(samples.len());
        let sum = samples.iter().fold(F::zero(), |acc, &i| acc + self.y[i]);
        self.nodes.push(Node::Leaf(sum / n));

        if let Some(split) = self.best_split(samples, depth) {
            let feature = split.feature;
            let threshold = split.threshold;
            samples.sort_by_key(|&i| self.x[[i, feature]] > threshold);
            let mid = samples
                .iter()
                .take_while(|&&i| self.x[[i, feature]] <= threshold)
                .count();
            let (left_samples, right_samples) = samples.split_at_mut(mid);
            let left = self.node(left_samples, depth + 1);
            let right = self.node(right_samples, depth + 1);
            self.nodes[idx] = Node::Split {
                feature,
                threshold,
                left,
                right,
            };
        }
        idx
    }

    fn best_split(&mut self, samples: &[usize], depth: usize) -> Option<Split<F>> {
        let min_leaf = self.min_leaf;
        if samples.len() < 2 * min_leaf || self.params.max_depth.is_some_and(|d| depth >= d) {
            return None;
        }
        let (sum, sumsq) = samples.iter().fold((F::zero(), F::zero()), |(s, s2), &i| {
            (s + self.y[i], s2 + self.y[i] * self.y[i])
        });
        let parent_sse = sse(sum, sumsq, samples.len());
        if parent_sse <= F::zero() {
            return None;
        }

        let nx = self.x.ncols();
        let mut features: Vec<usize> = (0..nx).collect();
        features.shuffle(&mut *self.rng);
        features.truncate(self.params.max_features.unwrap_or(nx).min(nx));

        let mut best: Option<Split<F>> = None;
        for feature in features {
            let candidate = match self.params.kind {
                ForestKind::RandomForest => self.best_threshold(samples, feature),
                ForestKind::ExtraTrees => self.random_threshold(samples, feature),
            };
            if let Some(split) = candidate {
                if best.as_ref().map_or(true, |b| split.sse < b.sse) {
                    best = Some(split);
                }
            }
        }
        best.filter(|b| parent_sse - b.sse > self.params.min_impurity_decrease)
    }

    /// Exhaustive search over midpoints between consecutive distinct values
    fn best_threshold(&self, samples: &[usize], feature: usize) -> Option<Split<F>> {
        let min_leaf = self.min_leaf;
        let mut sorted: Vec<(F, F)> = samples
            .iter()
            .map(|&i| (self.x[[i, feature]], self.y[i]))
            .collect();
        sorted.sort_by(|a, b| a.0.partial_cmp(&b.0).unwrap_or(std::cmp::Ordering::Equal));

        let n = sorted.len();
        let (total, totalsq) = sorted
            .iter()
            .fold((F::zero(), F::zero()), |(s, s2), &(_, y)| (s + y, s2 + y * y));
        let (mut left, mut leftsq) = (F::zero(), F::zero());
        let mut best: Option<Split<F>> = None;
        for k in 1..n {
            let y = sorted[k - 1].1;
            left += y;
            leftsq += y * y;
            if k < min_leaf || n - k < min_leaf || sorted[k - 1].0 >= sorted[k].0 {
                continue;
            }
            let split_sse = sse(left, leftsq, k) + sse(total - left, totalsq - leftsq, n - k);
            if best.as_ref().map_or(true, |b| split_sse < b.sse) {
                best = Some(Split {
                    feature,
                    threshold: (sorted[k - 1].0 + sorted[k].0) / F::cast(2.),
                    sse: split_sse,
                });
            }
        }
        best
    }

    /// One threshold drawn uniformly between the node min and max values
    fn random_threshold(&mut self, samples: &[usize], feature: usize) -> Option<Split<F>> {
        let (lo, hi) = samples.iter().fold(
            (F::infinity(), F::neg_infinity()),
            |(lo, hi), &i| {
                let v = self.x[[i, feature]];
                (if v < lo { v } else { lo }, if v > hi { v } else { hi })
            },
        );
        if !(hi > lo) {
            return None;
        }
        let threshold = lo + F::cast(self.rng.gen::<f64>()) * (hi - lo);
        let mut stats = [(0usize, F::zero(), F::zero()); 2];
        for &i in samples {
            let side = usize::from(self.x[[i, feature]] > threshold);
            let y = self.y[i];
            stats[side].0 += 1;
            stats[side].1 += y;
            stats[side].2 += y * y;
        }
        let min_leaf = self.min_leaf;
        if stats[0].0 < min_leaf || stats[1].0 < min_leaf {
            return None;
        }
        Some(Split {
            feature,
            threshold,
            sse: sse(stats[0].1, stats[0].2, stats[0].0) + sse(stats[1].1, stats[1].2, stats[1].0),
        })
    }
}

/// Sum of squared deviations from the mean given sum, sum of squares and count
fn sse<F: Float>(sum: F, sumsq: F, n: usize) -> F {
    let v = sumsq - sum * sum / F::cast(n);
    if v < F::zero() {
        F::zero()
    } else {
        v
    }
}
