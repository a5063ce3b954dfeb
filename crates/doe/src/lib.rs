/*!
Design of Experiments (DoE) used to seed and explore a sequential optimization.

A DoE method generates a set of points within a design space `xlimits`, given as a
2D ndarray `(nx, 2)` whose ith row holds the lower and upper bound of the ith
component of a sample.

Example:
```
use egolab_doe::{Lhs, LhsKind, Random, SamplingMethod};
use ndarray::arr2;
use ndarray_rand::rand::SeedableRng;
use rand_xoshiro::Xoshiro256Plus;

// Temperature in [20., 100.] x Time in [1., 60.]
let xlimits = arr2(&[[20., 100.], [1., 60.]]);
// Five points of a space-filling Latin hypercube
let warmup = Lhs::new(&xlimits)
    .kind(LhsKind::Maximin)
    .with_rng(Xoshiro256Plus::seed_from_u64(42))
    .sample(5);
// or a reproducible uniform random pool
let pool = Random::new(&xlimits)
    .with_rng(Xoshiro256Plus::seed_from_u64(42))
    .sample(100);
```

Two sampling methods are available:
* [Latin Hypercube Sampling](Lhs),
* [Random Sampling](Random)

*/
#![warn(missing_docs)]
#![warn(rustdoc::broken_intra_doc_links)]
mod lhs;
mod random;
mod traits;
mod utils;

pub use lhs::*;
pub use random::*;
pub use traits::*;
pub use utils::{cdist, min_pdist, pdist};
