//! Maximization of acquisition criteria over the unit hypercube
mod pool_optimizer;

pub use pool_optimizer::*;
