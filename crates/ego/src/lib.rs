//! This library implements a Bayesian optimization engine driven through an
//! ask-and-tell interface, suited to the design of costly experiments: the
//! session proposes the next experiment to run, the caller runs it and tells
//! the measured outcome back.
//!
//! The session goes through the following phases:
//! * warm-up: proposals are taken from a space-filling latin hypercube
//!   design until enough observations are available,
//! * modeling: at each proposal a surrogate model (gaussian process, random
//!   forest or extra trees) is fitted on the whole history and an acquisition
//!   function (EI, PI, LCB or a Hedge portfolio of them) is maximized over
//!   the search space,
//! * closed: no more proposals nor observations are accepted.
//!
//! # Example
//!
//! ```no_run
//! use egolab_ego::{AcquisitionSpec, Observation, Parameter, SessionBuilder, SurrogateSpec};
//! use ndarray::array;
//!
//! // Purity of a product (%) to be maximized
//! fn purity(temperature: f64, time: f64) -> f64 {
//!     95. - ((temperature - 70.) / 10.).powi(2) - ((time - 40.) / 15.).powi(2)
//! }
//!
//! let session = SessionBuilder::maximize()
//!     .configure(|conf| {
//!         conf.surrogate(SurrogateSpec::gp())
//!             .acquisition(AcquisitionSpec::ei())
//!             .seed(42)
//!     })
//!     .initial_observations(vec![Observation::new(array![50., 10.], purity(50., 10.))])
//!     .within(vec![
//!         Parameter::new("Temperature", 20., 100.),
//!         Parameter::new("Time", 1., 60.),
//!     ])
//!     .expect("session created");
//!
//! for _ in 0..15 {
//!     let proposal = session.ask().expect("next experiment");
//!     let y = purity(proposal.x[0], proposal.x[1]);
//!     session.tell(&proposal.x, y).expect("outcome recorded");
//! }
//! let best = session.best_observed().expect("best experiment");
//! println!("Best purity {} at {}", best.y, best.x);
//! session.close();
//! ```
//!
//! # Logging
//!
//! The session initializes [env_logger] from the `EGOLAB_LOG` environment
//! variable (default `warn`), `EGOLAB_LOG=info` traces the phases and the
//! proposals, `EGOLAB_LOG=debug` details surrogate fits and acquisition
//! optimization.
//!
//! # References
//!
//! Jones, D. R., Schonlau, M., & Welch, W. J. (1998). Efficient global
//! optimization of expensive black-box functions. Journal of Global
//! optimization, 13(4), 455-492.
//!
//! Hoffman, M., Brochu, E., & de Freitas, N. (2011). Portfolio allocation for
//! Bayesian optimization. Conference on Uncertainty in Artificial Intelligence.
//!
#![warn(missing_docs)]
#![warn(rustdoc::broken_intra_doc_links)]

pub mod criteria;
pub mod optimizers;

mod errors;
mod solver;
mod space;
mod surrogate;
mod types;
mod utils;

pub use crate::criteria::AcquisitionSpec;
pub use crate::errors::*;
pub use crate::optimizers::OptimizerConfig;
pub use crate::solver::*;
pub use crate::space::*;
pub use crate::surrogate::*;
pub use crate::types::*;
