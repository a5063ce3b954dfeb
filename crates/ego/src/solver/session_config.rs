//! Optimization session configuration
use crate::criteria::AcquisitionSpec;
use crate::errors::{EgoError, Result};
use crate::optimizers::OptimizerConfig;
use crate::surrogate::SurrogateSpec;
use serde::{Deserialize, Serialize};

/// Optimization session configuration
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct SessionConfig {
    /// Surrogate model fitted on the history at each modeling proposal
    pub(crate) surrogate: SurrogateSpec,
    /// Acquisition function maximized to get the next proposal
    pub(crate) acquisition: AcquisitionSpec,
    /// Settings of the acquisition maximization
    pub(crate) optimizer: OptimizerConfig,
    /// Seed of the random generator, drawn from system entropy when None
    pub(crate) seed: Option<u64>,
}

impl SessionConfig {
    /// Sets the surrogate model
    pub fn surrogate(mut self, surrogate: SurrogateSpec) -> Self {
        self.surrogate = surrogate;
        self
    }

    /// Sets the acquisition function
    pub fn acquisition(mut self, acquisition: AcquisitionSpec) -> Self {
        self.acquisition = acquisition;
        self
    }

    /// Customizes the acquisition optimizer settings
    ///
    /// ```
    /// use egolab_ego::SessionConfig;
    ///
    /// let config = SessionConfig::default().configure_optimizer(|o| o.min_pool(500).n_local(2));
    /// assert_eq!(config.optimizer_config().n_local, 2);
    /// ```
    pub fn configure_optimizer<F: FnOnce(OptimizerConfig) -> OptimizerConfig>(
        mut self,
        init: F,
    ) -> Self {
        self.optimizer = init(self.optimizer);
        self
    }

    /// Allows session reproducibility
    pub fn seed(mut self, seed: u64) -> Self {
        self.seed = Some(seed);
        self
    }

    /// Configured surrogate model
    pub fn surrogate_spec(&self) -> &SurrogateSpec {
        &self.surrogate
    }

    /// Configured acquisition function
    pub fn acquisition_spec(&self) -> &AcquisitionSpec {
        &self.acquisition
    }

    /// Configured acquisition optimizer settings
    pub fn optimizer_config(&self) -> &OptimizerConfig {
        &self.optimizer
    }

    /// Configured seed if any
    pub fn random_seed(&self) -> Option<u64> {
        self.seed
    }

    /// Checks the configuration.
    ///
    /// Surrogate and acquisition compatibility is checked first, then
    /// each component settings.
    pub fn check(self) -> Result<Self> {
        if self.acquisition.requires_uncertainty() && !self.surrogate.provides_uncertainty() {
            return Err(EgoError::IncompatibleConfiguration(format!(
                "acquisition {:?} requires an uncertainty estimate that surrogate {:?} cannot provide",
                self.acquisition, self.surrogate
            )));
        }
        self.surrogate.check().map_err(EgoError::InvalidConfigError)?;
        self.acquisition
            .check()
            .map_err(EgoError::InvalidConfigError)?;
        if self.optimizer.pool_size(1) == 0 {
            return Err(EgoError::InvalidConfigError(
                "acquisition optimizer pool should contain at least one point".to_string(),
            ));
        }
        if self.optimizer.n_local > 0 && self.optimizer.local_max_eval == 0 {
            return Err(EgoError::InvalidConfigError(
                "local refinement needs at least one evaluation".to_string(),
            ));
        }
        Ok(self)
    }
}
