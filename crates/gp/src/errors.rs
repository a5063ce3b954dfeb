use thiserror::Error;

/// A result type for GP regression algorithm
pub type Result<T> = std::result::Result<T, GpError>;

/// An error when fitting or using a [`GaussianProcess`](crate::GaussianProcess)
#[derive(Error, Debug)]
pub enum GpError {
    /// When no training point is given
    #[error("Insufficient data: {0}")]
    InsufficientData(String),
    /// When the reduced likelihood cannot be computed
    #[error("LikelihoodComputation computation error: {0}")]
    LikelihoodComputationError(String),
    /// When linear algebra computation fails
    #[error(transparent)]
    LinalgError(#[from] linfa_linalg::LinalgError),
    /// When a linfa error occurs
    #[error(transparent)]
    LinfaError(#[from] linfa::error::Error),
    /// When error due to a bad value
    #[error("InvalidValue error: {0}")]
    InvalidValueError(String),
}
