use thiserror::Error;

/// A result type for optimization session errors
pub type Result<T> = std::result::Result<T, EgoError>;

/// An error for the bayesian optimization engine
#[derive(Error, Debug)]
pub enum EgoError {
    /// When a told input has a component outside its parameter bounds
    #[error("Out of bounds: {0}")]
    OutOfBounds(String),
    /// When an input vector length does not match the search space dimension
    #[error("Dimension mismatch: expected {expected} components, got {actual}")]
    DimensionMismatch {
        /// Search space dimension
        expected: usize,
        /// Given vector length
        actual: usize,
    },
    /// When a surrogate is fitted without any observation
    #[error("Insufficient data: {0}")]
    InsufficientData(String),
    /// When the session is used after being closed
    #[error("Session closed")]
    SessionClosed,
    /// When the best observation is requested while history is empty
    #[error("No observations")]
    NoObservations,
    /// When the acquisition function needs an uncertainty the surrogate cannot provide
    #[error("Incompatible configuration: {0}")]
    IncompatibleConfiguration(String),
    /// When configuration is invalid
    #[error("Invalid configuration: {0}")]
    InvalidConfigError(String),
    /// When an invalid value is encountered
    #[error("Value error: {0}")]
    InvalidValue(String),
    /// When gaussian process fitting or prediction fails
    #[error("GP error")]
    GpError(#[source] egolab_gp::GpError),
    /// When tree ensemble fitting fails
    #[error("Forest error")]
    ForestError(#[source] egolab_forest::ForestError),
}

impl From<egolab_gp::GpError> for EgoError {
    fn from(err: egolab_gp::GpError) -> Self {
        match err {
            egolab_gp::GpError::InsufficientData(msg) => EgoError::InsufficientData(msg),
            err => EgoError::GpError(err),
        }
    }
}

impl From<egolab_forest::ForestError> for EgoError {
    fn from(err: egolab_forest::ForestError) -> Self {
        match err {
            egolab_forest::ForestError::InsufficientData(msg) => EgoError::InsufficientData(msg),
            err => EgoError::ForestError(err),
        }
    }
}
