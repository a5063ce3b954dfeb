use thiserror::Error;

/// A result type for tree ensemble algorithms
pub type Result<T> = std::result::Result<T, ForestError>;

/// An error when fitting a [`Forest`](crate::Forest)
#[derive(Error, Debug)]
pub enum ForestError {
    /// When no training point is given
    #[error("Insufficient data: {0}")]
    InsufficientData(String),
    /// When error due to a bad value
    #[error("InvalidValue error: {0}")]
    InvalidValueError(String),
    /// When a linfa error occurs
    #[error(transparent)]
    LinfaError(#[from] linfa::error::Error),
}
