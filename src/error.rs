use thiserror::Error;

/// Error types for the globalfit-rs library.
#[derive(Error, Debug)]
pub enum FitError {
    /// A name failed validation: an unknown parameter or global name, a
    /// parameter absent from a model, or a duplicate experiment id.
    #[error("Validation error: {0}")]
    Validation(String),

    /// An experiment was not found in the registry.
    #[error("Not found: {0}")]
    NotFound(String),

    /// An operation was attempted in the wrong session state, such as
    /// reading results before a successful fit.
    #[error("Invalid state: {0}")]
    State(String),

    /// The iterative solve failed.
    #[error("Solver error: {0}")]
    Solver(String),

    /// Error indicating a mismatch in vector dimensions.
    #[error("Dimension mismatch: {0}")]
    DimensionMismatch(String),
}

/// Result type alias for globalfit-rs operations.
pub type Result<T> = std::result::Result<T, FitError>;
