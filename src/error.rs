//! Error types for the FEM linear-system core.
//!
//! Only configuration problems are errors. Numeric trouble (an iteration cap
//! reached, an ILU pivot breakdown) is reported through the convergence
//! history and the log, never through `Err`.

use thiserror::Error;

/// Result type alias using the crate [`Error`].
pub type Result<T> = std::result::Result<T, Error>;

/// Errors raised before any numeric work is done.
#[derive(Error, Debug)]
pub enum Error {
    /// The sparsity pattern was not set before an operation that needs it.
    #[error("sparsity pattern not set: {0}")]
    PatternNotSet(&'static str),

    /// A model was stepped before `updated_topology` bound it to a mesh.
    #[error("model has no topology; call updated_topology first")]
    NoTopology,

    /// An array does not have the expected length.
    #[error("shape mismatch for {what}: expected {expected}, got {got}")]
    ShapeMismatch {
        what: &'static str,
        expected: usize,
        got: usize,
    },

    /// The spatial dimension is not supported by the requested operation.
    #[error("unsupported dimension {dim} for {what}")]
    UnsupportedDimension { what: &'static str, dim: usize },

    /// A contribution addressed an entry outside the sparsity pattern.
    #[error("entry ({row}, {col}) is outside the sparsity pattern")]
    OutsidePattern { row: usize, col: usize },

    /// Mesh connectivity problems.
    #[error("mesh error: {0}")]
    Mesh(String),

    /// Invalid master-slave constraint array.
    #[error("invalid master-slave pattern: {0}")]
    MasterSlave(String),

    /// Math expression could not be parsed or evaluated.
    #[error("expression error: {0}")]
    Expression(String),

    /// Configuration file could not be parsed.
    #[error("config error: {0}")]
    Config(String),

    /// I/O errors (configuration files).
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

impl Error {
    pub(crate) fn shape(what: &'static str, expected: usize, got: usize) -> Self {
        Error::ShapeMismatch { what, expected, got }
    }
}
