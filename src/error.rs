use thiserror::Error;

use crate::kind::ElementKind;

/// Result type for fallible array and matrix operations.
pub type Result<T> = std::result::Result<T, Error>;

/// Error type for array and matrix operations.
///
/// None of the variants are recovered internally, they are reported directly to the caller.
#[derive(Clone, Debug, Error, PartialEq)]
pub enum Error {
    /// Rank mismatch, non-square input or inconsistent shapes.
    #[error("shape error: {0}")]
    Shape(String),

    /// Index outside the bounds of the addressed array.
    #[error("index out of range: {0}")]
    OutOfRange(String),

    /// Operation not implemented by the backend that created the matrix.
    #[error("operation `{op}` is not supported by the {backend} backend")]
    UnsupportedByBackend {
        /// Backend name.
        backend: String,
        /// Operation name.
        op: &'static str,
    },

    /// Operation not defined for the element kind of the array.
    #[error("operation `{op}` is not defined for {found} elements")]
    ElementKind {
        /// Operation name.
        op: &'static str,
        /// Element kind of the array.
        found: ElementKind,
    },

    /// Singular system found while solving or inverting.
    #[error("matrix is singular to working precision")]
    Singular,

    /// Matrix is not symmetric positive definite in a Cholesky factorization.
    #[error("matrix is not positive definite")]
    NotPositiveDefinite,

    /// Infinite or NaN elements in an operation that requires finite input.
    #[error("operation `{0}` requires finite elements")]
    NotFinite(&'static str),

    /// Invalid configuration value.
    #[error("invalid configuration: {0}")]
    Config(String),

    /// Dimension validation failed for one or more matrices.
    #[error("{0}")]
    Validation(String),
}

impl Error {
    pub(crate) fn shape(msg: impl Into<String>) -> Self {
        Error::Shape(msg.into())
    }

    pub(crate) fn mismatch(op: &str, lhs: &[usize], rhs: &[usize]) -> Self {
        Error::Shape(format!("{op} requires matching shapes, got {lhs:?} and {rhs:?}"))
    }
}
