use thiserror::Error;

/// Error taxonomy of the kernel.
///
/// Construction problems and out-of-domain evaluations are the only hard
/// failures. Degenerate-but-valid numerical conditions (a vanishing tangent
/// at a cusp) are reported as flags on the returned value instead, see
/// [`crate::prelude::Curvature::is_singular`].
#[derive(Error, Debug, Clone, PartialEq)]
pub enum Error {
    /// Malformed construction input: degree vs. control point count,
    /// knot vector length mismatch, inconsistent surface grid, ...
    /// Raised at construction time; the object is never built.
    #[error("invalid configuration: {0}")]
    Configuration(String),

    /// Evaluation parameter outside the valid domain of an open curve
    /// or surface direction. Closed curves wrap instead of failing.
    #[error("parameter {parameter} outside of domain [{min}, {max}]")]
    Domain {
        parameter: f64,
        min: f64,
        max: f64,
    },
}

pub type Result<T> = core::result::Result<T, Error>;

impl Error {
    pub(crate) fn configuration(message: impl Into<String>) -> Self {
        Error::Configuration(message.into())
    }
}
