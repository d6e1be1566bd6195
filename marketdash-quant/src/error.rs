//! Errors raised by the transform layer.

use thiserror::Error;

/// Transform errors.
///
/// Normal data (zero variance, short windows, missing join keys) never
/// produces an error; these variants cover caller contract violations only.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum TransformError {
    #[error("Invalid argument: {0}")]
    InvalidArgument(String),

    #[error("Non-finite value in {context}: {value}")]
    NonFinite { context: String, value: f64 },
}

pub type TransformResult<T> = Result<T, TransformError>;

/// Panic if `value` is not finite.
///
/// Transforms are total over well-formed input; a NaN or infinity reaching
/// them is a bug upstream and must not leak into chart output.
#[inline]
pub(crate) fn assert_finite(value: f64, context: &str) {
    assert!(
        value.is_finite(),
        "non-finite value {} reached {}",
        value,
        context
    );
}
