//! Input validation module.
//!
//! Checks the preconditions the transforms assume but never enforce:
//! finite values, ordered and unique dates, bounded gaps.

pub mod series;

pub use series::{CheckResult, SeriesReport, SeriesValidator, SeriesValidatorConfig};
