//! Rolling z-scores over a trailing window.
//!
//! The window at index `i` is the half-open range `[i - lookback, i)`: the
//! current sample is scored against the `lookback` samples before it and
//! never against itself. Indices before the window fills score `0.0`.

use crate::data::{Sample, WindowedStat};
use crate::error::assert_finite;

/// Trading days in a year, the default z-score lookback.
pub const DEFAULT_ZSCORE_LOOKBACK: usize = 252;

/// Mean and population standard deviation of a slice.
///
/// Returns `None` for an empty slice.
pub fn mean_std(values: &[f64]) -> Option<(f64, f64)> {
    if values.is_empty() {
        return None;
    }

    let n = values.len() as f64;
    let mean = values.iter().sum::<f64>() / n;
    let variance = values.iter().map(|v| (v - mean).powi(2)).sum::<f64>() / n;

    Some((mean, variance.sqrt()))
}

/// Rolling z-score of every sample against its trailing window.
///
/// Output has one entry per input sample. A window with zero standard
/// deviation scores `0.0`.
///
/// # Panics
///
/// Panics if `lookback` is zero or a sample value is not finite.
pub fn z_score(series: &[Sample], lookback: usize) -> Vec<WindowedStat> {
    assert!(lookback > 0, "z-score lookback must be positive");

    let values: Vec<f64> = series
        .iter()
        .map(|s| {
            assert_finite(s.value, "z_score");
            s.value
        })
        .collect();

    series
        .iter()
        .enumerate()
        .map(|(i, sample)| {
            if i < lookback {
                return WindowedStat {
                    date: sample.date,
                    z_score: 0.0,
                };
            }

            let z_score = match mean_std(&values[i - lookback..i]) {
                Some((mean, std_dev)) if std_dev != 0.0 => (sample.value - mean) / std_dev,
                _ => 0.0,
            };

            WindowedStat {
                date: sample.date,
                z_score,
            }
        })
        .collect()
}

/// Z-score of a single value against a whole history.
///
/// Returns `0.0` for an empty history or one with zero variance.
pub fn point_z_score(current: f64, history: &[f64]) -> f64 {
    assert_finite(current, "point_z_score");

    match mean_std(history) {
        Some((mean, std_dev)) if std_dev != 0.0 => (current - mean) / std_dev,
        _ => 0.0,
    }
}

/// Z-score of the last element of a rolling output, `0.0` when empty.
pub fn latest(stats: &[WindowedStat]) -> f64 {
    stats.last().map(|s| s.z_score).unwrap_or(0.0)
}
