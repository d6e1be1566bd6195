//! Rebased performance and trailing return composites.

use chrono::NaiveDate;

use crate::data::{CompositePoint, PerformancePoint, Sample};
use crate::error::{assert_finite, TransformError, TransformResult};

/// Default lookback of the momentum composite, in samples.
pub const DEFAULT_COMPOSITE_LOOKBACK: usize = 50;

/// Percent change of every sample from the first sample on or after `start`.
///
/// Samples before `start` are omitted. Returns an empty vector when no
/// sample falls on or after `start`.
pub fn rebase_performance(series: &[Sample], start: NaiveDate) -> TransformResult<Vec<PerformancePoint>> {
    let Some(start_idx) = series.iter().position(|s| s.date >= start) else {
        return Ok(Vec::new());
    };

    let base = series[start_idx].value;
    if base == 0.0 {
        return Err(TransformError::InvalidArgument(format!(
            "cannot rebase on a zero value at {}",
            series[start_idx].date
        )));
    }

    Ok(series[start_idx..]
        .iter()
        .map(|s| {
            assert_finite(s.value, "rebase_performance");
            PerformancePoint {
                date: s.date,
                value: s.value,
                performance: (s.value - base) / base * 100.0,
            }
        })
        .collect())
}

/// Mean simple return over the trailing window, in percent.
///
/// For `i >= lookback` the window is the `lookback` samples `[i - lookback, i)`;
/// the first sample of the window contributes a return of zero, so the sum
/// of `lookback - 1` returns is divided by `lookback`. Earlier indices score
/// zero.
pub fn momentum_composite(series: &[Sample], lookback: usize) -> Vec<CompositePoint> {
    assert!(lookback > 0, "composite lookback must be positive");

    series
        .iter()
        .enumerate()
        .map(|(i, sample)| {
            assert_finite(sample.value, "momentum_composite");
            if i < lookback {
                return CompositePoint {
                    date: sample.date,
                    value: sample.value,
                    composite: 0.0,
                };
            }

            let window = &series[i - lookback..i];
            let total: f64 = window
                .windows(2)
                .map(|pair| {
                    if pair[0].value == 0.0 {
                        0.0
                    } else {
                        (pair[1].value - pair[0].value) / pair[0].value
                    }
                })
                .sum();

            CompositePoint {
                date: sample.date,
                value: sample.value,
                composite: total / lookback as f64 * 100.0,
            }
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Duration;

    fn start() -> NaiveDate {
        NaiveDate::from_ymd_opt(2024, 1, 1).unwrap()
    }

    fn series(values: &[f64]) -> Vec<Sample> {
        values
            .iter()
            .enumerate()
            .map(|(i, v)| Sample {
                date: start() + Duration::days(i as i64),
                value: *v,
            })
            .collect()
    }

    #[test]
    fn test_rebase_from_start_date() {
        let data = series(&[90.0, 100.0, 110.0, 95.0]);
        let out = rebase_performance(&data, start() + Duration::days(1)).unwrap();

        assert_eq!(out.len(), 3);
        assert_eq!(out[0].performance, 0.0);
        assert!((out[1].performance - 10.0).abs() < 1e-12);
        assert!((out[2].performance + 5.0).abs() < 1e-12);
    }

    #[test]
    fn test_rebase_start_between_dates() {
        let data = vec![
            Sample { date: start(), value: 1.0 },
            Sample { date: start() + Duration::days(7), value: 2.0 },
        ];
        let out = rebase_performance(&data, start() + Duration::days(3)).unwrap();
        assert_eq!(out.len(), 1);
        assert_eq!(out[0].value, 2.0);
    }

    #[test]
    fn test_rebase_after_last_date() {
        let data = series(&[1.0, 2.0]);
        assert!(rebase_performance(&data, start() + Duration::days(30))
            .unwrap()
            .is_empty());
    }

    #[test]
    fn test_rebase_zero_base() {
        let data = series(&[0.0, 2.0]);
        assert!(matches!(
            rebase_performance(&data, start()),
            Err(TransformError::InvalidArgument(_))
        ));
    }

    #[test]
    fn test_composite_zero_prefix() {
        let data = series(&[1.0, 2.0, 3.0, 4.0]);
        let out = momentum_composite(&data, 3);
        assert_eq!(out.len(), 4);
        assert!(out[..3].iter().all(|p| p.composite == 0.0));
    }

    #[test]
    fn test_composite_mean_return() {
        // Window [100, 110, 121]: returns [0, 0.1, 0.1], mean 0.2 / 3.
        let data = series(&[100.0, 110.0, 121.0, 50.0]);
        let out = momentum_composite(&data, 3);
        assert!((out[3].composite - 0.2 / 3.0 * 100.0).abs() < 1e-9);
        assert_eq!(out[3].value, 50.0);
    }
}
