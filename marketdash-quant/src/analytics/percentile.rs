//! Percentile rank of a value within a historical distribution.

use crate::error::{TransformError, TransformResult};

/// Percentage (0-100) of historical values strictly below `current`.
///
/// Values equal to `current` do not count towards its rank, so the lowest
/// value of a history always ranks 0.
pub fn percentile_rank(current: f64, historical: &[f64]) -> TransformResult<f64> {
    if !current.is_finite() {
        return Err(TransformError::NonFinite {
            context: "percentile_rank current".to_string(),
            value: current,
        });
    }
    if historical.is_empty() {
        return Err(TransformError::InvalidArgument(
            "percentile rank of an empty history".to_string(),
        ));
    }

    let below = historical.iter().filter(|&&v| v < current).count();
    Ok(below as f64 / historical.len() as f64 * 100.0)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_strictly_below_count() {
        let history = [10.0, 20.0, 30.0, 40.0, 50.0, 60.0, 70.0];
        let pct = percentile_rank(55.0, &history).unwrap();
        assert!((pct - 500.0 / 7.0).abs() < 1e-9);
        assert!((pct - 71.43).abs() < 0.01);
    }

    #[test]
    fn test_ties_not_counted() {
        let history = [1.0, 2.0, 2.0, 2.0, 3.0];
        assert_eq!(percentile_rank(2.0, &history).unwrap(), 20.0);
        assert_eq!(percentile_rank(1.0, &history).unwrap(), 0.0);
        assert_eq!(percentile_rank(4.0, &history).unwrap(), 100.0);
    }

    #[test]
    fn test_order_independent() {
        let sorted = [1.0, 2.0, 3.0, 4.0];
        let shuffled = [3.0, 1.0, 4.0, 2.0];
        assert_eq!(
            percentile_rank(2.5, &sorted).unwrap(),
            percentile_rank(2.5, &shuffled).unwrap()
        );
    }

    #[test]
    fn test_monotonic_in_current() {
        let history: Vec<f64> = (0..50).map(|i| ((i * 37) % 23) as f64).collect();
        let mut previous = 0.0;
        for step in 0..100 {
            let current = -2.0 + step as f64 * 0.3;
            let pct = percentile_rank(current, &history).unwrap();
            assert!(pct >= previous);
            assert!((0.0..=100.0).contains(&pct));
            previous = pct;
        }
    }

    #[test]
    fn test_empty_history_is_error() {
        assert!(matches!(
            percentile_rank(1.0, &[]),
            Err(TransformError::InvalidArgument(_))
        ));
    }

    #[test]
    fn test_nan_current_is_error() {
        assert!(matches!(
            percentile_rank(f64::NAN, &[1.0]),
            Err(TransformError::NonFinite { .. })
        ));
    }
}
