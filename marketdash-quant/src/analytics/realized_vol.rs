//! Rolling realized volatility from daily closes.

use crate::data::Sample;
use crate::error::assert_finite;

use super::rolling::mean_std;

/// Default realized volatility window, in daily returns.
pub const DEFAULT_RV_WINDOW: usize = 30;

/// Calendar days per year; crypto trades every day.
pub const ANNUALIZATION_DAYS: f64 = 365.0;

/// Annualized realized volatility in percent.
///
/// Return `k` is `ln(close[k + 1] / close[k])`. The value dated
/// `closes[i]` uses returns `[i - window, i)`, i.e. closes up to and
/// including `closes[i]`, with population variance annualized as
/// `sqrt(var * 365) * 100`.
///
/// # Panics
///
/// Panics if `window` is zero or a close is not a positive finite number.
pub fn realized_volatility(closes: &[Sample], window: usize) -> Vec<Sample> {
    assert!(window > 0, "realized volatility window must be positive");

    let returns: Vec<f64> = closes
        .windows(2)
        .map(|pair| {
            let (prev, next) = (pair[0].value, pair[1].value);
            assert_finite(prev, "realized_volatility close");
            assert_finite(next, "realized_volatility close");
            assert!(prev > 0.0 && next > 0.0, "closes must be positive");
            (next / prev).ln()
        })
        .collect();

    (window..returns.len())
        .filter_map(|i| {
            let (_, std_dev) = mean_std(&returns[i - window..i])?;
            Some(Sample {
                date: closes[i].date,
                value: (std_dev.powi(2) * ANNUALIZATION_DAYS).sqrt() * 100.0,
            })
        })
        .collect()
}
