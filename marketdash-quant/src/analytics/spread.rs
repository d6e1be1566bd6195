//! Date-aligned spreads between two series.
//!
//! Both transforms are inner joins: the left series drives output order, and
//! a left sample with no right sample on the same date is dropped.

use std::collections::HashMap;

use chrono::NaiveDate;

use crate::data::{CreditSpread, Sample, VrpRecord};
use crate::error::assert_finite;

/// Pair `left` with `right` by date, keeping `left`'s order.
///
/// When `right` repeats a date, its last sample wins.
pub fn join_by_date(left: &[Sample], right: &[Sample]) -> Vec<(NaiveDate, f64, f64)> {
    let lookup: HashMap<NaiveDate, f64> = right.iter().map(|s| (s.date, s.value)).collect();

    left.iter()
        .filter_map(|l| lookup.get(&l.date).map(|&r| (l.date, l.value, r)))
        .collect()
}

/// Variance risk premium: implied minus realized volatility per date.
pub fn variance_risk_premium(iv: &[Sample], rv: &[Sample]) -> Vec<VrpRecord> {
    join_by_date(iv, rv)
        .into_iter()
        .map(|(date, iv, rv)| {
            assert_finite(iv, "variance_risk_premium iv");
            assert_finite(rv, "variance_risk_premium rv");
            VrpRecord {
                date,
                iv,
                rv,
                vrp: iv - rv,
            }
        })
        .collect()
}

/// High yield minus investment grade option-adjusted spread per date.
pub fn credit_spread(hy: &[Sample], ig: &[Sample]) -> Vec<CreditSpread> {
    join_by_date(hy, ig)
        .into_iter()
        .map(|(date, hy, ig)| {
            assert_finite(hy, "credit_spread hy");
            assert_finite(ig, "credit_spread ig");
            CreditSpread {
                date,
                hy,
                ig,
                spread: hy - ig,
            }
        })
        .collect()
}
