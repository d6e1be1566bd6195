//! COT index: net positioning normalised to a 0-100 range.
//!
//! `index = (net - window_min) / (window_max - window_min) * 100`
//!
//! The window ends at (and includes) the current report and reaches back at
//! most `lookback_weeks` reports. Early reports use whatever shorter window
//! exists. A window with no range scores the neutral value 50.

use std::collections::HashMap;

use rayon::prelude::*;
use tracing::debug;

use crate::data::{CotIndexRecord, CotRecord};

/// Three years of weekly reports.
pub const DEFAULT_COT_LOOKBACK_WEEKS: usize = 156;

/// Index value for a window whose min equals its max.
pub const NEUTRAL_INDEX: f64 = 50.0;

/// Compute the COT index for every report.
///
/// Output length always equals input length. A zero lookback is treated as
/// one (each report ranked against itself only).
pub fn cot_index(records: &[CotRecord], lookback_weeks: usize) -> Vec<CotIndexRecord> {
    let lookback = lookback_weeks.max(1);
    let commercial: Vec<i64> = records.iter().map(CotRecord::commercial_net).collect();
    let large_spec: Vec<i64> = records.iter().map(CotRecord::large_spec_net).collect();

    records
        .iter()
        .enumerate()
        .map(|(i, record)| {
            let start = (i + 1).saturating_sub(lookback);
            CotIndexRecord {
                date: record.date,
                commercial_index: range_index(commercial[i], &commercial[start..=i]),
                large_spec_index: range_index(large_spec[i], &large_spec[start..=i]),
            }
        })
        .collect()
}

/// COT index for several contracts at once, keyed like the input.
pub fn cot_index_many(
    contracts: &HashMap<String, Vec<CotRecord>>,
    lookback_weeks: usize,
) -> HashMap<String, Vec<CotIndexRecord>> {
    contracts
        .par_iter()
        .map(|(contract, records)| {
            debug!(contract = %contract, reports = records.len(), "computing COT index");
            (contract.clone(), cot_index(records, lookback_weeks))
        })
        .collect()
}

/// Position of `value` within the min/max of `window`, 0-100, 2 decimals.
fn range_index(value: i64, window: &[i64]) -> f64 {
    if window.is_empty() {
        return NEUTRAL_INDEX;
    }
    let (min, max) = window
        .iter()
        .fold((i64::MAX, i64::MIN), |(lo, hi), &v| (lo.min(v), hi.max(v)));

    // Widened so extreme positions cannot overflow.
    let range = max as i128 - min as i128;
    if range == 0 {
        return NEUTRAL_INDEX;
    }

    let index = (value as i128 - min as i128) as f64 / range as f64 * 100.0;
    round_2dp(index)
}

fn round_2dp(x: f64) -> f64 {
    (x * 100.0).round() / 100.0
}
