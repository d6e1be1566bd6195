//! Implied volatility term structure.
//!
//! Buckets listed options by expiry, keeps the at-the-money contracts of
//! each bucket and reduces their implied volatilities to one
//! [`TermStructurePoint`] per expiry:
//! - `current`: mean ATM IV
//! - `min` / `max`: widened band, `min(iv) * 0.8` / `max(iv) * 1.2`
//! - `median`, `percentile25`, `percentile75`: nearest-rank on sorted IVs
//!
//! The resulting curve is also classified as contango, backwardation or
//! flat from the ratio of its front to its back tenor.

use std::collections::{BTreeMap, HashMap};

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::data::{MarkData, OptionInstrument, TermStructurePoint};
use crate::error::assert_finite;

/// Milliseconds in a day.
const MS_PER_DAY: f64 = 86_400_000.0;

/// Multiplier applied to the lowest ATM IV of a bucket.
pub const BAND_LOW_MULTIPLIER: f64 = 0.8;

/// Multiplier applied to the highest ATM IV of a bucket.
pub const BAND_HIGH_MULTIPLIER: f64 = 1.2;

/// Longest tenor kept on the curve, in days.
pub const DEFAULT_MAX_TENOR_DAYS: i64 = 180;

/// Maximum distance of `|delta|` from 0.5 for a contract to count as ATM.
pub const DEFAULT_ATM_DELTA_BAND: f64 = 0.15;

/// Term structure regime classification.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum TermStructureRegime {
    /// Near-term IV < far-term IV.
    Contango,
    /// Near-term IV > far-term IV.
    Backwardation,
    /// Near-term IV ~ far-term IV.
    Flat,
    /// Fewer than two tenors.
    Unknown,
}

/// Aggregator settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct TermStructureConfig {
    /// Expiries further out than this many days are dropped.
    pub max_tenor_days: i64,
    /// ATM filter: `abs(abs(delta) - 0.5) < atm_delta_band`.
    pub atm_delta_band: f64,
    /// Front/back ratio below this is contango.
    pub contango_threshold: f64,
    /// Front/back ratio above this is backwardation.
    pub backwardation_threshold: f64,
}

impl Default for TermStructureConfig {
    fn default() -> Self {
        Self {
            max_tenor_days: DEFAULT_MAX_TENOR_DAYS,
            atm_delta_band: DEFAULT_ATM_DELTA_BAND,
            contango_threshold: 0.95,
            backwardation_threshold: 1.05,
        }
    }
}

/// An instrument joined with its mark IV and delta.
#[derive(Debug, Clone, Copy)]
struct MarkedOption {
    iv: f64,
    delta: f64,
}

/// IV term structure aggregator.
#[derive(Debug, Clone, Default)]
pub struct TermStructureAggregator {
    config: TermStructureConfig,
}

impl TermStructureAggregator {
    pub fn new(config: TermStructureConfig) -> Self {
        Self { config }
    }

    pub fn config(&self) -> &TermStructureConfig {
        &self.config
    }

    /// Build the curve, sorted ascending by days to expiry.
    pub fn aggregate(
        &self,
        instruments: &[OptionInstrument],
        marks: &[MarkData],
        now: DateTime<Utc>,
    ) -> Vec<TermStructurePoint> {
        let now_ms = now.timestamp_millis();
        let by_expiry = group_by_expiry(instruments, marks);

        let mut points: Vec<TermStructurePoint> = by_expiry
            .into_iter()
            .filter_map(|(expiry, options)| {
                let days = days_between(now_ms, expiry);
                if days <= 0 || days > self.config.max_tenor_days {
                    debug!(expiry, days, "expiry outside tenor range");
                    return None;
                }

                let atm_ivs: Vec<f64> = options
                    .iter()
                    .filter(|o| (o.delta.abs() - 0.5).abs() < self.config.atm_delta_band)
                    .map(|o| o.iv)
                    .collect();

                if atm_ivs.is_empty() {
                    debug!(expiry, days, "no at-the-money options");
                    return None;
                }

                Some(summarize(days, atm_ivs))
            })
            .collect();

        points.sort_by_key(|p| p.days);
        points
    }

    /// Classify a curve from its front and back tenors.
    pub fn classify(&self, points: &[TermStructurePoint]) -> TermStructureRegime {
        let ratio = match (points.first(), points.last()) {
            (Some(front), Some(back)) if points.len() > 1 && back.current > 0.0 => {
                front.current / back.current
            }
            _ => return TermStructureRegime::Unknown,
        };

        if ratio < self.config.contango_threshold {
            TermStructureRegime::Contango
        } else if ratio > self.config.backwardation_threshold {
            TermStructureRegime::Backwardation
        } else {
            TermStructureRegime::Flat
        }
    }
}

/// Build the curve with default settings.
pub fn term_structure(
    instruments: &[OptionInstrument],
    marks: &[MarkData],
    now: DateTime<Utc>,
) -> Vec<TermStructurePoint> {
    TermStructureAggregator::default().aggregate(instruments, marks, now)
}

/// Tenor label for a number of days: `5d`, `3w`, `2m`.
pub fn format_tenor(days: i64) -> String {
    if days <= 7 {
        format!("{}d", days)
    } else if days <= 30 {
        format!("{}w", (days as f64 / 7.0).round() as i64)
    } else {
        format!("{}m", (days as f64 / 30.0).round() as i64)
    }
}

/// Join instruments to their marks and bucket them by expiry.
///
/// Instruments without a mark, or whose mark has no (or a zero) IV, are
/// dropped. A missing delta reads as 0, which never passes the ATM filter.
fn group_by_expiry(
    instruments: &[OptionInstrument],
    marks: &[MarkData],
) -> BTreeMap<i64, Vec<MarkedOption>> {
    let mark_by_name: HashMap<&str, &MarkData> = marks
        .iter()
        .map(|m| (m.instrument_name.as_str(), m))
        .collect();

    let mut grouped: BTreeMap<i64, Vec<MarkedOption>> = BTreeMap::new();
    for instrument in instruments {
        let Some(mark) = mark_by_name.get(instrument.instrument_name.as_str()) else {
            continue;
        };
        let iv = match mark.mark_iv {
            Some(iv) if iv != 0.0 => iv,
            _ => continue,
        };
        assert_finite(iv, "term_structure mark_iv");

        grouped
            .entry(instrument.expiration_timestamp)
            .or_default()
            .push(MarkedOption {
                iv,
                delta: mark.delta.unwrap_or(0.0),
            });
    }

    grouped
}

fn days_between(now_ms: i64, expiry_ms: i64) -> i64 {
    ((expiry_ms - now_ms) as f64 / MS_PER_DAY).round() as i64
}

/// Reduce one bucket's ATM IVs to a curve point.
fn summarize(days: i64, ivs: Vec<f64>) -> TermStructurePoint {
    let n = ivs.len();
    let current = ivs.iter().sum::<f64>() / n as f64;

    let mut sorted = ivs;
    sorted.sort_by(|a, b| a.total_cmp(b));

    let nearest_rank = |q: f64| {
        sorted
            .get((n as f64 * q).floor() as usize)
            .copied()
            .unwrap_or(current)
    };

    TermStructurePoint {
        tenor: format_tenor(days),
        days,
        iv: current,
        current,
        min: sorted[0] * BAND_LOW_MULTIPLIER,
        max: sorted[n - 1] * BAND_HIGH_MULTIPLIER,
        median: sorted[n / 2],
        percentile25: nearest_rank(0.25),
        percentile75: nearest_rank(0.75),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::data::OptionType;
    use chrono::TimeZone;

    const DAY_MS: i64 = 86_400_000;

    fn now() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2025, 1, 1, 8, 0, 0).unwrap()
    }

    fn option(name: &str, days: i64, iv: Option<f64>, delta: Option<f64>) -> (OptionInstrument, MarkData) {
        (
            OptionInstrument {
                instrument_name: name.to_string(),
                expiration_timestamp: now().timestamp_millis() + days * DAY_MS,
                strike: 3000.0,
                option_type: OptionType::Call,
            },
            MarkData {
                instrument_name: name.to_string(),
                mark_iv: iv,
                delta,
            },
        )
    }

    fn split(options: Vec<(OptionInstrument, MarkData)>) -> (Vec<OptionInstrument>, Vec<MarkData>) {
        options.into_iter().unzip()
    }

    #[test]
    fn test_summary_statistics() {
        let (instruments, marks) = split(vec![
            option("A", 30, Some(50.0), Some(0.5)),
            option("B", 30, Some(40.0), Some(-0.45)),
            option("C", 30, Some(60.0), Some(0.6)),
            option("D", 30, Some(70.0), Some(-0.4)),
            option("E", 30, Some(99.0), Some(0.9)), // not ATM
        ]);

        let points = term_structure(&instruments, &marks, now());
        assert_eq!(points.len(), 1);

        let p = &points[0];
        assert_eq!(p.days, 30);
        assert_eq!(p.tenor, "4w");
        assert!((p.current - 55.0).abs() < 1e-12);
        assert_eq!(p.iv, p.current);
        assert!((p.min - 32.0).abs() < 1e-12);
        assert!((p.max - 84.0).abs() < 1e-12);
        // sorted [40, 50, 60, 70]
        assert_eq!(p.median, 60.0);
        assert_eq!(p.percentile25, 50.0);
        assert_eq!(p.percentile75, 70.0);
    }

    #[test]
    fn test_single_option_bucket() {
        let (instruments, marks) = split(vec![option("A", 3, Some(80.0), Some(0.5))]);
        let p = &term_structure(&instruments, &marks, now())[0];
        assert_eq!(p.tenor, "3d");
        assert_eq!(p.median, 80.0);
        assert_eq!(p.percentile25, 80.0);
        assert_eq!(p.percentile75, 80.0);
    }

    #[test]
    fn test_tenor_bounds() {
        let (instruments, marks) = split(vec![
            option("expired", 0, Some(50.0), Some(0.5)),
            option("past", -3, Some(50.0), Some(0.5)),
            option("edge", 180, Some(50.0), Some(0.5)),
            option("far", 181, Some(50.0), Some(0.5)),
            option("near", 1, Some(50.0), Some(0.5)),
        ]);

        let points = term_structure(&instruments, &marks, now());
        let days: Vec<i64> = points.iter().map(|p| p.days).collect();
        assert_eq!(days, vec![1, 180]);
        assert!(points.iter().all(|p| p.days > 0 && p.days <= 180));
    }

    #[test]
    fn test_sorted_by_days() {
        let (instruments, marks) = split(vec![
            option("A", 90, Some(50.0), Some(0.5)),
            option("B", 7, Some(55.0), Some(0.5)),
            option("C", 45, Some(52.0), Some(0.5)),
            option("D", 14, Some(54.0), Some(0.5)),
        ]);

        let points = term_structure(&instruments, &marks, now());
        let days: Vec<i64> = points.iter().map(|p| p.days).collect();
        assert_eq!(days, vec![7, 14, 45, 90]);
    }

    #[test]
    fn test_drops_unmarked_and_non_atm() {
        let (mut instruments, mut marks) = split(vec![
            option("no_iv", 10, None, Some(0.5)),
            option("zero_iv", 10, Some(0.0), Some(0.5)),
            option("no_delta", 20, Some(50.0), None),
            option("deep_itm", 20, Some(50.0), Some(0.95)),
        ]);
        // Listed but never quoted.
        instruments.push(option("unquoted", 40, Some(50.0), Some(0.5)).0);
        marks.push(option("orphan_mark", 40, Some(50.0), Some(0.5)).1);

        assert!(term_structure(&instruments, &marks, now()).is_empty());
    }

    #[test]
    fn test_atm_band_is_strict() {
        let (instruments, marks) = split(vec![
            option("A", 10, Some(50.0), Some(0.66)),
            option("B", 10, Some(60.0), Some(0.64)),
        ]);
        let p = &term_structure(&instruments, &marks, now())[0];
        assert_eq!(p.current, 60.0);
    }

    #[test]
    fn test_day_rounding() {
        let mut inst = option("A", 0, Some(50.0), Some(0.5));
        inst.0.expiration_timestamp = now().timestamp_millis() + 10 * DAY_MS + DAY_MS / 2 + 1;
        let points = term_structure(&[inst.0], &[inst.1], now());
        assert_eq!(points[0].days, 11);
    }

    #[test]
    fn test_format_tenor() {
        assert_eq!(format_tenor(1), "1d");
        assert_eq!(format_tenor(7), "7d");
        assert_eq!(format_tenor(10), "1w");
        assert_eq!(format_tenor(11), "2w");
        assert_eq!(format_tenor(30), "4w");
        assert_eq!(format_tenor(31), "1m");
        assert_eq!(format_tenor(45), "2m");
        assert_eq!(format_tenor(90), "3m");
        assert_eq!(format_tenor(180), "6m");
    }

    #[test]
    fn test_custom_max_tenor() {
        let aggregator = TermStructureAggregator::new(TermStructureConfig {
            max_tenor_days: 60,
            ..Default::default()
        });
        let (instruments, marks) = split(vec![
            option("A", 30, Some(50.0), Some(0.5)),
            option("B", 90, Some(50.0), Some(0.5)),
        ]);
        assert_eq!(aggregator.aggregate(&instruments, &marks, now()).len(), 1);
    }

    #[test]
    fn test_regime_classification() {
        let aggregator = TermStructureAggregator::default();
        let (instruments, marks) = split(vec![
            option("front", 7, Some(40.0), Some(0.5)),
            option("back", 120, Some(50.0), Some(0.5)),
        ]);
        let curve = aggregator.aggregate(&instruments, &marks, now());
        assert_eq!(aggregator.classify(&curve), TermStructureRegime::Contango);

        let (instruments, marks) = split(vec![
            option("front", 7, Some(70.0), Some(0.5)),
            option("back", 120, Some(50.0), Some(0.5)),
        ]);
        let curve = aggregator.aggregate(&instruments, &marks, now());
        assert_eq!(aggregator.classify(&curve), TermStructureRegime::Backwardation);

        assert_eq!(aggregator.classify(&curve[..1]), TermStructureRegime::Unknown);
    }
}
