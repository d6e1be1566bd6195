//! Core record types shared by the data sources and the transforms.
//!
//! Every record is an immutable value: transforms build fresh outputs from
//! their inputs and never mutate what they were given. Field names follow
//! the chart keys the presentation layer plots against.

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

use crate::error::{TransformError, TransformResult};

/// A single dated observation.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Sample {
    pub date: NaiveDate,
    pub value: f64,
}

impl Sample {
    /// Create a sample, rejecting NaN and infinities.
    pub fn new(date: NaiveDate, value: f64) -> TransformResult<Self> {
        if !value.is_finite() {
            return Err(TransformError::NonFinite {
                context: format!("sample {}", date),
                value,
            });
        }
        Ok(Self { date, value })
    }
}

/// Collect the values of a series, in order.
pub fn values(series: &[Sample]) -> Vec<f64> {
    series.iter().map(|s| s.value).collect()
}

/// Rolling z-score output for one input sample.
///
/// `z_score` is `0.0` until the lookback window has filled.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct WindowedStat {
    pub date: NaiveDate,
    #[serde(rename = "zScore")]
    pub z_score: f64,
}

/// Option type (call or put).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum OptionType {
    Call,
    Put,
}

impl OptionType {
    pub fn from_str(s: &str) -> Option<Self> {
        match s.to_uppercase().as_str() {
            "C" | "CALL" => Some(Self::Call),
            "P" | "PUT" => Some(Self::Put),
            _ => None,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Call => "C",
            Self::Put => "P",
        }
    }
}

/// Long and short open positions of one trader category.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Positions {
    pub long: i64,
    pub short: i64,
}

impl Positions {
    pub fn new(long: i64, short: i64) -> Self {
        Self { long, short }
    }

    /// Net position, `long - short` saturated at the `i64` bounds.
    pub fn net(&self) -> i64 {
        self.long.saturating_sub(self.short)
    }
}

/// One weekly Commitment of Traders report row.
///
/// Nets are derived from the positions on demand and are never stored, so
/// they cannot drift from the long/short figures.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(into = "CotRow")]
pub struct CotRecord {
    pub date: NaiveDate,
    /// Commercial (hedger) positions.
    pub commercial: Positions,
    /// Large speculator (non-commercial) positions.
    pub large_spec: Positions,
    /// Small speculator (non-reportable) positions.
    pub small_spec: Positions,
}

impl CotRecord {
    pub fn commercial_net(&self) -> i64 {
        self.commercial.net()
    }

    pub fn large_spec_net(&self) -> i64 {
        self.large_spec.net()
    }

    pub fn small_spec_net(&self) -> i64 {
        self.small_spec.net()
    }
}

/// Flat chart shape of a [`CotRecord`].
#[derive(Debug, Clone, Serialize)]
pub struct CotRow {
    pub date: NaiveDate,
    pub commercial_long: i64,
    pub commercial_short: i64,
    pub commercial_net: i64,
    pub large_spec_long: i64,
    pub large_spec_short: i64,
    pub large_spec_net: i64,
    pub small_spec_long: i64,
    pub small_spec_short: i64,
    pub small_spec_net: i64,
}

impl From<CotRecord> for CotRow {
    fn from(r: CotRecord) -> Self {
        Self {
            date: r.date,
            commercial_long: r.commercial.long,
            commercial_short: r.commercial.short,
            commercial_net: r.commercial.net(),
            large_spec_long: r.large_spec.long,
            large_spec_short: r.large_spec.short,
            large_spec_net: r.large_spec.net(),
            small_spec_long: r.small_spec.long,
            small_spec_short: r.small_spec.short,
            small_spec_net: r.small_spec.net(),
        }
    }
}

/// COT index (0-100) for the two tracked trader categories.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct CotIndexRecord {
    pub date: NaiveDate,
    pub commercial_index: f64,
    pub large_spec_index: f64,
}

/// An option contract as listed by the exchange.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OptionInstrument {
    pub instrument_name: String,
    /// Expiry in milliseconds since the Unix epoch.
    pub expiration_timestamp: i64,
    pub strike: f64,
    pub option_type: OptionType,
}

/// Mark data for one instrument (from the book summary).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MarkData {
    pub instrument_name: String,
    /// Mark implied volatility in percent.
    pub mark_iv: Option<f64>,
    pub delta: Option<f64>,
}

/// Implied volatility summary for one expiry bucket.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TermStructurePoint {
    pub tenor: String,
    pub days: i64,
    pub iv: f64,
    pub current: f64,
    pub min: f64,
    pub max: f64,
    pub median: f64,
    pub percentile25: f64,
    pub percentile75: f64,
}

impl TermStructurePoint {
    /// Position of `current` inside the widened min/max band, 0-100.
    pub fn iv_rank(&self) -> f64 {
        let band = self.max - self.min;
        if band == 0.0 {
            return 0.0;
        }
        ((self.current - self.min) / band * 100.0).round()
    }
}

/// Implied minus realized volatility for one date.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct VrpRecord {
    pub date: NaiveDate,
    pub iv: f64,
    pub rv: f64,
    pub vrp: f64,
}

/// High yield minus investment grade spread for one date.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct CreditSpread {
    pub date: NaiveDate,
    pub hy: f64,
    pub ig: f64,
    pub spread: f64,
}

/// A sample rebased to percent change from a start date.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct PerformancePoint {
    pub date: NaiveDate,
    pub value: f64,
    pub performance: f64,
}

/// A sample with its trailing mean-return composite.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct CompositePoint {
    pub date: NaiveDate,
    pub value: f64,
    pub composite: f64,
}

/// Open interest in USD split by asset.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct GlobalOi {
    pub date: NaiveDate,
    pub global: f64,
    pub btc: f64,
    pub eth: f64,
    pub others: f64,
}

/// Liquidated notional in USD for one day.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct LiquidationPoint {
    pub date: NaiveDate,
    pub long: f64,
    pub short: f64,
    /// Always `long + short`.
    pub total: f64,
}

impl LiquidationPoint {
    pub fn new(date: NaiveDate, long: f64, short: f64) -> Self {
        Self {
            date,
            long,
            short,
            total: long + short,
        }
    }
}

/// One funding rate print for a perpetual contract.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FundingObservation {
    pub date: NaiveDate,
    /// Exchange symbol, e.g. `BTCUSDT`.
    pub symbol: String,
    /// Funding rate as a fraction (0.0001 = 0.01%).
    pub rate: f64,
}

/// Date x symbol grid of funding rates in percent.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct FundingHeatmap {
    pub dates: Vec<NaiveDate>,
    pub symbols: Vec<String>,
    pub data: Vec<Vec<f64>>,
}

#[cfg(test)]
mod tests {
    use super::*;

    fn date(d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(2024, 1, d).unwrap()
    }

    #[test]
    fn test_sample_rejects_non_finite() {
        assert!(Sample::new(date(1), 1.5).is_ok());
        assert!(matches!(
            Sample::new(date(1), f64::NAN),
            Err(TransformError::NonFinite { .. })
        ));
        assert!(Sample::new(date(1), f64::INFINITY).is_err());
    }

    #[test]
    fn test_option_type_parsing() {
        assert_eq!(OptionType::from_str("C"), Some(OptionType::Call));
        assert_eq!(OptionType::from_str("put"), Some(OptionType::Put));
        assert_eq!(OptionType::from_str("X"), None);
    }

    #[test]
    fn test_cot_net_is_derived() {
        let record = CotRecord {
            date: date(2),
            commercial: Positions::new(120, 200),
            large_spec: Positions::new(300, 100),
            small_spec: Positions::new(10, 15),
        };
        assert_eq!(record.commercial_net(), -80);
        assert_eq!(record.large_spec_net(), 200);
        assert_eq!(record.small_spec_net(), -5);

        let json = serde_json::to_value(&record).unwrap();
        assert_eq!(json["commercial_net"], -80);
        assert_eq!(json["large_spec_long"], 300);
        assert_eq!(json["date"], "2024-01-02");
    }

    #[test]
    fn test_windowed_stat_chart_key() {
        let stat = WindowedStat {
            date: date(3),
            z_score: 1.25,
        };
        let json = serde_json::to_value(stat).unwrap();
        assert_eq!(json["zScore"], 1.25);
    }

    #[test]
    fn test_iv_rank() {
        let point = TermStructurePoint {
            tenor: "1m".to_string(),
            days: 30,
            iv: 50.0,
            current: 50.0,
            min: 40.0,
            max: 60.0,
            median: 50.0,
            percentile25: 45.0,
            percentile75: 55.0,
        };
        assert_eq!(point.iv_rank(), 50.0);

        let flat = TermStructurePoint {
            min: 50.0,
            max: 50.0,
            ..point
        };
        assert_eq!(flat.iv_rank(), 0.0);
    }
}
