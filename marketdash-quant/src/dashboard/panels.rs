//! Serializable panel outputs.

use std::collections::BTreeMap;

use serde::Serialize;

use crate::analytics::{percentile_rank, point_z_score, TermStructureRegime};
use crate::data::{
    values, CompositePoint, CotIndexRecord, CotRecord, CreditSpread, FundingHeatmap, GlobalOi,
    LiquidationPoint, PerformancePoint, Sample, TermStructurePoint, VrpRecord, WindowedStat,
};
use crate::error::TransformResult;
use crate::validation::SeriesReport;

/// Headline numbers of one series.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize)]
pub struct Indicator {
    /// Last value.
    pub latest: f64,
    /// Last rolling z-score.
    pub z_score: f64,
    /// Percentile rank of the last value within the whole history.
    pub percentile: f64,
}

impl Indicator {
    /// Card values for `series`; all zero for an empty series.
    pub fn from_series(series: &[Sample], rolling: &[WindowedStat]) -> TransformResult<Self> {
        let Some(last) = series.last() else {
            return Ok(Self::default());
        };
        Ok(Self {
            latest: last.value,
            z_score: crate::analytics::rolling::latest(rolling),
            percentile: percentile_rank(last.value, &values(series))?,
        })
    }
}

/// Volatility, credit and equity indicators.
#[derive(Debug, Clone, Serialize)]
pub struct TraditionalPanel {
    pub vix: Vec<Sample>,
    pub vix_zscore: Vec<WindowedStat>,
    pub vix_indicator: Indicator,
    pub credit: Vec<CreditSpread>,
    pub credit_zscore: Vec<WindowedStat>,
    pub credit_indicator: Indicator,
    /// S&P 500 with its momentum composite.
    pub sp500: Vec<CompositePoint>,
    /// S&P 500 rebased over the trailing history window.
    pub sp500_performance: Vec<PerformancePoint>,
    pub treasury_10y: Vec<Sample>,
    pub checks: Vec<SeriesReport>,
}

/// Options volatility for one currency.
#[derive(Debug, Clone, Serialize)]
pub struct OptionsPanel {
    pub currency: String,
    pub term_structure: Vec<TermStructurePoint>,
    pub regime: TermStructureRegime,
    /// Front tenor ATM IV.
    pub current_iv: f64,
    /// Front tenor IV rank within its band.
    pub iv_rank: f64,
    pub vrp: Vec<VrpRecord>,
    pub current_rv: f64,
    pub current_vrp: f64,
    /// Last DVOL reading against the full DVOL history.
    pub iv_index_zscore: f64,
    pub checks: Vec<SeriesReport>,
}

impl OptionsPanel {
    pub(crate) fn summarize(
        currency: &str,
        term_structure: Vec<TermStructurePoint>,
        regime: TermStructureRegime,
        vrp: Vec<VrpRecord>,
        iv_index: &[Sample],
        checks: Vec<SeriesReport>,
    ) -> Self {
        let front = term_structure.first();
        let last_vrp = vrp.last();
        let iv_index_zscore = iv_index
            .last()
            .map(|s| point_z_score(s.value, &values(iv_index)))
            .unwrap_or(0.0);

        Self {
            currency: currency.to_string(),
            current_iv: front.map(|p| p.current).unwrap_or(0.0),
            iv_rank: front.map(TermStructurePoint::iv_rank).unwrap_or(0.0),
            current_rv: last_vrp.map(|r| r.rv).unwrap_or(0.0),
            current_vrp: last_vrp.map(|r| r.vrp).unwrap_or(0.0),
            term_structure,
            regime,
            vrp,
            iv_index_zscore,
            checks,
        }
    }
}

/// Positioning for one headline contract plus a COT index per tracked contract.
#[derive(Debug, Clone, Serialize)]
pub struct CotPanel {
    pub contract: String,
    pub reports: Vec<CotRecord>,
    pub index: Vec<CotIndexRecord>,
    /// COT index keyed by contract name.
    pub contracts: BTreeMap<String, Vec<CotIndexRecord>>,
    /// Commercial net series checks, one per fetched contract.
    pub checks: Vec<SeriesReport>,
}

/// Crypto derivatives positioning.
#[derive(Debug, Clone, Serialize)]
pub struct CryptoPanel {
    pub global_oi: Vec<GlobalOi>,
    /// Percent change of global open interest over the last sample.
    pub oi_change: f64,
    pub oi_zscore: Vec<WindowedStat>,
    pub oi_zscore_latest: f64,
    pub funding: FundingHeatmap,
    pub liquidations: Vec<LiquidationPoint>,
    pub checks: Vec<SeriesReport>,
}

/// Percent change between the last two global open interest readings.
pub(crate) fn last_change(global_oi: &[GlobalOi]) -> f64 {
    match global_oi {
        [.., prev, last] if prev.global != 0.0 => (last.global - prev.global) / prev.global * 100.0,
        _ => 0.0,
    }
}

/// Every panel.
#[derive(Debug, Clone, Serialize)]
pub struct DashboardSnapshot {
    pub traditional: TraditionalPanel,
    pub options: OptionsPanel,
    pub cot: CotPanel,
    pub crypto: CryptoPanel,
}
