//! Deribit public API client (no authentication).
//!
//! Endpoints:
//! - `get_instruments` and `get_book_summary_by_currency` for the option chain
//! - `get_volatility_index_data` for the daily DVOL index
//! - `get_tradingview_chart_data` for perpetual closes

use std::collections::HashMap;
use std::time::Duration;

use chrono::{DateTime, NaiveDate, Utc};
use serde::Deserialize;
use tracing::debug;

use super::black_scholes::BlackScholes;
use super::source::{Currency, OptionChain, RateLimitedClient, SourceError, SourceResult};
use super::types::{MarkData, OptionInstrument, OptionType, Sample};

const MS_PER_DAY: i64 = 24 * 60 * 60 * 1000;

/// JSON-RPC envelope - Deribit wraps every result in {"result": ...}
#[derive(Debug, Clone, Deserialize)]
pub struct ApiResponse<T> {
    pub result: T,
}

#[derive(Debug, Clone, Deserialize)]
pub struct RawInstrument {
    pub instrument_name: String,
    pub expiration_timestamp: i64,
    pub strike: Option<f64>,
    pub option_type: Option<String>,
}

impl RawInstrument {
    pub fn to_instrument(&self) -> Option<OptionInstrument> {
        Some(OptionInstrument {
            instrument_name: self.instrument_name.clone(),
            expiration_timestamp: self.expiration_timestamp,
            strike: self.strike?,
            option_type: OptionType::from_str(self.option_type.as_deref()?)?,
        })
    }
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct RawGreeks {
    pub delta: Option<f64>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct RawBookSummary {
    pub instrument_name: String,
    #[serde(default)]
    pub mark_iv: Option<f64>,
    #[serde(default)]
    pub underlying_price: Option<f64>,
    #[serde(default)]
    pub greeks: Option<RawGreeks>,
}

/// `get_volatility_index_data` result: rows of `[timestamp, open, high, low, close]`.
#[derive(Debug, Clone, Deserialize)]
pub struct RawVolatilityIndex {
    #[serde(default)]
    pub data: Vec<Vec<f64>>,
}

/// `get_tradingview_chart_data` result.
#[derive(Debug, Clone, Deserialize)]
pub struct RawChartData {
    #[serde(default)]
    pub ticks: Vec<i64>,
    #[serde(default)]
    pub close: Vec<f64>,
}

fn ms_to_date(ms: i64) -> Option<NaiveDate> {
    DateTime::from_timestamp_millis(ms).map(|d| d.date_naive())
}

/// Join instruments with their book summaries.
///
/// When the summary carries no delta, one is derived from the mark IV and the
/// underlying price so the ATM filter still has something to work with.
pub fn build_chain(
    instruments: &[RawInstrument],
    summaries: &[RawBookSummary],
    as_of: DateTime<Utc>,
) -> OptionChain {
    let pricer = BlackScholes::default();
    let by_name: HashMap<&str, &RawBookSummary> =
        summaries.iter().map(|s| (s.instrument_name.as_str(), s)).collect();

    let instruments: Vec<OptionInstrument> =
        instruments.iter().filter_map(RawInstrument::to_instrument).collect();

    let marks = instruments
        .iter()
        .filter_map(|inst| {
            let summary = by_name.get(inst.instrument_name.as_str())?;
            let quoted_delta = summary.greeks.as_ref().and_then(|g| g.delta);
            let delta = quoted_delta.or_else(|| {
                let iv = summary.mark_iv.filter(|v| *v > 0.0)?;
                let spot = summary.underlying_price?;
                let time = (inst.expiration_timestamp - as_of.timestamp_millis()) as f64
                    / MS_PER_DAY as f64
                    / 365.0;
                Some(pricer.delta(spot, inst.strike, time, iv / 100.0, inst.option_type))
            });
            Some(MarkData {
                instrument_name: inst.instrument_name.clone(),
                mark_iv: summary.mark_iv,
                delta,
            })
        })
        .collect();

    OptionChain {
        instruments,
        marks,
        as_of,
    }
}

/// DVOL rows to daily samples. The second column (open) is used as the day's IV.
pub fn volatility_index_to_series(raw: &RawVolatilityIndex) -> Vec<Sample> {
    raw.data
        .iter()
        .filter_map(|row| {
            let date = ms_to_date(*row.first()? as i64)?;
            Sample::new(date, *row.get(1)?).ok()
        })
        .collect()
}

/// Chart closes dated by their ticks.
pub fn chart_to_closes(raw: &RawChartData) -> SourceResult<Vec<Sample>> {
    if raw.ticks.len() != raw.close.len() {
        return Err(SourceError::InvalidResponse(format!(
            "{} ticks but {} closes",
            raw.ticks.len(),
            raw.close.len()
        )));
    }
    Ok(raw
        .ticks
        .iter()
        .zip(&raw.close)
        .filter_map(|(tick, close)| Sample::new(ms_to_date(*tick)?, *close).ok())
        .collect())
}

pub struct DeribitClient {
    http: RateLimitedClient,
}

impl DeribitClient {
    pub fn new(base_url: &str, min_interval: Duration) -> Self {
        Self {
            http: RateLimitedClient::new(base_url, min_interval),
        }
    }

    pub fn request_count(&self) -> u64 {
        self.http.request_count()
    }

    /// Live option instruments with their current marks.
    pub async fn option_chain(&mut self, currency: Currency) -> SourceResult<OptionChain> {
        let params = [
            ("currency", currency.as_str().to_string()),
            ("kind", "option".to_string()),
            ("expired", "false".to_string()),
        ];
        let instruments: ApiResponse<Vec<RawInstrument>> =
            self.http.get("get_instruments", &params, &[]).await?;

        let params = [
            ("currency", currency.as_str().to_string()),
            ("kind", "option".to_string()),
        ];
        let summaries: ApiResponse<Vec<RawBookSummary>> =
            self.http.get("get_book_summary_by_currency", &params, &[]).await?;

        debug!(
            instruments = instruments.result.len(),
            summaries = summaries.result.len(),
            "Deribit option chain"
        );
        Ok(build_chain(&instruments.result, &summaries.result, Utc::now()))
    }

    /// Daily DVOL over the last `days` days.
    pub async fn volatility_index(&mut self, currency: Currency, days: i64) -> SourceResult<Vec<Sample>> {
        let end = Utc::now().timestamp_millis();
        let params = [
            ("currency", currency.as_str().to_string()),
            ("resolution", "1D".to_string()),
            ("start_timestamp", (end - days * MS_PER_DAY).to_string()),
            ("end_timestamp", end.to_string()),
        ];
        let response: ApiResponse<RawVolatilityIndex> =
            self.http.get("get_volatility_index_data", &params, &[]).await?;
        Ok(volatility_index_to_series(&response.result))
    }

    /// Daily closes of the currency's perpetual over the last `days` days.
    pub async fn perpetual_closes(&mut self, currency: Currency, days: i64) -> SourceResult<Vec<Sample>> {
        let end = Utc::now().timestamp_millis();
        let params = [
            ("instrument_name", format!("{}-PERPETUAL", currency.as_str())),
            ("resolution", "1D".to_string()),
            ("start_timestamp", (end - days * MS_PER_DAY).to_string()),
            ("end_timestamp", end.to_string()),
        ];
        let response: ApiResponse<RawChartData> =
            self.http.get("get_tradingview_chart_data", &params, &[]).await?;
        chart_to_closes(&response.result)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    #[test]
    fn test_build_chain_joins_and_fills_delta() {
        let as_of = Utc.with_ymd_and_hms(2024, 6, 1, 8, 0, 0).unwrap();
        let expiry = as_of.timestamp_millis() + 30 * MS_PER_DAY;

        let json = format!(
            r#"{{"result": [
                {{"instrument_name": "ETH-1JUL24-3000-C", "expiration_timestamp": {e}, "strike": 3000.0, "option_type": "call"}},
                {{"instrument_name": "ETH-1JUL24-3000-P", "expiration_timestamp": {e}, "strike": 3000.0, "option_type": "put"}},
                {{"instrument_name": "ETH-1JUL24-3500-C", "expiration_timestamp": {e}, "strike": 3500.0, "option_type": "call"}},
                {{"instrument_name": "ETH-PERPETUAL", "expiration_timestamp": 32503680000000}}
            ]}}"#,
            e = expiry
        );
        let instruments: ApiResponse<Vec<RawInstrument>> = serde_json::from_str(&json).unwrap();

        let summaries: ApiResponse<Vec<RawBookSummary>> = serde_json::from_str(
            r#"{"result": [
                {"instrument_name": "ETH-1JUL24-3000-C", "mark_iv": 60.0, "underlying_price": 3000.0, "greeks": {"delta": 0.52}},
                {"instrument_name": "ETH-1JUL24-3000-P", "mark_iv": 61.0, "underlying_price": 3000.0}
            ]}"#,
        )
        .unwrap();

        let chain = build_chain(&instruments.result, &summaries.result, as_of);

        // The perpetual has no strike and is skipped.
        assert_eq!(chain.instruments.len(), 3);
        // The 3500 call has no summary.
        assert_eq!(chain.marks.len(), 2);
        assert_eq!(chain.marks[0].delta, Some(0.52));

        let put_delta = chain.marks[1].delta.unwrap();
        assert!(put_delta < -0.4 && put_delta > -0.5);
    }

    #[test]
    fn test_volatility_index_uses_open_column() {
        let raw: RawVolatilityIndex = serde_json::from_str(
            r#"{"data": [[1717200000000, 55.5, 57.0, 54.0, 56.0], [1717286400000, 56.0, 58.0, 55.0, 57.5], [1717372800000]], "continuation": null}"#,
        )
        .unwrap();
        let series = volatility_index_to_series(&raw);

        assert_eq!(series.len(), 2);
        assert_eq!(series[0].date, NaiveDate::from_ymd_opt(2024, 6, 1).unwrap());
        assert_eq!(series[0].value, 55.5);
    }

    #[test]
    fn test_chart_closes_dated_by_tick() {
        let raw = RawChartData {
            ticks: vec![1717200000000, 1717286400000],
            close: vec![3800.0, 3825.5],
        };
        let closes = chart_to_closes(&raw).unwrap();
        assert_eq!(closes[1].date, NaiveDate::from_ymd_opt(2024, 6, 2).unwrap());
        assert_eq!(closes[1].value, 3825.5);
    }

    #[test]
    fn test_chart_length_mismatch() {
        let raw = RawChartData {
            ticks: vec![1717200000000],
            close: vec![],
        };
        assert!(matches!(chart_to_closes(&raw), Err(SourceError::InvalidResponse(_))));
    }
}
