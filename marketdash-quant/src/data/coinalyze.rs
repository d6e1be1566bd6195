//! Coinalyze client for aggregated perpetual futures data.
//!
//! Free tier: 40 requests/minute. Every request needs an `api-key` header.

use std::time::Duration;

use chrono::{DateTime, NaiveDate, Utc};
use serde::de::DeserializeOwned;
use serde::Deserialize;

use super::source::{OpenInterestScope, RateLimitedClient, SourceError, SourceResult};
use super::types::{FundingObservation, LiquidationPoint, Sample};
use crate::analytics::daily_liquidations;

const SECS_PER_DAY: i64 = 24 * 60 * 60;

/// History of one symbol.
#[derive(Debug, Clone, Deserialize)]
pub struct RawSymbolHistory {
    pub symbol: String,
    #[serde(default)]
    pub history: Vec<RawHistoryPoint>,
}

/// One candle; `t` in seconds, `c` the close.
#[derive(Debug, Clone, Deserialize)]
pub struct RawHistoryPoint {
    pub t: i64,
    pub c: f64,
}

/// Liquidation history of one symbol.
#[derive(Debug, Clone, Deserialize)]
pub struct RawLiquidationHistory {
    pub symbol: String,
    #[serde(default)]
    pub history: Vec<RawLiquidationPoint>,
}

/// One day; `l` long and `s` short liquidations in USD. Missing sides read 0.
#[derive(Debug, Clone, Deserialize)]
pub struct RawLiquidationPoint {
    pub t: i64,
    #[serde(default, alias = "long_liquidations_usd")]
    pub l: Option<f64>,
    #[serde(default, alias = "short_liquidations_usd")]
    pub s: Option<f64>,
}

fn secs_to_date(secs: i64) -> Option<NaiveDate> {
    DateTime::from_timestamp(secs, 0).map(|d| d.date_naive())
}

/// Closes of every returned symbol, concatenated in response order.
pub fn history_to_series(raw: &[RawSymbolHistory]) -> Vec<Sample> {
    raw.iter()
        .flat_map(|h| h.history.iter())
        .filter_map(|p| Sample::new(secs_to_date(p.t)?, p.c).ok())
        .collect()
}

/// Funding candles to observations tagged with their symbol.
pub fn history_to_funding(raw: &[RawSymbolHistory]) -> Vec<FundingObservation> {
    let mut out: Vec<FundingObservation> = raw
        .iter()
        .flat_map(|h| {
            h.history.iter().filter_map(move |p| {
                let date = secs_to_date(p.t)?;
                p.c.is_finite().then(|| FundingObservation {
                    date,
                    symbol: h.symbol.clone(),
                    rate: p.c,
                })
            })
        })
        .collect();
    out.sort_by_key(|o| o.date);
    out
}

/// Liquidations of every returned symbol summed per day.
pub fn history_to_liquidations(raw: &[RawLiquidationHistory]) -> Vec<LiquidationPoint> {
    let points: Vec<LiquidationPoint> = raw
        .iter()
        .flat_map(|h| h.history.iter())
        .filter_map(|p| {
            let long = p.l.filter(|v| v.is_finite()).unwrap_or(0.0);
            let short = p.s.filter(|v| v.is_finite()).unwrap_or(0.0);
            Some(LiquidationPoint::new(secs_to_date(p.t)?, long, short))
        })
        .collect();
    daily_liquidations(&points)
}

pub struct CoinalyzeClient {
    http: RateLimitedClient,
    api_key: Option<String>,
}

impl CoinalyzeClient {
    pub fn new(base_url: &str, api_key: Option<String>, min_interval: Duration) -> Self {
        Self {
            http: RateLimitedClient::new(base_url, min_interval),
            api_key,
        }
    }

    pub fn request_count(&self) -> u64 {
        self.http.request_count()
    }

    async fn history<T: DeserializeOwned>(
        &mut self,
        endpoint: &str,
        symbols: Option<String>,
        interval: &str,
        days: i64,
    ) -> SourceResult<Vec<T>> {
        let api_key = self
            .api_key
            .clone()
            .ok_or(SourceError::MissingCredentials("COINALYZE_API_KEY"))?;

        let to = Utc::now().timestamp();
        let mut params = vec![
            ("from", (to - days * SECS_PER_DAY).to_string()),
            ("to", to.to_string()),
            ("interval", interval.to_string()),
        ];
        if let Some(symbols) = symbols {
            params.push(("symbols", symbols));
        }

        self.http
            .get(endpoint, &params, &[("api-key", api_key.as_str())])
            .await
    }

    /// Daily open interest in USD.
    pub async fn open_interest(&mut self, scope: OpenInterestScope, days: i64) -> SourceResult<Vec<Sample>> {
        let raw: Vec<RawSymbolHistory> = match scope {
            OpenInterestScope::Btc => {
                self.history("open-interest-history", Some("BTCUSDT".into()), "1d", days).await?
            }
            OpenInterestScope::Eth => {
                self.history("open-interest-history", Some("ETHUSDT".into()), "1d", days).await?
            }
            OpenInterestScope::Aggregate => {
                self.history("aggregate-open-interest", None, "1d", days).await?
            }
        };
        Ok(history_to_series(&raw))
    }

    /// 8-hourly funding prints for `symbols` (base names, e.g. `BTC`).
    pub async fn funding_history(&mut self, symbols: &[String], days: i64) -> SourceResult<Vec<FundingObservation>> {
        let joined = symbols
            .iter()
            .map(|s| format!("{}USDT", s))
            .collect::<Vec<_>>()
            .join(",");
        let raw: Vec<RawSymbolHistory> = self.history("funding-rate-history", Some(joined), "8h", days).await?;
        Ok(history_to_funding(&raw))
    }

    /// Daily long and short liquidations across all perpetuals.
    pub async fn liquidations(&mut self, days: i64) -> SourceResult<Vec<LiquidationPoint>> {
        let raw: Vec<RawLiquidationHistory> = self.history("liquidations-history", None, "1d", days).await?;
        Ok(history_to_liquidations(&raw))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const JSON: &str = r#"[
        {"symbol": "BTCUSDT", "history": [
            {"t": 1717200000, "o": 1.0, "h": 1.0, "l": 1.0, "c": 0.0001},
            {"t": 1717286400, "o": 1.0, "h": 1.0, "l": 1.0, "c": 0.0002}
        ]},
        {"symbol": "ETHUSDT", "history": [
            {"t": 1717200000, "o": 1.0, "h": 1.0, "l": 1.0, "c": -0.0003}
        ]}
    ]"#;

    #[test]
    fn test_funding_sorted_by_date() {
        let raw: Vec<RawSymbolHistory> = serde_json::from_str(JSON).unwrap();
        let prints = history_to_funding(&raw);

        assert_eq!(prints.len(), 3);
        assert_eq!(prints[0].symbol, "BTCUSDT");
        assert_eq!(prints[1].symbol, "ETHUSDT");
        assert_eq!(prints[2].date, NaiveDate::from_ymd_opt(2024, 6, 2).unwrap());
    }

    #[test]
    fn test_history_to_series() {
        let raw: Vec<RawSymbolHistory> = serde_json::from_str(JSON).unwrap();
        let series = history_to_series(&raw[..1]);
        assert_eq!(series.len(), 2);
        assert_eq!(series[0].date, NaiveDate::from_ymd_opt(2024, 6, 1).unwrap());
    }

    #[test]
    fn test_liquidations_missing_sides_read_zero() {
        let json = r#"[
            {"symbol": "BTCUSDT", "history": [
                {"t": 1717200000, "l": 1500000.0, "s": 500000.0},
                {"t": 1717286400, "l": 200000.0}
            ]},
            {"symbol": "ETHUSDT", "history": [
                {"t": 1717200000, "short_liquidations_usd": 250000.0}
            ]}
        ]"#;
        let raw: Vec<RawLiquidationHistory> = serde_json::from_str(json).unwrap();
        let points = history_to_liquidations(&raw);

        assert_eq!(points.len(), 2);
        assert_eq!(points[0].date, NaiveDate::from_ymd_opt(2024, 6, 1).unwrap());
        assert_eq!(points[0].long, 1_500_000.0);
        assert_eq!(points[0].short, 750_000.0);
        assert_eq!(points[0].total, 2_250_000.0);
        assert_eq!(points[1].short, 0.0);
        assert_eq!(points[1].total, 200_000.0);
    }

    #[tokio::test]
    async fn test_missing_key_fails_before_request() {
        let mut client = CoinalyzeClient::new("http://127.0.0.1:9", None, Duration::from_millis(0));
        let err = client.open_interest(OpenInterestScope::Btc, 30).await.unwrap_err();
        assert!(matches!(err, SourceError::MissingCredentials("COINALYZE_API_KEY")));
        assert_eq!(client.request_count(), 0);
    }
}
