//! FRED (Federal Reserve Economic Data) client.
//!
//! Series used by the dashboard: VIXCLS, BAMLH0A0HYM2, BAMLC0A4CBBB, SP500,
//! DGS10. FRED reports missing observations as `"."`; those are dropped.

use std::time::Duration;

use chrono::NaiveDate;
use serde::Deserialize;
use tracing::{debug, warn};

use super::source::{RateLimitedClient, SourceResult};
use super::types::Sample;

/// `series/observations` response.
#[derive(Debug, Clone, Deserialize)]
pub struct ObservationsResponse {
    pub observations: Vec<RawObservation>,
}

/// One FRED observation; values arrive as strings.
#[derive(Debug, Clone, Deserialize)]
pub struct RawObservation {
    pub date: String,
    pub value: String,
}

impl RawObservation {
    /// `None` for missing (`"."`) or unparsable observations.
    pub fn to_sample(&self) -> Option<Sample> {
        if self.value == "." {
            return None;
        }
        let date = NaiveDate::parse_from_str(&self.date, "%Y-%m-%d").ok()?;
        let value: f64 = self.value.trim().parse().ok()?;
        Sample::new(date, value).ok()
    }
}

/// Convert observations, dropping missing values.
pub fn observations_to_series(observations: &[RawObservation]) -> Vec<Sample> {
    let series: Vec<Sample> = observations.iter().filter_map(RawObservation::to_sample).collect();
    let dropped = observations.len() - series.len();
    if dropped > 0 {
        debug!(dropped, "Dropped missing FRED observations");
    }
    series
}

pub struct FredClient {
    http: RateLimitedClient,
    api_key: String,
}

impl FredClient {
    pub fn new(base_url: &str, api_key: String, min_interval: Duration) -> Self {
        if api_key == "demo" {
            warn!("FRED_API_KEY not set, using the demo key");
        }
        Self {
            http: RateLimitedClient::new(base_url, min_interval),
            api_key,
        }
    }

    pub fn request_count(&self) -> u64 {
        self.http.request_count()
    }

    /// Daily observations of `series_id` from `start` on.
    pub async fn observations(&mut self, series_id: &str, start: NaiveDate) -> SourceResult<Vec<Sample>> {
        let params = [
            ("series_id", series_id.to_string()),
            ("observation_start", start.format("%Y-%m-%d").to_string()),
            ("frequency", "d".to_string()),
            ("api_key", self.api_key.clone()),
            ("file_type", "json".to_string()),
        ];
        let response: ObservationsResponse = self.http.get("series/observations", &params, &[]).await?;
        Ok(observations_to_series(&response.observations))
    }
}
