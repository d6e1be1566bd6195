//! CFTC Commitment of Traders client (public reporting, legacy futures only).

use std::time::Duration;

use chrono::NaiveDate;
use serde::Deserialize;

use super::source::{RateLimitedClient, SourceResult};
use super::types::{CotRecord, Positions};

/// Legacy futures-only report dataset.
pub const LEGACY_FUTURES_DATASET: &str = "6dca-aqww";

/// One report row; counts arrive as strings.
#[derive(Debug, Clone, Deserialize)]
pub struct RawCotRow {
    pub report_date_as_yyyy_mm_dd: String,
    #[serde(default)]
    pub contract_market_name: Option<String>,
    #[serde(default)]
    pub comm_positions_long_all: Option<String>,
    #[serde(default)]
    pub comm_positions_short_all: Option<String>,
    #[serde(default)]
    pub noncomm_positions_long_all: Option<String>,
    #[serde(default)]
    pub noncomm_positions_short_all: Option<String>,
    #[serde(default)]
    pub nonrept_positions_long_all: Option<String>,
    #[serde(default)]
    pub nonrept_positions_short_all: Option<String>,
}

/// Missing or unparsable counts read as zero.
fn count(field: &Option<String>) -> i64 {
    field
        .as_deref()
        .and_then(|s| s.trim().parse::<i64>().ok())
        .unwrap_or(0)
}

impl RawCotRow {
    /// `None` when the report date cannot be parsed.
    pub fn to_record(&self) -> Option<CotRecord> {
        // Dates come as `2024-06-11T00:00:00.000`.
        let date_part = self.report_date_as_yyyy_mm_dd.get(..10)?;
        let date = NaiveDate::parse_from_str(date_part, "%Y-%m-%d").ok()?;

        Some(CotRecord {
            date,
            commercial: Positions::new(
                count(&self.comm_positions_long_all),
                count(&self.comm_positions_short_all),
            ),
            large_spec: Positions::new(
                count(&self.noncomm_positions_long_all),
                count(&self.noncomm_positions_short_all),
            ),
            small_spec: Positions::new(
                count(&self.nonrept_positions_long_all),
                count(&self.nonrept_positions_short_all),
            ),
        })
    }
}

/// Convert newest-first rows into chronological records.
pub fn rows_to_records(rows: &[RawCotRow]) -> Vec<CotRecord> {
    let mut records: Vec<CotRecord> = rows.iter().filter_map(RawCotRow::to_record).collect();
    records.reverse();
    records
}

pub struct CftcClient {
    http: RateLimitedClient,
}

impl CftcClient {
    pub fn new(base_url: &str, min_interval: Duration) -> Self {
        Self {
            http: RateLimitedClient::new(base_url, min_interval),
        }
    }

    pub fn request_count(&self) -> u64 {
        self.http.request_count()
    }

    /// The latest `limit` weekly reports for a contract, oldest first.
    pub async fn legacy_futures(&mut self, contract_code: &str, limit: usize) -> SourceResult<Vec<CotRecord>> {
        let params = [
            ("cftc_contract_market_code", contract_code.to_string()),
            ("$limit", limit.to_string()),
            ("$order", "report_date_as_yyyy_mm_dd DESC".to_string()),
        ];
        let endpoint = format!("{}.json", LEGACY_FUTURES_DATASET);
        let rows: Vec<RawCotRow> = self.http.get(&endpoint, &params, &[]).await?;
        Ok(rows_to_records(&rows))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_rows_reversed_to_chronological() {
        let json = r#"[
            {
                "report_date_as_yyyy_mm_dd": "2024-06-11T00:00:00.000",
                "contract_market_name": "EURO FX",
                "comm_positions_long_all": "120",
                "comm_positions_short_all": "200",
                "noncomm_positions_long_all": "300",
                "noncomm_positions_short_all": "100",
                "nonrept_positions_long_all": "10",
                "nonrept_positions_short_all": "n/a"
            },
            {
                "report_date_as_yyyy_mm_dd": "2024-06-04T00:00:00.000",
                "comm_positions_long_all": "100"
            }
        ]"#;
        let rows: Vec<RawCotRow> = serde_json::from_str(json).unwrap();
        let records = rows_to_records(&rows);

        assert_eq!(records.len(), 2);
        assert_eq!(records[0].date, NaiveDate::from_ymd_opt(2024, 6, 4).unwrap());
        assert_eq!(records[0].commercial_net(), 100);
        assert_eq!(records[1].commercial_net(), -80);
        assert_eq!(records[1].large_spec_net(), 200);
        // Unparsable count reads as zero.
        assert_eq!(records[1].small_spec.short, 0);
    }

    #[test]
    fn test_bad_date_skipped() {
        let row = RawCotRow {
            report_date_as_yyyy_mm_dd: "soon".to_string(),
            contract_market_name: None,
            comm_positions_long_all: None,
            comm_positions_short_all: None,
            noncomm_positions_long_all: None,
            noncomm_positions_short_all: None,
            nonrept_positions_long_all: None,
            nonrept_positions_short_all: None,
        };
        assert!(row.to_record().is_none());
    }
}
