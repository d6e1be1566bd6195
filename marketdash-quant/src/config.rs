//! Configuration for transforms and data sources.
//!
//! Every field has a default, so a config file only needs the values it
//! overrides. API keys are never read from the file; they come from the
//! environment (`FRED_API_KEY`, `COINALYZE_API_KEY`).

use std::fs;
use std::path::Path;

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::analytics::{
    TermStructureConfig, DEFAULT_COMPOSITE_LOOKBACK, DEFAULT_COT_LOOKBACK_WEEKS,
    DEFAULT_RV_WINDOW, DEFAULT_ZSCORE_LOOKBACK,
};
use crate::validation::SeriesValidatorConfig;

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Parse error: {0}")]
    Parse(#[from] serde_json::Error),

    #[error("Invalid config: {0}")]
    Invalid(String),
}

/// Transform parameters.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct TransformConfig {
    /// Z-score lookback for daily macro series (VIX, credit spreads).
    pub zscore_lookback: usize,
    /// Z-score lookback for crypto open interest and skew.
    pub crypto_zscore_lookback: usize,
    /// COT index window in weekly reports.
    pub cot_lookback_weeks: usize,
    /// Realized volatility window in daily returns.
    pub rv_window: usize,
    /// Momentum composite lookback in samples.
    pub composite_lookback: usize,
    pub term_structure: TermStructureConfig,
    pub validation: SeriesValidatorConfig,
}

impl Default for TransformConfig {
    fn default() -> Self {
        Self {
            zscore_lookback: DEFAULT_ZSCORE_LOOKBACK,
            crypto_zscore_lookback: 30,
            cot_lookback_weeks: DEFAULT_COT_LOOKBACK_WEEKS,
            rv_window: DEFAULT_RV_WINDOW,
            composite_lookback: DEFAULT_COMPOSITE_LOOKBACK,
            term_structure: TermStructureConfig::default(),
            validation: SeriesValidatorConfig::default(),
        }
    }
}

/// Data source parameters.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct SourceConfig {
    /// First observation date requested from FRED.
    pub history_start: NaiveDate,
    /// Days of daily history requested from Deribit and Coinalyze.
    pub history_days: i64,
    /// Weekly COT reports requested per contract.
    pub cot_reports: usize,
    /// Seed of the synthetic generator.
    pub seed: u64,
    /// Fall back to synthetic data when a live request fails.
    pub synthetic_fallback: bool,
    /// Minimum delay between two requests of one client, in milliseconds.
    pub min_request_interval_ms: u64,
    pub fred_base_url: String,
    pub cftc_base_url: String,
    pub deribit_base_url: String,
    pub coinalyze_base_url: String,
}

impl Default for SourceConfig {
    fn default() -> Self {
        Self {
            history_start: NaiveDate::from_ymd_opt(2020, 1, 1).unwrap_or_default(),
            history_days: 365,
            cot_reports: 156,
            seed: 42,
            synthetic_fallback: true,
            min_request_interval_ms: 100,
            fred_base_url: "https://api.stlouisfed.org/fred".to_string(),
            cftc_base_url: "https://publicreporting.cftc.gov/resource".to_string(),
            deribit_base_url: "https://www.deribit.com/api/v2/public".to_string(),
            coinalyze_base_url: "https://api.coinalyze.net/v1".to_string(),
        }
    }
}

/// Top-level configuration.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct MarketdashConfig {
    pub transforms: TransformConfig,
    pub sources: SourceConfig,
}

impl MarketdashConfig {
    /// Load a JSON config file, filling unset fields with defaults.
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        let content = fs::read_to_string(path)?;
        Self::from_json(&content)
    }

    pub fn from_json(content: &str) -> Result<Self, ConfigError> {
        let config: Self = serde_json::from_str(content)?;
        config.validate()?;
        Ok(config)
    }

    /// Reject values the transforms treat as contract violations.
    pub fn validate(&self) -> Result<(), ConfigError> {
        let t = &self.transforms;
        let lookbacks = [
            ("zscore_lookback", t.zscore_lookback),
            ("crypto_zscore_lookback", t.crypto_zscore_lookback),
            ("cot_lookback_weeks", t.cot_lookback_weeks),
            ("rv_window", t.rv_window),
            ("composite_lookback", t.composite_lookback),
        ];
        if let Some((name, _)) = lookbacks.iter().find(|(_, v)| *v == 0) {
            return Err(ConfigError::Invalid(format!("{} must be positive", name)));
        }
        if t.term_structure.max_tenor_days <= 0 {
            return Err(ConfigError::Invalid("max_tenor_days must be positive".to_string()));
        }
        if self.sources.history_days <= 0 {
            return Err(ConfigError::Invalid("history_days must be positive".to_string()));
        }
        Ok(())
    }
}
