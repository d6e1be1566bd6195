//! Data sources feeding the transforms.
//!
//! A [`DataSource`] is either `Live` (public REST APIs) or `Synthetic`
//! (seeded pseudo-random generators). Both return the same record types, so
//! the transforms never know which one produced their input.

use std::time::{Duration, Instant};

use chrono::{DateTime, Utc};
use reqwest::Client;
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::debug;

use super::cftc::CftcClient;
use super::coinalyze::CoinalyzeClient;
use super::deribit::DeribitClient;
use super::fred::FredClient;
use super::synthetic::SyntheticSource;
use super::types::{
    CotRecord, FundingObservation, LiquidationPoint, MarkData, OptionInstrument, Sample,
};
use crate::config::SourceConfig;

/// Data source errors.
#[derive(Error, Debug)]
pub enum SourceError {
    #[error("HTTP request failed: {0}")]
    Http(#[from] reqwest::Error),

    #[error("Rate limit exceeded")]
    RateLimitExceeded,

    #[error("API error: {0}")]
    Api(String),

    #[error("Invalid response format: {0}")]
    InvalidResponse(String),

    #[error("Missing credentials: set {0}")]
    MissingCredentials(&'static str),
}

pub type SourceResult<T> = Result<T, SourceError>;

/// Daily macro series published by FRED.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum MacroSeries {
    /// CBOE Volatility Index.
    Vix,
    /// ICE BofA US High Yield option-adjusted spread.
    HighYield,
    /// ICE BofA BBB (investment grade) option-adjusted spread.
    InvestmentGrade,
    /// S&P 500 index level.
    Sp500,
    /// 10-year Treasury constant maturity rate.
    Treasury10y,
}

impl MacroSeries {
    pub fn fred_id(&self) -> &'static str {
        match self {
            Self::Vix => "VIXCLS",
            Self::HighYield => "BAMLH0A0HYM2",
            Self::InvestmentGrade => "BAMLC0A4CBBB",
            Self::Sp500 => "SP500",
            Self::Treasury10y => "DGS10",
        }
    }
}

/// Futures contracts covered by the COT dashboard.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum CotContract {
    Eur,
    Gbp,
    Jpy,
    Chf,
    Cad,
    Aud,
    Gold,
    Silver,
    CrudeOil,
    NaturalGas,
    Sp500,
    Nasdaq,
    Vix,
    Treasury10y,
    Treasury2y,
}

impl CotContract {
    pub const CURRENCIES: [CotContract; 6] = [
        Self::Eur,
        Self::Gbp,
        Self::Jpy,
        Self::Chf,
        Self::Cad,
        Self::Aud,
    ];

    pub const ALL: [CotContract; 15] = [
        Self::Eur,
        Self::Gbp,
        Self::Jpy,
        Self::Chf,
        Self::Cad,
        Self::Aud,
        Self::Gold,
        Self::Silver,
        Self::CrudeOil,
        Self::NaturalGas,
        Self::Sp500,
        Self::Nasdaq,
        Self::Vix,
        Self::Treasury10y,
        Self::Treasury2y,
    ];

    /// Look a contract up by its name, case-insensitively.
    pub fn from_name(name: &str) -> Option<Self> {
        Self::ALL
            .into_iter()
            .find(|c| c.name().eq_ignore_ascii_case(name.trim()))
    }

    /// CFTC contract market code.
    pub fn code(&self) -> &'static str {
        match self {
            Self::Eur => "099741",
            Self::Gbp => "096742",
            Self::Jpy => "097741",
            Self::Chf => "092741",
            Self::Cad => "090741",
            Self::Aud => "232741",
            Self::Gold => "088691",
            Self::Silver => "084691",
            Self::CrudeOil => "067651",
            Self::NaturalGas => "023651",
            Self::Sp500 => "13874A",
            Self::Nasdaq => "20974P",
            Self::Vix => "1170E1",
            Self::Treasury10y => "043602",
            Self::Treasury2y => "042601",
        }
    }

    pub fn name(&self) -> &'static str {
        match self {
            Self::Eur => "EUR",
            Self::Gbp => "GBP",
            Self::Jpy => "JPY",
            Self::Chf => "CHF",
            Self::Cad => "CAD",
            Self::Aud => "AUD",
            Self::Gold => "GOLD",
            Self::Silver => "SILVER",
            Self::CrudeOil => "CRUDE_OIL",
            Self::NaturalGas => "NATURAL_GAS",
            Self::Sp500 => "SP500",
            Self::Nasdaq => "NASDAQ",
            Self::Vix => "VIX",
            Self::Treasury10y => "TREASURY_10Y",
            Self::Treasury2y => "TREASURY_2Y",
        }
    }
}

/// Underlying of the options dashboard.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
pub enum Currency {
    Btc,
    #[default]
    Eth,
}

impl Currency {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Btc => "BTC",
            Self::Eth => "ETH",
        }
    }
}

/// Which open interest history to request.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum OpenInterestScope {
    Btc,
    Eth,
    /// All tracked perpetuals combined.
    Aggregate,
}

/// Listed options with their marks.
#[derive(Debug, Clone, Default)]
pub struct OptionChain {
    pub instruments: Vec<OptionInstrument>,
    pub marks: Vec<MarkData>,
    /// When the marks were taken.
    pub as_of: DateTime<Utc>,
}

/// Perpetual symbols of the crypto funding heatmap.
pub const CRYPTO_SYMBOLS: &[&str] = &[
    "BTC", "ETH", "SOL", "XRP", "HYPE", "BNB", "ZEC", "DOGE", "BCH", "SUI", "ADA", "ASTER", "LINK",
    "ENA", "LTC", "AVAX", "UNI", "TRX", "AAVE", "NEAR", "TRUMP", "PAXG", "FIL", "WLFI", "APT",
];

/// Rate-limited JSON GET helper shared by the live clients.
pub(crate) struct RateLimitedClient {
    client: Client,
    base_url: String,
    min_interval: Duration,
    last_request: Option<Instant>,
    request_count: u64,
}

impl RateLimitedClient {
    pub(crate) fn new(base_url: &str, min_interval: Duration) -> Self {
        Self {
            client: Client::new(),
            base_url: base_url.trim_end_matches('/').to_string(),
            min_interval,
            last_request: None,
            request_count: 0,
        }
    }

    /// Time left before the next request may go out. Zero before the first one.
    fn pending_delay(&self) -> Duration {
        self.last_request
            .map(|at| self.min_interval.saturating_sub(at.elapsed()))
            .unwrap_or(Duration::ZERO)
    }

    pub(crate) async fn get<T: DeserializeOwned>(
        &mut self,
        endpoint: &str,
        params: &[(&str, String)],
        headers: &[(&str, &str)],
    ) -> SourceResult<T> {
        let delay = self.pending_delay();
        if !delay.is_zero() {
            tokio::time::sleep(delay).await;
        }

        let url = format!("{}/{}", self.base_url, endpoint.trim_start_matches('/'));
        debug!(url = %url, "GET");

        let mut request = self.client.get(&url).query(params);
        for (name, value) in headers {
            request = request.header(*name, *value);
        }
        let response = request.send().await?;

        self.last_request = Some(Instant::now());
        self.request_count += 1;

        if response.status() == reqwest::StatusCode::TOO_MANY_REQUESTS {
            return Err(SourceError::RateLimitExceeded);
        }

        if !response.status().is_success() {
            let status = response.status();
            let text = response.text().await.unwrap_or_default();
            return Err(SourceError::Api(format!("{}: {}", status, text)));
        }

        response
            .json()
            .await
            .map_err(|e| SourceError::InvalidResponse(format!("Failed to parse response: {}", e)))
    }

    pub(crate) fn request_count(&self) -> u64 {
        self.request_count
    }
}

/// Public REST APIs.
pub struct LiveSource {
    fred: FredClient,
    cftc: CftcClient,
    deribit: DeribitClient,
    coinalyze: CoinalyzeClient,
    config: SourceConfig,
}

impl LiveSource {
    /// Build the live clients; API keys come from the environment.
    pub fn new(config: SourceConfig) -> Self {
        let interval = Duration::from_millis(config.min_request_interval_ms);
        Self {
            fred: FredClient::new(
                &config.fred_base_url,
                std::env::var("FRED_API_KEY").unwrap_or_else(|_| "demo".to_string()),
                interval,
            ),
            cftc: CftcClient::new(&config.cftc_base_url, interval),
            deribit: DeribitClient::new(&config.deribit_base_url, interval),
            coinalyze: CoinalyzeClient::new(
                &config.coinalyze_base_url,
                std::env::var("COINALYZE_API_KEY").ok(),
                interval,
            ),
            config,
        }
    }

    /// Requests sent so far across all clients.
    pub fn request_count(&self) -> u64 {
        self.fred.request_count()
            + self.cftc.request_count()
            + self.deribit.request_count()
            + self.coinalyze.request_count()
    }
}

/// Where input series come from.
pub enum DataSource {
    Live(LiveSource),
    Synthetic(SyntheticSource),
}

impl DataSource {
    pub fn is_live(&self) -> bool {
        matches!(self, Self::Live(_))
    }

    pub async fn macro_series(&mut self, series: MacroSeries) -> SourceResult<Vec<Sample>> {
        match self {
            Self::Live(live) => {
                let start = live.config.history_start;
                live.fred.observations(series.fred_id(), start).await
            }
            Self::Synthetic(synthetic) => Ok(synthetic.macro_series(series)),
        }
    }

    pub async fn cot_reports(&mut self, contract: CotContract) -> SourceResult<Vec<CotRecord>> {
        match self {
            Self::Live(live) => {
                let limit = live.config.cot_reports;
                live.cftc.legacy_futures(contract.code(), limit).await
            }
            Self::Synthetic(synthetic) => Ok(synthetic.cot_reports(contract)),
        }
    }

    pub async fn option_chain(&mut self, currency: Currency) -> SourceResult<OptionChain> {
        match self {
            Self::Live(live) => live.deribit.option_chain(currency).await,
            Self::Synthetic(synthetic) => Ok(synthetic.option_chain(currency)),
        }
    }

    /// Daily implied volatility index (DVOL) in percent.
    pub async fn iv_index(&mut self, currency: Currency) -> SourceResult<Vec<Sample>> {
        match self {
            Self::Live(live) => {
                let days = live.config.history_days;
                live.deribit.volatility_index(currency, days).await
            }
            Self::Synthetic(synthetic) => Ok(synthetic.iv_index(currency)),
        }
    }

    /// Daily perpetual closes, with enough extra history to seed realized volatility.
    pub async fn perpetual_closes(&mut self, currency: Currency, extra_days: i64) -> SourceResult<Vec<Sample>> {
        match self {
            Self::Live(live) => {
                let days = live.config.history_days + extra_days;
                live.deribit.perpetual_closes(currency, days).await
            }
            Self::Synthetic(synthetic) => Ok(synthetic.perpetual_closes(currency, extra_days)),
        }
    }

    pub async fn open_interest(&mut self, scope: OpenInterestScope) -> SourceResult<Vec<Sample>> {
        match self {
            Self::Live(live) => {
                let days = live.config.history_days;
                live.coinalyze.open_interest(scope, days).await
            }
            Self::Synthetic(synthetic) => Ok(synthetic.open_interest(scope)),
        }
    }

    /// Daily liquidations over the configured history window.
    pub async fn liquidations(&mut self) -> SourceResult<Vec<LiquidationPoint>> {
        match self {
            Self::Live(live) => {
                let days = live.config.history_days;
                live.coinalyze.liquidations(days).await
            }
            Self::Synthetic(synthetic) => Ok(synthetic.liquidations()),
        }
    }

    pub async fn funding_history(&mut self, symbols: &[String], days: i64) -> SourceResult<Vec<FundingObservation>> {
        match self {
            Self::Live(live) => live.coinalyze.funding_history(symbols, days).await,
            Self::Synthetic(synthetic) => Ok(synthetic.funding_history(symbols, days)),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_fred_ids() {
        assert_eq!(MacroSeries::Vix.fred_id(), "VIXCLS");
        assert_eq!(MacroSeries::HighYield.fred_id(), "BAMLH0A0HYM2");
        assert_eq!(MacroSeries::InvestmentGrade.fred_id(), "BAMLC0A4CBBB");
    }

    #[test]
    fn test_cot_contract_codes() {
        assert_eq!(CotContract::Eur.code(), "099741");
        assert_eq!(CotContract::Sp500.code(), "13874A");
        assert_eq!(CotContract::CURRENCIES.len(), 6);
        assert_eq!(CotContract::CrudeOil.name(), "CRUDE_OIL");
        assert_eq!(CotContract::from_name("crude_oil"), Some(CotContract::CrudeOil));
        assert_eq!(CotContract::from_name("NZD"), None);
    }

    #[test]
    fn test_rate_limit_delay() {
        // Longer than the process has been running.
        let mut client = RateLimitedClient::new("http://localhost/", Duration::from_secs(u64::MAX / 4));
        assert_eq!(client.pending_delay(), Duration::ZERO);

        client.last_request = Some(Instant::now());
        assert!(client.pending_delay() > Duration::from_secs(3600));
    }

    #[tokio::test]
    async fn test_synthetic_variant_dispatch() {
        let mut source = DataSource::Synthetic(SyntheticSource::new(SourceConfig::default()));
        assert!(!source.is_live());

        let vix = source.macro_series(MacroSeries::Vix).await.unwrap();
        assert!(!vix.is_empty());

        let cot = source.cot_reports(CotContract::Eur).await.unwrap();
        assert_eq!(cot.len(), SourceConfig::default().cot_reports);
    }
}
