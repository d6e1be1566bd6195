//! Panel assembly.
//!
//! Fetches the raw series for each dashboard panel from a [`DataSource`],
//! checks them, and runs the transforms. When the source is live and the
//! synthetic fallback is enabled, a failed request is logged and replaced by
//! the synthetic series of the same kind.

pub mod panels;

use std::collections::HashMap;

use chrono::Duration;
use thiserror::Error;
use tracing::{info, warn};

use crate::analytics::{
    cot_index, cot_index_many, credit_spread, funding_heatmap, global_open_interest,
    momentum_composite, realized_volatility, rebase_performance, variance_risk_premium, z_score,
    TermStructureAggregator,
};
use crate::config::{MarketdashConfig, TransformConfig};
use crate::data::{
    CotContract, CotRecord, Currency, DataSource, MacroSeries, OpenInterestScope, Sample,
    SourceError, SourceResult, SyntheticSource, CRYPTO_SYMBOLS,
};
use crate::error::TransformError;
use crate::validation::{SeriesReport, SeriesValidator};

pub use panels::{
    CotPanel, CryptoPanel, DashboardSnapshot, Indicator, OptionsPanel, TraditionalPanel,
};

/// Days of funding history in the heatmap.
pub const FUNDING_DAYS: i64 = 30;

#[derive(Error, Debug)]
pub enum DashboardError {
    #[error("Failed to fetch {what}: {source}")]
    Source {
        what: String,
        #[source]
        source: SourceError,
    },

    #[error("Transform error: {0}")]
    Transform(#[from] TransformError),
}

/// Builds panels from a data source.
pub struct Dashboard {
    source: DataSource,
    fallback: Option<SyntheticSource>,
    transforms: TransformConfig,
    history_days: i64,
    aggregator: TermStructureAggregator,
    validator: SeriesValidator,
}

impl Dashboard {
    pub fn new(source: DataSource, config: &MarketdashConfig) -> Self {
        let fallback = (source.is_live() && config.sources.synthetic_fallback)
            .then(|| SyntheticSource::new(config.sources.clone()));

        Self {
            source,
            fallback,
            transforms: config.transforms.clone(),
            history_days: config.sources.history_days,
            aggregator: TermStructureAggregator::new(config.transforms.term_structure.clone()),
            validator: SeriesValidator::new(config.transforms.validation.clone()),
        }
    }

    /// Pass a live result through, or substitute synthetic data on failure.
    fn recover<T>(
        &self,
        what: &str,
        result: SourceResult<T>,
        synthetic: impl FnOnce(&SyntheticSource) -> T,
    ) -> Result<T, DashboardError> {
        match result {
            Ok(value) => Ok(value),
            Err(err) => match &self.fallback {
                Some(fallback) => {
                    warn!(what, error = %err, "Live source failed, using synthetic data");
                    Ok(synthetic(fallback))
                }
                None => Err(DashboardError::Source {
                    what: what.to_string(),
                    source: err,
                }),
            },
        }
    }

    fn check(&self, name: &str, series: &[Sample]) -> SeriesReport {
        let report = self.validator.validate(name, series);
        if !report.all_passed() {
            for failed in report.failed_checks() {
                warn!(
                    series = name,
                    check = %failed.name,
                    details = failed.details.as_deref().unwrap_or(""),
                    "{}",
                    failed.message
                );
            }
        }
        report
    }

    /// Checks the commercial net series, where CFTC duplicates and reorderings show up.
    fn check_cot(&self, name: &str, reports: &[CotRecord]) -> SeriesReport {
        let nets: Vec<Sample> = reports
            .iter()
            .map(|r| Sample {
                date: r.date,
                value: r.commercial_net() as f64,
            })
            .collect();
        self.check(name, &nets)
    }

    async fn macro_series(&mut self, series: MacroSeries) -> Result<Vec<Sample>, DashboardError> {
        let result = self.source.macro_series(series).await;
        self.recover(series.fred_id(), result, |s| s.macro_series(series))
    }

    /// VIX, credit spreads, S&P 500 and the 10-year yield.
    pub async fn traditional(&mut self) -> Result<TraditionalPanel, DashboardError> {
        let vix = self.macro_series(MacroSeries::Vix).await?;
        let hy = self.macro_series(MacroSeries::HighYield).await?;
        let ig = self.macro_series(MacroSeries::InvestmentGrade).await?;
        let sp500 = self.macro_series(MacroSeries::Sp500).await?;
        let treasury_10y = self.macro_series(MacroSeries::Treasury10y).await?;

        let checks = vec![
            self.check("VIX", &vix),
            self.check("HY", &hy),
            self.check("IG", &ig),
            self.check("SP500", &sp500),
            self.check("DGS10", &treasury_10y),
        ];

        let lookback = self.transforms.zscore_lookback;
        let vix_zscore = z_score(&vix, lookback);
        let vix_indicator = Indicator::from_series(&vix, &vix_zscore)?;

        let credit = credit_spread(&hy, &ig);
        let spreads: Vec<Sample> = credit
            .iter()
            .map(|c| Sample { date: c.date, value: c.spread })
            .collect();
        let credit_zscore = z_score(&spreads, lookback);
        let credit_indicator = Indicator::from_series(&spreads, &credit_zscore)?;

        let sp500_performance = match sp500.last() {
            Some(last) => rebase_performance(&sp500, last.date - Duration::days(self.history_days))?,
            None => Vec::new(),
        };
        let sp500 = momentum_composite(&sp500, self.transforms.composite_lookback);

        info!(
            vix = vix.len(),
            credit = credit.len(),
            sp500 = sp500.len(),
            "Traditional panel assembled"
        );

        Ok(TraditionalPanel {
            vix,
            vix_zscore,
            vix_indicator,
            credit,
            credit_zscore,
            credit_indicator,
            sp500,
            sp500_performance,
            treasury_10y,
            checks,
        })
    }

    /// Term structure, variance risk premium and DVOL for one currency.
    pub async fn options(&mut self, currency: Currency) -> Result<OptionsPanel, DashboardError> {
        let result = self.source.option_chain(currency).await;
        let chain = self.recover("option chain", result, |s| s.option_chain(currency))?;

        let result = self.source.iv_index(currency).await;
        let iv_index = self.recover("volatility index", result, |s| s.iv_index(currency))?;

        // Extra days so the first RV value lines up with the start of the IV history.
        let extra = self.transforms.rv_window as i64;
        let result = self.source.perpetual_closes(currency, extra).await;
        let closes = self.recover("perpetual closes", result, |s| s.perpetual_closes(currency, extra))?;

        let checks = vec![
            self.check("DVOL", &iv_index),
            self.check("PERPETUAL", &closes),
        ];

        let term_structure = self.aggregator.aggregate(&chain.instruments, &chain.marks, chain.as_of);
        let regime = self.aggregator.classify(&term_structure);
        let rv = realized_volatility(&closes, self.transforms.rv_window);
        let vrp = variance_risk_premium(&iv_index, &rv);

        info!(
            currency = currency.as_str(),
            tenors = term_structure.len(),
            vrp = vrp.len(),
            ?regime,
            "Options panel assembled"
        );

        Ok(OptionsPanel::summarize(
            currency.as_str(),
            term_structure,
            regime,
            vrp,
            &iv_index,
            checks,
        ))
    }

    /// COT reports and index for `headline`, plus the index of every contract in `tracked`.
    pub async fn cot(
        &mut self,
        headline: CotContract,
        tracked: &[CotContract],
    ) -> Result<CotPanel, DashboardError> {
        let mut reports: HashMap<String, _> = HashMap::with_capacity(tracked.len() + 1);
        let mut checks = Vec::with_capacity(tracked.len() + 1);
        for contract in std::iter::once(&headline).chain(tracked) {
            if reports.contains_key(contract.name()) {
                continue;
            }
            let contract = *contract;
            let result = self.source.cot_reports(contract).await;
            let records = self.recover(contract.name(), result, |s| s.cot_reports(contract))?;
            checks.push(self.check_cot(contract.name(), &records));
            reports.insert(contract.name().to_string(), records);
        }

        let lookback = self.transforms.cot_lookback_weeks;
        let headline_reports = reports.remove(headline.name()).unwrap_or_default();
        let index = cot_index(&headline_reports, lookback);

        let mut contracts: std::collections::BTreeMap<String, _> =
            cot_index_many(&reports, lookback).into_iter().collect();
        if tracked.contains(&headline) {
            contracts.insert(headline.name().to_string(), index.clone());
        }

        info!(
            contract = headline.name(),
            reports = headline_reports.len(),
            tracked = contracts.len(),
            "COT panel assembled"
        );

        Ok(CotPanel {
            contract: headline.name().to_string(),
            reports: headline_reports,
            index,
            contracts,
            checks,
        })
    }

    /// Global open interest, liquidations and the funding heatmap.
    pub async fn crypto(&mut self) -> Result<CryptoPanel, DashboardError> {
        let mut legs = Vec::with_capacity(3);
        let mut checks = Vec::with_capacity(4);
        for (scope, name) in [
            (OpenInterestScope::Btc, "OI_BTC"),
            (OpenInterestScope::Eth, "OI_ETH"),
            (OpenInterestScope::Aggregate, "OI_AGGREGATE"),
        ] {
            let result = self.source.open_interest(scope).await;
            let leg = self.recover("open interest", result, |s| s.open_interest(scope))?;
            checks.push(self.check(name, &leg));
            legs.push(leg);
        }
        let global_oi = global_open_interest(&legs[0], &legs[1], &legs[2]);

        let result = self.source.liquidations().await;
        let liquidations = self.recover("liquidations", result, |s| s.liquidations())?;
        let liquidation_totals: Vec<Sample> = liquidations
            .iter()
            .map(|l| Sample { date: l.date, value: l.total })
            .collect();
        checks.push(self.check("LIQUIDATIONS", &liquidation_totals));

        let symbols: Vec<String> = CRYPTO_SYMBOLS.iter().map(|s| s.to_string()).collect();
        let result = self.source.funding_history(&symbols, FUNDING_DAYS).await;
        let prints = self.recover("funding history", result, |s| {
            s.funding_history(&symbols, FUNDING_DAYS)
        })?;
        let funding = funding_heatmap(&prints, &symbols);

        let totals: Vec<Sample> = global_oi
            .iter()
            .map(|o| Sample { date: o.date, value: o.global })
            .collect();
        let oi_zscore = z_score(&totals, self.transforms.crypto_zscore_lookback);

        info!(
            days = global_oi.len(),
            liquidation_days = liquidations.len(),
            funding_days = funding.dates.len(),
            "Crypto panel assembled"
        );

        Ok(CryptoPanel {
            oi_change: panels::last_change(&global_oi),
            oi_zscore_latest: crate::analytics::rolling::latest(&oi_zscore),
            global_oi,
            oi_zscore,
            funding,
            liquidations,
            checks,
        })
    }

    /// Every panel; the COT panel leads with EUR and tracks the currency futures.
    pub async fn snapshot(&mut self, currency: Currency) -> Result<DashboardSnapshot, DashboardError> {
        Ok(DashboardSnapshot {
            traditional: self.traditional().await?,
            options: self.options(currency).await?,
            cot: self.cot(CotContract::Eur, &CotContract::CURRENCIES).await?,
            crypto: self.crypto().await?,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{NaiveDate, TimeZone, Utc};

    use crate::analytics::TermStructureRegime;
    use crate::config::SourceConfig;

    fn config() -> MarketdashConfig {
        let mut config = MarketdashConfig::default();
        config.sources.history_start = NaiveDate::from_ymd_opt(2022, 1, 1).unwrap();
        config
    }

    fn dashboard() -> Dashboard {
        let config = config();
        let now = Utc.with_ymd_and_hms(2024, 6, 14, 12, 0, 0).unwrap();
        let source = DataSource::Synthetic(SyntheticSource::with_anchor(config.sources.clone(), now));
        Dashboard::new(source, &config)
    }

    #[tokio::test]
    async fn test_traditional_panel() {
        let panel = dashboard().traditional().await.unwrap();

        assert_eq!(panel.vix_zscore.len(), panel.vix.len());
        assert!(panel.vix_zscore[..252].iter().all(|z| z.z_score == 0.0));
        assert!(panel.vix_indicator.percentile >= 0.0 && panel.vix_indicator.percentile < 100.0);
        assert!(panel.credit.iter().all(|c| (c.spread - (c.hy - c.ig)).abs() < 1e-12));
        assert_eq!(panel.sp500[0].composite, 0.0);
        assert_eq!(panel.sp500_performance[0].performance, 0.0);
        assert!(panel.checks.iter().all(SeriesReport::all_passed));
    }

    #[tokio::test]
    async fn test_options_panel() {
        let panel = dashboard().options(Currency::Btc).await.unwrap();

        assert_eq!(panel.currency, "BTC");
        assert!(!panel.term_structure.is_empty());
        assert!(panel.term_structure.iter().all(|p| p.days > 0 && p.days <= 180));
        assert_ne!(panel.regime, TermStructureRegime::Unknown);
        // The RV history is extended so every DVOL day after the first has a partner.
        assert!(panel.vrp.len() >= 365);
        assert!(panel.vrp.iter().all(|r| (r.vrp - (r.iv - r.rv)).abs() < 1e-12));
        assert_eq!(panel.current_iv, panel.term_structure[0].current);
    }

    #[tokio::test]
    async fn test_cot_panel() {
        let panel = dashboard()
            .cot(CotContract::Eur, &CotContract::CURRENCIES)
            .await
            .unwrap();

        assert_eq!(panel.contract, "EUR");
        assert_eq!(panel.index.len(), panel.reports.len());
        assert_eq!(panel.contracts.len(), 6);
        assert_eq!(panel.contracts["EUR"], panel.index);
        assert_eq!(panel.checks.len(), 6);
        assert!(panel.checks.iter().all(SeriesReport::all_passed));
        for index in panel.contracts.values().flatten() {
            assert!((0.0..=100.0).contains(&index.commercial_index));
            assert!((0.0..=100.0).contains(&index.large_spec_index));
        }
    }

    #[tokio::test]
    async fn test_cot_panel_headline_not_tracked() {
        let panel = dashboard().cot(CotContract::Gold, &[CotContract::Jpy]).await.unwrap();
        assert_eq!(panel.contract, "GOLD");
        assert_eq!(panel.contracts.keys().collect::<Vec<_>>(), vec!["JPY"]);
    }

    #[tokio::test]
    async fn test_crypto_panel() {
        let panel = dashboard().crypto().await.unwrap();

        assert_eq!(panel.global_oi.len(), 366);
        for row in &panel.global_oi {
            assert!((row.others - (row.global - row.btc - row.eth)).abs() < 1e-3);
        }
        assert_eq!(panel.funding.symbols.len(), CRYPTO_SYMBOLS.len());
        assert_eq!(panel.funding.dates.len(), FUNDING_DAYS as usize + 1);
        assert_eq!(panel.oi_zscore.len(), panel.global_oi.len());
        assert_eq!(panel.liquidations.len(), 366);
        assert!(panel.liquidations.iter().all(|l| l.total == l.long + l.short));
        let names: Vec<&str> = panel.checks.iter().map(|c| c.name.as_str()).collect();
        assert_eq!(names, vec!["OI_BTC", "OI_ETH", "OI_AGGREGATE", "LIQUIDATIONS"]);
        assert!(panel.checks.iter().all(SeriesReport::all_passed));
    }

    #[test]
    fn test_duplicate_cot_date_fails_check() {
        let now = Utc.with_ymd_and_hms(2024, 6, 14, 12, 0, 0).unwrap();
        let synthetic = SyntheticSource::with_anchor(config().sources, now);
        let mut reports = synthetic.cot_reports(CotContract::Eur);
        let repeated = reports[10].clone();
        reports.insert(11, repeated);

        let report = dashboard().check_cot("EUR", &reports);
        let failed: Vec<&str> = report.failed_checks().into_iter().map(|c| c.name.as_str()).collect();
        assert_eq!(failed, vec!["unique_dates"]);
    }

    #[tokio::test]
    async fn test_live_failure_without_fallback() {
        let mut config = config();
        config.sources.synthetic_fallback = false;
        config.sources.coinalyze_base_url = "http://127.0.0.1:9".to_string();
        let live = crate::data::LiveSource::new(config.sources.clone());
        let mut dashboard = Dashboard::new(DataSource::Live(live), &config);

        // Either the key is missing or the port refuses the connection.
        let err = dashboard.crypto().await.unwrap_err();
        assert!(matches!(err, DashboardError::Source { .. }));
    }

    #[test]
    fn test_fallback_only_for_live() {
        let config = config();
        let synthetic = Dashboard::new(
            DataSource::Synthetic(SyntheticSource::new(SourceConfig::default())),
            &config,
        );
        assert!(synthetic.fallback.is_none());
    }
}
