//! Seeded synthetic market data.
//!
//! Every series is drawn from its own `StdRng` stream, derived from the
//! configured seed and the series name, so the output for one series does not
//! depend on which other series were requested first. Two sources built with
//! the same seed and anchor produce identical data.

use chrono::{DateTime, Datelike, Duration, NaiveDate, Utc, Weekday};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use rand_distr::{Distribution, StandardNormal};
use tracing::debug;

use super::black_scholes::BlackScholes;
use super::source::{CotContract, Currency, MacroSeries, OpenInterestScope, OptionChain};
use super::types::{
    CotRecord, FundingObservation, LiquidationPoint, MarkData, OptionInstrument, OptionType,
    Positions, Sample,
};
use crate::config::SourceConfig;

/// Days to expiry of the listed synthetic options.
const EXPIRY_DAYS: [i64; 12] = [1, 2, 7, 14, 21, 30, 60, 90, 120, 180, 270, 365];

/// Strikes listed either side of spot, `STRIKE_STEP` apart as a fraction of spot.
const STRIKE_STEPS: i32 = 8;
const STRIKE_STEP: f64 = 0.05;

/// Mean-reverting walk parameters for a macro series.
struct WalkParams {
    start: f64,
    mean: f64,
    reversion: f64,
    step: f64,
    floor: f64,
}

fn walk_params(series: MacroSeries) -> WalkParams {
    match series {
        MacroSeries::Vix => WalkParams { start: 18.0, mean: 18.0, reversion: 0.05, step: 1.2, floor: 9.0 },
        MacroSeries::HighYield => WalkParams { start: 4.0, mean: 4.0, reversion: 0.02, step: 0.08, floor: 2.0 },
        MacroSeries::InvestmentGrade => WalkParams { start: 1.6, mean: 1.6, reversion: 0.02, step: 0.03, floor: 0.6 },
        MacroSeries::Treasury10y => WalkParams { start: 2.0, mean: 3.5, reversion: 0.005, step: 0.05, floor: 0.2 },
        // Sp500 is a geometric walk, see `macro_series`.
        MacroSeries::Sp500 => WalkParams { start: 3200.0, mean: 0.0003, reversion: 0.0, step: 0.011, floor: 1.0 },
    }
}

/// Deterministic pseudo-random market data.
#[derive(Debug, Clone)]
pub struct SyntheticSource {
    config: SourceConfig,
    now: DateTime<Utc>,
}

impl SyntheticSource {
    /// Synthetic data ending today.
    pub fn new(config: SourceConfig) -> Self {
        Self::with_anchor(config, Utc::now())
    }

    /// Synthetic data ending at `now`.
    pub fn with_anchor(config: SourceConfig, now: DateTime<Utc>) -> Self {
        Self { config, now }
    }

    pub fn seed(&self) -> u64 {
        self.config.seed
    }

    fn today(&self) -> NaiveDate {
        self.now.date_naive()
    }

    fn rng(&self, stream: &str) -> StdRng {
        StdRng::seed_from_u64(self.config.seed ^ stream_id(stream))
    }

    /// Daily dates covering the last `days` days, oldest first.
    fn trailing_days(&self, days: i64) -> impl Iterator<Item = NaiveDate> + '_ {
        (0..=days.max(0)).rev().map(move |i| self.today() - Duration::days(i))
    }

    /// Business-day macro series from the configured history start.
    pub fn macro_series(&self, series: MacroSeries) -> Vec<Sample> {
        let mut rng = self.rng(series.fred_id());
        let p = walk_params(series);
        let mut level = p.start;

        let out: Vec<Sample> = self
            .config
            .history_start
            .iter_days()
            .take_while(|d| *d <= self.today())
            .filter(|d| !matches!(d.weekday(), Weekday::Sat | Weekday::Sun))
            .map(|date| {
                let z: f64 = StandardNormal.sample(&mut rng);
                level = match series {
                    MacroSeries::Sp500 => level * (p.mean + p.step * z).exp(),
                    _ => level + p.reversion * (p.mean - level) + p.step * z,
                };
                level = level.max(p.floor);
                Sample { date, value: level }
            })
            .collect();

        debug!(series = series.fred_id(), samples = out.len(), "Synthetic macro series");
        out
    }

    /// Weekly reports (Tuesdays), oldest first.
    pub fn cot_reports(&self, contract: CotContract) -> Vec<CotRecord> {
        let mut rng = self.rng(contract.code());
        let count = self.config.cot_reports;

        let back_to_tuesday = (self.today().weekday().num_days_from_monday() as i64 + 6) % 7;
        let last = self.today() - Duration::days(back_to_tuesday);

        let base = 150_000.0;
        let mut commercial: f64 = rng.random_range(-40_000.0..40_000.0);
        let mut large = -0.8 * commercial;

        (0..count)
            .rev()
            .map(|i| {
                let z1: f64 = StandardNormal.sample(&mut rng);
                let z2: f64 = StandardNormal.sample(&mut rng);
                let z3: f64 = StandardNormal.sample(&mut rng);
                commercial = 0.97 * commercial + 9_000.0 * z1;
                large = 0.9 * large - 0.08 * commercial + 6_000.0 * z2;
                let small = -(commercial + large) * 0.3 + 2_000.0 * z3;

                CotRecord {
                    date: last - Duration::weeks(i as i64),
                    commercial: split_net(base, commercial),
                    large_spec: split_net(base * 0.6, large),
                    small_spec: split_net(base * 0.2, small),
                }
            })
            .collect()
    }

    /// Listed options with Black-Scholes deltas over a smile.
    pub fn option_chain(&self, currency: Currency) -> OptionChain {
        let mut rng = self.rng(&format!("{}-options", currency.as_str()));
        let (spot, base_iv) = match currency {
            Currency::Btc => (60_000.0_f64, 50.0_f64),
            Currency::Eth => (3_000.0, 60.0),
        };

        let pricer = BlackScholes::default();
        let mut instruments = Vec::new();
        let mut marks = Vec::new();
        let mut atm_iv = base_iv;

        for days in EXPIRY_DAYS {
            atm_iv = (atm_iv + rng.random_range(-2.0..3.0)).max(10.0);
            let expiry = self.now + Duration::days(days);
            let label = expiry.format("%d%b%y").to_string().to_uppercase();
            let time = days as f64 / 365.0;

            for step in -STRIKE_STEPS..=STRIKE_STEPS {
                let strike = (spot * (1.0 + step as f64 * STRIKE_STEP)).round();
                let moneyness = (strike / spot).ln();
                let smile = 1.0 + 0.8 * moneyness * moneyness - 0.1 * moneyness;

                for option_type in [OptionType::Call, OptionType::Put] {
                    let instrument_name =
                        format!("{}-{}-{}-{}", currency.as_str(), label, strike, option_type.as_str());
                    let iv = atm_iv * smile + rng.random_range(-0.5..0.5);
                    let quoted = !rng.random_bool(0.02);

                    instruments.push(OptionInstrument {
                        instrument_name: instrument_name.clone(),
                        expiration_timestamp: expiry.timestamp_millis(),
                        strike,
                        option_type,
                    });
                    marks.push(MarkData {
                        instrument_name,
                        mark_iv: quoted.then_some(iv),
                        delta: Some(pricer.delta(spot, strike, time, iv / 100.0, option_type)),
                    });
                }
            }
        }

        OptionChain {
            instruments,
            marks,
            as_of: self.now,
        }
    }

    /// Daily implied volatility index, percent.
    pub fn iv_index(&self, currency: Currency) -> Vec<Sample> {
        let mut rng = self.rng(&format!("{}-dvol", currency.as_str()));
        let mut iv = 60.0_f64;
        self.trailing_days(self.config.history_days)
            .map(|date| {
                iv = (iv + rng.random_range(-2.5..2.5)).max(10.0);
                Sample { date, value: iv }
            })
            .collect()
    }

    /// Daily perpetual closes with `extra_days` of additional history.
    pub fn perpetual_closes(&self, currency: Currency, extra_days: i64) -> Vec<Sample> {
        let mut rng = self.rng(&format!("{}-PERPETUAL", currency.as_str()));
        let (mut price, daily_vol) = match currency {
            Currency::Btc => (60_000.0, 0.55 / 365f64.sqrt()),
            Currency::Eth => (3_000.0, 0.70 / 365f64.sqrt()),
        };
        self.trailing_days(self.config.history_days + extra_days)
            .map(|date| {
                let z: f64 = StandardNormal.sample(&mut rng);
                price *= (daily_vol * z).exp();
                Sample { date, value: price }
            })
            .collect()
    }

    /// Daily open interest in USD.
    pub fn open_interest(&self, scope: OpenInterestScope) -> Vec<Sample> {
        let mut rng = self.rng("open-interest");
        let mut btc = 20_000_000_000.0_f64;
        let mut eth = 8_000_000_000.0_f64;

        self.trailing_days(self.config.history_days)
            .map(|date| {
                btc = (btc + rng.random_range(-0.5..0.5) * 1_000_000_000.0).max(1.0e9);
                eth = (eth + rng.random_range(-0.5..0.5) * 500_000_000.0).max(0.5e9);
                let value = match scope {
                    OpenInterestScope::Btc => btc,
                    OpenInterestScope::Eth => eth,
                    OpenInterestScope::Aggregate => (btc + eth) * 1.4,
                };
                Sample { date, value }
            })
            .collect()
    }

    /// Daily long and short liquidations, each uniform up to $500M.
    pub fn liquidations(&self) -> Vec<LiquidationPoint> {
        let mut rng = self.rng("liquidations");
        self.trailing_days(self.config.history_days)
            .map(|date| {
                let long = rng.random_range(0.0..500_000_000.0);
                let short = rng.random_range(0.0..500_000_000.0);
                LiquidationPoint::new(date, long, short)
            })
            .collect()
    }

    /// One funding print per day and symbol, as `{symbol}USDT`.
    pub fn funding_history(&self, symbols: &[String], days: i64) -> Vec<FundingObservation> {
        let mut rng = self.rng("funding");
        let mut out = Vec::with_capacity(symbols.len() * (days.max(0) as usize + 1));
        for date in self.trailing_days(days) {
            for symbol in symbols {
                out.push(FundingObservation {
                    date,
                    symbol: format!("{}USDT", symbol),
                    rate: rng.random_range(-0.5..0.5) * 0.001,
                });
            }
        }
        out
    }
}

/// Long/short around `gross` with the given net.
fn split_net(gross: f64, net: f64) -> Positions {
    let long = (gross + net / 2.0).max(0.0).round() as i64;
    let short = (gross - net / 2.0).max(0.0).round() as i64;
    Positions::new(long, short)
}

/// FNV-1a hash of a stream label.
fn stream_id(label: &str) -> u64 {
    label
        .bytes()
        .fold(0xcbf2_9ce4_8422_2325_u64, |h, b| (h ^ b as u64).wrapping_mul(0x0100_0000_01b3))
}
