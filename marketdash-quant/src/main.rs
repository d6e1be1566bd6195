//! Market dashboard transforms CLI.
//!
//! Fetches (or synthesises) market data, runs the transforms and prints the
//! panel JSON on stdout. Logs go to stderr.
//!
//! # Usage
//!
//! ```bash
//! # Deterministic offline output
//! marketdash --source synthetic --seed 7 all --pretty
//!
//! # Live data (FRED_API_KEY and COINALYZE_API_KEY from the environment)
//! marketdash options --currency btc
//!
//! # COT index for gold, tracking the currency futures
//! marketdash cot --contract gold --tracked EUR,GBP,JPY
//! ```

use std::path::PathBuf;

use anyhow::{bail, Context, Result};
use clap::{Parser, Subcommand, ValueEnum};
use serde::Serialize;
use tracing::info;

use marketdash_quant::config::MarketdashConfig;
use marketdash_quant::dashboard::Dashboard;
use marketdash_quant::data::{CotContract, Currency, DataSource, LiveSource, SyntheticSource};

#[derive(Parser)]
#[command(name = "marketdash")]
#[command(about = "Quantitative transforms for the market dashboard")]
#[command(version)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Where input series come from
    #[arg(long, value_enum, default_value = "live", global = true)]
    source: SourceKind,

    /// JSON config file (defaults are used for missing fields)
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    /// Seed of the synthetic generator (overrides the config)
    #[arg(long, global = true)]
    seed: Option<u64>,

    /// Pretty-print the JSON output
    #[arg(long, global = true)]
    pretty: bool,
}

#[derive(Clone, Copy, ValueEnum)]
enum SourceKind {
    Live,
    Synthetic,
}

#[derive(Clone, Copy, ValueEnum)]
enum CurrencyArg {
    Btc,
    Eth,
}

impl From<CurrencyArg> for Currency {
    fn from(arg: CurrencyArg) -> Self {
        match arg {
            CurrencyArg::Btc => Currency::Btc,
            CurrencyArg::Eth => Currency::Eth,
        }
    }
}

#[derive(Subcommand)]
enum Commands {
    /// VIX, credit spreads, S&P 500 composite
    Traditional,

    /// Options term structure and variance risk premium
    Options {
        #[arg(long, value_enum, default_value = "eth")]
        currency: CurrencyArg,
    },

    /// Commitment of Traders index
    Cot {
        /// Headline contract
        #[arg(long, default_value = "EUR")]
        contract: String,

        /// Comma-separated contracts to index alongside
        #[arg(long, default_value = "EUR,GBP,JPY,CHF,CAD,AUD")]
        tracked: String,
    },

    /// Crypto open interest and funding heatmap
    Crypto,

    /// Every panel
    All {
        #[arg(long, value_enum, default_value = "eth")]
        currency: CurrencyArg,
    },
}

fn parse_contract(name: &str) -> Result<CotContract> {
    match CotContract::from_name(name) {
        Some(contract) => Ok(contract),
        None => bail!("Unknown COT contract: {}", name),
    }
}

fn print_json<T: Serialize>(value: &T, pretty: bool) -> Result<()> {
    let json = if pretty {
        serde_json::to_string_pretty(value)
    } else {
        serde_json::to_string(value)
    }
    .context("Failed to serialize output")?;
    println!("{}", json);
    Ok(())
}

#[tokio::main]
async fn main() -> Result<()> {
    // Initialize logging
    tracing_subscriber::fmt()
        .with_writer(std::io::stderr)
        .with_env_filter(
            tracing_subscriber::EnvFilter::from_default_env()
                .add_directive("marketdash_quant=info".parse()?),
        )
        .init();

    let cli = Cli::parse();

    let mut config = match &cli.config {
        Some(path) => MarketdashConfig::load(path)
            .with_context(|| format!("Failed to load config from {}", path.display()))?,
        None => MarketdashConfig::default(),
    };
    if let Some(seed) = cli.seed {
        config.sources.seed = seed;
    }

    let source = match cli.source {
        SourceKind::Live => DataSource::Live(LiveSource::new(config.sources.clone())),
        SourceKind::Synthetic => {
            info!(seed = config.sources.seed, "Using synthetic data");
            DataSource::Synthetic(SyntheticSource::new(config.sources.clone()))
        }
    };
    let mut dashboard = Dashboard::new(source, &config);

    match cli.command {
        Commands::Traditional => {
            let panel = dashboard.traditional().await.context("Traditional panel failed")?;
            print_json(&panel, cli.pretty)?;
        }
        Commands::Options { currency } => {
            let panel = dashboard
                .options(currency.into())
                .await
                .context("Options panel failed")?;
            print_json(&panel, cli.pretty)?;
        }
        Commands::Cot { contract, tracked } => {
            let headline = parse_contract(&contract)?;
            let tracked = tracked
                .split(',')
                .filter(|s| !s.trim().is_empty())
                .map(parse_contract)
                .collect::<Result<Vec<_>>>()?;
            let panel = dashboard.cot(headline, &tracked).await.context("COT panel failed")?;
            print_json(&panel, cli.pretty)?;
        }
        Commands::Crypto => {
            let panel = dashboard.crypto().await.context("Crypto panel failed")?;
            print_json(&panel, cli.pretty)?;
        }
        Commands::All { currency } => {
            let snapshot = dashboard
                .snapshot(currency.into())
                .await
                .context("Dashboard snapshot failed")?;
            print_json(&snapshot, cli.pretty)?;
        }
    }

    Ok(())
}
