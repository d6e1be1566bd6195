//! Input records and the sources that produce them.

pub mod black_scholes;
pub mod cftc;
pub mod coinalyze;
pub mod deribit;
pub mod fred;
pub mod source;
pub mod synthetic;
pub mod types;

pub use black_scholes::BlackScholes;
pub use source::{
    CotContract, Currency, DataSource, LiveSource, MacroSeries, OpenInterestScope, OptionChain,
    SourceError, SourceResult, CRYPTO_SYMBOLS,
};
pub use synthetic::SyntheticSource;
pub use types::{
    values, CompositePoint, CotIndexRecord, CotRecord, CotRow, CreditSpread, FundingHeatmap,
    FundingObservation, GlobalOi, LiquidationPoint, MarkData, OptionInstrument, OptionType,
    PerformancePoint, Positions, Sample, TermStructurePoint, VrpRecord, WindowedStat,
};
