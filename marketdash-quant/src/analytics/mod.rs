//! Quantitative transforms over dated series.
//!
//! Provides:
//! - Rolling z-scores and single-point z-scores
//! - Percentile rank within a history
//! - COT index (0-100 range normalisation of net positioning)
//! - Date-joined spreads (variance risk premium, credit spreads)
//! - IV term structure aggregation and regime classification
//! - Realized volatility, rebased performance and momentum composites
//! - Crypto open interest, liquidation and funding aggregation
//!
//! All transforms are pure: they allocate fresh outputs and hold no state.

pub mod cot_index;
pub mod derivatives;
pub mod percentile;
pub mod performance;
pub mod realized_vol;
pub mod rolling;
pub mod spread;
pub mod term_structure;

pub use cot_index::{cot_index, cot_index_many, DEFAULT_COT_LOOKBACK_WEEKS};
pub use derivatives::{daily_liquidations, funding_heatmap, global_open_interest};
pub use percentile::percentile_rank;
pub use performance::{momentum_composite, rebase_performance, DEFAULT_COMPOSITE_LOOKBACK};
pub use realized_vol::{realized_volatility, DEFAULT_RV_WINDOW};
pub use rolling::{point_z_score, z_score, DEFAULT_ZSCORE_LOOKBACK};
pub use spread::{credit_spread, variance_risk_premium};
pub use term_structure::{
    format_tenor, term_structure, TermStructureAggregator, TermStructureConfig, TermStructureRegime,
};
