pub mod analytics;
pub mod config;
pub mod dashboard;
pub mod data;
pub mod error;
pub mod validation;

// Re-export commonly used types
pub use analytics::{TermStructureAggregator, TermStructureConfig, TermStructureRegime};
pub use config::{ConfigError, MarketdashConfig, SourceConfig, TransformConfig};
pub use dashboard::{Dashboard, DashboardError, DashboardSnapshot};
pub use data::{CotRecord, DataSource, Sample, SourceError, SyntheticSource, WindowedStat};
pub use error::{TransformError, TransformResult};
pub use validation::{SeriesReport, SeriesValidator};
