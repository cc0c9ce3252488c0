// BEL Analytics - Core Library
// Exposes all modules for use in CLI, API server, terminal browser, and tests

pub mod model;
pub mod region;     // Country code → region lookup
pub mod error;
pub mod store;      // DataStore: immutable snapshot
pub mod cutoff;     // Active-month policy
pub mod metrics;    // MetricsCalculator
pub mod row;
pub mod filter;     // FilterEngine
pub mod sort;       // Sorter
pub mod paginate;   // Paginator
pub mod pipeline;
pub mod export;     // CSV export
pub mod config;
pub mod logging;

#[cfg(feature = "tui")]
pub mod ui;

#[cfg(test)]
mod fixtures;

// Re-export commonly used types
pub use model::{Bel, Level, Month, MonthlyMetrics, YearData};
pub use region::{Region, REGION_TABLE_VERSION};
pub use error::{ConfigError, ExportError, IssueKind, LoadError, RecordIssue};
pub use store::{DataStore, ValidationReport};
pub use cutoff::cutoff_month_index;
pub use metrics::{
    aggregate, aggregate_group, breakdown_by_level, breakdown_by_region,
    dashboard_summary, monthly_series, DashboardSummary, GroupMetrics, Metrics, MonthPoint,
};
pub use row::Row;
pub use filter::{Activity, FilterSpec};
pub use sort::{sort_rows, SortDirection, SortKey};
pub use paginate::{page, Page, PaginationState, PAGE_SIZE_OPTIONS};
pub use pipeline::{AccountDetail, LeaderboardQuery, Pipeline};
pub use config::AppConfig;

/// Library version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
