//! Product portfolio lifecycle analytics.
//!
//! Takes a product snapshot and a lifecycle history snapshot and derives
//! stage statistics, transition trends, portfolio scores, recommendations
//! and reports. See [`analytics::compute_snapshot`] for the single entry
//! point.

pub mod analytics;
pub mod config;
pub mod error;
pub mod ingest;
pub mod types;

pub use analytics::filter::SnapshotFilter;
pub use analytics::{compute_filtered_snapshot, compute_snapshot, PortfolioAnalytics};
pub use config::{load_config, AnalyticsConfig};
pub use error::{AnalyticsError, ComputationFailure};
pub use types::{LifecycleHistoryRecord, LifecycleStage, Product, Segment};
