//! Table transformations.
//!
//! - Impute: missing demand per (sku, supermarket) group
//! - Expand: single-day promotions to multi-day spans
//! - Merge: outer join of demand and promotions
//! - Weekly: daily rows to weekly sums
//! - Pipeline: all of the above in order

pub mod expand;
pub mod impute;
pub mod merge;
pub mod pipeline;
pub mod weekly;

pub use expand::extend_promotions_days;
pub use impute::{clean, clean_demand_per_group, clean_demand_per_group_with_summary, ImputationSummary};
pub use merge::merge;
pub use pipeline::*;
pub use weekly::{aggregate_to_weekly, aggregate_to_weekly_sunday, week_ending, DEFAULT_WEEK_END};
