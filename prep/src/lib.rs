//! # demandprep - retail demand data preparation
//!
//! Loads daily demand and promotion tables from CSV, imputes missing demand,
//! spreads promotions over several days, joins the two and aggregates the
//! result to weekly buckets.
//!
//! ## Architecture
//!
//! ```text
//! ┌────────────┐   ┌──────────┐   ┌──────────┐   ┌──────────┐   ┌──────────┐
//! │ demand.csv │──▶│  Parser  │──▶│  Impute  │──▶│          │   │          │
//! └────────────┘   └──────────┘   └──────────┘   │  Merge   │──▶│  Weekly  │
//! ┌────────────┐   ┌──────────┐   ┌──────────┐   │ (outer)  │   │ (W-SUN)  │
//! │ promos.csv │──▶│  Parser  │──▶│  Expand  │──▶│          │   │          │
//! └────────────┘   └──────────┘   └──────────┘   └──────────┘   └──────────┘
//! ```
//!
//! ## Quick Start
//!
//! ```rust,ignore
//! use demandprep::{prepare_files, PipelineOptions};
//!
//! let result = prepare_files("demand.csv", "promotions.csv", &PipelineOptions::default())?;
//! println!("{} weekly rows", result.weekly.len());
//! ```
//!
//! Every step is also callable on its own; see [`transform`].

// Core modules
pub mod error;
pub mod logs;
pub mod models;

// Input / output
pub mod export;
pub mod parser;

// Transformation
pub mod transform;

// =============================================================================
// Re-exports
// =============================================================================

pub use error::{FormatError, PrepError, PrepResult};

pub use models::{
    Attributes, DemandRecord, DemandTable, GroupKey, MergedRecord, MergedTable, PromotionRecord,
    PromotionTable, WeeklyRecord, WeeklyTable,
};

pub use parser::{
    decode_content, detect_encoding, parse_date, read_demand, read_demand_bytes, read_demand_str,
    read_promotions, read_promotions_bytes, read_promotions_str,
};

pub use transform::{
    aggregate_to_weekly, aggregate_to_weekly_sunday, clean, clean_demand_per_group,
    clean_demand_per_group_with_summary, extend_promotions_days, merge, prepare_files,
    prepare_tables, ImputationSummary, PipelineOptions, PipelineResult, PipelineStats,
};

pub use export::{to_json, write_csv, write_csv_file, CsvExport};
