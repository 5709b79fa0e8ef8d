//! End-to-end preparation: load, impute, expand, merge, aggregate.
//!
//! # Example
//!
//! ```rust,ignore
//! use demandprep::{prepare_files, PipelineOptions};
//!
//! let options = PipelineOptions { promotion_days: Some(7), ..Default::default() };
//! let result = prepare_files("demand.csv", "promotions.csv", &options)?;
//! println!("{} weekly rows", result.weekly.len());
//! ```

use chrono::Weekday;
use serde::{Deserialize, Serialize};
use std::path::Path;

use super::expand::extend_promotions_days;
use super::impute::{clean_demand_per_group_with_summary, ImputationSummary};
use super::merge::merge;
use super::weekly::{aggregate_to_weekly, DEFAULT_WEEK_END};
use crate::error::{PrepError, PrepResult};
use crate::logs::{log_info, log_success, log_warning, LogEntry, RunLog};
use crate::models::{DemandTable, MergedTable, PromotionTable, WeeklyTable};
use crate::parser::{read_demand, read_promotions};

pub const ENV_PROMOTION_DAYS: &str = "DEMANDPREP_PROMOTION_DAYS";
pub const ENV_WEEK_END: &str = "DEMANDPREP_WEEK_END";
pub const ENV_SKIP_IMPUTE: &str = "DEMANDPREP_SKIP_IMPUTE";

/// Options for the preparation pipeline
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PipelineOptions {
    /// Spread each promotion over this many days before merging
    pub promotion_days: Option<usize>,

    /// Last day of each aggregated week
    pub week_end: Weekday,

    /// Impute missing demand per (sku, supermarket) group
    pub impute: bool,
}

impl Default for PipelineOptions {
    fn default() -> Self {
        Self {
            promotion_days: None,
            week_end: DEFAULT_WEEK_END,
            impute: true,
        }
    }
}

impl PipelineOptions {
    /// Read options from the process environment.
    ///
    /// Unset variables keep their default.
    pub fn from_env() -> PrepResult<Self> {
        Self::from_lookup(|name| std::env::var(name).ok())
    }

    /// Read options through `lookup`, which maps a variable name to its value.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> PrepResult<Self> {
        let mut options = Self::default();

        if let Some(raw) = lookup(ENV_PROMOTION_DAYS) {
            let days = raw.trim().parse::<usize>().map_err(|_| {
                PrepError::InvalidArgument(format!("{ENV_PROMOTION_DAYS}: '{raw}' is not a day count"))
            })?;
            options.promotion_days = Some(days);
        }

        if let Some(raw) = lookup(ENV_WEEK_END) {
            options.week_end = raw.trim().parse::<Weekday>().map_err(|_| {
                PrepError::InvalidArgument(format!("{ENV_WEEK_END}: '{raw}' is not a weekday"))
            })?;
        }

        if let Some(raw) = lookup(ENV_SKIP_IMPUTE) {
            options.impute = !matches!(raw.trim().to_lowercase().as_str(), "1" | "true" | "yes");
        }

        Ok(options)
    }
}

/// Row counts of a pipeline run
#[derive(Debug, Clone, Default, Serialize)]
pub struct PipelineStats {
    pub demand_rows: usize,
    pub promotion_rows: usize,
    /// Promotion rows after spreading over several days
    pub expanded_promotion_rows: usize,
    pub merged_rows: usize,
    pub weekly_rows: usize,
    pub imputation: Option<ImputationSummary>,
}

/// Result of a complete pipeline run
#[derive(Debug, Clone, Serialize)]
pub struct PipelineResult {
    /// Daily demand with the promotion flag
    pub merged: MergedTable,

    /// Weekly view of `merged`
    pub weekly: WeeklyTable,

    pub stats: PipelineStats,

    /// Entries logged while the run was in progress
    pub log: Vec<LogEntry>,
}

/// Run the pipeline on a demand file and a promotion file.
pub fn prepare_files(
    demand_path: impl AsRef<Path>,
    promotions_path: impl AsRef<Path>,
    options: &PipelineOptions,
) -> PrepResult<PipelineResult> {
    let run = RunLog::start();
    let result = load_and_run(demand_path.as_ref(), promotions_path.as_ref(), options);
    with_log(result, run)
}

/// Run the pipeline on tables already in memory.
pub fn prepare_tables(
    demand: DemandTable,
    promotions: PromotionTable,
    options: &PipelineOptions,
) -> PrepResult<PipelineResult> {
    let run = RunLog::start();
    let result = run_tables(demand, promotions, options);
    with_log(result, run)
}

fn with_log(result: PrepResult<PipelineResult>, run: RunLog) -> PrepResult<PipelineResult> {
    let mut result = result?;
    result.log = run.finish();
    Ok(result)
}

fn load_and_run(
    demand_path: &Path,
    promotions_path: &Path,
    options: &PipelineOptions,
) -> PrepResult<PipelineResult> {
    log_info(format!("📖 Reading demand: {}", demand_path.display()));
    let demand = read_demand(demand_path)?;
    log_info(format!("📖 Reading promotions: {}", promotions_path.display()));
    let promotions = read_promotions(promotions_path)?;

    run_tables(demand, promotions, options)
}

fn run_tables(
    demand: DemandTable,
    promotions: PromotionTable,
    options: &PipelineOptions,
) -> PrepResult<PipelineResult> {
    let mut stats = PipelineStats {
        demand_rows: demand.len(),
        promotion_rows: promotions.len(),
        ..Default::default()
    };

    let demand = if options.impute {
        log_info("🧹 Imputing missing demand per group...");
        let (demand, summary) = clean_demand_per_group_with_summary(demand);
        if !summary.undefined_groups.is_empty() {
            log_warning(format!(
                "{} group(s) have no observed demand and hold NaN",
                summary.undefined_groups.len()
            ));
        }
        stats.imputation = Some(summary);
        demand
    } else {
        log_info("(imputation skipped)");
        demand
    };

    let promotions = match options.promotion_days {
        Some(days) => {
            log_info(format!("📅 Spreading promotions over {} days...", days));
            extend_promotions_days(&promotions, days)?
        }
        None => promotions,
    };
    stats.expanded_promotion_rows = promotions.len();

    log_info("🔗 Merging demand and promotions...");
    let merged = merge(&demand, &promotions);
    stats.merged_rows = merged.len();

    log_info(format!("📦 Aggregating to weeks ending {}...", options.week_end));
    let weekly = aggregate_to_weekly(&merged, options.week_end);
    stats.weekly_rows = weekly.len();

    log_success(format!("{} merged rows, {} weekly rows", stats.merged_rows, stats.weekly_rows));

    Ok(PipelineResult {
        merged,
        weekly,
        stats,
        log: Vec::new(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::logs::LogLevel;
    use crate::models::{DemandRecord, PromotionRecord};
    use chrono::NaiveDate;
    use std::collections::HashMap;
    use std::io::Write;

    fn day(d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(2024, 1, d).unwrap()
    }

    fn lookup(vars: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> =
            vars.iter().map(|(k, v)| (k.to_string(), v.to_string())).collect();
        move |name: &str| map.get(name).cloned()
    }

    #[test]
    fn test_default_options() {
        let opts = PipelineOptions::default();
        assert_eq!(opts.promotion_days, None);
        assert_eq!(opts.week_end, Weekday::Sun);
        assert!(opts.impute);
    }

    #[test]
    fn test_options_from_lookup() {
        let opts = PipelineOptions::from_lookup(lookup(&[
            (ENV_PROMOTION_DAYS, "7"),
            (ENV_WEEK_END, "sat"),
            (ENV_SKIP_IMPUTE, "true"),
        ]))
        .unwrap();

        assert_eq!(opts.promotion_days, Some(7));
        assert_eq!(opts.week_end, Weekday::Sat);
        assert!(!opts.impute);
    }

    #[test]
    fn test_options_reject_bad_values() {
        let err = PipelineOptions::from_lookup(lookup(&[(ENV_PROMOTION_DAYS, "a week")])).unwrap_err();
        assert!(err.to_string().contains(ENV_PROMOTION_DAYS));

        let err = PipelineOptions::from_lookup(lookup(&[(ENV_WEEK_END, "someday")])).unwrap_err();
        assert!(matches!(err, PrepError::InvalidArgument(_)));
    }

    #[test]
    fn test_prepare_tables() {
        let demand = vec![
            DemandRecord::new(day(1), "A", "S1", Some(1.0)),
            DemandRecord::new(day(2), "A", "S1", None),
            DemandRecord::new(day(3), "A", "S1", Some(3.0)),
            DemandRecord::new(day(8), "A", "S1", Some(10.0)),
        ];
        let promotions = vec![PromotionRecord::new(day(6), "A", "S1")];
        let options = PipelineOptions {
            promotion_days: Some(3),
            ..Default::default()
        };

        let result = prepare_tables(demand, promotions, &options).unwrap();

        // promotion on 6, 7, 8; 6 and 7 have no demand rows
        assert_eq!(result.stats.expanded_promotion_rows, 3);
        assert_eq!(result.merged.len(), 6);
        assert_eq!(result.stats.imputation.as_ref().unwrap().imputed, 1);

        assert_eq!(result.weekly.len(), 2);
        assert_eq!(result.weekly[0].week_end, day(7));
        assert_eq!(result.weekly[0].demand, 7.0);
        assert!(result.weekly[0].promotion);
        assert_eq!(result.weekly[1].demand, 10.0);
        assert!(result.weekly[1].promotion);
    }

    #[test]
    fn test_prepare_tables_zero_days_fails() {
        let options = PipelineOptions {
            promotion_days: Some(0),
            ..Default::default()
        };
        assert!(prepare_tables(vec![], vec![], &options).is_err());
    }

    #[test]
    fn test_prepare_files() {
        let dir = tempfile::tempdir().unwrap();
        let demand_path = dir.path().join("demand.csv");
        let promotions_path = dir.path().join("promotions.csv");

        let mut f = std::fs::File::create(&demand_path).unwrap();
        writeln!(f, "date,sku,supermarket,demand").unwrap();
        for d in 1..=7 {
            writeln!(f, "2024-01-0{d},A,S1,{d}").unwrap();
        }
        let mut f = std::fs::File::create(&promotions_path).unwrap();
        writeln!(f, ",promotion_date,sku,supermarket").unwrap();
        writeln!(f, "0,2024-01-03,A,S1").unwrap();

        let result = prepare_files(&demand_path, &promotions_path, &PipelineOptions::default()).unwrap();

        assert_eq!(result.weekly.len(), 1);
        assert_eq!(result.weekly[0].demand, 28.0);
        assert!(result.weekly[0].promotion);
        assert_eq!(result.stats.demand_rows, 7);
        assert!(result
            .log
            .iter()
            .any(|e| e.message.contains("Reading demand") && e.message.contains("demand.csv")));
    }

    #[test]
    fn test_run_log_is_attached_to_result() {
        let demand = vec![
            DemandRecord::new(day(1), "A", "S1", None),
            DemandRecord::new(day(2), "B", "S1", Some(2.0)),
        ];

        let result = prepare_tables(demand, vec![], &PipelineOptions::default()).unwrap();

        let merging = result.log.iter().position(|e| e.message.contains("Merging demand"));
        let summary = result
            .log
            .iter()
            .position(|e| e.level == LogLevel::Success && e.message.contains("2 merged rows"));
        assert!(merging.is_some());
        assert!(summary > merging);
        assert!(result
            .log
            .iter()
            .any(|e| e.level == LogLevel::Warning && e.message.contains("A/S1")));
    }
}
