//! demandprep CLI - prepare retail demand tables
//!
//! ```bash
//! demandprep clean demand.csv                          # Impute missing demand
//! demandprep expand promotions.csv --days 7            # Spread promotions over 7 days
//! demandprep merge demand.csv promotions.csv           # Daily demand with promotion flag
//! demandprep weekly demand.csv promotions.csv -f json  # Weekly sums
//! ```
//!
//! Defaults for `--days`, `--week-end` and `--no-impute` come from the
//! `DEMANDPREP_*` environment variables (a `.env` file is loaded if present).

use chrono::Weekday;
use clap::{Args, Parser, Subcommand, ValueEnum};
use demandprep::{
    clean_demand_per_group, extend_promotions_days, prepare_files, read_demand, read_promotions,
    to_json, write_csv, write_csv_file, CsvExport, PipelineOptions,
};
use serde::Serialize;
use std::fs;
use std::io::Write;
use std::path::{Path, PathBuf};

#[derive(Parser)]
#[command(name = "demandprep")]
#[command(about = "Load, impute, merge and aggregate retail demand tables", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Impute missing demand per (sku, supermarket) group
    Clean {
        /// Demand CSV file
        demand: PathBuf,

        #[command(flatten)]
        out: OutputArgs,
    },

    /// Spread each promotion over several consecutive days
    Expand {
        /// Promotion CSV file
        promotions: PathBuf,

        /// Length of each promotion in days
        #[arg(short, long)]
        days: usize,

        #[command(flatten)]
        out: OutputArgs,
    },

    /// Outer-join demand with promotions
    Merge {
        demand: PathBuf,
        promotions: PathBuf,

        #[command(flatten)]
        pipeline: PipelineArgs,

        #[command(flatten)]
        out: OutputArgs,
    },

    /// Merge and aggregate to weekly demand
    Weekly {
        demand: PathBuf,
        promotions: PathBuf,

        #[command(flatten)]
        pipeline: PipelineArgs,

        #[command(flatten)]
        out: OutputArgs,
    },
}

#[derive(Args)]
struct PipelineArgs {
    /// Spread each promotion over this many days before merging
    #[arg(short, long)]
    days: Option<usize>,

    /// Last day of each week (mon, tue, ..., sun)
    #[arg(short, long)]
    week_end: Option<Weekday>,

    /// Keep missing demand as is
    #[arg(long)]
    no_impute: bool,

    /// Also write the run log as JSON to this file
    #[arg(long)]
    log: Option<PathBuf>,
}

#[derive(Args)]
struct OutputArgs {
    /// Output file (default: stdout)
    #[arg(short, long)]
    output: Option<PathBuf>,

    /// Output format
    #[arg(short, long, value_enum, default_value_t = Format::Csv)]
    format: Format,
}

#[derive(Clone, Copy, ValueEnum)]
enum Format {
    Csv,
    Json,
}

fn main() {
    // Load .env file (if present)
    dotenvy::dotenv().ok();

    let cli = Cli::parse();

    let result = match cli.command {
        Commands::Clean { demand, out } => cmd_clean(&demand, &out),
        Commands::Expand { promotions, days, out } => cmd_expand(&promotions, days, &out),
        Commands::Merge { demand, promotions, pipeline, out } => {
            cmd_merge(&demand, &promotions, &pipeline, &out, false)
        }
        Commands::Weekly { demand, promotions, pipeline, out } => {
            cmd_merge(&demand, &promotions, &pipeline, &out, true)
        }
    };

    if let Err(e) = result {
        eprintln!("❌ Error: {}", e);
        std::process::exit(1);
    }
}

fn cmd_clean(input: &Path, out: &OutputArgs) -> Result<(), Box<dyn std::error::Error>> {
    eprintln!("🧹 Cleaning: {}", input.display());

    let demand = clean_demand_per_group(read_demand(input)?);
    write_table(&demand, out)
}

fn cmd_expand(input: &Path, days: usize, out: &OutputArgs) -> Result<(), Box<dyn std::error::Error>> {
    eprintln!("📅 Expanding: {}", input.display());

    let promotions = read_promotions(input)?;
    let expanded = extend_promotions_days(&promotions, days)?;
    write_table(&expanded, out)
}

fn cmd_merge(
    demand: &Path,
    promotions: &Path,
    args: &PipelineArgs,
    out: &OutputArgs,
    weekly: bool,
) -> Result<(), Box<dyn std::error::Error>> {
    let options = pipeline_options(args)?;
    let result = prepare_files(demand, promotions, &options)?;

    eprintln!("   Demand rows: {}", result.stats.demand_rows);
    eprintln!("   Promotion rows: {}", result.stats.promotion_rows);
    eprintln!("   Merged rows: {}", result.stats.merged_rows);

    if let Some(path) = &args.log {
        fs::write(path, to_json(&result.log)?)?;
        eprintln!("📝 {} log entries written to: {}", result.log.len(), path.display());
    }

    if weekly {
        write_table(&result.weekly, out)
    } else {
        write_table(&result.merged, out)
    }
}

/// Environment defaults overridden by command-line flags.
fn pipeline_options(args: &PipelineArgs) -> Result<PipelineOptions, Box<dyn std::error::Error>> {
    let mut options = PipelineOptions::from_env()?;
    if args.days.is_some() {
        options.promotion_days = args.days;
    }
    if let Some(week_end) = args.week_end {
        options.week_end = week_end;
    }
    if args.no_impute {
        options.impute = false;
    }
    Ok(options)
}

fn write_table<T: CsvExport + Serialize>(rows: &[T], out: &OutputArgs) -> Result<(), Box<dyn std::error::Error>> {
    match (&out.output, out.format) {
        (Some(p), Format::Csv) => write_csv_file(rows, p)?,
        (Some(p), Format::Json) => fs::write(p, to_json(rows)?)?,
        (None, Format::Csv) => write_csv(rows, std::io::stdout().lock())?,
        (None, Format::Json) => std::io::stdout().write_all(to_json(rows)?.as_bytes())?,
    }

    if let Some(p) = &out.output {
        eprintln!("💾 {} rows written to: {}", rows.len(), p.display());
    }
    Ok(())
}
