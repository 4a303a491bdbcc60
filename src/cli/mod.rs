//! Command-line parsing for the screening regression tool.
//!
//! Argument parsing and command dispatch stay separate from the engine code.

use std::path::PathBuf;

use clap::{Args, Parser, Subcommand};

/// Top-level CLI.
#[derive(Debug, Parser)]
#[command(
    name = "mos-screen",
    version,
    about = "Screening multiple linear regression for MOS equation development"
)]
pub struct Cli {
    /// Log engine details (debug level) unless `RUST_LOG` says otherwise.
    #[arg(short, long, global = true)]
    pub verbose: bool,

    #[command(subcommand)]
    pub command: Command,
}

/// CLI subcommands.
#[derive(Debug, Subcommand)]
pub enum Command {
    /// Develop equations from a conformed CSV table.
    Develop(DevelopArgs),
    /// Develop equations from generated data.
    Demo(DemoArgs),
    /// Print regression parameters as JSON (defaults, or a file with overrides applied).
    Params(ScreeningArgs),
}

/// Options for `develop`.
#[derive(Debug, Args, Clone)]
pub struct DevelopArgs {
    /// Conformed CSV: `station,date,<variables>...`.
    #[arg(long, value_name = "CSV")]
    pub input: PathBuf,

    /// Predictand columns (comma separated). All other value columns are predictors.
    #[arg(long, value_delimiter = ',', required = true)]
    pub predictands: Vec<String>,

    /// Point binary predictor columns (comma separated).
    #[arg(long = "binary-point", value_delimiter = ',')]
    pub binary_point: Vec<String>,

    /// Grid binary predictor columns (comma separated).
    #[arg(long = "binary-grid", value_delimiter = ',')]
    pub binary_grid: Vec<String>,

    #[command(flatten)]
    pub screening: ScreeningArgs,
}

/// Options for `demo`.
#[derive(Debug, Args, Clone)]
pub struct DemoArgs {
    #[arg(long, default_value_t = 12)]
    pub stations: usize,

    #[arg(long, default_value_t = 400)]
    pub dates: usize,

    /// Continuous predictors (a point and a grid binary flag are added).
    #[arg(long, default_value_t = 20)]
    pub predictors: usize,

    #[arg(long, default_value_t = 2)]
    pub predictands: usize,

    /// Fraction of values replaced by the missing sentinel.
    #[arg(long, default_value_t = 0.02)]
    pub missing_rate: f64,

    #[arg(long, default_value_t = 7)]
    pub seed: u64,

    #[command(flatten)]
    pub screening: ScreeningArgs,
}

/// Regression parameters, run options and outputs shared by every command.
#[derive(Debug, Args, Clone, Default)]
pub struct ScreeningArgs {
    /// JSON parameter file; flags below override its values.
    #[arg(long, value_name = "JSON")]
    pub params: Option<PathBuf>,

    /// Maximum predictors per equation.
    #[arg(long)]
    pub max_select: Option<usize>,

    /// Minimum reduction of variance a new predictor must add.
    #[arg(long)]
    pub cutoff: Option<f64>,

    /// Complete cases below which a group is developed with a warning.
    #[arg(long)]
    pub min_cases: Option<usize>,

    #[arg(long)]
    pub continuous_coln: Option<f64>,

    #[arg(long)]
    pub point_binary_coln: Option<f64>,

    #[arg(long)]
    pub grid_binary_coln: Option<f64>,

    #[arg(long)]
    pub point_binary_variance: Option<f64>,

    #[arg(long)]
    pub grid_binary_variance: Option<f64>,

    /// Station group list (groups terminated by `99999999`). Default: one group per station.
    #[arg(long, value_name = "FILE")]
    pub groups: Option<PathBuf>,

    /// Worker threads (0 = one per core).
    #[arg(long, default_value_t = 0)]
    pub threads: usize,

    /// Equations to print.
    #[arg(long, default_value_t = 5)]
    pub show: usize,

    /// Rows in the predictor usage table.
    #[arg(long, default_value_t = 10)]
    pub top_predictors: usize,

    /// Export the equations collection to JSON.
    #[arg(long = "export-json")]
    pub export_json: Option<PathBuf>,

    /// Export one summary row per group and predictand to CSV.
    #[arg(long = "export-summary")]
    pub export_summary: Option<PathBuf>,
}
