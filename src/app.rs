//! Top-level application orchestration.
//!
//! `src/main.rs` is intentionally tiny; this module is the "real main" that:
//! - parses CLI arguments and sets up logging
//! - resolves regression parameters (file + flag overrides)
//! - runs the screening pipeline
//! - prints reports and writes optional exports

use std::io::Write;

use clap::Parser;
use env_logger::Env;

use crate::cli::{Cli, Command, DemoArgs, DevelopArgs, ScreeningArgs};
use crate::data::SyntheticConfig;
use crate::domain::{RegressionParams, RunConfig};
use crate::error::AppError;
use crate::io::ingest::IngestSpec;

pub mod pipeline;

use pipeline::InputSource;

/// Entry point for the `mos-screen` binary.
pub fn run() -> Result<(), AppError> {
    let cli = Cli::parse();
    init_logging(cli.verbose);

    match cli.command {
        Command::Develop(args) => handle_develop(args),
        Command::Demo(args) => handle_demo(args),
        Command::Params(args) => handle_params(&args),
    }
}

fn init_logging(verbose: bool) {
    let level = if verbose { "debug" } else { "info" };
    // A second initialisation (e.g. from tests) is harmless.
    let _ = env_logger::Builder::from_env(Env::default().default_filter_or(level))
        .format_timestamp(None)
        .try_init();
}

fn handle_develop(args: DevelopArgs) -> Result<(), AppError> {
    let config = run_config_from_args(&args.screening)?;
    let source = InputSource::Csv(IngestSpec {
        path: args.input,
        predictands: args.predictands,
        point_binary: args.binary_point,
        grid_binary: args.binary_grid,
    });
    execute(&source, &config)
}

fn handle_demo(args: DemoArgs) -> Result<(), AppError> {
    let config = run_config_from_args(&args.screening)?;
    let source = InputSource::Synthetic(SyntheticConfig {
        stations: args.stations,
        dates: args.dates,
        predictors: args.predictors,
        predictands: args.predictands,
        missing_rate: args.missing_rate,
        seed: args.seed,
        ..SyntheticConfig::default()
    });
    execute(&source, &config)
}

fn handle_params(args: &ScreeningArgs) -> Result<(), AppError> {
    let params = resolve_params(args)?;
    params.validate()?;
    let stdout = std::io::stdout();
    let mut lock = stdout.lock();
    crate::io::params::write_params(&mut lock, &params)?;
    writeln!(lock).map_err(|e| AppError::config(format!("Failed to write parameters: {e}")))?;
    Ok(())
}

fn execute(source: &InputSource, config: &RunConfig) -> Result<(), AppError> {
    let out = pipeline::run_screening(source, config)?;

    println!(
        "{}",
        crate::report::format_run_summary(&out.data, &out.run, &config.params, &source.label())
    );
    if config.top_predictors > 0 {
        let usage = crate::report::predictor_usage(&out.data, &out.run);
        println!("{}", crate::report::format_predictor_usage(&usage, config.top_predictors));
    }
    if config.show_equations > 0 {
        print!("{}", crate::report::format_equations(&out.data, &out.run, config.show_equations));
    }

    if let Some(path) = &config.export_json {
        crate::io::export::write_equations_json(path, &out.data, &config.params, &out.run)?;
        log::info!("wrote equations to '{}'", path.display());
    }
    if let Some(path) = &config.export_summary {
        crate::io::export::write_equations_summary_csv(path, &out.data, &out.run)?;
        log::info!("wrote summary to '{}'", path.display());
    }

    Ok(())
}

/// Parameters from the optional file, with flag overrides applied.
pub fn resolve_params(args: &ScreeningArgs) -> Result<RegressionParams, AppError> {
    let mut params = match &args.params {
        Some(path) => crate::io::params::load_params(path)?,
        None => RegressionParams::default(),
    };

    if let Some(v) = args.max_select {
        params.max_select = v;
    }
    if let Some(v) = args.cutoff {
        params.cutoff = v;
    }
    if let Some(v) = args.min_cases {
        params.min_cases_required = v;
    }
    if let Some(v) = args.continuous_coln {
        params.continuous_colinearity_threshold = v;
    }
    if let Some(v) = args.point_binary_coln {
        params.point_binary_colinearity_threshold = v;
    }
    if let Some(v) = args.grid_binary_coln {
        params.grid_binary_colinearity_threshold = v;
    }
    if let Some(v) = args.point_binary_variance {
        params.point_binary_variance_threshold = v;
    }
    if let Some(v) = args.grid_binary_variance {
        params.grid_binary_variance_threshold = v;
    }

    Ok(params)
}

pub fn run_config_from_args(args: &ScreeningArgs) -> Result<RunConfig, AppError> {
    Ok(RunConfig {
        params: resolve_params(args)?,
        threads: args.threads,
        groups_path: args.groups.clone(),
        show_equations: args.show,
        top_predictors: args.top_predictors,
        export_json: args.export_json.clone(),
        export_summary: args.export_summary.clone(),
    })
}
