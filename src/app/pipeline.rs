//! Shared screening workflow used by the `develop` and `demo` commands.
//!
//! input (CSV or synthetic) -> station groups -> parallel development -> summary
//!
//! The commands then only differ in where the data comes from and what they print.

use log::{debug, info, warn};

use crate::data::{SyntheticConfig, generate};
use crate::domain::{RegressionParams, RunConfig, StationGroup, VariableSet};
use crate::error::AppError;
use crate::io::groups::read_station_groups;
use crate::io::ingest::{IngestSpec, RowError, load_conformed_csv};
use crate::screening::{ScreeningRun, develop_equations};

/// Where the conformed data comes from.
#[derive(Debug, Clone)]
pub enum InputSource {
    Csv(IngestSpec),
    Synthetic(SyntheticConfig),
}

impl InputSource {
    pub fn label(&self) -> String {
        match self {
            InputSource::Csv(spec) => spec.path.display().to_string(),
            InputSource::Synthetic(cfg) => format!("synthetic (seed {})", cfg.seed),
        }
    }
}

/// All computed outputs of one run.
#[derive(Debug, Clone)]
pub struct RunOutput {
    pub data: VariableSet,
    pub groups: Vec<StationGroup>,
    pub run: ScreeningRun,
    pub row_errors: Vec<RowError>,
}

/// Load the input, resolve groups, and develop every group's equation.
pub fn run_screening(source: &InputSource, config: &RunConfig) -> Result<RunOutput, AppError> {
    let (data, row_errors) = load_input(source)?;

    let groups = match &config.groups_path {
        Some(path) => read_station_groups(path)?,
        None => data.singleton_groups(),
    };
    info!("{} station groups", groups.len());

    let run = develop_on_pool(&data, &groups, &config.params, config.threads)?;

    Ok(RunOutput {
        data,
        groups,
        run,
        row_errors,
    })
}

fn load_input(source: &InputSource) -> Result<(VariableSet, Vec<RowError>), AppError> {
    match source {
        InputSource::Csv(spec) => {
            let ingest = load_conformed_csv(spec)?;
            info!(
                "read {} rows from '{}', {} used",
                ingest.rows_read,
                spec.path.display(),
                ingest.rows_used
            );
            if !ingest.row_errors.is_empty() {
                warn!("{} rows skipped", ingest.row_errors.len());
                for e in &ingest.row_errors {
                    debug!(
                        "line {} ({}): {}",
                        e.line,
                        e.station.as_deref().unwrap_or("-"),
                        e.message
                    );
                }
            }
            Ok((ingest.variables, ingest.row_errors))
        }
        InputSource::Synthetic(cfg) => Ok((generate(cfg)?, Vec::new())),
    }
}

/// Run development, on a dedicated pool when a thread count is given.
pub fn develop_on_pool(
    data: &VariableSet,
    groups: &[StationGroup],
    params: &RegressionParams,
    threads: usize,
) -> Result<ScreeningRun, AppError> {
    if threads == 0 {
        return Ok(develop_equations(data, groups, params)?);
    }

    let pool = rayon::ThreadPoolBuilder::new()
        .num_threads(threads)
        .build()
        .map_err(|e| AppError::config(format!("Failed to build thread pool: {e}")))?;
    debug!("developing on {threads} worker threads");
    Ok(pool.install(|| develop_equations(data, groups, params))?)
}
