//! Export developed equations.
//!
//! - JSON: the full equations collection plus run metadata, reloadable with
//!   [`read_equations_json`]
//! - CSV: one summary row per (group, predictand), meant for spreadsheets

use std::fs::File;
use std::io::Write;
use std::path::Path;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::domain::{Equation, RegressionParams, RunSummary, VariableSet};
use crate::error::AppError;
use crate::screening::ScreeningRun;

/// One group's equation plus how its development ended.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EquationRecord {
    pub status: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    #[serde(flatten)]
    pub equation: Equation,
    /// Coefficients in predictor order, zero where a predictor was not selected.
    #[serde(default)]
    pub dense_coefficients: Vec<Vec<f64>>,
}

/// Portable representation of a screening run.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EquationFile {
    pub tool: String,
    pub generated_at: DateTime<Utc>,
    pub predictors: Vec<String>,
    pub predictands: Vec<String>,
    pub params: RegressionParams,
    pub summary: RunSummary,
    pub equations: Vec<EquationRecord>,
}

impl EquationFile {
    pub fn from_run(data: &VariableSet, params: &RegressionParams, run: &ScreeningRun) -> Self {
        let names = data.variable_names();
        let (predictors, predictands) = names.split_at(data.num_predictors());
        let equations = run
            .results
            .iter()
            .map(|r| EquationRecord {
                status: r.status.label().to_string(),
                error: match &r.status {
                    crate::domain::GroupStatus::Failed(err) => Some(err.to_string()),
                    _ => None,
                },
                equation: r.equation.clone(),
                dense_coefficients: r.equation.dense_coefficients(data.num_predictors()),
            })
            .collect();

        Self {
            tool: "mos-screen".to_string(),
            generated_at: Utc::now(),
            predictors: predictors.to_vec(),
            predictands: predictands.to_vec(),
            params: params.clone(),
            summary: run.summary,
            equations,
        }
    }
}

/// Write the equations collection as JSON.
pub fn write_equations_json(
    path: &Path,
    data: &VariableSet,
    params: &RegressionParams,
    run: &ScreeningRun,
) -> Result<(), AppError> {
    let file = File::create(path).map_err(|e| {
        AppError::config(format!("Failed to create equations JSON '{}': {e}", path.display()))
    })?;
    let doc = EquationFile::from_run(data, params, run);
    serde_json::to_writer_pretty(file, &doc)
        .map_err(|e| AppError::config(format!("Failed to write equations JSON: {e}")))?;
    Ok(())
}

/// Read an equations JSON file.
pub fn read_equations_json(path: &Path) -> Result<EquationFile, AppError> {
    let file = File::open(path).map_err(|e| {
        AppError::config(format!("Failed to open equations JSON '{}': {e}", path.display()))
    })?;
    serde_json::from_reader(file)
        .map_err(|e| AppError::config(format!("Invalid equations JSON: {e}")))
}

/// Write one summary row per group and predictand.
pub fn write_equations_summary_csv(
    path: &Path,
    data: &VariableSet,
    run: &ScreeningRun,
) -> Result<(), AppError> {
    let file = File::create(path).map_err(|e| {
        AppError::config(format!("Failed to create summary CSV '{}': {e}", path.display()))
    })?;
    write_summary_rows(file, data, run)
}

fn write_summary_rows<W: Write>(out: W, data: &VariableSet, run: &ScreeningRun) -> Result<(), AppError> {
    let err = |e: csv::Error| AppError::config(format!("Failed to write summary CSV: {e}"));
    let mut writer = csv::Writer::from_writer(out);

    writer
        .write_record([
            "group",
            "stations",
            "status",
            "cases",
            "predictand",
            "terms",
            "predictors",
            "constant",
            "rov",
            "see",
            "mcc",
            "predictand_avg",
        ])
        .map_err(err)?;

    for r in &run.results {
        let eq = &r.equation;
        let stations = eq.stations.join(" ");
        let predictors = eq
            .predictors
            .iter()
            .map(|p| p.name.as_str())
            .collect::<Vec<_>>()
            .join(" ");
        let anc = &eq.ancillary;
        for m in 0..data.num_predictands() {
            writer
                .write_record([
                    eq.group_index.to_string(),
                    stations.clone(),
                    r.status.label().to_string(),
                    eq.sample_count.to_string(),
                    data.predictand_name(m).to_string(),
                    eq.term_count().to_string(),
                    predictors.clone(),
                    format!("{:.6}", eq.constant[m]),
                    format!("{:.6}", anc.reduction_of_variance[m]),
                    format!("{:.6}", anc.standard_error_estimate[m]),
                    format!("{:.6}", anc.multiple_correlation_coefficient[m]),
                    format!("{:.6}", anc.predictand_average[m]),
                ])
                .map_err(err)?;
        }
    }
    writer
        .flush()
        .map_err(|e| AppError::config(format!("Failed to write summary CSV: {e}")))?;
    Ok(())
}
